//! Binary wire protocol between the worker and the simulation server.
//!
//! All multi-byte fields are big-endian. Snapshots flow server → client and
//! replace the client's cell buffer wholesale; client frames are
//! fire-and-forget commands whose effect is confirmed by a later snapshot.

mod cell;
mod client_message;
mod patterns;
mod snapshot;

pub use cell::{Cell, CellBuffer, SLOTS_PER_CELL};
pub use client_message::{
    ClientFrame, Command, MAX_SET_CELLS, OP_COMMAND, OP_SET_CELLS, OP_SET_SPEED,
};
pub use patterns::{Pattern, PatternKind};
pub use snapshot::{decode_into, Snapshot, SnapshotHeader, CELL_LEN, HEADER_LEN, MAX_CELL_COUNT};
