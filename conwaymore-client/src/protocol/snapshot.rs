//! Server → client snapshot frames.
//!
//! Layout (big-endian):
//!
//! ```text
//! byte 0      playing (1 = playing)
//! byte 1..2   speed, u16
//! byte 3..5   cell count, u24
//! then count × 7 bytes: x u16, y u16, r, g, b
//! ```
//!
//! [`decode_into`] is the client path and writes straight into the worker's
//! [`CellBuffer`]. [`Snapshot`] is the owned, server-side model of the same
//! frame.

use super::cell::{Cell, CellBuffer, SLOTS_PER_CELL};
use crate::error::ProtocolError;

pub const HEADER_LEN: usize = 6;
pub const CELL_LEN: usize = 7;
/// Largest cell count the u24 header field can carry.
pub const MAX_CELL_COUNT: usize = 0xFF_FFFF;

/// The fixed-size head of a snapshot frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotHeader {
    pub playing: bool,
    pub speed: u16,
    pub cell_count: usize,
}

impl SnapshotHeader {
    /// Parse the header and check that the frame carries every declared cell.
    pub fn parse(frame: &[u8]) -> Result<Self, ProtocolError> {
        if frame.len() < HEADER_LEN {
            return Err(ProtocolError::FrameTooShort {
                expected: HEADER_LEN,
                actual: frame.len(),
            });
        }

        let header = Self {
            playing: frame[0] == 1,
            speed: u16::from_be_bytes([frame[1], frame[2]]),
            cell_count: u32::from_be_bytes([0, frame[3], frame[4], frame[5]]) as usize,
        };

        let expected = HEADER_LEN + header.cell_count * CELL_LEN;
        if frame.len() < expected {
            return Err(ProtocolError::FrameTooShort {
                expected,
                actual: frame.len(),
            });
        }
        Ok(header)
    }

    fn cell_bytes<'a>(&self, frame: &'a [u8]) -> impl Iterator<Item = &'a [u8]> {
        frame[HEADER_LEN..HEADER_LEN + self.cell_count * CELL_LEN].chunks_exact(CELL_LEN)
    }
}

/// Decode `frame` into `cells`, replacing its contents.
///
/// The buffer is left untouched when the frame is rejected.
pub fn decode_into(frame: &[u8], cells: &mut CellBuffer) -> Result<SnapshotHeader, ProtocolError> {
    let header = SnapshotHeader::parse(frame)?;
    if header.cell_count > cells.capacity() {
        return Err(ProtocolError::CapacityExceeded {
            count: header.cell_count,
            capacity: cells.capacity(),
        });
    }

    let slots = cells.slots_mut(header.cell_count);
    for (slot, bytes) in slots
        .chunks_exact_mut(SLOTS_PER_CELL)
        .zip(header.cell_bytes(frame))
    {
        slot[0] = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        slot[1] = u32::from_be_bytes([0, bytes[4], bytes[5], bytes[6]]);
    }
    cells.set_len(header.cell_count);

    Ok(header)
}

/// Owned model of one snapshot frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub playing: bool,
    pub speed: u16,
    pub cells: Vec<Cell>,
}

impl Snapshot {
    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        let count = self.cells.len();
        if count > MAX_CELL_COUNT {
            return Err(ProtocolError::TooManyCells {
                count,
                max: MAX_CELL_COUNT,
            });
        }

        let mut frame = Vec::with_capacity(HEADER_LEN + count * CELL_LEN);
        frame.push(u8::from(self.playing));
        frame.extend_from_slice(&self.speed.to_be_bytes());
        frame.extend_from_slice(&(count as u32).to_be_bytes()[1..]);
        for cell in &self.cells {
            push_cell(&mut frame, cell);
        }
        Ok(frame)
    }

    pub fn decode(frame: &[u8]) -> Result<Self, ProtocolError> {
        let header = SnapshotHeader::parse(frame)?;
        let cells = header
            .cell_bytes(frame)
            .map(|bytes| {
                Cell::new(
                    u16::from_be_bytes([bytes[0], bytes[1]]),
                    u16::from_be_bytes([bytes[2], bytes[3]]),
                    u32::from_be_bytes([0, bytes[4], bytes[5], bytes[6]]),
                )
            })
            .collect();

        Ok(Self {
            playing: header.playing,
            speed: header.speed,
            cells,
        })
    }
}

/// Append the 7-byte wire form of `cell`.
pub(crate) fn push_cell(frame: &mut Vec<u8>, cell: &Cell) {
    frame.extend_from_slice(&cell.x.to_be_bytes());
    frame.extend_from_slice(&cell.y.to_be_bytes());
    frame.extend_from_slice(&cell.rgb());
}
