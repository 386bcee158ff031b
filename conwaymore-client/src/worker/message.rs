//! Messages crossing the UI ↔ worker boundary.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::renderer::Renderer;
use crate::protocol::Command;

/// UI → worker.
pub enum WorkerMessage {
    /// Hand the render surface to the worker. Must be sent first, exactly once.
    Init {
        surface: Box<dyn Renderer>,
        cell_size: f64,
        height: f64,
        width: f64,
        world_size: u16,
    },
    /// Pan the view by a pixel delta.
    CanvasDrag { dx: f64, dy: f64 },
    /// Zoom, keeping the cell under the mouse in place.
    CellSizeChange {
        cell_size: f64,
        mouse_x: f64,
        mouse_y: f64,
    },
    Resize { height: f64, width: f64 },
    SettingsChange { draw_age: bool, draw_grid: bool },
    SetSpeed { speed: u16 },
    Command { cmd: Command },
    /// Place cells given as packed big-endian `x:u16 y:u16` offsets from the
    /// cell under `(origin_px, origin_py)`.
    SetCells {
        count: usize,
        colour: u32,
        coordinates: Vec<u8>,
        origin_px: f64,
        origin_py: f64,
    },
    /// Place a named built-in pattern centred on the cell under the origin.
    SetPattern {
        pattern: String,
        colour: u32,
        origin_px: f64,
        origin_py: f64,
    },
}

impl WorkerMessage {
    /// Short name for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Init { .. } => "init",
            Self::CanvasDrag { .. } => "canvas-drag",
            Self::CellSizeChange { .. } => "cell-size-change",
            Self::Resize { .. } => "resize",
            Self::SettingsChange { .. } => "settings-change",
            Self::SetSpeed { .. } => "set-speed",
            Self::Command { .. } => "command",
            Self::SetCells { .. } => "set-cells",
            Self::SetPattern { .. } => "set-pattern",
        }
    }
}

impl fmt::Debug for WorkerMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Init {
                cell_size,
                height,
                width,
                world_size,
                ..
            } => f
                .debug_struct("Init")
                .field("cell_size", cell_size)
                .field("height", height)
                .field("width", width)
                .field("world_size", world_size)
                .finish_non_exhaustive(),
            Self::CanvasDrag { dx, dy } => f
                .debug_struct("CanvasDrag")
                .field("dx", dx)
                .field("dy", dy)
                .finish(),
            Self::CellSizeChange {
                cell_size,
                mouse_x,
                mouse_y,
            } => f
                .debug_struct("CellSizeChange")
                .field("cell_size", cell_size)
                .field("mouse_x", mouse_x)
                .field("mouse_y", mouse_y)
                .finish(),
            Self::Resize { height, width } => f
                .debug_struct("Resize")
                .field("height", height)
                .field("width", width)
                .finish(),
            Self::SettingsChange {
                draw_age,
                draw_grid,
            } => f
                .debug_struct("SettingsChange")
                .field("draw_age", draw_age)
                .field("draw_grid", draw_grid)
                .finish(),
            Self::SetSpeed { speed } => f.debug_struct("SetSpeed").field("speed", speed).finish(),
            Self::Command { cmd } => f.debug_struct("Command").field("cmd", cmd).finish(),
            Self::SetCells {
                count,
                colour,
                origin_px,
                origin_py,
                ..
            } => f
                .debug_struct("SetCells")
                .field("count", count)
                .field("colour", &format_args!("{colour:#08x}"))
                .field("origin_px", origin_px)
                .field("origin_py", origin_py)
                .finish_non_exhaustive(),
            Self::SetPattern {
                pattern,
                colour,
                origin_px,
                origin_py,
            } => f
                .debug_struct("SetPattern")
                .field("pattern", pattern)
                .field("colour", &format_args!("{colour:#08x}"))
                .field("origin_px", origin_px)
                .field("origin_py", origin_py)
                .finish(),
        }
    }
}

/// Worker → UI. Events are posted in ordered batches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum WorkerEvent {
    /// The worker accepted `Init` and is connected.
    Ready,
    PlaybackStateChanged { playing: bool },
    SpeedChanged { speed: u16 },
    /// A send failed or the connection went away. Not fatal.
    TransportError { message: String },
}
