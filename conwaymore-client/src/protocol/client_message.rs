//! Client → server frames.
//!
//! The first byte of every frame is an opcode:
//!
//! ```text
//! 1  Command   byte 1: command code
//! 2  SetSpeed  byte 1: 0, byte 2..3: speed u16
//! 4  SetCells  byte 1..3: 0, byte 4: cell count, then count × 7 bytes
//! ```

use serde::{Deserialize, Serialize};

use super::cell::Cell;
use super::snapshot::{push_cell, CELL_LEN};
use crate::error::ProtocolError;

pub const OP_COMMAND: u8 = 1;
pub const OP_SET_SPEED: u8 = 2;
pub const OP_SET_CELLS: u8 = 4;

const SET_CELLS_HEADER_LEN: usize = 5;
/// The cell count of a `SetCells` frame is a single byte.
pub const MAX_SET_CELLS: usize = u8::MAX as usize;

/// Playback commands understood by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Command {
    Next = 0,
    Play = 1,
    Pause = 2,
    Clear = 3,
    Randomise = 4,
}

impl Command {
    pub fn code(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for Command {
    type Error = ProtocolError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::Next),
            1 => Ok(Self::Play),
            2 => Ok(Self::Pause),
            3 => Ok(Self::Clear),
            4 => Ok(Self::Randomise),
            other => Err(ProtocolError::UnknownCommand(other)),
        }
    }
}

/// One outbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientFrame {
    Command(Command),
    SetSpeed(u16),
    /// Absolute grid cells, already anchored and wrapped.
    SetCells(Vec<Cell>),
}

impl ClientFrame {
    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        match self {
            Self::Command(cmd) => Ok(vec![OP_COMMAND, cmd.code()]),
            Self::SetSpeed(speed) => {
                let [hi, lo] = speed.to_be_bytes();
                Ok(vec![OP_SET_SPEED, 0, hi, lo])
            }
            Self::SetCells(cells) => {
                if cells.len() > MAX_SET_CELLS {
                    return Err(ProtocolError::TooManyCells {
                        count: cells.len(),
                        max: MAX_SET_CELLS,
                    });
                }
                let mut frame = Vec::with_capacity(SET_CELLS_HEADER_LEN + cells.len() * CELL_LEN);
                frame.extend_from_slice(&[OP_SET_CELLS, 0, 0, 0, cells.len() as u8]);
                for cell in cells {
                    push_cell(&mut frame, cell);
                }
                Ok(frame)
            }
        }
    }

    /// Parse a frame the way the server does.
    pub fn decode(frame: &[u8]) -> Result<Self, ProtocolError> {
        let Some(&opcode) = frame.first() else {
            return Err(ProtocolError::FrameTooShort {
                expected: 1,
                actual: 0,
            });
        };

        match opcode {
            OP_COMMAND => {
                require_len(frame, 2)?;
                Ok(Self::Command(Command::try_from(frame[1])?))
            }
            OP_SET_SPEED => {
                require_len(frame, 4)?;
                Ok(Self::SetSpeed(u16::from_be_bytes([frame[2], frame[3]])))
            }
            OP_SET_CELLS => {
                require_len(frame, SET_CELLS_HEADER_LEN)?;
                let count = usize::from(frame[4]);
                require_len(frame, SET_CELLS_HEADER_LEN + count * CELL_LEN)?;
                let cells = frame[SET_CELLS_HEADER_LEN..]
                    .chunks_exact(CELL_LEN)
                    .take(count)
                    .map(|b| {
                        Cell::new(
                            u16::from_be_bytes([b[0], b[1]]),
                            u16::from_be_bytes([b[2], b[3]]),
                            u32::from_be_bytes([0, b[4], b[5], b[6]]),
                        )
                    })
                    .collect();
                Ok(Self::SetCells(cells))
            }
            other => Err(ProtocolError::UnknownOpcode(other)),
        }
    }
}

fn require_len(frame: &[u8], expected: usize) -> Result<(), ProtocolError> {
    if frame.len() < expected {
        return Err(ProtocolError::FrameTooShort {
            expected,
            actual: frame.len(),
        });
    }
    Ok(())
}
