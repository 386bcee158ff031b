//! Live cells and the flat buffer the sync loop decodes snapshots into.

use serde::{Deserialize, Serialize};

/// Number of `u32` slots one cell occupies in a [`CellBuffer`].
pub const SLOTS_PER_CELL: usize = 2;

const COLOUR_MASK: u32 = 0x00FF_FFFF;

/// A live cell. Identity is `(x, y)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cell {
    pub x: u16,
    pub y: u16,
    /// 24-bit RGB, `0xRRGGBB`.
    pub colour: u32,
}

impl Cell {
    pub fn new(x: u16, y: u16, colour: u32) -> Self {
        Self {
            x,
            y,
            colour: colour & COLOUR_MASK,
        }
    }

    /// Slot A: `(x << 16) | y`.
    pub fn position_slot(&self) -> u32 {
        (u32::from(self.x) << 16) | u32::from(self.y)
    }

    /// Rebuild a cell from its two buffer slots.
    pub fn from_slots(position: u32, colour: u32) -> Self {
        Self {
            x: (position >> 16) as u16,
            y: (position & 0xFFFF) as u16,
            colour: colour & COLOUR_MASK,
        }
    }

    /// Colour as `[r, g, b]`.
    pub fn rgb(&self) -> [u8; 3] {
        let [_, r, g, b] = self.colour.to_be_bytes();
        [r, g, b]
    }
}

/// Pre-allocated storage for one snapshot's cells.
///
/// Holds `world_size²` cells, two slots each. Only the first `len` cells are
/// valid; every decode replaces them wholesale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellBuffer {
    data: Vec<u32>,
    len: usize,
}

impl CellBuffer {
    /// Allocate a buffer for a square world of `world_size` cells per axis.
    pub fn with_world_size(world_size: u16) -> Self {
        let cells = usize::from(world_size) * usize::from(world_size);
        Self::with_capacity(cells)
    }

    pub fn with_capacity(cells: usize) -> Self {
        Self {
            data: vec![0; cells * SLOTS_PER_CELL],
            len: 0,
        }
    }

    /// Maximum number of cells the buffer holds.
    pub fn capacity(&self) -> usize {
        self.data.len() / SLOTS_PER_CELL
    }

    /// Number of valid cells.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The valid slots: `2 * len` values, alternating position and colour.
    pub fn as_slots(&self) -> &[u32] {
        &self.data[..self.len * SLOTS_PER_CELL]
    }

    pub fn get(&self, index: usize) -> Option<Cell> {
        if index >= self.len {
            return None;
        }
        let at = index * SLOTS_PER_CELL;
        Some(Cell::from_slots(self.data[at], self.data[at + 1]))
    }

    pub fn iter(&self) -> impl Iterator<Item = Cell> + '_ {
        self.as_slots()
            .chunks_exact(SLOTS_PER_CELL)
            .map(|slots| Cell::from_slots(slots[0], slots[1]))
    }

    /// Slots for `cells` cells, to be filled by the decoder. The caller
    /// checks capacity first.
    pub(crate) fn slots_mut(&mut self, cells: usize) -> &mut [u32] {
        &mut self.data[..cells * SLOTS_PER_CELL]
    }

    pub(crate) fn set_len(&mut self, len: usize) {
        debug_assert!(len <= self.capacity());
        self.len = len;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slots_pack_position_and_colour() {
        let cell = Cell::new(5, 6, 0x0A141E);
        assert_eq!(cell.position_slot(), (5 << 16) | 6);
        assert_eq!(cell.rgb(), [10, 20, 30]);
        assert_eq!(Cell::from_slots(cell.position_slot(), cell.colour), cell);
    }

    #[test]
    fn colour_is_masked_to_24_bits() {
        assert_eq!(Cell::new(0, 0, 0xFF12_3456).colour, 0x12_3456);
    }

    #[test]
    fn buffer_is_sized_for_the_world() {
        let buffer = CellBuffer::with_world_size(4);
        assert_eq!(buffer.capacity(), 16);
        assert!(buffer.is_empty());
        assert!(buffer.as_slots().is_empty());
        assert_eq!(buffer.get(0), None);
    }
}
