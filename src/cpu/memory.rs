//! The main store and the instruction-source selector.
//!
//! The machine has 512 twenty-bit cells of main store. Orders are fetched
//! either from it or from the fixed initial order store; data always
//! lives in the main store.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cpu::decode::ORDER_WIDTH;
use crate::word::Word;

/// Number of cells in the main store.
pub const STORE_SIZE: usize = 512;

/// Width of a store cell.
pub const CELL_WIDTH: u32 = ORDER_WIDTH;

/// Which store orders are fetched from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ReadingStore {
    /// The fixed initial orders.
    #[default]
    Bootstrap,
    /// The writable main store.
    Main,
}

impl ReadingStore {
    /// The other store.
    pub fn toggled(self) -> Self {
        match self {
            ReadingStore::Bootstrap => ReadingStore::Main,
            ReadingStore::Main => ReadingStore::Bootstrap,
        }
    }
}

/// The 512-word main store.
#[derive(Clone, Serialize, Deserialize)]
pub struct Store {
    cells: Vec<Word>,
}

impl Store {
    /// A store with every cell zeroed.
    pub fn new() -> Self {
        Self {
            cells: vec![Word::unsigned(CELL_WIDTH); STORE_SIZE],
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Borrow a cell.
    pub fn cell(&self, addr: usize) -> Result<&Word, MemoryError> {
        self.cells
            .get(addr)
            .ok_or(MemoryError::AddressOutOfRange(addr))
    }

    /// Borrow a cell mutably.
    pub fn cell_mut(&mut self, addr: usize) -> Result<&mut Word, MemoryError> {
        self.cells
            .get_mut(addr)
            .ok_or(MemoryError::AddressOutOfRange(addr))
    }

    /// Read a cell's bit pattern.
    ///
    /// # Panics
    /// Panics if `addr` is out of range.
    #[inline]
    pub fn read(&self, addr: usize) -> u64 {
        assert!(addr < STORE_SIZE, "store address {} out of range (0-{})", addr, STORE_SIZE - 1);
        self.cells[addr].raw()
    }

    /// Write a cell's bit pattern, masked to the cell width.
    ///
    /// # Panics
    /// Panics if `addr` is out of range.
    #[inline]
    pub fn write(&mut self, addr: usize, value: u64) {
        assert!(addr < STORE_SIZE, "store address {} out of range (0-{})", addr, STORE_SIZE - 1);
        self.cells[addr].set_raw(value);
    }

    /// Zero every cell.
    pub fn clear(&mut self) {
        for cell in &mut self.cells {
            cell.clear();
        }
    }

    /// Copy a program into consecutive cells starting at `start`.
    pub fn load_program(&mut self, start: usize, program: &[u64]) -> Result<(), MemoryError> {
        if start > STORE_SIZE || program.len() > STORE_SIZE - start {
            return Err(MemoryError::ProgramTooLarge {
                size: program.len(),
                available: STORE_SIZE.saturating_sub(start),
            });
        }

        for (cell, &word) in self.cells[start..].iter_mut().zip(program) {
            cell.set_raw(word);
        }

        Ok(())
    }

    /// Cells `start..start+count`, clipped to the store.
    pub fn dump(&self, start: usize, count: usize) -> Vec<(usize, u64)> {
        let end = start.saturating_add(count).min(STORE_SIZE);
        (start.min(end)..end).map(|i| (i, self.cells[i].raw())).collect()
    }

    /// Every cell holding a non-zero pattern.
    pub fn non_zero(&self) -> Vec<(usize, u64)> {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, cell)| !cell.is_zero())
            .map(|(i, cell)| (i, cell.raw()))
            .collect()
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let used = self.cells.iter().filter(|cell| !cell.is_zero()).count();

        f.debug_struct("Store")
            .field("non_zero_cells", &used)
            .field("total_cells", &STORE_SIZE)
            .finish()
    }
}

/// Errors from host-side store access.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryError {
    #[error("store address {0} out of range (0-511)")]
    AddressOutOfRange(usize),

    #[error("program size {size} exceeds available space {available}")]
    ProgramTooLarge { size: usize, available: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_read_write() {
        let mut store = Store::new();
        store.write(10, 42);
        assert_eq!(store.read(10), 42);
    }

    #[test]
    fn test_write_masks_to_cell_width() {
        let mut store = Store::new();
        store.write(0, 0x3F_FFFF);
        assert_eq!(store.read(0), 0xF_FFFF);
    }

    #[test]
    fn test_cell_bounds() {
        let store = Store::new();
        assert!(store.cell(511).is_ok());
        assert_eq!(store.cell(512), Err(MemoryError::AddressOutOfRange(512)));
    }

    #[test]
    fn test_load_program() {
        let mut store = Store::new();
        store.load_program(100, &[1, 2, 3]).unwrap();

        assert_eq!(store.read(100), 1);
        assert_eq!(store.read(101), 2);
        assert_eq!(store.read(102), 3);
        assert_eq!(store.non_zero().len(), 3);
    }

    #[test]
    fn test_load_program_too_large() {
        let mut store = Store::new();
        let err = store.load_program(510, &[1, 2, 3]).unwrap_err();
        assert_eq!(err, MemoryError::ProgramTooLarge { size: 3, available: 2 });
    }

    #[test]
    fn test_clear() {
        let mut store = Store::new();
        store.load_program(0, &[7, 8, 9]).unwrap();
        store.clear();
        assert!(store.non_zero().is_empty());
    }

    #[test]
    fn test_dump_clips_to_store() {
        let mut store = Store::new();
        store.write(509, 5);
        store.write(511, 0xF_FFFF);
        assert_eq!(store.dump(509, 10), vec![(509, 5), (510, 0), (511, 0xF_FFFF)]);
        assert!(store.dump(600, 4).is_empty());
        assert!(store.dump(0, 0).is_empty());
    }

    #[test]
    fn test_toggle_reading_store() {
        assert_eq!(ReadingStore::Bootstrap.toggled(), ReadingStore::Main);
        assert_eq!(ReadingStore::Main.toggled(), ReadingStore::Bootstrap);
    }
}
