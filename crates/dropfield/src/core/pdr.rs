//! Single-writer / multi-reader holder for the packet delivery ratio.
//!
//! [`pdr_cell`] hands out exactly one [`PdrWriter`] (not `Clone`) and a
//! cloneable [`PdrReader`]. The writer belongs to the connection, readers to
//! anything that needs the live value (the ambient spawner).
//!
//! Backed by `Rc<Cell<f64>>`: callbacks run to completion on one thread, so
//! reads and writes never interleave. A port to preemptive threads would swap
//! this for an atomic.

use std::cell::Cell;
use std::rc::Rc;

/// The only handle that can change the pdr.
#[derive(Debug)]
pub struct PdrWriter {
    value: Rc<Cell<f64>>,
}

/// Read-only view of the pdr.
#[derive(Debug, Clone)]
pub struct PdrReader {
    value: Rc<Cell<f64>>,
}

/// Create a pdr holder seeded with `initial`.
pub fn pdr_cell(initial: f64) -> (PdrWriter, PdrReader) {
    let value = Rc::new(Cell::new(initial));
    (
        PdrWriter { value: Rc::clone(&value) },
        PdrReader { value },
    )
}

impl PdrWriter {
    /// Overwrite the pdr wholesale (last write wins).
    pub fn set(&self, pdr: f64) {
        self.value.set(pdr);
    }

    pub fn reader(&self) -> PdrReader {
        PdrReader { value: Rc::clone(&self.value) }
    }
}

impl PdrReader {
    pub fn get(&self) -> f64 {
        self.value.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readers_see_latest_write() {
        let (writer, reader) = pdr_cell(0.2);
        let second = reader.clone();
        assert_eq!(reader.get(), 0.2);
        writer.set(0.9);
        assert_eq!(reader.get(), 0.9);
        assert_eq!(second.get(), 0.9);
        assert_eq!(writer.reader().get(), 0.9);
    }
}
