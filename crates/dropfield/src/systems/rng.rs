//! Randomness seam.
//! The field only ever needs uniform draws in [0, 1); the browser bridge backs
//! this with `Math.random`, tests with the seedable [`Xorshift`].

use std::cell::Cell;
use std::rc::Rc;

/// Source of uniform draws in [0, 1).
pub trait RandomSource {
    fn next_unit(&self) -> f64;

    /// Uniform index in [0, len), or `None` when `len` is zero.
    fn pick_index(&self, len: usize) -> Option<usize> {
        if len == 0 {
            return None;
        }
        let idx = (self.next_unit() * len as f64) as usize;
        // Guard against a source that rounds up to exactly 1.0.
        Some(idx.min(len - 1))
    }
}

pub type SharedRandom = Rc<dyn RandomSource>;

/// Seedable pseudo-random number generator (xorshift64).
/// Deterministic, fast.
#[derive(Debug, Clone)]
pub struct Xorshift {
    state: Cell<u64>,
}

impl Xorshift {
    pub fn new(seed: u64) -> Self {
        Xorshift {
            state: Cell::new(if seed == 0 { 1 } else { seed }),
        }
    }

    fn next_u64(&self) -> u64 {
        let mut x = self.state.get();
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state.set(x);
        x
    }
}

impl RandomSource for Xorshift {
    fn next_unit(&self) -> f64 {
        // Top 53 bits give an exact f64 mantissa.
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }
}

/// A source that replays a fixed sequence of draws, cycling when exhausted.
#[cfg(test)]
#[derive(Debug, Clone)]
pub struct Sequence {
    values: Vec<f64>,
    cursor: Cell<usize>,
}

#[cfg(test)]
impl Sequence {
    pub fn new(values: Vec<f64>) -> Self {
        assert!(!values.is_empty(), "Sequence needs at least one value");
        Self {
            values,
            cursor: Cell::new(0),
        }
    }
}

#[cfg(test)]
impl RandomSource for Sequence {
    fn next_unit(&self) -> f64 {
        let i = self.cursor.get();
        self.cursor.set((i + 1) % self.values.len());
        self.values[i]
    }
}
