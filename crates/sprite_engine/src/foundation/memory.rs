//! Memory management utilities

use crate::foundation::math::Mat3;

/// Frame-scoped pool of scratch matrices.
///
/// Slots are handed out in order during batching and bulk-released once per
/// frame. A slot must not be retained past the frame that acquired it.
#[derive(Debug)]
pub struct MatrixPool {
    slots: Vec<Mat3>,
    cursor: usize,
    high_water: usize,
}

impl MatrixPool {
    /// Create a pool with `capacity` preallocated matrices
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![Mat3::identity(); capacity],
            cursor: 0,
            high_water: 0,
        }
    }

    /// Take the next free slot, initialized to `value`
    pub fn acquire(&mut self, value: Mat3) -> &mut Mat3 {
        if self.cursor == self.slots.len() {
            let grown = (self.slots.len() * 2).max(16);
            log::warn!(
                "Scratch matrix pool exhausted at {} slots, growing to {}",
                self.slots.len(),
                grown
            );
            self.slots.resize(grown, Mat3::identity());
        }

        let slot = &mut self.slots[self.cursor];
        self.cursor += 1;
        self.high_water = self.high_water.max(self.cursor);
        *slot = value;
        slot
    }

    /// Number of slots handed out since the last release
    pub fn in_use(&self) -> usize {
        self.cursor
    }

    /// Total number of allocated slots
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Largest number of slots ever in use at once
    pub fn high_water(&self) -> usize {
        self.high_water
    }

    /// Return every slot to the pool
    pub fn release_all(&mut self) {
        self.cursor = 0;
    }
}

impl Default for MatrixPool {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_and_release() {
        let mut pool = MatrixPool::new(2);
        let m = pool.acquire(Mat3::identity() * 2.0);
        assert_eq!(m[(0, 0)], 2.0);
        pool.acquire(Mat3::identity());
        assert_eq!(pool.in_use(), 2);

        pool.release_all();
        assert_eq!(pool.in_use(), 0);
        assert_eq!(pool.high_water(), 2);
    }

    #[test]
    fn test_pool_grows_when_exhausted() {
        let mut pool = MatrixPool::new(1);
        pool.acquire(Mat3::identity());
        pool.acquire(Mat3::identity());

        assert_eq!(pool.in_use(), 2);
        assert!(pool.capacity() >= 2);
    }
}
