//! Specialized collection types

pub use slotmap::{new_key_type, SlotMap};

new_key_type! {
    /// Stable handle to a node stored in a [`crate::scene::SceneGraph`]
    pub struct NodeId;
}

/// Handle-based map for scene nodes
pub type NodeMap<T> = SlotMap<NodeId, T>;

/// Monotonic serial counter.
///
/// Owned by whichever registry hands out ids, so independent registries
/// never share or collide on their sequences.
#[derive(Debug, Clone)]
pub struct SerialCounter {
    next: u64,
}

impl SerialCounter {
    /// Create a counter whose first issued value is 1
    pub fn new() -> Self {
        Self { next: 1 }
    }

    /// Issue the next serial
    pub fn next(&mut self) -> u64 {
        let value = self.next;
        self.next += 1;
        value
    }

    /// Make sure future serials are strictly greater than `seen`
    pub fn advance_past(&mut self, seen: u64) {
        if seen >= self.next {
            self.next = seen + 1;
        }
    }

    /// Peek at the value the next call to [`SerialCounter::next`] returns
    pub fn peek(&self) -> u64 {
        self.next
    }
}

impl Default for SerialCounter {
    fn default() -> Self {
        Self::new()
    }
}
