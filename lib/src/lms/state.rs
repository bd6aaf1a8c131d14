// Leaf counter and index validation

use crate::lms::error::{LmsError, Result};

/// Lifecycle of a one-time-signature pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeafState {
    /// No leaf consumed yet
    Fresh,
    /// Some leaves consumed, at least one left
    Signing,
    /// Every leaf consumed
    Exhausted,
}

/// Range checks for leaf indices
pub struct LeafValidator;

impl LeafValidator {
    /// Validate a leaf index carried by a signature
    ///
    /// Postconditions:
    /// - Returns Ok if q < 2^height
    /// - Returns Err(Format) otherwise
    pub fn validate_index(q: u32, height: u32) -> Result<()> {
        if u64::from(q) >= 1u64 << height {
            return Err(LmsError::Format(format!(
                "leaf index {q} out of range for tree of height {height}"
            )));
        }
        Ok(())
    }

    /// Validate a persisted next-leaf counter
    ///
    /// Postconditions:
    /// - Returns Ok if next <= 2^height (equality means exhausted)
    /// - Returns Err(Format) otherwise
    pub fn validate_counter(next: u32, height: u32) -> Result<()> {
        if u64::from(next) > 1u64 << height {
            return Err(LmsError::Format(format!(
                "leaf counter {next} exceeds capacity of tree of height {height}"
            )));
        }
        Ok(())
    }
}

/// Monotonic next-leaf counter for an LMS tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeafCounter {
    next: u32,
    height: u32,
}

impl LeafCounter {
    pub fn new(height: u32) -> Self {
        Self { next: 0, height }
    }

    pub fn restore(next: u32, height: u32) -> Result<Self> {
        LeafValidator::validate_counter(next, height)?;
        Ok(Self { next, height })
    }

    pub fn next(&self) -> u32 {
        self.next
    }

    pub fn capacity(&self) -> u64 {
        1u64 << self.height
    }

    pub fn remaining(&self) -> u64 {
        self.capacity() - u64::from(self.next)
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining() == 0
    }

    pub fn state(&self) -> LeafState {
        if self.next == 0 {
            LeafState::Fresh
        } else if self.is_exhausted() {
            LeafState::Exhausted
        } else {
            LeafState::Signing
        }
    }

    /// Hand out the next leaf index and advance past it
    ///
    /// Invariants:
    /// - A returned index is never returned again by this counter
    pub fn reserve(&mut self) -> Result<u32> {
        if self.is_exhausted() {
            return Err(LmsError::State(format!(
                "all {} leaves of this LMS key have been used",
                self.capacity()
            )));
        }
        let q = self.next;
        self.next += 1;
        Ok(q)
    }
}
