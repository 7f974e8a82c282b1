//! Id generation for fields and choices
//!
//! Generators are passed in by the caller, so building a form never touches
//! process-wide counters.

use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// Source of fresh ids
#[cfg_attr(test, mockall::automock)]
pub trait IdGenerator: Send + Sync {
    /// Next id, prefixed with the kind of thing it names
    fn next_id(&self, prefix: &str) -> String;
}

/// Random v4 UUID ids
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidIdGenerator;

impl IdGenerator for UuidIdGenerator {
    fn next_id(&self, prefix: &str) -> String {
        let uuid = Uuid::new_v4().simple().to_string();
        if prefix.is_empty() {
            uuid
        } else {
            format!("{}_{}", prefix, &uuid[..12])
        }
    }
}

/// Deterministic `prefix_N` ids from a caller-owned sequence
#[derive(Debug, Default)]
pub struct SequentialIdGenerator {
    next: AtomicU64,
}

impl SequentialIdGenerator {
    /// Start counting from zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Start counting from `start`
    pub fn starting_at(start: u64) -> Self {
        Self {
            next: AtomicU64::new(start),
        }
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn next_id(&self, prefix: &str) -> String {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        if prefix.is_empty() {
            n.to_string()
        } else {
            format!("{}_{}", prefix, n)
        }
    }
}
