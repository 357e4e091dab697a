//! Identifier generation injected into the service layer.
//!
//! # Invariants
//! - Generated identifiers are never nil.
//! - Production identifiers are unique with overwhelming probability.

use crate::model::item::ItemId;
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// Source of fresh item identifiers.
pub trait IdGenerator {
    fn next_id(&self) -> ItemId;
}

/// Random (v4) identifiers.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidV4Generator;

impl IdGenerator for UuidV4Generator {
    fn next_id(&self) -> ItemId {
        Uuid::new_v4()
    }
}

/// Deterministic identifiers `1, 2, 3, ...` encoded as UUIDs.
///
/// Meant for tests and fixtures where stable ids simplify assertions.
#[derive(Debug)]
pub struct SequentialIdGenerator {
    next: AtomicU64,
}

impl Default for SequentialIdGenerator {
    fn default() -> Self {
        Self::starting_at(1)
    }
}

impl SequentialIdGenerator {
    /// Starts the sequence at `start` (a `0` start is bumped to `1`).
    pub fn starting_at(start: u64) -> Self {
        Self {
            next: AtomicU64::new(start.max(1)),
        }
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn next_id(&self) -> ItemId {
        let value = self.next.fetch_add(1, Ordering::SeqCst);
        Uuid::from_u128(u128::from(value))
    }
}

impl<G: IdGenerator + ?Sized> IdGenerator for &G {
    fn next_id(&self) -> ItemId {
        (**self).next_id()
    }
}
