//! To-do domain model.
//!
//! # Responsibility
//! - Define the canonical item record and its derived status.
//!
//! # Invariants
//! - Every item is identified by a stable `ItemId` assigned at creation.
//! - Status is derived from `(done_at, due_at, now)` and never stored.

pub mod item;
