//! Item store contract and persistence implementations.
//!
//! # Responsibility
//! - Define the storage contract consumed by the item service.
//! - Isolate SQLite query details from business orchestration.
//!
//! # Invariants
//! - Repositories hold no business rules; they validate record shape only.
//! - Repository APIs return semantic errors (`NotFound`, `Conflict`) in
//!   addition to transport errors.

pub mod item_repo;
pub mod memory_repo;
