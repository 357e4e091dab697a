//! Core domain logic for the to-do service.
//! This crate is the single source of truth for item business rules.

pub mod clock;
pub mod db;
pub mod id_gen;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use clock::{Clock, ManualClock, SystemClock};
pub use id_gen::{IdGenerator, SequentialIdGenerator, UuidV4Generator};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::item::{Item, ItemId, ItemSnapshot, ItemStatus, ItemValidationError};
pub use repo::item_repo::{ItemRepository, RepoError, RepoResult, SqliteItemRepository};
pub use repo::memory_repo::InMemoryItemRepository;
pub use service::item_service::{ErrorKind, ItemService, ItemServiceError, ServiceResult};

/// Minimal health-check API.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
