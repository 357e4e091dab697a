//! Item domain model.
//!
//! # Responsibility
//! - Define the to-do record shared by repository, service and CLI layers.
//! - Derive `ItemStatus` from the record and a caller-supplied instant.
//!
//! # Invariants
//! - `uuid` is assigned once at creation and never reassigned.
//! - `created_at` and `due_at` never change after creation.
//! - `done_at` is `Some` iff the item is marked done.
//! - `description` is never blank.
//!
//! Timestamps are Unix epoch milliseconds.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Stable identifier of a to-do item.
pub type ItemId = Uuid;

/// Validation errors for item invariants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ItemValidationError {
    #[error("item uuid must not be nil")]
    NilUuid,
    #[error("item description must not be blank")]
    BlankDescription,
}

/// Status derived from an item and a reference instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemStatus {
    /// Not completed and the due date has not passed.
    NotDone,
    /// Not completed and the due date has passed.
    PastDue,
    /// Completed; takes precedence over the due date.
    Done,
}

/// Canonical to-do record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Assigned by the id generator at creation.
    pub uuid: ItemId,
    /// Free text; the only field besides `done_at` that may change.
    pub description: String,
    /// Instant observed by the service when the item was created.
    pub created_at: i64,
    pub due_at: i64,
    /// Completion instant; `None` while not done.
    pub done_at: Option<i64>,
}

impl Item {
    /// Builds a not-yet-done item.
    ///
    /// Does not check `due_at` against the clock; that is the service's job.
    pub fn new(
        uuid: ItemId,
        description: impl Into<String>,
        created_at: i64,
        due_at: i64,
    ) -> Result<Self, ItemValidationError> {
        let item = Self {
            uuid,
            description: description.into(),
            created_at,
            due_at,
            done_at: None,
        };
        item.validate()?;
        Ok(item)
    }

    /// Checks structural invariants of the record.
    pub fn validate(&self) -> Result<(), ItemValidationError> {
        if self.uuid.is_nil() {
            return Err(ItemValidationError::NilUuid);
        }
        if is_blank(&self.description) {
            return Err(ItemValidationError::BlankDescription);
        }
        Ok(())
    }

    /// Derives the status at `now_ms`.
    ///
    /// `PastDue` requires `now_ms` strictly after `due_at`.
    pub fn status(&self, now_ms: i64) -> ItemStatus {
        match self.done_at {
            Some(_) => ItemStatus::Done,
            None if now_ms > self.due_at => ItemStatus::PastDue,
            None => ItemStatus::NotDone,
        }
    }

    /// Returns whether the due date is strictly before `now_ms`.
    pub fn is_past_due_at(&self, now_ms: i64) -> bool {
        self.due_at < now_ms
    }

    pub fn is_done(&self) -> bool {
        self.done_at.is_some()
    }

    pub fn mark_done(&mut self, done_at: i64) {
        self.done_at = Some(done_at);
    }

    pub fn mark_undone(&mut self) {
        self.done_at = None;
    }

    pub fn rephrase(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }
}

/// Read model pairing an item with the status derived at read time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemSnapshot {
    #[serde(flatten)]
    pub item: Item,
    pub status: ItemStatus,
}

impl ItemSnapshot {
    pub fn at(item: Item, now_ms: i64) -> Self {
        let status = item.status(now_ms);
        Self { item, status }
    }
}

pub(crate) fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}
