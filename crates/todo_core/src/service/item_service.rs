//! Item use-case service.
//!
//! # Responsibility
//! - Create, look up, list, complete, un-complete and rephrase items.
//! - Enforce the due-date rules on creation and mutation.
//!
//! # Invariants
//! - `due_at` must not be before the clock at creation (`due_at == now` is allowed).
//! - Once the stored `due_at` is strictly before the clock, `mark_done`,
//!   `mark_undone` and `rephrase` are rejected regardless of done state.
//! - `created_at` and `due_at` are never changed after creation.
//! - A caller-supplied completion time must not precede `created_at`.
//! - Each mutation runs its guard and change inside
//!   `ItemRepository::update_item`, so concurrent mutations of one item
//!   apply one after another instead of overwriting each other.

use crate::clock::Clock;
use crate::id_gen::IdGenerator;
use crate::model::item::{is_blank, Item, ItemId, ItemSnapshot};
use crate::repo::item_repo::{ItemRepository, RepoError};
use log::{debug, info, warn};
use thiserror::Error;

/// Coarse error classes for adapters that translate errors to a protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller input is invalid; retrying the same request cannot succeed.
    InvalidArgument,
    /// Referenced item does not exist.
    NotFound,
    /// Request conflicts with current item state.
    Conflict,
    /// Persistence failure.
    Storage,
}

/// Service error for item use-cases.
#[derive(Debug, Error)]
pub enum ItemServiceError {
    #[error("description must not be blank")]
    BlankDescription,
    #[error("due_at must not be in the past: due_at={due_at} now={now}")]
    DueInPast { due_at: i64, now: i64 },
    #[error("done_at {done_at} must not precede created_at {created_at}")]
    DoneBeforeCreated { done_at: i64, created_at: i64 },
    #[error("item not found: {0}")]
    NotFound(ItemId),
    #[error("item {id} may not be changed past due date {due_at}")]
    PastDue { id: ItemId, due_at: i64 },
    #[error(transparent)]
    Repo(#[from] RepoError),
}

impl ItemServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::BlankDescription | Self::DueInPast { .. } | Self::DoneBeforeCreated { .. } => {
                ErrorKind::InvalidArgument
            }
            Self::NotFound(_) | Self::Repo(RepoError::NotFound(_)) => ErrorKind::NotFound,
            Self::PastDue { .. } | Self::Repo(RepoError::Conflict(_)) => ErrorKind::Conflict,
            Self::Repo(RepoError::Validation(_)) => ErrorKind::InvalidArgument,
            Self::Repo(_) => ErrorKind::Storage,
        }
    }
}

pub type ServiceResult<T> = Result<T, ItemServiceError>;

/// Use-case service over an item repository.
pub struct ItemService<R, C, G> {
    repo: R,
    clock: C,
    ids: G,
}

impl<R: ItemRepository, C: Clock, G: IdGenerator> ItemService<R, C, G> {
    pub fn new(repo: R, clock: C, ids: G) -> Self {
        Self { repo, clock, ids }
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Creates a new item due at `due_at`.
    ///
    /// # Errors
    /// - `BlankDescription` when `description` is empty or whitespace.
    /// - `DueInPast` when `due_at` is before the current instant.
    /// - `Repo` when persistence fails (including id `Conflict`).
    pub fn create_item(&self, description: impl Into<String>, due_at: i64) -> ServiceResult<Item> {
        let description = description.into();
        debug!(
            "event=item_create module=service status=start description_len={} due_at={}",
            description.len(),
            due_at
        );

        if is_blank(&description) {
            return Err(reject("item_create", ItemServiceError::BlankDescription));
        }

        let now = self.clock.now_ms();
        if due_at < now {
            return Err(reject(
                "item_create",
                ItemServiceError::DueInPast { due_at, now },
            ));
        }

        let item = Item::new(self.ids.next_id(), description, now, due_at).map_err(RepoError::from)?;
        self.repo.create_item(&item)?;
        info!(
            "event=item_create module=service status=ok item_id={} created_at={} due_at={}",
            item.uuid, item.created_at, item.due_at
        );
        Ok(item)
    }

    /// Gets one item by id; `Ok(None)` when absent.
    pub fn get_item(&self, id: ItemId) -> ServiceResult<Option<Item>> {
        let item = self.repo.get_item(id)?;
        debug!(
            "event=item_get module=service status=ok item_id={} found={}",
            id,
            item.is_some()
        );
        Ok(item)
    }

    /// Gets one item together with its status at the current instant.
    pub fn get_snapshot(&self, id: ItemId) -> ServiceResult<Option<ItemSnapshot>> {
        let now = self.clock.now_ms();
        Ok(self
            .get_item(id)?
            .map(|item| ItemSnapshot::at(item, now)))
    }

    /// Lists items in creation order.
    ///
    /// With `not_done_only`, items with `done_at` set are excluded; past-due
    /// items that are not done are still returned.
    pub fn list_items(&self, not_done_only: bool) -> ServiceResult<Vec<Item>> {
        let items = self.repo.list_items(not_done_only)?;
        debug!(
            "event=item_list module=service status=ok not_done_only={} count={}",
            not_done_only,
            items.len()
        );
        Ok(items)
    }

    /// Lists items with statuses derived from one shared instant.
    pub fn list_snapshots(&self, not_done_only: bool) -> ServiceResult<Vec<ItemSnapshot>> {
        let now = self.clock.now_ms();
        Ok(self
            .list_items(not_done_only)?
            .into_iter()
            .map(|item| ItemSnapshot::at(item, now))
            .collect())
    }

    /// Marks an item done at `done_at`, or at the current instant when `None`.
    ///
    /// Marking an already-done item again overwrites `done_at`.
    pub fn mark_done(&self, id: ItemId, done_at: Option<i64>) -> ServiceResult<()> {
        const EVENT: &str = "item_mark_done";
        debug!(
            "event={EVENT} module=service status=start item_id={} done_at={:?}",
            id, done_at
        );
        let now = self.clock.now_ms();
        let done_at = done_at.unwrap_or(now);

        let updated = self.repo.update_item::<ItemServiceError, _>(id, |item| {
            check_due_date(EVENT, item, now)?;
            if done_at < item.created_at {
                return Err(reject(
                    EVENT,
                    ItemServiceError::DoneBeforeCreated {
                        done_at,
                        created_at: item.created_at,
                    },
                ));
            }
            if let Some(previous) = item.done_at {
                warn!(
                    "event={EVENT} module=service status=overwrite item_id={} previous_done_at={} done_at={}",
                    id, previous, done_at
                );
            }
            item.mark_done(done_at);
            Ok(())
        })?;

        require_found(EVENT, id, updated)?;
        info!("event={EVENT} module=service status=ok item_id={id} done_at={done_at}");
        Ok(())
    }

    /// Clears the completion time of an item.
    pub fn mark_undone(&self, id: ItemId) -> ServiceResult<()> {
        const EVENT: &str = "item_mark_undone";
        debug!("event={EVENT} module=service status=start item_id={id}");
        let now = self.clock.now_ms();

        let updated = self.repo.update_item::<ItemServiceError, _>(id, |item| {
            check_due_date(EVENT, item, now)?;
            item.mark_undone();
            Ok(())
        })?;

        require_found(EVENT, id, updated)?;
        info!("event={EVENT} module=service status=ok item_id={id}");
        Ok(())
    }

    /// Replaces the description of an item.
    pub fn rephrase(&self, id: ItemId, description: impl Into<String>) -> ServiceResult<()> {
        const EVENT: &str = "item_rephrase";
        let description = description.into();
        debug!(
            "event={EVENT} module=service status=start item_id={} description_len={}",
            id,
            description.len()
        );

        if is_blank(&description) {
            return Err(reject(EVENT, ItemServiceError::BlankDescription));
        }

        let now = self.clock.now_ms();
        let updated = self.repo.update_item::<ItemServiceError, _>(id, |item| {
            check_due_date(EVENT, item, now)?;
            item.rephrase(description);
            Ok(())
        })?;

        require_found(EVENT, id, updated)?;
        info!("event={EVENT} module=service status=ok item_id={id}");
        Ok(())
    }
}

/// Due-date guard shared by every mutation of an existing item.
fn check_due_date(event: &str, item: &Item, now: i64) -> ServiceResult<()> {
    if item.is_past_due_at(now) {
        return Err(reject(
            event,
            ItemServiceError::PastDue {
                id: item.uuid,
                due_at: item.due_at,
            },
        ));
    }
    Ok(())
}

fn require_found(event: &str, id: ItemId, updated: Option<Item>) -> ServiceResult<Item> {
    updated.ok_or_else(|| reject(event, ItemServiceError::NotFound(id)))
}

fn reject(event: &str, err: ItemServiceError) -> ItemServiceError {
    warn!("event={event} module=service status=rejected kind={:?} error={err}", err.kind());
    err
}
