//! In-memory item repository.
//!
//! Used by tests and throwaway sessions. Items live in a lock-protected
//! vector, so insertion order is creation order. `update_item` holds the
//! write guard across read, callback and write.

use crate::model::item::{Item, ItemId};
use crate::repo::item_repo::{ItemRepository, RepoError, RepoResult};
use std::sync::RwLock;

#[derive(Debug, Default)]
pub struct InMemoryItemRepository {
    items: RwLock<Vec<Item>>,
}

impl InMemoryItemRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> RepoResult<usize> {
        Ok(self.items.read().map_err(|_| RepoError::LockPoisoned)?.len())
    }

    pub fn is_empty(&self) -> RepoResult<bool> {
        Ok(self.len()? == 0)
    }
}

impl ItemRepository for InMemoryItemRepository {
    fn create_item(&self, item: &Item) -> RepoResult<()> {
        item.validate()?;

        let mut items = self.items.write().map_err(|_| RepoError::LockPoisoned)?;
        if items.iter().any(|existing| existing.uuid == item.uuid) {
            return Err(RepoError::Conflict(item.uuid));
        }
        items.push(item.clone());
        Ok(())
    }

    fn get_item(&self, id: ItemId) -> RepoResult<Option<Item>> {
        let items = self.items.read().map_err(|_| RepoError::LockPoisoned)?;
        Ok(items.iter().find(|item| item.uuid == id).cloned())
    }

    fn save_item(&self, item: &Item) -> RepoResult<()> {
        item.validate()?;

        let mut items = self.items.write().map_err(|_| RepoError::LockPoisoned)?;
        let stored = items
            .iter_mut()
            .find(|existing| existing.uuid == item.uuid)
            .ok_or(RepoError::NotFound(item.uuid))?;
        stored.description.clone_from(&item.description);
        stored.done_at = item.done_at;
        Ok(())
    }

    fn update_item<E, F>(&self, id: ItemId, apply: F) -> Result<Option<Item>, E>
    where
        E: From<RepoError>,
        F: FnOnce(&mut Item) -> Result<(), E>,
    {
        let mut items = self.items.write().map_err(|_| RepoError::LockPoisoned)?;
        let Some(stored) = items.iter_mut().find(|item| item.uuid == id) else {
            return Ok(None);
        };

        let mut updated = stored.clone();
        apply(&mut updated)?;
        updated.validate().map_err(RepoError::from)?;

        stored.description.clone_from(&updated.description);
        stored.done_at = updated.done_at;
        Ok(Some(stored.clone()))
    }

    fn list_items(&self, not_done_only: bool) -> RepoResult<Vec<Item>> {
        let items = self.items.read().map_err(|_| RepoError::LockPoisoned)?;
        Ok(items
            .iter()
            .filter(|item| !not_done_only || !item.is_done())
            .cloned()
            .collect())
    }
}
