//! Override cache persistence service.
//!
//! # Responsibility
//! - Seed a store's override cache from the previous session.
//! - Write the cache back, scoped to one owner, in full or one bubble at
//!   a time.
//! - Forget single entries or wipe an owner's cache.
//!
//! # Invariants
//! - `restore` switches the store to the owner before loading, so another
//!   owner's bubbles never mix with the restored cache.
//! - `persist` replaces the owner's rows atomically.

use crate::model::bubble::BubbleId;
use crate::repo::override_repo::{OverrideRepository, RepoResult};
use crate::store::{BubbleStore, OverrideEntry};
use log::info;

/// Use-case wrapper over an override repository.
pub struct OverrideService<R: OverrideRepository> {
    repo: R,
}

impl<R: OverrideRepository> OverrideService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Loads `owner`'s overrides into `store` and returns how many were
    /// restored.
    pub fn restore(&self, store: &mut BubbleStore, owner: &str) -> RepoResult<usize> {
        let entries = self.repo.load_overrides(owner)?;
        let count = entries.len();
        store.sync_owner(owner);
        store.restore_overrides(entries);
        info!("event=overrides_restore module=service status=ok count={count}");
        Ok(count)
    }

    /// Writes the store's whole override cache for `owner`.
    pub fn persist(&self, store: &BubbleStore, owner: &str) -> RepoResult<usize> {
        let entries: Vec<(BubbleId, OverrideEntry)> = store
            .overrides()
            .iter()
            .map(|(id, entry)| (*id, *entry))
            .collect();
        self.repo.replace_overrides(owner, &entries)?;
        info!(
            "event=overrides_persist module=service status=ok count={}",
            entries.len()
        );
        Ok(entries.len())
    }

    /// Writes the cached override of one bubble right after it moved.
    ///
    /// Returns `false` when the store holds no override for `id`.
    pub fn record(&self, store: &BubbleStore, owner: &str, id: BubbleId) -> RepoResult<bool> {
        let Some(entry) = store.overrides().get(&id).copied() else {
            return Ok(false);
        };
        self.repo.upsert_override(owner, id, &entry)?;
        info!("event=override_record module=service status=ok bubble_id={id} manual={}", entry.manual);
        Ok(true)
    }

    /// Discards every override of `owner`, in the store and in storage, and
    /// returns how many persisted rows were removed.
    pub fn clear(&self, store: &mut BubbleStore, owner: &str) -> RepoResult<usize> {
        let removed = self.repo.clear_owner(owner)?;
        store.restore_overrides(Vec::<(BubbleId, OverrideEntry)>::new());
        info!("event=overrides_clear module=service status=ok removed={removed}");
        Ok(removed)
    }

    /// Drops one override from both the store and the repository, once the
    /// position has been confirmed in the external row.
    pub fn forget(&self, store: &mut BubbleStore, owner: &str, id: BubbleId) -> RepoResult<bool> {
        let in_memory = store.forget_override(id);
        let persisted = self.repo.delete_override(owner, id)?;
        Ok(in_memory || persisted)
    }
}
