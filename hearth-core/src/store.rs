//! Memory Store — per-character serialized access to memory logs.
//!
//! Each character id has its own async lock. A [`MemorySession`] holds that
//! lock from the moment a log is loaded until the session is dropped, so a
//! load → modify → persist sequence for one character can never interleave
//! with another for the same character. Distinct characters share nothing
//! but the lock table and proceed fully in parallel.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info};

use crate::error::{HearthError, Result};
use crate::persistence::PersistentStore;
use crate::types::{CharacterId, MemoryEntry, MemoryLog};

/// Serialized, per-character front end over a [`PersistentStore`].
pub struct MemoryStore {
    backend: Arc<dyn PersistentStore>,
    locks: DashMap<CharacterId, Arc<Mutex<()>>>,
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("characters_seen", &self.locks.len())
            .finish_non_exhaustive()
    }
}

impl MemoryStore {
    /// Wrap a storage backend.
    #[must_use]
    pub fn new(backend: impl PersistentStore + 'static) -> Self {
        Self::from_arc(Arc::new(backend))
    }

    /// Wrap a shared storage backend.
    #[must_use]
    pub fn from_arc(backend: Arc<dyn PersistentStore>) -> Self {
        Self {
            backend,
            locks: DashMap::new(),
        }
    }

    /// The underlying backend.
    #[must_use]
    pub fn backend(&self) -> &dyn PersistentStore {
        self.backend.as_ref()
    }

    fn lock_for(&self, id: &CharacterId) -> Arc<Mutex<()>> {
        self.locks.entry(id.clone()).or_default().value().clone()
    }

    /// Enter the critical section for `id` and load its log.
    ///
    /// Waits while another session for the same character is open. A
    /// character with no stored log starts with an empty one.
    ///
    /// # Errors
    /// Returns [`HearthError::InvalidCharacterId`] or the backend's load error.
    pub async fn session(&self, id: &CharacterId) -> Result<MemorySession<'_>> {
        id.validated()?;
        let guard = self.lock_for(id).lock_owned().await;
        let log = self.backend.load(id)?.unwrap_or_default();
        debug!(character = %id, entries = log.len(), "Memory session opened");
        Ok(MemorySession {
            store: self,
            id: id.clone(),
            log,
            _guard: guard,
        })
    }

    /// Current log of `id`; empty if none is stored.
    ///
    /// # Errors
    /// Returns the backend's load error.
    pub async fn load(&self, id: &CharacterId) -> Result<MemoryLog> {
        Ok(self.session(id).await?.into_log())
    }

    /// Read-only copy of the stored log without entering the critical
    /// section. Saves are atomic, so this never observes a partial write.
    ///
    /// # Errors
    /// Returns [`HearthError::InvalidCharacterId`] or the backend's load error.
    pub fn snapshot(&self, id: &CharacterId) -> Result<MemoryLog> {
        id.validated()?;
        Ok(self.backend.load(id)?.unwrap_or_default())
    }

    /// Append one entry and persist. Returns the new log.
    ///
    /// # Errors
    /// Returns the backend's load or save error; nothing is stored then.
    pub async fn append(&self, id: &CharacterId, entry: MemoryEntry) -> Result<MemoryLog> {
        let mut session = self.session(id).await?;
        session.append(entry);
        session.persist()?;
        Ok(session.into_log())
    }

    /// Replace the stored log of `id`.
    ///
    /// # Errors
    /// Returns the backend's save error.
    pub async fn persist(&self, id: &CharacterId, log: MemoryLog) -> Result<()> {
        let mut session = self.session(id).await?;
        session.replace(log);
        session.persist()
    }

    /// Add a like to the dialogue turn at `index`. Returns the new count.
    ///
    /// # Errors
    /// Returns [`HearthError::EntryNotFound`] if `index` does not hold a
    /// dialogue turn, or the backend's error.
    pub async fn like(&self, id: &CharacterId, index: usize) -> Result<u32> {
        let mut session = self.session(id).await?;
        let likes = session.log.like(index).ok_or_else(|| HearthError::EntryNotFound {
            character: id.to_string(),
            index,
        })?;
        session.persist()?;
        Ok(likes)
    }

    /// Delete the stored log of `id`. Returns `true` if one existed.
    ///
    /// The character's lock entry is dropped too unless another task is
    /// holding or waiting on it.
    ///
    /// # Errors
    /// Returns the backend's delete error.
    pub async fn reset(&self, id: &CharacterId) -> Result<bool> {
        let session = self.session(id).await?;
        let existed = self.backend.delete(&session.id)?;
        drop(session);
        self.locks.remove_if(id, |_, lock| Arc::strong_count(lock) == 1);
        info!(character = %id, existed, "Memory log reset");
        Ok(existed)
    }

    /// Every character with a stored log.
    ///
    /// # Errors
    /// Returns the backend's listing error.
    pub fn characters(&self) -> Result<Vec<CharacterId>> {
        self.backend.list_characters()
    }
}

/// Exclusive access to one character's log.
///
/// Changes stay in memory until [`persist`](Self::persist) succeeds.
/// Dropping the session releases the character's lock.
pub struct MemorySession<'a> {
    store: &'a MemoryStore,
    id: CharacterId,
    log: MemoryLog,
    _guard: OwnedMutexGuard<()>,
}

impl MemorySession<'_> {
    /// The character this session belongs to.
    #[must_use]
    pub fn id(&self) -> &CharacterId {
        &self.id
    }

    /// The working copy of the log.
    #[must_use]
    pub fn log(&self) -> &MemoryLog {
        &self.log
    }

    /// Mutable working copy of the log.
    pub fn log_mut(&mut self) -> &mut MemoryLog {
        &mut self.log
    }

    /// Append to the working copy.
    pub fn append(&mut self, entry: MemoryEntry) {
        self.log.push(entry);
    }

    /// Swap the working copy for `log`.
    pub fn replace(&mut self, log: MemoryLog) {
        self.log = log;
    }

    /// Write the working copy to the backend.
    ///
    /// # Errors
    /// Returns the backend's save error; the previously stored log stays
    /// in place.
    pub fn persist(&self) -> Result<()> {
        self.store.backend.save(&self.id, &self.log)
    }

    /// Release the lock and keep the working copy.
    #[must_use]
    pub fn into_log(self) -> MemoryLog {
        self.log
    }
}
