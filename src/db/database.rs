//! The database handle and its read/stage operations

use std::borrow::Cow;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use super::config::DbConfig;
use super::errors::{DbError, DbResult};
use super::iter::Iter;
use super::overlay::{Overlay, Pending};
use super::recovery::Recovery;
use super::{OpenMode, PutMode};
use crate::codec::{self, MutableDocument};
use crate::index::CheckpointIndex;
use crate::observability::{log_event, Event};
use crate::storage::layout::{self, chain};
use crate::storage::{ByteStore, FileHeader, FileStore, Trailer};

/// An open keeldb file, or a read-only view of one of its checkpoints.
///
/// A single handle is used by one thread at a time; it can be moved between
/// threads. Historical views returned by [`Database::open_at`] share the
/// handle's file image and never see its staged changes.
#[derive(Debug)]
pub struct Database {
    /// `None` for historical views
    pub(super) store: Option<Box<dyn ByteStore>>,
    pub(super) image: Arc<Vec<u8>>,
    pub(super) header: FileHeader,
    pub(super) current: Option<Trailer>,
    /// Checkpoint ids on the chain, oldest first
    pub(super) chain: Vec<u64>,
    pub(super) index: CheckpointIndex,
    pub(super) overlay: Overlay,
    pub(super) recovery: Recovery,
    pub(super) mode: OpenMode,
    pub(super) config: DbConfig,
    pub(super) location: String,
    /// Set when a failed append could not be cut back off the store. The
    /// store no longer ends where `image` does, so no more commits are taken.
    pub(super) poisoned: bool,
}

/// Summary of a handle's state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DbStats {
    pub checkpoint: u64,
    pub previous_checkpoint: u64,
    pub checkpoints: usize,
    pub documents: usize,
    pub pending_changes: usize,
    pub file_size: u64,
    pub page_size: u32,
    pub recovery: Recovery,
}

impl Database {
    /// Opens the file at `path` with the default configuration.
    pub fn open(path: impl AsRef<Path>, mode: OpenMode) -> DbResult<Self> {
        Self::open_with_config(path, mode, &DbConfig::default())
    }

    /// Opens the file at `path`.
    ///
    /// With [`OpenMode::CreateAndWrite`] a missing or empty file is created
    /// and given a header using `config.page_size`.
    pub fn open_with_config(
        path: impl AsRef<Path>,
        mode: OpenMode,
        config: &DbConfig,
    ) -> DbResult<Self> {
        let path = path.as_ref();
        let store = FileStore::open(
            path,
            mode.is_writable(),
            mode == OpenMode::CreateAndWrite,
        )
        .map_err(|e| {
            log_event!(Event::OpenFailed, path = %path.display(), code = e.code().code(), error = %e, "open failed");
            e
        })?;
        Self::open_store(Box::new(store), mode, config)
    }

    /// Opens a database over any [`ByteStore`].
    pub fn open_store(
        store: Box<dyn ByteStore>,
        mode: OpenMode,
        config: &DbConfig,
    ) -> DbResult<Self> {
        let location = store.location();
        log_event!(Event::OpenBegin, location = %location, ?mode, "opening database");

        Self::load(store, mode, config).map_err(|e| {
            log_event!(Event::OpenFailed, location = %location, code = e.code(), error = %e, "open failed");
            e
        })
    }

    fn load(mut store: Box<dyn ByteStore>, mode: OpenMode, config: &DbConfig) -> DbResult<Self> {
        config.validate()?;
        let location = store.location();

        let mut image = store.read_all()?;

        if image.is_empty() && mode == OpenMode::CreateAndWrite {
            image = FileHeader::new(config.page_size).serialize();
            store.append(&image)?;
            store.sync()?;
        }

        let layout = layout::load(&image)?;
        let page_size = layout.header.page_size;
        let upto = layout.current.map_or(0, |t| t.checkpoint_size);

        let mut ids: Vec<u64> = chain(&image, page_size, upto)?
            .iter()
            .map(|t| t.checkpoint_size)
            .collect();
        ids.reverse();
        let index = CheckpointIndex::build(&image, page_size, upto)?;

        let recovery = Recovery::from_layout(&layout);
        if let Some(damage) = &layout.damage {
            log_event!(
                Event::TailDamageRecovered,
                location = %location,
                checkpoint = upto,
                discarded_bytes = damage.discarded_bytes(),
                reason = %damage.reason,
                "ignoring damaged tail"
            );
        }

        log_event!(
            Event::OpenComplete,
            location = %location,
            checkpoint = upto,
            documents = index.len(),
            damaged = recovery.is_damaged(),
            "database open"
        );

        Ok(Self {
            store: Some(store),
            image: Arc::new(image),
            header: layout.header,
            current: layout.current,
            chain: ids,
            index,
            overlay: Overlay::default(),
            recovery,
            mode,
            config: config.clone(),
            location,
            poisoned: false,
        })
    }

    /// Opens a read-only view of `checkpoint`, which must be on this
    /// handle's chain. `0` gives a view of the empty store.
    pub fn open_at(&self, checkpoint: u64) -> DbResult<Database> {
        let position = if checkpoint == 0 {
            None
        } else {
            Some(
                self.chain
                    .iter()
                    .position(|&id| id == checkpoint)
                    .ok_or(DbError::UnknownCheckpoint(checkpoint))?,
            )
        };

        let page_size = self.header.page_size;
        let current = if checkpoint == 0 {
            None
        } else {
            Some(Trailer::read_ending_at(&self.image, checkpoint, page_size)?)
        };
        let index = CheckpointIndex::build(&self.image, page_size, checkpoint)?;
        let chain = position.map_or_else(Vec::new, |p| self.chain[..=p].to_vec());

        log_event!(
            Event::HistoricalViewOpened,
            location = %self.location,
            checkpoint,
            documents = index.len(),
            "historical view opened"
        );

        Ok(Database {
            store: None,
            image: Arc::clone(&self.image),
            header: self.header,
            current,
            chain,
            index,
            overlay: Overlay::default(),
            recovery: Recovery::Clean,
            mode: OpenMode::ReadOnly,
            config: self.config.clone(),
            location: self.location.clone(),
            poisoned: false,
        })
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Value of `key`, including staged changes.
    pub fn get(&self, key: &[u8]) -> Option<Cow<'_, [u8]>> {
        match self.overlay.get(key) {
            Some(Pending::Removed) => None,
            Some(Pending::Value(bytes)) => Some(Cow::Borrowed(bytes.as_slice())),
            Some(Pending::Mutable(doc)) if doc.is_changed() => Some(Cow::Owned(doc.encode())),
            Some(Pending::Mutable(_)) | None => self.committed(key).map(Cow::Borrowed),
        }
    }

    /// Decoded value of `key`, including staged changes.
    pub fn get_document(&self, key: &[u8]) -> DbResult<Option<Value>> {
        if let Some(Pending::Mutable(doc)) = self.overlay.get(key) {
            return Ok(Some(doc.to_value()));
        }
        match self.get(key) {
            Some(bytes) => Ok(Some(codec::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Whether `key` exists, including staged changes.
    pub fn contains(&self, key: &[u8]) -> bool {
        match self.overlay.get(key) {
            Some(Pending::Removed) => false,
            Some(_) => true,
            None => self.index.contains(key),
        }
    }

    /// Number of live documents, including staged changes.
    pub fn len(&self) -> usize {
        let mut len = self.index.len();
        for (key, pending) in self.overlay.iter() {
            let committed = self.index.contains(key);
            match pending {
                Pending::Removed if committed => len -= 1,
                Pending::Value(_) | Pending::Mutable(_) if !committed => len += 1,
                _ => {}
            }
        }
        len
    }

    /// Whether there are no live documents.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Live documents in ascending key order, staged changes merged in.
    pub fn iter(&self) -> Iter<'_> {
        self.iter_from(&[])
    }

    /// Live documents with keys at or after `start`, ascending.
    pub fn iter_from(&self, start: &[u8]) -> Iter<'_> {
        Iter::new(
            &self.image,
            self.overlay.range_from(start),
            self.index.range_from(start),
        )
    }

    pub(super) fn committed(&self, key: &[u8]) -> Option<&[u8]> {
        self.index.get(key).map(|entry| &self.image[entry.value_range()])
    }

    // =========================================================================
    // Staged mutations
    // =========================================================================

    /// Stages `value` under `key` according to `mode`. Returns false when
    /// the mode's condition was not met and nothing was staged.
    pub fn put(&mut self, key: &[u8], value: &[u8], mode: PutMode) -> DbResult<bool> {
        self.ensure_writable()?;
        let exists = self.contains(key);
        let allowed = match mode {
            PutMode::Insert => !exists,
            PutMode::Update => exists,
            PutMode::Upsert => true,
        };
        if allowed {
            self.overlay
                .stage(key.to_vec(), Pending::Value(value.to_vec()));
        }
        Ok(allowed)
    }

    /// Encodes `document` and stages it like [`Database::put`].
    pub fn put_document(&mut self, key: &[u8], document: &Value, mode: PutMode) -> DbResult<bool> {
        self.put(key, &codec::encode(document), mode)
    }

    /// Returns an editable dictionary for `key`, or `None` if the key does
    /// not exist. Edits are written by the next commit.
    pub fn get_mutable(&mut self, key: &[u8]) -> DbResult<Option<&mut MutableDocument>> {
        self.ensure_writable()?;

        let doc = match self.overlay.get(key) {
            Some(Pending::Mutable(_)) => None,
            Some(Pending::Removed) => return Ok(None),
            Some(Pending::Value(bytes)) => {
                let mut doc = MutableDocument::from_bytes(bytes)?;
                // replaces a staged put, which still has to be written
                doc.mark_changed();
                Some(doc)
            }
            None => match self.committed(key) {
                Some(bytes) => Some(MutableDocument::from_bytes(bytes)?),
                None => return Ok(None),
            },
        };

        if let Some(doc) = doc {
            self.overlay.stage(key.to_vec(), Pending::Mutable(doc));
        }
        Ok(self.overlay.mutable(key))
    }

    /// Stages removal of `key`. Returns false if it did not exist.
    pub fn remove(&mut self, key: &[u8]) -> DbResult<bool> {
        self.ensure_writable()?;
        if !self.contains(key) {
            return Ok(false);
        }
        if self.index.contains(key) {
            self.overlay.stage(key.to_vec(), Pending::Removed);
        } else {
            self.overlay.unstage(key);
        }
        Ok(true)
    }

    /// Discards every staged change.
    pub fn revert_changes(&mut self) {
        let discarded = self.overlay.len();
        self.overlay.clear();
        log_event!(Event::ChangesReverted, location = %self.location, discarded, "staged changes discarded");
    }

    /// Whether a commit would write anything.
    pub fn has_changes(&self) -> bool {
        self.overlay.has_writes()
    }

    pub(super) fn ensure_writable(&self) -> DbResult<()> {
        if self.store.is_none() {
            return Err(DbError::ReadOnly("historical views cannot be modified"));
        }
        if !self.mode.is_writable() {
            return Err(DbError::ReadOnly("database was opened read-only"));
        }
        Ok(())
    }

    // =========================================================================
    // Checkpoints & state
    // =========================================================================

    /// Id of the current checkpoint (0 if nothing was ever committed).
    pub fn checkpoint(&self) -> u64 {
        self.current.map_or(0, |t| t.checkpoint_size)
    }

    /// Id of the checkpoint before the current one (0 if none).
    pub fn previous_checkpoint(&self) -> u64 {
        self.current.map_or(0, |t| t.previous_checkpoint())
    }

    /// Checkpoint ids from newest to oldest.
    pub fn history(&self) -> Vec<u64> {
        self.chain.iter().rev().copied().collect()
    }

    /// Whether the file tail was damaged when this handle was opened.
    pub fn is_damaged(&self) -> bool {
        self.recovery.is_damaged()
    }

    /// Tail state found at open.
    pub fn recovery(&self) -> Recovery {
        self.recovery
    }

    /// Whether this handle is a view of an older checkpoint.
    pub fn is_historical(&self) -> bool {
        self.store.is_none()
    }

    /// Page size recorded in the file header.
    pub fn page_size(&self) -> u32 {
        self.header.page_size
    }

    /// Summary of this handle's state.
    pub fn stats(&self) -> DbStats {
        DbStats {
            checkpoint: self.checkpoint(),
            previous_checkpoint: self.previous_checkpoint(),
            checkpoints: self.chain.len(),
            documents: self.len(),
            pending_changes: self.overlay.len(),
            file_size: self.image.len() as u64,
            page_size: self.header.page_size,
            recovery: self.recovery,
        }
    }
}
