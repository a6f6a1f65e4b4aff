//! Commit: turn the overlay into one appended checkpoint
//!
//! Write order:
//!
//! 1. data blocks, then fsync
//! 2. padding and trailer, then fsync
//!
//! The trailer is what makes a checkpoint visible, so a crash at any point
//! leaves the previous trailer as the newest valid one. An append that fails
//! is cut back off the file and the overlay is kept for a retry. If the cut
//! itself fails the handle stops taking commits until the file is reopened.

use std::sync::Arc;

use super::database::Database;
use super::errors::{DbError, DbResult};
use crate::crash_point::{maybe_crash, points};
use crate::observability::{log_event, Event};
use crate::storage::layout::build_checkpoint;
use crate::storage::{ByteStore, PendingCheckpoint, StorageResult};

impl Database {
    /// Writes every staged change as a new checkpoint and returns its id.
    ///
    /// When nothing needs writing no checkpoint is appended and the current
    /// id is returned. On failure the staged changes are kept.
    pub fn commit_changes(&mut self) -> DbResult<u64> {
        self.ensure_writable()?;
        if self.poisoned {
            return Err(DbError::Poisoned {
                location: self.location.clone(),
                checkpoint: self.checkpoint(),
            });
        }

        let ops = self.overlay.staged_ops();
        if ops.is_empty() {
            // only unchanged mutable documents, if anything
            self.overlay.clear();
            log_event!(Event::CommitSkipped, location = %self.location, checkpoint = self.checkpoint(), "nothing to commit");
            return Ok(self.checkpoint());
        }

        let file_len = self.image.len() as u64;
        log_event!(
            Event::CommitBegin,
            location = %self.location,
            blocks = ops.len(),
            file_len,
            "commit started"
        );

        let pending = build_checkpoint(file_len, self.header.page_size, self.current.as_ref(), &ops)?;
        let sync = self.config.sync_on_commit;

        let Some(store) = self.store.as_mut() else {
            return Err(DbError::ReadOnly("historical views cannot be modified"));
        };

        if let Err(e) = append_checkpoint(store.as_mut(), &pending, sync) {
            if let Err(truncate_err) = store.truncate(file_len) {
                self.poisoned = true;
                log_event!(
                    Event::CommitFailed,
                    location = %self.location,
                    file_len,
                    error = %truncate_err,
                    "could not cut failed append back off the file"
                );
            }
            log_event!(
                Event::CommitFailed,
                location = %self.location,
                code = e.code().code(),
                error = %e,
                "commit failed, changes kept"
            );
            return Err(e.into());
        }

        maybe_crash(points::COMMIT_AFTER_TRAILER);

        let image = Arc::make_mut(&mut self.image);
        image.extend_from_slice(&pending.blocks);
        image.extend_from_slice(&pending.tail);

        self.index.apply(&self.image, &pending.trailer)?;
        let checkpoint = pending.trailer.checkpoint_size;
        self.current = Some(pending.trailer);
        self.chain.push(checkpoint);
        self.overlay.clear();

        log_event!(
            Event::CommitComplete,
            location = %self.location,
            checkpoint,
            previous = pending.trailer.previous_checkpoint(),
            blocks = ops.len(),
            bytes = pending.len(),
            "checkpoint appended"
        );

        Ok(checkpoint)
    }
}

fn append_checkpoint(
    store: &mut dyn ByteStore,
    pending: &PendingCheckpoint,
    sync: bool,
) -> StorageResult<()> {
    maybe_crash(points::COMMIT_BEFORE_BLOCKS);

    store.append(&pending.blocks)?;
    if sync {
        store.sync()?;
    }

    maybe_crash(points::COMMIT_AFTER_BLOCKS);

    store.append(&pending.tail)?;
    if sync {
        store.sync()?;
    }

    Ok(())
}
