//! Compacted export
//!
//! Writes the live logical state (staged changes included) to a new file
//! holding a header and a single checkpoint with no history. The target is
//! replaced atomically: a failed export leaves whatever was there before.

use std::path::Path;

use super::database::Database;
use super::errors::DbResult;
use crate::crash_point::{maybe_crash, points};
use crate::observability::{log_event, Event};
use crate::storage::io::write_whole_file;
use crate::storage::layout::build_compacted;
use crate::storage::BlockOp;

impl Database {
    /// Writes a compacted copy of this handle's live documents to `path`,
    /// using the same page size.
    pub fn write_to(&self, path: impl AsRef<Path>) -> DbResult<()> {
        let path = path.as_ref();
        log_event!(Event::ExportBegin, location = %self.location, target = %path.display(), "export started");

        self.export(path).map_err(|e| {
            log_event!(
                Event::ExportFailed,
                target = %path.display(),
                code = e.code(),
                error = %e,
                "export failed"
            );
            e
        })
    }

    fn export(&self, path: &Path) -> DbResult<()> {
        let ops: Vec<BlockOp> = self
            .iter()
            .map(|(key, value)| BlockOp::put(key, value.into_owned()))
            .collect();
        let image = build_compacted(self.header.page_size, &ops)?;

        maybe_crash(points::EXPORT_BEFORE_WRITE);

        write_whole_file(path, &image)?;

        log_event!(
            Event::ExportComplete,
            target = %path.display(),
            documents = ops.len(),
            bytes = image.len(),
            "compacted copy written"
        );
        Ok(())
    }
}
