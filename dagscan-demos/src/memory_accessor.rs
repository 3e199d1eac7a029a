//! An in-memory `FileAccessor` test double (SPEC_FULL.md §1 expansion):
//! feeds bytes to the file producer and node reader without a real
//! filesystem, so the CORE can be exercised and demonstrated in isolation.
//! Not a production file accessor — a real one resolves `fs_entry_id` to
//! an actual file handle via whatever catalogs the upstream scan already
//! wrote down.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use dagscan_interface::{
    DagScanError, FileAccessor, FsEntryId, ReadBackStream, ScanStream, SourceId,
};
use tokio_util::sync::CancellationToken;

/// Maps `fs_entry_id -> (source_id, path, bytes)`. `open_for_scan` looks
/// entries up by `fs_entry_id`; `open_for_read` looks the same bytes up by
/// `(source_id, path)`, mirroring how a real accessor would resolve a raw
/// leaf's read-back location independently of the entry that produced it.
#[derive(Default)]
pub struct InMemoryFileAccessor {
    by_entry: Mutex<HashMap<FsEntryId, (SourceId, String, Vec<u8>)>>,
}

impl InMemoryFileAccessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `fs_entry_id` as resolving to `bytes` at `(source_id,
    /// path)`. Must be called before the entry's scan is driven.
    pub fn add_file(
        &self,
        fs_entry_id: impl Into<FsEntryId>,
        source_id: impl Into<SourceId>,
        path: impl Into<String>,
        bytes: Vec<u8>,
    ) {
        self.by_entry
            .lock()
            .unwrap()
            .insert(fs_entry_id.into(), (source_id.into(), path.into(), bytes));
    }
}

#[async_trait]
impl FileAccessor for InMemoryFileAccessor {
    async fn open_for_scan(
        &self,
        _ctx: &CancellationToken,
        fs_entry_id: &FsEntryId,
    ) -> Result<(ScanStream, SourceId, String), DagScanError> {
        let (source_id, path, bytes) = self
            .by_entry
            .lock()
            .unwrap()
            .get(fs_entry_id)
            .cloned()
            .ok_or_else(|| {
                DagScanError::other(format!("no file registered for fs_entry_id {fs_entry_id}"))
            })?;
        Ok((Box::pin(std::io::Cursor::new(bytes)), source_id, path))
    }

    async fn open_for_read(
        &self,
        _ctx: &CancellationToken,
        source_id: &SourceId,
        path: &str,
    ) -> Result<ReadBackStream, DagScanError> {
        let bytes = self
            .by_entry
            .lock()
            .unwrap()
            .values()
            .find(|(sid, p, _)| sid == source_id && p == path)
            .map(|(_, _, bytes)| bytes.clone())
            .ok_or_else(|| {
                DagScanError::other(format!("no file registered at {source_id}:{path}"))
            })?;
        Ok(Box::pin(std::io::Cursor::new(bytes)))
    }
}
