//! The file accessor contract the CORE consumes (SPEC_FULL.md §6.2).
//!
//! Enumerating the filesystem tree and computing checksums happens
//! upstream of the CORE; this trait only resolves an already-known entry
//! or `(source_id, path)` pair to bytes.

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncSeek};
use tokio_util::sync::CancellationToken;

use crate::errors::DagScanError;
use crate::model::{FsEntryId, SourceId};

/// A stream the file producer reads sequentially; no seeking is required
/// during a scan (SPEC_FULL.md §4.2 step 1).
pub type ScanStream = std::pin::Pin<Box<dyn AsyncRead + Send>>;

/// A stream the node reader can seek into before reading a raw leaf back
/// out (SPEC_FULL.md §4.5).
pub type ReadBackStream = std::pin::Pin<Box<dyn AsyncReadSeek + Send>>;

/// Combines `AsyncRead` and `AsyncSeek` so `ReadBackStream` can name a
/// single trait object.
pub trait AsyncReadSeek: AsyncRead + AsyncSeek {}
impl<T: AsyncRead + AsyncSeek> AsyncReadSeek for T {}

#[async_trait]
pub trait FileAccessor: Send + Sync {
    /// Opens the bytes behind a filesystem entry for scanning, returning
    /// the stream alongside the `(source_id, path)` the entry resolves to
    /// (SPEC_FULL.md §6.2).
    async fn open_for_scan(
        &self,
        ctx: &CancellationToken,
        fs_entry_id: &FsEntryId,
    ) -> Result<(ScanStream, SourceId, String), DagScanError>;

    /// Opens a seekable stream for read-back of previously produced raw
    /// leaves (SPEC_FULL.md §4.5, §6.2).
    async fn open_for_read(
        &self,
        ctx: &CancellationToken,
        source_id: &SourceId,
        path: &str,
    ) -> Result<ReadBackStream, DagScanError>;
}
