//! The repository contract the CORE consumes (SPEC_FULL.md §6.1).
//!
//! Durable storage of scans, nodes and links is explicitly external to the
//! CORE (SPEC_FULL.md §1); this trait is the seam. `dagscan-store-sled`
//! ships a reference, embedded implementation so the CORE can be exercised
//! without a network or a relational database.

use async_trait::async_trait;
use cid::Cid;

use crate::errors::DagScanError;
use crate::model::{DagScan, DirectoryEntry, Link, RawNode, ScanState, SourceId, UnixFsNode, UploadId};

/// A link not yet persisted, as handed to `Repository::create_links` by a
/// block producer (SPEC_FULL.md §4.2, §4.3).
#[derive(Debug, Clone, PartialEq)]
pub struct NewLink {
    pub name: String,
    pub tsize: u64,
    pub hash: Cid,
}

/// Durable storage for scans, nodes and links (SPEC_FULL.md §6.1).
///
/// `find_or_create_*` methods must report whether the call inserted a new
/// record so the emit callback fires exactly once per unique CID
/// (SPEC_FULL.md §4.2 dedup property).
#[async_trait]
pub trait Repository: Send + Sync {
    /// Persists `scan`'s current state, error, cid and `updated_at`. The
    /// CORE never mutates any other field once a scan has been created.
    async fn update_dag_scan(&self, scan: &DagScan) -> Result<(), DagScanError>;

    /// All scans for `upload_id` whose state is one of `states`, as a
    /// point-in-time snapshot (SPEC_FULL.md §9 open question).
    async fn scans_for_upload_by_status(
        &self,
        upload_id: &UploadId,
        states: &[ScanState],
    ) -> Result<Vec<DagScan>, DagScanError>;

    /// The immediate child scans of a directory scan.
    async fn child_scans(&self, dir_scan: &DagScan) -> Result<Vec<DagScan>, DagScanError>;

    /// The name/root-cid/tsize of each child entry of a directory, used by
    /// the directory producer (SPEC_FULL.md §4.3).
    async fn directory_links(&self, dir_scan: &DagScan) -> Result<Vec<DirectoryEntry>, DagScanError>;

    /// Finds an existing `RawNode` by cid, or inserts a new one. The first
    /// `(source_id, path, offset)` seen for a given cid is retained even if
    /// later calls report a different location for the same bytes.
    async fn find_or_create_raw_node(
        &self,
        cid: Cid,
        size: u64,
        source_id: SourceId,
        path: String,
        offset: u64,
    ) -> Result<(RawNode, bool), DagScanError>;

    /// Finds an existing `UnixFsNode` by cid, or inserts a new one.
    async fn find_or_create_unixfs_node(
        &self,
        cid: Cid,
        size: u64,
        ufs_data: bytes::Bytes,
    ) -> Result<(UnixFsNode, bool), DagScanError>;

    /// Persists `links` as children of `parent`, in list order (`order` is
    /// assigned 0-based by position). Insert-only: nodes and links are
    /// never mutated or deleted by the CORE (SPEC_FULL.md §3).
    async fn create_links(&self, parent: Cid, links: &[NewLink]) -> Result<(), DagScanError>;

    /// The outbound links of `parent`, ordered by `order`.
    async fn links_for_cid(&self, parent: Cid) -> Result<Vec<Link>, DagScanError>;
}
