//! Data model for the dagscan CORE (SPEC_FULL.md §3).

use bytes::Bytes;
use chrono::{DateTime, Utc};
use cid::Cid;
use serde::{Deserialize, Serialize};

use crate::errors::DagScanError;

/// Multicodec code for the `raw` codec (leaf bytes).
pub const RAW_CODEC: u64 = 0x55;
/// Multicodec code for the `dag-pb` codec (UnixFS interior/directory nodes).
pub const DAG_PB_CODEC: u64 = 0x70;

pub type FsEntryId = String;
pub type SourceId = String;
pub type UploadId = String;

/// A filesystem entry as seen by the CORE: an opaque reference resolved
/// through the repository. The scan/checksum/discovery step that produces
/// these is external (SPEC_FULL.md §1).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FsEntry {
    pub fs_entry_id: FsEntryId,
    pub source_id: SourceId,
    pub upload_id: UploadId,
    pub path: String,
    pub kind: ScanKind,
    /// Ordered child entries; empty for files.
    pub children: Vec<FsEntryId>,
}

/// Discriminates the two kinds of scan / filesystem entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanKind {
    File,
    Directory,
}

/// The six states a `DAGScan` can occupy (SPEC_FULL.md §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScanState {
    Pending,
    Running,
    AwaitingChildren,
    Completed,
    Failed,
    Canceled,
}

impl ScanState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Canceled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Running => "Running",
            Self::AwaitingChildren => "AwaitingChildren",
            Self::Completed => "Completed",
            Self::Failed => "Failed",
            Self::Canceled => "Canceled",
        }
    }
}

/// The per-entry unit of work (SPEC_FULL.md §3, §4.1).
///
/// Construction is deliberately the only place the §3 invariants
/// (`error_message` iff `Failed`, `cid` iff `Completed`, non-empty
/// `fs_entry_id`) are allowed to be violated; every other mutation goes
/// through `dagscan_scan::transition`, which preserves them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DagScan {
    pub fs_entry_id: FsEntryId,
    pub upload_id: UploadId,
    pub kind: ScanKind,
    pub state: ScanState,
    pub error_message: Option<String>,
    pub cid: Option<Cid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DagScan {
    /// A freshly discovered file scan starts `Pending` (SPEC_FULL.md §3).
    pub fn new_file(fs_entry_id: impl Into<FsEntryId>, upload_id: impl Into<UploadId>) -> Self {
        let now = Utc::now();
        Self {
            fs_entry_id: fs_entry_id.into(),
            upload_id: upload_id.into(),
            kind: ScanKind::File,
            state: ScanState::Pending,
            error_message: None,
            cid: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// A freshly discovered directory scan starts `AwaitingChildren`
    /// (SPEC_FULL.md §3) since it can never build until its children do.
    pub fn new_directory(fs_entry_id: impl Into<FsEntryId>, upload_id: impl Into<UploadId>) -> Self {
        let now = Utc::now();
        Self {
            fs_entry_id: fs_entry_id.into(),
            upload_id: upload_id.into(),
            kind: ScanKind::Directory,
            state: ScanState::AwaitingChildren,
            error_message: None,
            cid: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Validates the §3 invariants. Called by repository implementations
    /// when a record is read back, per the "persistence contract" in
    /// SPEC_FULL.md §4.1.
    pub fn validate(&self) -> Result<(), DagScanError> {
        if self.fs_entry_id.is_empty() {
            return Err(DagScanError::other("DagScan.fs_entry_id must not be empty"));
        }
        let failed = matches!(self.state, ScanState::Failed);
        if failed != self.error_message.is_some() {
            return Err(DagScanError::other(
                "DagScan.error_message must be set iff state is Failed",
            ));
        }
        let completed = matches!(self.state, ScanState::Completed);
        if completed != self.cid.is_some() {
            return Err(DagScanError::other(
                "DagScan.cid must be set iff state is Completed",
            ));
        }
        Ok(())
    }
}

/// A persisted content-addressed block (SPEC_FULL.md §3). Polymorphic over
/// the two shapes the CORE ever produces: a raw leaf and a DAG-PB interior
/// or directory node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    Raw(RawNode),
    UnixFs(UnixFsNode),
}

impl Node {
    pub fn cid(&self) -> Cid {
        match self {
            Node::Raw(n) => n.cid,
            Node::UnixFs(n) => n.cid,
        }
    }

    pub fn size(&self) -> u64 {
        match self {
            Node::Raw(n) => n.size,
            Node::UnixFs(n) => n.size,
        }
    }
}

/// A leaf chunk of file bytes. The bytes themselves are not stored; they
/// are recoverable from `(source_id, path, offset, size)` (SPEC_FULL.md §3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawNode {
    pub cid: Cid,
    pub size: u64,
    pub source_id: SourceId,
    pub path: String,
    pub offset: u64,
}

impl RawNode {
    pub fn new(cid: Cid, size: u64, source_id: SourceId, path: String, offset: u64) -> Result<Self, DagScanError> {
        if cid.codec() != RAW_CODEC {
            return Err(DagScanError::other(format!(
                "RawNode.cid must use the raw codec, got {:#x}",
                cid.codec()
            )));
        }
        Ok(Self {
            cid,
            size,
            source_id,
            path,
            offset,
        })
    }
}

/// An interior protobuf block: either a file-tree interior node or a
/// directory node. Outbound links live in `Link`, not here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnixFsNode {
    pub cid: Cid,
    pub size: u64,
    #[serde(with = "serde_bytes_as_vec")]
    pub ufs_data: Bytes,
}

impl UnixFsNode {
    pub fn new(cid: Cid, size: u64, ufs_data: Bytes) -> Result<Self, DagScanError> {
        if cid.codec() != DAG_PB_CODEC {
            return Err(DagScanError::other(format!(
                "UnixFsNode.cid must use the dag-pb codec, got {:#x}",
                cid.codec()
            )));
        }
        if ufs_data.is_empty() {
            return Err(DagScanError::other("UnixFsNode.ufs_data must not be empty"));
        }
        Ok(Self { cid, size, ufs_data })
    }
}

/// A directed edge between a parent `UnixFsNode` and a child node
/// (SPEC_FULL.md §3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub parent: Cid,
    pub hash: Cid,
    pub name: String,
    pub tsize: u64,
    pub order: u64,
}

impl Link {
    pub fn new(parent: Cid, hash: Cid, name: String, tsize: u64, order: u64) -> Result<Self, DagScanError> {
        if parent.codec() != DAG_PB_CODEC {
            return Err(DagScanError::other(format!(
                "Link.parent must use the dag-pb codec, got {:#x}",
                parent.codec()
            )));
        }
        Ok(Self {
            parent,
            hash,
            name,
            tsize,
            order,
        })
    }
}

/// A child entry of a directory, as handed to the directory producer by
/// the repository (SPEC_FULL.md §4.3, §6.1).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    pub name: String,
    pub hash: Cid,
    pub tsize: u64,
}

mod serde_bytes_as_vec {
    use bytes::Bytes;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(bytes: &Bytes, s: S) -> Result<S::Ok, S::Error> {
        bytes.to_vec().serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Bytes, D::Error> {
        Ok(Bytes::from(Vec::<u8>::deserialize(d)?))
    }
}
