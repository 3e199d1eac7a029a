//! # dagscan-interface
//!
//! Shared data model, repository contract, file accessor contract and error
//! taxonomy for the dagscan CORE (SPEC_FULL.md §3, §6, §7).
//!
//! This crate has no opinion on *how* scans are built or driven — see
//! `dagscan-scan`, `dagscan-unixfs` and `dagscan-driver` for that — it only
//! fixes the vocabulary every other crate in the workspace shares.

pub mod errors;
pub mod file_accessor;
pub mod model;
pub mod repository;

pub use errors::DagScanError;
pub use file_accessor::{AsyncReadSeek, FileAccessor, ReadBackStream, ScanStream};
pub use model::{
    DagScan, DirectoryEntry, FsEntry, FsEntryId, Link, Node, RawNode, ScanKind, ScanState,
    SourceId, UnixFsNode, UploadId, DAG_PB_CODEC, RAW_CODEC,
};
pub use repository::{NewLink, Repository};

/// Number of children a single UnixFS interior or directory node may
/// reference before a taller tree (file) or HAMT shard (directory) is
/// required (SPEC_FULL.md §4.2, §4.3, §5).
pub const DEFAULT_LINKS_PER_BLOCK: usize = 1024;

/// The fixed chunk size file bytes are cut into (SPEC_FULL.md §4.2): 1 MiB.
pub const DEFAULT_BLOCK_SIZE: usize = 1 << 20;
