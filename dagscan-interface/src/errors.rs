//! Error taxonomy for the dagscan CORE (SPEC_FULL.md §7).

use cid::Cid;
use thiserror::Error;

/// Errors that can occur while driving a scan to completion or reading
/// back a previously produced block.
#[derive(Error, Debug)]
pub enum DagScanError {
    /// Cancellation token fired mid-operation.
    #[error("operation canceled")]
    Canceled,

    /// File read/open failure surfaced by a `FileAccessor`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Storage backend failure. Persisted scan state may be stale; callers
    /// should treat this as fatal for the current driver invocation and
    /// recover via `Restart` on the next run.
    #[error("repository error: {0}")]
    Repo(String),

    /// A state-machine method was invoked out of order.
    #[error("invalid transition: {attempted} is not valid from state {from}")]
    InvalidTransition {
        from: &'static str,
        attempted: &'static str,
    },

    /// Read-verification mismatch (`NodeReader` in `check_reads` mode).
    #[error("data corrupt: {cid} expected {expected_len} bytes, got {actual_len}")]
    DataCorrupt {
        cid: Cid,
        expected_len: u64,
        actual_len: usize,
    },

    /// A directory has more entries than fit in a single DAG-PB node and
    /// HAMT sharding is not implemented by the reference producer
    /// (SPEC_FULL.md §4.3).
    #[error("directory has {count} entries, exceeding the {limit} supported without HAMT sharding")]
    TooManyEntries { count: usize, limit: usize },

    /// Protobuf encode/decode failure for a UnixFS or DAG-PB node.
    #[error("protobuf error: {0}")]
    Protobuf(String),

    /// Everything else, with a short human-readable explanation.
    #[error("{message}")]
    Other { message: String },
}

impl DagScanError {
    pub fn repo(message: impl Into<String>) -> Self {
        Self::Repo(message.into())
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }

    pub fn protobuf(message: impl Into<String>) -> Self {
        Self::Protobuf(message.into())
    }

    /// `true` for errors that should abort the driver's upload loop rather
    /// than just failing the current scan (SPEC_FULL.md §7).
    pub fn aborts_driver(&self) -> bool {
        matches!(self, Self::Repo(_))
    }
}
