//! The emit callback contract file and directory producers invoke for
//! every newly-created node (SPEC_FULL.md §4.2, §4.6). Separated from
//! `dagscan-interface::Repository` because persistence and "a caller was
//! told about this bytes-and-CID pair" are different concerns: a caller
//! might want to push emitted blocks onto a bitswap wantlist, a CAR
//! writer, or nothing at all.

use async_trait::async_trait;
use bytes::Bytes;
use dagscan_interface::{DagScanError, Node};

#[async_trait]
pub trait EmitCallback: Send + Sync {
    /// Called exactly once per unique CID the producer creates, never for
    /// a CID `find_or_create_*` reports as already existing.
    async fn emit(&self, node: &Node, block_bytes: &Bytes) -> Result<(), DagScanError>;
}

/// An `EmitCallback` that does nothing; useful when a caller only cares
/// about the returned root CID and relies on the repository alone for
/// persistence.
pub struct NoopEmit;

#[async_trait]
impl EmitCallback for NoopEmit {
    async fn emit(&self, _node: &Node, _block_bytes: &Bytes) -> Result<(), DagScanError> {
        Ok(())
    }
}
