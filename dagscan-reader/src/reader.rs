//! The node reader (SPEC_FULL.md §4.5, dagscan CORE component C5):
//! reverses the block producer by reconstructing a node's exact encoded
//! bytes from its persisted record, either by re-reading the source file
//! (`RawNode`) or by re-encoding a DAG-PB node from stored links
//! (`UnixFsNode`).

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use cid::Cid;
use dagscan_interface::{DagScanError, FileAccessor, Node, Repository};
use dagscan_unixfs::dag_pb::PBNode;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::sync::CancellationToken;

use crate::cache::BlockCache;
use crate::config::ReaderConfig;

trait ReadVerify {
    fn multihash_matches(&self, bytes: &[u8]) -> bool;
}

impl ReadVerify for Cid {
    fn multihash_matches(&self, bytes: &[u8]) -> bool {
        use dagscan_interface::{DAG_PB_CODEC, RAW_CODEC};
        let recomputed = match self.codec() {
            RAW_CODEC => dagscan_unixfs::hashing::raw_cid(bytes),
            DAG_PB_CODEC => dagscan_unixfs::hashing::dag_pb_cid(bytes),
            _ => return false,
        };
        recomputed == *self
    }
}

/// Reconstructs previously-produced block bytes on demand, for clients
/// (e.g. a block-upload shipper retrying later) that need to re-read a
/// block after the fact rather than keep it buffered from emission time.
pub struct NodeReader {
    repo: Arc<dyn Repository>,
    accessor: Arc<dyn FileAccessor>,
    cache: BlockCache,
    config: ReaderConfig,
}

impl NodeReader {
    pub fn new(repo: Arc<dyn Repository>, accessor: Arc<dyn FileAccessor>) -> Self {
        Self::with_config(repo, accessor, ReaderConfig::default())
    }

    pub fn with_config(
        repo: Arc<dyn Repository>,
        accessor: Arc<dyn FileAccessor>,
        config: ReaderConfig,
    ) -> Self {
        Self {
            repo,
            accessor,
            cache: BlockCache::new(config.cache_capacity),
            config,
        }
    }

    /// Returns the exact encoded bytes of `node`, as originally emitted.
    pub async fn get_data(
        &self,
        ctx: &CancellationToken,
        node: &Node,
    ) -> Result<Bytes, DagScanError> {
        let cid = node.cid();
        if let Some(cached) = self.cache.get(&cid) {
            tracing::debug!(%cid, "node reader cache hit");
            return Ok(cached);
        }

        let bytes = match node {
            Node::Raw(raw) => self.read_raw(ctx, raw).await?,
            Node::UnixFs(unixfs) => self.read_unixfs(unixfs).await?,
        };

        if self.config.check_reads {
            self.verify(node, &bytes)?;
        }

        self.cache.put(cid, bytes.clone());
        Ok(bytes)
    }

    async fn read_raw(
        &self,
        ctx: &CancellationToken,
        raw: &dagscan_interface::RawNode,
    ) -> Result<Bytes, DagScanError> {
        if ctx.is_cancelled() {
            return Err(DagScanError::Canceled);
        }
        let mut stream = self
            .accessor
            .open_for_read(ctx, &raw.source_id, &raw.path)
            .await?;
        stream.seek(std::io::SeekFrom::Start(raw.offset)).await?;
        let mut buf = vec![0u8; raw.size as usize];
        stream.read_exact(&mut buf).await?;
        Ok(Bytes::from(buf))
    }

    async fn read_unixfs(
        &self,
        unixfs: &dagscan_interface::UnixFsNode,
    ) -> Result<Bytes, DagScanError> {
        let links = self.repo.links_for_cid(unixfs.cid).await?;
        let mut node = PBNode::with_data(unixfs.ufs_data.clone());
        for link in links {
            node.add_link(Some(link.name), link.hash, link.tsize);
        }
        node.encode().map_err(DagScanError::protobuf)
    }

    fn verify(&self, node: &Node, bytes: &Bytes) -> Result<(), DagScanError> {
        let cid = node.cid();
        if bytes.len() as u64 != node.size() {
            return Err(DagScanError::DataCorrupt {
                cid,
                expected_len: node.size(),
                actual_len: bytes.len(),
            });
        }
        if !cid.multihash_matches(bytes) {
            return Err(DagScanError::DataCorrupt {
                cid,
                expected_len: node.size(),
                actual_len: bytes.len(),
            });
        }
        Ok(())
    }
}
