//! The file block producer (SPEC_FULL.md §4.2, dagscan CORE component C2).
//!
//! Reads a source file sequentially through its `FileAccessor`, cutting it
//! into `DEFAULT_BLOCK_SIZE` raw leaves and folding them bottom-up into a
//! balanced UnixFS file tree, never buffering more than one chunk's worth
//! of file bytes plus one level's worth of child links at a time.

use cid::Cid;
use dagscan_interface::{
    DagScan, DagScanError, FileAccessor, Node, Repository, DEFAULT_BLOCK_SIZE,
    DEFAULT_LINKS_PER_BLOCK,
};
use tokio_util::sync::CancellationToken;

use crate::chunker::ChunkReader;
use crate::hashing::raw_cid;
use crate::emit::EmitCallback;
use crate::sink::{encode_file_interior, ChildLink};

/// Builds the DAG for a single file scan and returns its root CID.
///
/// The empty file is a special case: its single (empty) leaf *is* the
/// root, with no UnixFS wrapper (SPEC_FULL.md §8 scenario S1). Every other
/// file, even one that fits in a single leaf, is wrapped in at least one
/// `File`-type interior node (SPEC_FULL.md §8 scenario S2).
pub async fn produce_file(
    repo: &dyn Repository,
    accessor: &dyn FileAccessor,
    ctx: &CancellationToken,
    scan: &DagScan,
    emit: &dyn EmitCallback,
) -> Result<Cid, DagScanError> {
    let (stream, source_id, path) = accessor.open_for_scan(ctx, &scan.fs_entry_id).await?;
    let mut reader = ChunkReader::new(stream, DEFAULT_BLOCK_SIZE);

    let mut leaves: Vec<ChildLink> = Vec::new();

    loop {
        if ctx.is_cancelled() {
            return Err(DagScanError::Canceled);
        }
        let offset = reader.position();
        let chunk = match reader.next_chunk().await? {
            Some(chunk) => chunk,
            None => break,
        };
        let cid = raw_cid(&chunk);
        let size = chunk.len() as u64;
        let (node, created) = repo
            .find_or_create_raw_node(cid, size, source_id.clone(), path.clone(), offset)
            .await?;
        if created {
            emit.emit(&Node::Raw(node), &chunk).await?;
        }
        leaves.push(ChildLink {
            name: String::new(),
            cid,
            tsize: size,
            filesize: size,
        });
    }

    let total_size: u64 = leaves.iter().map(|l| l.filesize).sum();
    if leaves.len() == 1 && total_size == 0 {
        return Ok(leaves[0].cid);
    }

    let mut level = leaves;
    loop {
        if ctx.is_cancelled() {
            return Err(DagScanError::Canceled);
        }
        level = build_level(repo, emit, &level).await?;
        if level.len() == 1 {
            return Ok(level[0].cid);
        }
    }
}

/// Groups `children` into `DEFAULT_LINKS_PER_BLOCK`-sized runs and emits
/// one `File`-type interior node per run, returning an entry per node for
/// the next level up.
async fn build_level(
    repo: &dyn Repository,
    emit: &dyn EmitCallback,
    children: &[ChildLink],
) -> Result<Vec<ChildLink>, DagScanError> {
    let mut next = Vec::with_capacity(children.len().div_ceil(DEFAULT_LINKS_PER_BLOCK));
    for group in children.chunks(DEFAULT_LINKS_PER_BLOCK) {
        let encoded = encode_file_interior(group)?;
        let (node, created) = repo
            .find_or_create_unixfs_node(
                encoded.cid,
                encoded.block_bytes.len() as u64,
                encoded.ufs_data.clone(),
            )
            .await?;
        if created {
            if !encoded.links.is_empty() {
                repo.create_links(encoded.cid, &encoded.links).await?;
            }
            emit.emit(&Node::UnixFs(node), &encoded.block_bytes).await?;
        }
        next.push(ChildLink {
            name: String::new(),
            cid: encoded.cid,
            tsize: encoded.tsize,
            filesize: encoded.filesize,
        });
    }
    Ok(next)
}
