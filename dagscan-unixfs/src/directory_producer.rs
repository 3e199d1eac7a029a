//! The directory block producer (SPEC_FULL.md §4.3, dagscan CORE
//! component C3). Unlike the file producer there is no balanced tree to
//! build: a directory node can reference at most `DEFAULT_LINKS_PER_BLOCK`
//! children, since HAMT sharding is not implemented (SPEC_FULL.md §4.3,
//! §10) — a directory beyond that fan-out fails with `TooManyEntries`
//! rather than silently dropping entries.

use cid::Cid;
use dagscan_interface::{DagScan, DagScanError, Node, Repository, DEFAULT_LINKS_PER_BLOCK};

use crate::emit::EmitCallback;
use crate::sink::{encode_directory, ChildLink};

/// Builds the directory node for `scan` from its already-completed
/// children's links and returns its CID.
pub async fn produce_directory(
    repo: &dyn Repository,
    scan: &DagScan,
    emit: &dyn EmitCallback,
) -> Result<Cid, DagScanError> {
    let mut entries = repo.directory_links(scan).await?;
    if entries.len() > DEFAULT_LINKS_PER_BLOCK {
        return Err(DagScanError::TooManyEntries {
            count: entries.len(),
            limit: DEFAULT_LINKS_PER_BLOCK,
        });
    }
    entries.sort_by(|a, b| a.name.cmp(&b.name));

    let children: Vec<ChildLink> = entries
        .into_iter()
        .map(|e| ChildLink {
            name: e.name,
            cid: e.hash,
            tsize: e.tsize,
            filesize: e.tsize,
        })
        .collect();

    let encoded = encode_directory(&children)?;
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

    Ok(encoded.cid)
}
