//! # dagscan-store-sled
//!
//! An embedded, `sled`-backed reference implementation of
//! `dagscan_interface::Repository` (SPEC_FULL.md §6.1): one `sled::Tree`
//! per record kind, keyed by a formatted string, records serialized as
//! JSON.
//!
//! This is a reference store for tests and the bundled demo binaries, not
//! a production deployment target — a production `Repository` would more
//! likely sit on top of whatever relational store already tracks the
//! filesystem tree being uploaded.

use async_trait::async_trait;
use bytes::Bytes;
use cid::Cid;
use dagscan_interface::{
    DagScan, DagScanError, DirectoryEntry, Link, NewLink, RawNode, Repository, ScanState,
    UnixFsNode, UploadId,
};
use sled::{Db, Tree};

pub struct SledRepository {
    scans: Tree,
    raw_nodes: Tree,
    unixfs_nodes: Tree,
    links: Tree,
    children: Tree,
    names: Tree,
    _db: Db,
}

impl SledRepository {
    /// Opens (creating if absent) a repository backed by the directory at
    /// `path`.
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self, DagScanError> {
        let db = sled::open(path)
            .map_err(|e| DagScanError::repo(format!("failed to open repository: {e}")))?;
        Self::from_db(db)
    }

    /// Opens an ephemeral, disk-backed-but-deleted-on-close repository.
    /// Used by tests and by the bundled demo binaries.
    pub fn temporary() -> Result<Self, DagScanError> {
        let db = sled::Config::new()
            .temporary(true)
            .open()
            .map_err(|e| DagScanError::repo(format!("failed to create temporary repository: {e}")))?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> Result<Self, DagScanError> {
        let open_tree = |name: &str| {
            db.open_tree(name)
                .map_err(|e| DagScanError::repo(format!("failed to open tree {name}: {e}")))
        };
        Ok(Self {
            scans: open_tree("scans")?,
            raw_nodes: open_tree("raw_nodes")?,
            unixfs_nodes: open_tree("unixfs_nodes")?,
            links: open_tree("links")?,
            children: open_tree("children")?,
            names: open_tree("names")?,
            _db: db,
        })
    }

    /// Registers `dir_fs_entry_id`'s children as `(fs_entry_id, name)`
    /// pairs, in directory order, for `child_scans` and `directory_links`
    /// to resolve. Filesystem discovery lives outside the CORE
    /// (SPEC_FULL.md §1); this reference store has nowhere else to learn
    /// a directory's membership, so a caller must tell it explicitly
    /// before driving the parent scan.
    pub fn register_children(
        &self,
        dir_fs_entry_id: &str,
        children: &[(String, String)],
    ) -> Result<(), DagScanError> {
        let ids: Vec<&str> = children.iter().map(|(id, _)| id.as_str()).collect();
        let value = serde_json::to_vec(&ids).map_err(|e| DagScanError::repo(e.to_string()))?;
        self.children
            .insert(dir_fs_entry_id.as_bytes(), value)
            .map_err(|e| DagScanError::repo(e.to_string()))?;
        for (id, name) in children {
            self.names
                .insert(id.as_bytes(), name.as_bytes())
                .map_err(|e| DagScanError::repo(e.to_string()))?;
        }
        Ok(())
    }

    fn get_scan(&self, fs_entry_id: &str) -> Result<Option<DagScan>, DagScanError> {
        match self
            .scans
            .get(fs_entry_id.as_bytes())
            .map_err(|e| DagScanError::repo(e.to_string()))?
        {
            Some(bytes) => Ok(Some(
                serde_json::from_slice(&bytes).map_err(|e| DagScanError::repo(e.to_string()))?,
            )),
            None => Ok(None),
        }
    }

    /// The cumulative size of `cid`'s subtree (SPEC_FULL.md §3 `Link.tsize`,
    /// §4.3), not just the node's own stored `size`.
    ///
    /// A raw leaf's subtree is itself, so its `tsize` is its `size`. A
    /// `UnixFsNode`'s subtree is its own encoded bytes plus every outbound
    /// link's `tsize` — and each of those links' `tsize` already holds its
    /// *target's* cumulative subtree size, because `create_links` persists
    /// exactly the `EncodedNode::tsize` the producer computed when that
    /// child was built (`sink.rs`'s `encode`). So one level of outbound
    /// links is enough; no recursion is needed.
    fn cumulative_tsize(&self, cid: Cid) -> Result<u64, DagScanError> {
        let key = cid.to_bytes();
        if let Some(bytes) = self
            .raw_nodes
            .get(&key)
            .map_err(|e| DagScanError::repo(e.to_string()))?
        {
            let node: RawNode =
                serde_json::from_slice(&bytes).map_err(|e| DagScanError::repo(e.to_string()))?;
            return Ok(node.size);
        }
        if let Some(bytes) = self
            .unixfs_nodes
            .get(&key)
            .map_err(|e| DagScanError::repo(e.to_string()))?
        {
            let node: UnixFsNode =
                serde_json::from_slice(&bytes).map_err(|e| DagScanError::repo(e.to_string()))?;
            let mut tsize = node.size;
            let prefix = link_prefix(cid);
            for item in self.links.scan_prefix(&prefix) {
                let (_, value) = item.map_err(|e| DagScanError::repo(e.to_string()))?;
                let link: Link =
                    serde_json::from_slice(&value).map_err(|e| DagScanError::repo(e.to_string()))?;
                tsize += link.tsize;
            }
            return Ok(tsize);
        }
        Err(DagScanError::other(format!(
            "node {cid} not found when computing directory entry size"
        )))
    }

    fn name_for(&self, fs_entry_id: &str) -> Result<String, DagScanError> {
        match self
            .names
            .get(fs_entry_id.as_bytes())
            .map_err(|e| DagScanError::repo(e.to_string()))?
        {
            Some(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
            None => Ok(fs_entry_id.to_string()),
        }
    }
}

fn link_key(parent: Cid, order: u64) -> Vec<u8> {
    format!("{parent}:{order:020}").into_bytes()
}

fn link_prefix(parent: Cid) -> Vec<u8> {
    format!("{parent}:").into_bytes()
}

#[async_trait]
impl Repository for SledRepository {
    async fn update_dag_scan(&self, scan: &DagScan) -> Result<(), DagScanError> {
        scan.validate()?;
        let value = serde_json::to_vec(scan).map_err(|e| DagScanError::repo(e.to_string()))?;
        self.scans
            .insert(scan.fs_entry_id.as_bytes(), value)
            .map_err(|e| DagScanError::repo(e.to_string()))?;
        Ok(())
    }

    async fn scans_for_upload_by_status(
        &self,
        upload_id: &UploadId,
        states: &[ScanState],
    ) -> Result<Vec<DagScan>, DagScanError> {
        let mut out = Vec::new();
        for item in self.scans.iter() {
            let (_, value) = item.map_err(|e| DagScanError::repo(e.to_string()))?;
            let scan: DagScan =
                serde_json::from_slice(&value).map_err(|e| DagScanError::repo(e.to_string()))?;
            if &scan.upload_id == upload_id && states.contains(&scan.state) {
                out.push(scan);
            }
        }
        Ok(out)
    }

    async fn child_scans(&self, dir_scan: &DagScan) -> Result<Vec<DagScan>, DagScanError> {
        let raw = self
            .children
            .get(dir_scan.fs_entry_id.as_bytes())
            .map_err(|e| DagScanError::repo(e.to_string()))?;
        let ids: Vec<String> = match raw {
            Some(bytes) => {
                serde_json::from_slice(&bytes).map_err(|e| DagScanError::repo(e.to_string()))?
            }
            None => Vec::new(),
        };
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(scan) = self.get_scan(&id)? {
                out.push(scan);
            }
        }
        Ok(out)
    }

    async fn directory_links(&self, dir_scan: &DagScan) -> Result<Vec<DirectoryEntry>, DagScanError> {
        let children = self.child_scans(dir_scan).await?;
        let mut out = Vec::with_capacity(children.len());
        for child in children {
            let cid = child.cid.ok_or_else(|| {
                DagScanError::other(format!(
                    "child scan {} has no cid but is referenced by directory {}",
                    child.fs_entry_id, dir_scan.fs_entry_id
                ))
            })?;
            let tsize = self.cumulative_tsize(cid)?;
            out.push(DirectoryEntry {
                name: self.name_for(&child.fs_entry_id)?,
                hash: cid,
                tsize,
            });
        }
        Ok(out)
    }

    async fn find_or_create_raw_node(
        &self,
        cid: Cid,
        size: u64,
        source_id: String,
        path: String,
        offset: u64,
    ) -> Result<(RawNode, bool), DagScanError> {
        let key = cid.to_bytes();
        if let Some(existing) = self
            .raw_nodes
            .get(&key)
            .map_err(|e| DagScanError::repo(e.to_string()))?
        {
            let node: RawNode =
                serde_json::from_slice(&existing).map_err(|e| DagScanError::repo(e.to_string()))?;
            return Ok((node, false));
        }
        let node = RawNode::new(cid, size, source_id, path, offset)?;
        let value = serde_json::to_vec(&node).map_err(|e| DagScanError::repo(e.to_string()))?;
        self.raw_nodes
            .insert(&key, value)
            .map_err(|e| DagScanError::repo(e.to_string()))?;
        Ok((node, true))
    }

    async fn find_or_create_unixfs_node(
        &self,
        cid: Cid,
        size: u64,
        ufs_data: Bytes,
    ) -> Result<(UnixFsNode, bool), DagScanError> {
        let key = cid.to_bytes();
        if let Some(existing) = self
            .unixfs_nodes
            .get(&key)
            .map_err(|e| DagScanError::repo(e.to_string()))?
        {
            let node: UnixFsNode =
                serde_json::from_slice(&existing).map_err(|e| DagScanError::repo(e.to_string()))?;
            return Ok((node, false));
        }
        let node = UnixFsNode::new(cid, size, ufs_data)?;
        let value = serde_json::to_vec(&node).map_err(|e| DagScanError::repo(e.to_string()))?;
        self.unixfs_nodes
            .insert(&key, value)
            .map_err(|e| DagScanError::repo(e.to_string()))?;
        Ok((node, true))
    }

    async fn create_links(&self, parent: Cid, new_links: &[NewLink]) -> Result<(), DagScanError> {
        let existing = self.links_for_cid(parent).await?;
        if !existing.is_empty() {
            let same = existing.len() == new_links.len()
                && existing.iter().zip(new_links.iter()).all(|(e, l)| {
                    e.hash == l.hash && e.name == l.name && e.tsize == l.tsize
                });
            if same {
                return Ok(());
            }
            return Err(DagScanError::repo(format!(
                "create_links called twice for {parent} with differing link sets"
            )));
        }
        for (order, link) in new_links.iter().enumerate() {
            let record = Link::new(parent, link.hash, link.name.clone(), link.tsize, order as u64)?;
            let value = serde_json::to_vec(&record).map_err(|e| DagScanError::repo(e.to_string()))?;
            self.links
                .insert(link_key(parent, order as u64), value)
                .map_err(|e| DagScanError::repo(e.to_string()))?;
        }
        Ok(())
    }

    async fn links_for_cid(&self, parent: Cid) -> Result<Vec<Link>, DagScanError> {
        let prefix = link_prefix(parent);
        let mut out = Vec::new();
        for item in self.links.scan_prefix(&prefix) {
            let (_, value) = item.map_err(|e| DagScanError::repo(e.to_string()))?;
            out.push(serde_json::from_slice(&value).map_err(|e| DagScanError::repo(e.to_string()))?);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dagscan_interface::RAW_CODEC;
    use multihash_codetable::{Code, MultihashDigest};

    fn leaf_cid(seed: u8) -> Cid {
        Cid::new_v1(RAW_CODEC, Code::Sha2_256.digest(&[seed]))
    }

    #[tokio::test]
    async fn find_or_create_raw_node_is_idempotent() {
        let repo = SledRepository::temporary().unwrap();
        let cid = leaf_cid(1);
        let (first, created_first) = repo
            .find_or_create_raw_node(cid, 1, "src".into(), "a".into(), 0)
            .await
            .unwrap();
        assert!(created_first);

        let (second, created_second) = repo
            .find_or_create_raw_node(cid, 1, "different-source".into(), "b".into(), 99)
            .await
            .unwrap();
        assert!(!created_second);
        assert_eq!(first, second, "the first writer's location wins");
    }

    #[tokio::test]
    async fn create_links_is_idempotent_on_identical_resubmission() {
        let repo = SledRepository::temporary().unwrap();
        let parent = Cid::new_v1(dagscan_interface::DAG_PB_CODEC, Code::Sha2_256.digest(b"parent"));
        let links = vec![NewLink {
            name: "a".into(),
            tsize: 4,
            hash: leaf_cid(1),
        }];

        repo.create_links(parent, &links).await.unwrap();
        repo.create_links(parent, &links).await.unwrap(); // no error, no duplicate

        let stored = repo.links_for_cid(parent).await.unwrap();
        assert_eq!(stored.len(), 1);
    }

    #[tokio::test]
    async fn create_links_rejects_a_conflicting_resubmission() {
        let repo = SledRepository::temporary().unwrap();
        let parent = Cid::new_v1(dagscan_interface::DAG_PB_CODEC, Code::Sha2_256.digest(b"parent"));
        repo.create_links(
            parent,
            &[NewLink {
                name: "a".into(),
                tsize: 4,
                hash: leaf_cid(1),
            }],
        )
        .await
        .unwrap();

        let err = repo
            .create_links(
                parent,
                &[NewLink {
                    name: "a".into(),
                    tsize: 999,
                    hash: leaf_cid(1),
                }],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DagScanError::Repo(_)));
    }

    #[tokio::test]
    async fn directory_links_resolves_child_scans_in_registered_order() {
        let repo = SledRepository::temporary().unwrap();

        let mut a = DagScan::new_file("child-a", "upload-1");
        a.cid = None;
        // Drive to completion by hand; the driver crate owns the real
        // transition sequence.
        a.state = ScanState::Completed;
        a.cid = Some(leaf_cid(1));
        repo.update_dag_scan(&a).await.unwrap();
        repo.find_or_create_raw_node(leaf_cid(1), 1, "s".into(), "a".into(), 0)
            .await
            .unwrap();

        let mut b = DagScan::new_file("child-b", "upload-1");
        b.state = ScanState::Completed;
        b.cid = Some(leaf_cid(2));
        repo.update_dag_scan(&b).await.unwrap();
        repo.find_or_create_raw_node(leaf_cid(2), 1, "s".into(), "b".into(), 0)
            .await
            .unwrap();

        repo.register_children(
            "dir-1",
            &[
                ("child-a".into(), "a.txt".into()),
                ("child-b".into(), "b.txt".into()),
            ],
        )
        .unwrap();

        let dir_scan = DagScan::new_directory("dir-1", "upload-1");
        let entries = repo.directory_links(&dir_scan).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "a.txt");
        assert_eq!(entries[1].name, "b.txt");
    }

    #[tokio::test]
    async fn directory_links_reports_the_cumulative_subtree_size_not_the_roots_own_block_size() {
        let repo = SledRepository::temporary().unwrap();

        // A two-leaf file: its interior node's own encoded bytes are tiny,
        // but the subtree underneath it is 2_000_000 bytes of file content.
        let leaf_a = leaf_cid(1);
        let leaf_b = leaf_cid(2);
        repo.find_or_create_raw_node(leaf_a, 1_000_000, "s".into(), "big.bin".into(), 0)
            .await
            .unwrap();
        repo.find_or_create_raw_node(leaf_b, 1_000_000, "s".into(), "big.bin".into(), 1_000_000)
            .await
            .unwrap();

        let interior = Cid::new_v1(
            dagscan_interface::DAG_PB_CODEC,
            Code::Sha2_256.digest(b"interior"),
        );
        repo.find_or_create_unixfs_node(interior, 64, Bytes::from_static(b"\x08\x02"))
            .await
            .unwrap();
        repo.create_links(
            interior,
            &[
                NewLink {
                    name: String::new(),
                    tsize: 1_000_000,
                    hash: leaf_a,
                },
                NewLink {
                    name: String::new(),
                    tsize: 1_000_000,
                    hash: leaf_b,
                },
            ],
        )
        .await
        .unwrap();

        let mut file_scan = DagScan::new_file("big.bin", "upload-1");
        file_scan.state = ScanState::Completed;
        file_scan.cid = Some(interior);
        repo.update_dag_scan(&file_scan).await.unwrap();

        repo.register_children("dir-1", &[("big.bin".into(), "big.bin".into())])
            .unwrap();

        let dir_scan = DagScan::new_directory("dir-1", "upload-1");
        let entries = repo.directory_links(&dir_scan).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(
            entries[0].tsize,
            64 + 2_000_000,
            "tsize must be the cumulative subtree size, not the interior node's own 64 stored bytes"
        );
    }

    #[tokio::test]
    async fn scans_for_upload_by_status_filters_by_both_fields() {
        let repo = SledRepository::temporary().unwrap();
        let mut pending = DagScan::new_file("f1", "upload-1");
        repo.update_dag_scan(&pending).await.unwrap();

        let mut other_upload = DagScan::new_file("f2", "upload-2");
        repo.update_dag_scan(&other_upload).await.unwrap();

        pending.state = ScanState::Running;
        repo.update_dag_scan(&pending).await.unwrap();

        let running = repo
            .scans_for_upload_by_status(&"upload-1".to_string(), &[ScanState::Running])
            .await
            .unwrap();
        assert_eq!(running.len(), 1);
        assert_eq!(running[0].fs_entry_id, "f1");
        let _ = other_upload;
    }
}
