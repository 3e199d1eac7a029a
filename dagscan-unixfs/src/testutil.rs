//! In-memory `Repository`/`FileAccessor`/`EmitCallback` fakes shared by the
//! producer test modules. Not a reference `Repository` implementation —
//! see `dagscan-store-sled` for that; this one exists purely to exercise
//! the producers without a database.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use cid::Cid;
use dagscan_interface::{
    DagScan, DagScanError, DirectoryEntry, FileAccessor, FsEntryId, Link, Node, NewLink,
    RawNode, ReadBackStream, Repository, ScanStream, SourceId, UnixFsNode, UploadId, ScanState,
};
use tokio_util::sync::CancellationToken;

use crate::emit::EmitCallback;

#[derive(Default)]
pub struct InMemoryRepository {
    raw_nodes: Mutex<HashMap<Cid, RawNode>>,
    unixfs_nodes: Mutex<HashMap<Cid, UnixFsNode>>,
    links: Mutex<HashMap<Cid, Vec<Link>>>,
    directory_entries: Mutex<HashMap<FsEntryId, Vec<DirectoryEntry>>>,
    scans: Mutex<HashMap<FsEntryId, DagScan>>,
}

impl InMemoryRepository {
    pub fn raw_node_count(&self) -> usize {
        self.raw_nodes.lock().unwrap().len()
    }

    pub fn unixfs_node_count(&self) -> usize {
        self.unixfs_nodes.lock().unwrap().len()
    }

    pub fn links_for(&self, parent: Cid) -> Vec<Link> {
        self.links.lock().unwrap().get(&parent).cloned().unwrap_or_default()
    }

    pub fn set_directory_entries(&self, fs_entry_id: &str, entries: Vec<DirectoryEntry>) {
        self.directory_entries
            .lock()
            .unwrap()
            .insert(fs_entry_id.to_string(), entries);
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn update_dag_scan(&self, scan: &DagScan) -> Result<(), DagScanError> {
        self.scans
            .lock()
            .unwrap()
            .insert(scan.fs_entry_id.clone(), scan.clone());
        Ok(())
    }

    async fn scans_for_upload_by_status(
        &self,
        upload_id: &UploadId,
        states: &[ScanState],
    ) -> Result<Vec<DagScan>, DagScanError> {
        Ok(self
            .scans
            .lock()
            .unwrap()
            .values()
            .filter(|s| &s.upload_id == upload_id && states.contains(&s.state))
            .cloned()
            .collect())
    }

    async fn child_scans(&self, _dir_scan: &DagScan) -> Result<Vec<DagScan>, DagScanError> {
        Ok(Vec::new())
    }

    async fn directory_links(&self, dir_scan: &DagScan) -> Result<Vec<DirectoryEntry>, DagScanError> {
        Ok(self
            .directory_entries
            .lock()
            .unwrap()
            .get(&dir_scan.fs_entry_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn find_or_create_raw_node(
        &self,
        cid: Cid,
        size: u64,
        source_id: SourceId,
        path: String,
        offset: u64,
    ) -> Result<(RawNode, bool), DagScanError> {
        let mut nodes = self.raw_nodes.lock().unwrap();
        if let Some(existing) = nodes.get(&cid) {
            return Ok((existing.clone(), false));
        }
        let node = RawNode::new(cid, size, source_id, path, offset)?;
        nodes.insert(cid, node.clone());
        Ok((node, true))
    }

    async fn find_or_create_unixfs_node(
        &self,
        cid: Cid,
        size: u64,
        ufs_data: Bytes,
    ) -> Result<(UnixFsNode, bool), DagScanError> {
        let mut nodes = self.unixfs_nodes.lock().unwrap();
        if let Some(existing) = nodes.get(&cid) {
            return Ok((existing.clone(), false));
        }
        let node = UnixFsNode::new(cid, size, ufs_data)?;
        nodes.insert(cid, node.clone());
        Ok((node, true))
    }

    async fn create_links(&self, parent: Cid, new_links: &[NewLink]) -> Result<(), DagScanError> {
        let mut links = self.links.lock().unwrap();
        let entry = links.entry(parent).or_default();
        if !entry.is_empty() {
            return Ok(());
        }
        for (order, l) in new_links.iter().enumerate() {
            entry.push(Link::new(parent, l.hash, l.name.clone(), l.tsize, order as u64)?);
        }
        Ok(())
    }

    async fn links_for_cid(&self, parent: Cid) -> Result<Vec<Link>, DagScanError> {
        Ok(self.links_for(parent))
    }
}

/// A `FileAccessor` that always serves the same in-memory bytes,
/// regardless of which entry is requested.
pub struct StaticAccessor {
    data: Vec<u8>,
}

impl StaticAccessor {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }
}

#[async_trait]
impl FileAccessor for StaticAccessor {
    async fn open_for_scan(
        &self,
        _ctx: &CancellationToken,
        fs_entry_id: &FsEntryId,
    ) -> Result<(ScanStream, SourceId, String), DagScanError> {
        let cursor = std::io::Cursor::new(self.data.clone());
        Ok((Box::pin(cursor), "source-1".to_string(), fs_entry_id.clone()))
    }

    async fn open_for_read(
        &self,
        _ctx: &CancellationToken,
        _source_id: &SourceId,
        _path: &str,
    ) -> Result<ReadBackStream, DagScanError> {
        let cursor = std::io::Cursor::new(self.data.clone());
        Ok(Box::pin(cursor))
    }
}

#[derive(Default)]
pub struct RecordingEmit {
    emitted: Mutex<Vec<(Cid, usize)>>,
}

impl RecordingEmit {
    pub fn emitted(&self) -> Vec<(Cid, usize)> {
        self.emitted.lock().unwrap().clone()
    }

    pub fn emitted_count(&self) -> usize {
        self.emitted.lock().unwrap().len()
    }
}

#[async_trait]
impl EmitCallback for RecordingEmit {
    async fn emit(&self, node: &Node, block_bytes: &Bytes) -> Result<(), DagScanError> {
        self.emitted
            .lock()
            .unwrap()
            .push((node.cid(), block_bytes.len()));
        Ok(())
    }
}
