//! The "link sink" (SPEC_FULL.md §4.6): the single place a DAG-PB node's
//! bytes, CID and outbound links are all derived from the same encode
//! call, rather than encoding once to get bytes and separately
//! reconstructing links from caller-supplied data that might disagree
//! with what was actually written to the block.

use bytes::Bytes;
use cid::Cid;
use dagscan_interface::{DagScanError, NewLink};
use prost::Message;

use crate::hashing::dag_pb_cid;
use crate::dag_pb::PBNode;
use crate::pb;

/// A link not yet attached to a parent: the child's declared name, its
/// CID, and the cumulative encoded size of its subtree (used as the
/// DAG-PB link's `tsize`).
#[derive(Debug, Clone)]
pub struct ChildLink {
    pub name: String,
    pub cid: Cid,
    /// Cumulative subtree size in bytes, used as the link's protobuf
    /// `tsize` (SPEC_FULL.md §3 `Link.tsize`).
    pub tsize: u64,
    /// Cumulative bytes of actual file content in the subtree, used as
    /// this child's contribution to the parent's `blocksizes` entry. For
    /// directory entries this is the same as `tsize`'s source file size.
    pub filesize: u64,
}

/// The result of encoding one DAG-PB node: its CID, its fully-encoded
/// bytes (what gets handed to the emit callback), the UnixFS `Data`
/// portion alone (what gets persisted as `UnixFsNode::ufs_data`), and the
/// links ready for `Repository::create_links`.
pub struct EncodedNode {
    pub cid: Cid,
    pub block_bytes: Bytes,
    pub ufs_data: Bytes,
    pub links: Vec<NewLink>,
    /// This node's own subtree size as seen by whatever references it:
    /// its own encoded byte length plus the cumulative tsize of every
    /// child.
    pub tsize: u64,
    pub filesize: u64,
}

/// Encodes a UnixFS `File`-type interior node over `children` (already
/// ordered; the caller decides leaf vs. nested-interior order).
pub fn encode_file_interior(children: &[ChildLink]) -> Result<EncodedNode, DagScanError> {
    let filesize: u64 = children.iter().map(|c| c.filesize).sum();
    let blocksizes = children.iter().map(|c| c.filesize).collect();
    let data = pb::Data {
        r#type: pb::data::DataType::File as i32,
        filesize: Some(filesize),
        blocksizes,
        ..Default::default()
    };
    encode(data, children, filesize)
}

/// Encodes a UnixFS `Directory`-type node over `children` (already sorted
/// by name by the caller).
pub fn encode_directory(children: &[ChildLink]) -> Result<EncodedNode, DagScanError> {
    let data = pb::Data {
        r#type: pb::data::DataType::Directory as i32,
        ..Default::default()
    };
    // Directories carry no meaningful filesize; the entries' own file
    // sizes are recoverable by resolving each link.
    encode(data, children, 0)
}

fn encode(data: pb::Data, children: &[ChildLink], filesize: u64) -> Result<EncodedNode, DagScanError> {
    let mut data_bytes = Vec::new();
    data.encode(&mut data_bytes)
        .map_err(|e| DagScanError::protobuf(e.to_string()))?;
    let ufs_data = Bytes::from(data_bytes);

    let mut node = PBNode::with_data(ufs_data.clone());
    for child in children {
        node.add_link(Some(child.name.clone()), child.cid, child.tsize);
    }
    let block_bytes = node.encode().map_err(DagScanError::protobuf)?;
    let cid = dag_pb_cid(&block_bytes);

    let links = children
        .iter()
        .map(|c| NewLink {
            name: c.name.clone(),
            tsize: c.tsize,
            hash: c.cid,
        })
        .collect();

    let children_tsize: u64 = children.iter().map(|c| c.tsize).sum();
    let tsize = block_bytes.len() as u64 + children_tsize;

    Ok(EncodedNode {
        cid,
        block_bytes,
        ufs_data,
        links,
        tsize,
        filesize,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hashing::raw_cid;

    fn leaf(name: &str, data: &[u8]) -> ChildLink {
        ChildLink {
            name: name.to_string(),
            cid: raw_cid(data),
            tsize: data.len() as u64,
            filesize: data.len() as u64,
        }
    }

    #[test]
    fn file_interior_sums_filesize_and_records_blocksizes() {
        let children = vec![leaf("", b"aaaa"), leaf("", b"bb")];
        let encoded = encode_file_interior(&children).unwrap();
        assert_eq!(encoded.filesize, 6);
        assert_eq!(encoded.links.len(), 2);
        assert_eq!(encoded.tsize, encoded.block_bytes.len() as u64 + 6);
    }

    #[test]
    fn directory_preserves_link_order() {
        let children = vec![leaf("a.txt", b"1"), leaf("b.txt", b"22")];
        let encoded = encode_directory(&children).unwrap();
        assert_eq!(encoded.links[0].name, "a.txt");
        assert_eq!(encoded.links[1].name, "b.txt");
        assert_eq!(encoded.filesize, 0);
    }

    #[test]
    fn same_children_produce_same_cid() {
        let children = vec![leaf("", b"x")];
        let a = encode_file_interior(&children).unwrap();
        let b = encode_file_interior(&children).unwrap();
        assert_eq!(a.cid, b.cid);
    }
}
