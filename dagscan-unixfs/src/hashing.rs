//! CID computation for the two node shapes the producer emits
//! (SPEC_FULL.md §3). Hashing goes through `multihash-codetable`'s
//! `Code::Sha2_256` to build valid multihashes.

use cid::Cid;
use dagscan_interface::{DAG_PB_CODEC, RAW_CODEC};
use multihash_codetable::{Code, MultihashDigest};

/// CID of a raw leaf block: codec `raw` (0x55), sha2-256 over the leaf
/// bytes exactly as they appear in the source file.
pub fn raw_cid(data: &[u8]) -> Cid {
    Cid::new_v1(RAW_CODEC, Code::Sha2_256.digest(data))
}

/// CID of a DAG-PB interior or directory node: codec `dag-pb` (0x70),
/// sha2-256 over the fully-encoded protobuf bytes.
pub fn dag_pb_cid(encoded: &[u8]) -> Cid {
    Cid::new_v1(DAG_PB_CODEC, Code::Sha2_256.digest(encoded))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_cid_uses_raw_codec() {
        let cid = raw_cid(b"hello");
        assert_eq!(cid.codec(), RAW_CODEC);
    }

    #[test]
    fn dag_pb_cid_uses_dag_pb_codec() {
        let cid = dag_pb_cid(b"hello");
        assert_eq!(cid.codec(), DAG_PB_CODEC);
    }

    #[test]
    fn same_bytes_hash_identically() {
        assert_eq!(raw_cid(b"same"), raw_cid(b"same"));
        assert_ne!(raw_cid(b"same"), raw_cid(b"different"));
    }

    #[test]
    fn empty_bytes_cid_is_deterministic_and_distinct_from_nonempty() {
        assert_eq!(raw_cid(b""), raw_cid(b""));
        assert_ne!(raw_cid(b""), raw_cid(b"x"));
    }
}
