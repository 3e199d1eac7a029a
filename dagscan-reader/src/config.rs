//! Construction knobs for a `NodeReader` (SPEC_FULL.md §4.5, §10).

/// Defaults match SPEC_FULL.md §4.5/§5: a 256-entry strict-LRU cache,
/// read-verification off by default (it costs a full re-hash per read).
#[derive(Debug, Clone, Copy)]
pub struct ReaderConfig {
    /// Capacity of the CID-keyed LRU cache (SPEC_FULL.md §5).
    pub cache_capacity: usize,
    /// When `true`, every `get_data` call re-verifies `bytes.len() ==
    /// node.size` and `multihash(bytes) == node.cid`'s multihash,
    /// returning `DataCorrupt` on mismatch (SPEC_FULL.md §4.5).
    pub check_reads: bool,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            cache_capacity: 256,
            check_reads: false,
        }
    }
}
