//! Construction knobs for a `Driver` (SPEC_FULL.md §10 "config/builder
//! surface"): a plain struct with a `Default` impl, no CLI parsing or
//! file-based loading (both remain out of scope).

/// Process-wide settings for a `Driver` (SPEC_FULL.md §5: "`UnixFS.
/// DefaultLinksPerBlock` is a process-wide setting of the UnixFS
/// builder; set once at startup").
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Chunk size file bytes are cut into (SPEC_FULL.md §4.2). Defaults to
    /// `dagscan_interface::DEFAULT_BLOCK_SIZE` (1 MiB).
    pub block_size: usize,
    /// Fan-out of a single UnixFS interior or directory node before a
    /// taller tree (file) or HAMT shard (directory) is required
    /// (SPEC_FULL.md §4.2, §4.3). Defaults to
    /// `dagscan_interface::DEFAULT_LINKS_PER_BLOCK` (1024).
    pub links_per_block: usize,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            block_size: dagscan_interface::DEFAULT_BLOCK_SIZE,
            links_per_block: dagscan_interface::DEFAULT_LINKS_PER_BLOCK,
        }
    }
}
