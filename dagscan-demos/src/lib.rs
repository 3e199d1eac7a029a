//! # dagscan-demos
//!
//! An in-memory `FileAccessor` test double (SPEC_FULL.md §1 expansion) plus
//! runnable binaries (`src/bin/`) that wire the whole dagscan CORE together
//! end to end: a `sled`-backed `Repository`, the in-memory accessor, the
//! driver, and the node reader.

pub mod memory_accessor;

pub use memory_accessor::InMemoryFileAccessor;
