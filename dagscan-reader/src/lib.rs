//! # dagscan-reader
//!
//! The node reader (dagscan CORE component C5, SPEC_FULL.md §4.5):
//! reconstructs a previously-produced block's exact encoded bytes from its
//! persisted record, behind a bounded LRU cache and an optional
//! read-verification mode.

pub mod cache;
pub mod config;
pub mod reader;

pub use config::ReaderConfig;
pub use reader::NodeReader;
