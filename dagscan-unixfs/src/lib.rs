//! # dagscan-unixfs
//!
//! UnixFS block production (dagscan CORE components C2, C3): chunking
//! a source file into raw leaves, folding leaves into a balanced UnixFS
//! file tree, building directory nodes from already-completed children,
//! and the DAG-PB/protobuf wire format both shapes are encoded with.

pub mod chunker;
pub mod dag_pb;
pub mod directory_producer;
pub mod emit;
pub mod file_producer;
pub mod hashing;
pub mod pb;
pub mod sink;

#[cfg(test)]
pub(crate) mod testutil;

pub use directory_producer::produce_directory;
pub use emit::{EmitCallback, NoopEmit};
pub use file_producer::produce_file;
