//! Generated from `proto/unixfs.proto` by `build.rs`. Re-exported as `pb`
//! so callers write `pb::Data` / `pb::data::DataType`, matching upstream
//! UnixFS tooling's naming.

include!(concat!(env!("OUT_DIR"), "/unixfs_pb.rs"));
