//! # dagscan-driver
//!
//! The upload driver (dagscan CORE component C4, SPEC_FULL.md §4.4): pulls
//! runnable scans for an upload from the repository, executes file scans
//! through the file block producer and directory scans through the
//! directory block producer, promotes directories out of
//! `AwaitingChildren` once every child has completed, and recovers
//! interrupted work on restart.

pub mod config;
pub mod driver;

pub use config::DriverConfig;
pub use driver::Driver;
