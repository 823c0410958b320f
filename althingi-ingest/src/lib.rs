//! althingi-ingest library interface
//!
//! Reconciles the Althingi XML feed into a local SQLite store and derives
//! per-issue legislative progress. Exposed as a library for integration
//! testing; the `althingi-ingest` binary is a thin driver on top.

pub mod archive;
pub mod db;
pub mod feed;
pub mod status;
pub mod sync;
pub mod xml;

pub use althingi_common::{Error, Result};
