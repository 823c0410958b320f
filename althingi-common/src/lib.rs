//! # Althingi Common Library
//!
//! Shared code for the Althingi feed reconciliation tools:
//! - Error types
//! - Configuration loading
//! - Feed timestamp parsing
//! - Database pool and schema bootstrap

pub mod config;
pub mod db;
pub mod error;
pub mod time;

pub use error::{Error, Result};
