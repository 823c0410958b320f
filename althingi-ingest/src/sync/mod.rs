//! Reconciliation engine
//!
//! One synchronization procedure per entity kind. Each procedure resolves
//! its parent scope first (recursively, enforcing the dependency order
//! Parliament → reference entities → persons/seats → issues → children →
//! sessions/agendas → votes → speeches), consults the run-scoped memo
//! cache, fetches the remote representation, applies a minimal diff, and
//! converges remotely enumerable child sets by deleting local extras.

pub mod categories;
pub mod committee_agendas;
pub mod committees;
pub mod constituencies;
pub mod context;
pub mod issues;
pub mod ministers;
pub mod parliaments;
pub mod parties;
pub mod persons;
pub mod presidents;
pub mod sessions;
pub mod speeches;
pub mod vote_castings;

pub use context::{SyncContext, SyncStats};
