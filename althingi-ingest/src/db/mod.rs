//! Database operations, one module per entity kind
//!
//! Every module follows the same shape: a record struct mirroring the table,
//! `find_*` lookups returning `Option`, `insert_*`, partial updates through
//! `althingi_common::db::fields`, and child-set listings for reconciliation.

pub mod categories;
pub mod committee_agendas;
pub mod committees;
pub mod constituencies;
pub mod documents;
pub mod issue_steps;
pub mod issues;
pub mod ministers;
pub mod parliaments;
pub mod parties;
pub mod persons;
pub mod presidents;
pub mod proposers;
pub mod reviews;
pub mod seats;
pub mod sessions;
pub mod speeches;
pub mod vote_castings;
