//! Table command service.
//!
//! `TablesService` is the single write path to a table document: it reads
//! the current table, runs the transition rules against a working copy, and
//! persists the outcome as targeted field patches. Callers (the session
//! gateway, the round driver) never touch the store directly.

pub mod service;

pub use service::{CreatedTable, TablesService};
