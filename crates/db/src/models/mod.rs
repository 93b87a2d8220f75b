//! Row structs for the import tables.
//!
//! Each submodule contains a `FromRow` struct matching the database row and
//! the conversion into the corresponding `roster-core` type.

pub mod import_job;
pub mod record_outcome;
pub mod team_member;
