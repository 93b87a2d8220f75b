//! Domain logic for roster bulk imports.
//!
//! Pure validation and state rules plus the ports the pipeline talks through.
//! Nothing in this crate touches a database or the network.

pub mod csv_import;
pub mod error;
pub mod gateway;
pub mod import_batch;
pub mod import_job;
#[cfg(any(test, feature = "test-support"))]
pub mod memory;
pub mod ports;
pub mod preview;
pub mod retry;
pub mod team_member;
pub mod types;
