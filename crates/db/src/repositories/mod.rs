//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` (or an open transaction) as the first argument.

pub mod import_job_repo;
pub mod record_outcome_repo;
pub mod team_member_repo;

pub use import_job_repo::ImportJobRepo;
pub use record_outcome_repo::RecordOutcomeRepo;
pub use team_member_repo::TeamMemberRepo;
