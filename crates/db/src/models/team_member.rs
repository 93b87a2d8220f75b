//! Rows of the `team_members` table.

use roster_core::team_member::{EmploymentType, RosterEntry};
use roster_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A row from the `team_members` table.
#[derive(Debug, Clone, FromRow)]
pub struct TeamMemberRow {
    pub id: DbId,
    pub name: String,
    pub email: String,
    pub role: String,
    pub employment_type: String,
    pub import_job_id: Option<DbId>,
    pub import_row_index: Option<i32>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl TeamMemberRow {
    /// `None` if `employment_type` holds a literal outside the canonical set.
    pub fn into_entry(self) -> Option<RosterEntry> {
        Some(RosterEntry {
            id: self.id,
            employment_type: EmploymentType::parse(&self.employment_type)?,
            name: self.name,
            email: self.email,
            role: self.role,
            created_at: self.created_at,
        })
    }
}
