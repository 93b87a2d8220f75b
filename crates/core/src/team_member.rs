//! Team member records: the validated input shape and the persisted entry.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

/// Employment category of a team member.
///
/// The serialized form is the canonical CSV literal (`FullTime`, `PartTime`,
/// `Intern`). Matching is exact and case-sensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EmploymentType {
    FullTime,
    PartTime,
    Intern,
}

impl EmploymentType {
    /// Every accepted value, in display order.
    pub const ALL: [EmploymentType; 3] = [Self::FullTime, Self::PartTime, Self::Intern];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FullTime => "FullTime",
            Self::PartTime => "PartTime",
            Self::Intern => "Intern",
        }
    }

    /// Parse an exact canonical literal. Returns `None` for anything else,
    /// including differently cased or hyphenated spellings.
    pub fn parse(literal: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == literal)
    }
}

impl std::fmt::Display for EmploymentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A row that has passed shape, enum, and required-field checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatedRecord {
    pub name: String,
    pub email: String,
    pub role: String,
    pub employment_type: EmploymentType,
}

impl ValidatedRecord {
    /// Build a record from free-text fields, trimming each one.
    ///
    /// Used by the single-record create path; the CSV path builds records
    /// through [`crate::csv_import::validate_rows`] instead.
    pub fn new(
        name: &str,
        email: &str,
        role: &str,
        employment_type: EmploymentType,
    ) -> Result<Self, CoreError> {
        let record = Self {
            name: name.trim().to_string(),
            email: email.trim().to_string(),
            role: role.trim().to_string(),
            employment_type,
        };
        if record.has_empty_field() {
            return Err(CoreError::Validation(
                "name, email and role must not be empty".to_string(),
            ));
        }
        Ok(record)
    }

    /// True when name, email or role is empty after trimming.
    pub fn has_empty_field(&self) -> bool {
        self.name.trim().is_empty() || self.email.trim().is_empty() || self.role.trim().is_empty()
    }
}

/// A team member persisted by the roster store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RosterEntry {
    pub id: DbId,
    pub name: String,
    pub email: String,
    pub role: String,
    pub employment_type: EmploymentType,
    pub created_at: Timestamp,
}
