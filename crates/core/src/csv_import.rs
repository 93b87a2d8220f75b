//! Parse-then-validate for uploaded team member CSV files.
//!
//! This module has no I/O and no ambient state: identical input bytes always
//! produce the identical result.
//!
//! Expected layout, one record per line:
//!
//! ```text
//! name,email,role,employmentType      <- header, always discarded
//! Jane,jane@x.com,Eng,FullTime
//! Sam,sam@x.com,QA,Intern
//! ```

use crate::team_member::{EmploymentType, ValidatedRecord};

/// Number of cells every data row must carry.
pub const EXPECTED_CELLS: usize = 4;

/// One tokenised CSV record and the physical (1-based) line it started on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    pub line: u64,
    pub cells: Vec<String>,
}

impl RawRow {
    pub fn new(line: u64, cells: Vec<String>) -> Self {
        Self { line, cells }
    }

    fn is_blank(&self) -> bool {
        self.cells.iter().all(|c| c.trim().is_empty())
    }
}

/// Why an upload was refused. Exactly one error is reported per file.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ImportValidationError {
    #[error("File could not be read as CSV: {0}")]
    Unreadable(String),

    #[error("Row {line} is missing required fields (name, email, role, employmentType)")]
    WrongFieldCount { line: u64, found: usize },

    #[error(
        "Row {line} has invalid employmentType: \"{value}\". \
         Must be \"FullTime\", \"PartTime\", or \"Intern\""
    )]
    InvalidEmploymentType { line: u64, value: String },

    #[error("Row {first_line} has an empty required field ({count} rows are missing required fields)")]
    MissingFieldValues { first_line: u64, count: usize },
}

impl ImportValidationError {
    /// Line the error points at, if it concerns a specific row.
    pub fn line(&self) -> Option<u64> {
        match self {
            Self::Unreadable(_) => None,
            Self::WrongFieldCount { line, .. } | Self::InvalidEmploymentType { line, .. } => {
                Some(*line)
            }
            Self::MissingFieldValues { first_line, .. } => Some(*first_line),
        }
    }
}

/// Tokenise comma-separated bytes into rows, keeping line numbers.
///
/// Records may have any number of cells; shape is checked by
/// [`validate_rows`]. Fully empty lines are skipped by the tokenizer but
/// still count towards the line numbers of later rows.
pub fn parse_rows(input: &[u8]) -> Result<Vec<RawRow>, ImportValidationError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(input);

    let mut rows = Vec::new();
    let mut record = csv::StringRecord::new();
    loop {
        let offset = reader.position().byte() as usize;
        let more = reader
            .read_record(&mut record)
            .map_err(|e| ImportValidationError::Unreadable(e.to_string()))?;
        if !more {
            break;
        }
        let cells = record.iter().map(str::to_string).collect();
        rows.push(RawRow::new(line_at(input, offset), cells));
    }
    Ok(rows)
}

/// Physical (1-based) line of the first record starting at or after
/// `offset`.
///
/// The tokenizer resumes mid-terminator after a CRLF and swallows empty
/// lines into the next record, so line terminators at `offset` are skipped
/// first. `\n`, `\r\n` and a lone `\r` each end one line.
fn line_at(input: &[u8], offset: usize) -> u64 {
    let offset = offset.min(input.len());
    let start = input[offset..]
        .iter()
        .position(|b| !matches!(b, b'\r' | b'\n'))
        .map_or(input.len(), |n| offset + n);

    let head = &input[..start];
    let breaks = head
        .iter()
        .enumerate()
        .filter(|&(i, &b)| b == b'\n' || (b == b'\r' && head.get(i + 1) != Some(&b'\n')))
        .count();
    1 + breaks as u64
}

/// Turn tokenised rows into validated records, or the first reason not to.
///
/// - The first row is a header and is always dropped.
/// - Rows whose cells are all blank are ignored.
/// - Shape and employment type are checked row by row and stop at the first
///   violation.
/// - Rows with an empty name, email or role are then reported together as
///   one count-based error naming the first such line.
pub fn validate_rows(rows: &[RawRow]) -> Result<Vec<ValidatedRecord>, ImportValidationError> {
    let mut records = Vec::new();
    let mut lines = Vec::new();

    for row in rows.iter().skip(1).filter(|r| !r.is_blank()) {
        records.push(check_row(row)?);
        lines.push(row.line);
    }

    let mut empty = records
        .iter()
        .zip(&lines)
        .filter(|(record, _)| record.has_empty_field())
        .map(|(_, line)| *line);

    if let Some(first_line) = empty.next() {
        return Err(ImportValidationError::MissingFieldValues {
            first_line,
            count: 1 + empty.count(),
        });
    }

    Ok(records)
}

/// Parse and validate an uploaded file in one step.
pub fn validate_csv(input: &[u8]) -> Result<Vec<ValidatedRecord>, ImportValidationError> {
    let rows = parse_rows(input)?;
    validate_rows(&rows)
}

fn check_row(row: &RawRow) -> Result<ValidatedRecord, ImportValidationError> {
    let [name, email, role, employment] = row.cells.as_slice() else {
        return Err(ImportValidationError::WrongFieldCount {
            line: row.line,
            found: row.cells.len(),
        });
    };

    let literal = employment.trim();
    let employment_type = EmploymentType::parse(literal).ok_or_else(|| {
        ImportValidationError::InvalidEmploymentType {
            line: row.line,
            value: literal.to_string(),
        }
    })?;

    Ok(ValidatedRecord {
        name: name.trim().to_string(),
        email: email.trim().to_string(),
        role: role.trim().to_string(),
        employment_type,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    const HEADER: &str = "name,email,role,employmentType";

    fn file(rows: &[&str]) -> Vec<u8> {
        let mut lines = vec![HEADER];
        lines.extend_from_slice(rows);
        lines.join("\n").into_bytes()
    }

    #[test]
    fn valid_rows_are_returned_in_input_order() {
        let input = file(&["Jane,jane@x.com,Eng,FullTime", "Sam,sam@x.com,QA,Intern"]);
        let records = validate_csv(&input).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name, "Jane");
        assert_eq!(records[0].employment_type, EmploymentType::FullTime);
        assert_eq!(records[1].name, "Sam");
        assert_eq!(records[1].employment_type, EmploymentType::Intern);
    }

    #[test]
    fn first_row_is_discarded_even_if_it_looks_like_data() {
        let input = b"Jane,jane@x.com,Eng,FullTime\nSam,sam@x.com,QA,Intern";
        let records = validate_csv(input).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "Sam");
    }

    #[test]
    fn first_row_is_discarded_even_if_malformed() {
        let input = b"garbage\nSam,sam@x.com,QA,Intern";
        assert_eq!(validate_csv(input).unwrap().len(), 1);
    }

    #[test]
    fn illegal_employment_type_names_line_and_value() {
        let input = file(&["Jane,jane@x.com,Eng,FullTime", "Bob,bob@x.com,Ops,Contractor"]);
        let err = validate_csv(&input).unwrap_err();

        assert_matches!(
            &err,
            ImportValidationError::InvalidEmploymentType { line: 3, value } if value == "Contractor"
        );
        let message = err.to_string();
        assert!(message.contains("Row 3"));
        assert!(message.contains("\"Contractor\""));
    }

    #[test]
    fn hyphenated_spelling_is_rejected() {
        let input = file(&["Jane,jane@x.com,Eng,Full-time"]);
        assert_matches!(
            validate_csv(&input),
            Err(ImportValidationError::InvalidEmploymentType { line: 2, .. })
        );
    }

    #[test]
    fn short_row_names_its_line() {
        let input = file(&[
            "Jane,jane@x.com,Eng,FullTime",
            "Sam,sam@x.com,QA,Intern",
            "Ann,ann@x.com,PM",
        ]);
        let err = validate_csv(&input).unwrap_err();

        assert_eq!(err, ImportValidationError::WrongFieldCount { line: 4, found: 3 });
        assert!(err.to_string().contains("Row 4 is missing required fields"));
    }

    #[test]
    fn extra_cells_are_a_shape_violation() {
        let input = file(&["Jane,jane@x.com,Eng,FullTime,extra"]);
        assert_matches!(
            validate_csv(&input),
            Err(ImportValidationError::WrongFieldCount { line: 2, found: 5 })
        );
    }

    #[test]
    fn first_structural_violation_wins() {
        let input = file(&["Jane,jane@x.com,Eng,Temp", "Ann,ann@x.com"]);
        assert_matches!(
            validate_csv(&input),
            Err(ImportValidationError::InvalidEmploymentType { line: 2, .. })
        );
    }

    #[test]
    fn structural_errors_take_precedence_over_empty_fields() {
        let input = file(&[",jane@x.com,Eng,FullTime", "Ann,ann@x.com,PM"]);
        assert_matches!(
            validate_csv(&input),
            Err(ImportValidationError::WrongFieldCount { line: 3, .. })
        );
    }

    #[test]
    fn empty_fields_are_aggregated_into_one_error() {
        let input = file(&[
            "Jane,jane@x.com,Eng,FullTime",
            " ,sam@x.com,QA,Intern",
            "Ann,,PM,PartTime",
            "Lee,lee@x.com,   ,PartTime",
        ]);
        let err = validate_csv(&input).unwrap_err();

        assert_eq!(
            err,
            ImportValidationError::MissingFieldValues {
                first_line: 3,
                count: 3
            }
        );
        assert!(err.to_string().contains("3 rows are missing required fields"));
    }

    #[test]
    fn blank_rows_are_ignored() {
        let input = file(&["Jane,jane@x.com,Eng,FullTime", ",,,", "  ,  ", "Sam,sam@x.com,QA,Intern"]);
        assert_eq!(validate_csv(&input).unwrap().len(), 2);
    }

    #[test]
    fn line_numbers_follow_the_physical_file() {
        let input = b"name,email,role,employmentType\n\nJane,jane@x.com,Eng,FullTime\n\nBob,b@x.com,Ops,Boss\n";
        assert_matches!(
            validate_csv(input),
            Err(ImportValidationError::InvalidEmploymentType { line: 5, .. })
        );
    }

    #[test]
    fn crlf_rows_name_their_own_line() {
        let input = b"name,email,role,employmentType\r\nA,a@x.com,Eng,FullTime\r\nB,b@x.com,Eng\r\n";
        assert_eq!(
            validate_csv(input),
            Err(ImportValidationError::WrongFieldCount { line: 3, found: 3 })
        );
    }

    #[test]
    fn crlf_blank_line_after_header_is_counted() {
        let input = b"name,email,role,employmentType\r\n\r\nA,a@x.com,Eng,Boss\r\n";
        assert_matches!(
            validate_csv(input),
            Err(ImportValidationError::InvalidEmploymentType { line: 3, .. })
        );
    }

    #[test]
    fn parse_rows_reports_physical_lines() {
        let lf = parse_rows(b"h\n\nA,a,R,FullTime\n\n\nB,b,R,Intern\n").unwrap();
        let lines: Vec<u64> = lf.iter().map(|r| r.line).collect();
        assert_eq!(lines, vec![1, 3, 6]);

        let crlf = parse_rows(b"h\r\nA,a,R,FullTime\r\nB,b,R\r\n").unwrap();
        let lines: Vec<u64> = crlf.iter().map(|r| r.line).collect();
        assert_eq!(lines, vec![1, 2, 3]);

        let cr = parse_rows(b"h\rA,a,R,FullTime\rB,b,R\r").unwrap();
        let lines: Vec<u64> = cr.iter().map(|r| r.line).collect();
        assert_eq!(lines, vec![1, 2, 3]);
    }

    #[test]
    fn leading_blank_lines_shift_the_header_line() {
        let rows = parse_rows(b"\n\nh\nA,a,R,FullTime\n").unwrap();
        assert_eq!(rows[0].line, 3);
        assert_eq!(rows[1].line, 4);
    }

    #[test]
    fn cells_are_trimmed() {
        let input = file(&["  Jane , jane@x.com ,Eng , PartTime "]);
        let records = validate_csv(&input).unwrap();

        assert_eq!(records[0].name, "Jane");
        assert_eq!(records[0].email, "jane@x.com");
        assert_eq!(records[0].role, "Eng");
        assert_eq!(records[0].employment_type, EmploymentType::PartTime);
    }

    #[test]
    fn header_only_file_yields_no_records() {
        assert!(validate_csv(HEADER.as_bytes()).unwrap().is_empty());
        assert!(validate_csv(b"").unwrap().is_empty());
    }

    #[test]
    fn crlf_line_endings_are_accepted() {
        let input = b"name,email,role,employmentType\r\nJane,jane@x.com,Eng,FullTime\r\n";
        assert_eq!(validate_csv(input).unwrap().len(), 1);
    }

    #[test]
    fn invalid_utf8_is_unreadable() {
        let input = b"name,email,role,employmentType\nJ\xffne,jane@x.com,Eng,FullTime\n";
        assert_matches!(validate_csv(input), Err(ImportValidationError::Unreadable(_)));
    }

    #[test]
    fn validation_is_deterministic() {
        let input = file(&["Jane,jane@x.com,Eng,FullTime", "Sam,sam@x.com,QA,Intern"]);
        assert_eq!(validate_csv(&input), validate_csv(&input));

        let bad = file(&["Jane,jane@x.com,Eng,Nope"]);
        assert_eq!(validate_csv(&bad), validate_csv(&bad));
    }

    #[test]
    fn validate_rows_accepts_pre_split_cells() {
        let rows = vec![
            RawRow::new(1, vec!["h".into()]),
            RawRow::new(2, vec!["A".into(), "a@x.com".into(), "Dev".into(), "Intern".into()]),
        ];
        assert_eq!(validate_rows(&rows).unwrap().len(), 1);
    }
}
