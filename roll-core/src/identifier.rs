//! # Identifier grammar
//!
//! Current (tenant-prefixed) forms, the only ones ever produced:
//!
//! | type       | identifier                    | employee code                |
//! |------------|-------------------------------|------------------------------|
//! | student    | `{t}-STU-{yyyy}{gg}-{rrrr}`   |                              |
//! | teacher    | `{t}-TCH-{yyyy}-{sss}`        | `{t}-EMP-{yyyy}-{sss}`       |
//! | accountant | `{t}-ACC-{yyyy}-{sss}`        | `{t}-EMP-ACC-{yyyy}-{sss}`   |
//! | parent     | `{t}-PAR-{yyyy}-{sss}`        |                              |
//! | admin      | `{t}-ADM-{sss}`               |                              |
//!
//! The legacy student form `{yyyy}{gg}{rrrr}` (ten raw digits) is still
//! accepted by [`parse_identifier`].
//!
//! ```rust
//! use roll_core::identifier::{format_identifier, parse_identifier, IdentifierParts};
//!
//! let parts = IdentifierParts::student("SCH001", 2025, 7, 3);
//! let id = format_identifier(&parts).unwrap();
//! assert_eq!(id.as_str(), "SCH001-STU-202507-0003");
//! assert_eq!(parse_identifier(id.as_str()).unwrap(), parts);
//! ```

use std::fmt;
use std::str::FromStr;

use crate::errors::{RollError, RollResult};
use crate::person::PersonType;

const SEPARATOR: char = '-';
const EMPLOYEE_CODE: &str = "EMP";
const LEGACY_STUDENT_LEN: usize = 10;
const LEGACY_SEQUENCE_WIDTH: usize = LEGACY_STUDENT_LEN - 6;

/// Which textual generation an identifier was written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Generation {
    /// Ungrouped ten-digit student form, parse only.
    Legacy,
    #[default]
    Current,
}

/// Structured content of an identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IdentifierParts {
    pub person_type: PersonType,
    /// Absent only for legacy identifiers.
    pub tenant_code: Option<String>,
    pub year: Option<u16>,
    pub grade: Option<u8>,
    pub sequence: u32,
    pub generation: Generation,
}

impl IdentifierParts {
    pub fn student(tenant_code: impl Into<String>, year: u16, grade: u8, sequence: u32) -> Self {
        Self {
            person_type: PersonType::Student,
            tenant_code: Some(tenant_code.into()),
            year: Some(year),
            grade: Some(grade),
            sequence,
            generation: Generation::Current,
        }
    }

    pub fn yearly(
        person_type: PersonType,
        tenant_code: impl Into<String>,
        year: u16,
        sequence: u32,
    ) -> Self {
        Self {
            person_type,
            tenant_code: Some(tenant_code.into()),
            year: Some(year),
            grade: None,
            sequence,
            generation: Generation::Current,
        }
    }

    pub fn admin(tenant_code: impl Into<String>, sequence: u32) -> Self {
        Self {
            person_type: PersonType::Admin,
            tenant_code: Some(tenant_code.into()),
            year: None,
            grade: None,
            sequence,
            generation: Generation::Current,
        }
    }
}

/// A formatted, validated person identifier.
///
/// Only obtainable through [`format_identifier`] or by parsing, so every
/// value matches one of the accepted grammars.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Identifier(String);

impl Identifier {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn parts(&self) -> RollResult<IdentifierParts> {
        parse_identifier(&self.0)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Identifier {
    type Err = RollError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_identifier(s)?;
        Ok(Self(s.to_string()))
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Staff employee code, allocated alongside the identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct EmployeeCode(String);

impl EmployeeCode {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EmployeeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Render parts in the current tenant-prefixed form.
pub fn format_identifier(parts: &IdentifierParts) -> RollResult<Identifier> {
    let (tenant, sequence) = check_printable(parts)?;
    let t = parts.person_type;

    let body = match (parts.year, parts.grade) {
        (Some(year), Some(grade)) => format!("{year:04}{grade:02}{SEPARATOR}{sequence}"),
        (Some(year), None) => format!("{year:04}{SEPARATOR}{sequence}"),
        (None, _) => sequence,
    };

    Ok(Identifier(format!(
        "{tenant}{SEPARATOR}{code}{SEPARATOR}{body}",
        code = t.code()
    )))
}

/// Render the employee code for a teacher or accountant.
pub fn format_employee_code(parts: &IdentifierParts) -> RollResult<EmployeeCode> {
    let (tenant, sequence) = check_printable(parts)?;
    let year = parts.year.unwrap_or_default();

    let code = match parts.person_type {
        PersonType::Teacher => format!("{tenant}-{EMPLOYEE_CODE}-{year:04}-{sequence}"),
        PersonType::Accountant => {
            format!("{tenant}-{EMPLOYEE_CODE}-ACC-{year:04}-{sequence}")
        }
        other => {
            return Err(RollError::invalid_parts(format!(
                "{other} records have no employee code"
            )))
        }
    };
    Ok(EmployeeCode(code))
}

/// Parse either generation of identifier. Never falls back to defaults.
pub fn parse_identifier(input: &str) -> RollResult<IdentifierParts> {
    if !input.is_empty() && input.bytes().all(|b| b.is_ascii_digit()) {
        return parse_legacy_student(input);
    }

    let segments: Vec<&str> = input.split(SEPARATOR).collect();
    let [tenant, code, rest @ ..] = segments.as_slice() else {
        return Err(RollError::malformed(input, "expected tenant and type segments"));
    };
    check_tenant_code(tenant).map_err(|reason| RollError::malformed(input, reason))?;
    let person_type = PersonType::from_code(code)
        .ok_or_else(|| RollError::malformed(input, format!("unknown type code '{code}'")))?;
    let width = person_type.sequence_width();

    let (year, grade, sequence) = match (person_type, rest) {
        (PersonType::Student, [year_grade, seq]) => {
            let year = digits(input, year_grade.get(..4), 4, "year")?;
            let grade = digits(input, year_grade.get(4..), 2, "grade")?;
            (Some(year as u16), Some(grade as u8), digits(input, Some(*seq), width, "sequence")?)
        }
        (PersonType::Admin, [seq]) => (None, None, digits(input, Some(*seq), width, "sequence")?),
        (t, [year, seq]) if t.has_year() && !t.has_grade() => (
            Some(digits(input, Some(*year), 4, "year")? as u16),
            None,
            digits(input, Some(*seq), width, "sequence")?,
        ),
        _ => {
            return Err(RollError::malformed(
                input,
                format!("wrong number of segments for {person_type}"),
            ))
        }
    };

    let parts = IdentifierParts {
        person_type,
        tenant_code: Some((*tenant).to_string()),
        year,
        grade,
        sequence,
        generation: Generation::Current,
    };
    check_parsed(input, parts)
}

/// Parse a teacher or accountant employee code.
pub fn parse_employee_code(input: &str) -> RollResult<IdentifierParts> {
    let segments: Vec<&str> = input.split(SEPARATOR).collect();
    let (tenant, person_type, year, seq) = match segments.as_slice() {
        [tenant, EMPLOYEE_CODE, year, seq] => (tenant, PersonType::Teacher, year, seq),
        [tenant, EMPLOYEE_CODE, "ACC", year, seq] => (tenant, PersonType::Accountant, year, seq),
        _ => return Err(RollError::malformed(input, "not an employee code")),
    };
    check_tenant_code(tenant).map_err(|reason| RollError::malformed(input, reason))?;

    let parts = IdentifierParts {
        person_type,
        tenant_code: Some((*tenant).to_string()),
        year: Some(digits(input, Some(*year), 4, "year")? as u16),
        grade: None,
        sequence: digits(input, Some(*seq), person_type.sequence_width(), "sequence")?,
        generation: Generation::Current,
    };
    check_parsed(input, parts)
}

/// Whether `input` matches any accepted identifier grammar.
pub fn validate_identifier(input: &str) -> bool {
    parse_identifier(input).is_ok()
}

fn parse_legacy_student(input: &str) -> RollResult<IdentifierParts> {
    if input.len() != LEGACY_STUDENT_LEN {
        return Err(RollError::malformed(
            input,
            format!("legacy student identifiers have {LEGACY_STUDENT_LEN} digits"),
        ));
    }
    let parts = IdentifierParts {
        person_type: PersonType::Student,
        tenant_code: None,
        year: Some(digits(input, input.get(..4), 4, "year")? as u16),
        grade: Some(digits(input, input.get(4..6), 2, "grade")? as u8),
        sequence: digits(input, input.get(6..), LEGACY_SEQUENCE_WIDTH, "sequence")?,
        generation: Generation::Legacy,
    };
    check_parsed(input, parts)
}

fn digits(input: &str, segment: Option<&str>, width: usize, what: &str) -> RollResult<u32> {
    match segment {
        Some(s) if s.len() == width && s.bytes().all(|b| b.is_ascii_digit()) => s
            .parse::<u32>()
            .map_err(|e| RollError::malformed(input, format!("{what}: {e}"))),
        _ => Err(RollError::malformed(
            input,
            format!("{what} must be exactly {width} digits"),
        )),
    }
}

fn check_parsed(input: &str, parts: IdentifierParts) -> RollResult<IdentifierParts> {
    if parts.sequence == 0 {
        return Err(RollError::malformed(input, "sequence must be positive"));
    }
    if parts.year.is_some_and(|y| y < 1000) {
        return Err(RollError::malformed(input, "year must be four digits"));
    }
    Ok(parts)
}

fn check_tenant_code(tenant: &str) -> Result<(), String> {
    if tenant.is_empty() {
        return Err("tenant code is empty".to_string());
    }
    if !tenant.bytes().all(|b| b.is_ascii_alphanumeric()) {
        return Err(format!("tenant code '{tenant}' must be ASCII alphanumeric"));
    }
    Ok(())
}

/// Validate parts for rendering; returns the tenant code and padded sequence.
fn check_printable(parts: &IdentifierParts) -> RollResult<(&str, String)> {
    let t = parts.person_type;

    if parts.generation == Generation::Legacy {
        return Err(RollError::invalid_parts("legacy identifiers are never generated"));
    }
    let tenant = parts
        .tenant_code
        .as_deref()
        .ok_or_else(|| RollError::invalid_parts("tenant code is required"))?;
    check_tenant_code(tenant).map_err(RollError::invalid_parts)?;

    match (t.has_year(), parts.year) {
        (true, Some(year)) if (1000..=9999).contains(&year) => {}
        (true, Some(year)) => {
            return Err(RollError::invalid_parts(format!("year {year} is not four digits")))
        }
        (true, None) => return Err(RollError::invalid_parts(format!("{t} requires a year"))),
        (false, Some(_)) => return Err(RollError::invalid_parts(format!("{t} takes no year"))),
        (false, None) => {}
    }

    match (t.has_grade(), parts.grade) {
        (true, Some(grade)) if grade <= 99 => {}
        (true, Some(grade)) => {
            return Err(RollError::invalid_parts(format!("grade {grade} exceeds two digits")))
        }
        (true, None) => return Err(RollError::invalid_parts(format!("{t} requires a grade"))),
        (false, Some(_)) => return Err(RollError::invalid_parts(format!("{t} takes no grade"))),
        (false, None) => {}
    }

    if parts.sequence == 0 {
        return Err(RollError::invalid_parts("sequence must be positive"));
    }
    if parts.sequence > t.max_sequence() {
        return Err(RollError::invalid_parts(format!(
            "sequence {} does not fit {} digits",
            parts.sequence,
            t.sequence_width()
        )));
    }

    let width = t.sequence_width();
    Ok((tenant, format!("{:0width$}", parts.sequence)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_every_current_grammar() {
        let cases = [
            (IdentifierParts::student("SCH001", 2025, 7, 3), "SCH001-STU-202507-0003"),
            (
                IdentifierParts::yearly(PersonType::Teacher, "SCH001", 2024, 4),
                "SCH001-TCH-2024-004",
            ),
            (
                IdentifierParts::yearly(PersonType::Accountant, "SCH001", 2024, 12),
                "SCH001-ACC-2024-012",
            ),
            (
                IdentifierParts::yearly(PersonType::Parent, "SCH001", 2024, 1),
                "SCH001-PAR-2024-001",
            ),
            (IdentifierParts::admin("SCH001", 2), "SCH001-ADM-002"),
        ];

        for (parts, expected) in cases {
            assert_eq!(format_identifier(&parts).unwrap().as_str(), expected);
        }
    }

    #[test]
    fn employee_codes_follow_staff_type() {
        let teacher = IdentifierParts::yearly(PersonType::Teacher, "SCH001", 2024, 4);
        let accountant = IdentifierParts::yearly(PersonType::Accountant, "SCH001", 2024, 4);

        assert_eq!(format_employee_code(&teacher).unwrap().as_str(), "SCH001-EMP-2024-004");
        assert_eq!(
            format_employee_code(&accountant).unwrap().as_str(),
            "SCH001-EMP-ACC-2024-004"
        );
        assert_eq!(parse_employee_code("SCH001-EMP-ACC-2024-004").unwrap(), accountant);
        assert!(format_employee_code(&IdentifierParts::admin("SCH001", 1)).is_err());
    }

    #[test]
    fn legacy_student_form_is_parsed() {
        let parts = parse_identifier("2023110042").unwrap();
        assert_eq!(parts.generation, Generation::Legacy);
        assert_eq!(parts.tenant_code, None);
        assert_eq!(parts.year, Some(2023));
        assert_eq!(parts.grade, Some(11));
        assert_eq!(parts.sequence, 42);
        assert_eq!(parse_identifier("2025071234").unwrap().sequence, 1234);
        assert!(validate_identifier("2025070001"));
        assert!(!validate_identifier("202507001"));
        assert!(!validate_identifier("20250700001"));
        assert!(matches!(
            parse_identifier("2025070000"),
            Err(RollError::MalformedIdentifier { .. })
        ));

        // parse only
        assert!(matches!(format_identifier(&parts), Err(RollError::InvalidParts { .. })));
    }

    #[test]
    fn grade_is_zero_padded() {
        let id = format_identifier(&IdentifierParts::student("A1", 2025, 0, 1)).unwrap();
        assert_eq!(id.as_str(), "A1-STU-202500-0001");
    }

    #[test]
    fn oversized_sequences_are_a_caller_error() {
        let err = format_identifier(&IdentifierParts::yearly(PersonType::Teacher, "SCH001", 2024, 1000))
            .unwrap_err();
        assert!(matches!(err, RollError::InvalidParts { .. }));
        assert!(format_identifier(&IdentifierParts::student("SCH001", 2024, 1, 9999)).is_ok());
        assert!(format_identifier(&IdentifierParts::student("SCH001", 2024, 1, 10000)).is_err());
        assert!(format_identifier(&IdentifierParts::student("SCH001", 2024, 1, 0)).is_err());
    }

    #[test]
    fn rejects_everything_else() {
        let bad = [
            "",
            "SCH001",
            "SCH001-STU-202507-003",
            "SCH001-STU-2025-07-0003",
            "SCH001-TCH-2024-0004",
            "SCH001-TCH-24-004",
            "SCH001-ADM-2024-001",
            "SCH001-XYZ-2024-001",
            "SCH-001-TCH-2024-001",
            "-TCH-2024-001",
            "SCH001-TCH-2024-000",
            "SCH001-STU-2025a7-0003",
            "202507003",
            "20250700031",
            "SCH001 -PAR-2024-001",
        ];
        for input in bad {
            assert!(
                matches!(parse_identifier(input), Err(RollError::MalformedIdentifier { .. })),
                "{input} should be rejected"
            );
            assert!(!validate_identifier(input));
        }
    }

    #[test]
    fn identifier_from_str_validates() {
        assert!("SCH001-PAR-2024-001".parse::<Identifier>().is_ok());
        assert!("garbage".parse::<Identifier>().is_err());
    }
}
