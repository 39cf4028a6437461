use std::fmt;

use crate::errors::{RollError, RollResult};
use crate::identifier::IdentifierParts;
use crate::person::PersonType;

/// Numbering space within which sequence numbers must be unique.
///
/// Students are numbered per tenant + year + grade, admins per tenant,
/// every other type per tenant + year.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScopeKey {
    pub tenant_code: String,
    pub person_type: PersonType,
    pub year: Option<u16>,
    pub grade: Option<u8>,
}

impl ScopeKey {
    pub fn student(tenant_code: impl Into<String>, year: u16, grade: u8) -> Self {
        Self {
            tenant_code: tenant_code.into(),
            person_type: PersonType::Student,
            year: Some(year),
            grade: Some(grade),
        }
    }

    /// Scope for any yearly, grade-less type (teacher, accountant, parent).
    pub fn yearly(tenant_code: impl Into<String>, person_type: PersonType, year: u16) -> Self {
        Self {
            tenant_code: tenant_code.into(),
            person_type,
            year: Some(year),
            grade: None,
        }
    }

    pub fn admin(tenant_code: impl Into<String>) -> Self {
        Self {
            tenant_code: tenant_code.into(),
            person_type: PersonType::Admin,
            year: None,
            grade: None,
        }
    }

    /// Check the key has exactly the components its person type needs.
    pub fn validate(&self) -> RollResult<()> {
        let t = self.person_type;
        if t.has_year() != self.year.is_some() {
            return Err(RollError::invalid_request(if t.has_year() {
                format!("{t} scope requires a year")
            } else {
                format!("{t} scope takes no year")
            }));
        }
        if t.has_grade() != self.grade.is_some() {
            return Err(RollError::invalid_request(if t.has_grade() {
                format!("{t} scope requires a grade")
            } else {
                format!("{t} scope takes no grade")
            }));
        }
        Ok(())
    }

    /// Whether a parsed identifier belongs to this numbering space.
    ///
    /// Legacy identifiers carry no tenant code; the store is trusted to
    /// have returned only this tenant's records for them.
    pub fn contains(&self, parts: &IdentifierParts) -> bool {
        let tenant_matches = parts
            .tenant_code
            .as_deref()
            .map_or(true, |code| code == self.tenant_code);

        tenant_matches
            && parts.person_type == self.person_type
            && parts.year == self.year
            && parts.grade == self.grade
    }

    /// Identifier parts for `sequence` within this scope.
    pub fn parts(&self, sequence: u32) -> IdentifierParts {
        IdentifierParts {
            person_type: self.person_type,
            tenant_code: Some(self.tenant_code.clone()),
            year: self.year,
            grade: self.grade,
            sequence,
            generation: Default::default(),
        }
    }
}

impl fmt::Display for ScopeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.tenant_code, self.person_type)?;
        if let Some(year) = self.year {
            write!(f, "/{year}")?;
        }
        if let Some(grade) = self.grade {
            write!(f, "/{grade:02}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifier::parse_identifier;

    #[test]
    fn student_scope_matches_same_grade_only() {
        let scope = ScopeKey::student("SCH001", 2025, 7);
        let same = parse_identifier("SCH001-STU-202507-0002").unwrap();
        let other_grade = parse_identifier("SCH001-STU-202508-0002").unwrap();
        let other_tenant = parse_identifier("SCH002-STU-202507-0002").unwrap();

        assert!(scope.contains(&same));
        assert!(!scope.contains(&other_grade));
        assert!(!scope.contains(&other_tenant));
    }

    #[test]
    fn legacy_student_ids_count_toward_their_scope() {
        let scope = ScopeKey::student("SCH001", 2025, 7);
        let legacy = parse_identifier("2025070014").unwrap();
        assert!(scope.contains(&legacy));
    }

    #[test]
    fn malformed_scopes_are_rejected() {
        let mut scope = ScopeKey::yearly("SCH001", PersonType::Teacher, 2024);
        assert!(scope.validate().is_ok());

        scope.grade = Some(3);
        assert!(matches!(scope.validate(), Err(RollError::InvalidRequest { .. })));

        let mut admin = ScopeKey::admin("SCH001");
        admin.year = Some(2024);
        assert!(admin.validate().is_err());
    }

    #[test]
    fn display_is_compact() {
        assert_eq!(ScopeKey::student("SCH001", 2025, 7).to_string(), "SCH001/student/2025/07");
        assert_eq!(ScopeKey::admin("SCH001").to_string(), "SCH001/admin");
    }
}
