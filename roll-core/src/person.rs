//! Person types that receive identifiers.

use std::fmt;

/// Kind of person record an identifier is allocated for.
///
/// Each type owns a numbering space per tenant (and year, and grade for
/// students) and a fixed zero-padded sequence width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum PersonType {
    Student,
    Teacher,
    Accountant,
    Parent,
    Admin,
}

impl PersonType {
    pub const ALL: [PersonType; 5] = [
        PersonType::Student,
        PersonType::Teacher,
        PersonType::Accountant,
        PersonType::Parent,
        PersonType::Admin,
    ];

    /// Type code embedded in the identifier (`SCH001-TCH-2024-001`).
    pub fn code(&self) -> &'static str {
        match self {
            PersonType::Student => "STU",
            PersonType::Teacher => "TCH",
            PersonType::Accountant => "ACC",
            PersonType::Parent => "PAR",
            PersonType::Admin => "ADM",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.code() == code)
    }

    /// Three-character prefix prepended to derived usernames.
    pub fn role_prefix(&self) -> &'static str {
        match self {
            PersonType::Student => "stu",
            PersonType::Teacher => "tch",
            PersonType::Accountant => "acc",
            PersonType::Parent => "par",
            PersonType::Admin => "adm",
        }
    }

    /// Zero-padded width of the sequence segment.
    pub fn sequence_width(&self) -> usize {
        match self {
            PersonType::Student => 4,
            _ => 3,
        }
    }

    /// Largest sequence that still fits the printable width.
    pub fn max_sequence(&self) -> u32 {
        10u32.pow(self.sequence_width() as u32) - 1
    }

    /// Admin identifiers carry no year component.
    pub fn has_year(&self) -> bool {
        !matches!(self, PersonType::Admin)
    }

    /// Only students are numbered per grade.
    pub fn has_grade(&self) -> bool {
        matches!(self, PersonType::Student)
    }

    /// Staff types also receive an employee code.
    pub fn has_employee_code(&self) -> bool {
        matches!(self, PersonType::Teacher | PersonType::Accountant)
    }

    pub fn name(&self) -> &'static str {
        match self {
            PersonType::Student => "student",
            PersonType::Teacher => "teacher",
            PersonType::Accountant => "accountant",
            PersonType::Parent => "parent",
            PersonType::Admin => "admin",
        }
    }
}

impl fmt::Display for PersonType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_resolve_back_to_their_type() {
        for t in PersonType::ALL {
            assert_eq!(PersonType::from_code(t.code()), Some(t));
            assert_eq!(t.role_prefix().len(), 3);
        }
        assert_eq!(PersonType::from_code("EMP"), None);
    }

    #[test]
    fn students_get_four_digit_sequences() {
        assert_eq!(PersonType::Student.max_sequence(), 9999);
        assert_eq!(PersonType::Teacher.max_sequence(), 999);
        assert!(!PersonType::Admin.has_year());
    }
}
