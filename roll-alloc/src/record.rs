use roll_core::{EmployeeCode, Identifier, PersonType, ScopedRecord};

/// A person record as persisted by the caller after allocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonRecord {
    pub person_type: PersonType,
    pub tenant_code: String,
    pub identifier: Identifier,
    pub username: String,
    pub employee_code: Option<EmployeeCode>,
    pub affinity: Option<String>,
}

impl PersonRecord {
    pub fn scoped(&self) -> ScopedRecord {
        ScopedRecord {
            identifier: self.identifier.to_string(),
            affinity: self.affinity.clone(),
        }
    }
}
