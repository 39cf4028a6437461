//! roll-core: shared types for the Rollbook identifier allocation engine.
//!
//! Identifiers, scope keys, tenant context, the error taxonomy, the
//! key/value configuration layer and the record store contract all live
//! here so the credential and allocation crates agree on one vocabulary.

pub mod config;
pub mod errors;
pub mod identifier;
pub mod person;
pub mod scope;
pub mod store;
pub mod tenant;

pub use config::{RollConfig, RollConfigSnapshot};
pub use errors::{ErrorKind, RollError, RollResult, StoreError, StoreResult};
pub use identifier::{
    format_employee_code, format_identifier, parse_employee_code, parse_identifier,
    validate_identifier, EmployeeCode, Generation, Identifier, IdentifierParts,
};
pub use person::PersonType;
pub use scope::ScopeKey;
pub use store::{RecordStore, ScopedRecord, SequenceCounter};
pub use tenant::{TenantContext, TenantId};
