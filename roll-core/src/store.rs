//! Record store contract required by the allocator.
//!
//! Any datastore satisfying these traits can back allocation: the
//! allocator only reads through them and never writes. Persisting the
//! finished record (and enforcing a write-time unique constraint on
//! identifier and username) is the caller's job.

use async_trait::async_trait;
use tracing::warn;

use crate::errors::StoreResult;
use crate::identifier::{parse_identifier, Identifier};
use crate::person::PersonType;
use crate::scope::ScopeKey;
use crate::tenant::TenantId;

/// A live record as seen by a scope scan.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScopedRecord {
    /// Raw identifier text as stored; may predate the current grammar.
    pub identifier: String,
    /// Grouping label used by affinity strategies (designation, role).
    pub affinity: Option<String>,
}

impl ScopedRecord {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            affinity: None,
        }
    }

    pub fn with_affinity(mut self, affinity: impl Into<String>) -> Self {
        self.affinity = Some(affinity.into());
        self
    }
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Committed, live records of the scope's tenant and person type.
    ///
    /// Implementations may over-approximate (e.g. return every record of
    /// the tenant and type); callers filter by parsing each identifier.
    async fn find_in_scope(&self, scope: &ScopeKey) -> StoreResult<Vec<ScopedRecord>>;

    /// Sequence numbers embedded in the scope's live identifiers.
    ///
    /// Identifiers that match no grammar are skipped with a warning.
    async fn find_sequences_in_scope(&self, scope: &ScopeKey) -> StoreResult<Vec<u32>> {
        let records = self.find_in_scope(scope).await?;
        Ok(records
            .iter()
            .filter_map(|r| match parse_identifier(&r.identifier) {
                Ok(parts) => Some(parts),
                Err(err) => {
                    warn!(%scope, identifier = %r.identifier, error = %err, "skipping unparseable identifier");
                    None
                }
            })
            .filter(|parts| scope.contains(parts))
            .map(|parts| parts.sequence)
            .collect())
    }

    async fn identifier_exists(
        &self,
        identifier: &Identifier,
        person_type: PersonType,
    ) -> StoreResult<bool>;

    /// Checked across every person type sharing the login namespace.
    async fn username_exists(&self, username: &str) -> StoreResult<bool>;

    /// Fails with `StoreError::TenantNotFound` for unknown tenants.
    async fn resolve_tenant_code(&self, tenant: &TenantId) -> StoreResult<String>;
}

/// Atomic fetch-and-increment per scope.
///
/// Stores that can offer this remove the scan-then-verify race for
/// sequence selection. Implementations must never hand out a number
/// already held by a live record in the scope.
#[async_trait]
pub trait SequenceCounter: Send + Sync {
    async fn next_sequence(&self, scope: &ScopeKey) -> StoreResult<u32>;
}
