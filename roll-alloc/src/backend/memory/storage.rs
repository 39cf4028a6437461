use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use roll_core::{
    parse_identifier, Identifier, PersonType, RecordStore, ScopeKey, ScopedRecord,
    SequenceCounter, StoreError, StoreResult, TenantId,
};
use tracing::{debug, warn};

use crate::record::PersonRecord;

#[derive(Debug, Default)]
struct Records {
    /// One collection per person type, like separate tables.
    by_type: HashMap<PersonType, Vec<PersonRecord>>,
    /// Login namespace shared by every person type.
    usernames: HashSet<String>,
}

/// In-memory record store for testing and development.
///
/// Enforces the write-time uniqueness constraint on identifier and
/// username that real stores provide with unique indexes.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tenants: RwLock<HashMap<TenantId, String>>,
    records: RwLock<Records>,
    /// Per-scope high-water marks for the atomic counter path.
    counters: Mutex<HashMap<ScopeKey, u32>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tenant(self, tenant_id: &str, tenant_code: &str) -> Self {
        self.add_tenant(tenant_id, tenant_code);
        self
    }

    pub fn add_tenant(&self, tenant_id: &str, tenant_code: &str) {
        self.tenants
            .write()
            .insert(TenantId::from(tenant_id), tenant_code.to_string());
    }

    /// Persist a record; fails if its identifier or username is taken.
    pub fn insert(&self, record: PersonRecord) -> StoreResult<()> {
        let mut records = self.records.write();

        let duplicate = records
            .by_type
            .get(&record.person_type)
            .is_some_and(|list| list.iter().any(|r| r.identifier == record.identifier));
        if duplicate {
            return Err(StoreError::unique_violation(format!(
                "identifier {}",
                record.identifier
            )));
        }
        if records.usernames.contains(&record.username) {
            return Err(StoreError::unique_violation(format!(
                "username {}",
                record.username
            )));
        }

        debug!(identifier = %record.identifier, "inserted record");
        records.usernames.insert(record.username.clone());
        records
            .by_type
            .entry(record.person_type)
            .or_default()
            .push(record);
        Ok(())
    }

    /// Delete a record, freeing its sequence for gap-filling.
    pub fn remove(&self, identifier: &Identifier) -> Option<PersonRecord> {
        let mut records = self.records.write();
        let removed = records.by_type.values_mut().find_map(|list| {
            let pos = list.iter().position(|r| &r.identifier == identifier)?;
            Some(list.remove(pos))
        })?;
        records.usernames.remove(&removed.username);
        Some(removed)
    }

    pub fn records(&self, person_type: PersonType) -> Vec<PersonRecord> {
        self.records
            .read()
            .by_type
            .get(&person_type)
            .cloned()
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.records.read().by_type.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn live_max(&self, scope: &ScopeKey) -> u32 {
        let records = self.records.read();
        records
            .by_type
            .get(&scope.person_type)
            .into_iter()
            .flatten()
            .filter(|r| r.tenant_code == scope.tenant_code)
            .filter_map(|r| match parse_identifier(r.identifier.as_str()) {
                Ok(parts) => Some(parts),
                Err(err) => {
                    warn!(%scope, identifier = %r.identifier, error = %err, "skipping unparseable identifier");
                    None
                }
            })
            .filter(|parts| scope.contains(parts))
            .map(|parts| parts.sequence)
            .max()
            .unwrap_or(0)
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn find_in_scope(&self, scope: &ScopeKey) -> StoreResult<Vec<ScopedRecord>> {
        let records = self.records.read();
        Ok(records
            .by_type
            .get(&scope.person_type)
            .into_iter()
            .flatten()
            .filter(|r| r.tenant_code == scope.tenant_code)
            .map(PersonRecord::scoped)
            .collect())
    }

    async fn identifier_exists(
        &self,
        identifier: &Identifier,
        person_type: PersonType,
    ) -> StoreResult<bool> {
        let records = self.records.read();
        Ok(records
            .by_type
            .get(&person_type)
            .is_some_and(|list| list.iter().any(|r| &r.identifier == identifier)))
    }

    async fn username_exists(&self, username: &str) -> StoreResult<bool> {
        Ok(self.records.read().usernames.contains(username))
    }

    async fn resolve_tenant_code(&self, tenant: &TenantId) -> StoreResult<String> {
        self.tenants
            .read()
            .get(tenant)
            .cloned()
            .ok_or_else(|| StoreError::tenant_not_found(tenant.as_str()))
    }
}

#[async_trait]
impl SequenceCounter for MemoryStore {
    async fn next_sequence(&self, scope: &ScopeKey) -> StoreResult<u32> {
        let live_max = self.live_max(scope);
        let mut counters = self.counters.lock();
        let counter = counters.entry(scope.clone()).or_insert(0);

        *counter = (*counter).max(live_max).saturating_add(1);
        Ok(*counter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, username: &str) -> PersonRecord {
        let identifier: Identifier = id.parse().unwrap();
        let parts = identifier.parts().unwrap();
        PersonRecord {
            person_type: parts.person_type,
            tenant_code: parts.tenant_code.unwrap_or_default(),
            identifier,
            username: username.to_string(),
            employee_code: None,
            affinity: None,
        }
    }

    #[tokio::test]
    async fn unique_constraint_rejects_duplicates() {
        let store = MemoryStore::new();
        store.insert(record("SCH001-PAR-2024-001", "a")).unwrap();

        let dup_id = store.insert(record("SCH001-PAR-2024-001", "b"));
        assert!(matches!(dup_id, Err(StoreError::UniqueViolation { .. })));

        // usernames are global across person types
        let dup_name = store.insert(record("SCH001-TCH-2024-001", "a"));
        assert!(matches!(dup_name, Err(StoreError::UniqueViolation { .. })));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn scope_scan_is_tenant_and_type_bound() {
        let store = MemoryStore::new();
        store.insert(record("SCH001-TCH-2024-001", "a")).unwrap();
        store.insert(record("SCH002-TCH-2024-002", "b")).unwrap();
        store.insert(record("SCH001-PAR-2024-003", "c")).unwrap();

        let scope = ScopeKey::yearly("SCH001", PersonType::Teacher, 2024);
        let found = store.find_in_scope(&scope).await.unwrap();
        assert_eq!(found, vec![ScopedRecord::new("SCH001-TCH-2024-001")]);
        assert_eq!(store.find_sequences_in_scope(&scope).await.unwrap(), vec![1]);
    }

    #[tokio::test]
    async fn removal_frees_username_and_sequence() {
        let store = MemoryStore::new();
        store.insert(record("SCH001-STU-202507-0001", "s1")).unwrap();
        let id: Identifier = "SCH001-STU-202507-0001".parse().unwrap();

        assert!(store.remove(&id).is_some());
        assert!(!store.username_exists("s1").await.unwrap());
        assert!(!store.identifier_exists(&id, PersonType::Student).await.unwrap());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn counter_never_reissues_live_numbers() {
        let store = MemoryStore::new();
        store.insert(record("SCH001-TCH-2024-001", "a")).unwrap();
        store.insert(record("SCH001-TCH-2024-005", "b")).unwrap();
        let scope = ScopeKey::yearly("SCH001", PersonType::Teacher, 2024);

        assert_eq!(store.next_sequence(&scope).await.unwrap(), 6);
        assert_eq!(store.next_sequence(&scope).await.unwrap(), 7);

        let other = ScopeKey::yearly("SCH001", PersonType::Teacher, 2025);
        assert_eq!(store.next_sequence(&other).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn counter_seeds_past_legacy_records() {
        let store = MemoryStore::new();
        store.insert(record("SCH001-STU-202507-0002", "a")).unwrap();
        let mut legacy = record("2025070007", "b");
        legacy.tenant_code = "SCH001".to_string();
        store.insert(legacy).unwrap();

        let scope = ScopeKey::student("SCH001", 2025, 7);
        assert_eq!(store.next_sequence(&scope).await.unwrap(), 8);
    }

    #[tokio::test]
    async fn unknown_tenant_is_reported() {
        let store = MemoryStore::new().with_tenant("t1", "SCH001");
        assert_eq!(store.resolve_tenant_code(&"t1".into()).await.unwrap(), "SCH001");
        assert!(matches!(
            store.resolve_tenant_code(&"t2".into()).await,
            Err(StoreError::TenantNotFound { .. })
        ));
    }
}
