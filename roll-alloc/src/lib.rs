//! # roll-alloc: collision-free identifier allocation
//!
//! Allocates tenant-scoped identifiers and initial login credentials
//! for school records (students, teachers, accountants, parents and
//! administrators) without locks or reservation rows.
//!
//! - **Optimistic**: scan the scope, propose a sequence, verify it against
//!   the live store, accept. Collisions trigger backoff and a fresh scan.
//! - **Bounded**: a fixed attempt budget, then either a hard failure or an
//!   explicitly unverified timestamp-derived fallback.
//! - **Store agnostic**: any datastore implementing
//!   [`RecordStore`](roll_core::RecordStore) works; an in-memory store
//!   ships for tests and development.
//!
//! ## Quick start
//!
//! ```rust
//! use std::sync::Arc;
//! use roll_alloc::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(MemoryStore::new().with_tenant("tenant_1", "SCH001"));
//! let hasher = PasswordHasher::with_config(HasherConfig::default().with_cost(4))?;
//! let credentials = CredentialDeriver::with_config(CredentialConfig::default(), hasher)?;
//! let allocator = UniquenessOrchestrator::new(store.clone()).with_credentials(credentials);
//!
//! let request = AllocationRequest::student(TenantContext::new("tenant_1"), 2025, 7);
//! let allocation = allocator.allocate(&request).await?;
//! assert_eq!(allocation.identifier.as_str(), "SCH001-STU-202507-0001");
//!
//! store.insert(allocation.record(None))?;
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod config;
#[cfg(feature = "tracing-basic")]
pub mod observability;
pub mod orchestrator;
pub mod record;
pub mod resolver;

pub use backend::MemoryStore;
pub use config::{AllocatorConfig, BackoffPolicy, ExhaustionPolicy};
pub use orchestrator::{
    timestamp_sequence, Allocation, AllocationRequest, AllocationState, TransitionHook,
    UniquenessOrchestrator,
};
pub use record::PersonRecord;
pub use resolver::{live_sequences, AffinityStrategy, LiveSequence, PeerGrouping, SequenceResolver};

pub mod prelude {
    pub use crate::{
        Allocation, AllocationRequest, AllocationState, AllocatorConfig, BackoffPolicy,
        ExhaustionPolicy, MemoryStore, PersonRecord, SequenceResolver, UniquenessOrchestrator,
    };
    pub use roll_auth::{CredentialConfig, CredentialDeriver, Credentials, HasherConfig, PasswordHasher};
    pub use roll_core::{
        Identifier, PersonType, RecordStore, RollError, RollResult, ScopeKey, TenantContext,
        TenantId,
    };
}
