//! # Uniqueness orchestration
//!
//! Drives the allocation state machine against the live store:
//!
//! ```text
//! Proposing → Verifying → Accepted
//!                ↓
//!            Colliding → (backoff) → Proposing …
//!                ↓
//!            Exhausted
//! ```
//!
//! Nothing is written while allocating. The caller persists the record
//! afterwards and the store's unique constraint catches whatever slips
//! through the verify-then-insert window.

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use roll_auth::{CredentialDeriver, Credentials};
use roll_core::{
    format_employee_code, format_identifier, EmployeeCode, Identifier, PersonType, RecordStore,
    RollError, RollResult, ScopeKey, SequenceCounter, TenantContext,
};
use tracing::{debug, error, info, instrument, warn};

use crate::config::{AllocatorConfig, ExhaustionPolicy};
use crate::record::PersonRecord;
use crate::resolver::SequenceResolver;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AllocationState {
    Proposing,
    Verifying,
    Accepted,
    Colliding,
    Exhausted,
}

/// Observer called on every state transition with the attempt number.
pub type TransitionHook = Arc<dyn Fn(AllocationState, u32) + Send + Sync>;

/// What the record-creation flow asks for.
#[derive(Debug, Clone)]
pub struct AllocationRequest {
    pub tenant: TenantContext,
    pub person_type: PersonType,
    pub year: Option<u16>,
    pub grade: Option<u8>,
    /// Designation or role used to cluster staff numbers.
    pub affinity: Option<String>,
}

impl AllocationRequest {
    pub fn student(tenant: TenantContext, year: u16, grade: u8) -> Self {
        Self {
            tenant,
            person_type: PersonType::Student,
            year: Some(year),
            grade: Some(grade),
            affinity: None,
        }
    }

    pub fn yearly(tenant: TenantContext, person_type: PersonType, year: u16) -> Self {
        Self {
            tenant,
            person_type,
            year: Some(year),
            grade: None,
            affinity: None,
        }
    }

    pub fn admin(tenant: TenantContext) -> Self {
        Self {
            tenant,
            person_type: PersonType::Admin,
            year: None,
            grade: None,
            affinity: None,
        }
    }

    pub fn with_affinity(mut self, affinity: impl Into<String>) -> Self {
        self.affinity = Some(affinity.into());
        self
    }

    pub fn scope(&self, tenant_code: impl Into<String>) -> ScopeKey {
        ScopeKey {
            tenant_code: tenant_code.into(),
            person_type: self.person_type,
            year: self.year,
            grade: self.grade,
        }
    }
}

/// Finalized identifier and credentials, ready to be persisted.
#[derive(Debug, Clone)]
pub struct Allocation {
    pub scope: ScopeKey,
    pub sequence: u32,
    pub identifier: Identifier,
    pub employee_code: Option<EmployeeCode>,
    pub credentials: Credentials,
    pub attempts: u32,
    /// False only for the unverified timestamp fallback.
    pub verified: bool,
}

impl Allocation {
    pub fn record(&self, affinity: Option<String>) -> PersonRecord {
        PersonRecord {
            person_type: self.scope.person_type,
            tenant_code: self.scope.tenant_code.clone(),
            identifier: self.identifier.clone(),
            username: self.credentials.username.clone(),
            employee_code: self.employee_code.clone(),
            affinity,
        }
    }
}

struct Candidate {
    scope: ScopeKey,
    sequence: u32,
    identifier: Identifier,
    username: String,
}

enum Outcome {
    Accepted(Candidate),
    Collided(String),
}

pub struct UniquenessOrchestrator<S: RecordStore + ?Sized = dyn RecordStore> {
    store: Arc<S>,
    counter: Option<Arc<dyn SequenceCounter>>,
    resolver: SequenceResolver,
    credentials: CredentialDeriver,
    config: AllocatorConfig,
    hook: Option<TransitionHook>,
}

impl<S: RecordStore + ?Sized> UniquenessOrchestrator<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            counter: None,
            resolver: SequenceResolver::new(),
            credentials: CredentialDeriver::new(),
            config: AllocatorConfig::default(),
            hook: None,
        }
    }

    pub fn with_config(mut self, config: AllocatorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_resolver(mut self, resolver: SequenceResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_credentials(mut self, credentials: CredentialDeriver) -> Self {
        self.credentials = credentials;
        self
    }

    /// Use an atomic per-scope counter instead of rescanning.
    pub fn with_counter(mut self, counter: Arc<dyn SequenceCounter>) -> Self {
        self.counter = Some(counter);
        self
    }

    pub fn on_transition(mut self, hook: TransitionHook) -> Self {
        self.hook = Some(hook);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &AllocatorConfig {
        &self.config
    }

    pub fn credentials(&self) -> &CredentialDeriver {
        &self.credentials
    }

    /// Allocate an identifier and initial credentials for a new record.
    #[instrument(
        skip(self, request),
        fields(tenant_id = %request.tenant.tenant_id, person_type = %request.person_type)
    )]
    pub async fn allocate(&self, request: &AllocationRequest) -> RollResult<Allocation> {
        // Shape check before touching the store.
        request.scope(String::new()).validate()?;

        let max_attempts = self.config.max_attempts.max(1);
        let mut tenant_code: Option<String> = None;
        let mut last_cause = String::from("no attempt completed");

        for attempt in 1..=max_attempts {
            self.transition(AllocationState::Proposing, attempt);

            match self.attempt(request, &mut tenant_code, attempt).await {
                Ok(Outcome::Accepted(candidate)) => {
                    self.transition(AllocationState::Accepted, attempt);
                    return self.finish(candidate, attempt, true).await;
                }
                Ok(Outcome::Collided(cause)) => {
                    warn!(attempt, %cause, "candidate collided");
                    last_cause = cause;
                }
                Err(err) if err.is_retryable() => {
                    warn!(attempt, error = %err, "store query failed");
                    last_cause = err.to_string();
                }
                Err(err) => return Err(err),
            }

            self.transition(AllocationState::Colliding, attempt);
            if attempt < max_attempts {
                let delay = self.config.backoff.delay(attempt, &mut rand::thread_rng());
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            }
        }

        self.transition(AllocationState::Exhausted, max_attempts);
        self.exhausted(request, tenant_code, max_attempts, last_cause).await
    }

    async fn attempt(
        &self,
        request: &AllocationRequest,
        tenant_code: &mut Option<String>,
        attempt: u32,
    ) -> RollResult<Outcome> {
        let code = match tenant_code.clone() {
            Some(code) => code,
            None => {
                let code = self
                    .store
                    .resolve_tenant_code(&request.tenant.tenant_id)
                    .await?;
                *tenant_code = Some(code.clone());
                code
            }
        };
        let scope = request.scope(code);

        let sequence = match (&self.counter, self.config.use_counter) {
            (Some(counter), true) => counter
                .next_sequence(&scope)
                .await
                .map_err(|source| RollError::ScopeResolution { source })?,
            _ => {
                self.resolver
                    .propose(self.store.as_ref(), &scope, request.affinity.as_deref())
                    .await?
            }
        };

        let identifier = format_identifier(&scope.parts(sequence))?;
        debug!(attempt, %identifier, "verifying candidate");
        self.transition(AllocationState::Verifying, attempt);

        if self
            .store
            .identifier_exists(&identifier, scope.person_type)
            .await?
        {
            return Ok(Outcome::Collided(format!(
                "identifier {identifier} already taken"
            )));
        }

        let username = self
            .credentials
            .claim_username(self.store.as_ref(), &identifier, scope.person_type)
            .await?;

        Ok(Outcome::Accepted(Candidate {
            scope,
            sequence,
            identifier,
            username,
        }))
    }

    async fn finish(&self, candidate: Candidate, attempts: u32, verified: bool) -> RollResult<Allocation> {
        let Candidate {
            scope,
            sequence,
            identifier,
            username,
        } = candidate;

        let employee_code = if scope.person_type.has_employee_code() {
            Some(format_employee_code(&scope.parts(sequence))?)
        } else {
            None
        };

        let credentials = self
            .credentials
            .issue(&identifier, scope.person_type, username)
            .await?;

        info!(%identifier, attempts, verified, "allocated identifier");

        Ok(Allocation {
            scope,
            sequence,
            identifier,
            employee_code,
            credentials,
            attempts,
            verified,
        })
    }

    async fn exhausted(
        &self,
        request: &AllocationRequest,
        tenant_code: Option<String>,
        attempts: u32,
        last_cause: String,
    ) -> RollResult<Allocation> {
        let code = match (self.config.exhaustion, tenant_code) {
            (ExhaustionPolicy::TimestampFallback, Some(code)) => code,
            _ => {
                let err = RollError::AllocationExhausted {
                    attempts,
                    last_cause,
                    at: Utc::now(),
                };
                error!(error = %err, "allocation exhausted");
                return Err(err);
            }
        };

        let scope = request.scope(code);
        let sequence = timestamp_sequence(scope.person_type, Utc::now().timestamp_millis());
        let identifier = format_identifier(&scope.parts(sequence))?;
        let username = self.credentials.username_for(&identifier, scope.person_type);

        warn!(%identifier, attempts, "accepting unverified timestamp-derived identifier");

        self.finish(
            Candidate {
                scope,
                sequence,
                identifier,
                username,
            },
            attempts,
            false,
        )
        .await
    }

    fn transition(&self, state: AllocationState, attempt: u32) {
        if let Some(hook) = &self.hook {
            hook(state, attempt);
        }
    }
}

impl<S: RecordStore + ?Sized> Clone for UniquenessOrchestrator<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            counter: self.counter.clone(),
            resolver: self.resolver.clone(),
            credentials: self.credentials.clone(),
            config: self.config.clone(),
            hook: self.hook.clone(),
        }
    }
}

impl<S: RecordStore + ?Sized> fmt::Debug for UniquenessOrchestrator<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UniquenessOrchestrator")
            .field("config", &self.config)
            .field("resolver", &self.resolver)
            .field("counter", &self.counter.is_some())
            .finish_non_exhaustive()
    }
}

/// Low-order digits of the clock, never zero.
pub fn timestamp_sequence(person_type: PersonType, epoch_millis: i64) -> u32 {
    let modulus = i64::from(person_type.max_sequence()) + 1;
    match epoch_millis.rem_euclid(modulus) {
        0 => 1,
        n => n as u32,
    }
}
