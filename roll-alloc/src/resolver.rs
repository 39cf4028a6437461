//! Next-sequence proposal for a scope.
//!
//! The resolver only reads: its answer is a candidate, not a
//! reservation. Uniqueness is settled later by verification and,
//! ultimately, the store's write-time constraint.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use roll_core::{parse_identifier, PersonType, RecordStore, RollError, RollResult, ScopeKey, ScopedRecord};
use tracing::{debug, warn};

/// A sequence number held by a live record, with its grouping label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiveSequence<'a> {
    pub sequence: u32,
    pub affinity: Option<&'a str>,
}

/// Cosmetic placement bias for staff numbering.
///
/// Whatever a strategy returns is only used when the number is free, so
/// a strategy can never break uniqueness.
pub trait AffinityStrategy: Send + Sync + fmt::Debug {
    fn prefer(&self, live: &[LiveSequence<'_>], taken: &BTreeSet<u32>, hint: &str) -> Option<u32>;
}

/// Place a new record right after the highest number of its peer group.
#[derive(Debug, Clone, Copy, Default)]
pub struct PeerGrouping;

impl AffinityStrategy for PeerGrouping {
    fn prefer(&self, live: &[LiveSequence<'_>], taken: &BTreeSet<u32>, hint: &str) -> Option<u32> {
        let hint = hint.trim();
        let group_max = live
            .iter()
            .filter(|l| l.affinity.is_some_and(|a| a.trim().eq_ignore_ascii_case(hint)))
            .map(|l| l.sequence)
            .max()?;

        let candidate = group_max.checked_add(1)?;
        (!taken.contains(&candidate)).then_some(candidate)
    }
}

#[derive(Debug, Clone)]
pub struct SequenceResolver {
    affinity: Option<Arc<dyn AffinityStrategy>>,
}

impl Default for SequenceResolver {
    fn default() -> Self {
        Self {
            affinity: Some(Arc::new(PeerGrouping)),
        }
    }
}

impl SequenceResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn without_affinity() -> Self {
        Self { affinity: None }
    }

    pub fn with_affinity(strategy: Arc<dyn AffinityStrategy>) -> Self {
        Self {
            affinity: Some(strategy),
        }
    }

    /// Scan the scope and propose the next sequence.
    ///
    /// An empty scope yields 1; only a failing store query is an error.
    pub async fn propose<S>(&self, store: &S, scope: &ScopeKey, hint: Option<&str>) -> RollResult<u32>
    where
        S: RecordStore + ?Sized,
    {
        let records = store
            .find_in_scope(scope)
            .await
            .map_err(|source| RollError::ScopeResolution { source })?;

        let live = live_sequences(scope, &records);
        let sequence = self.choose(scope.person_type, &live, hint);

        debug!(%scope, live = live.len(), sequence, "proposed sequence");
        Ok(sequence)
    }

    /// Pure selection over an already scanned scope.
    pub fn choose(&self, person_type: PersonType, live: &[LiveSequence<'_>], hint: Option<&str>) -> u32 {
        let taken: BTreeSet<u32> = live.iter().map(|l| l.sequence).collect();
        let max = taken.last().copied().unwrap_or(0);
        let next = max.saturating_add(1);

        if person_type == PersonType::Student {
            return (1..=max).find(|n| !taken.contains(n)).unwrap_or(next);
        }

        match (hint, &self.affinity) {
            (Some(hint), Some(strategy)) => strategy
                .prefer(live, &taken, hint)
                .filter(|s| *s >= 1 && !taken.contains(s))
                .unwrap_or(next),
            _ => next,
        }
    }
}

/// Parse every record and keep the ones that belong to `scope`.
pub fn live_sequences<'a>(scope: &ScopeKey, records: &'a [ScopedRecord]) -> Vec<LiveSequence<'a>> {
    records
        .iter()
        .filter_map(|record| match parse_identifier(&record.identifier) {
            Ok(parts) => scope.contains(&parts).then_some(LiveSequence {
                sequence: parts.sequence,
                affinity: record.affinity.as_deref(),
            }),
            Err(err) => {
                warn!(%scope, identifier = %record.identifier, error = %err, "skipping unparseable identifier");
                None
            }
        })
        .collect()
}
