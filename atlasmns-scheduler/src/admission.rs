//! Admission control for new measurement runs.
//!
//! Per `(agent host, traffic class, source address, probe)` tuple, at most
//! one scheduled entry may exist at any time. Entries are append-only
//! history: finishing a run never deletes it, and a new run for the same
//! tuple is admitted only once the most recent one has finished.
//!
//! The decision itself is a pure function over the tuple's existing entries
//! so it can be tested without a database. Note that the check-then-insert
//! sequence is not serialized against other admitting processes; see
//! DESIGN.md.

use chrono::{DateTime, Utc};

use atlasmns_core::{AgentProbeTuple, EntryState, ScheduleEntry};

use crate::db::ScheduleDb;

// ============================================================================
// DECISION
// ============================================================================

/// Outcome of an admission request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionOutcome {
    /// No conflicting entry; a new scheduled entry was (or, in dry-run mode,
    /// would be) created.
    Admitted,
    /// An entry for the tuple is still scheduled; the duplicate request is
    /// rejected without creating a row.
    DuplicateScheduled,
    /// The most recent entry for the tuple has not finished.
    PredecessorUnfinished,
    /// The admission check passed but the insert could not be performed;
    /// the store is unchanged and the request may be repeated later.
    StoreUnavailable,
}

impl AdmissionOutcome {
    pub fn is_admitted(&self) -> bool {
        matches!(self, AdmissionOutcome::Admitted)
    }
}

/// Decide admission from the tuple's existing entries, ordered by identifier
/// ascending. Any scheduled entry rejects the request; otherwise the most
/// recent entry, if any, must be finished.
pub fn evaluate_admission(existing: &[ScheduleEntry]) -> AdmissionOutcome {
    if existing
        .iter()
        .any(|entry| entry.state == EntryState::Scheduled)
    {
        return AdmissionOutcome::DuplicateScheduled;
    }
    if let Some(most_recent) = existing.last() {
        if most_recent.state != EntryState::Finished {
            return AdmissionOutcome::PredecessorUnfinished;
        }
    }
    AdmissionOutcome::Admitted
}

// ============================================================================
// ADMISSION AGAINST THE STORE
// ============================================================================

/// Check admission for the tuple and, unless `dry_run` is set, insert the
/// new scheduled entry. The decision and its reason are logged either way.
pub fn admit_measurement(
    db: &mut ScheduleDb,
    tuple: &AgentProbeTuple,
    agent_measurement_time: DateTime<Utc>,
    dry_run: bool,
) -> AdmissionOutcome {
    let existing = db.entries_for_tuple(tuple);
    let outcome = evaluate_admission(&existing);
    match outcome {
        AdmissionOutcome::Admitted => {
            if dry_run {
                tracing::info!(tuple = %tuple, "admission check passed (dry run, nothing written)");
                return AdmissionOutcome::Admitted;
            }
            if db.insert_entry(tuple, agent_measurement_time) {
                tracing::info!(tuple = %tuple, "admitted new measurement run");
                AdmissionOutcome::Admitted
            } else {
                tracing::warn!(tuple = %tuple, "admission passed but the insert failed");
                AdmissionOutcome::StoreUnavailable
            }
        }
        AdmissionOutcome::DuplicateScheduled => {
            tracing::info!(tuple = %tuple, "rejected: an entry for this tuple is still scheduled");
            outcome
        }
        AdmissionOutcome::PredecessorUnfinished => {
            tracing::info!(tuple = %tuple, "rejected: the most recent entry has not finished");
            outcome
        }
        AdmissionOutcome::StoreUnavailable => outcome,
    }
}
