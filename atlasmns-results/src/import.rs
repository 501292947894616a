//! Import of a completed measurement into the results store.
//!
//! Two writes, best-effort: the raw platform results go into the `atlas`
//! collection verbatim, and the derived summary is upserted into
//! `experiments` keyed on `identifier`. There is no two-phase commit — the
//! summary is derivable from the schedule, and the upsert makes a repeated
//! import after a partial failure converge instead of duplicating.

use mongodb::bson::{doc, to_document, Document};
use serde_json::Value;

use atlasmns_core::{Experiment, ScheduleEntry};

use crate::store::{ResultsDb, ATLAS_COLLECTION, EXPERIMENTS_COLLECTION};

impl ResultsDb {
    /// Persist a completed entry's raw results and its summary record.
    /// Returns `true` only if both writes succeeded.
    pub fn import(&self, entry: &ScheduleEntry, raw_results: &[Value]) -> bool {
        tracing::trace!(identifier = entry.identifier, results = raw_results.len(), "importing measurement results");
        let raw_ok = self.store_platform_results(entry, raw_results);
        let summary_ok = self.store_experiment(&Experiment::from_entry(entry));
        if !(raw_ok && summary_ok) {
            tracing::warn!(identifier = entry.identifier, raw_ok, summary_ok, "import failed");
        }
        raw_ok && summary_ok
    }

    fn store_platform_results(&self, entry: &ScheduleEntry, raw_results: &[Value]) -> bool {
        if raw_results.is_empty() {
            return true;
        }
        let mut documents = Vec::with_capacity(raw_results.len());
        for result in raw_results {
            match to_document(result) {
                Ok(document) => documents.push(document),
                Err(e) => {
                    tracing::warn!(error = %e, identifier = entry.identifier, "raw result is not a document");
                    return false;
                }
            }
        }
        match self
            .database()
            .collection::<Document>(ATLAS_COLLECTION)
            .insert_many(documents)
            .run()
        {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(error = %e, identifier = entry.identifier, "storing raw platform results failed");
                false
            }
        }
    }

    fn store_experiment(&self, experiment: &Experiment) -> bool {
        let document = match to_document(experiment) {
            Ok(document) => document,
            Err(e) => {
                tracing::warn!(error = %e, identifier = experiment.identifier, "cannot encode experiment summary");
                return false;
            }
        };
        match self
            .database()
            .collection::<Document>(EXPERIMENTS_COLLECTION)
            .update_one(
                doc! { "identifier": experiment.identifier },
                doc! { "$set": document },
            )
            .upsert(true)
            .run()
        {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(error = %e, identifier = experiment.identifier, "storing experiment summary failed");
                false
            }
        }
    }
}
