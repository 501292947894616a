//! Correlation of a schedule identifier with both result collections.
//!
//! Nothing is joined in storage; the summary record carries the two foreign
//! keys (platform measurement id, microsecond agent timestamp) and the
//! correlator resolves them with independent equality queries at read time.

use mongodb::bson::{doc, from_document, Document};

use atlasmns_core::Experiment;

use crate::store::{ResultsDb, ATLAS_COLLECTION, EXPERIMENTS_COLLECTION, TRACEROUTE_COLLECTION};

/// A schedule entry's summary joined with whatever both raw collections
/// hold for it. Either result set may be empty.
#[derive(Debug, Clone, PartialEq)]
pub struct Correlation {
    pub experiment: Experiment,
    pub platform_results: Vec<Document>,
    pub tool_results: Vec<Document>,
}

impl ResultsDb {
    /// Look up the experiment summary for `identifier` and join it against
    /// the platform and tool result collections. `None` when no summary
    /// exists.
    pub fn correlate(&self, identifier: i64) -> Option<Correlation> {
        let documents = self.find_documents(EXPERIMENTS_COLLECTION, doc! { "identifier": identifier });
        let mut experiments = Vec::with_capacity(documents.len());
        for document in documents {
            match from_document::<Experiment>(document) {
                Ok(experiment) => experiments.push(experiment),
                Err(e) => {
                    tracing::warn!(error = %e, identifier, "skipping undecodable experiment summary");
                }
            }
        }

        if experiments.len() > 1 {
            // Data-integrity anomaly; the store does not enforce uniqueness.
            // Last seen wins.
            tracing::warn!(
                identifier,
                count = experiments.len(),
                "multiple experiment summaries for one identifier"
            );
        }
        let experiment = experiments.pop()?;

        let platform_results = match experiment.probe_measurement_id {
            Some(measurement_id) => {
                self.find_documents(ATLAS_COLLECTION, doc! { "msm_id": measurement_id })
            }
            None => Vec::new(),
        };
        let tool_results =
            self.find_documents(TRACEROUTE_COLLECTION, doc! { "timestamp": experiment.timestamp });

        Some(Correlation {
            experiment,
            platform_results,
            tool_results,
        })
    }
}
