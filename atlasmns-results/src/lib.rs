//! AtlasMNS Results - Result Store, Importer and Correlator
//!
//! MongoDB-backed store reconciling three independently produced data sets:
//! raw RIPE Atlas results, raw local traceroute tool results, and the
//! experiment summaries derived from the schedule. The importer is
//! idempotent per schedule identifier; the correlator joins by foreign key
//! at read time.

pub mod correlate;
pub mod import;
pub mod store;

pub use correlate::Correlation;
pub use store::{ResultsDb, ATLAS_COLLECTION, EXPERIMENTS_COLLECTION, TRACEROUTE_COLLECTION};
