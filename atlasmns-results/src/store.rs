//! Connection to the MongoDB results database.
//!
//! Three collections: raw platform results (`atlas`), raw local traceroute
//! tool results (`traceroute`), and the experiment summaries
//! (`experiments`). Queries are equality filters only; nothing is joined in
//! the store itself.

use mongodb::bson::Document;
use mongodb::options::{AuthMechanism, ClientOptions, Credential, ServerAddress, Tls, TlsOptions};
use mongodb::sync::{Client, Database};

use atlasmns_core::{DbEndpoint, ResultsError, TlsMode};

/// Raw platform results, keyed by `msm_id`.
pub const ATLAS_COLLECTION: &str = "atlas";
/// Raw local tool results, keyed by microsecond `timestamp`.
pub const TRACEROUTE_COLLECTION: &str = "traceroute";
/// Experiment summaries, keyed by `identifier`.
pub const EXPERIMENTS_COLLECTION: &str = "experiments";

/// The results database handle. Calls block; one instance per process.
pub struct ResultsDb {
    db: Database,
}

impl ResultsDb {
    /// Connect with SCRAM-SHA-1 credentials and the configured TLS mode.
    pub fn connect(endpoint: &DbEndpoint) -> Result<Self, ResultsError> {
        tracing::info!(server = %endpoint.server, "connecting to the MongoDB results database");

        let tls_options = match &endpoint.tls {
            TlsMode::Insecure => {
                tracing::warn!("TLS certificate check for the results database is turned off");
                TlsOptions::builder()
                    .allow_invalid_certificates(true)
                    .build()
            }
            TlsMode::SystemDefault => TlsOptions::default(),
            TlsMode::CustomCa(path) => TlsOptions::builder().ca_file_path(path.clone()).build(),
        };

        let credential = Credential::builder()
            .username(endpoint.user.clone())
            .password(endpoint.password.clone())
            .source(endpoint.database.clone())
            .mechanism(AuthMechanism::ScramSha1)
            .build();

        let options = ClientOptions::builder()
            .hosts(vec![ServerAddress::Tcp {
                host: endpoint.server.clone(),
                port: Some(endpoint.port),
            }])
            .tls(Tls::Enabled(tls_options))
            .credential(credential)
            .build();

        let client = Client::with_options(options).map_err(|e| ResultsError::Connect {
            server: endpoint.server.clone(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            db: client.database(&endpoint.database),
        })
    }

    /// Equality-filter find on a collection. Query failures surface as an
    /// empty result with a warning, consistent with the rest of the system.
    pub(crate) fn find_documents(&self, collection: &str, filter: Document) -> Vec<Document> {
        let cursor = match self.db.collection::<Document>(collection).find(filter).run() {
            Ok(cursor) => cursor,
            Err(e) => {
                tracing::warn!(error = %e, collection, "results query failed");
                return Vec::new();
            }
        };
        let mut documents = Vec::new();
        for document in cursor {
            match document {
                Ok(document) => documents.push(document),
                Err(e) => {
                    tracing::warn!(error = %e, collection, "skipping undecodable result document");
                }
            }
        }
        documents
    }

    pub(crate) fn database(&self) -> &Database {
        &self.db
    }
}
