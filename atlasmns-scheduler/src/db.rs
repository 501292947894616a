//! Resilient access to the PostgreSQL scheduler database.
//!
//! [`ScheduleDb`] owns a single blocking connection. Every operation runs
//! under a bounded-retry policy: on a database error the layer reconnects
//! exactly once (reapplying the session timeouts) and retries the operation
//! once. A failure after the retry is logged as a warning and surfaced as an
//! empty result or a failed write; it never terminates the process. Writes
//! run inside a transaction that commits on success and rolls back on any
//! error, so a failed write leaves the store unchanged.
//!
//! The connection is not safe for concurrent use from multiple threads; one
//! `ScheduleDb` belongs to one polling process.

use std::fmt;
use std::fs;

use native_tls::{Certificate, TlsConnector};
use postgres::config::SslMode;
use postgres::types::ToSql;
use postgres::{Client, Config, Row};
use postgres_native_tls::MakeTlsConnector;

use atlasmns_core::{DbEndpoint, StorageError, TlsMode};

/// Session settings applied on every (re)connect: bound stuck transactions
/// and runaway statements server-side.
const SESSION_SETTINGS: &str =
    "SET idle_in_transaction_session_timeout = 30000; SET statement_timeout = 60000;";

/// Parameter slice type accepted by the query and write entry points.
pub type SqlParams<'a> = &'a [&'a (dyn ToSql + Sync)];

// ============================================================================
// RETRY POLICY
// ============================================================================

/// Run `op`; on failure, reconnect once via `reconnect` and retry `op` once.
///
/// This is the whole resilience policy: at most two attempts and one
/// reconnect per caller invocation, no backoff loop. If the reconnect fails
/// the first error is returned unchanged.
pub(crate) fn retry_once<C, T, E, O, R>(ctx: &mut C, mut op: O, mut reconnect: R) -> Result<T, E>
where
    E: fmt::Display,
    O: FnMut(&mut C) -> Result<T, E>,
    R: FnMut(&mut C) -> bool,
{
    match op(ctx) {
        Ok(value) => Ok(value),
        Err(first) => {
            tracing::debug!(error = %first, "database operation failed, reconnecting once");
            if !reconnect(ctx) {
                return Err(first);
            }
            op(ctx)
        }
    }
}

// ============================================================================
// CONNECTION
// ============================================================================

/// The scheduler database connection with its reconnect configuration.
pub struct ScheduleDb {
    endpoint: DbEndpoint,
    client: Option<Client>,
}

impl ScheduleDb {
    /// Connect to the scheduler database and apply the session settings.
    pub fn connect(endpoint: &DbEndpoint) -> Result<Self, StorageError> {
        tracing::info!(server = %endpoint.server, "connecting to the PostgreSQL scheduler database");
        let client = open_client(endpoint)?;
        Ok(Self {
            endpoint: endpoint.clone(),
            client: Some(client),
        })
    }

    /// Run a parameterized query. Returns the matching rows, or an empty
    /// vec (after a warning) if the operation still fails after the single
    /// reconnect-and-retry.
    pub fn query_rows(&mut self, sql: &str, params: SqlParams<'_>) -> Vec<Row> {
        match retry_once(
            self,
            |db| db.attempt_query(sql, params),
            |db| db.reconnect(),
        ) {
            Ok(rows) => rows,
            Err(e) => {
                tracing::warn!(error = %e, statement = sql, "query failed after reconnect");
                Vec::new()
            }
        }
    }

    /// Run a parameterized command inside a transaction. Returns whether the
    /// transaction committed; a `false` result (after a warning) means the
    /// store is unchanged.
    pub fn execute_write(&mut self, sql: &str, params: SqlParams<'_>) -> bool {
        match retry_once(
            self,
            |db| db.attempt_write(sql, params),
            |db| db.reconnect(),
        ) {
            Ok(_rows) => true,
            Err(e) => {
                tracing::warn!(error = %e, statement = sql, "write failed after reconnect");
                false
            }
        }
    }

    fn attempt_query(&mut self, sql: &str, params: SqlParams<'_>) -> Result<Vec<Row>, StorageError> {
        let client = self.client.as_mut().ok_or_else(not_connected)?;
        client.query(sql, params).map_err(|e| StorageError::Query {
            reason: e.to_string(),
        })
    }

    fn attempt_write(&mut self, sql: &str, params: SqlParams<'_>) -> Result<u64, StorageError> {
        let client = self.client.as_mut().ok_or_else(not_connected)?;
        let mut transaction = client.transaction().map_err(|e| StorageError::Write {
            reason: e.to_string(),
        })?;
        // Dropping the transaction on an error path rolls it back.
        let rows = transaction
            .execute(sql, params)
            .map_err(|e| StorageError::Write {
                reason: e.to_string(),
            })?;
        transaction.commit().map_err(|e| StorageError::Write {
            reason: e.to_string(),
        })?;
        Ok(rows)
    }

    /// Drop the current connection and open a fresh one.
    fn reconnect(&mut self) -> bool {
        self.client = None;
        match open_client(&self.endpoint) {
            Ok(client) => {
                self.client = Some(client);
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, server = %self.endpoint.server, "reconnect failed");
                false
            }
        }
    }
}

fn not_connected() -> StorageError {
    StorageError::Query {
        reason: "no database connection".to_string(),
    }
}

fn open_client(endpoint: &DbEndpoint) -> Result<Client, StorageError> {
    let mut config = Config::new();
    config
        .host(&endpoint.server)
        .port(endpoint.port)
        .user(&endpoint.user)
        .dbname(&endpoint.database)
        .ssl_mode(SslMode::Require);
    if let Some(password) = &endpoint.password {
        config.password(password);
    }

    let connector = build_tls_connector(&endpoint.tls).map_err(|reason| StorageError::Connect {
        server: endpoint.server.clone(),
        reason,
    })?;
    let mut client = config
        .connect(MakeTlsConnector::new(connector))
        .map_err(|e| StorageError::Connect {
            server: endpoint.server.clone(),
            reason: e.to_string(),
        })?;

    client
        .batch_execute(SESSION_SETTINGS)
        .map_err(|e| StorageError::Connect {
            server: endpoint.server.clone(),
            reason: e.to_string(),
        })?;
    Ok(client)
}

fn build_tls_connector(mode: &TlsMode) -> Result<TlsConnector, String> {
    let mut builder = TlsConnector::builder();
    match mode {
        TlsMode::Insecure => {
            tracing::warn!("TLS certificate check for the scheduler database is turned off");
            builder.danger_accept_invalid_certs(true);
        }
        TlsMode::SystemDefault => {}
        TlsMode::CustomCa(path) => {
            let pem = fs::read(path)
                .map_err(|e| format!("cannot read CA file {}: {}", path.display(), e))?;
            let certificate = Certificate::from_pem(&pem)
                .map_err(|e| format!("cannot parse CA file {}: {}", path.display(), e))?;
            builder.add_root_certificate(certificate);
        }
    }
    builder.build().map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::retry_once;

    /// Scripted fake: `op` fails `failures` times, `reconnect` succeeds or
    /// not, and every call is counted.
    struct Script {
        failures: u32,
        reconnect_ok: bool,
        op_calls: u32,
        reconnect_calls: u32,
    }

    fn run(script: &mut Script) -> Result<&'static str, String> {
        retry_once(
            script,
            |s| {
                s.op_calls += 1;
                if s.failures > 0 {
                    s.failures -= 1;
                    Err("connection reset".to_string())
                } else {
                    Ok("rows")
                }
            },
            |s| {
                s.reconnect_calls += 1;
                s.reconnect_ok
            },
        )
    }

    #[test]
    fn first_attempt_success_skips_reconnect() {
        let mut script = Script {
            failures: 0,
            reconnect_ok: true,
            op_calls: 0,
            reconnect_calls: 0,
        };
        assert_eq!(run(&mut script), Ok("rows"));
        assert_eq!(script.op_calls, 1);
        assert_eq!(script.reconnect_calls, 0);
    }

    #[test]
    fn failure_then_success_after_reconnect_is_success() {
        let mut script = Script {
            failures: 1,
            reconnect_ok: true,
            op_calls: 0,
            reconnect_calls: 0,
        };
        assert_eq!(run(&mut script), Ok("rows"));
        assert_eq!(script.op_calls, 2);
        assert_eq!(script.reconnect_calls, 1);
    }

    #[test]
    fn retry_happens_exactly_once() {
        let mut script = Script {
            failures: 5,
            reconnect_ok: true,
            op_calls: 0,
            reconnect_calls: 0,
        };
        assert!(run(&mut script).is_err());
        assert_eq!(script.op_calls, 2);
        assert_eq!(script.reconnect_calls, 1);
    }

    #[test]
    fn failed_reconnect_returns_the_first_error() {
        let mut script = Script {
            failures: 1,
            reconnect_ok: false,
            op_calls: 0,
            reconnect_calls: 0,
        };
        assert_eq!(run(&mut script), Err("connection reset".to_string()));
        assert_eq!(script.op_calls, 1);
        assert_eq!(script.reconnect_calls, 1);
    }
}
