//! Agent registry: which reporting agents have been seen, and when.

use chrono::Duration;
use postgres::Row;

use atlasmns_core::{AgentLastSeen, StorageError};

use crate::db::ScheduleDb;

impl ScheduleDb {
    /// Record that an agent reported just now. Upserts on the host address.
    pub fn record_agent(
        &mut self,
        agent_host_ip: std::net::IpAddr,
        agent_host_name: &str,
        location: Option<&str>,
    ) -> bool {
        self.execute_write(
            "INSERT INTO AgentLastSeen (AgentHostIP, AgentHostName, LastSeen, Location) \
             VALUES ($1, $2, NOW(), $3) \
             ON CONFLICT (AgentHostIP) DO UPDATE SET \
             AgentHostName = EXCLUDED.AgentHostName, LastSeen = NOW(), Location = EXCLUDED.Location",
            &[&agent_host_ip.to_string(), &agent_host_name, &location],
        )
    }

    /// All known agents, most recently seen first.
    pub fn query_agents(&mut self) -> Vec<AgentLastSeen> {
        let rows = self.query_rows(
            "SELECT AgentHostIP, AgentHostName, LastSeen, Location \
             FROM AgentLastSeen ORDER BY LastSeen DESC",
            &[],
        );
        rows.iter()
            .filter_map(|row| match agent_from_row(row) {
                Ok(agent) => Some(agent),
                Err(e) => {
                    tracing::warn!(error = %e, "skipping undecodable agent row");
                    None
                }
            })
            .collect()
    }

    /// Drop agents not seen within `max_age`.
    pub fn purge_agents(&mut self, max_age: Duration) -> bool {
        let cutoff = chrono::Utc::now() - max_age;
        tracing::debug!(%cutoff, "purging stale agents");
        self.execute_write(
            "DELETE FROM AgentLastSeen WHERE LastSeen < $1",
            &[&cutoff],
        )
    }
}

fn agent_from_row(row: &Row) -> Result<AgentLastSeen, StorageError> {
    let host_ip: String = row.try_get(0).map_err(|e| decode("AgentHostIP", e))?;
    Ok(AgentLastSeen {
        agent_host_ip: host_ip.parse().map_err(|e| decode("AgentHostIP", e))?,
        agent_host_name: row.try_get(1).map_err(|e| decode("AgentHostName", e))?,
        last_seen: row.try_get(2).map_err(|e| decode("LastSeen", e))?,
        location: row.try_get(3).map_err(|e| decode("Location", e))?,
    })
}

fn decode(column: &'static str, error: impl std::fmt::Display) -> StorageError {
    StorageError::RowDecode {
        column,
        reason: error.to_string(),
    }
}
