//! Schedule store operations on the `ExperimentSchedule` table.
//!
//! Identifiers are assigned by the database sequence. `LastChange` is always
//! stamped server-side with `NOW()`, regardless of what the caller put in
//! the entry. Rows that cannot be decoded are skipped with a warning rather
//! than failing the whole query.

use chrono::{DateTime, Utc};
use postgres::types::ToSql;
use postgres::Row;

use atlasmns_core::{AgentProbeTuple, EntryState, ScheduleEntry, StorageError};

use crate::db::ScheduleDb;

/// Column list shared by every SELECT; `entry_from_row` decodes positionally
/// in this order.
const SELECT_ENTRY: &str = "SELECT Identifier, State, LastChange, AgentMeasurementTime, \
     AgentHostIP, AgentTrafficClass, AgentFromIP, ProbeID, \
     ProbeMeasurementID, ProbeCost, ProbeHostIP, ProbeFromIP, Info \
     FROM ExperimentSchedule";

// ============================================================================
// QUERY MODES
// ============================================================================

/// Processing order for filtered queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScheduleOrder {
    /// Oldest pending first; what the polling consumer wants.
    #[default]
    LastChangeAsc,
    /// Most recent first, for "latest N" inspection.
    IdentifierDesc,
}

impl ScheduleOrder {
    fn sql(&self) -> &'static str {
        match self {
            ScheduleOrder::LastChangeAsc => "ORDER BY LastChange ASC",
            ScheduleOrder::IdentifierDesc => "ORDER BY Identifier DESC",
        }
    }
}

/// The three mutually exclusive ways to query the schedule.
#[derive(Debug, Clone, PartialEq)]
pub enum ScheduleQuery {
    /// Exactly one entry by identifier.
    ById(i64),
    /// The entries in an identifier set.
    ByIds(Vec<i64>),
    /// Optional state filter with ordering and pagination.
    Filtered {
        state: Option<EntryState>,
        limit: Option<i64>,
        order: ScheduleOrder,
    },
}

impl ScheduleQuery {
    /// The polling consumer's default: scheduled entries, oldest first.
    pub fn pending() -> Self {
        ScheduleQuery::Filtered {
            state: Some(EntryState::Scheduled),
            limit: None,
            order: ScheduleOrder::LastChangeAsc,
        }
    }
}

// ============================================================================
// STORE OPERATIONS
// ============================================================================

impl ScheduleDb {
    /// Query schedule entries.
    pub fn query_schedule(&mut self, query: &ScheduleQuery) -> Vec<ScheduleEntry> {
        tracing::trace!(?query, "querying schedule");
        let rows = match query {
            ScheduleQuery::ById(identifier) => self.query_rows(
                &format!("{SELECT_ENTRY} WHERE Identifier = $1"),
                &[identifier],
            ),
            ScheduleQuery::ByIds(identifiers) => self.query_rows(
                &format!("{SELECT_ENTRY} WHERE Identifier = ANY($1) ORDER BY Identifier ASC"),
                &[identifiers],
            ),
            ScheduleQuery::Filtered {
                state,
                limit,
                order,
            } => {
                let mut sql = SELECT_ENTRY.to_string();
                let mut params: Vec<&(dyn ToSql + Sync)> = Vec::new();
                let state_text = state.as_ref().map(|s| s.as_str().to_string());
                if let Some(state_text) = state_text.as_ref() {
                    sql.push_str(" WHERE State = $1");
                    params.push(state_text);
                }
                sql.push(' ');
                sql.push_str(order.sql());
                if let Some(limit) = limit.as_ref() {
                    sql.push_str(&format!(" LIMIT ${}", params.len() + 1));
                    params.push(limit);
                }
                self.query_rows(&sql, &params)
            }
        };
        decode_entries(&rows)
    }

    /// All entries for an admission tuple, ordered by identifier ascending.
    pub fn entries_for_tuple(&mut self, tuple: &AgentProbeTuple) -> Vec<ScheduleEntry> {
        let rows = self.query_rows(
            &format!(
                "{SELECT_ENTRY} WHERE AgentHostIP = $1 AND AgentTrafficClass = $2 \
                 AND AgentFromIP = $3 AND ProbeID = $4 ORDER BY Identifier ASC"
            ),
            &[
                &tuple.agent_host_ip.to_string(),
                &i16::from(tuple.agent_traffic_class),
                &tuple.agent_from_ip.to_string(),
                &tuple.probe_id,
            ],
        );
        decode_entries(&rows)
    }

    /// Full-row update by identifier. `LastChange` is stamped with `NOW()`
    /// server-side.
    pub fn update_entry(&mut self, entry: &ScheduleEntry) -> bool {
        tracing::trace!(entry = %entry, "updating scheduled entry");
        self.execute_write(
            "UPDATE ExperimentSchedule SET \
             State = $1, LastChange = NOW(), AgentMeasurementTime = $2, \
             AgentHostIP = $3, AgentTrafficClass = $4, AgentFromIP = $5, \
             ProbeID = $6, ProbeMeasurementID = $7, ProbeCost = $8, \
             ProbeHostIP = $9, ProbeFromIP = $10, Info = $11 \
             WHERE Identifier = $12",
            &[
                &entry.state.as_str(),
                &entry.agent_measurement_time,
                &entry.agent_host_ip.to_string(),
                &i16::from(entry.agent_traffic_class),
                &entry.agent_from_ip.to_string(),
                &entry.probe_id,
                &entry.probe_measurement_id,
                &entry.probe_cost,
                &entry.probe_host_ip.map(|ip| ip.to_string()),
                &entry.probe_from_ip.map(|ip| ip.to_string()),
                &entry.info,
            ],
        )
    }

    /// Insert a fresh scheduled row for the tuple. All platform-assigned
    /// fields start empty.
    pub fn insert_entry(
        &mut self,
        tuple: &AgentProbeTuple,
        agent_measurement_time: DateTime<Utc>,
    ) -> bool {
        tracing::trace!(tuple = %tuple, "inserting scheduled entry");
        self.execute_write(
            "INSERT INTO ExperimentSchedule \
             (State, LastChange, AgentMeasurementTime, AgentHostIP, AgentTrafficClass, \
              AgentFromIP, ProbeID, ProbeMeasurementID, ProbeCost, ProbeHostIP, ProbeFromIP, Info) \
             VALUES ('scheduled', NOW(), $1, $2, $3, $4, $5, NULL, 0, NULL, NULL, NULL)",
            &[
                &agent_measurement_time,
                &tuple.agent_host_ip.to_string(),
                &i16::from(tuple.agent_traffic_class),
                &tuple.agent_from_ip.to_string(),
                &tuple.probe_id,
            ],
        )
    }

    /// Delete the tuple's entry while it is still scheduled. Entries that
    /// have progressed past scheduling are not deletable; the statement
    /// matches nothing and the rows stay.
    pub fn delete_entry(&mut self, tuple: &AgentProbeTuple) -> bool {
        tracing::trace!(tuple = %tuple, "deleting scheduled entry");
        self.execute_write(
            "DELETE FROM ExperimentSchedule \
             WHERE State = 'scheduled' AND AgentHostIP = $1 AND AgentTrafficClass = $2 \
             AND AgentFromIP = $3 AND ProbeID = $4",
            &[
                &tuple.agent_host_ip.to_string(),
                &i16::from(tuple.agent_traffic_class),
                &tuple.agent_from_ip.to_string(),
                &tuple.probe_id,
            ],
        )
    }
}

// ============================================================================
// ROW DECODING
// ============================================================================

fn decode_entries(rows: &[Row]) -> Vec<ScheduleEntry> {
    rows.iter()
        .filter_map(|row| match entry_from_row(row) {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!(error = %e, "skipping undecodable schedule row");
                None
            }
        })
        .collect()
}

fn entry_from_row(row: &Row) -> Result<ScheduleEntry, StorageError> {
    let state: String = get(row, 1, "State")?;
    let state = state
        .parse::<EntryState>()
        .map_err(|e| decode_error("State", e))?;
    let traffic_class: i16 = get(row, 5, "AgentTrafficClass")?;
    let traffic_class =
        u8::try_from(traffic_class).map_err(|e| decode_error("AgentTrafficClass", e))?;

    Ok(ScheduleEntry {
        identifier: get(row, 0, "Identifier")?,
        state,
        last_change: get(row, 2, "LastChange")?,
        agent_measurement_time: get(row, 3, "AgentMeasurementTime")?,
        agent_host_ip: parse_ip(get(row, 4, "AgentHostIP")?, "AgentHostIP")?,
        agent_traffic_class: traffic_class,
        agent_from_ip: parse_ip(get(row, 6, "AgentFromIP")?, "AgentFromIP")?,
        probe_id: get(row, 7, "ProbeID")?,
        probe_measurement_id: get(row, 8, "ProbeMeasurementID")?,
        probe_cost: get(row, 9, "ProbeCost")?,
        probe_host_ip: parse_optional_ip(get(row, 10, "ProbeHostIP")?, "ProbeHostIP")?,
        probe_from_ip: parse_optional_ip(get(row, 11, "ProbeFromIP")?, "ProbeFromIP")?,
        info: get(row, 12, "Info")?,
    })
}

fn get<'a, T: postgres::types::FromSql<'a>>(
    row: &'a Row,
    index: usize,
    column: &'static str,
) -> Result<T, StorageError> {
    row.try_get(index).map_err(|e| decode_error(column, e))
}

fn parse_ip(text: String, column: &'static str) -> Result<std::net::IpAddr, StorageError> {
    text.parse().map_err(|e| decode_error(column, e))
}

fn parse_optional_ip(
    text: Option<String>,
    column: &'static str,
) -> Result<Option<std::net::IpAddr>, StorageError> {
    text.map(|t| parse_ip(t, column)).transpose()
}

fn decode_error(column: &'static str, error: impl std::fmt::Display) -> StorageError {
    StorageError::RowDecode {
        column,
        reason: error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_order_is_oldest_pending_first() {
        assert_eq!(ScheduleOrder::default(), ScheduleOrder::LastChangeAsc);
        assert_eq!(
            ScheduleQuery::pending(),
            ScheduleQuery::Filtered {
                state: Some(EntryState::Scheduled),
                limit: None,
                order: ScheduleOrder::LastChangeAsc,
            }
        );
    }
}
