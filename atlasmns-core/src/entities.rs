//! Schedule and result records.
//!
//! These are plain typed records, constructed once at the store boundary and
//! passed by value afterwards. The schedule store owns `ScheduleEntry` rows;
//! the result importer owns `Experiment` summaries; `AgentLastSeen` rows
//! belong to the agent registry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;

use crate::enums::EntryState;
use crate::timestamp::to_unix_microseconds;

// ============================================================================
// SCHEDULE ENTRY
// ============================================================================

/// One row of the `ExperimentSchedule` table: a single measurement attempt.
///
/// `identifier` is assigned by the database and immutable. The platform
/// fields (`probe_measurement_id`, `probe_cost`, `probe_host_ip`,
/// `probe_from_ip`) stay empty until the measurement has been submitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub identifier: i64,
    pub state: EntryState,
    /// Stamped server-side on every write.
    pub last_change: DateTime<Utc>,
    /// Assigned by the reporting agent, microsecond precision.
    pub agent_measurement_time: DateTime<Utc>,
    pub agent_host_ip: IpAddr,
    pub agent_traffic_class: u8,
    pub agent_from_ip: IpAddr,
    pub probe_id: i64,
    pub probe_measurement_id: Option<i64>,
    pub probe_cost: i64,
    pub probe_host_ip: Option<IpAddr>,
    pub probe_from_ip: Option<IpAddr>,
    /// Free-form diagnostic text, e.g. a submission error.
    pub info: Option<String>,
}

impl ScheduleEntry {
    /// The admission-control key of this entry.
    pub fn tuple(&self) -> AgentProbeTuple {
        AgentProbeTuple {
            agent_host_ip: self.agent_host_ip,
            agent_traffic_class: self.agent_traffic_class,
            agent_from_ip: self.agent_from_ip,
            probe_id: self.probe_id,
        }
    }

    /// Whether a measurement has been submitted for this entry. A scheduled
    /// entry with a measurement identifier is in flight.
    pub fn is_submitted(&self) -> bool {
        self.probe_measurement_id.is_some()
    }
}

impl fmt::Display for ScheduleEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} [{}] {} tc={} from {} via probe #{} msm={} cost={}",
            self.identifier,
            self.state,
            self.agent_host_ip,
            self.agent_traffic_class,
            self.agent_from_ip,
            self.probe_id,
            display_or_empty(&self.probe_measurement_id),
            self.probe_cost
        )
    }
}

/// Renders `None` as an empty string, for log and display output.
pub fn display_or_empty<T: fmt::Display>(value: &Option<T>) -> String {
    match value {
        Some(value) => value.to_string(),
        None => String::new(),
    }
}

// ============================================================================
// AGENT/PROBE TUPLE
// ============================================================================

/// The `(agent host, traffic class, source address, probe)` tuple under
/// which admission control is decided. At most one `scheduled` entry may
/// exist per tuple at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgentProbeTuple {
    pub agent_host_ip: IpAddr,
    pub agent_traffic_class: u8,
    pub agent_from_ip: IpAddr,
    pub probe_id: i64,
}

impl fmt::Display for AgentProbeTuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, tc {}, {}, probe #{})",
            self.agent_host_ip, self.agent_traffic_class, self.agent_from_ip, self.probe_id
        )
    }
}

// ============================================================================
// EXPERIMENT SUMMARY
// ============================================================================

/// Summary record written to the results store when a finished entry is
/// imported. Created once, never mutated. `timestamp` is the agent
/// measurement time in integer microseconds since the Unix epoch, which
/// keeps full precision across both stores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Experiment {
    pub identifier: i64,
    pub timestamp: i64,
    pub agent_host_ip: IpAddr,
    pub agent_traffic_class: u8,
    pub agent_from_ip: IpAddr,
    pub probe_id: i64,
    pub probe_measurement_id: Option<i64>,
    pub probe_cost: i64,
    pub probe_host_ip: Option<IpAddr>,
    pub probe_from_ip: Option<IpAddr>,
}

impl Experiment {
    /// Derive the summary record from a schedule entry at import time.
    pub fn from_entry(entry: &ScheduleEntry) -> Experiment {
        Experiment {
            identifier: entry.identifier,
            timestamp: to_unix_microseconds(entry.agent_measurement_time),
            agent_host_ip: entry.agent_host_ip,
            agent_traffic_class: entry.agent_traffic_class,
            agent_from_ip: entry.agent_from_ip,
            probe_id: entry.probe_id,
            probe_measurement_id: entry.probe_measurement_id,
            probe_cost: entry.probe_cost,
            probe_host_ip: entry.probe_host_ip,
            probe_from_ip: entry.probe_from_ip,
        }
    }
}

// ============================================================================
// AGENT REGISTRY
// ============================================================================

/// Last-seen record for a reporting agent, upserted whenever the agent
/// reports and purged by age.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentLastSeen {
    pub agent_host_ip: IpAddr,
    pub agent_host_name: String,
    pub last_seen: DateTime<Utc>,
    pub location: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn entry() -> ScheduleEntry {
        ScheduleEntry {
            identifier: 7,
            state: EntryState::Scheduled,
            last_change: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            agent_measurement_time: Utc
                .timestamp_micros(1_714_564_800_123_456)
                .single()
                .unwrap(),
            agent_host_ip: "10.1.1.1".parse().unwrap(),
            agent_traffic_class: 0,
            agent_from_ip: "10.1.1.2".parse().unwrap(),
            probe_id: 6012,
            probe_measurement_id: None,
            probe_cost: 0,
            probe_host_ip: None,
            probe_from_ip: None,
            info: None,
        }
    }

    #[test]
    fn experiment_copies_entry_fields_with_microsecond_timestamp() {
        let entry = entry();
        let experiment = Experiment::from_entry(&entry);
        assert_eq!(experiment.identifier, entry.identifier);
        assert_eq!(experiment.timestamp, 1_714_564_800_123_456);
        assert_eq!(experiment.probe_id, entry.probe_id);
        assert_eq!(experiment.probe_measurement_id, None);
    }

    #[test]
    fn submitted_entry_is_in_flight() {
        let mut entry = entry();
        assert!(!entry.is_submitted());
        entry.probe_measurement_id = Some(1234567);
        assert!(entry.is_submitted());
    }

    #[test]
    fn absent_values_render_empty() {
        assert_eq!(display_or_empty::<i64>(&None), "");
        assert_eq!(display_or_empty(&Some(42)), "42");
    }
}
