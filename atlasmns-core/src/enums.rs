//! Enum types for AtlasMNS entities

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

// ============================================================================
// SCHEDULE ENTRY STATE
// ============================================================================

/// Lifecycle state of a schedule entry.
///
/// An entry that is `Scheduled` and already carries a platform measurement
/// identifier is in flight; the state column itself only distinguishes
/// whether the entry has been resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryState {
    /// Waiting for submission, or submitted and not yet resolved.
    Scheduled,
    /// Resolved; results may be imported.
    Finished,
}

impl EntryState {
    /// The string stored in the `State` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryState::Scheduled => "scheduled",
            EntryState::Finished => "finished",
        }
    }
}

impl fmt::Display for EntryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A `State` column value that is neither `scheduled` nor `finished`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown schedule state: {0}")]
pub struct UnknownStateError(pub String);

impl FromStr for EntryState {
    type Err = UnknownStateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(EntryState::Scheduled),
            "finished" => Ok(EntryState::Finished),
            other => Err(UnknownStateError(other.to_string())),
        }
    }
}

// ============================================================================
// MEASUREMENT KIND
// ============================================================================

/// Kind of active measurement submitted to the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeasurementKind {
    Ping,
    Traceroute,
}

impl MeasurementKind {
    /// Wire name used in the platform's measurement definition.
    pub fn wire_name(&self) -> &'static str {
        match self {
            MeasurementKind::Ping => "ping",
            MeasurementKind::Traceroute => "traceroute",
        }
    }

    /// Per-packet credit base rate charged by the platform.
    pub fn base_rate(&self) -> i64 {
        match self {
            MeasurementKind::Ping => 10,
            MeasurementKind::Traceroute => 100,
        }
    }
}

impl fmt::Display for MeasurementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

// ============================================================================
// TLS MODE
// ============================================================================

/// How a database connection validates the server certificate.
///
/// Decided once at configuration-load time from the `*_cafile` option, so
/// the connection code never compares strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TlsMode {
    /// Encrypt but accept any certificate.
    Insecure,
    /// Verify against the system CA store.
    SystemDefault,
    /// Verify against the given CA file.
    CustomCa(PathBuf),
}

impl TlsMode {
    /// Map the configuration-file convention onto a mode: `IGNORE` turns
    /// certificate checks off, `None` (or an empty value) uses the system
    /// CA store, anything else is a CA file path.
    pub fn from_config_value(value: &str) -> TlsMode {
        match value.trim() {
            "IGNORE" => TlsMode::Insecure,
            "" | "None" => TlsMode::SystemDefault,
            path => TlsMode::CustomCa(PathBuf::from(path)),
        }
    }
}

impl Default for TlsMode {
    fn default() -> Self {
        TlsMode::SystemDefault
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_state_round_trips_through_column_string() {
        for state in [EntryState::Scheduled, EntryState::Finished] {
            assert_eq!(state.as_str().parse::<EntryState>(), Ok(state));
        }
        assert!("agent_scheduled".parse::<EntryState>().is_err());
    }

    #[test]
    fn traceroute_base_rate_is_an_order_of_magnitude_above_ping() {
        assert!(MeasurementKind::Traceroute.base_rate() >= 10 * MeasurementKind::Ping.base_rate());
    }

    #[test]
    fn tls_mode_follows_cafile_convention() {
        assert_eq!(TlsMode::from_config_value("IGNORE"), TlsMode::Insecure);
        assert_eq!(TlsMode::from_config_value("None"), TlsMode::SystemDefault);
        assert_eq!(TlsMode::from_config_value(""), TlsMode::SystemDefault);
        assert_eq!(
            TlsMode::from_config_value("/etc/ssl/db-ca.pem"),
            TlsMode::CustomCa(PathBuf::from("/etc/ssl/db-ca.pem"))
        );
    }
}
