//! AtlasMNS Core - Entity Types
//!
//! Data types shared by every AtlasMNS crate: the schedule and result
//! records, the state and measurement-kind enums, error types, timestamp
//! conversion, the configuration surface, and the cancellation token for
//! the polling host. All other crates depend on this.

pub mod cancel;
pub mod config;
pub mod entities;
pub mod enums;
pub mod error;
pub mod telemetry;
pub mod timestamp;

pub use cancel::CancellationToken;
pub use config::{AtlasMnsConfig, DbEndpoint, API_KEY_PLACEHOLDER};
pub use entities::{display_or_empty, AgentLastSeen, AgentProbeTuple, Experiment, ScheduleEntry};
pub use enums::{EntryState, MeasurementKind, TlsMode, UnknownStateError};
pub use error::{AtlasError, ConfigError, ResultsError, StorageError};
pub use timestamp::{from_unix_microseconds, to_unix_microseconds};
