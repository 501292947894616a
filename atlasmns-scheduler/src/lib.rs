//! AtlasMNS Scheduler - Schedule Store and Admission Control
//!
//! PostgreSQL-backed schedule of measurement attempts. The data-access
//! layer survives connection drops with a reconnect-once/retry-once policy;
//! the admission controller enforces at most one scheduled entry per
//! `(agent, traffic class, source address, probe)` tuple; the agent
//! registry tracks which reporting agents are alive.

pub mod admission;
pub mod agents;
pub mod db;
pub mod schedule;

pub use admission::{admit_measurement, evaluate_admission, AdmissionOutcome};
pub use db::ScheduleDb;
pub use schedule::{ScheduleOrder, ScheduleQuery};
