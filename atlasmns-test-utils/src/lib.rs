//! Test utilities and fixtures for AtlasMNS
//!
//! Fixture builders for schedule entries plus proptest strategies shared by
//! the other crates' tests.

use chrono::{DateTime, TimeZone, Utc};
use proptest::prelude::*;
use std::net::{IpAddr, Ipv4Addr};

use atlasmns_core::{AgentProbeTuple, EntryState, Experiment, ScheduleEntry};

// ============================================================================
// FIXTURES
// ============================================================================

/// A fixed agent measurement time with a non-zero microsecond component.
pub fn measurement_time() -> DateTime<Utc> {
    Utc.timestamp_micros(1_714_564_800_123_456).single().unwrap()
}

/// A representative admission tuple.
pub fn sample_tuple() -> AgentProbeTuple {
    AgentProbeTuple {
        agent_host_ip: IpAddr::V4(Ipv4Addr::new(10, 1, 1, 1)),
        agent_traffic_class: 0,
        agent_from_ip: IpAddr::V4(Ipv4Addr::new(10, 1, 1, 2)),
        probe_id: 6012,
    }
}

/// A schedule entry for the tuple in the given state, platform fields empty.
pub fn entry_for_tuple(
    identifier: i64,
    tuple: &AgentProbeTuple,
    state: EntryState,
) -> ScheduleEntry {
    ScheduleEntry {
        identifier,
        state,
        last_change: measurement_time(),
        agent_measurement_time: measurement_time(),
        agent_host_ip: tuple.agent_host_ip,
        agent_traffic_class: tuple.agent_traffic_class,
        agent_from_ip: tuple.agent_from_ip,
        probe_id: tuple.probe_id,
        probe_measurement_id: None,
        probe_cost: 0,
        probe_host_ip: None,
        probe_from_ip: None,
        info: None,
    }
}

/// A finished entry with the platform fields filled in, as it looks after
/// submission and resolution.
pub fn finished_entry(
    identifier: i64,
    tuple: &AgentProbeTuple,
    probe_measurement_id: i64,
    probe_cost: i64,
) -> ScheduleEntry {
    let mut entry = entry_for_tuple(identifier, tuple, EntryState::Finished);
    entry.probe_measurement_id = Some(probe_measurement_id);
    entry.probe_cost = probe_cost;
    entry.probe_host_ip = Some(IpAddr::V4(Ipv4Addr::new(192, 0, 2, 7)));
    entry.probe_from_ip = Some(IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1)));
    entry
}

/// The summary record the importer would derive from `finished_entry`.
pub fn experiment_for(entry: &ScheduleEntry) -> Experiment {
    Experiment::from_entry(entry)
}

// ============================================================================
// PROPTEST STRATEGIES
// ============================================================================

/// DSCP values fit in six bits.
pub fn arb_traffic_class() -> impl Strategy<Value = u8> {
    0u8..=63
}

pub fn arb_probe_id() -> impl Strategy<Value = i64> {
    1i64..=99_999
}

pub fn arb_state() -> impl Strategy<Value = EntryState> {
    prop_oneof![Just(EntryState::Scheduled), Just(EntryState::Finished)]
}

pub fn arb_ipv4() -> impl Strategy<Value = IpAddr> {
    any::<[u8; 4]>().prop_map(|octets| IpAddr::V4(Ipv4Addr::from(octets)))
}

pub fn arb_tuple() -> impl Strategy<Value = AgentProbeTuple> {
    (arb_ipv4(), arb_traffic_class(), arb_ipv4(), arb_probe_id()).prop_map(
        |(agent_host_ip, agent_traffic_class, agent_from_ip, probe_id)| AgentProbeTuple {
            agent_host_ip,
            agent_traffic_class,
            agent_from_ip,
            probe_id,
        },
    )
}
