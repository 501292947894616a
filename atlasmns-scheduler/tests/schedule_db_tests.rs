#![cfg(feature = "db-tests")]
//! Integration tests against a live PostgreSQL scheduler database.
//!
//! Requires a disposable database with `sql/schema.sql` applied and TLS
//! enabled (the data-access layer always requests TLS). Connection
//! parameters come from the `ATLASMNS_TEST_DB_*` environment variables.

use std::time::{SystemTime, UNIX_EPOCH};

use atlasmns_core::{AgentProbeTuple, DbEndpoint, EntryState, TlsMode};
use atlasmns_scheduler::{admit_measurement, AdmissionOutcome, ScheduleDb, ScheduleQuery};
use atlasmns_test_utils::{measurement_time, sample_tuple};

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn test_endpoint() -> DbEndpoint {
    DbEndpoint {
        server: env_or("ATLASMNS_TEST_DB_HOST", "localhost"),
        port: env_or("ATLASMNS_TEST_DB_PORT", "5432").parse().unwrap(),
        user: env_or("ATLASMNS_TEST_DB_USER", "scheduler"),
        password: Some(env_or("ATLASMNS_TEST_DB_PASSWORD", "scheduler")),
        database: env_or("ATLASMNS_TEST_DB_NAME", "atlasmsdb_test"),
        tls: TlsMode::Insecure,
    }
}

fn test_db() -> ScheduleDb {
    ScheduleDb::connect(&test_endpoint()).expect("scheduler test database must be reachable")
}

/// A tuple no other test run has used, so admission history starts empty.
fn unique_tuple() -> AgentProbeTuple {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    AgentProbeTuple {
        probe_id: 1_000_000 + (nanos % 900_000_000_000) as i64,
        ..sample_tuple()
    }
}

#[test]
fn insert_then_query_returns_a_fresh_scheduled_entry() {
    let mut db = test_db();
    let tuple = unique_tuple();

    assert!(db.insert_entry(&tuple, measurement_time()));
    let entries = db.entries_for_tuple(&tuple);
    assert_eq!(entries.len(), 1);

    let entry = &entries[0];
    assert_eq!(entry.state, EntryState::Scheduled);
    assert_eq!(entry.probe_measurement_id, None);
    assert_eq!(entry.probe_cost, 0);
    assert_eq!(entry.probe_host_ip, None);
    assert_eq!(entry.agent_measurement_time, measurement_time());

    let by_id = db.query_schedule(&ScheduleQuery::ById(entry.identifier));
    assert_eq!(by_id, entries);
}

#[test]
fn full_lifecycle_admit_finish_readmit_import_key() {
    let mut db = test_db();
    let tuple = unique_tuple();

    // Absent tuple: admitted, one scheduled row appears.
    assert_eq!(
        admit_measurement(&mut db, &tuple, measurement_time(), false),
        AdmissionOutcome::Admitted
    );
    // Duplicate before resolution: rejected, still one row.
    assert_eq!(
        admit_measurement(&mut db, &tuple, measurement_time(), false),
        AdmissionOutcome::DuplicateScheduled
    );
    let entries = db.entries_for_tuple(&tuple);
    assert_eq!(entries.len(), 1);

    // Resolve the run with a platform measurement id and cost.
    let mut entry = entries[0].clone();
    entry.state = EntryState::Finished;
    entry.probe_measurement_id = Some(23080624);
    entry.probe_cost = 20;
    assert!(db.update_entry(&entry));

    // Re-admission appends a second row; the finished one is untouched.
    assert_eq!(
        admit_measurement(&mut db, &tuple, measurement_time(), false),
        AdmissionOutcome::Admitted
    );
    let entries = db.entries_for_tuple(&tuple);
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].state, EntryState::Finished);
    assert_eq!(entries[0].probe_measurement_id, Some(23080624));
    assert_eq!(entries[0].probe_cost, 20);
    assert_eq!(entries[1].state, EntryState::Scheduled);
}

#[test]
fn dry_run_admission_checks_without_writing() {
    let mut db = test_db();
    let tuple = unique_tuple();

    assert_eq!(
        admit_measurement(&mut db, &tuple, measurement_time(), true),
        AdmissionOutcome::Admitted
    );
    assert!(db.entries_for_tuple(&tuple).is_empty());
}

#[test]
fn delete_only_removes_scheduled_entries() {
    let mut db = test_db();
    let tuple = unique_tuple();

    assert!(db.insert_entry(&tuple, measurement_time()));
    let mut entry = db.entries_for_tuple(&tuple).remove(0);

    // Finished entries are immutable-by-deletion.
    entry.state = EntryState::Finished;
    assert!(db.update_entry(&entry));
    assert!(db.delete_entry(&tuple));
    assert_eq!(db.entries_for_tuple(&tuple).len(), 1);

    // A scheduled entry goes away.
    entry.state = EntryState::Scheduled;
    assert!(db.update_entry(&entry));
    assert!(db.delete_entry(&tuple));
    assert!(db.entries_for_tuple(&tuple).is_empty());
}

#[test]
fn last_change_is_stamped_server_side_on_update() {
    let mut db = test_db();
    let tuple = unique_tuple();

    assert!(db.insert_entry(&tuple, measurement_time()));
    let entry = db.entries_for_tuple(&tuple).remove(0);

    // Feed a bogus LastChange through a full-row update; the server stamp
    // must win.
    let mut stale = entry.clone();
    stale.last_change = measurement_time();
    assert!(db.update_entry(&stale));
    let reread = db.entries_for_tuple(&tuple).remove(0);
    assert!(reread.last_change > measurement_time());
}

#[test]
fn agent_registry_upserts_and_purges() {
    let mut db = test_db();
    let host_ip: std::net::IpAddr = "192.0.2.201".parse().unwrap();

    assert!(db.record_agent(host_ip, "agent-a.example.net", None));
    assert!(db.record_agent(host_ip, "agent-a.example.net", Some("lab-1")));

    let agents = db.query_agents();
    let agent = agents
        .iter()
        .find(|agent| agent.agent_host_ip == host_ip)
        .expect("agent must be registered");
    assert_eq!(agent.location.as_deref(), Some("lab-1"));

    // Nothing is older than a day in this test run.
    assert!(db.purge_agents(chrono::Duration::days(1)));
    assert!(db
        .query_agents()
        .iter()
        .any(|agent| agent.agent_host_ip == host_ip));

    // Purging with a zero horizon drops everything seen before "now".
    assert!(db.purge_agents(chrono::Duration::zero()));
}
