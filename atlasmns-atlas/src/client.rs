//! Blocking client for the RIPE Atlas measurement platform.
//!
//! Submits one-shot ping/traceroute jobs to a single probe, stops jobs, and
//! downloads raw results. Quota rejections are not errors: `submit` reports
//! them as "no outcome yet" so the caller can try again on a later cycle.

use std::collections::BTreeSet;
use std::net::IpAddr;

use serde_json::Value;

use atlasmns_core::{display_or_empty, ConfigError, MeasurementKind, API_KEY_PLACEHOLDER};

use crate::cost::{credit_cost, is_retryable_failure, ONE_SHOT_PACKETS, ONE_SHOT_PAYLOAD_SIZE};
use crate::wire::{build_request, CreateMeasurementResponse, PlatformErrorEnvelope, ProbeInfo};

pub const DEFAULT_BASE_URL: &str = "https://atlas.ripe.net";

// ============================================================================
// SUBMIT OUTCOME
// ============================================================================

/// Result of a submission attempt.
///
/// Three shapes: success (`measurement_id` set, `cost` charged), retryable
/// rejection (everything empty; try again later), terminal rejection
/// (`info` carries the platform's diagnostic for the entry's Info field).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitOutcome {
    pub measurement_id: Option<i64>,
    pub cost: i64,
    pub info: Option<String>,
}

impl SubmitOutcome {
    fn success(measurement_id: i64, cost: i64) -> Self {
        Self {
            measurement_id: Some(measurement_id),
            cost,
            info: None,
        }
    }

    fn retry_later() -> Self {
        Self {
            measurement_id: None,
            cost: 0,
            info: None,
        }
    }

    fn terminal(detail: String) -> Self {
        Self {
            measurement_id: None,
            cost: 0,
            info: Some(detail),
        }
    }

    pub fn is_success(&self) -> bool {
        self.measurement_id.is_some()
    }

    /// No outcome yet; the platform asked us to come back later.
    pub fn is_retryable(&self) -> bool {
        self.measurement_id.is_none() && self.info.is_none()
    }
}

// ============================================================================
// CLIENT
// ============================================================================

/// Client for the platform's v2 HTTP API. One instance per process; calls
/// block until the platform answers.
pub struct AtlasClient {
    api_key: String,
    base_url: String,
    http: reqwest::blocking::Client,
}

impl AtlasClient {
    /// Build a client. An absent or placeholder API key is a hard
    /// configuration error.
    pub fn new(api_key: &str) -> Result<Self, ConfigError> {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    /// Like [`AtlasClient::new`] with a non-default API endpoint; used by
    /// integration tests pointed at a stand-in server.
    pub fn with_base_url(api_key: &str, base_url: &str) -> Result<Self, ConfigError> {
        if api_key.is_empty() || api_key == API_KEY_PLACEHOLDER {
            tracing::error!("no RIPE Atlas API key specified");
            return Err(ConfigError::MissingApiKey);
        }
        Ok(Self {
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            http: reqwest::blocking::Client::new(),
        })
    }

    /// Reachability probe against the platform's anchor listing, run once at
    /// startup.
    pub fn check_connectivity(&self) -> bool {
        tracing::info!("connecting to the RIPE Atlas server");
        match self.http.get(self.url("/api/v2/anchors/")).send() {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::warn!(error = %e, "RIPE Atlas server is unreachable");
                false
            }
        }
    }

    /// Submit a one-shot, single-packet measurement addressed to one probe.
    pub fn submit(
        &self,
        probe_id: i64,
        target: IpAddr,
        description: &str,
        kind: MeasurementKind,
    ) -> SubmitOutcome {
        tracing::trace!(%kind, probe_id, target = %target, "creating measurement");
        let request = build_request(probe_id, target, description, kind);

        let response = match self
            .http
            .post(self.url("/api/v2/measurements/"))
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
        {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, probe_id, "measurement creation request failed");
                return SubmitOutcome::terminal(e.to_string());
            }
        };

        if response.status().is_success() {
            return match response.json::<CreateMeasurementResponse>() {
                Ok(created) if !created.measurements.is_empty() => {
                    let measurement_id = created.measurements[0];
                    let cost = credit_cost(kind, ONE_SHOT_PACKETS, ONE_SHOT_PAYLOAD_SIZE, true);
                    tracing::trace!(%kind, probe_id, measurement_id, cost, "created measurement");
                    SubmitOutcome::success(measurement_id, cost)
                }
                Ok(_) => {
                    tracing::warn!(probe_id, "platform accepted the job but returned no measurement id");
                    SubmitOutcome::terminal("empty measurement list in response".to_string())
                }
                Err(e) => {
                    tracing::warn!(error = %e, probe_id, "cannot decode measurement creation response");
                    SubmitOutcome::terminal(e.to_string())
                }
            };
        }

        let detail = rejection_detail(response);
        if is_retryable_failure(&detail) {
            tracing::debug!(probe_id, detail = %detail, "measurement quota reached, retrying on a later cycle");
            SubmitOutcome::retry_later()
        } else {
            tracing::warn!(%kind, probe_id, target = %target, detail = %detail, "creating measurement failed");
            SubmitOutcome::terminal(detail)
        }
    }

    /// Stop a running measurement.
    pub fn stop(&self, measurement_id: i64) -> bool {
        let url = self.url(&format!("/api/v2/measurements/{measurement_id}/"));
        match self
            .http
            .delete(url)
            .query(&[("key", self.api_key.as_str())])
            .send()
        {
            Ok(response) if response.status().is_success() => {
                tracing::trace!(measurement_id, "stopped measurement");
                true
            }
            Ok(response) => {
                tracing::warn!(measurement_id, status = %response.status(), "stopping measurement failed");
                false
            }
            Err(e) => {
                tracing::warn!(error = %e, measurement_id, "stopping measurement failed");
                false
            }
        }
    }

    /// Download the raw results of a measurement. `None` (after a warning)
    /// when the platform refuses or the body cannot be decoded.
    pub fn download_results(&self, measurement_id: i64) -> Option<Vec<Value>> {
        tracing::trace!(measurement_id, "downloading measurement results");
        let url = self.url(&format!("/api/v2/measurements/{measurement_id}/results/"));
        let response = match self
            .http
            .get(url)
            .query(&[("key", self.api_key.as_str())])
            .send()
        {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                tracing::warn!(measurement_id, status = %response.status(), "downloading results failed");
                return None;
            }
            Err(e) => {
                tracing::warn!(error = %e, measurement_id, "downloading results failed");
                return None;
            }
        };
        match response.json::<Vec<Value>>() {
            Ok(results) => Some(results),
            Err(e) => {
                tracing::warn!(error = %e, measurement_id, "cannot decode measurement results");
                None
            }
        }
    }

    /// Probe metadata for the pretty-printer.
    pub fn probe_info(&self, probe_id: i64) -> Option<ProbeInfo> {
        let url = self.url(&format!("/api/v2/probes/{probe_id}/"));
        match self.http.get(url).send() {
            Ok(response) if response.status().is_success() => response.json().ok(),
            Ok(response) => {
                tracing::warn!(probe_id, status = %response.status(), "probe lookup failed");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, probe_id, "probe lookup failed");
                None
            }
        }
    }

    /// Render downloaded results with per-probe metadata, one block per raw
    /// result, for operator inspection.
    pub fn format_results(&self, results: &[Value]) -> String {
        let mut out = String::from("Results:\n");
        let mut probe_ids = BTreeSet::new();
        for result in results {
            match result.get("prb_id").and_then(Value::as_i64) {
                Some(probe_id) => {
                    probe_ids.insert(probe_id);
                    out.push_str(&format!("- Result from Probe #{probe_id}\n"));
                }
                None => out.push_str("- Result from unknown probe\n"),
            }
            out.push_str(&format!("  {result}\n"));
        }
        out.push_str("Metadata:\n");
        for probe_id in probe_ids {
            out.push_str(&format!("- Metadata for Probe #{probe_id}\n"));
            if let Some(probe) = self.probe_info(probe_id) {
                out.push_str(&format!(
                    "  {} {} {} {} {}\n",
                    display_or_empty(&probe.country_code),
                    display_or_empty(&probe.address_v4),
                    display_or_empty(&probe.asn_v4),
                    display_or_empty(&probe.address_v6),
                    display_or_empty(&probe.asn_v6),
                ));
            }
        }
        out
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Pull the human-readable detail out of a rejection body.
fn rejection_detail(response: reqwest::blocking::Response) -> String {
    let status = response.status();
    let body = response.text().unwrap_or_default();
    match serde_json::from_str::<PlatformErrorEnvelope>(&body) {
        Ok(envelope) if !envelope.error.detail.is_empty() => envelope.error.detail,
        _ if !body.is_empty() => body,
        _ => format!("HTTP status {status}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_api_key_is_rejected() {
        assert_eq!(
            AtlasClient::new(API_KEY_PLACEHOLDER).err(),
            Some(ConfigError::MissingApiKey)
        );
        assert_eq!(AtlasClient::new("").err(), Some(ConfigError::MissingApiKey));
        assert!(AtlasClient::new("0123456789abcdef").is_ok());
    }

    #[test]
    fn retryable_outcome_is_distinguishable_from_terminal() {
        let retryable = SubmitOutcome::retry_later();
        assert!(retryable.is_retryable());
        assert!(!retryable.is_success());
        assert_eq!(retryable.cost, 0);

        let terminal = SubmitOutcome::terminal("target not permitted".to_string());
        assert!(!terminal.is_retryable());
        assert!(!terminal.is_success());
        assert_eq!(terminal.cost, 0);
        assert_eq!(terminal.info.as_deref(), Some("target not permitted"));
    }

    #[test]
    fn formats_results_without_metadata_lookups_for_empty_input() {
        let client = AtlasClient::new("0123456789abcdef").unwrap();
        assert_eq!(client.format_results(&[]), "Results:\nMetadata:\n");
    }
}
