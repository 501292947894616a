//! Wire types for the RIPE Atlas v2 measurement API.

use serde::{Deserialize, Serialize};
use std::net::IpAddr;

use atlasmns_core::MeasurementKind;

use crate::cost::{ONE_SHOT_PACKETS, ONE_SHOT_PAYLOAD_SIZE};

/// Body of `POST /api/v2/measurements/`.
#[derive(Debug, Clone, Serialize)]
pub struct CreateMeasurementRequest {
    pub definitions: Vec<MeasurementDefinition>,
    pub probes: Vec<ProbeSelector>,
    pub is_oneoff: bool,
}

/// One measurement definition. Traceroute measurements carry the ICMP
/// protocol marker; ping measurements have no protocol field.
#[derive(Debug, Clone, Serialize)]
pub struct MeasurementDefinition {
    #[serde(rename = "type")]
    pub kind: String,
    /// Address family, 4 or 6, derived from the target address.
    pub af: u8,
    pub target: String,
    pub description: String,
    pub packets: u32,
    pub size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
}

/// Probe selection: exactly one probe, addressed by identifier.
#[derive(Debug, Clone, Serialize)]
pub struct ProbeSelector {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
    pub requested: u32,
}

/// Success body of the create call.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateMeasurementResponse {
    pub measurements: Vec<i64>,
}

/// Error body of a rejected create call.
#[derive(Debug, Clone, Deserialize)]
pub struct PlatformErrorEnvelope {
    pub error: PlatformError,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlatformError {
    #[serde(default)]
    pub detail: String,
    #[serde(default)]
    pub status: i32,
}

/// Probe metadata from `GET /api/v2/probes/{id}/`.
#[derive(Debug, Clone, Deserialize)]
pub struct ProbeInfo {
    pub id: i64,
    pub country_code: Option<String>,
    pub address_v4: Option<String>,
    pub asn_v4: Option<i64>,
    pub address_v6: Option<String>,
    pub asn_v6: Option<i64>,
}

/// Build the one-shot, single-packet job request addressed to one probe.
pub fn build_request(
    probe_id: i64,
    target: IpAddr,
    description: &str,
    kind: MeasurementKind,
) -> CreateMeasurementRequest {
    let af = match target {
        IpAddr::V4(_) => 4,
        IpAddr::V6(_) => 6,
    };
    let protocol = match kind {
        MeasurementKind::Ping => None,
        MeasurementKind::Traceroute => Some("ICMP".to_string()),
    };
    CreateMeasurementRequest {
        definitions: vec![MeasurementDefinition {
            kind: kind.wire_name().to_string(),
            af,
            target: target.to_string(),
            description: description.to_string(),
            packets: ONE_SHOT_PACKETS,
            size: ONE_SHOT_PAYLOAD_SIZE,
            protocol,
        }],
        probes: vec![ProbeSelector {
            kind: "probes".to_string(),
            value: probe_id.to_string(),
            requested: 1,
        }],
        is_oneoff: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ping_request_has_no_protocol_and_one_probe() {
        let request = build_request(
            6012,
            "192.0.2.17".parse().unwrap(),
            "atlasmns ping",
            MeasurementKind::Ping,
        );
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["is_oneoff"], true);
        assert_eq!(json["definitions"][0]["type"], "ping");
        assert_eq!(json["definitions"][0]["af"], 4);
        assert_eq!(json["definitions"][0]["target"], "192.0.2.17");
        assert_eq!(json["definitions"][0]["packets"], 1);
        assert!(json["definitions"][0].get("protocol").is_none());
        assert_eq!(json["probes"][0]["type"], "probes");
        assert_eq!(json["probes"][0]["value"], "6012");
        assert_eq!(json["probes"][0]["requested"], 1);
    }

    #[test]
    fn traceroute_request_uses_icmp_and_v6_family() {
        let request = build_request(
            7001,
            "2001:db8::1".parse().unwrap(),
            "atlasmns traceroute",
            MeasurementKind::Traceroute,
        );
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["definitions"][0]["type"], "traceroute");
        assert_eq!(json["definitions"][0]["af"], 6);
        assert_eq!(json["definitions"][0]["protocol"], "ICMP");
    }
}
