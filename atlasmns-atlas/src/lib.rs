//! AtlasMNS Atlas - Measurement Platform Client
//!
//! Blocking client for the RIPE Atlas v2 API: one-shot ping and traceroute
//! jobs addressed to a single probe, job stop, raw result download, probe
//! metadata, deterministic credit-cost accounting, and the classification
//! of platform rejections into retryable and terminal failures.

pub mod client;
pub mod cost;
pub mod wire;

pub use client::{AtlasClient, SubmitOutcome, DEFAULT_BASE_URL};
pub use cost::{credit_cost, is_retryable_failure, ONE_SHOT_PACKETS, ONE_SHOT_PAYLOAD_SIZE};
pub use wire::ProbeInfo;
