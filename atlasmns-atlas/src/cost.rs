//! Credit cost and failure classification.
//!
//! The platform charges credits per submitted job. The cost is a pure
//! function of packet count, payload size and measurement kind, so the
//! scheduler can account for spending without asking the platform.

use atlasmns_core::MeasurementKind;

/// Jobs are one-shot and single-packet.
pub const ONE_SHOT_PACKETS: u32 = 1;

/// Minimal payload; anything below one MTU shares the same cost bracket.
pub const ONE_SHOT_PAYLOAD_SIZE: u32 = 48;

/// Credits charged for a job. One-shot jobs are charged double the nominal
/// per-packet rate of a continuous job.
pub fn credit_cost(kind: MeasurementKind, packets: u32, payload_size: u32, one_off: bool) -> i64 {
    let size_multiplier = i64::from(payload_size / 1500 + 1);
    let nominal = i64::from(packets) * size_multiplier * kind.base_rate();
    if one_off {
        2 * nominal
    } else {
        nominal
    }
}

/// Whether a rejection detail describes a rate/quota limit. Those are not
/// errors: the caller re-attempts on a later cycle.
pub fn is_retryable_failure(detail: &str) -> bool {
    let detail = detail.to_ascii_lowercase();
    detail.contains("too many") || detail.contains("concurrent measurements")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn one_shot_single_packet_ping_costs_twenty_credits() {
        assert_eq!(
            credit_cost(MeasurementKind::Ping, ONE_SHOT_PACKETS, ONE_SHOT_PAYLOAD_SIZE, true),
            20
        );
    }

    #[test]
    fn quota_messages_are_retryable() {
        assert!(is_retryable_failure(
            "You have too many measurements running"
        ));
        assert!(is_retryable_failure(
            "Maximum number of concurrent measurements reached"
        ));
        assert!(!is_retryable_failure("Bad request: target not permitted"));
        assert!(!is_retryable_failure(""));
    }

    proptest! {
        #[test]
        fn doubling_packets_doubles_cost(
            packets in 1u32..10_000,
            size in 0u32..60_000,
            one_off in any::<bool>(),
        ) {
            for kind in [MeasurementKind::Ping, MeasurementKind::Traceroute] {
                prop_assert_eq!(
                    credit_cost(kind, 2 * packets, size, one_off),
                    2 * credit_cost(kind, packets, size, one_off)
                );
            }
        }

        #[test]
        fn traceroute_costs_at_least_ten_times_ping(
            packets in 1u32..10_000,
            size in 0u32..60_000,
            one_off in any::<bool>(),
        ) {
            prop_assert!(
                credit_cost(MeasurementKind::Traceroute, packets, size, one_off)
                    >= 10 * credit_cost(MeasurementKind::Ping, packets, size, one_off)
            );
        }

        #[test]
        fn one_shot_jobs_cost_double(
            packets in 1u32..10_000,
            size in 0u32..60_000,
        ) {
            for kind in [MeasurementKind::Ping, MeasurementKind::Traceroute] {
                prop_assert_eq!(
                    credit_cost(kind, packets, size, true),
                    2 * credit_cost(kind, packets, size, false)
                );
            }
        }
    }
}
