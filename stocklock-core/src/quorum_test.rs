#[cfg(test)]
mod tests {
    use crate::quorum::{self, QuorumVerdict, CLOCK_DRIFT_BASE_MS};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    // =========================================================================
    // Quorum size
    // =========================================================================

    #[test]
    fn quorum_is_strict_majority() {
        assert_eq!(quorum::quorum(1), 1);
        assert_eq!(quorum::quorum(2), 2);
        assert_eq!(quorum::quorum(3), 2);
        assert_eq!(quorum::quorum(4), 3);
        assert_eq!(quorum::quorum(5), 3);
        assert_eq!(quorum::quorum(7), 4);
    }

    #[test]
    fn grant_outcome_matches_majority_formula() {
        for nodes in 1..=7usize {
            for granted in 0..=nodes {
                let verdict = quorum::evaluate(granted, nodes, 5000, 0, 0.01);
                let expected = granted >= nodes / 2 + 1;
                assert_eq!(
                    matches!(verdict, QuorumVerdict::Granted { .. }),
                    expected,
                    "nodes={} granted={}",
                    nodes,
                    granted
                );
            }
        }
    }

    // =========================================================================
    // Drift
    // =========================================================================

    #[test]
    fn drift_is_one_percent_plus_base() {
        assert_eq!(quorum::drift_ms(5000, 0.01), 50 + CLOCK_DRIFT_BASE_MS);
        assert_eq!(quorum::drift_ms(10_000, 0.0), CLOCK_DRIFT_BASE_MS);
    }

    #[test]
    fn validity_subtracts_elapsed_and_drift() {
        let verdict = quorum::evaluate(3, 3, 5000, 10, 0.01);
        assert_eq!(verdict, QuorumVerdict::Granted { validity_ms: 4938 });
    }

    #[test]
    fn quorum_with_no_validity_left_is_too_short() {
        // 5000 - 4948 - 52 = 0
        let verdict = quorum::evaluate(3, 3, 5000, 4948, 0.01);
        assert_eq!(verdict, QuorumVerdict::LeaseTooShort { validity_ms: 0 });

        let verdict = quorum::evaluate(3, 3, 5000, 6000, 0.01);
        assert!(matches!(verdict, QuorumVerdict::LeaseTooShort { validity_ms } if validity_ms < 0));
    }

    #[test]
    fn missing_quorum_wins_over_timing() {
        let verdict = quorum::evaluate(1, 3, 5000, 9999, 0.01);
        assert_eq!(
            verdict,
            QuorumVerdict::QuorumNotReached { granted: 1, quorum: 2 }
        );
    }

    // =========================================================================
    // Retry delay
    // =========================================================================

    #[test]
    fn retry_delay_stays_within_jitter_window() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1000 {
            let delay = quorum::retry_delay_ms(&mut rng, 200, 200);
            assert!(delay <= 400);
        }
    }

    #[test]
    fn retry_delay_without_jitter_is_base() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(quorum::retry_delay_ms(&mut rng, 200, 0), 200);
    }

    #[test]
    fn retry_delay_never_underflows() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..1000 {
            let delay = quorum::retry_delay_ms(&mut rng, 10, 50);
            assert!(delay <= 60);
        }
    }

    #[test]
    fn retry_delay_saturates_on_huge_settings() {
        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..100 {
            let delay = quorum::retry_delay_ms(&mut rng, u64::MAX, u64::MAX);
            assert_eq!(delay, 0);
        }
        let delay = quorum::retry_delay_ms(&mut rng, 200, u64::MAX);
        assert!(delay <= 200);
    }
}
