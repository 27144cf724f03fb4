//! Pure quorum and timing arithmetic. No I/O, no clocks.

use rand::Rng;

/// Fixed per-attempt allowance for node round-trips, on top of the drift factor.
pub const CLOCK_DRIFT_BASE_MS: u64 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuorumVerdict {
    Granted { validity_ms: u64 },
    QuorumNotReached { granted: usize, quorum: usize },
    LeaseTooShort { validity_ms: i64 },
}

/// Minimum number of agreeing nodes out of `nodes`.
pub fn quorum(nodes: usize) -> usize {
    nodes / 2 + 1
}

/// Safety margin subtracted from the ttl.
pub fn drift_ms(ttl_ms: u64, drift_factor: f64) -> u64 {
    (ttl_ms as f64 * drift_factor).round() as u64 + CLOCK_DRIFT_BASE_MS
}

/// Remaining usable validity; may be negative.
pub fn validity_ms(ttl_ms: u64, elapsed_ms: u64, drift_ms: u64) -> i64 {
    ttl_ms as i64 - elapsed_ms as i64 - drift_ms as i64
}

/// Decide an attempt from the grant count and how long it took.
pub fn evaluate(
    granted: usize,
    nodes: usize,
    ttl_ms: u64,
    elapsed_ms: u64,
    drift_factor: f64,
) -> QuorumVerdict {
    let quorum = quorum(nodes);
    if granted < quorum {
        return QuorumVerdict::QuorumNotReached { granted, quorum };
    }

    let validity = validity_ms(ttl_ms, elapsed_ms, drift_ms(ttl_ms, drift_factor));
    if validity <= 0 {
        QuorumVerdict::LeaseTooShort {
            validity_ms: validity,
        }
    } else {
        QuorumVerdict::Granted {
            validity_ms: validity as u64,
        }
    }
}

/// Delay before the next attempt: uniform over `base ± jitter`, floored at zero.
pub fn retry_delay_ms<R: Rng + ?Sized>(rng: &mut R, base_ms: u64, jitter_ms: u64) -> u64 {
    if jitter_ms == 0 {
        return base_ms;
    }
    let offset = rng.random_range(0..=jitter_ms.saturating_mul(2));
    base_ms.saturating_add(offset).saturating_sub(jitter_ms)
}
