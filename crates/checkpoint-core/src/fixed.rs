use fixed::types::I32F32;

/// Q32.32 fixed-point: 32 integer bits, 32 fractional bits.
pub type Fixed64 = I32F32;

/// Simulated time in milliseconds since the session started.
pub type SimMillis = u64;

/// Progress value at which a station considers its work done.
pub const PERCENT_COMPLETE: Fixed64 = Fixed64::const_from_int(100);

/// Convert an f64 to Fixed64. Use only for initialization, never in sim loop.
#[inline]
pub fn f64_to_fixed64(v: f64) -> Fixed64 {
    Fixed64::from_num(v)
}

/// Convert Fixed64 to f64. Use only for display, never in sim loop.
#[inline]
pub fn fixed64_to_f64(v: Fixed64) -> f64 {
    v.to_num::<f64>()
}

/// Percentage of `total_ms` covered by `elapsed_ms`, clamped to 100.
///
/// A zero `total_ms` counts as already complete.
pub fn percent_of(elapsed_ms: SimMillis, total_ms: SimMillis) -> Fixed64 {
    if total_ms == 0 || elapsed_ms >= total_ms {
        return PERCENT_COMPLETE;
    }
    // elapsed < total, so the quotient stays below 100 << 32.
    let bits = ((u128::from(elapsed_ms) * 100) << 32) / u128::from(total_ms);
    i64::try_from(bits).map_or(PERCENT_COMPLETE, Fixed64::from_bits)
}

/// Whole seconds to milliseconds, saturating.
#[inline]
pub fn secs_to_millis(secs: u64) -> SimMillis {
    secs.saturating_mul(1000)
}

/// Seconds (possibly fractional) to milliseconds, rounded and floored at zero.
pub fn f64_secs_to_millis(secs: f64) -> SimMillis {
    if !secs.is_finite() || secs <= 0.0 {
        return 0;
    }
    (secs * 1000.0).round() as SimMillis
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed64_basic_arithmetic() {
        let a = f64_to_fixed64(1.5);
        let b = f64_to_fixed64(2.0);
        assert_eq!(fixed64_to_f64(a + b), 3.5);
    }

    #[test]
    fn percent_of_is_exact_at_boundaries() {
        assert_eq!(percent_of(0, 6000), Fixed64::ZERO);
        assert_eq!(percent_of(3000, 6000), Fixed64::from_num(50));
        assert_eq!(percent_of(6000, 6000), PERCENT_COMPLETE);
        assert_eq!(percent_of(9000, 6000), PERCENT_COMPLETE);
    }

    #[test]
    fn percent_of_zero_total_is_complete() {
        assert_eq!(percent_of(0, 0), PERCENT_COMPLETE);
    }

    #[test]
    fn percent_of_long_durations_does_not_overflow() {
        let total = 40_000_000;
        assert_eq!(percent_of(total / 2, total), Fixed64::from_num(50));
        assert_eq!(percent_of(u64::MAX - 1, u64::MAX), Fixed64::from_num(100) - Fixed64::DELTA);
    }

    #[test]
    fn fractional_seconds_round_to_millis() {
        assert_eq!(f64_secs_to_millis(0.5), 500);
        assert_eq!(f64_secs_to_millis(2.9996), 3000);
        assert_eq!(f64_secs_to_millis(-1.0), 0);
        assert_eq!(f64_secs_to_millis(f64::NAN), 0);
    }

    #[test]
    fn whole_seconds_saturate() {
        assert_eq!(secs_to_millis(30), 30_000);
        assert_eq!(secs_to_millis(u64::MAX), u64::MAX);
    }
}
