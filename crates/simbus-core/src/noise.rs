//! Probability-driven fault and jitter primitives.
//!
//! A single gate primitive backs both the per-bus latency jitter and any
//! fault injection a device backend applies internally, so every tunable
//! probability in the simulator behaves identically at the edges.

use rand::Rng;

/// Upper bound (exclusive) of the extra jitter delay in microseconds.
pub(crate) const JITTER_MAX_US: u64 = 50;

/// Returns `true` with probability `p`.
///
/// `p <= 0` never triggers and `p >= 1` always triggers; non-finite values
/// never trigger. Values in between sample the provided uniform source.
pub fn probability_gate<R: Rng + ?Sized>(p: f64, rng: &mut R) -> bool {
    if !p.is_finite() || p <= 0.0 {
        return false;
    }
    if p >= 1.0 {
        return true;
    }
    rng.gen_bool(p)
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    #[test]
    fn zero_probability_never_triggers() {
        let mut rng = rand::thread_rng();
        assert!((0..1000).all(|_| !probability_gate(0.0, &mut rng)));
        assert!((0..1000).all(|_| !probability_gate(-0.5, &mut rng)));
    }

    #[test]
    fn unit_probability_always_triggers() {
        let mut rng = rand::thread_rng();
        assert!((0..1000).all(|_| probability_gate(1.0, &mut rng)));
        assert!((0..1000).all(|_| probability_gate(2.0, &mut rng)));
    }

    #[test]
    fn non_finite_probability_never_triggers() {
        let mut rng = rand::thread_rng();
        assert!(!probability_gate(f64::NAN, &mut rng));
        assert!(!probability_gate(f64::NEG_INFINITY, &mut rng));
        assert!(!probability_gate(f64::INFINITY, &mut rng));
    }

    #[test]
    fn intermediate_probability_tracks_rate() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let trials = 10_000;
        let hits = (0..trials).filter(|_| probability_gate(0.3, &mut rng)).count();

        // 0.3 +- generous bound; seeded, so this cannot flake.
        let rate = hits as f64 / f64::from(trials);
        assert!((0.25..0.35).contains(&rate), "rate {rate} outside expected band");
    }
}
