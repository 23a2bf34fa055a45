//! Property-based tests for progress arithmetic.
//! Verifies invariants hold for ALL inputs, not just fixed examples.

use platform::audio_types::ProgressPercent;

proptest::proptest! {
    /// ProgressPercent::new never panics and always lands in 0..=100.
    #[test]
    fn progress_new_is_bounded(pct in 0u8..=255u8) {
        assert!(ProgressPercent::new(pct).get() <= 100);
    }

    /// from_fraction stays in range for every done/total pair.
    #[test]
    fn from_fraction_is_bounded(done in 0u32..=u32::MAX, total in 0u32..=u32::MAX) {
        assert!(ProgressPercent::from_fraction(done, total).get() <= 100);
    }

    /// More samples played never means less progress.
    #[test]
    fn from_fraction_is_monotonic(total in 1u32..=10_000_000u32, a in 0u32..=10_000_000u32, b in 0u32..=10_000_000u32) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let p_lo = ProgressPercent::from_fraction(lo.min(total), total);
        let p_hi = ProgressPercent::from_fraction(hi.min(total), total);
        assert!(p_lo <= p_hi, "{lo}/{total} -> {p_lo:?} but {hi}/{total} -> {p_hi:?}");
    }

    /// A scrub step in either direction moves by at most the step size.
    #[test]
    fn scrub_step_is_bounded(start in 0u8..=100u8, step in 0u8..=20u8) {
        let p = ProgressPercent::new(start);
        let up = p.saturating_add(step);
        let down = p.saturating_sub(step);
        assert!(up >= p && up.get() - p.get() <= step);
        assert!(down <= p && p.get() - down.get() <= step);
    }
}
