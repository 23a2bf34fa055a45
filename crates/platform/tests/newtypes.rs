//! Type system enforcement tests for the playback domain newtypes.

// ── ProgressPercent ──────────────────────────────────────────────────────────

#[test]
fn progress_percent_new_clamps_over_100() {
    use platform::audio_types::ProgressPercent;
    let p = ProgressPercent::new(150);
    assert_eq!(p.get(), 100, "ProgressPercent::new(150) should clamp to 100");
}

#[test]
fn progress_percent_try_new_rejects_over_100() {
    use platform::audio_types::ProgressPercent;
    assert!(ProgressPercent::try_new(101).is_err());
    assert!(ProgressPercent::try_new(255).is_err());
    assert!(ProgressPercent::try_new(100).is_ok());
}

#[test]
fn progress_percent_error_reports_bounds() {
    use platform::audio_types::{OutOfRangeError, ProgressPercent};
    assert_eq!(
        ProgressPercent::try_new(120),
        Err(OutOfRangeError {
            value: 120,
            min: 0,
            max: 100
        })
    );
}

#[test]
fn progress_percent_is_one_byte() {
    use platform::audio_types::ProgressPercent;
    assert_eq!(core::mem::size_of::<ProgressPercent>(), 1);
}

#[test]
fn progress_from_fraction_rounds_down() {
    use platform::audio_types::ProgressPercent;
    assert_eq!(ProgressPercent::from_fraction(0, 16000).get(), 0);
    assert_eq!(ProgressPercent::from_fraction(2047, 16000).get(), 12);
    assert_eq!(ProgressPercent::from_fraction(15999, 16000).get(), 99);
    assert_eq!(ProgressPercent::from_fraction(16000, 16000).get(), 100);
}

#[test]
fn progress_from_fraction_of_empty_file_is_complete() {
    use platform::audio_types::ProgressPercent;
    assert_eq!(ProgressPercent::from_fraction(0, 0), ProgressPercent::END);
}

#[test]
fn progress_scrub_steps_saturate() {
    use platform::audio_types::ProgressPercent;
    assert_eq!(ProgressPercent::new(3).saturating_sub(5), ProgressPercent::START);
    assert_eq!(ProgressPercent::new(97).saturating_add(5), ProgressPercent::END);
    assert_eq!(ProgressPercent::new(50).saturating_add(5).get(), 55);
}

// ── TimerReload ──────────────────────────────────────────────────────────────

#[test]
fn timer_reload_rejects_zero() {
    use platform::audio_types::TimerReload;
    assert!(TimerReload::new(0).is_err());
    assert_eq!(TimerReload::new(1088).map(TimerReload::get), Ok(1088));
}

#[test]
fn timer_reload_sample_rate_at_48mhz() {
    use platform::audio_types::TimerReload;
    use platform::config::SAMPLE_TIMER_CLOCK_HZ;
    let r = TimerReload::new(6000).unwrap();
    assert_eq!(r.sample_rate_hz(SAMPLE_TIMER_CLOCK_HZ), 8000);
    let r = TimerReload::new(1500).unwrap();
    assert_eq!(r.sample_rate_hz(SAMPLE_TIMER_CLOCK_HZ), 32000);
}

#[test]
fn timer_reload_sample_rate_rounds_down_and_never_overflows() {
    use platform::audio_types::TimerReload;
    let r = TimerReload::new(1088).unwrap();
    assert_eq!(r.sample_rate_hz(48_000_000), 44_117);
    let max = TimerReload::new(u16::MAX).unwrap();
    assert_eq!(max.sample_rate_hz(u32::MAX), 65_537);
    assert_eq!(max.sample_rate_hz(1000), 0);
    let one = TimerReload::new(1).unwrap();
    assert_eq!(one.sample_rate_hz(u32::MAX), u32::MAX);
}
