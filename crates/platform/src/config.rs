//! Application configuration and constants
//!
//! Central naming and clock values shared by the firmware and the emulator.

/// The application name
pub const APP_NAME: &str = "Roendi Player";

/// The application type/category
pub const APP_TYPE: &str = "WAV player";

/// Application version (synchronized with Cargo.toml)
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Input clock of the sample-clock timer (TIM6) in Hz.
///
/// The WAV reload table in `playback::wav` is expressed against this clock.
pub const SAMPLE_TIMER_CLOCK_HZ: u32 = 48_000_000;

/// Period of the housekeeping timer interrupt (TIM7) in milliseconds.
///
/// Backlight dimming and the seek debounce advance once per period.
pub const PERIOD_TICK_MS: u32 = 10;

/// Development mode banner
pub const fn dev_banner() -> &'static str {
    "Roendi Player - Development Mode"
}
