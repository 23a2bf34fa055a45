//! Smooth backlight dimming.
//!
//! The display starts dark. The main loop only sets a target compare value;
//! the period interrupt walks the PWM compare register towards it by a fixed
//! step per tick, so a full fade from 0 to 65520 takes 936 ticks (~9.4 s at
//! the 10 ms period).

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use platform::BacklightPwm;

/// Backlight ramp parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BacklightConfig {
    /// Compare value for full brightness.
    pub max_compare: u32,
    /// Compare change per period tick.
    pub step: u32,
}

impl BacklightConfig {
    /// Board defaults.
    pub const DEFAULT: Self = Self {
        max_compare: 65_520,
        step: 70,
    };
}

impl Default for BacklightConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Target brightness and ramp progress, shared with the period interrupt.
#[derive(Debug)]
pub struct BacklightRamp {
    config: BacklightConfig,
    target: AtomicU32,
    settled: AtomicBool,
}

impl BacklightRamp {
    /// Ramp with target 0 (dark).
    pub const fn new(config: BacklightConfig) -> Self {
        Self {
            config,
            target: AtomicU32::new(0),
            settled: AtomicBool::new(false),
        }
    }

    /// Set the target compare value, clamped to `max_compare`.
    pub fn set_target(&self, compare: u32) {
        self.target
            .store(compare.min(self.config.max_compare), Ordering::Relaxed);
        self.settled.store(false, Ordering::Release);
    }

    /// Fade to full brightness.
    pub fn raise_to_full(&self) {
        self.set_target(self.config.max_compare);
    }

    /// Fade to dark.
    pub fn fade_out(&self) {
        self.set_target(0);
    }

    /// Current target.
    pub fn target(&self) -> u32 {
        self.target.load(Ordering::Relaxed)
    }

    /// `true` once the compare value reached the target.
    pub fn is_settled(&self) -> bool {
        self.settled.load(Ordering::Acquire)
    }

    /// Move `pwm` one step towards the target (interrupt context).
    ///
    /// Never overshoots. Returns whether the target is reached.
    pub fn on_period_tick<P: BacklightPwm>(&self, pwm: &mut P) -> bool {
        let target = self.target();
        let current = pwm.compare();
        let next = match current.cmp(&target) {
            core::cmp::Ordering::Greater => current.saturating_sub(self.config.step).max(target),
            core::cmp::Ordering::Less => current.saturating_add(self.config.step).min(target),
            core::cmp::Ordering::Equal => current,
        };
        if next != current {
            pwm.set_compare(next);
        }
        let settled = next == target;
        self.settled.store(settled, Ordering::Release);
        settled
    }
}

impl Default for BacklightRamp {
    fn default() -> Self {
        Self::new(BacklightConfig::DEFAULT)
    }
}
