//! Audio domain newtypes for compile-time safety.
//!
//! - `ProgressPercent`: playback position 0–100, shared by the controller,
//!   the seek mailbox and the encoder scrub logic
//! - `TimerReload`: a non-zero sample-clock auto-reload value

// ── Error type ───────────────────────────────────────────────────────────────

/// Error returned when a value is out of the valid range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[error("value {value} outside {min}..={max}")]
pub struct OutOfRangeError {
    /// The value that was out of range.
    pub value: u32,
    /// The inclusive minimum allowed value.
    pub min: u32,
    /// The inclusive maximum allowed value.
    pub max: u32,
}

// ── ProgressPercent ──────────────────────────────────────────────────────────

/// Playback progress as a percentage, clamped to 0–100.
///
/// Wraps a `u8` with the invariant `0 <= value <= 100`.
/// Construct with [`ProgressPercent::new`] (clamping) or
/// [`ProgressPercent::try_new`] (fallible, strict).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(transparent)]
pub struct ProgressPercent(u8);

impl ProgressPercent {
    /// 0 %: start of the file.
    pub const START: Self = Self(0);

    /// 100 %: end of the file.
    pub const END: Self = Self(100);

    /// Create a `ProgressPercent`, clamping values above 100 to 100.
    #[must_use]
    pub const fn new(value: u8) -> Self {
        if value > 100 {
            Self(100)
        } else {
            Self(value)
        }
    }

    /// Create a `ProgressPercent`, returning an error if `value > 100`.
    ///
    /// # Errors
    ///
    /// Returns [`OutOfRangeError`] if `value > 100`.
    pub fn try_new(value: u8) -> Result<Self, OutOfRangeError> {
        if value > 100 {
            Err(OutOfRangeError {
                value: u32::from(value),
                min: 0,
                max: 100,
            })
        } else {
            Ok(Self(value))
        }
    }

    /// Progress of `done` out of `total`, rounded down.
    ///
    /// `total == 0` reports 100 % (nothing left to play).
    #[must_use]
    pub fn from_fraction(done: u32, total: u32) -> Self {
        if total == 0 {
            return Self::END;
        }
        let done = u64::from(done.min(total));
        // done <= total, so the quotient is at most 100.
        #[allow(clippy::arithmetic_side_effects)] // Safety: total != 0; done * 100 fits u64
        let pct = done * 100 / u64::from(total);
        Self::new(u8::try_from(pct).unwrap_or(100))
    }

    /// Raise by `step`, saturating at 100.
    #[must_use]
    pub fn saturating_add(self, step: u8) -> Self {
        Self::new(self.0.saturating_add(step))
    }

    /// Lower by `step`, saturating at 0.
    #[must_use]
    pub fn saturating_sub(self, step: u8) -> Self {
        Self(self.0.saturating_sub(step))
    }

    /// Return the inner value (0–100).
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }
}

// ── TimerReload ──────────────────────────────────────────────────────────────

/// Sample-clock auto-reload register value. Zero would stall the timer, so
/// it is not representable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(transparent)]
pub struct TimerReload(core::num::NonZeroU16);

impl TimerReload {
    /// Create a reload value, rejecting zero.
    ///
    /// # Errors
    ///
    /// Returns [`OutOfRangeError`] for `0`.
    pub fn new(value: u16) -> Result<Self, OutOfRangeError> {
        core::num::NonZeroU16::new(value)
            .map(Self)
            .ok_or(OutOfRangeError {
                value: 0,
                min: 1,
                max: u32::from(u16::MAX),
            })
    }

    /// Return the register value.
    #[must_use]
    pub const fn get(self) -> u16 {
        self.0.get()
    }

    /// Sample rate produced by this reload at `timer_clock_hz`.
    #[must_use]
    pub fn sample_rate_hz(self, timer_clock_hz: u32) -> u32 {
        timer_clock_hz.checked_div(u32::from(self.get())).unwrap_or(0)
    }
}
