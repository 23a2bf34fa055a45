//! Audio output abstraction: DAC fed by DMA, paced by a sample-clock timer.
//!
//! The DAC converts one code per trigger of the sample-clock timer (TIM6
//! TRGO on the reference board). DMA moves codes from RAM into the DAC data
//! holding register. Completion of a transfer is reported from the DMA
//! interrupt through a [`CompletionFlag`](crate::dma::CompletionFlag); the
//! trait itself is polled from the main loop only.

/// DAC data holding register alignment used for a transfer.
///
/// Fixed per build variant: the 16-bit PCM path writes right-aligned 12-bit
/// codes, the 8-bit PCM path writes right-aligned 8-bit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DacAlignment {
    /// 12-bit right-aligned, channel 1 (`DHR12R1`).
    Right12,
    /// 8-bit right-aligned, channel 1 (`DHR8R1`).
    Right8,
}

impl DacAlignment {
    /// Largest code the DAC accepts in this alignment.
    pub const fn max_code(self) -> u16 {
        match self {
            Self::Right12 => 0x0FFF,
            Self::Right8 => 0x00FF,
        }
    }
}

/// DAC channel driven by a DMA stream in normal (one-shot) mode.
///
/// # Buffer ownership
///
/// `start_transfer` borrows `codes` only for the duration of the call, but
/// the hardware keeps reading the memory until the completion flag fires.
/// Callers must not write the slice again before then; the ping-pong
/// streamer in the `playback` crate enforces this.
pub trait DacDma {
    /// Error type
    type Error: core::fmt::Debug;

    /// Start a DMA transfer of `codes` into the DAC with the given alignment.
    ///
    /// Any transfer still in flight is aborted first (the HAL stops the
    /// stream before reprogramming it).
    fn start_transfer(&mut self, codes: &[u16], alignment: DacAlignment)
        -> Result<(), Self::Error>;

    /// Abort the current transfer, if any, and disable the DAC DMA request.
    fn stop_transfer(&mut self) -> Result<(), Self::Error>;
}

/// Basic timer that triggers one DAC conversion per update event.
pub trait SampleClock {
    /// Error type
    type Error: core::fmt::Debug;

    /// Program the auto-reload register. The sample rate is
    /// `timer_clock / reload`.
    fn set_reload_value(&mut self, reload: u16) -> Result<(), Self::Error>;

    /// Start counting (and triggering the DAC).
    fn start(&mut self) -> Result<(), Self::Error>;

    /// Stop counting.
    fn stop(&mut self) -> Result<(), Self::Error>;
}

/// PWM channel driving the display backlight (TIM2 CH1 on the reference
/// board). The compare value sets the duty cycle.
pub trait BacklightPwm {
    /// Current compare value.
    fn compare(&self) -> u32;

    /// Write a new compare value.
    fn set_compare(&mut self, value: u32);
}
