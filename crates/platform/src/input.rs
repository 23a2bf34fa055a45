//! Input device abstraction: quadrature encoder counter and push button.

/// Hardware quadrature counter (LPTIM1 in encoder mode on the reference
/// board). The counter wraps at [`ENCODER_COUNTER_MAX`].
pub trait EncoderCounter {
    /// Read the current counter value.
    fn read_counter(&mut self) -> u16;
}

/// Auto-reload value of the encoder counter.
pub const ENCODER_COUNTER_MAX: u16 = u16::MAX;

/// Encoder push button (PA2 on the reference board, active-high).
pub trait ClickButton {
    /// `true` while the button is held down.
    fn is_pressed(&mut self) -> bool;
}

/// Direction of a decoded encoder movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Movement {
    /// No complete detent since the last poll.
    None,
    /// Counter counted up by at least one detent (scrub backwards).
    Left,
    /// Counter counted down by at least one detent (scrub forwards).
    Right,
}
