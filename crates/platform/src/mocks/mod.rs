//! Mock implementations for testing
//!
//! This module provides mock implementations of all platform traits
//! for use in unit and integration tests.

#![cfg(any(test, feature = "std"))]

use crate::*;

/// Error injected by the mocks when a failure is armed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockFault;

/// One recorded DAC transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordedTransfer {
    /// Number of codes handed to the DMA stream.
    pub len: usize,
    /// Alignment the transfer was started with.
    pub alignment: DacAlignment,
    /// First code of the block (0 for an empty transfer).
    pub first: u16,
    /// Last code of the block (0 for an empty transfer).
    pub last: u16,
}

/// Mock DAC+DMA pipeline
///
/// Records every started transfer (up to 1024 of them) and keeps a copy of
/// the most recent block so tests can inspect the converted codes. A block
/// holding a code wider than the alignment allows is refused.
pub struct MockDac {
    transfers: heapless::Vec<RecordedTransfer, 1024>,
    last_block: heapless::Vec<u16, 4096>,
    started: usize,
    running: bool,
    fail_next_start: bool,
}

impl MockDac {
    /// Create new mock DAC
    pub fn new() -> Self {
        Self {
            transfers: heapless::Vec::new(),
            last_block: heapless::Vec::new(),
            started: 0,
            running: false,
            fail_next_start: false,
        }
    }

    /// Total number of `start_transfer` calls that succeeded
    pub fn transfers_started(&self) -> usize {
        self.started
    }

    /// Recorded transfers (oldest first)
    pub fn transfers(&self) -> &[RecordedTransfer] {
        &self.transfers
    }

    /// Codes of the most recent transfer
    pub fn last_block(&self) -> &[u16] {
        &self.last_block
    }

    /// Check if a transfer is in flight
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Make the next `start_transfer` fail with [`MockFault`]
    pub fn fail_next_start(&mut self) {
        self.fail_next_start = true;
    }
}

impl Default for MockDac {
    fn default() -> Self {
        Self::new()
    }
}

impl DacDma for MockDac {
    type Error = MockFault;

    fn start_transfer(&mut self, codes: &[u16], alignment: DacAlignment) -> Result<(), Self::Error> {
        if core::mem::take(&mut self.fail_next_start) {
            return Err(MockFault);
        }
        let max = alignment.max_code();
        if codes.iter().any(|&code| code > max) {
            return Err(MockFault);
        }
        let record = RecordedTransfer {
            len: codes.len(),
            alignment,
            first: codes.first().copied().unwrap_or(0),
            last: codes.last().copied().unwrap_or(0),
        };
        let _ = self.transfers.push(record);
        self.last_block.clear();
        for &code in codes.iter().take(self.last_block.capacity()) {
            let _ = self.last_block.push(code);
        }
        self.started = self.started.saturating_add(1);
        self.running = true;
        Ok(())
    }

    fn stop_transfer(&mut self) -> Result<(), Self::Error> {
        self.running = false;
        Ok(())
    }
}

/// Mock sample-clock timer
pub struct MockSampleClock {
    reload: Option<u16>,
    running: bool,
}

impl MockSampleClock {
    /// Create new, stopped mock timer
    pub fn new() -> Self {
        Self {
            reload: None,
            running: false,
        }
    }

    /// Last programmed reload value
    pub fn reload(&self) -> Option<u16> {
        self.reload
    }

    /// Check if counting
    pub fn is_running(&self) -> bool {
        self.running
    }
}

impl Default for MockSampleClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SampleClock for MockSampleClock {
    type Error = core::convert::Infallible;

    fn set_reload_value(&mut self, reload: u16) -> Result<(), Self::Error> {
        self.reload = Some(reload);
        Ok(())
    }

    fn start(&mut self) -> Result<(), Self::Error> {
        self.running = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), Self::Error> {
        self.running = false;
        Ok(())
    }
}

/// Mock encoder counter with a settable value
pub struct MockEncoder {
    counter: u16,
}

impl MockEncoder {
    /// Create new mock encoder at `initial`
    pub fn new(initial: u16) -> Self {
        Self { counter: initial }
    }

    /// Set the raw counter value
    pub fn set(&mut self, value: u16) {
        self.counter = value;
    }

    /// Turn by `edges` quadrature edges (positive counts up), wrapping like
    /// the hardware counter.
    pub fn turn(&mut self, edges: i32) {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // wrap intended
        let delta = edges as u16;
        self.counter = self.counter.wrapping_add(delta);
    }
}

impl EncoderCounter for MockEncoder {
    fn read_counter(&mut self) -> u16 {
        self.counter
    }
}

/// Mock push button that reports a scripted sequence of samples
pub struct MockButton {
    presses: heapless::Deque<bool, 64>,
}

impl MockButton {
    /// Create a button that is never pressed
    pub fn new() -> Self {
        Self {
            presses: heapless::Deque::new(),
        }
    }

    /// Button that reads released `after` times, then pressed
    pub fn pressed_after(after: usize) -> Self {
        let mut button = Self::new();
        for _ in 0..after.min(63) {
            let _ = button.presses.push_back(false);
        }
        let _ = button.presses.push_back(true);
        button
    }
}

impl Default for MockButton {
    fn default() -> Self {
        Self::new()
    }
}

impl ClickButton for MockButton {
    fn is_pressed(&mut self) -> bool {
        self.presses.pop_front().unwrap_or(false)
    }
}

/// Mock backlight PWM channel
#[derive(Default)]
pub struct MockBacklight {
    compare: u32,
    writes: usize,
}

impl MockBacklight {
    /// Create new mock backlight at duty 0
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of compare writes
    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl BacklightPwm for MockBacklight {
    fn compare(&self) -> u32 {
        self.compare
    }

    fn set_compare(&mut self, value: u32) {
        self.compare = value;
        self.writes = self.writes.saturating_add(1);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_dac_records_transfers() {
        let mut dac = MockDac::new();

        dac.start_transfer(&[1, 2, 3], DacAlignment::Right12).unwrap();
        assert_eq!(dac.transfers_started(), 1);
        assert!(dac.is_running());
        assert_eq!(dac.last_block(), &[1, 2, 3]);
        assert_eq!(
            dac.transfers()[0],
            RecordedTransfer {
                len: 3,
                alignment: DacAlignment::Right12,
                first: 1,
                last: 3,
            }
        );

        dac.stop_transfer().unwrap();
        assert!(!dac.is_running());
    }

    #[test]
    fn test_mock_dac_injected_fault() {
        let mut dac = MockDac::new();
        dac.fail_next_start();
        assert_eq!(dac.start_transfer(&[0], DacAlignment::Right8), Err(MockFault));
        assert_eq!(dac.transfers_started(), 0);
        assert!(dac.start_transfer(&[0], DacAlignment::Right8).is_ok());
    }

    #[test]
    fn test_mock_dac_refuses_codes_wider_than_alignment() {
        let mut dac = MockDac::new();
        assert_eq!(dac.start_transfer(&[0, 256], DacAlignment::Right8), Err(MockFault));
        assert_eq!(dac.start_transfer(&[4096], DacAlignment::Right12), Err(MockFault));
        assert!(dac.start_transfer(&[255], DacAlignment::Right8).is_ok());
        assert!(dac.start_transfer(&[0, 4095], DacAlignment::Right12).is_ok());
        assert_eq!(dac.transfers_started(), 2);
    }

    #[test]
    fn test_mock_sample_clock() {
        let mut clock = MockSampleClock::new();
        clock.set_reload_value(1088).unwrap();
        clock.start().unwrap();
        assert_eq!(clock.reload(), Some(1088));
        assert!(clock.is_running());
        clock.stop().unwrap();
        assert!(!clock.is_running());
    }

    #[test]
    fn test_mock_encoder_wraps() {
        let mut enc = MockEncoder::new(1);
        enc.turn(-2);
        assert_eq!(enc.read_counter(), u16::MAX);
        enc.turn(4);
        assert_eq!(enc.read_counter(), 3);
    }

    #[test]
    fn test_mock_button_script() {
        let mut button = MockButton::pressed_after(2);
        assert!(!button.is_pressed());
        assert!(!button.is_pressed());
        assert!(button.is_pressed());
        assert!(!button.is_pressed());
    }

    #[test]
    fn test_mock_backlight() {
        let mut bl = MockBacklight::new();
        bl.set_compare(70);
        assert_eq!(bl.compare(), 70);
        assert_eq!(bl.writes(), 1);
    }
}
