//! The player main loop and its interrupt entry points.
//!
//! Three execution contexts touch the player:
//!
//! | Context            | Entry point                          | Touches                         |
//! |--------------------|--------------------------------------|---------------------------------|
//! | main loop          | [`Player::poll`]                     | controller, DAC, clock, encoder |
//! | DMA complete ISR   | [`PlayerShared::on_dma_complete`]    | completion flag                 |
//! | period timer ISR   | [`PlayerShared::on_period_tick`]     | backlight PWM, seek debounce    |
//!
//! Everything the interrupts touch lives in [`PlayerShared`], which holds
//! only atomics and lives in a `static` on the device ([`PLAYER_SHARED`]).
//! The [`Player`] itself is owned by the main loop.

use platform::dma::DMA_WAIT_SPIN_LIMIT;
use platform::{
    BacklightPwm, ByteSource, ClickButton, DacDma, EncoderCounter, Movement, ProgressPercent,
    SampleClock,
};
use playback::{
    ControllerConfig, PlaybackController, PlaybackError, PlaybackSignals, PlaybackState,
    TickOutcome, WaveFormat,
};

use crate::backlight::{BacklightConfig, BacklightRamp};
use crate::transport::{
    try_send_event, ScrubState, Transport, TransportConfig, TransportEvent, TransportSender,
};

// ---------------------------------------------------------------------------
// Interrupt-shared state
// ---------------------------------------------------------------------------

/// State shared between the main loop and the interrupt handlers.
#[derive(Debug)]
pub struct PlayerShared {
    /// DMA completion flag and seek mailbox read by the controller.
    pub playback: PlaybackSignals,
    /// Scrub preview and seek debounce.
    pub scrub: ScrubState,
    /// Backlight fade.
    pub backlight: BacklightRamp,
}

/// What one period tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PeriodReport {
    /// The backlight reached its target.
    pub backlight_settled: bool,
    /// A seek was posted on this tick.
    pub seek_committed: Option<ProgressPercent>,
}

impl PlayerShared {
    /// Fresh state: no completion, no seek, backlight dark.
    pub const fn new(transport: TransportConfig, backlight: BacklightConfig) -> Self {
        Self {
            playback: PlaybackSignals::new(),
            scrub: ScrubState::new(transport),
            backlight: BacklightRamp::new(backlight),
        }
    }

    /// DAC DMA transfer-complete interrupt.
    pub fn on_dma_complete(&self) {
        self.playback.completion.signal();
    }

    /// Period timer interrupt: one backlight step and one debounce tick.
    /// A committed seek is also reported on `events`.
    pub fn on_period_tick<P: BacklightPwm>(
        &self,
        pwm: &mut P,
        events: &TransportSender<'_>,
    ) -> PeriodReport {
        let backlight_settled = self.backlight.on_period_tick(pwm);
        let seek_committed = self.scrub.on_period_tick(&self.playback.seek);
        if let Some(target) = seek_committed {
            // dropped events only cost a display refresh; the seek is already posted
            let _ = try_send_event(events, TransportEvent::SeekCommitted { target });
        }
        PeriodReport {
            backlight_settled,
            seek_committed,
        }
    }
}

impl Default for PlayerShared {
    fn default() -> Self {
        Self::new(TransportConfig::DEFAULT, BacklightConfig::DEFAULT)
    }
}

/// Interrupt-shared state of the device build.
pub static PLAYER_SHARED: PlayerShared =
    PlayerShared::new(TransportConfig::DEFAULT, BacklightConfig::DEFAULT);

// ---------------------------------------------------------------------------
// Player
// ---------------------------------------------------------------------------

/// Player configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PlayerConfig {
    /// Streaming configuration.
    pub controller: ControllerConfig,
    /// Button polls before [`Player::wait_for_click`] gives up.
    pub click_poll_limit: u32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            controller: ControllerConfig::default(),
            click_poll_limit: DMA_WAIT_SPIN_LIMIT,
        }
    }
}

/// Peripherals owned by the main loop.
#[derive(Debug)]
pub struct PlayerHardware<D, C, E, K> {
    /// DAC channel + DMA stream.
    pub dac: D,
    /// Sample-clock timer.
    pub clock: C,
    /// Encoder counter.
    pub encoder: E,
    /// Encoder push button.
    pub button: K,
}

/// Player failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PlayerError {
    /// The playback engine failed.
    #[error("playback failed: {0}")]
    Playback(#[from] PlaybackError),
    /// Nobody pressed the button in time.
    #[error("no click within {polls} polls")]
    ClickTimeout {
        /// Button polls spent waiting.
        polls: u32,
    },
}

/// Result of one [`Player::poll`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PollReport {
    /// What the controller did.
    pub tick: TickOutcome,
    /// What the encoder did.
    pub movement: Movement,
    /// Progress to display.
    pub progress: ProgressPercent,
}

/// The WAV player: playback controller, encoder transport and the
/// peripherals they drive.
pub struct Player<'a, const N: usize, D, C, E, K> {
    config: PlayerConfig,
    shared: &'a PlayerShared,
    controller: PlaybackController<'a, N>,
    transport: Transport<'a>,
    hw: PlayerHardware<D, C, E, K>,
}

impl<'a, const N: usize, D, C, E, K> Player<'a, N, D, C, E, K>
where
    D: DacDma,
    C: SampleClock,
    E: EncoderCounter,
    K: ClickButton,
{
    /// Player listening on `shared`, reporting transport events on `events`.
    pub fn new(
        config: PlayerConfig,
        shared: &'a PlayerShared,
        events: TransportSender<'a>,
        mut hw: PlayerHardware<D, C, E, K>,
    ) -> Self {
        let initial_counter = hw.encoder.read_counter();
        Self {
            config,
            shared,
            controller: PlaybackController::new(config.controller, &shared.playback),
            transport: Transport::new(&shared.scrub, events, initial_counter),
            hw,
        }
    }

    /// Poll the button until it is pressed, then fade the backlight in.
    ///
    /// Returns the number of polls it took.
    pub fn wait_for_click(&mut self) -> Result<u32, PlayerError> {
        let mut polls: u32 = 0;
        while !self.hw.button.is_pressed() {
            polls = polls.saturating_add(1);
            if polls >= self.config.click_poll_limit {
                #[cfg(feature = "defmt")]
                defmt::warn!("no click after {} polls", polls);
                return Err(PlayerError::ClickTimeout { polls });
            }
        }
        self.shared.backlight.raise_to_full();
        #[cfg(feature = "defmt")]
        defmt::info!("click after {} polls, backlight on", polls);
        Ok(polls)
    }

    /// Parse the file in `source` and start playing.
    pub fn load<S: ByteSource + ?Sized>(&mut self, source: &S) -> Result<WaveFormat, PlayerError> {
        self.shared.scrub.cancel();
        let format = self
            .controller
            .load(source.bytes(), &mut self.hw.dac, &mut self.hw.clock)?;
        Ok(format)
    }

    /// One main-loop iteration: advance the stream, then read the encoder.
    /// `source` must be the file passed to [`load`](Self::load).
    ///
    /// A playback error has already stopped the hardware when it is
    /// returned; the encoder is not polled on that iteration.
    pub fn poll<S: ByteSource + ?Sized>(&mut self, source: &S) -> Result<PollReport, PlayerError> {
        let tick = self
            .controller
            .tick(source.bytes(), &mut self.hw.dac, &mut self.hw.clock)?;
        let movement = self
            .transport
            .poll(&mut self.hw.encoder, self.controller.progress());
        Ok(PollReport {
            tick,
            movement,
            progress: self.displayed_progress(),
        })
    }

    /// Stop playback at once and drop any scrub in progress.
    pub fn stop(&mut self) -> Result<(), PlayerError> {
        self.shared.scrub.cancel();
        self.controller
            .stop(&mut self.hw.dac, &mut self.hw.clock)?;
        Ok(())
    }

    /// Progress to display: the scrub preview while the user is turning,
    /// the playback position otherwise.
    pub fn displayed_progress(&self) -> ProgressPercent {
        self.transport
            .displayed_progress(self.controller.progress())
    }

    /// Playback lifecycle state.
    pub fn state(&self) -> PlaybackState {
        self.controller.state()
    }

    /// The playback controller.
    pub fn controller(&self) -> &PlaybackController<'a, N> {
        &self.controller
    }

    /// The encoder transport.
    pub fn transport(&self) -> &Transport<'a> {
        &self.transport
    }

    /// Owned peripherals.
    pub fn hardware(&self) -> &PlayerHardware<D, C, E, K> {
        &self.hw
    }

    /// Owned peripherals, mutably.
    pub fn hardware_mut(&mut self) -> &mut PlayerHardware<D, C, E, K> {
        &mut self.hw
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::transport::TransportChannel;
    use platform::mocks::{MockBacklight, MockButton, MockDac, MockEncoder, MockSampleClock};

    type TestPlayer<'a> = Player<'a, 64, MockDac, MockSampleClock, MockEncoder, MockButton>;

    fn hardware(button: MockButton) -> PlayerHardware<MockDac, MockSampleClock, MockEncoder, MockButton> {
        PlayerHardware {
            dac: MockDac::new(),
            clock: MockSampleClock::new(),
            encoder: MockEncoder::new(0),
            button,
        }
    }

    #[test]
    fn click_raises_backlight_target() {
        let shared = PlayerShared::default();
        let channel = TransportChannel::new();
        let mut player: TestPlayer<'_> = Player::new(
            PlayerConfig::default(),
            &shared,
            channel.sender(),
            hardware(MockButton::pressed_after(4)),
        );
        assert_eq!(shared.backlight.target(), 0);
        assert_eq!(player.wait_for_click().unwrap(), 4);
        assert_eq!(shared.backlight.target(), BacklightConfig::DEFAULT.max_compare);
    }

    #[test]
    fn click_wait_is_bounded() {
        let shared = PlayerShared::default();
        let channel = TransportChannel::new();
        let config = PlayerConfig {
            click_poll_limit: 10,
            ..PlayerConfig::default()
        };
        let mut player: TestPlayer<'_> =
            Player::new(config, &shared, channel.sender(), hardware(MockButton::new()));
        assert_eq!(
            player.wait_for_click(),
            Err(PlayerError::ClickTimeout { polls: 10 })
        );
        assert_eq!(shared.backlight.target(), 0);
    }

    #[test]
    fn period_tick_reports_commit_on_channel() {
        let shared = PlayerShared::new(
            TransportConfig {
                debounce_ticks: 1,
                ..TransportConfig::DEFAULT
            },
            BacklightConfig::DEFAULT,
        );
        let channel = TransportChannel::new();
        let mut pwm = MockBacklight::new();
        shared
            .scrub
            .on_movement(Movement::Right, ProgressPercent::new(10));

        let report = shared.on_period_tick(&mut pwm, &channel.sender());
        assert_eq!(report.seek_committed, None);
        assert!(report.backlight_settled);
        let report = shared.on_period_tick(&mut pwm, &channel.sender());
        assert_eq!(report.seek_committed, Some(ProgressPercent::new(15)));
        assert_eq!(
            channel.try_receive().unwrap(),
            TransportEvent::SeekCommitted {
                target: ProgressPercent::new(15)
            }
        );
        assert_eq!(shared.playback.seek.take(), Some(ProgressPercent::new(15)));
    }

    #[test]
    fn dma_complete_sets_completion_flag() {
        let shared = PlayerShared::default();
        shared.on_dma_complete();
        assert!(shared.playback.completion.is_set());
    }

    #[test]
    fn poll_while_idle_still_reads_encoder() {
        let shared = PlayerShared::default();
        let channel = TransportChannel::new();
        let mut player: TestPlayer<'_> = Player::new(
            PlayerConfig::default(),
            &shared,
            channel.sender(),
            hardware(MockButton::new()),
        );
        player.hardware_mut().encoder.turn(2);
        let report = player.poll(&[0u8; 0]).unwrap();
        assert_eq!(report.tick, TickOutcome::Idle);
        assert_eq!(report.movement, Movement::Left);
        assert_eq!(report.progress, ProgressPercent::START);
    }
}
