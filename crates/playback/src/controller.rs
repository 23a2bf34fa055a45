//! Top-level playback driver.
//!
//! `PlaybackController` owns the session state and the ping-pong blocks and
//! is advanced by [`PlaybackController::tick`] from the main loop. Nothing in
//! here runs in interrupt context: the DMA interrupt and the periodic timer
//! only touch the shared [`PlaybackSignals`].
//!
//! Per tick, in order:
//!
//! 1. apply a pending seek (drop the staged block, move the cursor);
//! 2. if samples remain and the software-owned block is empty, fill it;
//! 3. if the DMA signalled completion, start the staged block and account
//!    for it, or finish when nothing is left.
//!
//! Once `Finished`, a tick only looks at the seek mailbox: a target short
//! of the end primes both blocks again and restarts the DMA and the clock.
//!
//! A completion that never comes is counted in polls; past
//! [`ControllerConfig::dma_wait_spins`] the controller stops the hardware and
//! reports [`PlaybackError::HardwareTimeout`].

use platform::dma::DMA_WAIT_SPIN_LIMIT;
use platform::{DacDma, ProgressPercent, SampleClock, TimerReload};

use crate::codec::SampleFormat;
use crate::ping_pong::{BufferId, PingPong, StreamError};
use crate::seek::PlaybackSignals;
use crate::wav::{self, WaveFormat, WaveParseError, WAVE_FORMAT_PCM};

/// Upper bound on `total_samples` so the remaining count fits an `i32`.
const MAX_TOTAL_SAMPLES: u32 = 0x7FFF_FFFF;

/// Controller configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ControllerConfig {
    /// Sample layout / DAC path of this build.
    pub format: SampleFormat,
    /// Consecutive polls without a DMA completion before giving up.
    pub dma_wait_spins: u32,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            format: SampleFormat::Pcm16Dac12,
            dma_wait_spins: DMA_WAIT_SPIN_LIMIT,
        }
    }
}

/// Lifecycle of the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PlaybackState {
    /// No file loaded.
    Idle,
    /// Streaming.
    Playing,
    /// Every sample was handed to the DAC and the last block drained.
    Finished,
    /// Stopped after a hardware error; the session is kept for inspection.
    Faulted,
}

/// What a call to [`PlaybackController::tick`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TickOutcome {
    /// Not playing; nothing done.
    Idle,
    /// The DMA is still draining the current block.
    Waiting,
    /// The staged block was handed to the DMA.
    Swapped,
    /// A seek after the end restarted playback from the new position.
    Resumed,
    /// The last block drained; hardware stopped.
    Finished,
}

/// Playback failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PlaybackError {
    /// The header failed validation.
    #[error("invalid WAV header: {0}")]
    Format(#[from] WaveParseError),
    /// The ping-pong streamer refused an operation.
    #[error("streaming failed: {0}")]
    Stream(#[from] StreamError),
    /// The header does not match the sample layout this build plays.
    #[error("WAV format does not match the configured DAC path")]
    FormatMismatch,
    /// The data chunk holds no complete sample.
    #[error("WAV file holds no samples")]
    EmptyData,
    /// The DMA did not signal completion in time.
    #[error("DMA transfer did not complete within {polls} polls")]
    HardwareTimeout {
        /// Polls spent waiting.
        polls: u32,
    },
    /// The sample-clock timer driver failed.
    #[error("sample clock fault")]
    ClockFault,
    /// The operation needs a playing session.
    #[error("nothing is playing")]
    NotPlaying,
}

/// Position and progress of the file being played.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PlaybackSession {
    /// Header of the file.
    pub format: WaveFormat,
    /// Samples in the file (clamped to the bytes actually present).
    pub total_samples: u32,
    /// Samples not yet handed to the DAC; `0..=total_samples`.
    pub samples_remaining: i32,
    /// Byte offset of the first sample not yet handed to the DAC. Equals
    /// `data_offset + (total - remaining) * bytes_per_sample`, so it lies in
    /// `[data_offset, data_offset + data_size)` while samples remain and is
    /// one past the last sample byte when none do (after the last block or
    /// a seek to 100 %).
    pub cursor: usize,
    /// `(total - remaining) / total`, rounded down.
    pub progress: ProgressPercent,
    /// The block the DMA is draining.
    pub buffer_select: BufferId,
}

impl PlaybackSession {
    /// Samples already handed to the DAC.
    pub fn samples_played(&self) -> u32 {
        self.total_samples
            .saturating_sub(u32::try_from(self.samples_remaining).unwrap_or(0))
    }

    fn data_offset(&self) -> usize {
        usize::try_from(self.format.data_offset).unwrap_or(usize::MAX)
    }

    fn recompute_progress(&mut self) {
        self.progress = ProgressPercent::from_fraction(self.samples_played(), self.total_samples);
    }
}

/// Double-buffered WAV playback driver.
///
/// `N` is the block size in samples. The controller holds two `N`-sample
/// blocks, so with the default 2048 keep it in a `static` or another
/// long-lived owner rather than on the stack.
pub struct PlaybackController<'s, const N: usize> {
    config: ControllerConfig,
    signals: &'s PlaybackSignals,
    streamer: PingPong<N>,
    session: Option<PlaybackSession>,
    state: PlaybackState,
    /// Samples converted into the software-owned block, not yet started.
    staged: u32,
    stalled_polls: u32,
    transfers_started: u32,
}

impl<'s, const N: usize> PlaybackController<'s, N> {
    /// Idle controller listening on `signals`.
    pub const fn new(config: ControllerConfig, signals: &'s PlaybackSignals) -> Self {
        Self {
            config,
            signals,
            streamer: PingPong::new(config.format),
            session: None,
            state: PlaybackState::Idle,
            staged: 0,
            stalled_polls: 0,
            transfers_started: 0,
        }
    }

    /// Parse `bytes` as a WAV file and start playing it.
    ///
    /// A header error is returned without touching the current session.
    pub fn load<D: DacDma, C: SampleClock>(
        &mut self,
        bytes: &[u8],
        dac: &mut D,
        clock: &mut C,
    ) -> Result<WaveFormat, PlaybackError> {
        let format = match wav::parse_with(bytes, &self.config.format.profile()) {
            Ok(format) => format,
            Err(e) => {
                #[cfg(feature = "defmt")]
                defmt::warn!("WAV header rejected: {}", e);
                return Err(e.into());
            }
        };
        self.start(format, bytes, dac, clock)?;
        Ok(format)
    }

    /// Start playing the file in `source` described by `format`.
    ///
    /// Stops any current session, primes both blocks, starts the DMA on
    /// block A and then the sample clock.
    pub fn start<D: DacDma, C: SampleClock>(
        &mut self,
        format: WaveFormat,
        source: &[u8],
        dac: &mut D,
        clock: &mut C,
    ) -> Result<(), PlaybackError> {
        if self.state == PlaybackState::Playing {
            self.stop(dac, clock)?;
        }
        self.reset();

        let sample_format = self.config.format;
        let profile = sample_format.profile();
        if format.format_tag != WAVE_FORMAT_PCM
            || format.num_channels != profile.channels
            || format.bits_per_sample != profile.bits_per_sample
        {
            return Err(PlaybackError::FormatMismatch);
        }
        let reload = format
            .timer_reload()
            .ok_or(PlaybackError::Format(WaveParseError::UnsupportedSampleRate {
                rate: format.sample_rate,
            }))?;

        let bps = sample_format.bytes_per_sample();
        let data_offset = usize::try_from(format.data_offset).unwrap_or(usize::MAX);
        let available = source.len().saturating_sub(data_offset);
        let claimed = usize::try_from(format.data_size).unwrap_or(usize::MAX);
        if claimed > available {
            #[cfg(feature = "defmt")]
            defmt::warn!(
                "data chunk claims {} bytes, only {} present; clamping",
                claimed,
                available
            );
        }
        let total = claimed.min(available).checked_div(bps).unwrap_or(0);
        let total = u32::try_from(total)
            .unwrap_or(MAX_TOTAL_SAMPLES)
            .min(MAX_TOTAL_SAMPLES);
        if total == 0 {
            return Err(PlaybackError::EmptyData);
        }

        self.streamer.set_format(sample_format)?;
        let (first, second) = self.launch(source, data_offset, total, reload, dac, clock)?;

        let rest = total.saturating_sub(first);
        let mut session = PlaybackSession {
            format,
            total_samples: total,
            samples_remaining: to_i32(rest),
            cursor: advance(data_offset, first, bps),
            progress: ProgressPercent::START,
            buffer_select: BufferId::A,
        };
        session.recompute_progress();
        self.session = Some(session);
        self.staged = second;
        self.transfers_started = 1;
        self.state = PlaybackState::Playing;

        #[cfg(feature = "defmt")]
        defmt::info!(
            "playback started: {} Hz, {} samples, reload {}",
            format.sample_rate,
            total,
            reload.get()
        );
        Ok(())
    }

    /// Fill block A (and B when more remains) from `cursor`, then start the
    /// DMA on A and the sample clock at `reload`. Returns the samples placed
    /// in each block.
    fn launch<D: DacDma, C: SampleClock>(
        &mut self,
        source: &[u8],
        cursor: usize,
        remaining: u32,
        reload: TimerReload,
        dac: &mut D,
        clock: &mut C,
    ) -> Result<(u32, u32), PlaybackError> {
        let bps = self.config.format.bytes_per_sample();
        let first = fill(&mut self.streamer, BufferId::A, source, cursor, remaining, bps)?;
        let rest = remaining.saturating_sub(first);
        let second = if rest > 0 {
            let after_first = advance(cursor, first, bps);
            fill(&mut self.streamer, BufferId::B, source, after_first, rest, bps)?
        } else {
            0
        };

        clock
            .set_reload_value(reload.get())
            .map_err(|_| PlaybackError::ClockFault)?;
        self.signals.completion.clear();
        self.streamer.start_hardware_playback(BufferId::A, dac)?;
        if clock.start().is_err() {
            let _ = self.streamer.stop(dac);
            return Err(PlaybackError::ClockFault);
        }
        Ok((first, second))
    }

    /// One main-loop iteration. See the module docs for the order of work.
    ///
    /// Any error stops the DMA and the sample clock and leaves the
    /// controller `Faulted`.
    pub fn tick<D: DacDma, C: SampleClock>(
        &mut self,
        source: &[u8],
        dac: &mut D,
        clock: &mut C,
    ) -> Result<TickOutcome, PlaybackError> {
        let result = match self.state {
            PlaybackState::Playing => self.advance_stream(source, dac, clock),
            PlaybackState::Finished => self.replay_from_seek(source, dac, clock),
            PlaybackState::Idle | PlaybackState::Faulted => return Ok(TickOutcome::Idle),
        };
        match result {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                #[cfg(feature = "defmt")]
                defmt::error!("playback fault: {}", e);
                self.fault(dac, clock);
                Err(e)
            }
        }
    }

    fn advance_stream<D: DacDma, C: SampleClock>(
        &mut self,
        source: &[u8],
        dac: &mut D,
        clock: &mut C,
    ) -> Result<TickOutcome, PlaybackError> {
        let bps = self.config.format.bytes_per_sample();
        let Some(session) = self.session.as_mut() else {
            return Ok(TickOutcome::Idle);
        };

        if let Some(target) = self.signals.seek.take() {
            let software = session.buffer_select.other();
            self.streamer.discard(software)?;
            self.staged = 0;
            apply_seek(session, target, bps);
            #[cfg(feature = "defmt")]
            defmt::info!(
                "seek to {}%: {} samples remaining",
                target.get(),
                session.samples_remaining
            );
        }

        let remaining = u32::try_from(session.samples_remaining).unwrap_or(0);
        if self.staged == 0 && remaining > 0 {
            let target = session.buffer_select.other();
            self.staged = fill(&mut self.streamer, target, source, session.cursor, remaining, bps)?;
            if self.staged == 0 {
                // source shorter than at start(): nothing more to read
                #[cfg(feature = "defmt")]
                defmt::warn!("source ended at byte {}", session.cursor);
                session.samples_remaining = 0;
            }
        }

        if !self.signals.completion.take() {
            self.stalled_polls = self.stalled_polls.saturating_add(1);
            if self.stalled_polls > self.config.dma_wait_spins {
                return Err(PlaybackError::HardwareTimeout {
                    polls: self.stalled_polls,
                });
            }
            return Ok(TickOutcome::Waiting);
        }
        self.stalled_polls = 0;

        if self.staged == 0 {
            let dac_result = self.streamer.stop(dac);
            let clock_result = clock.stop();
            session.recompute_progress();
            self.state = PlaybackState::Finished;
            #[cfg(feature = "defmt")]
            defmt::info!("playback finished after {} blocks", self.transfers_started);
            dac_result?;
            clock_result.map_err(|_| PlaybackError::ClockFault)?;
            return Ok(TickOutcome::Finished);
        }

        let target = session.buffer_select.other();
        self.streamer.start_hardware_playback(target, dac)?;
        session.samples_remaining = session.samples_remaining.saturating_sub(to_i32(self.staged));
        session.cursor = advance(session.cursor, self.staged, bps);
        session.buffer_select = target;
        session.recompute_progress();
        self.staged = 0;
        self.transfers_started = self.transfers_started.saturating_add(1);
        Ok(TickOutcome::Swapped)
    }

    /// A seek that lands after the file ended restarts the hardware from the
    /// new position. Seeks to the very end leave the session `Finished`.
    fn replay_from_seek<D: DacDma, C: SampleClock>(
        &mut self,
        source: &[u8],
        dac: &mut D,
        clock: &mut C,
    ) -> Result<TickOutcome, PlaybackError> {
        let Some(target) = self.signals.seek.take() else {
            return Ok(TickOutcome::Idle);
        };
        let bps = self.config.format.bytes_per_sample();
        let Some(mut session) = self.session else {
            return Ok(TickOutcome::Idle);
        };
        apply_seek(&mut session, target, bps);
        let remaining = u32::try_from(session.samples_remaining).unwrap_or(0);
        if remaining == 0 {
            self.session = Some(session);
            return Ok(TickOutcome::Idle);
        }
        let reload = session
            .format
            .timer_reload()
            .ok_or(PlaybackError::Format(WaveParseError::UnsupportedSampleRate {
                rate: session.format.sample_rate,
            }))?;

        let (first, second) = self.launch(source, session.cursor, remaining, reload, dac, clock)?;
        session.samples_remaining = to_i32(remaining.saturating_sub(first));
        session.cursor = advance(session.cursor, first, bps);
        session.buffer_select = BufferId::A;
        session.recompute_progress();
        self.session = Some(session);
        self.staged = second;
        self.stalled_polls = 0;
        self.transfers_started = self.transfers_started.saturating_add(1);
        self.state = PlaybackState::Playing;

        #[cfg(feature = "defmt")]
        defmt::info!("replaying from {}%", target.get());
        Ok(TickOutcome::Resumed)
    }

    /// Ask for playback to continue at `target`. Applied at the next
    /// [`tick`](Self::tick); a later request replaces an unapplied one.
    ///
    /// Interrupt handlers post through [`PlaybackSignals::seek`] directly.
    pub fn request_seek(&self, target: ProgressPercent) {
        self.signals.seek.post(target);
    }

    /// Block (bounded) until the DMA signals completion of the current
    /// block. The completion stays pending for the next [`tick`](Self::tick).
    ///
    /// A timeout stops the hardware and leaves the controller `Faulted`.
    pub fn wait_for_block<D: DacDma, C: SampleClock>(
        &mut self,
        dac: &mut D,
        clock: &mut C,
    ) -> Result<(), PlaybackError> {
        if self.state != PlaybackState::Playing {
            return Err(PlaybackError::NotPlaying);
        }
        match self
            .streamer
            .wait_hardware_done(&self.signals.completion, self.config.dma_wait_spins)
        {
            Ok(()) => Ok(()),
            Err(e) => {
                #[cfg(feature = "defmt")]
                defmt::error!("DMA completion wait failed: {}", e);
                self.fault(dac, clock);
                Err(match e {
                    StreamError::HardwareTimeout { polls } => {
                        PlaybackError::HardwareTimeout { polls }
                    }
                    other => PlaybackError::Stream(other),
                })
            }
        }
    }

    /// Stop immediately, without waiting for the current block. Safe to
    /// call in any state.
    pub fn stop<D: DacDma, C: SampleClock>(
        &mut self,
        dac: &mut D,
        clock: &mut C,
    ) -> Result<(), PlaybackError> {
        let dac_result = self.streamer.stop(dac);
        let clock_result = clock.stop();
        self.reset();
        #[cfg(feature = "defmt")]
        defmt::info!("playback stopped");
        dac_result?;
        clock_result.map_err(|_| PlaybackError::ClockFault)
    }

    fn reset(&mut self) {
        self.session = None;
        self.state = PlaybackState::Idle;
        self.staged = 0;
        self.stalled_polls = 0;
        self.transfers_started = 0;
        self.signals.reset();
    }

    fn fault<D: DacDma, C: SampleClock>(&mut self, dac: &mut D, clock: &mut C) {
        let _ = self.streamer.stop(dac);
        let _ = clock.stop();
        self.staged = 0;
        self.state = PlaybackState::Faulted;
    }

    /// Current lifecycle state.
    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// Active (or last finished/faulted) session.
    pub fn session(&self) -> Option<&PlaybackSession> {
        self.session.as_ref()
    }

    /// Progress of the session, `START` when none.
    pub fn progress(&self) -> ProgressPercent {
        self.session
            .as_ref()
            .map_or(ProgressPercent::START, |s| s.progress)
    }

    /// Samples not yet handed to the DAC.
    pub fn samples_remaining(&self) -> i32 {
        self.session.as_ref().map_or(0, |s| s.samples_remaining)
    }

    /// Samples in the session.
    pub fn total_samples(&self) -> u32 {
        self.session.as_ref().map_or(0, |s| s.total_samples)
    }

    /// Byte offset of the next sample to hand to the DAC.
    pub fn cursor(&self) -> Option<usize> {
        self.session.as_ref().map(|s| s.cursor)
    }

    /// DMA transfers started in this session.
    pub fn transfers_started(&self) -> u32 {
        self.transfers_started
    }

    /// The ping-pong blocks.
    pub fn streamer(&self) -> &PingPong<N> {
        &self.streamer
    }

    /// Configuration in use.
    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }
}

/// Seek arithmetic: `played = total * p / 100`, rounded down.
fn apply_seek(session: &mut PlaybackSession, target: ProgressPercent, bps: usize) {
    let total = u64::from(session.total_samples);
    #[allow(clippy::arithmetic_side_effects)] // Safety: total < 2^31, * 100 fits u64; divisor is non-zero
    let played = total * u64::from(target.get()) / 100;
    let played = u32::try_from(played).unwrap_or(session.total_samples);
    session.samples_remaining = to_i32(session.total_samples.saturating_sub(played));
    session.cursor = advance(session.data_offset(), played, bps);
    session.recompute_progress();
}

/// Convert up to `min(count, N)` samples starting at byte `cursor`.
fn fill<const N: usize>(
    streamer: &mut PingPong<N>,
    target: BufferId,
    source: &[u8],
    cursor: usize,
    count: u32,
    bps: usize,
) -> Result<u32, StreamError> {
    let count = usize::try_from(count).unwrap_or(usize::MAX).min(N);
    let end = advance(cursor, u32::try_from(count).unwrap_or(u32::MAX), bps).min(source.len());
    let window = source.get(cursor..end).unwrap_or(&[]);
    let written = streamer.fill_buffer(target, window, count)?;
    Ok(u32::try_from(written).unwrap_or(0))
}

fn advance(cursor: usize, samples: u32, bps: usize) -> usize {
    let samples = usize::try_from(samples).unwrap_or(usize::MAX);
    cursor.saturating_add(samples.saturating_mul(bps))
}

fn to_i32(n: u32) -> i32 {
    i32::try_from(n).unwrap_or(i32::MAX)
}
