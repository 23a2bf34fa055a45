//! Encoder scrubbing: raw counter readings → debounced seek requests.
//!
//! The main loop reads the encoder counter every iteration and moves a
//! *preview* progress by one step per detected movement. Nothing is sought
//! while the user keeps turning: the periodic timer interrupt counts idle
//! ticks and only after [`TransportConfig::debounce_ticks`] of them posts the
//! preview to the [`SeekMailbox`]. The playback loop picks it up on its next
//! tick.
//!
//! # Event channel
//!
//! A single static [`Channel`] ([`TRANSPORT_EVENTS`]) carries
//! [`TransportEvent`]s to whoever draws the progress (the display task on
//! the device, the log in the emulator). Both sides push with
//! [`try_send_event`]: when the consumer stalls and the channel is full the
//! event is dropped, the producer never blocks. The periodic interrupt is one
//! of the producers, so a blocking send is not an option there.
//!
//! # Shared state
//!
//! [`ScrubState`] is written from both contexts (main loop on movement,
//! interrupt on commit) and therefore holds only atomics. On the single-core
//! target the interrupt preempts the main loop, never the other way round.

use core::sync::atomic::{AtomicBool, AtomicU16, AtomicU8, Ordering};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, Receiver, Sender};

use platform::input::ENCODER_COUNTER_MAX;
use platform::{EncoderCounter, Movement, ProgressPercent};
use playback::SeekMailbox;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Scrub behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TransportConfig {
    /// Idle period-timer ticks after the last movement before the seek
    /// commits. At the 10 ms period, 350 ticks is 3.5 s.
    pub debounce_ticks: u16,
    /// Progress change per detected movement, in percent.
    pub step_percent: u8,
    /// Auto-reload value of the encoder counter.
    pub counter_max: u16,
}

impl TransportConfig {
    /// Board defaults.
    pub const DEFAULT: Self = Self {
        debounce_ticks: 350,
        step_percent: 5,
        counter_max: ENCODER_COUNTER_MAX,
    };
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

// ---------------------------------------------------------------------------
// Encoder decoding
// ---------------------------------------------------------------------------

/// Result of one encoder poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EncoderDelta {
    /// Direction, `None` when no full detent was seen.
    pub movement: Movement,
    /// Detents since the last accepted reading (two counts per detent).
    pub steps: u16,
}

impl EncoderDelta {
    /// No movement.
    pub const NONE: Self = Self {
        movement: Movement::None,
        steps: 0,
    };
}

/// Turns successive counter readings into movements.
///
/// Counting up is [`Movement::Left`], counting down is [`Movement::Right`].
/// A distance of more than half the counter range is taken as a wrap through
/// zero and reverses the direction. The baseline only advances once a full
/// detent (two counts) has accumulated, so single-count jitter is never lost
/// and never reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncoderTracker {
    baseline: u16,
    counter_max: u16,
}

impl EncoderTracker {
    /// Tracker starting from the counter value `baseline`.
    pub const fn new(baseline: u16, counter_max: u16) -> Self {
        Self {
            baseline,
            counter_max,
        }
    }

    /// Last accepted counter value.
    pub fn baseline(&self) -> u16 {
        self.baseline
    }

    /// Decode one counter reading.
    pub fn update(&mut self, counter: u16) -> EncoderDelta {
        let (mut diff, mut movement) = match counter.cmp(&self.baseline) {
            core::cmp::Ordering::Equal => return EncoderDelta::NONE,
            core::cmp::Ordering::Greater => (counter.abs_diff(self.baseline), Movement::Left),
            core::cmp::Ordering::Less => (counter.abs_diff(self.baseline), Movement::Right),
        };

        #[allow(clippy::arithmetic_side_effects)] // Safety: division by a non-zero literal
        let half_range = self.counter_max / 2;
        if diff > half_range {
            diff = self.counter_max.saturating_sub(diff);
            movement = match movement {
                Movement::Left => Movement::Right,
                _ => Movement::Left,
            };
        }

        #[allow(clippy::arithmetic_side_effects)] // Safety: division by a non-zero literal
        let steps = diff / 2;
        if steps == 0 {
            return EncoderDelta::NONE;
        }
        self.baseline = counter;
        EncoderDelta { movement, steps }
    }

    /// Read `encoder` and decode the reading.
    pub fn poll<E: EncoderCounter>(&mut self, encoder: &mut E) -> EncoderDelta {
        let counter = encoder.read_counter();
        self.update(counter)
    }
}

// ---------------------------------------------------------------------------
// Scrub preview + debounce
// ---------------------------------------------------------------------------

/// Preview position and seek debounce, shared with the period interrupt.
#[derive(Debug)]
pub struct ScrubState {
    config: TransportConfig,
    armed: AtomicBool,
    idle_ticks: AtomicU16,
    preview: AtomicU8,
}

impl ScrubState {
    /// Disarmed state.
    pub const fn new(config: TransportConfig) -> Self {
        Self {
            config,
            armed: AtomicBool::new(false),
            idle_ticks: AtomicU16::new(0),
            preview: AtomicU8::new(0),
        }
    }

    /// Configuration in use.
    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// `true` between the first movement and the commit.
    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::Acquire)
    }

    /// Preview progress while armed.
    pub fn preview(&self) -> Option<ProgressPercent> {
        self.is_armed()
            .then(|| ProgressPercent::new(self.preview.load(Ordering::Relaxed)))
    }

    /// Idle ticks counted since the last movement.
    pub fn idle_ticks(&self) -> u16 {
        self.idle_ticks.load(Ordering::Relaxed)
    }

    /// Apply a movement (main loop).
    ///
    /// The first movement starts the preview at `current`; later ones move
    /// the existing preview. Any movement restarts the debounce. Returns the
    /// new preview, or `None` for [`Movement::None`].
    pub fn on_movement(
        &self,
        movement: Movement,
        current: ProgressPercent,
    ) -> Option<ProgressPercent> {
        let next = self.next_preview(movement, current)?;
        self.restart_debounce();
        self.publish_preview(next);
        Some(next)
    }

    fn next_preview(&self, movement: Movement, current: ProgressPercent) -> Option<ProgressPercent> {
        let base = self.preview().unwrap_or(current);
        match movement {
            Movement::None => None,
            Movement::Left => Some(base.saturating_sub(self.config.step_percent)),
            Movement::Right => Some(base.saturating_add(self.config.step_percent)),
        }
    }

    // Runs before the preview store, so a period tick between the two cannot
    // commit the new preview and then be re-armed over.
    fn restart_debounce(&self) {
        self.idle_ticks.store(0, Ordering::Relaxed);
    }

    fn publish_preview(&self, next: ProgressPercent) {
        self.preview.store(next.get(), Ordering::Relaxed);
        self.armed.store(true, Ordering::Release);
    }

    /// Advance the debounce by one period (interrupt context).
    ///
    /// Once more than `debounce_ticks` idle ticks have passed, posts the
    /// preview to `seek`, disarms and returns the committed target. Only
    /// the tick that disarms posts.
    pub fn on_period_tick(&self, seek: &SeekMailbox) -> Option<ProgressPercent> {
        if !self.is_armed() {
            return None;
        }
        let idle = self
            .idle_ticks
            .fetch_add(1, Ordering::Relaxed)
            .saturating_add(1);
        if idle <= self.config.debounce_ticks {
            return None;
        }

        let target = ProgressPercent::new(self.preview.load(Ordering::Relaxed));
        if self
            .armed
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return None;
        }
        self.idle_ticks.store(0, Ordering::Relaxed);
        seek.post(target);
        Some(target)
    }

    /// Drop the preview without seeking.
    pub fn cancel(&self) {
        self.armed.store(false, Ordering::Release);
        self.idle_ticks.store(0, Ordering::Relaxed);
    }
}

impl Default for ScrubState {
    fn default() -> Self {
        Self::new(TransportConfig::DEFAULT)
    }
}

// ---------------------------------------------------------------------------
// Event channel
// ---------------------------------------------------------------------------

/// What the transport reports to the display side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransportEvent {
    /// The encoder moved the preview.
    Scrub {
        /// Direction of the movement.
        movement: Movement,
        /// Preview after the movement.
        preview: ProgressPercent,
    },
    /// The debounce expired and a seek was posted.
    SeekCommitted {
        /// Position the stream continues from.
        target: ProgressPercent,
    },
}

/// Depth of the transport event channel.
pub const TRANSPORT_CHANNEL_DEPTH: usize = 8;

/// Channel type carrying [`TransportEvent`]s.
pub type TransportChannel =
    Channel<CriticalSectionRawMutex, TransportEvent, TRANSPORT_CHANNEL_DEPTH>;

/// Producer half of a [`TransportChannel`].
pub type TransportSender<'a> =
    Sender<'a, CriticalSectionRawMutex, TransportEvent, TRANSPORT_CHANNEL_DEPTH>;

/// Consumer half of a [`TransportChannel`].
pub type TransportReceiver<'a> =
    Receiver<'a, CriticalSectionRawMutex, TransportEvent, TRANSPORT_CHANNEL_DEPTH>;

// CriticalSectionRawMutex: the period interrupt pushes into this channel, so
// the queue operations must mask it. Each push/pop is a handful of
// instructions; the masked window is far below one sample period.
/// Global transport event channel (main loop + period interrupt → display).
pub static TRANSPORT_EVENTS: TransportChannel = Channel::new();

/// Send without blocking. Returns `false` if the channel was full and the
/// event was dropped.
pub fn try_send_event(tx: &TransportSender<'_>, event: TransportEvent) -> bool {
    match tx.try_send(event) {
        Ok(()) => true,
        Err(_) => {
            #[cfg(feature = "defmt")]
            defmt::warn!("transport event dropped: {}", event);
            false
        }
    }
}

// ---------------------------------------------------------------------------
// Main-loop side
// ---------------------------------------------------------------------------

/// Main-loop half of the transport: owns the encoder tracker and reports
/// movements into the shared [`ScrubState`].
pub struct Transport<'a> {
    tracker: EncoderTracker,
    scrub: &'a ScrubState,
    events: TransportSender<'a>,
    dropped_events: u32,
}

impl<'a> Transport<'a> {
    /// Transport whose encoder baseline is `initial_counter`.
    pub fn new(scrub: &'a ScrubState, events: TransportSender<'a>, initial_counter: u16) -> Self {
        Self {
            tracker: EncoderTracker::new(initial_counter, scrub.config().counter_max),
            scrub,
            events,
            dropped_events: 0,
        }
    }

    /// Poll the encoder once and move the preview.
    ///
    /// `current` is the controller's progress, used as the starting point of
    /// a new scrub.
    pub fn poll<E: EncoderCounter>(&mut self, encoder: &mut E, current: ProgressPercent) -> Movement {
        let delta = self.tracker.poll(encoder);
        if let Some(preview) = self.scrub.on_movement(delta.movement, current) {
            let event = TransportEvent::Scrub {
                movement: delta.movement,
                preview,
            };
            if !try_send_event(&self.events, event) {
                self.dropped_events = self.dropped_events.saturating_add(1);
            }
        }
        delta.movement
    }

    /// Progress to show: the preview while scrubbing, else `current`.
    pub fn displayed_progress(&self, current: ProgressPercent) -> ProgressPercent {
        self.scrub.preview().unwrap_or(current)
    }

    /// Scrub events lost to a full channel.
    pub fn dropped_events(&self) -> u32 {
        self.dropped_events
    }

    /// The encoder tracker.
    pub fn tracker(&self) -> &EncoderTracker {
        &self.tracker
    }
}
