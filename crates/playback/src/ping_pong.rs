//! Double-buffered DAC feeding.
//!
//! `PingPong<N>` owns two blocks of `N` DAC codes. At any instant at most one
//! of them is hardware-owned (being drained by DMA) and must not be written;
//! the other is software-owned and may be refilled. Ownership flips only in
//! [`PingPong::start_hardware_playback`], which the caller issues after the
//! transfer-complete signal, never on a timer.
//!
//! ```text
//!            start(A)              start(B)              start(A)
//!   Idle ─────────────▶ APlaying ─────────────▶ BPlaying ─────────────▶ …
//!     ▲                    │                       │
//!     └──────── stop ──────┴───────────────────────┘
//! ```

use platform::{CompletionFlag, DacDma, WaitTimeout};

use crate::codec::SampleFormat;

/// One of the two blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BufferId {
    /// First block.
    A,
    /// Second block.
    B,
}

impl BufferId {
    /// The other block.
    #[must_use]
    pub const fn other(self) -> Self {
        match self {
            Self::A => Self::B,
            Self::B => Self::A,
        }
    }
}

/// Which block, if any, the DMA is draining.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StreamerState {
    /// Nothing handed to hardware yet (or stopped).
    Idle,
    /// Block A is hardware-owned.
    BufferAPlaying,
    /// Block B is hardware-owned.
    BufferBPlaying,
}

impl StreamerState {
    /// The hardware-owned block.
    pub const fn playing(self) -> Option<BufferId> {
        match self {
            Self::Idle => None,
            Self::BufferAPlaying => Some(BufferId::A),
            Self::BufferBPlaying => Some(BufferId::B),
        }
    }

    const fn playing_state(buffer: BufferId) -> Self {
        match buffer {
            BufferId::A => Self::BufferAPlaying,
            BufferId::B => Self::BufferBPlaying,
        }
    }
}

/// Streamer failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StreamError {
    /// Attempt to write or restart the block the DMA is draining.
    #[error("buffer {buffer:?} is owned by the DMA")]
    BufferBusy {
        /// The hardware-owned block.
        buffer: BufferId,
    },
    /// Attempt to start a block that holds no samples.
    #[error("buffer {buffer:?} has not been filled")]
    BufferEmpty {
        /// The empty block.
        buffer: BufferId,
    },
    /// The transfer-complete signal did not arrive in time.
    #[error("DMA transfer did not complete within {polls} polls")]
    HardwareTimeout {
        /// Polls spent waiting.
        polls: u32,
    },
    /// The DAC driver refused the transfer.
    #[error("DAC driver fault")]
    DacFault,
}

/// Two DAC code blocks with hardware/software ownership tracking.
pub struct PingPong<const N: usize> {
    a: [u16; N],
    b: [u16; N],
    /// Filled length of each block; 0 means "nothing to play".
    len_a: usize,
    len_b: usize,
    state: StreamerState,
    format: SampleFormat,
}

impl<const N: usize> PingPong<N> {
    /// Both blocks empty, state `Idle`.
    pub const fn new(format: SampleFormat) -> Self {
        Self {
            a: [0; N],
            b: [0; N],
            len_a: 0,
            len_b: 0,
            state: StreamerState::Idle,
            format,
        }
    }

    /// Block capacity in samples.
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Current ownership state.
    pub fn state(&self) -> StreamerState {
        self.state
    }

    /// Sample layout this streamer converts from.
    pub fn format(&self) -> SampleFormat {
        self.format
    }

    /// Change the sample layout. Only allowed while `Idle`.
    pub fn set_format(&mut self, format: SampleFormat) -> Result<(), StreamError> {
        if let Some(buffer) = self.state.playing() {
            return Err(StreamError::BufferBusy { buffer });
        }
        self.format = format;
        Ok(())
    }

    /// The block software may write: the one the DMA is not draining
    /// (`A` while idle).
    pub fn software_buffer(&self) -> BufferId {
        self.state.playing().map_or(BufferId::A, BufferId::other)
    }

    /// Number of codes held by `buffer` (0 if unfilled).
    pub fn filled_len(&self, buffer: BufferId) -> usize {
        match buffer {
            BufferId::A => self.len_a,
            BufferId::B => self.len_b,
        }
    }

    /// Whether `buffer` holds samples.
    pub fn is_filled(&self, buffer: BufferId) -> bool {
        self.filled_len(buffer) != 0
    }

    /// The filled codes of `buffer`.
    pub fn block(&self, buffer: BufferId) -> &[u16] {
        let (data, len) = match buffer {
            BufferId::A => (&self.a, self.len_a),
            BufferId::B => (&self.b, self.len_b),
        };
        data.get(..len).unwrap_or(&[])
    }

    /// Convert up to `count` samples from `source` into `target`.
    ///
    /// `count` is clamped to `N` and to the whole samples present in
    /// `source`. Returns the number of codes written.
    ///
    /// # Errors
    ///
    /// [`StreamError::BufferBusy`] if `target` is hardware-owned. Nothing is
    /// written in that case.
    pub fn fill_buffer(
        &mut self,
        target: BufferId,
        source: &[u8],
        count: usize,
    ) -> Result<usize, StreamError> {
        if self.state.playing() == Some(target) {
            #[cfg(feature = "defmt")]
            defmt::error!("fill of DMA-owned buffer {} refused", target);
            return Err(StreamError::BufferBusy { buffer: target });
        }
        let count = count.min(N);
        let format = self.format;
        let (data, len) = match target {
            BufferId::A => (&mut self.a, &mut self.len_a),
            BufferId::B => (&mut self.b, &mut self.len_b),
        };
        let dst = data.get_mut(..count).unwrap_or(&mut []);
        *len = format.encode_block(source, dst);
        Ok(*len)
    }

    /// Mark the software-owned `buffer` as empty without touching the DMA.
    ///
    /// Used when a seek invalidates a block that was filled but never
    /// started.
    pub fn discard(&mut self, buffer: BufferId) -> Result<(), StreamError> {
        if self.state.playing() == Some(buffer) {
            return Err(StreamError::BufferBusy { buffer });
        }
        match buffer {
            BufferId::A => self.len_a = 0,
            BufferId::B => self.len_b = 0,
        }
        Ok(())
    }

    /// Hand `buffer` to the DMA and take the previously playing block back.
    ///
    /// Call only after the previous transfer has signalled completion (or
    /// from `Idle`); the DAC driver aborts whatever is in flight.
    ///
    /// # Errors
    ///
    /// - [`StreamError::BufferBusy`] if `buffer` is already playing
    /// - [`StreamError::BufferEmpty`] if `buffer` was never filled
    /// - [`StreamError::DacFault`] if the driver rejects the transfer; the
    ///   ownership state is left unchanged
    pub fn start_hardware_playback<D: DacDma>(
        &mut self,
        buffer: BufferId,
        dac: &mut D,
    ) -> Result<(), StreamError> {
        if self.state.playing() == Some(buffer) {
            return Err(StreamError::BufferBusy { buffer });
        }
        if !self.is_filled(buffer) {
            return Err(StreamError::BufferEmpty { buffer });
        }
        let alignment = self.format.alignment();
        dac.start_transfer(self.block(buffer), alignment).map_err(|_e| {
            #[cfg(feature = "defmt")]
            defmt::error!("DAC start failed: {}", defmt::Debug2Format(&_e));
            StreamError::DacFault
        })?;
        // the block that just finished becomes software-owned and stale
        if let Some(previous) = self.state.playing() {
            match previous {
                BufferId::A => self.len_a = 0,
                BufferId::B => self.len_b = 0,
            }
        }
        self.state = StreamerState::playing_state(buffer);
        Ok(())
    }

    /// Whether the transfer-complete signal is pending. Does not consume it.
    pub fn is_hardware_done(&self, completion: &CompletionFlag) -> bool {
        completion.is_set()
    }

    /// Poll until the transfer-complete signal is pending, at most
    /// `spin_limit` times. The signal is left set for the caller to consume.
    ///
    /// # Errors
    ///
    /// [`StreamError::HardwareTimeout`] when the budget runs out.
    pub fn wait_hardware_done(
        &self,
        completion: &CompletionFlag,
        spin_limit: u32,
    ) -> Result<(), StreamError> {
        completion
            .wait(spin_limit)
            .map_err(|WaitTimeout { polls }| StreamError::HardwareTimeout { polls })
    }

    /// Abort the transfer and drop both blocks. Ends in `Idle` even if the
    /// driver reports an error.
    pub fn stop<D: DacDma>(&mut self, dac: &mut D) -> Result<(), StreamError> {
        let result = dac.stop_transfer().map_err(|_| StreamError::DacFault);
        self.len_a = 0;
        self.len_b = 0;
        self.state = StreamerState::Idle;
        result
    }
}
