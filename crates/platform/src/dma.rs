//! DMA completion signalling and audio DMA sizing.
//!
//! The DAC DMA transfer-complete interrupt is the only writer of
//! [`CompletionFlag`]; the main loop is the only reader/clearer. An atomic
//! bool is the whole protocol: no compound state crosses the interrupt
//! boundary.
//!
//! ```rust
//! use platform::dma::CompletionFlag;
//!
//! static DAC_DONE: CompletionFlag = CompletionFlag::new();
//!
//! // DMA1 channel 3 ISR:
//! DAC_DONE.signal();
//!
//! // main loop:
//! if DAC_DONE.take() {
//!     // previous block drained; the other buffer may be handed over
//! }
//! ```

use core::sync::atomic::{AtomicBool, Ordering};

// ── Audio DMA constants ──────────────────────────────────────────────────────

/// Number of mono samples per ping-pong block.
///
/// At 44.1 kHz one block lasts ~46 ms; at 8 kHz ~256 ms. Two blocks of
/// `u16` codes occupy 8 KB of SRAM.
pub const AUDIO_DMA_BUFFER_SAMPLES: usize = 2048;

/// Default number of polls before a missing transfer-complete interrupt is
/// reported as a hardware timeout.
///
/// The slowest supported block (2048 samples at 8 kHz) lasts 256 ms. At
/// 80 MHz a poll iteration of the playback loop is well under 1 µs, so this
/// leaves more than an order of magnitude of headroom.
pub const DMA_WAIT_SPIN_LIMIT: u32 = 10_000_000;

// ── Completion flag ──────────────────────────────────────────────────────────

/// The transfer-complete interrupt did not fire within the poll budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[error("DMA transfer did not complete within {polls} polls")]
pub struct WaitTimeout {
    /// Number of polls spent before giving up.
    pub polls: u32,
}

/// Single-producer / single-consumer "transfer complete" flag.
///
/// `const`-constructible so it can live in a `static` shared with an ISR.
#[derive(Debug)]
pub struct CompletionFlag {
    done: AtomicBool,
}

impl CompletionFlag {
    /// New, cleared flag.
    pub const fn new() -> Self {
        Self {
            done: AtomicBool::new(false),
        }
    }

    /// Set the flag. Called from the DMA interrupt.
    pub fn signal(&self) {
        self.done.store(true, Ordering::Release);
    }

    /// Whether the flag is set, without clearing it.
    pub fn is_set(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }

    /// Consume the flag: returns `true` and clears it if it was set.
    pub fn take(&self) -> bool {
        self.done.swap(false, Ordering::AcqRel)
    }

    /// Clear the flag (stale completions after a stop).
    pub fn clear(&self) {
        self.done.store(false, Ordering::Release);
    }

    /// Poll until the flag is set, or give up after `max_polls` polls.
    ///
    /// The flag stays set so the caller can still [`take`](Self::take) it.
    /// A DMA stream that never completes becomes a reportable error
    /// instead of a hang.
    pub fn wait(&self, max_polls: u32) -> Result<(), WaitTimeout> {
        let mut polls: u32 = 0;
        while polls < max_polls {
            if self.is_set() {
                return Ok(());
            }
            core::hint::spin_loop();
            polls = polls.saturating_add(1);
        }
        Err(WaitTimeout { polls })
    }
}

impl Default for CompletionFlag {
    fn default() -> Self {
        Self::new()
    }
}
