//! Interrupt → main loop hand-off of seek requests and DMA completions.
//!
//! The periodic timer interrupt decides *when* a scrub commits; the main
//! loop decides *where* the stream continues. Between them sits a single
//! slot: the latest posted progress wins, and the main loop drains it at the
//! start of its next tick. Only atomics cross the boundary.

use core::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use platform::{CompletionFlag, ProgressPercent};

/// Lock-free single-slot mailbox for a pending seek.
#[derive(Debug)]
pub struct SeekMailbox {
    percent: AtomicU8,
    pending: AtomicBool,
}

impl SeekMailbox {
    /// Empty mailbox.
    pub const fn new() -> Self {
        Self {
            percent: AtomicU8::new(0),
            pending: AtomicBool::new(false),
        }
    }

    /// Post a request, replacing any that has not been taken yet.
    pub fn post(&self, target: ProgressPercent) {
        self.percent.store(target.get(), Ordering::Relaxed);
        self.pending.store(true, Ordering::Release);
    }

    /// Take the pending request, if any.
    pub fn take(&self) -> Option<ProgressPercent> {
        if self.pending.swap(false, Ordering::Acquire) {
            Some(ProgressPercent::new(self.percent.load(Ordering::Relaxed)))
        } else {
            None
        }
    }

    /// Whether a request is waiting.
    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    /// Drop any pending request.
    pub fn clear(&self) {
        self.pending.store(false, Ordering::Release);
    }
}

impl Default for SeekMailbox {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything an interrupt hands to the playback loop.
///
/// Lives in a `static`; the DMA interrupt signals `completion`, the periodic
/// timer posts to `seek`, and the controller drains both.
#[derive(Debug, Default)]
pub struct PlaybackSignals {
    /// DAC DMA transfer complete.
    pub completion: CompletionFlag,
    /// Committed scrub position.
    pub seek: SeekMailbox,
}

impl PlaybackSignals {
    /// Both signals cleared.
    pub const fn new() -> Self {
        Self {
            completion: CompletionFlag::new(),
            seek: SeekMailbox::new(),
        }
    }

    /// Clear both signals (after a stop or before a new file).
    pub fn reset(&self) {
        self.completion.clear();
        self.seek.clear();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn empty_mailbox_yields_nothing() {
        let mb = SeekMailbox::new();
        assert!(!mb.is_pending());
        assert_eq!(mb.take(), None);
    }

    #[test]
    fn latest_post_wins() {
        let mb = SeekMailbox::new();
        mb.post(ProgressPercent::new(20));
        mb.post(ProgressPercent::new(65));
        assert_eq!(mb.take(), Some(ProgressPercent::new(65)));
        assert_eq!(mb.take(), None);
    }

    #[test]
    fn clear_drops_request() {
        let mb = SeekMailbox::new();
        mb.post(ProgressPercent::END);
        mb.clear();
        assert_eq!(mb.take(), None);
    }

    #[test]
    fn post_from_another_thread() {
        static SIGNALS: PlaybackSignals = PlaybackSignals::new();
        std::thread::spawn(|| {
            SIGNALS.seek.post(ProgressPercent::new(40));
            SIGNALS.completion.signal();
        })
        .join()
        .unwrap();
        assert_eq!(SIGNALS.seek.take(), Some(ProgressPercent::new(40)));
        assert!(SIGNALS.completion.take());
        SIGNALS.reset();
        assert!(!SIGNALS.seek.is_pending());
    }
}
