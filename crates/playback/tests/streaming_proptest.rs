//! Property-based tests of the controller under random completion and seek
//! schedules, driven against the platform mocks.

use platform::mocks::{MockDac, MockSampleClock};
use platform::ProgressPercent;
use playback::{
    ControllerConfig, PlaybackController, PlaybackSignals, PlaybackState, SampleFormat,
    SignPolicy, TickOutcome, WaveFormat, WaveProfile,
};
use proptest::prelude::*;

const BLOCK: usize = 64;
const HEADER: usize = 44;

fn config() -> ControllerConfig {
    ControllerConfig {
        format: SampleFormat::Pcm8Dac8 {
            sign: SignPolicy::PassThrough,
        },
        dma_wait_spins: 1_000,
    }
}

/// 8-bit file whose sample `i` has value `i % 251`.
fn wav8(samples: u32) -> Vec<u8> {
    let mut file = WaveFormat::canonical(WaveProfile::MONO_8, 8000, samples)
        .to_canonical_header()
        .to_vec();
    file.extend((0..samples).map(|i| (i % 251) as u8));
    file
}

fn expected_code(index: usize) -> u16 {
    (index % 251) as u16
}

#[derive(Debug, Clone, Copy)]
enum Step {
    /// Main loop spins without a completion.
    Poll,
    /// DMA completion interrupt, then a main-loop tick.
    Complete,
    /// Encoder commits a seek, then a main-loop tick.
    Seek(u8),
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        3 => Just(Step::Poll),
        6 => Just(Step::Complete),
        1 => (0u8..=100).prop_map(Step::Seek),
    ]
}

proptest! {
    /// The DMA-owned block is never written while it plays, and every block
    /// handed to the DAC holds exactly the file samples at the session
    /// position.
    #[test]
    fn hardware_block_is_never_overwritten(
        samples in 1u32..2_000,
        steps in proptest::collection::vec(step(), 1..200),
    ) {
        let file = wav8(samples);
        let signals = PlaybackSignals::new();
        let mut ctl = PlaybackController::<BLOCK>::new(config(), &signals);
        let (mut dac, mut clock) = (MockDac::new(), MockSampleClock::new());
        ctl.load(&file, &mut dac, &mut clock).unwrap();

        for step in steps {
            match step {
                Step::Poll => {}
                Step::Complete => signals.completion.signal(),
                Step::Seek(p) => ctl.request_seek(ProgressPercent::new(p)),
            }
            let outcome = ctl.tick(&file, &mut dac, &mut clock);
            prop_assert!(outcome.is_ok(), "tick failed: {:?}", outcome);

            if let Some(playing) = ctl.streamer().state().playing() {
                prop_assert_eq!(ctl.streamer().block(playing), dac.last_block());
            }
            if outcome == Ok(TickOutcome::Swapped) {
                let session = ctl.session().unwrap();
                let len = dac.last_block().len();
                let start = session.cursor - HEADER - len;
                for (i, code) in dac.last_block().iter().enumerate() {
                    prop_assert_eq!(*code, expected_code(start + i));
                }
            }
            let s = ctl.session().unwrap();
            prop_assert!(s.samples_remaining >= 0);
            prop_assert!(s.samples_remaining as u32 <= s.total_samples);
            // a seek after the end replays, so keep going past `Finished`
            prop_assert_ne!(ctl.state(), PlaybackState::Faulted);
        }
    }

    /// Without seeks, progress never goes backwards, reaches exactly 100
    /// only when nothing remains, and one transfer is started per block.
    #[test]
    fn progress_is_monotonic_without_seeks(samples in 1u32..3_000) {
        let file = wav8(samples);
        let signals = PlaybackSignals::new();
        let mut ctl = PlaybackController::<BLOCK>::new(config(), &signals);
        let (mut dac, mut clock) = (MockDac::new(), MockSampleClock::new());
        ctl.load(&file, &mut dac, &mut clock).unwrap();

        let mut last = ctl.progress();
        loop {
            signals.completion.signal();
            let outcome = ctl.tick(&file, &mut dac, &mut clock).unwrap();
            let now = ctl.progress();
            prop_assert!(now >= last);
            prop_assert_eq!(now == ProgressPercent::END, ctl.samples_remaining() == 0);
            last = now;
            if outcome == TickOutcome::Finished {
                break;
            }
        }
        let blocks = (samples as usize).div_ceil(BLOCK);
        prop_assert_eq!(dac.transfers_started(), blocks);
        prop_assert_eq!(ctl.transfers_started() as usize, blocks);
    }

    /// One tick after `request_seek(p)` the session sits exactly at
    /// `total * p / 100` (rounded down).
    #[test]
    fn seek_lands_on_the_requested_sample(samples in 1u32..5_000, p in 0u8..=100) {
        let file = wav8(samples);
        let signals = PlaybackSignals::new();
        let mut ctl = PlaybackController::<BLOCK>::new(config(), &signals);
        let (mut dac, mut clock) = (MockDac::new(), MockSampleClock::new());
        ctl.load(&file, &mut dac, &mut clock).unwrap();

        ctl.request_seek(ProgressPercent::new(p));
        ctl.tick(&file, &mut dac, &mut clock).unwrap();

        let played = u64::from(samples) * u64::from(p) / 100;
        prop_assert_eq!(i64::from(ctl.samples_remaining()), i64::from(samples) - played as i64);
        prop_assert_eq!(ctl.cursor(), Some(HEADER + played as usize));
        prop_assert_eq!(ctl.progress(), ProgressPercent::from_fraction(played as u32, samples));
    }
}
