//! Player integration: click to start, stream, scrub with the encoder, let
//! the debounce commit and check the stream continues from the new position.
// Test file: unwrap/indexing/cast are intentional test mechanisms.
#![allow(
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::arithmetic_side_effects
)]

use firmware::{
    BacklightConfig, Player, PlayerConfig, PlayerError, PlayerHardware, PlayerShared,
    TransportChannel, TransportConfig, TransportEvent,
};
use platform::mocks::{MockBacklight, MockButton, MockDac, MockEncoder, MockSampleClock};
use platform::{MappedFlash, Movement, ProgressPercent};
use playback::{PlaybackError, PlaybackState, TickOutcome, WaveFormat, WaveParseError, WaveProfile};

const TOTAL: u32 = 1000;

/// 8 kHz mono 16-bit file whose sample `i` converts to DAC code `2047 + i`.
fn ramp_bytes() -> Vec<u8> {
    let mut file = WaveFormat::canonical(WaveProfile::MONO_16, 8000, TOTAL * 2)
        .to_canonical_header()
        .to_vec();
    for i in 0..TOTAL {
        file.extend_from_slice(&((i as i16) * 16).to_le_bytes());
    }
    file
}

/// `bytes` as if programmed into the memory-mapped audio partition.
fn flash(bytes: Vec<u8>) -> MappedFlash {
    MappedFlash::new(bytes.leak())
}

fn ramp_file() -> MappedFlash {
    flash(ramp_bytes())
}

fn shared_with_debounce(ticks: u16) -> PlayerShared {
    PlayerShared::new(
        TransportConfig {
            debounce_ticks: ticks,
            ..TransportConfig::DEFAULT
        },
        BacklightConfig::DEFAULT,
    )
}

fn hardware() -> PlayerHardware<MockDac, MockSampleClock, MockEncoder, MockButton> {
    PlayerHardware {
        dac: MockDac::new(),
        clock: MockSampleClock::new(),
        encoder: MockEncoder::new(1000),
        button: MockButton::pressed_after(2),
    }
}

#[test]
fn scrub_forward_commits_after_debounce() {
    let file = ramp_file();
    let shared = shared_with_debounce(3);
    let channel = TransportChannel::new();
    let mut pwm = MockBacklight::new();
    let mut player = Player::<64, _, _, _, _>::new(
        PlayerConfig::default(),
        &shared,
        channel.sender(),
        hardware(),
    );

    player.wait_for_click().unwrap();
    player.load(&file).unwrap();
    assert_eq!(player.state(), PlaybackState::Playing);
    assert_eq!(player.hardware().clock.reload(), Some(6000));

    // two blocks drain: 192 of 1000 samples handed over
    for _ in 0..2 {
        shared.on_dma_complete();
        assert_eq!(player.poll(&file).unwrap().tick, TickOutcome::Swapped);
    }
    assert_eq!(player.controller().progress(), ProgressPercent::new(19));

    // two detents forward while the third block is still playing
    player.hardware_mut().encoder.turn(-2);
    let report = player.poll(&file).unwrap();
    assert_eq!(report.tick, TickOutcome::Waiting);
    assert_eq!(report.movement, Movement::Right);
    assert_eq!(report.progress, ProgressPercent::new(24));
    player.hardware_mut().encoder.turn(-2);
    assert_eq!(player.poll(&file).unwrap().progress, ProgressPercent::new(29));

    // nothing is sought while the debounce runs
    for _ in 0..3 {
        assert_eq!(shared.on_period_tick(&mut pwm, &channel.sender()).seek_committed, None);
    }
    assert!(!shared.playback.seek.is_pending());
    let report = shared.on_period_tick(&mut pwm, &channel.sender());
    assert_eq!(report.seek_committed, Some(ProgressPercent::new(29)));

    // the next completed block is followed by the block at 29 %
    shared.on_dma_complete();
    let report = player.poll(&file).unwrap();
    assert_eq!(report.tick, TickOutcome::Swapped);
    assert_eq!(player.hardware().dac.last_block()[0], 2047 + 290);
    assert_eq!(player.controller().samples_remaining(), 1000 - 290 - 64);
    assert_eq!(report.progress, ProgressPercent::new(35));

    let events: Vec<_> = core::iter::from_fn(|| channel.try_receive().ok()).collect();
    assert_eq!(
        events,
        vec![
            TransportEvent::Scrub {
                movement: Movement::Right,
                preview: ProgressPercent::new(24),
            },
            TransportEvent::Scrub {
                movement: Movement::Right,
                preview: ProgressPercent::new(29),
            },
            TransportEvent::SeekCommitted {
                target: ProgressPercent::new(29),
            },
        ]
    );

    let mut polls = 0;
    while player.state() == PlaybackState::Playing {
        shared.on_dma_complete();
        player.poll(&file).unwrap();
        polls += 1;
        assert!(polls < 100);
    }
    assert_eq!(player.state(), PlaybackState::Finished);
    assert_eq!(player.displayed_progress(), ProgressPercent::END);
    assert!(!player.hardware().dac.is_running());
}

#[test]
fn scrub_back_after_the_end_replays() {
    let file = ramp_file();
    let shared = shared_with_debounce(3);
    let channel = TransportChannel::new();
    let mut pwm = MockBacklight::new();
    let mut player = Player::<64, _, _, _, _>::new(
        PlayerConfig::default(),
        &shared,
        channel.sender(),
        hardware(),
    );
    player.load(&file).unwrap();
    let mut polls = 0;
    while player.state() == PlaybackState::Playing {
        shared.on_dma_complete();
        player.poll(&file).unwrap();
        polls += 1;
        assert!(polls < 100);
    }
    assert_eq!(player.state(), PlaybackState::Finished);
    assert!(!player.hardware().clock.is_running());

    // two detents back from the end
    for expected in [95, 90] {
        player.hardware_mut().encoder.turn(2);
        let report = player.poll(&file).unwrap();
        assert_eq!(report.tick, TickOutcome::Idle);
        assert_eq!(report.movement, Movement::Left);
        assert_eq!(report.progress, ProgressPercent::new(expected));
    }
    for _ in 0..3 {
        shared.on_period_tick(&mut pwm, &channel.sender());
    }
    let report = shared.on_period_tick(&mut pwm, &channel.sender());
    assert_eq!(report.seek_committed, Some(ProgressPercent::new(90)));

    let report = player.poll(&file).unwrap();
    assert_eq!(report.tick, TickOutcome::Resumed);
    assert_eq!(player.state(), PlaybackState::Playing);
    assert!(!shared.playback.seek.is_pending());
    assert!(player.hardware().clock.is_running());
    assert!(player.hardware().dac.is_running());
    assert_eq!(player.hardware().dac.last_block()[0], 2047 + 900);
    assert_eq!(report.progress, ProgressPercent::new(96));

    shared.on_dma_complete();
    assert_eq!(player.poll(&file).unwrap().tick, TickOutcome::Swapped);
    assert_eq!(player.hardware().dac.last_block()[0], 2047 + 964);
    shared.on_dma_complete();
    assert_eq!(player.poll(&file).unwrap().tick, TickOutcome::Finished);
    assert_eq!(player.displayed_progress(), ProgressPercent::END);
}

#[test]
fn backlight_fades_in_after_click() {
    let shared = shared_with_debounce(350);
    let channel = TransportChannel::new();
    let mut pwm = MockBacklight::new();
    let mut player = Player::<64, _, _, _, _>::new(
        PlayerConfig::default(),
        &shared,
        channel.sender(),
        hardware(),
    );

    assert!(shared.on_period_tick(&mut pwm, &channel.sender()).backlight_settled);
    assert_eq!(player.wait_for_click().unwrap(), 2);

    let mut ticks = 0;
    while !shared.on_period_tick(&mut pwm, &channel.sender()).backlight_settled {
        ticks += 1;
    }
    assert_eq!(ticks, 935);
    assert!(shared.backlight.is_settled());
}

#[test]
fn bad_header_leaves_player_idle() {
    let mut bytes = ramp_bytes();
    bytes[8..12].copy_from_slice(b"AVI ");
    let file = flash(bytes);
    let shared = PlayerShared::default();
    let channel = TransportChannel::new();
    let mut player = Player::<64, _, _, _, _>::new(
        PlayerConfig::default(),
        &shared,
        channel.sender(),
        hardware(),
    );
    let err = player.load(&file).unwrap_err();
    assert!(matches!(
        err,
        PlayerError::Playback(PlaybackError::Format(WaveParseError::InvalidWaveFormat))
    ));
    assert_eq!(player.state(), PlaybackState::Idle);
    assert_eq!(player.hardware().dac.transfers_started(), 0);
}

#[test]
fn stalled_dma_faults_and_stops_hardware() {
    let file = ramp_file();
    let shared = PlayerShared::default();
    let channel = TransportChannel::new();
    let mut config = PlayerConfig::default();
    config.controller.dma_wait_spins = 5;
    let mut player = Player::<64, _, _, _, _>::new(config, &shared, channel.sender(), hardware());
    player.load(&file).unwrap();

    let mut result = Ok(());
    for _ in 0..10 {
        if let Err(e) = player.poll(&file) {
            result = Err(e);
            break;
        }
    }
    assert!(matches!(
        result,
        Err(PlayerError::Playback(PlaybackError::HardwareTimeout { .. }))
    ));
    assert_eq!(player.state(), PlaybackState::Faulted);
    assert!(!player.hardware().dac.is_running());
    assert!(!player.hardware().clock.is_running());
}

#[test]
fn stop_cancels_scrub_in_progress() {
    let file = ramp_file();
    let shared = shared_with_debounce(1);
    let channel = TransportChannel::new();
    let mut pwm = MockBacklight::new();
    let mut player = Player::<64, _, _, _, _>::new(
        PlayerConfig::default(),
        &shared,
        channel.sender(),
        hardware(),
    );
    player.load(&file).unwrap();
    player.hardware_mut().encoder.turn(2);
    player.poll(&file).unwrap();
    assert!(shared.scrub.is_armed());

    player.stop().unwrap();
    assert_eq!(player.state(), PlaybackState::Idle);
    for _ in 0..5 {
        assert_eq!(shared.on_period_tick(&mut pwm, &channel.sender()).seek_committed, None);
    }
}
