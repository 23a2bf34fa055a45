//! Desktop emulator for the WAV player.
//!
//! Plays a generated tone through the mock DAC, scrubs forward with the
//! mock encoder a few blocks in and logs what the player does.
//!
//! ```bash
//! RUST_LOG=debug cargo run -p firmware --example wav_emulator --features emulator
//! ```
#![allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]

use firmware::{
    Player, PlayerConfig, PlayerHardware, PLAYER_SHARED, TRANSPORT_EVENTS, TransportEvent,
};
use platform::config::{dev_banner, APP_NAME, APP_TYPE, APP_VERSION, PERIOD_TICK_MS};
use platform::dma::AUDIO_DMA_BUFFER_SAMPLES;
use platform::mocks::{MockBacklight, MockButton, MockDac, MockEncoder, MockSampleClock};
use platform::qspi_config::audio_file_window;
use platform::{ByteSource, MappedFlash, Movement};
use playback::{PlaybackState, TickOutcome, WaveFormat, WaveProfile};
use tracing_subscriber::EnvFilter;

const SAMPLE_RATE: u32 = 16_000;
const TONE_HZ: f32 = 440.0;
const SECONDS: u32 = 10;
const BLOCK: usize = AUDIO_DMA_BUFFER_SAMPLES;

/// Mono 16-bit sine at [`TONE_HZ`], half scale.
fn tone_bytes() -> Vec<u8> {
    let samples = SAMPLE_RATE * SECONDS;
    let mut file = WaveFormat::canonical(WaveProfile::MONO_16, SAMPLE_RATE, samples * 2)
        .to_canonical_header()
        .to_vec();
    for i in 0..samples {
        let t = i as f32 / SAMPLE_RATE as f32;
        let s = (2.0 * std::f32::consts::PI * TONE_HZ * t).sin() * f32::from(i16::MAX / 2);
        file.extend_from_slice(&(s as i16).to_le_bytes());
    }
    file
}

/// Period ticks that elapse while one block plays.
fn period_ticks_per_block() -> u32 {
    let block_ms = (BLOCK as u32).saturating_mul(1000) / SAMPLE_RATE;
    (block_ms / PERIOD_TICK_MS).max(1)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!("{} v{} ({})", APP_NAME, APP_VERSION, APP_TYPE);
    tracing::info!("{}", dev_banner());

    // stands in for the file the flashing script puts in the audio partition
    let bytes = tone_bytes();
    let window = audio_file_window(u32::try_from(bytes.len())?)?;
    let file = MappedFlash::new(bytes.leak());
    tracing::info!(
        bytes = file.size(),
        "audio file at {:#010x}..{:#010x} on the device",
        window.start,
        window.end
    );
    let hw = PlayerHardware {
        dac: MockDac::new(),
        clock: MockSampleClock::new(),
        encoder: MockEncoder::new(1000),
        button: MockButton::pressed_after(20),
    };
    let mut backlight = MockBacklight::new();
    let events = TRANSPORT_EVENTS.sender();
    let mut player: Player<'static, BLOCK, _, _, _, _> =
        Player::new(PlayerConfig::default(), &PLAYER_SHARED, events, hw);

    let polls = player.wait_for_click()?;
    tracing::info!(polls, "click, backlight fading in");

    let format = player.load(&file)?;
    tracing::info!(
        rate = format.sample_rate,
        samples = player.controller().total_samples(),
        reload = ?player.hardware().clock.reload(),
        "playing tone"
    );

    let mut blocks = 0u32;
    let mut scrubbed = false;
    while player.state() == PlaybackState::Playing {
        // the block playing now drains while the period timer keeps running
        for _ in 0..period_ticks_per_block() {
            PLAYER_SHARED.on_period_tick(&mut backlight, &events);
        }
        PLAYER_SHARED.on_dma_complete();

        let report = player.poll(&file)?;
        if report.tick == TickOutcome::Swapped {
            blocks += 1;
            tracing::debug!(blocks, progress = report.progress.get(), "block swapped");
        }

        if blocks == 4 && !scrubbed {
            // scrub four detents forward, one per main-loop pass
            for _ in 0..4 {
                player.hardware_mut().encoder.turn(-2);
                let report = player.poll(&file)?;
                debug_assert_eq!(report.movement, Movement::Right);
            }
            scrubbed = true;
        }

        while let Ok(event) = TRANSPORT_EVENTS.try_receive() {
            match event {
                TransportEvent::Scrub { movement, preview } => {
                    tracing::info!(?movement, preview = preview.get(), "scrub");
                }
                TransportEvent::SeekCommitted { target } => {
                    tracing::info!(target = target.get(), "seek committed");
                }
            }
        }
    }

    tracing::info!(
        state = ?player.state(),
        transfers = player.hardware().dac.transfers_started(),
        backlight = platform::BacklightPwm::compare(&backlight),
        settled = PLAYER_SHARED.backlight.is_settled(),
        "done"
    );
    Ok(())
}
