//! Roendi Player firmware
//!
//! WAV player application for the round-display STM32 board: the main loop
//! that streams a file from QSPI flash through the DAC, the rotary encoder
//! scrub control and the backlight fade.
//!
//! # Architecture
//!
//! This firmware follows a layered architecture:
//!
//! ```text
//! Application Layer (player, transport, backlight)
//!         ↓
//! Playback engine (playback crate)
//!         ↓
//! Platform HAL (platform crate traits)
//!         ↓
//! STM32 peripherals (DAC, DMA, TIM6, TIM7, LPTIM1, QUADSPI)
//! ```
//!
//! # Features
//!
//! - `hardware` - Build for the STM32 target (defmt logging)
//! - `emulator` - Build the desktop emulator (tracing, host critical-section)
//! - `std` - Enable standard library (for emulator and testing)
//!
//! # Examples
//!
//! ## Emulator Target
//!
//! ```bash
//! RUST_LOG=info cargo run -p firmware --example wav_emulator --features emulator
//! ```

#![cfg_attr(all(not(test), not(feature = "std")), no_std)]
// Upgrade relevant warns to deny; keep pedantic as warn (too noisy for firmware)
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(unsafe_op_in_unsafe_fn)]
// Logging discipline
#![warn(clippy::print_stdout)] // prefer tracing/defmt over println! in lib code
#![warn(clippy::dbg_macro)]
// Intentional allows for this codebase:
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)] // most errors are self-explanatory
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)]

pub mod backlight;
pub mod player;
pub mod transport;

// Re-export key types
pub use backlight::{BacklightConfig, BacklightRamp};
pub use player::{
    PeriodReport, Player, PlayerConfig, PlayerError, PlayerHardware, PlayerShared, PollReport,
    PLAYER_SHARED,
};
pub use transport::{
    EncoderDelta, EncoderTracker, ScrubState, Transport, TransportChannel, TransportConfig,
    TransportEvent, TransportReceiver, TransportSender, TRANSPORT_EVENTS,
};
