//! Hardware Abstraction Layer (HAL) for the Roendi WAV player
//!
//! This crate provides trait-based abstractions for the hardware the
//! playback path touches, enabling development and testing without the
//! board.
//!
//! # Architecture Layers
//!
//! ```text
//! Application Layer (firmware crate)
//!         ↓
//! Playback engine (playback crate)
//!         ↓
//! Platform HAL (this crate - trait abstractions)
//!         ↓
//! Hardware Layer (STM32L4 HAL: DAC, DMA, TIM6, LPTIM1, QUADSPI)
//! ```
//!
//! # Abstractions
//!
//! - [`DacDma`] - DAC channel fed by a one-shot DMA transfer
//! - [`SampleClock`] - basic timer pacing DAC conversions
//! - [`ByteSource`] - read-only, memory-mapped file bytes
//! - [`EncoderCounter`] / [`ClickButton`] - rotary encoder input
//! - [`BacklightPwm`] - display backlight duty cycle
//! - [`CompletionFlag`] - interrupt → main loop "transfer complete" signal
//!
//! # Features
//!
//! - `std`: Enable standard library support and [`mocks`] (for testing)
//! - `hardware`: Physical hardware implementations
//! - `defmt`: Enable defmt logging
//!
//! # Example
//!
//! ```no_run
//! use platform::{CompletionFlag, DacAlignment, DacDma};
//!
//! fn play<D: DacDma>(dac: &mut D, block: &[u16], done: &CompletionFlag) {
//!     if dac.start_transfer(block, DacAlignment::Right12).is_ok()
//!         && done.wait(platform::dma::DMA_WAIT_SPIN_LIMIT).is_ok()
//!     {
//!         done.clear();
//!     }
//! }
//! ```

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)] // no .unwrap() in production code
#![deny(clippy::expect_used)] // no .expect() in production code
#![deny(clippy::panic)] // no panic!() in production code
#![deny(clippy::unreachable)] // no unreachable!() that isn't documented
#![deny(unused_must_use)]
// all Results must be handled
// ────────────────────────────────────────────────────────────────────────────
#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(unsafe_op_in_unsafe_fn)] // unsafe fn body is not implicitly unsafe block
#![warn(clippy::print_stdout)] // prefer tracing/defmt over println! in lib code
// Pedantic lints suppressed for this hardware HAL crate:
#![allow(clippy::doc_markdown)] // hex addresses and register names in doc comments
#![allow(clippy::must_use_candidate)] // hardware accessors: callers decide
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod audio;
pub mod audio_types;
pub mod config;
pub mod dma;
pub mod input;
pub mod qspi_config;
pub mod storage;

#[cfg(any(test, feature = "std"))]
pub mod mocks;

// Re-export main high-level traits
pub use audio::{BacklightPwm, DacAlignment, DacDma, SampleClock};
pub use input::{ClickButton, EncoderCounter, Movement};
pub use storage::{ByteSource, MappedFlash};

// Re-export DMA signalling
pub use dma::{CompletionFlag, WaitTimeout};

// Re-export domain newtypes
pub use audio_types::{OutOfRangeError, ProgressPercent, TimerReload};
