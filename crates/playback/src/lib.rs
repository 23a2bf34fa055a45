//! WAV playback engine: header parsing, DAC code conversion, ping-pong DMA
//! streaming and seek-while-playing
#![cfg_attr(not(test), no_std)]
#![deny(clippy::unwrap_used)]

pub mod codec;
pub mod controller;
pub mod ping_pong;
pub mod seek;
pub mod wav;

pub use codec::{SampleFormat, SignPolicy};
pub use controller::{
    ControllerConfig, PlaybackController, PlaybackError, PlaybackSession, PlaybackState,
    TickOutcome,
};
pub use ping_pong::{BufferId, PingPong, StreamError, StreamerState};
pub use seek::{PlaybackSignals, SeekMailbox};
pub use wav::{WaveFormat, WaveParseError, WaveProfile};
