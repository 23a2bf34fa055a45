//! RIFF/WAVE header parsing for uncompressed mono PCM.
//!
//! The parser reads a fixed-offset canonical layout straight out of the
//! memory-mapped file: no copy, no allocation, no side effects.
//!
//! ```text
//! Offset  Size  Field
//!  0      4     "RIFF"
//!  4      4     RIFF chunk size (LE)
//!  8      4     "WAVE"
//! 12      4     "fmt "
//! 16      4     fmt chunk length (LE, 16 for plain PCM)
//! 20      2     format tag (LE, 1 = PCM)
//! 22      2     channel count (LE)
//! 24      4     sample rate (LE)
//! 28      4     byte rate (LE)
//! 32      2     block align (LE)
//! 34      2     bits per sample (LE)
//! 36      ...   "data" id, data size (LE), samples
//! ```
//!
//! When the fmt chunk is longer than 16 bytes, a two-byte extra-format field
//! (which must be zero) sits at 36, followed by a `fact` chunk; the `data`
//! chunk then starts `10 + fact_size` bytes later.

use platform::TimerReload;

/// `"RIFF"` chunk id.
pub const RIFF_ID: [u8; 4] = *b"RIFF";
/// `"WAVE"` form type.
pub const WAVE_ID: [u8; 4] = *b"WAVE";
/// `"fmt "` sub-chunk id.
pub const FMT_ID: [u8; 4] = *b"fmt ";
/// `"fact"` sub-chunk id.
pub const FACT_ID: [u8; 4] = *b"fact";
/// `"data"` sub-chunk id.
pub const DATA_ID: [u8; 4] = *b"data";

/// `WAVE_FORMAT_PCM`
pub const WAVE_FORMAT_PCM: u16 = 1;

/// fmt chunk length of plain PCM (no extra format bytes).
pub const PCM_FMT_CHUNK_LEN: u32 = 16;

/// Size of the canonical 44-byte header (no `fact` chunk).
pub const CANONICAL_HEADER_LEN: usize = 44;

/// Offset of the samples in a canonical header.
pub const CANONICAL_DATA_OFFSET: u32 = 44;

/// Offset where the data (or extra-format) fields start.
const FMT_END: usize = 36;

/// 48 kHz is a common rate but has no sample-clock reload entry; files at
/// this rate are rejected with [`WaveParseError::UnsupportedSampleRate`].
pub const SAMPLE_RATE_48K: u32 = 48_000;

/// Supported sample rates and the TIM6 auto-reload value that produces them.
const RELOAD_TABLE: [(u32, u16); 6] = [
    (8_000, 6000),
    (16_000, 3000),
    (11_025, 4353),
    (22_050, 3628),
    (32_000, 1500),
    (44_100, 1088),
];

/// Sample-clock reload value for `sample_rate`, or `None` if unsupported.
pub fn timer_reload_for(sample_rate: u32) -> Option<u16> {
    RELOAD_TABLE
        .iter()
        .find(|(rate, _)| *rate == sample_rate)
        .map(|&(_, reload)| reload)
}

/// Every supported sample rate, in table order.
pub fn supported_sample_rates() -> impl Iterator<Item = u32> {
    RELOAD_TABLE.iter().map(|&(rate, _)| rate)
}

// ── Profile ──────────────────────────────────────────────────────────────────

/// The one channel count and one bit depth a build of the engine accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct WaveProfile {
    /// Required channel count.
    pub channels: u16,
    /// Required bits per sample.
    pub bits_per_sample: u16,
}

impl WaveProfile {
    /// Mono, 16-bit signed PCM (12-bit DAC path).
    pub const MONO_16: Self = Self {
        channels: 1,
        bits_per_sample: 16,
    };

    /// Mono, 8-bit unsigned PCM (8-bit DAC path).
    pub const MONO_8: Self = Self {
        channels: 1,
        bits_per_sample: 8,
    };
}

impl Default for WaveProfile {
    fn default() -> Self {
        Self::MONO_16
    }
}

// ── Errors ───────────────────────────────────────────────────────────────────

/// Header validation failure. One variant per check, in check order, plus
/// [`Truncated`](WaveParseError::Truncated) for a window that ends early.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WaveParseError {
    /// Bytes 0..4 are not `"RIFF"`.
    #[error("invalid RIFF id")]
    InvalidRiffId,
    /// Bytes 8..12 are not `"WAVE"`.
    #[error("invalid WAVE format id")]
    InvalidWaveFormat,
    /// Bytes 12..16 are not `"fmt "`.
    #[error("invalid fmt chunk id")]
    InvalidFormatChunkId,
    /// Format tag is not PCM.
    #[error("unsupported format tag {tag}")]
    UnsupportedFormatTag {
        /// Tag found in the file.
        tag: u16,
    },
    /// Channel count differs from the profile.
    #[error("unsupported channel count {channels}")]
    UnsupportedChannelCount {
        /// Channel count found in the file.
        channels: u16,
    },
    /// Sample rate has no reload entry.
    #[error("unsupported sample rate {rate} Hz")]
    UnsupportedSampleRate {
        /// Rate found in the file.
        rate: u32,
    },
    /// Bit depth differs from the profile.
    #[error("unsupported bits per sample {bits}")]
    UnsupportedBitsPerSample {
        /// Bit depth found in the file.
        bits: u16,
    },
    /// The chunk at the data cursor is not `"data"`.
    #[error("invalid data chunk id")]
    InvalidDataChunkId,
    /// The extra-format-bytes field is not zero.
    #[error("unsupported extra format bytes value {value}")]
    UnsupportedExtraFormatBytes {
        /// Value found in the file.
        value: u16,
    },
    /// An extended fmt chunk is not followed by `"fact"`.
    #[error("invalid fact chunk id")]
    InvalidFactChunkId,
    /// The byte window ends before a required field.
    #[error("header truncated: {needed} bytes needed")]
    Truncated {
        /// Window length required to read the field.
        needed: usize,
    },
}

// ── WaveFormat ───────────────────────────────────────────────────────────────

/// A validated WAV header. Immutable once parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct WaveFormat {
    /// RIFF chunk size (file size minus 8).
    pub riff_chunk_size: u32,
    /// Format tag, always [`WAVE_FORMAT_PCM`] after parsing.
    pub format_tag: u16,
    /// Channel count.
    pub num_channels: u16,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Bytes per second.
    pub byte_rate: u32,
    /// Bytes per sample frame.
    pub block_align: u16,
    /// Bits per sample.
    pub bits_per_sample: u16,
    /// Number of PCM data bytes claimed by the `data` chunk.
    pub data_size: u32,
    /// Offset of the first PCM byte from the start of the file.
    pub data_offset: u32,
}

impl WaveFormat {
    /// Canonical mono PCM header values for `data_size` bytes of samples.
    pub fn canonical(profile: WaveProfile, sample_rate: u32, data_size: u32) -> Self {
        let block_align = profile
            .channels
            .saturating_mul(profile.bits_per_sample / 8);
        Self {
            riff_chunk_size: data_size.saturating_add(36),
            format_tag: WAVE_FORMAT_PCM,
            num_channels: profile.channels,
            sample_rate,
            byte_rate: sample_rate.saturating_mul(u32::from(block_align)),
            block_align,
            bits_per_sample: profile.bits_per_sample,
            data_size,
            data_offset: CANONICAL_DATA_OFFSET,
        }
    }

    /// Bytes of one mono sample.
    pub fn bytes_per_sample(&self) -> u32 {
        u32::from(self.bits_per_sample / 8)
    }

    /// Samples claimed by the header (`data_size / bytes_per_sample`).
    pub fn total_samples(&self) -> u32 {
        self.data_size
            .checked_div(self.bytes_per_sample())
            .unwrap_or(0)
    }

    /// Reload value for the sample clock, if the rate is supported.
    pub fn timer_reload(&self) -> Option<TimerReload> {
        timer_reload_for(self.sample_rate).and_then(|r| TimerReload::new(r).ok())
    }

    /// Serialise the canonical 44-byte header for these values.
    ///
    /// `data_offset` is not written: the canonical layout always puts the
    /// samples at byte 44.
    pub fn to_canonical_header(&self) -> [u8; CANONICAL_HEADER_LEN] {
        let mut out = [0u8; CANONICAL_HEADER_LEN];
        put(&mut out, 0, &RIFF_ID);
        put(&mut out, 4, &self.riff_chunk_size.to_le_bytes());
        put(&mut out, 8, &WAVE_ID);
        put(&mut out, 12, &FMT_ID);
        put(&mut out, 16, &PCM_FMT_CHUNK_LEN.to_le_bytes());
        put(&mut out, 20, &self.format_tag.to_le_bytes());
        put(&mut out, 22, &self.num_channels.to_le_bytes());
        put(&mut out, 24, &self.sample_rate.to_le_bytes());
        put(&mut out, 28, &self.byte_rate.to_le_bytes());
        put(&mut out, 32, &self.block_align.to_le_bytes());
        put(&mut out, 34, &self.bits_per_sample.to_le_bytes());
        put(&mut out, 36, &DATA_ID);
        put(&mut out, 40, &self.data_size.to_le_bytes());
        out
    }
}

fn put(out: &mut [u8], offset: usize, bytes: &[u8]) {
    if let Some(dst) = out.get_mut(offset..offset.saturating_add(bytes.len())) {
        dst.copy_from_slice(bytes);
    }
}

// ── Parsing ──────────────────────────────────────────────────────────────────

/// Parse a mono 16-bit header.
pub fn parse(bytes: &[u8]) -> Result<WaveFormat, WaveParseError> {
    parse_with(bytes, &WaveProfile::default())
}

/// Parse a header, accepting only `profile`'s channel count and bit depth.
///
/// Checks run in a fixed order and the first failure is returned.
pub fn parse_with(bytes: &[u8], profile: &WaveProfile) -> Result<WaveFormat, WaveParseError> {
    if read_id(bytes, 0)? != RIFF_ID {
        return Err(WaveParseError::InvalidRiffId);
    }
    let riff_chunk_size = read_u32(bytes, 4)?;
    if read_id(bytes, 8)? != WAVE_ID {
        return Err(WaveParseError::InvalidWaveFormat);
    }
    if read_id(bytes, 12)? != FMT_ID {
        return Err(WaveParseError::InvalidFormatChunkId);
    }
    let extra_format_bytes = read_u32(bytes, 16)? != PCM_FMT_CHUNK_LEN;

    let format_tag = read_u16(bytes, 20)?;
    if format_tag != WAVE_FORMAT_PCM {
        return Err(WaveParseError::UnsupportedFormatTag { tag: format_tag });
    }
    let num_channels = read_u16(bytes, 22)?;
    if num_channels != profile.channels {
        return Err(WaveParseError::UnsupportedChannelCount {
            channels: num_channels,
        });
    }
    let sample_rate = read_u32(bytes, 24)?;
    if timer_reload_for(sample_rate).is_none() {
        return Err(WaveParseError::UnsupportedSampleRate { rate: sample_rate });
    }
    let byte_rate = read_u32(bytes, 28)?;
    let block_align = read_u16(bytes, 32)?;
    let bits_per_sample = read_u16(bytes, 34)?;
    if bits_per_sample != profile.bits_per_sample {
        return Err(WaveParseError::UnsupportedBitsPerSample {
            bits: bits_per_sample,
        });
    }

    let mut cursor = FMT_END;
    if extra_format_bytes {
        let value = read_u16(bytes, cursor)?;
        if value != 0 {
            return Err(WaveParseError::UnsupportedExtraFormatBytes { value });
        }
        if read_id(bytes, cursor.saturating_add(2))? != FACT_ID {
            return Err(WaveParseError::InvalidFactChunkId);
        }
        let fact_size = read_u32(bytes, cursor.saturating_add(6))?;
        let skip = usize::try_from(fact_size)
            .ok()
            .and_then(|n| n.checked_add(10))
            .ok_or(WaveParseError::Truncated { needed: usize::MAX })?;
        cursor = cursor
            .checked_add(skip)
            .ok_or(WaveParseError::Truncated { needed: usize::MAX })?;
    }

    if read_id(bytes, cursor)? != DATA_ID {
        return Err(WaveParseError::InvalidDataChunkId);
    }
    let data_size = read_u32(bytes, cursor.saturating_add(4))?;
    // the data size read above proves cursor + 8 <= bytes.len()
    let data_offset = u32::try_from(cursor.saturating_add(8))
        .map_err(|_| WaveParseError::Truncated { needed: usize::MAX })?;

    Ok(WaveFormat {
        riff_chunk_size,
        format_tag,
        num_channels,
        sample_rate,
        byte_rate,
        block_align,
        bits_per_sample,
        data_size,
        data_offset,
    })
}

fn read_array<const L: usize>(bytes: &[u8], offset: usize) -> Result<[u8; L], WaveParseError> {
    let end = offset
        .checked_add(L)
        .ok_or(WaveParseError::Truncated { needed: usize::MAX })?;
    bytes
        .get(offset..end)
        .and_then(|s| <[u8; L]>::try_from(s).ok())
        .ok_or(WaveParseError::Truncated { needed: end })
}

/// Chunk ids compare as raw bytes, i.e. big-endian four-character codes.
fn read_id(bytes: &[u8], offset: usize) -> Result<[u8; 4], WaveParseError> {
    read_array::<4>(bytes, offset)
}

fn read_u16(bytes: &[u8], offset: usize) -> Result<u16, WaveParseError> {
    read_array::<2>(bytes, offset).map(u16::from_le_bytes)
}

fn read_u32(bytes: &[u8], offset: usize) -> Result<u32, WaveParseError> {
    read_array::<4>(bytes, offset).map(u32::from_le_bytes)
}

// ── Tests ────────────────────────────────────────────────────────────────────
