//! PCM sample → DAC code conversion.
//!
//! Two build variants exist:
//!
//! - 16-bit signed PCM into the 12-bit right-aligned DAC register: drop the
//!   low four bits and re-centre on mid-scale. No rounding, no dither.
//! - 8-bit PCM into the 8-bit right-aligned register. WAV stores 8-bit
//!   samples unsigned, so the default is a straight copy; flipping the sign
//!   bit is kept as an option for sources that were written signed.

use platform::DacAlignment;

use crate::wav::WaveProfile;

/// Mid-scale code of the 12-bit DAC.
pub const DAC12_MIDSCALE: i32 = 2047;

/// Mask of a 12-bit DAC code.
pub const DAC12_MASK: u16 = 0x0FFF;

/// Convert one 16-bit signed sample to a 12-bit DAC code.
///
/// `(sample >> 4) + 2047`, masked to 12 bits. The sixteen most negative
/// inputs would land on -1 and wrap to 4095 under the mask, so the sum is
/// saturated at 0 first; the mapping stays monotonic.
#[allow(clippy::arithmetic_side_effects)] // Safety: i16 >> 4 is in -2048..=2047; + 2047 fits i32
pub fn convert_pcm16(sample: i16) -> u16 {
    let centred = i32::from(sample >> 4) + DAC12_MIDSCALE;
    u16::try_from(centred.max(0)).unwrap_or(0) & DAC12_MASK
}

/// How an 8-bit sample is mapped onto the 8-bit DAC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SignPolicy {
    /// Copy the byte as-is (WAV 8-bit PCM is unsigned).
    #[default]
    PassThrough,
    /// XOR the sign bit (`^ 0x80`), for signed 8-bit sources.
    ToggleSignBit,
}

/// Convert one 8-bit sample to an 8-bit DAC code.
pub fn convert_pcm8(sample: u8, policy: SignPolicy) -> u16 {
    match policy {
        SignPolicy::PassThrough => u16::from(sample),
        SignPolicy::ToggleSignBit => u16::from(sample ^ 0x80),
    }
}

/// Sample layout of the file and the matching DAC path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SampleFormat {
    /// 16-bit signed little-endian PCM → 12-bit DAC.
    #[default]
    Pcm16Dac12,
    /// 8-bit PCM → 8-bit DAC.
    Pcm8Dac8 {
        /// Sign conversion applied to each byte.
        sign: SignPolicy,
    },
}

impl SampleFormat {
    /// Bytes of one mono sample in the file.
    pub const fn bytes_per_sample(self) -> usize {
        match self {
            Self::Pcm16Dac12 => 2,
            Self::Pcm8Dac8 { .. } => 1,
        }
    }

    /// Bits per sample the header must declare.
    pub const fn bits_per_sample(self) -> u16 {
        match self {
            Self::Pcm16Dac12 => 16,
            Self::Pcm8Dac8 { .. } => 8,
        }
    }

    /// DAC register alignment for this path.
    pub const fn alignment(self) -> DacAlignment {
        match self {
            Self::Pcm16Dac12 => DacAlignment::Right12,
            Self::Pcm8Dac8 { .. } => DacAlignment::Right8,
        }
    }

    /// Header profile accepted by this path.
    pub const fn profile(self) -> WaveProfile {
        match self {
            Self::Pcm16Dac12 => WaveProfile::MONO_16,
            Self::Pcm8Dac8 { .. } => WaveProfile::MONO_8,
        }
    }

    /// Convert the little-endian sample run in `src` into `dst`.
    ///
    /// Converts `min(src.len() / bytes_per_sample, dst.len())` samples and
    /// returns that count. A trailing partial sample is ignored.
    pub fn encode_block(self, src: &[u8], dst: &mut [u16]) -> usize {
        match self {
            Self::Pcm16Dac12 => {
                let mut n: usize = 0;
                for (out, raw) in dst.iter_mut().zip(src.chunks_exact(2)) {
                    let sample = i16::from_le_bytes([
                        raw.first().copied().unwrap_or(0),
                        raw.get(1).copied().unwrap_or(0),
                    ]);
                    *out = convert_pcm16(sample);
                    n = n.saturating_add(1);
                }
                n
            }
            Self::Pcm8Dac8 { sign } => {
                let mut n: usize = 0;
                for (out, &raw) in dst.iter_mut().zip(src) {
                    *out = convert_pcm8(raw, sign);
                    n = n.saturating_add(1);
                }
                n
            }
        }
    }
}
