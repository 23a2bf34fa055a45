//! QUADSPI memory-mapped flash layout.
//!
//! In memory-mapped mode the QUADSPI controller presents the external NOR
//! flash as a read-only window at [`QSPI_BASE_ADDR`]. The WAV file is
//! programmed at [`partitions::AUDIO_FILE`] by the factory flashing script and
//! played from there in place; it is never copied to RAM.
//!
//! # Partition map (16 MB part)
//!
//! ```text
//! Offset       Size    Contents
//! 0x0000_0000  ~2 MB   GUI assets (bitmaps, fonts)
//! 0x0020_0000  rest    Audio file (one RIFF/WAVE file)
//! ```

/// Base address of the QUADSPI memory-mapped region in the CPU memory map.
pub const QSPI_BASE_ADDR: u32 = 0x9000_0000;

/// Flash size field for `QUADSPI_DCR.FSIZE`.
///
/// Addressable bytes = 2^(`FSIZE` + 1); 16 MB → `FSIZE = 23`.
pub const QSPI_FLASH_SIZE: u8 = 23;

/// Flash capacity in bytes, derived from [`QSPI_FLASH_SIZE`].
pub const QSPI_FLASH_BYTES: u32 = 1 << (QSPI_FLASH_SIZE as u32 + 1);

/// Partition offsets relative to flash start (add [`QSPI_BASE_ADDR`] for the
/// CPU address).
pub mod partitions {
    /// GUI asset partition.
    pub const GUI_ASSETS: u32 = 0x0000_0000;

    /// The audio file.
    pub const AUDIO_FILE: u32 = 0x0020_0000;
}

/// Largest file the audio partition can hold.
pub const AUDIO_FILE_MAX_BYTES: u32 = QSPI_FLASH_BYTES - partitions::AUDIO_FILE;

/// CPU address of a flash offset in memory-mapped mode, or `None` if the
/// offset is outside the flash.
pub fn mapped_address(flash_offset: u32) -> Option<u32> {
    if flash_offset >= QSPI_FLASH_BYTES {
        return None;
    }
    QSPI_BASE_ADDR.checked_add(flash_offset)
}

/// Check that a file of `len` bytes fits in the audio partition.
///
/// # Errors
///
/// Returns the human-readable reason when it does not.
pub fn validate_audio_file_len(len: u32) -> Result<u32, &'static str> {
    if len == 0 {
        return Err("audio partition holds an empty file");
    }
    if len > AUDIO_FILE_MAX_BYTES {
        return Err("audio file is larger than the audio partition");
    }
    Ok(len)
}

/// CPU address range of an audio file of `len` bytes at
/// [`partitions::AUDIO_FILE`].
///
/// # Errors
///
/// The reason from [`validate_audio_file_len`], or an address overflow.
pub fn audio_file_window(len: u32) -> Result<core::ops::Range<u32>, &'static str> {
    let len = validate_audio_file_len(len)?;
    let start = mapped_address(partitions::AUDIO_FILE).ok_or("audio partition outside the flash")?;
    let end = start
        .checked_add(len)
        .ok_or("audio file runs past the address space")?;
    Ok(start..end)
}

// ─── Tests ───────────────────────────────────────────────────────────────────
