//! Read-only byte source for audio files.
//!
//! On the device the WAV file is read straight out of QSPI flash in
//! memory-mapped mode, so "reading" is a slice borrow. Nothing in the
//! playback path ever writes the source.

/// A read-only, randomly addressable byte range holding one file.
pub trait ByteSource {
    /// The whole file, `[file_start, file_end)`.
    fn bytes(&self) -> &[u8];

    /// File size in bytes.
    fn size(&self) -> usize {
        self.bytes().len()
    }
}

impl ByteSource for [u8] {
    fn bytes(&self) -> &[u8] {
        self
    }
}

impl<const N: usize> ByteSource for [u8; N] {
    fn bytes(&self) -> &[u8] {
        self
    }
}

impl ByteSource for &[u8] {
    fn bytes(&self) -> &[u8] {
        self
    }
}

/// A file window inside the memory-mapped QSPI flash.
#[derive(Debug, Clone, Copy)]
pub struct MappedFlash {
    data: &'static [u8],
}

impl MappedFlash {
    /// Wrap an existing `'static` slice (host tests, `include_bytes!`).
    pub const fn new(data: &'static [u8]) -> Self {
        Self { data }
    }

    /// Build the window from a CPU address and length.
    ///
    /// # Safety
    ///
    /// `[addr, addr + len)` must lie inside the memory-mapped flash window
    /// (see [`crate::qspi_config`]), memory-mapped mode must already be
    /// enabled, and nothing may program or erase that range while the
    /// returned value is alive.
    #[cfg(feature = "hardware")]
    pub unsafe fn from_raw(addr: usize, len: usize) -> Self {
        // SAFETY: the caller guarantees the range is mapped, readable and
        // immutable for 'static (see the function contract above).
        let data = unsafe { core::slice::from_raw_parts(addr as *const u8, len) };
        Self { data }
    }
}

#[cfg(feature = "hardware")]
impl MappedFlash {
    /// The audio file partition holding a file of `len` bytes.
    ///
    /// # Errors
    ///
    /// Returns the reason when `len` does not fit the partition.
    ///
    /// # Safety
    ///
    /// Same contract as [`MappedFlash::from_raw`] for the audio partition.
    pub unsafe fn audio_file(len: u32) -> Result<Self, &'static str> {
        let window = crate::qspi_config::audio_file_window(len)?;
        let addr = usize::try_from(window.start).map_err(|_| "address does not fit usize")?;
        let len = usize::try_from(len).map_err(|_| "length does not fit usize")?;
        // SAFETY: the window lies inside the mapped flash; the caller upholds
        // the rest of the `from_raw` contract.
        Ok(unsafe { Self::from_raw(addr, len) })
    }
}

impl ByteSource for MappedFlash {
    fn bytes(&self) -> &[u8] {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static FILE: [u8; 4] = *b"RIFF";

    #[test]
    fn mapped_flash_exposes_whole_window() {
        let flash = MappedFlash::new(&FILE);
        assert_eq!(flash.bytes(), b"RIFF");
        assert_eq!(flash.size(), 4);
    }

    #[test]
    fn arrays_and_slices_are_sources() {
        let arr = [1u8, 2, 3];
        assert_eq!(arr.size(), 3);
        let slice: &[u8] = &arr[..2];
        assert_eq!(ByteSource::bytes(&slice), &[1, 2]);
    }
}
