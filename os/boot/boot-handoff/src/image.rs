//! # Kernel image buffer

use alloc::borrow::Cow;
use alloc::vec::Vec;
use core::fmt;

/// ELF identification bytes (`\x7fELF`).
pub const ELF_MAGIC: [u8; 4] = [0x7f, b'E', b'L', b'F'];

/// Where a [`KernelImage`] came from.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ImageSource {
    /// Read from the boot volume at the given path.
    Volume { path: &'static str },
    /// The built-in image from [`LoaderConfig::fallback_image`](crate::LoaderConfig).
    Fallback,
}

/// The resolved kernel bytes.
///
/// The image is always treated as a flat executable; its first byte is the
/// entry point once copied to the load address.
pub struct KernelImage {
    bytes: Cow<'static, [u8]>,
    source: ImageSource,
}

impl KernelImage {
    #[must_use]
    pub fn from_volume(path: &'static str, bytes: Vec<u8>) -> Self {
        Self {
            bytes: Cow::Owned(bytes),
            source: ImageSource::Volume { path },
        }
    }

    #[must_use]
    pub const fn fallback(bytes: &'static [u8]) -> Self {
        Self {
            bytes: Cow::Borrowed(bytes),
            source: ImageSource::Fallback,
        }
    }

    #[inline]
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    #[inline]
    #[must_use]
    pub const fn source(&self) -> ImageSource {
        self.source
    }

    #[inline]
    #[must_use]
    pub fn has_elf_magic(&self) -> bool {
        has_elf_magic(&self.bytes)
    }
}

impl fmt::Debug for KernelImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KernelImage")
            .field("source", &self.source)
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

/// Sniff the ELF identification bytes. Purely informational.
#[inline]
#[must_use]
pub fn has_elf_magic(bytes: &[u8]) -> bool {
    bytes.starts_with(&ELF_MAGIC)
}
