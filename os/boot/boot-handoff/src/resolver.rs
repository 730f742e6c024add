//! # Kernel resolution
//!
//! Finds the kernel on the boot volume. Resolution is total: every failure is
//! logged and answered with the built-in fallback image, so the sequencer always
//! has something to enter.

use crate::LoaderConfig;
use crate::error::ResolveError;
use crate::firmware::{BootMedia, Directory, KernelFile, Volume};
use crate::image::{KernelImage, has_elf_magic};
use alloc::vec::Vec;
use log::{debug, info, warn};

pub struct KernelResolver<'cfg> {
    config: &'cfg LoaderConfig,
}

impl<'cfg> KernelResolver<'cfg> {
    #[must_use]
    pub const fn new(config: &'cfg LoaderConfig) -> Self {
        Self { config }
    }

    /// Resolve the kernel image, falling back to the built-in image on any failure.
    pub fn resolve<M: BootMedia>(&self, media: &mut M) -> KernelImage {
        match self.load_from_volume(media) {
            Ok(image) => image,
            Err(e) => {
                warn!("Kernel not loaded from volume: {e}");
                info!(
                    "Using built-in fallback image ({} bytes)",
                    self.config.fallback_image.len()
                );
                KernelImage::fallback(self.config.fallback_image)
            }
        }
    }

    /// Load the kernel from the first candidate path that opens.
    ///
    /// All handles opened here are dropped (closed) before this returns.
    ///
    /// # Errors
    /// Returns the first failure that makes volume loading impossible.
    pub fn load_from_volume<M: BootMedia>(
        &self,
        media: &mut M,
    ) -> Result<KernelImage, ResolveError> {
        let mut volume = media.boot_volume().map_err(ResolveError::NoVolume)?;
        let mut root = volume.open_root().map_err(ResolveError::NoRootDirectory)?;

        let Some((path, mut file)) = self.open_first(&mut root) else {
            if self.config.list_root_on_miss {
                list_directory(&mut root);
            }
            return Err(ResolveError::NotFound {
                tried: self.config.kernel_paths.len(),
            });
        };

        let bytes = read_all(path, &mut file)?;
        if has_elf_magic(&bytes) {
            info!("Kernel has valid ELF header");
        } else {
            info!("Kernel doesn't have ELF header, assuming flat binary");
        }

        Ok(KernelImage::from_volume(path, bytes))
    }

    fn open_first<D: Directory>(&self, root: &mut D) -> Option<(&'static str, D::File)> {
        for &path in self.config.kernel_paths {
            info!("Attempting to open kernel at {path}");
            match root.open_read_only(path) {
                Ok(file) => return Some((path, file)),
                Err(e) => debug!("{path}: {e}"),
            }
        }
        None
    }
}

fn read_all<F: KernelFile>(path: &'static str, file: &mut F) -> Result<Vec<u8>, ResolveError> {
    let size = file
        .size()
        .map_err(|source| ResolveError::Size { path, source })?;
    if size == 0 {
        return Err(ResolveError::Empty { path });
    }

    let Ok(len) = usize::try_from(size) else {
        return Err(ResolveError::TooLarge { path, size });
    };

    let mut buf = Vec::new();
    if buf.try_reserve_exact(len).is_err() {
        return Err(ResolveError::Allocation { path, size: len });
    }
    buf.resize(len, 0);

    let mut filled = 0;
    while filled < len {
        let read = file
            .read(&mut buf[filled..])
            .map_err(|source| ResolveError::Read { path, source })?;
        if read == 0 {
            return Err(ResolveError::ShortRead {
                path,
                read: filled,
                expected: len,
            });
        }
        filled += read;
    }

    debug!("Read {len} bytes from {path}");
    Ok(buf)
}

fn list_directory<D: Directory>(root: &mut D) {
    match root.entry_names() {
        Ok(names) => {
            info!("Volume root has {} entries:", names.len());
            for name in names {
                info!("  {name}");
            }
        }
        Err(e) => warn!("Unable to list volume root: {e}"),
    }
}
