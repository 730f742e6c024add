//! # Firmware capabilities
//!
//! The loader never talks to UEFI directly. The resolver needs read-only access
//! to the boot volume ([`BootMedia`] → [`Volume`] → [`Directory`] → [`KernelFile`]),
//! the sequencer needs memory and the exit call ([`BootServices`]).
//!
//! Handles close on drop, so every handle opened while resolving the kernel is
//! released by the time the resolver returns.
//!
//! Console output is not part of these traits; diagnostics go through the `log`
//! facade and the installed logger decides where they end up.

use crate::{FirmwareError, PhysicalAddress};
use alloc::string::String;
use alloc::vec::Vec;
use uefi::Status;

/// Access to the volume the loader image was started from.
pub trait BootMedia {
    type Volume: Volume;

    /// Locate the simple file system of the device the running image was loaded from.
    ///
    /// # Errors
    /// Fails if the image has no device or the device carries no file system.
    fn boot_volume(&mut self) -> Result<Self::Volume, FirmwareError>;
}

/// An opened file system protocol.
pub trait Volume {
    type Root: Directory;

    /// Open the root directory of the volume.
    ///
    /// # Errors
    /// Fails if the volume cannot be opened (e.g. media changed or corrupt).
    fn open_root(&mut self) -> Result<Self::Root, FirmwareError>;
}

/// A directory on the boot volume.
pub trait Directory {
    type File: KernelFile;

    /// Open a regular file read-only. `path` uses `\` separators.
    ///
    /// # Errors
    /// Fails if the path does not exist or does not name a regular file.
    fn open_read_only(&mut self, path: &str) -> Result<Self::File, FirmwareError>;

    /// File names of all entries in this directory, for diagnostics.
    ///
    /// # Errors
    /// Fails if the directory cannot be enumerated.
    fn entry_names(&mut self) -> Result<Vec<String>, FirmwareError>;
}

/// An open, read-only regular file.
pub trait KernelFile {
    /// File size in bytes, from the file's metadata.
    ///
    /// # Errors
    /// Fails if the file info cannot be obtained.
    fn size(&mut self) -> Result<u64, FirmwareError>;

    /// Read from the current position into `buf`, returning the byte count.
    ///
    /// # Errors
    /// Fails on device errors.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, FirmwareError>;
}

/// Opaque token identifying one particular memory map snapshot.
///
/// Only the key of the most recent snapshot is accepted by
/// [`BootServices::exit_boot_services`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct MapKey(pub usize);

/// Result of asking the firmware how large the memory map is.
///
/// The query passes an empty buffer; a well-behaved firmware answers with
/// [`Status::BUFFER_TOO_SMALL`] and fills in the sizes.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct MapSizeProbe {
    pub status: Status,
    /// Required buffer size in bytes.
    pub map_size: usize,
    /// Size of one memory descriptor in bytes.
    pub desc_size: usize,
}

/// Metadata of a memory map written into a caller buffer.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct MemoryMapSnapshot {
    pub key: MapKey,
    pub map_size: usize,
    pub desc_size: usize,
    pub desc_version: u32,
}

/// Boot services used by the handoff.
pub trait BootServices {
    /// Pool allocation. Freed on drop unless leaked.
    type Buffer: AsRef<[u8]> + AsMut<[u8]>;
    /// Writable view of the kernel load region.
    type Region: AsMut<[u8]>;

    /// Claim `len` bytes of physical memory at `base` for the kernel.
    ///
    /// # Errors
    /// Fails if the region cannot be made writable.
    fn claim_load_region(
        &mut self,
        base: PhysicalAddress,
        len: usize,
    ) -> Result<Self::Region, FirmwareError>;

    /// Allocate `len` bytes of loader data from the pool.
    ///
    /// Every allocation may change the memory map and invalidate any
    /// previously fetched [`MapKey`].
    ///
    /// # Errors
    /// Fails when the pool is exhausted.
    fn allocate_pool(&mut self, len: usize) -> Result<Self::Buffer, FirmwareError>;

    /// `GetMemoryMap` with a zero-sized buffer.
    fn query_memory_map_size(&mut self) -> MapSizeProbe;

    /// `GetMemoryMap` into `buf`.
    ///
    /// # Errors
    /// Fails if `buf` is too small or the firmware reports an error.
    fn fetch_memory_map(&mut self, buf: &mut [u8]) -> Result<MemoryMapSnapshot, FirmwareError>;

    /// `ExitBootServices` for the running image.
    ///
    /// # Errors
    /// Fails with `INVALID_PARAMETER` if `key` is not the current map key.
    fn exit_boot_services(&mut self, key: MapKey) -> Result<(), FirmwareError>;

    /// Stop writing to the firmware console.
    ///
    /// Called once the map buffer is allocated, before the first
    /// `ExitBootServices` attempt. After a failed attempt only memory services
    /// may be used, so the console stays released across the retry.
    fn release_console(&mut self);

    /// Hand the console back after the handoff failed with boot services alive.
    fn restore_console(&mut self);

    /// Busy-wait for the given number of microseconds.
    fn stall(&mut self, micros: usize);
}
