//! `uefi` crate backing of the handoff capabilities.

use crate::logger::UefiLogger;
use crate::memory::{PoolBuffer, claim_load_region};
use crate::uefi_mmap;
use boot_handoff::firmware::{BootServices, MapKey, MapSizeProbe, MemoryMapSnapshot};
use boot_handoff::{FirmwareError, PhysicalAddress};
use core::fmt::Debug;

/// The running image's view of the firmware.
pub struct UefiFirmware {
    logger: &'static UefiLogger,
}

impl UefiFirmware {
    #[must_use]
    pub const fn new(logger: &'static UefiLogger) -> Self {
        Self { logger }
    }
}

/// Map a `uefi` crate error to the status it carries.
pub fn status<T: Debug>(e: uefi::Error<T>) -> FirmwareError {
    FirmwareError(e.status())
}

impl BootServices for UefiFirmware {
    type Buffer = PoolBuffer;
    type Region = &'static mut [u8];

    fn claim_load_region(
        &mut self,
        base: PhysicalAddress,
        len: usize,
    ) -> Result<Self::Region, FirmwareError> {
        Ok(claim_load_region(base, len))
    }

    fn allocate_pool(&mut self, len: usize) -> Result<PoolBuffer, FirmwareError> {
        PoolBuffer::allocate(len)
    }

    fn query_memory_map_size(&mut self) -> MapSizeProbe {
        uefi_mmap::query_size()
    }

    fn fetch_memory_map(&mut self, buf: &mut [u8]) -> Result<MemoryMapSnapshot, FirmwareError> {
        uefi_mmap::fetch(buf)
    }

    fn exit_boot_services(&mut self, key: MapKey) -> Result<(), FirmwareError> {
        uefi_mmap::exit(key)
    }

    fn release_console(&mut self) {
        // Records keep flowing to the debug port.
        self.logger.detach_console();
    }

    fn restore_console(&mut self) {
        self.logger.attach_console();
    }

    fn stall(&mut self, micros: usize) {
        uefi_mmap::stall(micros);
    }
}
