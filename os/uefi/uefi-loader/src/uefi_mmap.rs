//! # Memory map and `ExitBootServices`
//!
//! The `uefi` crate's own `exit_boot_services` runs its own map/retry loop and
//! hides the map key. The handoff needs to control exactly which snapshot's
//! key is passed, so these go straight through the raw boot services table.

use boot_handoff::FirmwareError;
use boot_handoff::firmware::{MapKey, MapSizeProbe, MemoryMapSnapshot};
use core::ptr::{self, NonNull};
use uefi::{Status, boot};
use uefi_raw::table::boot::{BootServices, MemoryDescriptor};

/// The firmware's boot services table.
fn boot_services() -> Result<NonNull<BootServices>, FirmwareError> {
    let st = uefi::table::system_table_raw().ok_or(FirmwareError(Status::UNSUPPORTED))?;
    // SAFETY: the system table pointer is valid while the image runs.
    let bs = unsafe { st.as_ref().boot_services };
    NonNull::new(bs).ok_or(FirmwareError(Status::UNSUPPORTED))
}

/// `GetMemoryMap` with a null buffer of size zero.
pub fn query_size() -> MapSizeProbe {
    let mut map_size = 0usize;
    let mut key = 0usize;
    let mut desc_size = 0usize;
    let mut desc_version = 0u32;

    let status = match boot_services() {
        // SAFETY: a null buffer of size zero only reports the required size.
        Ok(bs) => unsafe {
            (bs.as_ref().get_memory_map)(
                &raw mut map_size,
                ptr::null_mut(),
                &raw mut key,
                &raw mut desc_size,
                &raw mut desc_version,
            )
        },
        Err(e) => e.status(),
    };

    MapSizeProbe {
        status,
        map_size,
        desc_size,
    }
}

/// `GetMemoryMap` into `buf`. Performs no allocation.
pub fn fetch(buf: &mut [u8]) -> Result<MemoryMapSnapshot, FirmwareError> {
    let bs = boot_services()?;

    let mut map_size = buf.len();
    let mut key = 0usize;
    let mut desc_size = 0usize;
    let mut desc_version = 0u32;

    // SAFETY: `buf` is a pool allocation (8-byte aligned) of `map_size` bytes.
    let status = unsafe {
        (bs.as_ref().get_memory_map)(
            &raw mut map_size,
            buf.as_mut_ptr().cast::<MemoryDescriptor>(),
            &raw mut key,
            &raw mut desc_size,
            &raw mut desc_version,
        )
    };
    if status.is_error() {
        return Err(FirmwareError(status));
    }

    Ok(MemoryMapSnapshot {
        key: MapKey(key),
        map_size,
        desc_size,
        desc_version,
    })
}

/// `ExitBootServices` for the running image with the given map key.
pub fn exit(key: MapKey) -> Result<(), FirmwareError> {
    let bs = boot_services()?;
    let image = boot::image_handle();

    // SAFETY: on success the firmware is gone; callers must not use boot
    // services afterwards.
    let status = unsafe { (bs.as_ref().exit_boot_services)(image.as_ptr(), key.0) };
    if status.is_error() {
        Err(FirmwareError(status))
    } else {
        Ok(())
    }
}

pub fn stall(micros: usize) {
    if let Ok(bs) = boot_services() {
        // SAFETY: `Stall` has no preconditions while boot services are active.
        let _ = unsafe { (bs.as_ref().stall)(micros) };
    }
}
