//! Pool buffers and the kernel load region.

use boot_handoff::{FirmwareError, PhysicalAddress};
use core::ptr::NonNull;
use log::{debug, warn};
use uefi::boot::{self, AllocateType, MemoryType, PAGE_SIZE};

/// A `LOADER_DATA` pool allocation, returned to the pool on drop.
///
/// Must not be dropped after `ExitBootServices`; leak it with
/// [`core::mem::forget`] instead.
pub struct PoolBuffer {
    ptr: NonNull<u8>,
    len: usize,
}

impl PoolBuffer {
    /// # Errors
    /// Fails with the firmware status when the pool is exhausted.
    pub fn allocate(len: usize) -> Result<Self, FirmwareError> {
        let ptr = boot::allocate_pool(MemoryType::LOADER_DATA, len.max(1))
            .map_err(|e| FirmwareError(e.status()))?;
        Ok(Self { ptr, len })
    }
}

impl AsRef<[u8]> for PoolBuffer {
    fn as_ref(&self) -> &[u8] {
        // SAFETY: `ptr` came from `allocate_pool` with at least `len` bytes.
        unsafe { core::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }
}

impl AsMut<[u8]> for PoolBuffer {
    fn as_mut(&mut self) -> &mut [u8] {
        // SAFETY: as above; `&mut self` guarantees exclusivity.
        unsafe { core::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

impl Drop for PoolBuffer {
    fn drop(&mut self) {
        // SAFETY: `ptr` was returned by `allocate_pool` and is freed once.
        let _ = unsafe { boot::free_pool(self.ptr) };
    }
}

/// Make `len` bytes at `base` writable for the kernel copy.
///
/// The pages are reserved as `LOADER_CODE` so the firmware does not hand them
/// out again. If the firmware refuses (the range is already in use), the copy
/// goes to `base` regardless; the kernel is linked for exactly that address.
pub fn claim_load_region(base: PhysicalAddress, len: usize) -> &'static mut [u8] {
    let pages = len.div_ceil(PAGE_SIZE);
    match boot::allocate_pages(
        AllocateType::Address(base.as_u64()),
        MemoryType::LOADER_CODE,
        pages,
    ) {
        Ok(_) => debug!("Reserved {pages} pages at {base}"),
        Err(e) => warn!(
            "Unable to reserve {pages} pages at {base} ({:?}), writing there anyway",
            e.status()
        ),
    }

    // SAFETY: UEFI identity-maps all memory; the range is either reserved for
    // us above or, by contract with the kernel link address, free to overwrite.
    unsafe { core::slice::from_raw_parts_mut(base.as_mut_ptr(), len) }
}
