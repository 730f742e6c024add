//! # Handoff sequencing
//!
//! Strictly ordered; the numbers match the crate-level overview:
//!
//! 1. Copy the image to the load address, then drop the source buffer.
//! 2. Point the launch at the static descriptor table.
//! 3. Size query (must answer `BUFFER_TOO_SMALL`), allocate with slack, zero, fetch.
//! 4. `ExitBootServices` with the key of that fetch. On failure, re-acquire the
//!    map once with more slack and try again.
//!
//! Between a fetch and its exit call nothing else happens: no logging, no
//! allocation, no firmware call. Any of those could change the map and make the
//! key stale. Allocations needed for a retry are made *before* its fetch.

use crate::error::{FirmwareError, HandoffError};
use crate::firmware::{BootServices, MapSizeProbe};
use crate::gdt::{DescriptorTable, LOADER_GDT};
use crate::image::{ImageSource, KernelImage};
use crate::{LoaderConfig, PhysicalAddress, transition};
use log::{debug, info, warn};
use uefi::Status;

pub struct HandoffSequencer<'cfg> {
    config: &'cfg LoaderConfig,
}

/// Boot services are gone; all that is left is the jump.
///
/// Produced only by a successful [`HandoffSequencer::handoff`].
#[must_use = "boot services are already exited, the loader must enter the image"]
#[derive(Debug)]
pub struct Launch {
    table: &'static DescriptorTable,
    entry: PhysicalAddress,
}

impl Launch {
    #[must_use]
    pub const fn entry(&self) -> PhysicalAddress {
        self.entry
    }

    #[must_use]
    pub const fn descriptor_table(&self) -> &'static DescriptorTable {
        self.table
    }

    /// Install the loader GDT and call the image at the load address.
    ///
    /// # Safety
    /// The image copied by the sequencer must be valid x86-64 code for a flat
    /// entry at the load address. No firmware service may be used after this
    /// value was created, which this call satisfies by never returning.
    pub unsafe fn enter(self) -> ! {
        unsafe { transition::enter_flat_image(self.table, self.entry) }
    }
}

/// Outcome of one fetch + exit attempt.
enum Attempt {
    Exited,
    Stale(FirmwareError),
}

impl<'cfg> HandoffSequencer<'cfg> {
    #[must_use]
    pub const fn new(config: &'cfg LoaderConfig) -> Self {
        Self { config }
    }

    /// Run steps 1 to 4 of the handoff.
    ///
    /// On `Ok`, boot services have been exited. On `Err`, they are still alive
    /// and the caller may report the failure on the console.
    ///
    /// # Errors
    /// Any [`HandoffError`] is fatal for this boot.
    pub fn handoff<B: BootServices>(
        &self,
        firmware: &mut B,
        image: KernelImage,
    ) -> Result<Launch, HandoffError> {
        self.load(firmware, image)?;

        let table = &LOADER_GDT;
        debug!("Descriptor table at {:#x}", { table.pointer().base });

        info!("Kernel copied. Preparing to transfer control...");
        self.exit_boot_services(firmware)?;

        Ok(Launch {
            table,
            entry: self.config.load_address,
        })
    }

    /// Step 1: flat copy to the load address; the source buffer is released on return.
    fn load<B: BootServices>(
        &self,
        firmware: &mut B,
        image: KernelImage,
    ) -> Result<(), HandoffError> {
        let base = self.config.load_address;
        match image.source() {
            ImageSource::Volume { path } => {
                info!("Kernel Loaded! ({} bytes from {path})", image.len());
            }
            ImageSource::Fallback => info!("Fallback image ready ({} bytes)", image.len()),
        }
        info!("Copying kernel to physical address {base}");

        let mut region = firmware
            .claim_load_region(base, image.len())
            .map_err(HandoffError::LoadRegion)?;
        let available = region.as_mut().len();
        let Some(dst) = region.as_mut().get_mut(..image.len()) else {
            return Err(HandoffError::LoadRegionTooSmall {
                required: image.len(),
                available,
            });
        };
        dst.copy_from_slice(image.bytes());
        drop(image);
        Ok(())
    }

    /// Steps 3 and 4.
    ///
    /// The console is released before the first fetch and only handed back
    /// once the handoff has failed for good. Between two exit attempts only
    /// memory services are used.
    fn exit_boot_services<B: BootServices>(&self, firmware: &mut B) -> Result<(), HandoffError> {
        info!("Exiting boot services ...");

        let probe = probe_map_size(firmware)?;
        let size = buffer_size(probe, self.config.map_slack_descriptors)?;
        let buffer = allocate_map(firmware, size)?;

        firmware.release_console();
        let result = self.exit_with_retry(firmware, buffer);
        if result.is_err() {
            firmware.restore_console();
        }
        result
    }

    fn exit_with_retry<B: BootServices>(
        &self,
        firmware: &mut B,
        mut buffer: B::Buffer,
    ) -> Result<(), HandoffError> {
        let first = match snapshot_and_exit(firmware, buffer.as_mut())? {
            Attempt::Exited => {
                core::mem::forget(buffer);
                return Ok(());
            }
            Attempt::Stale(e) => e,
        };

        warn!("ExitBootServices rejected the memory map ({first}), retrying once");
        let probe = firmware.query_memory_map_size();
        if probe.status != Status::BUFFER_TOO_SMALL {
            return Err(HandoffError::RetrySizeStatus {
                first,
                status: probe.status,
            });
        }
        let size = buffer_size(probe, self.config.retry_map_slack_descriptors)?;
        if buffer.as_ref().len() < size {
            drop(buffer);
            buffer = allocate_map(firmware, size)?;
        }

        match snapshot_and_exit(firmware, buffer.as_mut())? {
            Attempt::Exited => {
                // The map buffer now belongs to whoever runs next; never free it.
                core::mem::forget(buffer);
                Ok(())
            }
            Attempt::Stale(retry) => Err(HandoffError::ExitBootServices { first, retry }),
        }
    }
}

fn probe_map_size<B: BootServices>(firmware: &mut B) -> Result<MapSizeProbe, HandoffError> {
    let probe = firmware.query_memory_map_size();
    if probe.status != Status::BUFFER_TOO_SMALL {
        return Err(HandoffError::UnexpectedSizeStatus(probe.status));
    }
    debug!(
        "Memory map needs {} bytes ({} bytes per descriptor)",
        probe.map_size, probe.desc_size
    );
    Ok(probe)
}

fn buffer_size(probe: MapSizeProbe, slack_descriptors: usize) -> Result<usize, HandoffError> {
    slack_descriptors
        .checked_mul(probe.desc_size)
        .and_then(|slack| probe.map_size.checked_add(slack))
        .ok_or(HandoffError::MapSizeOverflow)
}

fn allocate_map<B: BootServices>(
    firmware: &mut B,
    size: usize,
) -> Result<B::Buffer, HandoffError> {
    firmware
        .allocate_pool(size)
        .map_err(|source| HandoffError::MapAllocation { size, source })
}

/// Zero, fetch and exit back to back.
///
/// Nothing may be inserted between `fetch_memory_map` and `exit_boot_services`.
fn snapshot_and_exit<B: BootServices>(
    firmware: &mut B,
    buf: &mut [u8],
) -> Result<Attempt, HandoffError> {
    buf.fill(0);
    let snapshot = firmware
        .fetch_memory_map(buf)
        .map_err(HandoffError::MemoryMap)?;
    Ok(match firmware.exit_boot_services(snapshot.key) {
        Ok(()) => Attempt::Exited,
        Err(e) => Attempt::Stale(e),
    })
}
