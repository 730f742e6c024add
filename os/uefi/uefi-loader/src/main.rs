//! # Woodix UEFI Loader
//!
//! Second-stage loader for Woodix. It runs as a UEFI application, finds the
//! kernel on the boot volume, copies it to 1 MiB, leaves boot services and
//! calls the image in 64-bit mode with a GDT of its own.
//!
//! ```text
//! UEFI Firmware Boot
//!         ↓
//! ┌─────────────────────────────────────────────┐
//! │              Woodix Loader                  │
//! ├─────────────────────────────────────────────┤
//! │  1. Environment Setup                       │
//! │     • Allocator, logger, console banner     │
//! │  2. Kernel Resolution                       │
//! │     • \EFI\WOODIX\KERNEL.ELF                │
//! │     • \EFI\BOOT\WOODKRNL.ELF                │
//! │     • \KERNEL.ELF                           │
//! │     • built-in fallback image               │
//! │  3. Handoff                                 │
//! │     • Flat copy to 0x10_0000                │
//! │     • Build GDT (null, code, data)          │
//! │     • Memory map + ExitBootServices         │
//! │  4. Kernel Entry                            │
//! │     • lgdt, reload selectors, far return    │
//! │     • call 0x10_0000                        │
//! └─────────────────────────────────────────────┘
//!         ↓
//! Kernel (or the fallback "OK" marker)
//! ```
//!
//! ## Failure behavior
//! The kernel lookup cannot fail; a missing or unreadable kernel is replaced by
//! the fallback image. Handoff failures before `ExitBootServices` succeeded are
//! reported on the console, followed by a ten second stall, and the status is
//! returned to the firmware. After `ExitBootServices` only the debug console
//! (`-debugcon`) still receives output.
//!
//! ## Debugging
//! Build with the default `qemu` feature and run QEMU with
//! `-debugcon stdio -global isa-debugcon.iobase=0x402` to follow the log even
//! past the point where the UEFI console is gone.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![no_main]
#![allow(unsafe_code)]
extern crate alloc;

mod file_system;
mod firmware;
mod logger;
mod memory;
mod uefi_mmap;

use crate::firmware::UefiFirmware;
use crate::logger::UefiLogger;
use boot_handoff::firmware::BootServices;
use boot_handoff::{HandoffSequencer, KernelResolver, LoaderConfig};
use debugcon::debugcon_trace;
use log::{error, info};
use uefi::prelude::*;

#[entry]
fn efi_main() -> Status {
    // Initialize allocator helpers
    if uefi::helpers::init().is_err() {
        return Status::UNSUPPORTED;
    }

    let config = LoaderConfig::DEFAULT;
    let Ok(logger) = UefiLogger::init(config.log_level) else {
        return Status::ABORTED;
    };

    let _ = uefi::system::with_stdout(|stdout| stdout.clear());
    info!("Woodix Bootloader");
    info!("Loading Woodix OS...");

    let mut firmware = UefiFirmware::new(logger);

    let image = KernelResolver::new(&config).resolve(&mut firmware);

    match HandoffSequencer::new(&config).handoff(&mut firmware, image) {
        Ok(launch) => {
            // Boot services are gone. Only the debug port is safe from here on.
            debugcon_trace!(
                "Boot services exited, entering image at {}\n",
                launch.entry()
            );

            // SAFETY: the sequencer copied the image to the load address and
            // exited boot services; nothing below touches the firmware.
            unsafe { launch.enter() }
        }
        Err(e) => {
            error!("Failed to hand off to the kernel: {e}");
            firmware.stall(config.failure_stall_micros);
            e.into()
        }
    }
}
