//! # Woodix Boot Handoff
//!
//! Firmware-independent core of the Woodix UEFI loader. The crate resolves the
//! kernel image from the boot volume (or substitutes a built-in image) and runs
//! the one-shot handoff that leaves the firmware behind.
//!
//! ```text
//! efi_main
//!    ↓
//! ┌──────────────────────────────────────────────┐
//! │ KernelResolver::resolve          (total)     │
//! │   volume → root → candidate paths → read     │
//! │   any failure ⇒ built-in fallback image      │
//! ├──────────────────────────────────────────────┤
//! │ HandoffSequencer::handoff        (fallible)  │
//! │   1. copy image to 1 MiB, drop buffer        │
//! │   2. build GDT (null, code, data)            │
//! │   3. size query → allocate → zero → fetch    │
//! │   4. ExitBootServices(key)  (one retry)      │
//! ├──────────────────────────────────────────────┤
//! │ Launch::enter                    (unsafe, !) │
//! │   5. lgdt, reload selectors, far return      │
//! │   6. call 0x10_0000                          │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! The firmware is reached only through the traits in [`firmware`], which is
//! what allows the resolver and the sequencer to be exercised on the host
//! against a recording fake.
//!
//! ## Point of no return
//! Once [`HandoffSequencer::handoff`] returns a [`Launch`], boot services are
//! gone. The caller must not log to the console, allocate, or call into the
//! firmware again; the only sensible thing left to do is [`Launch::enter`].

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]
extern crate alloc;

mod address;
pub mod config;
pub mod error;
pub mod fallback;
pub mod firmware;
pub mod gdt;
pub mod image;
pub mod resolver;
pub mod sequencer;
mod transition;

pub use address::PhysicalAddress;
pub use config::LoaderConfig;
pub use error::{FirmwareError, HandoffError, ResolveError};
pub use image::{ImageSource, KernelImage};
pub use resolver::KernelResolver;
pub use sequencer::{HandoffSequencer, Launch};
