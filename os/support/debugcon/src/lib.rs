//! # QEMU / OVMF Debug Console
//!
//! Byte-wise output to the firmware debug port. Works before, during and after
//! `ExitBootServices` because it is plain port I/O: no allocation, no firmware
//! call. That makes it the only diagnostic channel left once the loader has
//! torn down boot services.
//!
//! Capture on the host with:
//!
//! ```bash
//! qemu-system-x86_64 ... -debugcon stdio -global isa-debugcon.iobase=0x402
//! ```
//!
//! With the `enabled` feature off, [`debugcon_trace!`] compiles to nothing.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

/// OVMF's debug port; QEMU's `isa-debugcon` default is `0xe9`.
pub const DEBUGCON_PORT: u16 = 0x402;

#[cfg(feature = "enabled")]
#[doc(hidden)]
pub mod sink {
    use super::DEBUGCON_PORT;
    use core::fmt::{self, Write};

    /// Write a single byte to the debug port.
    #[allow(clippy::inline_always)]
    #[inline(always)]
    pub fn putc(c: u8) {
        #[cfg(target_arch = "x86_64")]
        unsafe {
            core::arch::asm!(
                "out dx, al",
                in("dx") DEBUGCON_PORT,
                in("al") c,
                options(nomem, nostack, preserves_flags)
            );
        }
        #[cfg(not(target_arch = "x86_64"))]
        let _ = (DEBUGCON_PORT, c);
    }

    pub struct DebugconSink;

    impl Write for DebugconSink {
        #[inline]
        fn write_str(&mut self, s: &str) -> fmt::Result {
            s.bytes().for_each(putc);
            Ok(())
        }
    }

    #[inline]
    pub fn write(args: fmt::Arguments) {
        // Best effort; the port cannot fail.
        let _ = fmt::write(&mut DebugconSink, args);
    }
}

#[cfg(not(feature = "enabled"))]
#[doc(hidden)]
pub mod sink {
    use core::fmt;

    #[inline(always)]
    #[allow(clippy::inline_always)]
    pub fn write(_: fmt::Arguments) {}
}

/// `format!`-style output to the debug console.
#[macro_export]
macro_rules! debugcon_trace {
    ($($arg:tt)*) => {{
        $crate::sink::write(core::format_args!($($arg)*));
    }};
}
