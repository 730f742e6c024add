//! # Loader configuration
//!
//! Everything deployment specific lives here: where the kernel is looked for,
//! what to run if it isn't found, where it is loaded and how much headroom the
//! memory map buffer gets.

use crate::PhysicalAddress;
use crate::fallback::FALLBACK_IMAGE;
use log::LevelFilter;

/// Kernel candidate paths on the boot volume, most specific first.
pub const KERNEL_PATHS: &[&str] = &[
    "\\EFI\\WOODIX\\KERNEL.ELF",
    "\\EFI\\BOOT\\WOODKRNL.ELF",
    "\\KERNEL.ELF",
];

/// Physical load address and entry point of the kernel image (1 MiB).
pub const KERNEL_LOAD_ADDRESS: PhysicalAddress = PhysicalAddress::new(0x10_0000);

/// Ten seconds, enough to read the last message before returning to firmware.
pub const FAILURE_STALL_MICROS: usize = 10_000_000;

#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Ordered candidate paths; the first one that opens wins.
    pub kernel_paths: &'static [&'static str],
    /// Dump the volume root when no candidate opens.
    pub list_root_on_miss: bool,
    /// Image used when nothing can be loaded from the volume.
    pub fallback_image: &'static [u8],
    /// Copy destination and entry point.
    pub load_address: PhysicalAddress,
    /// Extra memory descriptors reserved on top of the reported map size.
    pub map_slack_descriptors: usize,
    /// Extra memory descriptors for the single retry after a stale map key.
    pub retry_map_slack_descriptors: usize,
    /// Stall before returning a fatal status to the firmware.
    pub failure_stall_micros: usize,
    pub log_level: LevelFilter,
}

impl LoaderConfig {
    pub const DEFAULT: Self = Self {
        kernel_paths: KERNEL_PATHS,
        list_root_on_miss: true,
        fallback_image: FALLBACK_IMAGE,
        load_address: KERNEL_LOAD_ADDRESS,
        map_slack_descriptors: 32,
        retry_map_slack_descriptors: 64,
        failure_stall_micros: FAILURE_STALL_MICROS,
        log_level: LevelFilter::Debug,
    };

    #[must_use]
    pub const fn with_kernel_paths(mut self, paths: &'static [&'static str]) -> Self {
        self.kernel_paths = paths;
        self
    }

    #[must_use]
    pub const fn with_fallback_image(mut self, image: &'static [u8]) -> Self {
        self.fallback_image = image;
        self
    }

    #[must_use]
    pub const fn with_load_address(mut self, address: PhysicalAddress) -> Self {
        self.load_address = address;
        self
    }

    #[must_use]
    pub const fn with_list_root_on_miss(mut self, enabled: bool) -> Self {
        self.list_root_on_miss = enabled;
        self
    }
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}
