//! # Handoff Global Descriptor Table
//!
//! UEFI leaves the CPU in long mode with a firmware-owned GDT that stops being
//! ours to rely on after `ExitBootServices`. Before entering the kernel the
//! loader installs its own minimal table:
//!
//! Index | Selector | Meaning
//! ------|----------|--------
//! 0     | 0x00     | Null
//! 1     | 0x08     | Kernel code (64-bit, DPL=0; [`KERNEL_CS`])
//! 2     | 0x10     | Kernel data (DPL=0; [`KERNEL_DS`])
//!
//! The table must stay resident after `lgdt`: the CPU re-reads descriptors on
//! every segment load and on interrupt returns.

pub mod descriptors;
pub mod selectors;

use crate::gdt::descriptors::Descriptor;
use crate::gdt::selectors::SegmentSelector;

pub const KERNEL_CS_SEL: SegmentSelector = SegmentSelector::gdt_ring0(1);
pub const KERNEL_DS_SEL: SegmentSelector = SegmentSelector::gdt_ring0(2);

pub const KERNEL_CS: u16 = KERNEL_CS_SEL.encode(); // 0x08
pub const KERNEL_DS: u16 = KERNEL_DS_SEL.encode(); // 0x10

const _: () = {
    assert!(KERNEL_CS == 0x08);
    assert!(KERNEL_DS == 0x10);
};

/// The table installed by the loader right before entering the kernel.
///
/// Lives in the loader image, which the firmware marks as `LOADER_CODE`/
/// `LOADER_DATA`; the kernel inherits it untouched.
pub static LOADER_GDT: DescriptorTable = DescriptorTable::new();

/// Null, kernel code and kernel data descriptors.
#[repr(C, align(16))]
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct DescriptorTable {
    null: Descriptor,  // 0
    kcode: Descriptor, // 1
    kdata: Descriptor, // 2
}

impl DescriptorTable {
    /// Number of descriptors covered by the `lgdt` limit.
    pub const ENTRIES: usize = 3;

    #[must_use]
    pub const fn new() -> Self {
        Self {
            null: Descriptor::NULL,
            kcode: Descriptor::kernel_code(),
            kdata: Descriptor::kernel_data(),
        }
    }

    #[inline]
    #[must_use]
    pub const fn null(&self) -> Descriptor {
        self.null
    }

    #[inline]
    #[must_use]
    pub const fn code(&self) -> Descriptor {
        self.kcode
    }

    #[inline]
    #[must_use]
    pub const fn data(&self) -> Descriptor {
        self.kdata
    }

    /// The `lgdt` operand describing this table.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn pointer(&'static self) -> DescriptorTablePointer {
        DescriptorTablePointer {
            limit: (Self::ENTRIES * size_of::<Descriptor>() - 1) as u16,
            base: core::ptr::from_ref(self) as u64,
        }
    }
}

impl Default for DescriptorTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Pointer format required by `lgdt`.
///
/// The CPU reads `limit + 1` bytes starting at `base`.
#[repr(C, packed)]
#[derive(Copy, Clone)]
pub struct DescriptorTablePointer {
    /// Size of the table minus one, in bytes.
    pub limit: u16,
    /// Linear address of the table.
    pub base: u64,
}

const _: () = {
    assert!(size_of::<DescriptorTable>() == 32);
    assert!(size_of::<DescriptorTablePointer>() == 10);
};
