//! # 64-bit code/data segment descriptors
//!
//! In long mode base and limit of code/data descriptors are ignored. What the
//! CPU still checks is the type, the S bit, DPL, P and, for code, L/DB.

use bitfield_struct::bitfield;

/// Segment descriptor bit layout shared by code and data descriptors.
#[bitfield(u64)]
#[derive(PartialEq, Eq)]
pub struct SegmentDescBits {
    pub limit_lo: u16, // [15:0]   (ignored in long mode)
    pub base_lo: u16,  // [31:16]  (ignored in long mode)
    pub base_mid: u8,  // [39:32]
    /// Accessed bit; the CPU sets it on first load.
    pub accessed: bool, // [40]
    /// Code: readable. Data: writable.
    pub rw: bool, // [41]
    /// Code: conforming. Data: expand-down.
    pub dc: bool, // [42]
    /// Set for code, clear for data.
    pub executable: bool, // [43]
    /// Code/data descriptor (as opposed to a system descriptor).
    pub s: bool, // [44]
    #[bits(2)]
    pub dpl: u8, // [46:45]
    pub present: bool, // [47]
    #[bits(4)]
    pub limit_hi: u8, // [51:48]
    pub avl: bool,     // [52]
    /// 64-bit code segment.
    pub long_mode: bool, // [53]
    /// Must be clear when `long_mode` is set.
    pub db: bool, // [54]
    pub granularity: bool, // [55]
    pub base_hi: u8,       // [63:56]
}

/// One 8-byte GDT entry.
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq)]
pub struct Descriptor(SegmentDescBits);

impl Descriptor {
    /// The mandatory all-zero entry at index 0.
    pub const NULL: Self = Self(SegmentDescBits::new());

    /// Present, ring 0, execute + read, 64-bit code (`L=1`, `DB=0`).
    #[must_use]
    pub const fn kernel_code() -> Self {
        Self(
            SegmentDescBits::new()
                .with_rw(true)
                .with_executable(true)
                .with_s(true)
                .with_dpl(0)
                .with_present(true)
                .with_long_mode(true)
                .with_db(false),
        )
    }

    /// Present, ring 0, read/write data.
    #[must_use]
    pub const fn kernel_data() -> Self {
        Self(
            SegmentDescBits::new()
                .with_rw(true)
                .with_executable(false)
                .with_s(true)
                .with_dpl(0)
                .with_present(true),
        )
    }

    #[inline]
    #[must_use]
    pub const fn bits(self) -> SegmentDescBits {
        self.0
    }

    #[inline]
    #[must_use]
    pub const fn to_u64(self) -> u64 {
        self.0.into_bits()
    }
}

impl core::fmt::Debug for Descriptor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Descriptor({:#018x})", self.to_u64())
    }
}

const _: () = {
    assert!(size_of::<SegmentDescBits>() == 8);
    assert!(size_of::<Descriptor>() == 8);
};
