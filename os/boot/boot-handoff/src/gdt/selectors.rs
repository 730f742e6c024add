//! # Segment selectors
//!
//! ```text
//!  15            3 2  1  0
//! +----------------+--+----+
//! |   Index[12:0]  |TI| RPL|
//! +----------------+--+----+  (TI=0 → GDT, TI=1 → LDT; RPL=0..3)
//! ```

use bitfield_struct::bitfield;

#[bitfield(u16)]
#[derive(PartialEq, Eq)]
pub struct SegmentSelector {
    /// Requested privilege level.
    #[bits(2)]
    pub rpl: u8,
    /// Table indicator, `false` selects the GDT.
    pub ldt: bool,
    /// Descriptor index.
    #[bits(13)]
    pub index: u16,
}

impl SegmentSelector {
    /// A ring-0 selector for GDT entry `index`.
    #[inline]
    #[must_use]
    pub const fn gdt_ring0(index: u16) -> Self {
        Self::new().with_index(index).with_ldt(false).with_rpl(0)
    }

    #[inline]
    #[must_use]
    pub const fn encode(self) -> u16 {
        self.into_bits()
    }
}
