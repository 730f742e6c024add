//! # Final control transfer
//!
//! The only place the loader touches descriptor-table registers and jumps into
//! the loaded image.

use crate::PhysicalAddress;
use crate::gdt::{DescriptorTable, KERNEL_CS, KERNEL_DS};

/// Install `table`, reload every segment register and call the flat image at `entry`.
///
/// Sequence:
/// ```asm
/// cli
/// lgdt  [gdtr]
/// mov   ds/es/fs/gs/ss, KERNEL_DS
/// push  KERNEL_CS
/// lea   rax, [rip + 2f]
/// push  rax
/// retfq              ; CS cannot be moved into directly, far-return to the next line
/// 2: call entry
/// ```
///
/// # Safety
/// - Boot services must already be exited; nothing may touch the firmware afterwards.
/// - `table` must hold valid null/code/data descriptors at indices 0/1/2 and stay
///   resident; `&'static` ensures it is never reclaimed by the loader.
/// - `entry` must point at executable x86-64 code that never returns.
#[cfg(target_arch = "x86_64")]
#[inline(never)]
pub unsafe fn enter_flat_image(table: &'static DescriptorTable, entry: PhysicalAddress) -> ! {
    let gdtr = table.pointer();
    unsafe {
        core::arch::asm!(
            "cli",
            "lgdt   [rdi]",
            "mov    ds, si",
            "mov    es, si",
            "mov    fs, si",
            "mov    gs, si",
            "mov    ss, si",
            "push   rdx",
            "lea    rax, [rip + 2f]",
            "push   rax",
            "retfq",
            "2:",
            // Entry is a plain no-argument call; it must never come back.
            "call   rcx",
            "3:",
            "hlt",
            "jmp    3b",
            in("rdi") &raw const gdtr,
            in("si") KERNEL_DS,
            in("rdx") u64::from(KERNEL_CS),
            in("rcx") entry.as_u64(),
            options(noreturn)
        )
    }
}

/// Other targets have no handoff path; the loader is x86-64 only.
#[cfg(not(target_arch = "x86_64"))]
pub unsafe fn enter_flat_image(_table: &'static DescriptorTable, _entry: PhysicalAddress) -> ! {
    unimplemented!("kernel handoff is only implemented for x86_64")
}
