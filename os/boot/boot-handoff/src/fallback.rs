//! # Built-in fallback image
//!
//! Flat x86-64 machine code entered exactly like a kernel read from disk. It
//! needs nothing from the firmware: it writes a green `OK` into the VGA text
//! buffer, echoes `OK\n` to the QEMU debug console and parks the CPU.
//!
//! ```asm
//! mov  rdi, 0xb8000
//! mov  dword [rdi], 0x2f4b2f4f   ; 'O' 'K', white on green
//! mov  dx, 0x402
//! mov  al, 'O'
//! out  dx, al
//! mov  al, 'K'
//! out  dx, al
//! mov  al, 0x0a
//! out  dx, al
//! cli
//! 1: hlt
//! jmp  1b
//! ```

#[rustfmt::skip]
pub const FALLBACK_IMAGE: &[u8] = &[
    0x48, 0xc7, 0xc7, 0x00, 0x80, 0x0b, 0x00, // mov rdi, 0xb8000
    0xc7, 0x07, 0x4f, 0x2f, 0x4b, 0x2f,       // mov dword [rdi], 0x2f4b2f4f
    0x66, 0xba, 0x02, 0x04,                   // mov dx, 0x402
    0xb0, 0x4f,                               // mov al, 'O'
    0xee,                                     // out dx, al
    0xb0, 0x4b,                               // mov al, 'K'
    0xee,                                     // out dx, al
    0xb0, 0x0a,                               // mov al, '\n'
    0xee,                                     // out dx, al
    0xfa,                                     // cli
    0xf4,                                     // hlt
    0xeb, 0xfd,                               // jmp hlt
];
