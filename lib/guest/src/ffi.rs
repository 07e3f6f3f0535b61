//! Guest-side marshaling: turning strings, slices and records into the
//! (pointer, length) pairs the ABI consumes. All of this is arithmetic
//! over the guest's own address space.

use wasinet_types::RawSocketAddress;

pub(crate) fn str_parts(s: &str) -> (*const u8, u32) {
    (s.as_ptr(), s.len() as u32)
}

pub(crate) fn addr_parts(buf: &[u8; RawSocketAddress::SIZE]) -> (*const u8, u32) {
    (buf.as_ptr(), RawSocketAddress::SIZE as u32)
}

/// A zeroed envelope buffer for out-parameter addresses.
pub(crate) fn addr_buf() -> [u8; RawSocketAddress::SIZE] {
    [0u8; RawSocketAddress::SIZE]
}
