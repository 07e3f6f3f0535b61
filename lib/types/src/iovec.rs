/// One scatter/gather descriptor as it crosses the ABI: a guest-memory
/// offset and a byte length, both little-endian u32. Arrays of these are
/// passed by (base offset, count).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IoVec {
    pub offset: u32,
    pub len: u32,
}

impl IoVec {
    /// Wire size of one descriptor.
    pub const SIZE: usize = 8;

    pub fn encode(&self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        buf[0..4].copy_from_slice(&self.offset.to_le_bytes());
        buf[4..8].copy_from_slice(&self.len.to_le_bytes());
        buf
    }

    pub fn decode(buf: &[u8; Self::SIZE]) -> Self {
        Self {
            offset: u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]),
            len: u32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]),
        }
    }
}

/// The guest-side sibling of [`IoVec`]: a real pointer into the guest's own
/// address space plus a length.
///
/// On `wasm32` a pointer is 32 bits and this struct coincides with the wire
/// layout, so an array of `GuestVector`s can be handed to the ABI as-is. On
/// 64-bit native targets (the loopback test backend) the stride widens to
/// 16 bytes; the native memory implementation decodes that layout instead.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct GuestVector {
    pub ptr: usize,
    pub len: u32,
}

impl GuestVector {
    /// Element stride of a `[GuestVector]` array on the current target.
    pub const STRIDE: usize = std::mem::size_of::<Self>();

    pub fn from_slice(buf: &[u8]) -> Self {
        Self {
            ptr: buf.as_ptr() as usize,
            len: buf.len() as u32,
        }
    }

    pub fn from_mut_slice(buf: &mut [u8]) -> Self {
        Self {
            ptr: buf.as_mut_ptr() as usize,
            len: buf.len() as u32,
        }
    }
}
