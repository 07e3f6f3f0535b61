use thiserror::Error;

use crate::{Errno, IoVec};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MemoryAccessError {
    #[error("guest memory access out of bounds")]
    OutOfBounds,
    #[error("guest address computation overflowed")]
    Overflow,
    #[error("guest bytes are not valid UTF-8")]
    InvalidUtf8,
}

impl From<MemoryAccessError> for Errno {
    fn from(_: MemoryAccessError) -> Self {
        Errno::Fault
    }
}

/// A bounds-checked window onto the guest's linear memory.
///
/// One trait, two implementations: the host implements it over the
/// engine's memory view, the guest's native test backend implements it
/// trivially over its own address space. Every failure is an error value;
/// an out-of-range access must never be able to crash the host.
pub trait GuestMemory {
    /// Fills `buf` from guest memory at `offset`.
    fn read(&self, offset: u64, buf: &mut [u8]) -> Result<(), MemoryAccessError>;

    /// Writes `data` into guest memory at `offset`.
    fn write(&self, offset: u64, data: &[u8]) -> Result<(), MemoryAccessError>;

    fn read_vec(&self, offset: u64, len: u32) -> Result<Vec<u8>, MemoryAccessError> {
        let mut buf = vec![0u8; len as usize];
        self.read(offset, &mut buf)?;
        Ok(buf)
    }

    fn read_u32(&self, offset: u64) -> Result<u32, MemoryAccessError> {
        let mut buf = [0u8; 4];
        self.read(offset, &mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }

    fn write_u32(&self, offset: u64, value: u32) -> Result<(), MemoryAccessError> {
        self.write(offset, &value.to_le_bytes())
    }

    fn read_string(&self, offset: u64, len: u32) -> Result<String, MemoryAccessError> {
        String::from_utf8(self.read_vec(offset, len)?).map_err(|_| MemoryAccessError::InvalidUtf8)
    }

    /// Reads an array of I/O descriptors, returning (offset, length) pairs.
    ///
    /// The provided implementation decodes the 8-byte wire layout. The
    /// guest's native backend overrides it with the pointer-width layout
    /// its own `GuestVector` arrays carry.
    fn read_vectors(&self, offset: u64, count: u32) -> Result<Vec<(u64, u32)>, MemoryAccessError> {
        let mut vectors = Vec::with_capacity(count as usize);
        for index in 0..count as u64 {
            let base = index
                .checked_mul(IoVec::SIZE as u64)
                .and_then(|rel| offset.checked_add(rel))
                .ok_or(MemoryAccessError::Overflow)?;
            let mut buf = [0u8; IoVec::SIZE];
            self.read(base, &mut buf)?;
            let vec = IoVec::decode(&buf);
            vectors.push((u64::from(vec.offset), vec.len));
        }
        Ok(vectors)
    }
}
