//! Test-support memory used by unit tests across the workspace. Not part
//! of the public contract.

use std::sync::Mutex;

use crate::{GuestMemory, MemoryAccessError};

/// A heap-backed linear memory with the same bounds-checking behavior the
/// real host view has.
pub struct BufferMemory {
    bytes: Mutex<Vec<u8>>,
}

impl BufferMemory {
    pub fn new(size: usize) -> Self {
        Self {
            bytes: Mutex::new(vec![0u8; size]),
        }
    }

    fn range(&self, offset: u64, len: usize) -> Result<std::ops::Range<usize>, MemoryAccessError> {
        let start = usize::try_from(offset).map_err(|_| MemoryAccessError::OutOfBounds)?;
        let end = start
            .checked_add(len)
            .ok_or(MemoryAccessError::Overflow)?;
        if end > self.bytes.lock().unwrap().len() {
            return Err(MemoryAccessError::OutOfBounds);
        }
        Ok(start..end)
    }
}

impl GuestMemory for BufferMemory {
    fn read(&self, offset: u64, buf: &mut [u8]) -> Result<(), MemoryAccessError> {
        let range = self.range(offset, buf.len())?;
        buf.copy_from_slice(&self.bytes.lock().unwrap()[range]);
        Ok(())
    }

    fn write(&self, offset: u64, data: &[u8]) -> Result<(), MemoryAccessError> {
        let range = self.range(offset, data.len())?;
        self.bytes.lock().unwrap()[range].copy_from_slice(data);
        Ok(())
    }
}
