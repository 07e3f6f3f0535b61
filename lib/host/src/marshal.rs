//! Host-side marshaling over the guest memory view. Everything here is
//! pointer/length arithmetic plus bounds checks; any failure surfaces as
//! [`Errno::Fault`], never as a host-side panic.

use wasinet_types::{Errno, GuestMemory, RawSocketAddress};

pub fn read_sockaddr<M: GuestMemory>(mem: &M, offset: u64) -> Result<RawSocketAddress, Errno> {
    let mut buf = [0u8; RawSocketAddress::SIZE];
    mem.read(offset, &mut buf)?;
    Ok(RawSocketAddress::from_bytes(&buf))
}

pub fn write_sockaddr<M: GuestMemory>(
    mem: &M,
    offset: u64,
    addr: &RawSocketAddress,
) -> Result<(), Errno> {
    mem.write(offset, &addr.to_bytes())?;
    Ok(())
}

pub fn read_string<M: GuestMemory>(mem: &M, offset: u64, len: u32) -> Result<String, Errno> {
    Ok(mem.read_string(offset, len)?)
}

/// Reads an I/O descriptor array and concatenates the referenced buffers
/// into one contiguous gather buffer (for sends).
pub fn gather<M: GuestMemory>(mem: &M, iovs: u64, count: u32) -> Result<Vec<u8>, Errno> {
    let vectors = mem.read_vectors(iovs, count)?;
    let total: usize = vectors.iter().map(|&(_, len)| len as usize).sum();
    let mut data = Vec::with_capacity(total);
    for (offset, len) in vectors {
        data.extend_from_slice(&mem.read_vec(offset, len)?);
    }
    Ok(data)
}

/// Reads an I/O descriptor array and returns the (offset, length) pairs
/// plus their total capacity (for receives).
pub fn read_scatter_targets<M: GuestMemory>(
    mem: &M,
    iovs: u64,
    count: u32,
) -> Result<(Vec<(u64, u32)>, usize), Errno> {
    let vectors = mem.read_vectors(iovs, count)?;
    let total = vectors.iter().map(|&(_, len)| len as usize).sum();
    Ok((vectors, total))
}

/// Splits `data` back across the descriptor targets, in order. `data` must
/// fit the combined capacity (the receive path reads at most that much).
pub fn scatter<M: GuestMemory>(
    mem: &M,
    targets: &[(u64, u32)],
    data: &[u8],
) -> Result<(), Errno> {
    let mut rest = data;
    for &(offset, len) in targets {
        if rest.is_empty() {
            break;
        }
        let take = rest.len().min(len as usize);
        mem.write(offset, &rest[..take])?;
        rest = &rest[take..];
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use wasinet_types::IoVec;
    use wasinet_types::testing::BufferMemory;

    use super::*;

    fn memory_with_vectors() -> BufferMemory {
        let mem = BufferMemory::new(256);
        mem.write(0, &IoVec { offset: 64, len: 3 }.encode()).unwrap();
        mem.write(8, &IoVec { offset: 96, len: 5 }.encode()).unwrap();
        mem.write(64, b"abc").unwrap();
        mem.write(96, b"defgh").unwrap();
        mem
    }

    #[test]
    fn gather_concatenates_in_order() {
        let mem = memory_with_vectors();
        assert_eq!(gather(&mem, 0, 2).unwrap(), b"abcdefgh");
    }

    #[test]
    fn scatter_round_trips_gather() {
        let mem = memory_with_vectors();
        let (targets, total) = read_scatter_targets(&mem, 0, 2).unwrap();
        assert_eq!(total, 8);
        scatter(&mem, &targets, b"ABCDEFGH").unwrap();
        assert_eq!(gather(&mem, 0, 2).unwrap(), b"ABCDEFGH");
    }

    #[test]
    fn scatter_handles_short_data() {
        let mem = memory_with_vectors();
        let (targets, _) = read_scatter_targets(&mem, 0, 2).unwrap();
        scatter(&mem, &targets, b"XY").unwrap();
        assert_eq!(gather(&mem, 0, 2).unwrap(), b"XYcdefgh");
    }

    #[test]
    fn out_of_range_vectors_fault() {
        let mem = BufferMemory::new(32);
        mem.write(0, &IoVec { offset: 512, len: 4 }.encode()).unwrap();
        assert_eq!(gather(&mem, 0, 1), Err(Errno::Fault));
    }

    #[test]
    fn sockaddr_survives_memory_round_trip() {
        let mem = BufferMemory::new(256);
        let mut addr = RawSocketAddress::default();
        addr.family = 2;
        addr.sotype = 1;
        addr.payload[0] = 0xbb;
        write_sockaddr(&mem, 100, &addr).unwrap();
        let back = read_sockaddr(&mem, 100).unwrap();
        assert_eq!(back.to_bytes(), addr.to_bytes());
        assert_eq!(read_sockaddr(&mem, 200), Err(Errno::Fault));
    }
}
