//! The loopback syscall backend: the same raw surface as the wasm imports,
//! implemented by calling `wasinet-host`'s ABI shells in-process. The
//! "linear memory" is this process's own address space, which makes the
//! memory view trivial — and means the full marshaling path (envelope
//! codecs, vector parsing, bounds plumbing) is exercised even in native
//! test runs.

use once_cell::sync::OnceCell;
use wasinet_host::{Netstack, abi};
use wasinet_types::{GuestMemory, GuestVector, MemoryAccessError};

static NETSTACK: OnceCell<Netstack> = OnceCell::new();

/// Installs the Netstack backing this process's guest API. Call once,
/// before any network operation; afterwards the configuration is
/// immutable. If nothing is installed an unrestricted stack is created on
/// first use.
pub fn install(net: Netstack) -> Result<(), Netstack> {
    NETSTACK.set(net)
}

/// The Netstack this process's guest API runs against (installing a
/// default unrestricted one if needed). Exposed for harness introspection.
pub fn netstack() -> &'static Netstack {
    NETSTACK.get_or_init(Netstack::unrestricted)
}

fn handle() -> &'static Netstack {
    netstack()
}

/// The guest's own address space, presented through the same bounds-checked
/// trait the host applies to linear memory.
struct NativeMemory;

impl GuestMemory for NativeMemory {
    fn read(&self, offset: u64, buf: &mut [u8]) -> Result<(), MemoryAccessError> {
        unsafe {
            std::ptr::copy_nonoverlapping(offset as usize as *const u8, buf.as_mut_ptr(), buf.len())
        };
        Ok(())
    }

    fn write(&self, offset: u64, data: &[u8]) -> Result<(), MemoryAccessError> {
        unsafe {
            std::ptr::copy_nonoverlapping(data.as_ptr(), offset as usize as *mut u8, data.len())
        };
        Ok(())
    }

    // Native vector arrays carry pointer-width offsets, not the packed
    // 8-byte wire form.
    fn read_vectors(&self, offset: u64, count: u32) -> Result<Vec<(u64, u32)>, MemoryAccessError> {
        let mut vectors = Vec::with_capacity(count as usize);
        for index in 0..count as u64 {
            let base = offset
                .checked_add(index * GuestVector::STRIDE as u64)
                .ok_or(MemoryAccessError::Overflow)?;
            let mut ptr = [0u8; std::mem::size_of::<usize>()];
            self.read(base, &mut ptr)?;
            let mut len = [0u8; 4];
            self.read(base + std::mem::size_of::<usize>() as u64, &mut len)?;
            vectors.push((usize::from_ne_bytes(ptr) as u64, u32::from_ne_bytes(len)));
        }
        Ok(vectors)
    }
}

pub(crate) unsafe fn sock_determine_host_af_family(wasi_af: i32) -> i32 {
    abi::sock_determine_host_af_family(wasi_af)
}

pub(crate) unsafe fn sock_open(family: i32, sotype: i32, proto: i32, fd_out: *mut u32) -> u32 {
    abi::sock_open(handle(), &NativeMemory, family, sotype, proto, fd_out as u64).to_wire()
}

pub(crate) unsafe fn sock_bind(fd: i32, addr: *const u8, addrlen: u32) -> u32 {
    abi::sock_bind(handle(), &NativeMemory, fd, addr as u64, addrlen).to_wire()
}

pub(crate) unsafe fn sock_connect(fd: i32, addr: *const u8, addrlen: u32) -> u32 {
    abi::sock_connect(handle(), &NativeMemory, fd, addr as u64, addrlen).to_wire()
}

pub(crate) unsafe fn sock_listen(fd: i32, backlog: i32) -> u32 {
    abi::sock_listen(handle(), fd, backlog).to_wire()
}

pub(crate) unsafe fn sock_accept(fd: i32, newfd_out: *mut u32, peer_out: *mut u8) -> u32 {
    abi::sock_accept(handle(), &NativeMemory, fd, newfd_out as u64, peer_out as u64).to_wire()
}

pub(crate) unsafe fn sock_getsockopt(
    fd: i32,
    level: i32,
    name: i32,
    value_out: *mut u32,
    valuelen: u32,
) -> u32 {
    abi::sock_getsockopt(
        handle(),
        &NativeMemory,
        fd,
        level,
        name,
        value_out as u64,
        valuelen,
    )
    .to_wire()
}

pub(crate) unsafe fn sock_setsockopt(
    fd: i32,
    level: i32,
    name: i32,
    value: *const u8,
    valuelen: u32,
) -> u32 {
    abi::sock_setsockopt(
        handle(),
        &NativeMemory,
        fd,
        level,
        name,
        value as u64,
        valuelen,
    )
    .to_wire()
}

pub(crate) unsafe fn sock_getlocaladdr(fd: i32, addr_out: *mut u8) -> u32 {
    abi::sock_getlocaladdr(handle(), &NativeMemory, fd, addr_out as u64).to_wire()
}

pub(crate) unsafe fn sock_getpeeraddr(fd: i32, addr_out: *mut u8) -> u32 {
    abi::sock_getpeeraddr(handle(), &NativeMemory, fd, addr_out as u64).to_wire()
}

#[allow(clippy::too_many_arguments)]
pub(crate) unsafe fn sock_recv_from(
    fd: i32,
    iovs: *const u8,
    iovcount: u32,
    oob: *mut u8,
    ooblen: u32,
    iflags: i32,
    peer_out: *mut u8,
    nread_out: *mut u32,
    oflags_out: *mut u32,
) -> u32 {
    abi::sock_recv_from(
        handle(),
        &NativeMemory,
        fd,
        iovs as u64,
        iovcount,
        oob as u64,
        ooblen,
        iflags,
        peer_out as u64,
        nread_out as u64,
        oflags_out as u64,
    )
    .to_wire()
}

#[allow(clippy::too_many_arguments)]
pub(crate) unsafe fn sock_send_to(
    fd: i32,
    iovs: *const u8,
    iovcount: u32,
    oob: *const u8,
    ooblen: u32,
    peer: *const u8,
    peerlen: u32,
    flags: i32,
    nwritten_out: *mut u32,
) -> u32 {
    abi::sock_send_to(
        handle(),
        &NativeMemory,
        fd,
        iovs as u64,
        iovcount,
        oob as u64,
        ooblen,
        peer as u64,
        peerlen,
        flags,
        nwritten_out as u64,
    )
    .to_wire()
}

pub(crate) unsafe fn sock_shutdown(fd: i32, how: i32) -> u32 {
    abi::sock_shutdown(handle(), fd, how).to_wire()
}

#[allow(clippy::too_many_arguments)]
pub(crate) unsafe fn sock_getaddrip(
    network: *const u8,
    networklen: u32,
    address: *const u8,
    addresslen: u32,
    ipbuf: *mut u8,
    maxresbytes: u32,
    reslen_out: *mut u32,
) -> u32 {
    abi::sock_getaddrip(
        handle(),
        &NativeMemory,
        network as u64,
        networklen,
        address as u64,
        addresslen,
        ipbuf as u64,
        maxresbytes,
        reslen_out as u64,
    )
    .to_wire()
}

pub(crate) unsafe fn sock_getaddrport(
    network: *const u8,
    networklen: u32,
    service: *const u8,
    servicelen: u32,
    port_out: *mut u32,
) -> u32 {
    abi::sock_getaddrport(
        handle(),
        &NativeMemory,
        network as u64,
        networklen,
        service as u64,
        servicelen,
        port_out as u64,
    )
    .to_wire()
}
