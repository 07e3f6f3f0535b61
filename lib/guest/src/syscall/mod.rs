//! Typed wrappers over the raw `wasinet_v0` functions. Two backends share
//! the same raw signatures: on `wasm32` the functions are imports resolved
//! by the embedder; everywhere else they are implemented in-process by
//! `wasinet-host` (the loopback backend the tests run on).

use wasinet_types::sockopt::ShutdownHow;
use wasinet_types::{Errno, GuestVector, RawSocketAddress};

use crate::ffi;

cfg_if::cfg_if! {
    if #[cfg(target_arch = "wasm32")] {
        mod wasm;
        use wasm as backend;
    } else {
        pub mod native;
        use native as backend;
    }
}

/// One host AF lookup; the result is cached by [`crate::addr`].
pub(crate) fn host_af_family(wasi_af: i32) -> i32 {
    unsafe { backend::sock_determine_host_af_family(wasi_af) }
}

pub(crate) fn socket(family: u16, sotype: u16, proto: i32) -> Result<i32, Errno> {
    let mut fd: u32 = 0;
    let errno = unsafe {
        backend::sock_open(i32::from(family), i32::from(sotype), proto, &mut fd)
    };
    Errno::check(errno)?;
    Ok(fd as i32)
}

pub(crate) fn bind(fd: i32, addr: &RawSocketAddress) -> Result<(), Errno> {
    let bytes = addr.to_bytes();
    let (ptr, len) = ffi::addr_parts(&bytes);
    Errno::check(unsafe { backend::sock_bind(fd, ptr, len) })
}

pub(crate) fn connect(fd: i32, addr: &RawSocketAddress) -> Result<(), Errno> {
    let bytes = addr.to_bytes();
    let (ptr, len) = ffi::addr_parts(&bytes);
    Errno::check(unsafe { backend::sock_connect(fd, ptr, len) })
}

pub(crate) fn listen(fd: i32, backlog: i32) -> Result<(), Errno> {
    Errno::check(unsafe { backend::sock_listen(fd, backlog) })
}

pub(crate) fn accept(fd: i32) -> Result<(i32, RawSocketAddress), Errno> {
    let mut newfd: u32 = 0;
    let mut peer = ffi::addr_buf();
    let errno = unsafe { backend::sock_accept(fd, &mut newfd, peer.as_mut_ptr()) };
    Errno::check(errno)?;
    Ok((newfd as i32, RawSocketAddress::from_bytes(&peer)))
}

pub(crate) fn getsockopt_int(fd: i32, level: i32, name: i32) -> Result<i32, Errno> {
    let mut value: u32 = 0;
    let errno = unsafe { backend::sock_getsockopt(fd, level, name, &mut value, 4) };
    Errno::check(errno)?;
    Ok(value as i32)
}

pub(crate) fn setsockopt_int(fd: i32, level: i32, name: i32, value: i32) -> Result<(), Errno> {
    let bytes = value.to_le_bytes();
    Errno::check(unsafe {
        backend::sock_setsockopt(fd, level, name, bytes.as_ptr(), bytes.len() as u32)
    })
}

pub(crate) fn local_addr(fd: i32) -> Result<RawSocketAddress, Errno> {
    let mut buf = ffi::addr_buf();
    let errno = unsafe { backend::sock_getlocaladdr(fd, buf.as_mut_ptr()) };
    Errno::check(errno)?;
    Ok(RawSocketAddress::from_bytes(&buf))
}

pub(crate) fn peer_addr(fd: i32) -> Result<RawSocketAddress, Errno> {
    let mut buf = ffi::addr_buf();
    let errno = unsafe { backend::sock_getpeeraddr(fd, buf.as_mut_ptr()) };
    Errno::check(errno)?;
    Ok(RawSocketAddress::from_bytes(&buf))
}

/// Single vectored read into `buf`. Returns the byte count, the message's
/// peer address and the output flags. `Again` surfaces to the caller; the
/// retry loop lives in the descriptor layer.
pub(crate) fn recv_from(
    fd: i32,
    buf: &mut [u8],
    flags: i32,
) -> Result<(usize, RawSocketAddress, i32), Errno> {
    let vectors = [GuestVector::from_mut_slice(buf)];
    let mut peer = ffi::addr_buf();
    let mut nread: u32 = 0;
    let mut oflags: u32 = 0;
    let errno = unsafe {
        backend::sock_recv_from(
            fd,
            vectors.as_ptr().cast(),
            vectors.len() as u32,
            std::ptr::null_mut(),
            0,
            flags,
            peer.as_mut_ptr(),
            &mut nread,
            &mut oflags,
        )
    };
    Errno::check(errno)?;
    Ok((
        nread as usize,
        RawSocketAddress::from_bytes(&peer),
        oflags as i32,
    ))
}

/// Single vectored write. For connected sockets the peer is advisory and
/// may be omitted.
pub(crate) fn send_to(
    fd: i32,
    buf: &[u8],
    peer: Option<&RawSocketAddress>,
    flags: i32,
) -> Result<usize, Errno> {
    let vectors = [GuestVector::from_slice(buf)];
    let peer_bytes = peer.map(|p| p.to_bytes());
    let (peer_ptr, peer_len) = match &peer_bytes {
        Some(bytes) => ffi::addr_parts(bytes),
        None => (std::ptr::null(), 0),
    };
    let mut nwritten: u32 = 0;
    let errno = unsafe {
        backend::sock_send_to(
            fd,
            vectors.as_ptr().cast(),
            vectors.len() as u32,
            std::ptr::null(),
            0,
            peer_ptr,
            peer_len,
            flags,
            &mut nwritten,
        )
    };
    Errno::check(errno)?;
    Ok(nwritten as usize)
}

pub(crate) fn shutdown(fd: i32, how: ShutdownHow) -> Result<(), Errno> {
    Errno::check(unsafe { backend::sock_shutdown(fd, how as i32) })
}

/// Resolves a hostname to IPv6-form (16-byte) addresses. Up to eight
/// results per call, matching the resolver's wire contract.
pub(crate) fn resolve_ip(network: &str, address: &str) -> Result<Vec<[u8; 16]>, Errno> {
    const IP_SIZE: usize = 16;

    let mut buf = [0u8; IP_SIZE * 8];
    let mut reslen: u32 = 0;
    let (network_ptr, network_len) = ffi::str_parts(network);
    let (address_ptr, address_len) = ffi::str_parts(address);
    let errno = unsafe {
        backend::sock_getaddrip(
            network_ptr,
            network_len,
            address_ptr,
            address_len,
            buf.as_mut_ptr(),
            buf.len() as u32,
            &mut reslen,
        )
    };
    Errno::check(errno)?;
    Ok(buf[..(reslen as usize).min(buf.len())]
        .chunks_exact(IP_SIZE)
        .map(|chunk| chunk.try_into().unwrap())
        .collect())
}

pub(crate) fn resolve_port(network: &str, service: &str) -> Result<u16, Errno> {
    let mut port: u32 = 0;
    let (network_ptr, network_len) = ffi::str_parts(network);
    let (service_ptr, service_len) = ffi::str_parts(service);
    let errno = unsafe {
        backend::sock_getaddrport(network_ptr, network_len, service_ptr, service_len, &mut port)
    };
    Errno::check(errno)?;
    u16::try_from(port).map_err(|_| Errno::Inval)
}
