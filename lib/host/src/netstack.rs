use std::collections::HashMap;
use std::io;
use std::mem::MaybeUninit;
use std::net::{IpAddr, SocketAddr, SocketAddrV4, SocketAddrV6};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use ipnet::IpNet;
use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use tracing::{debug, trace};
use wasinet_types::sockopt::{self, ShutdownHow};
use wasinet_types::{
    AfTable, Errno, RawSocketAddress, SocketAddress, WASI_AF_INET, WASI_AF_INET6, WASI_AF_UNIX,
};

use crate::errno;
use crate::resolve;

/// Maps a WASI-numeric address family onto this kernel's value. Pure; the
/// guest calls it once per family at startup and caches the result.
pub fn host_af_family(wasi_af: i32) -> i32 {
    match wasi_af {
        WASI_AF_UNIX => libc::AF_UNIX,
        WASI_AF_INET => libc::AF_INET,
        WASI_AF_INET6 => libc::AF_INET6,
        other => other,
    }
}

/// The AF table for this kernel, used to tag and decode address envelopes
/// on the host side.
pub fn host_af_table() -> AfTable {
    AfTable {
        inet: libc::AF_INET as u16,
        inet6: libc::AF_INET6 as u16,
        unix: libc::AF_UNIX as u16,
    }
}

/// One `(host, guest)` path-prefix pair for Unix socket remapping. The
/// longest matching guest prefix wins.
#[derive(Debug, Clone)]
pub struct FsPrefix {
    pub host: String,
    pub guest: String,
}

pub struct NetstackBuilder {
    allow: Vec<IpNet>,
    fsmap: Vec<FsPrefix>,
    unrestricted: bool,
}

impl NetstackBuilder {
    /// Permits IP traffic to the given prefix.
    pub fn allow(mut self, net: IpNet) -> Self {
        self.allow.push(net);
        self
    }

    /// Adds a Unix socket path remap pair.
    pub fn fs_prefix(mut self, host: impl Into<String>, guest: impl Into<String>) -> Self {
        self.fsmap.push(FsPrefix {
            host: host.into(),
            guest: guest.into(),
        });
        self
    }

    /// Disables the allow-list entirely.
    pub fn unrestricted(mut self) -> Self {
        self.unrestricted = true;
        self
    }

    pub fn build(self) -> Netstack {
        Netstack {
            allow: self.allow,
            fsmap: self.fsmap,
            unrestricted: self.unrestricted,
            table: Mutex::new(HashMap::new()),
            next_fd: AtomicU32::new(16),
        }
    }
}

struct SocketEntry {
    sock: Socket,
    family: u16,
    sotype: u16,
}

/// The host kernel/policy layer. Owns the descriptor table (opaque guest
/// fd → kernel socket) and implements the semantic operations the ABI
/// shells delegate to.
///
/// By default all IP traffic is denied; configure an allow-list through the
/// builder or start from [`Netstack::unrestricted`]. Unix-domain traffic is
/// governed by the FS-prefix table instead.
pub struct Netstack {
    allow: Vec<IpNet>,
    fsmap: Vec<FsPrefix>,
    unrestricted: bool,
    table: Mutex<HashMap<u32, Arc<SocketEntry>>>,
    next_fd: AtomicU32,
}

impl Netstack {
    pub fn builder() -> NetstackBuilder {
        NetstackBuilder {
            allow: Vec::new(),
            fsmap: Vec::new(),
            unrestricted: false,
        }
    }

    pub fn unrestricted() -> Self {
        Self::builder().unrestricted().build()
    }

    /// Number of live descriptors. Embedder diagnostics; also how the test
    /// suite proves dial→close does not leak.
    pub fn descriptor_count(&self) -> usize {
        self.table.lock().unwrap().len()
    }

    fn entry(&self, fd: i32) -> Result<Arc<SocketEntry>, Errno> {
        // A missing descriptor means the guest already shut it down; the
        // contract makes that indistinguishable from a closed host fd.
        u32::try_from(fd)
            .ok()
            .and_then(|fd| self.table.lock().unwrap().get(&fd).cloned())
            .ok_or(Errno::Io)
    }

    fn insert(&self, entry: SocketEntry) -> u32 {
        let fd = self.next_fd.fetch_add(1, Ordering::Relaxed);
        self.table.lock().unwrap().insert(fd, Arc::new(entry));
        fd
    }

    fn allowed(&self, ip: IpAddr) -> bool {
        self.unrestricted || self.allow.iter().any(|net| net.contains(&ip))
    }

    pub(crate) fn check_ip(&self, ip: IpAddr) -> Result<(), Errno> {
        if self.allowed(ip) {
            Ok(())
        } else {
            debug!(%ip, "address denied by policy");
            Err(Errno::Acces)
        }
    }

    /// Rewrites a guest Unix socket path through the prefix table. The
    /// longest matching guest prefix wins; unmatched paths pass through.
    pub(crate) fn remap(&self, path: &str) -> String {
        let mut best: Option<&FsPrefix> = None;
        for prefix in &self.fsmap {
            if !path.starts_with(&prefix.guest) {
                continue;
            }
            if best.is_none_or(|b| prefix.guest.len() >= b.guest.len()) {
                best = Some(prefix);
            }
        }
        match best {
            Some(prefix) => format!("{}{}", prefix.host, &path[prefix.guest.len()..]),
            None => path.to_string(),
        }
    }

    pub fn open(&self, family: i32, sotype: i32, proto: i32) -> Result<u32, Errno> {
        if family != libc::AF_INET && family != libc::AF_INET6 && family != libc::AF_UNIX {
            return Err(Errno::Notsup);
        }
        let ty = match sotype as u16 {
            sockopt::SOCK_STREAM => Type::STREAM,
            sockopt::SOCK_DGRAM => Type::DGRAM,
            sockopt::SOCK_RAW => Type::RAW,
            sockopt::SOCK_SEQPACKET => Type::SEQPACKET,
            _ => return Err(Errno::Inval),
        };
        let proto = (proto != 0).then(|| Protocol::from(proto));
        let sock = Socket::new(Domain::from(family), ty, proto).map_err(|e| errno::from_io(&e))?;
        // Descriptors are non-blocking end to end: the guest owns every
        // retry loop, and a blocked kernel call must never pin a host
        // thread indefinitely. close-on-exec is set at creation.
        sock.set_nonblocking(true).map_err(|e| errno::from_io(&e))?;
        let fd = self.insert(SocketEntry {
            sock,
            family: family as u16,
            sotype: sotype as u16,
        });
        trace!(fd, family, sotype, "sock_open");
        Ok(fd)
    }

    pub fn bind(&self, fd: i32, addr: &RawSocketAddress) -> Result<(), Errno> {
        let entry = self.entry(fd)?;
        let decoded = decode_addr(addr)?;
        if let Some(ip) = decoded_ip(&decoded) {
            self.check_ip(ip)?;
        }
        let target = self.sockaddr_of(&decoded, false)?;
        trace!(fd, ?decoded, "sock_bind");
        entry.sock.bind(&target).map_err(|e| errno::from_io(&e))
    }

    pub fn connect(&self, fd: i32, addr: &RawSocketAddress) -> Result<(), Errno> {
        let entry = self.entry(fd)?;
        let decoded = decode_addr(addr)?;
        if let Some(ip) = decoded_ip(&decoded) {
            self.check_ip(ip)?;
        }
        let target = self.sockaddr_of(&decoded, true)?;
        trace!(fd, ?decoded, "sock_connect");
        entry.sock.connect(&target).map_err(|e| errno::from_io(&e))
    }

    pub fn listen(&self, fd: i32, backlog: i32) -> Result<(), Errno> {
        let entry = self.entry(fd)?;
        trace!(fd, backlog, "sock_listen");
        entry.sock.listen(backlog).map_err(|e| errno::from_io(&e))
    }

    pub fn accept(&self, fd: i32) -> Result<(u32, RawSocketAddress), Errno> {
        let entry = self.entry(fd)?;
        let (accepted, peer) = entry.sock.accept().map_err(|e| errno::from_io(&e))?;
        accepted
            .set_nonblocking(true)
            .map_err(|e| errno::from_io(&e))?;
        let raw = encode_addr(&sockaddr_decode(&peer)?, entry.sotype)?;
        let newfd = self.insert(SocketEntry {
            sock: accepted,
            family: entry.family,
            sotype: entry.sotype,
        });
        trace!(fd, newfd, "sock_accept");
        Ok((newfd, raw))
    }

    pub fn local_addr(&self, fd: i32) -> Result<RawSocketAddress, Errno> {
        let entry = self.entry(fd)?;
        let sa = entry.sock.local_addr().map_err(|e| errno::from_io(&e))?;
        encode_addr(&sockaddr_decode(&sa)?, entry.sotype)
    }

    pub fn peer_addr(&self, fd: i32) -> Result<RawSocketAddress, Errno> {
        let entry = self.entry(fd)?;
        let sa = entry.sock.peer_addr().map_err(|e| errno::from_io(&e))?;
        encode_addr(&sockaddr_decode(&sa)?, entry.sotype)
    }

    /// 32-bit integer options only. `SO_ERROR` is translated into the ABI
    /// errno space before it is handed back, so the guest's connect poll
    /// compares like against like.
    pub fn get_socket_option(&self, fd: i32, level: i32, name: i32) -> Result<i32, Errno> {
        let entry = self.entry(fd)?;
        let (level, native) = native_option(level, name)?;
        let value = getsockopt_int(&entry.sock, level, native)?;
        if name == sockopt::SO_ERROR {
            return Ok(errno::from_raw_os(value).to_wire() as i32);
        }
        Ok(value)
    }

    /// Dispatches on the wire option name: time-value pair, string, or
    /// 32-bit integer. Unknown shapes are refused with `Notsup` rather than
    /// guessed at.
    pub fn set_socket_option(
        &self,
        fd: i32,
        level: i32,
        name: i32,
        value: &[u8],
    ) -> Result<(), Errno> {
        let entry = self.entry(fd)?;
        let (level, native) = native_option(level, name)?;
        trace!(fd, name, len = value.len(), "sock_setsockopt");
        match name {
            sockopt::SO_RCVTIMEO | sockopt::SO_SNDTIMEO => {
                let (secs, usec) = decode_timepair(value)?;
                let tv = libc::timeval {
                    tv_sec: secs as libc::time_t,
                    tv_usec: usec as libc::suseconds_t,
                };
                setsockopt_raw(&entry.sock, level, native, &tv)
            }
            sockopt::SO_LINGER => {
                let (secs, _) = decode_timepair(value)?;
                let linger = libc::linger {
                    l_onoff: i32::from(secs >= 0),
                    l_linger: secs.max(0) as libc::c_int,
                };
                setsockopt_raw(&entry.sock, level, native, &linger)
            }
            sockopt::SO_BINDTODEVICE => {
                let device = std::str::from_utf8(value).map_err(|_| Errno::Inval)?;
                setsockopt_bytes(&entry.sock, level, native, device.as_bytes())
            }
            _ => {
                let value: [u8; 4] = value.try_into().map_err(|_| Errno::Inval)?;
                let value = i32::from_le_bytes(value);
                setsockopt_raw(&entry.sock, level, native, &value)
            }
        }
    }

    /// `Both` is the descriptor's close point: the kernel shutdown aborts
    /// in-flight I/O, then the table entry (and with it the owned fd) is
    /// dropped. Later calls on the fd report `Io`.
    pub fn shutdown(&self, fd: i32, how: i32) -> Result<(), Errno> {
        let entry = self.entry(fd)?;
        let how = ShutdownHow::try_from(how)?;
        trace!(fd, ?how, "sock_shutdown");
        match how {
            ShutdownHow::Read => entry
                .sock
                .shutdown(std::net::Shutdown::Read)
                .map_err(|e| errno::from_io(&e)),
            ShutdownHow::Write => entry
                .sock
                .shutdown(std::net::Shutdown::Write)
                .map_err(|e| errno::from_io(&e)),
            ShutdownHow::Both => {
                // Never-connected sockets report ENOTCONN here; the close
                // still proceeds.
                let _ = entry.sock.shutdown(std::net::Shutdown::Both);
                self.table.lock().unwrap().remove(&(fd as u32));
                Ok(())
            }
        }
    }

    /// Single vectored read. `EINTR` is retried here; `EAGAIN` surfaces so
    /// the guest's loop (which owns the deadline) decides. A clean zero on
    /// a stream socket comes back as `Ok` with empty data — that is the
    /// EOF signal and must stay distinguishable from not-ready.
    pub fn recv_from(
        &self,
        fd: i32,
        capacity: usize,
        flags: i32,
    ) -> Result<(Vec<u8>, RawSocketAddress, i32), Errno> {
        let entry = self.entry(fd)?;
        let mut buf = vec![MaybeUninit::<u8>::uninit(); capacity];
        let (n, peer) = loop {
            match entry.sock.recv_from_with_flags(&mut buf, flags) {
                Ok(result) => break result,
                Err(err) if err.raw_os_error() == Some(libc::EINTR) => continue,
                Err(err) => return Err(errno::from_io(&err)),
            }
        };
        let data = unsafe { std::slice::from_raw_parts(buf.as_ptr().cast::<u8>(), n) }.to_vec();
        let raw = match sockaddr_decode(&peer) {
            Ok(decoded) => encode_addr(&decoded, entry.sotype)?,
            // Stream reads come back with an unnamed source; report the
            // connected peer instead.
            Err(_) => match entry.sock.peer_addr() {
                Ok(sa) => encode_addr(&sockaddr_decode(&sa)?, entry.sotype)?,
                Err(_) => RawSocketAddress::default(),
            },
        };
        Ok((data, raw, 0))
    }

    /// Single vectored write, gathered into one kernel call so datagram
    /// sends stay atomic with respect to the peer.
    pub fn send_to(
        &self,
        fd: i32,
        data: &[u8],
        peer: Option<&RawSocketAddress>,
        flags: i32,
    ) -> Result<usize, Errno> {
        let entry = self.entry(fd)?;
        let dest = match peer {
            // Stream sockets are connected; the peer argument is advisory.
            _ if entry.sotype == sockopt::SOCK_STREAM => None,
            None => None,
            Some(raw) => match decode_addr(raw)? {
                // A connected Unix socket refuses an explicit destination
                // with EISCONN; drop it.
                SocketAddress::Unix { name } => {
                    if entry.sock.peer_addr().is_ok() {
                        None
                    } else {
                        Some(self.sockaddr_of(&SocketAddress::Unix { name }, false)?)
                    }
                }
                decoded => {
                    if let Some(ip) = decoded_ip(&decoded) {
                        self.check_ip(ip)?;
                    }
                    Some(self.sockaddr_of(&decoded, false)?)
                }
            },
        };
        loop {
            let sent = match &dest {
                Some(addr) => entry.sock.send_to_with_flags(data, addr, flags),
                None => entry.sock.send_with_flags(data, flags),
            };
            match sent {
                Ok(n) => return Ok(n),
                Err(err) if err.raw_os_error() == Some(libc::EINTR) => continue,
                Err(err) => return Err(errno::from_io(&err)),
            }
        }
    }

    /// Name → IP list, IPv6-mapped form (§ resolver). Literals bypass the
    /// resolver; the allow-list filters the results.
    pub fn resolve_ip(&self, network: &str, address: &str) -> Result<Vec<[u8; 16]>, Errno> {
        let ips = resolve::resolve_ip(network, address)?;
        if self.unrestricted {
            return Ok(ips.iter().map(mapped_octets).collect());
        }
        let permitted: Vec<[u8; 16]> = ips
            .iter()
            .filter(|ip| self.allowed(**ip))
            .map(mapped_octets)
            .collect();
        if permitted.is_empty() {
            return Err(Errno::Acces);
        }
        Ok(permitted)
    }

    pub fn resolve_port(&self, network: &str, service: &str) -> Result<u16, Errno> {
        resolve::resolve_port(network, service)
    }

    fn sockaddr_of(&self, addr: &SocketAddress, remap: bool) -> Result<SockAddr, Errno> {
        match addr {
            SocketAddress::V4 { port, ip } => Ok(SockAddr::from(SocketAddr::V4(
                SocketAddrV4::new((*ip).into(), *port),
            ))),
            SocketAddress::V6 { port, ip, zone } => {
                let scope = zone.parse::<u32>().unwrap_or(0);
                Ok(SockAddr::from(SocketAddr::V6(SocketAddrV6::new(
                    (*ip).into(),
                    *port,
                    0,
                    scope,
                ))))
            }
            SocketAddress::Unix { name } => {
                let name = if remap {
                    self.remap(name)
                } else {
                    name.clone()
                };
                unix_sockaddr(&name)
            }
        }
    }
}

fn decode_addr(raw: &RawSocketAddress) -> Result<SocketAddress, Errno> {
    SocketAddress::decode(raw, &host_af_table()).map_err(|_| Errno::Notsup)
}

fn encode_addr(addr: &SocketAddress, sotype: u16) -> Result<RawSocketAddress, Errno> {
    addr.encode(&host_af_table(), sotype).map_err(|_| Errno::Inval)
}

fn decoded_ip(addr: &SocketAddress) -> Option<IpAddr> {
    match addr {
        SocketAddress::V4 { ip, .. } => Some(IpAddr::from(*ip)),
        SocketAddress::V6 { ip, .. } => Some(IpAddr::from(*ip)),
        SocketAddress::Unix { .. } => None,
    }
}

fn mapped_octets(ip: &IpAddr) -> [u8; 16] {
    match ip {
        IpAddr::V4(v4) => v4.to_ipv6_mapped().octets(),
        IpAddr::V6(v6) => v6.octets(),
    }
}

fn sockaddr_decode(sa: &SockAddr) -> Result<SocketAddress, Errno> {
    if let Some(sock) = sa.as_socket() {
        return Ok(match sock {
            SocketAddr::V4(v4) => SocketAddress::V4 {
                port: v4.port(),
                ip: v4.ip().octets(),
            },
            SocketAddr::V6(v6) => SocketAddress::V6 {
                port: v6.port(),
                ip: v6.ip().octets(),
                zone: if v6.scope_id() == 0 {
                    String::new()
                } else {
                    v6.scope_id().to_string()
                },
            },
        });
    }
    if i32::from(sa.family()) == libc::AF_UNIX {
        let name = sa
            .as_pathname()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default();
        return Ok(SocketAddress::Unix { name });
    }
    Err(Errno::Notsup)
}

/// Builds a Unix-domain `SockAddr`, honoring the `@` abstract-socket
/// convention the wire format preserves.
fn unix_sockaddr(name: &str) -> Result<SockAddr, Errno> {
    if let Some(abstract_name) = name.strip_prefix('@') {
        #[cfg(target_os = "linux")]
        {
            let bytes = abstract_name.as_bytes();
            let mut storage: libc::sockaddr_un = unsafe { std::mem::zeroed() };
            if bytes.len() + 1 > storage.sun_path.len() {
                return Err(Errno::Inval);
            }
            storage.sun_family = libc::AF_UNIX as libc::sa_family_t;
            // sun_path[0] stays NUL; the name follows it.
            for (i, b) in bytes.iter().enumerate() {
                storage.sun_path[i + 1] = *b as libc::c_char;
            }
            let len = std::mem::size_of::<libc::sa_family_t>() + 1 + bytes.len();
            let mut full: libc::sockaddr_storage = unsafe { std::mem::zeroed() };
            unsafe {
                std::ptr::copy_nonoverlapping(
                    (&raw const storage).cast::<u8>(),
                    (&raw mut full).cast::<u8>(),
                    std::mem::size_of::<libc::sockaddr_un>(),
                );
            }
            return Ok(unsafe { SockAddr::new(full, len as libc::socklen_t) });
        }
        #[cfg(not(target_os = "linux"))]
        {
            let _ = abstract_name;
            return Err(Errno::Notsup);
        }
    }
    SockAddr::unix(name).map_err(|e| errno::from_io(&e))
}

/// Maps a wire (level, name) pair onto this kernel's constants. Only
/// `SOL_SOCKET` options are part of the contract.
fn native_option(level: i32, name: i32) -> Result<(i32, i32), Errno> {
    if level != sockopt::SOL_SOCKET {
        return Err(Errno::Noprotoopt);
    }
    let native = match name {
        sockopt::SO_REUSEADDR => libc::SO_REUSEADDR,
        sockopt::SO_ERROR => libc::SO_ERROR,
        sockopt::SO_BROADCAST => libc::SO_BROADCAST,
        sockopt::SO_LINGER => libc::SO_LINGER,
        sockopt::SO_RCVTIMEO => libc::SO_RCVTIMEO,
        sockopt::SO_SNDTIMEO => libc::SO_SNDTIMEO,
        #[cfg(target_os = "linux")]
        sockopt::SO_BINDTODEVICE => libc::SO_BINDTODEVICE,
        _ => return Err(Errno::Noprotoopt),
    };
    Ok((libc::SOL_SOCKET, native))
}

/// The 16-byte seconds+microseconds pair carried by time-value options.
fn decode_timepair(value: &[u8]) -> Result<(i64, i64), Errno> {
    let value: [u8; 16] = value.try_into().map_err(|_| Errno::Inval)?;
    let secs = i64::from_le_bytes(value[..8].try_into().unwrap());
    let usec = i64::from_le_bytes(value[8..].try_into().unwrap());
    Ok((secs, usec))
}

fn getsockopt_int(sock: &Socket, level: i32, name: i32) -> Result<i32, Errno> {
    use std::os::fd::AsRawFd;
    let mut value: libc::c_int = 0;
    let mut len = std::mem::size_of::<libc::c_int>() as libc::socklen_t;
    let rc = unsafe {
        libc::getsockopt(
            sock.as_raw_fd(),
            level,
            name,
            (&raw mut value).cast(),
            &mut len,
        )
    };
    if rc == -1 {
        return Err(errno::from_io(&io::Error::last_os_error()));
    }
    Ok(value)
}

fn setsockopt_raw<T>(sock: &Socket, level: i32, name: i32, value: &T) -> Result<(), Errno> {
    use std::os::fd::AsRawFd;
    let rc = unsafe {
        libc::setsockopt(
            sock.as_raw_fd(),
            level,
            name,
            (value as *const T).cast(),
            std::mem::size_of::<T>() as libc::socklen_t,
        )
    };
    if rc == -1 {
        return Err(errno::from_io(&io::Error::last_os_error()));
    }
    Ok(())
}

fn setsockopt_bytes(sock: &Socket, level: i32, name: i32, value: &[u8]) -> Result<(), Errno> {
    use std::os::fd::AsRawFd;
    let rc = unsafe {
        libc::setsockopt(
            sock.as_raw_fd(),
            level,
            name,
            value.as_ptr().cast(),
            value.len() as libc::socklen_t,
        )
    };
    if rc == -1 {
        return Err(errno::from_io(&io::Error::last_os_error()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn af_mapping_is_stable_and_host_valued() {
        assert_eq!(host_af_family(WASI_AF_INET), libc::AF_INET);
        assert_eq!(host_af_family(WASI_AF_INET6), libc::AF_INET6);
        assert_eq!(host_af_family(WASI_AF_UNIX), libc::AF_UNIX);
        // Stability: same input, same output.
        assert_eq!(host_af_family(WASI_AF_INET6), host_af_family(WASI_AF_INET6));
    }

    #[test]
    fn remap_prefers_longest_guest_prefix() {
        let net = Netstack::builder()
            .fs_prefix("/host", "/test")
            .fs_prefix("/host/nested", "/test/deep")
            .build();
        assert_eq!(net.remap("/test/socket"), "/host/socket");
        assert_eq!(net.remap("/test/deep/socket"), "/host/nested/socket");
        assert_eq!(net.remap("/other/socket"), "/other/socket");
    }

    #[test]
    fn missing_descriptor_reports_io() {
        let net = Netstack::unrestricted();
        assert_eq!(net.listen(12345, 64), Err(Errno::Io));
        assert_eq!(net.local_addr(-1).unwrap_err(), Errno::Io);
    }

    #[test]
    fn open_rejects_unknown_families_and_types() {
        let net = Netstack::unrestricted();
        assert_eq!(net.open(9999, 1, 0), Err(Errno::Notsup));
        assert_eq!(net.open(libc::AF_INET, 77, 0), Err(Errno::Inval));
    }

    #[test]
    fn policy_denies_before_touching_the_kernel() {
        let net = Netstack::builder().build();
        let fd = net.open(libc::AF_INET, sockopt::SOCK_STREAM as i32, 0).unwrap() as i32;
        let addr = SocketAddress::V4 {
            port: 0,
            ip: [127, 0, 0, 1],
        }
        .encode(&host_af_table(), sockopt::SOCK_STREAM)
        .unwrap();
        assert_eq!(net.bind(fd, &addr), Err(Errno::Acces));
        assert_eq!(net.connect(fd, &addr), Err(Errno::Acces));
    }

    #[test]
    fn allow_list_admits_matching_prefixes() {
        let net = Netstack::builder()
            .allow("127.0.0.0/8".parse().unwrap())
            .build();
        let fd = net.open(libc::AF_INET, sockopt::SOCK_STREAM as i32, 0).unwrap() as i32;
        let addr = SocketAddress::V4 {
            port: 0,
            ip: [127, 0, 0, 1],
        }
        .encode(&host_af_table(), sockopt::SOCK_STREAM)
        .unwrap();
        assert_eq!(net.bind(fd, &addr), Ok(()));
    }

    #[test]
    fn option_shapes_are_validated() {
        let net = Netstack::unrestricted();
        let fd = net.open(libc::AF_INET, sockopt::SOCK_DGRAM as i32, 0).unwrap() as i32;
        // Unknown level and unknown name are refused.
        assert_eq!(
            net.set_socket_option(fd, 99, sockopt::SO_REUSEADDR, &1i32.to_le_bytes()),
            Err(Errno::Noprotoopt)
        );
        assert_eq!(
            net.set_socket_option(fd, sockopt::SOL_SOCKET, 9999, &1i32.to_le_bytes()),
            Err(Errno::Noprotoopt)
        );
        // Wrong payload sizes are invalid.
        assert_eq!(
            net.set_socket_option(fd, sockopt::SOL_SOCKET, sockopt::SO_REUSEADDR, &[1, 2]),
            Err(Errno::Inval)
        );
        assert_eq!(
            net.set_socket_option(fd, sockopt::SOL_SOCKET, sockopt::SO_RCVTIMEO, &[0; 4]),
            Err(Errno::Inval)
        );
        // And the happy paths reach the kernel.
        net.set_socket_option(fd, sockopt::SOL_SOCKET, sockopt::SO_REUSEADDR, &1i32.to_le_bytes())
            .unwrap();
        let mut pair = [0u8; 16];
        pair[..8].copy_from_slice(&1i64.to_le_bytes());
        net.set_socket_option(fd, sockopt::SOL_SOCKET, sockopt::SO_RCVTIMEO, &pair)
            .unwrap();
        assert_eq!(
            net.get_socket_option(fd, sockopt::SOL_SOCKET, sockopt::SO_REUSEADDR)
                .unwrap(),
            1
        );
    }

    #[test]
    fn shutdown_both_closes_the_descriptor() {
        let net = Netstack::unrestricted();
        let fd = net.open(libc::AF_INET, sockopt::SOCK_DGRAM as i32, 0).unwrap() as i32;
        net.shutdown(fd, ShutdownHow::Both as i32).unwrap();
        assert_eq!(net.local_addr(fd).unwrap_err(), Errno::Io);
        // Double-close is indistinguishable from any other missing fd.
        assert_eq!(net.shutdown(fd, ShutdownHow::Both as i32), Err(Errno::Io));
    }

    #[test]
    fn so_error_is_reported_in_abi_space() {
        let net = Netstack::unrestricted();
        let fd = net.open(libc::AF_INET, sockopt::SOCK_STREAM as i32, 0).unwrap() as i32;
        let value = net
            .get_socket_option(fd, sockopt::SOL_SOCKET, sockopt::SO_ERROR)
            .unwrap();
        assert_eq!(value, Errno::Success.to_wire() as i32);
    }
}
