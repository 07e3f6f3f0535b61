use std::fmt;
use std::net::{SocketAddr, SocketAddrV4, SocketAddrV6};

use once_cell::sync::Lazy;
use wasinet_types::{
    AfTable, Errno, Network, RawSocketAddress, SocketAddress, WASI_AF_INET, WASI_AF_INET6,
    WASI_AF_UNIX,
};

use crate::syscall;

// Discovered once before the first network operation, immutable after.
// The guest never assumes the kernel's AF constants equal the WASI ones.
static AF_TABLE: Lazy<AfTable> = Lazy::new(|| AfTable {
    inet: syscall::host_af_family(WASI_AF_INET) as u16,
    inet6: syscall::host_af_family(WASI_AF_INET6) as u16,
    unix: syscall::host_af_family(WASI_AF_UNIX) as u16,
});

pub(crate) fn af_table() -> &'static AfTable {
    &AF_TABLE
}

/// A guest-facing network address: an IP endpoint or a Unix socket path,
/// tagged with the network it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetAddr {
    Ip { net: Network, addr: SocketAddr },
    Unix { net: Network, name: String },
}

impl NetAddr {
    pub fn ip(net: Network, addr: SocketAddr) -> Self {
        Self::Ip { net, addr }
    }

    pub fn unix(net: Network, name: impl Into<String>) -> Self {
        Self::Unix {
            net,
            name: name.into(),
        }
    }

    /// The canonical network name (`tcp4` reports as `tcp`, and so on).
    pub fn network(&self) -> Network {
        match self {
            Self::Ip { net, .. } | Self::Unix { net, .. } => net.base(),
        }
    }

    pub fn socket_addr(&self) -> Option<SocketAddr> {
        match self {
            Self::Ip { addr, .. } => Some(*addr),
            Self::Unix { .. } => None,
        }
    }

    pub fn port(&self) -> Option<u16> {
        self.socket_addr().map(|addr| addr.port())
    }

    pub(crate) fn sotype(&self) -> u16 {
        match self {
            Self::Ip { net, .. } | Self::Unix { net, .. } => net.sotype(),
        }
    }
}

impl fmt::Display for NetAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ip { addr, .. } => addr.fmt(f),
            Self::Unix { name, .. } => f.write_str(name),
        }
    }
}

/// Encodes a guest address into the wire envelope. An IPv4-mapped IPv6
/// address chooses the V4 payload, mirroring the usual `To4` conversion.
pub(crate) fn encode(addr: &NetAddr) -> Result<RawSocketAddress, Errno> {
    let sa = match addr {
        NetAddr::Ip { addr, .. } => match addr {
            SocketAddr::V4(v4) => SocketAddress::V4 {
                port: v4.port(),
                ip: v4.ip().octets(),
            },
            SocketAddr::V6(v6) => match v6.ip().to_ipv4_mapped() {
                Some(v4) => SocketAddress::V4 {
                    port: v6.port(),
                    ip: v4.octets(),
                },
                None => SocketAddress::V6 {
                    port: v6.port(),
                    ip: v6.ip().octets(),
                    zone: if v6.scope_id() == 0 {
                        String::new()
                    } else {
                        v6.scope_id().to_string()
                    },
                },
            },
        },
        NetAddr::Unix { name, .. } => SocketAddress::Unix { name: name.clone() },
    };
    sa.encode(af_table(), addr.sotype()).map_err(|_| Errno::Inval)
}

/// Decodes a wire envelope into a guest address tagged with `net`'s
/// canonical name.
pub(crate) fn decode(net: Network, raw: &RawSocketAddress) -> Result<NetAddr, Errno> {
    let base = net.base();
    match SocketAddress::decode(raw, af_table()).map_err(|_| Errno::Notsup)? {
        SocketAddress::V4 { port, ip } => Ok(NetAddr::Ip {
            net: base,
            addr: SocketAddr::V4(SocketAddrV4::new(ip.into(), port)),
        }),
        SocketAddress::V6 { port, ip, zone } => {
            let scope = zone.parse::<u32>().unwrap_or(0);
            Ok(NetAddr::Ip {
                net: base,
                addr: SocketAddr::V6(SocketAddrV6::new(ip.into(), port, 0, scope)),
            })
        }
        SocketAddress::Unix { name } => Ok(NetAddr::Unix { net: base, name }),
    }
}
