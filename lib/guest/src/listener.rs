use wasinet_types::{Errno, Network, sockopt};

use crate::addr::{self, NetAddr};
use crate::conn::Connection;
use crate::error::{Op, OpError};
use crate::fd::{self, SocketFd};
use crate::resolver;
use crate::syscall;

const BACKLOG: i32 = 64;

/// Announces on the local network address and returns a [`Listener`].
pub fn listen(network: &str, address: &str) -> Result<Listener, OpError> {
    let net = network
        .parse::<Network>()
        .ok()
        .filter(|net| net.is_stream())
        .ok_or_else(|| OpError::new(Op::Listen, network, address, Errno::Notsup))?;

    let candidates = resolver::lookup_addr(Op::Listen, net, address)?;
    let bind_addr = &candidates[0];
    listen_addr(net, bind_addr).map_err(|errno| OpError::new(Op::Listen, net, bind_addr, errno))
}

fn listen_addr(net: Network, bind_addr: &NetAddr) -> Result<Listener, Errno> {
    let af = addr::af_table();
    let family = match bind_addr {
        NetAddr::Unix { .. } => af.unix,
        NetAddr::Ip { addr, .. } if addr.is_ipv4() => af.inet,
        NetAddr::Ip { .. } => af.inet6,
    };
    let fd = SocketFd::new(syscall::socket(family, net.sotype(), 0)?);

    // Rebinding a recently closed listen address should not fail; kernels
    // without the option are still usable.
    match syscall::setsockopt_int(fd.raw()?, sockopt::SOL_SOCKET, sockopt::SO_REUSEADDR, 1) {
        Ok(()) | Err(Errno::Inval) | Err(Errno::Noprotoopt) => {}
        Err(errno) => return Err(errno),
    }

    syscall::bind(fd.raw()?, &addr::encode(bind_addr)?)?;
    syscall::listen(fd.raw()?, BACKLOG)?;
    let laddr = addr::decode(net, &fd.local_addr()?)?;
    Ok(Listener { fd, net, laddr })
}

/// A stream descriptor in listening state, yielding [`Connection`]s.
pub struct Listener {
    fd: SocketFd,
    net: Network,
    laddr: NetAddr,
}

impl Listener {
    /// The bound address, resolved once at creation (so an ephemeral port
    /// request reports the concrete port).
    pub fn local_addr(&self) -> &NetAddr {
        &self.laddr
    }

    /// Accepts the next connection, blocking until one arrives. The new
    /// connection carries both endpoint addresses.
    pub fn accept(&self) -> Result<Connection, OpError> {
        let wrap = |errno| OpError::new(Op::Accept, self.net, &self.laddr, errno);
        let (newfd, peer) = fd::retry(None, || syscall::accept(self.fd.raw()?)).map_err(wrap)?;
        let conn_fd = SocketFd::new(newfd);
        let laddr = conn_fd
            .local_addr()
            .and_then(|raw| addr::decode(self.net, &raw))
            .map_err(wrap)?;
        let raddr = addr::decode(self.net, &peer).map_err(wrap)?;
        Ok(Connection::new(conn_fd, self.net, laddr, raddr))
    }

    /// Stops listening and releases the descriptor; also reachable by
    /// dropping the listener.
    pub fn close(&self) {
        self.fd.close();
    }
}
