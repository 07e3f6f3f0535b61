use std::time::Instant;

use wasinet_types::{Errno, Network};
use wasinet_types::sockopt::ShutdownHow;

use crate::addr::{self, NetAddr};
use crate::error::{Op, OpError};
use crate::fd::SocketFd;
use crate::resolver;
use crate::syscall;

/// Creates an unconnected packet connection bound on `address`.
pub fn listen_packet(network: &str, address: &str) -> Result<PacketConn, OpError> {
    let net = network
        .parse::<Network>()
        .ok()
        .filter(|net| net.is_datagram())
        .ok_or_else(|| OpError::new(Op::Listen, network, address, Errno::Notsup))?;

    let candidates = resolver::lookup_addr(Op::Listen, net, address)?;
    let bind_addr = &candidates[0];
    let wrap = |errno| OpError::new(Op::Listen, net, bind_addr, errno);

    let af = addr::af_table();
    let family = match bind_addr {
        NetAddr::Unix { .. } => af.unix,
        NetAddr::Ip { addr, .. } if addr.is_ipv4() => af.inet,
        NetAddr::Ip { .. } => af.inet6,
    };
    let fd = SocketFd::new(syscall::socket(family, net.sotype(), 0).map_err(wrap)?);
    syscall::bind(fd.raw().map_err(wrap)?, &addr::encode(bind_addr).map_err(wrap)?)
        .map_err(wrap)?;
    let laddr = fd
        .local_addr()
        .and_then(|raw| addr::decode(net, &raw))
        .map_err(wrap)?;
    Ok(PacketConn {
        fd,
        net,
        laddr,
        peer: None,
        read_deadline: None,
        write_deadline: None,
    })
}

/// A datagram connection. Unconnected, every message carries its own peer
/// address; connected (via dial), a default peer backs the plain
/// read/write calls.
pub struct PacketConn {
    fd: SocketFd,
    net: Network,
    laddr: NetAddr,
    peer: Option<NetAddr>,
    read_deadline: Option<Instant>,
    write_deadline: Option<Instant>,
}

impl PacketConn {
    pub(crate) fn connected(fd: SocketFd, net: Network, laddr: NetAddr, raddr: NetAddr) -> Self {
        Self {
            fd,
            net,
            laddr,
            peer: Some(raddr),
            read_deadline: None,
            write_deadline: None,
        }
    }

    pub fn local_addr(&self) -> &NetAddr {
        &self.laddr
    }

    /// The default peer; absent on an unconnected connection.
    pub fn peer_addr(&self) -> Option<&NetAddr> {
        self.peer.as_ref()
    }

    pub fn set_deadline(&mut self, deadline: Option<Instant>) {
        self.read_deadline = deadline;
        self.write_deadline = deadline;
    }

    pub fn set_read_deadline(&mut self, deadline: Option<Instant>) {
        self.read_deadline = deadline;
    }

    pub fn set_write_deadline(&mut self, deadline: Option<Instant>) {
        self.write_deadline = deadline;
    }

    /// Receives one message. A zero-length result with a clean status is
    /// the EOF signal (a shut-down socket), surfaced as `Ok(0, ..)`.
    pub fn read_from(&self, buf: &mut [u8]) -> Result<(usize, NetAddr), OpError> {
        let (n, raw) = self
            .fd
            .recv(buf, 0, self.read_deadline)
            .map_err(|errno| OpError::new(Op::Read, self.net, &self.laddr, errno))?;
        let peer = addr::decode(self.net, &raw).unwrap_or_else(|_| self.laddr.clone());
        Ok((n, peer))
    }

    /// Sends one message to `peer`. The peer's family must match the local
    /// network; a mismatch fails before any descriptor I/O.
    pub fn write_to(&self, buf: &[u8], peer: &NetAddr) -> Result<usize, OpError> {
        if !family_matches(&self.laddr, peer) {
            return Err(OpError::new(Op::Write, self.net, peer, Errno::Inval));
        }
        let raw = addr::encode(peer)
            .map_err(|errno| OpError::new(Op::Write, self.net, peer, errno))?;
        self.fd
            .send(buf, Some(&raw), 0, self.write_deadline)
            .map_err(|errno| OpError::new(Op::Write, self.net, peer, errno))
    }

    /// Reads with unconnected semantics, dropping the message's peer.
    pub fn read(&self, buf: &mut [u8]) -> Result<usize, OpError> {
        self.read_from(buf).map(|(n, _)| n)
    }

    /// Writes to the default peer; requires a connected connection.
    pub fn write(&self, buf: &[u8]) -> Result<usize, OpError> {
        match &self.peer {
            // Connected sockets send without an explicit destination.
            Some(_) => self
                .fd
                .send(buf, None, 0, self.write_deadline)
                .map_err(|errno| OpError::new(Op::Write, self.net, &self.laddr, errno)),
            None => Err(OpError::new(
                Op::Write,
                self.net,
                &self.laddr,
                Errno::Notconn,
            )),
        }
    }

    pub fn close_read(&self) -> Result<(), OpError> {
        self.fd
            .shutdown(ShutdownHow::Read)
            .map_err(|errno| OpError::new(Op::Read, self.net, &self.laddr, errno))
    }

    pub fn close_write(&self) -> Result<(), OpError> {
        self.fd
            .shutdown(ShutdownHow::Write)
            .map_err(|errno| OpError::new(Op::Write, self.net, &self.laddr, errno))
    }

    /// Releases the descriptor; dropping the connection does the same.
    pub fn close(&self) {
        self.fd.close();
    }
}

/// True when both addresses belong to the same address family (IP version
/// or Unix domain).
fn family_matches(local: &NetAddr, peer: &NetAddr) -> bool {
    match (local, peer) {
        (NetAddr::Ip { addr: local, .. }, NetAddr::Ip { addr: peer, .. }) => {
            local.is_ipv4() == peer.is_ipv4()
        }
        (NetAddr::Unix { .. }, NetAddr::Unix { .. }) => true,
        _ => false,
    }
}
