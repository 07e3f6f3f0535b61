use std::io;
use std::time::Instant;

use wasinet_types::Network;
use wasinet_types::sockopt::ShutdownHow;

use crate::addr::NetAddr;
use crate::error::{Op, OpError};
use crate::fd::SocketFd;

/// A stream-style connection: sequential reads and writes over one
/// descriptor, with the local and remote addresses resolved once at
/// establishment and cached.
#[derive(Debug)]
pub struct Connection {
    fd: SocketFd,
    net: Network,
    laddr: NetAddr,
    raddr: NetAddr,
    eof: bool,
    read_deadline: Option<Instant>,
    write_deadline: Option<Instant>,
}

impl Connection {
    pub(crate) fn new(fd: SocketFd, net: Network, laddr: NetAddr, raddr: NetAddr) -> Self {
        Self {
            fd,
            net,
            laddr,
            raddr,
            eof: false,
            read_deadline: None,
            write_deadline: None,
        }
    }

    pub fn local_addr(&self) -> &NetAddr {
        &self.laddr
    }

    pub fn peer_addr(&self) -> &NetAddr {
        &self.raddr
    }

    /// Sets both direction deadlines. `None` clears them.
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

    pub fn close_read(&self) -> io::Result<()> {
        self.fd
            .shutdown(ShutdownHow::Read)
            .map_err(|errno| OpError::new(Op::Read, self.net, &self.raddr, errno).into())
    }

    pub fn close_write(&self) -> io::Result<()> {
        self.fd
            .shutdown(ShutdownHow::Write)
            .map_err(|errno| OpError::new(Op::Write, self.net, &self.raddr, errno).into())
    }

    /// Shuts both directions down and releases the descriptor. Dropping
    /// the connection does the same; a second close is a no-op.
    pub fn close(&self) {
        self.fd.close();
    }
}

impl io::Read for Connection {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() || self.eof {
            return Ok(0);
        }
        match self.fd.recv(buf, 0, self.read_deadline) {
            Ok((0, _)) => {
                // A clean zero from the peer is EOF, and it is sticky:
                // every later read reports it again without a syscall.
                self.eof = true;
                Ok(0)
            }
            Ok((n, _)) => Ok(n),
            Err(errno) => Err(OpError::new(Op::Read, self.net, &self.raddr, errno).into()),
        }
    }
}

impl io::Write for Connection {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.fd
            .send(buf, None, 0, self.write_deadline)
            .map_err(|errno| OpError::new(Op::Write, self.net, &self.raddr, errno).into())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
