use std::sync::atomic::{AtomicI32, Ordering};
use std::time::{Duration, Instant};

use wasinet_types::sockopt::ShutdownHow;
use wasinet_types::{Errno, RawSocketAddress};

use crate::syscall;

const POLL_INTERVAL: Duration = Duration::from_micros(500);

/// Owns one opaque socket descriptor. The synchronous read/write loops
/// live here: every ABI I/O call is repeated until it yields a definite
/// result, honoring an optional per-operation deadline.
#[derive(Debug)]
pub(crate) struct SocketFd {
    fd: AtomicI32,
}

impl SocketFd {
    pub fn new(fd: i32) -> Self {
        Self {
            fd: AtomicI32::new(fd),
        }
    }

    /// The raw descriptor, or `Io` once closed. Closure is how
    /// cancellation reaches an in-flight loop on another thread.
    pub fn raw(&self) -> Result<i32, Errno> {
        let fd = self.fd.load(Ordering::Acquire);
        if fd < 0 { Err(Errno::Io) } else { Ok(fd) }
    }

    /// Shuts down both directions and releases the descriptor. The first
    /// call wins; closing again is a no-op.
    pub fn close(&self) {
        let fd = self.fd.swap(-1, Ordering::AcqRel);
        if fd >= 0 {
            let _ = syscall::shutdown(fd, ShutdownHow::Both);
        }
    }

    pub fn shutdown(&self, how: ShutdownHow) -> Result<(), Errno> {
        if how == ShutdownHow::Both {
            self.close();
            return Ok(());
        }
        syscall::shutdown(self.raw()?, how)
    }

    pub fn local_addr(&self) -> Result<RawSocketAddress, Errno> {
        syscall::local_addr(self.raw()?)
    }

    pub fn peer_addr(&self) -> Result<RawSocketAddress, Errno> {
        syscall::peer_addr(self.raw()?)
    }

    /// Blocking receive. A clean zero-byte result passes through as
    /// `Ok(0)` — that is the stream EOF signal, distinct from `Again`
    /// (which is retried here and never escapes).
    pub fn recv(
        &self,
        buf: &mut [u8],
        flags: i32,
        deadline: Option<Instant>,
    ) -> Result<(usize, RawSocketAddress), Errno> {
        retry(deadline, || {
            let (n, peer, _oflags) = syscall::recv_from(self.raw()?, buf, flags)?;
            Ok((n, peer))
        })
    }

    /// Blocking send.
    pub fn send(
        &self,
        buf: &[u8],
        peer: Option<&RawSocketAddress>,
        flags: i32,
        deadline: Option<Instant>,
    ) -> Result<usize, Errno> {
        retry(deadline, || syscall::send_to(self.raw()?, buf, peer, flags))
    }
}

impl Drop for SocketFd {
    fn drop(&mut self) {
        self.close();
    }
}

/// Drives `op` to a definite result: transient `Again`/`Intr` results are
/// retried (with a short sleep) until success, a real error, or deadline
/// expiry, which reports `Timedout`.
pub(crate) fn retry<T>(
    deadline: Option<Instant>,
    mut op: impl FnMut() -> Result<T, Errno>,
) -> Result<T, Errno> {
    loop {
        match op() {
            Err(errno) if matches!(errno, Errno::Again | Errno::Intr) => {
                if let Some(deadline) = deadline
                    && Instant::now() >= deadline
                {
                    return Err(Errno::Timedout);
                }
                std::thread::sleep(POLL_INTERVAL);
            }
            other => return other,
        }
    }
}
