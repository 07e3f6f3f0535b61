use std::fmt;
use std::io;

use thiserror::Error;
use wasinet_types::Errno;

/// The operation an [`OpError`] is qualified with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Dial,
    Listen,
    Accept,
    Read,
    Write,
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Dial => "dial",
            Self::Listen => "listen",
            Self::Accept => "accept",
            Self::Read => "read",
            Self::Write => "write",
        })
    }
}

/// An operation-qualified network error: which operation failed, on which
/// network, against which address, and why. The display format is the
/// conventional `{op} {net} {address}: {cause}` so existing error matching
/// keeps working.
#[derive(Debug, Error)]
#[error("{op} {net} {addr}: {errno}")]
pub struct OpError {
    pub op: Op,
    pub net: String,
    pub addr: String,
    pub errno: Errno,
}

impl OpError {
    pub fn new(
        op: Op,
        net: impl fmt::Display,
        addr: impl fmt::Display,
        errno: Errno,
    ) -> Self {
        Self {
            op,
            net: net.to_string(),
            addr: addr.to_string(),
            errno,
        }
    }
}

impl From<OpError> for io::Error {
    fn from(err: OpError) -> Self {
        io::Error::new(err.errno.kind(), err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_follows_the_op_net_addr_convention() {
        let err = OpError::new(Op::Dial, "tcp", "127.0.0.1:80", Errno::Connrefused);
        assert_eq!(err.to_string(), "dial tcp 127.0.0.1:80: connection refused");
    }

    #[test]
    fn io_conversion_preserves_the_kind() {
        let err: io::Error = OpError::new(Op::Read, "udp", ":0", Errno::Timedout).into();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
    }
}
