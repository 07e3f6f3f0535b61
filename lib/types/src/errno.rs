use std::io;

use num_enum::TryFromPrimitive;
use thiserror::Error;

/// The ABI error space, in WASI preview-1 numbering.
///
/// Only the codes the shim actually produces are represented; anything else
/// arriving off the wire decodes to [`Errno::Notrecoverable`]. Hosts
/// translate their native errnos into this set before returning, guests
/// translate out of it when building `std::io::Error`s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error, TryFromPrimitive)]
#[repr(u16)]
pub enum Errno {
    #[error("success")]
    Success = 0,
    #[error("permission denied")]
    Acces = 2,
    #[error("resource unavailable, try again")]
    Again = 6,
    #[error("operation canceled")]
    Canceled = 11,
    #[error("connection aborted")]
    Connaborted = 13,
    #[error("connection refused")]
    Connrefused = 14,
    #[error("connection reset")]
    Connreset = 15,
    #[error("bad address")]
    Fault = 21,
    #[error("operation in progress")]
    Inprogress = 26,
    #[error("interrupted function")]
    Intr = 27,
    #[error("invalid argument")]
    Inval = 28,
    #[error("i/o error")]
    Io = 29,
    #[error("socket is connected")]
    Isconn = 30,
    #[error("protocol not available")]
    Noprotoopt = 50,
    #[error("the socket is not connected")]
    Notconn = 53,
    #[error("state not recoverable")]
    Notrecoverable = 56,
    #[error("not supported")]
    Notsup = 58,
    #[error("protocol wrong type for socket")]
    Prototype = 66,
    #[error("connection timed out")]
    Timedout = 72,
}

impl Errno {
    /// Decodes the scalar every ABI function returns. Codes outside the
    /// supported set collapse to `Notrecoverable` rather than panicking.
    pub fn from_wire(code: u32) -> Self {
        u16::try_from(code)
            .ok()
            .and_then(|c| Self::try_from(c).ok())
            .unwrap_or(Self::Notrecoverable)
    }

    /// The scalar form carried over the ABI.
    #[inline]
    pub fn to_wire(self) -> u32 {
        self as u16 as u32
    }

    /// Turns an ABI return scalar into a `Result`.
    pub fn check(code: u32) -> Result<(), Errno> {
        match Self::from_wire(code) {
            Self::Success => Ok(()),
            errno => Err(errno),
        }
    }

    /// Errors that mean "not done yet" rather than "failed": the caller is
    /// expected to retry or keep polling.
    #[inline]
    pub fn is_transient(self) -> bool {
        matches!(self, Self::Again | Self::Intr | Self::Inprogress)
    }

    /// Projection onto `std::io::ErrorKind` used when the guest surfaces an
    /// ABI errno through the standard I/O traits.
    pub fn kind(self) -> io::ErrorKind {
        match self {
            Self::Success => io::ErrorKind::Other,
            Self::Acces => io::ErrorKind::PermissionDenied,
            Self::Again => io::ErrorKind::WouldBlock,
            Self::Canceled => io::ErrorKind::Interrupted,
            Self::Connaborted => io::ErrorKind::ConnectionAborted,
            Self::Connrefused => io::ErrorKind::ConnectionRefused,
            Self::Connreset => io::ErrorKind::ConnectionReset,
            Self::Fault => io::ErrorKind::InvalidData,
            Self::Inprogress => io::ErrorKind::WouldBlock,
            Self::Intr => io::ErrorKind::Interrupted,
            Self::Inval => io::ErrorKind::InvalidInput,
            Self::Io => io::ErrorKind::Other,
            Self::Isconn => io::ErrorKind::AlreadyExists,
            Self::Noprotoopt => io::ErrorKind::Unsupported,
            Self::Notconn => io::ErrorKind::NotConnected,
            Self::Notrecoverable => io::ErrorKind::Other,
            Self::Notsup => io::ErrorKind::Unsupported,
            Self::Prototype => io::ErrorKind::InvalidInput,
            Self::Timedout => io::ErrorKind::TimedOut,
        }
    }
}

impl From<Errno> for io::Error {
    fn from(errno: Errno) -> Self {
        io::Error::new(errno.kind(), errno.to_string())
    }
}
