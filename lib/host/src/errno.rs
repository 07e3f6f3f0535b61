//! Translation between the host's native error numbers and the ABI error
//! space. Both directions live here so the round-trip property
//! (`from_raw_os(to_raw_os(k)) == k`) is enforceable in one place.

use std::io;

use tracing::warn;
use wasinet_types::Errno;

/// Maps a native errno onto the ABI set.
pub fn from_raw_os(code: i32) -> Errno {
    match code {
        0 => Errno::Success,
        libc::EACCES | libc::EPERM => Errno::Acces,
        libc::EAGAIN => Errno::Again,
        libc::ECANCELED => Errno::Canceled,
        libc::ECONNABORTED => Errno::Connaborted,
        libc::ECONNREFUSED => Errno::Connrefused,
        libc::ECONNRESET => Errno::Connreset,
        libc::EFAULT => Errno::Fault,
        libc::EINPROGRESS => Errno::Inprogress,
        libc::EINTR => Errno::Intr,
        libc::EINVAL => Errno::Inval,
        // Closed-pipe and closed-fd conditions collapse to plain I/O
        // failure; the guest cannot do anything smarter with them.
        libc::EIO | libc::EPIPE | libc::EBADF => Errno::Io,
        libc::EISCONN => Errno::Isconn,
        libc::ENOPROTOOPT => Errno::Noprotoopt,
        libc::ENOTCONN => Errno::Notconn,
        libc::EOPNOTSUPP | libc::EAFNOSUPPORT | libc::EPROTONOSUPPORT => Errno::Notsup,
        libc::EPROTOTYPE => Errno::Prototype,
        libc::ETIMEDOUT => Errno::Timedout,
        other => {
            warn!(errno = other, "unmapped native errno");
            Errno::Notrecoverable
        }
    }
}

/// The reverse direction, used when the host needs a native representation
/// of an ABI error (`SO_ERROR` reporting, test harnesses).
pub fn to_raw_os(errno: Errno) -> i32 {
    match errno {
        Errno::Success => 0,
        Errno::Acces => libc::EACCES,
        Errno::Again => libc::EAGAIN,
        Errno::Canceled => libc::ECANCELED,
        Errno::Connaborted => libc::ECONNABORTED,
        Errno::Connrefused => libc::ECONNREFUSED,
        Errno::Connreset => libc::ECONNRESET,
        Errno::Fault => libc::EFAULT,
        Errno::Inprogress => libc::EINPROGRESS,
        Errno::Intr => libc::EINTR,
        Errno::Inval => libc::EINVAL,
        Errno::Io => libc::EIO,
        Errno::Isconn => libc::EISCONN,
        Errno::Noprotoopt => libc::ENOPROTOOPT,
        Errno::Notconn => libc::ENOTCONN,
        Errno::Notrecoverable => libc::ENOTRECOVERABLE,
        Errno::Notsup => libc::EOPNOTSUPP,
        Errno::Prototype => libc::EPROTOTYPE,
        Errno::Timedout => libc::ETIMEDOUT,
    }
}

/// Maps an `io::Error` coming out of the kernel layer onto the ABI set.
pub fn from_io(err: &io::Error) -> Errno {
    if let Some(code) = err.raw_os_error() {
        return from_raw_os(code);
    }
    match err.kind() {
        io::ErrorKind::WouldBlock => Errno::Again,
        io::ErrorKind::Interrupted => Errno::Intr,
        io::ErrorKind::TimedOut => Errno::Timedout,
        io::ErrorKind::ConnectionRefused => Errno::Connrefused,
        io::ErrorKind::ConnectionReset => Errno::Connreset,
        io::ErrorKind::ConnectionAborted => Errno::Connaborted,
        io::ErrorKind::NotConnected => Errno::Notconn,
        io::ErrorKind::PermissionDenied => Errno::Acces,
        io::ErrorKind::InvalidInput => Errno::Inval,
        io::ErrorKind::Unsupported => Errno::Notsup,
        io::ErrorKind::BrokenPipe | io::ErrorKind::UnexpectedEof => Errno::Io,
        kind => {
            warn!(?kind, "collapsing unmapped i/o error");
            Errno::Io
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Errno; 19] = [
        Errno::Success,
        Errno::Acces,
        Errno::Again,
        Errno::Canceled,
        Errno::Connaborted,
        Errno::Connrefused,
        Errno::Connreset,
        Errno::Fault,
        Errno::Inprogress,
        Errno::Intr,
        Errno::Inval,
        Errno::Io,
        Errno::Isconn,
        Errno::Noprotoopt,
        Errno::Notconn,
        Errno::Notrecoverable,
        Errno::Notsup,
        Errno::Prototype,
        Errno::Timedout,
    ];

    #[test]
    fn native_round_trip_is_identity() {
        for errno in ALL {
            assert_eq!(from_raw_os(to_raw_os(errno)), errno, "{errno:?}");
        }
    }

    #[test]
    fn io_errors_with_raw_codes_use_them() {
        let err = io::Error::from_raw_os_error(libc::ECONNREFUSED);
        assert_eq!(from_io(&err), Errno::Connrefused);
        let err = io::Error::from_raw_os_error(libc::EINPROGRESS);
        assert_eq!(from_io(&err), Errno::Inprogress);
    }

    #[test]
    fn synthetic_io_errors_map_by_kind() {
        let err = io::Error::new(io::ErrorKind::TimedOut, "deadline");
        assert_eq!(from_io(&err), Errno::Timedout);
        let err = io::Error::new(io::ErrorKind::WouldBlock, "not ready");
        assert_eq!(from_io(&err), Errno::Again);
        let err = io::Error::new(io::ErrorKind::BrokenPipe, "closed");
        assert_eq!(from_io(&err), Errno::Io);
    }
}
