//! The fixed numeric spaces the ABI borrows from the Linux ABI: socket
//! option levels and names, shutdown modes and socket types. The guest uses
//! these constants as-is; hosts map them onto their own kernel's values
//! (an identity mapping on Linux).

use crate::Errno;

/// Socket option level.
pub const SOL_SOCKET: i32 = 1;

/// 32-bit integer options.
pub const SO_REUSEADDR: i32 = 2;
pub const SO_ERROR: i32 = 4;
pub const SO_BROADCAST: i32 = 6;

/// Time-value options, encoded as a 16-byte `{secs: i64, usec: i64}` pair.
pub const SO_LINGER: i32 = 13;
pub const SO_RCVTIMEO: i32 = 20;
pub const SO_SNDTIMEO: i32 = 21;

/// UTF-8 string option.
pub const SO_BINDTODEVICE: i32 = 25;

/// Wire socket types (`sotype` in `sock_open` and the address envelope).
pub const SOCK_STREAM: u16 = 1;
pub const SOCK_DGRAM: u16 = 2;
pub const SOCK_RAW: u16 = 3;
pub const SOCK_SEQPACKET: u16 = 5;

/// `sock_shutdown` mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ShutdownHow {
    Read = 0,
    Write = 1,
    Both = 2,
}

impl TryFrom<i32> for ShutdownHow {
    type Error = Errno;

    fn try_from(how: i32) -> Result<Self, Errno> {
        match how {
            0 => Ok(Self::Read),
            1 => Ok(Self::Write),
            2 => Ok(Self::Both),
            _ => Err(Errno::Inval),
        }
    }
}
