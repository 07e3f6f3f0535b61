use thiserror::Error;

use crate::family::AfTable;

/// Total wire size of a socket address, regardless of family.
pub const WIRE_SIZE: usize = 128;
const PAYLOAD_SIZE: usize = WIRE_SIZE - 4;

// Payload offsets for the IP families.
const PORT_END: usize = 4;
const IP4_END: usize = PORT_END + 4;
const IP6_END: usize = PORT_END + 16;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    #[error("unsupported address family: {0}")]
    UnsupportedFamily(u16),
    #[error("address payload does not fit the wire envelope")]
    Oversize,
    #[error("address payload is not valid UTF-8")]
    Malformed,
}

/// A socket address as the rest of the shim reasons about it. Encoding to
/// and decoding from the 128-byte envelope is the only code that touches
/// raw bytes; everybody else matches on this union.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketAddress {
    V4 {
        port: u16,
        ip: [u8; 4],
    },
    V6 {
        port: u16,
        ip: [u8; 16],
        zone: String,
    },
    /// A Unix socket path. The empty name is normalized to `@` on encode to
    /// preserve the Linux abstract-socket convention across the wire.
    Unix {
        name: String,
    },
}

impl SocketAddress {
    /// The host-numeric family this address encodes under.
    pub fn family(&self, af: &AfTable) -> u16 {
        match self {
            Self::V4 { .. } => af.inet,
            Self::V6 { .. } => af.inet6,
            Self::Unix { .. } => af.unix,
        }
    }

    pub fn port(&self) -> Option<u16> {
        match self {
            Self::V4 { port, .. } | Self::V6 { port, .. } => Some(*port),
            Self::Unix { .. } => None,
        }
    }

    /// Encodes into the fixed envelope. `sotype` is advisory and travels in
    /// the header for the receiver's benefit.
    pub fn encode(&self, af: &AfTable, sotype: u16) -> Result<RawSocketAddress, AddressError> {
        let mut raw = RawSocketAddress {
            family: self.family(af),
            sotype,
            payload: [0u8; PAYLOAD_SIZE],
        };
        match self {
            Self::V4 { port, ip } => {
                raw.payload[..PORT_END].copy_from_slice(&u32::from(*port).to_le_bytes());
                raw.payload[PORT_END..IP4_END].copy_from_slice(ip);
            }
            Self::V6 { port, ip, zone } => {
                raw.payload[..PORT_END].copy_from_slice(&u32::from(*port).to_le_bytes());
                raw.payload[PORT_END..IP6_END].copy_from_slice(ip);
                let zone = zone.as_bytes();
                // Room must remain for the NUL terminator.
                if zone.len() >= PAYLOAD_SIZE - IP6_END {
                    return Err(AddressError::Oversize);
                }
                raw.payload[IP6_END..IP6_END + zone.len()].copy_from_slice(zone);
            }
            Self::Unix { name } => {
                let name: &[u8] = if name.is_empty() { b"@" } else { name.as_bytes() };
                if name.len() >= PAYLOAD_SIZE {
                    return Err(AddressError::Oversize);
                }
                raw.payload[..name.len()].copy_from_slice(name);
            }
        }
        Ok(raw)
    }

    /// Decodes an envelope, selecting the payload interpretation purely
    /// from the header family matched against the host AF table.
    pub fn decode(raw: &RawSocketAddress, af: &AfTable) -> Result<Self, AddressError> {
        if raw.family == af.inet {
            let port = u32::from_le_bytes(raw.payload[..PORT_END].try_into().unwrap()) as u16;
            let ip: [u8; 4] = raw.payload[PORT_END..IP4_END].try_into().unwrap();
            Ok(Self::V4 { port, ip })
        } else if raw.family == af.inet6 {
            let port = u32::from_le_bytes(raw.payload[..PORT_END].try_into().unwrap()) as u16;
            let ip: [u8; 16] = raw.payload[PORT_END..IP6_END].try_into().unwrap();
            let zone = read_cstr(&raw.payload[IP6_END..])?;
            Ok(Self::V6 { port, ip, zone })
        } else if raw.family == af.unix {
            let name = read_cstr(&raw.payload)?;
            Ok(Self::Unix { name })
        } else {
            Err(AddressError::UnsupportedFamily(raw.family))
        }
    }
}

fn read_cstr(buf: &[u8]) -> Result<String, AddressError> {
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    String::from_utf8(buf[..end].to_vec()).map_err(|_| AddressError::Malformed)
}

/// The 128-byte wire form: `family` and `sotype` little-endian u16s
/// followed by an opaque, zero-padded payload interpreted per family.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct RawSocketAddress {
    pub family: u16,
    pub sotype: u16,
    pub payload: [u8; PAYLOAD_SIZE],
}

impl RawSocketAddress {
    pub const SIZE: usize = WIRE_SIZE;

    pub fn to_bytes(&self) -> [u8; WIRE_SIZE] {
        let mut buf = [0u8; WIRE_SIZE];
        buf[0..2].copy_from_slice(&self.family.to_le_bytes());
        buf[2..4].copy_from_slice(&self.sotype.to_le_bytes());
        buf[4..].copy_from_slice(&self.payload);
        buf
    }

    pub fn from_bytes(buf: &[u8; WIRE_SIZE]) -> Self {
        Self {
            family: u16::from_le_bytes([buf[0], buf[1]]),
            sotype: u16::from_le_bytes([buf[2], buf[3]]),
            payload: buf[4..].try_into().unwrap(),
        }
    }
}

impl Default for RawSocketAddress {
    fn default() -> Self {
        Self {
            family: 0,
            sotype: 0,
            payload: [0u8; PAYLOAD_SIZE],
        }
    }
}

impl std::fmt::Debug for RawSocketAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawSocketAddress")
            .field("family", &self.family)
            .field("sotype", &self.sotype)
            .finish_non_exhaustive()
    }
}
