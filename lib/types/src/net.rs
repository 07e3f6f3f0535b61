use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::sockopt;

#[derive(Debug, Error)]
#[error("unsupported network: {0}")]
pub struct NetworkParseError(String);

/// Which IP versions a network name admits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpScope {
    V4Only,
    V6Only,
    Any,
}

/// The network names accepted by the guest dial/listen entry points. The
/// strings also cross the ABI verbatim in `sock_getaddrip` and
/// `sock_getaddrport`, so parsing and printing must agree on both sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Network {
    Tcp,
    Tcp4,
    Tcp6,
    Udp,
    Udp4,
    Udp6,
    Unix,
    Unixgram,
    Unixpacket,
    Ip,
    Ip4,
    Ip6,
}

impl Network {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tcp => "tcp",
            Self::Tcp4 => "tcp4",
            Self::Tcp6 => "tcp6",
            Self::Udp => "udp",
            Self::Udp4 => "udp4",
            Self::Udp6 => "udp6",
            Self::Unix => "unix",
            Self::Unixgram => "unixgram",
            Self::Unixpacket => "unixpacket",
            Self::Ip => "ip",
            Self::Ip4 => "ip4",
            Self::Ip6 => "ip6",
        }
    }

    /// Wire socket type for the network.
    pub fn sotype(self) -> u16 {
        match self {
            Self::Tcp | Self::Tcp4 | Self::Tcp6 | Self::Unix => sockopt::SOCK_STREAM,
            Self::Udp | Self::Udp4 | Self::Udp6 | Self::Unixgram => sockopt::SOCK_DGRAM,
            Self::Unixpacket => sockopt::SOCK_SEQPACKET,
            Self::Ip | Self::Ip4 | Self::Ip6 => sockopt::SOCK_RAW,
        }
    }

    pub fn is_unix(self) -> bool {
        matches!(self, Self::Unix | Self::Unixgram | Self::Unixpacket)
    }

    pub fn is_stream(self) -> bool {
        self.sotype() == sockopt::SOCK_STREAM
    }

    pub fn is_datagram(self) -> bool {
        self.sotype() == sockopt::SOCK_DGRAM
    }

    /// Address family constraint. A `tcp6` dial must reject a v4 literal at
    /// this step, never silently upgrade it.
    pub fn ip_scope(self) -> IpScope {
        match self {
            Self::Tcp4 | Self::Udp4 | Self::Ip4 => IpScope::V4Only,
            Self::Tcp6 | Self::Udp6 | Self::Ip6 => IpScope::V6Only,
            _ => IpScope::Any,
        }
    }

    /// The canonical name cached addresses report: `tcp4` and `tcp6`
    /// collapse to `tcp`, and so on.
    pub fn base(self) -> Network {
        match self {
            Self::Tcp | Self::Tcp4 | Self::Tcp6 => Self::Tcp,
            Self::Udp | Self::Udp4 | Self::Udp6 => Self::Udp,
            Self::Ip | Self::Ip4 | Self::Ip6 => Self::Ip,
            other => other,
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = NetworkParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tcp" => Ok(Self::Tcp),
            "tcp4" => Ok(Self::Tcp4),
            "tcp6" => Ok(Self::Tcp6),
            "udp" => Ok(Self::Udp),
            "udp4" => Ok(Self::Udp4),
            "udp6" => Ok(Self::Udp6),
            "unix" => Ok(Self::Unix),
            "unixgram" => Ok(Self::Unixgram),
            "unixpacket" => Ok(Self::Unixpacket),
            "ip" => Ok(Self::Ip),
            "ip4" => Ok(Self::Ip4),
            "ip6" => Ok(Self::Ip6),
            other => Err(NetworkParseError(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_display_round_trip() {
        for name in [
            "tcp",
            "tcp4",
            "tcp6",
            "udp",
            "udp4",
            "udp6",
            "unix",
            "unixgram",
            "unixpacket",
            "ip",
            "ip4",
            "ip6",
        ] {
            let net: Network = name.parse().unwrap();
            assert_eq!(net.to_string(), name);
        }
        assert!("sctp".parse::<Network>().is_err());
        assert!("".parse::<Network>().is_err());
    }

    #[test]
    fn derived_properties() {
        assert_eq!(Network::Tcp6.sotype(), sockopt::SOCK_STREAM);
        assert_eq!(Network::Unixgram.sotype(), sockopt::SOCK_DGRAM);
        assert_eq!(Network::Unixpacket.sotype(), sockopt::SOCK_SEQPACKET);
        assert_eq!(Network::Ip4.sotype(), sockopt::SOCK_RAW);
        assert_eq!(Network::Tcp4.ip_scope(), IpScope::V4Only);
        assert_eq!(Network::Udp6.ip_scope(), IpScope::V6Only);
        assert_eq!(Network::Tcp.ip_scope(), IpScope::Any);
        assert_eq!(Network::Udp4.base(), Network::Udp);
        assert_eq!(Network::Unixgram.base(), Network::Unixgram);
        assert!(Network::Unix.is_unix() && Network::Unix.is_stream());
    }
}
