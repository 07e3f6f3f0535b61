use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use wasinet_types::{Errno, IpScope, Network};

use crate::addr::NetAddr;
use crate::error::{Op, OpError};
use crate::syscall;

/// Resolves a dial/listen address to an ordered candidate list.
///
/// Unix networks resolve to the path itself. For IP networks the address
/// splits into host and service; numeric services and literal IPs bypass
/// the ABI resolver calls entirely. Empty hosts follow the conventional
/// defaults: wildcard for listen, loopback for dial.
pub(crate) fn lookup_addr(op: Op, net: Network, address: &str) -> Result<Vec<NetAddr>, OpError> {
    if net.is_unix() {
        return Ok(vec![NetAddr::unix(net, address)]);
    }

    let unresolved = |errno| OpError::new(op, net, address, errno);

    let (host, service) = split_host_port(address).map_err(unresolved)?;
    let port = resolve_port(net, &service).map_err(unresolved)?;
    let ips = resolve_ips(op, net, &host).map_err(unresolved)?;
    Ok(ips
        .into_iter()
        .map(|ip| NetAddr::ip(net, SocketAddr::new(ip, port)))
        .collect())
}

/// Splits `host:port`, tolerating the bracketed IPv6 form and the empty
/// address (which resolves to port 0 on the family default host).
fn split_host_port(address: &str) -> Result<(String, String), Errno> {
    if address.is_empty() {
        return Ok((String::new(), "0".to_string()));
    }
    let (host, port) = address.rsplit_once(':').ok_or(Errno::Inval)?;
    let host = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host);
    Ok((host.to_string(), port.to_string()))
}

fn resolve_port(net: Network, service: &str) -> Result<u16, Errno> {
    if let Ok(port) = service.parse::<u16>() {
        return Ok(port);
    }
    syscall::resolve_port(net.as_str(), service)
}

fn resolve_ips(op: Op, net: Network, host: &str) -> Result<Vec<IpAddr>, Errno> {
    let scope = net.ip_scope();

    if host.is_empty() {
        let ip = match (op, scope) {
            // Empty + listen binds the family's any-address; empty + dial
            // targets loopback.
            (Op::Listen, IpScope::V6Only) => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
            (Op::Listen, _) => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            (_, IpScope::V6Only) => IpAddr::V6(Ipv6Addr::LOCALHOST),
            (_, _) => IpAddr::V4(Ipv4Addr::LOCALHOST),
        };
        return Ok(vec![ip]);
    }

    if let Ok(ip) = host.parse::<IpAddr>() {
        let ip = ip.to_canonical();
        if !in_scope(ip, scope) {
            return Err(Errno::Inval);
        }
        return Ok(vec![ip]);
    }

    let ips: Vec<IpAddr> = syscall::resolve_ip(net.as_str(), host)?
        .into_iter()
        .map(|octets| IpAddr::from(Ipv6Addr::from(octets)).to_canonical())
        .filter(|ip| in_scope(*ip, scope))
        .collect();
    if ips.is_empty() {
        return Err(Errno::Inval);
    }
    Ok(ips)
}

fn in_scope(ip: IpAddr, scope: IpScope) -> bool {
    match scope {
        IpScope::V4Only => ip.is_ipv4(),
        IpScope::V6Only => ip.is_ipv6(),
        IpScope::Any => true,
    }
}
