//! Name and service resolution on behalf of the guest. The shim does not
//! implement DNS; it delegates to the host's resolver and only moves the
//! request and response across the ABI.

use std::net::{IpAddr, ToSocketAddrs};
use std::sync::Mutex;

use tracing::debug;
use wasinet_types::{Errno, IpScope, Network};

/// Resolves `address` to IP addresses for `network`. Literal IPs bypass
/// resolution entirely. Results are filtered by the network's family
/// constraint; the caller packs them into IPv6-mapped form.
pub fn resolve_ip(network: &str, address: &str) -> Result<Vec<IpAddr>, Errno> {
    let scope = network
        .parse::<Network>()
        .map(Network::ip_scope)
        .map_err(|_| Errno::Inval)?;

    if let Ok(ip) = address.parse::<IpAddr>() {
        if !in_scope(ip, scope) {
            return Err(Errno::Inval);
        }
        return Ok(vec![ip]);
    }

    let resolved = (address, 0u16).to_socket_addrs().map_err(|err| {
        debug!(address, %err, "hostname lookup failed");
        Errno::Inval
    })?;
    let ips: Vec<IpAddr> = resolved
        .map(|sa| sa.ip())
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

/// Resolves a service name to a port. Numeric services bypass resolution;
/// everything else goes through the system services database.
pub fn resolve_port(network: &str, service: &str) -> Result<u16, Errno> {
    if let Ok(port) = service.parse::<u16>() {
        return Ok(port);
    }
    let proto = match network.parse::<Network>() {
        Ok(net) if net.is_datagram() => "udp",
        Ok(_) => "tcp",
        Err(_) => return Err(Errno::Inval),
    };
    getservbyname(service, proto).ok_or(Errno::Inval)
}

// getservbyname hands back a pointer into static storage; serialize the
// call and copy the port out under the lock.
static SERVICES_LOCK: Mutex<()> = Mutex::new(());

fn getservbyname(service: &str, proto: &str) -> Option<u16> {
    use std::ffi::CString;

    let service = CString::new(service).ok()?;
    let proto = CString::new(proto).ok()?;
    let _guard = SERVICES_LOCK.lock().unwrap();
    let entry = unsafe { libc::getservbyname(service.as_ptr(), proto.as_ptr()) };
    if entry.is_null() {
        return None;
    }
    let port = unsafe { (*entry).s_port };
    Some(u16::from_be(port as u16))
}
