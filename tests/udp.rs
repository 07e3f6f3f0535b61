//! Datagram exchange between a guest packet connection and an OS UDP
//! socket, plus the family gate on `write_to`.

use std::net::UdpSocket;

use wasinet_guest::{NetAddr, listen_packet};
use wasinet_types::{Errno, Network};

#[test]
fn datagram_exchange_reports_the_sender() {
    let pconn = listen_packet("udp4", ":0").expect("listen_packet");
    let port = pconn.local_addr().port().expect("bound port");

    let peer = UdpSocket::bind("127.0.0.1:0").expect("peer bind");
    let peer_port = peer.local_addr().unwrap().port();
    let datagram = [0x5au8; 64];
    peer.send_to(&datagram, ("127.0.0.1", port)).expect("send");

    let mut buf = [0u8; 128];
    let (n, from) = pconn.read_from(&mut buf).expect("read_from");
    assert_eq!(n, 64);
    assert_eq!(&buf[..n], &datagram);
    assert_eq!(from.port(), Some(peer_port));

    // And the reverse direction, through write_to.
    let sent = pconn
        .write_to(b"pong", &from)
        .expect("write_to");
    assert_eq!(sent, 4);
    let mut back = [0u8; 16];
    let (m, _) = peer.recv_from(&mut back).expect("peer recv");
    assert_eq!(&back[..m], b"pong");
}

#[test]
fn write_to_rejects_foreign_families_before_any_io() {
    let pconn = listen_packet("udp4", ":0").expect("listen_packet");
    let v6_peer = NetAddr::ip(Network::Udp, "[::1]:9".parse().unwrap());
    let err = pconn.write_to(b"x", &v6_peer).expect_err("must fail");
    assert_eq!(err.errno, Errno::Inval);

    let unix_peer = NetAddr::unix(Network::Unixgram, "/nowhere");
    let err = pconn.write_to(b"x", &unix_peer).expect_err("must fail");
    assert_eq!(err.errno, Errno::Inval);
}

#[test]
fn connected_packet_conn_uses_the_default_peer() {
    let peer = UdpSocket::bind("127.0.0.1:0").expect("peer bind");
    let peer_port = peer.local_addr().unwrap().port();

    let pconn =
        wasinet_guest::dial_packet("udp4", &format!("127.0.0.1:{peer_port}")).expect("dial");
    assert_eq!(pconn.peer_addr().and_then(NetAddr::port), Some(peer_port));
    pconn.write(b"knock").expect("write");

    let mut buf = [0u8; 16];
    let (n, _) = peer.recv_from(&mut buf).expect("recv");
    assert_eq!(&buf[..n], b"knock");
}

#[test]
fn reads_ride_out_a_not_ready_socket() {
    let pconn = listen_packet("udp4", ":0").expect("listen_packet");
    let port = pconn.local_addr().port().expect("bound port");

    // Nothing in flight yet: the receive loop starts against an empty
    // socket and spins through not-ready results until the late datagram
    // lands. The caller must see the data, never a transient error.
    let sender = std::thread::spawn(move || {
        std::thread::sleep(std::time::Duration::from_millis(50));
        let peer = UdpSocket::bind("127.0.0.1:0").expect("peer bind");
        peer.send_to(b"late arrival", ("127.0.0.1", port)).expect("send");
    });

    let mut buf = [0u8; 32];
    let (n, _) = pconn.read_from(&mut buf).expect("read_from");
    assert_eq!(&buf[..n], b"late arrival");
    sender.join().unwrap();
}

#[test]
fn unconnected_write_requires_a_peer() {
    let pconn = listen_packet("udp4", ":0").expect("listen_packet");
    let err = pconn.write(b"x").expect_err("no default peer");
    assert_eq!(err.errno, Errno::Notconn);
}
