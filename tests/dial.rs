//! Stream dialing through the guest API over the native loopback backend,
//! against plain OS listeners standing in for the outside world.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread;

use wasinet_guest::{Op, dial};
use wasinet_types::Errno;

fn echo_listener() -> (TcpListener, std::net::SocketAddr) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind echo listener");
    let addr = listener.local_addr().unwrap();
    (listener, addr)
}

fn serve_echo_once(listener: TcpListener) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let (mut stream, _) = listener.accept().expect("accept");
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = stream.read(&mut chunk).expect("server read");
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            stream.write_all(&buf).expect("server write");
            buf.clear();
        }
    })
}

#[test]
fn literal_ip_dial_round_trips_bytes() {
    let (listener, addr) = echo_listener();
    let server = serve_echo_once(listener);

    let mut conn = dial("tcp4", &format!("127.0.0.1:{}", addr.port())).expect("dial");
    assert_eq!(conn.local_addr().network().to_string(), "tcp");
    assert_eq!(conn.peer_addr().port(), Some(addr.port()));

    conn.write_all(b"hello world").expect("write");
    let mut got = [0u8; 11];
    conn.read_exact(&mut got).expect("read");
    assert_eq!(&got, b"hello world");

    conn.close_write().expect("close write");
    // The peer shut down: exactly one EOF, and it is sticky.
    let mut rest = [0u8; 16];
    assert_eq!(conn.read(&mut rest).expect("eof"), 0);
    assert_eq!(conn.read(&mut rest).expect("eof again"), 0);

    server.join().unwrap();
}

#[test]
fn hostname_dial_resolves_through_the_abi() {
    let (listener, addr) = echo_listener();
    let server = serve_echo_once(listener);

    let mut conn = dial("tcp", &format!("localhost:{}", addr.port())).expect("dial localhost");
    conn.write_all(b"ping").expect("write");
    let mut got = [0u8; 4];
    conn.read_exact(&mut got).expect("read");
    assert_eq!(&got, b"ping");
    drop(conn);

    server.join().unwrap();
}

#[test]
fn refused_connections_carry_op_net_and_address() {
    // Bind, record the address, close; dialing it must be refused.
    let (listener, addr) = echo_listener();
    drop(listener);
    let target = format!("127.0.0.1:{}", addr.port());

    let err = dial("tcp", &target).expect_err("dial must fail");
    assert_eq!(err.errno, Errno::Connrefused);
    assert_eq!(err.op, Op::Dial);
    assert_eq!(err.net, "tcp");
    assert_eq!(err.addr, target);
    assert_eq!(err.to_string(), format!("dial tcp {target}: connection refused"));
}

#[test]
fn accepting_guest_listener_pairs_with_os_clients() {
    let listener = wasinet_guest::listen("tcp", "127.0.0.1:0").expect("listen");
    let port = listener.local_addr().port().expect("bound port");

    let client = thread::spawn(move || {
        let mut stream = TcpStream::connect(("127.0.0.1", port)).expect("connect");
        stream.write_all(b"from the outside").expect("client write");
        stream.shutdown(std::net::Shutdown::Write).unwrap();
        let mut got = Vec::new();
        stream.read_to_end(&mut got).expect("client read");
        got
    });

    let mut conn = listener.accept().expect("accept");
    assert_eq!(conn.local_addr().port(), Some(port));
    let mut buf = [0u8; 16];
    conn.read_exact(&mut buf).expect("read");
    conn.write_all(&buf).expect("write back");
    drop(conn);

    assert_eq!(client.join().unwrap(), b"from the outside");
}
