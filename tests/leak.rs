//! Descriptor accounting: dial → close on a reachable listener leaves the
//! host table exactly as it found it. Kept in its own binary so no other
//! test's sockets disturb the counts.

use std::net::TcpListener;

use wasinet_guest::dial;

#[test]
fn dial_then_close_frees_the_descriptor() {
    let net = wasinet_guest::native::netstack();
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().unwrap();

    let before = net.descriptor_count();
    let conn = dial("tcp", &format!("127.0.0.1:{}", addr.port())).expect("dial");
    assert_eq!(net.descriptor_count(), before + 1);
    conn.close();
    assert_eq!(net.descriptor_count(), before);
    // Closing again (and the eventual drop) stays a no-op.
    conn.close();
    drop(conn);
    assert_eq!(net.descriptor_count(), before);
}
