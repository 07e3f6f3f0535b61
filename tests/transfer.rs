//! Bulk stream transfer: 16 MiB of random bytes from the guest dialer to
//! an OS listener, digest-checked end to end.

use std::io::{Read, Write};
use std::net::TcpListener;
use std::thread;

use rand::RngCore;
use sha2::{Digest, Sha256};
use wasinet_guest::dial;

const PAYLOAD: usize = 16 * 1024 * 1024;

#[test]
fn bulk_transfer_preserves_every_byte() {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().unwrap();

    let server = thread::spawn(move || {
        let (mut stream, _) = listener.accept().expect("accept");
        let mut hasher = Sha256::new();
        let mut chunk = [0u8; 64 * 1024];
        let mut total = 0usize;
        loop {
            let n = stream.read(&mut chunk).expect("server read");
            if n == 0 {
                break;
            }
            hasher.update(&chunk[..n]);
            total += n;
        }
        (total, hasher.finalize())
    });

    let mut payload = vec![0u8; PAYLOAD];
    rand::rng().fill_bytes(&mut payload);
    let sent_digest = Sha256::digest(&payload);

    let mut conn = dial("tcp", &format!("127.0.0.1:{}", addr.port())).expect("dial");
    conn.write_all(&payload).expect("write");
    conn.close_write().expect("close write");

    let (total, received_digest) = server.join().unwrap();
    assert_eq!(total, PAYLOAD);
    assert_eq!(received_digest, sent_digest);
}
