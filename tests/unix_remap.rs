//! Unix socket path remapping: the guest dials the path it knows, the
//! host rewrites it through the FS-prefix table to where the socket
//! actually lives. Separate binary: the remap must be installed before the
//! process's first network operation.

use std::io::{Read, Write};
use std::os::unix::net::UnixListener;
use std::thread;

use rand::RngCore;
use sha2::{Digest, Sha256};
use wasinet_guest::dial;
use wasinet_host::Netstack;

#[test]
fn guest_paths_are_rewritten_on_connect() {
    let dir = tempfile::tempdir().expect("tempdir");
    let host_path = dir.path().join("socket");

    wasinet_guest::native::install(
        Netstack::builder()
            .unrestricted()
            .fs_prefix(dir.path().to_string_lossy(), "/test")
            .build(),
    )
    .ok()
    .expect("install before first use");

    let listener = UnixListener::bind(&host_path).expect("bind unix listener");
    let server = thread::spawn(move || {
        let (mut stream, _) = listener.accept().expect("accept");
        let mut hasher = Sha256::new();
        let mut chunk = [0u8; 256];
        loop {
            let n = stream.read(&mut chunk).expect("server read");
            if n == 0 {
                break;
            }
            hasher.update(&chunk[..n]);
        }
        hasher.finalize()
    });

    let mut payload = vec![0u8; 1024];
    rand::rng().fill_bytes(&mut payload);
    let sent_digest = Sha256::digest(&payload);

    // The guest only ever sees the /test prefix.
    let mut conn = dial("unix", "/test/socket").expect("dial remapped path");
    conn.write_all(&payload).expect("write");
    conn.close_write().expect("close write");

    assert_eq!(server.join().unwrap(), sent_digest);
}
