//! Raw imports of the `wasinet_v0` module. The embedder (see
//! `wasinet-host`) exports the other side; linking against these is the
//! guest's entire installation step.
//!
//! Argument order follows the wire contract: scalars, then
//! (pointer, length) pairs, then out-pointer destinations.

#[link(wasm_import_module = "wasinet_v0")]
unsafe extern "C" {
    pub(crate) fn sock_determine_host_af_family(wasi_af: i32) -> i32;

    pub(crate) fn sock_open(family: i32, sotype: i32, proto: i32, fd_out: *mut u32) -> u32;

    pub(crate) fn sock_bind(fd: i32, addr: *const u8, addrlen: u32) -> u32;

    pub(crate) fn sock_connect(fd: i32, addr: *const u8, addrlen: u32) -> u32;

    pub(crate) fn sock_listen(fd: i32, backlog: i32) -> u32;

    pub(crate) fn sock_accept(fd: i32, newfd_out: *mut u32, peer_out: *mut u8) -> u32;

    pub(crate) fn sock_getsockopt(
        fd: i32,
        level: i32,
        name: i32,
        value_out: *mut u32,
        valuelen: u32,
    ) -> u32;

    pub(crate) fn sock_setsockopt(
        fd: i32,
        level: i32,
        name: i32,
        value: *const u8,
        valuelen: u32,
    ) -> u32;

    pub(crate) fn sock_getlocaladdr(fd: i32, addr_out: *mut u8) -> u32;

    pub(crate) fn sock_getpeeraddr(fd: i32, addr_out: *mut u8) -> u32;

    pub(crate) fn sock_recv_from(
        fd: i32,
        iovs: *const u8,
        iovcount: u32,
        oob: *mut u8,
        ooblen: u32,
        iflags: i32,
        peer_out: *mut u8,
        nread_out: *mut u32,
        oflags_out: *mut u32,
    ) -> u32;

    pub(crate) fn sock_send_to(
        fd: i32,
        iovs: *const u8,
        iovcount: u32,
        oob: *const u8,
        ooblen: u32,
        peer: *const u8,
        peerlen: u32,
        flags: i32,
        nwritten_out: *mut u32,
    ) -> u32;

    pub(crate) fn sock_shutdown(fd: i32, how: i32) -> u32;

    pub(crate) fn sock_getaddrip(
        network: *const u8,
        networklen: u32,
        address: *const u8,
        addresslen: u32,
        ipbuf: *mut u8,
        maxresbytes: u32,
        reslen_out: *mut u32,
    ) -> u32;

    pub(crate) fn sock_getaddrport(
        network: *const u8,
        networklen: u32,
        service: *const u8,
        servicelen: u32,
        port_out: *mut u32,
    ) -> u32;
}
