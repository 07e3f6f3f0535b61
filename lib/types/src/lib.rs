//! Wire contract of the `wasinet_v0` socket ABI.
//!
//! WASI preview 1 standardizes files, clocks and environment access but not
//! sockets. The wasinet shim closes that gap with a private ABI between a
//! guest runtime (linked into the WASM module) and a host runtime (linked
//! into the embedder). This crate is the half both sides share: the byte
//! layouts, the numeric constant spaces and the error space. Nothing in
//! here performs I/O.
//!
//! The contract, in one paragraph: every socket address crosses the wire as
//! a fixed 128-byte [`RawSocketAddress`] whose `family` field carries the
//! *host's* numeric address family (the guest learns those values through
//! `sock_determine_host_af_family` and caches them in an [`AfTable`]);
//! scatter/gather buffers cross as arrays of 8-byte [`IoVec`] records; and
//! every ABI function returns an [`Errno`] drawn from the WASI preview-1
//! numbering.

mod errno;
mod family;
mod iovec;
mod memory;
mod net;
mod sockaddr;
pub mod sockopt;

pub use errno::Errno;
pub use family::{AfTable, WASI_AF_INET, WASI_AF_INET6, WASI_AF_UNIX, WASI_AF_UNSPEC};
pub use iovec::{GuestVector, IoVec};
pub use memory::{GuestMemory, MemoryAccessError};
pub use net::{IpScope, Network, NetworkParseError};
pub use sockaddr::{AddressError, RawSocketAddress, SocketAddress};

/// Import namespace under which the host exports the ABI functions.
pub const ABI_NAMESPACE: &str = "wasinet_v0";

#[doc(hidden)]
pub mod testing;
