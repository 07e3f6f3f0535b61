//! Host half of the `wasinet_v0` socket ABI.
//!
//! The embedder links this crate and exports [`abi`]'s fourteen functions
//! to the guest module. Each function is a pure delegation shell: it
//! bounds-checks and parses its arguments out of the guest's linear memory
//! (through the [`GuestMemory`](wasinet_types::GuestMemory) view the
//! embedder supplies), hands the semantic operation to a [`Netstack`], and
//! writes the results back. Native error numbers never cross the ABI; they
//! are translated into the wire [`Errno`](wasinet_types::Errno) space by
//! [`errno`].
//!
//! [`Netstack`] owns the kernel sockets behind opaque descriptors and is
//! where policy lives: a CIDR allow-list over IP traffic and a host/guest
//! prefix remap for Unix socket paths.

pub mod abi;
pub mod errno;
pub mod marshal;
mod netstack;
mod resolve;

#[cfg(feature = "wasmer")]
pub mod wasmer;

pub use netstack::{FsPrefix, Netstack, NetstackBuilder, host_af_family, host_af_table};
