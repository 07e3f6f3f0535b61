//! Umbrella crate for the wasinet workspace.
//!
//! Re-exports the three halves of the shim so integration tests and
//! downstream experiments can depend on a single package:
//!
//! - [`types`] — the `wasinet_v0` wire contract shared by guest and host.
//! - [`guest`] — the library linked inside a `wasm32-wasip1` module.
//! - [`host`] — the library linked into the WASM embedder.

pub use wasinet_guest as guest;
pub use wasinet_host as host;
pub use wasinet_types as types;
