//! Import-object registration for the Wasmer engine.
//!
//! This is the only engine-aware code in the crate: a [`GuestMemory`]
//! implementation over Wasmer's `MemoryView` plus the glue that exposes the
//! [`abi`](crate::abi) shells under the `wasinet_v0` namespace. Embedders
//! using a different engine implement the same two pieces against their own
//! memory API.
//!
//! ```ignore
//! let env = FunctionEnv::new(&mut store, WasinetEnv::new(Arc::new(Netstack::unrestricted())));
//! let mut imports = wasinet_host::wasmer::imports(&mut store, &env);
//! // ... merge WASI imports, instantiate ...
//! env.as_mut(&mut store).set_memory(instance.exports.get_memory("memory")?.clone());
//! ```

use std::sync::Arc;

use wasmer::{
    Function, FunctionEnv, FunctionEnvMut, Imports, Memory, MemoryView, Store, imports,
};
use wasinet_types::{Errno, GuestMemory, MemoryAccessError};

use crate::Netstack;
use crate::abi;

/// Shared state for the host functions: the policy/kernel layer plus the
/// guest's exported memory (attached after instantiation).
pub struct WasinetEnv {
    net: Arc<Netstack>,
    memory: Option<Memory>,
}

impl WasinetEnv {
    pub fn new(net: Arc<Netstack>) -> Self {
        Self { net, memory: None }
    }

    /// Attaches the instantiated module's linear memory. Must happen before
    /// the guest performs any network operation.
    pub fn set_memory(&mut self, memory: Memory) {
        self.memory = Some(memory);
    }
}

struct ViewMemory<'a>(MemoryView<'a>);

impl GuestMemory for ViewMemory<'_> {
    fn read(&self, offset: u64, buf: &mut [u8]) -> Result<(), MemoryAccessError> {
        self.0
            .read(offset, buf)
            .map_err(|_| MemoryAccessError::OutOfBounds)
    }

    fn write(&self, offset: u64, data: &[u8]) -> Result<(), MemoryAccessError> {
        self.0
            .write(offset, data)
            .map_err(|_| MemoryAccessError::OutOfBounds)
    }
}

/// Builds the `wasinet_v0` import object.
pub fn imports(store: &mut Store, env: &FunctionEnv<WasinetEnv>) -> Imports {
    imports! {
        "wasinet_v0" => {
            "sock_determine_host_af_family" =>
                Function::new_typed(store, abi::sock_determine_host_af_family),
            "sock_open" => Function::new_typed_with_env(store, env, sock_open),
            "sock_bind" => Function::new_typed_with_env(store, env, sock_bind),
            "sock_connect" => Function::new_typed_with_env(store, env, sock_connect),
            "sock_listen" => Function::new_typed_with_env(store, env, sock_listen),
            "sock_accept" => Function::new_typed_with_env(store, env, sock_accept),
            "sock_getsockopt" => Function::new_typed_with_env(store, env, sock_getsockopt),
            "sock_setsockopt" => Function::new_typed_with_env(store, env, sock_setsockopt),
            "sock_getlocaladdr" => Function::new_typed_with_env(store, env, sock_getlocaladdr),
            "sock_getpeeraddr" => Function::new_typed_with_env(store, env, sock_getpeeraddr),
            "sock_recv_from" => Function::new_typed_with_env(store, env, sock_recv_from),
            "sock_send_to" => Function::new_typed_with_env(store, env, sock_send_to),
            "sock_shutdown" => Function::new_typed_with_env(store, env, sock_shutdown),
            "sock_getaddrip" => Function::new_typed_with_env(store, env, sock_getaddrip),
            "sock_getaddrport" => Function::new_typed_with_env(store, env, sock_getaddrport),
        }
    }
}

/// Runs `op` with a fresh view of the guest memory. A missing memory means
/// the embedder skipped [`WasinetEnv::set_memory`]; surface it as an errno
/// rather than trapping.
fn with_memory<F>(env: &mut FunctionEnvMut<'_, WasinetEnv>, op: F) -> u32
where
    F: FnOnce(&Netstack, &ViewMemory<'_>) -> Errno,
{
    let (data, store) = env.data_and_store_mut();
    let Some(memory) = data.memory.as_ref() else {
        return Errno::Notrecoverable.to_wire();
    };
    let view = ViewMemory(memory.view(&store));
    op(&data.net, &view).to_wire()
}

fn sock_open(
    mut env: FunctionEnvMut<WasinetEnv>,
    family: i32,
    sotype: i32,
    proto: i32,
    fd_out: u32,
) -> u32 {
    with_memory(&mut env, |net, mem| {
        abi::sock_open(net, mem, family, sotype, proto, u64::from(fd_out))
    })
}

fn sock_bind(mut env: FunctionEnvMut<WasinetEnv>, fd: i32, addr: u32, addrlen: u32) -> u32 {
    with_memory(&mut env, |net, mem| {
        abi::sock_bind(net, mem, fd, u64::from(addr), addrlen)
    })
}

fn sock_connect(mut env: FunctionEnvMut<WasinetEnv>, fd: i32, addr: u32, addrlen: u32) -> u32 {
    with_memory(&mut env, |net, mem| {
        abi::sock_connect(net, mem, fd, u64::from(addr), addrlen)
    })
}

fn sock_listen(mut env: FunctionEnvMut<WasinetEnv>, fd: i32, backlog: i32) -> u32 {
    with_memory(&mut env, |net, _| abi::sock_listen(net, fd, backlog))
}

fn sock_accept(mut env: FunctionEnvMut<WasinetEnv>, fd: i32, newfd_out: u32, peer_out: u32) -> u32 {
    with_memory(&mut env, |net, mem| {
        abi::sock_accept(net, mem, fd, u64::from(newfd_out), u64::from(peer_out))
    })
}

fn sock_getsockopt(
    mut env: FunctionEnvMut<WasinetEnv>,
    fd: i32,
    level: i32,
    name: i32,
    value_out: u32,
    valuelen: u32,
) -> u32 {
    with_memory(&mut env, |net, mem| {
        abi::sock_getsockopt(net, mem, fd, level, name, u64::from(value_out), valuelen)
    })
}

fn sock_setsockopt(
    mut env: FunctionEnvMut<WasinetEnv>,
    fd: i32,
    level: i32,
    name: i32,
    value: u32,
    valuelen: u32,
) -> u32 {
    with_memory(&mut env, |net, mem| {
        abi::sock_setsockopt(net, mem, fd, level, name, u64::from(value), valuelen)
    })
}

fn sock_getlocaladdr(mut env: FunctionEnvMut<WasinetEnv>, fd: i32, addr_out: u32) -> u32 {
    with_memory(&mut env, |net, mem| {
        abi::sock_getlocaladdr(net, mem, fd, u64::from(addr_out))
    })
}

fn sock_getpeeraddr(mut env: FunctionEnvMut<WasinetEnv>, fd: i32, addr_out: u32) -> u32 {
    with_memory(&mut env, |net, mem| {
        abi::sock_getpeeraddr(net, mem, fd, u64::from(addr_out))
    })
}

#[allow(clippy::too_many_arguments)]
fn sock_recv_from(
    mut env: FunctionEnvMut<WasinetEnv>,
    fd: i32,
    iovs: u32,
    iovcount: u32,
    oob: u32,
    ooblen: u32,
    iflags: i32,
    peer_out: u32,
    nread_out: u32,
    oflags_out: u32,
) -> u32 {
    with_memory(&mut env, |net, mem| {
        abi::sock_recv_from(
            net,
            mem,
            fd,
            u64::from(iovs),
            iovcount,
            u64::from(oob),
            ooblen,
            iflags,
            u64::from(peer_out),
            u64::from(nread_out),
            u64::from(oflags_out),
        )
    })
}

#[allow(clippy::too_many_arguments)]
fn sock_send_to(
    mut env: FunctionEnvMut<WasinetEnv>,
    fd: i32,
    iovs: u32,
    iovcount: u32,
    oob: u32,
    ooblen: u32,
    peer: u32,
    peerlen: u32,
    flags: i32,
    nwritten_out: u32,
) -> u32 {
    with_memory(&mut env, |net, mem| {
        abi::sock_send_to(
            net,
            mem,
            fd,
            u64::from(iovs),
            iovcount,
            u64::from(oob),
            ooblen,
            u64::from(peer),
            peerlen,
            flags,
            u64::from(nwritten_out),
        )
    })
}

fn sock_shutdown(mut env: FunctionEnvMut<WasinetEnv>, fd: i32, how: i32) -> u32 {
    with_memory(&mut env, |net, _| abi::sock_shutdown(net, fd, how))
}

#[allow(clippy::too_many_arguments)]
fn sock_getaddrip(
    mut env: FunctionEnvMut<WasinetEnv>,
    network: u32,
    networklen: u32,
    address: u32,
    addresslen: u32,
    ipbuf: u32,
    maxresbytes: u32,
    reslen_out: u32,
) -> u32 {
    with_memory(&mut env, |net, mem| {
        abi::sock_getaddrip(
            net,
            mem,
            u64::from(network),
            networklen,
            u64::from(address),
            addresslen,
            u64::from(ipbuf),
            maxresbytes,
            u64::from(reslen_out),
        )
    })
}

fn sock_getaddrport(
    mut env: FunctionEnvMut<WasinetEnv>,
    network: u32,
    networklen: u32,
    service: u32,
    servicelen: u32,
    port_out: u32,
) -> u32 {
    with_memory(&mut env, |net, mem| {
        abi::sock_getaddrport(
            net,
            mem,
            u64::from(network),
            networklen,
            u64::from(service),
            servicelen,
            u64::from(port_out),
        )
    })
}
