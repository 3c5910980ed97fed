//! Interposing shim that feeds the `gpuflip` engine from a live GPU client.
//!
//! Three driver entry points are replaced:
//! - `IOAccelResourceCreate`: the backing store read from the returned handle is registered.
//! - `IOGPUResourceCreate`: the data pointer/size reported by the resource accessors is
//!   registered (for the persistent profile only while the resource has no GPU virtual address).
//! - `IOConnectCallMethod`: the engine is ticked before the call is forwarded.
//!
//! The hooks themselves ([`Interceptor`]) are platform independent and talk to the driver through
//! [`DriverEntryPoints`]; on macOS the `interpose` module installs them with dyld's
//! `__DATA,__interpose` section.
#![warn(unsafe_op_in_unsafe_fn)]

pub mod driver;
pub mod handle;
pub mod hooks;
pub mod logging;
pub mod raw_memory;

#[cfg(target_os = "macos")]
mod interpose;
#[cfg(target_os = "macos")]
pub mod native;

use gpuflip::{FireAction, Profile};

pub use driver::{CallMethodArgs, DriverEntryPoints, KernReturn, MachPort, KERN_SUCCESS};
pub use handle::{accel_resource_extent, ACCEL_RESOURCE_EXTENT_OFFSET};
pub use hooks::Interceptor;
pub use raw_memory::RawBufferMemory;

/// The profile this build was configured for (`single-burst` / `dump-buffers` features).
pub const fn selected_profile() -> Profile {
    let profile = if cfg!(feature = "single-burst") {
        Profile::SINGLE_BURST
    } else {
        Profile::PERSISTENT_CYCLIC
    };
    if cfg!(feature = "dump-buffers") {
        profile.with_action(FireAction::Dump)
    } else {
        profile
    }
}
