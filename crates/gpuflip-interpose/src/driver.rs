//! The real driver entry points the hooks stand in for.

use core::ffi::c_void;

/// `kern_return_t`
pub type KernReturn = i32;
/// `mach_port_t`
pub type MachPort = u32;

pub const KERN_SUCCESS: KernReturn = 0;

/// Arguments of one `IOConnectCallMethod` call, forwarded verbatim.
#[derive(Debug, Clone, Copy)]
pub struct CallMethodArgs {
    pub connection: MachPort,
    pub selector: u32,
    pub input: *const u64,
    pub input_cnt: u32,
    pub input_struct: *const c_void,
    pub input_struct_cnt: usize,
    pub output: *mut u64,
    pub output_cnt: *mut u32,
    pub output_struct: *mut c_void,
    pub output_struct_cnt: *mut usize,
}

/// Designated real implementations of the intercepted calls.
///
/// The hooks always delegate to these and hand their results back untouched; how the hooks got
/// installed in front of them (dyld interposing, a test harness, ...) is irrelevant here.
///
/// # Safety
///
/// Every method has the contract of the native function it names: pointers must be whatever the
/// application passed to the hook, or a resource returned by the matching create call.
pub trait DriverEntryPoints {
    /// `IOAccelResourceCreate`
    unsafe fn accel_resource_create(
        &self,
        accelerator: *mut c_void,
        args: *mut c_void,
        size: usize,
    ) -> *mut c_void;

    /// `IOGPUResourceCreate`
    unsafe fn gpu_resource_create(
        &self,
        device: *mut c_void,
        args: *mut c_void,
        size: usize,
    ) -> *mut c_void;

    /// `IOGPUResourceGetGPUVirtualAddress`
    unsafe fn gpu_resource_gpu_virtual_address(&self, resource: *mut c_void) -> u64;

    /// `IOGPUResourceGetDataBytes`
    unsafe fn gpu_resource_data_bytes(&self, resource: *mut c_void) -> *mut c_void;

    /// `IOGPUResourceGetDataSize`
    unsafe fn gpu_resource_data_size(&self, resource: *mut c_void) -> usize;

    /// `IOConnectCallMethod`
    unsafe fn connect_call_method(&self, args: &CallMethodArgs) -> KernReturn;
}
