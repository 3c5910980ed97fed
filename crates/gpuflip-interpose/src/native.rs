//! IOKit / IOAccelerator / IOGPU bindings.

use core::ffi::c_void;

use crate::driver::{CallMethodArgs, DriverEntryPoints, KernReturn, MachPort};

#[link(name = "IOKit", kind = "framework")]
extern "C" {
    pub fn IOConnectCallMethod(
        connection: MachPort,
        selector: u32,
        input: *const u64,
        input_cnt: u32,
        input_struct: *const c_void,
        input_struct_cnt: usize,
        output: *mut u64,
        output_cnt: *mut u32,
        output_struct: *mut c_void,
        output_struct_cnt: *mut usize,
    ) -> KernReturn;
}

#[link(name = "IOAccelerator", kind = "framework")]
extern "C" {
    pub fn IOAccelResourceCreate(
        accelerator: *mut c_void,
        args: *mut c_void,
        size: usize,
    ) -> *mut c_void;
}

// Apple silicon and iOS.
#[link(name = "IOGPU", kind = "framework")]
extern "C" {
    pub fn IOGPUResourceCreate(device: *mut c_void, args: *mut c_void, size: usize)
        -> *mut c_void;
    pub fn IOGPUResourceGetGPUVirtualAddress(resource: *mut c_void) -> u64;
    pub fn IOGPUResourceGetDataBytes(resource: *mut c_void) -> *mut c_void;
    pub fn IOGPUResourceGetDataSize(resource: *mut c_void) -> usize;
}

/// The system's own implementations.
///
/// Calls made from inside the interposing image are not redirected by dyld, so these reach the
/// real functions even while the hooks are installed.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeDriver;

impl DriverEntryPoints for NativeDriver {
    unsafe fn accel_resource_create(
        &self,
        accelerator: *mut c_void,
        args: *mut c_void,
        size: usize,
    ) -> *mut c_void {
        unsafe { IOAccelResourceCreate(accelerator, args, size) }
    }

    unsafe fn gpu_resource_create(
        &self,
        device: *mut c_void,
        args: *mut c_void,
        size: usize,
    ) -> *mut c_void {
        unsafe { IOGPUResourceCreate(device, args, size) }
    }

    unsafe fn gpu_resource_gpu_virtual_address(&self, resource: *mut c_void) -> u64 {
        unsafe { IOGPUResourceGetGPUVirtualAddress(resource) }
    }

    unsafe fn gpu_resource_data_bytes(&self, resource: *mut c_void) -> *mut c_void {
        unsafe { IOGPUResourceGetDataBytes(resource) }
    }

    unsafe fn gpu_resource_data_size(&self, resource: *mut c_void) -> usize {
        unsafe { IOGPUResourceGetDataSize(resource) }
    }

    unsafe fn connect_call_method(&self, args: &CallMethodArgs) -> KernReturn {
        unsafe {
            IOConnectCallMethod(
                args.connection,
                args.selector,
                args.input,
                args.input_cnt,
                args.input_struct,
                args.input_struct_cnt,
                args.output,
                args.output_cnt,
                args.output_struct,
                args.output_struct_cnt,
            )
        }
    }
}
