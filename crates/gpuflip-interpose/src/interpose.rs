//! dyld interposing table.
//!
//! Load with `DYLD_INSERT_LIBRARIES=libgpuflip_interpose.dylib`. dyld rebinds every other image's
//! references to the `original` functions below to the matching `replacement`.

use core::ffi::c_void;
use std::sync::OnceLock;

use gpuflip::Fuzzer;

use crate::driver::{CallMethodArgs, KernReturn, MachPort};
use crate::hooks::Interceptor;
use crate::native::{self, NativeDriver};
use crate::raw_memory::RawBufferMemory;
use crate::{logging, selected_profile};

static INTERCEPTOR: OnceLock<Interceptor<NativeDriver>> = OnceLock::new();

fn interceptor() -> &'static Interceptor<NativeDriver> {
    INTERCEPTOR.get_or_init(|| {
        logging::init();
        let profile = selected_profile();
        tracing::info!(
            profile = profile.name,
            action = ?profile.action,
            "gpuflip loaded"
        );
        // SAFETY: the engine only touches buffers the driver reported at registration.
        let mem = unsafe { RawBufferMemory::new() };
        Interceptor::new(NativeDriver, Fuzzer::with_profile(profile), mem)
    })
}

unsafe extern "C" fn hooked_io_accel_resource_create(
    accelerator: *mut c_void,
    args: *mut c_void,
    size: usize,
) -> *mut c_void {
    unsafe { interceptor().accel_resource_create(accelerator, args, size) }
}

unsafe extern "C" fn hooked_io_gpu_resource_create(
    device: *mut c_void,
    args: *mut c_void,
    size: usize,
) -> *mut c_void {
    unsafe { interceptor().gpu_resource_create(device, args, size) }
}

#[allow(clippy::too_many_arguments)]
unsafe extern "C" fn hooked_io_connect_call_method(
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
) -> KernReturn {
    let args = CallMethodArgs {
        connection,
        selector,
        input,
        input_cnt,
        input_struct,
        input_struct_cnt,
        output,
        output_cnt,
        output_struct,
        output_struct_cnt,
    };
    unsafe { interceptor().connect_call_method(&args) }
}

#[repr(C)]
struct Interpose {
    replacement: *const c_void,
    original: *const c_void,
}

// SAFETY: read-only function addresses, consumed by dyld.
unsafe impl Sync for Interpose {}

#[used]
#[link_section = "__DATA,__interpose"]
static INTERPOSERS: [Interpose; 3] = [
    Interpose {
        replacement: hooked_io_connect_call_method as *const c_void,
        original: native::IOConnectCallMethod as *const c_void,
    },
    Interpose {
        replacement: hooked_io_accel_resource_create as *const c_void,
        original: native::IOAccelResourceCreate as *const c_void,
    },
    Interpose {
        replacement: hooked_io_gpu_resource_create as *const c_void,
        original: native::IOGPUResourceCreate as *const c_void,
    },
];
