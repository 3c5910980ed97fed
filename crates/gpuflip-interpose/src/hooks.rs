//! Replacement entry points.
//!
//! Each hook calls through to the real implementation and returns its result unmodified; the
//! only things a hook adds are buffer registration (resource creation) and a corruption tick
//! (command submission, before the real call).

use core::ffi::c_void;
use std::sync::{Mutex, MutexGuard, PoisonError};

use gpuflip::{hex_preview, BufferMemory, Fuzzer, SeedSource, WallClockSeed};
use tracing::Level;

use crate::driver::{CallMethodArgs, DriverEntryPoints, KernReturn};
use crate::handle::accel_resource_extent;
use crate::raw_memory::RawBufferMemory;

/// Leading bytes of a freshly registered buffer shown at `debug` level.
const PREVIEW_BYTES: usize = 64;

#[derive(Debug)]
struct HookState<M, S> {
    fuzzer: Fuzzer<S>,
    mem: M,
}

/// Owns the fuzzing state and the real driver the hooks forward to.
///
/// The state lock is never held across a call into the driver, so a hook re-entered from inside
/// the driver does not deadlock.
#[derive(Debug)]
pub struct Interceptor<D, M = RawBufferMemory, S = WallClockSeed> {
    driver: D,
    state: Mutex<HookState<M, S>>,
}

impl<D, M, S> Interceptor<D, M, S>
where
    D: DriverEntryPoints,
    M: BufferMemory,
    S: SeedSource,
{
    pub fn new(driver: D, fuzzer: Fuzzer<S>, mem: M) -> Self {
        Self {
            driver,
            state: Mutex::new(HookState { fuzzer, mem }),
        }
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Run `f` with exclusive access to the fuzzer and buffer memory.
    pub fn with_state<R>(&self, f: impl FnOnce(&mut Fuzzer<S>, &mut M) -> R) -> R {
        let mut state = self.lock();
        let HookState { fuzzer, mem } = &mut *state;
        f(fuzzer, mem)
    }

    fn lock(&self) -> MutexGuard<'_, HookState<M, S>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn track(&self, source: &'static str, start: usize, length: usize) -> bool {
        let mut state = self.lock();
        let HookState { fuzzer, mem } = &mut *state;
        if !fuzzer.register(start, length) {
            return false;
        }

        if tracing::enabled!(Level::DEBUG) {
            let mut head = vec![0u8; length.min(PREVIEW_BYTES)];
            if mem.read(start, &mut head).is_ok() {
                tracing::debug!("{}", hex_preview(source, &head, PREVIEW_BYTES));
            }
        }
        true
    }

    /// `IOAccelResourceCreate` hook.
    ///
    /// # Safety
    ///
    /// Same contract as `IOAccelResourceCreate`.
    pub unsafe fn accel_resource_create(
        &self,
        accelerator: *mut c_void,
        args: *mut c_void,
        size: usize,
    ) -> *mut c_void {
        // SAFETY: forwarded verbatim from the caller.
        let resource = unsafe { self.driver.accel_resource_create(accelerator, args, size) };
        if resource.is_null() {
            return resource;
        }

        // SAFETY: non-null handles returned by `IOAccelResourceCreate` are live resources.
        match unsafe { accel_resource_extent(resource) } {
            Some((start, length)) => {
                tracing::debug!(
                    ?resource,
                    base = format_args!("0x{start:x}"),
                    size = format_args!("0x{length:x}"),
                    "IOAccelResourceCreate"
                );
                self.track("IOAccelResourceCreate", start, length);
            }
            None => tracing::debug!(?resource, "IOAccelResourceCreate: no backing store"),
        }
        resource
    }

    /// `IOGPUResourceCreate` hook.
    ///
    /// # Safety
    ///
    /// Same contract as `IOGPUResourceCreate`.
    pub unsafe fn gpu_resource_create(
        &self,
        device: *mut c_void,
        args: *mut c_void,
        size: usize,
    ) -> *mut c_void {
        tracing::debug!(?device, ?args, size = format_args!("0x{size:x}"), "IOGPUResourceCreate");

        // SAFETY: forwarded verbatim from the caller.
        let resource = unsafe { self.driver.gpu_resource_create(device, args, size) };
        if resource.is_null() {
            return resource;
        }

        // SAFETY: `resource` was just returned by `IOGPUResourceCreate`.
        let (gpu_va, length, data) = unsafe {
            (
                self.driver.gpu_resource_gpu_virtual_address(resource),
                self.driver.gpu_resource_data_size(resource),
                self.driver.gpu_resource_data_bytes(resource),
            )
        };
        tracing::debug!(
            ?resource,
            gpu_va = format_args!("0x{gpu_va:x}"),
            ?data,
            size = format_args!("0x{length:x}"),
            "IOGPUResourceCreate returned"
        );
        if data.is_null() || length == 0 {
            return resource;
        }

        let wanted = self.lock().fuzzer.profile().tracks_gpu_va(gpu_va);
        if wanted {
            self.track("IOGPUResourceCreate", data as usize, length);
        } else {
            tracing::debug!(
                gpu_va = format_args!("0x{gpu_va:x}"),
                "skipping resource already mapped into the GPU address space"
            );
        }
        resource
    }

    /// `IOConnectCallMethod` hook.
    ///
    /// # Safety
    ///
    /// Same contract as `IOConnectCallMethod`.
    pub unsafe fn connect_call_method(&self, args: &CallMethodArgs) -> KernReturn {
        if tracing::enabled!(Level::TRACE) {
            // SAFETY: `output_cnt` is either null or a valid in/out count.
            let output_cnt = unsafe { args.output_cnt.as_ref() }.copied().unwrap_or(0);
            tracing::trace!(
                connection = format_args!("0x{:x}", args.connection),
                selector = format_args!("0x{:x}", args.selector),
                input = ?args.input,
                input_cnt = args.input_cnt,
                input_struct = ?args.input_struct,
                input_struct_cnt = format_args!("0x{:x}", args.input_struct_cnt),
                output = ?args.output,
                output_cnt,
                output_struct = ?args.output_struct,
                output_struct_cnt = ?args.output_struct_cnt,
                "IOConnectCallMethod"
            );
        }

        self.with_state(|fuzzer, mem| {
            fuzzer.tick(args.selector, mem);
        });

        // SAFETY: forwarded verbatim from the caller.
        unsafe { self.driver.connect_call_method(args) }
    }
}
