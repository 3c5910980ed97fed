use core::ffi::c_void;

/// Offset of the `{ base, length }` pair inside an `IOAccelResource`.
pub const ACCEL_RESOURCE_EXTENT_OFFSET: usize = 0x20;

#[repr(C)]
#[derive(Clone, Copy)]
struct RawExtent {
    base: usize,
    length: usize,
}

/// Read the backing store `(base, length)` of an accelerator resource.
///
/// Returns `None` for a null handle or when either field is zero (resources without a CPU
/// mapping).
///
/// # Safety
///
/// `resource` must be null or point at a live `IOAccelResource`, i.e. at least
/// `ACCEL_RESOURCE_EXTENT_OFFSET + 2 * size_of::<usize>()` readable bytes.
pub unsafe fn accel_resource_extent(resource: *const c_void) -> Option<(usize, usize)> {
    if resource.is_null() {
        return None;
    }
    // SAFETY: guaranteed readable by the caller; the handle makes no alignment promise.
    let extent = unsafe {
        resource
            .cast::<u8>()
            .add(ACCEL_RESOURCE_EXTENT_OFFSET)
            .cast::<RawExtent>()
            .read_unaligned()
    };
    (extent.base != 0 && extent.length != 0).then_some((extent.base, extent.length))
}
