use std::ffi::c_void;

use crate::format::PixelFormat;

/// Opaque handle to a host-side texture resource.
///
/// The recorder never dereferences it; it is passed straight through to the
/// [`TextureReader`] collaborator on the producer thread and never crosses
/// into the worker.
#[derive(Debug, Clone, Copy)]
pub struct TextureHandle(*const c_void);

impl TextureHandle {
    pub fn new(ptr: *const c_void) -> Self {
        Self(ptr)
    }

    pub fn null() -> Self {
        Self(std::ptr::null())
    }

    pub fn is_null(&self) -> bool {
        self.0.is_null()
    }

    pub fn as_ptr(&self) -> *const c_void {
        self.0
    }
}

/// GPU readback collaborator.
///
/// `read` performs a synchronous device-level readback of the texture into
/// `dst` and returns whether it succeeded. This is a blocking stall on the
/// calling thread; callers must budget for GPU sync latency.
pub trait TextureReader: Send {
    fn read(
        &mut self,
        dst: &mut [u8],
        handle: TextureHandle,
        width: usize,
        height: usize,
        format: PixelFormat,
    ) -> bool;
}
