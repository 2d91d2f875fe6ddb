//! `mdmlocalmanagement.dll` bindings.

use std::ffi::c_void;

use super::{ApplyResponse, ManagementChannel};

#[link(name = "mdmlocalmanagement")]
unsafe extern "system" {
    fn RegisterDeviceWithLocalManagement(already_registered: *mut i32) -> u32;
    fn ApplyLocalManagementSyncML(request: *const u16, result: *mut *mut u16) -> u32;
    fn UnregisterDeviceWithLocalManagement() -> u32;
}

#[link(name = "kernel32")]
unsafe extern "system" {
    fn LocalFree(mem: *mut c_void) -> *mut c_void;
}

/// The real local management stack. Requires an elevated process.
#[derive(Debug, Default)]
pub struct NativeChannel;

impl NativeChannel {
    pub fn new() -> Self {
        Self
    }
}

impl ManagementChannel for NativeChannel {
    fn register(&mut self) -> u32 {
        let mut already_registered = 0i32;
        // SAFETY: the out pointer is valid for the duration of the call.
        unsafe { RegisterDeviceWithLocalManagement(&mut already_registered) }
    }

    fn apply(&mut self, request: &str) -> ApplyResponse {
        let wide: Vec<u16> = request.encode_utf16().chain(std::iter::once(0)).collect();
        let mut result: *mut u16 = std::ptr::null_mut();
        // SAFETY: `wide` is NUL-terminated and outlives the call; `result` is
        // either left null or set to a LocalAlloc'd NUL-terminated string.
        let code = unsafe { ApplyLocalManagementSyncML(wide.as_ptr(), &mut result) };

        let body = if result.is_null() {
            String::new()
        } else {
            // SAFETY: non-null result is a NUL-terminated UTF-16 string owned
            // by us until freed below.
            let text = unsafe { read_wide(result) };
            let leftover = unsafe { LocalFree(result.cast()) };
            if !leftover.is_null() {
                tracing::warn!("failed to free SyncML response buffer");
            }
            text
        };

        ApplyResponse { code, body }
    }

    fn unregister(&mut self) -> u32 {
        // SAFETY: no arguments.
        unsafe { UnregisterDeviceWithLocalManagement() }
    }
}

/// Copy a NUL-terminated UTF-16 string.
///
/// # Safety
/// `ptr` must point to a readable, NUL-terminated UTF-16 buffer.
unsafe fn read_wide(ptr: *const u16) -> String {
    let mut len = 0usize;
    // SAFETY: caller guarantees a terminator within the allocation.
    unsafe {
        while *ptr.add(len) != 0 {
            len += 1;
        }
        String::from_utf16_lossy(std::slice::from_raw_parts(ptr, len))
    }
}
