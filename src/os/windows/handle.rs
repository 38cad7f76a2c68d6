//! Owned process HANDLE that closes itself

use super::kernel32;
use winapi::um::winnt::HANDLE;

/// RAII wrapper around a process HANDLE
pub struct Handle {
    handle: HANDLE,
}

impl Handle {
    pub fn new(handle: HANDLE) -> Self {
        Handle { handle }
    }

    pub fn raw(&self) -> HANDLE {
        self.handle
    }
}

impl Drop for Handle {
    fn drop(&mut self) {
        if !self.handle.is_null() {
            unsafe {
                let _ = kernel32::close_handle(self.handle);
            }
        }
    }
}

// HANDLEs are process-local kernel object references, usable from any thread
unsafe impl Send for Handle {}
unsafe impl Sync for Handle {}
