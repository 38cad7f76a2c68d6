//! Windows backend over kernel32

pub mod handle;
pub mod kernel32;

use crate::core::types::{Address, MemoryResult, ProcessId, Region};
use crate::process::ProcessMemory;
use handle::Handle;
use winapi::um::winnt::{
    MEM_COMMIT, PAGE_EXECUTE_READ, PAGE_EXECUTE_READWRITE, PAGE_EXECUTE_WRITECOPY, PAGE_GUARD,
    PAGE_READONLY, PAGE_READWRITE, PAGE_WRITECOPY,
};

const READABLE_PAGES: u32 = PAGE_READONLY
    | PAGE_READWRITE
    | PAGE_WRITECOPY
    | PAGE_EXECUTE_READ
    | PAGE_EXECUTE_READWRITE
    | PAGE_EXECUTE_WRITECOPY;

const WRITABLE_PAGES: u32 =
    PAGE_READWRITE | PAGE_WRITECOPY | PAGE_EXECUTE_READWRITE | PAGE_EXECUTE_WRITECOPY;

/// `(readable, writable)` for a page protection value
///
/// Execute-only and guard pages are not readable.
fn page_access(protect: u32) -> (bool, bool) {
    let readable = protect & READABLE_PAGES != 0 && protect & PAGE_GUARD == 0;
    let writable = readable && protect & WRITABLE_PAGES != 0;
    (readable, writable)
}

/// An opened Windows process
pub struct WindowsProcess {
    handle: Handle,
}

impl WindowsProcess {
    pub fn open(pid: ProcessId) -> MemoryResult<Self> {
        let raw = kernel32::open_process(pid, kernel32::INSPECT_ACCESS)?;
        Ok(WindowsProcess {
            handle: Handle::new(raw),
        })
    }
}

impl ProcessMemory for WindowsProcess {
    fn read(&self, address: Address, buffer: &mut [u8]) -> MemoryResult<()> {
        unsafe { kernel32::read_process_memory(self.handle.raw(), address, buffer) }
    }

    fn write(&self, address: Address, data: &[u8]) -> MemoryResult<()> {
        unsafe { kernel32::write_process_memory(self.handle.raw(), address, data) }
    }

    fn regions(&self) -> MemoryResult<Vec<Region>> {
        let mut regions = Vec::new();
        let mut address = 0usize;

        while let Some(mbi) = unsafe { kernel32::virtual_query_ex(self.handle.raw(), address) } {
            let base = mbi.BaseAddress as usize;
            if mbi.State == MEM_COMMIT {
                let (readable, writable) = page_access(mbi.Protect);
                regions.push(Region::new(
                    Address::new(base),
                    mbi.RegionSize,
                    readable,
                    writable,
                ));
            }

            match base.checked_add(mbi.RegionSize) {
                Some(next) if next > address => address = next,
                _ => break,
            }
        }

        Ok(regions)
    }

    fn is_alive(&self) -> bool {
        unsafe { kernel32::is_process_running(self.handle.raw()) }
    }
}
