//! Kernel32.dll wrappers for process and memory operations

use crate::core::types::{
    Address, MemoryAccessError, MemoryError, MemoryResult, ProcessAccessError, ProcessId,
};
use std::mem;
use winapi::shared::minwindef::{DWORD, FALSE, LPVOID};
use winapi::shared::winerror::{ERROR_ACCESS_DENIED, ERROR_INVALID_PARAMETER, ERROR_NOACCESS};
use winapi::um::errhandlingapi::GetLastError;
use winapi::um::handleapi::CloseHandle;
use winapi::um::memoryapi::{ReadProcessMemory, VirtualQueryEx, WriteProcessMemory};
use winapi::um::processthreadsapi::{GetExitCodeProcess, OpenProcess};
use winapi::um::winnt::{
    HANDLE, MEMORY_BASIC_INFORMATION, PROCESS_QUERY_INFORMATION, PROCESS_VM_OPERATION,
    PROCESS_VM_READ, PROCESS_VM_WRITE,
};

/// Rights needed to scan, watch and write
pub const INSPECT_ACCESS: DWORD =
    PROCESS_VM_READ | PROCESS_VM_WRITE | PROCESS_VM_OPERATION | PROCESS_QUERY_INFORMATION;

const STILL_ACTIVE: DWORD = 259;

/// Safe wrapper for OpenProcess
pub fn open_process(pid: ProcessId, desired_access: DWORD) -> MemoryResult<HANDLE> {
    unsafe {
        let handle = OpenProcess(desired_access, FALSE, pid);
        if !handle.is_null() {
            return Ok(handle);
        }
        Err(match GetLastError() {
            ERROR_ACCESS_DENIED => ProcessAccessError::AccessDenied(pid).into(),
            ERROR_INVALID_PARAMETER => ProcessAccessError::NotFound(pid).into(),
            code => std::io::Error::from_raw_os_error(code as i32).into(),
        })
    }
}

/// Safe wrapper for CloseHandle
///
/// # Safety
/// The handle must be a valid Windows handle
pub unsafe fn close_handle(handle: HANDLE) -> MemoryResult<()> {
    if handle.is_null() {
        return Ok(());
    }
    if CloseHandle(handle) == FALSE {
        Err(std::io::Error::last_os_error().into())
    } else {
        Ok(())
    }
}

/// Safe wrapper for ReadProcessMemory; partial reads are failures
///
/// # Safety
/// The handle must be a valid process handle with `PROCESS_VM_READ`
pub unsafe fn read_process_memory(
    handle: HANDLE,
    address: Address,
    buffer: &mut [u8],
) -> MemoryResult<()> {
    let mut bytes_read = 0;
    let result = ReadProcessMemory(
        handle,
        address.as_usize() as LPVOID,
        buffer.as_mut_ptr() as LPVOID,
        buffer.len(),
        &mut bytes_read,
    );

    if result == FALSE {
        return Err(match GetLastError() {
            ERROR_NOACCESS | ERROR_ACCESS_DENIED => MemoryError::unreadable(address),
            _ => MemoryError::unmapped(address),
        });
    }
    if bytes_read != buffer.len() {
        return Err(MemoryError::unreadable(address));
    }
    Ok(())
}

/// Safe wrapper for WriteProcessMemory
///
/// # Safety
/// The handle must be a valid process handle with `PROCESS_VM_WRITE`
pub unsafe fn write_process_memory(
    handle: HANDLE,
    address: Address,
    data: &[u8],
) -> MemoryResult<()> {
    let mut bytes_written = 0;
    let result = WriteProcessMemory(
        handle,
        address.as_usize() as LPVOID,
        data.as_ptr() as LPVOID,
        data.len(),
        &mut bytes_written,
    );

    if result == FALSE || bytes_written != data.len() {
        return Err(match GetLastError() {
            ERROR_NOACCESS | ERROR_ACCESS_DENIED => {
                MemoryAccessError::WriteProtected { address }.into()
            }
            _ => MemoryError::unmapped(address),
        });
    }
    Ok(())
}

/// Safe wrapper for VirtualQueryEx; `None` past the end of the address space
///
/// # Safety
/// The handle must be a valid process handle with `PROCESS_QUERY_INFORMATION`
pub unsafe fn virtual_query_ex(handle: HANDLE, address: usize) -> Option<MEMORY_BASIC_INFORMATION> {
    let mut mbi: MEMORY_BASIC_INFORMATION = mem::zeroed();
    let result = VirtualQueryEx(
        handle,
        address as LPVOID,
        &mut mbi,
        mem::size_of::<MEMORY_BASIC_INFORMATION>(),
    );
    if result == 0 {
        None
    } else {
        Some(mbi)
    }
}

/// True while the process has not exited
///
/// # Safety
/// The handle must be a valid process handle
pub unsafe fn is_process_running(handle: HANDLE) -> bool {
    let mut code: DWORD = 0;
    GetExitCodeProcess(handle, &mut code) != FALSE && code == STILL_ACTIVE
}
