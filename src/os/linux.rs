//! Linux backend: `/proc/<pid>/maps` plus `process_vm_readv`/`process_vm_writev`

use crate::core::types::{
    Address, MemoryAccessError, MemoryError, MemoryResult, ProcessAccessError, ProcessId, Region,
};
use crate::process::ProcessMemory;
use nix::errno::Errno;
use nix::sys::uio::{process_vm_readv, process_vm_writev, RemoteIoVec};
use nix::unistd::Pid;
use std::io::{self, IoSlice, IoSliceMut};
use std::path::PathBuf;
use tracing::debug;

// Kernel-provided pages that process_vm_readv refuses to copy.
const UNCOPYABLE_LABELS: &[&str] = &["[vvar]", "[vvar_vclock]", "[vsyscall]"];

/// An opened Linux process
pub struct LinuxProcess {
    pid: ProcessId,
}

impl LinuxProcess {
    /// Opens `pid`, reading the memory map and one readable byte to check permission
    pub fn open(pid: ProcessId) -> MemoryResult<Self> {
        let regions = read_maps(pid)?;
        let process = LinuxProcess { pid };

        if let Some(region) = regions.iter().find(|r| r.readable) {
            let mut sample = [0u8; 1];
            match process.copy(region.base, &mut sample) {
                Ok(_) => {}
                Err(Errno::EPERM) => return Err(ProcessAccessError::AccessDenied(pid).into()),
                Err(Errno::ESRCH) => return Err(ProcessAccessError::NotFound(pid).into()),
                Err(e) => debug!(pid, error = %e, "first-page read failed"),
            }
        }

        Ok(process)
    }

    fn target(&self) -> Pid {
        Pid::from_raw(self.pid as i32)
    }

    fn proc_dir(&self) -> PathBuf {
        PathBuf::from(format!("/proc/{}", self.pid))
    }

    /// One `process_vm_readv` call, returning how many bytes were copied
    fn copy(&self, address: Address, buffer: &mut [u8]) -> Result<usize, Errno> {
        let len = buffer.len();
        let remote = [RemoteIoVec {
            base: address.as_usize(),
            len,
        }];
        process_vm_readv(self.target(), &mut [IoSliceMut::new(buffer)], &remote)
    }

    /// One `process_vm_writev` call, returning how many bytes were written
    fn put(&self, address: Address, data: &[u8]) -> Result<usize, Errno> {
        let remote = [RemoteIoVec {
            base: address.as_usize(),
            len: data.len(),
        }];
        process_vm_writev(self.target(), &[IoSlice::new(data)], &remote)
    }
}

fn classify_open_error(pid: ProcessId, error: io::Error) -> MemoryError {
    match error.kind() {
        io::ErrorKind::NotFound => ProcessAccessError::NotFound(pid).into(),
        io::ErrorKind::PermissionDenied => ProcessAccessError::AccessDenied(pid).into(),
        _ => error.into(),
    }
}

fn read_maps(pid: ProcessId) -> MemoryResult<Vec<Region>> {
    let path = format!("/proc/{}/maps", pid);
    let contents = std::fs::read_to_string(&path).map_err(|e| classify_open_error(pid, e))?;
    Ok(parse_maps(&contents))
}

/// Parses the text of a `/proc/<pid>/maps` file
///
/// Lines that don't parse are skipped.
pub fn parse_maps(contents: &str) -> Vec<Region> {
    contents.lines().filter_map(parse_maps_line).collect()
}

fn parse_maps_line(line: &str) -> Option<Region> {
    // 7f0c4a200000-7f0c4a221000 rw-p 00000000 00:00 0    [heap]
    let mut fields = line.split_whitespace();
    let range = fields.next()?;
    let perms = fields.next()?;
    let (start, end) = range.split_once('-')?;
    let start = usize::from_str_radix(start, 16).ok()?;
    let end = usize::from_str_radix(end, 16).ok()?;
    if end <= start {
        return None;
    }

    // offset, dev, inode
    let label = fields.nth(3).map(str::to_string);
    let uncopyable = label
        .as_deref()
        .map_or(false, |l| UNCOPYABLE_LABELS.contains(&l));

    let mut perm_chars = perms.chars();
    let readable = perm_chars.next() == Some('r') && !uncopyable;
    let writable = perm_chars.next() == Some('w');

    let region = Region::new(Address::new(start), end - start, readable, writable);
    Some(match label {
        Some(label) => region.with_label(label),
        None => region,
    })
}

impl ProcessMemory for LinuxProcess {
    fn read(&self, address: Address, buffer: &mut [u8]) -> MemoryResult<()> {
        if buffer.is_empty() {
            return Ok(());
        }
        match self.copy(address, buffer) {
            Ok(copied) if copied == buffer.len() => Ok(()),
            Ok(copied) => {
                debug!(%address, copied, wanted = buffer.len(), "short read");
                Err(MemoryError::unmapped(address))
            }
            Err(Errno::EPERM) => Err(MemoryError::unreadable(address)),
            Err(_) => Err(MemoryError::unmapped(address)),
        }
    }

    fn write(&self, address: Address, data: &[u8]) -> MemoryResult<()> {
        if data.is_empty() {
            return Ok(());
        }
        match self.put(address, data) {
            Ok(written) if written == data.len() => Ok(()),
            Ok(written) => {
                debug!(%address, written, wanted = data.len(), "short write");
                Err(MemoryError::unmapped(address))
            }
            Err(Errno::EPERM) => Err(MemoryAccessError::WriteProtected { address }.into()),
            Err(_) => Err(MemoryError::unmapped(address)),
        }
    }

    fn regions(&self) -> MemoryResult<Vec<Region>> {
        read_maps(self.pid)
    }

    fn is_alive(&self) -> bool {
        self.proc_dir().exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAPS: &str = "\
55d0c8a00000-55d0c8a21000 r--p 00000000 08:01 1311 /usr/bin/game
55d0c8c21000-55d0c8c42000 rw-p 00021000 08:01 1311 /usr/bin/game
55d0ca000000-55d0ca400000 rw-p 00000000 00:00 0    [heap]
7ffd5a000000-7ffd5a021000 ---p 00000000 00:00 0
7ffd5a1f0000-7ffd5a1f4000 r--p 00000000 00:00 0    [vvar]
garbage line
";

    #[test]
    fn test_parse_maps() {
        let regions = parse_maps(MAPS);
        assert_eq!(regions.len(), 5);

        assert_eq!(regions[0].base, Address::new(0x55d0c8a00000));
        assert_eq!(regions[0].length, 0x21000);
        assert!(regions[0].readable);
        assert!(!regions[0].writable);
        assert_eq!(regions[0].label.as_deref(), Some("/usr/bin/game"));

        assert!(regions[2].readable && regions[2].writable);
        assert_eq!(regions[2].label.as_deref(), Some("[heap]"));

        assert!(!regions[3].readable);
        assert_eq!(regions[3].label, None);

        assert!(!regions[4].readable);
    }

    #[test]
    fn test_parse_maps_rejects_inverted_range() {
        assert!(parse_maps("2000-1000 rw-p 00000000 00:00 0").is_empty());
    }

    #[test]
    #[cfg_attr(miri, ignore = "FFI not supported in Miri")]
    fn test_open_own_process() {
        let own = LinuxProcess::open(std::process::id()).unwrap();
        assert!(own.is_alive());

        let value: u32 = 0xC0FFEE;
        let address = Address::new(&value as *const u32 as usize);
        let mut buffer = [0u8; 4];
        own.read(address, &mut buffer).unwrap();
        assert_eq!(u32::from_le_bytes(buffer), 0xC0FFEE);

        let regions = own.regions().unwrap();
        assert!(regions.iter().any(|r| r.contains(address)));
    }

    #[test]
    #[cfg_attr(miri, ignore = "FFI not supported in Miri")]
    fn test_read_across_mapping_end_fails() {
        let own = LinuxProcess::open(std::process::id()).unwrap();
        let regions = own.regions().unwrap();

        // The last 8 bytes of a readable region with nothing mapped after it
        let tail_of = |r: &Region| Address::new(r.end().as_usize() - 8);
        let Some(region) = regions.iter().find(|r| {
            r.readable
                && !regions.iter().any(|o| o.contains(r.end()))
                && own.read(tail_of(r), &mut [0u8; 8]).is_ok()
        }) else {
            return;
        };

        let mut buffer = [0xAAu8; 16];
        let err = own.read(tail_of(region), &mut buffer).unwrap_err();
        assert_eq!(err.code(), "Unmapped");
    }

    #[test]
    #[cfg_attr(miri, ignore = "FFI not supported in Miri")]
    fn test_empty_read_is_noop() {
        let own = LinuxProcess::open(std::process::id()).unwrap();
        own.read(Address::null(), &mut []).unwrap();
    }

    #[test]
    #[cfg_attr(miri, ignore = "FFI not supported in Miri")]
    fn test_open_missing_process() {
        let err = LinuxProcess::open(u32::MAX - 1).err().unwrap();
        assert_eq!(err.code(), "NotFound");
    }
}
