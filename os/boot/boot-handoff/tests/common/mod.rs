//! Recording fake of the firmware capabilities.
#![allow(dead_code)]

use boot_handoff::PhysicalAddress;
use boot_handoff::firmware::{
    BootMedia, BootServices, Directory, KernelFile, MapKey, MapSizeProbe, MemoryMapSnapshot,
    Volume,
};
use boot_handoff::FirmwareError;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use uefi::Status;

pub const DESC_SIZE: usize = 48;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    BootVolume,
    OpenRoot,
    Open(String),
    ListRoot,
    Size(String),
    Read(String),
    Close(String),
    CloseRoot,
    CloseVolume,
    ClaimRegion { base: u64, len: usize },
    Allocate(usize),
    Free(usize),
    QuerySize,
    Fetch,
    Exit(usize),
    ReleaseConsole,
    RestoreConsole,
    Stall(usize),
}

type Log = Rc<RefCell<Vec<Event>>>;

/// Shared state of the fake firmware.
pub struct FakeFirmware {
    pub events: Log,
    pub volume_error: Option<Status>,
    pub root_error: Option<Status>,
    pub files: BTreeMap<String, Vec<u8>>,
    pub size_error: Option<Status>,
    pub read_error: Option<Status>,
    /// Maximum bytes handed out per read call.
    pub read_chunk: usize,
    pub region_error: Option<Status>,
    pub region_len: Option<usize>,
    pub loaded: Rc<RefCell<Vec<u8>>>,
    pub size_status: Status,
    /// Status of every size query after the first one; `size_status` if unset.
    pub retry_size_status: Option<Status>,
    pub map_size: usize,
    /// Descriptors the map grows by on every pool allocation.
    pub growth_per_alloc: usize,
    pub allocate_error: Option<Status>,
    pub fetch_error: Option<Status>,
    /// Number of exit calls that fail even with a fresh key.
    pub exit_failures: usize,
    /// Current firmware map key; bumped by every allocation.
    pub map_key: usize,
    pub exited: bool,
    /// Whether the loader currently writes to the firmware console.
    pub console: bool,
}

impl Default for FakeFirmware {
    fn default() -> Self {
        Self {
            events: Rc::default(),
            volume_error: None,
            root_error: None,
            files: BTreeMap::new(),
            size_error: None,
            read_error: None,
            read_chunk: usize::MAX,
            region_error: None,
            region_len: None,
            loaded: Rc::default(),
            size_status: Status::BUFFER_TOO_SMALL,
            retry_size_status: None,
            map_size: 40 * DESC_SIZE,
            growth_per_alloc: 1,
            allocate_error: None,
            fetch_error: None,
            exit_failures: 0,
            map_key: 1,
            exited: false,
            console: true,
        }
    }
}

impl FakeFirmware {
    pub fn with_file(mut self, path: &str, bytes: Vec<u8>) -> Self {
        self.files.insert(path.to_owned(), bytes);
        self
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.borrow().clone()
    }

    pub fn opened_paths(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Open(p) => Some(p),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, pred: impl Fn(&Event) -> bool) -> usize {
        self.events().iter().filter(|e| pred(e)).count()
    }

    pub fn loaded_bytes(&self) -> Vec<u8> {
        self.loaded.borrow().clone()
    }

    fn record(&self, e: Event) {
        assert!(!self.exited, "firmware used after ExitBootServices: {e:?}");
        self.events.borrow_mut().push(e);
    }
}

pub struct FakeVolume {
    events: Log,
    root_error: Option<Status>,
    files: BTreeMap<String, Vec<u8>>,
    size_error: Option<Status>,
    read_error: Option<Status>,
    read_chunk: usize,
}

pub struct FakeDir {
    events: Log,
    files: BTreeMap<String, Vec<u8>>,
    size_error: Option<Status>,
    read_error: Option<Status>,
    read_chunk: usize,
}

pub struct FakeFile {
    events: Log,
    path: String,
    bytes: Vec<u8>,
    pos: usize,
    size_error: Option<Status>,
    read_error: Option<Status>,
    read_chunk: usize,
}

impl BootMedia for FakeFirmware {
    type Volume = FakeVolume;

    fn boot_volume(&mut self) -> Result<FakeVolume, FirmwareError> {
        self.record(Event::BootVolume);
        if let Some(status) = self.volume_error {
            return Err(FirmwareError(status));
        }
        Ok(FakeVolume {
            events: self.events.clone(),
            root_error: self.root_error,
            files: self.files.clone(),
            size_error: self.size_error,
            read_error: self.read_error,
            read_chunk: self.read_chunk,
        })
    }
}

impl Volume for FakeVolume {
    type Root = FakeDir;

    fn open_root(&mut self) -> Result<FakeDir, FirmwareError> {
        self.events.borrow_mut().push(Event::OpenRoot);
        if let Some(status) = self.root_error {
            return Err(FirmwareError(status));
        }
        Ok(FakeDir {
            events: self.events.clone(),
            files: self.files.clone(),
            size_error: self.size_error,
            read_error: self.read_error,
            read_chunk: self.read_chunk,
        })
    }
}

impl Drop for FakeVolume {
    fn drop(&mut self) {
        self.events.borrow_mut().push(Event::CloseVolume);
    }
}

impl Directory for FakeDir {
    type File = FakeFile;

    fn open_read_only(&mut self, path: &str) -> Result<FakeFile, FirmwareError> {
        self.events.borrow_mut().push(Event::Open(path.to_owned()));
        let Some(bytes) = self.files.get(path) else {
            return Err(FirmwareError(Status::NOT_FOUND));
        };
        Ok(FakeFile {
            events: self.events.clone(),
            path: path.to_owned(),
            bytes: bytes.clone(),
            pos: 0,
            size_error: self.size_error,
            read_error: self.read_error,
            read_chunk: self.read_chunk,
        })
    }

    fn entry_names(&mut self) -> Result<Vec<String>, FirmwareError> {
        self.events.borrow_mut().push(Event::ListRoot);
        Ok(self.files.keys().cloned().collect())
    }
}

impl Drop for FakeDir {
    fn drop(&mut self) {
        self.events.borrow_mut().push(Event::CloseRoot);
    }
}

impl KernelFile for FakeFile {
    fn size(&mut self) -> Result<u64, FirmwareError> {
        self.events.borrow_mut().push(Event::Size(self.path.clone()));
        match self.size_error {
            Some(status) => Err(FirmwareError(status)),
            None => Ok(self.bytes.len() as u64),
        }
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, FirmwareError> {
        self.events.borrow_mut().push(Event::Read(self.path.clone()));
        if let Some(status) = self.read_error {
            return Err(FirmwareError(status));
        }
        let remaining = &self.bytes[self.pos..];
        let n = remaining.len().min(buf.len()).min(self.read_chunk);
        buf[..n].copy_from_slice(&remaining[..n]);
        self.pos += n;
        Ok(n)
    }
}

impl Drop for FakeFile {
    fn drop(&mut self) {
        self.events.borrow_mut().push(Event::Close(self.path.clone()));
    }
}

/// Pool buffer that reports its release.
pub struct FakeBuffer {
    events: Log,
    bytes: Vec<u8>,
}

impl AsRef<[u8]> for FakeBuffer {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl AsMut<[u8]> for FakeBuffer {
    fn as_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }
}

impl Drop for FakeBuffer {
    fn drop(&mut self) {
        self.events.borrow_mut().push(Event::Free(self.bytes.len()));
    }
}

/// Load region whose contents land in [`FakeFirmware::loaded`] when released.
pub struct FakeRegion {
    bytes: Vec<u8>,
    sink: Rc<RefCell<Vec<u8>>>,
}

impl AsMut<[u8]> for FakeRegion {
    fn as_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }
}

impl Drop for FakeRegion {
    fn drop(&mut self) {
        *self.sink.borrow_mut() = std::mem::take(&mut self.bytes);
    }
}

impl BootServices for FakeFirmware {
    type Buffer = FakeBuffer;
    type Region = FakeRegion;

    fn claim_load_region(
        &mut self,
        base: PhysicalAddress,
        len: usize,
    ) -> Result<FakeRegion, FirmwareError> {
        self.record(Event::ClaimRegion {
            base: base.as_u64(),
            len,
        });
        if let Some(status) = self.region_error {
            return Err(FirmwareError(status));
        }
        Ok(FakeRegion {
            bytes: vec![0; self.region_len.unwrap_or(len)],
            sink: self.loaded.clone(),
        })
    }

    fn allocate_pool(&mut self, len: usize) -> Result<FakeBuffer, FirmwareError> {
        self.record(Event::Allocate(len));
        if let Some(status) = self.allocate_error {
            return Err(FirmwareError(status));
        }
        self.map_key += 1;
        self.map_size += self.growth_per_alloc * DESC_SIZE;
        Ok(FakeBuffer {
            events: self.events.clone(),
            bytes: vec![0xaa; len],
        })
    }

    fn query_memory_map_size(&mut self) -> MapSizeProbe {
        let status = match self.retry_size_status {
            Some(status) if self.count(|e| *e == Event::QuerySize) > 0 => status,
            _ => self.size_status,
        };
        self.record(Event::QuerySize);
        MapSizeProbe {
            status,
            map_size: self.map_size,
            desc_size: DESC_SIZE,
        }
    }

    fn fetch_memory_map(&mut self, buf: &mut [u8]) -> Result<MemoryMapSnapshot, FirmwareError> {
        self.record(Event::Fetch);
        if let Some(status) = self.fetch_error {
            return Err(FirmwareError(status));
        }
        assert!(buf.iter().all(|&b| b == 0), "map buffer was not zeroed");
        if buf.len() < self.map_size {
            return Err(FirmwareError(Status::BUFFER_TOO_SMALL));
        }
        buf[..self.map_size].fill(0x5a);
        Ok(MemoryMapSnapshot {
            key: MapKey(self.map_key),
            map_size: self.map_size,
            desc_size: DESC_SIZE,
            desc_version: 1,
        })
    }

    fn exit_boot_services(&mut self, key: MapKey) -> Result<(), FirmwareError> {
        self.record(Event::Exit(key.0));
        if self.exit_failures > 0 {
            self.exit_failures -= 1;
            // The firmware changed its map behind our back.
            self.map_key += 1;
            return Err(FirmwareError(Status::INVALID_PARAMETER));
        }
        if key.0 != self.map_key {
            return Err(FirmwareError(Status::INVALID_PARAMETER));
        }
        self.exited = true;
        Ok(())
    }

    fn release_console(&mut self) {
        self.record(Event::ReleaseConsole);
        self.console = false;
    }

    fn restore_console(&mut self) {
        self.record(Event::RestoreConsole);
        self.console = true;
    }

    fn stall(&mut self, micros: usize) {
        self.record(Event::Stall(micros));
    }
}

/// A 4 KiB image with an ELF identification prefix.
pub fn elf_image(len: usize) -> Vec<u8> {
    let mut bytes: Vec<u8> = (0..len).map(|i| (i * 7 % 251) as u8).collect();
    bytes[..4].copy_from_slice(&[0x7f, b'E', b'L', b'F']);
    bytes
}
