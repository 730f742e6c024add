//! Boot volume access through the UEFI Simple File System protocol.

use crate::firmware::{UefiFirmware, status};
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use boot_handoff::FirmwareError;
use boot_handoff::firmware::{BootMedia, Directory, KernelFile, Volume};
use uefi::boot::{self, ScopedProtocol};
use uefi::proto::media::file::{self, File, FileAttribute, FileInfo, FileMode, RegularFile};
use uefi::proto::media::fs::SimpleFileSystem;
use uefi::{CString16, Status};

/// File system of the device the loader was started from.
pub struct BootVolume(ScopedProtocol<SimpleFileSystem>);

/// Root directory handle; closed on drop.
pub struct RootDirectory(file::Directory);

/// Read-only regular file; closed on drop.
pub struct VolumeFile(RegularFile);

impl BootMedia for UefiFirmware {
    type Volume = BootVolume;

    fn boot_volume(&mut self) -> Result<BootVolume, FirmwareError> {
        boot::get_image_file_system(boot::image_handle())
            .map(BootVolume)
            .map_err(status)
    }
}

impl Volume for BootVolume {
    type Root = RootDirectory;

    fn open_root(&mut self) -> Result<RootDirectory, FirmwareError> {
        self.0.open_volume().map(RootDirectory).map_err(status)
    }
}

impl Directory for RootDirectory {
    type File = VolumeFile;

    fn open_read_only(&mut self, path: &str) -> Result<VolumeFile, FirmwareError> {
        let path =
            CString16::try_from(path).map_err(|_| FirmwareError(Status::INVALID_PARAMETER))?;
        let handle = self
            .0
            .open(&path, FileMode::Read, FileAttribute::empty())
            .map_err(status)?;

        // A directory at a kernel path is as good as nothing there.
        handle
            .into_regular_file()
            .map(VolumeFile)
            .ok_or(FirmwareError(Status::NOT_FOUND))
    }

    fn entry_names(&mut self) -> Result<Vec<String>, FirmwareError> {
        self.0.reset_entry_readout().map_err(status)?;

        let mut names = Vec::new();
        while let Some(info) = self.0.read_entry_boxed().map_err(status)? {
            let name = info.file_name().to_string();
            if name != "." && name != ".." {
                names.push(name);
            }
        }
        Ok(names)
    }
}

impl KernelFile for VolumeFile {
    fn size(&mut self) -> Result<u64, FirmwareError> {
        let info = self.0.get_boxed_info::<FileInfo>().map_err(status)?;
        Ok(info.file_size())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, FirmwareError> {
        self.0.read(buf).map_err(status)
    }
}
