use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

use crate::error::{RecoveryError, Result};

#[cfg(target_os = "linux")]
fn block_device_size(file: &File) -> io::Result<u64> {
    use std::os::unix::io::AsRawFd;

    const BLKGETSIZE64: libc::c_ulong = 0x80081272;

    let mut size: u64 = 0;
    let result = unsafe { libc::ioctl(file.as_raw_fd(), BLKGETSIZE64, &mut size) };

    if result == -1 {
        Err(io::Error::last_os_error())
    } else {
        Ok(size)
    }
}

#[cfg(not(target_os = "linux"))]
fn block_device_size(_file: &File) -> io::Result<u64> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "Not supported on this platform",
    ))
}

/// Read-only handle to a block device or disk image.
pub struct DiskReader {
    file: File,
    size: u64,
}

impl DiskReader {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut file = File::open(path)?;
        let mut size = file.metadata()?.len();

        // block devices report a zero metadata length
        if size == 0 {
            if let Ok(device_size) = block_device_size(&file) {
                size = device_size;
            }
        }

        if size == 0 {
            size = file.seek(SeekFrom::End(0))?;
            file.seek(SeekFrom::Start(0))?;
        }

        Ok(Self { file, size })
    }

    pub fn read_exact_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<()> {
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.read_exact(buf).map_err(|e| {
            if e.kind() == io::ErrorKind::UnexpectedEof {
                RecoveryError::ShortRead {
                    offset,
                    expected: buf.len(),
                }
            } else {
                RecoveryError::Io(e)
            }
        })
    }

    #[inline]
    pub fn size(&self) -> u64 {
        self.size
    }
}

/// Sector-addressed access on top of `DiskReader`, per the resolved
/// geometry. A short read means the device is smaller than the geometry
/// implies and is surfaced as an error, never padded.
pub struct SectorReader {
    reader: DiskReader,
    sector_size: u32,
}

impl SectorReader {
    pub fn new(reader: DiskReader, sector_size: u32) -> Self {
        Self {
            reader,
            sector_size,
        }
    }

    /// Reads the sector at `index` into `buf`, which must hold exactly
    /// one sector.
    pub fn read_sector(&mut self, index: u64, buf: &mut [u8]) -> Result<()> {
        debug_assert_eq!(buf.len(), self.sector_size as usize);
        self.reader
            .read_exact_at(index * u64::from(self.sector_size), buf)
    }

    #[inline]
    pub fn sector_size(&self) -> u32 {
        self.sector_size
    }

    #[inline]
    pub fn device_size(&self) -> u64 {
        self.reader.size()
    }
}
