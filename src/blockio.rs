//! Block-addressable byte sources.
//!
//! The parser only ever issues absolute-offset reads, so a single handle can
//! back any number of concurrently used entities without a shared cursor.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::error::{HfsError, Result};

/// A read-only, thread-safe byte source.
///
/// A short read is an error: `read_at` either fills `buf` completely or
/// fails. Implementations may serialize internally.
pub trait BlockIo: Send + Sync {
    /// Total size of the underlying source in bytes.
    fn size(&self) -> Result<u64>;

    /// Read exactly `buf.len()` bytes at the given absolute offset.
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<()>;
}

/// In-memory byte source, mainly for tests and for volumes extracted from
/// disk images.
pub struct MemoryBlockIo<T: AsRef<[u8]> + Send + Sync> {
    data: T,
}

impl<T: AsRef<[u8]> + Send + Sync> MemoryBlockIo<T> {
    pub fn new(data: T) -> Self {
        MemoryBlockIo { data }
    }
}

impl<T: AsRef<[u8]> + Send + Sync> BlockIo for MemoryBlockIo<T> {
    fn size(&self) -> Result<u64> {
        Ok(self.data.as_ref().len() as u64)
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        let data = self.data.as_ref();
        let end = offset
            .checked_add(buf.len() as u64)
            .ok_or_else(|| HfsError::OutOfBounds("read range overflows u64".into()))?;
        if end > data.len() as u64 {
            return Err(HfsError::OutOfBounds(format!(
                "read of {} bytes at offset {} exceeds source size {}",
                buf.len(),
                offset,
                data.len()
            )));
        }
        buf.copy_from_slice(&data[offset as usize..end as usize]);
        Ok(())
    }
}

/// File-backed byte source. Reads are serialized through an internal lock so
/// the handle can be shared across threads.
pub struct FileBlockIo {
    file: Mutex<File>,
    size: u64,
}

impl FileBlockIo {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::new(File::open(path)?)
    }

    pub fn new(file: File) -> Result<Self> {
        let size = file.metadata()?.len();
        Ok(FileBlockIo {
            file: Mutex::new(file),
            size,
        })
    }
}

impl BlockIo for FileBlockIo {
    fn size(&self) -> Result<u64> {
        Ok(self.size)
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        let mut file = self
            .file
            .lock()
            .map_err(|_| HfsError::CorruptedData("file lock poisoned".into()))?;
        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(buf)?;
        Ok(())
    }
}

/// Internal handle tying a block source to a base offset (non-zero for an
/// HFS+ volume embedded in a classic HFS wrapper) and to the volume's
/// cooperative abort flag.
pub(crate) struct IoHandle<B> {
    io: B,
    base: u64,
    abort: AtomicBool,
}

impl<B: BlockIo> IoHandle<B> {
    pub(crate) fn new(io: B) -> Self {
        IoHandle {
            io,
            base: 0,
            abort: AtomicBool::new(false),
        }
    }

    /// Shift all subsequent reads by `base` bytes.
    pub(crate) fn rebase(&mut self, base: u64) {
        self.base = base;
    }

    pub(crate) fn size(&self) -> Result<u64> {
        Ok(self.io.size()?.saturating_sub(self.base))
    }

    pub(crate) fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        let offset = self
            .base
            .checked_add(offset)
            .ok_or_else(|| HfsError::OutOfBounds("read offset overflows u64".into()))?;
        self.io.read_at(offset, buf)
    }

    pub(crate) fn request_abort(&self) {
        self.abort.store(true, Ordering::Relaxed);
    }

    pub(crate) fn aborted(&self) -> bool {
        self.abort.load(Ordering::Relaxed)
    }

    /// Checked at every iteration of an unbounded loop.
    pub(crate) fn check_abort(&self) -> Result<()> {
        if self.aborted() {
            Err(HfsError::Aborted)
        } else {
            Ok(())
        }
    }
}
