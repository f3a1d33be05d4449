//! Seekable, read-only byte streams.
//!
//! A stream is backed either by a fork's extent segments (reads are issued
//! per segment, never merged across one), by an owned buffer (inline
//! attribute data), or by a decmpfs compressed handle.

use std::io::SeekFrom;

use crate::blockio::{BlockIo, IoHandle};
use crate::btree::read_fork;
use crate::decmpfs::CompressedStream;
use crate::error::{HfsError, Result};
use crate::extents::ExtentSegment;

/// Position-addressed reader over a sequence of extent segments.
pub(crate) struct RawStream<'v, B: BlockIo> {
    io: &'v IoHandle<B>,
    segments: Vec<ExtentSegment>,
    size: u64,
    position: u64,
}

impl<'v, B: BlockIo> RawStream<'v, B> {
    pub(crate) fn new(io: &'v IoHandle<B>, segments: Vec<ExtentSegment>) -> Self {
        let size = segments.iter().map(|s| s.size).sum();
        RawStream {
            io,
            segments,
            size,
            position: 0,
        }
    }

    pub(crate) fn size(&self) -> u64 {
        self.size
    }

    /// Read at an absolute offset without touching the stream position.
    /// Reads past the end return fewer (possibly zero) bytes.
    pub(crate) fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        if offset >= self.size || buf.is_empty() {
            return Ok(0);
        }
        let count = ((self.size - offset) as usize).min(buf.len());
        read_fork(self.io, &self.segments, offset, &mut buf[..count])?;
        Ok(count)
    }

    pub(crate) fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let count = self.read_at(self.position, buf)?;
        self.position += count as u64;
        Ok(count)
    }

    pub(crate) fn read_to_end(&mut self) -> Result<Vec<u8>> {
        let remaining = self.size.saturating_sub(self.position) as usize;
        let mut buf = vec![0u8; remaining];
        let count = self.read(&mut buf)?;
        buf.truncate(count);
        Ok(buf)
    }

    pub(crate) fn segments(&self) -> &[ExtentSegment] {
        &self.segments
    }
}

/// Stream over an owned buffer.
pub(crate) struct BufferStream {
    data: Vec<u8>,
    position: u64,
}

impl BufferStream {
    pub(crate) fn new(data: Vec<u8>) -> Self {
        BufferStream { data, position: 0 }
    }

    pub(crate) fn size(&self) -> u64 {
        self.data.len() as u64
    }

    pub(crate) fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        if offset >= self.size() || buf.is_empty() {
            return Ok(0);
        }
        let start = offset as usize;
        let count = (self.data.len() - start).min(buf.len());
        buf[..count].copy_from_slice(&self.data[start..start + count]);
        Ok(count)
    }

    pub(crate) fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let count = self.read_at(self.position, buf)?;
        self.position += count as u64;
        Ok(count)
    }
}

/// Resolve a `SeekFrom` against a stream size; a negative result is an
/// error, positions past the end are allowed (reads there return nothing).
pub(crate) fn resolve_seek(position: u64, size: u64, pos: SeekFrom) -> Result<u64> {
    let target = match pos {
        SeekFrom::Start(offset) => {
            if offset > i64::MAX as u64 {
                return Err(HfsError::InvalidArgument(format!(
                    "seek offset {} too large",
                    offset
                )));
            }
            offset as i64
        }
        SeekFrom::Current(delta) => position as i64 + delta,
        SeekFrom::End(delta) => size as i64 + delta,
    };
    if target < 0 {
        return Err(HfsError::InvalidArgument(format!(
            "seek to negative offset {}",
            target
        )));
    }
    Ok(target as u64)
}

pub(crate) enum StreamKind<'v, B: BlockIo> {
    Raw(RawStream<'v, B>),
    Buffer(BufferStream),
    Compressed(CompressedStream<'v, B>),
}

/// A read-only, seekable view of file or attribute content.
///
/// Raw streams map logical offsets through the extent list; compressed
/// streams decompress `com.apple.decmpfs` content block by block. Reading
/// past the end yields zero bytes rather than an error.
pub struct DataStream<'v, B: BlockIo> {
    pub(crate) inner: StreamKind<'v, B>,
}

impl<'v, B: BlockIo> DataStream<'v, B> {
    pub(crate) fn raw(io: &'v IoHandle<B>, segments: Vec<ExtentSegment>) -> Self {
        DataStream {
            inner: StreamKind::Raw(RawStream::new(io, segments)),
        }
    }

    pub(crate) fn buffer(data: Vec<u8>) -> Self {
        DataStream {
            inner: StreamKind::Buffer(BufferStream::new(data)),
        }
    }

    pub(crate) fn compressed(stream: CompressedStream<'v, B>) -> Self {
        DataStream {
            inner: StreamKind::Compressed(stream),
        }
    }

    /// Logical size in bytes (uncompressed size for compressed content).
    pub fn size(&self) -> u64 {
        match &self.inner {
            StreamKind::Raw(s) => s.size(),
            StreamKind::Buffer(s) => s.size(),
            StreamKind::Compressed(s) => s.size(),
        }
    }

    /// Current stream position.
    pub fn offset(&self) -> u64 {
        match &self.inner {
            StreamKind::Raw(s) => s.position,
            StreamKind::Buffer(s) => s.position,
            StreamKind::Compressed(s) => s.position(),
        }
    }

    /// Read from the current position, advancing it.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        match &mut self.inner {
            StreamKind::Raw(s) => s.read(buf),
            StreamKind::Buffer(s) => s.read(buf),
            StreamKind::Compressed(s) => s.read(buf),
        }
    }

    /// Read at an absolute offset; the stream position is unaffected.
    pub fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        match &mut self.inner {
            StreamKind::Raw(s) => s.read_at(offset, buf),
            StreamKind::Buffer(s) => s.read_at(offset, buf),
            StreamKind::Compressed(s) => s.read_at(offset, buf),
        }
    }

    /// Read everything from the current position to the end.
    pub fn read_to_end(&mut self) -> Result<Vec<u8>> {
        let remaining = self.size().saturating_sub(self.offset()) as usize;
        let mut buf = vec![0u8; remaining];
        let mut total = 0;
        while total < buf.len() {
            match self.read(&mut buf[total..])? {
                0 => break,
                n => total += n,
            }
        }
        buf.truncate(total);
        Ok(buf)
    }

    pub fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        let size = self.size();
        match &mut self.inner {
            StreamKind::Raw(s) => {
                s.position = resolve_seek(s.position, size, pos)?;
                Ok(s.position)
            }
            StreamKind::Buffer(s) => {
                s.position = resolve_seek(s.position, size, pos)?;
                Ok(s.position)
            }
            StreamKind::Compressed(s) => s.seek_to(pos),
        }
    }

    /// Number of extent segments backing this stream (zero for inline
    /// buffers).
    pub fn extent_count(&self) -> usize {
        self.backing_segments().map_or(0, |s| s.len())
    }

    /// The i-th extent segment as (disk offset, size, flags).
    pub fn extent_at(&self, index: usize) -> Option<(u64, u64, u32)> {
        self.backing_segments()
            .and_then(|s| s.get(index))
            .map(|s| (s.offset, s.size, s.flags))
    }

    fn backing_segments(&self) -> Option<&[ExtentSegment]> {
        match &self.inner {
            StreamKind::Raw(s) => Some(s.segments()),
            StreamKind::Buffer(_) => None,
            StreamKind::Compressed(s) => s.backing_segments(),
        }
    }
}

impl<B: BlockIo> std::io::Read for DataStream<'_, B> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        DataStream::read(self, buf).map_err(std::io::Error::other)
    }
}

impl<B: BlockIo> std::io::Seek for DataStream<'_, B> {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        DataStream::seek(self, pos).map_err(std::io::Error::other)
    }
}
