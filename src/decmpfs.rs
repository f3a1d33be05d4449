//! Transparent `com.apple.decmpfs` decompression.
//!
//! Compressed file content is described by a 16-byte `fpmc` header stored in
//! the `com.apple.decmpfs` extended attribute. The compressed stream lives
//! either inline in the attribute payload or in the resource fork, split
//! into blocks that each decompress to at most 4096 bytes.

use std::io::{Read, SeekFrom};

use crate::blockio::{BlockIo, IoHandle};
use crate::error::{HfsError, Result};
use crate::extents::ExtentSegment;
use crate::lzvn;
use crate::stream::{resolve_seek, BufferStream, RawStream};

/// Name of the extended attribute carrying the compression header.
pub const DECMPFS_ATTRIBUTE_NAME: &str = "com.apple.decmpfs";

/// Uncompressed bytes per compression block.
const CHUNK_SIZE: u64 = 4096;

/// The compression codec family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Codec {
    Deflate,
    Lzvn,
    Lzfse,
}

/// A supported compression method from the `fpmc` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMethod {
    /// 3: DEFLATE, stream inline in the attribute.
    DeflateInline,
    /// 4: DEFLATE, stream in the resource fork.
    DeflateResource,
    /// 7: LZVN, inline.
    LzvnInline,
    /// 8: LZVN, resource fork.
    LzvnResource,
    /// 11: LZFSE, inline.
    LzfseInline,
    /// 12: LZFSE, resource fork.
    LzfseResource,
}

impl CompressionMethod {
    pub fn from_code(code: u32) -> Result<Self> {
        match code {
            3 => Ok(CompressionMethod::DeflateInline),
            4 => Ok(CompressionMethod::DeflateResource),
            7 => Ok(CompressionMethod::LzvnInline),
            8 => Ok(CompressionMethod::LzvnResource),
            11 => Ok(CompressionMethod::LzfseInline),
            12 => Ok(CompressionMethod::LzfseResource),
            other => Err(HfsError::Unsupported(format!(
                "compression method {}",
                other
            ))),
        }
    }

    /// Methods 4, 8 and 12 keep the compressed stream in the resource fork.
    pub fn uses_resource_fork(&self) -> bool {
        matches!(
            self,
            CompressionMethod::DeflateResource
                | CompressionMethod::LzvnResource
                | CompressionMethod::LzfseResource
        )
    }

    fn codec(&self) -> Codec {
        match self {
            CompressionMethod::DeflateInline | CompressionMethod::DeflateResource => Codec::Deflate,
            CompressionMethod::LzvnInline | CompressionMethod::LzvnResource => Codec::Lzvn,
            CompressionMethod::LzfseInline | CompressionMethod::LzfseResource => Codec::Lzfse,
        }
    }
}

/// The 16-byte `fpmc` header. Unlike everything else on an HFS+ volume its
/// integer fields are little-endian.
#[derive(Debug, Clone)]
pub struct CompressedDataHeader {
    pub method: u32,
    pub uncompressed_size: u64,
}

impl CompressedDataHeader {
    pub const SIZE: usize = 16;

    /// Parse the header. Returns `None` when the signature does not match
    /// (the attribute then holds something other than compressed content).
    pub fn parse(data: &[u8]) -> Result<Option<Self>> {
        if data.len() < Self::SIZE {
            return Ok(None);
        }
        if &data[0..4] != b"fpmc" {
            return Ok(None);
        }
        let method = u32::from_le_bytes([data[4], data[5], data[6], data[7]]);
        let uncompressed_size = u64::from_le_bytes([
            data[8], data[9], data[10], data[11], data[12], data[13], data[14], data[15],
        ]);
        Ok(Some(CompressedDataHeader {
            method,
            uncompressed_size,
        }))
    }
}

/// Where the compressed blocks are read from.
enum Backing<'v, B: BlockIo> {
    Fork(RawStream<'v, B>),
    Inline(BufferStream),
}

impl<B: BlockIo> Backing<'_, B> {
    fn size(&self) -> u64 {
        match self {
            Backing::Fork(s) => s.size(),
            Backing::Inline(s) => s.size(),
        }
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        match self {
            Backing::Fork(s) => s.read_at(offset, buf),
            Backing::Inline(s) => s.read_at(offset, buf),
        }
    }

    fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        let count = self.read_at(offset, buf)?;
        if count != buf.len() {
            return Err(HfsError::CorruptedData(format!(
                "compressed stream truncated: wanted {} bytes at {}, got {}",
                buf.len(),
                offset,
                count
            )));
        }
        Ok(())
    }
}

/// Decompress-on-demand view of a compressed fork with a one-block cache.
pub struct CompressedStream<'v, B: BlockIo> {
    io: &'v IoHandle<B>,
    codec: Codec,
    backing: Backing<'v, B>,
    /// (offset within the backing stream, compressed size) per block.
    blocks: Vec<(u64, u64)>,
    uncompressed_size: u64,
    position: u64,
    cached_block: Option<usize>,
    cache: Vec<u8>,
}

impl<'v, B: BlockIo> CompressedStream<'v, B> {
    /// Build from an inline attribute payload (the 16-byte header included).
    pub(crate) fn new_inline(
        io: &'v IoHandle<B>,
        method: CompressionMethod,
        uncompressed_size: u64,
        payload: Vec<u8>,
    ) -> Result<Self> {
        let header = CompressedDataHeader::SIZE as u64;
        let payload_size = payload.len() as u64;
        if payload_size < header {
            return Err(HfsError::CorruptedData(
                "inline compressed payload shorter than its header".into(),
            ));
        }

        let blocks = if uncompressed_size <= CHUNK_SIZE {
            // Small content: the compressed stream directly follows the
            // header, no block table.
            vec![(header, payload_size - header)]
        } else {
            // Block table: u32 table size, then table_size/4 - 1 offsets
            // relative to the table start.
            if payload_size < header + 4 {
                return Err(HfsError::CorruptedData(
                    "inline compressed payload lacks a block table".into(),
                ));
            }
            let table_size = u32::from_le_bytes([
                payload[header as usize],
                payload[header as usize + 1],
                payload[header as usize + 2],
                payload[header as usize + 3],
            ]) as u64;
            if table_size < 8 || table_size % 4 != 0 || header + table_size > payload_size {
                return Err(HfsError::CorruptedData(format!(
                    "invalid inline block table size {}",
                    table_size
                )));
            }
            let count = (table_size / 4 - 1) as usize;
            let mut boundaries = Vec::with_capacity(count + 1);
            for i in 0..count {
                let at = header as usize + 4 + i * 4;
                let entry = u32::from_le_bytes([
                    payload[at],
                    payload[at + 1],
                    payload[at + 2],
                    payload[at + 3],
                ]) as u64;
                boundaries.push(header + entry);
            }
            boundaries.push(payload_size);
            boundaries_to_blocks(&boundaries, payload_size)?
        };

        let stream = CompressedStream {
            io,
            codec: method.codec(),
            backing: Backing::Inline(BufferStream::new(payload)),
            blocks,
            uncompressed_size,
            position: 0,
            cached_block: None,
            cache: Vec::new(),
        };
        stream.validate_block_count()?;
        Ok(stream)
    }

    /// Build from the resource fork of the file.
    pub(crate) fn new_resource(
        io: &'v IoHandle<B>,
        method: CompressionMethod,
        uncompressed_size: u64,
        resource: RawStream<'v, B>,
    ) -> Result<Self> {
        let backing = Backing::Fork(resource);

        // A big-endian offset leads to the block table header.
        let mut word = [0u8; 4];
        backing.read_exact_at(0, &mut word)?;
        let table_offset = u32::from_be_bytes(word) as u64;

        let mut count_buf = [0u8; 4];
        backing.read_exact_at(table_offset, &mut count_buf)?;
        let count = u32::from_le_bytes(count_buf) as usize;

        if count as u64 > backing.size() / 8 {
            return Err(HfsError::CorruptedData(format!(
                "resource block table claims {} blocks in a {}-byte fork",
                count,
                backing.size()
            )));
        }

        let mut entries = vec![0u8; count * 8];
        backing.read_exact_at(table_offset + 4, &mut entries)?;

        let mut blocks = Vec::with_capacity(count);
        for entry in entries.chunks_exact(8) {
            let offset = u32::from_le_bytes([entry[0], entry[1], entry[2], entry[3]]) as u64;
            let size = u32::from_le_bytes([entry[4], entry[5], entry[6], entry[7]]) as u64;
            let start = table_offset + offset;
            if start + size > backing.size() {
                return Err(HfsError::CorruptedData(
                    "resource compression block exceeds the fork".into(),
                ));
            }
            blocks.push((start, size));
        }

        let stream = CompressedStream {
            io,
            codec: method.codec(),
            backing,
            blocks,
            uncompressed_size,
            position: 0,
            cached_block: None,
            cache: Vec::new(),
        };
        stream.validate_block_count()?;
        Ok(stream)
    }

    fn validate_block_count(&self) -> Result<()> {
        let expected = self.uncompressed_size.div_ceil(CHUNK_SIZE) as usize;
        if self.blocks.len() != expected {
            return Err(HfsError::CorruptedData(format!(
                "{} compression blocks for {} uncompressed bytes (expected {})",
                self.blocks.len(),
                self.uncompressed_size,
                expected
            )));
        }
        Ok(())
    }

    pub(crate) fn size(&self) -> u64 {
        self.uncompressed_size
    }

    pub(crate) fn position(&self) -> u64 {
        self.position
    }

    pub(crate) fn backing_segments(&self) -> Option<&[ExtentSegment]> {
        match &self.backing {
            Backing::Fork(s) => Some(s.segments()),
            Backing::Inline(_) => None,
        }
    }

    /// Uncompressed size of one block.
    fn block_output_size(&self, index: usize) -> u64 {
        (self.uncompressed_size - index as u64 * CHUNK_SIZE).min(CHUNK_SIZE)
    }

    /// Decompress block `index` into the one-block cache unless it is
    /// already there.
    fn load_block(&mut self, index: usize) -> Result<()> {
        if self.cached_block == Some(index) {
            return Ok(());
        }
        let (offset, size) = self.blocks[index];
        let mut compressed = vec![0u8; size as usize];
        self.backing.read_exact_at(offset, &mut compressed)?;

        let expected = self.block_output_size(index) as usize;
        self.cache = decompress_block(self.codec, &compressed, expected)?;
        self.cached_block = Some(index);
        Ok(())
    }

    pub(crate) fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        if offset >= self.uncompressed_size || buf.is_empty() {
            return Ok(0);
        }
        let mut total = 0usize;
        let wanted = ((self.uncompressed_size - offset) as usize).min(buf.len());
        let mut at = offset;

        while total < wanted {
            self.io.check_abort()?;
            let block_index = (at / CHUNK_SIZE) as usize;
            let within = (at % CHUNK_SIZE) as usize;
            self.load_block(block_index)?;
            let available = self.cache.len().saturating_sub(within);
            if available == 0 {
                break;
            }
            let chunk = available.min(wanted - total);
            buf[total..total + chunk].copy_from_slice(&self.cache[within..within + chunk]);
            total += chunk;
            at += chunk as u64;
        }
        Ok(total)
    }

    pub(crate) fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let count = self.read_at(self.position, buf)?;
        self.position += count as u64;
        Ok(count)
    }

    pub(crate) fn seek_to(&mut self, pos: SeekFrom) -> Result<u64> {
        self.position = resolve_seek(self.position, self.uncompressed_size, pos)?;
        Ok(self.position)
    }
}

fn boundaries_to_blocks(boundaries: &[u64], payload_size: u64) -> Result<Vec<(u64, u64)>> {
    let mut blocks = Vec::with_capacity(boundaries.len().saturating_sub(1));
    for pair in boundaries.windows(2) {
        let (start, end) = (pair[0], pair[1]);
        if start > end || end > payload_size {
            return Err(HfsError::CorruptedData(
                "inline block table offsets are not monotonic".into(),
            ));
        }
        blocks.push((start, end - start));
    }
    Ok(blocks)
}

/// Decompress one block, enforcing that it yields exactly `expected` bytes.
fn decompress_block(codec: Codec, compressed: &[u8], expected: usize) -> Result<Vec<u8>> {
    if compressed.is_empty() {
        return Err(HfsError::CorruptedData("empty compression block".into()));
    }
    let out = match codec {
        Codec::Deflate => {
            if compressed[0] == 0xFF {
                // Apple convention: the block did not shrink and is stored
                // verbatim behind a 0xFF marker.
                compressed[1..].to_vec()
            } else {
                let mut out = Vec::with_capacity(expected + 1);
                // Real volumes wrap DEFLATE blocks in a zlib envelope;
                // recognize it by the CMF nibble, else assume bare RFC 1951.
                let limit = (expected + 1) as u64;
                if compressed[0] & 0x0F == 8 {
                    flate2::read::ZlibDecoder::new(compressed)
                        .take(limit)
                        .read_to_end(&mut out)
                        .map_err(|e| {
                            HfsError::CorruptedData(format!("DEFLATE block: {}", e))
                        })?;
                } else {
                    flate2::read::DeflateDecoder::new(compressed)
                        .take(limit)
                        .read_to_end(&mut out)
                        .map_err(|e| {
                            HfsError::CorruptedData(format!("DEFLATE block: {}", e))
                        })?;
                }
                out
            }
        }
        Codec::Lzvn => {
            // One byte of slack so an overlong stream is detected rather
            // than silently truncated.
            let mut out = vec![0u8; expected + 1];
            let written = lzvn::decompress(compressed, &mut out)?;
            out.truncate(written);
            out
        }
        Codec::Lzfse => {
            // The decoder wants more scratch space than the real output
            // size.
            let mut scratch = vec![0u8; expected * 2 + 256];
            let written = lzfse::decode_buffer(compressed, &mut scratch)
                .map_err(|e| HfsError::CorruptedData(format!("LZFSE block: {:?}", e)))?;
            scratch.truncate(written);
            scratch
        }
    };

    if out.len() != expected {
        return Err(HfsError::CorruptedData(format!(
            "compression block yields {} bytes, expected {}",
            out.len(),
            expected
        )));
    }
    Ok(out)
}
