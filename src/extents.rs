//! Fork descriptors, the extents-overflow layer and extent-list
//! construction.
//!
//! A fork carries up to eight inline extents; anything beyond lives in the
//! extents overflow B-tree keyed by (fork type, CNID, start block). The
//! extent list flattens both into byte-addressed segments whose sizes sum
//! to the fork's logical size.

use byteorder::{BigEndian, ReadBytesExt};
use std::cmp::Ordering;
use std::io::Cursor;
use std::sync::Mutex;

use crate::blockio::{BlockIo, IoHandle};
use crate::btree::{BtreeFile, NodeCache};
use crate::error::{HfsError, Result};
use crate::volume::HfsExtent;

/// Fork types used in extents-overflow keys.
pub const FORK_TYPE_DATA: u8 = 0x00;
pub const FORK_TYPE_RESOURCE: u8 = 0xFF;

/// Segment flag: no backing storage, reads as zeroes.
pub const EXTENT_IS_SPARSE: u32 = 0x00000001;

/// A contiguous run of allocation blocks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtentDescriptor {
    pub start_block: u32,
    pub block_count: u32,
}

/// The on-disk fork descriptor: logical size plus the first eight extents.
#[derive(Debug, Clone, Default)]
pub struct ForkDescriptor {
    pub logical_size: u64,
    pub clump_size: u32,
    pub total_blocks: u32,
    pub extents: [ExtentDescriptor; 8],
}

impl ForkDescriptor {
    /// Parse the 80-byte on-disk form.
    pub(crate) fn parse(cursor: &mut Cursor<&[u8]>) -> Result<Self> {
        let logical_size = cursor.read_u64::<BigEndian>()?;
        let clump_size = cursor.read_u32::<BigEndian>()?;
        let total_blocks = cursor.read_u32::<BigEndian>()?;
        let mut extents = [ExtentDescriptor::default(); 8];
        for extent in &mut extents {
            extent.start_block = cursor.read_u32::<BigEndian>()?;
            extent.block_count = cursor.read_u32::<BigEndian>()?;
        }
        Ok(ForkDescriptor {
            logical_size,
            clump_size,
            total_blocks,
            extents,
        })
    }

    /// Widen a classic-HFS fork (32-bit size, three 16-bit extents) to the
    /// common model.
    pub(crate) fn from_hfs(size: u32, extents: &[HfsExtent; 3], block_size: u32) -> Self {
        let mut wide = [ExtentDescriptor::default(); 8];
        for (dst, src) in wide.iter_mut().zip(extents.iter()) {
            dst.start_block = src.start_block as u32;
            dst.block_count = src.block_count as u32;
        }
        ForkDescriptor {
            logical_size: size as u64,
            clump_size: 0,
            total_blocks: (size as u64).div_ceil(block_size as u64) as u32,
            extents: wide,
        }
    }

    /// Number of allocation blocks covered by the inline extents.
    pub fn inline_blocks(&self) -> u32 {
        self.extents
            .iter()
            .take_while(|e| e.block_count != 0)
            .map(|e| e.block_count)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.logical_size == 0
    }
}

/// A byte-addressed run of fork content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtentSegment {
    /// Absolute byte offset on the volume (meaningless when sparse).
    pub offset: u64,
    /// Length in bytes.
    pub size: u64,
    pub flags: u32,
}

/// Geometry needed to turn allocation blocks into byte offsets. Classic HFS
/// volumes place allocation block 0 at `drAlBlSt * 512` rather than at the
/// volume start.
#[derive(Debug, Clone, Copy)]
pub(crate) struct BlockMap {
    pub block_size: u32,
    pub allocation_base: u64,
    /// Classic volumes key the overflow tree with 16-bit fields.
    pub classic: bool,
}

impl BlockMap {
    fn byte_offset(&self, block: u32) -> u64 {
        self.allocation_base + block as u64 * self.block_size as u64
    }
}

/// Parse an extents-overflow leaf record key. Returns
/// (fork type, CNID, start block, key end offset).
fn parse_overflow_key(data: &[u8], classic: bool) -> Result<(u8, u32, u32, usize)> {
    if classic {
        if data.len() < 8 {
            return Err(HfsError::InvalidBTree("extents key too short".into()));
        }
        let key_length = data[0] as usize;
        let fork_type = data[1];
        let cnid = u32::from_be_bytes([data[2], data[3], data[4], data[5]]);
        let start_block = u16::from_be_bytes([data[6], data[7]]) as u32;
        let end = 1 + key_length;
        Ok((fork_type, cnid, start_block, end + (end & 1)))
    } else {
        if data.len() < 12 {
            return Err(HfsError::InvalidBTree("extents key too short".into()));
        }
        let key_length = u16::from_be_bytes([data[0], data[1]]) as usize;
        let fork_type = data[2];
        let cnid = u32::from_be_bytes([data[4], data[5], data[6], data[7]]);
        let start_block = u32::from_be_bytes([data[8], data[9], data[10], data[11]]);
        let end = 2 + key_length;
        Ok((fork_type, cnid, start_block, end + (end & 1)))
    }
}

/// Order an overflow record key against a target, by CNID, fork type, then
/// start block.
fn compare_overflow_key(
    data: &[u8],
    classic: bool,
    cnid: u32,
    fork_type: u8,
    start_block: u32,
) -> Ordering {
    let (rec_fork, rec_cnid, rec_start, _) = match parse_overflow_key(data, classic) {
        Ok(parsed) => parsed,
        Err(_) => return Ordering::Less,
    };
    match rec_cnid.cmp(&cnid) {
        Ordering::Equal => {}
        ord => return ord,
    }
    match rec_fork.cmp(&fork_type) {
        Ordering::Equal => {}
        ord => return ord,
    }
    rec_start.cmp(&start_block)
}

/// Parse the extent array following an overflow record key.
fn parse_overflow_record(data: &[u8], classic: bool) -> Result<Vec<ExtentDescriptor>> {
    let (_, _, _, key_end) = parse_overflow_key(data, classic)?;
    let payload = &data[key_end.min(data.len())..];
    let mut cursor = Cursor::new(payload);
    let count = if classic { 3 } else { 8 };
    let mut extents = Vec::with_capacity(count);
    for _ in 0..count {
        let (start_block, block_count) = if classic {
            (
                cursor.read_u16::<BigEndian>()? as u32,
                cursor.read_u16::<BigEndian>()? as u32,
            )
        } else {
            (
                cursor.read_u32::<BigEndian>()?,
                cursor.read_u32::<BigEndian>()?,
            )
        };
        extents.push(ExtentDescriptor {
            start_block,
            block_count,
        });
    }
    Ok(extents)
}

/// Find the overflow record for (CNID, fork type, start block).
fn lookup_overflow<B: BlockIo>(
    io: &IoHandle<B>,
    tree: &BtreeFile,
    cache: &Mutex<NodeCache>,
    map: &BlockMap,
    cnid: u32,
    fork_type: u8,
    start_block: u32,
) -> Result<Option<Vec<ExtentDescriptor>>> {
    let classic = map.classic;
    let compare =
        move |data: &[u8]| compare_overflow_key(data, classic, cnid, fork_type, start_block);
    match tree.search(io, cache, &compare)? {
        Some((node, index)) => {
            let record = node.record_data(index)?;
            Ok(Some(parse_overflow_record(record, classic)?))
        }
        None => Ok(None),
    }
}

/// Build the full extent list of a fork: inline extents first, then
/// overflow records until the logical size is covered. The final segment is
/// truncated so the sizes sum exactly to `logical_size`.
pub(crate) fn build_extent_list<B: BlockIo>(
    io: &IoHandle<B>,
    overflow: Option<(&BtreeFile, &Mutex<NodeCache>)>,
    map: &BlockMap,
    fork: &ForkDescriptor,
    cnid: u32,
    fork_type: u8,
) -> Result<Vec<ExtentSegment>> {
    let mut segments: Vec<ExtentSegment> = Vec::new();
    let mut covered: u64 = 0;
    let mut blocks_seen: u32 = 0;

    let mut push = |extent: &ExtentDescriptor, covered: &mut u64, blocks_seen: &mut u32| {
        let size = extent.block_count as u64 * map.block_size as u64;
        segments.push(ExtentSegment {
            offset: map.byte_offset(extent.start_block),
            size,
            flags: 0,
        });
        *covered += size;
        *blocks_seen += extent.block_count;
    };

    for extent in &fork.extents {
        if extent.block_count == 0 || covered >= fork.logical_size {
            break;
        }
        push(extent, &mut covered, &mut blocks_seen);
    }

    if let Some((tree, cache)) = overflow {
        while covered < fork.logical_size {
            io.check_abort()?;
            let extents = match lookup_overflow(io, tree, cache, map, cnid, fork_type, blocks_seen)?
            {
                Some(extents) => extents,
                None => break,
            };
            let before = blocks_seen;
            for extent in &extents {
                if extent.block_count == 0 || covered >= fork.logical_size {
                    break;
                }
                push(extent, &mut covered, &mut blocks_seen);
            }
            if blocks_seen == before {
                // An empty record would loop forever.
                break;
            }
        }
    }

    if covered < fork.logical_size {
        return Err(HfsError::CorruptedData(format!(
            "extents cover {} of {} bytes for CNID {}",
            covered, fork.logical_size, cnid
        )));
    }

    // Trim the tail so segment sizes sum to the logical size.
    let mut excess = covered - fork.logical_size;
    while excess > 0 {
        let last = segments
            .last_mut()
            .expect("covered > 0 implies at least one segment");
        if last.size > excess {
            last.size -= excess;
            excess = 0;
        } else {
            excess -= last.size;
            segments.pop();
        }
    }

    Ok(segments)
}
