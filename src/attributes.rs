//! The attributes B-tree layer and the extended-attribute entity.
//!
//! Attribute records are keyed by (CNID, start block, UTF-16 name). Small
//! values sit inline in the record; large values carry a fork descriptor
//! whose overflow extents follow as separate records with a non-zero start
//! block.

use byteorder::{BigEndian, ReadBytesExt};
use std::cmp::Ordering;
use std::io::{Cursor, Read, SeekFrom};
use std::sync::Mutex;

use crate::blockio::{BlockIo, IoHandle};
use crate::btree::{BtreeFile, NodeCache, ScanControl};
use crate::error::{HfsError, Result};
use crate::extents::{BlockMap, ExtentDescriptor, ExtentSegment, ForkDescriptor};
use crate::stream::DataStream;
use crate::unicode;

/// Attribute record kinds.
const RECORD_TYPE_INLINE_DATA: u32 = 0x00000010;
const RECORD_TYPE_FORK_DATA: u32 = 0x00000020;
const RECORD_TYPE_EXTENTS: u32 = 0x00000030;

/// Payload of one attribute record.
#[derive(Debug, Clone)]
pub(crate) enum AttributeData {
    Inline(Vec<u8>),
    Fork(ForkDescriptor),
    Extents(Vec<ExtentDescriptor>),
}

/// A parsed attribute record plus any continuation extents collected for
/// its fork.
#[derive(Debug, Clone)]
pub struct AttributeRecord {
    pub(crate) cnid: u32,
    name: String,
    pub(crate) data: AttributeData,
    pub(crate) continuation: Vec<ExtentDescriptor>,
}

impl AttributeRecord {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// CNID of the entry this attribute belongs to.
    pub fn cnid(&self) -> u32 {
        self.cnid
    }

    /// Value size in bytes.
    pub fn size(&self) -> u64 {
        match &self.data {
            AttributeData::Inline(data) => data.len() as u64,
            AttributeData::Fork(fork) => fork.logical_size,
            AttributeData::Extents(_) => 0,
        }
    }

    pub(crate) fn inline_data(&self) -> Option<&[u8]> {
        match &self.data {
            AttributeData::Inline(data) => Some(data),
            _ => None,
        }
    }
}

struct ParsedAttrKey<'a> {
    cnid: u32,
    start_block: u32,
    name: &'a [u8],
    record_offset: usize,
}

fn parse_attr_key(data: &[u8]) -> Result<ParsedAttrKey<'_>> {
    if data.len() < 14 {
        return Err(HfsError::InvalidBTree("attribute key too short".into()));
    }
    let key_length = u16::from_be_bytes([data[0], data[1]]) as usize;
    let cnid = u32::from_be_bytes([data[4], data[5], data[6], data[7]]);
    let start_block = u32::from_be_bytes([data[8], data[9], data[10], data[11]]);
    let name_length = u16::from_be_bytes([data[12], data[13]]) as usize;
    let name_end = 14 + name_length * 2;
    if name_end > data.len() || 2 + key_length > data.len() {
        return Err(HfsError::InvalidBTree(
            "attribute key name exceeds record".into(),
        ));
    }
    let record_offset = 2 + key_length;
    Ok(ParsedAttrKey {
        cnid,
        start_block,
        name: &data[14..name_end],
        record_offset: record_offset + (record_offset & 1),
    })
}

/// Order an attribute key against (CNID, name, start block); names compare
/// under the same rules as catalog names.
fn compare_attr_key(
    data: &[u8],
    case_folded: bool,
    cnid: u32,
    name: &[u16],
    start_block: u32,
) -> Ordering {
    let key = match parse_attr_key(data) {
        Ok(key) => key,
        Err(_) => return Ordering::Less,
    };
    match key.cnid.cmp(&cnid) {
        Ordering::Equal => {}
        ord => return ord,
    }
    let record_units = unicode::utf16be_units(key.name);
    let order = if case_folded {
        unicode::compare_case_insensitive_iter(record_units, name.iter().copied())
    } else {
        unicode::compare_binary_iter(record_units, name.iter().copied())
    };
    match order {
        Ordering::Equal => {}
        ord => return ord,
    }
    key.start_block.cmp(&start_block)
}

/// Parse the record payload following the key.
fn parse_attr_data(data: &[u8]) -> Result<AttributeData> {
    if data.len() < 4 {
        return Err(HfsError::InvalidBTree("attribute record too short".into()));
    }
    let record_type = u32::from_be_bytes([data[0], data[1], data[2], data[3]]);
    let mut cursor = Cursor::new(data);
    cursor.set_position(4);

    match record_type {
        RECORD_TYPE_INLINE_DATA => {
            let _reserved1 = cursor.read_u32::<BigEndian>()?;
            let _reserved2 = cursor.read_u32::<BigEndian>()?;
            let size = cursor.read_u32::<BigEndian>()? as usize;
            let mut payload = vec![0u8; size];
            cursor.read_exact(&mut payload)?;
            Ok(AttributeData::Inline(payload))
        }
        RECORD_TYPE_FORK_DATA => {
            let _reserved = cursor.read_u32::<BigEndian>()?;
            Ok(AttributeData::Fork(ForkDescriptor::parse(&mut cursor)?))
        }
        RECORD_TYPE_EXTENTS => {
            let _reserved = cursor.read_u32::<BigEndian>()?;
            let mut extents = Vec::with_capacity(8);
            for _ in 0..8 {
                extents.push(ExtentDescriptor {
                    start_block: cursor.read_u32::<BigEndian>()?,
                    block_count: cursor.read_u32::<BigEndian>()?,
                });
            }
            Ok(AttributeData::Extents(extents))
        }
        other => Err(HfsError::Unsupported(format!(
            "attribute record type 0x{:08X}",
            other
        ))),
    }
}

/// List all attributes of one CNID in key order. Continuation extents are
/// folded into the fork record they extend.
pub(crate) fn list_attributes<B: BlockIo>(
    io: &IoHandle<B>,
    tree: &BtreeFile,
    cache: &Mutex<NodeCache>,
    case_folded: bool,
    cnid: u32,
) -> Result<Vec<AttributeRecord>> {
    let compare = |data: &[u8]| compare_attr_key(data, case_folded, cnid, &[], 0);

    let mut records: Vec<AttributeRecord> = Vec::new();
    tree.scan(io, cache, &compare, |data| {
        let key = match parse_attr_key(data) {
            Ok(key) => key,
            Err(_) => return Ok(ScanControl::Continue),
        };
        if key.cnid < cnid {
            return Ok(ScanControl::Continue);
        }
        if key.cnid > cnid {
            return Ok(ScanControl::Stop);
        }
        if key.record_offset >= data.len() {
            return Err(HfsError::InvalidBTree(
                "attribute record data missing after key".into(),
            ));
        }
        let name = unicode::units_to_string(&unicode::utf16be_to_units(key.name));
        let payload = parse_attr_data(&data[key.record_offset..])?;
        match payload {
            AttributeData::Extents(extents) => {
                // Continuation of the most recent fork record of this name.
                if let Some(record) = records
                    .iter_mut()
                    .rev()
                    .find(|record| record.name == name)
                {
                    record.continuation.extend(extents);
                }
            }
            payload => {
                records.push(AttributeRecord {
                    cnid,
                    name,
                    data: payload,
                    continuation: Vec::new(),
                });
            }
        }
        Ok(ScanControl::Continue)
    })?;
    Ok(records)
}

/// Fetch one attribute by name, including its continuation extents.
pub(crate) fn get_attribute<B: BlockIo>(
    io: &IoHandle<B>,
    tree: &BtreeFile,
    cache: &Mutex<NodeCache>,
    case_folded: bool,
    cnid: u32,
    name: &str,
) -> Result<Option<AttributeRecord>> {
    let target = unicode::str_to_units(name);
    let compare = |data: &[u8]| compare_attr_key(data, case_folded, cnid, &target, 0);

    let (node, index) = match tree.search(io, cache, &compare)? {
        Some(hit) => hit,
        None => return Ok(None),
    };
    let data = node.record_data(index)?;
    let key = parse_attr_key(data)?;
    if key.record_offset >= data.len() {
        return Err(HfsError::InvalidBTree(
            "attribute record data missing after key".into(),
        ));
    }
    let payload = parse_attr_data(&data[key.record_offset..])?;
    let mut record = AttributeRecord {
        cnid,
        name: unicode::units_to_string(&unicode::utf16be_to_units(key.name)),
        data: payload,
        continuation: Vec::new(),
    };

    if matches!(record.data, AttributeData::Fork(_)) {
        collect_continuation(io, tree, cache, case_folded, cnid, &target, &mut record)?;
    }
    Ok(Some(record))
}

/// Gather EXTENTS records (start block > 0) continuing a fork attribute.
fn collect_continuation<B: BlockIo>(
    io: &IoHandle<B>,
    tree: &BtreeFile,
    cache: &Mutex<NodeCache>,
    case_folded: bool,
    cnid: u32,
    name: &[u16],
    record: &mut AttributeRecord,
) -> Result<()> {
    let compare = |data: &[u8]| compare_attr_key(data, case_folded, cnid, name, 0);
    let mut extents = Vec::new();
    tree.scan(io, cache, &compare, |data| {
        let key = match parse_attr_key(data) {
            Ok(key) => key,
            Err(_) => return Ok(ScanControl::Continue),
        };
        if key.cnid < cnid {
            return Ok(ScanControl::Continue);
        }
        if key.cnid > cnid {
            return Ok(ScanControl::Stop);
        }
        let record_units = unicode::utf16be_units(key.name);
        let same_name = if case_folded {
            unicode::compare_case_insensitive_iter(record_units, name.iter().copied())
        } else {
            unicode::compare_binary_iter(record_units, name.iter().copied())
        } == Ordering::Equal;
        if !same_name {
            // Keys of one CNID are contiguous by name; once past it, stop.
            return if extents.is_empty() {
                Ok(ScanControl::Continue)
            } else {
                Ok(ScanControl::Stop)
            };
        }
        if key.start_block > 0 {
            if key.record_offset >= data.len() {
                return Err(HfsError::InvalidBTree(
                    "attribute record data missing after key".into(),
                ));
            }
            if let AttributeData::Extents(more) = parse_attr_data(&data[key.record_offset..])? {
                extents.extend(more);
            }
        }
        Ok(ScanControl::Continue)
    })?;
    record.continuation = extents;
    Ok(())
}

/// Build the extent segments of a fork-backed attribute value: the fork's
/// inline extents followed by its continuation records.
pub(crate) fn attribute_segments(
    map: &BlockMap,
    fork: &ForkDescriptor,
    continuation: &[ExtentDescriptor],
) -> Result<Vec<ExtentSegment>> {
    let mut segments = Vec::new();
    let mut covered = 0u64;
    for extent in fork.extents.iter().chain(continuation.iter()) {
        if extent.block_count == 0 || covered >= fork.logical_size {
            continue;
        }
        let size = extent.block_count as u64 * map.block_size as u64;
        segments.push(ExtentSegment {
            offset: map.allocation_base + extent.start_block as u64 * map.block_size as u64,
            size,
            flags: 0,
        });
        covered += size;
    }
    if covered < fork.logical_size {
        return Err(HfsError::CorruptedData(format!(
            "attribute extents cover {} of {} bytes",
            covered, fork.logical_size
        )));
    }
    let mut excess = covered - fork.logical_size;
    while excess > 0 {
        let last = segments.last_mut().expect("covered implies segments");
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

/// One extended attribute of a file entry. Owns its record and lazily
/// materializes a data stream on first read.
pub struct ExtendedAttribute<'v, B: BlockIo> {
    io: &'v IoHandle<B>,
    map: BlockMap,
    record: AttributeRecord,
    stream: Option<DataStream<'v, B>>,
}

impl<'v, B: BlockIo> ExtendedAttribute<'v, B> {
    pub(crate) fn new(io: &'v IoHandle<B>, map: BlockMap, record: AttributeRecord) -> Self {
        ExtendedAttribute {
            io,
            map,
            record,
            stream: None,
        }
    }

    pub fn name(&self) -> &str {
        self.record.name()
    }

    pub fn size(&self) -> u64 {
        self.record.size()
    }

    fn ensure_stream(&mut self) -> Result<&mut DataStream<'v, B>> {
        if self.stream.is_none() {
            let stream = match &self.record.data {
                AttributeData::Inline(data) => DataStream::buffer(data.clone()),
                AttributeData::Fork(fork) => {
                    let segments =
                        attribute_segments(&self.map, fork, &self.record.continuation)?;
                    DataStream::raw(self.io, segments)
                }
                AttributeData::Extents(_) => {
                    return Err(HfsError::CorruptedData(
                        "attribute continuation record has no value of its own".into(),
                    ));
                }
            };
            self.stream = Some(stream);
        }
        Ok(self.stream.as_mut().expect("stream just materialized"))
    }

    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.ensure_stream()?.read(buf)
    }

    pub fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        self.ensure_stream()?.read_at(offset, buf)
    }

    pub fn read_to_end(&mut self) -> Result<Vec<u8>> {
        self.ensure_stream()?.read_to_end()
    }

    pub fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        self.ensure_stream()?.seek(pos)
    }

    pub fn offset(&self) -> u64 {
        self.stream.as_ref().map_or(0, |s| s.offset())
    }
}
