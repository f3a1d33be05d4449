//! The catalog layer: keys, records and lookups for both catalog variants.
//!
//! HFS+ keys carry UTF-16 names ordered case-folded (or binary on HFSX);
//! classic HFS keys carry MacRoman Pascal strings ordered through an
//! upper-case table. Directory listings are parent-CNID range scans, and
//! thread records invert a CNID back to its (parent, name) pair.

use byteorder::{BigEndian, ReadBytesExt};
use std::cmp::Ordering;
use std::io::{Cursor, Read};
use std::sync::Mutex;

use crate::blockio::{BlockIo, IoHandle};
use crate::btree::{BtreeFile, NodeCache, ScanControl};
use crate::error::{HfsError, Result};
use crate::extents::ForkDescriptor;
use crate::macroman;
use crate::unicode;

/// Well-known catalog node identifiers.
pub const CNID_ROOT_PARENT: u32 = 1;
pub const CNID_ROOT_FOLDER: u32 = 2;
pub const CNID_EXTENTS_FILE: u32 = 3;
pub const CNID_CATALOG_FILE: u32 = 4;
pub const CNID_BAD_BLOCKS_FILE: u32 = 5;
pub const CNID_ALLOCATION_FILE: u32 = 6;
pub const CNID_STARTUP_FILE: u32 = 7;
pub const CNID_ATTRIBUTES_FILE: u32 = 8;
pub const CNID_FIRST_USER: u32 = 16;

// HFS+ catalog record types.
const RECORD_TYPE_FOLDER: u16 = 0x0001;
const RECORD_TYPE_FILE: u16 = 0x0002;
const RECORD_TYPE_FOLDER_THREAD: u16 = 0x0003;
const RECORD_TYPE_FILE_THREAD: u16 = 0x0004;

// Classic HFS record types (record kind byte in the high byte).
const RECORD_TYPE_HFS_FOLDER: u16 = 0x0100;
const RECORD_TYPE_HFS_FILE: u16 = 0x0200;
const RECORD_TYPE_HFS_FOLDER_THREAD: u16 = 0x0300;
const RECORD_TYPE_HFS_FILE_THREAD: u16 = 0x0400;

/// Catalog record flag: the CNID has records in the attributes tree.
pub const FLAG_HAS_ATTRIBUTES: u16 = 0x0004;

/// Catalog record flag: the file takes part in a hard-link chain.
pub const FLAG_HAS_LINK_CHAIN: u16 = 0x0020;

/// Synthesized file modes for classic HFS, which stores none.
pub const FILE_MODE_DIRECTORY: u16 = 0x4000;
pub const FILE_MODE_REGULAR: u16 = 0x8000;
const FILE_MODE_TYPE_MASK: u16 = 0o170000;
const FILE_MODE_SYMLINK: u16 = 0o120000;

/// The hidden folder holding hard-link indirect nodes.
pub(crate) const PRIVATE_DATA_FOLDER: &str = "\u{0}\u{0}\u{0}\u{0}HFS+ Private Data";

/// Finder type/creator marking a file record as a hard-link reference.
const LINK_FINDER_TYPE: &[u8; 4] = b"hlnk";
const LINK_FINDER_CREATOR: &[u8; 4] = b"hfs+";

/// Which catalog dialect the volume speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CatalogVariant {
    /// HFS+ / HFSX; `case_folded` is false for binary-keyed HFSX trees.
    HfsPlus { case_folded: bool },
    /// Classic HFS with MacRoman names.
    Hfs,
}

impl CatalogVariant {
    fn classic(&self) -> bool {
        matches!(self, CatalogVariant::Hfs)
    }
}

/// BSD permission info of an HFS+ record.
#[derive(Debug, Clone, Default)]
pub struct BsdInfo {
    pub owner_id: u32,
    pub group_id: u32,
    pub admin_flags: u8,
    pub owner_flags: u8,
    pub file_mode: u16,
    /// Device number, hard-link reference number or link count, depending
    /// on the record.
    pub special: u32,
}

/// Folder metadata common to both catalog variants. Classic records leave
/// the HFS+-only fields empty.
#[derive(Debug, Clone)]
pub struct FolderRecord {
    pub flags: u16,
    pub valence: u32,
    pub id: u32,
    pub create_date: u32,
    pub content_mod_date: u32,
    pub attribute_mod_date: Option<u32>,
    pub access_date: Option<u32>,
    pub backup_date: u32,
    pub bsd: Option<BsdInfo>,
    pub finder_info: [u8; 32],
    pub text_encoding: u32,
}

/// File metadata plus the two fork descriptors.
#[derive(Debug, Clone)]
pub struct FileRecord {
    pub flags: u16,
    pub id: u32,
    pub create_date: u32,
    pub content_mod_date: u32,
    pub attribute_mod_date: Option<u32>,
    pub access_date: Option<u32>,
    pub backup_date: u32,
    pub bsd: Option<BsdInfo>,
    pub finder_info: [u8; 32],
    pub text_encoding: u32,
    pub data_fork: ForkDescriptor,
    pub resource_fork: ForkDescriptor,
}

/// Reverse pointer from a CNID to its parent and name.
#[derive(Debug, Clone)]
pub struct ThreadRecord {
    pub parent_id: u32,
    pub name: String,
}

#[derive(Debug, Clone)]
pub enum CatalogRecord {
    Folder(FolderRecord),
    File(FileRecord),
    FolderThread(ThreadRecord),
    FileThread(ThreadRecord),
}

impl CatalogRecord {
    pub fn is_thread(&self) -> bool {
        matches!(
            self,
            CatalogRecord::FolderThread(_) | CatalogRecord::FileThread(_)
        )
    }
}

/// A named catalog entry as returned by listings and lookups.
#[derive(Debug, Clone)]
pub struct DirectoryEntry {
    /// Decoded name, original case preserved.
    pub name: String,
    pub parent_id: u32,
    pub record: CatalogRecord,
}

impl DirectoryEntry {
    pub fn identifier(&self) -> u32 {
        match &self.record {
            CatalogRecord::Folder(f) => f.id,
            CatalogRecord::File(f) => f.id,
            CatalogRecord::FolderThread(_) | CatalogRecord::FileThread(_) => 0,
        }
    }

    pub fn is_directory(&self) -> bool {
        matches!(self.record, CatalogRecord::Folder(_))
    }

    pub fn is_file(&self) -> bool {
        matches!(self.record, CatalogRecord::File(_))
    }

    pub fn is_symlink(&self) -> bool {
        self.file_mode() & FILE_MODE_TYPE_MASK == FILE_MODE_SYMLINK
    }

    pub fn flags(&self) -> u16 {
        match &self.record {
            CatalogRecord::Folder(f) => f.flags,
            CatalogRecord::File(f) => f.flags,
            _ => 0,
        }
    }

    /// File mode; synthesized from the record type on classic HFS.
    pub fn file_mode(&self) -> u16 {
        match &self.record {
            CatalogRecord::Folder(f) => f
                .bsd
                .as_ref()
                .map(|bsd| bsd.file_mode)
                .unwrap_or(FILE_MODE_DIRECTORY),
            CatalogRecord::File(f) => f
                .bsd
                .as_ref()
                .map(|bsd| bsd.file_mode)
                .unwrap_or(FILE_MODE_REGULAR),
            _ => 0,
        }
    }

    /// Hard-link reference number, when this record is an indirect-node
    /// reference (link-chain flag plus the `hlnk`/`hfs+` Finder marker).
    pub fn link_reference(&self) -> Option<u32> {
        let file = match &self.record {
            CatalogRecord::File(f) => f,
            _ => return None,
        };
        if file.flags & FLAG_HAS_LINK_CHAIN == 0 {
            return None;
        }
        if &file.finder_info[0..4] != LINK_FINDER_TYPE
            || &file.finder_info[4..8] != LINK_FINDER_CREATOR
        {
            return None;
        }
        file.bsd.as_ref().map(|bsd| bsd.special)
    }

    /// POSIX added time (signed seconds since 1970) from the extended
    /// Finder info; never available on classic HFS.
    pub fn added_time(&self) -> Option<i32> {
        let (finder_info, classic) = match &self.record {
            CatalogRecord::Folder(f) => (&f.finder_info, f.bsd.is_none()),
            CatalogRecord::File(f) => (&f.finder_info, f.bsd.is_none()),
            _ => return None,
        };
        if classic {
            return None;
        }
        let raw = i32::from_be_bytes([
            finder_info[20],
            finder_info[21],
            finder_info[22],
            finder_info[23],
        ]);
        if raw == 0 {
            None
        } else {
            Some(raw)
        }
    }
}

/// Parsed catalog key: parent CNID plus the span of the name within the
/// record bytes. Names stay in their on-disk encoding until needed.
struct ParsedKey<'a> {
    parent_id: u32,
    name: &'a [u8],
    /// Offset of the record data following the (padded) key.
    record_offset: usize,
}

fn parse_key<'a>(data: &'a [u8], variant: &CatalogVariant) -> Result<ParsedKey<'a>> {
    if variant.classic() {
        if data.len() < 7 {
            return Err(HfsError::InvalidBTree("catalog key too short".into()));
        }
        let key_length = data[0] as usize;
        let parent_id = u32::from_be_bytes([data[2], data[3], data[4], data[5]]);
        let name_length = data[6] as usize;
        let name_end = 7 + name_length;
        if name_end > data.len() || 1 + key_length > data.len() {
            return Err(HfsError::InvalidBTree(
                "catalog key name exceeds record".into(),
            ));
        }
        let record_offset = 1 + key_length;
        Ok(ParsedKey {
            parent_id,
            name: &data[7..name_end],
            record_offset: record_offset + (record_offset & 1),
        })
    } else {
        if data.len() < 8 {
            return Err(HfsError::InvalidBTree("catalog key too short".into()));
        }
        let key_length = u16::from_be_bytes([data[0], data[1]]) as usize;
        let parent_id = u32::from_be_bytes([data[2], data[3], data[4], data[5]]);
        let name_length = u16::from_be_bytes([data[6], data[7]]) as usize;
        let name_end = 8 + name_length * 2;
        if name_end > data.len() || 2 + key_length > data.len() {
            return Err(HfsError::InvalidBTree(
                "catalog key name exceeds record".into(),
            ));
        }
        let record_offset = 2 + key_length;
        Ok(ParsedKey {
            parent_id,
            name: &data[8..name_end],
            record_offset: record_offset + (record_offset & 1),
        })
    }
}

/// A lookup target name in the volume's native encoding.
pub(crate) enum TargetName {
    Units(Vec<u16>),
    MacRoman(Vec<u8>),
}

impl TargetName {
    /// Encode a UTF-8 name for the given variant. `None` when the name has
    /// no representation there (so the lookup cannot match anything).
    pub(crate) fn encode(name: &str, variant: &CatalogVariant) -> Option<Self> {
        match variant {
            CatalogVariant::HfsPlus { .. } => Some(TargetName::Units(unicode::str_to_units(name))),
            CatalogVariant::Hfs => macroman::encode(name).map(TargetName::MacRoman),
        }
    }

    pub(crate) fn empty(variant: &CatalogVariant) -> Self {
        match variant {
            CatalogVariant::HfsPlus { .. } => TargetName::Units(Vec::new()),
            CatalogVariant::Hfs => TargetName::MacRoman(Vec::new()),
        }
    }
}

/// Order a raw catalog key against (parent, name) under the variant's
/// comparison rules. The hot path does not allocate.
fn compare_key(
    data: &[u8],
    variant: &CatalogVariant,
    parent_id: u32,
    name: &TargetName,
) -> Ordering {
    let key = match parse_key(data, variant) {
        Ok(key) => key,
        Err(_) => return Ordering::Less,
    };
    match key.parent_id.cmp(&parent_id) {
        Ordering::Equal => {}
        ord => return ord,
    }
    match (variant, name) {
        (CatalogVariant::HfsPlus { case_folded }, TargetName::Units(units)) => {
            let record_units = unicode::utf16be_units(key.name);
            if *case_folded {
                unicode::compare_case_insensitive_iter(record_units, units.iter().copied())
            } else {
                unicode::compare_binary_iter(record_units, units.iter().copied())
            }
        }
        (CatalogVariant::Hfs, TargetName::MacRoman(bytes)) => {
            macroman::compare_case_insensitive(key.name, bytes)
        }
        _ => Ordering::Less,
    }
}

fn decode_name(name: &[u8], variant: &CatalogVariant) -> String {
    if variant.classic() {
        macroman::decode(name)
    } else {
        unicode::units_to_string(&unicode::utf16be_to_units(name))
    }
}

fn parse_bsd_info(cursor: &mut Cursor<&[u8]>) -> Result<BsdInfo> {
    Ok(BsdInfo {
        owner_id: cursor.read_u32::<BigEndian>()?,
        group_id: cursor.read_u32::<BigEndian>()?,
        admin_flags: cursor.read_u8()?,
        owner_flags: cursor.read_u8()?,
        file_mode: cursor.read_u16::<BigEndian>()?,
        special: cursor.read_u32::<BigEndian>()?,
    })
}

fn read_finder_info(cursor: &mut Cursor<&[u8]>) -> Result<[u8; 32]> {
    let mut finder_info = [0u8; 32];
    cursor.read_exact(&mut finder_info)?;
    Ok(finder_info)
}

/// Parse the record data following a catalog key. The HFS+ and classic
/// record type codes are disjoint, so the type word alone decides the
/// layout.
fn parse_record(data: &[u8]) -> Result<CatalogRecord> {
    if data.len() < 2 {
        return Err(HfsError::InvalidBTree("catalog record too short".into()));
    }
    let record_type = u16::from_be_bytes([data[0], data[1]]);
    let mut cursor = Cursor::new(data);
    cursor.set_position(2);

    match record_type {
        RECORD_TYPE_FOLDER => {
            let flags = cursor.read_u16::<BigEndian>()?;
            let valence = cursor.read_u32::<BigEndian>()?;
            let id = cursor.read_u32::<BigEndian>()?;
            let create_date = cursor.read_u32::<BigEndian>()?;
            let content_mod_date = cursor.read_u32::<BigEndian>()?;
            let attribute_mod_date = cursor.read_u32::<BigEndian>()?;
            let access_date = cursor.read_u32::<BigEndian>()?;
            let backup_date = cursor.read_u32::<BigEndian>()?;
            let bsd = parse_bsd_info(&mut cursor)?;
            let finder_info = read_finder_info(&mut cursor)?;
            let text_encoding = cursor.read_u32::<BigEndian>()?;

            Ok(CatalogRecord::Folder(FolderRecord {
                flags,
                valence,
                id,
                create_date,
                content_mod_date,
                attribute_mod_date: Some(attribute_mod_date),
                access_date: Some(access_date),
                backup_date,
                bsd: Some(bsd),
                finder_info,
                text_encoding,
            }))
        }
        RECORD_TYPE_FILE => {
            let flags = cursor.read_u16::<BigEndian>()?;
            let _reserved = cursor.read_u32::<BigEndian>()?;
            let id = cursor.read_u32::<BigEndian>()?;
            let create_date = cursor.read_u32::<BigEndian>()?;
            let content_mod_date = cursor.read_u32::<BigEndian>()?;
            let attribute_mod_date = cursor.read_u32::<BigEndian>()?;
            let access_date = cursor.read_u32::<BigEndian>()?;
            let backup_date = cursor.read_u32::<BigEndian>()?;
            let bsd = parse_bsd_info(&mut cursor)?;
            let finder_info = read_finder_info(&mut cursor)?;
            let text_encoding = cursor.read_u32::<BigEndian>()?;
            let _reserved2 = cursor.read_u32::<BigEndian>()?;
            let data_fork = ForkDescriptor::parse(&mut cursor)?;
            let resource_fork = ForkDescriptor::parse(&mut cursor)?;

            Ok(CatalogRecord::File(FileRecord {
                flags,
                id,
                create_date,
                content_mod_date,
                attribute_mod_date: Some(attribute_mod_date),
                access_date: Some(access_date),
                backup_date,
                bsd: Some(bsd),
                finder_info,
                text_encoding,
                data_fork,
                resource_fork,
            }))
        }
        RECORD_TYPE_FOLDER_THREAD | RECORD_TYPE_FILE_THREAD => {
            let _reserved = cursor.read_u16::<BigEndian>()?;
            let parent_id = cursor.read_u32::<BigEndian>()?;
            let name_length = cursor.read_u16::<BigEndian>()? as usize;
            let mut name_buf = vec![0u8; name_length * 2];
            cursor.read_exact(&mut name_buf)?;
            let name = unicode::units_to_string(&unicode::utf16be_to_units(&name_buf));

            let thread = ThreadRecord { parent_id, name };
            if record_type == RECORD_TYPE_FOLDER_THREAD {
                Ok(CatalogRecord::FolderThread(thread))
            } else {
                Ok(CatalogRecord::FileThread(thread))
            }
        }
        RECORD_TYPE_HFS_FOLDER => {
            let flags = cursor.read_u16::<BigEndian>()?;
            let valence = cursor.read_u16::<BigEndian>()? as u32;
            let id = cursor.read_u32::<BigEndian>()?;
            let create_date = cursor.read_u32::<BigEndian>()?;
            let content_mod_date = cursor.read_u32::<BigEndian>()?;
            let backup_date = cursor.read_u32::<BigEndian>()?;
            let finder_info = read_finder_info(&mut cursor)?;

            Ok(CatalogRecord::Folder(FolderRecord {
                flags,
                valence,
                id,
                create_date,
                content_mod_date,
                attribute_mod_date: None,
                access_date: None,
                backup_date,
                bsd: None,
                finder_info,
                text_encoding: 0,
            }))
        }
        RECORD_TYPE_HFS_FILE => {
            let flags = cursor.read_u8()? as u16;
            let _file_type = cursor.read_u8()?;
            let mut user_info = [0u8; 16];
            cursor.read_exact(&mut user_info)?;
            let id = cursor.read_u32::<BigEndian>()?;
            let _data_start_block = cursor.read_u16::<BigEndian>()?;
            let data_size = cursor.read_u32::<BigEndian>()?;
            let _data_physical_size = cursor.read_u32::<BigEndian>()?;
            let _rsrc_start_block = cursor.read_u16::<BigEndian>()?;
            let rsrc_size = cursor.read_u32::<BigEndian>()?;
            let _rsrc_physical_size = cursor.read_u32::<BigEndian>()?;
            let create_date = cursor.read_u32::<BigEndian>()?;
            let content_mod_date = cursor.read_u32::<BigEndian>()?;
            let backup_date = cursor.read_u32::<BigEndian>()?;
            let mut extra_info = [0u8; 16];
            cursor.read_exact(&mut extra_info)?;
            let _clump_size = cursor.read_u16::<BigEndian>()?;
            let data_extents = crate::volume::read_hfs_extents(&mut cursor)?;
            let rsrc_extents = crate::volume::read_hfs_extents(&mut cursor)?;

            let mut finder_info = [0u8; 32];
            finder_info[..16].copy_from_slice(&user_info);
            finder_info[16..].copy_from_slice(&extra_info);

            Ok(CatalogRecord::File(FileRecord {
                flags,
                id,
                create_date,
                content_mod_date,
                attribute_mod_date: None,
                access_date: None,
                backup_date,
                bsd: None,
                finder_info,
                text_encoding: 0,
                data_fork: ForkDescriptor::from_hfs(data_size, &data_extents, 512),
                resource_fork: ForkDescriptor::from_hfs(rsrc_size, &rsrc_extents, 512),
            }))
        }
        RECORD_TYPE_HFS_FOLDER_THREAD | RECORD_TYPE_HFS_FILE_THREAD => {
            let mut _reserved = [0u8; 8];
            cursor.read_exact(&mut _reserved)?;
            let parent_id = cursor.read_u32::<BigEndian>()?;
            let name_length = cursor.read_u8()? as usize;
            let mut name_buf = vec![0u8; name_length.min(31)];
            cursor.read_exact(&mut name_buf)?;
            let name = macroman::decode(&name_buf);

            let thread = ThreadRecord { parent_id, name };
            if record_type == RECORD_TYPE_HFS_FOLDER_THREAD {
                Ok(CatalogRecord::FolderThread(thread))
            } else {
                Ok(CatalogRecord::FileThread(thread))
            }
        }
        other => Err(HfsError::InvalidBTree(format!(
            "unknown catalog record type 0x{:04X}",
            other
        ))),
    }
}

fn entry_from_record_data(data: &[u8], variant: &CatalogVariant) -> Result<DirectoryEntry> {
    let key = parse_key(data, variant)?;
    if key.record_offset >= data.len() {
        return Err(HfsError::InvalidBTree(
            "catalog record data missing after key".into(),
        ));
    }
    let record = parse_record(&data[key.record_offset..])?;
    Ok(DirectoryEntry {
        name: decode_name(key.name, variant),
        parent_id: key.parent_id,
        record,
    })
}

/// Look up one record by (parent CNID, name).
pub(crate) fn lookup<B: BlockIo>(
    io: &IoHandle<B>,
    tree: &BtreeFile,
    cache: &Mutex<NodeCache>,
    variant: &CatalogVariant,
    parent_id: u32,
    name: &str,
) -> Result<Option<DirectoryEntry>> {
    let target = match TargetName::encode(name, variant) {
        Some(target) => target,
        None => return Ok(None),
    };
    let compare = |data: &[u8]| compare_key(data, variant, parent_id, &target);
    match tree.search(io, cache, &compare)? {
        Some((node, index)) => {
            let entry = entry_from_record_data(node.record_data(index)?, variant)?;
            Ok(Some(entry))
        }
        None => Ok(None),
    }
}

/// Resolve a CNID to its (parent CNID, name) through its thread record.
pub(crate) fn thread_for<B: BlockIo>(
    io: &IoHandle<B>,
    tree: &BtreeFile,
    cache: &Mutex<NodeCache>,
    variant: &CatalogVariant,
    cnid: u32,
) -> Result<Option<ThreadRecord>> {
    let target = TargetName::empty(variant);
    let compare = |data: &[u8]| compare_key(data, variant, cnid, &target);
    match tree.search(io, cache, &compare)? {
        Some((node, index)) => {
            let entry = entry_from_record_data(node.record_data(index)?, variant)?;
            match entry.record {
                CatalogRecord::FolderThread(thread) | CatalogRecord::FileThread(thread) => {
                    Ok(Some(thread))
                }
                _ => Err(HfsError::CorruptedData(format!(
                    "expected a thread record for CNID {}",
                    cnid
                ))),
            }
        }
        None => Ok(None),
    }
}

/// Look up a record by CNID: thread first, then the (parent, name) it
/// names.
pub(crate) fn lookup_by_identifier<B: BlockIo>(
    io: &IoHandle<B>,
    tree: &BtreeFile,
    cache: &Mutex<NodeCache>,
    variant: &CatalogVariant,
    cnid: u32,
) -> Result<Option<DirectoryEntry>> {
    let thread = match thread_for(io, tree, cache, variant, cnid)? {
        Some(thread) => thread,
        None => return Ok(None),
    };
    lookup(io, tree, cache, variant, thread.parent_id, &thread.name)
}

/// List the children of a directory in key order. Thread records are
/// skipped.
pub(crate) fn list_directory<B: BlockIo>(
    io: &IoHandle<B>,
    tree: &BtreeFile,
    cache: &Mutex<NodeCache>,
    variant: &CatalogVariant,
    parent_id: u32,
) -> Result<Vec<DirectoryEntry>> {
    let target = TargetName::empty(variant);
    let compare = |data: &[u8]| compare_key(data, variant, parent_id, &target);

    let mut entries = Vec::new();
    tree.scan(io, cache, &compare, |data| {
        let key = match parse_key(data, variant) {
            Ok(key) => key,
            Err(_) => return Ok(ScanControl::Continue),
        };
        if key.parent_id < parent_id {
            return Ok(ScanControl::Continue);
        }
        if key.parent_id > parent_id {
            return Ok(ScanControl::Stop);
        }
        let entry = entry_from_record_data(data, variant)?;
        if !entry.record.is_thread() {
            entries.push(entry);
        }
        Ok(ScanControl::Continue)
    })?;
    Ok(entries)
}

/// Split a UTF-8 path into lookup segments, applying the `:` to `/`
/// substitution inside each segment (`:` is the historical HFS separator,
/// so tools swap the two to express a `/` inside a file name).
pub(crate) fn path_segments(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| segment.replace(':', "/"))
        .collect()
}

/// Walk a UTF-8 path from the root folder. A failed segment surfaces as
/// `NotFound` carrying the prefix that failed.
pub(crate) fn resolve_path<B: BlockIo>(
    io: &IoHandle<B>,
    tree: &BtreeFile,
    cache: &Mutex<NodeCache>,
    variant: &CatalogVariant,
    path: &str,
) -> Result<DirectoryEntry> {
    let segments = path_segments(path);

    if segments.is_empty() {
        return root_folder(io, tree, cache, variant);
    }

    let mut parent = CNID_ROOT_FOLDER;
    for (i, segment) in segments.iter().enumerate() {
        let entry = lookup(io, tree, cache, variant, parent, segment)?
            .ok_or_else(|| HfsError::NotFound(segments[..=i].join("/")))?;
        if i == segments.len() - 1 {
            return Ok(entry);
        }
        match &entry.record {
            CatalogRecord::Folder(folder) => parent = folder.id,
            CatalogRecord::File(_) => {
                return Err(HfsError::NotFound(segments[..=i].join("/")));
            }
            _ => {
                return Err(HfsError::CorruptedData(
                    "thread record in path resolution".into(),
                ));
            }
        }
    }
    unreachable!()
}

/// The root folder record, located through its thread.
pub(crate) fn root_folder<B: BlockIo>(
    io: &IoHandle<B>,
    tree: &BtreeFile,
    cache: &Mutex<NodeCache>,
    variant: &CatalogVariant,
) -> Result<DirectoryEntry> {
    let thread = thread_for(io, tree, cache, variant, CNID_ROOT_FOLDER)?
        .ok_or_else(|| HfsError::CorruptedData("root folder has no thread record".into()))?;
    lookup(io, tree, cache, variant, thread.parent_id, &thread.name)?
        .ok_or_else(|| HfsError::CorruptedData("root folder record missing".into()))
}
