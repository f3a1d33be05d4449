//! Read-only HFS / HFS+ / HFSX filesystem parser.
//!
//! Opens raw volume images (or any block-addressable byte source) and
//! provides directory enumeration, metadata, extended attributes and file
//! content — including transparent decompression of `com.apple.decmpfs`
//! compressed files (DEFLATE, LZVN, LZFSE) and hard-link resolution through
//! the HFS+ private-data folder. Classic HFS volumes are readable directly,
//! and a classic wrapper around an embedded HFS+ volume is followed
//! automatically.
//!
//! Nothing is ever written: the block source only sees absolute-offset
//! reads.
//!
//! ```no_run
//! use hfs::{FileBlockIo, Volume};
//!
//! # fn main() -> hfs::Result<()> {
//! let volume = Volume::open(FileBlockIo::open("image.raw")?)?;
//! if let Some(mut entry) = volume.file_entry_by_utf8_path("/ReadMe")? {
//!     let content = entry.read_to_end()?;
//!     println!("{} bytes", content.len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod attributes;
pub mod blockio;
pub mod btree;
pub mod catalog;
pub mod decmpfs;
pub mod error;
pub mod extents;
pub mod file_entry;
pub mod lzvn;
pub mod macroman;
pub mod stream;
pub mod unicode;
pub mod volume;

pub use attributes::{AttributeRecord, ExtendedAttribute};
pub use blockio::{BlockIo, FileBlockIo, MemoryBlockIo};
pub use catalog::{CatalogRecord, DirectoryEntry};
pub use error::{HfsError, Result};
pub use file_entry::FileEntry;
pub use stream::DataStream;
pub use volume::{MasterDirectoryBlock, VolumeHeader, VolumeKind};

use std::sync::Mutex;

use crate::attributes::ExtendedAttribute as Attribute;
use crate::blockio::IoHandle;
use crate::btree::{BtreeFile, NodeCache, KEY_COMPARE_BINARY};
use crate::catalog::{CatalogVariant, CNID_ATTRIBUTES_FILE, CNID_CATALOG_FILE, CNID_EXTENTS_FILE};
use crate::extents::{BlockMap, ExtentSegment, ForkDescriptor, FORK_TYPE_DATA};
use crate::volume::{
    HFSX_SIGNATURE, HFS_PLUS_SIGNATURE, HFS_SIGNATURE, VOLUME_HEADER_OFFSET,
};

/// The three B-tree files, their node caches and the volume geometry.
///
/// Each tree owns one cache; catalog lookups triggered by hard-link
/// resolution run through a dedicated indirect-node cache so they cannot
/// evict the nodes of the walk that triggered them.
pub(crate) struct FileSystem<B: BlockIo> {
    io: IoHandle<B>,
    variant: CatalogVariant,
    map: BlockMap,
    catalog_tree: BtreeFile,
    catalog_cache: Mutex<NodeCache>,
    indirect_node_cache: Mutex<NodeCache>,
    extents_tree: BtreeFile,
    extents_cache: Mutex<NodeCache>,
    attributes_tree: Option<BtreeFile>,
    attributes_cache: Mutex<NodeCache>,
}

impl<B: BlockIo> FileSystem<B> {
    pub(crate) fn io(&self) -> &IoHandle<B> {
        &self.io
    }

    fn case_folded(&self) -> bool {
        match self.variant {
            CatalogVariant::HfsPlus { case_folded } => case_folded,
            CatalogVariant::Hfs => true,
        }
    }

    pub(crate) fn has_attributes_tree(&self) -> bool {
        self.attributes_tree.is_some()
    }

    pub(crate) fn lookup(
        &self,
        parent: u32,
        name: &str,
    ) -> Result<Option<catalog::DirectoryEntry>> {
        catalog::lookup(
            &self.io,
            &self.catalog_tree,
            &self.catalog_cache,
            &self.variant,
            parent,
            name,
        )
    }

    pub(crate) fn list_directory(&self, parent: u32) -> Result<Vec<catalog::DirectoryEntry>> {
        catalog::list_directory(
            &self.io,
            &self.catalog_tree,
            &self.catalog_cache,
            &self.variant,
            parent,
        )
    }

    fn lookup_by_identifier(&self, cnid: u32) -> Result<Option<catalog::DirectoryEntry>> {
        catalog::lookup_by_identifier(
            &self.io,
            &self.catalog_tree,
            &self.catalog_cache,
            &self.variant,
            cnid,
        )
    }

    fn resolve_path(&self, path: &str) -> Result<catalog::DirectoryEntry> {
        catalog::resolve_path(
            &self.io,
            &self.catalog_tree,
            &self.catalog_cache,
            &self.variant,
            path,
        )
    }

    fn root_folder(&self) -> Result<catalog::DirectoryEntry> {
        catalog::root_folder(
            &self.io,
            &self.catalog_tree,
            &self.catalog_cache,
            &self.variant,
        )
    }

    fn root_thread_name(&self) -> Result<Option<String>> {
        let thread = catalog::thread_for(
            &self.io,
            &self.catalog_tree,
            &self.catalog_cache,
            &self.variant,
            catalog::CNID_ROOT_FOLDER,
        )?;
        Ok(thread.map(|thread| thread.name))
    }

    /// Locate the indirect-node file of a hard link under the private-data
    /// folder. Runs on the indirect-node cache so a listing in progress
    /// keeps its own nodes.
    pub(crate) fn indirect_node_entry(
        &self,
        reference: u32,
    ) -> Result<Option<catalog::DirectoryEntry>> {
        let private = match catalog::lookup(
            &self.io,
            &self.catalog_tree,
            &self.indirect_node_cache,
            &self.variant,
            catalog::CNID_ROOT_FOLDER,
            catalog::PRIVATE_DATA_FOLDER,
        )? {
            Some(entry) => entry,
            None => return Ok(None),
        };
        catalog::lookup(
            &self.io,
            &self.catalog_tree,
            &self.indirect_node_cache,
            &self.variant,
            private.identifier(),
            &format!("iNode{}", reference),
        )
    }

    /// Extent segments of a fork, consulting the extents-overflow tree when
    /// the inline extents fall short.
    pub(crate) fn fork_segments(
        &self,
        cnid: u32,
        fork_type: u8,
        fork: &ForkDescriptor,
    ) -> Result<Vec<ExtentSegment>> {
        extents::build_extent_list(
            &self.io,
            Some((&self.extents_tree, &self.extents_cache)),
            &self.map,
            fork,
            cnid,
            fork_type,
        )
    }

    pub(crate) fn data_fork_segments(
        &self,
        cnid: u32,
        fork: &ForkDescriptor,
    ) -> Result<Vec<ExtentSegment>> {
        self.fork_segments(cnid, FORK_TYPE_DATA, fork)
    }

    pub(crate) fn list_attributes(&self, cnid: u32) -> Result<Vec<AttributeRecord>> {
        let tree = match &self.attributes_tree {
            Some(tree) => tree,
            None => return Ok(Vec::new()),
        };
        attributes::list_attributes(
            &self.io,
            tree,
            &self.attributes_cache,
            self.case_folded(),
            cnid,
        )
    }

    pub(crate) fn get_attribute(&self, cnid: u32, name: &str) -> Result<Option<AttributeRecord>> {
        let tree = match &self.attributes_tree {
            Some(tree) => tree,
            None => return Ok(None),
        };
        attributes::get_attribute(
            &self.io,
            tree,
            &self.attributes_cache,
            self.case_folded(),
            cnid,
            name,
        )
    }

    pub(crate) fn attribute_entity(&self, record: AttributeRecord) -> Attribute<'_, B> {
        Attribute::new(&self.io, self.map, record)
    }
}

/// An opened, read-only HFS family volume.
///
/// The volume owns the block source and the three B-tree files; entries,
/// attributes and streams created from it borrow it. Dropping the volume
/// closes it.
pub struct Volume<B: BlockIo> {
    fs: FileSystem<B>,
    kind: VolumeKind,
    header: Option<VolumeHeader>,
    wrapper: Option<MasterDirectoryBlock>,
    mdb: Option<MasterDirectoryBlock>,
}

impl<B: BlockIo> Volume<B> {
    /// Probe for any HFS family signature at offset 1024 without opening
    /// the volume.
    pub fn signature_check(io: &B) -> Result<bool> {
        if io.size()? < VOLUME_HEADER_OFFSET + 2 {
            return Ok(false);
        }
        let mut magic = [0u8; 2];
        io.read_at(VOLUME_HEADER_OFFSET, &mut magic)?;
        let signature = u16::from_be_bytes(magic);
        Ok(signature == HFS_PLUS_SIGNATURE
            || signature == HFSX_SIGNATURE
            || signature == HFS_SIGNATURE)
    }

    /// Open a volume from a block source, taking ownership of it.
    pub fn open(io: B) -> Result<Self> {
        let mut handle = IoHandle::new(io);

        let mut block = [0u8; 512];
        handle.read_at(VOLUME_HEADER_OFFSET, &mut block)?;
        let signature = u16::from_be_bytes([block[0], block[1]]);

        match signature {
            HFS_PLUS_SIGNATURE | HFSX_SIGNATURE => {
                let header = VolumeHeader::parse(&block)?;
                Self::open_hfs_plus(handle, header, None)
            }
            HFS_SIGNATURE => {
                let mdb = MasterDirectoryBlock::parse(&block)?;
                match mdb.embedded_volume_offset() {
                    Some(offset) => {
                        // Classic wrapper: everything interesting lives in
                        // the embedded HFS+ volume.
                        handle.rebase(offset);
                        handle.read_at(VOLUME_HEADER_OFFSET, &mut block)?;
                        let header = VolumeHeader::parse(&block)?;
                        Self::open_hfs_plus(handle, header, Some(mdb))
                    }
                    None => Self::open_hfs(handle, mdb),
                }
            }
            other => Err(HfsError::InvalidSignature(other)),
        }
    }

    fn open_hfs_plus(
        handle: IoHandle<B>,
        header: VolumeHeader,
        wrapper: Option<MasterDirectoryBlock>,
    ) -> Result<Self> {
        let map = BlockMap {
            block_size: header.block_size,
            allocation_base: 0,
            classic: false,
        };

        // The extents tree is self-contained: its own extents never
        // overflow. Everything else resolves overflow through it.
        let extents_segments = extents::build_extent_list(
            &handle,
            None,
            &map,
            &header.extents_file,
            CNID_EXTENTS_FILE,
            FORK_TYPE_DATA,
        )?;
        let extents_tree = BtreeFile::open(&handle, extents_segments)?;
        let extents_cache = Mutex::new(NodeCache::new());

        let catalog_segments = extents::build_extent_list(
            &handle,
            Some((&extents_tree, &extents_cache)),
            &map,
            &header.catalog_file,
            CNID_CATALOG_FILE,
            FORK_TYPE_DATA,
        )?;
        let catalog_tree = BtreeFile::open(&handle, catalog_segments)?;

        let attributes_tree = if header.attributes_file.is_empty() {
            None
        } else {
            let segments = extents::build_extent_list(
                &handle,
                Some((&extents_tree, &extents_cache)),
                &map,
                &header.attributes_file,
                CNID_ATTRIBUTES_FILE,
                FORK_TYPE_DATA,
            )?;
            Some(BtreeFile::open(&handle, segments)?)
        };

        let kind = header.kind();
        // HFSX may still use case folding; the catalog header decides.
        let case_folded = match kind {
            VolumeKind::Hfsx => catalog_tree.header.key_compare_type != KEY_COMPARE_BINARY,
            _ => true,
        };

        Ok(Volume {
            fs: FileSystem {
                io: handle,
                variant: CatalogVariant::HfsPlus { case_folded },
                map,
                catalog_tree,
                catalog_cache: Mutex::new(NodeCache::new()),
                indirect_node_cache: Mutex::new(NodeCache::new()),
                extents_tree,
                extents_cache,
                attributes_tree,
                attributes_cache: Mutex::new(NodeCache::new()),
            },
            kind,
            header: Some(header),
            wrapper,
            mdb: None,
        })
    }

    fn open_hfs(handle: IoHandle<B>, mdb: MasterDirectoryBlock) -> Result<Self> {
        let map = BlockMap {
            block_size: mdb.block_size,
            allocation_base: mdb.allocation_start as u64 * 512,
            classic: true,
        };

        let extents_segments = extents::build_extent_list(
            &handle,
            None,
            &map,
            &mdb.extents_fork(),
            CNID_EXTENTS_FILE,
            FORK_TYPE_DATA,
        )?;
        let extents_tree = BtreeFile::open(&handle, extents_segments)?;
        let extents_cache = Mutex::new(NodeCache::new());

        let catalog_segments = extents::build_extent_list(
            &handle,
            Some((&extents_tree, &extents_cache)),
            &map,
            &mdb.catalog_fork(),
            CNID_CATALOG_FILE,
            FORK_TYPE_DATA,
        )?;
        let catalog_tree = BtreeFile::open(&handle, catalog_segments)?;

        Ok(Volume {
            fs: FileSystem {
                io: handle,
                variant: CatalogVariant::Hfs,
                map,
                catalog_tree,
                catalog_cache: Mutex::new(NodeCache::new()),
                indirect_node_cache: Mutex::new(NodeCache::new()),
                extents_tree,
                extents_cache,
                attributes_tree: None,
                attributes_cache: Mutex::new(NodeCache::new()),
            },
            kind: VolumeKind::Hfs,
            header: None,
            wrapper: None,
            mdb: Some(mdb),
        })
    }

    /// Total size of the (embedded) volume's byte source.
    pub fn size(&self) -> Result<u64> {
        self.fs.io.size()
    }

    /// Which member of the HFS family this volume is.
    pub fn kind(&self) -> VolumeKind {
        self.kind
    }

    /// The HFS+ volume header, absent on a classic volume.
    pub fn header(&self) -> Option<&VolumeHeader> {
        self.header.as_ref()
    }

    /// The classic master directory block, present on classic volumes and,
    /// as the wrapper block, on embedded HFS+ volumes.
    pub fn master_directory_block(&self) -> Option<&MasterDirectoryBlock> {
        self.mdb.as_ref().or(self.wrapper.as_ref())
    }

    /// The volume name, from the master directory block or the root
    /// folder's thread record.
    pub fn name(&self) -> Result<Option<String>> {
        if let Some(mdb) = &self.mdb {
            return Ok(Some(mdb.volume_name.clone()));
        }
        self.fs.root_thread_name()
    }

    /// The root directory (CNID 2).
    pub fn root_directory(&self) -> Result<FileEntry<'_, B>> {
        let entry = self.fs.root_folder()?;
        Ok(FileEntry::new(&self.fs, entry))
    }

    /// Look up an entry by CNID through its thread record.
    pub fn file_entry_by_identifier(&self, cnid: u32) -> Result<Option<FileEntry<'_, B>>> {
        let entry = self.fs.lookup_by_identifier(cnid)?;
        Ok(entry.map(|entry| FileEntry::new(&self.fs, entry)))
    }

    /// Walk a UTF-8 path from the root. A `:` inside a segment stands for a
    /// `/` in the on-disk name. Returns `Ok(None)` when any segment does
    /// not resolve.
    pub fn file_entry_by_utf8_path(&self, path: &str) -> Result<Option<FileEntry<'_, B>>> {
        match self.fs.resolve_path(path) {
            Ok(entry) => Ok(Some(FileEntry::new(&self.fs, entry))),
            Err(error) if error.is_not_found() => Ok(None),
            Err(error) => Err(error),
        }
    }

    /// Request cooperative cancellation: every running or future scan on
    /// this volume fails with [`HfsError::Aborted`].
    pub fn abort(&self) {
        self.fs.io.request_abort();
    }

    pub fn aborted(&self) -> bool {
        self.fs.io.aborted()
    }
}
