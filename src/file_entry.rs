//! The file-entry entity: metadata access and content I/O for one catalog
//! entry.

use std::io::SeekFrom;

use crate::attributes::ExtendedAttribute;
use crate::blockio::BlockIo;
use crate::catalog::{CatalogRecord, DirectoryEntry, FileRecord, FLAG_HAS_ATTRIBUTES};
use crate::decmpfs::{
    CompressedDataHeader, CompressedStream, CompressionMethod, DECMPFS_ATTRIBUTE_NAME,
};
use crate::error::{HfsError, Result};
use crate::extents::FORK_TYPE_RESOURCE;
use crate::stream::DataStream;
use crate::FileSystem;

/// A file, directory or symbolic link on the volume.
///
/// Entries are created by lookups on [`crate::Volume`] and stay usable
/// independently of each other. Content streams, child listings, extended
/// attributes and symbolic-link targets materialize lazily on first use.
///
/// A hard link resolves transparently: the entry's identifier becomes the
/// link reference and content reads go to the indirect node file, while
/// [`FileEntry::link_identifier`] still exposes the link's own CNID.
pub struct FileEntry<'v, B: BlockIo> {
    fs: &'v FileSystem<B>,
    entry: DirectoryEntry,
    identifier: u32,
    link_identifier: Option<u32>,
    link_reference: Option<u32>,
    /// Catalog record of the indirect node, resolved on first content use.
    indirect: Option<DirectoryEntry>,
    children: Option<Vec<DirectoryEntry>>,
    stream: Option<DataStream<'v, B>>,
    stream_failed: bool,
    symlink_target: Option<Vec<u8>>,
}

impl<'v, B: BlockIo> FileEntry<'v, B> {
    pub(crate) fn new(fs: &'v FileSystem<B>, entry: DirectoryEntry) -> Self {
        let link_reference = entry.link_reference();
        let mut identifier = entry.identifier();
        let mut link_identifier = None;
        if let Some(reference) = link_reference {
            if reference > 2 {
                link_identifier = Some(identifier);
                identifier = reference;
            }
        }
        FileEntry {
            fs,
            entry,
            identifier,
            link_identifier,
            link_reference,
            indirect: None,
            children: None,
            stream: None,
            stream_failed: false,
            symlink_target: None,
        }
    }

    /// Effective CNID: the link reference for hard links, the record's own
    /// CNID otherwise.
    pub fn identifier(&self) -> u32 {
        self.identifier
    }

    /// The original CNID of a hard-link entry.
    pub fn link_identifier(&self) -> Option<u32> {
        self.link_identifier
    }

    pub fn parent_identifier(&self) -> u32 {
        self.entry.parent_id
    }

    pub fn name(&self) -> &str {
        &self.entry.name
    }

    pub fn is_directory(&self) -> bool {
        self.entry.is_directory()
    }

    pub fn is_file(&self) -> bool {
        self.entry.is_file()
    }

    pub fn is_symlink(&self) -> bool {
        self.entry.is_symlink()
    }

    pub fn flags(&self) -> u16 {
        self.entry.flags()
    }

    /// File mode bits; synthesized from the record type on classic HFS.
    pub fn file_mode(&self) -> u16 {
        self.entry.file_mode()
    }

    /// Creation time in HFS seconds (1904 epoch, unsigned).
    pub fn creation_time(&self) -> u32 {
        match &self.entry.record {
            CatalogRecord::Folder(f) => f.create_date,
            CatalogRecord::File(f) => f.create_date,
            _ => 0,
        }
    }

    /// Content modification time in HFS seconds.
    pub fn modification_time(&self) -> u32 {
        match &self.entry.record {
            CatalogRecord::Folder(f) => f.content_mod_date,
            CatalogRecord::File(f) => f.content_mod_date,
            _ => 0,
        }
    }

    /// Catalog-entry modification time; HFS+ only.
    pub fn entry_modification_time(&self) -> Option<u32> {
        match &self.entry.record {
            CatalogRecord::Folder(f) => f.attribute_mod_date,
            CatalogRecord::File(f) => f.attribute_mod_date,
            _ => None,
        }
    }

    /// Access time; HFS+ only.
    pub fn access_time(&self) -> Option<u32> {
        match &self.entry.record {
            CatalogRecord::Folder(f) => f.access_date,
            CatalogRecord::File(f) => f.access_date,
            _ => None,
        }
    }

    pub fn backup_time(&self) -> u32 {
        match &self.entry.record {
            CatalogRecord::Folder(f) => f.backup_date,
            CatalogRecord::File(f) => f.backup_date,
            _ => 0,
        }
    }

    /// POSIX added time (signed 1970-epoch seconds); never available on
    /// classic HFS.
    pub fn added_time(&self) -> Option<i32> {
        self.entry.added_time()
    }

    pub fn owner_identifier(&self) -> Option<u32> {
        self.bsd().map(|bsd| bsd.owner_id)
    }

    pub fn group_identifier(&self) -> Option<u32> {
        self.bsd().map(|bsd| bsd.group_id)
    }

    /// The overloaded special field: device number, link count or link
    /// reference, depending on the record.
    pub fn special_permissions(&self) -> Option<u32> {
        self.bsd().map(|bsd| bsd.special)
    }

    fn bsd(&self) -> Option<&crate::catalog::BsdInfo> {
        match &self.entry.record {
            CatalogRecord::Folder(f) => f.bsd.as_ref(),
            CatalogRecord::File(f) => f.bsd.as_ref(),
            _ => None,
        }
    }

    /// Number of children a directory claims to have.
    pub fn valence(&self) -> Option<u32> {
        match &self.entry.record {
            CatalogRecord::Folder(f) => Some(f.valence),
            _ => None,
        }
    }

    /// The catalog record this entry was built from.
    pub fn record(&self) -> &CatalogRecord {
        &self.entry.record
    }

    // --- directory listing ---

    fn ensure_children(&mut self) -> Result<&[DirectoryEntry]> {
        if !self.is_directory() {
            return Err(HfsError::InvalidArgument(format!(
                "{} is not a directory",
                self.entry.name
            )));
        }
        if self.children.is_none() {
            self.children = Some(self.fs.list_directory(self.entry.identifier())?);
        }
        Ok(self.children.as_deref().expect("children just listed"))
    }

    /// Children of this directory, in catalog key order. Materialized from
    /// the catalog once, then served from the cached listing.
    pub fn sub_file_entries(&mut self) -> Result<Vec<FileEntry<'v, B>>> {
        let fs = self.fs;
        Ok(self
            .ensure_children()?
            .iter()
            .cloned()
            .map(|entry| FileEntry::new(fs, entry))
            .collect())
    }

    pub fn number_of_sub_file_entries(&mut self) -> Result<usize> {
        Ok(self.ensure_children()?.len())
    }

    /// Look up one child by name without materializing the full listing.
    pub fn sub_file_entry_by_name(&self, name: &str) -> Result<Option<FileEntry<'v, B>>> {
        if !self.is_directory() {
            return Err(HfsError::InvalidArgument(format!(
                "{} is not a directory",
                self.entry.name
            )));
        }
        let entry = self.fs.lookup(self.entry.identifier(), name)?;
        Ok(entry.map(|entry| FileEntry::new(self.fs, entry)))
    }

    // --- extended attributes ---

    /// Whether the record content comes from can have attribute-tree
    /// records at all. The catalog flag predicts presence, so a clear flag
    /// skips the scan entirely. Hard links are judged by their indirect
    /// node.
    fn may_have_attributes(&mut self) -> Result<bool> {
        if !self.fs.has_attributes_tree() {
            return Ok(false);
        }
        Ok(self.effective_record()?.flags() & FLAG_HAS_ATTRIBUTES != 0)
    }

    /// All extended attributes, in key order. An entry whose catalog flags
    /// do not announce attributes yields an empty list without a scan.
    pub fn extended_attributes(&mut self) -> Result<Vec<ExtendedAttribute<'v, B>>> {
        if !self.may_have_attributes()? {
            return Ok(Vec::new());
        }
        let fs = self.fs;
        let records = fs.list_attributes(self.content_identifier()?)?;
        Ok(records
            .into_iter()
            .map(|record| fs.attribute_entity(record))
            .collect())
    }

    pub fn has_extended_attribute(&mut self, name: &str) -> Result<bool> {
        Ok(self.extended_attribute(name)?.is_some())
    }

    pub fn extended_attribute(&mut self, name: &str) -> Result<Option<ExtendedAttribute<'v, B>>> {
        if !self.may_have_attributes()? {
            return Ok(None);
        }
        let fs = self.fs;
        let record = fs.get_attribute(self.content_identifier()?, name)?;
        Ok(record.map(|record| fs.attribute_entity(record)))
    }

    // --- content ---

    /// The record content reads go to: the indirect node for a hard link,
    /// this entry's own record otherwise.
    fn effective_record(&mut self) -> Result<&DirectoryEntry> {
        if let Some(reference) = self.link_reference {
            if reference > 2 && self.indirect.is_none() {
                let entry = self.fs.indirect_node_entry(reference)?.ok_or_else(|| {
                    HfsError::NotFound(format!("indirect node iNode{}", reference))
                })?;
                self.indirect = Some(entry);
            }
        }
        Ok(self.indirect.as_ref().unwrap_or(&self.entry))
    }

    fn content_identifier(&mut self) -> Result<u32> {
        let entry = self.effective_record()?;
        Ok(entry.identifier())
    }

    fn effective_file_record(&mut self) -> Result<FileRecord> {
        match &self.effective_record()?.record {
            CatalogRecord::File(file) => Ok(file.clone()),
            _ => Err(HfsError::InvalidArgument(
                "entry has no file content".into(),
            )),
        }
    }

    /// Build the content stream: a decmpfs handle when a valid compression
    /// header is present, the raw data fork otherwise.
    fn ensure_stream(&mut self) -> Result<&mut DataStream<'v, B>> {
        if self.stream_failed {
            return Err(HfsError::CorruptedData(
                "content stream failed to initialize".into(),
            ));
        }
        if self.stream.is_none() {
            match self.build_stream() {
                Ok(stream) => self.stream = Some(stream),
                Err(error) => {
                    self.stream_failed = true;
                    return Err(error);
                }
            }
        }
        Ok(self.stream.as_mut().expect("stream just materialized"))
    }

    fn build_stream(&mut self) -> Result<DataStream<'v, B>> {
        let file = self.effective_file_record()?;
        let cnid = self.content_identifier()?;

        if self.may_have_attributes()? {
            if let Some(attribute) = self.fs.get_attribute(cnid, DECMPFS_ATTRIBUTE_NAME)? {
                if let Some(payload) = attribute.inline_data() {
                    if let Some(header) = CompressedDataHeader::parse(payload)? {
                        return self.build_compressed_stream(&file, header, payload.to_vec());
                    }
                } else {
                    // Compression headers inside fork or extent attribute
                    // records have no documented layout.
                    return Err(HfsError::Unsupported(
                        "com.apple.decmpfs attribute is not an inline record".into(),
                    ));
                }
            }
        }

        let segments = self
            .fs
            .data_fork_segments(cnid, &file.data_fork)?;
        Ok(DataStream::raw(self.fs.io(), segments))
    }

    fn build_compressed_stream(
        &mut self,
        file: &FileRecord,
        header: CompressedDataHeader,
        payload: Vec<u8>,
    ) -> Result<DataStream<'v, B>> {
        let method = CompressionMethod::from_code(header.method)?;
        let cnid = self.content_identifier()?;

        let stream = if method.uses_resource_fork() {
            let segments = self
                .fs
                .fork_segments(cnid, FORK_TYPE_RESOURCE, &file.resource_fork)?;
            let resource = crate::stream::RawStream::new(self.fs.io(), segments);
            CompressedStream::new_resource(
                self.fs.io(),
                method,
                header.uncompressed_size,
                resource,
            )?
        } else {
            CompressedStream::new_inline(
                self.fs.io(),
                method,
                header.uncompressed_size,
                payload,
            )?
        };
        Ok(DataStream::compressed(stream))
    }

    /// Content size: the uncompressed size for decmpfs-compressed files,
    /// the data fork's logical size otherwise. Zero for directories.
    pub fn size(&mut self) -> Result<u64> {
        if self.is_directory() {
            return Ok(0);
        }
        Ok(self.ensure_stream()?.size())
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

    /// Current content stream position.
    pub fn tell(&mut self) -> Result<u64> {
        Ok(self.ensure_stream()?.offset())
    }

    pub fn extent_count(&mut self) -> Result<usize> {
        Ok(self.ensure_stream()?.extent_count())
    }

    pub fn extent_at(&mut self, index: usize) -> Result<Option<(u64, u64, u32)>> {
        Ok(self.ensure_stream()?.extent_at(index))
    }

    /// The resource fork as a raw stream, when the file has one.
    pub fn resource_fork(&mut self) -> Result<Option<DataStream<'v, B>>> {
        let file = match self.effective_file_record() {
            Ok(file) => file,
            Err(_) => return Ok(None),
        };
        if file.resource_fork.is_empty() {
            return Ok(None);
        }
        let cnid = self.content_identifier()?;
        let segments = self
            .fs
            .fork_segments(cnid, FORK_TYPE_RESOURCE, &file.resource_fork)?;
        Ok(Some(DataStream::raw(self.fs.io(), segments)))
    }

    /// Target bytes of a symbolic link (the data fork content), read once
    /// and cached.
    pub fn symlink_target(&mut self) -> Result<Option<Vec<u8>>> {
        if !self.is_symlink() {
            return Ok(None);
        }
        if self.symlink_target.is_none() {
            let file = self.effective_file_record()?;
            let cnid = self.content_identifier()?;
            let segments = self.fs.data_fork_segments(cnid, &file.data_fork)?;
            let mut stream = crate::stream::RawStream::new(self.fs.io(), segments);
            self.symlink_target = Some(stream.read_to_end()?);
        }
        Ok(self.symlink_target.clone())
    }
}
