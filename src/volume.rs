//! Volume headers: the HFS+ volume header and the classic HFS master
//! directory block, both at byte offset 1024.

use byteorder::{BigEndian, ReadBytesExt};
use std::io::{Cursor, Read};

use crate::error::{HfsError, Result};
use crate::extents::ForkDescriptor;
use crate::macroman;

/// Offset of the volume header / master directory block from the start of
/// the volume.
pub const VOLUME_HEADER_OFFSET: u64 = 1024;

/// HFS+ signature: "H+"
pub const HFS_PLUS_SIGNATURE: u16 = 0x482B;

/// HFSX signature: "HX" (case-sensitive variant)
pub const HFSX_SIGNATURE: u16 = 0x4858;

/// Classic HFS signature: "BD"
pub const HFS_SIGNATURE: u16 = 0x4244;

pub const HFS_PLUS_VERSION: u16 = 4;
pub const HFSX_VERSION: u16 = 5;

/// Volume flavor, decided by the on-disk signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeKind {
    /// Classic HFS (MacRoman names, 16-bit extents).
    Hfs,
    /// HFS+ (case-folded UTF-16 names).
    HfsPlus,
    /// HFSX (UTF-16 names, binary comparison unless the catalog header says
    /// otherwise).
    Hfsx,
}

/// The 512-byte HFS+ volume header.
#[derive(Debug, Clone)]
pub struct VolumeHeader {
    pub signature: u16,
    pub version: u16,
    pub attributes: u32,
    pub last_mounted_version: u32,
    pub journal_info_block: u32,
    pub create_date: u32,
    pub modify_date: u32,
    pub backup_date: u32,
    pub checked_date: u32,
    pub file_count: u32,
    pub folder_count: u32,
    pub block_size: u32,
    pub total_blocks: u32,
    pub free_blocks: u32,
    pub next_allocation: u32,
    pub rsrc_clump_size: u32,
    pub data_clump_size: u32,
    pub next_catalog_id: u32,
    pub write_count: u32,
    pub encodings_bitmap: u64,
    pub finder_info: [u32; 8],
    pub allocation_file: ForkDescriptor,
    pub extents_file: ForkDescriptor,
    pub catalog_file: ForkDescriptor,
    pub attributes_file: ForkDescriptor,
    pub startup_file: ForkDescriptor,
}

impl VolumeHeader {
    /// Parse from the 512 bytes at offset 1024.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < 512 {
            return Err(HfsError::CorruptedData(
                "volume header shorter than 512 bytes".into(),
            ));
        }
        let mut cursor = Cursor::new(data);

        let signature = cursor.read_u16::<BigEndian>()?;
        if signature != HFS_PLUS_SIGNATURE && signature != HFSX_SIGNATURE {
            return Err(HfsError::InvalidSignature(signature));
        }
        let version = cursor.read_u16::<BigEndian>()?;
        if version != HFS_PLUS_VERSION && version != HFSX_VERSION {
            return Err(HfsError::UnsupportedVersion(version));
        }

        let attributes = cursor.read_u32::<BigEndian>()?;
        let last_mounted_version = cursor.read_u32::<BigEndian>()?;
        let journal_info_block = cursor.read_u32::<BigEndian>()?;
        let create_date = cursor.read_u32::<BigEndian>()?;
        let modify_date = cursor.read_u32::<BigEndian>()?;
        let backup_date = cursor.read_u32::<BigEndian>()?;
        let checked_date = cursor.read_u32::<BigEndian>()?;
        let file_count = cursor.read_u32::<BigEndian>()?;
        let folder_count = cursor.read_u32::<BigEndian>()?;
        let block_size = cursor.read_u32::<BigEndian>()?;
        let total_blocks = cursor.read_u32::<BigEndian>()?;
        let free_blocks = cursor.read_u32::<BigEndian>()?;
        let next_allocation = cursor.read_u32::<BigEndian>()?;
        let rsrc_clump_size = cursor.read_u32::<BigEndian>()?;
        let data_clump_size = cursor.read_u32::<BigEndian>()?;
        let next_catalog_id = cursor.read_u32::<BigEndian>()?;
        let write_count = cursor.read_u32::<BigEndian>()?;
        let encodings_bitmap = cursor.read_u64::<BigEndian>()?;

        let mut finder_info = [0u32; 8];
        for fi in &mut finder_info {
            *fi = cursor.read_u32::<BigEndian>()?;
        }

        let allocation_file = ForkDescriptor::parse(&mut cursor)?;
        let extents_file = ForkDescriptor::parse(&mut cursor)?;
        let catalog_file = ForkDescriptor::parse(&mut cursor)?;
        let attributes_file = ForkDescriptor::parse(&mut cursor)?;
        let startup_file = ForkDescriptor::parse(&mut cursor)?;

        if !block_size.is_power_of_two() || block_size < 512 {
            return Err(HfsError::CorruptedData(format!(
                "invalid allocation block size {}",
                block_size
            )));
        }

        Ok(VolumeHeader {
            signature,
            version,
            attributes,
            last_mounted_version,
            journal_info_block,
            create_date,
            modify_date,
            backup_date,
            checked_date,
            file_count,
            folder_count,
            block_size,
            total_blocks,
            free_blocks,
            next_allocation,
            rsrc_clump_size,
            data_clump_size,
            next_catalog_id,
            write_count,
            encodings_bitmap,
            finder_info,
            allocation_file,
            extents_file,
            catalog_file,
            attributes_file,
            startup_file,
        })
    }

    pub fn kind(&self) -> VolumeKind {
        if self.signature == HFSX_SIGNATURE {
            VolumeKind::Hfsx
        } else {
            VolumeKind::HfsPlus
        }
    }
}

/// A classic-HFS extent: 16-bit start block and block count.
#[derive(Debug, Clone, Copy, Default)]
pub struct HfsExtent {
    pub start_block: u16,
    pub block_count: u16,
}

pub(crate) fn read_hfs_extents(cursor: &mut Cursor<&[u8]>) -> Result<[HfsExtent; 3]> {
    let mut extents = [HfsExtent::default(); 3];
    for extent in &mut extents {
        extent.start_block = cursor.read_u16::<BigEndian>()?;
        extent.block_count = cursor.read_u16::<BigEndian>()?;
    }
    Ok(extents)
}

/// The classic HFS master directory block (also 512 bytes at offset 1024).
#[derive(Debug, Clone)]
pub struct MasterDirectoryBlock {
    pub signature: u16,
    pub create_date: u32,
    pub modify_date: u32,
    pub attributes: u16,
    pub root_file_count: u16,
    pub bitmap_start: u16,
    pub total_blocks: u16,
    pub block_size: u32,
    pub clump_size: u32,
    /// First allocation block, in 512-byte units from the volume start.
    pub allocation_start: u16,
    pub next_catalog_id: u32,
    pub free_blocks: u16,
    pub volume_name: String,
    pub backup_date: u32,
    pub write_count: u32,
    pub file_count: u32,
    pub folder_count: u32,
    pub finder_info: [u32; 8],
    pub embed_signature: u16,
    pub embed_extent: HfsExtent,
    pub extents_file_size: u32,
    pub extents_file_extents: [HfsExtent; 3],
    pub catalog_file_size: u32,
    pub catalog_file_extents: [HfsExtent; 3],
}

impl MasterDirectoryBlock {
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < 162 {
            return Err(HfsError::CorruptedData(
                "master directory block too short".into(),
            ));
        }
        let mut cursor = Cursor::new(data);

        let signature = cursor.read_u16::<BigEndian>()?;
        if signature != HFS_SIGNATURE {
            return Err(HfsError::InvalidSignature(signature));
        }
        let create_date = cursor.read_u32::<BigEndian>()?;
        let modify_date = cursor.read_u32::<BigEndian>()?;
        let attributes = cursor.read_u16::<BigEndian>()?;
        let root_file_count = cursor.read_u16::<BigEndian>()?;
        let bitmap_start = cursor.read_u16::<BigEndian>()?;
        let _allocation_ptr = cursor.read_u16::<BigEndian>()?;
        let total_blocks = cursor.read_u16::<BigEndian>()?;
        let block_size = cursor.read_u32::<BigEndian>()?;
        let clump_size = cursor.read_u32::<BigEndian>()?;
        let allocation_start = cursor.read_u16::<BigEndian>()?;
        let next_catalog_id = cursor.read_u32::<BigEndian>()?;
        let free_blocks = cursor.read_u16::<BigEndian>()?;

        // Volume name: Pascal string, 1 length byte + up to 27 MacRoman bytes.
        let mut name_buf = [0u8; 28];
        cursor.read_exact(&mut name_buf)?;
        let name_len = (name_buf[0] as usize).min(27);
        let volume_name = macroman::decode(&name_buf[1..1 + name_len]);

        let backup_date = cursor.read_u32::<BigEndian>()?;
        let _sequence_number = cursor.read_u16::<BigEndian>()?;
        let write_count = cursor.read_u32::<BigEndian>()?;
        let _extents_clump = cursor.read_u32::<BigEndian>()?;
        let _catalog_clump = cursor.read_u32::<BigEndian>()?;
        let _root_folder_count = cursor.read_u16::<BigEndian>()?;
        let file_count = cursor.read_u32::<BigEndian>()?;
        let folder_count = cursor.read_u32::<BigEndian>()?;

        let mut finder_info = [0u32; 8];
        for fi in &mut finder_info {
            *fi = cursor.read_u32::<BigEndian>()?;
        }

        let embed_signature = cursor.read_u16::<BigEndian>()?;
        let embed_extent = HfsExtent {
            start_block: cursor.read_u16::<BigEndian>()?,
            block_count: cursor.read_u16::<BigEndian>()?,
        };
        let extents_file_size = cursor.read_u32::<BigEndian>()?;
        let extents_file_extents = read_hfs_extents(&mut cursor)?;
        let catalog_file_size = cursor.read_u32::<BigEndian>()?;
        let catalog_file_extents = read_hfs_extents(&mut cursor)?;

        if block_size == 0 || block_size % 512 != 0 {
            return Err(HfsError::CorruptedData(format!(
                "invalid allocation block size {}",
                block_size
            )));
        }

        Ok(MasterDirectoryBlock {
            signature,
            create_date,
            modify_date,
            attributes,
            root_file_count,
            bitmap_start,
            total_blocks,
            block_size,
            clump_size,
            allocation_start,
            next_catalog_id,
            free_blocks,
            volume_name,
            backup_date,
            write_count,
            file_count,
            folder_count,
            finder_info,
            embed_signature,
            embed_extent,
            extents_file_size,
            extents_file_extents,
            catalog_file_size,
            catalog_file_extents,
        })
    }

    /// Byte offset of the embedded HFS+ volume, when this classic volume is
    /// only a wrapper around one.
    pub fn embedded_volume_offset(&self) -> Option<u64> {
        if self.embed_signature != HFS_PLUS_SIGNATURE {
            return None;
        }
        Some(
            self.allocation_start as u64 * 512
                + self.embed_extent.start_block as u64 * self.block_size as u64,
        )
    }

    /// Fork descriptor for the catalog file, widened to the common extent
    /// model.
    pub fn catalog_fork(&self) -> ForkDescriptor {
        ForkDescriptor::from_hfs(
            self.catalog_file_size,
            &self.catalog_file_extents,
            self.block_size,
        )
    }

    /// Fork descriptor for the extents overflow file.
    pub fn extents_fork(&self) -> ForkDescriptor {
        ForkDescriptor::from_hfs(
            self.extents_file_size,
            &self.extents_file_extents,
            self.block_size,
        )
    }
}
