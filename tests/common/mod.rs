//! Synthetic volume images for the integration tests.
#![allow(dead_code)] // each test binary uses a different subset
//!
//! Three builders: a fully featured HFS+ volume, a small classic HFS
//! volume, and a classic wrapper embedding the HFS+ volume. Everything is
//! laid out by hand so the tests exercise the real on-disk formats without
//! external fixtures.

/// Allocation block size of the HFS+ test volume.
pub const BLOCK: usize = 4096;

/// Catalog node size (two catalog nodes per four allocation blocks).
const CATALOG_NODE: usize = 8192;

/// The LZVN stream from the decmpfs scenarios: 16 literal bytes 0x00..0x0F.
pub const LZVN_16: &[u8] = &[
    0xE0, 0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0A, 0x0B, 0x0C, 0x0D,
    0x0E, 0x0F, 0x06,
];

pub const README_CONTENT: &[u8] = b"hello readme\n";
pub const INDIRECT_CONTENT: &[u8] = b"indirect content";
pub const MP3_CONTENT: &[u8] = b"back in black mp3 data";
pub const FRAG_SIZE: u64 = 8 * BLOCK as u64 + 100;

pub const PRIVATE_FOLDER: &str = "\u{0}\u{0}\u{0}\u{0}HFS+ Private Data";

fn be16(out: &mut Vec<u8>, v: u16) {
    out.extend_from_slice(&v.to_be_bytes());
}

fn be32(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_be_bytes());
}

fn be64(out: &mut Vec<u8>, v: u64) {
    out.extend_from_slice(&v.to_be_bytes());
}

/// 80-byte HFS+ fork descriptor.
fn fork(logical_size: u64, total_blocks: u32, extents: &[(u32, u32)]) -> Vec<u8> {
    let mut out = Vec::with_capacity(80);
    be64(&mut out, logical_size);
    be32(&mut out, 0); // clump size
    be32(&mut out, total_blocks);
    for i in 0..8 {
        let (start, count) = extents.get(i).copied().unwrap_or((0, 0));
        be32(&mut out, start);
        be32(&mut out, count);
    }
    out
}

/// HFS+ catalog key for (parent, name).
fn cat_key(parent: u32, name: &str) -> Vec<u8> {
    let units: Vec<u16> = name.encode_utf16().collect();
    let mut out = Vec::new();
    be16(&mut out, (6 + units.len() * 2) as u16);
    be32(&mut out, parent);
    be16(&mut out, units.len() as u16);
    for unit in units {
        be16(&mut out, unit);
    }
    out
}

/// Settings for one HFS+ file record.
pub struct FileSpec {
    pub id: u32,
    pub flags: u16,
    pub mode: u16,
    pub special: u32,
    pub finder_type: [u8; 8],
    pub added_time: i32,
    pub data_fork: Vec<u8>,
    pub resource_fork: Vec<u8>,
}

impl Default for FileSpec {
    fn default() -> Self {
        FileSpec {
            id: 0,
            flags: 0,
            mode: 0o100644,
            special: 0,
            finder_type: [0; 8],
            added_time: 0,
            data_fork: fork(0, 0, &[]),
            resource_fork: fork(0, 0, &[]),
        }
    }
}

fn file_record(spec: &FileSpec) -> Vec<u8> {
    let mut out = Vec::with_capacity(248);
    be16(&mut out, 0x0002); // file record
    be16(&mut out, spec.flags);
    be32(&mut out, 0); // reserved
    be32(&mut out, spec.id);
    for date in [0xD000_0000u32, 0xD000_0001, 0xD000_0002, 0xD000_0003, 0] {
        be32(&mut out, date);
    }
    // BSD info
    be32(&mut out, 501);
    be32(&mut out, 20);
    out.push(0);
    out.push(0);
    be16(&mut out, spec.mode);
    be32(&mut out, spec.special);
    // Finder info: type/creator then the extended area with date-added.
    let mut finder = [0u8; 32];
    finder[..8].copy_from_slice(&spec.finder_type);
    finder[20..24].copy_from_slice(&spec.added_time.to_be_bytes());
    out.extend_from_slice(&finder);
    be32(&mut out, 0); // text encoding
    be32(&mut out, 0); // reserved
    out.extend_from_slice(&spec.data_fork);
    out.extend_from_slice(&spec.resource_fork);
    assert_eq!(out.len(), 248);
    out
}

fn folder_record(id: u32, valence: u32) -> Vec<u8> {
    let mut out = Vec::with_capacity(88);
    be16(&mut out, 0x0001); // folder record
    be16(&mut out, 0); // flags
    be32(&mut out, valence);
    be32(&mut out, id);
    for date in [0xD000_0000u32, 0xD000_0001, 0xD000_0002, 0xD000_0003, 0] {
        be32(&mut out, date);
    }
    be32(&mut out, 501);
    be32(&mut out, 20);
    out.push(0);
    out.push(0);
    be16(&mut out, 0o40755);
    be32(&mut out, 0);
    out.extend_from_slice(&[0u8; 32]);
    be32(&mut out, 0); // text encoding
    be32(&mut out, 0); // reserved
    assert_eq!(out.len(), 88);
    out
}

fn thread_record(is_file: bool, parent: u32, name: &str) -> Vec<u8> {
    let units: Vec<u16> = name.encode_utf16().collect();
    let mut out = Vec::new();
    be16(&mut out, if is_file { 0x0004 } else { 0x0003 });
    be16(&mut out, 0); // reserved
    be32(&mut out, parent);
    be16(&mut out, units.len() as u16);
    for unit in units {
        be16(&mut out, unit);
    }
    out
}

/// Assemble a B-tree node: 14-byte descriptor, records, backward-growing
/// offset table. Records are padded to even offsets.
fn node(node_size: usize, kind: u8, height: u8, forward: u32, records: &[Vec<u8>]) -> Vec<u8> {
    let mut data = vec![0u8; node_size];
    data[0..4].copy_from_slice(&forward.to_be_bytes());
    data[8] = kind;
    data[9] = height;
    data[12..14].copy_from_slice(&(records.len() as u16).to_be_bytes());

    let mut offset = 14usize;
    for (i, record) in records.iter().enumerate() {
        data[node_size - (i + 1) * 2..node_size - i * 2]
            .copy_from_slice(&(offset as u16).to_be_bytes());
        data[offset..offset + record.len()].copy_from_slice(record);
        offset += record.len() + (record.len() & 1);
    }
    let free = node_size - (records.len() + 1) * 2;
    assert!(offset <= free, "records overflow the node");
    data[free..free + 2].copy_from_slice(&(offset as u16).to_be_bytes());
    data
}

struct TreeShape {
    node_size: u16,
    leaf_records: u32,
    total_nodes: u32,
    max_key_length: u16,
    key_compare_type: u8,
    attributes: u32,
    /// 0 when the tree is empty.
    root: u32,
}

/// The header node (node 0) with its three records.
fn header_node(shape: &TreeShape) -> Vec<u8> {
    let mut header = Vec::with_capacity(106);
    be16(&mut header, if shape.root == 0 { 0 } else { 1 }); // depth
    be32(&mut header, shape.root);
    be32(&mut header, shape.leaf_records);
    be32(&mut header, shape.root); // first leaf
    be32(&mut header, shape.root); // last leaf
    be16(&mut header, shape.node_size);
    be16(&mut header, shape.max_key_length);
    be32(&mut header, shape.total_nodes);
    be32(&mut header, shape.total_nodes - 1 - u32::from(shape.root != 0)); // free nodes
    be16(&mut header, 0); // reserved
    be32(&mut header, 0); // clump size
    header.push(0); // btree type
    header.push(shape.key_compare_type);
    be32(&mut header, shape.attributes);
    header.resize(106, 0);

    let user_data = vec![0u8; 128];
    let map = vec![0u8; 64];
    node(
        shape.node_size as usize,
        1, // header node
        0,
        0,
        &[header, user_data, map],
    )
}

fn put_block(image: &mut [u8], block: usize, content: &[u8]) {
    let offset = block * BLOCK;
    image[offset..offset + content.len()].copy_from_slice(content);
}

fn fill_block(image: &mut [u8], block: usize, byte: u8) {
    let offset = block * BLOCK;
    image[offset..offset + BLOCK].fill(byte);
}

fn fpmc_header(method: u32, size: u64) -> Vec<u8> {
    let mut out = b"fpmc".to_vec();
    out.extend_from_slice(&method.to_le_bytes());
    out.extend_from_slice(&size.to_le_bytes());
    out
}

/// HFS+ attribute key (CNID, start block 0, name).
fn attr_key(cnid: u32, name: &str) -> Vec<u8> {
    let units: Vec<u16> = name.encode_utf16().collect();
    let mut out = Vec::new();
    be16(&mut out, (12 + units.len() * 2) as u16);
    be16(&mut out, 0); // pad
    be32(&mut out, cnid);
    be32(&mut out, 0); // start block
    be16(&mut out, units.len() as u16);
    for unit in units {
        be16(&mut out, unit);
    }
    out
}

fn attr_inline(cnid: u32, name: &str, payload: &[u8]) -> Vec<u8> {
    let mut out = attr_key(cnid, name);
    be32(&mut out, 0x0000_0010); // inline data
    be32(&mut out, 0);
    be32(&mut out, 0);
    be32(&mut out, payload.len() as u32);
    out.extend_from_slice(payload);
    out
}

/// Build the HFS+ test volume.
///
/// Layout (allocation blocks of 4096 bytes):
///   4..6  extents overflow tree   8..16 catalog tree
///   6..8  attributes tree         16+   file content
///
/// Tree of entries (CNIDs): TestVol(2) { private-data(18){iNode20(20)},
/// frag.bin(25), link(22), Music(17){AC/DC(23){Back in Black.mp3(24)}},
/// note.txt(19, hard link to 20), ReadMe(16), rsrc.z(26, decmpfs method 8),
/// zipped(21, decmpfs method 7) }.
pub fn build_hfsplus_image() -> Vec<u8> {
    let total_blocks = 48usize;
    let mut image = vec![0u8; total_blocks * BLOCK];

    // --- file content ---
    put_block(&mut image, 16, README_CONTENT);
    put_block(&mut image, 17, INDIRECT_CONTENT);
    put_block(&mut image, 18, MP3_CONTENT);
    put_block(&mut image, 19, b"ReadMe");
    for i in 0..8usize {
        fill_block(&mut image, 20 + 2 * i, 0xB0 + i as u8);
    }
    fill_block(&mut image, 36, 0xB8);

    // Resource fork of rsrc.z: BE table offset, LE count and entry, then
    // the LZVN block.
    let mut resource = 4u32.to_be_bytes().to_vec();
    resource.extend_from_slice(&1u32.to_le_bytes());
    resource.extend_from_slice(&12u32.to_le_bytes());
    resource.extend_from_slice(&(LZVN_16.len() as u32).to_le_bytes());
    resource.extend_from_slice(LZVN_16);
    let resource_size = resource.len() as u64;
    put_block(&mut image, 38, &resource);

    // --- catalog tree (blocks 8..16, node size 8192) ---
    let mut records: Vec<Vec<u8>> = Vec::new();
    let push = |key: Vec<u8>, value: Vec<u8>, records: &mut Vec<Vec<u8>>| {
        let mut record = key;
        record.extend_from_slice(&value);
        records.push(record);
    };

    push(cat_key(1, "TestVol"), folder_record(2, 8), &mut records);
    push(
        cat_key(2, ""),
        thread_record(false, 1, "TestVol"),
        &mut records,
    );
    push(cat_key(2, PRIVATE_FOLDER), folder_record(18, 1), &mut records);
    push(
        cat_key(2, "frag.bin"),
        file_record(&FileSpec {
            id: 25,
            data_fork: fork(
                FRAG_SIZE,
                9,
                &[
                    (20, 1),
                    (22, 1),
                    (24, 1),
                    (26, 1),
                    (28, 1),
                    (30, 1),
                    (32, 1),
                    (34, 1),
                ],
            ),
            ..FileSpec::default()
        }),
        &mut records,
    );
    push(
        cat_key(2, "link"),
        file_record(&FileSpec {
            id: 22,
            mode: 0o120755,
            data_fork: fork(6, 1, &[(19, 1)]),
            ..FileSpec::default()
        }),
        &mut records,
    );
    push(cat_key(2, "Music"), folder_record(17, 1), &mut records);
    push(
        cat_key(2, "note.txt"),
        file_record(&FileSpec {
            id: 19,
            flags: 0x0020,
            special: 20,
            finder_type: *b"hlnkhfs+",
            ..FileSpec::default()
        }),
        &mut records,
    );
    push(
        cat_key(2, "ReadMe"),
        file_record(&FileSpec {
            id: 16,
            flags: 0x0004,
            added_time: 1_600_000_000,
            data_fork: fork(README_CONTENT.len() as u64, 1, &[(16, 1)]),
            ..FileSpec::default()
        }),
        &mut records,
    );
    push(
        cat_key(2, "rsrc.z"),
        file_record(&FileSpec {
            id: 26,
            flags: 0x0004,
            resource_fork: fork(resource_size, 1, &[(38, 1)]),
            ..FileSpec::default()
        }),
        &mut records,
    );
    push(
        cat_key(2, "zipped"),
        file_record(&FileSpec {
            id: 21,
            flags: 0x0004,
            ..FileSpec::default()
        }),
        &mut records,
    );
    push(
        cat_key(16, ""),
        thread_record(true, 2, "ReadMe"),
        &mut records,
    );
    push(
        cat_key(17, ""),
        thread_record(false, 2, "Music"),
        &mut records,
    );
    push(cat_key(17, "AC/DC"), folder_record(23, 1), &mut records);
    push(
        cat_key(18, ""),
        thread_record(false, 2, PRIVATE_FOLDER),
        &mut records,
    );
    push(
        cat_key(18, "iNode20"),
        file_record(&FileSpec {
            id: 20,
            data_fork: fork(INDIRECT_CONTENT.len() as u64, 1, &[(17, 1)]),
            ..FileSpec::default()
        }),
        &mut records,
    );
    push(
        cat_key(19, ""),
        thread_record(true, 2, "note.txt"),
        &mut records,
    );
    push(
        cat_key(20, ""),
        thread_record(true, 18, "iNode20"),
        &mut records,
    );
    push(
        cat_key(21, ""),
        thread_record(true, 2, "zipped"),
        &mut records,
    );
    push(cat_key(22, ""), thread_record(true, 2, "link"), &mut records);
    push(
        cat_key(23, ""),
        thread_record(false, 17, "AC/DC"),
        &mut records,
    );
    push(
        cat_key(23, "Back in Black.mp3"),
        file_record(&FileSpec {
            id: 24,
            data_fork: fork(MP3_CONTENT.len() as u64, 1, &[(18, 1)]),
            ..FileSpec::default()
        }),
        &mut records,
    );
    push(
        cat_key(24, ""),
        thread_record(true, 23, "Back in Black.mp3"),
        &mut records,
    );
    push(
        cat_key(25, ""),
        thread_record(true, 2, "frag.bin"),
        &mut records,
    );
    push(
        cat_key(26, ""),
        thread_record(true, 2, "rsrc.z"),
        &mut records,
    );

    let catalog_shape = TreeShape {
        node_size: CATALOG_NODE as u16,
        leaf_records: records.len() as u32,
        total_nodes: 4,
        max_key_length: 516,
        key_compare_type: 0xCF,
        attributes: 0x0000_0006, // big keys, variable index keys
        root: 1,
    };
    put_block(&mut image, 8, &header_node(&catalog_shape));
    let leaf = node(CATALOG_NODE, 0xFF, 1, 0, &records);
    image[8 * BLOCK + CATALOG_NODE..8 * BLOCK + 2 * CATALOG_NODE].copy_from_slice(&leaf);

    // --- extents overflow tree (blocks 4..6): one record for frag.bin ---
    let mut overflow = Vec::new();
    be16(&mut overflow, 10); // key length
    overflow.push(0x00); // data fork
    overflow.push(0);
    be32(&mut overflow, 25);
    be32(&mut overflow, 8); // first block past the inline extents
    for i in 0..8 {
        let (start, count) = if i == 0 { (36u32, 1u32) } else { (0, 0) };
        be32(&mut overflow, start);
        be32(&mut overflow, count);
    }

    let extents_shape = TreeShape {
        node_size: BLOCK as u16,
        leaf_records: 1,
        total_nodes: 2,
        max_key_length: 10,
        key_compare_type: 0,
        attributes: 0x0000_0002,
        root: 1,
    };
    put_block(&mut image, 4, &header_node(&extents_shape));
    put_block(&mut image, 5, &node(BLOCK, 0xFF, 1, 0, &[overflow]));

    // --- attributes tree (blocks 6..8) ---
    let mut zipped_payload = fpmc_header(7, 16);
    zipped_payload.extend_from_slice(LZVN_16);

    let attr_records = vec![
        attr_inline(16, "user.test", b"abc"),
        attr_inline(21, "com.apple.decmpfs", &zipped_payload),
        attr_inline(26, "com.apple.decmpfs", &fpmc_header(8, 16)),
    ];
    let attr_shape = TreeShape {
        node_size: BLOCK as u16,
        leaf_records: attr_records.len() as u32,
        total_nodes: 2,
        max_key_length: 266,
        key_compare_type: 0,
        attributes: 0x0000_0006,
        root: 1,
    };
    put_block(&mut image, 6, &header_node(&attr_shape));
    put_block(&mut image, 7, &node(BLOCK, 0xFF, 1, 0, &attr_records));

    // --- volume header ---
    let mut header = Vec::with_capacity(512);
    be16(&mut header, 0x482B); // "H+"
    be16(&mut header, 4);
    be32(&mut header, 0); // attributes
    be32(&mut header, 0); // last mounted version
    be32(&mut header, 0); // journal info block
    for date in [0xD100_0000u32, 0xD100_0001, 0, 0] {
        be32(&mut header, date);
    }
    be32(&mut header, 7); // file count
    be32(&mut header, 4); // folder count
    be32(&mut header, BLOCK as u32);
    be32(&mut header, total_blocks as u32);
    be32(&mut header, 0); // free blocks
    be32(&mut header, total_blocks as u32); // next allocation
    be32(&mut header, 0);
    be32(&mut header, 0);
    be32(&mut header, 27); // next catalog id
    be32(&mut header, 1); // write count
    be64(&mut header, 1); // encodings bitmap
    header.extend_from_slice(&[0u8; 32]); // finder info
    header.extend_from_slice(&fork(0, 0, &[])); // allocation file
    header.extend_from_slice(&fork(2 * BLOCK as u64, 2, &[(4, 2)])); // extents
    header.extend_from_slice(&fork(8 * BLOCK as u64, 8, &[(8, 8)])); // catalog
    header.extend_from_slice(&fork(2 * BLOCK as u64, 2, &[(6, 2)])); // attributes
    header.extend_from_slice(&fork(0, 0, &[])); // startup
    assert_eq!(header.len(), 512);
    image[1024..1536].copy_from_slice(&header);

    image
}

// --- classic HFS ---

pub const HFS_BLOCK: usize = 512;
pub const HFS_ALLOC_START: usize = 16; // drAlBlSt, in 512-byte units
pub const HFS_README_CONTENT: &[u8] = b"classic hello";

fn hfs_key(parent: u32, name: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    out.push((6 + name.len()) as u8);
    out.push(0);
    be32(&mut out, parent);
    out.push(name.len() as u8);
    out.extend_from_slice(name);
    if out.len() % 2 != 0 {
        out.push(0);
    }
    out
}

fn hfs_extents(out: &mut Vec<u8>, extents: &[(u16, u16)]) {
    for i in 0..3 {
        let (start, count) = extents.get(i).copied().unwrap_or((0, 0));
        be16(out, start);
        be16(out, count);
    }
}

fn hfs_folder_record(id: u32, valence: u16) -> Vec<u8> {
    let mut out = Vec::new();
    be16(&mut out, 0x0100);
    be16(&mut out, 0); // flags
    be16(&mut out, valence);
    be32(&mut out, id);
    be32(&mut out, 0xC000_0000); // create
    be32(&mut out, 0xC000_0001); // modify
    be32(&mut out, 0); // backup
    out.extend_from_slice(&[0u8; 32]); // user + finder info
    out.extend_from_slice(&[0u8; 16]); // reserved
    assert_eq!(out.len(), 70);
    out
}

fn hfs_file_record(id: u32, size: u32, extents: &[(u16, u16)]) -> Vec<u8> {
    let mut out = Vec::new();
    be16(&mut out, 0x0200);
    out.push(0); // flags
    out.push(0); // file type
    out.extend_from_slice(&[0u8; 16]); // finder info
    be32(&mut out, id);
    be16(&mut out, extents.first().map(|e| e.0).unwrap_or(0));
    be32(&mut out, size); // data logical size
    be32(&mut out, size.next_multiple_of(HFS_BLOCK as u32)); // physical
    be16(&mut out, 0);
    be32(&mut out, 0); // resource logical size
    be32(&mut out, 0);
    be32(&mut out, 0xC000_0000); // create
    be32(&mut out, 0xC000_0001); // modify
    be32(&mut out, 0); // backup
    out.extend_from_slice(&[0u8; 16]); // extra finder info
    be16(&mut out, 0); // clump
    hfs_extents(&mut out, extents);
    hfs_extents(&mut out, &[]);
    be32(&mut out, 0); // reserved
    assert_eq!(out.len(), 102);
    out
}

fn hfs_thread_record(is_file: bool, parent: u32, name: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    be16(&mut out, if is_file { 0x0400 } else { 0x0300 });
    out.extend_from_slice(&[0u8; 8]); // reserved
    be32(&mut out, parent);
    out.push(name.len() as u8);
    out.extend_from_slice(name);
    out
}

/// Build a minimal classic HFS volume: root "Classic" with one file
/// "README".
pub fn build_hfs_image() -> Vec<u8> {
    let mut image = vec![0u8; 64 * 1024];
    let alloc_base = HFS_ALLOC_START * 512;

    // Content at allocation block 8.
    let content_offset = alloc_base + 8 * HFS_BLOCK;
    image[content_offset..content_offset + HFS_README_CONTENT.len()]
        .copy_from_slice(HFS_README_CONTENT);

    // Extents tree (allocation blocks 0..2): empty.
    let extents_shape = TreeShape {
        node_size: HFS_BLOCK as u16,
        leaf_records: 0,
        total_nodes: 2,
        max_key_length: 7,
        key_compare_type: 0,
        attributes: 0,
        root: 0,
    };
    let extents_header = header_node(&extents_shape);
    image[alloc_base..alloc_base + HFS_BLOCK].copy_from_slice(&extents_header);

    // Catalog tree (allocation blocks 4..8).
    let records = vec![
        {
            let mut record = hfs_key(1, b"Classic");
            record.extend_from_slice(&hfs_folder_record(2, 1));
            record
        },
        {
            let mut record = hfs_key(2, b"");
            record.extend_from_slice(&hfs_thread_record(false, 1, b"Classic"));
            record
        },
        {
            let mut record = hfs_key(2, b"README");
            record.extend_from_slice(&hfs_file_record(
                16,
                HFS_README_CONTENT.len() as u32,
                &[(8, 1)],
            ));
            record
        },
        {
            let mut record = hfs_key(16, b"");
            record.extend_from_slice(&hfs_thread_record(true, 2, b"README"));
            record
        },
    ];
    let catalog_shape = TreeShape {
        node_size: HFS_BLOCK as u16,
        leaf_records: records.len() as u32,
        total_nodes: 4,
        max_key_length: 37,
        key_compare_type: 0,
        attributes: 0,
        root: 1,
    };
    let catalog_base = alloc_base + 4 * HFS_BLOCK;
    image[catalog_base..catalog_base + HFS_BLOCK].copy_from_slice(&header_node(&catalog_shape));
    let leaf = node(HFS_BLOCK, 0xFF, 1, 0, &records);
    image[catalog_base + HFS_BLOCK..catalog_base + 2 * HFS_BLOCK].copy_from_slice(&leaf);

    // Master directory block.
    let mut mdb = Vec::new();
    be16(&mut mdb, 0x4244); // "BD"
    be32(&mut mdb, 0xC000_0000); // create
    be32(&mut mdb, 0xC000_0001); // modify
    be16(&mut mdb, 0); // attributes
    be16(&mut mdb, 1); // root file count
    be16(&mut mdb, 3); // bitmap start
    be16(&mut mdb, 0); // allocation pointer
    be16(&mut mdb, 64); // total allocation blocks
    be32(&mut mdb, HFS_BLOCK as u32); // allocation block size
    be32(&mut mdb, HFS_BLOCK as u32); // clump size
    be16(&mut mdb, HFS_ALLOC_START as u16);
    be32(&mut mdb, 17); // next CNID
    be16(&mut mdb, 40); // free blocks
    let name = b"Classic";
    mdb.push(name.len() as u8);
    mdb.extend_from_slice(name);
    mdb.resize(mdb.len() + 27 - name.len(), 0);
    be32(&mut mdb, 0); // backup date
    be16(&mut mdb, 0); // sequence
    be32(&mut mdb, 1); // write count
    be32(&mut mdb, 0); // extents clump
    be32(&mut mdb, 0); // catalog clump
    be16(&mut mdb, 1); // root folder count
    be32(&mut mdb, 1); // file count
    be32(&mut mdb, 1); // folder count
    mdb.extend_from_slice(&[0u8; 32]); // finder info
    be16(&mut mdb, 0); // no embedded volume
    be16(&mut mdb, 0);
    be16(&mut mdb, 0);
    be32(&mut mdb, 2 * HFS_BLOCK as u32); // extents file size
    hfs_extents(&mut mdb, &[(0, 2)]);
    be32(&mut mdb, 4 * HFS_BLOCK as u32); // catalog file size
    hfs_extents(&mut mdb, &[(4, 4)]);
    assert_eq!(mdb.len(), 162);
    image[1024..1024 + mdb.len()].copy_from_slice(&mdb);

    image
}

/// Classic wrapper embedding the HFS+ image: the embedded volume starts at
/// `drAlBlSt * 512 + start_block * drAlBlkSiz`.
pub fn build_wrapper_image() -> Vec<u8> {
    let inner = build_hfsplus_image();
    let alloc_start = 8u16; // 4096 bytes
    let block_size = 4096u32;
    let embed_start = 1u16;
    let embed_offset = alloc_start as usize * 512 + embed_start as usize * block_size as usize;

    let mut image = vec![0u8; embed_offset + inner.len()];
    image[embed_offset..].copy_from_slice(&inner);

    let mut mdb = Vec::new();
    be16(&mut mdb, 0x4244);
    be32(&mut mdb, 0xC000_0000);
    be32(&mut mdb, 0xC000_0001);
    be16(&mut mdb, 0);
    be16(&mut mdb, 0);
    be16(&mut mdb, 3);
    be16(&mut mdb, 0);
    be16(&mut mdb, 48);
    be32(&mut mdb, block_size);
    be32(&mut mdb, block_size);
    be16(&mut mdb, alloc_start);
    be32(&mut mdb, 16);
    be16(&mut mdb, 0);
    let name = b"Wrapper";
    mdb.push(name.len() as u8);
    mdb.extend_from_slice(name);
    mdb.resize(mdb.len() + 27 - name.len(), 0);
    be32(&mut mdb, 0);
    be16(&mut mdb, 0);
    be32(&mut mdb, 1);
    be32(&mut mdb, 0);
    be32(&mut mdb, 0);
    be16(&mut mdb, 0);
    be32(&mut mdb, 0);
    be32(&mut mdb, 0);
    mdb.extend_from_slice(&[0u8; 32]);
    be16(&mut mdb, 0x482B); // embedded HFS+ signature
    be16(&mut mdb, embed_start);
    be16(&mut mdb, 48); // embed block count
    be32(&mut mdb, 0);
    hfs_extents(&mut mdb, &[]);
    be32(&mut mdb, 0);
    hfs_extents(&mut mdb, &[]);
    assert_eq!(mdb.len(), 162);
    image[1024..1024 + mdb.len()].copy_from_slice(&mdb);

    image
}
