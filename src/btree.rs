//! Generic B-tree engine shared by the catalog, extents-overflow and
//! attributes files.
//!
//! A B-tree file is a sequence of fixed-size nodes addressed through the
//! owning fork's extent map. Nodes are fetched through a bounded cache;
//! searches descend index nodes with a key comparator and range scans walk
//! the leaf forward-link chain.

use byteorder::{BigEndian, ReadBytesExt};
use std::cmp::Ordering;
use std::collections::{HashMap, VecDeque};
use std::io::Cursor;
use std::sync::{Arc, Mutex};

use crate::blockio::{BlockIo, IoHandle};
use crate::error::{HfsError, Result};
use crate::extents::{ExtentSegment, EXTENT_IS_SPARSE};

/// B-tree node kinds (`kind` field of the node descriptor).
pub const NODE_KIND_LEAF: u8 = 0xFF; // -1 as i8
pub const NODE_KIND_INDEX: u8 = 0x00;
pub const NODE_KIND_HEADER: u8 = 0x01;
pub const NODE_KIND_MAP: u8 = 0x02;

/// HFS+ key compare types from the header record.
pub const KEY_COMPARE_CASE_FOLDED: u8 = 0xCF;
pub const KEY_COMPARE_BINARY: u8 = 0xBC;

/// Header-record attribute bits.
const ATTR_BIG_KEYS: u32 = 0x00000002;
const ATTR_VARIABLE_INDEX_KEYS: u32 = 0x00000004;

const NODE_DESCRIPTOR_SIZE: usize = 14;

/// Default bound on cached nodes per tree.
const NODE_CACHE_CAPACITY: usize = 64;

/// The 14-byte descriptor at the start of every node.
#[derive(Debug, Clone)]
pub struct NodeDescriptor {
    pub forward_link: u32,
    pub backward_link: u32,
    pub kind: u8,
    pub height: u8,
    pub num_records: u16,
    pub reserved: u16,
}

fn parse_node_descriptor(data: &[u8]) -> Result<NodeDescriptor> {
    if data.len() < NODE_DESCRIPTOR_SIZE {
        return Err(HfsError::InvalidBTree("node descriptor too short".into()));
    }
    let mut cursor = Cursor::new(data);
    Ok(NodeDescriptor {
        forward_link: cursor.read_u32::<BigEndian>()?,
        backward_link: cursor.read_u32::<BigEndian>()?,
        kind: cursor.read_u8()?,
        height: cursor.read_u8()?,
        num_records: cursor.read_u16::<BigEndian>()?,
        reserved: cursor.read_u16::<BigEndian>()?,
    })
}

/// The header record from node 0.
#[derive(Debug, Clone)]
pub struct HeaderRecord {
    pub tree_depth: u16,
    pub root_node: u32,
    pub leaf_records: u32,
    pub first_leaf_node: u32,
    pub last_leaf_node: u32,
    pub node_size: u16,
    pub max_key_length: u16,
    pub total_nodes: u32,
    pub free_nodes: u32,
    pub key_compare_type: u8,
    pub attributes: u32,
}

fn parse_header_record(data: &[u8]) -> Result<HeaderRecord> {
    let mut cursor = Cursor::new(data);
    let tree_depth = cursor.read_u16::<BigEndian>()?;
    let root_node = cursor.read_u32::<BigEndian>()?;
    let leaf_records = cursor.read_u32::<BigEndian>()?;
    let first_leaf_node = cursor.read_u32::<BigEndian>()?;
    let last_leaf_node = cursor.read_u32::<BigEndian>()?;
    let node_size = cursor.read_u16::<BigEndian>()?;
    let max_key_length = cursor.read_u16::<BigEndian>()?;
    let total_nodes = cursor.read_u32::<BigEndian>()?;
    let free_nodes = cursor.read_u32::<BigEndian>()?;
    let _reserved = cursor.read_u16::<BigEndian>()?;
    let _clump_size = cursor.read_u32::<BigEndian>()?;
    let _btree_type = cursor.read_u8()?;
    let key_compare_type = cursor.read_u8()?;
    let attributes = cursor.read_u32::<BigEndian>()?;

    Ok(HeaderRecord {
        tree_depth,
        root_node,
        leaf_records,
        first_leaf_node,
        last_leaf_node,
        node_size,
        max_key_length,
        total_nodes,
        free_nodes,
        key_compare_type,
        attributes,
    })
}

/// A parsed node: descriptor, raw bytes and the tail offset table.
#[derive(Debug)]
pub struct BtreeNode {
    pub number: u32,
    pub descriptor: NodeDescriptor,
    data: Vec<u8>,
    record_offsets: Vec<u16>,
}

impl BtreeNode {
    /// Raw bytes of record `index`, key included.
    pub fn record_data(&self, index: usize) -> Result<&[u8]> {
        if index >= self.descriptor.num_records as usize {
            return Err(HfsError::InvalidBTree(format!(
                "record index {} >= number of records {}",
                index, self.descriptor.num_records
            )));
        }
        let start = self.record_offsets[index] as usize;
        let end = self.record_offsets[index + 1] as usize;
        if start < NODE_DESCRIPTOR_SIZE || start > end || end > self.data.len() {
            return Err(HfsError::InvalidBTree(format!(
                "invalid record offsets in node {}: start={}, end={}",
                self.number, start, end
            )));
        }
        Ok(&self.data[start..end])
    }
}

/// Bounded FIFO mapping from node number to parsed node.
///
/// Caches are owned per tree (and one extra instance for indirect-node
/// lookups) so a nested walk never evicts its caller's working set.
pub struct NodeCache {
    map: HashMap<u32, Arc<BtreeNode>>,
    order: VecDeque<u32>,
    capacity: usize,
}

impl NodeCache {
    pub fn new() -> Self {
        Self::with_capacity(NODE_CACHE_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        NodeCache {
            map: HashMap::new(),
            order: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    fn get(&self, number: u32) -> Option<Arc<BtreeNode>> {
        self.map.get(&number).cloned()
    }

    fn insert(&mut self, number: u32, node: Arc<BtreeNode>) {
        if self.map.contains_key(&number) {
            return;
        }
        while self.map.len() >= self.capacity {
            match self.order.pop_front() {
                Some(evicted) => {
                    self.map.remove(&evicted);
                }
                None => break,
            }
        }
        self.map.insert(number, node);
        self.order.push_back(number);
    }
}

impl Default for NodeCache {
    fn default() -> Self {
        NodeCache::new()
    }
}

/// Directs a leaf range scan from the record visitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanControl {
    /// Keep scanning.
    Continue,
    /// All further records are out of range; stop.
    Stop,
}

/// One of the three on-disk B-tree files, opened read-only over the extent
/// map of its fork.
pub struct BtreeFile {
    pub header: HeaderRecord,
    segments: Vec<ExtentSegment>,
    fork_size: u64,
    big_keys: bool,
    variable_index_keys: bool,
}

impl BtreeFile {
    /// Read the header node and validate the basic geometry.
    pub fn open<B: BlockIo>(io: &IoHandle<B>, segments: Vec<ExtentSegment>) -> Result<Self> {
        let fork_size: u64 = segments.iter().map(|s| s.size).sum();
        if fork_size < 512 {
            return Err(HfsError::InvalidBTree(format!(
                "B-tree fork of {} bytes cannot hold a header node",
                fork_size
            )));
        }

        // The node size is only known after parsing the header record, so
        // probe the first 512 bytes (the minimum node size) first.
        let mut probe = vec![0u8; 512];
        read_fork(io, &segments, 0, &mut probe)?;

        let descriptor = parse_node_descriptor(&probe)?;
        if descriptor.kind != NODE_KIND_HEADER {
            return Err(HfsError::InvalidBTree(format!(
                "expected header node, got kind 0x{:02X}",
                descriptor.kind
            )));
        }
        let header = parse_header_record(&probe[NODE_DESCRIPTOR_SIZE..])?;

        let node_size = header.node_size;
        if !node_size.is_power_of_two() || node_size < 512 {
            return Err(HfsError::InvalidBTree(format!(
                "invalid node size {}",
                node_size
            )));
        }
        if fork_size % node_size as u64 != 0 {
            return Err(HfsError::InvalidBTree(format!(
                "fork size {} is not a whole number of {}-byte nodes",
                fork_size, node_size
            )));
        }

        let big_keys = header.attributes & ATTR_BIG_KEYS != 0;
        let variable_index_keys = header.attributes & ATTR_VARIABLE_INDEX_KEYS != 0;

        Ok(BtreeFile {
            header,
            segments,
            fork_size,
            big_keys,
            variable_index_keys,
        })
    }

    /// Number of nodes the fork can hold.
    fn node_count(&self) -> u32 {
        (self.fork_size / self.header.node_size as u64) as u32
    }

    /// Fetch a node through the given cache.
    pub fn node<B: BlockIo>(
        &self,
        io: &IoHandle<B>,
        cache: &Mutex<NodeCache>,
        number: u32,
    ) -> Result<Arc<BtreeNode>> {
        if number >= self.node_count() {
            return Err(HfsError::OutOfBounds(format!(
                "node number {} exceeds B-tree of {} nodes",
                number,
                self.node_count()
            )));
        }
        {
            let cache = cache
                .lock()
                .map_err(|_| HfsError::CorruptedData("node cache lock poisoned".into()))?;
            if let Some(node) = cache.get(number) {
                return Ok(node);
            }
        }

        let node_size = self.header.node_size as usize;
        let mut data = vec![0u8; node_size];
        read_fork(io, &self.segments, number as u64 * node_size as u64, &mut data)?;

        let descriptor = parse_node_descriptor(&data)?;
        let num_offsets = descriptor.num_records as usize + 1;
        if NODE_DESCRIPTOR_SIZE + 2 * num_offsets > node_size {
            return Err(HfsError::InvalidBTree(format!(
                "node {}: offset table for {} records does not fit",
                number, descriptor.num_records
            )));
        }
        let mut record_offsets = Vec::with_capacity(num_offsets);
        for i in 0..num_offsets {
            let pos = node_size - (i + 1) * 2;
            record_offsets.push(u16::from_be_bytes([data[pos], data[pos + 1]]));
        }

        let node = Arc::new(BtreeNode {
            number,
            descriptor,
            data,
            record_offsets,
        });
        let mut cache = cache
            .lock()
            .map_err(|_| HfsError::CorruptedData("node cache lock poisoned".into()))?;
        cache.insert(number, node.clone());
        Ok(node)
    }

    /// Child node number stored after the key of an index record.
    fn index_child(&self, record_data: &[u8]) -> Result<u32> {
        let key_end = if self.big_keys {
            if record_data.len() < 2 {
                return Err(HfsError::InvalidBTree("index record too short".into()));
            }
            let key_length = if self.variable_index_keys {
                u16::from_be_bytes([record_data[0], record_data[1]]) as usize
            } else {
                self.header.max_key_length as usize
            };
            2 + key_length
        } else {
            if record_data.is_empty() {
                return Err(HfsError::InvalidBTree("index record too short".into()));
            }
            let key_length = if self.variable_index_keys {
                record_data[0] as usize
            } else {
                self.header.max_key_length as usize
            };
            1 + key_length
        };
        let child_offset = key_end + (key_end & 1);
        if child_offset + 4 > record_data.len() {
            return Err(HfsError::InvalidBTree(format!(
                "index record too short for child pointer: key end {}, record length {}",
                key_end,
                record_data.len()
            )));
        }
        Ok(u32::from_be_bytes([
            record_data[child_offset],
            record_data[child_offset + 1],
            record_data[child_offset + 2],
            record_data[child_offset + 3],
        ]))
    }

    /// Descend from the root picking, at every index node, the greatest
    /// child key that is less than or equal to the target. Returns the leaf
    /// node it lands in, or `None` when the target precedes every key in
    /// the tree and `descend_before` is false.
    ///
    /// `compare` receives raw record bytes and orders the record key
    /// relative to the target.
    fn descend<B, F>(
        &self,
        io: &IoHandle<B>,
        cache: &Mutex<NodeCache>,
        compare: &F,
        descend_before: bool,
    ) -> Result<Option<Arc<BtreeNode>>>
    where
        B: BlockIo,
        F: Fn(&[u8]) -> Ordering,
    {
        if self.header.root_node == 0 {
            return Ok(None);
        }
        let mut current = self.header.root_node;
        let mut depth = 0u32;

        loop {
            io.check_abort()?;
            depth += 1;
            if depth > self.header.tree_depth as u32 + 1 {
                return Err(HfsError::InvalidBTree(
                    "index descent exceeds tree depth".into(),
                ));
            }
            let node = self.node(io, cache, current)?;
            match node.descriptor.kind {
                NODE_KIND_LEAF => return Ok(Some(node)),
                NODE_KIND_INDEX => {
                    let mut child = None;
                    for i in 0..node.descriptor.num_records as usize {
                        let record_data = node.record_data(i)?;
                        match compare(record_data) {
                            Ordering::Less | Ordering::Equal => {
                                child = Some(self.index_child(record_data)?);
                            }
                            Ordering::Greater => break,
                        }
                    }
                    current = match child {
                        Some(child) => child,
                        None if descend_before && node.descriptor.num_records > 0 => {
                            // The whole subtree is greater than the target;
                            // a range scan still starts at its first leaf.
                            self.index_child(node.record_data(0)?)?
                        }
                        None => return Ok(None),
                    };
                }
                other => {
                    return Err(HfsError::InvalidBTree(format!(
                        "unexpected node kind 0x{:02X} during descent",
                        other
                    )));
                }
            }
        }
    }

    /// Key-ordered point search: returns the leaf node and record index of
    /// the first record comparing equal to the target.
    pub fn search<B, F>(
        &self,
        io: &IoHandle<B>,
        cache: &Mutex<NodeCache>,
        compare: &F,
    ) -> Result<Option<(Arc<BtreeNode>, usize)>>
    where
        B: BlockIo,
        F: Fn(&[u8]) -> Ordering,
    {
        let mut node = match self.descend(io, cache, compare, false)? {
            Some(node) => node,
            None => return Ok(None),
        };
        let mut records_seen = 0u64;

        // The matching record is normally in the landing leaf, but an
        // equal key range can continue into the next node.
        loop {
            io.check_abort()?;
            for i in 0..node.descriptor.num_records as usize {
                records_seen += 1;
                if records_seen > self.header.leaf_records as u64 + 1 {
                    return Err(HfsError::InvalidBTree(
                        "circular leaf chain detected during search".into(),
                    ));
                }
                let record_data = node.record_data(i)?;
                match compare(record_data) {
                    Ordering::Equal => return Ok(Some((node.clone(), i))),
                    Ordering::Greater => return Ok(None),
                    Ordering::Less => continue,
                }
            }
            if node.descriptor.forward_link == 0 {
                return Ok(None);
            }
            node = self.node(io, cache, node.descriptor.forward_link)?;
            if node.descriptor.kind != NODE_KIND_LEAF {
                return Err(HfsError::InvalidBTree(format!(
                    "leaf chain reaches node of kind 0x{:02X}",
                    node.descriptor.kind
                )));
            }
        }
    }

    /// Range scan: position at the first leaf that can contain the target
    /// key, then visit records in key order until the visitor stops the
    /// scan or the chain ends.
    pub fn scan<B, F, V>(
        &self,
        io: &IoHandle<B>,
        cache: &Mutex<NodeCache>,
        compare: &F,
        mut visit: V,
    ) -> Result<()>
    where
        B: BlockIo,
        F: Fn(&[u8]) -> Ordering,
        V: FnMut(&[u8]) -> Result<ScanControl>,
    {
        let mut node = match self.descend(io, cache, compare, true)? {
            Some(node) => node,
            None => return Ok(()),
        };
        let mut records_seen = 0u64;
        let mut nodes_seen = 0u32;

        loop {
            io.check_abort()?;
            nodes_seen += 1;
            if nodes_seen > self.node_count() {
                return Err(HfsError::InvalidBTree(
                    "circular leaf chain detected during scan".into(),
                ));
            }
            if node.descriptor.kind != NODE_KIND_LEAF {
                return Err(HfsError::InvalidBTree(format!(
                    "leaf chain reaches node of kind 0x{:02X}",
                    node.descriptor.kind
                )));
            }
            for i in 0..node.descriptor.num_records as usize {
                records_seen += 1;
                if records_seen > self.header.leaf_records as u64 + 1 {
                    return Err(HfsError::InvalidBTree(
                        "leaf chain yields more records than the header declares".into(),
                    ));
                }
                if visit(node.record_data(i)?)? == ScanControl::Stop {
                    return Ok(());
                }
            }
            if node.descriptor.forward_link == 0 {
                return Ok(());
            }
            node = self.node(io, cache, node.descriptor.forward_link)?;
        }
    }
}

/// Read `buf.len()` bytes at `offset` within a fork, issuing one I/O call
/// per crossed extent and zero-filling sparse segments.
pub(crate) fn read_fork<B: BlockIo>(
    io: &IoHandle<B>,
    segments: &[ExtentSegment],
    offset: u64,
    buf: &mut [u8],
) -> Result<()> {
    let mut remaining = buf.len();
    let mut buf_pos = 0usize;
    let mut fork_pos = offset;
    let mut segment_start = 0u64;

    for segment in segments {
        if remaining == 0 {
            break;
        }
        let segment_end = segment_start + segment.size;
        if fork_pos < segment_end {
            let within = fork_pos - segment_start;
            let chunk = ((segment.size - within) as usize).min(remaining);
            let dst = &mut buf[buf_pos..buf_pos + chunk];
            if segment.flags & EXTENT_IS_SPARSE != 0 {
                dst.fill(0);
            } else {
                io.read_at(segment.offset + within, dst)?;
            }
            buf_pos += chunk;
            remaining -= chunk;
            fork_pos += chunk as u64;
        }
        segment_start = segment_end;
    }

    if remaining > 0 {
        return Err(HfsError::OutOfBounds(format!(
            "read of {} bytes at fork offset {} exceeds extent capacity",
            buf.len(),
            offset
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockio::MemoryBlockIo;

    fn be16(v: u16) -> [u8; 2] {
        v.to_be_bytes()
    }

    /// Build a two-node tree: header node 0 and leaf node 1 with three
    /// records holding a single big-endian u32 key each.
    fn build_tree(keys: &[u32], forward_link: u32) -> Vec<u8> {
        let node_size = 512usize;
        let mut image = vec![0u8; node_size * 2];

        // Header node descriptor.
        image[8] = NODE_KIND_HEADER;
        image[12..14].copy_from_slice(&be16(3));
        // Header record: depth 1, root 1, leaf records, first/last leaf 1.
        let h = 14;
        image[h..h + 2].copy_from_slice(&be16(1));
        image[h + 2..h + 6].copy_from_slice(&1u32.to_be_bytes());
        image[h + 6..h + 10].copy_from_slice(&(keys.len() as u32).to_be_bytes());
        image[h + 10..h + 14].copy_from_slice(&1u32.to_be_bytes());
        image[h + 14..h + 18].copy_from_slice(&1u32.to_be_bytes());
        image[h + 18..h + 20].copy_from_slice(&be16(512));
        image[h + 20..h + 22].copy_from_slice(&be16(6));
        image[h + 22..h + 26].copy_from_slice(&2u32.to_be_bytes());
        // free nodes (26..30), reserved (30..32), clump (32..36), type (36)
        image[h + 37] = KEY_COMPARE_CASE_FOLDED;
        image[h + 38..h + 42].copy_from_slice(&ATTR_BIG_KEYS.to_be_bytes());
        // Offset table for header node records (header/user/map).
        image[node_size - 2..node_size].copy_from_slice(&be16(14));
        image[node_size - 4..node_size - 2].copy_from_slice(&be16(120));
        image[node_size - 6..node_size - 4].copy_from_slice(&be16(248));
        image[node_size - 8..node_size - 6].copy_from_slice(&be16(256));

        // Leaf node.
        let base = node_size;
        image[base..base + 4].copy_from_slice(&forward_link.to_be_bytes());
        image[base + 8] = NODE_KIND_LEAF;
        image[base + 9] = 1;
        image[base + 12..base + 14].copy_from_slice(&be16(keys.len() as u16));
        let mut offset = 14usize;
        for (i, key) in keys.iter().enumerate() {
            let record = base + offset;
            image[record..record + 2].copy_from_slice(&be16(4));
            image[record + 2..record + 6].copy_from_slice(&key.to_be_bytes());
            let table = base + node_size - (i + 1) * 2;
            image[table..table + 2].copy_from_slice(&be16(offset as u16));
            offset += 6;
        }
        let table = base + node_size - (keys.len() + 1) * 2;
        image[table..table + 2].copy_from_slice(&be16(offset as u16));

        image
    }

    fn key_of(record: &[u8]) -> u32 {
        u32::from_be_bytes([record[2], record[3], record[4], record[5]])
    }

    fn open_tree(image: Vec<u8>) -> (IoHandle<MemoryBlockIo<Vec<u8>>>, BtreeFile) {
        let size = image.len() as u64;
        let io = IoHandle::new(MemoryBlockIo::new(image));
        let segments = vec![ExtentSegment {
            offset: 0,
            size,
            flags: 0,
        }];
        let tree = BtreeFile::open(&io, segments).unwrap();
        (io, tree)
    }

    #[test]
    fn test_open_and_search() {
        let (io, tree) = open_tree(build_tree(&[10, 20, 30], 0));
        assert_eq!(tree.header.node_size, 512);
        assert_eq!(tree.header.leaf_records, 3);

        let cache = Mutex::new(NodeCache::new());
        let hit = tree
            .search(&io, &cache, &|record| key_of(record).cmp(&20))
            .unwrap();
        let (node, index) = hit.expect("key 20 should be found");
        assert_eq!(key_of(node.record_data(index).unwrap()), 20);

        let miss = tree
            .search(&io, &cache, &|record| key_of(record).cmp(&25))
            .unwrap();
        assert!(miss.is_none());
    }

    #[test]
    fn test_search_before_first_key() {
        let (io, tree) = open_tree(build_tree(&[10, 20, 30], 0));
        let cache = Mutex::new(NodeCache::new());
        let miss = tree
            .search(&io, &cache, &|record| key_of(record).cmp(&5))
            .unwrap();
        assert!(miss.is_none());
    }

    #[test]
    fn test_scan_range() {
        let (io, tree) = open_tree(build_tree(&[10, 20, 21, 30], 0));
        let cache = Mutex::new(NodeCache::new());
        let mut seen = Vec::new();
        tree.scan(
            &io,
            &cache,
            &|record| key_of(record).cmp(&20),
            |record| {
                let key = key_of(record);
                if key < 20 {
                    return Ok(ScanControl::Continue);
                }
                if key >= 30 {
                    return Ok(ScanControl::Stop);
                }
                seen.push(key);
                Ok(ScanControl::Continue)
            },
        )
        .unwrap();
        assert_eq!(seen, vec![20, 21]);
    }

    #[test]
    fn test_circular_chain_detected() {
        // Leaf points back at itself.
        let (io, tree) = open_tree(build_tree(&[10, 20, 30], 1));
        let cache = Mutex::new(NodeCache::new());
        let result = tree.scan(
            &io,
            &cache,
            &|record| key_of(record).cmp(&10),
            |_| Ok(ScanControl::Continue),
        );
        assert!(matches!(result, Err(HfsError::InvalidBTree(_))));
    }

    #[test]
    fn test_node_number_out_of_range() {
        let (io, tree) = open_tree(build_tree(&[10], 0));
        let cache = Mutex::new(NodeCache::new());
        assert!(matches!(
            tree.node(&io, &cache, 7),
            Err(HfsError::OutOfBounds(_))
        ));
    }

    #[test]
    fn test_node_cache_eviction() {
        let mut cache = NodeCache::with_capacity(2);
        for number in 0..3u32 {
            cache.insert(
                number,
                Arc::new(BtreeNode {
                    number,
                    descriptor: NodeDescriptor {
                        forward_link: 0,
                        backward_link: 0,
                        kind: NODE_KIND_LEAF,
                        height: 1,
                        num_records: 0,
                        reserved: 0,
                    },
                    data: Vec::new(),
                    record_offsets: vec![],
                }),
            );
        }
        assert!(cache.get(0).is_none(), "oldest node should be evicted");
        assert!(cache.get(1).is_some());
        assert!(cache.get(2).is_some());
    }

    #[test]
    fn test_abort_stops_scan() {
        let (io, tree) = open_tree(build_tree(&[10, 20, 30], 0));
        let cache = Mutex::new(NodeCache::new());
        io.request_abort();
        let result = tree.scan(
            &io,
            &cache,
            &|record| key_of(record).cmp(&10),
            |_| Ok(ScanControl::Continue),
        );
        assert!(matches!(result, Err(HfsError::Aborted)));
    }
}
