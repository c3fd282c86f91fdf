//! Persistent index of a single block file.
//!
//! The index maps each index key to a run of fixed-size blocks in the data
//! file, and tracks the runs no entry references (the void list, i.e. the
//! free list of the allocator). Readers get a random-access array of
//! entries; writers get an editable sequence plus the void list, and the
//! whole structure is written back on close.
//!
//! # On-disk layout
//!
//! Modern index file: an 8-byte header (format version, log2 block size,
//! log2 compression factor, compression method) followed by concatenated
//! entries `{ u32 pos; u32 size; u32 max_keysize; index bytes }`.
//!
//! Legacy index file (extension `".legacy"`): no header; concatenated
//! entries `{ index bytes; u32 pos; u32 max_keysize }` with an implicit
//! run length of one block. Read-only: writing always emits the modern
//! layout.
//!
//! Void-list cache ("empty" file): concatenated `(u32 length, u32 start)`
//! pairs. Optional; rebuilt from the entry list when missing.

pub mod entry;
pub mod header;

use std::collections::VecDeque;

use byteorder::{ByteOrder, LittleEndian};
use tracing::{error, warn};

use crate::config::FileProperties;
use crate::encoding::DiskIndex;
use crate::error::{Error, Result};
use crate::errcorrupt;
use crate::raw_file::{self, RawFile};

pub use entry::BlockIndexEntry;
pub use header::{IndexHeader, FILE_FORMAT_VERSION, PRE_RELEASE_FORMAT_VERSION};

/// File name extension marking the headerless pre-versioning index layout.
pub const LEGACY_EXTENSION: &str = ".legacy";

/// Whether an index is opened for writeback or as a pure reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    Reader,
    Writer,
}

pub struct FileBlocksIndex<I: DiskIndex> {
    index_file_name: String,
    shadow_index_file_name: String,
    /// Set only for writers; doubles as the writeable flag.
    empty_index_file_name: Option<String>,
    data_file_name: String,
    extension: String,
    use_shadow: bool,

    /// Raw index bytes, kept until the entries are first needed.
    raw_index: Option<Vec<u8>>,
    file_size: u64,

    block_array: Vec<BlockIndexEntry<I>>,
    block_list: VecDeque<BlockIndexEntry<I>>,
    void_blocks: Vec<(u32, u32)>,
    void_blocks_initialized: bool,

    block_size: u64,
    compression_factor: u32,
    compression_method: u16,
    pub block_count: u32,

    closed: bool,
}

impl<I: DiskIndex> FileBlocksIndex<I> {
    /// Opens the index of one file family. A missing data or index file
    /// yields an empty index; any other I/O failure surfaces.
    ///
    /// Structural parameters come from `props` but are overridden by the
    /// persisted header when one exists. `compression_override` replaces
    /// the properties' compression method (not the header's).
    pub fn open(
        props: &FileProperties,
        mode: OpenMode,
        use_shadow: bool,
        db_dir: &str,
        extension: &str,
        compression_override: Option<u16>,
    ) -> Result<Self> {
        let writeable = mode == OpenMode::Writer;
        let mut index = Self {
            index_file_name: props.index_file_name(db_dir, extension, use_shadow),
            shadow_index_file_name: props.index_file_name(db_dir, extension, true),
            empty_index_file_name: writeable.then(|| props.empty_file_name(db_dir, extension)),
            data_file_name: props.data_file_name(db_dir, extension),
            extension: extension.to_string(),
            use_shadow,
            raw_index: None,
            file_size: 0,
            block_array: Vec::new(),
            block_list: VecDeque::new(),
            void_blocks: Vec::new(),
            void_blocks_initialized: false,
            block_size: props.block_size,
            compression_factor: props.compression_factor,
            compression_method: compression_override.unwrap_or(props.compression_method),
            block_count: 0,
            closed: false,
        };

        if let Some(data_file) =
            RawFile::open_optional("FileBlocksIndex::open::data", &index.data_file_name)?
        {
            index.file_size = data_file.size("FileBlocksIndex::open::data")?;
        }

        index.raw_index =
            raw_file::read_optional("FileBlocksIndex::open::index", &index.index_file_name)?
                .filter(|buf| !buf.is_empty());

        index.init_structure_params()?;

        if index.writeable() {
            index.init_void_blocks()?;
        }

        Ok(index)
    }

    pub fn writeable(&self) -> bool {
        self.empty_index_file_name.is_some()
    }

    pub fn empty(&self) -> bool {
        self.file_size == 0
    }

    pub fn data_file_name(&self) -> &str {
        &self.data_file_name
    }

    pub fn block_size(&self) -> u64 {
        self.block_size
    }

    pub fn compression_factor(&self) -> u32 {
        self.compression_factor
    }

    pub fn compression_method(&self) -> u16 {
        self.compression_method
    }

    /// Random-access view of the entries, for readers. Materialized from
    /// the raw index buffer or the list view on first call.
    pub fn blocks(&mut self) -> Result<&[BlockIndexEntry<I>]> {
        self.init_blocks()?;
        if self.block_array.is_empty() && !self.block_list.is_empty() {
            self.block_array = self.block_list.iter().cloned().collect();
        }
        Ok(&self.block_array)
    }

    /// Editable sequence view of the entries, for writers. Materialized
    /// from the raw index buffer or the array view on first call.
    pub fn block_list(&mut self) -> Result<&mut VecDeque<BlockIndexEntry<I>>> {
        self.init_blocks()?;
        if self.block_list.is_empty() && !self.block_array.is_empty() {
            self.block_list = self.block_array.iter().cloned().collect();
        }
        Ok(&mut self.block_list)
    }

    /// Releases the array view, keeping only the list view, to reclaim
    /// memory after a bulk read.
    pub fn drop_block_array(&mut self) {
        if self.block_list.is_empty() && !self.block_array.is_empty() {
            self.block_list = self.block_array.iter().cloned().collect();
        }
        self.block_array.clear();
        self.block_array.shrink_to_fit();
    }

    /// The free runs of the data file as `(length, start)` pairs, sorted by
    /// `(length, start)`.
    pub fn void_blocks(&mut self) -> Result<&[(u32, u32)]> {
        if !self.void_blocks_initialized {
            self.init_void_blocks()?;
        }
        Ok(&self.void_blocks)
    }

    /// Used-block bitmap of the data file: `true` for every block some live
    /// entry references.
    pub fn footprint(&mut self) -> Result<Vec<bool>> {
        if !self.void_blocks_initialized {
            self.init_void_blocks()?;
        }
        let mut used = vec![true; self.block_count as usize];
        for &(length, start) in &self.void_blocks {
            for i in 0..length as usize {
                if let Some(slot) = used.get_mut(start as usize + i) {
                    *slot = false;
                }
            }
        }
        Ok(used)
    }

    /// Writes the index back to disk and consumes the handle. For readers
    /// this is a no-op. For writers: the modern header plus all entries go
    /// to the shadow index file, which is renamed onto the primary (unless
    /// this instance was opened on the shadow, in which case the rename is
    /// the commit step of the owning transaction); the void list goes to
    /// the empty file, where failure is non-fatal.
    pub fn close(mut self) -> Result<()> {
        let result = self.write_back();
        self.closed = true;
        result
    }

    fn write_back(&mut self) -> Result<()> {
        let Some(empty_file_name) = self.empty_index_file_name.clone() else {
            return Ok(());
        };

        self.init_blocks()?;
        if self.block_list.is_empty() && !self.block_array.is_empty() {
            self.block_list = self.block_array.iter().cloned().collect();
        }

        let header = IndexHeader::new(
            self.block_size,
            self.compression_factor,
            self.compression_method,
        );
        let mut buf = Vec::with_capacity(
            header::HEADER_SIZE + self.block_list.iter().map(|e| e.disk_len()).sum::<usize>(),
        );
        buf.extend_from_slice(&header.encode());
        for entry in &self.block_list {
            let mut fields = [0u8; 12];
            LittleEndian::write_u32(&mut fields[0..4], entry.pos);
            LittleEndian::write_u32(&mut fields[4..8], entry.size);
            LittleEndian::write_u32(&mut fields[8..12], entry.max_keysize);
            buf.extend_from_slice(&fields);
            entry.index.write_to(&mut buf);
        }

        let mut dest = RawFile::open_write(
            "FileBlocksIndex::close::index",
            &self.shadow_index_file_name,
        )?;
        dest.resize("FileBlocksIndex::close::index", 0)?;
        dest.write_all_at_start("FileBlocksIndex::close::index", &buf)?;
        dest.sync("FileBlocksIndex::close::index")?;
        drop(dest);

        if !self.use_shadow {
            raw_file::rename(
                "FileBlocksIndex::close::rename",
                &self.shadow_index_file_name,
                &self.index_file_name,
            )?;
        }

        // Each void pair occupies the full 8 bytes on disk.
        let mut void_buf = Vec::with_capacity(self.void_blocks.len() * 8);
        for &(length, start) in &self.void_blocks {
            let mut pair = [0u8; 8];
            LittleEndian::write_u32(&mut pair[0..4], length);
            LittleEndian::write_u32(&mut pair[4..8], start);
            void_buf.extend_from_slice(&pair);
        }
        let write_void = || -> Result<()> {
            let mut void_file =
                RawFile::open_write("FileBlocksIndex::close::void", &empty_file_name)?;
            void_file.resize("FileBlocksIndex::close::void", 0)?;
            void_file.write_all_at_start("FileBlocksIndex::close::void", &void_buf)?;
            Ok(())
        };
        if let Err(e) = write_void() {
            // Rebuilt from the entry list on the next open.
            warn!(error = %e, "void-list cache write failed");
        }

        Ok(())
    }

    fn init_structure_params(&mut self) -> Result<()> {
        let Some(buf) = &self.raw_index else {
            return Ok(());
        };

        if self.extension != LEGACY_EXTENSION {
            let header = IndexHeader::decode(buf, &self.index_file_name)?;
            self.block_size = header.block_size();
            self.compression_factor = header.compression_factor();
            self.compression_method = header.compression_method;
        }

        if self.file_size % self.block_size != 0 {
            return Err(Error::BlockSizeMismatch {
                filename: self.index_file_name.clone(),
                detail: format!(
                    "data file size {} is not a multiple of block size {}",
                    self.file_size, self.block_size
                ),
            });
        }
        self.block_count = (self.file_size / self.block_size) as u32;
        Ok(())
    }

    fn init_blocks(&mut self) -> Result<()> {
        let Some(buf) = self.raw_index.take() else {
            return Ok(());
        };

        if self.extension == LEGACY_EXTENSION {
            let mut pos = 0usize;
            while pos < buf.len() {
                let (index, key_len) = I::read_from(&buf[pos..])?;
                if pos + key_len + 8 > buf.len() {
                    return Err(errcorrupt!(
                        "truncated legacy index entry at offset {pos} in '{}'",
                        self.index_file_name
                    ));
                }
                let entry = BlockIndexEntry::new(
                    index,
                    LittleEndian::read_u32(&buf[pos + key_len..pos + key_len + 4]),
                    1,
                    LittleEndian::read_u32(&buf[pos + key_len + 4..pos + key_len + 8]),
                );
                self.check_entry_range(&entry)?;
                self.push_entry(entry);
                pos += key_len + 8;
            }
        } else {
            let mut pos = header::HEADER_SIZE;
            while pos < buf.len() {
                if pos + 12 > buf.len() {
                    return Err(errcorrupt!(
                        "truncated index entry at offset {pos} in '{}'",
                        self.index_file_name
                    ));
                }
                let block_pos = LittleEndian::read_u32(&buf[pos..pos + 4]);
                let size = LittleEndian::read_u32(&buf[pos + 4..pos + 8]);
                let max_keysize = LittleEndian::read_u32(&buf[pos + 8..pos + 12]);
                let (index, key_len) = I::read_from(&buf[pos + 12..])?;
                let entry = BlockIndexEntry::new(index, block_pos, size, max_keysize);
                self.check_entry_range(&entry)?;
                self.push_entry(entry);
                pos += 12 + key_len;
            }
        }

        Ok(())
    }

    fn check_entry_range(&self, entry: &BlockIndexEntry<I>) -> Result<()> {
        if entry.pos >= self.block_count {
            return Err(Error::BlockSizeMismatch {
                filename: self.index_file_name.clone(),
                detail: format!(
                    "bad pos in index file: block {} of {}",
                    entry.pos, self.block_count
                ),
            });
        }
        if u64::from(entry.pos) + u64::from(entry.size) > u64::from(self.block_count) {
            return Err(Error::BlockSizeMismatch {
                filename: self.index_file_name.clone(),
                detail: format!(
                    "bad size in index file: blocks [{}, {}) of {}",
                    entry.pos,
                    u64::from(entry.pos) + u64::from(entry.size),
                    self.block_count
                ),
            });
        }
        Ok(())
    }

    fn push_entry(&mut self, entry: BlockIndexEntry<I>) {
        if self.writeable() {
            self.block_list.push_back(entry);
        } else {
            self.block_array.push(entry);
        }
    }

    fn init_void_blocks(&mut self) -> Result<()> {
        self.init_blocks()?;

        let mut cache_used = false;
        if let Some(empty_file_name) = &self.empty_index_file_name {
            if let Ok(Some(buf)) =
                raw_file::read_optional("FileBlocksIndex::open::void", empty_file_name)
            {
                // A trailing partial pair is tolerated: older writers
                // truncated the final bytes of the cache.
                for pair in buf.chunks_exact(8) {
                    self.void_blocks.push((
                        LittleEndian::read_u32(&pair[0..4]),
                        LittleEndian::read_u32(&pair[4..8]),
                    ));
                }
                cache_used = true;
            }
        }

        if !cache_used {
            let mut is_referred = vec![false; self.block_count as usize];
            for entry in self.block_list.iter().chain(self.block_array.iter()) {
                for i in 0..entry.size {
                    is_referred[(entry.pos + i) as usize] = true;
                }
            }

            let mut last_start = 0u32;
            for i in 0..self.block_count {
                if is_referred[i as usize] {
                    if last_start < i {
                        self.void_blocks.push((i - last_start, last_start));
                    }
                    last_start = i + 1;
                }
            }
            if last_start < self.block_count {
                self.void_blocks
                    .push((self.block_count - last_start, last_start));
            }
        }

        self.void_blocks.sort();
        self.void_blocks_initialized = true;
        Ok(())
    }
}

impl<I: DiskIndex> Drop for FileBlocksIndex<I> {
    fn drop(&mut self) {
        if self.closed || !self.writeable() {
            return;
        }
        if let Err(e) = self.write_back() {
            error!(error = %e, file = %self.index_file_name, "block index write-back failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NO_COMPRESSION;
    use crate::encoding::SpatialIndex;
    use crate::tmpfs::TempDir;
    use std::fs;

    const BLOCK_SIZE: u64 = 1024;

    fn test_props(trunk: &str) -> FileProperties {
        FileProperties::new(trunk).block_size(BLOCK_SIZE)
    }

    fn write_data_file(props: &FileProperties, db_dir: &str, block_count: u32) {
        let path = props.data_file_name(db_dir, "");
        let file = fs::File::create(&path).expect("Failed to create data file");
        file.set_len(u64::from(block_count) * BLOCK_SIZE)
            .expect("Failed to size data file");
    }

    fn write_modern_index(props: &FileProperties, db_dir: &str, entries: &[(u32, u32, u32, u32)]) {
        let header = IndexHeader::new(BLOCK_SIZE, 1, NO_COMPRESSION);
        let mut buf = header.encode().to_vec();
        for &(idx, pos, size, max_keysize) in entries {
            let mut fields = [0u8; 12];
            LittleEndian::write_u32(&mut fields[0..4], pos);
            LittleEndian::write_u32(&mut fields[4..8], size);
            LittleEndian::write_u32(&mut fields[8..12], max_keysize);
            buf.extend_from_slice(&fields);
            SpatialIndex(idx).write_to(&mut buf);
        }
        fs::write(props.index_file_name(db_dir, "", false), buf)
            .expect("Failed to write index file");
    }

    fn open_reader(
        props: &FileProperties,
        db_dir: &str,
    ) -> crate::error::Result<FileBlocksIndex<SpatialIndex>> {
        FileBlocksIndex::open(props, OpenMode::Reader, false, db_dir, "", None)
    }

    fn open_writer(
        props: &FileProperties,
        db_dir: &str,
    ) -> crate::error::Result<FileBlocksIndex<SpatialIndex>> {
        FileBlocksIndex::open(props, OpenMode::Writer, false, db_dir, "", None)
    }

    #[test]
    fn test_missing_files_open_empty() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let props = test_props("nodes");

        let mut index = open_reader(&props, &dir.db_dir()).expect("Absent store must open empty");
        assert!(index.empty());
        assert_eq!(index.block_count, 0);
        assert!(index.blocks().expect("Failed to read blocks").is_empty());
    }

    #[test]
    fn test_void_list_derivation() {
        // Ten blocks, live entries covering {0,1,2} and {5,6}: the free
        // runs are (2,3) and (3,7).
        let dir = TempDir::new().expect("Failed to create temp dir");
        let props = test_props("nodes");
        write_data_file(&props, &dir.db_dir(), 10);
        write_modern_index(&props, &dir.db_dir(), &[(100, 0, 3, 16), (200, 5, 2, 16)]);

        let mut index = open_reader(&props, &dir.db_dir()).expect("Failed to open");
        assert_eq!(index.block_count, 10);
        assert_eq!(
            index.void_blocks().expect("Failed to derive void list"),
            &[(2, 3), (3, 7)]
        );
    }

    #[test]
    fn test_void_list_loaded_from_cache_sorted() {
        // A writer trusts the cache file as-is, sorted by (length, start).
        let dir = TempDir::new().expect("Failed to create temp dir");
        let props = test_props("nodes");
        write_data_file(&props, &dir.db_dir(), 10);
        write_modern_index(&props, &dir.db_dir(), &[(100, 0, 3, 16), (200, 5, 2, 16)]);

        let mut cache = Vec::new();
        for (length, start) in [(2u32, 3u32), (1, 7), (2, 8)] {
            let mut pair = [0u8; 8];
            LittleEndian::write_u32(&mut pair[0..4], length);
            LittleEndian::write_u32(&mut pair[4..8], start);
            cache.extend_from_slice(&pair);
        }
        fs::write(props.empty_file_name(&dir.db_dir(), ""), cache)
            .expect("Failed to write cache");

        let mut index = open_writer(&props, &dir.db_dir()).expect("Failed to open");
        assert_eq!(
            index.void_blocks().expect("Failed to load void list"),
            &[(1, 7), (2, 3), (2, 8)]
        );
        index.close().expect("Failed to close");
    }

    #[test]
    fn test_partitioning_invariant() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let props = test_props("nodes");
        write_data_file(&props, &dir.db_dir(), 64);
        let entries = [(10, 0, 4, 16), (20, 7, 1, 16), (30, 12, 30, 16), (40, 60, 4, 16)];
        write_modern_index(&props, &dir.db_dir(), &entries);

        let mut index = open_reader(&props, &dir.db_dir()).expect("Failed to open");
        let live: u64 = index
            .blocks()
            .expect("Failed to read blocks")
            .iter()
            .map(|e| u64::from(e.size))
            .sum();
        let void: u64 = index
            .void_blocks()
            .expect("Failed to derive void list")
            .iter()
            .map(|&(length, _)| u64::from(length))
            .sum();
        assert_eq!(live + void, u64::from(index.block_count));

        // No two live runs overlap.
        let mut runs: Vec<(u32, u32)> = index
            .blocks()
            .expect("Failed to read blocks")
            .iter()
            .map(|e| (e.pos, e.pos + e.size))
            .collect();
        runs.sort();
        for pair in runs.windows(2) {
            assert!(pair[0].1 <= pair[1].0, "overlapping runs {pair:?}");
        }
    }

    #[test]
    fn test_round_trip_byte_equivalence() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let props = test_props("nodes");
        write_data_file(&props, &dir.db_dir(), 10);
        write_modern_index(&props, &dir.db_dir(), &[(100, 0, 3, 16), (200, 5, 2, 16)]);

        let index_path = props.index_file_name(&dir.db_dir(), "", false);
        let before = fs::read(&index_path).expect("Failed to read index file");

        let index = open_writer(&props, &dir.db_dir()).expect("Failed to open");
        index.close().expect("Failed to close");

        let after = fs::read(&index_path).expect("Failed to re-read index file");
        assert_eq!(before, after);
    }

    #[test]
    fn test_void_list_rebuild_matches_cache() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let props = test_props("nodes");
        write_data_file(&props, &dir.db_dir(), 16);
        write_modern_index(&props, &dir.db_dir(), &[(1, 2, 3, 16), (2, 9, 4, 16)]);

        let mut writer = open_writer(&props, &dir.db_dir()).expect("Failed to open");
        let derived: Vec<_> = writer
            .void_blocks()
            .expect("Failed to derive void list")
            .to_vec();
        writer.close().expect("Failed to close");

        let cache_path = props.empty_file_name(&dir.db_dir(), "");
        assert!(fs::metadata(&cache_path).is_ok(), "cache must be written");
        fs::remove_file(&cache_path).expect("Failed to delete cache");

        let mut reopened = open_writer(&props, &dir.db_dir()).expect("Failed to reopen");
        assert_eq!(
            reopened.void_blocks().expect("Failed to rebuild void list"),
            derived.as_slice()
        );
        reopened.close().expect("Failed to close");
    }

    #[test]
    fn test_legacy_format_read() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let props = test_props("ways");
        let db_dir = dir.db_dir();

        let data_path = props.data_file_name(&db_dir, LEGACY_EXTENSION);
        let file = fs::File::create(&data_path).expect("Failed to create data file");
        file.set_len(4 * BLOCK_SIZE).expect("Failed to size file");

        // { index; u32 pos; u32 max_keysize }, implicit size 1.
        let mut buf = Vec::new();
        for (idx, pos, max_keysize) in [(7u32, 0u32, 12u32), (9, 2, 20)] {
            SpatialIndex(idx).write_to(&mut buf);
            let mut fields = [0u8; 8];
            LittleEndian::write_u32(&mut fields[0..4], pos);
            LittleEndian::write_u32(&mut fields[4..8], max_keysize);
            buf.extend_from_slice(&fields);
        }
        fs::write(props.index_file_name(&db_dir, LEGACY_EXTENSION, false), buf)
            .expect("Failed to write legacy index");

        let mut index: FileBlocksIndex<SpatialIndex> =
            FileBlocksIndex::open(&props, OpenMode::Reader, false, &db_dir, LEGACY_EXTENSION, None)
                .expect("Failed to open legacy index");
        let blocks = index.blocks().expect("Failed to read blocks");
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0], BlockIndexEntry::new(SpatialIndex(7), 0, 1, 12));
        assert_eq!(blocks[1], BlockIndexEntry::new(SpatialIndex(9), 2, 1, 20));
    }

    #[test]
    fn test_legacy_write_back_is_modern() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let props = test_props("ways");
        let db_dir = dir.db_dir();

        let data_path = props.data_file_name(&db_dir, LEGACY_EXTENSION);
        let file = fs::File::create(&data_path).expect("Failed to create data file");
        file.set_len(2 * BLOCK_SIZE).expect("Failed to size file");

        let mut buf = Vec::new();
        SpatialIndex(5).write_to(&mut buf);
        let mut fields = [0u8; 8];
        LittleEndian::write_u32(&mut fields[0..4], 1);
        LittleEndian::write_u32(&mut fields[4..8], 8);
        buf.extend_from_slice(&fields);
        let index_path = props.index_file_name(&db_dir, LEGACY_EXTENSION, false);
        fs::write(&index_path, buf).expect("Failed to write legacy index");

        let index: FileBlocksIndex<SpatialIndex> =
            FileBlocksIndex::open(&props, OpenMode::Writer, false, &db_dir, LEGACY_EXTENSION, None)
                .expect("Failed to open legacy index");
        index.close().expect("Failed to close");

        let written = fs::read(&index_path).expect("Failed to read written index");
        assert_eq!(
            LittleEndian::read_u32(&written[0..4]),
            FILE_FORMAT_VERSION,
            "write-back must emit the modern layout"
        );
        // Header, then { pos; size; max_keysize; index }.
        assert_eq!(LittleEndian::read_u32(&written[8..12]), 1);
        assert_eq!(LittleEndian::read_u32(&written[12..16]), 1);
        assert_eq!(LittleEndian::read_u32(&written[16..20]), 8);
        assert_eq!(LittleEndian::read_u32(&written[20..24]), 5);
    }

    #[test]
    fn test_bad_header_version_rejected() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let props = test_props("nodes");
        write_data_file(&props, &dir.db_dir(), 2);

        let mut buf = IndexHeader::new(BLOCK_SIZE, 1, NO_COMPRESSION).encode().to_vec();
        LittleEndian::write_u32(&mut buf[0..4], 4242);
        fs::write(props.index_file_name(&dir.db_dir(), "", false), buf)
            .expect("Failed to write index");

        assert!(matches!(
            open_reader(&props, &dir.db_dir()),
            Err(Error::BadHeader { .. })
        ));
    }

    #[test]
    fn test_block_size_mismatch_rejected() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let props = test_props("nodes");

        let data_path = props.data_file_name(&dir.db_dir(), "");
        fs::write(&data_path, vec![0u8; BLOCK_SIZE as usize + 100])
            .expect("Failed to write data file");
        write_modern_index(&props, &dir.db_dir(), &[]);

        assert!(matches!(
            open_reader(&props, &dir.db_dir()),
            Err(Error::BlockSizeMismatch { .. })
        ));
    }

    #[test]
    fn test_entry_past_end_of_file_rejected() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let props = test_props("nodes");
        write_data_file(&props, &dir.db_dir(), 4);
        write_modern_index(&props, &dir.db_dir(), &[(1, 2, 5, 16)]);

        let mut index = open_reader(&props, &dir.db_dir()).expect("Header itself is fine");
        assert!(matches!(
            index.blocks(),
            Err(Error::BlockSizeMismatch { .. })
        ));
    }

    #[test]
    fn test_drop_block_array_keeps_entries() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let props = test_props("nodes");
        write_data_file(&props, &dir.db_dir(), 4);
        write_modern_index(&props, &dir.db_dir(), &[(1, 0, 2, 16)]);

        let mut index = open_reader(&props, &dir.db_dir()).expect("Failed to open");
        assert_eq!(index.blocks().expect("Failed to read blocks").len(), 1);
        index.drop_block_array();
        assert_eq!(index.block_list().expect("Failed to get list").len(), 1);
        // The array view can be rebuilt from the list.
        assert_eq!(index.blocks().expect("Failed to rebuild array").len(), 1);
    }

    #[test]
    fn test_footprint() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let props = test_props("nodes");
        write_data_file(&props, &dir.db_dir(), 6);
        write_modern_index(&props, &dir.db_dir(), &[(1, 1, 2, 16), (2, 5, 1, 16)]);

        let mut index = open_reader(&props, &dir.db_dir()).expect("Failed to open");
        assert_eq!(
            index.footprint().expect("Failed to compute footprint"),
            vec![false, true, true, false, false, true]
        );
    }
}
