use serde::{Deserialize, Serialize};

/// No block compression; the index only records the method so the block
/// reader knows how to decompress.
pub const NO_COMPRESSION: u16 = 0;
/// zlib-compressed blocks.
pub const ZLIB_COMPRESSION: u16 = 1;
/// lz4-compressed blocks.
pub const LZ4_COMPRESSION: u16 = 2;

/// Structural parameters and naming scheme of one on-disk file family.
///
/// A store named `nodes` with the default suffixes owns:
/// - `nodes.bin` — packed blocks,
/// - `nodes.bin.idx` — primary index,
/// - `nodes.bin.idx.shadow` — shadow index (when a writer is active),
/// - `nodes.bin.shadow` — void-list cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileProperties {
    /// File name trunk, e.g. "nodes" or "ways_attic".
    pub file_name_trunk: String,

    /// Suffix of the packed data file (default: ".bin").
    pub data_suffix: String,

    /// Suffix of the primary index file, appended after the data suffix
    /// (default: ".idx").
    pub index_suffix: String,

    /// Suffix of shadow files (default: ".shadow").
    pub shadow_suffix: String,

    /// Block size in bytes; must be a power of two (default: 512 KiB).
    pub block_size: u64,

    /// Compression granularity; power of two, at most `block_size`
    /// (default: 1, i.e. whole-block units).
    pub compression_factor: u32,

    /// Compression method recorded in the index header (default: none).
    pub compression_method: u16,
}

impl FileProperties {
    /// Creates properties for the given file name trunk with default
    /// structural parameters.
    pub fn new(file_name_trunk: impl Into<String>) -> Self {
        Self {
            file_name_trunk: file_name_trunk.into(),
            data_suffix: ".bin".to_string(),
            index_suffix: ".idx".to_string(),
            shadow_suffix: ".shadow".to_string(),
            block_size: 512 * 1024,
            compression_factor: 1,
            compression_method: NO_COMPRESSION,
        }
    }

    /// Set the block size. Must be a power of two.
    pub fn block_size(mut self, size: u64) -> Self {
        self.block_size = size;
        self
    }

    /// Set the compression factor. Must be a power of two.
    pub fn compression_factor(mut self, factor: u32) -> Self {
        self.compression_factor = factor;
        self
    }

    /// Set the compression method.
    pub fn compression_method(mut self, method: u16) -> Self {
        self.compression_method = method;
        self
    }

    /// Set the data file suffix.
    pub fn data_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.data_suffix = suffix.into();
        self
    }

    /// Path of the packed data file, relative to `db_dir`.
    pub fn data_file_name(&self, db_dir: &str, extension: &str) -> String {
        format!(
            "{db_dir}{}{extension}{}",
            self.file_name_trunk, self.data_suffix
        )
    }

    /// Path of the primary index file, optionally the shadow variant.
    pub fn index_file_name(&self, db_dir: &str, extension: &str, use_shadow: bool) -> String {
        let shadow = if use_shadow {
            self.shadow_suffix.as_str()
        } else {
            ""
        };
        format!(
            "{db_dir}{}{extension}{}{}{shadow}",
            self.file_name_trunk, self.data_suffix, self.index_suffix
        )
    }

    /// Path of the void-list cache file ("empty" file).
    pub fn empty_file_name(&self, db_dir: &str, extension: &str) -> String {
        format!(
            "{db_dir}{}{extension}{}{}",
            self.file_name_trunk, self.data_suffix, self.shadow_suffix
        )
    }
}
