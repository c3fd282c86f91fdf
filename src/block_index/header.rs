use byteorder::{ByteOrder, LittleEndian};

use crate::error::{Error, Result};

/// Format version written to every modern index file.
pub const FILE_FORMAT_VERSION: u32 = 7560;
/// Pre-release format marker, accepted as an alias of the current version.
pub const PRE_RELEASE_FORMAT_VERSION: u32 = 7512;

pub const HEADER_SIZE: usize = 8;

/// The 8-byte header of a modern index file: format version, log2 of the
/// block size, log2 of the compression factor, and the compression method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexHeader {
    pub version: u32,
    pub block_size_log: u8,
    pub compression_factor_log: u8,
    pub compression_method: u16,
}

impl IndexHeader {
    pub fn new(block_size: u64, compression_factor: u32, compression_method: u16) -> Self {
        Self {
            version: FILE_FORMAT_VERSION,
            block_size_log: shift_log(block_size),
            compression_factor_log: shift_log(compression_factor as u64),
            compression_method,
        }
    }

    pub fn block_size(&self) -> u64 {
        1u64 << self.block_size_log
    }

    pub fn compression_factor(&self) -> u32 {
        1u32 << self.compression_factor_log
    }

    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        LittleEndian::write_u32(&mut buf[0..4], self.version);
        buf[4] = self.block_size_log;
        buf[5] = self.compression_factor_log;
        LittleEndian::write_u16(&mut buf[6..8], self.compression_method);
        buf
    }

    /// Decodes and validates a header read from `filename`.
    pub fn decode(buf: &[u8], filename: &str) -> Result<Self> {
        if buf.len() < HEADER_SIZE {
            return Err(Error::BadHeader {
                filename: filename.to_string(),
                detail: format!("index file too short for a header ({} bytes)", buf.len()),
            });
        }

        let version = LittleEndian::read_u32(&buf[0..4]);
        if version != FILE_FORMAT_VERSION && version != PRE_RELEASE_FORMAT_VERSION {
            return Err(Error::BadHeader {
                filename: filename.to_string(),
                detail: format!("unsupported index file format version {version}"),
            });
        }

        let header = Self {
            version,
            block_size_log: buf[4],
            compression_factor_log: buf[5],
            compression_method: LittleEndian::read_u16(&buf[6..8]),
        };

        if header.block_size_log >= 64 {
            return Err(Error::BadHeader {
                filename: filename.to_string(),
                detail: format!("illegal block size (log2 = {})", header.block_size_log),
            });
        }
        if header.compression_factor_log >= 32
            || u64::from(header.compression_factor()) > header.block_size()
        {
            return Err(Error::BadHeader {
                filename: filename.to_string(),
                detail: format!(
                    "illegal compression factor (log2 = {})",
                    header.compression_factor_log
                ),
            });
        }

        Ok(header)
    }
}

/// Log2 of a power of two.
pub fn shift_log(value: u64) -> u8 {
    debug_assert!(value.is_power_of_two());
    value.trailing_zeros() as u8
}
