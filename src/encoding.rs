//! On-disk representation of index keys.
//!
//! Index keys are self-delimiting: their serialized width is recoverable
//! from the leading bytes, so index files can be walked without a separate
//! length field per entry. All multi-byte fields are little-endian.

use byteorder::{ByteOrder, LittleEndian};

use crate::error::Result;
use crate::errcorrupt;

/// A key an index file can be keyed by: totally ordered, cloneable, with a
/// self-delimiting byte representation.
pub trait DiskIndex: Ord + Clone {
    /// Reads a key from the front of `buf`, returning it together with the
    /// number of bytes consumed.
    fn read_from(buf: &[u8]) -> Result<(Self, usize)>
    where
        Self: Sized;

    /// Appends the serialized key to `out`.
    fn write_to(&self, out: &mut Vec<u8>);

    /// Serialized width of this key in bytes.
    fn disk_len(&self) -> usize;
}

/// A key with a fixed serialized width, usable as the record type of a
/// fixed-stride random-access file.
pub trait FixedDiskIndex: DiskIndex + Default {
    /// Serialized width of every key of this type.
    const WIDTH: usize;
}

/// A spatial bucket key: the upper 32 bits of a space-filling-curve
/// position. Fixed 4-byte representation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SpatialIndex(pub u32);

impl DiskIndex for SpatialIndex {
    fn read_from(buf: &[u8]) -> Result<(Self, usize)> {
        if buf.len() < 4 {
            return Err(errcorrupt!(
                "spatial index needs 4 bytes, {} available",
                buf.len()
            ));
        }
        Ok((SpatialIndex(LittleEndian::read_u32(buf)), 4))
    }

    fn write_to(&self, out: &mut Vec<u8>) {
        let mut bytes = [0u8; 4];
        LittleEndian::write_u32(&mut bytes, self.0);
        out.extend_from_slice(&bytes);
    }

    fn disk_len(&self) -> usize {
        4
    }
}

impl FixedDiskIndex for SpatialIndex {
    const WIDTH: usize = 4;
}

impl DiskIndex for u64 {
    fn read_from(buf: &[u8]) -> Result<(Self, usize)> {
        if buf.len() < 8 {
            return Err(errcorrupt!("u64 key needs 8 bytes, {} available", buf.len()));
        }
        Ok((LittleEndian::read_u64(buf), 8))
    }

    fn write_to(&self, out: &mut Vec<u8>) {
        let mut bytes = [0u8; 8];
        LittleEndian::write_u64(&mut bytes, *self);
        out.extend_from_slice(&bytes);
    }

    fn disk_len(&self) -> usize {
        8
    }
}

impl FixedDiskIndex for u64 {
    const WIDTH: usize = 8;
}
