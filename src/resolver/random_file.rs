use std::marker::PhantomData;

use crate::encoding::FixedDiskIndex;
use crate::error::Result;
use crate::raw_file::RawFile;

/// Random-access index file: record `id` lives at byte offset
/// `id * V::WIDTH`. Ids beyond the end of the file, and an absent file,
/// read as the default value.
pub struct RandomFile<V: FixedDiskIndex> {
    file: Option<RawFile>,
    _marker: PhantomData<V>,
}

impl<V: FixedDiskIndex> RandomFile<V> {
    pub fn open(filename: &str) -> Result<Self> {
        Ok(Self {
            file: RawFile::open_optional("RandomFile::open", filename)?,
            _marker: PhantomData,
        })
    }

    /// An always-empty file, every record the default value.
    pub fn absent() -> Self {
        Self {
            file: None,
            _marker: PhantomData,
        }
    }

    pub fn get(&mut self, id: u64) -> Result<V> {
        let Some(file) = &mut self.file else {
            return Ok(V::default());
        };
        let mut buf = vec![0u8; V::WIDTH];
        if !file.read_exact_at("RandomFile::get", id * V::WIDTH as u64, &mut buf)? {
            return Ok(V::default());
        }
        let (value, _) = V::read_from(&buf)?;
        Ok(value)
    }
}

/// The overflow sentinel of a random index: the value whose on-disk bytes
/// are all `0xff`, marking ids whose indexes live in the index-list store.
pub fn overflow_sentinel<V: FixedDiskIndex>() -> Result<V> {
    let buf = vec![0xffu8; V::WIDTH];
    Ok(V::read_from(&buf)?.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::SpatialIndex;
    use crate::tmpfs::TempDir;
    use byteorder::{ByteOrder, LittleEndian};
    use std::fs;

    fn write_records(path: &str, values: &[u32]) {
        let mut buf = vec![0u8; values.len() * 4];
        for (i, &v) in values.iter().enumerate() {
            LittleEndian::write_u32(&mut buf[i * 4..i * 4 + 4], v);
        }
        fs::write(path, buf).expect("Failed to write random file");
    }

    #[test]
    fn test_get_by_stride() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let path = dir.path().join("nodes.map");
        let path = path.to_str().unwrap();
        write_records(path, &[11, 22, 33]);

        let mut file: RandomFile<SpatialIndex> = RandomFile::open(path).expect("Failed to open");
        assert_eq!(file.get(0).expect("Failed to read"), SpatialIndex(11));
        assert_eq!(file.get(2).expect("Failed to read"), SpatialIndex(33));
    }

    #[test]
    fn test_get_past_eof_is_default() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let path = dir.path().join("nodes.map");
        let path = path.to_str().unwrap();
        write_records(path, &[11]);

        let mut file: RandomFile<SpatialIndex> = RandomFile::open(path).expect("Failed to open");
        assert_eq!(file.get(100).expect("Failed to read"), SpatialIndex(0));
    }

    #[test]
    fn test_absent_file_reads_defaults() {
        let mut file: RandomFile<SpatialIndex> = RandomFile::absent();
        assert_eq!(file.get(7).expect("Failed to read"), SpatialIndex(0));
    }

    #[test]
    fn test_overflow_sentinel() {
        let sentinel: SpatialIndex = overflow_sentinel().expect("Failed to build sentinel");
        assert_eq!(sentinel, SpatialIndex(u32::MAX));
    }
}
