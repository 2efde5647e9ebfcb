use crate::error::{Error, Result};
use crate::mmap::MmapFile;
use crate::record::Record;
use std::path::Path;

/// RecordStore encodes and decodes records at arbitrary byte
/// offsets of a mapped file.
///
/// Only the mapped byte span is checked here. Record-level
/// bounds are maintained by higher-level containers.
pub struct RecordStore {
    map: MmapFile,
}

impl RecordStore {
    /// Create a zero-filled file of `size` bytes and map it writable.
    #[inline]
    pub fn create<P: AsRef<Path>>(path: P, size: usize) -> Result<Self> {
        let map = MmapFile::create(path, size)?;
        Ok(RecordStore { map })
    }

    /// Open and map an existing file.
    #[inline]
    pub fn open<P: AsRef<Path>>(path: P, writable: bool) -> Result<Self> {
        let map = MmapFile::open(path, writable)?;
        Ok(RecordStore { map })
    }

    /// Returns total mapped bytes.
    #[inline]
    pub fn size(&self) -> usize {
        self.map.len()
    }

    #[inline]
    pub fn is_writable(&self) -> bool {
        self.map.is_writable()
    }

    #[inline]
    pub fn path(&self) -> &Path {
        self.map.path()
    }

    /// Encode record into mapped bytes starting at offset.
    #[inline]
    pub fn encode<R: Record>(&mut self, offset: usize, rec: &R) -> Result<()> {
        let total = self.size();
        let end = span_end(offset, R::SIZE, total)?;
        let bytes = self.map.as_bytes_mut()?;
        rec.encode(&mut bytes[offset..end])
    }

    /// Decode record from mapped bytes starting at offset.
    #[inline]
    pub fn decode<R: Record>(&self, offset: usize, rec: &mut R) -> Result<()> {
        let end = span_end(offset, R::SIZE, self.size())?;
        rec.decode(&self.map.as_bytes()[offset..end])
    }

    #[inline]
    pub fn flush(&self) -> Result<()> {
        self.map.flush()
    }

    #[inline]
    pub fn close(self) -> Result<()> {
        self.map.close()
    }
}

#[inline]
fn span_end(offset: usize, size: usize, total: usize) -> Result<usize> {
    match offset.checked_add(size) {
        Some(end) if end <= total => Ok(end),
        _ => Err(Error::OffsetOutOfBound {
            offset,
            size,
            total,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    /// Always rejects its span.
    struct Broken;

    impl Record for Broken {
        const SIZE: usize = 4;

        fn encode(&self, _buf: &mut [u8]) -> Result<()> {
            Err(Error::Encode("broken".to_string()))
        }

        fn decode(&mut self, _buf: &[u8]) -> Result<()> {
            Err(Error::Decode("broken".to_string()))
        }
    }

    #[test]
    fn test_record_store_encode_decode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.bin");
        let mut store = RecordStore::create(&path, 64).unwrap();
        assert_eq!(64, store.size());
        assert!(store.is_writable());
        store.encode(0, &42u64).unwrap();
        store.encode(8, &[1u8, 2, 3, 4]).unwrap();
        store.encode(60, &-1i32).unwrap();
        let mut v = 0u64;
        store.decode(0, &mut v).unwrap();
        assert_eq!(42, v);
        let mut arr = [0u8; 4];
        store.decode(8, &mut arr).unwrap();
        assert_eq!([1, 2, 3, 4], arr);
        store.close().unwrap();

        let store = RecordStore::open(&path, false).unwrap();
        let mut i = 0i32;
        store.decode(60, &mut i).unwrap();
        assert_eq!(-1, i);
        store.close().unwrap();
    }

    #[test]
    fn test_record_store_out_of_span() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("span.bin");
        let mut store = RecordStore::create(&path, 16).unwrap();
        let res = store.encode(12, &1u64);
        assert!(matches!(
            res,
            Err(Error::OffsetOutOfBound {
                offset: 12,
                size: 8,
                total: 16
            })
        ));
        let mut v = 0u64;
        assert!(store.decode(usize::MAX, &mut v).is_err());
        // nothing written by failed encode
        store.close().unwrap();
        assert!(fs::read(&path).unwrap().iter().all(|b| *b == 0));
    }

    #[test]
    fn test_record_store_read_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ro.bin");
        RecordStore::create(&path, 8).unwrap().close().unwrap();
        let mut store = RecordStore::open(&path, false).unwrap();
        assert!(!store.is_writable());
        assert!(matches!(store.encode(0, &1u32), Err(Error::ReadOnly)));
        store.close().unwrap();
    }

    #[test]
    fn test_record_store_record_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.bin");
        let mut store = RecordStore::create(&path, 8).unwrap();
        assert!(matches!(store.encode(0, &Broken), Err(Error::Encode(_))));
        assert!(matches!(store.decode(4, &mut Broken), Err(Error::Decode(_))));
        store.close().unwrap();
    }
}
