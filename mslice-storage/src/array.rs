use crate::conf::OpenConf;
use crate::error::{Error, Result};
use crate::record::Record;
use crate::store::RecordStore;
use log::debug;
use std::marker::PhantomData;
use std::path::Path;

/// ArrayFile is a length-tracked sequence of fixed-size records
/// persisted in a memory-mapped file.
///
/// The file has no header: record `i` occupies bytes
/// `[i * R::SIZE, (i + 1) * R::SIZE)`. Capacity is fixed when the
/// file is created or opened and never grows.
pub struct ArrayFile<R> {
    store: RecordStore,
    len: usize,
    cap: usize,
    _marker: PhantomData<fn() -> R>,
}

impl<R: Record> ArrayFile<R> {
    /// Create array file with given length and capacity.
    /// Capacity is expanded to length if smaller.
    /// Records beyond length are zero bytes.
    #[inline]
    pub fn create<P: AsRef<Path>>(path: P, len: usize, cap: usize) -> Result<Self> {
        let elem_size = elem_size::<R>()?;
        let cap = cap.max(len);
        let total = cap
            .checked_mul(elem_size)
            .ok_or_else(|| Error::InvalidArgument(format!("capacity {} too large", cap)))?;
        let store = RecordStore::create(path, total)?;
        debug!(
            "created array file {:?}, len={}, cap={}, elem_size={}",
            store.path(),
            len,
            cap,
            elem_size
        );
        Ok(ArrayFile {
            store,
            len,
            cap,
            _marker: PhantomData,
        })
    }

    /// Open existing array file, length and capacity are both
    /// inferred from file size.
    #[inline]
    pub fn open<P: AsRef<Path>>(path: P, writable: bool) -> Result<Self> {
        Self::open_with(path, OpenConf::default().writable(writable))
    }

    /// Open existing array file with explicit configuration.
    #[inline]
    pub fn open_with<P: AsRef<Path>>(path: P, conf: OpenConf) -> Result<Self> {
        let elem_size = elem_size::<R>()?;
        let store = RecordStore::open(path, conf.is_writable())?;
        let (len, cap) = conf.resolve(store.size(), elem_size);
        let need = cap
            .checked_mul(elem_size)
            .ok_or_else(|| Error::InvalidArgument(format!("capacity {} too large", cap)))?;
        if need > store.size() {
            return Err(Error::SizeMismatch {
                have: store.size(),
                need,
            });
        }
        debug!(
            "opened array file {:?}, len={}, cap={}, elem_size={}",
            store.path(),
            len,
            cap,
            elem_size
        );
        Ok(ArrayFile {
            store,
            len,
            cap,
            _marker: PhantomData,
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn cap(&self) -> usize {
        self.cap
    }

    /// Returns byte size of the mapped file.
    #[inline]
    pub fn size(&self) -> usize {
        self.store.size()
    }

    #[inline]
    pub fn elem_size(&self) -> usize {
        R::SIZE
    }

    /// Append records in order.
    ///
    /// Fails without writing anything if total length would exceed
    /// capacity. If a record fails to encode, records before it stay
    /// committed and length reflects them.
    #[inline]
    pub fn append(&mut self, recs: &[R]) -> Result<()> {
        let add = recs.len();
        if self.len + add > self.cap {
            return Err(Error::CapacityExceeded {
                len: self.len,
                cap: self.cap,
                add,
            });
        }
        for rec in recs {
            self.store.encode(self.len * R::SIZE, rec)?;
            self.len += 1;
        }
        Ok(())
    }

    /// Append single record.
    #[inline]
    pub fn push(&mut self, rec: &R) -> Result<()> {
        self.append(std::slice::from_ref(rec))
    }

    /// Overwrite record at given index.
    ///
    /// Index must be less than capacity. Writing at or beyond
    /// current length extends length to `idx + 1`, records in
    /// between keep their existing bytes.
    #[inline]
    pub fn set(&mut self, idx: usize, rec: &R) -> Result<()> {
        if idx >= self.cap {
            return Err(Error::IndexOutOfBound {
                idx,
                bound: self.cap,
            });
        }
        self.store.encode(idx * R::SIZE, rec)?;
        if idx >= self.len {
            self.len = idx + 1;
        }
        Ok(())
    }

    /// Decode record at given index into `rec`.
    /// Index must be less than length.
    #[inline]
    pub fn get(&self, idx: usize, rec: &mut R) -> Result<()> {
        if idx >= self.len {
            return Err(Error::IndexOutOfBound {
                idx,
                bound: self.len,
            });
        }
        self.store.decode(idx * R::SIZE, rec)
    }

    /// Returns iterator over decoded records within length.
    #[inline]
    pub fn iter(&self) -> Iter<'_, R>
    where
        R: Default,
    {
        Iter { arr: self, idx: 0 }
    }

    #[inline]
    pub fn flush(&self) -> Result<()> {
        self.store.flush()
    }

    /// Flush and release the underlying file.
    #[inline]
    pub fn close(self) -> Result<()> {
        self.store.close()
    }
}

impl<R: Record + Default> ArrayFile<R> {
    /// Returns owned record at given index.
    #[inline]
    pub fn read(&self, idx: usize) -> Result<R> {
        let mut rec = R::default();
        self.get(idx, &mut rec)?;
        Ok(rec)
    }
}

pub struct Iter<'a, R> {
    arr: &'a ArrayFile<R>,
    idx: usize,
}

impl<'a, R: Record + Default> Iterator for Iter<'a, R> {
    type Item = Result<R>;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        if self.idx >= self.arr.len() {
            return None;
        }
        let res = self.arr.read(self.idx);
        self.idx += 1;
        Some(res)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.arr.len() - self.idx;
        (n, Some(n))
    }
}

impl<'a, R: Record + Default> ExactSizeIterator for Iter<'a, R> {}

#[inline]
fn elem_size<R: Record>() -> Result<usize> {
    if R::SIZE == 0 {
        return Err(Error::InvalidArgument(
            "zero-sized record is not allowed".to_string(),
        ));
    }
    Ok(R::SIZE)
}
