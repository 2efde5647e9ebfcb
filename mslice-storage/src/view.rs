use crate::conf::OpenConf;
use crate::error::{Error, Result};
use crate::mmap::MmapFile;
use bytemuck::Pod;
use std::borrow::{Borrow, BorrowMut};
use std::marker::PhantomData;
use std::mem::size_of;
use std::path::Path;
use std::slice;

/// TypedView reinterprets mapped bytes as an array of `T`.
///
/// Elements are read and written in place, using native byte
/// order and layout of `T`. The first `len` elements are
/// populated, and up to `cap` elements can be held. Capacity is
/// a hard limit fixed by the mapped span.
///
/// The view either owns the mapping (`TypedView<T>`) or borrows
/// it (`TypedView<T, &mut MmapFile>`). In the latter case the
/// mapping cannot be closed while the view is alive.
pub struct TypedView<T, M = MmapFile> {
    map: M,
    len: usize,
    cap: usize,
    _marker: PhantomData<T>,
}

impl<T: Pod, M: BorrowMut<MmapFile>> TypedView<T, M> {
    /// Create a view over given mapping.
    /// Capacity is expanded to length if smaller, and the mapping
    /// must hold at least `cap * size_of::<T>()` bytes.
    #[inline]
    pub fn new(map: M, len: usize, cap: usize) -> Result<Self> {
        let elem_size = elem_size::<T>()?;
        let cap = cap.max(len);
        let need = cap
            .checked_mul(elem_size)
            .ok_or_else(|| Error::InvalidArgument(format!("capacity {} too large", cap)))?;
        let have = map.borrow().len();
        if need > have {
            return Err(Error::SizeMismatch { have, need });
        }
        if need > 0 {
            // validate alignment once, later casts on the same base never fail.
            let _ = bytemuck::try_cast_slice::<u8, T>(&map.borrow().as_bytes()[..need])?;
        }
        Ok(TypedView {
            map,
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
    pub fn capacity(&self) -> usize {
        self.cap
    }

    /// Returns populated elements.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        if self.len == 0 {
            return &[];
        }
        let bytes = &self.map.borrow().as_bytes()[..self.len * size_of::<T>()];
        bytemuck::cast_slice(bytes)
    }

    /// Returns populated elements for in-place mutation.
    /// Fails if the mapping is read-only.
    #[inline]
    pub fn as_mut_slice(&mut self) -> Result<&mut [T]> {
        let len = self.len;
        let elems = self.elems_mut()?;
        Ok(&mut elems[..len])
    }

    /// Returns element at given index, which must be less than length.
    #[inline]
    pub fn get(&self, idx: usize) -> Result<&T> {
        self.as_slice().get(idx).ok_or(Error::IndexOutOfBound {
            idx,
            bound: self.len,
        })
    }

    /// Returns mutable element at given index, which must be less than length.
    #[inline]
    pub fn get_mut(&mut self, idx: usize) -> Result<&mut T> {
        let len = self.len;
        self.as_mut_slice()?
            .get_mut(idx)
            .ok_or(Error::IndexOutOfBound { idx, bound: len })
    }

    /// Write element at given index.
    ///
    /// Index must be less than capacity. Writing at or beyond
    /// length extends length to `idx + 1`.
    #[inline]
    pub fn set(&mut self, idx: usize, val: T) -> Result<()> {
        if idx >= self.cap {
            return Err(Error::IndexOutOfBound {
                idx,
                bound: self.cap,
            });
        }
        self.elems_mut()?[idx] = val;
        if idx >= self.len {
            self.len = idx + 1;
        }
        Ok(())
    }

    /// Append element at the end.
    #[inline]
    pub fn push(&mut self, val: T) -> Result<()> {
        if self.len == self.cap {
            return Err(Error::CapacityExceeded {
                len: self.len,
                cap: self.cap,
                add: 1,
            });
        }
        let idx = self.len;
        self.elems_mut()?[idx] = val;
        self.len += 1;
        Ok(())
    }

    /// Append all elements, or none of them if capacity is not enough.
    #[inline]
    pub fn extend_from_slice(&mut self, vals: &[T]) -> Result<()> {
        let add = vals.len();
        if self.len + add > self.cap {
            return Err(Error::CapacityExceeded {
                len: self.len,
                cap: self.cap,
                add,
            });
        }
        let start = self.len;
        self.elems_mut()?[start..start + add].copy_from_slice(vals);
        self.len += add;
        Ok(())
    }

    /// Shorten the view. Mapped bytes are untouched.
    #[inline]
    pub fn truncate(&mut self, len: usize) {
        if len < self.len {
            self.len = len;
        }
    }

    #[inline]
    pub fn clear(&mut self) {
        self.len = 0;
    }

    #[inline]
    pub fn iter(&self) -> slice::Iter<'_, T> {
        self.as_slice().iter()
    }

    /// Write modified elements back to the file.
    #[inline]
    pub fn flush(&self) -> Result<()> {
        self.map.borrow().flush()
    }

    /// Returns the underlying mapping.
    #[inline]
    pub fn into_inner(self) -> M {
        self.map
    }

    #[inline]
    fn elems_mut(&mut self) -> Result<&mut [T]> {
        let n_bytes = self.cap * size_of::<T>();
        let bytes = self.map.borrow_mut().as_bytes_mut()?;
        if n_bytes == 0 {
            return Ok(&mut [][..]);
        }
        Ok(bytemuck::cast_slice_mut(&mut bytes[..n_bytes]))
    }
}

impl<T: Pod> TypedView<T> {
    /// Create a zero-filled file able to hold `cap` elements and
    /// map it as a view with given length.
    #[inline]
    pub fn create<P: AsRef<Path>>(path: P, len: usize, cap: usize) -> Result<Self> {
        let cap = cap.max(len);
        let size = cap
            .checked_mul(elem_size::<T>()?)
            .ok_or_else(|| Error::InvalidArgument(format!("capacity {} too large", cap)))?;
        let map = MmapFile::create(path, size)?;
        Self::new(map, len, cap)
    }

    /// Open an existing file as a view.
    /// Length and capacity not specified in `conf` are inferred from file size.
    #[inline]
    pub fn open<P: AsRef<Path>>(path: P, conf: OpenConf) -> Result<Self> {
        let elem_size = elem_size::<T>()?;
        let map = MmapFile::open(path, conf.is_writable())?;
        let (len, cap) = conf.resolve(map.len(), elem_size);
        Self::new(map, len, cap)
    }

    /// Flush, unmap and close the file.
    #[inline]
    pub fn close(self) -> Result<()> {
        self.map.close()
    }
}

impl<'a, T: Pod, M: BorrowMut<MmapFile>> IntoIterator for &'a TypedView<T, M> {
    type Item = &'a T;
    type IntoIter = slice::Iter<'a, T>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[inline]
fn elem_size<T>() -> Result<usize> {
    match size_of::<T>() {
        0 => Err(Error::InvalidArgument(
            "zero-sized type is not allowed".to_string(),
        )),
        n => Ok(n),
    }
}
