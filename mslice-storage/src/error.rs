use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    // file and mapping errors
    #[error("can't open {path:?}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("mmap failed on {len} bytes: {source}")]
    Map {
        len: usize,
        #[source]
        source: io::Error,
    },
    #[error("error flushing mmap: {0}")]
    Flush(#[source] io::Error),
    #[error("error unmapping mmap: {0}")]
    Unmap(#[source] io::Error),
    #[error("error closing file: {0}")]
    CloseFile(#[source] io::Error),
    #[error("file holds {have} bytes but {need} bytes are required")]
    SizeMismatch { have: usize, need: usize },
    #[error("IO error: {0}")]
    IOError(#[from] io::Error),
    // access errors
    #[error("append exceeds capacity(len={len}, cap={cap}, add={add})")]
    CapacityExceeded { len: usize, cap: usize, add: usize },
    #[error("index {idx} out of bound {bound}")]
    IndexOutOfBound { idx: usize, bound: usize },
    #[error("offset {offset} with size {size} exceeds mapped size {total}")]
    OffsetOutOfBound {
        offset: usize,
        size: usize,
        total: usize,
    },
    #[error("mapping is read-only")]
    ReadOnly,
    #[error("invalid layout: {0:?}")]
    InvalidLayout(bytemuck::PodCastError),
    // record errors
    #[error("encode failed: {0}")]
    Encode(String),
    #[error("decode failed: {0}")]
    Decode(String),
}

impl Error {
    /// Returns whether the error is caused by appending to a full array.
    #[inline]
    pub fn is_capacity_exceeded(&self) -> bool {
        matches!(self, Error::CapacityExceeded { .. })
    }

    /// Returns whether the error is an index bound violation.
    #[inline]
    pub fn is_out_of_bound(&self) -> bool {
        matches!(
            self,
            Error::IndexOutOfBound { .. } | Error::OffsetOutOfBound { .. }
        )
    }
}

impl From<bytemuck::PodCastError> for Error {
    #[inline]
    fn from(src: bytemuck::PodCastError) -> Self {
        Error::InvalidLayout(src)
    }
}
