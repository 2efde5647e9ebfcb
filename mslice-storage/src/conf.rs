use log::warn;

/// OpenConf controls how an existing file is opened as a
/// typed view or an array file.
///
/// By default the file is opened read-only, and both length
/// and capacity are inferred from the file size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpenConf {
    writable: bool,
    length: Option<usize>,
    capacity: Option<usize>,
}

impl OpenConf {
    #[inline]
    pub fn writable(mut self, writable: bool) -> Self {
        self.writable = writable;
        self
    }

    #[inline]
    pub fn length(mut self, length: usize) -> Self {
        self.length = Some(length);
        self
    }

    #[inline]
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }

    #[inline]
    pub fn is_writable(&self) -> bool {
        self.writable
    }

    /// Resolve length and capacity against a file of `file_size` bytes
    /// holding elements of `elem_size` bytes.
    ///
    /// Missing capacity is the number of whole elements in the file.
    /// Missing length equals capacity when capacity is inferred, and
    /// zero otherwise. Capacity never falls below length.
    /// Returns `(length, capacity)`.
    #[inline]
    pub fn resolve(&self, file_size: usize, elem_size: usize) -> (usize, usize) {
        debug_assert!(elem_size > 0);
        let (mut cap, len) = match (self.capacity, self.length) {
            (Some(cap), len) => (cap, len.unwrap_or(0)),
            (None, len) => {
                if file_size % elem_size != 0 {
                    warn!(
                        "file size {} is not a multiple of element size {}, trailing {} bytes ignored",
                        file_size,
                        elem_size,
                        file_size % elem_size
                    );
                }
                let cap = file_size / elem_size;
                (cap, len.unwrap_or(cap))
            }
        };
        if len > cap {
            warn!("adjusting cap {} to match len {}", cap, len);
            cap = len;
        }
        (len, cap)
    }
}
