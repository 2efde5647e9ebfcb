//! Memory-mapped arrays of fixed-size elements.
//!
//! A file is mapped into memory and exposed either as a typed
//! view over its raw bytes, or as an array of self-encoding
//! records with length and capacity bookkeeping. Files carry no
//! header: element count is always file size divided by element
//! size.
pub mod array;
pub mod conf;
pub mod error;
pub mod mmap;
pub mod record;
pub mod store;
pub mod view;

pub mod prelude {
    pub use crate::array::*;
    pub use crate::conf::*;
    pub use crate::error::*;
    pub use crate::mmap::*;
    pub use crate::record::*;
    pub use crate::store::*;
    pub use crate::view::*;
}
