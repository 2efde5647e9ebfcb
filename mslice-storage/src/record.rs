use crate::error::{Error, Result};

/// Record is a value with fixed serialized size.
///
/// `SIZE` is the exact number of bytes consumed by both `encode()`
/// and `decode()`. Stores always pass a buffer of exactly `SIZE`
/// bytes, and byte order is decided by the implementation.
pub trait Record {
    const SIZE: usize;

    /// Serialize self into the buffer.
    fn encode(&self, buf: &mut [u8]) -> Result<()>;

    /// Deserialize self from the buffer.
    fn decode(&mut self, buf: &[u8]) -> Result<()>;
}

/// Returns serialized size of given record type.
#[inline]
pub const fn record_size<R: Record>() -> usize {
    R::SIZE
}

/// Check that the buffer length matches the declared record size.
#[inline]
pub fn check_encode_len(buf: &[u8], size: usize) -> Result<()> {
    if buf.len() != size {
        return Err(Error::Encode(format!(
            "buffer has {} bytes, record size is {}",
            buf.len(),
            size
        )));
    }
    Ok(())
}

#[inline]
pub fn check_decode_len(buf: &[u8], size: usize) -> Result<()> {
    if buf.len() != size {
        return Err(Error::Decode(format!(
            "buffer has {} bytes, record size is {}",
            buf.len(),
            size
        )));
    }
    Ok(())
}

macro_rules! impl_num {
    ($ty:ty) => {
        impl Record for $ty {
            const SIZE: usize = std::mem::size_of::<$ty>();

            #[inline]
            fn encode(&self, buf: &mut [u8]) -> Result<()> {
                check_encode_len(buf, Self::SIZE)?;
                buf.copy_from_slice(&self.to_le_bytes());
                Ok(())
            }

            #[inline]
            fn decode(&mut self, buf: &[u8]) -> Result<()> {
                check_decode_len(buf, Self::SIZE)?;
                // length is checked above.
                *self = <$ty>::from_le_bytes(buf.try_into().map_err(|_| {
                    Error::Decode(format!("invalid bytes for {}", stringify!($ty)))
                })?);
                Ok(())
            }
        }
    };
}

impl_num!(u8);
impl_num!(i8);
impl_num!(u16);
impl_num!(i16);
impl_num!(u32);
impl_num!(i32);
impl_num!(u64);
impl_num!(i64);
impl_num!(u128);
impl_num!(i128);
impl_num!(f32);
impl_num!(f64);

impl<const N: usize> Record for [u8; N] {
    const SIZE: usize = N;

    #[inline]
    fn encode(&self, buf: &mut [u8]) -> Result<()> {
        check_encode_len(buf, N)?;
        buf.copy_from_slice(self);
        Ok(())
    }

    #[inline]
    fn decode(&mut self, buf: &[u8]) -> Result<()> {
        check_decode_len(buf, N)?;
        self.copy_from_slice(buf);
        Ok(())
    }
}
