//! Little-endian, bounds-checked reading and writing of primitive values.
//!
//! CIL bytecode stores every multi-byte operand in little-endian order (ECMA-335 §III.1.2), so
//! this module only provides the little-endian direction. All functions return
//! [`crate::Error::OutOfBounds`] instead of panicking when the buffer is too short.
//!
//! # Key Components
//!
//! - [`crate::file::io::CilIO`] - Trait for primitive types that can be read from / written to bytes
//! - [`crate::file::io::read_le`] - Read values from buffer start
//! - [`crate::file::io::read_le_at`] - Read values at an offset, advancing the offset
//! - [`crate::file::io::write_le_at`] - Write values at an offset, advancing the offset
//!
//! # Examples
//!
//! ```rust,ignore
//! use cilflow::file::io::{read_le_at, write_le_at};
//!
//! let mut data = [0u8; 6];
//! let mut offset = 0;
//! write_le_at(&mut data, &mut offset, 0x0102_u16)?;
//! write_le_at(&mut data, &mut offset, -2_i32)?;
//!
//! offset = 0;
//! assert_eq!(read_le_at::<u16>(&data, &mut offset)?, 0x0102);
//! assert_eq!(read_le_at::<i32>(&data, &mut offset)?, -2);
//! # Ok::<(), cilflow::Error>(())
//! ```

use crate::{Error::OutOfBounds, Result};

/// Trait for primitive types that can be decoded from and encoded to little-endian bytes.
///
/// Each implementation defines a `Bytes` associated type, the fixed-size array matching the
/// size of the primitive, which lets [`read_le_at`] convert a slice without allocation.
pub trait CilIO: Sized {
    /// Fixed-size byte array holding the encoded value
    type Bytes: Sized + for<'a> TryFrom<&'a [u8]> + AsRef<[u8]>;

    /// Decode a value from its little-endian representation
    fn from_le_bytes(bytes: Self::Bytes) -> Self;

    /// Encode a value into its little-endian representation
    fn to_le_bytes(self) -> Self::Bytes;
}

macro_rules! impl_cil_io {
    ($($ty:ty),* $(,)?) => {
        $(
            impl CilIO for $ty {
                type Bytes = [u8; std::mem::size_of::<$ty>()];

                fn from_le_bytes(bytes: Self::Bytes) -> Self {
                    <$ty>::from_le_bytes(bytes)
                }

                fn to_le_bytes(self) -> Self::Bytes {
                    <$ty>::to_le_bytes(self)
                }
            }
        )*
    };
}

impl_cil_io!(u8, i8, u16, i16, u32, i32, u64, i64, f32, f64);

/// Safely reads a value of type `T` in little-endian byte order from the start of `data`.
///
/// # Errors
///
/// Returns [`crate::Error::OutOfBounds`] if there are insufficient bytes.
pub fn read_le<T: CilIO>(data: &[u8]) -> Result<T> {
    let mut offset = 0_usize;
    read_le_at(data, &mut offset)
}

/// Safely reads a value of type `T` in little-endian byte order at `offset`, advancing the
/// offset by the size of `T`.
///
/// # Arguments
///
/// * `data` - The byte buffer to read from
/// * `offset` - Mutable reference to the offset position (advanced on success only)
///
/// # Errors
///
/// Returns [`crate::Error::OutOfBounds`] if there are insufficient bytes.
pub fn read_le_at<T: CilIO>(data: &[u8], offset: &mut usize) -> Result<T> {
    let type_len = std::mem::size_of::<T>();
    let end = offset.checked_add(type_len).ok_or(OutOfBounds)?;
    if end > data.len() {
        return Err(OutOfBounds);
    }

    let Ok(read) = data[*offset..end].try_into() else {
        return Err(OutOfBounds);
    };

    *offset = end;

    Ok(T::from_le_bytes(read))
}

/// Safely writes `value` in little-endian byte order at `offset`, advancing the offset by the
/// size of `T`.
///
/// # Errors
///
/// Returns [`crate::Error::OutOfBounds`] if the buffer cannot hold the value at `offset`.
pub fn write_le_at<T: CilIO>(data: &mut [u8], offset: &mut usize, value: T) -> Result<()> {
    let type_len = std::mem::size_of::<T>();
    let end = offset.checked_add(type_len).ok_or(OutOfBounds)?;
    if end > data.len() {
        return Err(OutOfBounds);
    }

    data[*offset..end].copy_from_slice(value.to_le_bytes().as_ref());
    *offset = end;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    const TEST_BUFFER: [u8; 8] = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08];

    #[test]
    fn read_le_u16() {
        let result = read_le::<u16>(&TEST_BUFFER).unwrap();
        assert_eq!(result, 0x0201);
    }

    #[test]
    fn read_le_i32() {
        let result = read_le::<i32>(&TEST_BUFFER).unwrap();
        assert_eq!(result, 0x0403_0201);
    }

    #[test]
    fn read_le_advances_offset() {
        let mut offset = 2;
        let result = read_le_at::<u32>(&TEST_BUFFER, &mut offset).unwrap();
        assert_eq!(result, 0x0605_0403);
        assert_eq!(offset, 6);
    }

    #[test]
    fn read_le_out_of_bounds_keeps_offset() {
        let mut offset = 6;
        let result = read_le_at::<u32>(&TEST_BUFFER, &mut offset);
        assert!(matches!(result, Err(Error::OutOfBounds)));
        assert_eq!(offset, 6);
    }

    #[test]
    fn write_le_then_patch() {
        let mut data = [0u8; 5];
        let mut offset = 1;
        write_le_at(&mut data, &mut offset, -3_i32).unwrap();
        assert_eq!(data, [0x00, 0xFD, 0xFF, 0xFF, 0xFF]);
        assert_eq!(offset, 5);

        let mut offset = 2;
        assert!(matches!(
            write_le_at(&mut data, &mut offset, 1_u32),
            Err(Error::OutOfBounds)
        ));
    }
}
