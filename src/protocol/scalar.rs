//! Fixed-width values that can be appended to and read from a packet.
//!
//! Values travel in host byte order, like the header fields. Peers on a
//! different architecture must agree on endianness out of band.

use super::RequestType;

/// A fixed-width value with a host-order byte encoding.
pub trait Scalar: Copy {
    /// Encoded width in bytes.
    const WIDTH: usize;

    /// Write the value into `out`, which is exactly `WIDTH` bytes long.
    fn write_to(self, out: &mut [u8]);

    /// Read a value from `bytes`, which is exactly `WIDTH` bytes long.
    fn read_from(bytes: &[u8]) -> Self;

    /// Value returned by forgiving reads that run past the buffer.
    fn zero() -> Self;
}

macro_rules! impl_scalar_int {
    ($($t:ty),* $(,)?) => {
        $(
            impl Scalar for $t {
                const WIDTH: usize = std::mem::size_of::<$t>();

                #[inline]
                fn write_to(self, out: &mut [u8]) {
                    out.copy_from_slice(&self.to_ne_bytes());
                }

                #[inline]
                fn read_from(bytes: &[u8]) -> Self {
                    let mut raw = [0u8; std::mem::size_of::<$t>()];
                    raw.copy_from_slice(bytes);
                    <$t>::from_ne_bytes(raw)
                }

                #[inline]
                fn zero() -> Self {
                    0
                }
            }
        )*
    };
}

impl_scalar_int!(u8, i8, u16, i16, u32, i32, u64, i64, u128, i128);

impl Scalar for bool {
    const WIDTH: usize = 1;

    #[inline]
    fn write_to(self, out: &mut [u8]) {
        out[0] = self as u8;
    }

    #[inline]
    fn read_from(bytes: &[u8]) -> Self {
        bytes[0] != 0
    }

    #[inline]
    fn zero() -> Self {
        false
    }
}

impl Scalar for RequestType {
    const WIDTH: usize = 1;

    #[inline]
    fn write_to(self, out: &mut [u8]) {
        out[0] = self.0;
    }

    #[inline]
    fn read_from(bytes: &[u8]) -> Self {
        RequestType(bytes[0])
    }

    #[inline]
    fn zero() -> Self {
        RequestType::NULL
    }
}
