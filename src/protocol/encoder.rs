//! Primitive Codec: Encoder/Decoder di atas buffer yang sudah dialokasikan.
//!
//! Encode dan decode langsung ke/dari byte slice milik caller.
//! Tidak ada alokasi di layer ini: ukuran buffer sudah dihitung
//! sebelumnya lewat [`Encode::size_of`].

use crate::error::{Error, Result};

use super::types::{
    CommandType, EventCreateFlags, ExternalSemaphoreHandleTypeFlags, Handle, ResultCode,
    SemaphoreCreateFlags, SemaphoreType, StructureType,
};

/// Size of the presence marker ("simple pointer") on the wire.
pub const MARKER_SIZE: usize = 8;

/// Marker value for an absent pointer, chain link or structure.
pub const ABSENT: u64 = 0;

/// Marker value for a present pointer.
pub const PRESENT: u64 = 1;

/// Encoder yang menulis ke buffer pinjaman
///
/// Semua operasi encode dilakukan ke slice caller,
/// tidak ada alokasi dinamis.
pub struct Encoder<'a> {
    buffer: &'a mut [u8],
    write_pos: usize,
}

impl<'a> Encoder<'a> {
    #[inline(always)]
    pub fn new(buffer: &'a mut [u8]) -> Self {
        Self {
            buffer,
            write_pos: 0,
        }
    }

    #[inline(always)]
    pub fn put_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        let remaining = self.remaining();
        if bytes.len() > remaining {
            return Err(Error::Overflow {
                needed: bytes.len(),
                remaining,
            });
        }
        self.buffer[self.write_pos..self.write_pos + bytes.len()].copy_from_slice(bytes);
        self.write_pos += bytes.len();
        Ok(())
    }

    #[inline(always)]
    pub fn put_u32(&mut self, v: u32) -> Result<()> {
        self.put_bytes(&v.to_le_bytes())
    }

    #[inline(always)]
    pub fn put_i32(&mut self, v: i32) -> Result<()> {
        self.put_bytes(&v.to_le_bytes())
    }

    #[inline(always)]
    pub fn put_u64(&mut self, v: u64) -> Result<()> {
        self.put_bytes(&v.to_le_bytes())
    }

    /// Tulis marker pointer. Returns `present` supaya caller bisa
    /// langsung lanjut encode isinya.
    #[inline(always)]
    pub fn put_marker(&mut self, present: bool) -> Result<bool> {
        self.put_u64(if present { PRESENT } else { ABSENT })?;
        Ok(present)
    }

    /// Bytes written so far
    #[inline(always)]
    pub fn position(&self) -> usize {
        self.write_pos
    }

    /// Available space in buffer
    #[inline(always)]
    pub fn remaining(&self) -> usize {
        self.buffer.len() - self.write_pos
    }

    #[inline(always)]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer[..self.write_pos]
    }
}

/// Zero-copy decoder
pub struct Decoder<'a> {
    buffer: &'a [u8],
    read_pos: usize,
}

impl<'a> Decoder<'a> {
    #[inline(always)]
    pub fn new(buffer: &'a [u8]) -> Self {
        Self {
            buffer,
            read_pos: 0,
        }
    }

    #[inline(always)]
    pub fn get_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        let remaining = self.remaining();
        if len > remaining {
            return Err(Error::Truncated {
                needed: len,
                remaining,
            });
        }
        let bytes = &self.buffer[self.read_pos..self.read_pos + len];
        self.read_pos += len;
        Ok(bytes)
    }

    #[inline(always)]
    pub fn get_u32(&mut self) -> Result<u32> {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(self.get_bytes(4)?);
        Ok(u32::from_le_bytes(raw))
    }

    #[inline(always)]
    pub fn get_i32(&mut self) -> Result<i32> {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(self.get_bytes(4)?);
        Ok(i32::from_le_bytes(raw))
    }

    #[inline(always)]
    pub fn get_u64(&mut self) -> Result<u64> {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(self.get_bytes(8)?);
        Ok(u64::from_le_bytes(raw))
    }

    /// Baca marker pointer; nilai selain nol berarti present.
    #[inline(always)]
    pub fn get_marker(&mut self) -> Result<bool> {
        Ok(self.get_u64()? != ABSENT)
    }

    #[inline(always)]
    pub fn position(&self) -> usize {
        self.read_pos
    }

    /// Remaining bytes
    #[inline(always)]
    pub fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.read_pos)
    }
}

/// Value that knows its exact wire size and can write itself.
///
/// Invariant: `encode` menulis tepat `size_of()` bytes.
pub trait Encode {
    fn size_of(&self) -> usize;
    fn encode(&self, enc: &mut Encoder<'_>) -> Result<()>;
}

/// Value that can be read back from the wire.
pub trait Decode: Sized {
    fn decode(dec: &mut Decoder<'_>) -> Result<Self>;
}

/// Object-safe decode into an existing destination, used for reply out slots.
pub trait DecodeInto {
    fn decode_into(&mut self, dec: &mut Decoder<'_>) -> Result<()>;
}

impl<T: Decode> DecodeInto for T {
    #[inline(always)]
    fn decode_into(&mut self, dec: &mut Decoder<'_>) -> Result<()> {
        *self = T::decode(dec)?;
        Ok(())
    }
}

/// Destination of an out or in-out argument.
pub trait OutValue: Encode + DecodeInto {}

impl<T: Encode + DecodeInto> OutValue for T {}

macro_rules! impl_scalar {
    ($ty:ty, $put:ident, $get:ident) => {
        impl Encode for $ty {
            #[inline(always)]
            fn size_of(&self) -> usize {
                std::mem::size_of::<$ty>()
            }

            #[inline(always)]
            fn encode(&self, enc: &mut Encoder<'_>) -> Result<()> {
                enc.$put(*self)
            }
        }

        impl Decode for $ty {
            #[inline(always)]
            fn decode(dec: &mut Decoder<'_>) -> Result<Self> {
                dec.$get()
            }
        }
    };
}

impl_scalar!(u32, put_u32, get_u32);
impl_scalar!(i32, put_i32, get_i32);
impl_scalar!(u64, put_u64, get_u64);

// Enum 32-bit: di-encode sebagai i32 mentah.
macro_rules! impl_enum32 {
    ($ty:ty) => {
        impl Encode for $ty {
            #[inline(always)]
            fn size_of(&self) -> usize {
                4
            }

            #[inline(always)]
            fn encode(&self, enc: &mut Encoder<'_>) -> Result<()> {
                enc.put_i32(self.0)
            }
        }

        impl Decode for $ty {
            #[inline(always)]
            fn decode(dec: &mut Decoder<'_>) -> Result<Self> {
                Ok(Self(dec.get_i32()?))
            }
        }
    };
}

impl_enum32!(CommandType);
impl_enum32!(StructureType);
impl_enum32!(SemaphoreType);

// Flag sets: bit yang tidak dikenal tetap dibawa (from_bits_retain).
macro_rules! impl_flags {
    ($ty:ty) => {
        impl Encode for $ty {
            #[inline(always)]
            fn size_of(&self) -> usize {
                4
            }

            #[inline(always)]
            fn encode(&self, enc: &mut Encoder<'_>) -> Result<()> {
                enc.put_u32(self.bits())
            }
        }

        impl Decode for $ty {
            #[inline(always)]
            fn decode(dec: &mut Decoder<'_>) -> Result<Self> {
                Ok(<$ty>::from_bits_retain(dec.get_u32()?))
            }
        }
    };
}

impl_flags!(super::types::CommandFlags);
impl_flags!(EventCreateFlags);
impl_flags!(SemaphoreCreateFlags);
impl_flags!(ExternalSemaphoreHandleTypeFlags);

impl Encode for ResultCode {
    #[inline(always)]
    fn size_of(&self) -> usize {
        4
    }

    #[inline(always)]
    fn encode(&self, enc: &mut Encoder<'_>) -> Result<()> {
        enc.put_i32(self.as_raw())
    }
}

impl Decode for ResultCode {
    #[inline(always)]
    fn decode(dec: &mut Decoder<'_>) -> Result<Self> {
        Ok(Self::from_raw(dec.get_i32()?))
    }
}

impl<K> Encode for Handle<K> {
    #[inline(always)]
    fn size_of(&self) -> usize {
        8
    }

    #[inline(always)]
    fn encode(&self, enc: &mut Encoder<'_>) -> Result<()> {
        enc.put_u64(self.as_raw())
    }
}

impl<K> Decode for Handle<K> {
    #[inline(always)]
    fn decode(dec: &mut Decoder<'_>) -> Result<Self> {
        Ok(Self::from_raw(dec.get_u64()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::types::{CommandFlags, Event};

    fn roundtrip<T: Encode + Decode>(value: &T) -> T {
        let mut buf = vec![0u8; value.size_of()];
        let mut enc = Encoder::new(&mut buf);
        value.encode(&mut enc).unwrap();
        assert_eq!(enc.position(), value.size_of());
        assert_eq!(enc.remaining(), 0);

        let mut dec = Decoder::new(&buf);
        let decoded = T::decode(&mut dec).unwrap();
        assert_eq!(dec.remaining(), 0);
        decoded
    }

    #[test]
    fn test_scalar_roundtrip() {
        assert_eq!(roundtrip(&0xDEAD_BEEFu32), 0xDEAD_BEEF);
        assert_eq!(roundtrip(&-5i32), -5);
        assert_eq!(roundtrip(&u64::MAX), u64::MAX);
        assert_eq!(roundtrip(&ResultCode::Other(77)), ResultCode::Other(77));
        assert_eq!(roundtrip(&Event::from_raw(0x1234)), Event::from_raw(0x1234));
    }

    #[test]
    fn test_flags_keep_unknown_bits() {
        let flags = CommandFlags::from_bits_retain(0x8000_0001);
        let decoded = roundtrip(&flags);
        assert_eq!(decoded.bits(), 0x8000_0001);
        assert!(decoded.contains(CommandFlags::GENERATE_REPLY));
    }

    #[test]
    fn test_little_endian_layout() {
        let mut buf = [0u8; 12];
        let mut enc = Encoder::new(&mut buf);
        enc.put_i32(CommandType::SET_EVENT.0).unwrap();
        enc.put_u64(0x0102_0304_0506_0708).unwrap();
        assert_eq!(buf[..4], [58, 0, 0, 0]);
        assert_eq!(buf[4..], [8, 7, 6, 5, 4, 3, 2, 1]);
    }

    #[test]
    fn test_marker() {
        let mut buf = [0u8; 16];
        let mut enc = Encoder::new(&mut buf);
        assert!(enc.put_marker(true).unwrap());
        assert!(!enc.put_marker(false).unwrap());

        let mut dec = Decoder::new(&buf);
        assert!(dec.get_marker().unwrap());
        assert!(!dec.get_marker().unwrap());
    }

    #[test]
    fn test_overflow_and_truncation() {
        let mut buf = [0u8; 6];
        let mut enc = Encoder::new(&mut buf);
        enc.put_u32(1).unwrap();
        assert!(matches!(
            enc.put_u32(2),
            Err(Error::Overflow {
                needed: 4,
                remaining: 2
            })
        ));

        let mut dec = Decoder::new(&buf[..3]);
        assert!(matches!(
            dec.get_u32(),
            Err(Error::Truncated {
                needed: 4,
                remaining: 3
            })
        ));
    }
}
