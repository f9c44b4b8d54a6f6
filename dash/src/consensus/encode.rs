// Rust Dash Library
// Written for Dash in 2022 by
//     The Dash Core Developers
//
// To the extent possible under law, the author(s) have dedicated all
// copyright and related and neighboring rights to this software to
// the public domain worldwide. This software is distributed without
// any warranty.
//
// You should have received a copy of the CC0 Public Domain Dedication
// along with this software.
// If not, see <http://creativecommons.org/publicdomain/zero/1.0/>.
//

//! Dash consensus-encodable types.
//!
//! Integers are little-endian, collections are prefixed with a compact size
//! ("VarInt") and bitsets are packed least-significant-bit first.

use std::io::{self, Cursor, Read, Write};

use thiserror::Error;

/// Maximum size, in bytes, of a vector we are allowed to decode.
pub const MAX_VEC_SIZE: usize = 4_000_000;

/// Encoding error.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// An I/O error, usually a truncated payload.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// Tried to allocate an oversized vector.
    #[error("allocation of oversized vector: requested {requested}, maximum {max}")]
    OversizedVectorAllocation {
        /// The capacity requested.
        requested: usize,
        /// The maximum capacity.
        max: usize,
    },
    /// VarInt was encoded in a non-minimal way.
    #[error("non-minimal varint")]
    NonMinimalVarInt,
    /// A field held a value outside of its domain.
    #[error("invalid value {value} for {name}")]
    InvalidEnumValue {
        /// Name of the field.
        name: &'static str,
        /// The value read.
        value: i64,
    },
    /// Parsing error.
    #[error("parse failed: {0}")]
    ParseFailed(&'static str),
}

/// Encodes an object into a vector.
pub fn serialize<T: Encodable + ?Sized>(data: &T) -> Vec<u8> {
    let mut encoder = Vec::new();
    // writes into a Vec<u8> are infallible
    let _ = data.consensus_encode(&mut encoder);
    encoder
}

/// Encodes an object into a hex-encoded string.
pub fn serialize_hex<T: Encodable + ?Sized>(data: &T) -> String {
    hex::encode(serialize(data))
}

/// Deserializes an object from a vector, will error if said deserialization
/// doesn't consume the entire vector.
pub fn deserialize<T: Decodable>(data: &[u8]) -> Result<T, Error> {
    let (rv, consumed) = deserialize_partial(data)?;

    if consumed == data.len() {
        Ok(rv)
    } else {
        Err(Error::ParseFailed("data not consumed entirely when explicitly deserializing"))
    }
}

/// Deserializes an object from a vector, but will not report an error if said deserialization
/// doesn't consume the entire vector.
pub fn deserialize_partial<T: Decodable>(data: &[u8]) -> Result<(T, usize), Error> {
    let mut decoder = Cursor::new(data);
    let rv = Decodable::consensus_decode(&mut decoder)?;
    let consumed = decoder.position() as usize;

    Ok((rv, consumed))
}

/// Data which can be encoded in a consensus-consistent way.
pub trait Encodable {
    /// Encodes an object with a well-defined format.
    ///
    /// Returns the number of bytes written on success.
    fn consensus_encode<W: Write + ?Sized>(&self, writer: &mut W) -> Result<usize, io::Error>;
}

/// Data which can be decoded in a consensus-consistent way.
pub trait Decodable: Sized {
    /// Decodes an object with a well-defined format.
    fn consensus_decode<R: Read + ?Sized>(reader: &mut R) -> Result<Self, Error>;
}

/// A variable-length unsigned integer.
#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Debug)]
pub struct VarInt(pub u64);

impl VarInt {
    /// Gets the length of this VarInt when encoded.
    ///
    /// Returns 1 for 0..=0xFC, 3 for 0xFD..=(2^16-1), 5 for 0x10000..=(2^32-1),
    /// and 9 otherwise.
    #[inline]
    pub const fn len(&self) -> usize {
        match self.0 {
            0..=0xFC => 1,
            0xFD..=0xFFFF => 3,
            0x10000..=0xFFFFFFFF => 5,
            _ => 9,
        }
    }

    /// A VarInt is never empty, it always encodes at least one byte.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        false
    }
}

impl Encodable for VarInt {
    #[inline]
    fn consensus_encode<W: Write + ?Sized>(&self, w: &mut W) -> Result<usize, io::Error> {
        match self.0 {
            0..=0xFC => {
                (self.0 as u8).consensus_encode(w)?;
                Ok(1)
            }
            0xFD..=0xFFFF => {
                w.write_all(&[0xFD])?;
                (self.0 as u16).consensus_encode(w)?;
                Ok(3)
            }
            0x10000..=0xFFFFFFFF => {
                w.write_all(&[0xFE])?;
                (self.0 as u32).consensus_encode(w)?;
                Ok(5)
            }
            _ => {
                w.write_all(&[0xFF])?;
                self.0.consensus_encode(w)?;
                Ok(9)
            }
        }
    }
}

impl Decodable for VarInt {
    #[inline]
    fn consensus_decode<R: Read + ?Sized>(r: &mut R) -> Result<Self, Error> {
        let n = u8::consensus_decode(r)?;
        match n {
            0xFF => {
                let x = u64::consensus_decode(r)?;
                if x < 0x100000000 { Err(Error::NonMinimalVarInt) } else { Ok(VarInt(x)) }
            }
            0xFE => {
                let x = u32::consensus_decode(r)?;
                if x < 0x10000 { Err(Error::NonMinimalVarInt) } else { Ok(VarInt(x as u64)) }
            }
            0xFD => {
                let x = u16::consensus_decode(r)?;
                if x < 0xFD { Err(Error::NonMinimalVarInt) } else { Ok(VarInt(x as u64)) }
            }
            n => Ok(VarInt(n as u64)),
        }
    }
}

macro_rules! impl_int_encodable {
    ($ty:ident, $size:literal) => {
        impl Encodable for $ty {
            #[inline]
            fn consensus_encode<W: Write + ?Sized>(&self, w: &mut W) -> Result<usize, io::Error> {
                w.write_all(&self.to_le_bytes())?;
                Ok($size)
            }
        }

        impl Decodable for $ty {
            #[inline]
            fn consensus_decode<R: Read + ?Sized>(r: &mut R) -> Result<Self, Error> {
                let mut buf = [0u8; $size];
                r.read_exact(&mut buf)?;
                Ok($ty::from_le_bytes(buf))
            }
        }
    };
}

impl_int_encodable!(u8, 1);
impl_int_encodable!(u16, 2);
impl_int_encodable!(u32, 4);
impl_int_encodable!(u64, 8);
impl_int_encodable!(i8, 1);
impl_int_encodable!(i16, 2);
impl_int_encodable!(i32, 4);
impl_int_encodable!(i64, 8);

impl Encodable for bool {
    #[inline]
    fn consensus_encode<W: Write + ?Sized>(&self, w: &mut W) -> Result<usize, io::Error> {
        (*self as u8).consensus_encode(w)
    }
}

impl Decodable for bool {
    #[inline]
    fn consensus_decode<R: Read + ?Sized>(r: &mut R) -> Result<bool, Error> {
        u8::consensus_decode(r).map(|n| n != 0)
    }
}

impl<const N: usize> Encodable for [u8; N] {
    #[inline]
    fn consensus_encode<W: Write + ?Sized>(&self, w: &mut W) -> Result<usize, io::Error> {
        w.write_all(&self[..])?;
        Ok(N)
    }
}

impl<const N: usize> Decodable for [u8; N] {
    #[inline]
    fn consensus_decode<R: Read + ?Sized>(r: &mut R) -> Result<Self, Error> {
        let mut ret = [0u8; N];
        r.read_exact(&mut ret)?;
        Ok(ret)
    }
}

impl<T: Encodable> Encodable for Vec<T> {
    #[inline]
    fn consensus_encode<W: Write + ?Sized>(&self, w: &mut W) -> Result<usize, io::Error> {
        let mut len = VarInt(self.len() as u64).consensus_encode(w)?;
        for item in self.iter() {
            len += item.consensus_encode(w)?;
        }
        Ok(len)
    }
}

impl<T: Decodable> Decodable for Vec<T> {
    #[inline]
    fn consensus_decode<R: Read + ?Sized>(r: &mut R) -> Result<Self, Error> {
        let len = VarInt::consensus_decode(r)?.0 as usize;
        if len > MAX_VEC_SIZE {
            return Err(Error::OversizedVectorAllocation { requested: len, max: MAX_VEC_SIZE });
        }
        let mut ret = Vec::with_capacity(len.min(1024));
        for _ in 0..len {
            ret.push(Decodable::consensus_decode(r)?);
        }
        Ok(ret)
    }
}

/// Reads a compact size that must fit in a `u32`.
pub fn read_compact_size<R: Read + ?Sized>(r: &mut R) -> Result<u32, Error> {
    let value = VarInt::consensus_decode(r)?.0;
    u32::try_from(value).map_err(|_| Error::ParseFailed("compact size exceeds u32::MAX"))
}

/// Writes `value` as a compact size.
pub fn write_compact_size<W: Write + ?Sized>(w: &mut W, value: u32) -> Result<usize, io::Error> {
    VarInt(value as u64).consensus_encode(w)
}

/// Encoded length of `value` as a compact size.
pub fn compact_size_len(value: u32) -> usize {
    VarInt(value as u64).len()
}

/// Reads `size` bits packed LSB-first into `(size + 7) / 8` bytes.
///
/// Bits past `size` in the last byte must be zero, as Dash Core rejects such payloads.
pub fn read_fixed_bitset<R: Read + ?Sized>(r: &mut R, size: usize) -> Result<Vec<bool>, Error> {
    if size > MAX_VEC_SIZE * 8 {
        return Err(Error::OversizedVectorAllocation { requested: size, max: MAX_VEC_SIZE * 8 });
    }
    let mut bytes = vec![0u8; size.div_ceil(8)];
    r.read_exact(&mut bytes)?;

    let bits = (0..size).map(|p| (bytes[p / 8] >> (p % 8)) & 1 != 0).collect();
    if size % 8 != 0 {
        let last = bytes[bytes.len() - 1];
        if last >> (size % 8) != 0 {
            return Err(Error::ParseFailed("out-of-range bits set in fixed bitset"));
        }
    }
    Ok(bits)
}

/// Writes `bits` packed LSB-first, padding the final byte with zeros.
pub fn write_fixed_bitset<W: Write + ?Sized>(w: &mut W, bits: &[bool]) -> Result<usize, io::Error> {
    let mut bytes = vec![0u8; bits.len().div_ceil(8)];
    for (p, bit) in bits.iter().enumerate() {
        if *bit {
            bytes[p / 8] |= 1 << (p % 8);
        }
    }
    w.write_all(&bytes)?;
    Ok(bytes.len())
}

/// Reads a compact size followed by a packed bitset of that many bits.
pub fn read_dynamic_bitset<R: Read + ?Sized>(r: &mut R) -> Result<Vec<bool>, Error> {
    let size = read_compact_size(r)?;
    read_fixed_bitset(r, size as usize)
}

/// Writes a compact size bit count followed by the packed bitset.
pub fn write_dynamic_bitset<W: Write + ?Sized>(w: &mut W, bits: &[bool]) -> Result<usize, io::Error> {
    let mut len = write_compact_size(w, bits.len() as u32)?;
    len += write_fixed_bitset(w, bits)?;
    Ok(len)
}

/// Encoded length of a dynamic bitset of `size` bits.
pub fn dynamic_bitset_len(size: usize) -> usize {
    compact_size_len(size as u32) + size.div_ceil(8)
}
