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

//! Internal macros.
//!
//! Macros meant to be used inside the library only.

/// Implements `Encodable` and `Decodable` for a struct by encoding each listed field in order.
macro_rules! impl_consensus_encoding {
    ($thing:ident, $($field:ident),+) => (
        impl $crate::consensus::Encodable for $thing {
            #[inline]
            fn consensus_encode<W: std::io::Write + ?Sized>(
                &self,
                w: &mut W,
            ) -> Result<usize, std::io::Error> {
                let mut len = 0;
                $(len += $crate::consensus::Encodable::consensus_encode(&self.$field, w)?;)+
                Ok(len)
            }
        }

        impl $crate::consensus::Decodable for $thing {
            #[inline]
            fn consensus_decode<R: std::io::Read + ?Sized>(
                r: &mut R,
            ) -> Result<$thing, $crate::consensus::encode::Error> {
                Ok($thing {
                    $($field: $crate::consensus::Decodable::consensus_decode(r)?),+
                })
            }
        }
    );
}

/// Implements the consensus traits for a fixed size byte-array newtype.
macro_rules! impl_array_newtype_encoding {
    ($thing:ident, $len:literal) => {
        impl $crate::consensus::Encodable for $thing {
            #[inline]
            fn consensus_encode<W: std::io::Write + ?Sized>(
                &self,
                w: &mut W,
            ) -> Result<usize, std::io::Error> {
                w.write_all(&self.0)?;
                Ok($len)
            }
        }

        impl $crate::consensus::Decodable for $thing {
            #[inline]
            fn consensus_decode<R: std::io::Read + ?Sized>(
                r: &mut R,
            ) -> Result<$thing, $crate::consensus::encode::Error> {
                let mut bytes = [0u8; $len];
                r.read_exact(&mut bytes)?;
                Ok($thing(bytes))
            }
        }
    };
}

/// Implements the consensus traits for a `hashes` newtype, written in internal byte order.
macro_rules! impl_hashencode {
    ($hashtype:ident) => {
        impl $crate::consensus::Encodable for $hashtype {
            #[inline]
            fn consensus_encode<W: std::io::Write + ?Sized>(
                &self,
                w: &mut W,
            ) -> Result<usize, std::io::Error> {
                $crate::consensus::Encodable::consensus_encode(
                    <$hashtype as $crate::hashes::Hash>::as_byte_array(self),
                    w,
                )
            }
        }

        impl $crate::consensus::Decodable for $hashtype {
            #[inline]
            fn consensus_decode<R: std::io::Read + ?Sized>(
                r: &mut R,
            ) -> Result<$hashtype, $crate::consensus::encode::Error> {
                let bytes: [u8; 32] = $crate::consensus::Decodable::consensus_decode(r)?;
                Ok(<$hashtype as $crate::hashes::Hash>::from_byte_array(bytes))
            }
        }
    };
}

/// Implements the `bincode` traits for a type wrapping a fixed-length byte array
/// through `as_byte_array` and `from_byte_array`.
#[cfg(feature = "bincode")]
macro_rules! impl_hash_bincode {
    ($t:ident, $len:expr) => {
        impl bincode::Encode for $t {
            fn encode<E: bincode::enc::Encoder>(
                &self,
                encoder: &mut E,
            ) -> Result<(), bincode::error::EncodeError> {
                bincode::Encode::encode(<$t as $crate::hashes::Hash>::as_byte_array(self), encoder)
            }
        }

        impl bincode::Decode for $t {
            fn decode<D: bincode::de::Decoder>(
                decoder: &mut D,
            ) -> Result<Self, bincode::error::DecodeError> {
                let bytes: [u8; $len] = bincode::Decode::decode(decoder)?;
                Ok(<$t as $crate::hashes::Hash>::from_byte_array(bytes))
            }
        }

        impl<'de> bincode::BorrowDecode<'de> for $t {
            fn borrow_decode<D: bincode::de::BorrowDecoder<'de>>(
                decoder: &mut D,
            ) -> Result<Self, bincode::error::DecodeError> {
                let bytes: [u8; $len] = bincode::BorrowDecode::borrow_decode(decoder)?;
                Ok(<$t as $crate::hashes::Hash>::from_byte_array(bytes))
            }
        }
    };
}
