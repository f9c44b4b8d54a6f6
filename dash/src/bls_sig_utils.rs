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

//! BLS keys and signatures as they appear on the wire.
//!
//! The wire types are plain byte arrays so that decoding never fails on curve checks.
//! Conversion into `blsful` types happens lazily when a signature is verified.

use std::fmt;

use blsful::inner_types::G2Projective;
use blsful::{AggregateSignature, Bls12381G2Impl, PublicKey, Signature};

use crate::sml::quorum_validation_error::QuorumValidationError;

/// A compressed 48 byte BLS12-381 public key.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "bincode", derive(bincode::Encode, bincode::Decode))]
pub struct BLSPublicKey([u8; 48]);

/// A compressed 96 byte BLS12-381 signature.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "bincode", derive(bincode::Encode, bincode::Decode))]
pub struct BLSSignature([u8; 96]);

impl_array_newtype_encoding!(BLSPublicKey, 48);
impl_array_newtype_encoding!(BLSSignature, 96);

macro_rules! impl_bls_bytes {
    ($name:ident, $len:literal) => {
        impl $name {
            pub const LEN: usize = $len;

            pub const fn from_bytes(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }

            pub const fn to_bytes(&self) -> [u8; $len] {
                self.0
            }

            pub const fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }

            /// True when every byte is zero, the placeholder used by null commitments.
            pub fn is_zeroed(&self) -> bool {
                self.0.iter().all(|b| *b == 0)
            }

            pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
                let mut bytes = [0u8; $len];
                hex::decode_to_slice(s, &mut bytes)?;
                Ok(Self(bytes))
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self([0; $len])
            }
        }

        impl From<[u8; $len]> for $name {
            fn from(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&hex::encode(self.0))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), hex::encode(self.0))
            }
        }
    };
}

impl_bls_bytes!(BLSPublicKey, 48);
impl_bls_bytes!(BLSSignature, 96);

impl BLSPublicKey {
    /// Parses the key, using the legacy (pre basic scheme) point encoding when `legacy` is set.
    pub fn to_blsful(&self, legacy: bool) -> Result<PublicKey<Bls12381G2Impl>, QuorumValidationError> {
        let bytes = if legacy { self.legacy_to_modern() } else { self.0 };
        PublicKey::<Bls12381G2Impl>::try_from(&bytes[..])
            .map_err(|e| QuorumValidationError::InvalidBLSPublicKey(e.to_string()))
    }

    /// Rewrites the flag bits of a legacy encoded key into the compressed encoding.
    ///
    /// Legacy keys carry only the sign of `y` in the top bit. The compressed encoding wants
    /// the compression bit on top, the infinity bit below it and the sign bit third.
    fn legacy_to_modern(&self) -> [u8; 48] {
        let mut bytes = self.0;
        if self.is_zeroed() {
            bytes[0] = 0xc0;
            return bytes;
        }
        let y_sign = bytes[0] & 0x80 != 0;
        bytes[0] = (bytes[0] & 0x1f) | 0x80;
        if y_sign {
            bytes[0] |= 0x20;
        }
        bytes
    }

    /// Sums the public keys of the given operators into one key.
    ///
    /// Returns `None` for an empty iterator.
    pub fn aggregate<'a, I>(
        keys: I,
        legacy: bool,
    ) -> Result<Option<PublicKey<Bls12381G2Impl>>, QuorumValidationError>
    where
        I: IntoIterator<Item = &'a BLSPublicKey>,
    {
        keys.into_iter().try_fold(None, |acc: Option<PublicKey<Bls12381G2Impl>>, key| {
            let key = key.to_blsful(legacy)?;
            Ok(Some(match acc {
                None => key,
                Some(sum) => PublicKey(sum.0 + key.0),
            }))
        })
    }
}

impl TryFrom<BLSPublicKey> for PublicKey<Bls12381G2Impl> {
    type Error = QuorumValidationError;

    fn try_from(value: BLSPublicKey) -> Result<Self, Self::Error> {
        value.to_blsful(false)
    }
}

impl TryFrom<&BLSPublicKey> for PublicKey<Bls12381G2Impl> {
    type Error = QuorumValidationError;

    fn try_from(value: &BLSPublicKey) -> Result<Self, Self::Error> {
        value.to_blsful(false)
    }
}

impl From<&PublicKey<Bls12381G2Impl>> for BLSPublicKey {
    fn from(value: &PublicKey<Bls12381G2Impl>) -> Self {
        BLSPublicKey(value.0.to_compressed())
    }
}

impl BLSSignature {
    fn to_point(self) -> Result<G2Projective, QuorumValidationError> {
        Option::<G2Projective>::from(G2Projective::from_compressed(&self.0)).ok_or_else(|| {
            QuorumValidationError::InvalidBLSSignature(format!("{} is not a valid G2 point", self))
        })
    }
}

impl TryFrom<BLSSignature> for Signature<Bls12381G2Impl> {
    type Error = QuorumValidationError;

    fn try_from(value: BLSSignature) -> Result<Self, Self::Error> {
        Ok(Signature::Basic(value.to_point()?))
    }
}

impl TryFrom<BLSSignature> for AggregateSignature<Bls12381G2Impl> {
    type Error = QuorumValidationError;

    fn try_from(value: BLSSignature) -> Result<Self, Self::Error> {
        Ok(AggregateSignature::Basic(value.to_point()?))
    }
}

impl From<&Signature<Bls12381G2Impl>> for BLSSignature {
    fn from(value: &Signature<Bls12381G2Impl>) -> Self {
        let point = match value {
            Signature::Basic(point)
            | Signature::MessageAugmentation(point)
            | Signature::ProofOfPossession(point) => point,
        };
        BLSSignature(point.to_compressed())
    }
}
