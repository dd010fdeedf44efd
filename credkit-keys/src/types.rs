//! Algorithm tags, key specifications and operation options shared by every
//! module of the crate.

use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::{Digest, Sha224, Sha256, Sha384, Sha512};

use crate::error::{KeyError, Result};

/// Smallest RSA modulus accepted by the generator
pub const RSA_MIN_BITS: usize = 1024;
/// Largest RSA modulus accepted by the generator
pub const RSA_MAX_BITS: usize = 16384;

/// Key algorithm family, the tag callers pass to the codec
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KeyType {
    Rsa,
    #[serde(alias = "ec")]
    EllipticCurve,
}

impl KeyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyType::Rsa => "RSA",
            KeyType::EllipticCurve => "EC",
        }
    }
}

/// Named NIST prime curves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Curve {
    P192,
    P256,
    P384,
    P521,
}

impl Curve {
    pub const ALL: [Curve; 4] = [Curve::P192, Curve::P256, Curve::P384, Curve::P521];

    pub fn from_bits(bits: usize) -> Option<Self> {
        match bits {
            192 => Some(Curve::P192),
            256 => Some(Curve::P256),
            384 => Some(Curve::P384),
            521 => Some(Curve::P521),
            _ => None,
        }
    }

    pub fn bits(&self) -> usize {
        match self {
            Curve::P192 => 192,
            Curve::P256 => 256,
            Curve::P384 => 384,
            Curve::P521 => 521,
        }
    }

    /// Size in bytes of a field element / scalar
    pub fn field_size(&self) -> usize {
        self.bits().div_ceil(8)
    }

    /// Length of an uncompressed SEC1 point
    pub fn uncompressed_point_len(&self) -> usize {
        1 + 2 * self.field_size()
    }

    pub(crate) fn from_uncompressed_point_len(len: usize) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|curve| curve.uncompressed_point_len() == len)
    }

    pub(crate) fn from_field_size(len: usize) -> Option<Self> {
        Self::ALL.into_iter().find(|curve| curve.field_size() == len)
    }
}

/// A validated algorithm together with its size.
///
/// Every operation boundary matches on this exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeySpec {
    Rsa { bits: usize },
    EllipticCurve(Curve),
}

impl KeySpec {
    /// Validate `bits` against the domain of `key_type`.
    pub fn new(key_type: KeyType, bits: usize) -> Result<Self> {
        match key_type {
            KeyType::Rsa => {
                if !(RSA_MIN_BITS..=RSA_MAX_BITS).contains(&bits) || bits % 8 != 0 {
                    return Err(KeyError::InvalidConfiguration(format!(
                        "RSA key size {bits} must be a multiple of 8 in {RSA_MIN_BITS}..={RSA_MAX_BITS}"
                    )));
                }
                Ok(KeySpec::Rsa { bits })
            }
            KeyType::EllipticCurve => Curve::from_bits(bits)
                .map(KeySpec::EllipticCurve)
                .ok_or_else(|| {
                    KeyError::InvalidConfiguration(format!(
                        "EC key size {bits} is not one of 192, 256, 384, 521"
                    ))
                }),
        }
    }

    pub fn key_type(&self) -> KeyType {
        match self {
            KeySpec::Rsa { .. } => KeyType::Rsa,
            KeySpec::EllipticCurve(_) => KeyType::EllipticCurve,
        }
    }

    pub fn bits(&self) -> usize {
        match self {
            KeySpec::Rsa { bits } => *bits,
            KeySpec::EllipticCurve(curve) => curve.bits(),
        }
    }
}

impl std::fmt::Display for KeySpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.key_type().as_str(), self.bits())
    }
}

/// Visibility of one half of a key pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyClass {
    Public,
    Private,
}

/// Hash applied to a message before signing or verification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DigestAlgorithm {
    Sha1,
    Sha224,
    Sha256,
    Sha384,
    Sha512,
}

impl DigestAlgorithm {
    pub const ALL: [DigestAlgorithm; 5] = [
        DigestAlgorithm::Sha1,
        DigestAlgorithm::Sha224,
        DigestAlgorithm::Sha256,
        DigestAlgorithm::Sha384,
        DigestAlgorithm::Sha512,
    ];

    pub fn output_len(&self) -> usize {
        match self {
            DigestAlgorithm::Sha1 => 20,
            DigestAlgorithm::Sha224 => 28,
            DigestAlgorithm::Sha256 => 32,
            DigestAlgorithm::Sha384 => 48,
            DigestAlgorithm::Sha512 => 64,
        }
    }

    pub fn digest(&self, data: &[u8]) -> Vec<u8> {
        match self {
            DigestAlgorithm::Sha1 => Sha1::digest(data).to_vec(),
            DigestAlgorithm::Sha224 => Sha224::digest(data).to_vec(),
            DigestAlgorithm::Sha256 => Sha256::digest(data).to_vec(),
            DigestAlgorithm::Sha384 => Sha384::digest(data).to_vec(),
            DigestAlgorithm::Sha512 => Sha512::digest(data).to_vec(),
        }
    }
}

/// RSA encryption padding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Padding {
    /// PKCS #1 v1.5
    Pkcs1,
    /// OAEP with SHA-1 and MGF1-SHA-1
    Oaep,
    /// OAEP with SHA-256 and MGF1-SHA-256
    OaepSha256,
}

impl Padding {
    /// Bytes of the modulus consumed by the padding
    pub fn overhead(&self) -> usize {
        match self {
            Padding::Pkcs1 => 11,
            Padding::Oaep => 2 * 20 + 2,
            Padding::OaepSha256 => 2 * 32 + 2,
        }
    }

    /// Maximum plaintext for a modulus of `modulus_len` bytes
    pub fn max_plaintext_len(&self, modulus_len: usize) -> usize {
        modulus_len.saturating_sub(self.overhead())
    }
}

/// When a stored credential may be accessed. Passed through to the store
/// untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Accessibility {
    #[default]
    WhenUnlocked,
    AfterFirstUnlock,
    WhenUnlockedThisDeviceOnly,
    AfterFirstUnlockThisDeviceOnly,
    WhenPasscodeSetThisDeviceOnly,
    Always,
}
