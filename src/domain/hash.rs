//! 256-bit transaction/pubkey references with hex serialization.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A 256-bit transaction id or pubkey fingerprint.
///
/// Two values are special: all-zero means "unset", and the repeated
/// `deadbeef` pattern is the "burned/none" sentinel peers report for a
/// reference that will never exist.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Hash256(pub [u8; 32]);

impl Hash256 {
    pub const ZERO: Hash256 = Hash256([0u8; 32]);

    pub const DEAD: Hash256 = Hash256([
        0xde, 0xad, 0xbe, 0xef, 0xde, 0xad, 0xbe, 0xef, 0xde, 0xad, 0xbe, 0xef, 0xde, 0xad, 0xbe,
        0xef, 0xde, 0xad, 0xbe, 0xef, 0xde, 0xad, 0xbe, 0xef, 0xde, 0xad, 0xbe, 0xef, 0xde, 0xad,
        0xbe, 0xef,
    ]);

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }

    pub fn is_dead(&self) -> bool {
        *self == Self::DEAD
    }

    /// First four bytes interpreted little-endian; feeds the swap fingerprint.
    pub fn first_u32(&self) -> u32 {
        u32::from_le_bytes([self.0[0], self.0[1], self.0[2], self.0[3]])
    }

    /// Most-specific-wins merge of an incoming reference over a stored one.
    ///
    /// An unset incoming value keeps the old one; the burned sentinel only
    /// sticks when nothing real was known; a real incoming value always wins.
    pub fn merge(self, old: Hash256) -> Hash256 {
        if self.is_zero() {
            old
        } else if self.is_dead() {
            if old.is_zero() {
                Hash256::DEAD
            } else {
                old
            }
        } else {
            self
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid 256-bit hex value")]
pub struct ParseHashError;

impl FromStr for Hash256 {
    type Err = ParseHashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|_| ParseHashError)?;
        let bytes: [u8; 32] = bytes.try_into().map_err(|_| ParseHashError)?;
        Ok(Hash256(bytes))
    }
}

impl fmt::Display for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash256({})", hex::encode(self.0))
    }
}

impl Serialize for Hash256 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(self.0))
    }
}

struct Hash256Visitor;

impl Visitor<'_> for Hash256Visitor {
    type Value = Hash256;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "a 64-character hex string")
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<Hash256, E> {
        if value.is_empty() {
            return Ok(Hash256::ZERO);
        }
        value
            .parse()
            .map_err(|_| E::invalid_value(de::Unexpected::Str(value), &self))
    }
}

impl<'de> Deserialize<'de> for Hash256 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_str(Hash256Visitor)
    }
}
