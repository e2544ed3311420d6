//! crates/ccs_core/src/ids.rs
//! Map unit identity and digest newtypes.
//! ASCII-only, strict shapes; no I/O.

use core::fmt;
use core::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Deserializer, Serialize};

use crate::errors::CoreError;

const HEX64_LEN: usize = 64;
const TOKEN_MAX_LEN: usize = 64;

/// Lowercase hex (length must be exactly 64).
#[inline]
pub fn is_valid_sha256(s: &str) -> bool {
    s.len() == HEX64_LEN && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/// Map unit token: ^[A-Za-z0-9_.:-]{1,64}$ (ASCII only)
#[inline]
pub fn is_valid_token(s: &str) -> bool {
    let len = s.len();
    if len == 0 || len > TOKEN_MAX_LEN {
        return false;
    }
    s.bytes()
        .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'.' | b':' | b'-'))
}

macro_rules! simple_string_newtype {
    ($(#[$m:meta])* $name:ident) => {
        $(#[$m])*
        #[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
        #[cfg_attr(feature = "serde", derive(Serialize))]
        #[cfg_attr(feature = "serde", serde(transparent))]
        pub struct $name(String);

        impl $name {
            #[inline] pub fn as_str(&self) -> &str { &self.0 }
        }

        impl fmt::Display for $name {
            #[inline]
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
        }

        impl TryFrom<&str> for $name {
            type Error = CoreError;
            #[inline]
            fn try_from(value: &str) -> Result<Self, Self::Error> { value.parse() }
        }
    }
}

simple_string_newtype!(
    /// Map unit token: the atomic accounting key of every table.
    MapUnitId
);
simple_string_newtype!(
    /// Generic 64-hex lowercase SHA-256 digest.
    Sha256
);

impl FromStr for MapUnitId {
    type Err = CoreError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !is_valid_token(s) {
            return Err(CoreError::InvalidId(s.to_owned()));
        }
        Ok(MapUnitId(s.to_owned()))
    }
}

impl From<u64> for MapUnitId {
    /// Integer ids (as stored by the source tables) are always valid tokens.
    fn from(n: u64) -> Self {
        MapUnitId(n.to_string())
    }
}

impl FromStr for Sha256 {
    type Err = CoreError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !is_valid_sha256(s) {
            return Err(CoreError::DomainOutOfRange("sha256"));
        }
        Ok(Sha256(s.to_owned()))
    }
}

impl Sha256 {
    #[inline]
    pub fn as_hex(&self) -> &str {
        &self.0
    }
}

// Map unit ids arrive as strings or non-negative integers.
#[cfg(feature = "serde")]
impl<'de> Deserialize<'de> for MapUnitId {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        use serde::de::{self, Unexpected, Visitor};

        struct IdVisitor;

        impl<'de> Visitor<'de> for IdVisitor {
            type Value = MapUnitId;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("map unit id: token [A-Za-z0-9_.:-] len 1..=64, or a non-negative integer")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<MapUnitId, E> {
                Ok(MapUnitId::from(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<MapUnitId, E> {
                u64::try_from(v)
                    .map(MapUnitId::from)
                    .map_err(|_| E::invalid_value(Unexpected::Signed(v), &self))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<MapUnitId, E> {
                v.parse().map_err(|_| E::invalid_value(Unexpected::Str(v), &self))
            }
        }

        d.deserialize_any(IdVisitor)
    }
}

#[cfg(feature = "serde")]
impl<'de> Deserialize<'de> for Sha256 {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        use serde::de::{Error, Unexpected};
        let s = String::deserialize(d)?;
        s.parse()
            .map_err(|_| D::Error::invalid_value(Unexpected::Str(&s), &"64 lowercase hex chars"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_shapes() {
        assert!(MapUnitId::from_str("MU-001").is_ok());
        assert!(MapUnitId::from_str("12").is_ok());
        assert!(MapUnitId::from_str("").is_err());
        assert!(MapUnitId::from_str("has space").is_err());
        assert!(MapUnitId::from_str(&"x".repeat(65)).is_err());
    }

    #[test]
    fn integer_ids_stringify() {
        assert_eq!(MapUnitId::from(7).as_str(), "7");
    }

    #[test]
    fn sha256_requires_lowercase_64() {
        let ok = "a".repeat(64);
        assert!(Sha256::from_str(&ok).is_ok());
        assert!(Sha256::from_str(&"A".repeat(64)).is_err());
        assert!(Sha256::from_str("abc").is_err());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn deserializes_numbers_and_strings() {
        let a: MapUnitId = serde_json::from_str("3").unwrap();
        let b: MapUnitId = serde_json::from_str("\"3\"").unwrap();
        assert_eq!(a, b);
        assert!(serde_json::from_str::<MapUnitId>("-1").is_err());
    }
}
