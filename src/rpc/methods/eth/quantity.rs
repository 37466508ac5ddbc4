// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Hexadecimal quantities and block tags as they appear on the wire, and their conversion into
//! chain heights.

use std::borrow::Cow;

use num_bigint::BigInt;
use num_traits::{Num as _, Zero as _};
use serde::{Deserialize, Serialize};

use super::errors::EthError;
use crate::shim::clock::ChainEpoch;

pub const LATEST: &str = "latest";
pub const EARLIEST: &str = "earliest";
pub const PENDING: &str = "pending";

/// A `0x`-prefixed hex string. Empty and bare `0x` both stand for zero.
#[derive(
    Clone,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    derive_more::From,
    derive_more::Display,
)]
#[serde(transparent)]
pub struct HexString(pub String);

impl From<&str> for HexString {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl HexString {
    fn digits(&self) -> Result<Option<&str>, EthError> {
        match self.0.as_str() {
            "" | "0x" => Ok(None),
            s => s
                .strip_prefix("0x")
                // quantities are unsigned, `from_str_radix` would accept a sign
                .filter(|digits| digits.bytes().all(|b| b.is_ascii_hexdigit()))
                .map(Some)
                .ok_or_else(|| EthError::MalformedQuantity(self.0.clone())),
        }
    }

    pub fn to_int(&self) -> Result<i64, EthError> {
        match self.digits()? {
            None => Ok(0),
            Some(digits) => i64::from_str_radix(digits, 16)
                .map_err(|_| EthError::MalformedQuantity(self.0.clone())),
        }
    }

    pub fn to_big_int(&self) -> Result<BigInt, EthError> {
        match self.digits()? {
            None => Ok(BigInt::zero()),
            Some(digits) => BigInt::from_str_radix(digits, 16)
                .map_err(|_| EthError::MalformedQuantity(self.0.clone())),
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, EthError> {
        match self.digits()? {
            None => Ok(vec![]),
            Some(digits) => {
                hex::decode(digits).map_err(|_| EthError::MalformedQuantity(self.0.clone()))
            }
        }
    }
}

/// Renders `n` as lowercase hex without zero padding, e.g. `0x0`, `0x3e8`.
pub fn format_quantity(n: i64) -> String {
    if n < 0 {
        format!("-{:#x}", n.unsigned_abs())
    } else {
        format!("{n:#x}")
    }
}

pub fn format_bytes(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Resolves a block tag or quantity against the current head height.
///
/// Explicit heights above the head are clamped to it; the result is never negative.
pub fn resolve_height(tag: &str, current: ChainEpoch) -> Result<ChainEpoch, EthError> {
    match tag {
        "" | LATEST | PENDING => Ok(current),
        EARLIEST => Ok(0),
        other => {
            let height = HexString::from(other).to_int()?;
            Ok(height.min(current).max(0))
        }
    }
}

/// A loosely typed quantity: a JSON number, a hex string or a block tag.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Quantity {
    Int(i64),
    Float(f64),
    Text(String),
}

impl Default for Quantity {
    fn default() -> Self {
        Self::Text(LATEST.into())
    }
}

impl From<i64> for Quantity {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<&str> for Quantity {
    fn from(s: &str) -> Self {
        Self::Text(s.into())
    }
}

impl Quantity {
    fn as_text(&self) -> Cow<'_, str> {
        match self {
            Self::Int(n) => Cow::Owned(n.to_string()),
            Self::Float(f) => Cow::Owned(f.to_string()),
            Self::Text(s) => Cow::Borrowed(s),
        }
    }

    pub fn to_int(&self) -> Result<i64, EthError> {
        match self {
            Self::Int(n) if *n >= 0 => Ok(*n),
            Self::Float(f) if f.is_finite() && *f >= 0.0 && f.fract() == 0.0 => Ok(*f as i64),
            Self::Text(s) => HexString::from(s.as_str()).to_int(),
            _ => Err(EthError::MalformedQuantity(self.as_text().into_owned())),
        }
    }

    pub fn resolve_height(&self, current: ChainEpoch) -> Result<ChainEpoch, EthError> {
        match self {
            Self::Text(s) => resolve_height(s, current),
            _ => Ok(self.to_int()?.min(current)),
        }
    }

    /// `true` for tags that follow the head rather than pinning a height.
    pub fn is_head(&self) -> bool {
        matches!(self, Self::Text(s) if matches!(s.as_str(), "" | LATEST | PENDING))
    }
}

/// Usage: `#[serde(with = "hexify")]`
pub mod hexify {
    use num_traits::Num;
    use serde::{Deserialize as _, Deserializer, Serializer};

    pub fn serialize<T, S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: std::fmt::LowerHex,
        S: Serializer,
    {
        serializer.serialize_str(format!("{value:#x}").as_str())
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<T, D::Error>
    where
        T: Num,
        <T as Num>::FromStrRadixErr: std::fmt::Display,
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        match s.strip_prefix("0x") {
            Some("") => Ok(T::zero()),
            Some(digits) if digits.bytes().all(|b| b.is_ascii_hexdigit()) => {
                T::from_str_radix(digits, 16).map_err(serde::de::Error::custom)
            }
            _ => Err(serde::de::Error::custom("Invalid hex")),
        }
    }
}

/// Usage: `#[serde(with = "hexify_bytes")]` for fixed-size hashes.
pub mod hexify_bytes {
    use std::fmt::{Display, LowerHex};
    use std::str::FromStr;

    use serde::{Deserialize as _, Deserializer, Serializer};

    pub fn serialize<T, S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: LowerHex,
        S: Serializer,
    {
        // `ethereum_types` shortens hashes in `Display`, so format explicitly
        serializer.serialize_str(&format!("{value:#x}"))
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<T, D::Error>
    where
        T: FromStr,
        T::Err: Display,
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer)?
            .parse()
            .map_err(serde::de::Error::custom)
    }
}

/// Usage: `#[serde(with = "hexify_vec_bytes")]`
pub mod hexify_vec_bytes {
    use serde::{Deserialize as _, Deserializer, Serializer};

    pub fn serialize<S>(value: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&super::format_bytes(value))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let digits = s.strip_prefix("0x").unwrap_or(&s);
        // `0x0` and friends are valid, hex::decode wants an even number of digits
        if digits.len() % 2 == 1 {
            hex::decode(format!("0{digits}")).map_err(serde::de::Error::custom)
        } else {
            hex::decode(digits).map_err(serde::de::Error::custom)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck_macros::quickcheck;
    use rstest::rstest;

    #[quickcheck]
    fn format_then_parse(n: u64) -> bool {
        let n = (n >> 1) as i64;
        HexString(format_quantity(n)).to_int().unwrap() == n
    }

    #[test]
    fn zero_formats_without_padding() {
        assert_eq!(format_quantity(0), "0x0");
        assert_eq!(format_quantity(1000), "0x3e8");
        assert_eq!(format_quantity(-1), "-0x1");
    }

    #[rstest]
    #[case("", 0)]
    #[case("0x", 0)]
    #[case("0x0", 0)]
    #[case("0x10", 16)]
    #[case("0xFF", 255)]
    fn parses_quantities(#[case] input: &str, #[case] expected: i64) {
        assert_eq!(HexString::from(input).to_int().unwrap(), expected);
    }

    #[rstest]
    #[case("abc")]
    #[case("10")]
    #[case("0xzz")]
    #[case("0x10000000000000000")]
    #[case("0x-1")]
    #[case("0x+5")]
    #[case("0x-8000000000000000")]
    fn rejects_malformed(#[case] input: &str) {
        assert!(matches!(
            HexString::from(input).to_int(),
            Err(EthError::MalformedQuantity(s)) if s == input
        ));
    }

    #[test]
    fn bytes_follow_the_same_prefix_rule() {
        assert_eq!(HexString::from("0x").to_bytes().unwrap(), Vec::<u8>::new());
        assert_eq!(HexString::from("0xdead").to_bytes().unwrap(), vec![0xde, 0xad]);
        assert!(HexString::from("dead").to_bytes().is_err());
        assert!(HexString::from("0xabc").to_bytes().is_err());
        assert!(HexString::from("0x-abc").to_big_int().is_err());
    }

    #[rstest]
    #[case(EARLIEST, 0)]
    #[case(LATEST, 100)]
    #[case(PENDING, 100)]
    #[case("", 100)]
    #[case("0x3e8", 100)]
    #[case("0x2a", 42)]
    fn resolves_heights(#[case] tag: &str, #[case] expected: ChainEpoch) {
        assert_eq!(resolve_height(tag, 100).unwrap(), expected);
    }

    #[test]
    fn untagged_quantities() {
        let q: Quantity = serde_json::from_str("12").unwrap();
        assert_eq!(q.to_int().unwrap(), 12);
        let q: Quantity = serde_json::from_str("12.0").unwrap();
        assert_eq!(q.to_int().unwrap(), 12);
        let q: Quantity = serde_json::from_str("\"0xc\"").unwrap();
        assert_eq!(q.to_int().unwrap(), 12);
        let q: Quantity = serde_json::from_str("-1").unwrap();
        assert!(q.to_int().is_err());
        let q: Quantity = serde_json::from_str("\"latest\"").unwrap();
        assert!(q.is_head());
        assert_eq!(q.resolve_height(7).unwrap(), 7);
        assert_eq!(Quantity::Int(9).resolve_height(7).unwrap(), 7);
    }

    #[test]
    fn big_ints_exceed_i64() {
        let v = HexString::from("0xde0b6b3a7640000000").to_big_int().unwrap();
        assert_eq!(v.to_string(), "4096000000000000000000");
    }

    #[test]
    fn odd_length_byte_strings() {
        #[derive(Deserialize)]
        struct Wrapper(#[serde(with = "hexify_vec_bytes")] Vec<u8>);
        let Wrapper(bytes) = serde_json::from_str("\"0x0\"").unwrap();
        assert_eq!(bytes, vec![0]);
    }
}
