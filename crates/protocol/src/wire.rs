//! Deserialization helpers for scalars as the web service encodes them.
//!
//! The XML transport surfaces every scalar as element text, so numbers and
//! booleans arrive as strings; values built in-process use native JSON
//! types. These helpers accept both forms. List-valued elements are
//! repeated rather than wrapped, which leaves a single-element list
//! indistinguishable from a scalar - [`one_or_many`] folds the two shapes
//! together.

use serde::Deserialize;
use serde::de::{Deserializer, Error as DeError};

/// COM result codes surfaced in fault details, in normalized form.
pub mod result_codes {
    pub const OBJECT_NOT_FOUND: &str = "0x80bb0001";
    pub const INVALID_OBJECT_STATE: &str = "0x80bb0007";
    pub const INVALID_SESSION_STATE: &str = "0x80bb000b";
    pub const OBJECT_IN_USE: &str = "0x80bb000c";
    pub const ACCESS_DENIED: &str = "0x80070005";
}

/// Normalizes a fault result code for comparison.
///
/// Fault details render the code either as hex with varying case or as the
/// signed decimal value of the underlying 32-bit COM code. Comparisons in
/// this workspace always use the `0x`-prefixed lower-case hex form.
pub fn normalize_result_code(raw: &str) -> String {
    let trimmed = raw.trim();
    if let Ok(signed) = trimmed.parse::<i64>() {
        return format!("{:#010x}", signed as u32);
    }
    trimmed.to_ascii_lowercase()
}

pub fn int32<'de, D>(deserializer: D) -> Result<i32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Num(i64),
        Text(String),
    }

    let value = match Raw::deserialize(deserializer)? {
        Raw::Num(n) => n,
        Raw::Text(s) => s.trim().parse().map_err(DeError::custom)?,
    };
    i32::try_from(value).map_err(DeError::custom)
}

pub fn int64<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Num(i64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Num(n) => Ok(n),
        Raw::Text(s) => s.trim().parse().map_err(DeError::custom),
    }
}

pub fn uint32<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Num(u64),
        Text(String),
    }

    let value = match Raw::deserialize(deserializer)? {
        Raw::Num(n) => n,
        Raw::Text(s) => s.trim().parse().map_err(DeError::custom)?,
    };
    u32::try_from(value).map_err(DeError::custom)
}

pub fn boolean<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Flag(bool),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Flag(b) => Ok(b),
        Raw::Text(s) => match s.trim() {
            "true" | "1" => Ok(true),
            "false" | "0" | "" => Ok(false),
            other => Err(DeError::custom(format!("invalid boolean text {other:?}"))),
        },
    }
}

/// Accepts a list element that arrived as either a sequence or a lone
/// value. Pair with `#[serde(default)]` so an absent element reads as
/// empty.
pub fn one_or_many<'de, T, D>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw<T> {
        Many(Vec<T>),
        One(T),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Many(items) => items,
        Raw::One(item) => vec![item],
    })
}

/// Response body of operations whose whole result is the `returnval`
/// element.
#[derive(Debug, Deserialize)]
pub struct Returnval<T> {
    pub returnval: T,
}
