//! Byte size parsing and human-readable formatting

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

pub const KB: u64 = 1024;
pub const MB: u64 = 1024 * KB;
pub const GB: u64 = 1024 * MB;
pub const TB: u64 = 1024 * GB;

/// A byte count that deserializes from an integer or a string such as `"5MB"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ByteSize(pub u64);

impl ByteSize {
    pub const fn bytes(n: u64) -> Self {
        ByteSize(n)
    }

    pub const fn kb(n: u64) -> Self {
        ByteSize(n * KB)
    }

    pub const fn mb(n: u64) -> Self {
        ByteSize(n * MB)
    }

    pub const fn gb(n: u64) -> Self {
        ByteSize(n * GB)
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl From<u64> for ByteSize {
    fn from(n: u64) -> Self {
        ByteSize(n)
    }
}

impl fmt::Display for ByteSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&human_size(self.0))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParseByteSizeError(String);

impl fmt::Display for ParseByteSizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid byte size '{}'", self.0)
    }
}

impl std::error::Error for ParseByteSizeError {}

impl FromStr for ByteSize {
    type Err = ParseByteSizeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let split = trimmed
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(trimmed.len());
        let (number, unit) = trimmed.split_at(split);

        let value: f64 = number
            .parse()
            .map_err(|_| ParseByteSizeError(s.to_string()))?;

        let multiplier = match unit.trim().to_ascii_uppercase().as_str() {
            "" | "B" | "BYTES" => 1,
            "K" | "KB" | "KIB" => KB,
            "M" | "MB" | "MIB" => MB,
            "G" | "GB" | "GIB" => GB,
            "T" | "TB" | "TIB" => TB,
            _ => return Err(ParseByteSizeError(s.to_string())),
        };

        if !value.is_finite() || value < 0.0 {
            return Err(ParseByteSizeError(s.to_string()));
        }

        Ok(ByteSize((value * multiplier as f64).round() as u64))
    }
}

impl Serialize for ByteSize {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(self.0)
    }
}

impl<'de> Deserialize<'de> for ByteSize {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ByteSizeVisitor;

        impl<'de> Visitor<'de> for ByteSizeVisitor {
            type Value = ByteSize;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a byte count or a string like \"5MB\"")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<ByteSize, E> {
                Ok(ByteSize(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<ByteSize, E> {
                u64::try_from(v)
                    .map(ByteSize)
                    .map_err(|_| E::custom("byte size cannot be negative"))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<ByteSize, E> {
                v.parse().map_err(E::custom)
            }
        }

        deserializer.deserialize_any(ByteSizeVisitor)
    }
}

/// Formats a byte count the way upload forms usually show it: `"512 Bytes"`, `"1.5 KB"`, `"10 MB"`.
pub fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];

    if bytes < KB {
        return if bytes == 1 {
            "1 Byte".to_string()
        } else {
            format!("{} Bytes", bytes)
        };
    }

    let mut value = bytes as f64 / KB as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    format!("{} {}", trim_number(value, 1), UNITS[unit])
}

/// Formats seconds with at most `precision` decimals and no trailing zeros.
pub fn human_duration(seconds: f64) -> String {
    format!("{} sec", trim_number(seconds, 2))
}

fn trim_number(value: f64, precision: usize) -> String {
    let formatted = format!("{:.*}", precision, value);
    if formatted.contains('.') {
        formatted
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_string()
    } else {
        formatted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_byte_sizes() {
        assert_eq!("512".parse::<ByteSize>().unwrap(), ByteSize(512));
        assert_eq!("5MB".parse::<ByteSize>().unwrap(), ByteSize::mb(5));
        assert_eq!("1.5 KB".parse::<ByteSize>().unwrap(), ByteSize(1536));
        assert_eq!("2gib".parse::<ByteSize>().unwrap(), ByteSize::gb(2));

        assert!("".parse::<ByteSize>().is_err());
        assert!("ten MB".parse::<ByteSize>().is_err());
        assert!("5 parsecs".parse::<ByteSize>().is_err());
    }

    #[test]
    fn test_deserialize_from_number_or_string() {
        #[derive(Deserialize)]
        struct Limits {
            a: ByteSize,
            b: ByteSize,
        }

        let limits: Limits = serde_json::from_str(r#"{"a": 2048, "b": "10MB"}"#).unwrap();
        assert_eq!(limits.a, ByteSize::kb(2));
        assert_eq!(limits.b, ByteSize::mb(10));

        assert!(serde_json::from_str::<Limits>(r#"{"a": -1, "b": 0}"#).is_err());
    }

    #[test]
    fn test_human_size() {
        assert_eq!(human_size(0), "0 Bytes");
        assert_eq!(human_size(1), "1 Byte");
        assert_eq!(human_size(1023), "1023 Bytes");
        assert_eq!(human_size(1536), "1.5 KB");
        assert_eq!(human_size(10 * MB), "10 MB");
        assert_eq!(human_size(15 * MB + 300 * KB), "15.3 MB");
        assert_eq!(human_size(3 * TB), "3 TB");
    }

    #[test]
    fn test_human_duration() {
        assert_eq!(human_duration(1.0), "1 sec");
        assert_eq!(human_duration(2.5), "2.5 sec");
        assert_eq!(human_duration(0.126), "0.13 sec");
    }
}
