//! Text Codec Adapter
//!
//! Strict conversion between text and bytes. Nothing is replaced or skipped:
//! a character the target encoding cannot represent, or a byte sequence that
//! is malformed in the source encoding, fails with `EncodingError`.
//!
//! # Example
//!
//! ```rust
//! use host_bridge_core_rs::codec::{decode, encode, Encoding};
//!
//! let latin1 = Encoding::parse("ISO-8859-1").unwrap();
//! assert_eq!(encode("café", latin1).unwrap(), b"caf\xe9");
//! assert_eq!(decode(b"caf\xe9", latin1).unwrap(), "café");
//! assert!(encode("café", Encoding::Ascii).is_err());
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::CallContext;
use crate::exceptions::{ErrorKind, HostError};
use crate::models::{HostObject, Owned};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Encoding {
    #[serde(rename = "utf-8")]
    Utf8,
    #[serde(rename = "ascii")]
    Ascii,
    #[serde(rename = "latin-1")]
    Latin1,
    #[serde(rename = "utf-16-le")]
    Utf16Le,
    #[serde(rename = "utf-16-be")]
    Utf16Be,
}

impl Encoding {
    /// Resolve an encoding name, ignoring case and `-`/`_` spelling
    ///
    /// # Errors
    ///
    /// `LookupError` for an unknown name.
    pub fn parse(name: &str) -> Result<Self, HostError> {
        let normalized = name.trim().to_ascii_lowercase().replace('_', "-");
        let encoding = match normalized.as_str() {
            "utf-8" | "utf8" | "u8" | "utf" => Encoding::Utf8,
            "ascii" | "us-ascii" | "646" => Encoding::Ascii,
            "latin-1" | "latin1" | "latin" | "l1" | "iso-8859-1" | "iso8859-1" => Encoding::Latin1,
            "utf-16-le" | "utf-16le" | "utf16le" => Encoding::Utf16Le,
            "utf-16-be" | "utf-16be" | "utf16be" => Encoding::Utf16Be,
            _ => {
                return Err(HostError::new(
                    ErrorKind::Lookup,
                    format!("unknown encoding: {}", name),
                ))
            }
        };
        Ok(encoding)
    }

    /// Canonical name
    pub fn name(&self) -> &'static str {
        match self {
            Encoding::Utf8 => "utf-8",
            Encoding::Ascii => "ascii",
            Encoding::Latin1 => "latin-1",
            Encoding::Utf16Le => "utf-16-le",
            Encoding::Utf16Be => "utf-16-be",
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Encoding {
    type Err = HostError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Encoding::parse(name)
    }
}

fn encode_failure(encoding: Encoding, ch: char, position: usize, reason: &str) -> HostError {
    HostError::new(
        ErrorKind::Encoding,
        format!(
            "'{}' codec can't encode character '\\u{{{:04x}}}' in position {}: {}",
            encoding, ch as u32, position, reason
        ),
    )
}

fn decode_failure(encoding: Encoding, byte: u8, position: usize, reason: &str) -> HostError {
    HostError::new(
        ErrorKind::Encoding,
        format!(
            "'{}' codec can't decode byte 0x{:02x} in position {}: {}",
            encoding, byte, position, reason
        ),
    )
}

/// Encode `text` with `encoding`
///
/// # Errors
///
/// `EncodingError` at the first character `encoding` cannot represent.
pub fn encode(text: &str, encoding: Encoding) -> Result<Vec<u8>, HostError> {
    let bytes = match encoding {
        Encoding::Utf8 => text.as_bytes().to_vec(),
        Encoding::Ascii => encode_narrow(text, encoding, 0x7f, "ordinal not in range(128)")?,
        Encoding::Latin1 => encode_narrow(text, encoding, 0xff, "ordinal not in range(256)")?,
        Encoding::Utf16Le => text.encode_utf16().flat_map(u16::to_le_bytes).collect(),
        Encoding::Utf16Be => text.encode_utf16().flat_map(u16::to_be_bytes).collect(),
    };
    Ok(bytes)
}

/// Single-byte encodings: each char must fit in `max`
fn encode_narrow(text: &str, encoding: Encoding, max: u32, reason: &str) -> Result<Vec<u8>, HostError> {
    text.chars()
        .enumerate()
        .map(|(position, ch)| {
            u8::try_from(ch as u32)
                .ok()
                .filter(|byte| u32::from(*byte) <= max)
                .ok_or_else(|| encode_failure(encoding, ch, position, reason))
        })
        .collect()
}

/// Decode `bytes` with `encoding`
///
/// # Errors
///
/// `EncodingError` at the first malformed sequence.
pub fn decode(bytes: &[u8], encoding: Encoding) -> Result<String, HostError> {
    match encoding {
        Encoding::Utf8 => String::from_utf8(bytes.to_vec()).map_err(|err| {
            let position = err.utf8_error().valid_up_to();
            let reason = match err.utf8_error().error_len() {
                Some(_) => "invalid start byte",
                None => "unexpected end of data",
            };
            decode_failure(encoding, bytes[position], position, reason)
        }),
        Encoding::Ascii => bytes
            .iter()
            .enumerate()
            .map(|(position, &byte)| {
                if byte.is_ascii() {
                    Ok(char::from(byte))
                } else {
                    Err(decode_failure(encoding, byte, position, "ordinal not in range(128)"))
                }
            })
            .collect(),
        Encoding::Latin1 => Ok(bytes.iter().map(|&byte| char::from(byte)).collect()),
        Encoding::Utf16Le => decode_utf16(bytes, encoding, u16::from_le_bytes),
        Encoding::Utf16Be => decode_utf16(bytes, encoding, u16::from_be_bytes),
    }
}

fn decode_utf16(bytes: &[u8], encoding: Encoding, unit: fn([u8; 2]) -> u16) -> Result<String, HostError> {
    if bytes.len() % 2 != 0 {
        let position = bytes.len() - 1;
        return Err(decode_failure(encoding, bytes[position], position, "truncated data"));
    }
    let units = bytes.chunks_exact(2).map(|pair| unit([pair[0], pair[1]]));
    let mut text = String::with_capacity(bytes.len() / 2);
    let mut position = 0;
    for decoded in char::decode_utf16(units) {
        match decoded {
            Ok(ch) => {
                text.push(ch);
                position += ch.len_utf16() * 2;
            }
            Err(_) => {
                return Err(decode_failure(encoding, bytes[position], position, "illegal UTF-16 surrogate"));
            }
        }
    }
    Ok(text)
}

fn resolve(ctx: &CallContext, encoding: Option<&str>) -> Result<Encoding, HostError> {
    match encoding {
        Some(name) => Encoding::parse(name),
        None => Ok(ctx.default_encoding()),
    }
}

/// Encode a host string into host bytes
///
/// # Errors
///
/// `TypeError` if `value` is not a string, `LookupError` for an unknown
/// encoding name, `EncodingError` for unrepresentable text.
pub fn encode_value(ctx: &CallContext, value: &Owned, encoding: Option<&str>) -> Result<Owned, HostError> {
    let HostObject::Str(text) = value.object() else {
        return Err(HostError::type_error(format!(
            "expected str, got {}",
            value.type_name()
        )));
    };
    encode(text, resolve(ctx, encoding)?).map(Owned::bytes)
}

/// Decode host bytes into a host string
///
/// # Errors
///
/// `TypeError` if `value` is not bytes, `LookupError` for an unknown
/// encoding name, `EncodingError` for malformed input.
pub fn decode_value(ctx: &CallContext, value: &Owned, encoding: Option<&str>) -> Result<Owned, HostError> {
    let HostObject::Bytes(bytes) = value.object() else {
        return Err(HostError::type_error(format!(
            "expected bytes, got {}",
            value.type_name()
        )));
    };
    decode(bytes, resolve(ctx, encoding)?).map(Owned::str)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_aliases() {
        assert_eq!(Encoding::parse("UTF8").unwrap(), Encoding::Utf8);
        assert_eq!(Encoding::parse("latin_1").unwrap(), Encoding::Latin1);
        assert_eq!(Encoding::parse("UTF-16LE").unwrap(), Encoding::Utf16Le);
        let err = Encoding::parse("klingon").unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::Lookup);
    }

    #[test]
    fn test_utf8_error_position() {
        let err = decode(b"ab\xffcd", Encoding::Utf8).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::Encoding);
        assert!(err.message().contains("position 2"), "{}", err.message());
    }

    #[test]
    fn test_utf16_surrogate_pair() {
        let bytes = encode("a😀", Encoding::Utf16Be).unwrap();
        assert_eq!(bytes.len(), 6);
        assert_eq!(decode(&bytes, Encoding::Utf16Be).unwrap(), "a😀");
    }

    #[test]
    fn test_utf16_lone_surrogate_rejected() {
        let err = decode(&[0x00, 0xd8], Encoding::Utf16Le).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::Encoding);
        assert!(decode(&[0x41], Encoding::Utf16Le).is_err());
    }

    #[test]
    fn test_serde_names() {
        assert_eq!(serde_json::to_string(&Encoding::Latin1).unwrap(), "\"latin-1\"");
    }
}
