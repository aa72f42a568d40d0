// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deterministic encoding of document payloads.
//!
//! Payloads reach the registry as JSON-shaped values. Before a payload gets addressed it is
//! brought into canonical form:
//!
//! - object keys are sorted (by their UTF-8 bytes) at every nesting level, arrays keep their order,
//! - `\r\n` and lone `\r` are replaced with `\n` in every string, object keys included,
//! - numbers have exactly one representation: integral floats inside the 64-bit integer range are
//!   written as integers, all other numbers stay IEEE-754 doubles.
//!
//! The canonical value is then written as [CBOR] with maps emitted in sorted key order, so the
//! resulting bytes are a function of the value alone and never of map iteration order.
//!
//! [CBOR]: https://cbor.io/
use std::io::Read;

use ciborium::de::Error as DeserializeError;
use ciborium::ser::Error as SerializeError;
use ciborium::value::{Integer, Value as CborValue};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use thiserror::Error;

/// Returns the canonical form of a document value.
pub fn canonicalize(value: &Value) -> Result<Value, CanonicalError> {
    match value {
        Value::Null | Value::Bool(_) => Ok(value.clone()),
        Value::Number(number) => Ok(Value::Number(canonical_number(number)?)),
        Value::String(text) => Ok(Value::String(normalize_newlines(text))),
        Value::Array(items) => items
            .iter()
            .map(canonicalize)
            .collect::<Result<Vec<Value>, CanonicalError>>()
            .map(Value::Array),
        Value::Object(map) => {
            let entries = sorted_entries(map)?;
            Ok(Value::Object(entries.into_iter().collect::<Map<String, Value>>()))
        }
    }
}

/// Returns the canonical byte representation of a document value.
///
/// Two values produce the same bytes if and only if they are deeply equal after
/// canonicalization.
pub fn canonical_bytes(value: &Value) -> Result<Vec<u8>, CanonicalError> {
    let cbor = to_cbor(value)?;
    Ok(encode_cbor(&cbor)?)
}

/// Decodes canonical bytes back into a document value.
pub fn decode_canonical(bytes: &[u8]) -> Result<Value, CanonicalError> {
    let value: Value = decode_cbor(bytes)?;
    canonicalize(&value)
}

/// Replaces Windows (`\r\n`) and classic Mac (`\r`) line endings with `\n`.
pub fn normalize_newlines(text: &str) -> String {
    if !text.contains('\r') {
        return text.to_owned();
    }

    let mut normalized = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\r' {
            if chars.peek() == Some(&'\n') {
                chars.next();
            }
            normalized.push('\n');
        } else {
            normalized.push(c);
        }
    }
    normalized
}

fn canonical_number(number: &Number) -> Result<Number, CanonicalError> {
    if number.is_i64() || number.is_u64() {
        return Ok(number.clone());
    }

    let float = number.as_f64().ok_or(CanonicalError::NonFiniteNumber)?;
    if !float.is_finite() {
        return Err(CanonicalError::NonFiniteNumber);
    }

    // 2^63 and 2^64 are exactly representable as doubles, the ranges below are exclusive at the
    // top to stay inside the integer types.
    if float.fract() == 0.0 {
        if float >= i64::MIN as f64 && float < 9_223_372_036_854_775_808.0 {
            return Ok(Number::from(float as i64));
        }
        if float >= 0.0 && float < 18_446_744_073_709_551_616.0 {
            return Ok(Number::from(float as u64));
        }
    }

    Number::from_f64(float).ok_or(CanonicalError::NonFiniteNumber)
}

fn sorted_entries(map: &Map<String, Value>) -> Result<Vec<(String, Value)>, CanonicalError> {
    let mut entries = Vec::with_capacity(map.len());
    for (key, item) in map {
        entries.push((normalize_newlines(key), canonicalize(item)?));
    }
    entries.sort_by(|(a, _), (b, _)| a.as_bytes().cmp(b.as_bytes()));

    // Keys which only differed in their line endings collapse into one.
    if let Some(pair) = entries.windows(2).find(|pair| pair[0].0 == pair[1].0) {
        return Err(CanonicalError::DuplicateKey(pair[0].0.clone()));
    }

    Ok(entries)
}

fn to_cbor(value: &Value) -> Result<CborValue, CanonicalError> {
    let cbor = match value {
        Value::Null => CborValue::Null,
        Value::Bool(flag) => CborValue::Bool(*flag),
        Value::Number(number) => {
            let number = canonical_number(number)?;
            if let Some(int) = number.as_i64() {
                CborValue::Integer(Integer::from(int))
            } else if let Some(int) = number.as_u64() {
                CborValue::Integer(Integer::from(int))
            } else {
                CborValue::Float(number.as_f64().ok_or(CanonicalError::NonFiniteNumber)?)
            }
        }
        Value::String(text) => CborValue::Text(normalize_newlines(text)),
        Value::Array(items) => CborValue::Array(
            items
                .iter()
                .map(to_cbor)
                .collect::<Result<Vec<CborValue>, CanonicalError>>()?,
        ),
        Value::Object(map) => {
            let entries = sorted_entries(map)?;
            let mut pairs = Vec::with_capacity(entries.len());
            for (key, item) in entries {
                pairs.push((CborValue::Text(key), to_cbor(&item)?));
            }
            CborValue::Map(pairs)
        }
    };
    Ok(cbor)
}

/// Serializes a value into CBOR format.
pub fn encode_cbor<T: Serialize>(value: &T) -> Result<Vec<u8>, EncodeError> {
    let mut bytes = Vec::new();
    ciborium::ser::into_writer(value, &mut bytes).map_err(Into::<EncodeError>::into)?;
    Ok(bytes)
}

/// Deserializes a value which was formatted in CBOR.
pub fn decode_cbor<T: for<'a> Deserialize<'a>, R: Read>(reader: R) -> Result<T, DecodeError> {
    let value = ciborium::from_reader::<T, R>(reader).map_err(Into::<DecodeError>::into)?;
    Ok(value)
}

/// Error types for canonicalization.
#[derive(Debug, Error)]
pub enum CanonicalError {
    /// Document contains a number which has no canonical representation (NaN or infinity).
    #[error("document contains a non-finite number")]
    NonFiniteNumber,

    /// Two object keys are equal after line ending normalization.
    #[error("object key {0:?} occurs twice after normalization")]
    DuplicateKey(String),

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// An error occurred during CBOR serialization.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// An error occurred while writing bytes.
    ///
    /// Contains the underlying error returned while writing.
    #[error("an error occurred while writing bytes: {0}")]
    Io(std::io::Error),

    /// An error indicating a value that cannot be serialized.
    ///
    /// Contains a description of the problem delivered from serde.
    #[error("an error occurred while serializing value: {0}")]
    Value(String),
}

impl From<SerializeError<std::io::Error>> for EncodeError {
    fn from(value: SerializeError<std::io::Error>) -> Self {
        match value {
            SerializeError::Io(err) => EncodeError::Io(err),
            SerializeError::Value(err) => EncodeError::Value(err),
        }
    }
}

/// An error occurred during CBOR deserialization.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// An error occurred while reading bytes.
    ///
    /// Contains the underlying error returned while reading.
    #[error("an error occurred while reading bytes: {0}")]
    Io(std::io::Error),

    /// An error occurred while parsing bytes.
    ///
    /// Contains the offset into the stream where the syntax error occurred.
    #[error("an error occurred while parsing bytes at position {0}")]
    Syntax(usize),

    /// An error occurred while processing a parsed value.
    ///
    /// Contains a description of the error that occurred and (optionally) the offset into the
    /// stream indicating the start of the item being processed when the error occurred.
    #[error("an error occurred while processing a parsed value at position {0:?}: {1}")]
    Semantic(Option<usize>, String),

    /// The input caused serde to recurse too much.
    ///
    /// This error prevents a stack overflow.
    #[error("recursion limit exceeded while decoding")]
    RecursionLimitExceeded,
}

impl From<DeserializeError<std::io::Error>> for DecodeError {
    fn from(value: DeserializeError<std::io::Error>) -> Self {
        match value {
            DeserializeError::Io(err) => DecodeError::Io(err),
            DeserializeError::Syntax(offset) => DecodeError::Syntax(offset),
            DeserializeError::Semantic(offset, description) => {
                DecodeError::Semantic(offset, description)
            }
            DeserializeError::RecursionLimitExceeded => DecodeError::RecursionLimitExceeded,
        }
    }
}
