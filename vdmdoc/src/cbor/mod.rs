// Copyright (C) 2021-2026  Veridoc Labs Ltd. (VDL).
//
// This program is free software: you can redistribute it and/or modify it
// under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or (at your
// option) any later version.
//
// This program is distributed in the hope that it will be useful, but
// WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public
// License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! This module implements the _CBOR_ encoding defined by [RFC 8949][1], restricted to the subset
//! used by the [ISO/IEC 18013-5:2021][2] standard.
//!
//! The decoder is a streaming one: it works over a borrowed byte slice, can peek at the upcoming
//! item without consuming it, and can skip a whole element (however deeply nested) without
//! materializing it.  Both definite and indefinite-length items are handled transparently.
//!
//! Since `mdoc` signatures and digests are computed over exact serialized bytes, the decoder never
//! eagerly re-interprets an "embedded CBOR" region (a byte string tagged with `24`, see section
//! `8.1` of [ISO/IEC 18013-5:2021][2]).  Such regions decode into the dedicated
//! [`Value::Encoded`] variant which retains the original bytes verbatim and decodes the embedded
//! value only on demand.
//!
//! [1]: <https://www.rfc-editor.org/rfc/rfc8949.html>
//! [2]: <https://www.iso.org/standard/69084.html>

mod decode;
mod encode;

pub use decode::{Decoder, Major};

/// A _CBOR_ tag value marking a byte string whose contents are themselves an encoded _CBOR_ data
/// item, as specified by the section `8.1` of the [ISO/IEC 18013-5:2021][1].
///
/// [1]: <https://www.iso.org/standard/69084.html>
pub const EMBEDDED_CBOR_TAG: u64 = 24;

/// The maximum nesting depth accepted by the decoder.
pub(crate) const MAX_NESTING_DEPTH: usize = 128;

/// Error type of the _CBOR_ codec.
///
/// The first two variants cover the structural failure modes of the decoder: a malformed byte
/// (with its offset and the construct that was expected there) and a truncated input.  The
/// remaining variants are raised when converting between [`Value`] and typed data models.
#[derive(strum_macros::Display, Debug, PartialEq, Clone)]
pub enum CborError {
    /// A structurally malformed byte was encountered.
    #[strum(to_string = "malformed CBOR at offset {0}: expected {1}")]
    Decoding(usize, String),
    /// The input ended in the middle of a data item.
    #[strum(to_string = "unexpected end of CBOR input")]
    UnexpectedEndOfInput,
    /// A complete data item was decoded but input bytes remain.
    #[strum(to_string = "trailing bytes after the CBOR value")]
    TrailingBytes,
    /// Data items are nested deeper than the decoder supports.
    #[strum(to_string = "CBOR nesting depth limit exceeded")]
    NestingTooDeep,
    /// A well-formed item of the wrong shape was encountered while converting to a typed model.
    #[strum(to_string = "unexpected CBOR item: got {0}, want {1}")]
    UnexpectedItem(&'static str, &'static str),
    /// A required map entry is absent.
    #[strum(to_string = "missing field `{0}`")]
    MissingField(&'static str),
    /// A numeric value does not fit the encodable range.
    #[strum(to_string = "value out of range: {0}")]
    OutOfRange(&'static str),
}

impl vderror::CoreError for CborError {}

/// Type alias for [`vderror::Result`] types returned by the codec.
pub type Result<T> = vderror::Result<T, CborError>;

/// A single _CBOR_ data item.
///
/// This mirrors the generic data model of [RFC 8949][1] with one addition: the
/// [`Encoded`][Value::Encoded] variant representing a tag-`24` byte string carrying an embedded
/// data item, kept as raw bytes (see [`RawCbor`]).
///
/// [1]: <https://www.rfc-editor.org/rfc/rfc8949.html>
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// An integer, positive (major type 0) or negative (major type 1).
    Integer(i128),
    /// A byte string.
    Bytes(Vec<u8>),
    /// A text string.
    Text(String),
    /// An array of data items.
    Array(Vec<Value>),
    /// A map of pairs of data items.  Keys need not be strings and the entry order is preserved.
    Map(Vec<(Value, Value)>),
    /// A boolean.
    Bool(bool),
    /// Null (also used for the `undefined` simple value).
    Null,
    /// A floating point number.  Half- and single-precision inputs are widened on decode.
    Float(f64),
    /// A tagged data item, for any tag other than the embedded-CBOR tag `24` over a byte string.
    Tag(u64, Box<Value>),
    /// An embedded _CBOR_ data item: tag `24` over a byte string, kept as the original bytes.
    Encoded(RawCbor),
}

impl Value {
    /// Returns the contained integer, or [`None`].
    pub fn as_integer(&self) -> Option<i128> {
        match self {
            Value::Integer(int) => Some(*int),
            _ => None,
        }
    }

    /// Returns a reference to the contained byte string, or [`None`].
    pub fn as_bytes(&self) -> Option<&Vec<u8>> {
        match self {
            Value::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Returns a reference to the contained text string, or [`None`].
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Consumes `self` and returns the contained byte string, or `self` as the error.
    pub fn into_bytes(self) -> std::result::Result<Vec<u8>, Self> {
        match self {
            Value::Bytes(bytes) => Ok(bytes),
            other => Err(other),
        }
    }

    /// Consumes `self` and returns the contained text string, or `self` as the error.
    pub fn into_text(self) -> std::result::Result<String, Self> {
        match self {
            Value::Text(text) => Ok(text),
            other => Err(other),
        }
    }

    /// Consumes `self` and returns the contained array, or `self` as the error.
    pub fn into_array(self) -> std::result::Result<Vec<Value>, Self> {
        match self {
            Value::Array(array) => Ok(array),
            other => Err(other),
        }
    }

    /// Consumes `self` and returns the contained map, or `self` as the error.
    pub fn into_map(self) -> std::result::Result<Vec<(Value, Value)>, Self> {
        match self {
            Value::Map(map) => Ok(map),
            other => Err(other),
        }
    }

    /// Returns `true` if the value is [`Null`][Value::Null].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// A short name of the variant, used in diagnostics.
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Value::Integer(_) => "integer",
            Value::Bytes(_) => "byte string",
            Value::Text(_) => "text string",
            Value::Array(_) => "array",
            Value::Map(_) => "map",
            Value::Bool(_) => "boolean",
            Value::Null => "null",
            Value::Float(_) => "float",
            Value::Tag(_, _) => "tagged value",
            Value::Encoded(_) => "embedded CBOR",
        }
    }
}

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        Value::Integer(value.into())
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value.into())
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Value::Bytes(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::Array(value)
    }
}

/// Decodes a single [`Value`] out of the provided bytes.
///
/// # Error
///
/// An error is returned if the bytes are not a single well-formed data item, including the case
/// where well-formed bytes are followed by trailing garbage.
pub fn from_slice(bytes: &[u8]) -> Result<Value> {
    let mut decoder = Decoder::new(bytes);
    let value = decoder.decode_value()?;

    if !decoder.is_at_end() {
        return Err(vderror::Error::root(CborError::TrailingBytes));
    }

    Ok(value)
}

/// Encodes the provided [`Value`] into bytes.
///
/// Definite lengths are always produced, with minimal-width arguments, so encoding a given
/// [`Value`] is deterministic.  [`Encoded`][Value::Encoded] regions are emitted verbatim.
pub fn to_vec(value: &Value) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    encode::write_value(&mut bytes, value)?;
    Ok(bytes)
}

/// Trait for types with a direct [`Value`] representation.
///
/// This is the conversion seam between the codec and the typed data models: every wire-visible
/// model type implements it by hand, keeping full control over the exact item shapes.
pub trait AsCborValue: Sized {
    /// Converts a [`Value`] into this type.
    fn from_cbor_value(value: Value) -> Result<Self>;

    /// Converts this type into a [`Value`].
    fn to_cbor_value(&self) -> Result<Value>;

    /// Decodes this type from the provided bytes.
    fn from_slice(bytes: &[u8]) -> Result<Self> {
        Self::from_cbor_value(from_slice(bytes)?)
    }

    /// Encodes this type into bytes.
    fn to_vec(&self) -> Result<Vec<u8>> {
        to_vec(&self.to_cbor_value()?)
    }
}

impl AsCborValue for Value {
    fn from_cbor_value(value: Value) -> Result<Self> {
        Ok(value)
    }

    fn to_cbor_value(&self) -> Result<Value> {
        Ok(self.clone())
    }
}

/// Removes and returns the entry with the given text key from a decoded map.
pub(crate) fn take_map_entry(map: &mut Vec<(Value, Value)>, key: &str) -> Option<Value> {
    let index = map
        .iter()
        .position(|(k, _)| matches!(k, Value::Text(text) if text == key))?;

    Some(map.remove(index).1)
}

/// Removes and returns the entry with the given text key, or fails with
/// [`CborError::MissingField`].
pub(crate) fn require_map_entry(
    map: &mut Vec<(Value, Value)>,
    key: &'static str,
) -> Result<Value> {
    take_map_entry(map, key).ok_or_else(|| vderror::Error::root(CborError::MissingField(key)))
}

/// Unwraps a map, or fails naming the `want`-ed construct.
pub(crate) fn expect_map(value: Value, want: &'static str) -> Result<Vec<(Value, Value)>> {
    value
        .into_map()
        .map_err(|other| vderror::Error::root(CborError::UnexpectedItem(other.kind(), want)))
}

/// Unwraps an array, or fails naming the `want`-ed construct.
pub(crate) fn expect_array(value: Value, want: &'static str) -> Result<Vec<Value>> {
    value
        .into_array()
        .map_err(|other| vderror::Error::root(CborError::UnexpectedItem(other.kind(), want)))
}

/// Unwraps a text string, or fails naming the `want`-ed construct.
pub(crate) fn expect_text(value: Value, want: &'static str) -> Result<String> {
    value
        .into_text()
        .map_err(|other| vderror::Error::root(CborError::UnexpectedItem(other.kind(), want)))
}

/// Unwraps an unsigned integer, or fails naming the `want`-ed construct.
pub(crate) fn expect_u64(value: Value, want: &'static str) -> Result<u64> {
    value
        .as_integer()
        .and_then(|int| u64::try_from(int).ok())
        .ok_or_else(|| vderror::Error::root(CborError::UnexpectedItem("value", want)))
}

impl<T: AsCborValue> AsCborValue for Vec<T> {
    fn from_cbor_value(value: Value) -> Result<Self> {
        expect_array(value, "an array")?
            .into_iter()
            .map(T::from_cbor_value)
            .collect()
    }

    fn to_cbor_value(&self) -> Result<Value> {
        Ok(Value::Array(
            self.iter()
                .map(T::to_cbor_value)
                .collect::<Result<Vec<_>>>()?,
        ))
    }
}

impl<K, V> AsCborValue for std::collections::HashMap<K, V>
where
    K: AsCborValue + Eq + std::hash::Hash,
    V: AsCborValue,
{
    fn from_cbor_value(value: Value) -> Result<Self> {
        expect_map(value, "a map")?
            .into_iter()
            .map(|(key, value)| Ok((K::from_cbor_value(key)?, V::from_cbor_value(value)?)))
            .collect()
    }

    fn to_cbor_value(&self) -> Result<Value> {
        Ok(Value::Map(
            self.iter()
                .map(|(key, value)| Ok((key.to_cbor_value()?, value.to_cbor_value()?)))
                .collect::<Result<Vec<_>>>()?,
        ))
    }
}

/// An embedded _CBOR_ data item kept as its original bytes.
///
/// This holds the complete `#6.24(bstr .cbor <item>)` encoding exactly as read from (or written
/// to) the wire.  The embedded item is decoded lazily via [`RawCbor::decode`]; re-serialization
/// always reuses the retained bytes, never a re-encoding of the decoded form, because third-party
/// encoders are not guaranteed to be byte-compatible with ours and the bytes participate in
/// digests and signatures.
#[derive(Debug, Clone, PartialEq)]
pub struct RawCbor(Vec<u8>);

impl RawCbor {
    /// Wraps the provided [`Value`] into an embedded-CBOR region by encoding it.
    pub fn wrap(value: &Value) -> Result<Self> {
        let embedded = to_vec(value)?;

        let mut bytes = Vec::with_capacity(embedded.len() + 11);
        encode::write_head(&mut bytes, encode::MAJOR_TAG, EMBEDDED_CBOR_TAG);
        encode::write_head(&mut bytes, encode::MAJOR_BYTES, embedded.len() as u64);
        bytes.extend_from_slice(&embedded);

        Ok(Self(bytes))
    }

    /// Constructs a [`RawCbor`] directly from the complete tagged bytes.
    ///
    /// The caller must have validated that the bytes are a well-formed tag-`24` byte string; the
    /// decoder is the only expected caller.
    pub(crate) fn from_tagged_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Decodes and returns the embedded data item.
    pub fn decode(&self) -> Result<Value> {
        from_slice(&self.embedded_bytes()?)
    }

    /// Returns the bytes of the embedded data item, without the tag and byte string framing.
    pub fn embedded_bytes(&self) -> Result<Vec<u8>> {
        let mut decoder = Decoder::new(&self.0);

        let tag = decoder.read_tag()?;
        if tag != EMBEDDED_CBOR_TAG {
            return Err(vderror::Error::root(CborError::UnexpectedItem(
                "tagged value",
                "embedded CBOR (tag 24)",
            )));
        }

        let embedded = match decoder.decode_value()? {
            Value::Bytes(bytes) => bytes,
            other => {
                return Err(vderror::Error::root(CborError::UnexpectedItem(
                    other.kind(),
                    "byte string",
                )))
            }
        };

        if !decoder.is_at_end() {
            return Err(vderror::Error::root(CborError::TrailingBytes));
        }

        Ok(embedded)
    }

    /// Returns the complete tagged bytes.
    ///
    /// These are the exact bytes that participate in digest computation.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// A typed view over an embedded _CBOR_ region.
///
/// Pairs the decoded model type `T` with the [`RawCbor`] bytes it was decoded from, so both the
/// typed accessors and the byte-exact re-serialization are available.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedCbor<T> {
    inner: T,
    raw: RawCbor,
}

impl<T: AsCborValue> EmbeddedCbor<T> {
    /// Creates a new [`EmbeddedCbor`] by encoding the provided value.
    pub fn new(inner: T) -> Result<Self> {
        let raw = RawCbor::wrap(&inner.to_cbor_value()?)?;

        Ok(Self { inner, raw })
    }

    /// Returns a reference to the embedded value.
    pub fn inner(&self) -> &T {
        &self.inner
    }

    /// Consumes `self` and returns the embedded value.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Returns the complete tagged bytes of the region.
    pub fn tagged_bytes(&self) -> &[u8] {
        self.raw.as_bytes()
    }
}

impl<T: AsCborValue> AsCborValue for EmbeddedCbor<T> {
    fn from_cbor_value(value: Value) -> Result<Self> {
        let raw = match value {
            Value::Encoded(raw) => raw,
            other => {
                return Err(vderror::Error::root(CborError::UnexpectedItem(
                    other.kind(),
                    "embedded CBOR (tag 24)",
                )))
            }
        };

        let inner = T::from_cbor_value(raw.decode()?)?;

        Ok(Self { inner, raw })
    }

    fn to_cbor_value(&self) -> Result<Value> {
        Ok(Value::Encoded(self.raw.clone()))
    }
}
