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

use super::{CborError, RawCbor, Result, Value, EMBEDDED_CBOR_TAG, MAX_NESTING_DEPTH};

/// The "break" stop code terminating indefinite-length items, section `3.2.1` of [RFC 8949][1].
///
/// [1]: <https://www.rfc-editor.org/rfc/rfc8949.html>
const BREAK: u8 = 0xff;

/// The major type of a _CBOR_ data item, section `3.1` of [RFC 8949][1].
///
/// [1]: <https://www.rfc-editor.org/rfc/rfc8949.html>
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Major {
    /// An unsigned integer (major type 0).
    Unsigned,
    /// A negative integer (major type 1).
    Negative,
    /// A byte string (major type 2).
    Bytes,
    /// A text string (major type 3).
    Text,
    /// An array of data items (major type 4).
    Array,
    /// A map of pairs of data items (major type 5).
    Map,
    /// A tagged data item (major type 6).
    Tag,
    /// Floating-point numbers and simple values (major type 7).
    Simple,
}

impl Major {
    fn from_initial_byte(initial_byte: u8) -> Self {
        match initial_byte >> 5 {
            0 => Major::Unsigned,
            1 => Major::Negative,
            2 => Major::Bytes,
            3 => Major::Text,
            4 => Major::Array,
            5 => Major::Map,
            6 => Major::Tag,
            // the shift leaves exactly 3 bits
            _ => Major::Simple,
        }
    }
}

/// Bookkeeping frame for [`Decoder::skip_value`].
///
/// Indefinite-length items can nest, so skipping needs a stack of open containers rather than a
/// plain remaining-items counter.
enum Pending {
    /// A definite-length container with the given number of unconsumed data items.
    Items(u64),
    /// An indefinite-length container, consumed until its break stop code.
    UntilBreak,
}

/// A streaming _CBOR_ decoder over a borrowed byte slice.
///
/// The decoder keeps a cursor into the input; every successfully decoded or skipped item advances
/// it. Nothing is copied out of the input until a concrete [`Value`] is materialized.
pub struct Decoder<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Decoder<'a> {
    /// Creates a new [`Decoder`] over the provided bytes.
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    /// The current byte offset into the input.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Returns `true` once the whole input has been consumed.
    pub fn is_at_end(&self) -> bool {
        self.pos == self.bytes.len()
    }

    /// Returns the initial byte of the next data item without consuming it.
    pub fn peek_initial_byte(&self) -> Result<u8> {
        self.bytes
            .get(self.pos)
            .copied()
            .ok_or_else(|| vderror::Error::root(CborError::UnexpectedEndOfInput))
    }

    /// Returns the [`Major`] type of the next data item without consuming it.
    pub fn peek_major(&self) -> Result<Major> {
        Ok(Major::from_initial_byte(self.peek_initial_byte()?))
    }

    /// If the next data item is tagged, returns the tag number without consuming anything.
    pub fn peek_tag(&self) -> Result<Option<u64>> {
        if self.peek_major()? != Major::Tag {
            return Ok(None);
        }

        // read the tag head on a scratch cursor so the item stays unconsumed
        let mut scratch = Decoder {
            bytes: self.bytes,
            pos: self.pos,
        };

        scratch.read_tag().map(Some)
    }

    /// Consumes the head of a tagged data item and returns the tag number.
    ///
    /// The tagged content is left unconsumed.
    pub fn read_tag(&mut self) -> Result<u64> {
        let head_offset = self.pos;
        let initial_byte = self.read_u8()?;

        if initial_byte >> 5 != 6 {
            return Err(self.error(head_offset, "a tagged data item"));
        }

        self.required_argument(initial_byte & 0x1f, head_offset, "a tag number")
    }

    /// Decodes one complete data item.
    pub fn decode_value(&mut self) -> Result<Value> {
        self.decode_value_at_depth(0)
    }

    /// Skips one complete data item without materializing it.
    ///
    /// Indefinite-length items are skipped through an explicit stack of open containers, so
    /// arbitrarily nested indefinite items terminate on the matching break stop code.
    pub fn skip_value(&mut self) -> Result<()> {
        let mut stack = vec![Pending::Items(1)];

        loop {
            match stack.last_mut() {
                None => break,
                Some(Pending::Items(0)) => {
                    stack.pop();
                    continue;
                }
                Some(Pending::Items(remaining)) => {
                    *remaining -= 1;
                }
                Some(Pending::UntilBreak) => {
                    if self.peek_initial_byte()? == BREAK {
                        self.pos += 1;
                        stack.pop();
                        continue;
                    }
                }
            }

            self.skip_head(&mut stack)?;
        }

        Ok(())
    }

    /// Consumes the head of the next data item, advancing past any immediate content and pushing
    /// the frames of opened containers onto the `stack`.
    fn skip_head(&mut self, stack: &mut Vec<Pending>) -> Result<()> {
        let head_offset = self.pos;
        let initial_byte = self.read_u8()?;
        let major = initial_byte >> 5;
        let info = initial_byte & 0x1f;

        match major {
            0 | 1 => {
                self.required_argument(info, head_offset, "an integer argument")?;
            }
            2 | 3 => match self.read_argument(info, head_offset)? {
                Some(length) => {
                    let length = self.cast_length(length)?;
                    self.take(length)?;
                }
                None => stack.push(Pending::UntilBreak),
            },
            4 => match self.read_argument(info, head_offset)? {
                Some(entries) => stack.push(Pending::Items(entries)),
                None => stack.push(Pending::UntilBreak),
            },
            5 => match self.read_argument(info, head_offset)? {
                Some(entries) => {
                    let items = entries
                        .checked_mul(2)
                        .ok_or_else(|| self.error(head_offset, "a map length in range"))?;
                    stack.push(Pending::Items(items));
                }
                None => stack.push(Pending::UntilBreak),
            },
            6 => {
                self.required_argument(info, head_offset, "a tag number")?;
                stack.push(Pending::Items(1));
            }
            // major type 7
            _ => match info {
                0..=23 => {}
                24 => {
                    self.read_u8()?;
                }
                25 => {
                    self.take(2)?;
                }
                26 => {
                    self.take(4)?;
                }
                27 => {
                    self.take(8)?;
                }
                31 => return Err(self.error(head_offset, "a data item (found lone break)")),
                _ => return Err(self.error(head_offset, "a well-formed argument encoding")),
            },
        }

        Ok(())
    }

    fn decode_value_at_depth(&mut self, depth: usize) -> Result<Value> {
        if depth > MAX_NESTING_DEPTH {
            return Err(vderror::Error::root(CborError::NestingTooDeep));
        }

        let head_offset = self.pos;
        let initial_byte = self.read_u8()?;
        let major = initial_byte >> 5;
        let info = initial_byte & 0x1f;

        match major {
            0 => {
                let argument = self.required_argument(info, head_offset, "an integer argument")?;
                Ok(Value::Integer(argument.into()))
            }
            1 => {
                let argument = self.required_argument(info, head_offset, "an integer argument")?;
                Ok(Value::Integer(-1 - i128::from(argument)))
            }
            2 => Ok(Value::Bytes(self.read_string(info, head_offset, 2)?)),
            3 => {
                let bytes = self.read_string(info, head_offset, 3)?;
                let text = String::from_utf8(bytes)
                    .map_err(|_| self.error(head_offset, "a valid UTF-8 text string"))?;
                Ok(Value::Text(text))
            }
            4 => self.decode_array(info, head_offset, depth),
            5 => self.decode_map(info, head_offset, depth),
            6 => {
                let tag = self.required_argument(info, head_offset, "a tag number")?;

                // The embedded-CBOR idiom: keep the whole tagged region as raw bytes and decode
                // the contents lazily on demand.
                if tag == EMBEDDED_CBOR_TAG && self.peek_major()? == Major::Bytes {
                    self.skip_value()?;
                    let raw = self.bytes[head_offset..self.pos].to_vec();
                    return Ok(Value::Encoded(RawCbor::from_tagged_bytes(raw)));
                }

                let value = self.decode_value_at_depth(depth + 1)?;
                Ok(Value::Tag(tag, Box::new(value)))
            }
            // major type 7
            _ => self.decode_simple(info, head_offset),
        }
    }

    fn decode_array(&mut self, info: u8, head_offset: usize, depth: usize) -> Result<Value> {
        let mut items = Vec::new();

        match self.read_argument(info, head_offset)? {
            Some(entries) => {
                // every data item takes at least one byte
                if entries > self.remaining() as u64 {
                    return Err(vderror::Error::root(CborError::UnexpectedEndOfInput));
                }

                items.reserve(self.cast_length(entries)?);
                for _ in 0..entries {
                    items.push(self.decode_value_at_depth(depth + 1)?);
                }
            }
            None => loop {
                if self.peek_initial_byte()? == BREAK {
                    self.pos += 1;
                    break;
                }
                items.push(self.decode_value_at_depth(depth + 1)?);
            },
        }

        Ok(Value::Array(items))
    }

    fn decode_map(&mut self, info: u8, head_offset: usize, depth: usize) -> Result<Value> {
        let mut entries = Vec::new();

        match self.read_argument(info, head_offset)? {
            Some(pairs) => {
                // every entry takes at least two bytes
                if pairs > (self.remaining() as u64) / 2 {
                    return Err(vderror::Error::root(CborError::UnexpectedEndOfInput));
                }

                entries.reserve(self.cast_length(pairs)?);
                for _ in 0..pairs {
                    let key = self.decode_value_at_depth(depth + 1)?;
                    let value = self.decode_value_at_depth(depth + 1)?;
                    entries.push((key, value));
                }
            }
            None => loop {
                if self.peek_initial_byte()? == BREAK {
                    self.pos += 1;
                    break;
                }
                let key = self.decode_value_at_depth(depth + 1)?;
                let value = self.decode_value_at_depth(depth + 1)?;
                entries.push((key, value));
            },
        }

        Ok(Value::Map(entries))
    }

    fn decode_simple(&mut self, info: u8, head_offset: usize) -> Result<Value> {
        match info {
            20 => Ok(Value::Bool(false)),
            21 => Ok(Value::Bool(true)),
            22 => Ok(Value::Null),
            // `undefined` is widened to null, the same way generic decoders treat it
            23 => Ok(Value::Null),
            25 => {
                let bytes = self.take(2)?;
                let half = u16::from_be_bytes([bytes[0], bytes[1]]);
                Ok(Value::Float(half_to_f64(half)))
            }
            26 => {
                let bytes = self.take(4)?;
                let single = f32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
                Ok(Value::Float(single.into()))
            }
            27 => {
                let bytes = self.take(8)?;
                let double = f64::from_be_bytes([
                    bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
                ]);
                Ok(Value::Float(double))
            }
            31 => Err(self.error(head_offset, "a data item (found lone break)")),
            _ => Err(self.error(head_offset, "a supported simple value")),
        }
    }

    /// Reads the content of a byte or text string, joining the chunks of an indefinite-length one.
    ///
    /// Chunks of an indefinite-length string must themselves be definite-length strings of the
    /// same major type, section `3.2.3` of [RFC 8949][1].
    ///
    /// [1]: <https://www.rfc-editor.org/rfc/rfc8949.html>
    fn read_string(&mut self, info: u8, head_offset: usize, major: u8) -> Result<Vec<u8>> {
        if let Some(length) = self.read_argument(info, head_offset)? {
            let length = self.cast_length(length)?;
            return Ok(self.take(length)?.to_vec());
        }

        let mut joined = Vec::new();

        loop {
            let chunk_offset = self.pos;
            let initial_byte = self.read_u8()?;

            if initial_byte == BREAK {
                break;
            }

            if initial_byte >> 5 != major {
                return Err(self.error(chunk_offset, "a string chunk of the same major type"));
            }

            let Some(length) = self.read_argument(initial_byte & 0x1f, chunk_offset)? else {
                return Err(self.error(chunk_offset, "a definite-length string chunk"));
            };
            let length = self.cast_length(length)?;

            joined.extend_from_slice(self.take(length)?);
        }

        Ok(joined)
    }

    /// Reads the argument of a data item head; [`None`] marks the indefinite-length form.
    fn read_argument(&mut self, info: u8, head_offset: usize) -> Result<Option<u64>> {
        match info {
            0..=23 => Ok(Some(info.into())),
            24 => Ok(Some(self.read_u8()?.into())),
            25 => {
                let bytes = self.take(2)?;
                Ok(Some(u16::from_be_bytes([bytes[0], bytes[1]]).into()))
            }
            26 => {
                let bytes = self.take(4)?;
                Ok(Some(
                    u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]).into(),
                ))
            }
            27 => {
                let bytes = self.take(8)?;
                Ok(Some(u64::from_be_bytes([
                    bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
                ])))
            }
            31 => Ok(None),
            _ => Err(self.error(head_offset, "a well-formed argument encoding")),
        }
    }

    /// Reads an argument for a head which does not permit the indefinite-length form.
    fn required_argument(
        &mut self,
        info: u8,
        head_offset: usize,
        expected: &'static str,
    ) -> Result<u64> {
        self.read_argument(info, head_offset)?
            .ok_or_else(|| self.error(head_offset, expected))
    }

    fn cast_length(&self, length: u64) -> Result<usize> {
        usize::try_from(length)
            .map_err(|_| vderror::Error::root(CborError::OutOfRange("length exceeds this platform")))
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    fn read_u8(&mut self) -> Result<u8> {
        let byte = self.peek_initial_byte()?;
        self.pos += 1;
        Ok(byte)
    }

    fn take(&mut self, length: usize) -> Result<&'a [u8]> {
        if length > self.remaining() {
            return Err(vderror::Error::root(CborError::UnexpectedEndOfInput));
        }

        let bytes = &self.bytes[self.pos..self.pos + length];
        self.pos += length;
        Ok(bytes)
    }

    fn error(&self, offset: usize, expected: &str) -> vderror::Error<CborError> {
        vderror::Error::root(CborError::Decoding(offset, expected.to_owned()))
    }
}

/// Widens an [IEEE 754][1] half-precision float to a double, following the decoding shown in the
/// Appendix D of [RFC 8949][2].
///
/// Subnormals (a zero exponent with a non-zero significand) scale the bare significand, while the
/// all-ones exponent maps to an infinity or NaN.
///
/// [1]: <https://ieeexplore.ieee.org/document/8766229>
/// [2]: <https://www.rfc-editor.org/rfc/rfc8949.html>
fn half_to_f64(half: u16) -> f64 {
    let exponent = (half >> 10) & 0x1f;
    let significand = f64::from(half & 0x3ff);

    let magnitude = match exponent {
        0 => significand * 2f64.powi(-24),
        31 => {
            if significand == 0.0 {
                f64::INFINITY
            } else {
                f64::NAN
            }
        }
        _ => (significand + 1024.0) * 2f64.powi(i32::from(exponent) - 25),
    };

    if half & 0x8000 != 0 {
        -magnitude
    } else {
        magnitude
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::cbor::from_slice;

    fn decode_hex(hex: &str) -> Value {
        from_slice(&hex::decode(hex).unwrap()).unwrap()
    }

    /// Floating point examples from the Appendix A of [RFC 8949][1], covering all three encoded
    /// precisions.
    ///
    /// [1]: <https://www.rfc-editor.org/rfc/rfc8949.html>
    #[test]
    fn test_float_vectors() {
        assert_eq!(decode_hex("f90000"), Value::Float(0.0));
        assert_eq!(decode_hex("f98000"), Value::Float(-0.0));
        assert_eq!(decode_hex("f93c00"), Value::Float(1.0));
        assert_eq!(decode_hex("f93e00"), Value::Float(1.5));
        assert_eq!(decode_hex("f97bff"), Value::Float(65504.0));
        assert_eq!(decode_hex("f9c400"), Value::Float(-4.0));
        assert_eq!(decode_hex("fa47c35000"), Value::Float(100000.0));
        assert_eq!(decode_hex("fb7e37e43c8800759c"), Value::Float(1.0e300));
        assert_eq!(decode_hex("fb3ff199999999999a"), Value::Float(1.1));
    }

    /// The smallest positive half-precision value is subnormal; its decoding exercises the
    /// zero-exponent path.
    #[test]
    fn test_half_precision_subnormal() {
        assert_eq!(decode_hex("f90001"), Value::Float(5.960464477539063e-8));
        assert_eq!(decode_hex("f90400"), Value::Float(0.00006103515625));
        assert_eq!(decode_hex("f98001"), Value::Float(-5.960464477539063e-8));
    }

    #[test]
    fn test_half_precision_nonfinite() {
        assert_eq!(decode_hex("f97c00"), Value::Float(f64::INFINITY));
        assert_eq!(decode_hex("f9fc00"), Value::Float(f64::NEG_INFINITY));

        let Value::Float(nan) = decode_hex("f97e00") else {
            unreachable!()
        };
        assert!(nan.is_nan());
    }

    #[test]
    fn test_truncated_input() {
        // array of 3 elements with only 2 present
        let err = from_slice(&hex::decode("830102").unwrap()).unwrap_err();
        assert_matches!(err.error, CborError::UnexpectedEndOfInput);

        // byte string shorter than its declared length
        let err = from_slice(&hex::decode("450102").unwrap()).unwrap_err();
        assert_matches!(err.error, CborError::UnexpectedEndOfInput);

        // missing argument bytes
        let err = from_slice(&hex::decode("19ff").unwrap()).unwrap_err();
        assert_matches!(err.error, CborError::UnexpectedEndOfInput);

        // empty input
        let err = from_slice(&[]).unwrap_err();
        assert_matches!(err.error, CborError::UnexpectedEndOfInput);
    }

    #[test]
    fn test_malformed_input_reports_offset() {
        // a lone break stop code is not a data item
        let err = from_slice(&hex::decode("ff").unwrap()).unwrap_err();
        assert_matches!(err.error, CborError::Decoding(0, _));

        // reserved additional information values 28-30
        let err = from_slice(&hex::decode("1c").unwrap()).unwrap_err();
        assert_matches!(err.error, CborError::Decoding(0, _));

        // break nested behind a valid prefix reports the inner offset
        let err = from_slice(&hex::decode("8201ff").unwrap()).unwrap_err();
        assert_matches!(err.error, CborError::Decoding(2, _));

        // indefinite-length integers do not exist
        let err = from_slice(&hex::decode("1f").unwrap()).unwrap_err();
        assert_matches!(err.error, CborError::Decoding(0, _));
    }

    #[test]
    fn test_invalid_utf8_text() {
        let err = from_slice(&hex::decode("62c328").unwrap()).unwrap_err();
        assert_matches!(err.error, CborError::Decoding(0, expected) if expected.contains("UTF-8"));
    }

    #[test]
    fn test_indefinite_chunks_must_match_major_type() {
        // indefinite byte string with a text chunk
        let err = from_slice(&hex::decode("5f6161ff").unwrap()).unwrap_err();
        assert_matches!(err.error, CborError::Decoding(1, _));

        // indefinite text string with a nested indefinite chunk
        let err = from_slice(&hex::decode("7f7f6161ffff").unwrap()).unwrap_err();
        assert_matches!(err.error, CborError::Decoding(1, _));
    }

    #[test]
    fn test_peek_does_not_consume() {
        let bytes = hex::decode("c074323032312d30352d30385432303a32303a30325a").unwrap();
        let decoder = Decoder::new(&bytes);

        assert_eq!(decoder.peek_major().unwrap(), Major::Tag);
        assert_eq!(decoder.peek_tag().unwrap(), Some(0));
        assert_eq!(decoder.position(), 0);

        let mut decoder = Decoder::new(&bytes);
        let value = decoder.decode_value().unwrap();
        assert_matches!(value, Value::Tag(0, _));
        assert!(decoder.is_at_end());
    }

    #[test]
    fn test_peek_tag_on_untagged() {
        let bytes = hex::decode("01").unwrap();
        let decoder = Decoder::new(&bytes);

        assert_eq!(decoder.peek_tag().unwrap(), None);
        assert_eq!(decoder.peek_major().unwrap(), Major::Unsigned);
    }

    #[test]
    fn test_skip_value() {
        // {_ "a": [_ 1, h'0203'], "b": {"c": 3}} followed by 143
        let bytes = hex::decode("bf61619f01420203ff6162a1616303ff188f").unwrap();
        let mut decoder = Decoder::new(&bytes);

        decoder.skip_value().unwrap();
        assert_eq!(decoder.decode_value().unwrap(), Value::Integer(143));
        assert!(decoder.is_at_end());
    }

    #[test]
    fn test_skip_indefinite_nesting() {
        // [_ 1, [_ 2, [_ 3]]] followed by one more item
        let bytes = hex::decode("9f019f029f03ffffff05").unwrap();
        let mut decoder = Decoder::new(&bytes);

        decoder.skip_value().unwrap();
        assert_eq!(decoder.decode_value().unwrap(), Value::Integer(5));
        assert!(decoder.is_at_end());
    }

    #[test]
    fn test_skip_embedded_and_tagged() {
        // embedded CBOR region followed by a tagged date and an integer
        let bytes = hex::decode("d8184401020304c074323032302d31302d30315431333a33303a30325a0f")
            .unwrap();
        let mut decoder = Decoder::new(&bytes);

        decoder.skip_value().unwrap();
        decoder.skip_value().unwrap();
        assert_eq!(decoder.decode_value().unwrap(), Value::Integer(15));
        assert!(decoder.is_at_end());
    }

    #[test]
    fn test_skip_truncated_fails() {
        let bytes = hex::decode("9f01").unwrap();
        let mut decoder = Decoder::new(&bytes);

        let err = decoder.skip_value().unwrap_err();
        assert_matches!(err.error, CborError::UnexpectedEndOfInput);
    }

    #[test]
    fn test_nesting_depth_limit() {
        // 200 nested arrays of one element
        let mut bytes = vec![0x81u8; 200];
        bytes.push(0x01);

        let err = from_slice(&bytes).unwrap_err();
        assert_matches!(err.error, CborError::NestingTooDeep);
    }

    #[test]
    fn test_oversized_array_length_rejected_early() {
        // array claiming 2^32 elements with no content; must not attempt a huge allocation
        let err = from_slice(&hex::decode("9b0000000100000000").unwrap()).unwrap_err();
        assert_matches!(err.error, CborError::UnexpectedEndOfInput);
    }

    #[test]
    fn test_undefined_decodes_as_null() {
        assert_eq!(decode_hex("f7"), Value::Null);
    }
}
