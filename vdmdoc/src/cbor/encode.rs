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

use super::{CborError, Result, Value};

pub(crate) const MAJOR_UNSIGNED: u8 = 0;
pub(crate) const MAJOR_NEGATIVE: u8 = 1;
pub(crate) const MAJOR_BYTES: u8 = 2;
pub(crate) const MAJOR_TEXT: u8 = 3;
pub(crate) const MAJOR_ARRAY: u8 = 4;
pub(crate) const MAJOR_MAP: u8 = 5;
pub(crate) const MAJOR_TAG: u8 = 6;

const SIMPLE_FALSE: u8 = 0xf4;
const SIMPLE_TRUE: u8 = 0xf5;
const SIMPLE_NULL: u8 = 0xf6;
const DOUBLE_PRECISION: u8 = 0xfb;

/// Writes the head of a data item with the minimal-width argument encoding, as required by the
/// deterministic encoding rules of section `4.2.1` of [RFC 8949][1].
///
/// [1]: <https://www.rfc-editor.org/rfc/rfc8949.html>
pub(crate) fn write_head(out: &mut Vec<u8>, major: u8, argument: u64) {
    let major = major << 5;

    if argument < 24 {
        out.push(major | argument as u8);
    } else if argument <= u8::MAX.into() {
        out.push(major | 24);
        out.push(argument as u8);
    } else if argument <= u16::MAX.into() {
        out.push(major | 25);
        out.extend_from_slice(&(argument as u16).to_be_bytes());
    } else if argument <= u32::MAX.into() {
        out.push(major | 26);
        out.extend_from_slice(&(argument as u32).to_be_bytes());
    } else {
        out.push(major | 27);
        out.extend_from_slice(&argument.to_be_bytes());
    }
}

/// Writes a complete data item.
///
/// Collections are always written with definite lengths and map entry order is preserved as
/// given, so the output for a given [`Value`] is deterministic.  Floats are always written in
/// double precision.  [`Encoded`][Value::Encoded] regions are copied verbatim.
pub(crate) fn write_value(out: &mut Vec<u8>, value: &Value) -> Result<()> {
    match value {
        Value::Integer(int) => write_integer(out, *int)?,
        Value::Bytes(bytes) => {
            write_head(out, MAJOR_BYTES, bytes.len() as u64);
            out.extend_from_slice(bytes);
        }
        Value::Text(text) => {
            write_head(out, MAJOR_TEXT, text.len() as u64);
            out.extend_from_slice(text.as_bytes());
        }
        Value::Array(items) => {
            write_head(out, MAJOR_ARRAY, items.len() as u64);
            for item in items {
                write_value(out, item)?;
            }
        }
        Value::Map(entries) => {
            write_head(out, MAJOR_MAP, entries.len() as u64);
            for (key, item) in entries {
                write_value(out, key)?;
                write_value(out, item)?;
            }
        }
        Value::Bool(false) => out.push(SIMPLE_FALSE),
        Value::Bool(true) => out.push(SIMPLE_TRUE),
        Value::Null => out.push(SIMPLE_NULL),
        Value::Float(float) => {
            out.push(DOUBLE_PRECISION);
            out.extend_from_slice(&float.to_be_bytes());
        }
        Value::Tag(tag, value) => {
            write_head(out, MAJOR_TAG, *tag);
            write_value(out, value)?;
        }
        Value::Encoded(raw) => out.extend_from_slice(raw.as_bytes()),
    }

    Ok(())
}

fn write_integer(out: &mut Vec<u8>, int: i128) -> Result<()> {
    if int >= 0 {
        let argument = u64::try_from(int)
            .map_err(|_| vderror::Error::root(CborError::OutOfRange("integer exceeds 64 bits")))?;
        write_head(out, MAJOR_UNSIGNED, argument);
    } else {
        let argument = u64::try_from(-1 - int)
            .map_err(|_| vderror::Error::root(CborError::OutOfRange("integer exceeds 64 bits")))?;
        write_head(out, MAJOR_NEGATIVE, argument);
    }

    Ok(())
}
