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

use serde_json::{value::Number as JsonNumber, Value as JsonValue};

use crate::cbor::Value as CborValue;

/// Consumes the provided CBOR value and returns the owned underlying `String`,
/// or [`None`].
fn cbor_text_into_string(cbor: CborValue) -> Option<String> {
    if let CborValue::Text(text) = cbor {
        Some(text)
    } else {
        None
    }
}

/// Converts the CBOR value into JSON value.
///
/// If the value can not be converted, [`None`] is returned. The value can not be converted if the
/// CBOR numbers do not fit into JSON numbers, or the CBOR `map` has non-`string` keys.
///
/// Tags are transparent for this conversion, and an embedded CBOR region converts as its
/// embedded value.
pub fn cbor_to_json(cbor: CborValue) -> Option<JsonValue> {
    Some(match cbor {
        CborValue::Null => JsonValue::Null,
        CborValue::Bool(boolean) => JsonValue::Bool(boolean),
        CborValue::Text(string) => JsonValue::String(string),
        CborValue::Integer(int) => JsonValue::Number({
            if let Ok(int) = u64::try_from(int) {
                JsonNumber::from(int)
            } else if let Ok(int) = i64::try_from(int) {
                JsonNumber::from(int)
            } else {
                JsonNumber::from_f64(int as f64)?
            }
        }),
        CborValue::Float(float) => JsonValue::Number(JsonNumber::from_f64(float)?),
        CborValue::Array(vec) => {
            JsonValue::Array(vec.into_iter().map(cbor_to_json).collect::<Option<_>>()?)
        }
        CborValue::Map(map) => JsonValue::Object(
            map.into_iter()
                .map(|(k, v)| Some((cbor_text_into_string(k)?, cbor_to_json(v)?)))
                .collect::<Option<_>>()?,
        ),
        CborValue::Bytes(bytes) => bytes.into(),
        CborValue::Tag(_, value) => cbor_to_json(*value)?,
        CborValue::Encoded(raw) => cbor_to_json(raw.decode().ok()?)?,
    })
}

/// Convert a [`serde_json::Value`] to a CBOR [`Value`][CborValue].
pub fn json_to_cbor(json: JsonValue) -> CborValue {
    match json {
        JsonValue::Null => CborValue::Null,
        JsonValue::Bool(boolean) => CborValue::Bool(boolean),
        JsonValue::String(string) => CborValue::Text(string),
        JsonValue::Number(number) => {
            if let Some(number) = number.as_u64() {
                CborValue::Integer(number.into())
            } else if let Some(number) = number.as_i64() {
                CborValue::Integer(number.into())
            } else if let Some(number) = number.as_f64() {
                CborValue::Float(number)
            } else {
                unreachable!()
            }
        }
        JsonValue::Array(vec) => CborValue::Array(vec.into_iter().map(json_to_cbor).collect()),
        JsonValue::Object(map) => CborValue::Map(
            map.into_iter()
                .map(|(k, v)| (CborValue::Text(k), json_to_cbor(v)))
                .collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cbor_to_json_scalars() {
        assert_eq!(cbor_to_json(CborValue::Null).unwrap(), JsonValue::Null);
        assert_eq!(
            cbor_to_json(CborValue::Bool(true)).unwrap(),
            JsonValue::Bool(true)
        );
        assert_eq!(
            cbor_to_json(CborValue::Integer(-5)).unwrap(),
            serde_json::json!(-5)
        );
        assert_eq!(
            cbor_to_json(CborValue::Text("x".to_owned())).unwrap(),
            serde_json::json!("x")
        );
    }

    #[test]
    fn test_cbor_to_json_tag_transparent() {
        let tagged = CborValue::Tag(1004, Box::new(CborValue::Text("2024-10-20".to_owned())));

        assert_eq!(cbor_to_json(tagged).unwrap(), serde_json::json!("2024-10-20"));
    }

    #[test]
    fn test_cbor_to_json_non_string_map_key_fails() {
        let map = CborValue::Map(vec![(CborValue::Integer(1), CborValue::Bool(true))]);

        assert_eq!(cbor_to_json(map), None);
    }

    #[test]
    fn test_json_to_cbor_roundtrip() {
        let json = serde_json::json!({
            "name": "John",
            "age": 42,
            "tags": ["a", "b"],
            "nested": { "ok": true },
        });

        let cbor = json_to_cbor(json.clone());
        let back = cbor_to_json(cbor).unwrap();

        assert_eq!(json, back);
    }
}
