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

//! `COSE_Key` handling as defined in [RFC 9052][1], limited to the `EC2` keys over the `P-256`
//! curve used for `mdoc` device keys.
//!
//! [1]: <https://datatracker.ietf.org/doc/rfc9052/>

use vd_sig_utils::{ec_public_affine_coords_to_jwk, JwkPublic};

use crate::{
    cbor::{self, AsCborValue, CborError, Value},
    error::{MdocError, Result},
    utils::base64::base64_url_decode,
};

/// The default `kid` value of the Device's public key.
const DEFAULT_DEVICE_KID: &str = "device_kid";

/// The `kty` key parameter label.
const KEY_LABEL_KTY: i128 = 1;
/// The `kty` value designating an elliptic curve key with x/y coordinates.
const KTY_EC2: i128 = 2;
/// The `crv` parameter label of an `EC2` key.
const EC2_LABEL_CRV: i128 = -1;
/// The `crv` value designating the `P-256` curve.
const EC2_CRV_P256: i128 = 1;
/// The `x` coordinate parameter label of an `EC2` key.
const EC2_LABEL_X: i128 = -2;
/// The `y` coordinate parameter label of an `EC2` key.
const EC2_LABEL_Y: i128 = -3;

/// A `COSE_Key` structure.
///
/// Only the `kty` parameter is interpreted structurally; the remaining parameters are carried
/// as labelled values with their order preserved, the way they appeared on the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct CoseKey {
    /// The `kty` (key type) parameter.
    pub kty: i128,
    /// The remaining key parameters.
    pub params: Vec<(Value, Value)>,
}

impl CoseKey {
    /// Creates a new `EC2` public key over the `P-256` curve from its affine coordinates.
    pub fn new_ec2_p256(x: Vec<u8>, y: Vec<u8>) -> Self {
        Self {
            kty: KTY_EC2,
            params: vec![
                (Value::Integer(EC2_LABEL_CRV), Value::Integer(EC2_CRV_P256)),
                (Value::Integer(EC2_LABEL_X), Value::Bytes(x)),
                (Value::Integer(EC2_LABEL_Y), Value::Bytes(y)),
            ],
        }
    }

    /// Method for creating a [`CoseKey`] out of a `JWK`. For now we only support EC keys. For
    /// more details on `COSE_Key` specifications look
    /// [here](https://datatracker.ietf.org/doc/html/rfc9052#section-7).
    pub fn from_jwk(jwk: &serde_json::Map<String, serde_json::Value>) -> Result<Self> {
        matches(jwk, "kty", "EC")?;
        matches(jwk, "crv", "P-256")?;

        let x = extract_coord(jwk, "x")?;
        let y = extract_coord(jwk, "y")?;

        Ok(Self::new_ec2_p256(x, y))
    }

    /// Converts the [`CoseKey`] to a JWK.
    ///
    /// It currently supports only the `EC` keys and `P-256` curve.
    pub fn to_jwk(&self) -> Result<JwkPublic> {
        if self.kty != KTY_EC2 {
            return Err(vderror::Error::root(MdocError::CoseKeyToJwk(
                "only EC keys are supported".to_owned(),
            )));
        }

        let curve = self.param(EC2_LABEL_CRV).and_then(Value::as_integer);
        if curve != Some(EC2_CRV_P256) {
            return Err(vderror::Error::root(MdocError::CoseKeyToJwk(
                "only P-256 curve is supported".to_owned(),
            )));
        }

        let x = self.ec_coord(EC2_LABEL_X, "x")?;
        let y = self.ec_coord(EC2_LABEL_Y, "y")?;

        Ok(ec_public_affine_coords_to_jwk(
            x,
            y,
            Some(DEFAULT_DEVICE_KID),
        ))
    }

    /// Re-order the contents of the key lexicographically, as per `Section 4.2.1` of the
    /// `RFC 8949` (_Core Deterministic Encoding Requirements_).
    pub fn canonicalize(&mut self) {
        self.params.sort_by_cached_key(|(label, _)| {
            // `unwrap_or_default` never triggers for labels produced by the decoder
            cbor::to_vec(label).unwrap_or_default()
        });
    }

    /// Returns the param with the given integer label, or [`None`].
    ///
    /// If there are multiple entries with the given label, only the first one is returned.
    fn param(&self, label: i128) -> Option<&Value> {
        self.params.iter().find_map(|(entry_label, value)| {
            matches!(entry_label, Value::Integer(int) if *int == label).then_some(value)
        })
    }

    /// Returns an `EC` coordinate parameter, which **MUST BE** a 32-byte vector.
    fn ec_coord(&self, label: i128, name: &'static str) -> Result<&[u8; 32]> {
        let value = self.param(label).ok_or_else(|| {
            vderror::Error::root(MdocError::CoseKeyToJwk(format!(
                "key param {name} not found"
            )))
        })?;

        let Value::Bytes(bytes) = value else {
            return Err(vderror::Error::root(MdocError::CoseKeyToJwk(format!(
                "{name} parameter MUST BE bytes"
            ))));
        };

        bytes.as_slice().try_into().map_err(|_| {
            vderror::Error::root(MdocError::CoseKeyToJwk(format!(
                "{name} MUST HAVE 32 bytes"
            )))
        })
    }
}

impl AsCborValue for CoseKey {
    fn from_cbor_value(value: Value) -> cbor::Result<Self> {
        let mut entries = match value {
            Value::Map(entries) => entries,
            other => {
                return Err(vderror::Error::root(CborError::UnexpectedItem(
                    other.kind(),
                    "a COSE_Key map",
                )))
            }
        };

        let kty_index = entries
            .iter()
            .position(|(label, _)| matches!(label, Value::Integer(int) if *int == KEY_LABEL_KTY))
            .ok_or_else(|| vderror::Error::root(CborError::MissingField("kty")))?;

        let (_, kty_value) = entries.remove(kty_index);
        let kty = kty_value
            .as_integer()
            .ok_or_else(|| vderror::Error::root(CborError::UnexpectedItem("value", "a kty label")))?;

        Ok(Self {
            kty,
            params: entries,
        })
    }

    fn to_cbor_value(&self) -> cbor::Result<Value> {
        let mut entries = Vec::with_capacity(self.params.len() + 1);

        entries.push((Value::Integer(KEY_LABEL_KTY), Value::Integer(self.kty)));
        entries.extend(self.params.iter().cloned());

        Ok(Value::Map(entries))
    }
}

/// Check if JWK has expected values for specific keys.
fn matches(
    jwk: &serde_json::Map<String, serde_json::Value>,
    key: &'static str,
    expected_value: &'static str,
) -> Result<()> {
    if jwk.get(key).is_some_and(|value| value != expected_value) {
        return Err(vderror::Error::root(MdocError::JwkToCoseKey(format!(
            "Expected key {key} with value {expected_value}"
        ))));
    }

    Ok(())
}

/// Extract coordinates from JWK.
fn extract_coord(
    jwk: &serde_json::Map<String, serde_json::Value>,
    coord_key: &'static str,
) -> Result<Vec<u8>> {
    let coord = jwk
        .get(coord_key)
        .and_then(|coord| coord.as_str())
        .ok_or_else(|| {
            vderror::Error::root(MdocError::JwkToCoseKey(format!(
                "Missing coordinate {coord_key} of type String"
            )))
        })?;

    base64_url_decode(coord).map_err(|_| {
        vderror::Error::root(MdocError::JwkToCoseKey(format!(
            "Failed to decode coordinate {coord_key}"
        )))
    })
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::MdocError;

    #[test]
    fn cose_key_from_ec_jwk() {
        let jwk = serde_json::json!({
            "kty":"EC",
            "crv":"P-256",
            "x":"MKBCTNIcKUSDii11ySs3526iDZ8AiTo7Tu6KPAqv7D4",
            "y":"4Etl6SRW2YiLUrN5vfvVHuhp7x8PxltmWWlbbM4IFyM",
            "use":"enc",
            "kid":"1",
        })
        .as_object()
        .cloned()
        .unwrap();

        assert_matches!(CoseKey::from_jwk(&jwk), Ok(_));
    }

    #[test]
    fn cose_key_from_rsa_jwk() {
        let jwk = serde_json::json!({
            "kty":"RSA",
            "n": "0vx7agoebGcQSuuPiLJXZptN9nndrQmbXEps2aiAFbWhM78LhWx",
            "e":"AQAB",
            "alg":"RS256",
            "kid":"2011-04-29"
        })
        .as_object()
        .cloned()
        .unwrap();

        assert!(
            matches!(CoseKey::from_jwk(&jwk).unwrap_err().error, MdocError::JwkToCoseKey(msg) if msg == "Expected key kty with value EC"),
            "We currently only support EC keys"
        );
    }

    #[test]
    fn cose_key_jwk_roundtrip() {
        let jwk = serde_json::json!({
            "kty":"EC",
            "crv":"P-256",
            "x":"MKBCTNIcKUSDii11ySs3526iDZ8AiTo7Tu6KPAqv7D4",
            "y":"4Etl6SRW2YiLUrN5vfvVHuhp7x8PxltmWWlbbM4IFyM",
        })
        .as_object()
        .cloned()
        .unwrap();

        let cose_key = CoseKey::from_jwk(&jwk).unwrap();
        let jwk_back = cose_key.to_jwk().unwrap();

        assert_eq!(jwk.get("x"), jwk_back.get("x"));
        assert_eq!(jwk.get("y"), jwk_back.get("y"));
        assert_eq!(jwk_back.get("kid").unwrap(), "device_kid");
    }

    #[test]
    fn cose_key_cbor_roundtrip() {
        let key = CoseKey::new_ec2_p256(vec![1u8; 32], vec![2u8; 32]);

        let bytes = key.to_vec().unwrap();
        let decoded = CoseKey::from_slice(&bytes).unwrap();

        assert_eq!(key, decoded);
    }

    #[test]
    fn cose_key_canonicalize_orders_params() {
        let mut key = CoseKey {
            kty: KTY_EC2,
            params: vec![
                (Value::Integer(EC2_LABEL_Y), Value::Bytes(vec![2u8; 32])),
                (Value::Integer(EC2_LABEL_X), Value::Bytes(vec![1u8; 32])),
                (Value::Integer(EC2_LABEL_CRV), Value::Integer(EC2_CRV_P256)),
            ],
        };

        key.canonicalize();

        let labels: Vec<_> = key
            .params
            .iter()
            .map(|(label, _)| label.as_integer().unwrap())
            .collect();
        assert_eq!(labels, vec![EC2_LABEL_CRV, EC2_LABEL_X, EC2_LABEL_Y]);
    }

    #[test]
    fn cose_key_to_jwk_rejects_wrong_curve() {
        let key = CoseKey {
            kty: KTY_EC2,
            params: vec![
                // P-384
                (Value::Integer(EC2_LABEL_CRV), Value::Integer(2)),
                (Value::Integer(EC2_LABEL_X), Value::Bytes(vec![1u8; 48])),
                (Value::Integer(EC2_LABEL_Y), Value::Bytes(vec![2u8; 48])),
            ],
        };

        let err = key.to_jwk().unwrap_err();
        assert_matches!(err.error, MdocError::CoseKeyToJwk(msg) if msg.contains("P-256"));
    }
}
