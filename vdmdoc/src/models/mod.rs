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

//! This module defines the core data types & functions used in the crate to implement the
//! [ISO/IEC 18013-5:2021][1] standard.
//!
//! This is the main module for various models that represent the core concepts and data
//! structures involved in the retrieval and verification of mobile driving licenses (mDLs) and
//! other `mso_mdoc` Credentials.  Essentially, this module implements the verification-relevant
//! data model of the [ISO/IEC 18013-5:2021][1] standard, but modified to work with OpenID for
//! [Verifiable Presentations][2].
//!
//! [1]: <https://www.iso.org/standard/69084.html>
//! [2]: <https://openid.net/specs/openid-4-verifiable-presentations-1_0.html>

pub mod common;
pub mod device_auth;
pub mod document;
pub mod issuer_auth;

use std::collections::HashMap;
use std::str::FromStr;

use chrono::{Timelike as _, Utc};
use hex::FromHexError;
use rand::Rng;
use vderror::traits::{ErrorContext as _, ForeignError as _};

use crate::{
    cbor::{AsCborValue, CborError, Value},
    utils::{json::cbor_to_json, rand::generate_salt},
    MdocError,
};

use common::{DataElementIdentifier, DataElementValue, NameSpace};
pub use document::DeviceResponse;

/// A _CBOR_ tag value for date-time as specified in [RFC 8949][1] which is used by [ISO/IEC
/// 18013-5:2021][2].
///
/// [1]: <https://datatracker.ietf.org/doc/html/rfc8949#name-standard-date-time-string>
/// [2]: <https://www.iso.org/standard/69084.html>
const MDOC_TDATE_CBOR_TAG: u64 = 0;

/// A _CBOR_ _byte string_.
#[derive(Debug, Clone, PartialEq)]
pub struct Bytes(pub(crate) Vec<u8>);

impl Bytes {
    /// Decode a hex string into [`Bytes`].
    pub fn from_hex(value: &str) -> Result<Self, FromHexError> {
        let value = hex::decode(value)?;
        Ok(Self(value))
    }

    /// Generate [`Bytes`] to be used as a salt value.
    pub fn random_salt<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let salt = generate_salt(rng);
        Self(salt)
    }

    /// Access the underlying bytes.
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }
}

impl FromStr for Bytes {
    type Err = FromHexError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::from_hex(value)
    }
}

impl From<Vec<u8>> for Bytes {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl AsCborValue for Bytes {
    fn from_cbor_value(value: Value) -> crate::cbor::Result<Self> {
        match value {
            Value::Bytes(bytes) => Ok(Self(bytes)),
            other => Err(vderror::Error::root(CborError::UnexpectedItem(
                other.kind(),
                "a byte string",
            ))),
        }
    }

    fn to_cbor_value(&self) -> crate::cbor::Result<Value> {
        Ok(Value::Bytes(self.0.clone()))
    }
}

/// A `tdate` _CBOR_ type, as defined in the section `7.2.1` of the [ISO/IEC 18013-5:2021][1].
///
/// The following requirements apply to the representation of [`DateTime`]:
/// - fraction of seconds is not used;
/// - no local offset from UTC is used, as indicated by setting the `time-offset` defined in
///   [RFC 3339][2] to `"Z"`.
///
/// [1]: <https://www.iso.org/standard/69084.html>
/// [2]: <https://datatracker.ietf.org/doc/html/rfc3339>
#[derive(Debug, Clone, PartialEq)]
pub struct DateTime(pub(crate) chrono::DateTime<Utc>);

impl DateTime {
    /// The timestamp in seconds since the epoch.
    pub fn timestamp(&self) -> i64 {
        self.0.timestamp()
    }
}

impl FromStr for DateTime {
    type Err = vderror::Error<MdocError>;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let date_time = chrono::DateTime::parse_from_rfc3339(value)
            .foreign_err(|| MdocError::InvalidDateTime)
            .ctx(|| format!("{value} not a valid Date Time string"))?;

        if date_time.offset().utc_minus_local() != 0 {
            return Err(vderror::Error::root(MdocError::InvalidDateTime)
                .ctx("Date Time is not in UTC (offset must be Z)"));
        }

        let date_time = date_time.with_timezone(&Utc);

        DateTime::try_from(date_time)
    }
}

impl TryFrom<u64> for DateTime {
    type Error = vderror::Error<MdocError>;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        let value_i64 = value
            .try_into()
            .foreign_err(|| MdocError::InvalidDateTime)
            .ctx(|| format!("{value} seconds do not fit into i64"))?;

        let date_time = chrono::DateTime::from_timestamp(value_i64, 0).ok_or_else(|| {
            vderror::Error::root(MdocError::InvalidDateTime)
                .ctx(format!("{value} seconds out of range"))
        })?;

        DateTime::try_from(date_time)
    }
}

impl TryFrom<chrono::DateTime<Utc>> for DateTime {
    type Error = vderror::Error<MdocError>;

    fn try_from(value: chrono::DateTime<Utc>) -> Result<Self, Self::Error> {
        // ISO/IEC 18013-5:2021: "fraction of seconds shall not be used"
        if value.nanosecond() != 0 {
            return Err(vderror::Error::root(MdocError::InvalidDateTime)
                .ctx("Date Time should not use fraction of seconds"));
        }

        Ok(Self(value))
    }
}

impl From<DateTime> for chrono::DateTime<Utc> {
    fn from(date_time: DateTime) -> Self {
        date_time.0
    }
}

impl AsCborValue for DateTime {
    fn from_cbor_value(value: Value) -> crate::cbor::Result<Self> {
        let Value::Tag(MDOC_TDATE_CBOR_TAG, value) = value else {
            return Err(vderror::Error::root(CborError::UnexpectedItem(
                "value",
                "`tdate` tagged with 0",
            )));
        };

        let Value::Text(text) = *value else {
            return Err(vderror::Error::root(CborError::UnexpectedItem(
                "value",
                "a `tdate` text string",
            )));
        };

        text.parse::<DateTime>().map_err(|_| {
            vderror::Error::root(CborError::UnexpectedItem(
                "text string",
                "an RFC 3339 UTC date-time without fractional seconds",
            ))
        })
    }

    fn to_cbor_value(&self) -> crate::cbor::Result<Value> {
        let text = self.0.to_rfc3339_opts(chrono::SecondsFormat::Secs, true);

        Ok(Value::Tag(MDOC_TDATE_CBOR_TAG, Box::new(Value::Text(text))))
    }
}

/// Claims of the respective [`Document`][document::Document].
///
/// This just wraps the
/// [`HashMap<NameSpace, HashMap<DataElementIdentifier, DataElementValue>>`],
/// providing the [`into_json`][Claims::into_json] functionality.
#[derive(Debug, Clone, PartialEq)]
pub struct Claims(pub HashMap<NameSpace, HashMap<DataElementIdentifier, DataElementValue>>);

impl Claims {
    /// Converts the [`Claims`] into JSON object.
    ///
    /// If the `claims` can not be converted, [`None`] is returned. That is the
    /// case when CBOR numbers do not fit into JSON numbers, or the CBOR `map`
    /// contains non-`string` keys, which should almost never happen in
    /// practice.
    pub fn into_json(self) -> Option<serde_json::Map<String, serde_json::Value>> {
        self.0
            .into_iter()
            .map(|(k, v)| {
                // convert `HashMap<DataElementIdentifier, DataElementValue>`
                // into JSON object
                let v_json = serde_json::Value::Object(
                    v.into_iter()
                        .map(|(k, v)| Some((k.0, cbor_to_json(v.0)?)))
                        .collect::<Option<_>>()?,
                );

                Some((k.0, v_json))
            })
            .collect::<Option<_>>()
    }

    /// Returns `true` when no data elements are present.
    pub fn is_empty(&self) -> bool {
        self.0.values().all(HashMap::is_empty)
    }
}

/// Claims borrowed from the respective [`document::IssuerSigned`].
///
/// This just wraps the
/// [`HashMap<&NameSpace, HashMap<&DataElementIdentifier, &DataElementValue>>`].
pub struct BorrowedClaims<'a>(
    pub HashMap<&'a NameSpace, HashMap<&'a DataElementIdentifier, &'a DataElementValue>>,
);

impl BorrowedClaims<'_> {
    /// Converts `self` into [`Claims`] by cloning all the underlying claims.
    pub fn into_claims(self) -> Claims {
        Claims(
            self.0
                .into_iter()
                .map(|(k, v)| {
                    let v_owned = v.into_iter().map(|(k, v)| (k.clone(), v.clone())).collect();
                    (k.clone(), v_owned)
                })
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::cbor::{from_slice, to_vec};

    #[test]
    fn test_datetime_success() {
        const EXPECTED_CBOR: &str = "c074323032302d31302d30315431333a33303a30325a";

        let date_time: DateTime = "2020-10-01T13:30:02Z".parse().unwrap();

        let encoded = date_time.to_vec().unwrap();
        let encoded_hex = hex::encode(&encoded);

        assert_eq!(EXPECTED_CBOR, encoded_hex);

        let decoded = DateTime::from_slice(&encoded).unwrap();

        assert_eq!(date_time, decoded);
    }

    #[test]
    fn test_datetime_sub_secs_fails() {
        // 50 seconds success
        let dt = "1985-04-12T23:20:50Z";

        let _date_time: DateTime = dt.parse().unwrap();

        // 50.52 seconds should fail
        let dt = "1985-04-12T23:20:50.52Z";

        let err = dt.parse::<DateTime>().unwrap_err();
        assert_matches!(err.error, MdocError::InvalidDateTime);
    }

    #[test]
    fn test_datetime_non_utc_fails() {
        // UTC (Z) success
        let dt = "1996-12-19T16:39:57Z";

        let _date_time: DateTime = dt.parse().unwrap();

        // -08:00 from UTC (Pacific Standard Time) should fail
        let dt = "1996-12-19T16:39:57-08:00";

        let err = dt.parse::<DateTime>().unwrap_err();
        assert_matches!(err.error, MdocError::InvalidDateTime);
    }

    #[test]
    fn test_cbor_tdate_untagged_fails() {
        // untagged 2020-10-01T13:30:02Z
        const UNTAGGED_TDATE_CBOR: &str = "74323032302d31302d30315431333a33303a30325a";

        let data = hex::decode(UNTAGGED_TDATE_CBOR).unwrap();

        let err = DateTime::from_slice(&data).unwrap_err();
        assert_matches!(err.error, CborError::UnexpectedItem(_, _));
    }

    #[test]
    fn test_bytes_from_hex() {
        let bytes = Bytes::from_hex("f4b65b3379407aa9a0390309b792344c").unwrap();
        assert_eq!(bytes.as_slice().len(), 16);

        let value = bytes.to_cbor_value().unwrap();
        assert_matches!(value, Value::Bytes(_));
    }

    #[test]
    fn test_bytes_roundtrip() {
        let bytes = Bytes(vec![1, 2, 3]);

        let encoded = to_vec(&bytes.to_cbor_value().unwrap()).unwrap();
        let decoded = Bytes::from_cbor_value(from_slice(&encoded).unwrap()).unwrap();

        assert_eq!(bytes, decoded);
    }

    #[test]
    fn test_claims_into_json() {
        let claims = Claims(HashMap::from([(
            "org.iso.18013.5.1".into(),
            HashMap::from([
                ("family_name".into(), "Doe".into()),
                ("age_over_18".into(), true.into()),
            ]),
        )]));

        let json = claims.into_json().unwrap();
        let namespace = json.get("org.iso.18013.5.1").unwrap();

        assert_eq!(namespace.get("family_name").unwrap(), "Doe");
        assert_eq!(namespace.get("age_over_18").unwrap(), true);
    }
}
