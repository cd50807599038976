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

//! This module implements the `COSE_Sign1` and `COSE_Mac0` envelopes of [RFC 9052][1], restricted
//! to the subset used by the [ISO/IEC 18013-5:2021][2] standard.
//!
//! The protected header of a decoded envelope keeps its original serialized bytes.  Signatures
//! and MAC tags are computed over those exact bytes, so the envelopes reconstruct their
//! `Sig_structure`/`MAC_structure` byte-for-byte regardless of how a third-party encoder chose to
//! serialize the header map.
//!
//! [1]: <https://datatracker.ietf.org/doc/rfc9052/>
//! [2]: <https://www.iso.org/standard/69084.html>

mod key;

pub use key::CoseKey;

use vd_sig_utils::SigningAlgorithm;
use vderror::traits::PropagateError as _;

use crate::cbor::{self, AsCborValue, CborError, Value};

/// The header parameter label of the `alg` element, per the [IANA COSE registry][1].
///
/// [1]: <https://www.iana.org/assignments/cose/cose.xhtml#header-parameters>
const HEADER_LABEL_ALG: i128 = 1;

/// The header parameter label of the `x5chain` element, per [RFC 9360][1].
///
/// [1]: <https://www.rfc-editor.org/rfc/rfc9360.html>
pub(crate) const HEADER_LABEL_X5CHAIN: i128 = 33;

/// The context string of the `Sig_structure` for a `COSE_Sign1`, section `4.4` of [RFC 9052][1].
///
/// [1]: <https://datatracker.ietf.org/doc/rfc9052/>
const CONTEXT_SIGNATURE1: &str = "Signature1";

/// The context string of the `MAC_structure` for a `COSE_Mac0`, section `6.3` of [RFC 9052][1].
///
/// [1]: <https://datatracker.ietf.org/doc/rfc9052/>
const CONTEXT_MAC0: &str = "MAC0";

/// Error type of the COSE envelope model.
#[derive(strum_macros::Display, Debug, PartialEq, Clone)]
pub enum CoseError {
    /// The payload is detached and the caller did not supply it.
    #[strum(to_string = "COSE payload is detached and no payload was supplied")]
    MissingPayload,
    /// The envelope could not be serialized, which generally shouldn't happen.
    #[strum(to_string = "COSE structure cannot be serialized")]
    Serialization,
}

impl vderror::CoreError for CoseError {}

/// Type alias for [`vderror::Result`] types returned by this module.
pub type Result<T> = vderror::Result<T, CoseError>;

/// Signature algorithms from the [IANA COSE registry][1] supported by this crate.
///
/// [1]: <https://www.iana.org/assignments/cose/cose.xhtml#algorithms>
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    /// ECDSA w/ SHA-256, label `-7`.
    Es256,
    /// ECDSA w/ SHA-384, label `-35`.
    Es384,
    /// ECDSA w/ SHA-512, label `-36`.
    Es512,
    /// RSASSA-PSS w/ SHA-256, label `-37`.
    Ps256,
    /// RSASSA-PSS w/ SHA-384, label `-38`.
    Ps384,
    /// RSASSA-PSS w/ SHA-512, label `-39`.
    Ps512,
}

impl Algorithm {
    /// Maps a registry label to a supported [`Algorithm`], or [`None`].
    pub(crate) fn from_label(label: i128) -> Option<Self> {
        Some(match label {
            -7 => Algorithm::Es256,
            -35 => Algorithm::Es384,
            -36 => Algorithm::Es512,
            -37 => Algorithm::Ps256,
            -38 => Algorithm::Ps384,
            -39 => Algorithm::Ps512,
            _ => return None,
        })
    }

    /// The registry label of this [`Algorithm`].
    pub(crate) fn label(&self) -> i128 {
        match self {
            Algorithm::Es256 => -7,
            Algorithm::Es384 => -35,
            Algorithm::Es512 => -36,
            Algorithm::Ps256 => -37,
            Algorithm::Ps384 => -38,
            Algorithm::Ps512 => -39,
        }
    }
}

impl From<Algorithm> for SigningAlgorithm {
    fn from(alg: Algorithm) -> Self {
        match alg {
            Algorithm::Es256 => SigningAlgorithm::Es256,
            Algorithm::Es384 => SigningAlgorithm::Es384,
            Algorithm::Es512 => SigningAlgorithm::Es512,
            Algorithm::Ps256 => SigningAlgorithm::Ps256,
            Algorithm::Ps384 => SigningAlgorithm::Ps384,
            Algorithm::Ps512 => SigningAlgorithm::Ps512,
        }
    }
}

impl From<SigningAlgorithm> for Algorithm {
    fn from(alg: SigningAlgorithm) -> Self {
        match alg {
            SigningAlgorithm::Es256 => Algorithm::Es256,
            SigningAlgorithm::Es384 => Algorithm::Es384,
            SigningAlgorithm::Es512 => Algorithm::Es512,
            SigningAlgorithm::Ps256 => Algorithm::Ps256,
            SigningAlgorithm::Ps384 => Algorithm::Ps384,
            SigningAlgorithm::Ps512 => Algorithm::Ps512,
        }
    }
}

/// A COSE header map, section `3` of [RFC 9052][1].
///
/// Only the `alg` parameter is interpreted; every other parameter is carried opaquely in `rest`
/// with its entry order preserved.
///
/// [1]: <https://datatracker.ietf.org/doc/rfc9052/>
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Header {
    /// The `alg` header parameter, when present and supported.
    pub alg: Option<Algorithm>,
    /// The remaining header parameters, unmodified.
    pub rest: Vec<(Value, Value)>,
}

impl Header {
    /// Returns `true` when no parameter is set.
    pub fn is_empty(&self) -> bool {
        self.alg.is_none() && self.rest.is_empty()
    }

    /// Returns the raw value of the `x5chain` header parameter (label `33`), or [`None`].
    ///
    /// No validation beyond presence is performed here; interpreting the certificate bytes is the
    /// caller's concern.
    pub fn x5chain(&self) -> Option<&Value> {
        self.rest.iter().find_map(|(label, value)| {
            matches!(label, Value::Integer(int) if *int == HEADER_LABEL_X5CHAIN).then_some(value)
        })
    }
}

impl AsCborValue for Header {
    fn from_cbor_value(value: Value) -> cbor::Result<Self> {
        let mut entries = match value {
            Value::Map(entries) => entries,
            other => {
                return Err(vderror::Error::root(CborError::UnexpectedItem(
                    other.kind(),
                    "a header map",
                )))
            }
        };

        let alg_index = entries
            .iter()
            .position(|(label, _)| matches!(label, Value::Integer(int) if *int == HEADER_LABEL_ALG));

        let alg = match alg_index {
            Some(index) => {
                let (_, alg_value) = &entries[index];
                match alg_value.as_integer().and_then(Algorithm::from_label) {
                    Some(alg) => {
                        entries.remove(index);
                        Some(alg)
                    }
                    // an unknown algorithm stays in `rest` so the header round-trips
                    None => None,
                }
            }
            None => None,
        };

        Ok(Self { alg, rest: entries })
    }

    fn to_cbor_value(&self) -> cbor::Result<Value> {
        let mut entries = Vec::with_capacity(self.rest.len() + 1);

        if let Some(alg) = self.alg {
            entries.push((
                Value::Integer(HEADER_LABEL_ALG),
                Value::Integer(alg.label()),
            ));
        }

        entries.extend(self.rest.iter().cloned());

        Ok(Value::Map(entries))
    }
}

/// The integrity-protected header of a COSE envelope.
///
/// A decoded instance retains the exact serialized bytes it was read from; those bytes, not a
/// re-encoding, enter the `Sig_structure`/`MAC_structure`.
#[derive(Debug, Clone, PartialEq)]
pub struct ProtectedHeader {
    /// The parsed header.
    pub header: Header,
    /// The serialized header bytes as read from the wire, when decoded.
    pub original_data: Option<Vec<u8>>,
}

impl ProtectedHeader {
    /// Creates a new [`ProtectedHeader`] around the provided [`Header`].
    pub fn new(header: Header) -> Self {
        Self {
            header,
            original_data: None,
        }
    }

    /// The serialized header bytes, as wrapped into a byte string within the envelope.
    ///
    /// An empty header serializes to a zero-length byte string, per section `3` of
    /// [RFC 9052][1].
    ///
    /// [1]: <https://datatracker.ietf.org/doc/rfc9052/>
    pub fn bytes(&self) -> cbor::Result<Vec<u8>> {
        if let Some(original) = &self.original_data {
            return Ok(original.clone());
        }

        if self.header.is_empty() {
            return Ok(Vec::new());
        }

        cbor::to_vec(&self.header.to_cbor_value()?)
    }
}

impl AsCborValue for ProtectedHeader {
    fn from_cbor_value(value: Value) -> cbor::Result<Self> {
        let bytes = match value {
            Value::Bytes(bytes) => bytes,
            other => {
                return Err(vderror::Error::root(CborError::UnexpectedItem(
                    other.kind(),
                    "a protected header byte string",
                )))
            }
        };

        let header = if bytes.is_empty() {
            Header::default()
        } else {
            Header::from_cbor_value(cbor::from_slice(&bytes)?)?
        };

        Ok(Self {
            header,
            original_data: Some(bytes),
        })
    }

    fn to_cbor_value(&self) -> cbor::Result<Value> {
        Ok(Value::Bytes(self.bytes()?))
    }
}

/// A `COSE_Sign1` single-signer envelope, section `4.2` of [RFC 9052][1].
///
/// The envelope is immutable once parsed; the only sanctioned mutation is detaching the payload
/// via [`CoseSign1::without_payload`] before re-serializing.
///
/// [1]: <https://datatracker.ietf.org/doc/rfc9052/>
#[derive(Debug, Clone, PartialEq)]
pub struct CoseSign1 {
    /// The integrity-protected header.
    pub protected: ProtectedHeader,
    /// The unprotected header.
    pub unprotected: Header,
    /// The payload; [`None`] when detached.
    pub payload: Option<Vec<u8>>,
    /// The signature bytes.
    pub signature: Vec<u8>,
}

impl CoseSign1 {
    /// Returns a copy of the envelope with the payload detached.
    pub fn without_payload(&self) -> Self {
        Self {
            payload: None,
            ..self.clone()
        }
    }

    /// Reconstructs the `Sig_structure` byte sequence the signature is computed over:
    /// `["Signature1", protected header bytes, external AAD, payload]`.
    ///
    /// When the payload is detached the caller **MUST** supply it via `detached_payload`;
    /// otherwise the reconstruction fails closed with [`CoseError::MissingPayload`].
    pub fn signature_payload(
        &self,
        external_aad: &[u8],
        detached_payload: Option<&[u8]>,
    ) -> Result<Vec<u8>> {
        signed_structure(
            CONTEXT_SIGNATURE1,
            &self.protected,
            external_aad,
            detached_payload.or(self.payload.as_deref()),
        )
    }
}

impl AsCborValue for CoseSign1 {
    fn from_cbor_value(value: Value) -> cbor::Result<Self> {
        let [protected, unprotected, payload, signature] = envelope_fields(value)?;

        Ok(Self {
            protected: ProtectedHeader::from_cbor_value(protected)?,
            unprotected: Header::from_cbor_value(unprotected)?,
            payload: envelope_payload(payload)?,
            signature: signature.into_bytes().map_err(|other| {
                vderror::Error::root(CborError::UnexpectedItem(other.kind(), "a signature"))
            })?,
        })
    }

    fn to_cbor_value(&self) -> cbor::Result<Value> {
        Ok(Value::Array(vec![
            self.protected.to_cbor_value()?,
            self.unprotected.to_cbor_value()?,
            match &self.payload {
                Some(payload) => Value::Bytes(payload.clone()),
                None => Value::Null,
            },
            Value::Bytes(self.signature.clone()),
        ]))
    }
}

/// A `COSE_Mac0` envelope, section `6.2` of [RFC 9052][1].
///
/// Same shape as [`CoseSign1`], carrying an authentication tag computed with a symmetric key
/// instead of a signature.  This crate reconstructs the authenticated bytes; deriving the
/// symmetric key happens out-of-band.
///
/// [1]: <https://datatracker.ietf.org/doc/rfc9052/>
#[derive(Debug, Clone, PartialEq)]
pub struct CoseMac0 {
    /// The integrity-protected header.
    pub protected: ProtectedHeader,
    /// The unprotected header.
    pub unprotected: Header,
    /// The payload; [`None`] when detached.
    pub payload: Option<Vec<u8>>,
    /// The authentication tag bytes.
    pub tag: Vec<u8>,
}

impl CoseMac0 {
    /// Reconstructs the `MAC_structure` byte sequence the tag is computed over:
    /// `["MAC0", protected header bytes, external AAD, payload]`.
    ///
    /// When the payload is detached the caller **MUST** supply it via `detached_payload`;
    /// otherwise the reconstruction fails closed with [`CoseError::MissingPayload`].
    pub fn mac_payload(
        &self,
        external_aad: &[u8],
        detached_payload: Option<&[u8]>,
    ) -> Result<Vec<u8>> {
        signed_structure(
            CONTEXT_MAC0,
            &self.protected,
            external_aad,
            detached_payload.or(self.payload.as_deref()),
        )
    }
}

impl AsCborValue for CoseMac0 {
    fn from_cbor_value(value: Value) -> cbor::Result<Self> {
        let [protected, unprotected, payload, tag] = envelope_fields(value)?;

        Ok(Self {
            protected: ProtectedHeader::from_cbor_value(protected)?,
            unprotected: Header::from_cbor_value(unprotected)?,
            payload: envelope_payload(payload)?,
            tag: tag.into_bytes().map_err(|other| {
                vderror::Error::root(CborError::UnexpectedItem(other.kind(), "a MAC tag"))
            })?,
        })
    }

    fn to_cbor_value(&self) -> cbor::Result<Value> {
        Ok(Value::Array(vec![
            self.protected.to_cbor_value()?,
            self.unprotected.to_cbor_value()?,
            match &self.payload {
                Some(payload) => Value::Bytes(payload.clone()),
                None => Value::Null,
            },
            Value::Bytes(self.tag.clone()),
        ]))
    }
}

/// Splits a COSE envelope into its fixed four fields.
fn envelope_fields(value: Value) -> cbor::Result<[Value; 4]> {
    let fields = match value {
        Value::Array(fields) => fields,
        other => {
            return Err(vderror::Error::root(CborError::UnexpectedItem(
                other.kind(),
                "a COSE envelope array",
            )))
        }
    };

    fields.try_into().map_err(|_| {
        vderror::Error::root(CborError::UnexpectedItem(
            "array",
            "a COSE envelope of exactly 4 elements",
        ))
    })
}

/// Interprets the payload field of a COSE envelope; `null` marks a detached payload.
fn envelope_payload(value: Value) -> cbor::Result<Option<Vec<u8>>> {
    match value {
        Value::Null => Ok(None),
        Value::Bytes(bytes) => Ok(Some(bytes)),
        other => Err(vderror::Error::root(CborError::UnexpectedItem(
            other.kind(),
            "a payload byte string or null",
        ))),
    }
}

/// Builds the fixed-shape authenticated byte structure shared by signatures and MACs.
fn signed_structure(
    context: &str,
    protected: &ProtectedHeader,
    external_aad: &[u8],
    payload: Option<&[u8]>,
) -> Result<Vec<u8>> {
    let payload = payload.ok_or_else(|| vderror::Error::root(CoseError::MissingPayload))?;

    let structure = Value::Array(vec![
        context.into(),
        Value::Bytes(protected.bytes().with_err(|| CoseError::Serialization)?),
        Value::Bytes(external_aad.to_vec()),
        Value::Bytes(payload.to_vec()),
    ]);

    cbor::to_vec(&structure).with_err(|| CoseError::Serialization)
}
