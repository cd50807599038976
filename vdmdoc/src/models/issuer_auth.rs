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

//! This module implements the Issuer data authentication model from the section `9.1.2` of
//! [ISO/IEC 18013-5:2021][1], based on the findings from [RFC 9052][2] and [RFC 9360][3].
//!
//! For now we only support a small subset of features, just to keep things simple.  We should
//! gradually expand the features as needed.
//!
//! [1]: <https://www.iso.org/standard/69084.html>
//! [2]: <https://datatracker.ietf.org/doc/rfc9052/>
//! [3]: <https://datatracker.ietf.org/doc/rfc9360/>

use std::collections::HashMap;
use std::str::FromStr;

use vd_sig_utils::{public_jwk_from_x5chain_leaf, JwkPublic, SignatureVerifier, SigningAlgorithm};
use vderror::traits::{ErrorContext as _, ForeignBoxed as _, PropagateError as _};
use vdx5chain::{X509Trust, X5Chain};

use crate::{
    cbor::{
        expect_map, require_map_entry, take_map_entry, AsCborValue, CborError, EmbeddedCbor, Value,
    },
    cose::{CoseKey, CoseSign1},
    error::MdocError,
    models::{
        common::{DataElementIdentifier, DocType, NameSpace},
        document::DigestID,
        Bytes, DateTime,
    },
    utils::digest::{sha256, sha384, sha512},
    Result,
};

/// The version of the [`MobileSecurityObject`] structure.
///
/// The value is currently specified in the section `9.1.2.4` of the [ISO/IEC 18013-5:2021][1].
///
/// [1]: <https://www.iso.org/standard/69084.html>
pub const MOBILE_SECURITY_OBJECT_VERSION: &str = "1.0";

/// The default `kid` value of the Issuer's public key.
const DEFAULT_ISSUER_KID: &str = "issuer_kid";

/// [`IssuerAuth`] as defined in the section `9.1.2.4` of the [ISO/IEC 18013-5:2021][1] standard.
///
/// This is just a wrapper around an untagged `COSE_Sign1` structure whose payload carries the
/// [`MobileSecurityObjectBytes`].  More information about the `COSE_Sign1` structure can be found
/// in [RFC 9052][2].
///
/// [1]: <https://www.iso.org/standard/69084.html>
/// [2]: <https://datatracker.ietf.org/doc/rfc9052/>
#[derive(Clone, Debug, PartialEq)]
pub struct IssuerAuth(pub(crate) CoseSign1);

impl IssuerAuth {
    /// Verifies the issuer's signature of the [`IssuerAuth`].
    ///
    /// If [`X509Trust`] is provided, the Issuer's authenticity is verified as well.
    ///
    /// The required information is extracted from the unprotected and protected header of the
    /// underlying `COSE_Sign1` structure.  On success, the Issuer's public key and certificate
    /// chain are returned so callers can hand them to policy layers.
    pub(crate) fn verify_signature<'a>(
        &self,
        trust: Option<&X509Trust>,
        get_signature_verifier: impl Fn(SigningAlgorithm) -> Option<&'a dyn SignatureVerifier>,
    ) -> Result<(JwkPublic, X5Chain)> {
        let alg = self
            .signing_algorithm()
            .ok_or_else(|| vderror::Error::root(MdocError::MissingSigningAlgorithm))
            .ctx(|| "issuer authentication")?;

        let x5chain = self.x5chain(trust)?;

        let jwk = public_jwk_from_x5chain_leaf(&x5chain, &alg, Some(DEFAULT_ISSUER_KID))
            .with_err(|| MdocError::InvalidPublicKey)?;

        let signature_verifier = get_signature_verifier(alg)
            .ok_or_else(|| vderror::Error::root(MdocError::MissingSignatureVerifier(alg)))?;

        let signed_bytes = self
            .0
            .signature_payload(&[], None)
            .with_err(|| MdocError::IssuerAuth)
            .ctx(|| "MSO payload is missing")?;

        let verified = signature_verifier
            .verify(&signed_bytes, &self.0.signature, &jwk)
            .foreign_boxed_err(|| MdocError::InvalidSignature)
            .ctx(|| "error while verifying signature")?;

        if !verified {
            return Err(
                vderror::Error::root(MdocError::InvalidSignature).ctx("the signature is not valid")
            );
        }

        Ok((jwk, x5chain))
    }

    /// Return the [`MobileSecurityObject`] from the payload of the underlying `COSE_Sign1`
    /// structure.
    pub fn mso(&self) -> Result<MobileSecurityObject> {
        let Some(payload) = &self.0.payload else {
            return Err(vderror::Error::root(MdocError::IssuerAuth).ctx("MSO is missing"));
        };

        let mso = MobileSecurityObjectBytes::from_slice(payload)
            .with_err(|| MdocError::IssuerAuth)
            .ctx(|| "Invalid Mobile Security Object")?;

        Ok(mso.into())
    }

    /// Return the `alg` element from the protected header of the underlying `COSE_Sign1`
    /// structure.
    pub fn signing_algorithm(&self) -> Option<SigningAlgorithm> {
        self.0.protected.header.alg.map(Into::into)
    }

    /// Return the `x5chain` from the unprotected header of the underlying `COSE_Sign1`
    /// structure.
    ///
    /// If [`X509Trust`] is provided, the Issuer's authenticity is verified as well.
    pub fn x5chain(&self, trust: Option<&X509Trust>) -> Result<X5Chain> {
        let x5chain = self
            .0
            .unprotected
            .x5chain()
            .ok_or_else(|| vderror::Error::root(MdocError::X5Chain).ctx("missing `x5chain`"))?;

        let x5chain = cbor_value_to_x5chain(x5chain.clone())?;

        // If trusted root certificates (`trust`) are present, verify the X.509
        // chain against them.
        if let Some(trust) = trust {
            x5chain
                .verify_against_trusted_roots(trust)
                .with_err(|| MdocError::X5Chain)
                .ctx(|| "x5chain not valid against trusted root certificates")?;
        }

        Ok(x5chain)
    }
}

impl AsCborValue for IssuerAuth {
    fn from_cbor_value(value: Value) -> crate::cbor::Result<Self> {
        Ok(Self(CoseSign1::from_cbor_value(value)?))
    }

    fn to_cbor_value(&self) -> crate::cbor::Result<Value> {
        self.0.to_cbor_value()
    }
}

/// Based on [RFC 9360][1], x5chain should be serialized based on number of certificates in chain,
/// as it states:
///
/// > This header parameter allows for a single X.509 certificate or a chain of X.509 certificates
/// > to be carried in the message.
/// >
/// >   *  If a single certificate is conveyed, it is placed in a CBOR byte string.
/// >
/// >   *  If multiple certificates are conveyed, a CBOR array of byte strings is used, with each
/// >      certificate being in its own byte string.
///
/// [1]: <https://www.rfc-editor.org/rfc/rfc9360.html#section-2-5.4.4>
pub fn x5chain_to_cbor_value(x5chain: &X5Chain) -> Result<Value> {
    let mut certs = x5chain
        .as_bytes()
        .with_err(|| MdocError::X5Chain)
        .ctx(|| "X.509 certificate to DER error")?
        .into_iter()
        .map(Value::Bytes)
        .collect::<Vec<Value>>();

    Ok(if certs.len() == 1 {
        certs.remove(0)
    } else {
        Value::Array(certs)
    })
}

/// Converts the CBOR [`Value`] to the [`X5Chain`].
///
/// If the [`Value`] contains [`Bytes`][Value::Bytes], they are representing a single certificate.
/// If it contains an [`Array`][Value::Array] of [`Bytes`][Value::Bytes], it represents the chain
/// of certificates. Otherwise, [`MdocError::X5Chain`] is returned.
fn cbor_value_to_x5chain(value: Value) -> Result<X5Chain> {
    let chain = match value {
        Value::Bytes(bytes) => vec![bytes],
        Value::Array(array) => array
            .into_iter()
            .map(Value::into_bytes)
            .collect::<std::result::Result<_, _>>()
            // `map_err` must be used because the underlying error is not `StdErr`
            .map_err(|_| {
                vderror::Error::root(MdocError::X5Chain).ctx("`x5chain` must only contain bytes")
            })?,
        _ => {
            return Err(
                vderror::Error::root(MdocError::X5Chain).ctx("`x5chain` must only contain bytes")
            )
        }
    };

    X5Chain::from_raw_bytes(&chain)
        .with_err(|| MdocError::X5Chain)
        .ctx(|| "invalid `x5chain`")
}

/// [`MobileSecurityObjectBytes`] as defined in the section `9.1.2.4` of the [ISO/IEC
/// 18013-5:2021][1] standard.
///
/// [1]: <https://www.iso.org/standard/69084.html>
#[derive(Debug, Clone, PartialEq)]
pub struct MobileSecurityObjectBytes(pub(crate) EmbeddedCbor<MobileSecurityObject>);

impl From<MobileSecurityObjectBytes> for MobileSecurityObject {
    fn from(value: MobileSecurityObjectBytes) -> Self {
        value.0.into_inner()
    }
}

impl AsCborValue for MobileSecurityObjectBytes {
    fn from_cbor_value(value: Value) -> crate::cbor::Result<Self> {
        Ok(Self(EmbeddedCbor::from_cbor_value(value)?))
    }

    fn to_cbor_value(&self) -> crate::cbor::Result<Value> {
        self.0.to_cbor_value()
    }
}

/// [`MobileSecurityObject`] as defined in the section `9.1.2.4` of the [ISO/IEC 18013-5:2021][1]
/// standard.
///
/// [1]: <https://www.iso.org/standard/69084.html>
#[derive(Debug, Clone, PartialEq)]
pub struct MobileSecurityObject {
    pub(crate) version: String,
    /// Kept as the declared string so an unsupported algorithm surfaces during the validity
    /// check, not as a parse failure of the whole object.
    pub(crate) digest_algorithm: String,
    pub(crate) value_digests: ValueDigests,
    pub(crate) device_key_info: DeviceKeyInfo,
    pub(crate) doc_type: DocType,
    pub(crate) validity_info: ValidityInfo,
}

impl MobileSecurityObject {
    /// The digest algorithm all value digests of this object are computed with.
    ///
    /// # Error
    ///
    /// [`MdocError::UnsupportedDigestAlgorithm`] when the declared algorithm is not one we
    /// support.
    pub fn digest_algorithm(&self) -> Result<DigestAlgorithm> {
        self.digest_algorithm.parse()
    }

    /// Returns the [`DeviceKey`] the credential is bound to.
    pub fn device_key(&self) -> &DeviceKey {
        &self.device_key_info.device_key
    }

    /// Returns the key authorizations granted to the Device by the Issuer, if any.
    pub fn key_authorizations(&self) -> Option<&KeyAuthorizations> {
        self.device_key_info.key_authorizations.as_ref()
    }

    /// Returns the signed digests per namespace.
    pub fn value_digests(&self) -> &ValueDigests {
        &self.value_digests
    }

    /// Returns the validity window of the credential.
    pub fn validity_info(&self) -> &ValidityInfo {
        &self.validity_info
    }

    /// Validates the time-window claims and the document type binding.
    ///
    /// This includes the digest algorithm supportedness, as the rest of this object is unusable
    /// without it.
    ///
    /// **Note**: this is intended to be used only by the `mDoc` Verifier.
    pub(crate) fn validate(&self, current_time: u64, doc_type: &DocType) -> Result<()> {
        if &self.doc_type != doc_type {
            return Err(vderror::Error::root(MdocError::InvalidDocType(
                doc_type.clone(),
                self.doc_type.clone(),
            )));
        }

        self.digest_algorithm()?;

        self.validity_info.validate_verifier(current_time)
    }
}

impl AsCborValue for MobileSecurityObject {
    fn from_cbor_value(value: Value) -> crate::cbor::Result<Self> {
        // unknown entries (e.g. a status claim) are ignored for forward compatibility
        let mut map = expect_map(value, "a MobileSecurityObject map")?;

        Ok(Self {
            version: crate::cbor::expect_text(
                require_map_entry(&mut map, "version")?,
                "a version text string",
            )?,
            digest_algorithm: crate::cbor::expect_text(
                require_map_entry(&mut map, "digestAlgorithm")?,
                "a digest algorithm text string",
            )?,
            value_digests: ValueDigests::from_cbor_value(require_map_entry(
                &mut map,
                "valueDigests",
            )?)?,
            device_key_info: DeviceKeyInfo::from_cbor_value(require_map_entry(
                &mut map,
                "deviceKeyInfo",
            )?)?,
            doc_type: DocType::from_cbor_value(require_map_entry(&mut map, "docType")?)?,
            validity_info: ValidityInfo::from_cbor_value(require_map_entry(
                &mut map,
                "validityInfo",
            )?)?,
        })
    }

    fn to_cbor_value(&self) -> crate::cbor::Result<Value> {
        Ok(Value::Map(vec![
            ("version".into(), Value::Text(self.version.clone())),
            (
                "digestAlgorithm".into(),
                Value::Text(self.digest_algorithm.clone()),
            ),
            ("valueDigests".into(), self.value_digests.to_cbor_value()?),
            (
                "deviceKeyInfo".into(),
                self.device_key_info.to_cbor_value()?,
            ),
            ("docType".into(), self.doc_type.to_cbor_value()?),
            ("validityInfo".into(), self.validity_info.to_cbor_value()?),
        ]))
    }
}

/// Supported digest algorithms as defined by the table 21 of the section `9.1.2.5` in the
/// [ISO/IEC 18013-5:2021][1] standard.
///
/// [1]: <https://www.iso.org/standard/69084.html>
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestAlgorithm {
    /// Designates the SHA-256 digest algorithm as specified in [ISO/IEC 10118-3][1].
    ///
    /// [1]: <https://www.iso.org/standard/67116.html>
    Sha256,
    /// Designates the SHA-384 digest algorithm as specified in [ISO/IEC 10118-3][1].
    ///
    /// [1]: <https://www.iso.org/standard/67116.html>
    Sha384,
    /// Designates the SHA-512 digest algorithm as specified in [ISO/IEC 10118-3][1].
    ///
    /// [1]: <https://www.iso.org/standard/67116.html>
    Sha512,
}

impl DigestAlgorithm {
    /// The identifier of the algorithm as it appears in the `digestAlgorithm` element.
    pub fn as_str(&self) -> &'static str {
        match self {
            DigestAlgorithm::Sha256 => "SHA-256",
            DigestAlgorithm::Sha384 => "SHA-384",
            DigestAlgorithm::Sha512 => "SHA-512",
        }
    }

    /// Computes the digest of the provided payload with this algorithm.
    pub fn digest(&self, payload: &[u8]) -> Vec<u8> {
        match self {
            DigestAlgorithm::Sha256 => sha256(payload).to_vec(),
            DigestAlgorithm::Sha384 => sha384(payload).to_vec(),
            DigestAlgorithm::Sha512 => sha512(payload).to_vec(),
        }
    }
}

impl std::fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DigestAlgorithm {
    type Err = vderror::Error<MdocError>;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "SHA-256" => Ok(DigestAlgorithm::Sha256),
            "SHA-384" => Ok(DigestAlgorithm::Sha384),
            "SHA-512" => Ok(DigestAlgorithm::Sha512),
            other => Err(vderror::Error::root(MdocError::UnsupportedDigestAlgorithm(
                other.to_owned(),
            ))),
        }
    }
}

/// [`ValueDigests`] as defined in the section `9.1.2.4` of the [ISO/IEC 18013-5:2021][1]
/// standard.
///
/// [1]: <https://www.iso.org/standard/69084.html>
#[derive(Debug, Clone, PartialEq)]
pub struct ValueDigests(pub(crate) HashMap<NameSpace, DigestIDs>);

impl ValueDigests {
    /// Returns the digests signed for the given namespace, or [`None`].
    pub fn for_name_space(&self, name_space: &NameSpace) -> Option<&DigestIDs> {
        self.0.get(name_space)
    }
}

impl AsCborValue for ValueDigests {
    fn from_cbor_value(value: Value) -> crate::cbor::Result<Self> {
        Ok(Self(HashMap::from_cbor_value(value)?))
    }

    fn to_cbor_value(&self) -> crate::cbor::Result<Value> {
        self.0.to_cbor_value()
    }
}

/// [`DigestIDs`] as defined in the section `9.1.2.4` of the [ISO/IEC 18013-5:2021][1] standard.
///
/// [1]: <https://www.iso.org/standard/69084.html>
#[derive(Debug, Clone, PartialEq)]
pub struct DigestIDs(pub(crate) HashMap<DigestID, Bytes>);

impl DigestIDs {
    /// Returns the digest bytes signed under the given ID, or [`None`].
    pub fn get(&self, digest_id: &DigestID) -> Option<&Bytes> {
        self.0.get(digest_id)
    }
}

impl AsCborValue for DigestIDs {
    fn from_cbor_value(value: Value) -> crate::cbor::Result<Self> {
        Ok(Self(HashMap::from_cbor_value(value)?))
    }

    fn to_cbor_value(&self) -> crate::cbor::Result<Value> {
        self.0.to_cbor_value()
    }
}

/// [`DeviceKeyInfo`] as defined in the section `9.1.2.4` of the [ISO/IEC 18013-5:2021][1]
/// standard.
///
/// [1]: <https://www.iso.org/standard/69084.html>
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceKeyInfo {
    pub(crate) device_key: DeviceKey,
    pub(crate) key_authorizations: Option<KeyAuthorizations>,
    pub(crate) key_info: Option<KeyInfo>,
}

impl AsCborValue for DeviceKeyInfo {
    fn from_cbor_value(value: Value) -> crate::cbor::Result<Self> {
        let mut map = expect_map(value, "a DeviceKeyInfo map")?;

        Ok(Self {
            device_key: DeviceKey::from_cbor_value(require_map_entry(&mut map, "deviceKey")?)?,
            key_authorizations: take_map_entry(&mut map, "keyAuthorizations")
                .map(KeyAuthorizations::from_cbor_value)
                .transpose()?,
            key_info: take_map_entry(&mut map, "keyInfo")
                .map(KeyInfo::from_cbor_value)
                .transpose()?,
        })
    }

    fn to_cbor_value(&self) -> crate::cbor::Result<Value> {
        let mut map = vec![("deviceKey".into(), self.device_key.to_cbor_value()?)];

        if let Some(key_authorizations) = &self.key_authorizations {
            map.push((
                "keyAuthorizations".into(),
                key_authorizations.to_cbor_value()?,
            ));
        }
        if let Some(key_info) = &self.key_info {
            map.push(("keyInfo".into(), key_info.to_cbor_value()?));
        }

        Ok(Value::Map(map))
    }
}

/// User's device public key.
///
/// For more details on `COSE_Key` specifications look
/// [here](https://datatracker.ietf.org/doc/html/rfc9052#section-7).
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceKey(pub(crate) CoseKey);

impl DeviceKey {
    /// Method for creating `DeviceKey` out of `JWK`.
    pub fn from_jwk(jwk: &serde_json::Map<String, serde_json::Value>) -> Result<Self> {
        Ok(Self(
            CoseKey::from_jwk(jwk).ctx(|| "Failed to create DeviceKey")?,
        ))
    }

    /// Returns a JWK representation of the underlying `COSE_Key`.
    pub fn as_jwk(&self) -> Result<serde_json::Map<String, serde_json::Value>> {
        self.0.to_jwk()
    }
}

impl AsCborValue for DeviceKey {
    fn from_cbor_value(value: Value) -> crate::cbor::Result<Self> {
        Ok(Self(CoseKey::from_cbor_value(value)?))
    }

    fn to_cbor_value(&self) -> crate::cbor::Result<Value> {
        self.0.to_cbor_value()
    }
}

/// [`KeyAuthorizations`] as defined in the section `9.1.2.4` of the [ISO/IEC 18013-5:2021][1]
/// standard.
///
/// [1]: <https://www.iso.org/standard/69084.html>
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeyAuthorizations {
    pub(crate) name_spaces: Option<AuthorizedNameSpaces>,
    pub(crate) data_elements: Option<AuthorizedDataElements>,
}

impl KeyAuthorizations {
    /// Returns `true` when the Device is authorized to sign the given data element, either
    /// through a namespace-level or an element-level authorization.
    pub fn authorizes(&self, name_space: &NameSpace, element: &DataElementIdentifier) -> bool {
        if let Some(AuthorizedNameSpaces(name_spaces)) = &self.name_spaces {
            if name_spaces.contains(name_space) {
                return true;
            }
        }

        if let Some(AuthorizedDataElements(elements)) = &self.data_elements {
            if let Some(DataElementsArray(identifiers)) = elements.get(name_space) {
                return identifiers.contains(element);
            }
        }

        false
    }
}

impl AsCborValue for KeyAuthorizations {
    fn from_cbor_value(value: Value) -> crate::cbor::Result<Self> {
        let mut map = expect_map(value, "a KeyAuthorizations map")?;

        Ok(Self {
            name_spaces: take_map_entry(&mut map, "nameSpaces")
                .map(AuthorizedNameSpaces::from_cbor_value)
                .transpose()?,
            data_elements: take_map_entry(&mut map, "dataElements")
                .map(AuthorizedDataElements::from_cbor_value)
                .transpose()?,
        })
    }

    fn to_cbor_value(&self) -> crate::cbor::Result<Value> {
        let mut map = Vec::with_capacity(2);

        if let Some(name_spaces) = &self.name_spaces {
            map.push(("nameSpaces".into(), name_spaces.to_cbor_value()?));
        }
        if let Some(data_elements) = &self.data_elements {
            map.push(("dataElements".into(), data_elements.to_cbor_value()?));
        }

        Ok(Value::Map(map))
    }
}

/// [`AuthorizedNameSpaces`] as defined in the section `9.1.2.4` of the [ISO/IEC 18013-5:2021][1]
/// standard.
///
/// [1]: <https://www.iso.org/standard/69084.html>
#[derive(Debug, Clone, PartialEq)]
pub struct AuthorizedNameSpaces(pub(crate) Vec<NameSpace>);

impl AsCborValue for AuthorizedNameSpaces {
    fn from_cbor_value(value: Value) -> crate::cbor::Result<Self> {
        Ok(Self(Vec::from_cbor_value(value)?))
    }

    fn to_cbor_value(&self) -> crate::cbor::Result<Value> {
        self.0.to_cbor_value()
    }
}

/// [`AuthorizedDataElements`] as defined in the section `9.1.2.4` of the [ISO/IEC 18013-5:2021][1]
/// standard.
///
/// [1]: <https://www.iso.org/standard/69084.html>
#[derive(Debug, Clone, PartialEq)]
pub struct AuthorizedDataElements(pub(crate) HashMap<NameSpace, DataElementsArray>);

impl AsCborValue for AuthorizedDataElements {
    fn from_cbor_value(value: Value) -> crate::cbor::Result<Self> {
        Ok(Self(HashMap::from_cbor_value(value)?))
    }

    fn to_cbor_value(&self) -> crate::cbor::Result<Value> {
        self.0.to_cbor_value()
    }
}

/// [`DataElementsArray`] as defined in the section `9.1.2.4` of the [ISO/IEC 18013-5:2021][1]
/// standard.
///
/// [1]: <https://www.iso.org/standard/69084.html>
#[derive(Debug, Clone, PartialEq)]
pub struct DataElementsArray(pub(crate) Vec<DataElementIdentifier>);

impl AsCborValue for DataElementsArray {
    fn from_cbor_value(value: Value) -> crate::cbor::Result<Self> {
        Ok(Self(Vec::from_cbor_value(value)?))
    }

    fn to_cbor_value(&self) -> crate::cbor::Result<Value> {
        self.0.to_cbor_value()
    }
}

/// [`KeyInfo`] as defined in the section `9.1.2.4` of the [ISO/IEC 18013-5:2021][1] standard.
///
/// [1]: <https://www.iso.org/standard/69084.html>
#[derive(Debug, Clone, PartialEq)]
pub struct KeyInfo(pub(crate) Vec<(Value, Value)>);

impl AsCborValue for KeyInfo {
    fn from_cbor_value(value: Value) -> crate::cbor::Result<Self> {
        Ok(Self(expect_map(value, "a KeyInfo map")?))
    }

    fn to_cbor_value(&self) -> crate::cbor::Result<Value> {
        Ok(Value::Map(self.0.clone()))
    }
}

/// [`ValidityInfo`] as defined in the section `9.1.2.4` of the [ISO/IEC 18013-5:2021][1]
/// standard.
///
/// [1]: <https://www.iso.org/standard/69084.html>
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub struct ValidityInfo {
    /// The timestamp at which the signature was created.
    pub signed: DateTime,

    /// The timestamp before which the credential is not yet valid.
    pub valid_from: DateTime,

    /// The timestamp after which the credential is no longer valid.
    pub valid_until: DateTime,

    /// The timestamp at which the issuing authority infrastructure expects to
    /// re-sign the credential (and potentially update data elements).
    pub expected_update: Option<DateTime>,
}

impl ValidityInfo {
    /// Creates new [`ValidityInfo`], checking the provided data along the way.
    ///
    /// The data is validated as per `Section 9.1.2.4` of [ISO/IEC 18013-5:2021][1].
    ///
    /// - The timestamps in the [`ValidityInfo`] structure shall not use fractions of seconds and
    ///   shall use a UTC offset of 00:00, as indicated by the character `"Z"`.
    /// - The timestamp of `valid_from` shall be equal or later than the `signed` element.
    /// - The value of the `valid_until` timestamp shall be later than the `valid_from` element.
    ///
    /// [1]: <https://www.iso.org/standard/69084.html>
    pub fn new(
        signed: DateTime,
        valid_from: DateTime,
        valid_until: DateTime,
        expected_update: Option<DateTime>,
    ) -> Result<Self> {
        // the timestamp of `valid_from` shall be equal or later than the `signed` element
        if valid_from.0 < signed.0 {
            return Err(vderror::Error::root(MdocError::InvalidValidityInfo)
                .ctx("`valid_from` must be equal or later than `signed`"));
        }

        // the value of the `valid_until` timestamp shall be later than the `valid_from` element
        if valid_until.0 <= valid_from.0 {
            return Err(vderror::Error::root(MdocError::InvalidValidityInfo)
                .ctx("`valid_until` must be later than `valid_from`"));
        }

        Ok(Self {
            signed,
            valid_from,
            valid_until,
            expected_update,
        })
    }

    /// Validates the window claims against the provided time.
    ///
    /// The upper bound is inclusive: a credential is still accepted at the exact `valid_until`
    /// second and rejected strictly after it.
    ///
    /// **Note**: this is intended to be used only by the `mDoc` Verifier.
    pub(crate) fn validate_verifier(&self, current_time: u64) -> Result<()> {
        let signed = self.signed.timestamp();
        if (current_time as i128) < (signed as i128) {
            return Err(vderror::Error::root(MdocError::DocumentSignedInFuture(
                signed,
            )));
        }

        let valid_from = self.valid_from.timestamp();
        if (current_time as i128) < (valid_from as i128) {
            return Err(vderror::Error::root(MdocError::DocumentNotYetValid(
                valid_from,
            )));
        }

        let valid_until = self.valid_until.timestamp();
        if (current_time as i128) > (valid_until as i128) {
            return Err(vderror::Error::root(MdocError::DocumentExpired(
                valid_until,
            )));
        }

        Ok(())
    }
}

impl AsCborValue for ValidityInfo {
    fn from_cbor_value(value: Value) -> crate::cbor::Result<Self> {
        let mut map = expect_map(value, "a ValidityInfo map")?;

        let signed = DateTime::from_cbor_value(require_map_entry(&mut map, "signed")?)?;
        let valid_from = DateTime::from_cbor_value(require_map_entry(&mut map, "validFrom")?)?;
        let valid_until = DateTime::from_cbor_value(require_map_entry(&mut map, "validUntil")?)?;
        let expected_update = take_map_entry(&mut map, "expectedUpdate")
            .map(DateTime::from_cbor_value)
            .transpose()?;

        Self::new(signed, valid_from, valid_until, expected_update).map_err(|_| {
            vderror::Error::root(CborError::UnexpectedItem(
                "validity window",
                "signed <= validFrom < validUntil",
            ))
        })
    }

    fn to_cbor_value(&self) -> crate::cbor::Result<Value> {
        let mut map = vec![
            ("signed".into(), self.signed.to_cbor_value()?),
            ("validFrom".into(), self.valid_from.to_cbor_value()?),
            ("validUntil".into(), self.valid_until.to_cbor_value()?),
        ];

        if let Some(expected_update) = &self.expected_update {
            map.push(("expectedUpdate".into(), expected_update.to_cbor_value()?));
        }

        Ok(Value::Map(map))
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use vd_sig_utils::{Es256Verifier, HasX5Chain as _};
    use vdx5chain::X509Trust;

    use super::*;
    use crate::utils::test::{
        dummy_issuer_auth, issuer_signer, issuer_x509_trust, validity_info,
    };

    #[test]
    fn load_third_party_issuer_auth() {
        const THIRD_PARTY_ISSUER_AUTH: &str = "\
8443a10126a1182159014b308201473081eea00302010202083\
9edc87a9a78f92a300a06082a8648ce3d040302301731153013\
06035504030c0c4d444f4320524f4f54204341301e170d32343\
03530323133313333305a170d3235303530323133313333305a\
301b3119301706035504030c104d444f4320546573742049737\
37565723059301306072a8648ce3d020106082a8648ce3d0301\
07034200041b4448341885fa84140f77790c69de810b977a723\
6f490da306a0cbe2a0a441379ddde146b36a44b6ba7bbc067b0\
4b71bad4b692a4616013d893d440ae253781a320301e300c060\
3551d130101ff04023000300e0603551d0f0101ff0404030207\
80300a06082a8648ce3d04030203480030450221008e7004100\
0ddec2a230b2586ecc59f8acd156f5d933d9363bc5e2263bb0a\
b69802201885a8b537327a69b022620f07c5c45d6293b86eed9\
27a3f04e82cc51cadf8635901c3d8185901bea6677665727369\
6f6e63312e306f646967657374416c676f726974686d6753484\
12d3235366c76616c756544696765737473a1716f72672e6973\
6f2e31383031332e352e31a300582025a0d893e78de394f50c1\
e4e4b741010a2fc683642ecb144f289ca9d74a168440158203f\
74f1795d847e6b72c548ca6f1e57c9a6def0f5c80fa643a8aae\
079939662bd0258202f028fcb6e1690f8c0e7d8569662564c78\
b88ea51f554a414cd04b69834f4e506d6465766963654b65794\
96e666fa1696465766963654b6579a401022001215820257958\
58a9cf54bd8575597e963dffc521696718c0b95ed3bc14acffe\
f6320e82258202dd4fae416f2bab6726593b97914c7b7e1342c\
d446bb8ef025a1cac6567cd40f67646f6354797065756f72672\
e69736f2e31383031332e352e312e6d444c6c76616c69646974\
79496e666fa3667369676e6564c0781e323032342d31302d323\
95431313a30323a30392e3933363334323036395a6976616c69\
6446726f6dc0781e323032342d31302d32395431313a30323a3\
0392e3933363334333733305a6a76616c6964556e74696cc078\
1e323032352d31302d32395431313a30323a30392e393336333\
4333934315a5840d274be6b6491b022cee4be5fcb6561414191\
53a10ccec1cefce93ea4df318d9d8b73c277a0eba2854a4b782\
e300ed9abd07e775942b1e93b33ad21c9b1a50509";

        let issuer_auth_bytes = hex::decode(THIRD_PARTY_ISSUER_AUTH).unwrap();
        let issuer_auth = IssuerAuth::from_slice(&issuer_auth_bytes).unwrap();

        // re-serialization is byte-exact because the protected header and the MSO payload keep
        // their original bytes
        let issuer_auth_deser_bytes = issuer_auth.to_vec().unwrap();
        assert_eq!(issuer_auth_bytes, issuer_auth_deser_bytes);
    }

    // Based on example from [github][1]. This example is part of [RFC][2] and should be
    // representable for our verification check. This proves that an mdoc credential, based on
    // `issuerAuth`'s signature, is verifiable using the `vd-sig-utils` crate.
    //
    // The example was modified in a way to use x5chain for the unprotected field. The x5chain was
    // generated manually from the JWK found in [1]. This way we are compatible with our
    // interface, but we still use the same payload and keys.
    //
    // [1] <https://github.com/cose-wg/Examples/blob/master/ecdsa-examples/ecdsa-sig-01.json>
    // [2] <https://datatracker.ietf.org/doc/html/rfc8152#page-102>
    #[test]
    fn verify_issuer_auth() {
        const CBOR_EXAMPLE: &str =
"8445a201260300a118215901ea308201e63082018ca00302010202142925438a3b4ab7567d1843aed31de1259ea37ff33\
00a06082a8648ce3d040302306a310b30090603550406130255533113301106035504080c0a43616c69666f726e6961311\
6301406035504070c0d53616e204672616e636973636f31183016060355040a0c0f4d79204f7267616e697a6174696f6e3\
114301206035504030c0b6578616d706c652e636f6d301e170d3234313231393039343834365a170d32353132313930393\
43834365a306a310b30090603550406130255533113301106035504080c0a43616c69666f726e696131163014060355040\
70c0d53616e204672616e636973636f31183016060355040a0c0f4d79204f7267616e697a6174696f6e311430120603550\
4030c0b6578616d706c652e636f6d3059301306072a8648ce3d020106082a8648ce3d03010703420004bac5b11cad8f99f\
9c72b05cf4b9e26d244dc189f745228255a219a86d6a09eff20138bf82dc1b6d562be0fa54ab7804a3a64b6d72ccfed6b6\
fb6ed28bbfc117ea310300e300c0603551d130101ff04023000300a06082a8648ce3d040302034800304502200d1150f20\
02bcb15d30326c0b4282635844e64173a16e85429da6439cef303bc0221009b95183e4ab8b47513cbab8635e26d55a57e5\
e0ce85f2099f9502f4a2d7048f454546869732069732074686520636f6e74656e742e58406520bbaf2081d7e0ed0f95f76\
eb0733d667005f7467cec4b87b9381a6ba1ede8e00df29f32a37230f39a842a54821fdd223092819d7728efb9d3a0080b7\
5380b";

        let issuer_auth_bytes = hex::decode(CBOR_EXAMPLE).unwrap();
        let issuer_auth = IssuerAuth::from_slice(&issuer_auth_bytes).unwrap();

        assert_matches!(
            issuer_auth.verify_signature(None, |_| Some(&Es256Verifier)),
            Ok(_)
        );
    }

    #[test]
    fn verify_issuer_auth_missing_verifier() {
        let issuer_auth = dummy_issuer_auth(100);

        let err = issuer_auth.verify_signature(None, |_| None).unwrap_err();
        assert_matches!(err.error, MdocError::MissingSignatureVerifier(_));
    }

    #[test]
    fn create_and_verify_issuer_auth() {
        let issuer_auth = dummy_issuer_auth(100);

        assert_matches!(
            issuer_auth.verify_signature(None, |_| Some(&Es256Verifier)),
            Ok(_)
        );

        let mso = issuer_auth.mso().unwrap();
        assert_eq!(mso.digest_algorithm().unwrap(), DigestAlgorithm::Sha256);
        assert_matches!(
            mso.validate(100, &"org.iso.18013.5.1.mDL".into()),
            Ok(())
        );
    }

    #[test]
    fn validate_mso_doc_type_mismatch() {
        let issuer_auth = dummy_issuer_auth(100);
        let mso = issuer_auth.mso().unwrap();

        let err = mso
            .validate(100, &"<INVALID-DOC-TYPE>".into())
            .unwrap_err();
        assert_matches!(err.error, MdocError::InvalidDocType(_, _));
    }

    #[test]
    fn validate_mso_time_window() {
        let now = 100;
        let issuer_auth = dummy_issuer_auth(now);
        let mso = issuer_auth.mso().unwrap();
        let doc_type = "org.iso.18013.5.1.mDL".into();

        // `signed` is in the future relative to the provided time
        assert_matches!(
            mso.validate(now - 1, &doc_type).unwrap_err().error,
            MdocError::DocumentSignedInFuture(_)
        );

        // valid through the whole window, upper bound inclusive
        let valid_until = mso.validity_info().valid_until.timestamp() as u64;
        assert_matches!(mso.validate(now, &doc_type), Ok(()));
        assert_matches!(mso.validate(valid_until, &doc_type), Ok(()));

        // expired strictly after `valid_until`
        assert_matches!(
            mso.validate(valid_until + 1, &doc_type).unwrap_err().error,
            MdocError::DocumentExpired(_)
        );
    }

    #[test]
    fn issuer_auth_x5chain_trust() {
        let issuer_auth = dummy_issuer_auth(100);

        let expected_x5chain = issuer_signer().x5chain();

        // Issuer authenticity verified
        let trust = issuer_x509_trust();
        let x5chain = issuer_auth.x5chain(Some(&trust)).unwrap();
        assert_eq!(expected_x5chain, x5chain);

        // no Issuer is trusted (empty `trust`)
        let trust = X509Trust::new(vec![]);
        let err = issuer_auth.x5chain(Some(&trust)).unwrap_err();
        assert_eq!(err.error, MdocError::X5Chain);

        // every Issuer is trusted (`trust` not provided)
        let x5chain = issuer_auth.x5chain(None).unwrap();
        assert_eq!(expected_x5chain, x5chain);
    }

    #[test]
    fn validity_info_success() {
        let _validity_info = ValidityInfo::new(
            100.try_into().unwrap(),
            200.try_into().unwrap(),
            300.try_into().unwrap(),
            None,
        )
        .unwrap();

        let _validity_info = validity_info(100);
    }

    #[test]
    fn validity_info_valid_from_before_signed_fails() {
        let err = ValidityInfo::new(
            100.try_into().unwrap(),
            50.try_into().unwrap(), // before `signed`
            300.try_into().unwrap(),
            None,
        )
        .unwrap_err();
        assert_matches!(err.error, MdocError::InvalidValidityInfo);
    }

    #[test]
    fn validity_info_valid_until_before_valid_from_fails() {
        let err = ValidityInfo::new(
            100.try_into().unwrap(),
            200.try_into().unwrap(),
            150.try_into().unwrap(), // before `valid_from`
            None,
        )
        .unwrap_err();
        assert_matches!(err.error, MdocError::InvalidValidityInfo);
    }

    #[test]
    fn digest_algorithm_parse() {
        assert_eq!(
            "SHA-256".parse::<DigestAlgorithm>().unwrap(),
            DigestAlgorithm::Sha256
        );
        assert_eq!(
            "SHA-512".parse::<DigestAlgorithm>().unwrap(),
            DigestAlgorithm::Sha512
        );

        let err = "MD5".parse::<DigestAlgorithm>().unwrap_err();
        assert_matches!(
            err.error,
            MdocError::UnsupportedDigestAlgorithm(alg) if alg == "MD5"
        );
    }
}
