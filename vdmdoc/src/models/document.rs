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

//! This module defines the data model described in the section "8.3.2.1.2.2 Device retrieval mdoc
//! response" of the [ISO/IEC 18013-5:2021][1] standard.
//!
//! All the types here are plain data containers: they are produced once by decoding and are
//! read-only afterwards.  Every verification decision belongs to the
//! [`verifier`][crate::verifier] module.
//!
//! [1]: <https://www.iso.org/standard/69084.html>

use std::collections::HashMap;

use base64::Engine as _;
use vderror::traits::{ForeignError as _, PropagateError as _};

use crate::{
    cbor::{
        expect_map, expect_text, expect_u64, require_map_entry, take_map_entry, AsCborValue,
        CborError, EmbeddedCbor, Value,
    },
    models::{
        common::{DataElementIdentifier, DataElementValue, DocType, NameSpace},
        device_auth::DeviceAuth,
        issuer_auth::{DigestAlgorithm, IssuerAuth, MobileSecurityObject},
        BorrowedClaims, Bytes, Claims,
    },
    utils::base64::{base64_url_decode, base64_url_encode},
    MdocError, Result,
};

/// The version of the [`DeviceResponse`] structure.
///
/// The value is currently specified in the section `8.3.2.1.2.2` of the [ISO/IEC 18013-5:2021][1].
///
/// [1]: <https://www.iso.org/standard/69084.html>
const DEVICE_RESPONSE_VERSION: &str = "1.0";

/// [`DeviceResponse`] as defined in the section `8.3.2.1.2.2` of the [ISO/IEC 18013-5:2021][1]
/// standard.
///
/// [1]: <https://www.iso.org/standard/69084.html>
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceResponse {
    version: String,
    documents: Option<Vec<Document>>,
    document_errors: Option<Vec<DocumentError>>,
    status: u64,
}

impl DeviceResponse {
    /// Assembles a [`DeviceResponse`] around already-built [`Document`]s.
    pub fn new(documents: Vec<Document>) -> Self {
        Self {
            version: DEVICE_RESPONSE_VERSION.to_owned(),
            // set to `None` if no `Document`s are present
            documents: (!documents.is_empty()).then_some(documents),
            document_errors: None,
            status: 0,
        }
    }

    /// Parses the provided _CBOR_ bytes into a [`DeviceResponse`].
    pub fn from_cbor_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_slice(bytes)
            .with_err(|| MdocError::DeviceResponseParse("invalid CBOR".to_owned()))
    }

    /// Parses the provided `base64url`-encoded `string` of _CBOR_ data into
    /// [`DeviceResponse`].
    pub fn from_base64_cbor(value: &str) -> Result<Self> {
        // HACK(third-party): We should only use `base64_url_decode`, but the `vp_token` from a
        // certain `third-party` implementation is encoded with invalid padding so we workaround
        // that here.

        let decoded = match base64_url_decode(value) {
            Ok(decoded) => decoded,
            Err(base64::DecodeError::InvalidPadding) => base64::engine::general_purpose::URL_SAFE
                .decode(value)
                .foreign_err(|| MdocError::DeviceResponseParse("invalid base64".to_owned()))?,
            Err(err) => Err(err)
                .foreign_err(|| MdocError::DeviceResponseParse("invalid base64".to_owned()))?,
        };

        Self::from_cbor_bytes(&decoded)
    }

    /// Serializes the [`DeviceResponse`] to `base64url`-encoded (**without
    /// padding**) `string` of _CBOR_ data.
    pub fn to_base64_cbor(&self) -> Result<String> {
        let cbor = self.to_vec().with_err(|| {
            MdocError::DeviceResponseParse("serialization to CBOR failed".to_owned())
        })?;

        Ok(base64_url_encode(cbor))
    }

    /// Consumes the [`DeviceResponse`] and returns the underlying
    /// [`Document`]s.
    pub fn into_documents(self) -> Option<Vec<Document>> {
        self.documents
    }

    /// Returns the underlying [`Document`]s, if any.
    pub fn documents(&self) -> Option<&[Document]> {
        self.documents.as_deref()
    }
}

impl AsCborValue for DeviceResponse {
    fn from_cbor_value(value: Value) -> crate::cbor::Result<Self> {
        // unknown entries are ignored for forward compatibility
        let mut map = expect_map(value, "a DeviceResponse map")?;

        let version = expect_text(
            require_map_entry(&mut map, "version")?,
            "a version text string",
        )?;
        let documents = take_map_entry(&mut map, "documents")
            .map(Vec::<Document>::from_cbor_value)
            .transpose()?;
        let document_errors = take_map_entry(&mut map, "documentErrors")
            .map(Vec::<DocumentError>::from_cbor_value)
            .transpose()?;
        let status = expect_u64(require_map_entry(&mut map, "status")?, "a status code")?;

        Ok(Self {
            version,
            documents,
            document_errors,
            status,
        })
    }

    fn to_cbor_value(&self) -> crate::cbor::Result<Value> {
        let mut map = vec![(
            Value::Text("version".to_owned()),
            Value::Text(self.version.clone()),
        )];

        if let Some(documents) = &self.documents {
            map.push(("documents".into(), documents.to_cbor_value()?));
        }
        if let Some(document_errors) = &self.document_errors {
            map.push(("documentErrors".into(), document_errors.to_cbor_value()?));
        }

        map.push(("status".into(), Value::Integer(self.status.into())));

        Ok(Value::Map(map))
    }
}

/// [`Document`] as defined in the section `8.3.2.1.2.2` of the [ISO/IEC 18013-5:2021][1] standard.
///
/// [1]: <https://www.iso.org/standard/69084.html>
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    doc_type: DocType,
    pub(crate) issuer_signed: IssuerSigned,
    pub(crate) device_signed: DeviceSigned,
    errors: Option<Errors>,
}

impl Document {
    /// Assembles a [`Document`] from its already-built parts.
    pub fn new(
        doc_type: DocType,
        issuer_signed: IssuerSigned,
        device_signed: DeviceSigned,
    ) -> Self {
        Self {
            doc_type,
            issuer_signed,
            device_signed,
            errors: None,
        }
    }

    /// Returns the document type.
    pub fn doc_type(&self) -> &DocType {
        &self.doc_type
    }

    /// Returns the Issuer-signed portion of the document.
    pub fn issuer_signed(&self) -> &IssuerSigned {
        &self.issuer_signed
    }

    /// Returns the Device-signed portion of the document.
    pub fn device_signed(&self) -> &DeviceSigned {
        &self.device_signed
    }

    /// Extracts the [`MobileSecurityObject`] embedded in the Issuer's signature envelope.
    ///
    /// The MSO travels as an embedded _CBOR_ region inside the envelope payload, so this decodes
    /// on demand rather than during document parsing.
    pub fn decode_mso(&self) -> Result<MobileSecurityObject> {
        self.issuer_signed.issuer_auth.mso()
    }

    /// Extracts and returns only the Issuer-signed data elements.
    pub fn into_claims(self) -> Claims {
        self.issuer_signed.into_claims()
    }

    /// Extracts and returns the Device-signed data elements.
    pub fn device_claims(&self) -> BorrowedClaims<'_> {
        self.device_signed.claims()
    }
}

impl AsCborValue for Document {
    fn from_cbor_value(value: Value) -> crate::cbor::Result<Self> {
        let mut map = expect_map(value, "a Document map")?;

        Ok(Self {
            doc_type: DocType::from_cbor_value(require_map_entry(&mut map, "docType")?)?,
            issuer_signed: IssuerSigned::from_cbor_value(require_map_entry(
                &mut map,
                "issuerSigned",
            )?)?,
            device_signed: DeviceSigned::from_cbor_value(require_map_entry(
                &mut map,
                "deviceSigned",
            )?)?,
            errors: take_map_entry(&mut map, "errors")
                .map(Errors::from_cbor_value)
                .transpose()?,
        })
    }

    fn to_cbor_value(&self) -> crate::cbor::Result<Value> {
        let mut map = vec![
            ("docType".into(), self.doc_type.to_cbor_value()?),
            ("issuerSigned".into(), self.issuer_signed.to_cbor_value()?),
            ("deviceSigned".into(), self.device_signed.to_cbor_value()?),
        ];

        if let Some(errors) = &self.errors {
            map.push(("errors".into(), errors.to_cbor_value()?));
        }

        Ok(Value::Map(map))
    }
}

/// [`DocumentError`] as defined in the section `8.3.2.1.2.2` of the [ISO/IEC 18013-5:2021][1]
/// standard.
///
/// [1]: <https://www.iso.org/standard/69084.html>
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentError(DocType, ErrorCode);

impl AsCborValue for DocumentError {
    fn from_cbor_value(value: Value) -> crate::cbor::Result<Self> {
        let mut map = expect_map(value, "a DocumentError map")?;

        if map.len() != 1 {
            return Err(vderror::Error::root(CborError::UnexpectedItem(
                "map",
                "a single-entry DocumentError map",
            )));
        }

        let (doc_type, code) = map.remove(0);

        Ok(Self(
            DocType::from_cbor_value(doc_type)?,
            ErrorCode::from_cbor_value(code)?,
        ))
    }

    fn to_cbor_value(&self) -> crate::cbor::Result<Value> {
        Ok(Value::Map(vec![(
            self.0.to_cbor_value()?,
            self.1.to_cbor_value()?,
        )]))
    }
}

/// [`IssuerSigned`] as defined in the section `8.3.2.1.2.2` of the [ISO/IEC 18013-5:2021][1]
/// standard.
///
/// [1]: <https://www.iso.org/standard/69084.html>
#[derive(Debug, Clone, PartialEq)]
pub struct IssuerSigned {
    pub(crate) name_spaces: Option<IssuerNameSpaces>,
    pub(crate) issuer_auth: IssuerAuth,
}

impl IssuerSigned {
    /// Assembles an [`IssuerSigned`] from its already-built parts.
    pub fn new(name_spaces: Option<IssuerNameSpaces>, issuer_auth: IssuerAuth) -> Self {
        Self {
            name_spaces,
            issuer_auth,
        }
    }

    /// Extracts and returns only the data elements.
    pub fn into_claims(self) -> Claims {
        self.name_spaces
            .map(IssuerNameSpaces::into_claims)
            .unwrap_or_else(|| Claims(HashMap::new()))
    }

    /// Extracts and returns the [`BorrowedClaims`].
    pub fn claims(&self) -> BorrowedClaims<'_> {
        self.name_spaces
            .as_ref()
            .map(IssuerNameSpaces::claims)
            .unwrap_or_else(|| BorrowedClaims(HashMap::new()))
    }

    /// Returns the Issuer's signature envelope.
    pub fn issuer_auth(&self) -> &IssuerAuth {
        &self.issuer_auth
    }

    /// Returns the signed namespaces, if any claims were disclosed.
    pub fn name_spaces(&self) -> Option<&IssuerNameSpaces> {
        self.name_spaces.as_ref()
    }
}

impl AsCborValue for IssuerSigned {
    fn from_cbor_value(value: Value) -> crate::cbor::Result<Self> {
        let mut map = expect_map(value, "an IssuerSigned map")?;

        Ok(Self {
            name_spaces: take_map_entry(&mut map, "nameSpaces")
                .map(IssuerNameSpaces::from_cbor_value)
                .transpose()?,
            issuer_auth: IssuerAuth::from_cbor_value(require_map_entry(&mut map, "issuerAuth")?)?,
        })
    }

    fn to_cbor_value(&self) -> crate::cbor::Result<Value> {
        let mut map = Vec::with_capacity(2);

        if let Some(name_spaces) = &self.name_spaces {
            map.push(("nameSpaces".into(), name_spaces.to_cbor_value()?));
        }
        map.push(("issuerAuth".into(), self.issuer_auth.to_cbor_value()?));

        Ok(Value::Map(map))
    }
}

/// [`IssuerNameSpaces`] as defined in the section `8.3.2.1.2.2` of the [ISO/IEC 18013-5:2021][1]
/// standard.
///
/// [1]: <https://www.iso.org/standard/69084.html>
#[derive(Debug, Clone, PartialEq)]
pub struct IssuerNameSpaces(pub(crate) HashMap<NameSpace, Vec<IssuerSignedItemBytes>>);

impl IssuerNameSpaces {
    /// Extracts and returns only the data elements.
    pub fn into_claims(self) -> Claims {
        Claims(
            self.0
                .into_iter()
                .map(|(k, vs)| {
                    let vs_map = vs
                        .into_iter()
                        .map(|item| {
                            let item = item.0.into_inner();
                            (item.element_identifier, item.element_value)
                        })
                        .collect();

                    (k, vs_map)
                })
                .collect(),
        )
    }

    /// Extracts and returns the [`BorrowedClaims`].
    fn claims(&self) -> BorrowedClaims<'_> {
        BorrowedClaims(
            self.0
                .iter()
                .map(|(k, vs)| {
                    let vs_map = vs
                        .iter()
                        .map(|item| {
                            (
                                &item.0.inner().element_identifier,
                                &item.0.inner().element_value,
                            )
                        })
                        .collect();

                    (k, vs_map)
                })
                .collect(),
        )
    }
}

impl AsCborValue for IssuerNameSpaces {
    fn from_cbor_value(value: Value) -> crate::cbor::Result<Self> {
        Ok(Self(HashMap::from_cbor_value(value)?))
    }

    fn to_cbor_value(&self) -> crate::cbor::Result<Value> {
        self.0.to_cbor_value()
    }
}

/// [`IssuerSignedItemBytes`] as defined in the section `8.3.2.1.2.2` of the [ISO/IEC
/// 18013-5:2021][1] standard.
///
/// [1]: <https://www.iso.org/standard/69084.html>
#[derive(Debug, Clone, PartialEq)]
pub struct IssuerSignedItemBytes(pub(crate) EmbeddedCbor<IssuerSignedItem>);

impl IssuerSignedItemBytes {
    /// Wraps the provided [`IssuerSignedItem`] into its embedded-CBOR form.
    pub fn new(item: IssuerSignedItem) -> crate::cbor::Result<Self> {
        Ok(Self(EmbeddedCbor::new(item)?))
    }

    /// Computes the digest of the serialized `self`, over the exact bytes the Issuer signed.
    pub fn digest(&self, alg: &DigestAlgorithm) -> Vec<u8> {
        alg.digest(self.0.tagged_bytes())
    }

    /// Returns the embedded [`IssuerSignedItem`].
    pub fn item(&self) -> &IssuerSignedItem {
        self.0.inner()
    }
}

impl AsCborValue for IssuerSignedItemBytes {
    fn from_cbor_value(value: Value) -> crate::cbor::Result<Self> {
        Ok(Self(EmbeddedCbor::from_cbor_value(value)?))
    }

    fn to_cbor_value(&self) -> crate::cbor::Result<Value> {
        self.0.to_cbor_value()
    }
}

/// [`IssuerSignedItem`] as defined in the section `8.3.2.1.2.2` of the [ISO/IEC 18013-5:2021][1]
/// standard.
///
/// [1]: <https://www.iso.org/standard/69084.html>
#[derive(Clone, Debug, PartialEq)]
pub struct IssuerSignedItem {
    pub(crate) random: Bytes,
    pub(crate) digest_id: DigestID,
    pub(crate) element_value: DataElementValue,
    pub(crate) element_identifier: DataElementIdentifier,
}

impl IssuerSignedItem {
    /// Creates a new [`IssuerSignedItem`] over the provided parts.
    pub fn new(
        digest_id: DigestID,
        random: Bytes,
        element_identifier: DataElementIdentifier,
        element_value: DataElementValue,
    ) -> Self {
        Self {
            random,
            digest_id,
            element_value,
            element_identifier,
        }
    }

    /// The digest ID referencing this item in the Mobile Security Object.
    pub fn digest_id(&self) -> DigestID {
        self.digest_id
    }

    /// The identifier of the data element.
    pub fn element_identifier(&self) -> &DataElementIdentifier {
        &self.element_identifier
    }

    /// The value of the data element.
    pub fn element_value(&self) -> &DataElementValue {
        &self.element_value
    }
}

impl AsCborValue for IssuerSignedItem {
    fn from_cbor_value(value: Value) -> crate::cbor::Result<Self> {
        let mut map = expect_map(value, "an IssuerSignedItem map")?;

        Ok(Self {
            random: Bytes::from_cbor_value(require_map_entry(&mut map, "random")?)?,
            digest_id: DigestID::from_cbor_value(require_map_entry(&mut map, "digestID")?)?,
            element_value: DataElementValue::from_cbor_value(require_map_entry(
                &mut map,
                "elementValue",
            )?)?,
            element_identifier: DataElementIdentifier::from_cbor_value(require_map_entry(
                &mut map,
                "elementIdentifier",
            )?)?,
        })
    }

    fn to_cbor_value(&self) -> crate::cbor::Result<Value> {
        Ok(Value::Map(vec![
            ("digestID".into(), self.digest_id.to_cbor_value()?),
            ("random".into(), self.random.to_cbor_value()?),
            (
                "elementIdentifier".into(),
                self.element_identifier.to_cbor_value()?,
            ),
            ("elementValue".into(), self.element_value.to_cbor_value()?),
        ]))
    }
}

/// Digest ID for issuer data authentication.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct DigestID(u64);

impl std::fmt::Display for DigestID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for DigestID {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<usize> for DigestID {
    fn from(value: usize) -> Self {
        Self(value as u64)
    }
}

impl AsCborValue for DigestID {
    fn from_cbor_value(value: Value) -> crate::cbor::Result<Self> {
        Ok(Self(expect_u64(value, "a digest ID")?))
    }

    fn to_cbor_value(&self) -> crate::cbor::Result<Value> {
        Ok(Value::Integer(self.0.into()))
    }
}

/// [`DeviceSigned`] as defined in the section `8.3.2.1.2.2` of the [ISO/IEC 18013-5:2021][1]
/// standard.
///
/// [1]: <https://www.iso.org/standard/69084.html>
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceSigned {
    pub(crate) name_spaces: DeviceNameSpacesBytes,
    pub(crate) device_auth: DeviceAuth,
}

impl DeviceSigned {
    /// Assembles a [`DeviceSigned`] from its already-built parts.
    pub fn new(name_spaces: DeviceNameSpacesBytes, device_auth: DeviceAuth) -> Self {
        Self {
            name_spaces,
            device_auth,
        }
    }

    /// Extracts and returns only the data elements.
    pub fn into_claims(self) -> Claims {
        self.name_spaces.0.into_inner().into_claims()
    }

    /// Extracts and returns the [`BorrowedClaims`].
    pub fn claims(&self) -> BorrowedClaims<'_> {
        self.name_spaces.0.inner().claims()
    }

    /// Returns the authentication envelope of the Device.
    pub fn device_auth(&self) -> &DeviceAuth {
        &self.device_auth
    }

    /// Returns the Device-signed namespaces together with their original bytes.
    pub fn name_spaces(&self) -> &DeviceNameSpacesBytes {
        &self.name_spaces
    }
}

impl AsCborValue for DeviceSigned {
    fn from_cbor_value(value: Value) -> crate::cbor::Result<Self> {
        let mut map = expect_map(value, "a DeviceSigned map")?;

        Ok(Self {
            name_spaces: DeviceNameSpacesBytes::from_cbor_value(require_map_entry(
                &mut map,
                "nameSpaces",
            )?)?,
            device_auth: DeviceAuth::from_cbor_value(require_map_entry(&mut map, "deviceAuth")?)?,
        })
    }

    fn to_cbor_value(&self) -> crate::cbor::Result<Value> {
        Ok(Value::Map(vec![
            ("nameSpaces".into(), self.name_spaces.to_cbor_value()?),
            ("deviceAuth".into(), self.device_auth.to_cbor_value()?),
        ]))
    }
}

/// [`DeviceNameSpacesBytes`] as defined in the section `8.3.2.1.2.2` of the [ISO/IEC
/// 18013-5:2021][1] standard.
///
/// [1]: <https://www.iso.org/standard/69084.html>
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceNameSpacesBytes(pub(crate) EmbeddedCbor<DeviceNameSpaces>);

impl DeviceNameSpacesBytes {
    /// Wraps the provided [`DeviceNameSpaces`] into its embedded-CBOR form.
    pub fn new(name_spaces: DeviceNameSpaces) -> crate::cbor::Result<Self> {
        Ok(Self(EmbeddedCbor::new(name_spaces)?))
    }

    /// Returns the embedded [`DeviceNameSpaces`].
    pub fn name_spaces(&self) -> &DeviceNameSpaces {
        self.0.inner()
    }
}

impl AsCborValue for DeviceNameSpacesBytes {
    fn from_cbor_value(value: Value) -> crate::cbor::Result<Self> {
        Ok(Self(EmbeddedCbor::from_cbor_value(value)?))
    }

    fn to_cbor_value(&self) -> crate::cbor::Result<Value> {
        self.0.to_cbor_value()
    }
}

/// [`DeviceNameSpaces`] as defined in the section `8.3.2.1.2.2` of the [ISO/IEC 18013-5:2021][1]
/// standard.
///
/// [1]: <https://www.iso.org/standard/69084.html>
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceNameSpaces(pub(crate) HashMap<NameSpace, DeviceSignedItems>);

impl DeviceNameSpaces {
    /// Extracts and returns only the data elements.
    pub fn into_claims(self) -> Claims {
        Claims(self.0.into_iter().map(|(k, vs)| (k, vs.0)).collect())
    }

    /// Extracts and returns the [`BorrowedClaims`].
    pub fn claims(&self) -> BorrowedClaims<'_> {
        BorrowedClaims(
            self.0
                .iter()
                .map(|(k, vs)| (k, vs.0.iter().collect()))
                .collect(),
        )
    }

    /// Returns `true` when no namespace carries any data element.
    pub fn is_empty(&self) -> bool {
        self.0.values().all(|items| items.0.is_empty())
    }
}

impl From<HashMap<NameSpace, DeviceSignedItems>> for DeviceNameSpaces {
    fn from(value: HashMap<NameSpace, DeviceSignedItems>) -> Self {
        Self(value)
    }
}

impl AsCborValue for DeviceNameSpaces {
    fn from_cbor_value(value: Value) -> crate::cbor::Result<Self> {
        Ok(Self(HashMap::from_cbor_value(value)?))
    }

    fn to_cbor_value(&self) -> crate::cbor::Result<Value> {
        self.0.to_cbor_value()
    }
}

/// [`DeviceSignedItems`] as defined in the section `8.3.2.1.2.2` of the [ISO/IEC 18013-5:2021][1]
/// standard.
///
/// [1]: <https://www.iso.org/standard/69084.html>
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceSignedItems(pub(crate) HashMap<DataElementIdentifier, DataElementValue>);

impl From<HashMap<DataElementIdentifier, DataElementValue>> for DeviceSignedItems {
    fn from(value: HashMap<DataElementIdentifier, DataElementValue>) -> Self {
        Self(value)
    }
}

impl AsCborValue for DeviceSignedItems {
    fn from_cbor_value(value: Value) -> crate::cbor::Result<Self> {
        Ok(Self(HashMap::from_cbor_value(value)?))
    }

    fn to_cbor_value(&self) -> crate::cbor::Result<Value> {
        self.0.to_cbor_value()
    }
}

/// [`Errors`] as defined in the section `8.3.2.1.2.2` of the [ISO/IEC 18013-5:2021][1] standard.
///
/// [1]: <https://www.iso.org/standard/69084.html>
#[derive(Debug, Clone, PartialEq)]
pub struct Errors(HashMap<NameSpace, ErrorItems>);

impl AsCborValue for Errors {
    fn from_cbor_value(value: Value) -> crate::cbor::Result<Self> {
        Ok(Self(HashMap::from_cbor_value(value)?))
    }

    fn to_cbor_value(&self) -> crate::cbor::Result<Value> {
        self.0.to_cbor_value()
    }
}

/// [`ErrorItems`] as defined in the section `8.3.2.1.2.2` of the [ISO/IEC 18013-5:2021][1]
/// standard.
///
/// [1]: <https://www.iso.org/standard/69084.html>
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorItems(HashMap<DataElementIdentifier, ErrorCode>);

impl AsCborValue for ErrorItems {
    fn from_cbor_value(value: Value) -> crate::cbor::Result<Self> {
        Ok(Self(HashMap::from_cbor_value(value)?))
    }

    fn to_cbor_value(&self) -> crate::cbor::Result<Value> {
        self.0.to_cbor_value()
    }
}

/// [`ErrorCode`] as defined in the section `8.3.2.1.2.2` of the [ISO/IEC 18013-5:2021][1]
/// standard.
///
/// [1]: <https://www.iso.org/standard/69084.html>
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorCode(i64);

impl AsCborValue for ErrorCode {
    fn from_cbor_value(value: Value) -> crate::cbor::Result<Self> {
        let code = value
            .as_integer()
            .and_then(|int| i64::try_from(int).ok())
            .ok_or_else(|| {
                vderror::Error::root(CborError::UnexpectedItem("value", "an error code"))
            })?;

        Ok(Self(code))
    }

    fn to_cbor_value(&self) -> crate::cbor::Result<Value> {
        Ok(Value::Integer(self.0.into()))
    }
}
