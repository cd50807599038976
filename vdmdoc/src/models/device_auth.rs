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

//! This module implements the `mdoc` authentication model from the section `9.1.3` of the
//! [ISO/IEC 18013-5:2021][1] standard.
//!
//! [1]: <https://www.iso.org/standard/69084.html>

use vd_sig_utils::{SignatureVerifier, SigningAlgorithm};
use vderror::traits::{ErrorContext as _, ForeignBoxed as _, PropagateError as _};

use crate::{
    cbor::{expect_map, AsCborValue, CborError, RawCbor, Value},
    cose::{CoseMac0, CoseSign1},
    models::{common::DocType, document::DeviceNameSpacesBytes, issuer_auth::DeviceKey},
    transcript::SessionTranscript,
    MdocError, Result,
};

/// The fixed first element of the [`DeviceAuthentication`] array.
const DEVICE_AUTHENTICATION_CONTEXT: &str = "DeviceAuthentication";

/// [`DeviceAuth`] as defined in the section `8.3.2.1.2.2` of the [ISO/IEC 18013-5:2021][1]
/// standard.
///
/// A valid document carries **exactly one** of the signature or the MAC; the invariant is
/// structural here, so a document with both (or neither) fails at decode time.
///
/// [1]: <https://www.iso.org/standard/69084.html>
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceAuth {
    /// The Device authenticated the presentation with an asymmetric signature.
    DeviceSignature(CoseSign1),
    /// The Device authenticated the presentation with a MAC over an out-of-band agreed key.
    DeviceMac(CoseMac0),
}

impl DeviceAuth {
    /// Verifies the Device authentication over the provided [`DeviceAuthentication`] context.
    ///
    /// The authenticated payload is detached: it is reconstructed from the session transcript and
    /// the presented document, and never travels with the envelope.
    ///
    /// **Note**: currently, only the signature is supported. Verifying the MAC results in the
    /// [DeviceMac][MdocError::DeviceMac] error, since deriving the symmetric key is out of scope.
    pub(crate) fn verify<'a>(
        &self,
        device_authentication: &DeviceAuthentication<'_>,
        get_signature_verifier: impl Fn(SigningAlgorithm) -> Option<&'a dyn SignatureVerifier>,
        device_key: &DeviceKey,
    ) -> Result<()> {
        match self {
            DeviceAuth::DeviceSignature(sign1) => {
                let detached_payload = device_authentication.to_detached_payload()?;

                let alg: SigningAlgorithm = sign1
                    .protected
                    .header
                    .alg
                    .map(Into::into)
                    .ok_or_else(|| vderror::Error::root(MdocError::MissingSigningAlgorithm))
                    .ctx(|| "device authentication")?;

                let signature_verifier = get_signature_verifier(alg).ok_or_else(|| {
                    vderror::Error::root(MdocError::MissingSignatureVerifier(alg))
                })?;

                let jwk = device_key.as_jwk()?;

                let signed_bytes = sign1
                    .signature_payload(&[], Some(&detached_payload))
                    .with_err(|| MdocError::DeviceAuthentication)?;

                let verified = signature_verifier
                    .verify(&signed_bytes, &sign1.signature, &jwk)
                    .foreign_boxed_err(|| MdocError::InvalidSignature)
                    .ctx(|| "error while verifying device signature")?;

                if !verified {
                    return Err(vderror::Error::root(MdocError::InvalidSignature)
                        .ctx("the device signature is not valid"));
                }

                Ok(())
            }
            DeviceAuth::DeviceMac(_) => Err(vderror::Error::root(MdocError::DeviceMac)),
        }
    }
}

impl AsCborValue for DeviceAuth {
    fn from_cbor_value(value: Value) -> crate::cbor::Result<Self> {
        let mut map = expect_map(value, "a DeviceAuth map")?;

        if map.len() != 1 {
            return Err(vderror::Error::root(CborError::UnexpectedItem(
                "map",
                "exactly one of `deviceSignature` or `deviceMac`",
            )));
        }

        let (key, envelope) = map.remove(0);

        match key.as_text() {
            Some("deviceSignature") => Ok(DeviceAuth::DeviceSignature(CoseSign1::from_cbor_value(
                envelope,
            )?)),
            Some("deviceMac") => Ok(DeviceAuth::DeviceMac(CoseMac0::from_cbor_value(envelope)?)),
            _ => Err(vderror::Error::root(CborError::UnexpectedItem(
                "map entry",
                "exactly one of `deviceSignature` or `deviceMac`",
            ))),
        }
    }

    fn to_cbor_value(&self) -> crate::cbor::Result<Value> {
        Ok(match self {
            DeviceAuth::DeviceSignature(sign1) => Value::Map(vec![(
                "deviceSignature".into(),
                sign1.to_cbor_value()?,
            )]),
            DeviceAuth::DeviceMac(mac0) => {
                Value::Map(vec![("deviceMac".into(), mac0.to_cbor_value()?)])
            }
        })
    }
}

/// [`DeviceAuthentication`] as defined in the section `9.1.3.4` of the [ISO/IEC 18013-5:2021][1]
/// standard.
///
/// This is the structure both the Device and the Verifier must compute identically:
/// `["DeviceAuthentication", SessionTranscript, DocType, DeviceNameSpacesBytes]`.  The Device's
/// signature or MAC is computed over its embedded-CBOR serialization
/// (`DeviceAuthenticationBytes`), carried as a detached payload.
///
/// [1]: <https://www.iso.org/standard/69084.html>
#[derive(Debug)]
pub struct DeviceAuthentication<'a> {
    session_transcript: &'a SessionTranscript,
    doc_type: &'a DocType,
    name_spaces: &'a DeviceNameSpacesBytes,
}

impl<'a> DeviceAuthentication<'a> {
    /// Creates a new [`DeviceAuthentication`] over the provided parts.
    pub fn new(
        session_transcript: &'a SessionTranscript,
        doc_type: &'a DocType,
        name_spaces: &'a DeviceNameSpacesBytes,
    ) -> Self {
        Self {
            session_transcript,
            doc_type,
            name_spaces,
        }
    }

    /// Serializes `self` into the `DeviceAuthenticationBytes` detached payload.
    pub fn to_detached_payload(&self) -> Result<Vec<u8>> {
        let authentication = Value::Array(vec![
            DEVICE_AUTHENTICATION_CONTEXT.into(),
            self.session_transcript.to_cbor_value(),
            self.doc_type
                .to_cbor_value()
                .with_err(|| MdocError::DeviceAuthentication)?,
            self.name_spaces
                .to_cbor_value()
                .with_err(|| MdocError::DeviceAuthentication)?,
        ]);

        let raw = RawCbor::wrap(&authentication).with_err(|| MdocError::DeviceAuthentication)?;

        Ok(raw.as_bytes().to_vec())
    }
}
