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

//! Fixtures shared by the test modules of this crate.
//!
//! The issuer and device key material is generated once per test process, so every fixture built
//! here is mutually consistent: the issuer certificate matches the issuer signing key, and the
//! device key signed into the MSO matches the device signer.

use std::collections::HashMap;
use std::sync::OnceLock;

use openssl::{
    ec::EcKey,
    ecdsa::EcdsaSig,
    pkey::{PKey, Private},
    x509::X509,
};
use rand::thread_rng;
use vd_sig_utils::{openssl_ec_pub_key_to_jwk, HasX5Chain, JwkPublic, Signer, SigningAlgorithm};
use vdx5chain::{X509Trust, X5Chain};

use crate::{
    cbor::{EmbeddedCbor, Value},
    cose::{Algorithm, CoseSign1, Header, ProtectedHeader, HEADER_LABEL_X5CHAIN},
    models::{
        common::{DataElementValue, DocType},
        device_auth::{DeviceAuth, DeviceAuthentication},
        document::{
            DeviceNameSpaces, DeviceNameSpacesBytes, DeviceResponse, DeviceSigned, Document,
            IssuerNameSpaces, IssuerSigned, IssuerSignedItem, IssuerSignedItemBytes,
        },
        issuer_auth::{
            x5chain_to_cbor_value, DeviceKey, DeviceKeyInfo, DigestAlgorithm, DigestIDs,
            IssuerAuth, KeyAuthorizations, MobileSecurityObject, MobileSecurityObjectBytes,
            ValidityInfo, ValueDigests, MOBILE_SECURITY_OBJECT_VERSION,
        },
        Bytes,
    },
    transcript::{PresentationContext, SessionTranscript},
};

use crate::cbor::AsCborValue as _;

pub(crate) const DUMMY_DOC_TYPE: &str = "org.iso.18013.5.1.mDL";
pub(crate) const DUMMY_NAMESPACE: &str = "org.iso.18013.5.1";

/// The issuer key pair and its self-signed certificate, in DER, generated once per process.
fn issuer_material() -> &'static (Vec<u8>, Vec<u8>) {
    static MATERIAL: OnceLock<(Vec<u8>, Vec<u8>)> = OnceLock::new();

    MATERIAL.get_or_init(|| {
        let key = vdx5chain::test_utils::generate_key();
        let cert = vdx5chain::test_utils::self_signed_ca_with_key("mdoc-test-issuer", &key);

        (
            key.private_key_to_der().unwrap(),
            cert.to_der().unwrap(),
        )
    })
}

/// The device private key, in DER, generated once per process.
fn device_material() -> &'static Vec<u8> {
    static MATERIAL: OnceLock<Vec<u8>> = OnceLock::new();

    MATERIAL.get_or_init(|| {
        vdx5chain::test_utils::generate_key()
            .private_key_to_der()
            .unwrap()
    })
}

pub(crate) struct SimpleSigner {
    key: EcKey<Private>,
    cert: Option<X509>,
}

// Good enough implementation of signer that should provide valid issuer's and device's
// signatures.
impl SimpleSigner {
    pub fn issuer() -> Self {
        let (key_der, cert_der) = issuer_material();

        Self {
            key: PKey::<Private>::private_key_from_der(key_der)
                .unwrap()
                .ec_key()
                .unwrap(),
            cert: Some(X509::from_der(cert_der).unwrap()),
        }
    }

    pub fn device() -> Self {
        Self {
            key: PKey::<Private>::private_key_from_der(device_material())
                .unwrap()
                .ec_key()
                .unwrap(),
            cert: None,
        }
    }
}

impl Signer for SimpleSigner {
    fn algorithm(&self) -> SigningAlgorithm {
        SigningAlgorithm::Es256
    }

    fn sign(&self, message: &[u8]) -> Result<Vec<u8>, Box<dyn std::error::Error + Send + Sync>> {
        let digest = crate::utils::digest::sha256(message);
        let signature = EcdsaSig::sign(&digest, self.key.as_ref()).unwrap();

        let mut ser_sig = signature.r().to_vec_padded(32).unwrap();
        ser_sig.extend(signature.s().to_vec_padded(32).unwrap());

        Ok(ser_sig)
    }

    fn public_jwk(&self) -> Result<JwkPublic, Box<dyn std::error::Error + Send + Sync>> {
        let pkey = EcKey::from_public_key(self.key.group(), self.key.public_key()).unwrap();
        Ok(openssl_ec_pub_key_to_jwk(&pkey, None).unwrap())
    }
}

impl HasX5Chain for SimpleSigner {
    fn x5chain(&self) -> X5Chain {
        X5Chain::new(vec![self.cert.clone().unwrap()]).unwrap()
    }
}

pub(crate) fn issuer_signer() -> SimpleSigner {
    SimpleSigner::issuer()
}

pub(crate) fn issuer_x509_trust() -> X509Trust {
    let (_, cert_der) = issuer_material();
    X509Trust::new(vec![X509::from_der(cert_der).unwrap()])
}

pub(crate) fn dummy_device_key() -> (SimpleSigner, DeviceKey) {
    let signer = SimpleSigner::device();
    let device_key = DeviceKey::from_jwk(&signer.public_jwk().unwrap()).unwrap();

    (signer, device_key)
}

pub(crate) fn validity_info(current_time: u64) -> ValidityInfo {
    ValidityInfo::new(
        current_time.try_into().unwrap(),
        current_time.try_into().unwrap(),
        (current_time + 365 * 24 * 60 * 60).try_into().unwrap(), // in 1 year
        None,
    )
    .unwrap()
}

pub(crate) fn default_context() -> PresentationContext {
    PresentationContext::openid4vp(
        "client_id".to_owned(),
        "response_uri".to_owned(),
        "nonce".to_owned(),
    )
}

/// A single namespace with three issuer-signed data elements and fresh salts.
pub(crate) fn dummy_issuer_name_spaces() -> IssuerNameSpaces {
    let mut rng = thread_rng();

    let claims = [
        ("family_name", "Doe"),
        ("given_name", "John"),
        ("birth_date", "1980-01-02"),
    ];

    let items = claims
        .iter()
        .enumerate()
        .map(|(digest_id, (identifier, value))| {
            IssuerSignedItemBytes::new(IssuerSignedItem::new(
                digest_id.into(),
                Bytes::random_salt(&mut rng),
                (*identifier).into(),
                DataElementValue::from(*value),
            ))
            .unwrap()
        })
        .collect();

    IssuerNameSpaces(HashMap::from([(DUMMY_NAMESPACE.into(), items)]))
}

/// Builds and signs an [`IssuerAuth`] over the provided namespaces.
pub(crate) fn make_issuer_auth(
    doc_type: DocType,
    name_spaces: &IssuerNameSpaces,
    device_key: DeviceKey,
    key_authorizations: Option<KeyAuthorizations>,
    validity_info: ValidityInfo,
) -> IssuerAuth {
    let value_digests = ValueDigests(
        name_spaces
            .0
            .iter()
            .map(|(name_space, items)| {
                let digests = DigestIDs(
                    items
                        .iter()
                        .map(|item| {
                            (
                                item.item().digest_id(),
                                Bytes::from(item.digest(&DigestAlgorithm::Sha256)),
                            )
                        })
                        .collect(),
                );

                (name_space.clone(), digests)
            })
            .collect(),
    );

    let mso = MobileSecurityObject {
        version: MOBILE_SECURITY_OBJECT_VERSION.to_owned(),
        digest_algorithm: DigestAlgorithm::Sha256.as_str().to_owned(),
        value_digests,
        device_key_info: DeviceKeyInfo {
            device_key,
            key_authorizations,
            key_info: None,
        },
        doc_type,
        validity_info,
    };

    let payload = MobileSecurityObjectBytes(EmbeddedCbor::new(mso).unwrap())
        .to_vec()
        .unwrap();

    let signer = SimpleSigner::issuer();

    let mut sign1 = CoseSign1 {
        protected: ProtectedHeader::new(Header {
            alg: Some(Algorithm::Es256),
            rest: vec![],
        }),
        unprotected: Header {
            alg: None,
            rest: vec![(
                Value::Integer(HEADER_LABEL_X5CHAIN),
                x5chain_to_cbor_value(&signer.x5chain()).unwrap(),
            )],
        },
        payload: Some(payload),
        signature: vec![],
    };

    let to_sign = sign1.signature_payload(&[], None).unwrap();
    sign1.signature = signer.sign(&to_sign).unwrap();

    IssuerAuth(sign1)
}

pub(crate) fn dummy_issuer_auth(current_time: u64) -> IssuerAuth {
    let (_, device_key) = dummy_device_key();

    make_issuer_auth(
        DUMMY_DOC_TYPE.into(),
        &dummy_issuer_name_spaces(),
        device_key,
        None,
        validity_info(current_time),
    )
}

/// Builds and signs a [`DeviceSigned`] for the provided presentation context.
pub(crate) fn make_device_signed(
    context: &PresentationContext,
    doc_type: &DocType,
    device_name_spaces: DeviceNameSpaces,
) -> DeviceSigned {
    let name_spaces = DeviceNameSpacesBytes::new(device_name_spaces).unwrap();

    let transcript = SessionTranscript::build(context, DigestAlgorithm::Sha256).unwrap();
    let authentication = DeviceAuthentication::new(&transcript, doc_type, &name_spaces);
    let detached_payload = authentication.to_detached_payload().unwrap();

    let signer = SimpleSigner::device();

    let mut sign1 = CoseSign1 {
        protected: ProtectedHeader::new(Header {
            alg: Some(Algorithm::Es256),
            rest: vec![],
        }),
        unprotected: Header::default(),
        payload: None,
        signature: vec![],
    };

    let to_sign = sign1
        .signature_payload(&[], Some(&detached_payload))
        .unwrap();
    sign1.signature = signer.sign(&to_sign).unwrap();

    DeviceSigned::new(name_spaces, DeviceAuth::DeviceSignature(sign1))
}

pub(crate) fn dummy_document(current_time: u64, context: &PresentationContext) -> Document {
    dummy_document_with_device_claims(current_time, context, DeviceNameSpaces::default(), None)
}

pub(crate) fn dummy_document_with_device_claims(
    current_time: u64,
    context: &PresentationContext,
    device_name_spaces: DeviceNameSpaces,
    key_authorizations: Option<KeyAuthorizations>,
) -> Document {
    let (_, device_key) = dummy_device_key();

    let name_spaces = dummy_issuer_name_spaces();
    let issuer_auth = make_issuer_auth(
        DUMMY_DOC_TYPE.into(),
        &name_spaces,
        device_key,
        key_authorizations,
        validity_info(current_time),
    );

    let issuer_signed = IssuerSigned::new(Some(name_spaces), issuer_auth);
    let device_signed = make_device_signed(context, &DUMMY_DOC_TYPE.into(), device_name_spaces);

    Document::new(DUMMY_DOC_TYPE.into(), issuer_signed, device_signed)
}

pub(crate) fn dummy_device_response(current_time: u64) -> DeviceResponse {
    DeviceResponse::new(vec![dummy_document(current_time, &default_context())])
}
