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

//! This module builds the `SessionTranscript` binding a presentation to its transport context,
//! per Annexes B and C of [ISO/IEC TS 18013-7:2024][1] as profiled by [OpenID4VP][2].
//!
//! Both the Device and the Verifier compute the transcript independently from the shared protocol
//! context; its serialized bytes (never its structural identity) participate in the device
//! authentication.  Construction is a pure function of the context, which is what makes the two
//! sides arrive at byte-identical transcripts.
//!
//! [1]: <https://www.iso.org/standard/82772.html>
//! [2]: <https://openid.net/specs/openid-4-verifiable-presentations-1_0.html>

use vderror::traits::PropagateError as _;

use crate::{
    cbor::{self, Value},
    models::issuer_auth::DigestAlgorithm,
    MdocError, Result,
};

/// The fixed identifier string of the handover used with the W3C Digital Credentials API.
const DC_API_HANDOVER_TYPE_IDENTIFIER: &str = "OpenID4VPDCAPIHandover";

/// The transport profile a credential is presented over.
///
/// This folds the `is_dc_api`/`is_encrypted` channel flags of the calling protocol layer into a
/// structural choice: the encryption parameters can only be present on the browser-API profile.
#[derive(Debug, Clone, PartialEq)]
pub enum PresentationProfile {
    /// Remote presentation via OpenID4VP redirects.
    OpenId4Vp {
        /// The Verifier's declared client identifier (the audience of the presentation).
        client_id: String,
        /// The URI the Verifier receives the response on.
        response_uri: String,
    },
    /// Presentation via the W3C Digital Credentials API from a browser or platform context.
    DcApi {
        /// The origin of the requesting browser or app context.
        origin: String,
        /// The serialized encryption parameters of the response channel, committing to the HPKE
        /// recipient key; [`None`] on a plaintext channel.
        encryption_info: Option<Vec<u8>>,
    },
}

/// The protocol context a verification runs against.
///
/// Supplied by the calling OpenID4VP session layer; this crate only consumes it.
#[derive(Debug, Clone, PartialEq)]
pub struct PresentationContext {
    pub(crate) nonce: String,
    pub(crate) profile: PresentationProfile,
}

impl PresentationContext {
    /// Context of a remote OpenID4VP presentation.
    pub fn openid4vp(client_id: String, response_uri: String, nonce: String) -> Self {
        Self {
            nonce,
            profile: PresentationProfile::OpenId4Vp {
                client_id,
                response_uri,
            },
        }
    }

    /// Context of a Digital Credentials API presentation over a plaintext channel.
    pub fn dc_api(origin: String, nonce: String) -> Self {
        Self {
            nonce,
            profile: PresentationProfile::DcApi {
                origin,
                encryption_info: None,
            },
        }
    }

    /// Context of a Digital Credentials API presentation over an encrypted channel.
    ///
    /// The `encryption_info` bytes are the serialized encryption parameters of the channel; they
    /// bind the specific HPKE recipient key into the transcript.
    pub fn dc_api_encrypted(origin: String, nonce: String, encryption_info: Vec<u8>) -> Self {
        Self {
            nonce,
            profile: PresentationProfile::DcApi {
                origin,
                encryption_info: Some(encryption_info),
            },
        }
    }

    /// The nonce of this presentation.
    pub fn nonce(&self) -> &str {
        &self.nonce
    }
}

/// The `SessionTranscript` structure of the section `9.1.5.1` of [ISO/IEC 18013-5:2021][1].
///
/// For the presentation flows supported here the device engagement and reader key elements are
/// absent, so the transcript is `[null, null, handover]` with a profile-specific handover.  The
/// structure is deterministically serialized at construction and never mutated afterwards.
///
/// [1]: <https://www.iso.org/standard/69084.html>
#[derive(Debug, Clone, PartialEq)]
pub struct SessionTranscript {
    value: Value,
    bytes: Vec<u8>,
}

impl SessionTranscript {
    /// Builds the transcript for the provided context.
    ///
    /// The `digest_alg` is the digest algorithm negotiated by the credential (the one declared in
    /// its Mobile Security Object); the handover hashes are computed with it.
    pub fn build(context: &PresentationContext, digest_alg: DigestAlgorithm) -> Result<Self> {
        let handover = match &context.profile {
            PresentationProfile::OpenId4Vp {
                client_id,
                response_uri,
            } => Value::Array(vec![
                Value::Bytes(digest_alg.digest(client_id.as_bytes())),
                Value::Bytes(digest_alg.digest(response_uri.as_bytes())),
                Value::Text(context.nonce.clone()),
            ]),
            PresentationProfile::DcApi {
                origin,
                encryption_info,
            } => {
                let info = Value::Array(vec![
                    Value::Text(origin.clone()),
                    Value::Text(context.nonce.clone()),
                    match encryption_info {
                        Some(bytes) => Value::Bytes(bytes.clone()),
                        None => Value::Null,
                    },
                ]);

                let info_bytes =
                    cbor::to_vec(&info).with_err(|| MdocError::SessionTranscript)?;

                Value::Array(vec![
                    Value::Text(DC_API_HANDOVER_TYPE_IDENTIFIER.to_owned()),
                    Value::Bytes(digest_alg.digest(&info_bytes)),
                ])
            }
        };

        let value = Value::Array(vec![Value::Null, Value::Null, handover]);
        let bytes = cbor::to_vec(&value).with_err(|| MdocError::SessionTranscript)?;

        Ok(Self { value, bytes })
    }

    /// The transcript as a CBOR [`Value`], for embedding into authenticated structures.
    pub fn to_cbor_value(&self) -> Value {
        self.value.clone()
    }

    /// The serialized transcript bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn openid4vp_context() -> PresentationContext {
        PresentationContext::openid4vp(
            "x509_san_dns:verifier.example.com".to_owned(),
            "https://verifier.example.com/response".to_owned(),
            "exc7gBkxjx1rdc9udRrveKvSsJIq80avlXeLHhGwqtA".to_owned(),
        )
    }

    #[test]
    fn transcript_is_deterministic() {
        let context = openid4vp_context();

        let first = SessionTranscript::build(&context, DigestAlgorithm::Sha256).unwrap();
        let second = SessionTranscript::build(&context, DigestAlgorithm::Sha256).unwrap();

        assert_eq!(first.bytes(), second.bytes());
    }

    #[test]
    fn transcript_shape() {
        let context = openid4vp_context();
        let transcript = SessionTranscript::build(&context, DigestAlgorithm::Sha256).unwrap();

        // a 3-element array with two leading nulls
        assert_eq!(transcript.bytes()[0], 0x83);
        assert_eq!(transcript.bytes()[1], 0xf6);
        assert_eq!(transcript.bytes()[2], 0xf6);

        let Value::Array(elements) = transcript.to_cbor_value() else {
            unreachable!()
        };
        assert_eq!(elements.len(), 3);

        // the handover is [clientIdHash, responseUriHash, nonce]
        let Value::Array(handover) = &elements[2] else {
            unreachable!()
        };
        assert_eq!(handover.len(), 3);
        assert_eq!(handover[0].as_bytes().unwrap().len(), 32);
        assert_eq!(handover[1].as_bytes().unwrap().len(), 32);
        assert_eq!(
            handover[2].as_text().unwrap(),
            "exc7gBkxjx1rdc9udRrveKvSsJIq80avlXeLHhGwqtA"
        );
    }

    #[test]
    fn transcript_uses_negotiated_digest_algorithm() {
        let context = openid4vp_context();

        let sha256 = SessionTranscript::build(&context, DigestAlgorithm::Sha256).unwrap();
        let sha384 = SessionTranscript::build(&context, DigestAlgorithm::Sha384).unwrap();

        assert_ne!(sha256.bytes(), sha384.bytes());

        let Value::Array(elements) = sha384.to_cbor_value() else {
            unreachable!()
        };
        let Value::Array(handover) = &elements[2] else {
            unreachable!()
        };
        assert_eq!(handover[0].as_bytes().unwrap().len(), 48);
    }

    #[test]
    fn transcript_changes_with_every_context_field() {
        let base = SessionTranscript::build(&openid4vp_context(), DigestAlgorithm::Sha256)
            .unwrap();

        let different_nonce = PresentationContext::openid4vp(
            "x509_san_dns:verifier.example.com".to_owned(),
            "https://verifier.example.com/response".to_owned(),
            "another-nonce".to_owned(),
        );
        let different_client = PresentationContext::openid4vp(
            "x509_san_dns:other.example.com".to_owned(),
            "https://verifier.example.com/response".to_owned(),
            "exc7gBkxjx1rdc9udRrveKvSsJIq80avlXeLHhGwqtA".to_owned(),
        );
        let different_uri = PresentationContext::openid4vp(
            "x509_san_dns:verifier.example.com".to_owned(),
            "https://other.example.com/response".to_owned(),
            "exc7gBkxjx1rdc9udRrveKvSsJIq80avlXeLHhGwqtA".to_owned(),
        );

        for context in [different_nonce, different_client, different_uri] {
            let transcript = SessionTranscript::build(&context, DigestAlgorithm::Sha256).unwrap();
            assert_ne!(base.bytes(), transcript.bytes());
        }
    }

    #[test]
    fn dc_api_transcript_shape() {
        let context =
            PresentationContext::dc_api("https://example.com".to_owned(), "nonce123".to_owned());
        let transcript = SessionTranscript::build(&context, DigestAlgorithm::Sha256).unwrap();

        assert_eq!(transcript.bytes()[0], 0x83);

        let Value::Array(elements) = transcript.to_cbor_value() else {
            unreachable!()
        };
        let Value::Array(handover) = &elements[2] else {
            unreachable!()
        };

        // the handover is ["OpenID4VPDCAPIHandover", infoHash]
        assert_eq!(handover.len(), 2);
        assert_eq!(handover[0].as_text().unwrap(), "OpenID4VPDCAPIHandover");
        assert_eq!(handover[1].as_bytes().unwrap().len(), 32);
    }

    #[test]
    fn dc_api_transcript_binds_origin_and_encryption() {
        let plain =
            PresentationContext::dc_api("https://example.com".to_owned(), "nonce".to_owned());
        let other_origin =
            PresentationContext::dc_api("https://evil.example.com".to_owned(), "nonce".to_owned());
        let encrypted = PresentationContext::dc_api_encrypted(
            "https://example.com".to_owned(),
            "nonce".to_owned(),
            vec![0x01, 0x02, 0x03],
        );
        let other_key = PresentationContext::dc_api_encrypted(
            "https://example.com".to_owned(),
            "nonce".to_owned(),
            vec![0x01, 0x02, 0x04],
        );

        let transcripts: Vec<_> = [plain, other_origin, encrypted, other_key]
            .iter()
            .map(|context| {
                SessionTranscript::build(context, DigestAlgorithm::Sha256)
                    .unwrap()
                    .bytes()
                    .to_vec()
            })
            .collect();

        // all four channel bindings are pairwise distinct
        for (i, left) in transcripts.iter().enumerate() {
            for right in &transcripts[i + 1..] {
                assert_ne!(left, right);
            }
        }
    }

    #[test]
    fn profiles_produce_distinct_transcripts() {
        let openid4vp = SessionTranscript::build(&openid4vp_context(), DigestAlgorithm::Sha256)
            .unwrap();
        let dc_api = SessionTranscript::build(
            &PresentationContext::dc_api(
                "https://verifier.example.com".to_owned(),
                "exc7gBkxjx1rdc9udRrveKvSsJIq80avlXeLHhGwqtA".to_owned(),
            ),
            DigestAlgorithm::Sha256,
        )
        .unwrap();

        assert_ne!(openid4vp.bytes(), dc_api.bytes());
    }
}
