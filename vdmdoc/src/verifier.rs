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

//! This module provides the [`Verifier`] type which is used to verify presented `mDoc`
//! Credentials.
//!
//! Verification of a single [`Document`] runs five independent checks:
//!
//! 1. **Issuer authentication** -- the certificate chain carried in the Issuer envelope produces
//!    the public key that verifies the Issuer signature;
//! 2. **MSO validity** -- the validity window covers the provided time, the document type
//!    matches and the declared digest algorithm is supported;
//! 3. **Data integrity** -- every disclosed data element recomputes to its signed digest;
//! 4. **Device authentication** -- the Device signature (or MAC) verifies over the session
//!    transcript against the device key the Issuer signed;
//! 5. **Device-key authorization** -- every device-asserted data element is covered by the
//!    key authorizations the Issuer signed.
//!
//! The checks are order-insensitive and a failure of one never prevents the others from running;
//! every check leaves its own verdict and failure reason in the returned
//! [`VerificationOutcome`].  Only a structural decode failure of the response aborts before the
//! pipeline runs.

use rand::Rng;
use vd_sig_utils::{JwkPublic, SignatureVerifier, SigningAlgorithm};
use vdx5chain::{X509Trust, X5Chain};

use crate::{
    cbor::Value,
    merge::{merge_claims, DuplicatePolicy},
    models::{
        document::{DeviceResponse, Document},
        device_auth::DeviceAuthentication,
        issuer_auth::MobileSecurityObject,
        Claims,
    },
    transcript::{PresentationContext, SessionTranscript},
    utils::rand::generate_nonce,
    MdocError, Result,
};

/// How a digest mismatch on a disclosed data element is treated.
///
/// The safe default treats every mismatch as fatal.  The lenient mode exists for ecosystems where
/// non-primitive values (nested arrays, maps or tagged structures) are known to have passed
/// through re-encoding wallets that do not preserve bytes; mismatches on such values are then
/// recorded as warnings instead of failing the data-integrity check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IntegrityPolicy {
    /// Any digest mismatch fails the data-integrity check.
    #[default]
    Strict,
    /// Digest mismatches on non-primitive element values downgrade to warnings.
    WarnNonPrimitive,
}

/// The aggregated result of verifying one [`Document`].
///
/// Each of the five checks leaves its own verdict; `valid` holds only when every check passed.
/// Failed checks additionally leave one human-readable reason each in `errors`, in check order,
/// so a partially-failing document stays fully diagnosable.
#[derive(Debug)]
pub struct VerificationOutcome {
    /// `true` when all five checks passed.
    pub valid: bool,
    /// Verdict of the issuer-authentication check.
    pub issuer_authentication: Option<bool>,
    /// Verdict of the MSO-validity check.
    pub mso_validity: Option<bool>,
    /// Verdict of the data-integrity check.
    pub data_integrity: Option<bool>,
    /// Verdict of the device-authentication check.
    pub device_authentication: Option<bool>,
    /// Verdict of the device-key-authorization check.
    pub device_key_authorization: Option<bool>,
    /// The Issuer's public key, when issuer authentication succeeded.
    pub issuer_public_key: Option<JwkPublic>,
    /// The Issuer's certificate chain, when issuer authentication succeeded.
    pub issuer_x5chain: Option<X5Chain>,
    /// The merged issuer- and device-asserted claims, when the document is valid and the merge
    /// policy admits it.
    pub verified_claims: Option<Claims>,
    /// One reason per failed check, in check order.  Never silently dropped.
    pub errors: Vec<String>,
    /// Non-fatal observations, e.g. downgraded digest mismatches.
    pub warnings: Vec<String>,
}

/// Verifier of presented `mDoc` Credentials.
pub struct Verifier {
    context: PresentationContext,
    trust: Option<X509Trust>,
    integrity_policy: IntegrityPolicy,
    merge_policy: DuplicatePolicy,
}

impl Verifier {
    /// Creates a new [`Verifier`] for the provided presentation context.
    pub fn new(context: PresentationContext) -> Self {
        Self {
            context,
            trust: None,
            integrity_policy: IntegrityPolicy::default(),
            // the device-asserted value supersedes the issuer-asserted one; both were
            // independently authenticated before the merge happens
            merge_policy: DuplicatePolicy::Override,
        }
    }

    /// Creates a new [`Verifier`] for a remote OpenID4VP presentation.
    ///
    /// It will also create a new `nonce` value used by this verifier to later successfully
    /// verify a device signature. The provided `nonce_rng` will be used to generate that
    /// `nonce`.
    ///
    /// If you wish to provide your own `nonce` value, use [`Verifier::from_parts`].
    pub fn openid4vp<R: Rng + ?Sized>(
        client_id: String,
        response_uri: String,
        nonce_rng: &mut R,
    ) -> Self {
        let nonce = generate_nonce(nonce_rng);
        Self::from_parts(client_id, response_uri, nonce)
    }

    /// Create a new OpenID4VP [`Verifier`] but with the provided `nonce` value.
    ///
    /// If you don't want to explicitly provide the `nonce` value, you may use
    /// [`Verifier::openid4vp`] which will generate it.
    pub fn from_parts(client_id: String, response_uri: String, nonce: String) -> Self {
        Self::new(PresentationContext::openid4vp(
            client_id,
            response_uri,
            nonce,
        ))
    }

    /// Requires the Issuer's certificate chain to anchor in the provided trusted roots.
    ///
    /// Without this, any syntactically valid chain is accepted and only the signature itself is
    /// verified.
    pub fn with_trust(mut self, trust: X509Trust) -> Self {
        self.trust = Some(trust);
        self
    }

    /// Overrides the digest-mismatch policy of the data-integrity check.
    pub fn with_integrity_policy(mut self, policy: IntegrityPolicy) -> Self {
        self.integrity_policy = policy;
        self
    }

    /// Overrides the duplicate policy used when building the merged claims view.
    pub fn with_merge_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.merge_policy = policy;
        self
    }

    /// Gets the `nonce` value as `&str`.
    pub fn nonce(&self) -> &str {
        self.context.nonce()
    }

    /// The presentation context this verifier checks against.
    pub fn context(&self) -> &PresentationContext {
        &self.context
    }

    /// Verifies every [`Document`] of the provided [`DeviceResponse`].
    ///
    /// Once the response decoded, the caller always receives one complete
    /// [`VerificationOutcome`] per document -- including the failing ones.
    ///
    /// # Error
    ///
    /// An error is returned only if the provided [`DeviceResponse`] does not contain any
    /// [`Document`]s.
    pub fn verify<'a>(
        &self,
        device_response: DeviceResponse,
        current_time: u64,
        get_signature_verifier: impl Fn(SigningAlgorithm) -> Option<&'a dyn SignatureVerifier>,
    ) -> Result<Vec<VerificationOutcome>> {
        let documents = device_response
            .into_documents()
            .ok_or_else(|| vderror::Error::root(MdocError::EmptyDeviceResponse))?;

        Ok(documents
            .iter()
            .map(|document| self.verify_document(document, current_time, &get_signature_verifier))
            .collect())
    }

    /// Verifies the [`DeviceResponse`] and extracts the merged claims of every document.
    ///
    /// Unlike [`Verifier::verify`], this is all-or-nothing: the first invalid document turns the
    /// whole call into an [`MdocError::InvalidDocument`] error naming its failed checks.
    pub fn verify_into_claims<'a>(
        &self,
        device_response: DeviceResponse,
        current_time: u64,
        get_signature_verifier: impl Fn(SigningAlgorithm) -> Option<&'a dyn SignatureVerifier>,
    ) -> Result<Vec<Claims>> {
        self.verify(device_response, current_time, get_signature_verifier)?
            .into_iter()
            .map(|outcome| {
                if !outcome.valid {
                    return Err(vderror::Error::root(MdocError::InvalidDocument(
                        outcome.errors.join("; "),
                    )));
                }

                outcome.verified_claims.ok_or_else(|| {
                    vderror::Error::root(MdocError::InvalidDocument(
                        outcome.warnings.join("; "),
                    ))
                    .ctx("claims could not be merged")
                })
            })
            .collect()
    }

    /// Runs the five checks over a single [`Document`] and aggregates their verdicts.
    fn verify_document<'a>(
        &self,
        document: &Document,
        current_time: u64,
        get_signature_verifier: &impl Fn(SigningAlgorithm) -> Option<&'a dyn SignatureVerifier>,
    ) -> VerificationOutcome {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        // the MSO feeds checks 2-5; decode it once and let each dependent check report its own
        // failure if it is unusable
        let mso = document.decode_mso();

        // 1. issuer authentication
        let mut issuer_public_key = None;
        let mut issuer_x5chain = None;
        let issuer_authentication = match document
            .issuer_signed()
            .issuer_auth()
            .verify_signature(self.trust.as_ref(), get_signature_verifier)
        {
            Ok((jwk, x5chain)) => {
                issuer_public_key = Some(jwk);
                issuer_x5chain = Some(x5chain);
                true
            }
            Err(err) => {
                errors.push(format!("issuer authentication: {err}"));
                false
            }
        };

        // 2. MSO validity
        let mso_validity = match &mso {
            Ok(mso) => match mso.validate(current_time, document.doc_type()) {
                Ok(()) => true,
                Err(err) => {
                    errors.push(format!("MSO validity: {err}"));
                    false
                }
            },
            Err(err) => {
                errors.push(format!("MSO validity: {err}"));
                false
            }
        };

        // 3. data integrity
        let data_integrity = match &mso {
            Ok(mso) => match self.check_data_integrity(document, mso) {
                Ok(downgraded) => {
                    warnings.extend(downgraded);
                    true
                }
                Err(err) => {
                    errors.push(format!("data integrity: {err}"));
                    false
                }
            },
            Err(err) => {
                errors.push(format!("data integrity: {err}"));
                false
            }
        };

        // 4. device authentication
        let device_authentication = match &mso {
            Ok(mso) => {
                match self.check_device_authentication(document, mso, get_signature_verifier) {
                    Ok(()) => true,
                    Err(err) => {
                        errors.push(format!("device authentication: {err}"));
                        false
                    }
                }
            }
            Err(err) => {
                errors.push(format!("device authentication: {err}"));
                false
            }
        };

        // 5. device-key authorization
        let device_key_authorization = match &mso {
            Ok(mso) => match check_key_authorization(document, mso) {
                Ok(()) => true,
                Err(err) => {
                    errors.push(format!("device key authorization: {err}"));
                    false
                }
            },
            Err(err) => {
                errors.push(format!("device key authorization: {err}"));
                false
            }
        };

        let valid = issuer_authentication
            && mso_validity
            && data_integrity
            && device_authentication
            && device_key_authorization;

        let verified_claims = valid
            .then(|| {
                let issuer_claims = document.issuer_signed().claims().into_claims();
                let device_claims = document.device_signed().claims().into_claims();

                match merge_claims([issuer_claims, device_claims], self.merge_policy) {
                    Ok(claims) => Some(claims),
                    Err(err) => {
                        warnings.push(format!("claims merge: {err}"));
                        None
                    }
                }
            })
            .flatten();

        VerificationOutcome {
            valid,
            issuer_authentication: Some(issuer_authentication),
            mso_validity: Some(mso_validity),
            data_integrity: Some(data_integrity),
            device_authentication: Some(device_authentication),
            device_key_authorization: Some(device_key_authorization),
            issuer_public_key,
            issuer_x5chain,
            verified_claims,
            errors,
            warnings,
        }
    }

    /// Recomputes the digest of every disclosed data element against the signed digests of the
    /// MSO.  Returns the downgraded-mismatch warnings collected under the lenient policy.
    fn check_data_integrity(
        &self,
        document: &Document,
        mso: &MobileSecurityObject,
    ) -> Result<Vec<String>> {
        let alg = mso.digest_algorithm()?;
        let mut downgraded = Vec::new();

        let Some(name_spaces) = document.issuer_signed().name_spaces() else {
            // nothing disclosed, nothing to check
            return Ok(downgraded);
        };

        for (name_space, items) in &name_spaces.0 {
            if items.is_empty() {
                continue;
            }

            let signed_digests = mso.value_digests().for_name_space(name_space).ok_or_else(|| {
                vderror::Error::root(MdocError::MissingDigestNamespace(name_space.clone()))
            })?;

            for item in items {
                let digest_id = item.item().digest_id();

                let signed_digest = signed_digests.get(&digest_id).ok_or_else(|| {
                    vderror::Error::root(MdocError::MissingOrInvalidDigest(
                        name_space.clone(),
                        digest_id,
                    ))
                    .ctx("the digest is missing")
                })?;

                if signed_digest.as_slice() != item.digest(&alg).as_slice() {
                    let non_primitive = matches!(
                        item.item().element_value().0,
                        Value::Array(_) | Value::Map(_) | Value::Tag(_, _) | Value::Encoded(_)
                    );

                    if self.integrity_policy == IntegrityPolicy::WarnNonPrimitive && non_primitive
                    {
                        downgraded.push(format!(
                            "digest mismatch on non-primitive element, namespace=\"{}\", id=\"{}\"",
                            name_space, digest_id
                        ));
                        continue;
                    }

                    return Err(vderror::Error::root(MdocError::MissingOrInvalidDigest(
                        name_space.clone(),
                        digest_id,
                    ))
                    .ctx("the digest is not valid"));
                }
            }
        }

        Ok(downgraded)
    }

    /// Rebuilds the device-authentication structure from the session context and verifies the
    /// Device signature (or MAC) over it against the MSO device key.
    fn check_device_authentication<'a>(
        &self,
        document: &Document,
        mso: &MobileSecurityObject,
        get_signature_verifier: &impl Fn(SigningAlgorithm) -> Option<&'a dyn SignatureVerifier>,
    ) -> Result<()> {
        let alg = mso.digest_algorithm()?;
        let transcript = SessionTranscript::build(&self.context, alg)?;

        let device_authentication = DeviceAuthentication::new(
            &transcript,
            document.doc_type(),
            document.device_signed().name_spaces(),
        );

        document.device_signed().device_auth().verify(
            &device_authentication,
            get_signature_verifier,
            mso.device_key(),
        )
    }
}

/// Requires every device-asserted data element to be covered by the key authorizations the
/// Issuer signed into the MSO.
///
/// A document with no device-asserted data trivially passes.
fn check_key_authorization(document: &Document, mso: &MobileSecurityObject) -> Result<()> {
    let name_spaces = document.device_signed().name_spaces().name_spaces();

    if name_spaces.is_empty() {
        return Ok(());
    }

    let authorizations = mso.key_authorizations();

    let mut unauthorized: Vec<_> = name_spaces
        .0
        .iter()
        .flat_map(|(name_space, items)| {
            items.0.keys().filter_map(move |identifier| {
                let authorized = authorizations
                    .is_some_and(|authorizations| authorizations.authorizes(name_space, identifier));

                (!authorized).then(|| (name_space.clone(), identifier.clone()))
            })
        })
        .collect();

    // deterministic reporting regardless of map iteration order
    unauthorized.sort();

    match unauthorized.into_iter().next() {
        None => Ok(()),
        Some((name_space, identifier)) => Err(vderror::Error::root(
            MdocError::UnauthorizedDataElement(name_space, identifier),
        )),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use assert_matches::assert_matches;
    use vd_sig_utils::Es256Verifier;
    use vdx5chain::X509Trust;

    use super::*;
    use crate::{
        cose::{CoseMac0, Header, ProtectedHeader},
        models::{
            common::DataElementValue,
            device_auth::DeviceAuth,
            document::{DeviceNameSpaces, IssuerSignedItem, IssuerSignedItemBytes},
            issuer_auth::{AuthorizedDataElements, AuthorizedNameSpaces, DataElementsArray,
                KeyAuthorizations},
        },
        utils::test::{
            default_context, dummy_device_response, dummy_document,
            dummy_document_with_device_claims, issuer_x509_trust, DUMMY_NAMESPACE,
        },
    };

    const ISSUE_TIME: u64 = 1_000_000;

    fn default_verifier() -> Verifier {
        Verifier::new(default_context())
    }

    fn assert_only_failed(outcome: &VerificationOutcome, failed: &str) {
        let checks = [
            ("issuer authentication", outcome.issuer_authentication),
            ("MSO validity", outcome.mso_validity),
            ("data integrity", outcome.data_integrity),
            ("device authentication", outcome.device_authentication),
            (
                "device key authorization",
                outcome.device_key_authorization,
            ),
        ];

        for (name, verdict) in checks {
            if name == failed {
                assert_eq!(verdict, Some(false), "{name} should have failed");
            } else {
                assert_eq!(verdict, Some(true), "{name} should have passed");
            }
        }

        assert!(!outcome.valid);
        assert_eq!(outcome.errors.len(), 1, "errors: {:?}", outcome.errors);
        assert!(outcome.errors[0].starts_with(failed), "{:?}", outcome.errors);
    }

    #[test]
    fn verify_valid_document() {
        let response = dummy_device_response(ISSUE_TIME);

        let outcomes = default_verifier()
            .verify(response, ISSUE_TIME + 5, |_| Some(&Es256Verifier))
            .unwrap();

        assert_eq!(outcomes.len(), 1);
        let outcome = &outcomes[0];

        assert!(outcome.valid);
        assert_eq!(outcome.issuer_authentication, Some(true));
        assert_eq!(outcome.mso_validity, Some(true));
        assert_eq!(outcome.data_integrity, Some(true));
        assert_eq!(outcome.device_authentication, Some(true));
        assert_eq!(outcome.device_key_authorization, Some(true));
        assert!(outcome.errors.is_empty());
        assert!(outcome.warnings.is_empty());

        assert!(outcome.issuer_public_key.is_some());
        assert!(outcome.issuer_x5chain.is_some());

        let claims = outcome.verified_claims.as_ref().unwrap();
        let name_space = claims.0.get(&DUMMY_NAMESPACE.into()).unwrap();
        assert_eq!(
            name_space.get(&"family_name".into()).unwrap(),
            &DataElementValue::from("Doe")
        );
    }

    #[test]
    fn verify_with_trusted_issuer() {
        let response = dummy_device_response(ISSUE_TIME);

        let outcomes = default_verifier()
            .with_trust(issuer_x509_trust())
            .verify(response, ISSUE_TIME + 5, |_| Some(&Es256Verifier))
            .unwrap();

        assert!(outcomes[0].valid);
    }

    #[test]
    fn untrusted_issuer_fails_only_issuer_authentication() {
        let response = dummy_device_response(ISSUE_TIME);

        let outcomes = default_verifier()
            .with_trust(X509Trust::new(vec![]))
            .verify(response, ISSUE_TIME + 5, |_| Some(&Es256Verifier))
            .unwrap();

        let outcome = &outcomes[0];
        assert_only_failed(outcome, "issuer authentication");
        assert!(outcome.issuer_public_key.is_none());
        assert!(outcome.verified_claims.is_none());
    }

    #[test]
    fn expired_document_fails_only_mso_validity() {
        let response = dummy_device_response(ISSUE_TIME);

        // 400 days after issuance, way past the 1-year window
        let outcomes = default_verifier()
            .verify(response, ISSUE_TIME + 400 * 24 * 60 * 60, |_| {
                Some(&Es256Verifier)
            })
            .unwrap();

        let outcome = &outcomes[0];
        assert_only_failed(outcome, "MSO validity");
        assert!(outcome.errors[0].contains("expired"), "{:?}", outcome.errors);
    }

    #[test]
    fn not_yet_signed_document_fails_only_mso_validity() {
        let response = dummy_device_response(ISSUE_TIME);

        let outcomes = default_verifier()
            .verify(response, ISSUE_TIME - 10, |_| Some(&Es256Verifier))
            .unwrap();

        assert_only_failed(&outcomes[0], "MSO validity");
    }

    fn tamper_first_item(document: &mut crate::models::document::Document, value: DataElementValue) {
        let name_spaces = document.issuer_signed.name_spaces.as_mut().unwrap();
        let items = name_spaces.0.get_mut(&DUMMY_NAMESPACE.into()).unwrap();

        let original = items[0].item().clone();
        let tampered = IssuerSignedItem::new(
            original.digest_id(),
            original.random.clone(),
            original.element_identifier().clone(),
            value,
        );

        items[0] = IssuerSignedItemBytes::new(tampered).unwrap();
    }

    #[test]
    fn tampered_element_fails_only_data_integrity() {
        let mut document = dummy_document(ISSUE_TIME, &default_context());
        tamper_first_item(&mut document, DataElementValue::from("Mallory"));

        let response = DeviceResponse::new(vec![document]);
        let outcomes = default_verifier()
            .verify(response, ISSUE_TIME + 5, |_| Some(&Es256Verifier))
            .unwrap();

        let outcome = &outcomes[0];
        assert_only_failed(outcome, "data integrity");
        // the failing item is identified by namespace and digest id
        assert!(
            outcome.errors[0].contains(DUMMY_NAMESPACE),
            "{:?}",
            outcome.errors
        );
    }

    #[test]
    fn non_primitive_mismatch_downgrades_under_lenient_policy() {
        let tampered_value =
            DataElementValue::from(Value::Array(vec!["A".into(), "B".into()]));

        // strict policy: fatal
        let mut document = dummy_document(ISSUE_TIME, &default_context());
        tamper_first_item(&mut document, tampered_value.clone());
        let outcomes = default_verifier()
            .verify(DeviceResponse::new(vec![document]), ISSUE_TIME + 5, |_| {
                Some(&Es256Verifier)
            })
            .unwrap();
        assert_eq!(outcomes[0].data_integrity, Some(false));

        // lenient policy: warning only
        let mut document = dummy_document(ISSUE_TIME, &default_context());
        tamper_first_item(&mut document, tampered_value);
        let outcomes = default_verifier()
            .with_integrity_policy(IntegrityPolicy::WarnNonPrimitive)
            .verify(DeviceResponse::new(vec![document]), ISSUE_TIME + 5, |_| {
                Some(&Es256Verifier)
            })
            .unwrap();

        let outcome = &outcomes[0];
        assert_eq!(outcome.data_integrity, Some(true));
        assert!(outcome.valid);
        assert_eq!(outcome.warnings.len(), 1);
        assert!(outcome.warnings[0].contains("digest mismatch"));
    }

    #[test]
    fn wrong_nonce_fails_only_device_authentication() {
        let response = dummy_device_response(ISSUE_TIME);

        let verifier = Verifier::from_parts(
            "client_id".to_owned(),
            "response_uri".to_owned(),
            "a different nonce".to_owned(),
        );

        let outcomes = verifier
            .verify(response, ISSUE_TIME + 5, |_| Some(&Es256Verifier))
            .unwrap();

        assert_only_failed(&outcomes[0], "device authentication");
    }

    #[test]
    fn wrong_audience_fails_only_device_authentication() {
        let response = dummy_device_response(ISSUE_TIME);

        let verifier = Verifier::from_parts(
            "another verifier".to_owned(),
            "response_uri".to_owned(),
            "nonce".to_owned(),
        );

        let outcomes = verifier
            .verify(response, ISSUE_TIME + 5, |_| Some(&Es256Verifier))
            .unwrap();

        assert_only_failed(&outcomes[0], "device authentication");
    }

    #[test]
    fn dc_api_profile_verifies_and_binds_origin() {
        let context = PresentationContext::dc_api_encrypted(
            "https://wallet.example.com".to_owned(),
            "nonce".to_owned(),
            vec![1, 2, 3],
        );

        let document = dummy_document(ISSUE_TIME, &context);
        let outcomes = Verifier::new(context.clone())
            .verify(DeviceResponse::new(vec![document]), ISSUE_TIME + 5, |_| {
                Some(&Es256Verifier)
            })
            .unwrap();
        assert!(outcomes[0].valid);

        // same origin, different encryption parameters
        let other_context = PresentationContext::dc_api_encrypted(
            "https://wallet.example.com".to_owned(),
            "nonce".to_owned(),
            vec![9, 9, 9],
        );
        let document = dummy_document(ISSUE_TIME, &context);
        let outcomes = Verifier::new(other_context)
            .verify(DeviceResponse::new(vec![document]), ISSUE_TIME + 5, |_| {
                Some(&Es256Verifier)
            })
            .unwrap();
        assert_only_failed(&outcomes[0], "device authentication");
    }

    #[test]
    fn device_mac_reports_unsupported() {
        let mut document = dummy_document(ISSUE_TIME, &default_context());

        document.device_signed.device_auth = DeviceAuth::DeviceMac(CoseMac0 {
            protected: ProtectedHeader::new(Header::default()),
            unprotected: Header::default(),
            payload: None,
            tag: vec![0u8; 32],
        });

        let outcomes = default_verifier()
            .verify(DeviceResponse::new(vec![document]), ISSUE_TIME + 5, |_| {
                Some(&Es256Verifier)
            })
            .unwrap();

        let outcome = &outcomes[0];
        assert_only_failed(outcome, "device authentication");
        assert!(
            outcome.errors[0].contains("Device MAC is not supported"),
            "{:?}",
            outcome.errors
        );
    }

    #[test]
    fn missing_verifier_fails_both_signature_checks() {
        let response = dummy_device_response(ISSUE_TIME);

        let outcomes = default_verifier()
            .verify(response, ISSUE_TIME + 5, |_| None)
            .unwrap();

        let outcome = &outcomes[0];
        assert!(!outcome.valid);
        assert_eq!(outcome.issuer_authentication, Some(false));
        assert_eq!(outcome.device_authentication, Some(false));
        // the non-cryptographic checks still ran
        assert_eq!(outcome.mso_validity, Some(true));
        assert_eq!(outcome.data_integrity, Some(true));
        assert_eq!(outcome.device_key_authorization, Some(true));
        assert_eq!(outcome.errors.len(), 2);
    }

    fn device_claims(identifier: &str) -> DeviceNameSpaces {
        DeviceNameSpaces::from(HashMap::from([(
            DUMMY_NAMESPACE.into(),
            HashMap::from([(identifier.into(), DataElementValue::from("Doe"))]).into(),
        )]))
    }

    #[test]
    fn unauthorized_device_element_fails_only_key_authorization() {
        let document = dummy_document_with_device_claims(
            ISSUE_TIME,
            &default_context(),
            device_claims("family_name"),
            // no authorizations signed at all
            None,
        );

        let outcomes = default_verifier()
            .verify(DeviceResponse::new(vec![document]), ISSUE_TIME + 5, |_| {
                Some(&Es256Verifier)
            })
            .unwrap();

        let outcome = &outcomes[0];
        assert_only_failed(outcome, "device key authorization");
        // the offending element is identified by namespace and identifier
        assert!(outcome.errors[0].contains(DUMMY_NAMESPACE));
        assert!(outcome.errors[0].contains("family_name"));
    }

    #[test]
    fn namespace_authorization_covers_device_elements() {
        let authorizations = KeyAuthorizations {
            name_spaces: Some(AuthorizedNameSpaces(vec![DUMMY_NAMESPACE.into()])),
            data_elements: None,
        };

        let document = dummy_document_with_device_claims(
            ISSUE_TIME,
            &default_context(),
            device_claims("family_name"),
            Some(authorizations),
        );

        let outcomes = default_verifier()
            .verify(DeviceResponse::new(vec![document]), ISSUE_TIME + 5, |_| {
                Some(&Es256Verifier)
            })
            .unwrap();

        let outcome = &outcomes[0];
        assert!(outcome.valid, "{:?}", outcome.errors);
        assert_eq!(outcome.device_key_authorization, Some(true));
    }

    #[test]
    fn element_authorization_is_element_specific() {
        let authorize_only = |identifier: &str| KeyAuthorizations {
            name_spaces: None,
            data_elements: Some(AuthorizedDataElements(HashMap::from([(
                DUMMY_NAMESPACE.into(),
                DataElementsArray(vec![identifier.into()]),
            )]))),
        };

        // the asserted element is authorized
        let document = dummy_document_with_device_claims(
            ISSUE_TIME,
            &default_context(),
            device_claims("family_name"),
            Some(authorize_only("family_name")),
        );
        let outcomes = default_verifier()
            .verify(DeviceResponse::new(vec![document]), ISSUE_TIME + 5, |_| {
                Some(&Es256Verifier)
            })
            .unwrap();
        assert!(outcomes[0].valid, "{:?}", outcomes[0].errors);

        // a different element is authorized
        let document = dummy_document_with_device_claims(
            ISSUE_TIME,
            &default_context(),
            device_claims("family_name"),
            Some(authorize_only("given_name")),
        );
        let outcomes = default_verifier()
            .verify(DeviceResponse::new(vec![document]), ISSUE_TIME + 5, |_| {
                Some(&Es256Verifier)
            })
            .unwrap();
        assert_only_failed(&outcomes[0], "device key authorization");
    }

    #[test]
    fn no_device_claims_trivially_authorized() {
        let response = dummy_device_response(ISSUE_TIME);

        let outcomes = default_verifier()
            .verify(response, ISSUE_TIME + 5, |_| Some(&Es256Verifier))
            .unwrap();

        assert_eq!(outcomes[0].device_key_authorization, Some(true));
    }

    #[test]
    fn merged_claims_prefer_device_value() {
        let mut device = device_claims("family_name");
        // the device asserts a fresher value for an issuer-signed element
        device
            .0
            .get_mut(&DUMMY_NAMESPACE.into())
            .unwrap()
            .0
            .insert("family_name".into(), DataElementValue::from("Doe-Device"));

        let authorizations = KeyAuthorizations {
            name_spaces: Some(AuthorizedNameSpaces(vec![DUMMY_NAMESPACE.into()])),
            data_elements: None,
        };

        let document = dummy_document_with_device_claims(
            ISSUE_TIME,
            &default_context(),
            device,
            Some(authorizations),
        );

        let outcomes = default_verifier()
            .verify(DeviceResponse::new(vec![document]), ISSUE_TIME + 5, |_| {
                Some(&Es256Verifier)
            })
            .unwrap();

        let claims = outcomes[0].verified_claims.as_ref().unwrap();
        assert_eq!(
            claims
                .0
                .get(&DUMMY_NAMESPACE.into())
                .unwrap()
                .get(&"family_name".into())
                .unwrap(),
            &DataElementValue::from("Doe-Device")
        );
    }

    #[test]
    fn clash_merge_policy_withholds_overlapping_claims() {
        let authorizations = KeyAuthorizations {
            name_spaces: Some(AuthorizedNameSpaces(vec![DUMMY_NAMESPACE.into()])),
            data_elements: None,
        };

        let document = dummy_document_with_device_claims(
            ISSUE_TIME,
            &default_context(),
            device_claims("family_name"),
            Some(authorizations),
        );

        let outcomes = default_verifier()
            .with_merge_policy(DuplicatePolicy::Clash)
            .verify(DeviceResponse::new(vec![document]), ISSUE_TIME + 5, |_| {
                Some(&Es256Verifier)
            })
            .unwrap();

        let outcome = &outcomes[0];
        // the checks all passed; only the merged view is withheld
        assert!(outcome.valid);
        assert!(outcome.verified_claims.is_none());
        assert_eq!(outcome.warnings.len(), 1);
        assert!(outcome.warnings[0].contains("Duplicate data element"));
    }

    #[test]
    fn empty_device_response_is_an_error() {
        let response = DeviceResponse::new(vec![]);

        let err = default_verifier()
            .verify(response, ISSUE_TIME, |_| Some(&Es256Verifier))
            .unwrap_err();

        assert_matches!(err.error, MdocError::EmptyDeviceResponse);
    }

    #[test]
    fn verify_into_claims_success() {
        let response = dummy_device_response(ISSUE_TIME);

        let claims = default_verifier()
            .verify_into_claims(response, ISSUE_TIME + 5, |_| Some(&Es256Verifier))
            .unwrap();

        assert_eq!(claims.len(), 1);
        let name_space = claims[0].0.get(&DUMMY_NAMESPACE.into()).unwrap();
        assert_eq!(
            name_space.get(&"given_name".into()).unwrap(),
            &DataElementValue::from("John")
        );
    }

    #[test]
    fn verify_into_claims_rejects_invalid_document() {
        let response = dummy_device_response(ISSUE_TIME);

        let err = default_verifier()
            .verify_into_claims(response, ISSUE_TIME + 400 * 24 * 60 * 60, |_| {
                Some(&Es256Verifier)
            })
            .unwrap_err();

        assert_matches!(
            err.error,
            MdocError::InvalidDocument(reason) if reason.contains("MSO validity")
        );
    }

    #[test]
    fn generated_nonce_verifier() {
        let verifier = Verifier::openid4vp(
            "client_id".to_owned(),
            "response_uri".to_owned(),
            &mut rand::thread_rng(),
        );

        // 256 bits, base64url without padding
        assert_eq!(verifier.nonce().len(), 43);

        let document = dummy_document(
            ISSUE_TIME,
            &PresentationContext::openid4vp(
                "client_id".to_owned(),
                "response_uri".to_owned(),
                verifier.nonce().to_owned(),
            ),
        );

        let outcomes = verifier
            .verify(DeviceResponse::new(vec![document]), ISSUE_TIME + 5, |_| {
                Some(&Es256Verifier)
            })
            .unwrap();
        assert!(outcomes[0].valid);
    }

    #[test]
    fn doc_type_mismatch_is_an_mso_validity_failure() {
        let context = default_context();
        let document = dummy_document(ISSUE_TIME, &context);

        // rebuild the document under a different top-level doc type; the signed MSO still names
        // the original one
        let document = crate::models::document::Document::new(
            "org.example.other".into(),
            document.issuer_signed.clone(),
            crate::utils::test::make_device_signed(
                &context,
                &"org.example.other".into(),
                DeviceNameSpaces::default(),
            ),
        );

        let outcomes = default_verifier()
            .verify(DeviceResponse::new(vec![document]), ISSUE_TIME + 5, |_| {
                Some(&Es256Verifier)
            })
            .unwrap();

        let outcome = &outcomes[0];
        assert_eq!(outcome.mso_validity, Some(false));
        assert!(
            outcome.errors.iter().any(|e| e.contains("doc_type")),
            "{:?}",
            outcome.errors
        );
    }
}
