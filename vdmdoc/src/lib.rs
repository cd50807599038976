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

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! This crate provides the functionality for verifying mobile driving licenses (mDLs) and other
//! `mso_mdoc` Credentials in compliance with the [ISO/IEC 18013-5:2021][1] & [ISO/IEC TS
//! 18013-7:2024][2] standards, but modified to work with OpenID for [Verifiable
//! Presentations][3].
//!
//! [1]: <https://www.iso.org/standard/69084.html>
//! [2]: <https://www.iso.org/standard/82772.html>
//! [3]: <https://openid.net/specs/openid-4-verifiable-presentations-1_0.html>
//!
//! # Details
//!
//! The crate defines multiple modules, which can be roughly divided as follows.
//!
//!   * The high-level [`verifier`] module, running the five verification checks and aggregating
//!     their verdicts.
//!   * The [`transcript`] module building the session transcript that binds a presentation to
//!     its transport context.
//!   * The [`merge`] module combining verified namespaces into one queryable view.
//!   * The [`error`] module describing the error values.
//!   * Low-level building blocks: the [`cbor`] codec, the [`cose`] envelopes and the data model
//!     in [`models`].
//!
//! A typical user of this crate is expected to care only about the high-level modules.  The
//! lower level building blocks are exposed for advanced users wishing to adapt the crate to
//! their `mso_mdoc` use case.
//!
//! # Examples
//!
//! ## Verifying a presented `mso_mdoc` Credential
//!
//! ```no_run
//! let verifier = vdmdoc::Verifier::from_parts(
//!     "example verifier client id".to_owned(),
//!     "https://example.response.uri".to_owned(),
//!     "example nonce".to_owned(),
//! );
//!
//! // `vp_token` as per <https://openid.net/specs/openid-4-verifiable-presentations-1_0.html>
//! let vp_token = "Base64url encoded Verifiable Presentation";
//! let device_response = vdmdoc::models::DeviceResponse::from_base64_cbor(vp_token).unwrap();
//! let current_time = 100;
//!
//! // This should return `Some(vd_sig_utils::SignatureVerifier)`
//! // based on the received `vd_sig_utils::SigningAlgorithm`.
//! let get_signature_verifier = |_alg| None;
//!
//! let outcomes = verifier
//!     .verify(device_response, current_time, get_signature_verifier)
//!     .unwrap();
//!
//! for outcome in outcomes {
//!     assert!(outcome.valid, "failed checks: {:?}", outcome.errors);
//! }
//! ```

pub mod cbor;
pub mod cose;
pub mod error;
pub mod merge;
pub mod models;
pub mod transcript;
mod utils;
pub mod verifier;

pub use error::{MdocError, Result};
pub use merge::{merge_claims, DuplicatePolicy};
pub use models::DeviceResponse;
pub use transcript::{PresentationContext, PresentationProfile, SessionTranscript};
pub use utils::{json::json_to_cbor, rand::generate_nonce};
pub use verifier::{IntegrityPolicy, VerificationOutcome, Verifier};
