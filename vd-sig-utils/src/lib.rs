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

//! This crate provides the injectable signature backends used across the VDL's verification code.
//!
//! # Details
//!
//! The primary way to use this library is via the [`Signer`] and [`SignatureVerifier`] traits,
//! which provide functionality for computing and verifying raw byte signatures against public
//! keys in the JWK format. A default [`openssl`] backed implementation of these traits is
//! available via the [`Es256Signer`] and [`Es256Verifier`] structs. These implementations are
//! available under the default feature `openssl` which can be disabled and replaced by a custom
//! implementation.
//!
//! A custom implementation must implement the [`Signer`] trait for signing and the
//! [`SignatureVerifier`] trait for verifying signatures. Implementations backed by remote signing
//! services only need to satisfy the same two traits.
//!
//! # Examples
//!
//! ## Sign and verify bytes
//!
//! ```
//! use vd_sig_utils::{Es256Signer, Es256Verifier, SignatureVerifier as _, Signer as _};
//!
//! // Construct a new signer
//! let signer = Es256Signer::generate("dummy-kid".to_string()).unwrap();
//!
//! let message = b"some signing input";
//!
//! // Sign the message
//! let signature = signer.sign(message).unwrap();
//!
//! // Get the public JWK for verification
//! let public_jwk = signer.public_jwk().unwrap();
//!
//! // Verify the signature
//! assert!(Es256Verifier.verify(message, &signature, &public_jwk).unwrap());
//! ```

#[cfg(feature = "openssl")]
mod openssl_impl;

mod error;
mod jwk;
mod traits;
mod utils;

pub use error::*;
pub use jwk::*;
#[cfg(feature = "openssl")]
pub use openssl_impl::*;
pub use traits::*;
pub use utils::*;

/// Helper macro with the same syntax as [`serde_json::json`] specialized for
/// constructing JSON objects.
///
/// It will construct a more specific type ([`serde_json::Map<String,Value>`])
/// than just [`serde_json::Value`] when constructing an object, and panic if
/// the syntax is valid JSON but not an object.
#[macro_export]
macro_rules! json_object {
    ($stuff:tt) => {
        match ::serde_json::json!($stuff) {
            ::serde_json::Value::Object(o) => o,
            _ => unreachable!("JSON literal wasn't an object"),
        }
    };
}
