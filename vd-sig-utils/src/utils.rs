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

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use vderror::traits::{ErrorContext as _, ForeignError as _, PropagateError as _};

use crate::{CryptoError, JwkPublic, SigningAlgorithm};

/// Type alias for a boxed error.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Returns the `base64url`-encoded string of the given `input`.
pub fn base64_url_encode<T: AsRef<[u8]>>(input: T) -> String {
    URL_SAFE_NO_PAD.encode(input)
}

/// Decodes the given `payload` as the `base64url`-encoded string **without
/// padding** into bytes.
pub fn base64_url_decode<T: AsRef<[u8]>>(payload: T) -> Result<Vec<u8>, base64::DecodeError> {
    URL_SAFE_NO_PAD.decode(payload)
}

/// Retrieve public JWK from the provided x5chain certificate chain leaf.
///
/// Currently, only `Es256` is supported.
#[cfg(feature = "openssl")]
pub fn public_jwk_from_x5chain_leaf(
    x5chain: &vdx5chain::X5Chain,
    alg: &SigningAlgorithm,
    kid: Option<&str>,
) -> vderror::Result<JwkPublic, CryptoError> {
    let pkey = x5chain
        .leaf_certificate_key()
        .with_err(|| CryptoError::InvalidX5Chain)
        .ctx(|| "invalid public key from certificate")?;

    match (alg, pkey.id()) {
        (SigningAlgorithm::Es256, openssl::pkey::Id::EC) => {
            let ec_key = pkey
                .ec_key()
                .foreign_err(|| CryptoError::CryptoBackend)
                .ctx(|| "invalid EC key")?;

            crate::openssl_ec_pub_key_to_jwk(&ec_key, kid).ctx(|| "unable to construct JWK")
        }
        _ => Err(vderror::Error::root(CryptoError::Unsupported(
            "only Es256 is currently supported".to_string(),
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base64_url_roundtrip() {
        let input = [0xDE, 0xAD, 0xBE, 0xEF];
        let encoded = base64_url_encode(input);
        assert_eq!(encoded, "3q2-7w");
        assert_eq!(base64_url_decode(&encoded).unwrap(), input);
    }

    #[cfg(feature = "openssl")]
    #[test]
    fn test_public_jwk_from_x5chain_leaf() {
        let x5chain = vdx5chain::X5Chain::dummy();

        let jwk =
            public_jwk_from_x5chain_leaf(&x5chain, &SigningAlgorithm::Es256, Some("issuer_kid"))
                .unwrap();

        assert_eq!(jwk.get("kty").unwrap(), "EC");
        assert_eq!(jwk.get("crv").unwrap(), "P-256");
        assert_eq!(jwk.get("kid").unwrap(), "issuer_kid");
        assert!(jwk.contains_key("x"));
        assert!(jwk.contains_key("y"));
    }
}
