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

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use vderror::Error;
use vdx5chain::X5Chain;

use crate::{error::SignatureError, utils::BoxError, JwkPublic};

/// Signature algorithms approved for use in the context of mobile credentials.
///
/// # Algorithms
///
/// This enumeration contains only JOSE asymmetric signature algorithms approved
/// for use by SOG-IS ACM v1.2, with any parameters (e.g. RSA modulus size)
/// meeting therein imposed requirements.
///
/// For more details see the following references:
/// - [SOG-IS Agreed Cryptographic Mechanisms v1.2];
/// - [ETSI TS 119 312] sections 6 and 7.
///
/// [SOG-IS Agreed Cryptographic Mechanisms v1.2]: https://www.sogis.eu/documents/cc/crypto/SOGIS-Agreed-Cryptographic-Mechanisms-1.2.pdf
/// [ETSI TS 119 312]: https://www.etsi.org/deliver/etsi_ts/119300_119399/119312/01.04.03_60/ts_119312v010403p.pdf
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SigningAlgorithm {
    /// ECDSA over P-256 with SHA-256
    Es256,
    /// ECDSA over P-384 with SHA-384
    Es384,
    /// ECDSA over P-521 with SHA-512
    Es512,
    /// RSASSA-PSS with SHA-256 and MGF1 with SHA-256
    Ps256,
    /// RSASSA-PSS with SHA-384 and MGF1 with SHA-384
    Ps384,
    /// RSASSA-PSS with SHA-512 and MGF1 with SHA-512
    Ps512,
}

/// JWS `"alg"` header parameter value for digital signature algorithm
/// **ECDSA using P-256 and SHA-256**, as specified in [RFC7518].
///
/// [RFC7518]: https://datatracker.ietf.org/doc/html/rfc7518#section-3.1
pub const SIGNING_ALG_ES256: &str = "ES256";
/// JWS `"alg"` header parameter value for digital signature algorithm
/// **ECDSA using P-384 and SHA-384**, as specified in [RFC7518].
///
/// [RFC7518]: https://datatracker.ietf.org/doc/html/rfc7518#section-3.1
pub const SIGNING_ALG_ES384: &str = "ES384";
/// JWS `"alg"` header parameter value for digital signature algorithm
/// **ECDSA using P-521 and SHA-512**, as specified in [RFC7518].
///
/// [RFC7518]: https://datatracker.ietf.org/doc/html/rfc7518#section-3.1
pub const SIGNING_ALG_ES512: &str = "ES512";
/// JWS `"alg"` header parameter value for digital signature algorithm
/// **RSASSA-PSS using SHA-256 and MGF1 with SHA-256**, as specified in [RFC7518].
///
/// [RFC7518]: https://datatracker.ietf.org/doc/html/rfc7518#section-3.1
pub const SIGNING_ALG_PS256: &str = "PS256";
/// JWS `"alg"` header parameter value for digital signature algorithm
/// **RSASSA-PSS using SHA-384 and MGF1 with SHA-384**, as specified in [RFC7518].
///
/// [RFC7518]: https://datatracker.ietf.org/doc/html/rfc7518#section-3.1
pub const SIGNING_ALG_PS384: &str = "PS384";
/// JWS `"alg"` header parameter value for digital signature algorithm
/// **RSASSA-PSS using SHA-512 and MGF1 with SHA-512**, as specified in [RFC7518].
///
/// [RFC7518]: https://datatracker.ietf.org/doc/html/rfc7518#section-3.1
pub const SIGNING_ALG_PS512: &str = "PS512";

impl FromStr for SigningAlgorithm {
    type Err = Error<SignatureError>;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            SIGNING_ALG_ES256 => Ok(SigningAlgorithm::Es256),
            SIGNING_ALG_ES384 => Ok(SigningAlgorithm::Es384),
            SIGNING_ALG_ES512 => Ok(SigningAlgorithm::Es512),
            SIGNING_ALG_PS256 => Ok(SigningAlgorithm::Ps256),
            SIGNING_ALG_PS384 => Ok(SigningAlgorithm::Ps384),
            SIGNING_ALG_PS512 => Ok(SigningAlgorithm::Ps512),
            _ => Err(Error::root(SignatureError::InvalidSigningAlgorithm(
                value.to_string(),
            ))),
        }
    }
}

impl std::fmt::Display for SigningAlgorithm {
    // This trait requires `fmt` with this exact signature.
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let message = match self {
            Self::Es256 => SIGNING_ALG_ES256,
            Self::Es384 => SIGNING_ALG_ES384,
            Self::Es512 => SIGNING_ALG_ES512,
            Self::Ps256 => SIGNING_ALG_PS256,
            Self::Ps384 => SIGNING_ALG_PS384,
            Self::Ps512 => SIGNING_ALG_PS512,
        };
        write!(f, "{}", message)
    }
}

/// An external signing backend, to be used for computing a raw signature.
///
/// # Algorithms
///
/// Implementors of this trait must use only approved JOSE asymmetric signature algorithms,
/// with any parameters (e.g. RSA modulus size) meeting standards-imposed requirements.
/// For more details see [`SigningAlgorithm`].
///
/// The output of the signer, regardless of the algorithm, must be the raw signature encoding
/// used in JWS. See step 5 in [section 5.1 of RFC7515](https://www.rfc-editor.org/rfc/rfc7515.html#section-5.1)
/// for more information; for ECDSA this means the fixed-width `r || s` concatenation.
pub trait Signer {
    /// The algorithm this signer uses. Must be a constant function.
    fn algorithm(&self) -> SigningAlgorithm;

    /// Produce a raw signature as a byte array, not yet base64url-encoded.
    fn sign(&self, message: &[u8]) -> Result<Vec<u8>, BoxError>;

    /// Return the public counterpart of the signing key as a JWK JSON object.
    fn public_jwk(&self) -> Result<JwkPublic, BoxError>;
}

/// Subtrait for [`Signer`]-s which have an associated `x5chain`.
pub trait HasX5Chain: Signer {
    /// Return the certificate chain associated with the signing key.
    fn x5chain(&self) -> X5Chain;
}

/// An external backend for signature verification.
pub trait SignatureVerifier: Sync {
    /// The algorithm used for the signature verification.
    fn algorithm(&self) -> SigningAlgorithm;

    /// Verifies the signature of the message, against the provided public key.
    ///
    /// The algorithm used to verify the signature must be the one returned by
    /// [`SignatureVerifier::algorithm`].
    ///
    /// # Return
    /// Method returns `Ok(true)` if the signature if valid for the given
    /// message, `Ok(false)` if it isn't (but there was no issue with the
    /// verifier itself), and `Err(_)` when the verifier itself encounters an
    /// error for any other reason.
    fn verify(
        &self,
        message: &[u8],
        signature: &[u8],
        public_key: &JwkPublic,
    ) -> Result<bool, BoxError>;
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    #[test]
    fn signing_algorithms_serialize_correctly() {
        struct TestCase<'a> {
            alg: SigningAlgorithm,
            alg_str: &'a str,
        }

        let test_cases: &[TestCase] = &[
            TestCase {
                alg: SigningAlgorithm::Es256,
                alg_str: SIGNING_ALG_ES256,
            },
            TestCase {
                alg: SigningAlgorithm::Es384,
                alg_str: SIGNING_ALG_ES384,
            },
            TestCase {
                alg: SigningAlgorithm::Es512,
                alg_str: SIGNING_ALG_ES512,
            },
            TestCase {
                alg: SigningAlgorithm::Ps256,
                alg_str: SIGNING_ALG_PS256,
            },
            TestCase {
                alg: SigningAlgorithm::Ps384,
                alg_str: SIGNING_ALG_PS384,
            },
            TestCase {
                alg: SigningAlgorithm::Ps512,
                alg_str: SIGNING_ALG_PS512,
            },
        ];

        for TestCase { alg, alg_str } in test_cases {
            let serialized = serde_json::to_string(alg).unwrap();
            let expected = format!("\"{}\"", alg_str);
            assert_eq!(expected, serialized);

            let deserialized_serde: SigningAlgorithm = serde_json::from_str(&expected).unwrap();
            assert_eq!(alg, &deserialized_serde);

            let deserialized_str = SigningAlgorithm::from_str(alg_str).unwrap();
            assert_eq!(alg, &deserialized_str);

            assert_eq!(*alg, SigningAlgorithm::from_str(&alg.to_string()).unwrap());
        }
    }
}
