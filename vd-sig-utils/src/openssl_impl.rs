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

use std::result::Result as StdResult;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use vderror::{
    traits::{ErrorContext, ForeignError},
    Error, Result,
};

use openssl::{
    bn::{BigNum, BigNumContext},
    ec::{EcGroup, EcGroupRef, EcKey, EcPointRef},
    ecdsa::EcdsaSig,
    nid::Nid,
    pkey::{Private, Public},
    sha::sha256,
};

use super::{SignatureVerifier, Signer, SigningAlgorithm};
use crate::{
    error::{CryptoError, FormatError},
    json_object, BoxError, JwkPublic,
};

type EcPrivate = EcKey<Private>;
type EcPublic = EcKey<Public>;

/// A 32-byte coordinate for the elliptic curve.
pub type Coordinate = [u8; 32];

// X9_62_PRIME256V1 is basically an alias for secp256r1
//
// ------------------------------------------
//           Curve names chosen by
//      different standards organizations
// ------------+---------------+-------------
// SECG        |  ANSI X9.62   |  NIST
// ------------+---------------+-------------
// secp256r1   |  prime256v1   |   NIST P-256
//
// source: https://tools.ietf.org/search/rfc4492#appendix-A
pub(crate) const ELLIPTIC_CURVE_NID: Nid = Nid::X9_62_PRIME256V1;

/// [`Signer`] implementation supporting the `ES256` algorithm (ECDSA using the
/// P-256 curve and the SHA-256 hash function).
pub struct Es256Signer {
    private_key: EcPrivate,
    kid: String,
}

const CRV: &str = "P-256";
const ALG: &str = "ES256";
const KTY: &str = "EC";

/// Returns the affine coordinates of the public key.
///
/// The intended use case for this method is when serializing the public key
/// in formats other than the explicitly supported ones.
fn to_affine_coords(
    point: &EcPointRef,
    group: &EcGroupRef,
) -> Result<(Box<Coordinate>, Box<Coordinate>), CryptoError> {
    let mut x = BigNum::new().foreign_err(|| CryptoError::CryptoBackend)?;
    let mut y = BigNum::new().foreign_err(|| CryptoError::CryptoBackend)?;
    let mut ctx = BigNumContext::new().foreign_err(|| CryptoError::CryptoBackend)?;
    point
        .affine_coordinates(group, &mut x, &mut y, &mut ctx)
        .foreign_err(|| CryptoError::CryptoBackend)?;

    // The unwraps are safe, as we choose the length correctly
    let x = x
        .to_vec_padded(32)
        .foreign_err(|| CryptoError::CryptoBackend)?
        .try_into()
        .unwrap();
    let y = y
        .to_vec_padded(32)
        .foreign_err(|| CryptoError::CryptoBackend)?
        .try_into()
        .unwrap();
    Ok((x, y))
}

impl Es256Signer {
    /// Generate a fresh `ES256` key with the given `kid` field when presented as a JWK.
    pub fn generate(kid: String) -> Result<Self, CryptoError> {
        let ec_group = EcGroup::from_curve_name(ELLIPTIC_CURVE_NID)
            .foreign_err(|| CryptoError::CryptoBackend)?;
        let private_key = EcKey::<Private>::generate(ec_group.as_ref())
            .foreign_err(|| CryptoError::KeyGenerationFailed)?;

        Ok(Self { private_key, kid })
    }

    /// Create a `ES256` signer from private key in the PEM format.
    pub fn from_private_key_pem(kid: String, private_key_pem: &[u8]) -> Result<Self, CryptoError> {
        let private_key = EcPrivate::private_key_from_pem(private_key_pem)
            .foreign_err(|| CryptoError::CryptoBackend)?;

        Ok(Self { private_key, kid })
    }

    /// Construct a JWK JSON object for the public counterpart of this key. It
    /// will use the `kid` field set at construction.
    pub fn public_jwk(&self) -> Result<JwkPublic, CryptoError> {
        let (x_bytes, y_bytes) =
            to_affine_coords(self.private_key.public_key(), self.private_key.group())?;

        Ok(ec_public_affine_coords_to_jwk(
            &x_bytes,
            &y_bytes,
            Some(&self.kid),
        ))
    }

    /// Return the `kid` parameter associated with this key.
    pub fn kid(&self) -> &str {
        &self.kid
    }
}

/// Construct a JWK JSON object for this public key.
/// **Note**: only ECDSA keys using P-256 curve are supported!
pub fn openssl_ec_pub_key_to_jwk(
    key: &EcKey<Public>,
    kid: Option<&str>,
) -> Result<JwkPublic, CryptoError> {
    let (x_bytes, y_bytes) = to_affine_coords(key.public_key(), key.group())?;
    Ok(ec_public_affine_coords_to_jwk(&x_bytes, &y_bytes, kid))
}

/// Constructs the JWK from the coordinates of the public ECDSA key using P-256
/// curve.
///
/// **Note**: this function **DOES NOT** check that the coordinates are valid.
pub fn ec_public_affine_coords_to_jwk(
    x_bytes: &[u8; 32],
    y_bytes: &[u8; 32],
    kid: Option<&str>,
) -> JwkPublic {
    let x = crate::utils::base64_url_encode(x_bytes);
    let y = crate::utils::base64_url_encode(y_bytes);

    let mut jwk = json_object!({
        "kty": KTY,
        "alg": ALG,
        "use": "sig",
        "crv": CRV,
        "x": x,
        "y": y,
    });

    if let Some(kid) = kid {
        jwk.insert("kid".to_owned(), serde_json::Value::String(kid.to_owned()));
    }

    jwk
}

impl Signer for Es256Signer {
    fn algorithm(&self) -> SigningAlgorithm {
        SigningAlgorithm::Es256
    }

    fn sign(&self, message: &[u8]) -> StdResult<Vec<u8>, BoxError> {
        let digest = sha256(message);
        let signature = EcdsaSig::sign(&digest, self.private_key.as_ref())?;

        // The unwraps are safe, as we've requested a vector of the exact same size as the array
        let r: Box<[u8; 32]> = signature.r().to_vec_padded(32)?.try_into().unwrap();
        let s: Box<[u8; 32]> = signature.s().to_vec_padded(32)?.try_into().unwrap();
        let mut raw = (r as Box<[_]>).into_vec();
        raw.extend_from_slice(&*s);
        Ok(raw)
    }

    fn public_jwk(&self) -> StdResult<JwkPublic, BoxError> {
        Ok(self.public_jwk()?)
    }
}

/// [`SignatureVerifier`] implementation supporting the `ES256` algorithm (ECDSA
/// using the P-256 curve and the SHA-256 hash function).
#[derive(Default)]
pub struct Es256Verifier;

impl SignatureVerifier for Es256Verifier {
    fn algorithm(&self) -> SigningAlgorithm {
        SigningAlgorithm::Es256
    }

    fn verify(
        &self,
        message: &[u8],
        signature: &[u8],
        public_key: &JwkPublic,
    ) -> StdResult<bool, BoxError> {
        let public_key = public_key_from_jwk_es256(public_key)?;
        let raw_bytes = <&[u8; 64]>::try_from(signature)?;
        let (r, s) = raw_bytes.split_at(32);
        let r = BigNum::from_slice(r)?;
        let s = BigNum::from_slice(s)?;
        let ecdsa_sig = EcdsaSig::from_private_components(r, s)?;

        let digest = sha256(message);

        let valid_signature = ecdsa_sig.verify(&digest, public_key.as_ref())?;
        if !valid_signature {
            return Ok(false);
        }

        Ok(true)
    }
}

pub(crate) fn public_key_from_jwk_es256(public_key: &JwkPublic) -> Result<EcPublic, FormatError> {
    check_jwk_field(public_key, "kty", KTY)?;
    check_jwk_field(public_key, "crv", CRV)?;

    let x = parse_coord(public_key, "x")?;
    let x = BigNum::from_slice(check_len(&x)?)
        .foreign_err(|| FormatError::JwkParsingFailed("Failed to construct BigNum".to_string()))?;
    let y = parse_coord(public_key, "y")?;
    let y = BigNum::from_slice(check_len(&y)?)
        .foreign_err(|| FormatError::JwkParsingFailed("Failed to construct BigNum".to_string()))?;

    // The unwrap is safe because we always use the same curve.
    let group = EcGroup::from_curve_name(ELLIPTIC_CURVE_NID).unwrap();
    let public_key =
        EcPublic::from_public_key_affine_coordinates(group.as_ref(), x.as_ref(), y.as_ref())
            .foreign_err(|| {
                FormatError::JwkParsingFailed("coordinate construction failed".to_string())
            })?;
    Ok(public_key)
}

fn check_len(coord: &[u8]) -> Result<&[u8; 32], FormatError> {
    <&[u8; 32]>::try_from(coord)
        .foreign_err(|| FormatError::JwkParsingFailed("parsing coord failed".to_string()))
        .ctx(|| format!("check len of {:?} failed", coord))
}

fn check_jwk_field(
    public_key: &JwkPublic,
    field: &str,
    expected_value: &str,
) -> Result<(), FormatError> {
    let error = |message| Error::root(FormatError::JwkParsingFailed(message));

    let value = public_key
        .get(field)
        .ok_or_else(|| error(format!("missing \"{}\" field", field)))?;

    if value == expected_value {
        return Ok(());
    }

    Err(error(format!("incorrect value on \"{}\" field", field))).ctx(|| {
        format!(
            "value on field \"{}\" was {}, expected {}",
            field, value, expected_value
        )
    })
}

fn parse_coord(public_key: &JwkPublic, coord: &str) -> Result<Vec<u8>, FormatError> {
    let error = |message| vderror::Error::root(FormatError::JwkParsingFailed(message));

    let coord = public_key
        .get(coord)
        .ok_or_else(|| error(format!("fetching coordinate {} failed", coord)))?;
    let base64_coord = coord
        .as_str()
        .ok_or_else(|| error("coord not str".to_string()))
        .ctx(|| format!("coord {0} as str failed", coord))?;
    URL_SAFE_NO_PAD
        .decode(base64_coord)
        .foreign_err(|| FormatError::JwkParsingFailed("decoding coord failed".to_string()))
        .ctx(|| format!("decoding coord {0} failed", base64_coord))
}
