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

//! Helpers for generating certificate material in tests.
//!
//! Certificates are generated at runtime instead of being checked in as PEM blobs, so the strict
//! validity-window checks of [`X5Chain::verify_against_trusted_roots`][crate::X5Chain] never
//! start failing as a fixture ages.
//!
//! Do **NOT** use any of this for production code; this is not a CA implementation.

use openssl::{
    asn1::{Asn1Integer, Asn1Time},
    bn::{BigNum, MsbOption},
    ec::{EcGroup, EcKey},
    hash::MessageDigest,
    nid::Nid,
    pkey::{PKey, Private},
    x509::{
        extension::{AuthorityKeyIdentifier, BasicConstraints, KeyUsage, SubjectKeyIdentifier},
        X509Name, X509NameBuilder, X509,
    },
};

/// X.509v3
///
/// See [RFC 5280 - section 4.1.2.1](https://datatracker.ietf.org/doc/html/rfc5280#section-4.1.2.1)
const VERSION: i32 = 2;

/// Length of the certificate serial number in bits.
///
/// See [RFC 5280 - section 4.1.2.2](https://datatracker.ietf.org/doc/html/rfc5280#section-4.1.2.2).
const SERIAL_NUMBER_BITS: i32 = 159;

/// Hardcoded duration of the validity period for generated certificates.
const VALIDITY_PERIOD_IN_DAYS: u32 = 365 * 10;

/// Generates a fresh `P-256` key pair.
pub fn generate_key() -> PKey<Private> {
    let group = EcGroup::from_curve_name(Nid::X9_62_PRIME256V1).unwrap();
    let key = EcKey::generate(group.as_ref()).unwrap();
    PKey::from_ec_key(key).unwrap()
}

/// Generates a self-signed CA certificate together with its private key.
pub fn generate_self_signed_ca(common_name: &str) -> (X509, PKey<Private>) {
    let key = generate_key();
    let cert = self_signed_ca_with_key(common_name, &key);
    (cert, key)
}

/// Builds a self-signed CA certificate over the provided key.
pub fn self_signed_ca_with_key(common_name: &str, key: &PKey<Private>) -> X509 {
    let name = subject_name(common_name);

    let mut builder = X509::builder().unwrap();
    builder.set_version(VERSION).unwrap();
    builder.set_serial_number(&random_serial()).unwrap();
    builder.set_subject_name(&name).unwrap();
    builder.set_issuer_name(&name).unwrap();
    builder.set_pubkey(key).unwrap();
    set_validity(&mut builder);

    builder
        .append_extension(BasicConstraints::new().critical().ca().build().unwrap())
        .unwrap();
    builder
        .append_extension(
            KeyUsage::new()
                .critical()
                .key_cert_sign()
                .crl_sign()
                .digital_signature()
                .build()
                .unwrap(),
        )
        .unwrap();

    let skid = SubjectKeyIdentifier::new()
        .build(&builder.x509v3_context(None, None))
        .unwrap();
    builder.append_extension(skid).unwrap();

    builder.sign(key, MessageDigest::sha256()).unwrap();
    builder.build()
}

/// Issues an intermediate CA certificate signed by the provided parent.
pub fn issue_intermediate(
    parent: &X509,
    parent_key: &PKey<Private>,
    common_name: &str,
) -> (X509, PKey<Private>) {
    let key = generate_key();

    let mut builder = X509::builder().unwrap();
    builder.set_version(VERSION).unwrap();
    builder.set_serial_number(&random_serial()).unwrap();
    builder.set_subject_name(&subject_name(common_name)).unwrap();
    builder.set_issuer_name(parent.subject_name()).unwrap();
    builder.set_pubkey(&key).unwrap();
    set_validity(&mut builder);

    builder
        .append_extension(
            BasicConstraints::new()
                .critical()
                .ca()
                .pathlen(0)
                .build()
                .unwrap(),
        )
        .unwrap();
    builder
        .append_extension(
            KeyUsage::new()
                .critical()
                .key_cert_sign()
                .crl_sign()
                .digital_signature()
                .build()
                .unwrap(),
        )
        .unwrap();

    let skid = SubjectKeyIdentifier::new()
        .build(&builder.x509v3_context(Some(parent), None))
        .unwrap();
    builder.append_extension(skid).unwrap();

    let akid = AuthorityKeyIdentifier::new()
        .keyid(false)
        .issuer(false)
        .build(&builder.x509v3_context(Some(parent), None))
        .unwrap();
    builder.append_extension(akid).unwrap();

    builder.sign(parent_key, MessageDigest::sha256()).unwrap();
    (builder.build(), key)
}

/// Issues an end-entity certificate for the provided key, signed by the parent.
pub fn issue_leaf(
    parent: &X509,
    parent_key: &PKey<Private>,
    common_name: &str,
    key: &PKey<Private>,
) -> X509 {
    let mut builder = X509::builder().unwrap();
    builder.set_version(VERSION).unwrap();
    builder.set_serial_number(&random_serial()).unwrap();
    builder.set_subject_name(&subject_name(common_name)).unwrap();
    builder.set_issuer_name(parent.subject_name()).unwrap();
    builder.set_pubkey(key).unwrap();
    set_validity(&mut builder);

    builder
        .append_extension(BasicConstraints::new().build().unwrap())
        .unwrap();
    builder
        .append_extension(
            KeyUsage::new()
                .critical()
                .digital_signature()
                .non_repudiation()
                .build()
                .unwrap(),
        )
        .unwrap();

    let skid = SubjectKeyIdentifier::new()
        .build(&builder.x509v3_context(Some(parent), None))
        .unwrap();
    builder.append_extension(skid).unwrap();

    let akid = AuthorityKeyIdentifier::new()
        .keyid(false)
        .issuer(false)
        .build(&builder.x509v3_context(Some(parent), None))
        .unwrap();
    builder.append_extension(akid).unwrap();

    builder.sign(parent_key, MessageDigest::sha256()).unwrap();
    builder.build()
}

fn subject_name(common_name: &str) -> X509Name {
    let mut name = X509NameBuilder::new().unwrap();
    name.append_entry_by_text("C", "HR").unwrap();
    name.append_entry_by_text("O", "VDL").unwrap();
    name.append_entry_by_text("CN", common_name).unwrap();
    name.build()
}

fn set_validity(builder: &mut openssl::x509::X509Builder) {
    let not_before = Asn1Time::days_from_now(0).unwrap();
    builder.set_not_before(&not_before).unwrap();
    let not_after = Asn1Time::days_from_now(VALIDITY_PERIOD_IN_DAYS).unwrap();
    builder.set_not_after(&not_after).unwrap();
}

/// See this [stackexchange answer](https://crypto.stackexchange.com/questions/257/unpredictability-of-x-509-serial-numbers)
/// for more details.
fn random_serial() -> Asn1Integer {
    let mut serial = BigNum::new().unwrap();
    // a set top bit keeps the serial positive and non-zero
    serial
        .rand(SERIAL_NUMBER_BITS, MsbOption::ONE, false)
        .unwrap();
    serial.to_asn1_integer().unwrap()
}
