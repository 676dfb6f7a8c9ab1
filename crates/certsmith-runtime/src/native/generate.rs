//! The `generate` entry point.

use std::net::IpAddr;

use certsmith_types::protocol::{
    DigestAlgorithm, ExtKeyUsage, KeyAlgorithm, KeyUsage, SanType, SubjectAltName, ValidityTime,
    WireRequest, CERT_FILE, INPUT_FILE, KEY_FILE,
};
use certsmith_types::status::ErrorKind;
use openssl::asn1::{Asn1Integer, Asn1Object, Asn1OctetString, Asn1Time};
use openssl::bn::BigNum;
use openssl::ec::{EcGroup, EcKey};
use openssl::error::ErrorStack;
use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::pkey::{PKey, Private};
use openssl::rsa::Rsa;
use openssl::x509::extension::{
    BasicConstraints, ExtendedKeyUsage as ExtKeyUsageBuilder, KeyUsage as KeyUsageBuilder,
    SubjectAlternativeName, SubjectKeyIdentifier,
};
use openssl::x509::{X509Extension, X509v3Context, X509};

use super::info::describe;
use super::{dn, read_private_key, OrStatus, Status};
use crate::random::RandomnessProvider;
use crate::vfs::VirtualDirectory;

/// Serial numbers are 20 random octets with the top bit cleared.
const SERIAL_LEN: usize = 20;

const AUTHORITY_KEY_IDENTIFIER_OID: &str = "2.5.29.35";

type KeyUsageSetter = for<'a> fn(&'a mut KeyUsageBuilder) -> &'a mut KeyUsageBuilder;

const KEY_USAGE_BITS: [(KeyUsage, KeyUsageSetter); 9] = [
    (KeyUsage::DIGITAL_SIGNATURE, KeyUsageBuilder::digital_signature),
    (KeyUsage::NON_REPUDIATION, KeyUsageBuilder::non_repudiation),
    (KeyUsage::KEY_ENCIPHERMENT, KeyUsageBuilder::key_encipherment),
    (KeyUsage::DATA_ENCIPHERMENT, KeyUsageBuilder::data_encipherment),
    (KeyUsage::KEY_AGREEMENT, KeyUsageBuilder::key_agreement),
    (KeyUsage::KEY_CERT_SIGN, KeyUsageBuilder::key_cert_sign),
    (KeyUsage::CRL_SIGN, KeyUsageBuilder::crl_sign),
    (KeyUsage::ENCIPHER_ONLY, KeyUsageBuilder::encipher_only),
    (KeyUsage::DECIPHER_ONLY, KeyUsageBuilder::decipher_only),
];

/// Request fields after range checks.
struct Params {
    key_algorithm: KeyAlgorithm,
    digest: DigestAlgorithm,
    key_usage: KeyUsage,
    ext_key_usage: ExtKeyUsage,
}

impl Params {
    fn from_wire(wire: &WireRequest) -> Status<Self> {
        Ok(Self {
            key_algorithm: KeyAlgorithm::from_index(wire.key_algorithm_index)
                .ok_or(ErrorKind::ReadInput)?,
            digest: DigestAlgorithm::from_index(wire.digest_index).ok_or(ErrorKind::ReadInput)?,
            key_usage: KeyUsage::from_bits(wire.key_usage).ok_or(ErrorKind::ReadInput)?,
            ext_key_usage: ExtKeyUsage::from_bits(wire.ext_key_usage)
                .ok_or(ErrorKind::ReadInput)?,
        })
    }
}

pub(super) fn run(dir: &mut VirtualDirectory, random: &dyn RandomnessProvider) -> Status<()> {
    let input = dir.read(INPUT_FILE).ok_or(ErrorKind::OpenFile)?;
    let wire = WireRequest::decode(input).or_status(ErrorKind::ReadInput)?;
    let params = Params::from_wire(&wire)?;

    let signer_key = if wire.self_signed {
        None
    } else {
        Some(read_private_key(dir)?)
    };

    let subject_key = generate_key(params.key_algorithm).or_status(ErrorKind::GenerateKey)?;
    let cert = build_certificate(&wire, &params, &subject_key, signer_key.as_ref(), random)?;

    let record = describe(&cert)?;
    let key_pem = subject_key
        .private_key_to_pem_pkcs8()
        .or_status(ErrorKind::ConvertPem)?;

    dir.write(CERT_FILE, record.encode().or_status(ErrorKind::WriteCertInfo)?);
    dir.write(KEY_FILE, key_pem);
    Ok(())
}

fn generate_key(algorithm: KeyAlgorithm) -> Result<PKey<Private>, ErrorStack> {
    match algorithm {
        KeyAlgorithm::EcP256 => ec_key(Nid::X9_62_PRIME256V1),
        KeyAlgorithm::EcP384 => ec_key(Nid::SECP384R1),
        KeyAlgorithm::Rsa2048 => PKey::from_rsa(Rsa::generate(2048)?),
        KeyAlgorithm::Rsa4096 => PKey::from_rsa(Rsa::generate(4096)?),
    }
}

fn ec_key(curve: Nid) -> Result<PKey<Private>, ErrorStack> {
    let group = EcGroup::from_curve_name(curve)?;
    PKey::from_ec_key(EcKey::generate(&group)?)
}

fn message_digest(digest: DigestAlgorithm) -> MessageDigest {
    match digest {
        DigestAlgorithm::Sha224 => MessageDigest::sha224(),
        DigestAlgorithm::Sha256 => MessageDigest::sha256(),
        DigestAlgorithm::Sha384 => MessageDigest::sha384(),
        DigestAlgorithm::Sha512 => MessageDigest::sha512(),
    }
}

fn build_certificate(
    wire: &WireRequest,
    params: &Params,
    subject_key: &PKey<Private>,
    signer_key: Option<&PKey<Private>>,
    random: &dyn RandomnessProvider,
) -> Status<X509> {
    let mut builder = X509::builder().or_status(ErrorKind::GenerateCert)?;
    builder.set_version(2).or_status(ErrorKind::GenerateCert)?;

    let serial = random_serial(random)?;
    builder
        .set_serial_number(&serial)
        .or_status(ErrorKind::CertSetSerial)?;

    let not_before: Asn1Time = asn1_time(&wire.not_before)?;
    builder
        .set_not_before(&not_before)
        .or_status(ErrorKind::CertSetValidity)?;
    let not_after: Asn1Time = asn1_time(&wire.not_after)?;
    builder
        .set_not_after(&not_after)
        .or_status(ErrorKind::CertSetValidity)?;

    let issuer = if wire.issuer.is_empty() {
        &wire.subject
    } else {
        &wire.issuer
    };
    if !issuer.is_empty() {
        let name = dn::build_name(issuer).or_status(ErrorKind::CertSetIssuer)?;
        builder
            .set_issuer_name(&name)
            .or_status(ErrorKind::CertSetIssuer)?;
    }
    if !wire.subject.is_empty() {
        let name = dn::build_name(&wire.subject).or_status(ErrorKind::CertSetSubject)?;
        builder
            .set_subject_name(&name)
            .or_status(ErrorKind::CertSetSubject)?;
    }

    builder
        .set_pubkey(subject_key)
        .or_status(ErrorKind::GenerateCert)?;

    let mut basic = BasicConstraints::new();
    if wire.is_ca {
        basic.critical().ca();
    }
    builder
        .append_extension(basic.build().or_status(ErrorKind::GenerateCert)?)
        .or_status(ErrorKind::GenerateCert)?;

    if !params.key_usage.is_empty() {
        builder
            .append_extension(key_usage_extension(params.key_usage).or_status(ErrorKind::CertSetKeyUsage)?)
            .or_status(ErrorKind::CertSetKeyUsage)?;
    }
    if !params.ext_key_usage.is_empty() {
        builder
            .append_extension(
                ext_key_usage_extension(params.ext_key_usage)
                    .or_status(ErrorKind::CertSetExtKeyUsage)?,
            )
            .or_status(ErrorKind::CertSetExtKeyUsage)?;
    }

    let skid = {
        let ctx = builder.x509v3_context(None, None);
        SubjectKeyIdentifier::new()
            .build(&ctx)
            .or_status(ErrorKind::CertSetSkid)?
    };
    builder
        .append_extension(skid)
        .or_status(ErrorKind::CertSetSkid)?;

    if !wire.self_signed && !wire.authority_key_id.is_empty() {
        builder
            .append_extension(authority_key_id_extension(&wire.authority_key_id)?)
            .or_status(ErrorKind::CertSetAkid)?;
    }

    if !wire.subject_alt_names.is_empty() {
        let san = {
            let ctx = builder.x509v3_context(None, None);
            san_extension(&wire.subject_alt_names, &ctx)?
        };
        builder
            .append_extension(san)
            .or_status(ErrorKind::CertSetSan)?;
    }

    builder
        .sign(signer_key.unwrap_or(subject_key), message_digest(params.digest))
        .or_status(ErrorKind::GenerateCert)?;
    Ok(builder.build())
}

fn random_serial(random: &dyn RandomnessProvider) -> Status<Asn1Integer> {
    let mut bytes = [0u8; SERIAL_LEN];
    random.fill(&mut bytes).or_status(ErrorKind::CertSetSerial)?;
    bytes[0] &= 0x7f;
    BigNum::from_slice(&bytes)
        .and_then(|bn| bn.to_asn1_integer())
        .or_status(ErrorKind::CertSetSerial)
}

fn asn1_time(wire: &str) -> Status<Asn1Time> {
    let at = ValidityTime::parse(wire)
        .or_status(ErrorKind::CertSetValidity)?
        .to_datetime()
        .ok_or(ErrorKind::CertSetValidity)?;
    Asn1Time::from_unix(at.timestamp().try_into().or_status(ErrorKind::CertSetValidity)?)
        .or_status(ErrorKind::CertSetValidity)
}

fn key_usage_extension(usage: KeyUsage) -> Result<X509Extension, ErrorStack> {
    let mut ext = KeyUsageBuilder::new();
    for (bit, set) in KEY_USAGE_BITS {
        if usage.contains(bit) {
            set(&mut ext);
        }
    }
    ext.build()
}

fn ext_key_usage_extension(usage: ExtKeyUsage) -> Result<X509Extension, ErrorStack> {
    let mut ext = ExtKeyUsageBuilder::new();
    if usage.contains(ExtKeyUsage::SERVER_AUTH) {
        ext.server_auth();
    }
    if usage.contains(ExtKeyUsage::CLIENT_AUTH) {
        ext.client_auth();
    }
    if usage.contains(ExtKeyUsage::CODE_SIGNING) {
        ext.code_signing();
    }
    if usage.contains(ExtKeyUsage::EMAIL_PROTECTION) {
        ext.email_protection();
    }
    if usage.contains(ExtKeyUsage::TIME_STAMPING) {
        ext.time_stamping();
    }
    if usage.contains(ExtKeyUsage::OCSP_SIGNING) {
        ext.other("OCSPSigning");
    }
    if usage.contains(ExtKeyUsage::ANY) {
        ext.other("anyExtendedKeyUsage");
    }
    ext.build()
}

/// `AuthorityKeyIdentifier ::= SEQUENCE { keyIdentifier [0] IMPLICIT OCTET STRING }`
fn authority_key_id_extension(key_id: &[u8]) -> Status<X509Extension> {
    // Short-form DER lengths only.
    let id_len = u8::try_from(key_id.len())
        .ok()
        .filter(|len| *len <= 125)
        .ok_or(ErrorKind::CertSetAkid)?;
    let mut der = vec![0x30, id_len + 2, 0x80, id_len];
    der.extend_from_slice(key_id);

    let oid = Asn1Object::from_str(AUTHORITY_KEY_IDENTIFIER_OID).or_status(ErrorKind::CertSetAkid)?;
    let contents = Asn1OctetString::new_from_bytes(&der).or_status(ErrorKind::CertSetAkid)?;
    X509Extension::new_from_der(&oid, false, &contents).or_status(ErrorKind::CertSetAkid)
}

fn san_extension(sans: &[SubjectAltName], ctx: &X509v3Context<'_>) -> Status<X509Extension> {
    let mut ext = SubjectAlternativeName::new();
    for san in sans {
        if san.value.is_empty() {
            return Err(ErrorKind::CertSetSan);
        }
        match san.kind {
            SanType::Dns => {
                ext.dns(&san.value);
            }
            SanType::Ip => {
                san.value
                    .parse::<IpAddr>()
                    .or_status(ErrorKind::CertSetSan)?;
                ext.ip(&san.value);
            }
            SanType::Email => {
                ext.email(&san.value);
            }
        }
    }
    ext.build(ctx).or_status(ErrorKind::CertSetSan)
}
