//! Key-Agreement Recipient Info: ECDH-derived key wrap (RFC 5753).
//!
//! Restricted to the P-256 curve, the one `p256`/`ecdsa` pulls in for this
//! crate. `ECC-CMS-SharedInfo` is never decoded off the wire — it's
//! recomputed independently by both sides from parameters each already
//! has — so it is built and hashed directly rather than round-tripped
//! through a derived type.

use crate::algorithms::{HashAlgorithm, KeyAgreementAlgorithm, KeyWrapAlgorithm};
use crate::cert::IssuerAndSerialNumber;
use crate::error::{Error, Result};
use der::asn1::{BitString, OctetString, OctetStringRef};
use der::{Any, Choice, DerOrd, Sequence, ValueOrd};
use elliptic_curve::sec1::ToEncodedPoint;
use spki::AlgorithmIdentifierOwned;
use x509_cert::ext::pkix::SubjectKeyIdentifier;
use zeroize::Zeroizing;

/// `OriginatorPublicKey ::= SEQUENCE { algorithm AlgorithmIdentifier, publicKey BIT STRING }`
#[derive(Clone, Debug, Eq, PartialEq, Sequence, ValueOrd)]
pub struct OriginatorPublicKey {
    pub algorithm: AlgorithmIdentifierOwned,
    pub public_key: BitString,
}

/// `OriginatorIdentifierOrKey` (RFC 5652 §6.2.2).
#[derive(Clone, Debug, Eq, PartialEq, Choice)]
pub enum OriginatorIdentifierOrKey {
    IssuerAndSerialNumber(IssuerAndSerialNumber),

    #[asn1(context_specific = "0", tag_mode = "IMPLICIT")]
    SubjectKeyIdentifier(SubjectKeyIdentifier),

    #[asn1(context_specific = "1", tag_mode = "IMPLICIT", constructed = "true")]
    OriginatorKey(OriginatorPublicKey),
}

impl ValueOrd for OriginatorIdentifierOrKey {
    fn value_cmp(&self, other: &Self) -> der::Result<core::cmp::Ordering> {
        use der::Encode;
        self.to_der()?.der_cmp(&other.to_der()?)
    }
}

/// `RecipientKeyIdentifier ::= SEQUENCE { subjectKeyIdentifier SubjectKeyIdentifier, date GeneralizedTime OPTIONAL, other OtherKeyAttribute OPTIONAL }`
#[derive(Clone, Debug, Eq, PartialEq, Sequence, ValueOrd)]
pub struct RecipientKeyIdentifier {
    pub subject_key_identifier: SubjectKeyIdentifier,
    #[asn1(optional = "true")]
    pub date: Option<der::asn1::GeneralizedTime>,
}

/// `KeyAgreeRecipientIdentifier ::= CHOICE { issuerAndSerialNumber IssuerAndSerialNumber, rKeyId [0] IMPLICIT RecipientKeyIdentifier }`
#[derive(Clone, Debug, Eq, PartialEq, Choice)]
pub enum KeyAgreeRecipientIdentifier {
    IssuerAndSerialNumber(IssuerAndSerialNumber),

    #[asn1(context_specific = "0", tag_mode = "IMPLICIT", constructed = "true")]
    RKeyId(RecipientKeyIdentifier),
}

impl ValueOrd for KeyAgreeRecipientIdentifier {
    fn value_cmp(&self, other: &Self) -> der::Result<core::cmp::Ordering> {
        use der::Encode;
        self.to_der()?.der_cmp(&other.to_der()?)
    }
}

/// `RecipientEncryptedKey ::= SEQUENCE { rid KeyAgreeRecipientIdentifier, encryptedKey EncryptedKey }`
#[derive(Clone, Debug, Eq, PartialEq, Sequence, ValueOrd)]
pub struct RecipientEncryptedKey {
    pub rid: KeyAgreeRecipientIdentifier,
    pub encrypted_key: OctetString,
}

/// `RecipientEncryptedKeys ::= SEQUENCE OF RecipientEncryptedKey`. This
/// core constructs exactly one.
pub type RecipientEncryptedKeys = alloc::vec::Vec<RecipientEncryptedKey>;

/// `KeyAgreeRecipientInfo ::= SEQUENCE { version, originator [0] EXPLICIT,
/// ukm [1] EXPLICIT OPTIONAL, keyEncryptionAlgorithm,
/// recipientEncryptedKeys }`
#[derive(Clone, Debug, Eq, PartialEq, Sequence, ValueOrd)]
pub struct KeyAgreeRecipientInfo {
    pub version: crate::content_info::CmsVersion,
    #[asn1(context_specific = "0", tag_mode = "EXPLICIT", constructed = "true")]
    pub originator: OriginatorIdentifierOrKey,
    #[asn1(context_specific = "1", tag_mode = "EXPLICIT", optional = "true")]
    pub ukm: Option<OctetString>,
    pub key_encryption_algorithm: AlgorithmIdentifierOwned,
    pub recipient_encrypted_keys: RecipientEncryptedKeys,
}

/// ANSI X9.63 KDF: repeatedly hash `Z ‖ counter(BE u32, starting at 1) ‖
/// sharedInfo`, truncating the concatenated output to `out_len` bytes.
pub fn x963_kdf(hash_alg: HashAlgorithm, z: &[u8], shared_info: &[u8], out_len: usize) -> Vec<u8> {
    use sha1::{Digest as _, Sha1};
    use sha2::{Sha224, Sha256, Sha384, Sha512};

    fn run<D: sha2::digest::Digest>(z: &[u8], shared_info: &[u8], out_len: usize) -> Vec<u8> {
        let mut out = Vec::with_capacity(out_len);
        let mut counter: u32 = 1;
        while out.len() < out_len {
            let mut hasher = D::new();
            hasher.update(z);
            hasher.update(counter.to_be_bytes());
            hasher.update(shared_info);
            out.extend_from_slice(&hasher.finalize());
            counter += 1;
        }
        out.truncate(out_len);
        out
    }

    let mut out = match hash_alg {
        HashAlgorithm::Sha1 => {
            let mut o = Vec::with_capacity(out_len);
            let mut counter: u32 = 1;
            while o.len() < out_len {
                let mut hasher = Sha1::new();
                hasher.update(z);
                hasher.update(counter.to_be_bytes());
                hasher.update(shared_info);
                o.extend_from_slice(&hasher.finalize());
                counter += 1;
            }
            o
        }
        HashAlgorithm::Sha224 => run::<Sha224>(z, shared_info, out_len),
        HashAlgorithm::Sha256 => run::<Sha256>(z, shared_info, out_len),
        HashAlgorithm::Sha384 => run::<Sha384>(z, shared_info, out_len),
        HashAlgorithm::Sha512 => run::<Sha512>(z, shared_info, out_len),
    };
    out.truncate(out_len);
    out
}

/// `ECC-CMS-SharedInfo ::= SEQUENCE { keyInfo AlgorithmIdentifier,
/// entityUInfo [0] EXPLICIT OCTET STRING OPTIONAL,
/// suppPubInfo [2] EXPLICIT OCTET STRING }`, built directly as DER bytes
/// for hashing rather than round-tripped through a derived type.
#[derive(Clone, Debug, Sequence)]
struct EccCmsSharedInfo<'a> {
    key_info: AlgorithmIdentifierOwned,
    #[asn1(context_specific = "0", tag_mode = "EXPLICIT", optional = "true")]
    entity_u_info: Option<OctetStringRef<'a>>,
    #[asn1(context_specific = "2", tag_mode = "EXPLICIT")]
    supp_pub_info: OctetStringRef<'a>,
}

/// Build the DER-encoded `ECC-CMS-SharedInfo` used as the X9.63 KDF's
/// `sharedInfo` input.
pub fn build_shared_info(
    wrap_alg: KeyWrapAlgorithm,
    ukm: Option<&[u8]>,
    kek_bit_length: u32,
) -> der::Result<Vec<u8>> {
    use der::Encode;
    let supp_pub_info = kek_bit_length.to_be_bytes();
    let info = EccCmsSharedInfo {
        key_info: AlgorithmIdentifierOwned {
            oid: wrap_alg.oid(),
            parameters: Some(Any::from(der::asn1::Null)),
        },
        entity_u_info: ukm.map(OctetStringRef::new).transpose()?,
        supp_pub_info: OctetStringRef::new(&supp_pub_info)?,
    };
    info.to_der()
}

/// Export an ephemeral P-256 public key in the X9.63 uncompressed form
/// the `originatorKey` alternative carries.
pub fn originator_public_key(public_key: &p256::PublicKey) -> der::Result<OriginatorPublicKey> {
    use const_oid::db::rfc5912::{ID_EC_PUBLIC_KEY, SECP_256_R_1 as PRIME256_V1};
    let point = public_key.to_encoded_point(false);
    Ok(OriginatorPublicKey {
        algorithm: AlgorithmIdentifierOwned {
            oid: ID_EC_PUBLIC_KEY,
            parameters: Some(Any::from(PRIME256_V1)),
        },
        public_key: BitString::from_bytes(point.as_bytes())?,
    })
}

/// Derive a KEK via ECDH + X9.63 KDF and unwrap the CEK carried in
/// `encrypted_key` with AES key wrap (RFC 3394).
pub fn unwrap_cek(
    our_private_key: &p256::SecretKey,
    originator_public_key_point: &p256::PublicKey,
    kdf_alg: KeyAgreementAlgorithm,
    wrap_alg: KeyWrapAlgorithm,
    ukm: Option<&[u8]>,
    encrypted_key: &[u8],
) -> Result<Zeroizing<Vec<u8>>> {
    let shared_secret =
        elliptic_curve::ecdh::diffie_hellman(our_private_key.to_nonzero_scalar(), originator_public_key_point.as_affine());
    let z = Zeroizing::new(shared_secret.raw_secret_bytes().to_vec());
    let kek_len = wrap_alg.key_size();
    let shared_info = build_shared_info(wrap_alg, ukm, (kek_len * 8) as u32)
        .map_err(|_| Error::Crypto("ecc-cms-sharedinfo"))?;
    let kek = Zeroizing::new(x963_kdf(kdf_alg.hash(), &z, &shared_info, kek_len));

    use aes_kw::KekAes128;
    use aes_kw::KekAes192;
    use aes_kw::KekAes256;
    let unwrapped = match wrap_alg {
        KeyWrapAlgorithm::Aes128Wrap => KekAes128::try_from(kek.as_slice())
            .map_err(|_| Error::Crypto("aes-kw key"))?
            .unwrap_vec(encrypted_key)
            .map_err(|_| Error::Crypto("aes-kw unwrap")),
        KeyWrapAlgorithm::Aes192Wrap => KekAes192::try_from(kek.as_slice())
            .map_err(|_| Error::Crypto("aes-kw key"))?
            .unwrap_vec(encrypted_key)
            .map_err(|_| Error::Crypto("aes-kw unwrap")),
        KeyWrapAlgorithm::Aes256Wrap => KekAes256::try_from(kek.as_slice())
            .map_err(|_| Error::Crypto("aes-kw key"))?
            .unwrap_vec(encrypted_key)
            .map_err(|_| Error::Crypto("aes-kw unwrap")),
    }?;
    Ok(Zeroizing::new(unwrapped))
}

/// Derive a KEK via ECDH + X9.63 KDF and wrap `cek` with AES key wrap.
pub fn wrap_cek(
    ephemeral_private_key: &p256::SecretKey,
    recipient_public_key: &p256::PublicKey,
    kdf_alg: KeyAgreementAlgorithm,
    wrap_alg: KeyWrapAlgorithm,
    ukm: Option<&[u8]>,
    cek: &[u8],
) -> Result<Vec<u8>> {
    let shared_secret = elliptic_curve::ecdh::diffie_hellman(
        ephemeral_private_key.to_nonzero_scalar(),
        recipient_public_key.as_affine(),
    );
    let z = Zeroizing::new(shared_secret.raw_secret_bytes().to_vec());
    let kek_len = wrap_alg.key_size();
    let shared_info = build_shared_info(wrap_alg, ukm, (kek_len * 8) as u32)
        .map_err(|_| Error::Crypto("ecc-cms-sharedinfo"))?;
    let kek = Zeroizing::new(x963_kdf(kdf_alg.hash(), &z, &shared_info, kek_len));

    use aes_kw::KekAes128;
    use aes_kw::KekAes192;
    use aes_kw::KekAes256;
    match wrap_alg {
        KeyWrapAlgorithm::Aes128Wrap => KekAes128::try_from(kek.as_slice())
            .map_err(|_| Error::Crypto("aes-kw key"))?
            .wrap_vec(cek)
            .map_err(|_| Error::Crypto("aes-kw wrap")),
        KeyWrapAlgorithm::Aes192Wrap => KekAes192::try_from(kek.as_slice())
            .map_err(|_| Error::Crypto("aes-kw key"))?
            .wrap_vec(cek)
            .map_err(|_| Error::Crypto("aes-kw wrap")),
        KeyWrapAlgorithm::Aes256Wrap => KekAes256::try_from(kek.as_slice())
            .map_err(|_| Error::Crypto("aes-kw key"))?
            .wrap_vec(cek)
            .map_err(|_| Error::Crypto("aes-kw wrap")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn x963_kdf_produces_requested_length() {
        let z = [0x42u8; 32];
        let shared_info = [0xAAu8; 10];
        let kek = x963_kdf(HashAlgorithm::Sha256, &z, &shared_info, 32);
        assert_eq!(kek.len(), 32);
    }

    #[test]
    fn wrap_unwrap_round_trip() {
        use p256::elliptic_curve::rand_core::OsRng;
        let recipient = p256::SecretKey::random(&mut OsRng);
        let recipient_pub = recipient.public_key();
        let ephemeral = p256::SecretKey::random(&mut OsRng);
        let ephemeral_pub = ephemeral.public_key();

        let cek = [0x11u8; 32];
        let wrapped = wrap_cek(
            &ephemeral,
            &recipient_pub,
            KeyAgreementAlgorithm::StdDhSha256Kdf,
            KeyWrapAlgorithm::Aes256Wrap,
            None,
            &cek,
        )
        .unwrap();

        let unwrapped = unwrap_cek(
            &recipient,
            &ephemeral_pub,
            KeyAgreementAlgorithm::StdDhSha256Kdf,
            KeyWrapAlgorithm::Aes256Wrap,
            None,
            &wrapped,
        )
        .unwrap();

        assert_eq!(unwrapped.as_slice(), &cek);
    }
}
