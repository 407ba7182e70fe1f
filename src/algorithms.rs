//! Algorithm registry.
//!
//! A small, closed set of OIDs this crate knows how to drive: digest
//! algorithms, content-encryption block ciphers, key-wrap schemes, and
//! the ECDH/X9.63-KDF family used by `KeyAgreeRecipientInfo`. Dispatch is
//! centralized in the `from_oid` lookups below rather than threaded
//! through `match` statements at every call site.
//!
//! Every OID that `const-oid`'s database doesn't carry (plain DES-CBC,
//! `ecdsa-with-SHA1`, the `dhSinglePass-stdDH-shaXXXkdf-scheme` family) is
//! declared locally with `ObjectIdentifier::new_unwrap`, the same pattern
//! `x509-cert` itself uses for OIDs outside `const-oid`'s curated set.

use crate::error::{Error, Result};
use der::asn1::ObjectIdentifier;

/// Digest (hash) algorithms this crate can pair with a signature or KDF.
///
/// `Sha224` is wired in unconditionally here, matching what an
/// unconditional build of the `ifdef`-gated original C source would have
/// produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[allow(missing_docs)]
pub enum HashAlgorithm {
    Sha1,
    Sha224,
    #[default]
    Sha256,
    Sha384,
    Sha512,
}

impl HashAlgorithm {
    /// `OBJECT IDENTIFIER` naming this hash function, standalone (not
    /// paired with a signature algorithm).
    pub const fn oid(self) -> ObjectIdentifier {
        use const_oid::db::rfc5912 as db;
        match self {
            HashAlgorithm::Sha1 => db::ID_SHA_1,
            HashAlgorithm::Sha224 => db::ID_SHA_224,
            HashAlgorithm::Sha256 => db::ID_SHA_256,
            HashAlgorithm::Sha384 => db::ID_SHA_384,
            HashAlgorithm::Sha512 => db::ID_SHA_512,
        }
    }

    /// Output size in bytes.
    pub const fn digest_size(self) -> usize {
        match self {
            HashAlgorithm::Sha1 => 20,
            HashAlgorithm::Sha224 => 28,
            HashAlgorithm::Sha256 => 32,
            HashAlgorithm::Sha384 => 48,
            HashAlgorithm::Sha512 => 64,
        }
    }

    /// Resolve a hash algorithm OID to its registry entry.
    pub fn from_oid(oid: &ObjectIdentifier) -> Result<Self> {
        use const_oid::db::rfc5912 as db;
        Ok(match *oid {
            x if x == db::ID_SHA_1 => HashAlgorithm::Sha1,
            x if x == db::ID_SHA_224 => HashAlgorithm::Sha224,
            x if x == db::ID_SHA_256 => HashAlgorithm::Sha256,
            x if x == db::ID_SHA_384 => HashAlgorithm::Sha384,
            x if x == db::ID_SHA_512 => HashAlgorithm::Sha512,
            _ => return Err(Error::UnsupportedAlgorithm),
        })
    }
}

/// Public-key algorithm family used by a signer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum PublicKeyAlgorithm {
    Rsa,
    Ecdsa,
}

impl PublicKeyAlgorithm {
    /// Resolve an `AlgorithmIdentifier.algorithm` OID carried in a
    /// certificate's `SubjectPublicKeyInfo`.
    pub fn from_oid(oid: &ObjectIdentifier) -> Result<Self> {
        use const_oid::db::rfc5912 as db;
        Ok(match *oid {
            x if x == db::RSA_ENCRYPTION => PublicKeyAlgorithm::Rsa,
            x if x == db::ID_EC_PUBLIC_KEY => PublicKeyAlgorithm::Ecdsa,
            _ => return Err(Error::UnsupportedSignatureKey),
        })
    }
}

/// ecdsa-with-SHA1, not present in the `const-oid` database (it predates
/// the RFC 5912 arc the rest of the ECDSA-with-SHA family lives under).
const ECDSA_WITH_SHA1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.4.1");

/// Resolve the `(PublicKeyAlgorithm, HashAlgorithm)` pair used by a signer
/// to the `signatureAlgorithm` OID CMS places in `SignerInfo`.
pub fn signature_algorithm_oid(
    pubkey: PublicKeyAlgorithm,
    hash: HashAlgorithm,
) -> Result<ObjectIdentifier> {
    use const_oid::db::rfc5912 as db;
    Ok(match (pubkey, hash) {
        (PublicKeyAlgorithm::Rsa, HashAlgorithm::Sha1) => db::SHA_1_WITH_RSA_ENCRYPTION,
        (PublicKeyAlgorithm::Rsa, HashAlgorithm::Sha224) => db::SHA_224_WITH_RSA_ENCRYPTION,
        (PublicKeyAlgorithm::Rsa, HashAlgorithm::Sha256) => db::SHA_256_WITH_RSA_ENCRYPTION,
        (PublicKeyAlgorithm::Rsa, HashAlgorithm::Sha384) => db::SHA_384_WITH_RSA_ENCRYPTION,
        (PublicKeyAlgorithm::Rsa, HashAlgorithm::Sha512) => db::SHA_512_WITH_RSA_ENCRYPTION,
        (PublicKeyAlgorithm::Ecdsa, HashAlgorithm::Sha1) => ECDSA_WITH_SHA1,
        (PublicKeyAlgorithm::Ecdsa, HashAlgorithm::Sha224) => db::ECDSA_WITH_SHA_224,
        (PublicKeyAlgorithm::Ecdsa, HashAlgorithm::Sha256) => db::ECDSA_WITH_SHA_256,
        (PublicKeyAlgorithm::Ecdsa, HashAlgorithm::Sha384) => db::ECDSA_WITH_SHA_384,
        (PublicKeyAlgorithm::Ecdsa, HashAlgorithm::Sha512) => db::ECDSA_WITH_SHA_512,
    })
}

/// Recover the hash half of a `(pubkey, hash)` pair from a
/// `signatureAlgorithm` OID on the decode path.
pub fn hash_for_signature_algorithm(
    pubkey: PublicKeyAlgorithm,
    sig_oid: &ObjectIdentifier,
) -> Result<HashAlgorithm> {
    for hash in [
        HashAlgorithm::Sha1,
        HashAlgorithm::Sha224,
        HashAlgorithm::Sha256,
        HashAlgorithm::Sha384,
        HashAlgorithm::Sha512,
    ] {
        if matches!(signature_algorithm_oid(pubkey, hash), Ok(oid) if &oid == sig_oid) {
            return Ok(hash);
        }
    }
    Err(Error::UnsupportedSignatureKey)
}

/// Content-encryption block ciphers used by `EncryptedContentInfo`'s
/// `contentEncryptionAlgorithm` in both `EnvelopedData` and
/// `EncryptedData`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[allow(missing_docs)]
pub enum ContentEncryptionAlgorithm {
    #[default]
    Aes128Cbc,
    Aes192Cbc,
    Aes256Cbc,
    Des,
    DesEde3,
}

/// Plain single-DES-CBC, `1.3.14.3.2.7`; not in `const-oid`'s curated set
/// (only the EDE3 variant is, under `rfc5911::DES_EDE_3_CBC`).
const DES_CBC: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.14.3.2.7");

impl ContentEncryptionAlgorithm {
    /// OID naming this content-encryption algorithm.
    pub const fn oid(self) -> ObjectIdentifier {
        use const_oid::db::rfc5911 as db;
        match self {
            ContentEncryptionAlgorithm::Aes128Cbc => db::ID_AES_128_CBC,
            ContentEncryptionAlgorithm::Aes192Cbc => db::ID_AES_192_CBC,
            ContentEncryptionAlgorithm::Aes256Cbc => db::ID_AES_256_CBC,
            ContentEncryptionAlgorithm::Des => DES_CBC,
            ContentEncryptionAlgorithm::DesEde3 => db::DES_EDE_3_CBC,
        }
    }

    /// Block size in bytes; also the required IV length.
    pub const fn block_size(self) -> usize {
        match self {
            ContentEncryptionAlgorithm::Aes128Cbc
            | ContentEncryptionAlgorithm::Aes192Cbc
            | ContentEncryptionAlgorithm::Aes256Cbc => 16,
            ContentEncryptionAlgorithm::Des | ContentEncryptionAlgorithm::DesEde3 => 8,
        }
    }

    /// CEK length in bytes.
    pub const fn key_size(self) -> usize {
        match self {
            ContentEncryptionAlgorithm::Aes128Cbc => 16,
            ContentEncryptionAlgorithm::Aes192Cbc => 24,
            ContentEncryptionAlgorithm::Aes256Cbc => 32,
            ContentEncryptionAlgorithm::Des => 8,
            ContentEncryptionAlgorithm::DesEde3 => 24,
        }
    }

    /// Resolve a content-encryption OID to its registry entry.
    pub fn from_oid(oid: &ObjectIdentifier) -> Result<Self> {
        use const_oid::db::rfc5911 as db;
        Ok(match *oid {
            x if x == db::ID_AES_128_CBC => ContentEncryptionAlgorithm::Aes128Cbc,
            x if x == db::ID_AES_192_CBC => ContentEncryptionAlgorithm::Aes192Cbc,
            x if x == db::ID_AES_256_CBC => ContentEncryptionAlgorithm::Aes256Cbc,
            x if x == DES_CBC => ContentEncryptionAlgorithm::Des,
            x if x == db::DES_EDE_3_CBC => ContentEncryptionAlgorithm::DesEde3,
            _ => return Err(Error::UnsupportedAlgorithm),
        })
    }
}

/// Key-wrap algorithms used to protect a CEK under a KARI-derived KEK
/// (RFC 3394).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[allow(missing_docs)]
pub enum KeyWrapAlgorithm {
    #[default]
    Aes128Wrap,
    Aes192Wrap,
    Aes256Wrap,
}

impl KeyWrapAlgorithm {
    /// OID naming this key-wrap algorithm.
    pub const fn oid(self) -> ObjectIdentifier {
        use const_oid::db::rfc5911 as db;
        match self {
            KeyWrapAlgorithm::Aes128Wrap => db::ID_AES_128_WRAP,
            KeyWrapAlgorithm::Aes192Wrap => db::ID_AES_192_WRAP,
            KeyWrapAlgorithm::Aes256Wrap => db::ID_AES_256_WRAP,
        }
    }

    /// KEK length in bytes required by this wrap algorithm.
    pub const fn key_size(self) -> usize {
        match self {
            KeyWrapAlgorithm::Aes128Wrap => 16,
            KeyWrapAlgorithm::Aes192Wrap => 24,
            KeyWrapAlgorithm::Aes256Wrap => 32,
        }
    }

    /// Resolve a key-wrap OID to its registry entry.
    pub fn from_oid(oid: &ObjectIdentifier) -> Result<Self> {
        use const_oid::db::rfc5911 as db;
        Ok(match *oid {
            x if x == db::ID_AES_128_WRAP => KeyWrapAlgorithm::Aes128Wrap,
            x if x == db::ID_AES_192_WRAP => KeyWrapAlgorithm::Aes192Wrap,
            x if x == db::ID_AES_256_WRAP => KeyWrapAlgorithm::Aes256Wrap,
            _ => return Err(Error::UnsupportedKeyWrap),
        })
    }
}

/// `dhSinglePass-stdDH-shaXXXkdf-scheme` key-agreement OIDs (RFC 5753),
/// naming both the ECDH mode and the hash driving the X9.63 KDF. None of
/// these are in `const-oid`'s database, so the arc (`1.3.132.1.11`) is
/// declared locally, matching the pattern used for
/// `DES_CBC`/`ECDSA_WITH_SHA1` above.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[allow(missing_docs)]
pub enum KeyAgreementAlgorithm {
    StdDhSha1Kdf,
    StdDhSha224Kdf,
    #[default]
    StdDhSha256Kdf,
    StdDhSha384Kdf,
    StdDhSha512Kdf,
}

impl KeyAgreementAlgorithm {
    /// OID naming this key-agreement scheme.
    pub const fn oid(self) -> ObjectIdentifier {
        match self {
            KeyAgreementAlgorithm::StdDhSha1Kdf => {
                ObjectIdentifier::new_unwrap("1.3.132.1.11.1")
            }
            KeyAgreementAlgorithm::StdDhSha224Kdf => {
                ObjectIdentifier::new_unwrap("1.3.132.1.11.0")
            }
            KeyAgreementAlgorithm::StdDhSha256Kdf => {
                ObjectIdentifier::new_unwrap("1.3.132.1.11.2")
            }
            KeyAgreementAlgorithm::StdDhSha384Kdf => {
                ObjectIdentifier::new_unwrap("1.3.132.1.11.3")
            }
            KeyAgreementAlgorithm::StdDhSha512Kdf => {
                ObjectIdentifier::new_unwrap("1.3.132.1.11.15")
            }
        }
    }

    /// Hash algorithm driving this scheme's X9.63 KDF.
    pub const fn hash(self) -> HashAlgorithm {
        match self {
            KeyAgreementAlgorithm::StdDhSha1Kdf => HashAlgorithm::Sha1,
            KeyAgreementAlgorithm::StdDhSha224Kdf => HashAlgorithm::Sha224,
            KeyAgreementAlgorithm::StdDhSha256Kdf => HashAlgorithm::Sha256,
            KeyAgreementAlgorithm::StdDhSha384Kdf => HashAlgorithm::Sha384,
            KeyAgreementAlgorithm::StdDhSha512Kdf => HashAlgorithm::Sha512,
        }
    }

    /// Resolve a key-agreement OID to its registry entry.
    pub fn from_oid(oid: &ObjectIdentifier) -> Result<Self> {
        for alg in [
            KeyAgreementAlgorithm::StdDhSha1Kdf,
            KeyAgreementAlgorithm::StdDhSha224Kdf,
            KeyAgreementAlgorithm::StdDhSha256Kdf,
            KeyAgreementAlgorithm::StdDhSha384Kdf,
            KeyAgreementAlgorithm::StdDhSha512Kdf,
        ] {
            if alg.oid() == *oid {
                return Ok(alg);
            }
        }
        Err(Error::UnsupportedKdf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_encryption_sizes() {
        assert_eq!(ContentEncryptionAlgorithm::Aes128Cbc.block_size(), 16);
        assert_eq!(ContentEncryptionAlgorithm::Aes128Cbc.key_size(), 16);
        assert_eq!(ContentEncryptionAlgorithm::Aes256Cbc.key_size(), 32);
        assert_eq!(ContentEncryptionAlgorithm::DesEde3.block_size(), 8);
        assert_eq!(ContentEncryptionAlgorithm::DesEde3.key_size(), 24);
    }

    #[test]
    fn roundtrip_content_encryption_oid() {
        for alg in [
            ContentEncryptionAlgorithm::Aes128Cbc,
            ContentEncryptionAlgorithm::Aes192Cbc,
            ContentEncryptionAlgorithm::Aes256Cbc,
            ContentEncryptionAlgorithm::Des,
            ContentEncryptionAlgorithm::DesEde3,
        ] {
            assert_eq!(ContentEncryptionAlgorithm::from_oid(&alg.oid()).unwrap(), alg);
        }
    }

    #[test]
    fn signature_algorithm_roundtrip() {
        let oid =
            signature_algorithm_oid(PublicKeyAlgorithm::Rsa, HashAlgorithm::Sha256).unwrap();
        assert_eq!(
            hash_for_signature_algorithm(PublicKeyAlgorithm::Rsa, &oid).unwrap(),
            HashAlgorithm::Sha256
        );
    }

    /// Pins the SHA-224 registry entry so the inverted preprocessor
    /// guard present in some C implementations isn't reintroduced here.
    #[test]
    fn sha224_kdf_is_registered() {
        let alg = KeyAgreementAlgorithm::StdDhSha224Kdf;
        assert_eq!(alg.hash(), HashAlgorithm::Sha224);
        assert_eq!(
            KeyAgreementAlgorithm::from_oid(&alg.oid()).unwrap().hash(),
            HashAlgorithm::Sha224
        );
    }

    #[test]
    fn unsupported_algorithm_is_distinguishable() {
        let bogus = ObjectIdentifier::new_unwrap("1.2.3.4.5");
        assert!(matches!(
            ContentEncryptionAlgorithm::from_oid(&bogus),
            Err(Error::UnsupportedAlgorithm)
        ));
    }
}
