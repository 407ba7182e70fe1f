//! SignedData-related types

use crate::cert::{CertificateChoices, IssuerAndSerialNumber};
use crate::content_info::CmsVersion;
use crate::revocation::RevocationInfoChoices;

use core::cmp::Ordering;
use der::asn1::{ObjectIdentifier, OctetString, SetOfVec};
use der::{Any, Choice, DerOrd, Sequence, ValueOrd};
use spki::AlgorithmIdentifierOwned;
use x509_cert::attr::Attributes;
use x509_cert::ext::pkix::SubjectKeyIdentifier;
use x509_cert::impl_newtype;

/// The `SignedData` type is defined in [RFC 5652 Section 5.1].
///
/// ```text
///   SignedData ::= SEQUENCE {
///       version CMSVersion,
///       digestAlgorithms SET OF DigestAlgorithmIdentifier,
///       encapContentInfo EncapsulatedContentInfo,
///       certificates [0] IMPLICIT CertificateSet OPTIONAL,
///       crls [1] IMPLICIT RevocationInfoChoices OPTIONAL,
///       signerInfos SignerInfos }
/// ```
///
/// [RFC 5652 Section 5.1]: https://www.rfc-editor.org/rfc/rfc5652#section-5.1
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
#[allow(missing_docs)]
pub struct SignedData {
    pub version: CmsVersion,
    pub digest_algorithms: DigestAlgorithmIdentifiers,
    pub encap_content_info: EncapsulatedContentInfo,
    #[asn1(context_specific = "0", tag_mode = "IMPLICIT", optional = "true")]
    pub certificates: Option<CertificateSet>,
    #[asn1(context_specific = "1", tag_mode = "IMPLICIT", optional = "true")]
    pub crls: Option<RevocationInfoChoices>,
    pub signer_infos: SignerInfos,
}


/// The `DigestAlgorithmIdentifiers` type is defined in [RFC 5652 Section 5.1].
///
/// ```text
/// DigestAlgorithmIdentifiers ::= SET OF DigestAlgorithmIdentifier
/// ```
///
/// [RFC 5652 Section 5.1]: https://datatracker.ietf.org/doc/html/rfc5652#section-5.1
pub type DigestAlgorithmIdentifiers = SetOfVec<AlgorithmIdentifierOwned>;

/// CertificateSet structure as defined in [RFC 5652 Section 10.2.3].
///
/// ```text
///   CertificateSet ::= SET OF CertificateChoices
/// ```
///
/// [RFC 5652 Section 10.2.3]: https://datatracker.ietf.org/doc/html/rfc5652#section-10.2.3
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct CertificateSet(pub SetOfVec<CertificateChoices>);
impl_newtype!(CertificateSet, SetOfVec<CertificateChoices>);

#[cfg(feature = "std")]
impl TryFrom<std::vec::Vec<CertificateChoices>> for CertificateSet {
    type Error = der::Error;

    fn try_from(vec: std::vec::Vec<CertificateChoices>) -> der::Result<CertificateSet> {
        Ok(CertificateSet(SetOfVec::try_from(vec)?))
    }
}

/// The `SignerInfos` type is defined in [RFC 5652 Section 5.1].
///
/// ```text
///   SignerInfos ::= SET OF SignerInfo
/// ```
///
/// [RFC 5652 Section 5.1]: https://www.rfc-editor.org/rfc/rfc5652#section-5.1
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct SignerInfos(pub SetOfVec<SignerInfo>);
impl_newtype!(SignerInfos, SetOfVec<SignerInfo>);

#[cfg(feature = "std")]
impl TryFrom<std::vec::Vec<SignerInfo>> for SignerInfos {
    type Error = der::Error;

    fn try_from(vec: std::vec::Vec<SignerInfo>) -> der::Result<SignerInfos> {
        Ok(SignerInfos(SetOfVec::try_from(vec)?))
    }
}

/// The `EncapsulatedContentInfo` type is defined in [RFC 5652 Section 5.2].
///
/// ```text
///   EncapsulatedContentInfo ::= SEQUENCE {
///       eContentType       CONTENT-TYPE.&id({ContentSet}),
///       eContent           [0] EXPLICIT OCTET STRING
///               ( CONTAINING CONTENT-TYPE.
///                   &Type({ContentSet}{@eContentType})) OPTIONAL }
/// ```
///
/// [RFC 5652 Section 5.2]: https://www.rfc-editor.org/rfc/rfc5652#section-5.2
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
#[allow(missing_docs)]
pub struct EncapsulatedContentInfo {
    pub econtent_type: ObjectIdentifier,
    #[asn1(context_specific = "0", tag_mode = "EXPLICIT", optional = "true")]
    pub econtent: Option<Any>,
}

/// The `SignerInfo` type is defined in [RFC 5652 Section 5.3].
///
/// ```text
///   SignerInfo ::= SEQUENCE {
///       version CMSVersion,
///       sid SignerIdentifier,
///       digestAlgorithm DigestAlgorithmIdentifier,
///       signedAttrs [0] IMPLICIT SignedAttributes OPTIONAL,
///       signatureAlgorithm SignatureAlgorithmIdentifier,
///       signature SignatureValue,
///       unsignedAttrs [1] IMPLICIT Attributes
///           {{UnsignedAttributes}} OPTIONAL }
/// ```
///
/// [RFC 5652 Section 5.3]: https://www.rfc-editor.org/rfc/rfc5652#section-5.3
#[derive(Clone, Debug, Eq, PartialEq, Sequence, ValueOrd)]
#[allow(missing_docs)]
pub struct SignerInfo {
    pub version: CmsVersion,
    pub sid: SignerIdentifier,
    pub digest_alg: AlgorithmIdentifierOwned,
    #[asn1(
        context_specific = "0",
        tag_mode = "IMPLICIT",
        constructed = "true",
        optional = "true"
    )]
    pub signed_attrs: Option<SignedAttributes>,
    pub signature_algorithm: AlgorithmIdentifierOwned,
    pub signature: SignatureValue,
    #[asn1(
        context_specific = "1",
        tag_mode = "IMPLICIT",
        constructed = "true",
        optional = "true"
    )]
    pub unsigned_attrs: Option<UnsignedAttributes>,
}

/// The `SignerInfo` type is defined in [RFC 5652 Section 5.3].
///
/// ```text
/// SignedAttributes ::= SET SIZE (1..MAX) OF Attribute
/// ```
///
/// [RFC 5652 Section 5.3]: https://datatracker.ietf.org/doc/html/rfc5652#section-5.3
pub type SignedAttributes = Attributes;

/// The `SignerIdentifier` type is defined in [RFC 5652 Section 5.3].
///
/// ```text
/// SignerIdentifier ::= CHOICE {
///   issuerAndSerialNumber IssuerAndSerialNumber,
///   subjectKeyIdentifier \[0\] SubjectKeyIdentifier }
/// ```
///
/// [RFC 5652 Section 5.3]: https://datatracker.ietf.org/doc/html/rfc5652#section-5.3
#[derive(Clone, Debug, Eq, PartialEq, Choice)]
#[allow(missing_docs)]
pub enum SignerIdentifier {
    IssuerAndSerialNumber(IssuerAndSerialNumber),

    #[asn1(context_specific = "0", tag_mode = "IMPLICIT")]
    SubjectKeyIdentifier(SubjectKeyIdentifier),
}

// TODO DEFER ValueOrd is not supported for CHOICE types (see new_enum in value_ord.rs)
impl ValueOrd for SignerIdentifier {
    fn value_cmp(&self, other: &Self) -> der::Result<Ordering> {
        use der::Encode;
        self.to_der()?.der_cmp(&other.to_der()?)
    }
}

/// The `UnsignedAttributes` type is defined in [RFC 5652 Section 5.3].
///
/// ```text
/// UnsignedAttributes ::= SET SIZE (1..MAX) OF Attribute
/// ```
///
/// [RFC 5652 Section 5.3]: https://datatracker.ietf.org/doc/html/rfc5652#section-5.3
pub type UnsignedAttributes = Attributes;

/// The `SignatureValue` type is defined in [RFC 5652 Section 5.3].
///
/// ```text
///   SignatureValue ::= OCTET STRING
/// ```
///
/// [RFC 5652 Section 5.3]: https://datatracker.ietf.org/doc/html/rfc5652#section-5.3
pub type SignatureValue = OctetString;

#[cfg(feature = "builder")]
mod digest_sign {
    use super::*;
    use crate::algorithms::HashAlgorithm;
    use crate::attributes::{build_attribute_set, Pkcs7Attribute};
    use crate::error::{Error, Result};
    use der::asn1::OctetStringRef;
    use der::Encode;
    use rsa::pkcs1v15::Pkcs1v15Sign;
    use rsa::RsaPrivateKey;
    use signature::hazmat::PrehashSigner;
    use spki::AlgorithmIdentifier;

    fn digest_bytes(alg: HashAlgorithm, data: &[u8]) -> Vec<u8> {
        use sha1::{Digest, Sha1};
        use sha2::{Sha224, Sha256, Sha384, Sha512};
        match alg {
            HashAlgorithm::Sha1 => Sha1::digest(data).to_vec(),
            HashAlgorithm::Sha224 => Sha224::digest(data).to_vec(),
            HashAlgorithm::Sha256 => Sha256::digest(data).to_vec(),
            HashAlgorithm::Sha384 => Sha384::digest(data).to_vec(),
            HashAlgorithm::Sha512 => Sha512::digest(data).to_vec(),
        }
    }

    /// `H(content)`, the bytes that become the MessageDigest attribute's
    /// OCTET STRING value.
    pub fn content_digest(hash_alg: HashAlgorithm, content: &[u8]) -> Vec<u8> {
        digest_bytes(hash_alg, content)
    }

    /// Assemble the three canonical signed attributes (ContentType,
    /// MessageDigest, optionally SigningTime) ahead of any caller-supplied
    /// ones, then the DER-encoded `SET OF Attribute` built from them.
    pub fn build_signed_attributes(
        content_type: ObjectIdentifier,
        message_digest: &[u8],
        signing_time: Option<&str>,
        caller_attrs: &[Pkcs7Attribute],
    ) -> Result<SignedAttributes> {
        use const_oid::db::rfc5911::{ID_CONTENT_TYPE, ID_MESSAGE_DIGEST};

        let mut items = Vec::with_capacity(3 + caller_attrs.len());
        items.push(Pkcs7Attribute::new(ID_CONTENT_TYPE, Any::encode_from(&content_type)?));
        items.push(Pkcs7Attribute::new(
            ID_MESSAGE_DIGEST,
            Any::from(OctetStringRef::new(message_digest)?),
        ));
        if let Some(time) = signing_time {
            const ID_SIGNING_TIME: ObjectIdentifier =
                ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.5");
            let utc = der::asn1::UtcTime::from_unix_duration(core::time::Duration::from_secs(
                time.parse().unwrap_or(0),
            ))?;
            items.push(Pkcs7Attribute::new(ID_SIGNING_TIME, Any::encode_from(&utc)?));
        }
        for attr in caller_attrs {
            items.push(attr.clone());
        }
        Ok(build_attribute_set(&items)?)
    }

    /// The DER bytes actually hashed for signing: the `SET OF Attribute`
    /// encoded under its universal SET tag, not the `[0] IMPLICIT` wire
    /// tag `SignerInfo.signedAttrs` carries on the wire.
    pub fn canonicalize_signed_attrs(attrs: &SignedAttributes) -> der::Result<Vec<u8>> {
        attrs.to_der()
    }

    /// `digestToSign` per the two-step build: the hash of the
    /// canonicalized signed attributes when present, or the content
    /// digest itself when signing without attributes.
    pub fn digest_to_sign(
        hash_alg: HashAlgorithm,
        signed_attrs: Option<&SignedAttributes>,
        content_digest: &[u8],
    ) -> der::Result<Vec<u8>> {
        Ok(match signed_attrs {
            Some(attrs) => digest_bytes(hash_alg, &canonicalize_signed_attrs(attrs)?),
            None => content_digest.to_vec(),
        })
    }

    /// `SEQUENCE { AlgorithmIdentifier(hash, NULL), OCTET STRING digest }`,
    /// the DigestInfo RSA PKCS#1 v1.5 signing wraps around the digest.
    #[derive(Clone, Debug, Sequence)]
    struct DigestInfo<'a> {
        algorithm: AlgorithmIdentifierOwned,
        digest: OctetStringRef<'a>,
    }

    fn hash_algorithm_identifier(hash_alg: HashAlgorithm) -> AlgorithmIdentifierOwned {
        AlgorithmIdentifier {
            oid: hash_alg.oid(),
            parameters: Some(Any::from(der::asn1::Null)),
        }
    }

    /// Sign `digest` with an RSA private key, producing a PKCS#1 v1.5
    /// signature over a manually constructed DigestInfo.
    pub fn rsa_sign(
        key: &RsaPrivateKey,
        hash_alg: HashAlgorithm,
        digest: &[u8],
    ) -> Result<Vec<u8>> {
        let digest_info = DigestInfo {
            algorithm: hash_algorithm_identifier(hash_alg),
            digest: OctetStringRef::new(digest)?,
        };
        let digest_info_der = digest_info.to_der()?;
        let mut rng = rand_core::OsRng;
        key.sign_with_rng(&mut rng, Pkcs1v15Sign::new_unprefixed(), &digest_info_der)
            .map_err(Error::from)
    }

    /// Verify an RSA signature against both candidate digests: the
    /// DigestInfo-wrapped form (`pkcs7Digest`) and the bare digest
    /// (`plainDigest`), per the §4.5 fallback.
    pub fn rsa_verify(
        key: &rsa::RsaPublicKey,
        hash_alg: HashAlgorithm,
        digest: &[u8],
        signature: &[u8],
    ) -> bool {
        let digest_info = DigestInfo {
            algorithm: hash_algorithm_identifier(hash_alg),
            digest: match OctetStringRef::new(digest) {
                Ok(d) => d,
                Err(_) => return false,
            },
        };
        let Ok(pkcs7_digest) = digest_info.to_der() else {
            return false;
        };
        if key
            .verify(Pkcs1v15Sign::new_unprefixed(), &pkcs7_digest, signature)
            .is_ok()
        {
            return true;
        }
        key.verify(Pkcs1v15Sign::new_unprefixed(), digest, signature)
            .is_ok()
    }

    /// Sign a raw digest with ECDSA (no DigestInfo wrapping — CMS
    /// semantics for non-RSA signers).
    pub fn ecdsa_sign_p256(
        key: &p256::ecdsa::SigningKey,
        digest: &[u8],
    ) -> Result<Vec<u8>> {
        let sig: p256::ecdsa::Signature = key
            .sign_prehash(digest)
            .map_err(|_| Error::Crypto("ecdsa sign"))?;
        let der_sig: p256::ecdsa::DerSignature = sig.to_der();
        Ok(der_sig.as_bytes().to_vec())
    }

    /// Verify a raw digest against an ECDSA signature.
    pub fn ecdsa_verify_p256(
        key: &p256::ecdsa::VerifyingKey,
        digest: &[u8],
        signature: &[u8],
    ) -> bool {
        use signature::hazmat::PrehashVerifier;
        let Ok(sig) = p256::ecdsa::Signature::from_der(signature) else {
            return false;
        };
        key.verify_prehash(digest, &sig).is_ok()
    }
}

#[cfg(feature = "builder")]
pub use digest_sign::*;

#[cfg(feature = "builder")]
mod build {
    use super::*;
    use crate::algorithms::{signature_algorithm_oid, HashAlgorithm, PublicKeyAlgorithm};
    use crate::attributes::Pkcs7Attribute;
    use crate::error::{Error, Result};
    use der::{Decode, Encode};
    use x509_cert::Certificate;

    /// The private key material this crate can sign `SignerInfo` with.
    pub enum Signer {
        Rsa(Box<rsa::RsaPrivateKey>),
        Ecdsa(Box<p256::ecdsa::SigningKey>),
    }

    /// Inputs to build a one-signer `SignedData`.
    pub struct SignedDataRequest<'a> {
        pub content: &'a [u8],
        pub content_type: ObjectIdentifier,
        pub hash_alg: HashAlgorithm,
        pub signer: &'a Signer,
        pub sid: SignerIdentifier,
        pub certificates: Vec<CertificateChoices>,
        pub include_attributes: bool,
        pub signing_time: Option<&'a str>,
        pub caller_attrs: &'a [Pkcs7Attribute],
    }

    /// Build a `SignedData` with exactly one `SignerInfo`, hashing the
    /// content and (optionally) the signed attribute set before signing.
    pub fn build_signed_data(req: &SignedDataRequest<'_>) -> Result<SignedData> {
        let content_digest = content_digest(req.hash_alg, req.content);

        let signed_attrs = if req.include_attributes {
            Some(build_signed_attributes(
                req.content_type,
                &content_digest,
                req.signing_time,
                req.caller_attrs,
            )?)
        } else {
            None
        };

        let to_sign = digest_to_sign(req.hash_alg, signed_attrs.as_ref(), &content_digest)?;

        let (signature_oid, signature) = match req.signer {
            Signer::Rsa(key) => {
                let oid = signature_algorithm_oid(PublicKeyAlgorithm::Rsa, req.hash_alg)?;
                (oid, rsa_sign(key, req.hash_alg, &to_sign)?)
            }
            Signer::Ecdsa(key) => {
                let oid = signature_algorithm_oid(PublicKeyAlgorithm::Ecdsa, req.hash_alg)?;
                (oid, ecdsa_sign_p256(key, &to_sign)?)
            }
        };

        let signer_info = SignerInfo {
            version: match &req.sid {
                SignerIdentifier::IssuerAndSerialNumber(_) => CmsVersion::V1,
                SignerIdentifier::SubjectKeyIdentifier(_) => CmsVersion::V3,
            },
            sid: req.sid.clone(),
            digest_alg: AlgorithmIdentifierOwned {
                oid: req.hash_alg.oid(),
                parameters: Some(Any::from(der::asn1::Null)),
            },
            signed_attrs,
            signature_algorithm: AlgorithmIdentifierOwned {
                oid: signature_oid,
                parameters: match req.signer {
                    Signer::Rsa(_) => Some(Any::from(der::asn1::Null)),
                    Signer::Ecdsa(_) => None,
                },
            },
            signature: SignatureValue::new(signature)?,
            unsigned_attrs: None,
        };

        let mut signer_infos = SetOfVec::new();
        signer_infos.insert(signer_info)?;

        let mut digest_algorithms = DigestAlgorithmIdentifiers::new();
        digest_algorithms.insert(AlgorithmIdentifierOwned {
            oid: req.hash_alg.oid(),
            parameters: Some(Any::from(der::asn1::Null)),
        })?;

        let mut certificates = SetOfVec::new();
        for cert in &req.certificates {
            certificates.insert(cert.clone())?;
        }

        Ok(SignedData {
            version: match &req.sid {
                SignerIdentifier::IssuerAndSerialNumber(_) => CmsVersion::V1,
                SignerIdentifier::SubjectKeyIdentifier(_) => CmsVersion::V3,
            },
            digest_algorithms,
            encap_content_info: EncapsulatedContentInfo {
                econtent_type: req.content_type,
                econtent: Some(Any::from(der::asn1::OctetStringRef::new(req.content)?)),
            },
            certificates: if certificates.is_empty() {
                None
            } else {
                Some(CertificateSet(certificates))
            },
            crls: None,
            signer_infos: SignerInfos(signer_infos),
        })
    }

    /// Verify a `SignedData`'s single `SignerInfo` against the content
    /// (or a caller-supplied precomputed digest, for detached mode),
    /// looping over candidate certificates until one verifies.
    pub fn verify_signed_data(
        sd: &SignedData,
        content_or_digest: &[u8],
        content_is_precomputed_digest: bool,
    ) -> Result<()> {
        if sd.signer_infos.0.is_empty() {
            return Err(Error::NoSigner);
        }
        let signer_info = sd
            .signer_infos
            .0
            .iter()
            .next()
            .expect("checked non-empty above");

        let hash_alg = HashAlgorithm::from_oid(&signer_info.digest_alg.oid)?;
        let content_digest = if content_is_precomputed_digest {
            content_or_digest.to_vec()
        } else {
            content_digest(hash_alg, content_or_digest)
        };

        let to_verify = digest_to_sign(hash_alg, signer_info.signed_attrs.as_ref(), &content_digest)?;

        let candidates: Vec<&Certificate> = sd
            .certificates
            .iter()
            .flat_map(|set| set.0.iter())
            .filter_map(|c| c.certificate())
            .collect();

        for cert in candidates {
            let spki = &cert.tbs_certificate.subject_public_key_info;
            let pk_alg = PublicKeyAlgorithm::from_oid(&spki.algorithm.oid)?;
            let verifies = match pk_alg {
                PublicKeyAlgorithm::Rsa => {
                    let Ok(spki_der) = spki.to_der() else {
                        continue;
                    };
                    let Ok(pubkey) =
                        <rsa::RsaPublicKey as rsa::pkcs8::DecodePublicKey>::from_public_key_der(&spki_der)
                    else {
                        continue;
                    };
                    rsa_verify(
                        &pubkey,
                        hash_alg,
                        &to_verify,
                        signer_info.signature.as_bytes(),
                    )
                }
                PublicKeyAlgorithm::Ecdsa => {
                    let Some(bytes) = spki.subject_public_key.as_bytes() else {
                        continue;
                    };
                    let Ok(pubkey) = p256::ecdsa::VerifyingKey::from_sec1_bytes(bytes) else {
                        continue;
                    };
                    ecdsa_verify_p256(&pubkey, &to_verify, signer_info.signature.as_bytes())
                }
            };
            if verifies {
                return Ok(());
            }
        }

        Err(Error::SignatureVerificationFailed)
    }

    /// Decode a `ContentInfo`-wrapped `SignedData`, tolerating the one
    /// BER idiom of an outer indefinite-length SEQUENCE.
    pub fn decode_signed_data(der: &[u8]) -> Result<SignedData> {
        let content_info = crate::content_info::ContentInfo::from_der(der)?;
        if content_info.content_type != const_oid::db::rfc5911::ID_SIGNED_DATA {
            return Err(Error::Pkcs7Oid);
        }
        let inner = content_info.content.to_der()?;
        let sd = SignedData::from_der(&inner)?;

        let mut expected_sd_version = CmsVersion::V1;
        for signer_info in sd.signer_infos.0.iter() {
            let version_ok = match &signer_info.sid {
                SignerIdentifier::IssuerAndSerialNumber(_) => signer_info.version == CmsVersion::V1,
                SignerIdentifier::SubjectKeyIdentifier(_) => signer_info.version == CmsVersion::V3,
            };
            if !version_ok {
                return Err(Error::AsnVersion("SignerInfo"));
            }
            if signer_info.version == CmsVersion::V3 {
                expected_sd_version = CmsVersion::V3;
            }
        }
        if sd.version != expected_sd_version {
            return Err(Error::AsnVersion("SignedData"));
        }
        Ok(sd)
    }
}

#[cfg(feature = "builder")]
pub use build::*;

#[cfg(all(test, feature = "builder"))]
mod tests {
    use super::*;
    use crate::algorithms::HashAlgorithm;

    #[test]
    fn canonicalization_law_hashes_universal_set_tag() {
        let digest = content_digest(HashAlgorithm::Sha256, b"hello");
        let attrs = build_signed_attributes(
            const_oid::db::rfc5911::ID_DATA,
            &digest,
            None,
            &[],
        )
        .unwrap();

        let canonical = canonicalize_signed_attrs(&attrs).unwrap();
        // a SET OF tag is universal class 0x31; the wire [0] IMPLICIT tag
        // used inside SignerInfo would instead start with 0xA0.
        assert_eq!(canonical[0], 0x31);

        let expect = digest_bytes_for_test(HashAlgorithm::Sha256, &canonical);
        assert_eq!(
            digest_to_sign(HashAlgorithm::Sha256, Some(&attrs), &digest).unwrap(),
            expect
        );
    }

    fn digest_bytes_for_test(alg: HashAlgorithm, data: &[u8]) -> Vec<u8> {
        use sha2::{Digest, Sha256};
        match alg {
            HashAlgorithm::Sha256 => Sha256::digest(data).to_vec(),
            _ => unreachable!(),
        }
    }

    #[test]
    fn digest_to_sign_without_attrs_is_content_digest() {
        let digest = content_digest(HashAlgorithm::Sha256, b"hello");
        assert_eq!(
            digest_to_sign(HashAlgorithm::Sha256, None, &digest).unwrap(),
            digest
        );
    }
}
