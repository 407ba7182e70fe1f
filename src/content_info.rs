//! ContentInfo types

use crate::cert::CertificateChoices;
use crate::revocation::RevocationInfoChoices;
use crate::signed_data::EncapsulatedContentInfo;
use crate::signed_data::{CertificateSet, SignedData, SignerInfos};
use core::cmp::Ordering;
use der::asn1::SetOfVec;
use der::Encode;
use der::{asn1::ObjectIdentifier, Any, AnyRef, Enumerated, Sequence, Tag, ValueOrd};
use x509_cert::{Certificate, PkiPath};

/// The `OtherCertificateFormat` type is defined in [RFC 5652 Section 10.2.5].
///
/// ```text
///  CMSVersion ::= INTEGER  { v0(0), v1(1), v2(2), v3(3), v4(4), v5(5) }
/// ```
///
/// [RFC 5652 Section 10.2.5]: https://www.rfc-editor.org/rfc/rfc5652#section-10.2.5
#[derive(Clone, Debug, Copy, PartialEq, Eq, PartialOrd, Ord, Enumerated)]
#[asn1(type = "INTEGER")]
#[repr(u8)]
#[allow(missing_docs)]
pub enum CmsVersion {
    V0 = 0,
    V1 = 1,
    V2 = 2,
    V3 = 3,
    V4 = 4,
    V5 = 5,
}

impl ValueOrd for CmsVersion {
    fn value_cmp(&self, other: &Self) -> der::Result<Ordering> {
        (*self as u8).value_cmp(&(*other as u8))
    }
}

/// The `ContentInfo` type is defined in [RFC 5652 Section 3].
///
/// ```text
///   ContentInfo ::= SEQUENCE {
///       contentType        CONTENT-TYPE.
///                       &id({ContentSet}),
///       content            [0] EXPLICIT CONTENT-TYPE.
///                       &Type({ContentSet}{@contentType})}
/// ```
///
/// [RFC 5652 Section 3]: https://www.rfc-editor.org/rfc/rfc5652#section-3
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
#[allow(missing_docs)]
pub struct ContentInfo {
    pub content_type: ObjectIdentifier,
    #[asn1(context_specific = "0", tag_mode = "EXPLICIT", constructed = "true")]
    pub content: Any,
}

/// Convert a Certificate to a certs-only SignedData message
impl TryFrom<Certificate> for ContentInfo {
    type Error = der::Error;

    fn try_from(cert: Certificate) -> der::Result<Self> {
        let mut certs = CertificateSet(Default::default());
        certs.0.insert(CertificateChoices::Certificate(cert))?;

        // include empty CRLs field instead of omitting it to match OpenSSL's behavior
        let sd = SignedData {
            version: CmsVersion::V1,
            digest_algorithms: SetOfVec::default(),
            encap_content_info: EncapsulatedContentInfo {
                econtent_type: const_oid::db::rfc5911::ID_DATA,
                econtent: None,
            },
            certificates: Some(certs),
            crls: Some(RevocationInfoChoices(Default::default())),
            signer_infos: SignerInfos(Default::default()),
        };

        let signed_data = sd.to_der()?;
        let content = AnyRef::try_from(signed_data.as_slice())?;

        Ok(ContentInfo {
            content_type: const_oid::db::rfc5911::ID_SIGNED_DATA,
            content: Any::from(content),
        })
    }
}

/// The content-type registry: a closed, bidirectional mapping between
/// the nine absolute OIDs this crate knows about and an internal variant
/// tag. Six of these are content types this crate's encoders and
/// decoders handle end to end; the remaining three (`Pkcs7`,
/// `SignedAndEnvelopedData`, `DigestedData`, `FirmwarePkgData`) are
/// registered but reserved — no encoder or decoder materializes them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum ContentType {
    Pkcs7,
    Data,
    SignedData,
    EnvelopedData,
    SignedAndEnvelopedData,
    DigestedData,
    EncryptedData,
    CompressedData,
    FirmwarePkgData,
}

/// `1.2.840.113549.1.7`, the bare PKCS#7 arc; not itself a registered
/// content type in `const-oid`'s database.
const ID_PKCS7: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.7");

impl ContentType {
    /// The `OBJECT IDENTIFIER` this content type is encoded under.
    pub const fn oid(self) -> ObjectIdentifier {
        use const_oid::db::rfc5911 as rfc5911;
        use const_oid::db::rfc6268 as rfc6268;
        match self {
            ContentType::Pkcs7 => ID_PKCS7,
            ContentType::Data => rfc5911::ID_DATA,
            ContentType::SignedData => rfc5911::ID_SIGNED_DATA,
            ContentType::EnvelopedData => rfc5911::ID_ENVELOPED_DATA,
            ContentType::SignedAndEnvelopedData => {
                ObjectIdentifier::new_unwrap("1.2.840.113549.1.7.4")
            }
            ContentType::DigestedData => rfc5911::ID_DIGESTED_DATA,
            ContentType::EncryptedData => rfc5911::ID_ENCRYPTED_DATA,
            ContentType::CompressedData => rfc6268::ID_CT_COMPRESSED_DATA,
            ContentType::FirmwarePkgData => rfc5911::ID_CT_FIRMWARE_PACKAGE,
        }
    }

    /// Resolve an inbound content-type OID to its registry entry.
    /// Unknown OIDs are fatal.
    pub fn from_oid(oid: &ObjectIdentifier) -> der::Result<Self> {
        for ct in [
            ContentType::Pkcs7,
            ContentType::Data,
            ContentType::SignedData,
            ContentType::EnvelopedData,
            ContentType::SignedAndEnvelopedData,
            ContentType::DigestedData,
            ContentType::EncryptedData,
            ContentType::CompressedData,
            ContentType::FirmwarePkgData,
        ] {
            if ct.oid() == *oid {
                return Ok(ct);
            }
        }
        Err(Tag::ObjectIdentifier.value_error())
    }
}

/// Convert a vector of Certificates to a certs-only SignedData message
impl TryFrom<PkiPath> for ContentInfo {
    type Error = der::Error;

    fn try_from(pki_path: PkiPath) -> der::Result<Self> {
        let mut certs = CertificateSet(Default::default());
        for cert in pki_path {
            certs.0.insert(CertificateChoices::Certificate(cert))?;
        }

        // include empty CRLs field instead of omitting it to match OpenSSL's behavior
        let sd = SignedData {
            version: CmsVersion::V1,
            digest_algorithms: SetOfVec::default(),
            encap_content_info: EncapsulatedContentInfo {
                econtent_type: const_oid::db::rfc5911::ID_DATA,
                econtent: None,
            },
            certificates: Some(certs),
            crls: Some(RevocationInfoChoices(Default::default())),
            signer_infos: SignerInfos(Default::default()),
        };

        let signed_data = sd.to_der()?;
        let content = AnyRef::try_from(signed_data.as_slice())?;

        Ok(ContentInfo {
            content_type: const_oid::db::rfc5911::ID_SIGNED_DATA,
            content: Any::from(content),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_registry_roundtrip() {
        for ct in [
            ContentType::Pkcs7,
            ContentType::Data,
            ContentType::SignedData,
            ContentType::EnvelopedData,
            ContentType::SignedAndEnvelopedData,
            ContentType::DigestedData,
            ContentType::EncryptedData,
            ContentType::CompressedData,
            ContentType::FirmwarePkgData,
        ] {
            assert_eq!(ContentType::from_oid(&ct.oid()).unwrap(), ct);
        }
    }

    #[test]
    fn unknown_content_type_is_fatal() {
        let bogus = ObjectIdentifier::new_unwrap("1.2.3.4.5.6");
        assert!(ContentType::from_oid(&bogus).is_err());
    }

    #[test]
    fn content_type_literal_oids_are_stable() {
        assert_eq!(ContentType::Data.oid().to_string(), "1.2.840.113549.1.7.1");
        assert_eq!(
            ContentType::SignedData.oid().to_string(),
            "1.2.840.113549.1.7.2"
        );
        assert_eq!(
            ContentType::EnvelopedData.oid().to_string(),
            "1.2.840.113549.1.7.3"
        );
        assert_eq!(
            ContentType::EncryptedData.oid().to_string(),
            "1.2.840.113549.1.7.6"
        );
        assert_eq!(
            ContentType::CompressedData.oid().to_string(),
            "1.2.840.113549.1.9.16.1.9"
        );
        assert_eq!(
            ContentType::FirmwarePkgData.oid().to_string(),
            "1.2.840.113549.1.9.16.1.16"
        );
    }
}
