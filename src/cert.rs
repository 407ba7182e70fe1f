//! Certificate-related CHOICE types used by `SignedData`.
//!
//! Certificate decoding itself is an external collaborator (`x509-cert`);
//! this module only wires its `Certificate` type into the CMS
//! `CertificateChoices` CHOICE and provides `IssuerAndSerialNumber`, the
//! structural signer/recipient identifier used throughout §4.3–§4.7.

use der::asn1::Any;
use der::{Choice, DerOrd, Sequence, ValueOrd};
use x509_cert::serial_number::SerialNumber;
use x509_cert::{name::Name, Certificate};

/// The `IssuerAndSerialNumber` type is defined in [RFC 5652 Section 10.2.4].
///
/// ```text
///   IssuerAndSerialNumber ::= SEQUENCE {
///       issuer Name,
///       serialNumber CertificateSerialNumber }
/// ```
///
/// [RFC 5652 Section 10.2.4]: https://www.rfc-editor.org/rfc/rfc5652#section-10.2.4
#[derive(Clone, Debug, Eq, PartialEq, Sequence, ValueOrd)]
#[allow(missing_docs)]
pub struct IssuerAndSerialNumber {
    pub issuer: Name,
    pub serial_number: SerialNumber,
}

/// The `OtherCertificateFormat` type is defined in [RFC 5652 Section 10.2.5].
///
/// ```text
///   OtherCertificateFormat ::= SEQUENCE {
///       otherCertFormat OBJECT IDENTIFIER,
///       otherCert ANY DEFINED BY otherCertFormat }
/// ```
///
/// [RFC 5652 Section 10.2.5]: https://www.rfc-editor.org/rfc/rfc5652#section-10.2.5
#[derive(Clone, Debug, Eq, PartialEq, Sequence, ValueOrd)]
#[allow(missing_docs)]
pub struct OtherCertificateFormat {
    pub other_cert_format: der::asn1::ObjectIdentifier,
    pub other_cert: Any,
}

/// The `CertificateChoices` type is defined in [RFC 5652 Section 10.2.2].
///
/// Attribute certificates (`v1AttrCert`/`v2AttrCert`) and the obsolete
/// `extendedCertificate` form are retained only as opaque bytes: this
/// crate does no certificate path validation or attribute-certificate
/// semantics. The first `certificate` variant found in a decoded
/// `CertificateSet` is what the signed-data decoder treats as the
/// candidate signer certificate.
///
/// ```text
///   CertificateChoices ::= CHOICE {
///       certificate Certificate,
///       extendedCertificate [0] IMPLICIT ExtendedCertificate, -- Obsolete
///       v1AttrCert [1] IMPLICIT AttributeCertificateV1,       -- Obsolete
///       v2AttrCert [2] IMPLICIT AttributeCertificateV2,
///       other [3] IMPLICIT OtherCertificateFormat }
/// ```
///
/// [RFC 5652 Section 10.2.2]: https://www.rfc-editor.org/rfc/rfc5652#section-10.2.2
#[derive(Clone, Debug, Eq, PartialEq, Choice)]
#[allow(missing_docs)]
pub enum CertificateChoices {
    Certificate(Certificate),

    #[asn1(context_specific = "0", tag_mode = "IMPLICIT", constructed = "true")]
    ExtendedCertificate(Any),

    #[asn1(context_specific = "1", tag_mode = "IMPLICIT", constructed = "true")]
    V1AttrCert(Any),

    #[asn1(context_specific = "2", tag_mode = "IMPLICIT", constructed = "true")]
    V2AttrCert(Any),

    #[asn1(context_specific = "3", tag_mode = "IMPLICIT", constructed = "true")]
    Other(OtherCertificateFormat),
}

impl ValueOrd for CertificateChoices {
    fn value_cmp(&self, other: &Self) -> der::Result<core::cmp::Ordering> {
        use der::Encode;
        self.to_der()?.der_cmp(&other.to_der()?)
    }
}

impl CertificateChoices {
    /// The plain `certificate` variant, if this choice holds one.
    pub fn certificate(&self) -> Option<&Certificate> {
        match self {
            CertificateChoices::Certificate(cert) => Some(cert),
            _ => None,
        }
    }
}

impl From<Certificate> for CertificateChoices {
    fn from(cert: Certificate) -> Self {
        CertificateChoices::Certificate(cert)
    }
}
