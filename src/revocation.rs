//! Revocation info pass-through for `SignedData`'s `[1] IMPLICIT crls` field.
//!
//! CRLs carried alongside a `SignedData` are parsed structurally and
//! otherwise ignored — no validation, no semantic use. `x509-cert::crl`
//! already does the structural CRL decode; the `other` arm is kept fully
//! opaque since nothing here ever constructs one.

use der::asn1::{Any, SetOfVec};
use der::{Choice, DerOrd, Sequence, ValueOrd};
use x509_cert::crl::CertificateList;

/// The `OtherRevocationInfoFormat` type is defined in [RFC 5652 Section 10.2.1].
///
/// ```text
///   OtherRevocationInfoFormat ::= SEQUENCE {
///       otherRevInfoFormat OBJECT IDENTIFIER,
///       otherRevInfo ANY DEFINED BY otherRevInfoFormat }
/// ```
///
/// [RFC 5652 Section 10.2.1]: https://www.rfc-editor.org/rfc/rfc5652#section-10.2.1
#[derive(Clone, Debug, Eq, PartialEq, Sequence, ValueOrd)]
#[allow(missing_docs)]
pub struct OtherRevocationInfoFormat {
    pub other_rev_info_format: der::asn1::ObjectIdentifier,
    pub other_rev_info: Any,
}

/// The `RevocationInfoChoice` type is defined in [RFC 5652 Section 10.2.1].
///
/// ```text
///   RevocationInfoChoice ::= CHOICE {
///       crl CertificateList,
///       other [1] IMPLICIT OtherRevocationInfoFormat }
/// ```
///
/// [RFC 5652 Section 10.2.1]: https://www.rfc-editor.org/rfc/rfc5652#section-10.2.1
#[derive(Clone, Debug, Eq, PartialEq, Choice)]
#[allow(missing_docs)]
pub enum RevocationInfoChoice {
    Crl(CertificateList),

    #[asn1(context_specific = "1", tag_mode = "IMPLICIT", constructed = "true")]
    Other(OtherRevocationInfoFormat),
}

impl ValueOrd for RevocationInfoChoice {
    fn value_cmp(&self, other: &Self) -> der::Result<core::cmp::Ordering> {
        use der::Encode;
        self.to_der()?.der_cmp(&other.to_der()?)
    }
}

/// `RevocationInfoChoices ::= SET OF RevocationInfoChoice`
///
/// [RFC 5652 Section 10.2.1]: https://www.rfc-editor.org/rfc/rfc5652#section-10.2.1
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RevocationInfoChoices(pub SetOfVec<RevocationInfoChoice>);
x509_cert::impl_newtype!(RevocationInfoChoices, SetOfVec<RevocationInfoChoice>);
