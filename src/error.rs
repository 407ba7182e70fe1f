//! Error taxonomy for the message processor.
//!
//! Mirrors the error families a PKCS#7/CMS implementation has to
//! distinguish between: malformed input, arguments that violate a stated
//! precondition, algorithms the registry doesn't know, and failures
//! surfaced by the underlying primitives.

use core::fmt;

/// Result alias used throughout this crate.
pub type Result<T> = core::result::Result<T, Error>;

/// Errors produced while encoding or decoding a CMS message.
#[derive(Debug)]
#[non_exhaustive]
pub enum Error {
    /// A caller-supplied argument violates a documented precondition:
    /// a null/empty required input, a size mismatch, or an out-of-range
    /// enum selector.
    ArgumentError(&'static str),

    /// A named output buffer was insufficient. The library never
    /// partially writes on this path.
    BufferTooSmall,

    /// DER/BER structure did not parse as expected.
    AsnParse(der::Error),

    /// A CMSVersion field held a value the decoder doesn't accept for
    /// the context it appeared in.
    AsnVersion(&'static str),

    /// A decoded ASN.1 structure was missing a field this decoder treats
    /// as mandatory.
    AsnExpect0(&'static str),

    /// A BER indefinite-length construct appeared somewhere other than
    /// the one outer-SEQUENCE idiom this decoder tolerates.
    BerIndefinite,

    /// The outer ContentInfo's contentType OID did not match the
    /// variant the caller asked to decode.
    Pkcs7Oid,

    /// The content-type OID is not one of the seven registered types.
    UnknownContentType,

    /// An algorithm OID is not present in the algorithm registry.
    UnsupportedAlgorithm,

    /// A signer's (public-key algorithm, hash algorithm) pair has no
    /// entry in the signature-algorithm table.
    UnsupportedSignatureKey,

    /// A key-wrap algorithm OID has no registry entry.
    UnsupportedKeyWrap,

    /// A key-agreement KDF scheme OID has no registry entry.
    UnsupportedKdf,

    /// Signature verification failed against every candidate certificate
    /// and every fallback digest form.
    SignatureVerificationFailed,

    /// A primitive (hash, RSA, ECDSA, cipher) reported failure.
    Crypto(&'static str),

    /// Degenerate SignedData (no signers) was decoded while the Session
    /// forbids it, or a non-degenerate message carried zero signers.
    NoSigner,

    /// No RecipientInfo in an EnvelopedData matched the Session's
    /// configured certificate/key.
    NoMatchingRecipient,

    /// A SignerInfo's `sid` choice didn't resolve to a usable
    /// certificate/version pairing.
    BadSignerIdentifier,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::ArgumentError(msg) => write!(f, "bad function argument: {msg}"),
            Error::BufferTooSmall => write!(f, "output buffer too small"),
            Error::AsnParse(e) => write!(f, "ASN.1 parse error: {e}"),
            Error::AsnVersion(ctx) => write!(f, "unexpected CMSVersion in {ctx}"),
            Error::AsnExpect0(field) => write!(f, "missing required field: {field}"),
            Error::BerIndefinite => write!(f, "unsupported BER indefinite-length construct"),
            Error::Pkcs7Oid => write!(f, "ContentInfo contentType did not match expected variant"),
            Error::UnknownContentType => write!(f, "unknown PKCS#7/CMS content type OID"),
            Error::UnsupportedAlgorithm => write!(f, "unsupported algorithm OID"),
            Error::UnsupportedSignatureKey => write!(f, "unsupported signature key/hash pairing"),
            Error::UnsupportedKeyWrap => write!(f, "unsupported key wrap algorithm"),
            Error::UnsupportedKdf => write!(f, "unsupported key agreement KDF"),
            Error::SignatureVerificationFailed => write!(f, "signature verification failed"),
            Error::Crypto(msg) => write!(f, "cryptographic primitive error: {msg}"),
            Error::NoSigner => write!(f, "no signer present and degenerate form not allowed"),
            Error::NoMatchingRecipient => write!(f, "no RecipientInfo matched the configured identity"),
            Error::BadSignerIdentifier => write!(f, "invalid or unsupported SignerIdentifier"),
        }
    }
}

impl std::error::Error for Error {}

impl From<der::Error> for Error {
    fn from(e: der::Error) -> Self {
        Error::AsnParse(e)
    }
}

#[cfg(feature = "builder")]
impl From<rsa::Error> for Error {
    fn from(_: rsa::Error) -> Self {
        Error::Crypto("rsa")
    }
}

#[cfg(feature = "builder")]
impl From<signature::Error> for Error {
    fn from(_: signature::Error) -> Self {
        Error::Crypto("signature")
    }
}
