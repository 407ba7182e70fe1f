#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![cfg_attr(not(feature = "std"), no_std)]

//! Pure Rust implementation of the Cryptographic Message Syntax (CMS),
//! a superset of PKCS#7 (RFC 5652 / RFC 2315): SignedData, EnvelopedData,
//! EncryptedData, CompressedData, and the plain Data content type, plus
//! degenerate (certificate-only) SignedData.
//!
//! The [`Session`][session::Session] type is the orchestration surface:
//! populate it with a certificate, key material, and content, then call
//! exactly one encode or decode entry point.

extern crate alloc;

pub mod algorithms;
pub mod attributes;
pub mod cert;
pub mod content_info;
pub mod error;
pub mod revocation;
pub mod signed_data;

#[cfg(feature = "builder")]
pub mod compressed_data;
#[cfg(feature = "builder")]
pub mod content_encryption;
#[cfg(feature = "builder")]
pub mod encrypted_data;
#[cfg(feature = "builder")]
pub mod enveloped_data;
#[cfg(feature = "builder")]
pub mod kari;
#[cfg(feature = "builder")]
pub mod session;

pub use content_info::{CmsVersion, ContentInfo, ContentType};
pub use error::{Error, Result};

#[cfg(feature = "builder")]
pub use session::Session;
