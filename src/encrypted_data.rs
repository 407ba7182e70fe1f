//! `EncryptedData`: a symmetric envelope without a recipient layer
//! (RFC 5652 §8).

use crate::algorithms::ContentEncryptionAlgorithm;
use crate::attributes::{build_attribute_set, Pkcs7Attribute};
use crate::content_encryption::{cbc_decrypt, cbc_encrypt, generate_iv, pad_data, unpad_data};
use crate::content_info::CmsVersion;
use crate::enveloped_data::EncryptedContentInfo;
use crate::error::{Error, Result};
use der::asn1::{ObjectIdentifier, OctetString, OctetStringRef};
use der::{Any, Sequence};
use spki::AlgorithmIdentifierOwned;
use x509_cert::attr::Attributes;

/// `EncryptedData ::= SEQUENCE { version, encryptedContentInfo,
/// unprotectedAttrs [1] IMPLICIT SET OF Attribute OPTIONAL }`.
///
/// Version tracks whether unprotected attributes are present: the
/// decoder re-validates `(attrs.is_empty() && version == V0) ||
/// (!attrs.is_empty() && version == V2)`.
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct EncryptedData {
    pub version: CmsVersion,
    pub encrypted_content_info: EncryptedContentInfo,
    #[asn1(
        context_specific = "1",
        tag_mode = "IMPLICIT",
        constructed = "true",
        optional = "true"
    )]
    pub unprotected_attrs: Option<Attributes>,
}

/// Build an `EncryptedData` message with the given symmetric CEK and no
/// recipient layer.
pub fn build_encrypted_data(
    content_type: ObjectIdentifier,
    content_enc_alg: ContentEncryptionAlgorithm,
    cek: &[u8],
    content: &[u8],
    unprotected_attrs: &[Pkcs7Attribute],
    rng: &mut impl rand_core::CryptoRngCore,
) -> Result<EncryptedData> {
    if cek.len() != content_enc_alg.key_size() {
        return Err(Error::ArgumentError("CEK length does not match algorithm"));
    }
    let iv = generate_iv(content_enc_alg, rng);
    let mut padded = content.to_vec();
    pad_data(&mut padded, content_enc_alg.block_size());
    cbc_encrypt(content_enc_alg, cek, &iv, &mut padded)?;

    let attrs = if unprotected_attrs.is_empty() {
        None
    } else {
        Some(build_attribute_set(unprotected_attrs)?)
    };

    Ok(EncryptedData {
        version: if attrs.is_some() { CmsVersion::V2 } else { CmsVersion::V0 },
        encrypted_content_info: EncryptedContentInfo {
            content_type,
            content_encryption_algorithm: AlgorithmIdentifierOwned {
                oid: content_enc_alg.oid(),
                parameters: Some(Any::from(OctetStringRef::new(&iv)?)),
            },
            encrypted_content: Some(OctetString::new(padded)?),
        },
        unprotected_attrs: attrs,
    })
}

/// Decrypt an `EncryptedData` message with the given symmetric CEK,
/// re-validating the version/attributes consistency invariant.
pub fn decrypt_encrypted_data(encrypted: &EncryptedData, cek: &[u8]) -> Result<Vec<u8>> {
    let has_attrs = encrypted.unprotected_attrs.is_some();
    let version_ok = matches!(
        (has_attrs, encrypted.version),
        (false, CmsVersion::V0) | (true, CmsVersion::V2)
    );
    if !version_ok {
        return Err(Error::AsnVersion("EncryptedData"));
    }

    let eci = &encrypted.encrypted_content_info;
    let alg = ContentEncryptionAlgorithm::from_oid(&eci.content_encryption_algorithm.oid)?;
    let iv_any = eci
        .content_encryption_algorithm
        .parameters
        .as_ref()
        .ok_or(Error::ArgumentError("missing content-encryption IV"))?;
    let iv: OctetStringRef<'_> = iv_any.decode_as()?;
    if iv.as_bytes().len() != alg.block_size() {
        return Err(Error::ArgumentError("IV length mismatch"));
    }
    let mut buf = eci
        .encrypted_content
        .as_ref()
        .ok_or(Error::ArgumentError("missing encrypted content"))?
        .as_bytes()
        .to_vec();
    cbc_decrypt(alg, cek, iv.as_bytes(), &mut buf)?;
    Ok(unpad_data(&buf, alg.block_size())?.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_without_attributes_uses_version_0() {
        let mut rng = rand::thread_rng();
        let cek = [0x7fu8; 16];
        let encrypted = build_encrypted_data(
            const_oid::db::rfc5911::ID_DATA,
            ContentEncryptionAlgorithm::Aes128Cbc,
            &cek,
            b"top secret",
            &[],
            &mut rng,
        )
        .unwrap();
        assert_eq!(encrypted.version, CmsVersion::V0);
        let decrypted = decrypt_encrypted_data(&encrypted, &cek).unwrap();
        assert_eq!(decrypted, b"top secret");
    }

    #[test]
    fn round_trip_with_attributes_uses_version_2() {
        use der::asn1::OctetStringRef;
        let mut rng = rand::thread_rng();
        let cek = [0x7fu8; 16];
        let attr = Pkcs7Attribute::new(
            const_oid::db::rfc5911::ID_CONTENT_TYPE,
            der::Any::from(OctetStringRef::new(b"x").unwrap()),
        );
        let encrypted = build_encrypted_data(
            const_oid::db::rfc5911::ID_DATA,
            ContentEncryptionAlgorithm::Aes128Cbc,
            &cek,
            b"top secret",
            &[attr],
            &mut rng,
        )
        .unwrap();
        assert_eq!(encrypted.version, CmsVersion::V2);
        let decrypted = decrypt_encrypted_data(&encrypted, &cek).unwrap();
        assert_eq!(decrypted, b"top secret");
    }
}
