//! `EnvelopedData`: recipient-keyed content encryption (RFC 5652 §6).

use crate::algorithms::ContentEncryptionAlgorithm;
use crate::cert::IssuerAndSerialNumber;
use crate::content_encryption::{cbc_decrypt, cbc_encrypt, generate_cek, generate_iv, pad_data, unpad_data};
use crate::content_info::CmsVersion;
use crate::error::{Error, Result};
use crate::kari::KeyAgreeRecipientInfo;
use der::asn1::{ObjectIdentifier, OctetString, OctetStringRef, SetOfVec};
use der::{Any, Choice, DecodeValue, DerOrd, Encode, EncodeValue, Header, Length, Reader, Sequence, Tag, TagNumber, ValueOrd, Writer};
use spki::AlgorithmIdentifierOwned;
use x509_cert::ext::pkix::SubjectKeyIdentifier;
use zeroize::Zeroizing;

/// `RecipientIdentifier ::= CHOICE { issuerAndSerialNumber, subjectKeyIdentifier [0] IMPLICIT }`
#[derive(Clone, Debug, Eq, PartialEq, Choice)]
pub enum RecipientIdentifier {
    IssuerAndSerialNumber(IssuerAndSerialNumber),

    #[asn1(context_specific = "0", tag_mode = "IMPLICIT")]
    SubjectKeyIdentifier(SubjectKeyIdentifier),
}

impl ValueOrd for RecipientIdentifier {
    fn value_cmp(&self, other: &Self) -> der::Result<core::cmp::Ordering> {
        self.to_der()?.der_cmp(&other.to_der()?)
    }
}

/// `KeyTransRecipientInfo ::= SEQUENCE { version, rid, keyEncryptionAlgorithm, encryptedKey }`
#[derive(Clone, Debug, Eq, PartialEq, Sequence, ValueOrd)]
pub struct KeyTransRecipientInfo {
    pub version: CmsVersion,
    pub rid: RecipientIdentifier,
    pub key_encryption_algorithm: AlgorithmIdentifierOwned,
    pub encrypted_key: OctetString,
}

/// `RecipientInfo ::= CHOICE { ktri KeyTransRecipientInfo, kari [1] IMPLICIT KeyAgreeRecipientInfo }`
#[derive(Clone, Debug, Eq, PartialEq, Choice)]
pub enum RecipientInfo {
    Ktri(KeyTransRecipientInfo),

    #[asn1(context_specific = "1", tag_mode = "IMPLICIT", constructed = "true")]
    Kari(KeyAgreeRecipientInfo),
}

impl ValueOrd for RecipientInfo {
    fn value_cmp(&self, other: &Self) -> der::Result<core::cmp::Ordering> {
        self.to_der()?.der_cmp(&other.to_der()?)
    }
}

/// `RecipientInfos ::= SET SIZE (1..MAX) OF RecipientInfo`
pub type RecipientInfos = SetOfVec<RecipientInfo>;

/// `EncryptedContentInfo ::= SEQUENCE { contentType, contentEncryptionAlgorithm,
/// encryptedContent [0] IMPLICIT OCTET STRING OPTIONAL }`.
///
/// Hand-rolled `DecodeValue`/`EncodeValue` because the decoder must accept
/// both wire shapes for `encryptedContent`: `[0]` PRIMITIVE (what this
/// crate emits) and `[0]` CONSTRUCTED wrapping an inner universal
/// OCTET STRING, distinguished by the constructed bit on the tag octet.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EncryptedContentInfo {
    pub content_type: ObjectIdentifier,
    pub content_encryption_algorithm: AlgorithmIdentifierOwned,
    pub encrypted_content: Option<OctetString>,
}

impl<'a> DecodeValue<'a> for EncryptedContentInfo {
    fn decode_value<R: Reader<'a>>(reader: &mut R, header: Header) -> der::Result<Self> {
        reader.read_nested(header.length, |reader| {
            let content_type = reader.decode()?;
            let content_encryption_algorithm = reader.decode()?;

            let encrypted_content = if reader.peek_tag().is_ok() {
                let peeked = reader.peek_header()?;
                if peeked.tag
                    == (Tag::ContextSpecific {
                        number: TagNumber::N0,
                        constructed: false,
                    })
                {
                    let cs = der::asn1::ContextSpecific::<OctetStringRef<'_>>::decode_implicit(
                        reader,
                        TagNumber::N0,
                    )?;
                    cs.map(|v| OctetString::new(v.value.as_bytes().to_vec()))
                        .transpose()?
                } else if peeked.tag
                    == (Tag::ContextSpecific {
                        number: TagNumber::N0,
                        constructed: true,
                    })
                {
                    let header = reader.decode::<Header>()?;
                    let inner_len: usize = header.length.try_into()?;
                    let inner: OctetStringRef<'_> = reader.read_nested(Length::try_from(inner_len)?, |r| r.decode())?;
                    Some(OctetString::new(inner.as_bytes().to_vec())?)
                } else {
                    None
                }
            } else {
                None
            };

            Ok(Self {
                content_type,
                content_encryption_algorithm,
                encrypted_content,
            })
        })
    }
}

impl EncodeValue for EncryptedContentInfo {
    fn value_len(&self) -> der::Result<Length> {
        [
            self.content_type.encoded_len()?,
            self.content_encryption_algorithm.encoded_len()?,
            self.encrypted_content
                .as_ref()
                .map(|field| der::asn1::ContextSpecificRef {
                    tag_number: TagNumber::N0,
                    tag_mode: der::TagMode::Implicit,
                    value: field,
                })
                .encoded_len()?,
        ]
        .into_iter()
        .try_fold(Length::ZERO, |acc, len| acc + len)
    }

    fn encode_value(&self, writer: &mut impl Writer) -> der::Result<()> {
        self.content_type.encode(writer)?;
        self.content_encryption_algorithm.encode(writer)?;
        self.encrypted_content
            .as_ref()
            .map(|field| der::asn1::ContextSpecificRef {
                tag_number: TagNumber::N0,
                tag_mode: der::TagMode::Implicit,
                value: field,
            })
            .encode(writer)?;
        Ok(())
    }
}

impl<'a> Sequence<'a> for EncryptedContentInfo {}

/// `EnvelopedData ::= SEQUENCE { version, recipientInfos, encryptedContentInfo }`
/// (originatorInfo and unprotectedAttrs are out of scope for this core).
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct EnvelopedData {
    pub version: CmsVersion,
    pub recipient_infos: RecipientInfos,
    pub encrypted_content_info: EncryptedContentInfo,
}

/// A single key-transport (RSA) recipient description for encoding.
pub struct KtriRecipient<'a> {
    pub issuer_and_serial: IssuerAndSerialNumber,
    pub public_key: &'a rsa::RsaPublicKey,
}

/// Build an `EnvelopedData` with exactly one KTRI (RSA) recipient.
pub fn build_enveloped_data_ktri(
    content_type: ObjectIdentifier,
    content_enc_alg: ContentEncryptionAlgorithm,
    recipient: &KtriRecipient<'_>,
    content: &[u8],
    rng: &mut impl rand_core::CryptoRngCore,
) -> Result<EnvelopedData> {
    let cek = generate_cek(content_enc_alg, rng);
    let iv = generate_iv(content_enc_alg, rng);

    let mut padded = content.to_vec();
    pad_data(&mut padded, content_enc_alg.block_size());
    cbc_encrypt(content_enc_alg, &cek, &iv, &mut padded)?;

    let encrypted_key = recipient
        .public_key
        .encrypt(rng, rsa::Pkcs1v15Encrypt, &cek)
        .map_err(Error::from)?;

    let ktri = KeyTransRecipientInfo {
        version: CmsVersion::V0,
        rid: RecipientIdentifier::IssuerAndSerialNumber(recipient.issuer_and_serial.clone()),
        key_encryption_algorithm: AlgorithmIdentifierOwned {
            oid: const_oid::db::rfc5912::RSA_ENCRYPTION,
            parameters: Some(Any::from(der::asn1::Null)),
        },
        encrypted_key: OctetString::new(encrypted_key)?,
    };

    let mut recipient_infos = SetOfVec::new();
    recipient_infos.insert(RecipientInfo::Ktri(ktri))?;

    Ok(EnvelopedData {
        version: CmsVersion::V0,
        recipient_infos,
        encrypted_content_info: EncryptedContentInfo {
            content_type,
            content_encryption_algorithm: AlgorithmIdentifierOwned {
                oid: content_enc_alg.oid(),
                parameters: Some(Any::from(OctetStringRef::new(&iv)?)),
            },
            encrypted_content: Some(OctetString::new(padded)?),
        },
    })
}

/// Decrypt an `EnvelopedData` whose matching recipient is a KTRI entry
/// for `our_issuer_and_serial`, using `our_private_key`.
pub fn decrypt_enveloped_data_ktri(
    enveloped: &EnvelopedData,
    our_issuer_and_serial: &IssuerAndSerialNumber,
    our_private_key: &rsa::RsaPrivateKey,
) -> Result<Vec<u8>> {
    let mut cek: Option<Zeroizing<Vec<u8>>> = None;
    for ri in enveloped.recipient_infos.iter() {
        if let RecipientInfo::Ktri(ktri) = ri {
            if let RecipientIdentifier::IssuerAndSerialNumber(rid) = &ktri.rid {
                if rid == our_issuer_and_serial {
                    cek = Some(Zeroizing::new(
                        our_private_key
                            .decrypt(rsa::Pkcs1v15Encrypt, ktri.encrypted_key.as_bytes())
                            .map_err(Error::from)?,
                    ));
                    break;
                }
            }
        }
    }
    let cek = cek.ok_or(Error::NoMatchingRecipient)?;
    decrypt_content(enveloped, &cek)
}

/// Recipient material for an ECDH `KeyAgreeRecipientInfo` build. `rid`
/// carries either identifier form CMS allows for KARI recipients
/// (`IssuerAndSerialNumber` or `SubjectKeyIdentifier`).
pub struct KariRecipient<'a> {
    pub rid: crate::kari::KeyAgreeRecipientIdentifier,
    pub public_key: &'a p256::PublicKey,
}

/// Build an `EnvelopedData` whose sole recipient is keyed by ECDH
/// (`RecipientInfo::Kari`). The ephemeral key pair is generated fresh
/// per call; `ukm`, if present, is folded into the X9.63 KDF's shared
/// info.
#[allow(clippy::too_many_arguments)]
pub fn build_enveloped_data_kari(
    content_type: ObjectIdentifier,
    content_enc_alg: ContentEncryptionAlgorithm,
    kdf_alg: crate::algorithms::KeyAgreementAlgorithm,
    wrap_alg: crate::algorithms::KeyWrapAlgorithm,
    recipient: &KariRecipient<'_>,
    ukm: Option<&[u8]>,
    content: &[u8],
    rng: &mut impl rand_core::CryptoRngCore,
) -> Result<EnvelopedData> {
    let cek = generate_cek(content_enc_alg, rng);
    let iv = generate_iv(content_enc_alg, rng);

    let mut padded = content.to_vec();
    pad_data(&mut padded, content_enc_alg.block_size());
    cbc_encrypt(content_enc_alg, &cek, &iv, &mut padded)?;

    let ephemeral_private_key = p256::SecretKey::random(rng);
    let ephemeral_public_key = ephemeral_private_key.public_key();
    let encrypted_key = crate::kari::wrap_cek(
        &ephemeral_private_key,
        recipient.public_key,
        kdf_alg,
        wrap_alg,
        ukm,
        &cek,
    )?;

    let kari = KeyAgreeRecipientInfo {
        version: CmsVersion::V3,
        originator: crate::kari::OriginatorIdentifierOrKey::OriginatorKey(
            crate::kari::originator_public_key(&ephemeral_public_key)?,
        ),
        ukm: ukm.map(OctetString::new).transpose()?,
        key_encryption_algorithm: AlgorithmIdentifierOwned {
            oid: wrap_alg.oid(),
            parameters: None,
        },
        recipient_encrypted_keys: alloc::vec![crate::kari::RecipientEncryptedKey {
            rid: recipient.rid.clone(),
            encrypted_key: OctetString::new(encrypted_key)?,
        }],
    };

    let mut recipient_infos = SetOfVec::new();
    recipient_infos.insert(RecipientInfo::Kari(kari))?;

    Ok(EnvelopedData {
        version: CmsVersion::V2,
        recipient_infos,
        encrypted_content_info: EncryptedContentInfo {
            content_type,
            content_encryption_algorithm: AlgorithmIdentifierOwned {
                oid: content_enc_alg.oid(),
                parameters: Some(Any::from(OctetStringRef::new(&iv)?)),
            },
            encrypted_content: Some(OctetString::new(padded)?),
        },
    })
}

/// Decrypt an `EnvelopedData` whose matching recipient is a
/// `RecipientInfo::Kari` identified by either `our_issuer_and_serial`
/// or (when the recipient used the `SubjectKeyIdentifier` form)
/// `our_ski`.
pub fn decrypt_enveloped_data_kari(
    enveloped: &EnvelopedData,
    our_issuer_and_serial: &IssuerAndSerialNumber,
    our_ski: Option<&SubjectKeyIdentifier>,
    our_private_key: &p256::SecretKey,
    kdf_alg: crate::algorithms::KeyAgreementAlgorithm,
    wrap_alg: crate::algorithms::KeyWrapAlgorithm,
) -> Result<Vec<u8>> {
    if enveloped.version != CmsVersion::V2 {
        return Err(Error::AsnVersion("EnvelopedData"));
    }
    let mut cek: Option<Zeroizing<Vec<u8>>> = None;
    'outer: for ri in enveloped.recipient_infos.iter() {
        if let RecipientInfo::Kari(kari) = ri {
            let originator_point = match &kari.originator {
                crate::kari::OriginatorIdentifierOrKey::OriginatorKey(opk) => {
                    let bytes = opk.public_key.as_bytes().ok_or(Error::ArgumentError("originator key"))?;
                    p256::PublicKey::from_sec1_bytes(bytes).map_err(|_| Error::Crypto("originator point"))?
                }
                _ => continue,
            };
            let ukm = kari.ukm.as_ref().map(|u| u.as_bytes());
            for rek in &kari.recipient_encrypted_keys {
                let matches = match &rek.rid {
                    crate::kari::KeyAgreeRecipientIdentifier::IssuerAndSerialNumber(rid) => {
                        rid == our_issuer_and_serial
                    }
                    crate::kari::KeyAgreeRecipientIdentifier::RKeyId(rkid) => our_ski
                        .map(|ski| ski == &rkid.subject_key_identifier)
                        .unwrap_or(false),
                };
                if matches {
                    cek = Some(crate::kari::unwrap_cek(
                        our_private_key,
                        &originator_point,
                        kdf_alg,
                        wrap_alg,
                        ukm,
                        rek.encrypted_key.as_bytes(),
                    )?);
                    break 'outer;
                }
            }
        }
    }
    let cek = cek.ok_or(Error::NoMatchingRecipient)?;
    decrypt_content(enveloped, &cek)
}

/// Decrypt the `EncryptedContentInfo` given an already-recovered CEK.
pub fn decrypt_content(enveloped: &EnvelopedData, cek: &[u8]) -> Result<Vec<u8>> {
    let eci = &enveloped.encrypted_content_info;
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
    use rsa::{RsaPrivateKey, RsaPublicKey};
    use x509_cert::name::Name;
    use x509_cert::serial_number::SerialNumber;

    #[test]
    fn ktri_round_trip_hello_world() {
        let mut rng = rand::thread_rng();
        let private_key = RsaPrivateKey::new(&mut rng, 2048).unwrap();
        let public_key = RsaPublicKey::from(&private_key);

        let issuer_and_serial = IssuerAndSerialNumber {
            issuer: Name::default(),
            serial_number: SerialNumber::new(&[1]).unwrap(),
        };

        let recipient = KtriRecipient {
            issuer_and_serial: issuer_and_serial.clone(),
            public_key: &public_key,
        };

        let enveloped = build_enveloped_data_ktri(
            const_oid::db::rfc5911::ID_DATA,
            ContentEncryptionAlgorithm::Aes128Cbc,
            &recipient,
            b"Hello, World",
            &mut rng,
        )
        .unwrap();

        assert_eq!(enveloped.version, CmsVersion::V0);

        let decrypted =
            decrypt_enveloped_data_ktri(&enveloped, &issuer_and_serial, &private_key).unwrap();
        assert_eq!(decrypted, b"Hello, World");
    }

    #[test]
    fn zero_content_pads_to_48_bytes() {
        let mut rng = rand::thread_rng();
        let private_key = RsaPrivateKey::new(&mut rng, 2048).unwrap();
        let public_key = RsaPublicKey::from(&private_key);
        let issuer_and_serial = IssuerAndSerialNumber {
            issuer: Name::default(),
            serial_number: SerialNumber::new(&[1]).unwrap(),
        };
        let recipient = KtriRecipient {
            issuer_and_serial: issuer_and_serial.clone(),
            public_key: &public_key,
        };
        let content = vec![0u8; 32];
        let enveloped = build_enveloped_data_ktri(
            const_oid::db::rfc5911::ID_DATA,
            ContentEncryptionAlgorithm::Aes128Cbc,
            &recipient,
            &content,
            &mut rng,
        )
        .unwrap();
        assert_eq!(
            enveloped
                .encrypted_content_info
                .encrypted_content
                .as_ref()
                .unwrap()
                .as_bytes()
                .len(),
            48
        );
        let decrypted =
            decrypt_enveloped_data_ktri(&enveloped, &issuer_and_serial, &private_key).unwrap();
        assert_eq!(decrypted.len(), 32);
        assert!(decrypted.iter().all(|&b| b == 0));
    }
}
