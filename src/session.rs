//! The `Session`: the long-lived context that carries certificate,
//! key, content, and algorithm state across exactly one encode or
//! decode call.

use crate::algorithms::{ContentEncryptionAlgorithm, HashAlgorithm, KeyAgreementAlgorithm, KeyWrapAlgorithm};
use crate::attributes::{DecodedAttributes, Pkcs7Attribute};
use crate::cert::{CertificateChoices, IssuerAndSerialNumber};
use crate::compressed_data;
use crate::content_info::{ContentInfo, ContentType};
use crate::encrypted_data;
use crate::enveloped_data::{self, EnvelopedData, KtriRecipient};
use crate::error::{Error, Result};
use crate::signed_data::{self, Signer, SignerIdentifier};
use der::asn1::ObjectIdentifier;
use der::{Decode, Encode};
use x509_cert::ext::pkix::SubjectKeyIdentifier;
use x509_cert::Certificate;
use zeroize::Zeroizing;

/// Which alternative of `SignerIdentifier`/`RecipientIdentifier` a
/// Session builds outbound SignerInfos/RecipientInfos with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SignerIdentifierKind {
    #[default]
    IssuerAndSerialNumber,
    SubjectKeyIdentifier,
}

/// The long-lived context carrying certificate, key, and algorithm
/// state. Created empty, populated by setters and `init_with_cert`,
/// consumed by exactly one encode or decode call.
#[derive(Default)]
pub struct Session {
    certificate: Option<Certificate>,
    /// Additional certificates; most-recently-added first, per
    /// `add_certificate`'s prepend contract.
    certificate_chain: Vec<Certificate>,
    signer: Option<Signer>,
    rsa_public_key: Option<rsa::RsaPublicKey>,
    ec_public_key: Option<p256::PublicKey>,

    content_type: Option<ObjectIdentifier>,
    hash_alg: HashAlgorithm,
    content_enc_alg: ContentEncryptionAlgorithm,
    key_wrap_alg: KeyWrapAlgorithm,
    key_agreement_alg: KeyAgreementAlgorithm,

    sid_kind: SignerIdentifierKind,
    allow_degenerate: bool,

    outbound_attrs: Vec<Pkcs7Attribute>,
    decoded_attrs: DecodedAttributes,

    ukm: Option<Vec<u8>>,
    symmetric_key: Option<Zeroizing<Vec<u8>>>,
}

impl Session {
    /// `session_new`: an empty Session with sensible defaults
    /// (SHA-256, AES-128-CBC, AES-128 key wrap, IssuerAndSerialNumber).
    pub fn new() -> Self {
        Self {
            hash_alg: HashAlgorithm::Sha256,
            content_enc_alg: ContentEncryptionAlgorithm::Aes128Cbc,
            key_wrap_alg: KeyWrapAlgorithm::Aes128Wrap,
            key_agreement_alg: KeyAgreementAlgorithm::StdDhSha256Kdf,
            sid_kind: SignerIdentifierKind::IssuerAndSerialNumber,
            ..Default::default()
        }
    }

    /// `session_init_with_cert`: bind the recipient/signer certificate.
    /// The certificate must parse successfully before it is stored.
    pub fn init_with_cert(&mut self, cert_der: &[u8]) -> Result<()> {
        use rsa::pkcs8::DecodePublicKey;

        let cert = Certificate::from_der(cert_der)?;
        let spki_der = cert.tbs_certificate.subject_public_key_info.to_der()?;
        if let Ok(pk) = rsa::RsaPublicKey::from_public_key_der(&spki_der) {
            self.rsa_public_key = Some(pk);
        } else if let Some(bytes) = cert.tbs_certificate.subject_public_key_info.subject_public_key.as_bytes() {
            self.ec_public_key = p256::PublicKey::from_sec1_bytes(bytes).ok();
        }
        self.certificate = Some(cert);
        Ok(())
    }

    /// Set the RSA or ECDSA signer key used by `encode_signed_data`.
    pub fn set_signer(&mut self, signer: Signer) {
        self.signer = Some(signer);
    }

    /// `add_certificate`: prepend an additional certificate to the
    /// chain, so the most-recently-added certificate appears first in
    /// the emitted `CertificateSet`.
    pub fn add_certificate(&mut self, cert_der: &[u8]) -> Result<()> {
        let cert = Certificate::from_der(cert_der)?;
        self.certificate_chain.insert(0, cert);
        Ok(())
    }

    pub fn set_signer_identifier_type(&mut self, kind: SignerIdentifierKind) {
        self.sid_kind = kind;
    }

    pub fn set_content_type(&mut self, oid: ObjectIdentifier) {
        self.content_type = Some(oid);
    }

    pub fn set_hash_algorithm(&mut self, alg: HashAlgorithm) {
        self.hash_alg = alg;
    }

    pub fn set_content_encryption_algorithm(&mut self, alg: ContentEncryptionAlgorithm) {
        self.content_enc_alg = alg;
    }

    pub fn set_key_wrap_algorithm(&mut self, alg: KeyWrapAlgorithm) {
        self.key_wrap_alg = alg;
    }

    pub fn set_key_agreement_algorithm(&mut self, alg: KeyAgreementAlgorithm) {
        self.key_agreement_alg = alg;
    }

    pub fn set_user_keying_material(&mut self, ukm: Vec<u8>) {
        self.ukm = Some(ukm);
    }

    pub fn set_symmetric_key(&mut self, key: Vec<u8>) {
        self.symmetric_key = Some(Zeroizing::new(key));
    }

    pub fn allow_degenerate(&mut self, allow: bool) {
        self.allow_degenerate = allow;
    }

    pub fn add_outbound_attribute(&mut self, attr: Pkcs7Attribute) {
        self.outbound_attrs.push(attr);
    }

    /// `get_attribute_value`: DER-encoded bytes of a decoded inbound
    /// attribute's value, if present.
    pub fn attribute_value(&self, oid: &ObjectIdentifier) -> Option<Vec<u8>> {
        self.decoded_attrs
            .get(oid)
            .and_then(|a| a.values.iter().next())
            .and_then(|v| v.to_der().ok())
    }

    /// `get_attribute_value` length-probe form.
    pub fn attribute_value_len(&self, oid: &ObjectIdentifier) -> Option<usize> {
        self.attribute_value(oid).map(|v| v.len())
    }

    fn issuer_and_serial(&self) -> Result<IssuerAndSerialNumber> {
        let cert = self.certificate.as_ref().ok_or(Error::ArgumentError("no certificate bound"))?;
        Ok(IssuerAndSerialNumber {
            issuer: cert.tbs_certificate.issuer.clone(),
            serial_number: cert.tbs_certificate.serial_number.clone(),
        })
    }

    fn subject_key_identifier(&self) -> Result<SubjectKeyIdentifier> {
        let cert = self.certificate.as_ref().ok_or(Error::ArgumentError("no certificate bound"))?;
        cert.tbs_certificate
            .get::<SubjectKeyIdentifier>()?
            .map(|(_, ski)| ski)
            .ok_or(Error::ArgumentError("certificate has no SubjectKeyIdentifier extension"))
    }

    fn certificate_set(&self) -> Vec<CertificateChoices> {
        let mut certs = Vec::new();
        if let Some(cert) = &self.certificate {
            certs.push(CertificateChoices::from(cert.clone()));
        }
        for cert in &self.certificate_chain {
            certs.push(CertificateChoices::from(cert.clone()));
        }
        certs
    }

    /// `pad_size` helper, re-exported at the Session level to match the
    /// abstract API's public helper surface.
    pub fn pad_size(input_len: usize, block_size: usize) -> usize {
        crate::content_encryption::pad_size(input_len, block_size)
    }

    /// `pad_data` helper.
    pub fn pad_data(data: &mut Vec<u8>, block_size: usize) {
        crate::content_encryption::pad_data(data, block_size)
    }

    /// `encode_data`: the trivial `Data` content type — OID + OCTET STRING.
    pub fn encode_data(&self, content: &[u8]) -> Result<Vec<u8>> {
        let content_info = ContentInfo {
            content_type: ContentType::Data.oid(),
            content: der::Any::from(der::asn1::OctetStringRef::new(content)?),
        };
        Ok(content_info.to_der()?)
    }

    /// `encode_signed_data`: build and DER-encode a `SignedData` with
    /// exactly one `SignerInfo`, attributes enabled.
    pub fn encode_signed_data(&self, content: &[u8]) -> Result<Vec<u8>> {
        self.encode_signed_data_inner(content, true)
    }

    /// `encode_signed_data_detached`: the `eContent` OCTET STRING's tag
    /// and true declared length stay on the wire, but its value bytes
    /// are not — they're returned split into a `head`/`foot` pair, and
    /// the caller is expected to transmit `head ‖ content ‖ foot`.
    pub fn encode_signed_data_detached(&self, content: &[u8]) -> Result<(Vec<u8>, Vec<u8>)> {
        let der = self.encode_signed_data_inner(content, true)?;
        split_detached_buffers(&der, content)
    }

    fn encode_signed_data_inner(&self, content: &[u8], include_attrs: bool) -> Result<Vec<u8>> {
        let signer = self.signer.as_ref().ok_or(Error::ArgumentError("no signer key set"))?;
        let sid = match self.sid_kind {
            SignerIdentifierKind::IssuerAndSerialNumber => {
                SignerIdentifier::IssuerAndSerialNumber(self.issuer_and_serial()?)
            }
            SignerIdentifierKind::SubjectKeyIdentifier => {
                SignerIdentifier::SubjectKeyIdentifier(self.subject_key_identifier()?)
            }
        };

        let content_type = self.content_type.unwrap_or(ContentType::Data.oid());
        let sd = signed_data::build_signed_data(&signed_data::SignedDataRequest {
            content,
            content_type,
            hash_alg: self.hash_alg,
            signer,
            sid,
            certificates: self.certificate_set(),
            include_attributes: include_attrs,
            signing_time: None,
            caller_attrs: &self.outbound_attrs,
        })?;

        wrap_signed_data(&sd)
    }

    /// `decode_signed_data`: parse and verify a `SignedData` message.
    /// Returns the encapsulated content (empty for degenerate).
    pub fn decode_signed_data(&self, der: &[u8]) -> Result<Vec<u8>> {
        let sd = signed_data::decode_signed_data(der)?;
        self.finish_decode_signed_data(sd, None)
    }

    /// Detached-form decode: `head`/`foot` are the two buffers
    /// `encode_signed_data_detached` produced, and `precomputed_digest`
    /// is the hash the verifier obtained out of band for the content
    /// that belongs between them. The declared `eContent` length is
    /// recovered from `head`'s trailing OCTET STRING header and used to
    /// re-inflate a structurally complete buffer before the ordinary
    /// decoder runs over it; a tampered declared length breaks that
    /// re-inflation and surfaces as a parse error, the same as it would
    /// for a non-detached message.
    pub fn decode_signed_data_detached(&self, head: &[u8], foot: &[u8], precomputed_digest: &[u8]) -> Result<()> {
        let der = reinflate_detached_buffers(head, foot)?;
        let sd = signed_data::decode_signed_data(&der)?;
        self.finish_decode_signed_data(sd, Some(precomputed_digest))?;
        Ok(())
    }

    fn finish_decode_signed_data(&self, sd: crate::signed_data::SignedData, precomputed_digest: Option<&[u8]>) -> Result<Vec<u8>> {
        let degenerate = sd.signer_infos.0.is_empty();
        if degenerate && !self.allow_degenerate {
            return Err(Error::NoSigner);
        }
        if !degenerate {
            match precomputed_digest {
                Some(digest) => signed_data::verify_signed_data(&sd, digest, true)?,
                None => {
                    let content = sd
                        .encap_content_info
                        .econtent
                        .as_ref()
                        .ok_or(Error::ArgumentError("missing eContent for non-detached decode"))?;
                    let octets: der::asn1::OctetStringRef<'_> = content.decode_as()?;
                    signed_data::verify_signed_data(&sd, octets.as_bytes(), false)?;
                }
            }
        }
        Ok(sd
            .encap_content_info
            .econtent
            .as_ref()
            .and_then(|c| c.decode_as::<der::asn1::OctetStringRef<'_>>().ok())
            .map(|o| o.as_bytes().to_vec())
            .unwrap_or_default())
    }

    /// `encode_enveloped_data` against the Session's bound RSA
    /// certificate (KTRI) recipient.
    pub fn encode_enveloped_data_ktri(&mut self, content: &[u8]) -> Result<Vec<u8>> {
        let content_type = self.content_type.unwrap_or(ContentType::Data.oid());
        let public_key = self
            .rsa_public_key
            .clone()
            .ok_or(Error::ArgumentError("no RSA recipient certificate bound"))?;
        let issuer_and_serial = self.issuer_and_serial()?;
        let recipient = KtriRecipient {
            issuer_and_serial,
            public_key: &public_key,
        };
        let mut rng = rand_core::OsRng;
        let enveloped = enveloped_data::build_enveloped_data_ktri(
            content_type,
            self.content_enc_alg,
            &recipient,
            content,
            &mut rng,
        )?;
        wrap_enveloped_data(&enveloped)
    }

    /// `decode_enveloped_data` using the Session's bound RSA private key.
    pub fn decode_enveloped_data_ktri(&self, der: &[u8]) -> Result<Vec<u8>> {
        let signer = self.signer.as_ref().ok_or(Error::ArgumentError("no private key set"))?;
        let Signer::Rsa(private_key) = signer else {
            return Err(Error::ArgumentError("KTRI decode requires an RSA private key"));
        };
        let issuer_and_serial = self.issuer_and_serial()?;
        let enveloped = decode_enveloped_data_inner(der)?;
        enveloped_data::decrypt_enveloped_data_ktri(&enveloped, &issuer_and_serial, private_key)
    }

    /// `encode_enveloped_data` against the Session's bound EC public
    /// key (KARI), deriving a KEK via ECDH + X9.63 KDF.
    pub fn encode_enveloped_data_kari(&mut self, content: &[u8], ukm: Option<&[u8]>) -> Result<Vec<u8>> {
        let content_type = self.content_type.unwrap_or(ContentType::Data.oid());
        let public_key = self
            .ec_public_key
            .ok_or(Error::ArgumentError("no EC recipient certificate bound"))?;
        let rid = match self.sid_kind {
            SignerIdentifierKind::IssuerAndSerialNumber => {
                crate::kari::KeyAgreeRecipientIdentifier::IssuerAndSerialNumber(self.issuer_and_serial()?)
            }
            SignerIdentifierKind::SubjectKeyIdentifier => {
                crate::kari::KeyAgreeRecipientIdentifier::RKeyId(crate::kari::RecipientKeyIdentifier {
                    subject_key_identifier: self.subject_key_identifier()?,
                    date: None,
                })
            }
        };
        let recipient = enveloped_data::KariRecipient {
            rid,
            public_key: &public_key,
        };
        let mut rng = rand_core::OsRng;
        let enveloped = enveloped_data::build_enveloped_data_kari(
            content_type,
            self.content_enc_alg,
            self.key_agreement_alg,
            self.key_wrap_alg,
            &recipient,
            ukm,
            content,
            &mut rng,
        )?;
        wrap_enveloped_data(&enveloped)
    }

    /// `decode_enveloped_data` using the Session's bound EC private key.
    pub fn decode_enveloped_data_kari(&self, der: &[u8]) -> Result<Vec<u8>> {
        let signer = self.signer.as_ref().ok_or(Error::ArgumentError("no private key set"))?;
        let Signer::Ecdsa(signing_key) = signer else {
            return Err(Error::ArgumentError("KARI decode requires an EC private key"));
        };
        let private_key = p256::SecretKey::from(signing_key.as_ref());
        let issuer_and_serial = self.issuer_and_serial()?;
        let ski = self.subject_key_identifier().ok();
        let enveloped = decode_enveloped_data_inner(der)?;
        enveloped_data::decrypt_enveloped_data_kari(
            &enveloped,
            &issuer_and_serial,
            ski.as_ref(),
            &private_key,
            self.key_agreement_alg,
            self.key_wrap_alg,
        )
    }

    /// `encode_encrypted_data`: symmetric envelope, no recipient layer.
    pub fn encode_encrypted_data(&self, content: &[u8]) -> Result<Vec<u8>> {
        let content_type = self.content_type.unwrap_or(ContentType::Data.oid());
        let cek = self
            .symmetric_key
            .clone()
            .ok_or(Error::ArgumentError("no symmetric key set"))?;
        let mut rng = rand_core::OsRng;
        let encrypted = encrypted_data::build_encrypted_data(
            content_type,
            self.content_enc_alg,
            &cek,
            content,
            &self.outbound_attrs,
            &mut rng,
        )?;
        let content_info = ContentInfo {
            content_type: ContentType::EncryptedData.oid(),
            content: der::Any::from(der::AnyRef::try_from(encrypted.to_der()?.as_slice())?),
        };
        Ok(content_info.to_der()?)
    }

    /// `decode_encrypted_data` using the Session's symmetric key.
    pub fn decode_encrypted_data(&self, der: &[u8]) -> Result<Vec<u8>> {
        let cek = self
            .symmetric_key
            .clone()
            .ok_or(Error::ArgumentError("no symmetric key set"))?;
        let content_info = ContentInfo::from_der(der)?;
        if content_info.content_type != ContentType::EncryptedData.oid() {
            return Err(Error::Pkcs7Oid);
        }
        let inner = content_info.content.to_der()?;
        let encrypted = encrypted_data::EncryptedData::from_der(&inner)?;
        encrypted_data::decrypt_encrypted_data(&encrypted, &cek)
    }

    /// `encode_compressed_data`.
    pub fn encode_compressed_data(&self, content: &[u8]) -> Result<Vec<u8>> {
        let content_type = self.content_type.unwrap_or(ContentType::Data.oid());
        let compressed = compressed_data::build_compressed_data(content_type, content)?;
        let content_info = ContentInfo {
            content_type: ContentType::CompressedData.oid(),
            content: der::Any::from(der::AnyRef::try_from(compressed.to_der()?.as_slice())?),
        };
        Ok(content_info.to_der()?)
    }

    /// `decode_compressed_data`.
    pub fn decode_compressed_data(&self, der: &[u8], declared_len: usize) -> Result<Vec<u8>> {
        let content_info = ContentInfo::from_der(der)?;
        if content_info.content_type != ContentType::CompressedData.oid() {
            return Err(Error::Pkcs7Oid);
        }
        let inner = content_info.content.to_der()?;
        let compressed = compressed_data::CompressedData::from_der(&inner)?;
        compressed_data::decode_compressed_data(&compressed, declared_len)
    }
}

fn wrap_signed_data(sd: &crate::signed_data::SignedData) -> Result<Vec<u8>> {
    let content_info = ContentInfo {
        content_type: ContentType::SignedData.oid(),
        content: der::Any::from(der::AnyRef::try_from(sd.to_der()?.as_slice())?),
    };
    Ok(content_info.to_der()?)
}

fn wrap_enveloped_data(enveloped: &EnvelopedData) -> Result<Vec<u8>> {
    let content_info = ContentInfo {
        content_type: ContentType::EnvelopedData.oid(),
        content: der::Any::from(der::AnyRef::try_from(enveloped.to_der()?.as_slice())?),
    };
    Ok(content_info.to_der()?)
}

fn decode_enveloped_data_inner(der: &[u8]) -> Result<EnvelopedData> {
    let content_info = ContentInfo::from_der(der)?;
    if content_info.content_type != ContentType::EnvelopedData.oid() {
        return Err(Error::Pkcs7Oid);
    }
    let inner = content_info.content.to_der()?;
    Ok(EnvelopedData::from_der(&inner)?)
}

/// Split a fully-encoded `SignedData` message (`eContent` embedded) into
/// a head and foot buffer around the literal content bytes, leaving the
/// OCTET STRING's tag+length header in `head` so the declared content
/// size stays on the wire and tamperable — matching the
/// head/content/foot split `wc_PKCS7_EncodeSignedData_ex` returns.
fn split_detached_buffers(der: &[u8], content: &[u8]) -> Result<(Vec<u8>, Vec<u8>)> {
    let econtent_tlv = der::Any::from(der::asn1::OctetStringRef::new(content)?).to_der()?;
    let header_len = econtent_tlv
        .len()
        .checked_sub(content.len())
        .ok_or(Error::ArgumentError("eContent TLV shorter than its own content"))?;
    let start = der
        .windows(econtent_tlv.len())
        .position(|w| w == econtent_tlv.as_slice())
        .ok_or(Error::ArgumentError("eContent not found in encoded SignedData"))?;
    let head = der[..start + header_len].to_vec();
    let foot = der[start + econtent_tlv.len()..].to_vec();
    Ok((head, foot))
}

/// Recover the declared `eContent` length from `head`'s trailing OCTET
/// STRING header and re-inflate a complete buffer with a zero-filled
/// placeholder standing in for the omitted content bytes. Detached
/// verification never reads those placeholder bytes — it checks the
/// signature against the caller-supplied precomputed digest — so this
/// is exactly enough to hand to the ordinary decoder.
fn reinflate_detached_buffers(head: &[u8], foot: &[u8]) -> Result<Vec<u8>> {
    let content_len = declared_econtent_length(head)?;
    let mut der = Vec::with_capacity(head.len() + content_len + foot.len());
    der.extend_from_slice(head);
    der.resize(der.len() + content_len, 0);
    der.extend_from_slice(foot);
    Ok(der)
}

/// Walk `head`'s `ContentInfo`/`SignedData`/`EncapsulatedContentInfo`
/// headers to reach the `eContent` OCTET STRING's own header — the
/// last TLV header `head` holds, with no value bytes following it — and
/// return its declared length.
fn declared_econtent_length(head: &[u8]) -> Result<usize> {
    use der::{Decode, Header, Reader};

    fn skip_tlv(reader: &mut der::SliceReader<'_>) -> der::Result<()> {
        let header = Header::decode(reader)?;
        reader.read_slice(header.length)?;
        Ok(())
    }

    let mut reader = der::SliceReader::new(head)?;
    let _content_info = Header::decode(&mut reader)?; // outer ContentInfo SEQUENCE
    skip_tlv(&mut reader)?; // contentType OID
    let _content_wrapper = Header::decode(&mut reader)?; // content [0] EXPLICIT
    let _signed_data = Header::decode(&mut reader)?; // SignedData SEQUENCE
    skip_tlv(&mut reader)?; // version INTEGER
    skip_tlv(&mut reader)?; // digestAlgorithms SET
    let _encap_content_info = Header::decode(&mut reader)?; // EncapsulatedContentInfo SEQUENCE
    skip_tlv(&mut reader)?; // econtentType OID
    let _econtent_wrapper = Header::decode(&mut reader)?; // econtent [0] EXPLICIT
    let econtent_header = Header::decode(&mut reader)?; // eContent OCTET STRING
    Ok(econtent_header.length.try_into()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsa::RsaPrivateKey;
    use sha2::Sha256;
    use x509_cert::builder::{Builder, CertificateBuilder, Profile};
    use x509_cert::name::Name;
    use x509_cert::serial_number::SerialNumber;
    use x509_cert::time::Validity;

    fn self_signed_rsa_cert(key: &RsaPrivateKey) -> (Certificate, rsa::pkcs1v15::SigningKey<sha2::Sha256>) {
        use rsa::pkcs1v15::SigningKey;
        use rsa::signature::Keypair;

        let signing_key = SigningKey::<Sha256>::new(key.clone());
        let verifying_key = signing_key.verifying_key();
        let serial_number = SerialNumber::from(1u32);
        let validity = Validity::from_now(core::time::Duration::new(3600, 0)).unwrap();
        let subject = "CN=test".parse::<Name>().unwrap();
        let pub_key_der = rsa::pkcs8::EncodePublicKey::to_public_key_der(&rsa::RsaPublicKey::from(key)).unwrap();
        let spki = spki::SubjectPublicKeyInfoOwned::try_from(pub_key_der.as_bytes()).unwrap();
        let builder = CertificateBuilder::new(
            Profile::Root,
            serial_number,
            validity,
            subject,
            spki,
            &signing_key,
        )
        .unwrap();
        let cert = builder.build::<_>().unwrap();
        let _ = verifying_key;
        (cert, signing_key)
    }

    fn self_signed_ec_cert(key: &p256::ecdsa::SigningKey) -> Certificate {
        use spki::EncodePublicKey;

        let verifying_key = *key.verifying_key();
        let serial_number = SerialNumber::from(1u32);
        let validity = Validity::from_now(core::time::Duration::new(3600, 0)).unwrap();
        let subject = "CN=test-ec".parse::<Name>().unwrap();
        let public_key: p256::PublicKey = verifying_key.into();
        let pub_key_der = public_key.to_public_key_der().unwrap();
        let spki = spki::SubjectPublicKeyInfoOwned::try_from(pub_key_der.as_bytes()).unwrap();
        let builder = CertificateBuilder::new(Profile::Root, serial_number, validity, subject, spki, key).unwrap();
        builder.build::<p256::ecdsa::DerSignature>().unwrap()
    }

    #[test]
    fn data_round_trip() {
        let session = Session::new();
        let encoded = session.encode_data(b"Hello, World").unwrap();
        let content_info = ContentInfo::from_der(&encoded).unwrap();
        assert_eq!(content_info.content_type, ContentType::Data.oid());
    }

    #[test]
    fn signed_data_hello_world_round_trip_and_tamper_detection() {
        let mut rng = rand::thread_rng();
        let key = RsaPrivateKey::new(&mut rng, 2048).unwrap();
        let (cert, _) = self_signed_rsa_cert(&key);
        let cert_der = cert.to_der().unwrap();

        let mut session = Session::new();
        session.init_with_cert(&cert_der).unwrap();
        session.set_signer(Signer::Rsa(Box::new(key)));
        session.set_hash_algorithm(HashAlgorithm::Sha256);

        let encoded = session.encode_signed_data(b"Hello, World").unwrap();
        let decoded = session.decode_signed_data(&encoded).unwrap();
        assert_eq!(decoded, b"Hello, World");

        let mut tampered = encoded.clone();
        let last = tampered.len() - 1;
        tampered[last] ^= 0xff;
        assert!(session.decode_signed_data(&tampered).is_err());
    }

    #[test]
    fn degenerate_signed_data_policy() {
        let mut rng = rand::thread_rng();
        let key = RsaPrivateKey::new(&mut rng, 2048).unwrap();
        let (cert, _) = self_signed_rsa_cert(&key);
        let cert_der = cert.to_der().unwrap();

        let mut session = Session::new();
        session.init_with_cert(&cert_der).unwrap();
        let content_info: ContentInfo = cert.clone().try_into().unwrap();
        let degenerate_der = content_info.to_der().unwrap();

        session.allow_degenerate(true);
        assert!(session.decode_signed_data(&degenerate_der).is_ok());

        session.allow_degenerate(false);
        assert!(matches!(
            session.decode_signed_data(&degenerate_der),
            Err(Error::NoSigner)
        ));
    }

    #[test]
    fn enveloped_data_round_trip() {
        let mut rng = rand::thread_rng();
        let key = RsaPrivateKey::new(&mut rng, 2048).unwrap();
        let (cert, _) = self_signed_rsa_cert(&key);
        let cert_der = cert.to_der().unwrap();

        let mut session = Session::new();
        session.init_with_cert(&cert_der).unwrap();
        session.set_signer(Signer::Rsa(Box::new(key)));

        let encoded = session.encode_enveloped_data_ktri(b"Hello, World").unwrap();
        let decoded = session.decode_enveloped_data_ktri(&encoded).unwrap();
        assert_eq!(decoded, b"Hello, World");
    }

    #[test]
    fn encrypted_data_round_trip() {
        let mut session = Session::new();
        session.set_symmetric_key(vec![0x5au8; 16]);
        let encoded = session.encode_encrypted_data(b"top secret").unwrap();
        let decoded = session.decode_encrypted_data(&encoded).unwrap();
        assert_eq!(decoded, b"top secret");
    }

    #[test]
    fn compressed_data_round_trip() {
        let session = Session::new();
        let content = vec![b'A'; 1000];
        let encoded = session.encode_compressed_data(&content).unwrap();
        let decoded = session.decode_compressed_data(&encoded, 1000).unwrap();
        assert_eq!(decoded, content);
    }

    #[test]
    fn signed_data_detached_round_trip() {
        use sha2::Digest;
        let mut rng = rand::thread_rng();
        let key = RsaPrivateKey::new(&mut rng, 2048).unwrap();
        let (cert, _) = self_signed_rsa_cert(&key);
        let cert_der = cert.to_der().unwrap();

        let mut session = Session::new();
        session.init_with_cert(&cert_der).unwrap();
        session.set_signer(Signer::Rsa(Box::new(key)));

        let content = b"detached payload";
        let (head, foot) = session.encode_signed_data_detached(content).unwrap();
        session
            .decode_signed_data_detached(&head, &foot, &sha2::Sha256::digest(content))
            .unwrap();
    }

    #[test]
    fn signed_data_detached_tampered_declared_length_is_rejected() {
        use sha2::Digest;
        let mut rng = rand::thread_rng();
        let key = RsaPrivateKey::new(&mut rng, 2048).unwrap();
        let (cert, _) = self_signed_rsa_cert(&key);
        let cert_der = cert.to_der().unwrap();

        let mut session = Session::new();
        session.init_with_cert(&cert_der).unwrap();
        session.set_signer(Signer::Rsa(Box::new(key)));

        let content = b"detached payload";
        let (mut head, foot) = session.encode_signed_data_detached(content).unwrap();

        // The eContent OCTET STRING's declared length is the last byte of `head`.
        let last = head.len() - 1;
        head[last] ^= 0x01;

        assert!(session
            .decode_signed_data_detached(&head, &foot, &sha2::Sha256::digest(content))
            .is_err());
    }

    #[test]
    fn signed_data_subject_key_identifier_round_trip() {
        let mut rng = rand::thread_rng();
        let key = RsaPrivateKey::new(&mut rng, 2048).unwrap();
        let (cert, _) = self_signed_rsa_cert(&key);
        let cert_der = cert.to_der().unwrap();

        let mut session = Session::new();
        session.init_with_cert(&cert_der).unwrap();
        session.set_signer(Signer::Rsa(Box::new(key)));
        session.set_signer_identifier_type(SignerIdentifierKind::SubjectKeyIdentifier);

        let encoded = session.encode_signed_data(b"Hello, World").unwrap();
        let decoded = session.decode_signed_data(&encoded).unwrap();
        assert_eq!(decoded, b"Hello, World");
    }

    #[test]
    fn enveloped_data_kari_round_trip_with_ukm() {
        let signing_key = p256::ecdsa::SigningKey::random(&mut rand_core::OsRng);
        let cert = self_signed_ec_cert(&signing_key);
        let cert_der = cert.to_der().unwrap();

        let mut session = Session::new();
        session.init_with_cert(&cert_der).unwrap();
        session.set_signer(Signer::Ecdsa(Box::new(signing_key)));

        let ukm = b"user keying material";
        let encoded = session
            .encode_enveloped_data_kari(b"Hello, World", Some(ukm))
            .unwrap();
        let decoded = session.decode_enveloped_data_kari(&encoded).unwrap();
        assert_eq!(decoded, b"Hello, World");
    }

    #[test]
    fn enveloped_data_kari_rejects_wrong_recipient_key() {
        let signing_key = p256::ecdsa::SigningKey::random(&mut rand_core::OsRng);
        let cert = self_signed_ec_cert(&signing_key);
        let cert_der = cert.to_der().unwrap();

        let mut session = Session::new();
        session.init_with_cert(&cert_der).unwrap();
        session.set_signer(Signer::Ecdsa(Box::new(signing_key)));

        let encoded = session.encode_enveloped_data_kari(b"Hello, World", None).unwrap();

        let wrong_signing_key = p256::ecdsa::SigningKey::random(&mut rand_core::OsRng);
        let wrong_cert = self_signed_ec_cert(&wrong_signing_key);
        let mut wrong_session = Session::new();
        wrong_session.init_with_cert(&wrong_cert.to_der().unwrap()).unwrap();
        wrong_session.set_signer(Signer::Ecdsa(Box::new(wrong_signing_key)));

        assert!(wrong_session.decode_enveloped_data_kari(&encoded).is_err());
    }

    #[test]
    fn enveloped_data_kari_subject_key_identifier_round_trip() {
        let signing_key = p256::ecdsa::SigningKey::random(&mut rand_core::OsRng);
        let cert = self_signed_ec_cert(&signing_key);
        let cert_der = cert.to_der().unwrap();

        let mut session = Session::new();
        session.init_with_cert(&cert_der).unwrap();
        session.set_signer(Signer::Ecdsa(Box::new(signing_key)));
        session.set_signer_identifier_type(SignerIdentifierKind::SubjectKeyIdentifier);

        let encoded = session.encode_enveloped_data_kari(b"Hello, World", None).unwrap();
        let decoded = session.decode_enveloped_data_kari(&encoded).unwrap();
        assert_eq!(decoded, b"Hello, World");
    }

    #[test]
    fn enveloped_data_kari_uses_version_2() {
        let signing_key = p256::ecdsa::SigningKey::random(&mut rand_core::OsRng);
        let cert = self_signed_ec_cert(&signing_key);
        let cert_der = cert.to_der().unwrap();

        let mut session = Session::new();
        session.init_with_cert(&cert_der).unwrap();
        session.set_signer(Signer::Ecdsa(Box::new(signing_key)));

        let encoded = session.encode_enveloped_data_kari(b"Hello, World", None).unwrap();
        let enveloped = decode_enveloped_data_inner(&encoded).unwrap();
        assert_eq!(enveloped.version, crate::content_info::CmsVersion::V2);
    }
}
