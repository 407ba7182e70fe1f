//! `CompressedData`: thin deflate framing with a fixed algorithm and
//! version (RFC 3274).

use crate::content_info::CmsVersion;
use crate::error::{Error, Result};
use crate::signed_data::EncapsulatedContentInfo;
use der::asn1::ObjectIdentifier;
use der::{Any, AnyRef, Sequence};
use flate2::{read::ZlibDecoder, write::ZlibEncoder, Compression};
use spki::AlgorithmIdentifierOwned;
use std::io::{Read, Write};

/// `CompressedData ::= SEQUENCE { version, compressionAlgorithm,
/// encapContentInfo }`.
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct CompressedData {
    pub version: CmsVersion,
    pub compression_algorithm: AlgorithmIdentifierOwned,
    pub encap_content_info: EncapsulatedContentInfo,
}

fn zlib_compress_algorithm() -> AlgorithmIdentifierOwned {
    AlgorithmIdentifierOwned {
        oid: const_oid::db::rfc6268::ID_ALG_ZLIB_COMPRESS,
        parameters: None,
    }
}

/// Deflate `content` and frame it as a `CompressedData`. The compressed
/// buffer is pre-sized to `srcSz + srcSz/1000 + 12`, the classic
/// worst-case-deflate-overhead estimate.
pub fn build_compressed_data(content_type: ObjectIdentifier, content: &[u8]) -> Result<CompressedData> {
    let capacity = content.len() + content.len() / 1000 + 12;
    let mut encoder = ZlibEncoder::new(Vec::with_capacity(capacity), Compression::default());
    encoder
        .write_all(content)
        .map_err(|_| Error::Crypto("zlib compress"))?;
    let compressed = encoder.finish().map_err(|_| Error::Crypto("zlib compress"))?;

    Ok(CompressedData {
        version: CmsVersion::V0,
        compression_algorithm: zlib_compress_algorithm(),
        encap_content_info: EncapsulatedContentInfo {
            econtent_type: content_type,
            econtent: Some(Any::from(der::asn1::OctetStringRef::new(&compressed)?)),
        },
    })
}

/// Inflate a `CompressedData`'s content, requiring the exact
/// `id-alg-zlibCompress` OID and `version == 0`.
pub fn decode_compressed_data(compressed: &CompressedData, declared_len: usize) -> Result<Vec<u8>> {
    if compressed.version != CmsVersion::V0 {
        return Err(Error::AsnVersion("CompressedData"));
    }
    if compressed.compression_algorithm.oid != const_oid::db::rfc6268::ID_ALG_ZLIB_COMPRESS {
        return Err(Error::AsnParse(der::Tag::ObjectIdentifier.value_error()));
    }
    let econtent = compressed
        .encap_content_info
        .econtent
        .as_ref()
        .ok_or(Error::ArgumentError("missing compressed content"))?;
    let octets = der::asn1::OctetStringRef::try_from(AnyRef::from(econtent))?;

    let mut decoder = ZlibDecoder::new(octets.as_bytes());
    let mut out = Vec::with_capacity(declared_len);
    decoder
        .read_to_end(&mut out)
        .map_err(|_| Error::Crypto("zlib decompress"))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_1000_bytes_of_a() {
        let content = vec![b'A'; 1000];
        let compressed = build_compressed_data(const_oid::db::rfc5911::ID_DATA, &content).unwrap();
        let decoded = decode_compressed_data(&compressed, 1000).unwrap();
        assert_eq!(decoded.len(), 1000);
        assert!(decoded.iter().all(|&b| b == b'A'));
    }

    #[test]
    fn wrong_algorithm_oid_is_rejected() {
        let content = vec![b'A'; 64];
        let mut compressed = build_compressed_data(const_oid::db::rfc5911::ID_DATA, &content).unwrap();
        compressed.compression_algorithm.oid = const_oid::db::rfc5911::ID_DATA;
        assert!(decode_compressed_data(&compressed, 64).is_err());
    }
}
