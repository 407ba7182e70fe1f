//! PKCS#7 padding and the shared AES-CBC/DES-CBC encrypt/decrypt helpers
//! used by `enveloped_data` and `encrypted_data`.

use crate::algorithms::ContentEncryptionAlgorithm;
use crate::error::{Error, Result};
use aes::{Aes128, Aes192, Aes256};
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use des::{Des, TdesEde3};
use zeroize::Zeroizing;

/// Number of padding bytes `pad_size` would append for a plaintext of
/// `input_len` bytes under a cipher with the given block size. Always in
/// `[1, block_size]`, even when `input_len` is already block-aligned.
pub fn pad_size(input_len: usize, block_size: usize) -> usize {
    block_size - (input_len % block_size)
}

/// Append PKCS#7 padding to `data` in place: `k` bytes, `k = pad_size(..)`,
/// every byte equal to `k`.
pub fn pad_data(data: &mut Vec<u8>, block_size: usize) {
    let pad = pad_size(data.len(), block_size);
    data.resize(data.len() + pad, pad as u8);
}

/// Strip PKCS#7 padding by reading the trailing byte as the pad length.
/// Validation is positional only: the last byte must be in
/// `[1, block_size]`.
pub fn unpad_data(data: &[u8], block_size: usize) -> Result<&[u8]> {
    let pad = *data
        .last()
        .ok_or(Error::ArgumentError("empty ciphertext"))? as usize;
    if pad == 0 || pad > block_size || pad > data.len() {
        return Err(Error::ArgumentError("invalid PKCS#7 padding"));
    }
    Ok(&data[..data.len() - pad])
}

macro_rules! cbc_encrypt_with {
    ($cipher:ty, $key:expr, $iv:expr, $buf:expr) => {{
        type Enc = cbc::Encryptor<$cipher>;
        let enc = Enc::new_from_slices($key, $iv).map_err(|_| Error::Crypto("bad key/iv length"))?;
        enc.encrypt_padded_mut::<cbc::cipher::block_padding::NoPadding>($buf, $buf.len())
            .map_err(|_| Error::Crypto("cbc encrypt"))?
            .len()
    }};
}

macro_rules! cbc_decrypt_with {
    ($cipher:ty, $key:expr, $iv:expr, $buf:expr) => {{
        type Dec = cbc::Decryptor<$cipher>;
        let dec = Dec::new_from_slices($key, $iv).map_err(|_| Error::Crypto("bad key/iv length"))?;
        dec.decrypt_padded_mut::<cbc::cipher::block_padding::NoPadding>($buf)
            .map_err(|_| Error::Crypto("cbc decrypt"))?
            .len()
    }};
}

/// Encrypt `buf` in place under CBC mode, assuming `buf` is already
/// block-aligned (PKCS#7-padded by the caller via [`pad_data`]).
pub fn cbc_encrypt(alg: ContentEncryptionAlgorithm, key: &[u8], iv: &[u8], buf: &mut [u8]) -> Result<()> {
    if key.len() != alg.key_size() {
        return Err(Error::ArgumentError("CEK length does not match algorithm"));
    }
    if iv.len() != alg.block_size() {
        return Err(Error::ArgumentError("IV length does not match algorithm block size"));
    }
    let written = match alg {
        ContentEncryptionAlgorithm::Aes128Cbc => cbc_encrypt_with!(Aes128, key, iv, buf),
        ContentEncryptionAlgorithm::Aes192Cbc => cbc_encrypt_with!(Aes192, key, iv, buf),
        ContentEncryptionAlgorithm::Aes256Cbc => cbc_encrypt_with!(Aes256, key, iv, buf),
        ContentEncryptionAlgorithm::Des => cbc_encrypt_with!(Des, key, iv, buf),
        ContentEncryptionAlgorithm::DesEde3 => cbc_encrypt_with!(TdesEde3, key, iv, buf),
    };
    debug_assert_eq!(written, buf.len());
    Ok(())
}

/// Decrypt `buf` in place under CBC mode. The caller still must strip
/// PKCS#7 padding afterward via [`unpad_data`].
pub fn cbc_decrypt(alg: ContentEncryptionAlgorithm, key: &[u8], iv: &[u8], buf: &mut [u8]) -> Result<()> {
    if key.len() != alg.key_size() {
        return Err(Error::ArgumentError("CEK length does not match algorithm"));
    }
    if iv.len() != alg.block_size() {
        return Err(Error::ArgumentError("IV length does not match algorithm block size"));
    }
    let written = match alg {
        ContentEncryptionAlgorithm::Aes128Cbc => cbc_decrypt_with!(Aes128, key, iv, buf),
        ContentEncryptionAlgorithm::Aes192Cbc => cbc_decrypt_with!(Aes192, key, iv, buf),
        ContentEncryptionAlgorithm::Aes256Cbc => cbc_decrypt_with!(Aes256, key, iv, buf),
        ContentEncryptionAlgorithm::Des => cbc_decrypt_with!(Des, key, iv, buf),
        ContentEncryptionAlgorithm::DesEde3 => cbc_decrypt_with!(TdesEde3, key, iv, buf),
    };
    debug_assert_eq!(written, buf.len());
    Ok(())
}

/// Draw a fresh CEK of the algorithm's key size from `rng`.
pub fn generate_cek(alg: ContentEncryptionAlgorithm, rng: &mut impl rand_core::CryptoRngCore) -> Zeroizing<Vec<u8>> {
    let mut cek = Zeroizing::new(vec![0u8; alg.key_size()]);
    rng.fill_bytes(&mut cek);
    cek
}

/// Draw a fresh IV of the algorithm's block size from `rng`.
pub fn generate_iv(alg: ContentEncryptionAlgorithm, rng: &mut impl rand_core::CryptoRngCore) -> Vec<u8> {
    let mut iv = vec![0u8; alg.block_size()];
    rng.fill_bytes(&mut iv);
    iv
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pad_law() {
        for len in 0..40 {
            let block = 16;
            let k = pad_size(len, block);
            assert!((1..=block).contains(&k));
            let mut data = vec![0u8; len];
            pad_data(&mut data, block);
            assert_eq!(data.len() % block, 0);
            assert_eq!(*data.last().unwrap() as usize, k);
            let unpadded = unpad_data(&data, block).unwrap();
            assert_eq!(unpadded.len(), len);
        }
    }

    #[test]
    fn zero_content_pads_to_full_block() {
        let mut data = vec![0u8; 32];
        pad_data(&mut data, 16);
        assert_eq!(data.len(), 48);
        let unpadded = unpad_data(&data, 16).unwrap();
        assert_eq!(unpadded.len(), 32);
        assert!(unpadded.iter().all(|&b| b == 0));
    }

    #[test]
    fn aes128_cbc_round_trip() {
        let key = [0x11u8; 16];
        let iv = [0x22u8; 16];
        let mut data = b"Hello, World".to_vec();
        pad_data(&mut data, 16);
        let mut ciphertext = data.clone();
        cbc_encrypt(ContentEncryptionAlgorithm::Aes128Cbc, &key, &iv, &mut ciphertext).unwrap();
        assert_eq!(ciphertext.len(), 16);
        let mut plaintext = ciphertext.clone();
        cbc_decrypt(ContentEncryptionAlgorithm::Aes128Cbc, &key, &iv, &mut plaintext).unwrap();
        let recovered = unpad_data(&plaintext, 16).unwrap();
        assert_eq!(recovered, b"Hello, World");
    }
}
