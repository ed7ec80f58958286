//! AES-GCM built from the counter core and GHASH.
//!
//! Unlike an AEAD interface, decryption does not verify: both directions
//! *compute* the (possibly truncated) tag and hand it back, leaving the
//! comparison to the caller. That is the contract the job manager exposes.

use aes::cipher::{BlockEncrypt, KeyInit};
use aes::{Aes128, Aes192, Aes256};
use cipher::generic_array::GenericArray;
use ghash::GHash;
use ghash::universal_hash::UniversalHash;

use crate::PrimitiveError;
use crate::aes::{AES_BLOCK_SIZE, ctr_transform};

pub const GCM_IV_LEN: usize = 12;

enum AnyAes {
    Aes128(Aes128),
    Aes192(Aes192),
    Aes256(Aes256),
}

impl AnyAes {
    fn new(key: &[u8]) -> Result<Self, PrimitiveError> {
        match key.len() {
            16 => Ok(Self::Aes128(Aes128::new(GenericArray::from_slice(key)))),
            24 => Ok(Self::Aes192(Aes192::new(GenericArray::from_slice(key)))),
            32 => Ok(Self::Aes256(Aes256::new(GenericArray::from_slice(key)))),
            n => Err(PrimitiveError::KeyLength(n)),
        }
    }

    fn encrypt_block(&self, block: &mut [u8; AES_BLOCK_SIZE]) {
        let block = GenericArray::from_mut_slice(block);
        match self {
            Self::Aes128(c) => c.encrypt_block(block),
            Self::Aes192(c) => c.encrypt_block(block),
            Self::Aes256(c) => c.encrypt_block(block),
        }
    }
}

fn gcm_tag(
    cipher: &AnyAes,
    j0: &[u8; AES_BLOCK_SIZE],
    aad: &[u8],
    ciphertext: &[u8],
    tag: &mut [u8],
) {
    let mut hash_key = [0u8; AES_BLOCK_SIZE];
    cipher.encrypt_block(&mut hash_key);

    let mut ghash = GHash::new(GenericArray::from_slice(&hash_key));
    ghash.update_padded(aad);
    ghash.update_padded(ciphertext);

    let mut lengths = [0u8; AES_BLOCK_SIZE];
    lengths[..8].copy_from_slice(&((aad.len() as u64) * 8).to_be_bytes());
    lengths[8..].copy_from_slice(&((ciphertext.len() as u64) * 8).to_be_bytes());
    ghash.update(&[lengths.into()]);
    let s = ghash.finalize();

    let mut ek_j0 = *j0;
    cipher.encrypt_block(&mut ek_j0);
    for (i, t) in tag.iter_mut().enumerate() {
        *t = ek_j0[i] ^ s[i];
    }
}

fn counter_blocks(iv: &[u8]) -> Result<([u8; 16], [u8; 16]), PrimitiveError> {
    if iv.len() != GCM_IV_LEN {
        return Err(PrimitiveError::IvLength(iv.len()));
    }
    let mut j0 = [0u8; AES_BLOCK_SIZE];
    j0[..GCM_IV_LEN].copy_from_slice(iv);
    j0[15] = 1;
    let mut j1 = j0;
    j1[15] = 2;
    Ok((j0, j1))
}

/// GCM encryption: `src` plaintext to `dst` ciphertext plus a tag truncated
/// to `tag.len()` bytes.
pub fn gcm_encrypt(
    key: &[u8],
    iv: &[u8],
    aad: &[u8],
    src: &[u8],
    dst: &mut [u8],
    tag: &mut [u8],
) -> Result<(), PrimitiveError> {
    let cipher = AnyAes::new(key)?;
    let (j0, j1) = counter_blocks(iv)?;
    ctr_transform(key, &j1, src, dst)?;
    gcm_tag(&cipher, &j0, aad, &dst[..src.len()], tag);
    Ok(())
}

/// GCM decryption: `src` ciphertext to `dst` plaintext. The tag is computed
/// over the input ciphertext; the caller compares it against the received one.
pub fn gcm_decrypt(
    key: &[u8],
    iv: &[u8],
    aad: &[u8],
    src: &[u8],
    dst: &mut [u8],
    tag: &mut [u8],
) -> Result<(), PrimitiveError> {
    let cipher = AnyAes::new(key)?;
    let (j0, j1) = counter_blocks(iv)?;
    gcm_tag(&cipher, &j0, aad, src, tag);
    ctr_transform(key, &j1, src, dst)?;
    Ok(())
}
