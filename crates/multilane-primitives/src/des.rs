//! DES-CBC and the DOCSIS DES variant (CBC over whole blocks, CFB
//! termination of the residual partial block).

use cipher::generic_array::GenericArray;
use cipher::{BlockDecryptMut, BlockEncrypt, BlockEncryptMut, KeyInit, KeyIvInit};
use des::Des;

use crate::PrimitiveError;

pub const DES_BLOCK_SIZE: usize = 8;

fn check_des_params(key: &[u8], iv: &[u8]) -> Result<(), PrimitiveError> {
    if key.len() != DES_BLOCK_SIZE {
        return Err(PrimitiveError::KeyLength(key.len()));
    }
    if iv.len() != DES_BLOCK_SIZE {
        return Err(PrimitiveError::IvLength(iv.len()));
    }
    Ok(())
}

/// DES-CBC encryption of the whole-block prefix of `src` into `dst`.
pub fn des_cbc_encrypt(key: &[u8], iv: &[u8], src: &[u8], dst: &mut [u8]) -> Result<(), PrimitiveError> {
    check_des_params(key, iv)?;
    let n = src.len() & !(DES_BLOCK_SIZE - 1);
    dst[..n].copy_from_slice(&src[..n]);
    let mut enc = cbc::Encryptor::<Des>::new(GenericArray::from_slice(key), GenericArray::from_slice(iv));
    for chunk in dst[..n].chunks_exact_mut(DES_BLOCK_SIZE) {
        enc.encrypt_block_mut(GenericArray::from_mut_slice(chunk));
    }
    Ok(())
}

/// DES-CBC decryption of the whole-block prefix of `src` into `dst`.
pub fn des_cbc_decrypt(key: &[u8], iv: &[u8], src: &[u8], dst: &mut [u8]) -> Result<(), PrimitiveError> {
    check_des_params(key, iv)?;
    let n = src.len() & !(DES_BLOCK_SIZE - 1);
    dst[..n].copy_from_slice(&src[..n]);
    let mut dec = cbc::Decryptor::<Des>::new(GenericArray::from_slice(key), GenericArray::from_slice(iv));
    for chunk in dst[..n].chunks_exact_mut(DES_BLOCK_SIZE) {
        dec.decrypt_block_mut(GenericArray::from_mut_slice(chunk));
    }
    Ok(())
}

fn des_cfb_partial(key: &[u8], iv: &[u8; DES_BLOCK_SIZE], src: &[u8], dst: &mut [u8]) {
    let cipher = Des::new(GenericArray::from_slice(key));
    let mut keystream = *iv;
    cipher.encrypt_block(GenericArray::from_mut_slice(&mut keystream));
    for (i, (d, s)) in dst.iter_mut().zip(src).enumerate() {
        *d = keystream[i] ^ *s;
    }
}

/// DOCSIS DES encryption: CBC over whole blocks, then CFB over the residual
/// bytes with the last ciphertext block (or the IV for short messages) as
/// the CFB IV.
pub fn docsis_des_encrypt(key: &[u8], iv: &[u8], src: &[u8], dst: &mut [u8]) -> Result<(), PrimitiveError> {
    check_des_params(key, iv)?;
    let whole = src.len() & !(DES_BLOCK_SIZE - 1);
    let partial = src.len() - whole;
    des_cbc_encrypt(key, iv, &src[..whole], dst)?;
    if partial > 0 {
        let mut cfb_iv = [0u8; DES_BLOCK_SIZE];
        if whole >= DES_BLOCK_SIZE {
            cfb_iv.copy_from_slice(&dst[whole - DES_BLOCK_SIZE..whole]);
        } else {
            cfb_iv.copy_from_slice(iv);
        }
        des_cfb_partial(key, &cfb_iv, &src[whole..], &mut dst[whole..whole + partial]);
    }
    Ok(())
}

/// DOCSIS DES decryption; the CFB IV comes from the ciphertext side.
pub fn docsis_des_decrypt(key: &[u8], iv: &[u8], src: &[u8], dst: &mut [u8]) -> Result<(), PrimitiveError> {
    check_des_params(key, iv)?;
    let whole = src.len() & !(DES_BLOCK_SIZE - 1);
    let partial = src.len() - whole;
    if partial > 0 {
        let mut cfb_iv = [0u8; DES_BLOCK_SIZE];
        if whole >= DES_BLOCK_SIZE {
            cfb_iv.copy_from_slice(&src[whole - DES_BLOCK_SIZE..whole]);
        } else {
            cfb_iv.copy_from_slice(iv);
        }
        des_cfb_partial(key, &cfb_iv, &src[whole..], &mut dst[whole..whole + partial]);
    }
    des_cbc_decrypt(key, iv, &src[..whole], dst)?;
    Ok(())
}
