//! AES primitives: CBC encrypt/decrypt at the three key sizes, counter mode
//! with a 32-bit big-endian block counter, the single-block CFB transform
//! used by DOCSIS residual termination, and the per-block CBC-MAC update
//! that the CCM lane engine drives.

use aes::cipher::{BlockDecryptMut, BlockEncrypt, BlockEncryptMut, KeyInit, KeyIvInit, StreamCipher};
use aes::{Aes128, Aes192, Aes256};
use cipher::generic_array::GenericArray;

use crate::PrimitiveError;

pub const AES_BLOCK_SIZE: usize = 16;

fn check_iv16(iv: &[u8]) -> Result<(), PrimitiveError> {
    if iv.len() != AES_BLOCK_SIZE {
        return Err(PrimitiveError::IvLength(iv.len()));
    }
    Ok(())
}

/// An AES-128 block cipher instance with the forward schedule expanded.
///
/// Used wherever a single key drives repeated block operations: the CBC-MAC
/// lanes of the CCM engine and the CFB residual transform.
pub struct Aes128Block {
    cipher: Aes128,
}

impl Aes128Block {
    pub fn new(key: &[u8]) -> Result<Self, PrimitiveError> {
        if key.len() != 16 {
            return Err(PrimitiveError::KeyLength(key.len()));
        }
        Ok(Self {
            cipher: Aes128::new(GenericArray::from_slice(key)),
        })
    }

    pub fn encrypt_block(&self, block: &mut [u8; AES_BLOCK_SIZE]) {
        self.cipher.encrypt_block(GenericArray::from_mut_slice(block));
    }

    /// Advances a CBC-MAC state over `data`, which must be a whole number of
    /// blocks. The state is XORed with each block and re-encrypted in place.
    pub fn cbc_mac_update(&self, state: &mut [u8; AES_BLOCK_SIZE], data: &[u8]) {
        debug_assert_eq!(data.len() % AES_BLOCK_SIZE, 0);
        for block in data.chunks_exact(AES_BLOCK_SIZE) {
            for (s, b) in state.iter_mut().zip(block) {
                *s ^= *b;
            }
            self.encrypt_block(state);
        }
    }
}

/// Incremental AES-CBC encryptor. The chaining value lives inside, so a lane
/// engine can push block runs through it across multiple scheduling rounds.
#[derive(Debug)]
pub enum AesCbcEnc {
    Aes128(cbc::Encryptor<Aes128>),
    Aes192(cbc::Encryptor<Aes192>),
    Aes256(cbc::Encryptor<Aes256>),
}

impl AesCbcEnc {
    pub fn new(key: &[u8], iv: &[u8]) -> Result<Self, PrimitiveError> {
        check_iv16(iv)?;
        match key.len() {
            16 => Ok(Self::Aes128(cbc::Encryptor::new(
                GenericArray::from_slice(key),
                GenericArray::from_slice(iv),
            ))),
            24 => Ok(Self::Aes192(cbc::Encryptor::new(
                GenericArray::from_slice(key),
                GenericArray::from_slice(iv),
            ))),
            32 => Ok(Self::Aes256(cbc::Encryptor::new(
                GenericArray::from_slice(key),
                GenericArray::from_slice(iv),
            ))),
            n => Err(PrimitiveError::KeyLength(n)),
        }
    }

    /// Encrypts `buf` in place. `buf` must be a whole number of blocks.
    pub fn encrypt_blocks(&mut self, buf: &mut [u8]) {
        debug_assert_eq!(buf.len() % AES_BLOCK_SIZE, 0);
        for chunk in buf.chunks_exact_mut(AES_BLOCK_SIZE) {
            let block = GenericArray::from_mut_slice(chunk);
            match self {
                Self::Aes128(c) => c.encrypt_block_mut(block),
                Self::Aes192(c) => c.encrypt_block_mut(block),
                Self::Aes256(c) => c.encrypt_block_mut(block),
            }
        }
    }
}

/// One-shot AES-CBC decryption of the whole-block prefix of `src` into `dst`.
pub fn cbc_decrypt(key: &[u8], iv: &[u8], src: &[u8], dst: &mut [u8]) -> Result<(), PrimitiveError> {
    check_iv16(iv)?;
    let n = src.len() & !(AES_BLOCK_SIZE - 1);
    dst[..n].copy_from_slice(&src[..n]);

    macro_rules! run {
        ($cipher:ty) => {{
            let mut dec = cbc::Decryptor::<$cipher>::new(
                GenericArray::from_slice(key),
                GenericArray::from_slice(iv),
            );
            for chunk in dst[..n].chunks_exact_mut(AES_BLOCK_SIZE) {
                dec.decrypt_block_mut(GenericArray::from_mut_slice(chunk));
            }
        }};
    }
    match key.len() {
        16 => run!(Aes128),
        24 => run!(Aes192),
        32 => run!(Aes256),
        n => return Err(PrimitiveError::KeyLength(n)),
    }
    Ok(())
}

/// AES counter mode over `src` into `dst`.
///
/// A 16-byte IV is taken verbatim as the initial counter block; a 12-byte IV
/// is extended with a big-endian block counter starting at 1. The counter
/// field is the trailing 32 bits of the block in either case.
pub fn ctr_transform(key: &[u8], iv: &[u8], src: &[u8], dst: &mut [u8]) -> Result<(), PrimitiveError> {
    let mut block = [0u8; AES_BLOCK_SIZE];
    match iv.len() {
        16 => block.copy_from_slice(iv),
        12 => {
            block[..12].copy_from_slice(iv);
            block[15] = 1;
        }
        n => return Err(PrimitiveError::IvLength(n)),
    }
    let n = src.len();
    dst[..n].copy_from_slice(src);

    macro_rules! run {
        ($cipher:ty) => {{
            let mut ctr = ctr::Ctr32BE::<$cipher>::new(
                GenericArray::from_slice(key),
                GenericArray::from_slice(&block),
            );
            ctr.apply_keystream(&mut dst[..n]);
        }};
    }
    match key.len() {
        16 => run!(Aes128),
        24 => run!(Aes192),
        32 => run!(Aes256),
        n => return Err(PrimitiveError::KeyLength(n)),
    }
    Ok(())
}

/// Single-block AES-CFB-128 transform of up to one block of `src` into `dst`.
///
/// Both directions of the DOCSIS residual-block termination reduce to
/// `dst = E_K(iv) ^ src`; the caller picks which side the IV comes from.
pub fn cfb128_partial_block(
    key: &[u8],
    iv: &[u8; AES_BLOCK_SIZE],
    src: &[u8],
    dst: &mut [u8],
) -> Result<(), PrimitiveError> {
    debug_assert!(src.len() <= AES_BLOCK_SIZE);
    let cipher = Aes128Block::new(key)?;
    let mut keystream = *iv;
    cipher.encrypt_block(&mut keystream);
    for (i, (d, s)) in dst.iter_mut().zip(src).enumerate() {
        *d = keystream[i] ^ *s;
    }
    Ok(())
}
