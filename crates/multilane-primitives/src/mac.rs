//! Incremental MAC lane state: HMAC over the supported digests, plus
//! AES-XCBC-MAC (RFC 3566) with streaming updates.
//!
//! Each state accepts arbitrary-length `update` calls so a lane engine can
//! feed it in scheduler-chosen increments, then finalizes into a truncated
//! tag.

use aes::Aes128;
use aes::cipher::{BlockEncrypt, KeyInit};
use cipher::generic_array::GenericArray;
use hmac::{Hmac, Mac};
use md5::Md5;
use sha1::Sha1;
use sha2::{Sha224, Sha256, Sha384, Sha512};

use crate::PrimitiveError;
use crate::aes::AES_BLOCK_SIZE;

/// MAC algorithm selector for [`MacState::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacAlg {
    HmacSha1,
    HmacSha224,
    HmacSha256,
    HmacSha384,
    HmacSha512,
    HmacMd5,
    AesXcbc,
}

impl MacAlg {
    /// The truncated tag length produced for this algorithm.
    pub const fn tag_len(self) -> usize {
        match self {
            Self::HmacSha1 => 12,
            Self::HmacSha224 => 14,
            Self::HmacSha256 => 16,
            Self::HmacSha384 => 24,
            Self::HmacSha512 => 32,
            Self::HmacMd5 => 12,
            Self::AesXcbc => 12,
        }
    }
}

/// Streaming AES-XCBC-MAC-96 state.
///
/// K1/K2/K3 are derived from the key by encrypting the 0x01/0x02/0x03
/// constant blocks; K1 keys the chained block encryption, K2/K3 whiten the
/// final (aligned/padded) block. The last block is held back until
/// finalization so the two final-block rules can be applied.
pub struct XcbcMac {
    cipher: Aes128,
    k2: [u8; AES_BLOCK_SIZE],
    k3: [u8; AES_BLOCK_SIZE],
    state: [u8; AES_BLOCK_SIZE],
    buf: [u8; AES_BLOCK_SIZE],
    buf_len: usize,
}

impl XcbcMac {
    pub fn new(key: &[u8]) -> Result<Self, PrimitiveError> {
        if key.len() != AES_BLOCK_SIZE {
            return Err(PrimitiveError::KeyLength(key.len()));
        }
        let master = Aes128::new(GenericArray::from_slice(key));
        let mut k1 = [0x01u8; AES_BLOCK_SIZE];
        let mut k2 = [0x02u8; AES_BLOCK_SIZE];
        let mut k3 = [0x03u8; AES_BLOCK_SIZE];
        master.encrypt_block(GenericArray::from_mut_slice(&mut k1));
        master.encrypt_block(GenericArray::from_mut_slice(&mut k2));
        master.encrypt_block(GenericArray::from_mut_slice(&mut k3));
        Ok(Self {
            cipher: Aes128::new(GenericArray::from_slice(&k1)),
            k2,
            k3,
            state: [0u8; AES_BLOCK_SIZE],
            buf: [0u8; AES_BLOCK_SIZE],
            buf_len: 0,
        })
    }

    fn absorb(&mut self, block: &[u8]) {
        for (s, b) in self.state.iter_mut().zip(block) {
            *s ^= *b;
        }
        self.cipher.encrypt_block(GenericArray::from_mut_slice(&mut self.state));
    }

    pub fn update(&mut self, mut data: &[u8]) {
        if self.buf_len > 0 {
            let need = AES_BLOCK_SIZE - self.buf_len;
            // Only drain the buffer once more input is pending; the final
            // block must stay buffered for the K2/K3 rules.
            if data.len() > need {
                let (head, rest) = data.split_at(need);
                self.buf[self.buf_len..].copy_from_slice(head);
                let block = self.buf;
                self.absorb(&block);
                self.buf_len = 0;
                data = rest;
            } else {
                self.buf[self.buf_len..self.buf_len + data.len()].copy_from_slice(data);
                self.buf_len += data.len();
                return;
            }
        }
        while data.len() > AES_BLOCK_SIZE {
            let (block, rest) = data.split_at(AES_BLOCK_SIZE);
            self.absorb(block);
            data = rest;
        }
        self.buf[..data.len()].copy_from_slice(data);
        self.buf_len = data.len();
    }

    pub fn finalize(mut self) -> [u8; AES_BLOCK_SIZE] {
        let mut last = [0u8; AES_BLOCK_SIZE];
        if self.buf_len == AES_BLOCK_SIZE {
            last.copy_from_slice(&self.buf);
            for (l, k) in last.iter_mut().zip(self.k2) {
                *l ^= k;
            }
        } else {
            last[..self.buf_len].copy_from_slice(&self.buf[..self.buf_len]);
            last[self.buf_len] = 0x80;
            for (l, k) in last.iter_mut().zip(self.k3) {
                *l ^= k;
            }
        }
        self.absorb(&last);
        self.state
    }
}

/// One MAC lane: an incremental keyed state for any of the supported
/// algorithms.
pub enum MacState {
    Sha1(Hmac<Sha1>),
    Sha224(Hmac<Sha224>),
    Sha256(Hmac<Sha256>),
    Sha384(Hmac<Sha384>),
    Sha512(Hmac<Sha512>),
    Md5(Hmac<Md5>),
    Xcbc(XcbcMac),
}

impl MacState {
    pub fn new(alg: MacAlg, key: &[u8]) -> Result<Self, PrimitiveError> {
        let bad_key = |_| PrimitiveError::KeyLength(key.len());
        Ok(match alg {
            MacAlg::HmacSha1 => Self::Sha1(KeyInit::new_from_slice(key).map_err(bad_key)?),
            MacAlg::HmacSha224 => Self::Sha224(KeyInit::new_from_slice(key).map_err(bad_key)?),
            MacAlg::HmacSha256 => Self::Sha256(KeyInit::new_from_slice(key).map_err(bad_key)?),
            MacAlg::HmacSha384 => Self::Sha384(KeyInit::new_from_slice(key).map_err(bad_key)?),
            MacAlg::HmacSha512 => Self::Sha512(KeyInit::new_from_slice(key).map_err(bad_key)?),
            MacAlg::HmacMd5 => Self::Md5(KeyInit::new_from_slice(key).map_err(bad_key)?),
            MacAlg::AesXcbc => Self::Xcbc(XcbcMac::new(key)?),
        })
    }

    pub fn update(&mut self, data: &[u8]) {
        match self {
            Self::Sha1(m) => m.update(data),
            Self::Sha224(m) => m.update(data),
            Self::Sha256(m) => m.update(data),
            Self::Sha384(m) => m.update(data),
            Self::Sha512(m) => m.update(data),
            Self::Md5(m) => m.update(data),
            Self::Xcbc(m) => m.update(data),
        }
    }

    /// Finalizes and writes the tag truncated to `tag.len()` bytes.
    pub fn finalize_into(self, tag: &mut [u8]) {
        match self {
            Self::Sha1(m) => copy_tag(m.finalize().into_bytes().as_slice(), tag),
            Self::Sha224(m) => copy_tag(m.finalize().into_bytes().as_slice(), tag),
            Self::Sha256(m) => copy_tag(m.finalize().into_bytes().as_slice(), tag),
            Self::Sha384(m) => copy_tag(m.finalize().into_bytes().as_slice(), tag),
            Self::Sha512(m) => copy_tag(m.finalize().into_bytes().as_slice(), tag),
            Self::Md5(m) => copy_tag(m.finalize().into_bytes().as_slice(), tag),
            Self::Xcbc(m) => copy_tag(&m.finalize(), tag),
        }
    }
}

fn copy_tag(digest: &[u8], tag: &mut [u8]) {
    let n = tag.len().min(digest.len());
    tag[..n].copy_from_slice(&digest[..n]);
}
