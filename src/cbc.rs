//! AES-256-CBC with explicit chaining.
//!
//! CBC is built by hand on top of the raw block primitive:
//!
//! ```text
//!    encrypt: c_i = E(k, p_i ^ c_{i-1})
//!    decrypt: p_i = D(k, c_i) ^ c_{i-1}
//!    c_{-1} = iv
//! ```
//!
//! The chain state lives in [`CbcEncryptor`]/[`CbcDecryptor`] and
//! advances one block at a time, so a message can be processed in
//! any number of block-aligned calls followed by one final call
//! that adds or removes the PKCS7 padding.

use {
    crate::{
        error::{Error, Result},
        keys::{IV_SIZE, KEY_SIZE},
    },
    aes::{Aes256Dec, Aes256Enc, Block},
    cipher::{BlockDecrypt, BlockEncrypt, BlockSizeUser, KeyInit},
    generic_array::GenericArray,
    typenum::Unsigned,
    zeroize::Zeroize,
};

/// The AES block size in bytes.
pub const BLOCK_SIZE: usize = <Aes256Enc as BlockSizeUser>::BlockSize::USIZE;

/// Returns the length of `n` bytes of plaintext after PKCS7
/// padding.
///
/// Padding is always added, so an aligned input grows by a full
/// block.
pub const fn padded_len(n: usize) -> usize {
    n + (BLOCK_SIZE - n % BLOCK_SIZE)
}

/// Returns the length of `block` with its PKCS7 padding removed.
pub fn pkcs7_unpad(block: &[u8]) -> Result<usize> {
    let p = match block.last() {
        Some(&p) => p as usize,
        None => return Err(Error::InvalidPadding),
    };
    if p == 0 || p > BLOCK_SIZE || p > block.len() {
        return Err(Error::InvalidPadding);
    }
    let pad = &block[block.len() - p..];
    if pad.iter().any(|&b| b as usize != p) {
        return Err(Error::InvalidPadding);
    }
    Ok(block.len() - p)
}

fn check_aligned(buf: &[u8]) -> Result<()> {
    if buf.is_empty() || buf.len() % BLOCK_SIZE != 0 {
        return Err(Error::UnalignedInput(buf.len()));
    }
    Ok(())
}

fn xor_in_place(dst: &mut [u8], src: &[u8]) {
    for (d, s) in dst.iter_mut().zip(src) {
        *d ^= s;
    }
}

/// Encrypts block-aligned plaintext in CBC mode.
pub struct CbcEncryptor {
    cipher: Aes256Enc,
    /// The previous ciphertext block.
    chain: Block,
}

impl CbcEncryptor {
    /// Creates an encryptor whose chain starts at `iv`.
    pub fn new(key: &[u8; KEY_SIZE], iv: &[u8; IV_SIZE]) -> Self {
        Self {
            cipher: Aes256Enc::new(GenericArray::from_slice(key)),
            chain: *Block::from_slice(iv),
        }
    }

    /// Returns the current chain state: the IV before the first
    /// call, the last ciphertext block afterward.
    pub fn chain(&self) -> &[u8] {
        &self.chain
    }

    fn step(&mut self, block: &mut [u8]) {
        let block = Block::from_mut_slice(block);
        xor_in_place(block, &self.chain);
        self.cipher.encrypt_block(block);
        self.chain = *block;
    }

    /// Encrypts `buf` in place.
    ///
    /// `buf` must be a non-empty multiple of [`BLOCK_SIZE`].
    pub fn encrypt_blocks(&mut self, buf: &mut [u8]) -> Result<()> {
        check_aligned(buf)?;
        for block in buf.chunks_exact_mut(BLOCK_SIZE) {
            self.step(block);
        }
        Ok(())
    }

    /// Pads `buf[..len]` and encrypts it in place, returning the
    /// padded length.
    ///
    /// `buf` must have room for [`padded_len`]`(len)` bytes. The
    /// output is never empty.
    pub fn encrypt_final(&mut self, buf: &mut [u8], len: usize) -> Result<usize> {
        let n = padded_len(len);
        if buf.len() < n {
            return Err(Error::ShortBuffer(n));
        }
        let p = (n - len) as u8;
        buf[len..n].fill(p);
        self.encrypt_blocks(&mut buf[..n])?;
        Ok(n)
    }
}

impl Drop for CbcEncryptor {
    fn drop(&mut self) {
        self.chain.as_mut_slice().zeroize();
    }
}

/// Decrypts block-aligned ciphertext in CBC mode.
pub struct CbcDecryptor {
    cipher: Aes256Dec,
    /// The previous ciphertext block.
    chain: Block,
}

impl CbcDecryptor {
    /// Creates a decryptor whose chain starts at `iv`.
    pub fn new(key: &[u8; KEY_SIZE], iv: &[u8; IV_SIZE]) -> Self {
        Self {
            cipher: Aes256Dec::new(GenericArray::from_slice(key)),
            chain: *Block::from_slice(iv),
        }
    }

    /// Returns the current chain state.
    pub fn chain(&self) -> &[u8] {
        &self.chain
    }

    fn step(&mut self, block: &mut [u8]) {
        let block = Block::from_mut_slice(block);
        let next = *block;
        self.cipher.decrypt_block(block);
        xor_in_place(block, &self.chain);
        self.chain = next;
    }

    /// Decrypts `buf` in place.
    ///
    /// `buf` must be a non-empty multiple of [`BLOCK_SIZE`].
    pub fn decrypt_blocks(&mut self, buf: &mut [u8]) -> Result<()> {
        check_aligned(buf)?;
        for block in buf.chunks_exact_mut(BLOCK_SIZE) {
            self.step(block);
        }
        Ok(())
    }

    /// Decrypts `buf` in place and strips its PKCS7 padding,
    /// returning the length of the plaintext.
    pub fn decrypt_final(&mut self, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() || buf.len() % BLOCK_SIZE != 0 {
            return Err(Error::UnalignedCiphertext(buf.len()));
        }
        self.decrypt_blocks(buf)?;
        pkcs7_unpad(buf)
    }
}

impl Drop for CbcDecryptor {
    fn drop(&mut self) {
        self.chain.as_mut_slice().zeroize();
    }
}
