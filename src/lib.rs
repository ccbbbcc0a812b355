//! **media-crypt** implements streaming encryption for media
//! blobs: images, audio, video and documents.
//!
//! A random 32-byte *media key* is expanded with HKDF-SHA256
//! (expand only, using a per-media-type `info` label) into
//!
//! ```text
//!    iv  cipher key  MAC key  ref key
//!    16      32         32       32   bytes
//! ```
//!
//! The plaintext is encrypted with AES-256-CBC and PKCS7 padding
//! and followed by a 10-byte trailer:
//!
//! ```text
//!    ciphertext = AES-256-CBC(cipher key, iv, plaintext)
//!    trailer    = HMAC-SHA256(MAC key, iv || ciphertext)[..10]
//! ```
//!
//! The ref key is never used.
//!
//! Audio and video can additionally carry a *sidecar*: one
//! truncated HMAC per 64 KiB of ciphertext (see [`Sidecar`]) that
//! lets a player verify the range it is about to play without
//! downloading the rest of the file.
//!
//! Encryption is a single left-to-right pass ([`Encryptor`]).
//! Decryption ([`Decryptor`]) is fail-closed: the whole message
//! is authenticated before a single byte of plaintext is
//! released.
//!
//! ```
//! use media_crypt::{decrypt, encrypt, MediaType};
//!
//! let secret = [0u8; 32];
//! let mut ciphertext = Vec::new();
//! encrypt(&mut &b"hello world"[..], &mut ciphertext, &secret, MediaType::Image)?;
//! assert_eq!(ciphertext.len(), 26);
//!
//! let mut plaintext = Vec::new();
//! decrypt(&mut &ciphertext[..], &mut plaintext, &secret, MediaType::Image)?;
//! assert_eq!(plaintext, b"hello world");
//! # Ok::<(), media_crypt::Error>(())
//! ```

#![deny(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs, rust_2018_idioms)]
#![cfg_attr(not(any(feature = "std", test)), no_std)]

extern crate alloc;

mod buf;
pub mod cbc;
mod decryptor;
mod encryptor;
mod error;
mod io;
pub mod keys;
pub mod mac;
mod media;
pub mod sidecar;

pub use decryptor::*;
pub use encryptor::*;
pub use error::*;
pub use io::*;
pub use keys::{DerivedKeys, MEDIA_KEY_SIZE};
pub use mac::MAC_SIZE;
pub use media::*;
pub use sidecar::Sidecar;

use alloc::vec::Vec;

/// Expands `secret` into the key material for `media`.
///
/// See [`keys::derive`].
pub fn derive_keys(secret: &[u8], media: MediaType) -> Result<DerivedKeys> {
    keys::derive(secret, media)
}

/// Encrypts everything read from `src` and writes
/// `ciphertext || trailer` to `dst`.
///
/// It returns the number of bytes written.
pub fn encrypt<R, W>(
    src: &mut R,
    dst: &mut W,
    secret: &[u8],
    media: MediaType,
) -> Result<usize>
where
    R: Read,
    W: Write + ?Sized,
{
    let mut enc = Encryptor::<_>::new(src, secret, media)?;
    let n = enc.write_to(dst)?;
    dst.flush()?;
    Ok(n)
}

/// Like [`encrypt`], but also returns the sidecar.
pub fn encrypt_with_sidecar<R, W>(
    src: &mut R,
    dst: &mut W,
    secret: &[u8],
    media: MediaType,
) -> Result<(usize, Vec<u8>)>
where
    R: Read,
    W: Write + ?Sized,
{
    let opts = EncryptorOpts::new().with_sidecar(true).build();
    let mut enc = Encryptor::<_>::new_with(src, secret, media, opts)?;
    let n = enc.write_to(dst)?;
    dst.flush()?;
    // write_to only returns once the trailer has been produced.
    let sidecar = enc.into_sidecar().ok_or(Error::Poisoned)?;
    Ok((n, sidecar))
}

/// Authenticates and decrypts `ciphertext || trailer` read from
/// `src`, writing the plaintext to `dst`.
///
/// Nothing is written to `dst` unless authentication succeeds.
/// It returns the number of bytes written.
pub fn decrypt<R, W>(
    src: &mut R,
    dst: &mut W,
    secret: &[u8],
    media: MediaType,
) -> Result<usize>
where
    R: Read,
    W: Write + ?Sized,
{
    let mut dec = Decryptor::<_>::new(src, secret, media)?;
    dec.verify()?;
    let n = dec.write_to(dst)?;
    dst.flush()?;
    Ok(n)
}

/// Computes the sidecar of media that has already been
/// encrypted.
///
/// `encrypted` is `ciphertext || trailer` as produced by
/// [`encrypt`]. The trailer is not checked.
pub fn sidecar_for_encrypted(
    encrypted: &[u8],
    secret: &[u8],
    media: MediaType,
) -> Result<Vec<u8>> {
    let n = encrypted
        .len()
        .checked_sub(MAC_SIZE)
        .ok_or(Error::InvalidLength(encrypted.len()))?;
    let keys = keys::derive(secret, media)?;
    Sidecar::from_reader(&mut &encrypted[..n], keys.mac_key())
}
