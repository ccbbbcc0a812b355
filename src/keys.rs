//! The key schedule: media key to per-message key material.

use {
    crate::{
        error::{Error, Result},
        media::MediaType,
    },
    core::fmt,
    hkdf::Hkdf,
    rand_core::{CryptoRng, RngCore},
    sha2::Sha256,
    zeroize::Zeroize,
};

/// The size in bytes of a media key.
pub const MEDIA_KEY_SIZE: usize = 32;

/// The size in bytes of the derived IV.
pub const IV_SIZE: usize = 16;

/// The size in bytes of the derived cipher and MAC keys.
pub const KEY_SIZE: usize = 32;

/// IV || cipher key || MAC key || ref key.
const EXPANDED_SIZE: usize = IV_SIZE + 3 * KEY_SIZE;

/// Per-message key material expanded from a media key.
///
/// The contents are wiped when the value is dropped.
#[derive(Clone, Eq, PartialEq)]
pub struct DerivedKeys {
    iv: [u8; IV_SIZE],
    cipher_key: [u8; KEY_SIZE],
    mac_key: [u8; KEY_SIZE],
}

impl DerivedKeys {
    /// Returns the CBC initialization vector, which also seeds
    /// the message MAC.
    pub fn iv(&self) -> &[u8; IV_SIZE] {
        &self.iv
    }

    /// Returns the AES-256 key.
    pub fn cipher_key(&self) -> &[u8; KEY_SIZE] {
        &self.cipher_key
    }

    /// Returns the HMAC-SHA256 key used for both the trailer and
    /// the sidecar.
    pub fn mac_key(&self) -> &[u8; KEY_SIZE] {
        &self.mac_key
    }
}

impl fmt::Debug for DerivedKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DerivedKeys").finish_non_exhaustive()
    }
}

impl Drop for DerivedKeys {
    fn drop(&mut self) {
        self.iv.zeroize();
        self.cipher_key.zeroize();
        self.mac_key.zeroize();
    }
}

/// Expands `secret` into the key material for `media`.
///
/// `secret` is used directly as the HKDF pseudorandom key (there
/// is no extract step). It must be exactly [`MEDIA_KEY_SIZE`]
/// bytes.
pub fn derive(secret: &[u8], media: MediaType) -> Result<DerivedKeys> {
    if secret.len() != MEDIA_KEY_SIZE {
        return Err(Error::InvalidKeyLength(secret.len()));
    }
    let kdf = Hkdf::<Sha256>::from_prk(secret)
        .map_err(|_| Error::InvalidKeyLength(secret.len()))?;

    let mut okm = [0u8; EXPANDED_SIZE];
    kdf.expand(media.info(), &mut okm)?;

    let mut keys = DerivedKeys {
        iv: [0u8; IV_SIZE],
        cipher_key: [0u8; KEY_SIZE],
        mac_key: [0u8; KEY_SIZE],
    };
    let (iv, rest) = okm.split_at(IV_SIZE);
    let (cipher_key, rest) = rest.split_at(KEY_SIZE);
    let (mac_key, _ref_key) = rest.split_at(KEY_SIZE);
    keys.iv.copy_from_slice(iv);
    keys.cipher_key.copy_from_slice(cipher_key);
    keys.mac_key.copy_from_slice(mac_key);

    // Wipes the ref key along with everything else.
    okm.zeroize();
    Ok(keys)
}

/// Generates a fresh media key.
pub fn generate_secret<R: RngCore + CryptoRng>(
    rng: &mut R,
) -> Result<[u8; MEDIA_KEY_SIZE]> {
    let mut secret = [0u8; MEDIA_KEY_SIZE];
    rng.try_fill_bytes(&mut secret)?;
    Ok(secret)
}
