//! Truncated HMAC-SHA256 tags.

use {
    crate::{
        error::{Error, Result},
        keys::{IV_SIZE, KEY_SIZE},
    },
    hmac::{
        digest::{Key, KeyInit},
        Hmac, Mac as _,
    },
    sha2::Sha256,
    subtle::ConstantTimeEq,
    zeroize::Zeroize,
};

/// The size in bytes of a truncated tag.
pub const MAC_SIZE: usize = 10;

/// A truncated HMAC-SHA256 tag.
pub type Tag = [u8; MAC_SIZE];

type HmacSha256 = Hmac<Sha256>;

fn new_hmac(key: &[u8; KEY_SIZE]) -> HmacSha256 {
    // HMAC zero-pads short keys to the block size, so padding
    // here yields the same MAC.
    let mut block = Key::<HmacSha256>::default();
    block[..KEY_SIZE].copy_from_slice(key);
    let mac = <HmacSha256 as KeyInit>::new(&block);
    block.as_mut_slice().zeroize();
    mac
}

fn truncate(mac: HmacSha256) -> Tag {
    let digest = mac.finalize().into_bytes();
    let mut tag = [0u8; MAC_SIZE];
    tag.copy_from_slice(&digest[..MAC_SIZE]);
    tag
}

/// Computes `HMAC-SHA256(key, data)[..MAC_SIZE]` in one shot.
pub fn truncated_hmac(key: &[u8; KEY_SIZE], data: &[u8]) -> Tag {
    let mut mac = new_hmac(key);
    mac.update(data);
    truncate(mac)
}

/// Compares two tags in constant time.
pub fn tags_equal(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}

/// Accumulates the message MAC, `HMAC-SHA256(mac_key, iv ||
/// ciphertext)`, one ciphertext chunk at a time.
#[derive(Clone)]
pub struct Mac {
    /// None once finalized.
    inner: Option<HmacSha256>,
}

impl Mac {
    /// Creates an accumulator already seeded with `iv`.
    pub fn new(key: &[u8; KEY_SIZE], iv: &[u8; IV_SIZE]) -> Self {
        let mut mac = new_hmac(key);
        mac.update(iv);
        Self { inner: Some(mac) }
    }

    /// Feeds the next chunk of ciphertext.
    pub fn update(&mut self, chunk: &[u8]) -> Result<()> {
        match &mut self.inner {
            Some(mac) => {
                mac.update(chunk);
                Ok(())
            }
            None => Err(Error::Finalized),
        }
    }

    /// Returns the truncated tag.
    ///
    /// The accumulator cannot be used afterward.
    pub fn finalize(&mut self) -> Result<Tag> {
        self.inner.take().map(truncate).ok_or(Error::Finalized)
    }

    /// Finalizes the accumulator and checks the result against
    /// `expected` in constant time.
    pub fn verify(&mut self, expected: &[u8]) -> Result<()> {
        let tag = self.finalize()?;
        if tags_equal(&tag, expected) {
            Ok(())
        } else {
            Err(Error::MacMismatch)
        }
    }

    /// Reports whether [`Mac::finalize`] has been called.
    pub fn is_finalized(&self) -> bool {
        self.inner.is_none()
    }
}
