//! Sidecar generation.
//!
//! A sidecar lets a media player verify a byte range of the
//! ciphertext without downloading the whole file. Window `i`
//! covers
//!
//! ```text
//!    ciphertext[i*64K .. min(L, i*64K + 64K + 16)]
//! ```
//!
//! so every window shares its last 16 bytes with the start of the
//! next one (that is, the CBC chain block a player needs to start
//! decrypting there). The sidecar is the concatenation of the
//! truncated HMAC of each window, one per started 64 KiB of
//! ciphertext.

extern crate alloc;

use {
    crate::{
        error::{Error, Result},
        io::Read,
        keys::KEY_SIZE,
        mac::{truncated_hmac, MAC_SIZE},
    },
    alloc::vec::Vec,
    core::cmp::min,
    zeroize::Zeroize,
};

/// The distance between the starts of two consecutive windows.
pub const WINDOW_STRIDE: usize = 1 << 16;

/// The number of bytes a window shares with the next window.
pub const WINDOW_OVERLAP: usize = 16;

/// The length of a full window.
pub const WINDOW_SIZE: usize = WINDOW_STRIDE + WINDOW_OVERLAP;

/// Incrementally builds a sidecar from ciphertext.
///
/// Feeding the ciphertext in one call or in many calls of any
/// size produces the same sidecar.
pub struct Sidecar {
    mac_key: [u8; KEY_SIZE],
    /// Ciphertext starting at the next window's first byte.
    buf: Vec<u8>,
    /// Concatenated tags.
    out: Vec<u8>,
    /// Total number of ciphertext bytes fed.
    total: u64,
    finalized: bool,
}

impl Sidecar {
    /// Creates an empty sidecar keyed with `mac_key`.
    pub fn new(mac_key: &[u8; KEY_SIZE]) -> Self {
        Self {
            mac_key: *mac_key,
            buf: Vec::new(),
            out: Vec::new(),
            total: 0,
            finalized: false,
        }
    }

    /// Returns the size in bytes of the sidecar for a ciphertext
    /// of `n` bytes (excluding the trailer).
    pub const fn len_for(n: usize) -> usize {
        n.div_ceil(WINDOW_STRIDE) * MAC_SIZE
    }

    /// Computes the sidecar of the ciphertext read from `src`.
    ///
    /// This is the two-pass mode, for media that has already
    /// been encrypted. `src` must not include the trailer.
    pub fn from_reader<R: Read + ?Sized>(
        src: &mut R,
        mac_key: &[u8; KEY_SIZE],
    ) -> Result<Vec<u8>> {
        let mut sidecar = Sidecar::new(mac_key);
        let mut chunk = [0u8; 8192];
        loop {
            let n = src.read(&mut chunk)?;
            if n == 0 {
                break;
            }
            sidecar.feed(&chunk[..n])?;
        }
        sidecar.finalize();
        Ok(sidecar.into_bytes())
    }

    /// Feeds the next chunk of ciphertext.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<()> {
        if self.finalized {
            return Err(Error::Finalized);
        }
        self.buf.extend_from_slice(chunk);
        self.total += chunk.len() as u64;

        let mut start = 0;
        while self.buf.len() - start >= WINDOW_SIZE {
            let tag =
                truncated_hmac(&self.mac_key, &self.buf[start..start + WINDOW_SIZE]);
            self.out.extend_from_slice(&tag);
            start += WINDOW_STRIDE;
        }
        // Everything left of the next window is unreachable.
        self.buf.drain(..start);
        Ok(())
    }

    /// Tags the remaining buffered windows and returns the
    /// complete sidecar.
    ///
    /// Calling it more than once returns the same bytes.
    pub fn finalize(&mut self) -> &[u8] {
        if !self.finalized {
            let mut start = 0;
            while start < self.buf.len() {
                let end = min(self.buf.len(), start + WINDOW_SIZE);
                let tag = truncated_hmac(&self.mac_key, &self.buf[start..end]);
                self.out.extend_from_slice(&tag);
                start += WINDOW_STRIDE;
            }
            self.buf.zeroize();
            self.buf = Vec::new();
            self.finalized = true;
            tracing::trace!(
                ciphertext = self.total,
                tags = self.out.len() / MAC_SIZE,
                "sidecar finalized"
            );
        }
        &self.out
    }

    /// Returns the sidecar, or `None` if it has not been
    /// finalized yet.
    pub fn sidecar(&self) -> Option<&[u8]> {
        self.finalized.then_some(&self.out[..])
    }

    /// Reports whether [`Sidecar::finalize`] has been called.
    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Returns the tags produced so far.
    pub fn into_bytes(mut self) -> Vec<u8> {
        core::mem::take(&mut self.out)
    }
}

impl Drop for Sidecar {
    fn drop(&mut self) {
        self.mac_key.zeroize();
        self.buf.zeroize();
    }
}
