extern crate alloc;

use {
    crate::{
        buf::Buf,
        cbc::{CbcDecryptor, BLOCK_SIZE},
        error::{Error, Result},
        io::Read,
        keys::{self, DerivedKeys},
        mac::{Mac, MAC_SIZE},
        media::MediaType,
    },
    alloc::vec::Vec,
    core::{cmp::min, mem},
    zeroize::Zeroizing,
};

/// The default read size used by [`Decryptor`].
pub const DEFAULT_READ_SIZE: usize = 8192;

enum State {
    /// The ciphertext has not been read yet.
    Pending,
    /// The ciphertext was authenticated and decrypted.
    Verified {
        plaintext: Zeroizing<Vec<u8>>,
        pos: usize,
    },
    /// Verification or decryption failed.
    Poisoned,
}

/// Decrypts a `ciphertext || trailer` stream.
///
/// No plaintext is released until the trailer has authenticated
/// the entire ciphertext. The first call to [`Decryptor::verify`]
/// (or the first read) drains the underlying stream, checks the
/// MAC and decrypts; the plaintext is then held in memory, so
/// memory use is proportional to the size of the message.
pub struct Decryptor<'a, R, const C: usize = DEFAULT_READ_SIZE>
where
    R: Read,
{
    /// The underlying ciphertext stream.
    stream: &'a mut R,
    keys: DerivedKeys,
    media: MediaType,
    state: State,
}

impl<'a, R, const C: usize> Decryptor<'a, R, C>
where
    R: Read + 'a,
{
    const VALID_READ_SIZE: () = assert!(C > 0, "read size must be positive");

    /// Creates a [`Decryptor`] that reads plaintext for `media`
    /// from `stream` using the media key `secret`.
    ///
    /// Nothing is read from `stream` until the first call to
    /// [`Decryptor::verify`] or [`Read::read`](crate::Read::read).
    pub fn new(stream: &'a mut R, secret: &[u8], media: MediaType) -> Result<Self> {
        #[allow(clippy::let_unit_value)]
        let () = Self::VALID_READ_SIZE;

        Ok(Decryptor {
            stream,
            keys: keys::derive(secret, media)?,
            media,
            state: State::Pending,
        })
    }

    /// Reads the entire ciphertext, authenticates it and decrypts
    /// it.
    ///
    /// It is idempotent: after the first call it returns the
    /// outcome of that call ([`Error::Poisoned`] if it failed).
    pub fn verify(&mut self) -> Result<()> {
        match self.state {
            State::Pending => {}
            State::Verified { .. } => return Ok(()),
            State::Poisoned => return Err(Error::Poisoned),
        }
        match self.open() {
            Ok(plaintext) => {
                self.state = State::Verified { plaintext, pos: 0 };
                Ok(())
            }
            Err(err) => {
                self.state = State::Poisoned;
                if err.is_corrupt() {
                    tracing::warn!(media = %self.media, error = %err, "rejected ciphertext");
                }
                Err(err)
            }
        }
    }

    /// Returns the length of the plaintext, once verified.
    pub fn plaintext_len(&self) -> Option<usize> {
        match &self.state {
            State::Verified { plaintext, .. } => Some(plaintext.len()),
            _ => None,
        }
    }

    /// Returns the read offset into the plaintext, once verified.
    pub fn position(&self) -> Option<usize> {
        match &self.state {
            State::Verified { pos, .. } => Some(*pos),
            _ => None,
        }
    }

    /// Moves the read offset to `to`, clamped to the end of the
    /// plaintext, and returns the new offset.
    ///
    /// The ciphertext is verified first if needed.
    pub fn seek(&mut self, to: usize) -> Result<usize> {
        self.verify()?;
        match &mut self.state {
            State::Verified { plaintext, pos } => {
                *pos = min(to, plaintext.len());
                Ok(*pos)
            }
            _ => Err(Error::Poisoned),
        }
    }

    /// Moves the read offset back to the start of the plaintext.
    pub fn rewind(&mut self) -> Result<()> {
        self.seek(0).map(|_| ())
    }

    fn open(&mut self) -> Result<Zeroizing<Vec<u8>>> {
        let mut mac = Mac::new(self.keys.mac_key(), self.keys.iv());
        let mut data = Zeroizing::new(Vec::new());
        let mut chunk = Buf::<C>::new();

        // Everything except the last MAC_SIZE bytes seen so far
        // is ciphertext and goes through the MAC. The withheld
        // tail becomes the trailer at EOF.
        let mut fed = 0;
        loop {
            chunk.reset();
            chunk.read_from(self.stream)?;
            data.extend_from_slice(chunk.remaining_slice());

            let end = data.len().saturating_sub(MAC_SIZE);
            if end > fed {
                mac.update(&data[fed..end])?;
                fed = end;
            }
            if !chunk.is_full() {
                break;
            }
        }

        let total = data.len();
        if total < MAC_SIZE {
            return Err(Error::InvalidLength(total));
        }
        let ct_len = total - MAC_SIZE;
        mac.verify(&data[ct_len..])?;
        data.truncate(ct_len);

        // Authenticated; from here on it is safe to decrypt.
        if ct_len == 0 || ct_len % BLOCK_SIZE != 0 {
            return Err(Error::UnalignedCiphertext(ct_len));
        }
        let mut cbc = CbcDecryptor::new(self.keys.cipher_key(), self.keys.iv());
        let (body, last) = data.split_at_mut(ct_len - BLOCK_SIZE);
        if !body.is_empty() {
            cbc.decrypt_blocks(body)?;
        }
        let n = body.len() + cbc.decrypt_final(last)?;
        data.truncate(n);

        tracing::debug!(
            media = %self.media,
            ciphertext = ct_len,
            plaintext = n,
            "decryption finished"
        );
        Ok(data)
    }

    fn do_read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.verify()?;
        match &mut self.state {
            State::Verified { plaintext, pos } => {
                let n = min(buf.len(), plaintext.len() - *pos);
                buf[..n].copy_from_slice(&plaintext[*pos..*pos + n]);
                *pos += n;
                Ok(n)
            }
            _ => Err(Error::Poisoned),
        }
    }

    /// Verifies the ciphertext and returns the whole plaintext.
    ///
    /// Bytes already read from the [`Decryptor`] are not
    /// returned.
    pub fn into_plaintext(mut self) -> Result<Vec<u8>> {
        self.verify()?;
        match &mut self.state {
            State::Verified { plaintext, pos } => {
                let mut out = mem::take(&mut **plaintext);
                out.drain(..*pos);
                Ok(out)
            }
            _ => Err(Error::Poisoned),
        }
    }
}

#[cfg(not(feature = "std"))]
#[cfg_attr(docsrs, doc(cfg(not(feature = "std"))))]
impl<'a, R, const C: usize> Read for Decryptor<'a, R, C>
where
    R: Read + 'a,
{
    #[inline]
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.do_read(buf)
    }
}

#[cfg(feature = "std")]
#[cfg_attr(docsrs, doc(cfg(feature = "std")))]
impl<'a, R, const C: usize> std::io::Read for Decryptor<'a, R, C>
where
    R: Read + 'a,
{
    #[inline]
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        crate::error::map_res(self.do_read(buf))
    }
}
