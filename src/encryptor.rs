extern crate alloc;

use {
    crate::{
        buf::Buf,
        cbc::{padded_len, CbcEncryptor, BLOCK_SIZE},
        error::{Error, Result},
        io::{Read, Write},
        keys,
        mac::{Mac, MAC_SIZE},
        media::MediaType,
        sidecar::Sidecar,
    },
    alloc::vec::Vec,
};

/// The default staging buffer size used by [`Encryptor`].
pub const DEFAULT_CHUNK_SIZE: usize = 8192;

/// Options for configuring an [`Encryptor`].
#[derive(Clone, Copy, Debug, Default)]
pub struct EncryptorOpts {
    sidecar: bool,
}

impl EncryptorOpts {
    /// Create the default set of options.
    pub const fn new() -> Self {
        Self { sidecar: false }
    }

    /// Also compute the sidecar while encrypting.
    ///
    /// Sidecars are meant for streamable media (see
    /// [`MediaType::is_streamable`]), but can be computed for any
    /// media type.
    ///
    /// By default, no sidecar is computed.
    pub fn with_sidecar(&mut self, sidecar: bool) -> &mut Self {
        self.sidecar = sidecar;
        self
    }

    /// Build the options.
    pub fn build(self) -> Self {
        self
    }
}

/// Encrypts a plaintext stream.
///
/// An [`Encryptor`] is itself a byte source: reading from it
/// pulls plaintext from the underlying stream and yields
/// `ciphertext || trailer`. At most `C` bytes of plaintext are
/// staged at a time.
pub struct Encryptor<'a, R, const C: usize = DEFAULT_CHUNK_SIZE>
where
    R: Read,
{
    /// The underlying plaintext stream.
    stream: &'a mut R,
    cbc: CbcEncryptor,
    mac: Mac,
    sidecar: Option<Sidecar>,
    /// Ciphertext not yet handed to the caller.
    buf: Buf<C>,
    /// The trailer, once the plaintext has been exhausted.
    trailer: Buf<MAC_SIZE>,
    media: MediaType,
    /// Plaintext bytes read from `stream`.
    consumed: u64,
    /// Ciphertext bytes produced, excluding the trailer.
    produced: u64,
    /// True once the trailer has been computed.
    finished: bool,
    /// True if a previous call failed.
    poisoned: bool,
}

impl<'a, R, const C: usize> Encryptor<'a, R, C>
where
    R: Read + 'a,
{
    const VALID_CHUNK_SIZE: () = assert!(
        C > 0 && C % BLOCK_SIZE == 0,
        "chunk size must be a positive multiple of the block size"
    );

    /// Returns the size in bytes of the output for a plaintext of
    /// `n` bytes, trailer included.
    pub const fn ciphertext_len(n: usize) -> usize {
        padded_len(n) + MAC_SIZE
    }

    /// Creates an [`Encryptor`] that encrypts `stream` for
    /// `media` with the media key `secret`.
    pub fn new(stream: &'a mut R, secret: &[u8], media: MediaType) -> Result<Self> {
        Self::new_with(stream, secret, media, EncryptorOpts::default())
    }

    /// Creates an [`Encryptor`] with the provided options.
    pub fn new_with(
        stream: &'a mut R,
        secret: &[u8],
        media: MediaType,
        opts: EncryptorOpts,
    ) -> Result<Self> {
        #[allow(clippy::let_unit_value)]
        let () = Self::VALID_CHUNK_SIZE;

        let keys = keys::derive(secret, media)?;
        Ok(Encryptor {
            stream,
            cbc: CbcEncryptor::new(keys.cipher_key(), keys.iv()),
            mac: Mac::new(keys.mac_key(), keys.iv()),
            sidecar: opts.sidecar.then(|| Sidecar::new(keys.mac_key())),
            buf: Buf::new(),
            trailer: Buf::new(),
            media,
            consumed: 0,
            produced: 0,
            finished: false,
            poisoned: false,
        })
    }

    /// Reports whether the plaintext has been exhausted and the
    /// trailer computed.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Returns the sidecar.
    ///
    /// It is `None` if no sidecar was requested or the plaintext
    /// has not been fully consumed yet.
    pub fn sidecar(&self) -> Option<&[u8]> {
        self.sidecar.as_ref()?.sidecar()
    }

    /// Consumes the [`Encryptor`], returning the sidecar under the
    /// same conditions as [`Encryptor::sidecar`].
    pub fn into_sidecar(self) -> Option<Vec<u8>> {
        match self.sidecar {
            Some(s) if s.is_finalized() => Some(s.into_bytes()),
            _ => None,
        }
    }

    /// Stages the next chunk of plaintext and encrypts it.
    fn pump(&mut self) -> Result<()> {
        self.buf.reset();
        let n = self.buf.read_from(self.stream)?;
        self.consumed += n as u64;

        if self.buf.is_full() {
            // C is block aligned, so a full buffer never needs
            // padding. The plaintext may end right here, in which
            // case the next pump produces a lone padding block.
            let ct = self.buf.as_mut_slice();
            self.cbc.encrypt_blocks(ct)?;
            self.mac.update(ct)?;
            if let Some(sidecar) = &mut self.sidecar {
                sidecar.feed(ct)?;
            }
            self.produced += ct.len() as u64;
            tracing::trace!(bytes = ct.len(), "encrypted chunk");
            return Ok(());
        }

        let len = self.buf.len();
        let n = self.cbc.encrypt_final(self.buf.with_capacity_mut(), len)?;
        self.buf.advance(n - len);

        let ct = self.buf.remaining_slice();
        self.mac.update(ct)?;
        if let Some(sidecar) = &mut self.sidecar {
            sidecar.feed(ct)?;
            sidecar.finalize();
        }
        self.produced += ct.len() as u64;

        let tag = self.mac.finalize()?;
        self.trailer.reset();
        if self.trailer.write(&tag)? != MAC_SIZE {
            return Err(Error::ShortWrite(MAC_SIZE));
        }
        self.finished = true;

        tracing::debug!(
            media = %self.media,
            plaintext = self.consumed,
            ciphertext = self.produced,
            sidecar = self.sidecar.is_some(),
            "encryption finished"
        );
        Ok(())
    }

    fn do_read(&mut self, out: &mut [u8]) -> Result<usize> {
        if self.poisoned {
            return Err(Error::Poisoned);
        }
        if out.is_empty() {
            return Ok(0);
        }
        loop {
            let n = self.buf.read(out)?;
            if n > 0 {
                return Ok(n);
            }
            if self.finished {
                return self.trailer.read(out);
            }
            if let Err(err) = self.pump() {
                self.poisoned = true;
                return Err(err);
            }
        }
    }
}

#[cfg(not(feature = "std"))]
#[cfg_attr(docsrs, doc(cfg(not(feature = "std"))))]
impl<'a, R, const C: usize> Read for Encryptor<'a, R, C>
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
impl<'a, R, const C: usize> std::io::Read for Encryptor<'a, R, C>
where
    R: Read + 'a,
{
    #[inline]
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        crate::error::map_res(self.do_read(buf))
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{cbc::CbcDecryptor, mac::truncated_hmac},
        alloc::vec,
    };

    const SECRET: [u8; 32] = [0u8; 32];

    fn read_all<R: Read>(r: &mut R) -> Vec<u8> {
        let mut out = Vec::new();
        r.write_to(&mut out).unwrap();
        out
    }

    /// Reads in deliberately awkward sizes.
    fn read_odd<R: Read>(r: &mut R) -> Vec<u8> {
        let mut out = Vec::new();
        let mut buf = [0u8; 37];
        let mut i = 0;
        loop {
            i = (i % 37) + 1;
            let n = r.read(&mut buf[..i]).unwrap();
            if n == 0 {
                return out;
            }
            out.extend_from_slice(&buf[..n]);
        }
    }

    fn encrypt<const C: usize>(pt: &[u8], media: MediaType) -> Vec<u8> {
        let mut src = pt;
        let mut enc = Encryptor::<_, C>::new(&mut src, &SECRET, media).unwrap();
        read_all(&mut enc)
    }

    /// Encrypts `pt` in one CBC call, as a reference.
    fn reference(pt: &[u8], media: MediaType) -> Vec<u8> {
        let keys = keys::derive(&SECRET, media).unwrap();
        let mut ct = vec![0u8; padded_len(pt.len())];
        ct[..pt.len()].copy_from_slice(pt);
        CbcEncryptor::new(keys.cipher_key(), keys.iv())
            .encrypt_final(&mut ct, pt.len())
            .unwrap();

        let mut signed = keys.iv().to_vec();
        signed.extend_from_slice(&ct);
        ct.extend_from_slice(&truncated_hmac(keys.mac_key(), &signed));
        ct
    }

    #[test]
    fn test_hello_world_length() {
        let out = encrypt::<DEFAULT_CHUNK_SIZE>(b"hello world", MediaType::Image);
        assert_eq!(out.len(), 26);
        assert_eq!(out, reference(b"hello world", MediaType::Image));
    }

    #[test]
    fn test_matches_reference_across_chunk_sizes() {
        for len in [0usize, 1, 15, 16, 17, 31, 32, 33, 64, 100, 1000] {
            let pt: Vec<u8> = (0..len).map(|i| i as u8).collect();
            let want = reference(&pt, MediaType::Document);
            assert_eq!(encrypt::<16>(&pt, MediaType::Document), want, "len={}", len);
            assert_eq!(encrypt::<32>(&pt, MediaType::Document), want, "len={}", len);
            assert_eq!(
                encrypt::<DEFAULT_CHUNK_SIZE>(&pt, MediaType::Document),
                want,
                "len={}",
                len
            );
        }
    }

    #[test]
    fn test_odd_reads() {
        let pt = vec![0xC3u8; 5000];
        let mut src = &pt[..];
        let mut enc = Encryptor::<_, 64>::new(&mut src, &SECRET, MediaType::Video)
            .unwrap();
        assert_eq!(read_odd(&mut enc), reference(&pt, MediaType::Video));
        assert!(enc.is_finished());
        assert_eq!(enc.read(&mut [0u8; 8]).unwrap(), 0);
    }

    #[test]
    fn test_aligned_plaintext_gets_pad_block() {
        let pt = [0x11u8; 64];
        let out = encrypt::<64>(&pt, MediaType::Image);
        assert_eq!(out.len(), 64 + 16 + MAC_SIZE);

        let keys = keys::derive(&SECRET, MediaType::Image).unwrap();
        let mut ct = out[..80].to_vec();
        CbcDecryptor::new(keys.cipher_key(), keys.iv())
            .decrypt_blocks(&mut ct)
            .unwrap();
        assert_eq!(&ct[64..], &[16u8; 16]);
    }

    #[test]
    fn test_ciphertext_len() {
        type E<'a> = Encryptor<'a, &'a [u8]>;
        assert_eq!(E::ciphertext_len(0), 26);
        assert_eq!(E::ciphertext_len(11), 26);
        assert_eq!(E::ciphertext_len(16), 42);
        assert_eq!(E::ciphertext_len(200_000), 200_016 + MAC_SIZE);
    }

    #[test]
    fn test_sidecar_available_only_at_end() {
        let pt = vec![7u8; 3 * DEFAULT_CHUNK_SIZE];
        let mut src = &pt[..];
        let opts = EncryptorOpts::new().with_sidecar(true).build();
        let mut enc =
            Encryptor::<_>::new_with(&mut src, &SECRET, MediaType::Audio, opts)
                .unwrap();

        let mut first = [0u8; 100];
        enc.read(&mut first).unwrap();
        assert!(enc.sidecar().is_none());

        let rest = read_all(&mut enc);
        let ct_len = 100 + rest.len() - MAC_SIZE;
        let sidecar = enc.sidecar().unwrap().to_vec();
        assert_eq!(sidecar.len(), Sidecar::len_for(ct_len));
        assert_eq!(enc.into_sidecar(), Some(sidecar));
    }

    #[test]
    fn test_no_sidecar_by_default() {
        let mut src = &b"abc"[..];
        let mut enc = Encryptor::<_>::new(&mut src, &SECRET, MediaType::Audio)
            .unwrap();
        read_all(&mut enc);
        assert!(enc.sidecar().is_none());
        assert!(enc.into_sidecar().is_none());
    }

    #[test]
    fn test_invalid_key() {
        let mut src = &b"abc"[..];
        assert!(matches!(
            Encryptor::<_>::new(&mut src, &[0u8; 16], MediaType::Image),
            Err(Error::InvalidKeyLength(16))
        ));
    }

    struct FailingReader;

    impl Read for FailingReader {
        fn read(&mut self, _buf: &mut [u8]) -> Result<usize> {
            Err(Error::UnexpectedEof(0))
        }
    }

    #[test]
    fn test_source_error_poisons() {
        let mut src = FailingReader;
        let mut enc = Encryptor::<_>::new(&mut src, &SECRET, MediaType::Image)
            .unwrap();
        let mut buf = [0u8; 16];
        assert!(matches!(enc.read(&mut buf), Err(Error::UnexpectedEof(0))));
        assert!(matches!(enc.read(&mut buf), Err(Error::Poisoned)));
    }
}
