use crate::error::{Error, Result};

/// A source of plaintext or ciphertext bytes.
///
/// Both pipelines pull their input through this trait and are
/// themselves sources, so an [`Encryptor`](crate::Encryptor) can
/// feed a [`Decryptor`](crate::Decryptor) directly. A return value
/// of zero means the input is exhausted.
///
/// With the `std` feature every [`std::io::Read`] is a [`Read`].
pub trait Read {
    /// Reads up to `buf.len()` bytes into `buf`.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Drains the source into `w`, returning the number of bytes
    /// copied.
    fn write_to<W: Write + ?Sized>(&mut self, w: &mut W) -> Result<usize> {
        let mut buf = [0u8; 32 * 1024];
        let mut len = 0;
        loop {
            let nr = self.read(&mut buf)?;
            if nr == 0 {
                break;
            }
            w.write_all(&buf[..nr])?;
            len += nr;
        }
        Ok(len)
    }
}

/// A sink for ciphertext or verified plaintext.
///
/// With the `std` feature every [`std::io::Write`] is a
/// [`Write`].
pub trait Write {
    /// Equivalent to [`std::io::Write::write`].
    fn write(&mut self, buf: &[u8]) -> Result<usize>;

    /// Equivalent to [`std::io::Write::write_all`].
    ///
    /// If it cannot write the entirety of `buf`, it returns
    /// [`Error::ShortWrite`].
    fn write_all(&mut self, mut buf: &[u8]) -> Result<()> {
        let mut nw = 0;
        while !buf.is_empty() {
            match self.write(buf) {
                Ok(0) => return Err(Error::ShortWrite(nw)),
                Ok(n) => {
                    nw += n;
                    buf = &buf[n..]
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Equivalent to [`std::io::Write::flush`].
    fn flush(&mut self) -> Result<()>;
}

#[cfg(feature = "std")]
mod std_io {
    use crate::{Read, Result, Write};

    impl<T: std::io::Read> Read for T {
        #[inline]
        fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
            loop {
                match std::io::Read::read(self, buf) {
                    Ok(n) => return Ok(n),
                    Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
                    Err(e) => return Err(e.into()),
                }
            }
        }
    }

    impl<T: std::io::Write> Write for T {
        #[inline]
        fn write(&mut self, buf: &[u8]) -> Result<usize> {
            Ok(std::io::Write::write(self, buf)?)
        }

        fn flush(&mut self) -> Result<()> {
            Ok(std::io::Write::flush(self)?)
        }
    }
}

#[cfg(not(feature = "std"))]
mod no_std_io {
    extern crate alloc;

    use {
        crate::{Read, Result, Write},
        alloc::vec::Vec,
        core::cmp,
    };

    impl Read for &[u8] {
        #[inline]
        fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
            let n = cmp::min(buf.len(), self.len());
            let (head, tail) = self.split_at(n);
            buf[..n].copy_from_slice(head);
            *self = tail;
            Ok(n)
        }
    }

    impl Write for Vec<u8> {
        #[inline]
        fn write(&mut self, buf: &[u8]) -> Result<usize> {
            self.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> Result<()> {
            Ok(())
        }
    }
}
