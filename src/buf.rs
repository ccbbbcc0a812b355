use {
    crate::{
        error::Result,
        io::{Read, Write},
    },
    core::{cmp::min, ops::Drop},
    zeroize::Zeroize,
};

/// A fixed-length staging buffer.
///
/// Encryption stages plaintext here and then encrypts it in
/// place, so the contents are wiped on drop.
#[derive(Clone, Debug)]
pub(crate) struct Buf<const N: usize> {
    /// Contents are data[read..write].
    /// Read at data[read], write at data[write].
    data: [u8; N],
    /// Read offset.
    read: usize,
    /// Write offset.
    write: usize,
}

impl<const N: usize> Buf<N> {
    pub const fn new() -> Self {
        Self {
            data: [0u8; N],
            read: 0,
            write: 0,
        }
    }

    /// Reports whether the buffer is full and no more data can
    /// be written.
    pub fn is_full(&self) -> bool {
        self.write == N
    }

    /// Returns the number of unread bytes in the buffer.
    pub fn len(&self) -> usize {
        self.write - self.read
    }

    /// Resets the buffer to empty.
    pub fn reset(&mut self) {
        self.read = 0;
        self.write = 0;
    }

    /// Returns the buffer's remaining capacity.
    fn remaining_capacity_mut(&mut self) -> &mut [u8] {
        &mut self.data[self.write..]
    }

    /// Returns the unread portion of the buffer.
    pub fn remaining_slice(&self) -> &[u8] {
        &self.data[self.read..self.write]
    }

    /// Returns the unread portion of the buffer as a mutable
    /// slice.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data[self.read..self.write]
    }

    /// Returns the unread portion of the buffer followed by all
    /// of its remaining capacity.
    ///
    /// Bytes written past the unread portion only become part
    /// of the buffer after a call to [`Buf::advance`].
    pub fn with_capacity_mut(&mut self) -> &mut [u8] {
        &mut self.data[self.read..]
    }

    /// Extends the unread portion by `n` bytes that were written
    /// through [`Buf::with_capacity_mut`].
    pub fn advance(&mut self, n: usize) {
        assert!(n <= N - self.write, "advance past end of buffer");
        self.write += n;
    }

    /// Reads from `src` until the buffer is full or `src`
    /// reaches EOF.
    pub fn read_from<R: Read + ?Sized>(
        &mut self,
        src: &mut R,
    ) -> Result<usize> {
        let mut n = 0;
        while !self.is_full() {
            let m = src.read(self.remaining_capacity_mut())?;
            if m == 0 {
                break;
            }
            self.write += m;
            n += m;
        }
        Ok(n)
    }
}

impl<const N: usize> Drop for Buf<N> {
    fn drop(&mut self) {
        self.data.zeroize();
    }
}

impl<const N: usize> Read for Buf<N> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let src = self.remaining_slice();
        let n = min(src.len(), buf.len());
        buf[..n].copy_from_slice(&src[..n]);
        self.read += n;
        Ok(n)
    }
}

impl<const N: usize> Write for Buf<N> {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        let dst = self.remaining_capacity_mut();
        let n = min(dst.len(), buf.len());
        (dst[..n]).copy_from_slice(&buf[..n]);
        self.write += n;
        Ok(n)
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    extern crate alloc;

    use {super::*, alloc::vec::Vec, core::cmp};

    struct SmallByteReader<'a> {
        r: &'a [u8],
        n: usize,
    }

    impl<'a> SmallByteReader<'a> {
        fn new(r: &'a [u8]) -> Self {
            Self { r, n: 0 }
        }
    }

    impl Read for SmallByteReader<'_> {
        fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
            self.n = (self.n % 3) + 1;
            let n = cmp::min(cmp::min(self.n, buf.len()), self.r.len());
            buf[..n].copy_from_slice(&self.r[..n]);
            self.r = &self.r[n..];
            Ok(n)
        }
    }

    #[test]
    fn test_buf_read() {
        const CONTENT: &'static str = "hello, world!";
        let mut b = Buf::<4096>::new();
        b.write(CONTENT.as_bytes()).unwrap();
        assert_eq!(b.len(), CONTENT.len());

        let mut got = Vec::new();
        let mut chunk = [0u8; 2];
        loop {
            let n = b.read(&mut chunk).unwrap();
            if n == 0 {
                break;
            }
            got.extend_from_slice(&chunk[..n]);
        }
        assert_eq!(got, CONTENT.as_bytes());
        assert_eq!(b.len(), 0);
        assert_eq!(0, b.read(&mut [0u8; 10][..]).unwrap());
    }

    #[test]
    fn test_buf_read_from_small_reads() {
        const N: usize = 64;
        let src: Vec<u8> = (0..100u8).collect();
        let mut b = Buf::<N>::new();

        let nr = b.read_from(&mut SmallByteReader::new(&src)).unwrap();
        assert_eq!(nr, N);
        assert!(b.is_full());
        assert_eq!(b.remaining_slice(), &src[..N]);
    }

    #[test]
    fn test_buf_read_from_eof() {
        let src = [7u8; 10];
        let mut b = Buf::<64>::new();
        let nr = b.read_from(&mut SmallByteReader::new(&src)).unwrap();
        assert_eq!(nr, 10);
        assert!(!b.is_full());
        assert_eq!(b.remaining_slice(), &src[..]);
    }

    #[test]
    fn test_buf_advance() {
        let mut b = Buf::<16>::new();
        b.write(b"abc").unwrap();
        let spare = b.with_capacity_mut();
        assert_eq!(spare.len(), 16);
        spare[3..5].copy_from_slice(b"de");
        b.advance(2);
        assert_eq!(b.remaining_slice(), b"abcde");

        b.reset();
        assert_eq!(b.len(), 0);
        assert_eq!(b.with_capacity_mut().len(), 16);
    }

    #[test]
    #[should_panic]
    fn test_buf_advance_overflow() {
        let mut b = Buf::<4>::new();
        b.advance(5);
    }
}
