extern crate alloc;

use {
    alloc::boxed::Box,
    core::{convert::From, error, fmt, result},
};

/// Result is a specialized [`result::Result`] for this crate.
pub type Result<T> = result::Result<T, Error>;

#[cfg(feature = "std")]
pub(crate) fn map_res<T>(res: Result<T>) -> std::io::Result<T> {
    res.map_err(|err| match err {
        Error::UnexpectedEof(_) => {
            std::io::Error::new(std::io::ErrorKind::UnexpectedEof, err)
        }
        Error::ShortWrite(_) => {
            std::io::Error::new(std::io::ErrorKind::WriteZero, err)
        }
        Error::MacMismatch
        | Error::InvalidPadding
        | Error::InvalidLength(_)
        | Error::UnalignedCiphertext(_) => {
            std::io::Error::new(std::io::ErrorKind::InvalidData, err)
        }
        err => std::io::Error::new(std::io::ErrorKind::Other, err),
    })
}

/// An arbitrary error, usually raised by a byte source or sink.
#[derive(Debug)]
pub struct OtherError {
    inner: Box<dyn error::Error + Send + Sync>,
}

impl OtherError {
    /// Allocate an [`OtherError`].
    pub fn new<E>(err: E) -> Self
    where
        E: Into<Box<dyn error::Error + Send + Sync>>,
    {
        Self { inner: err.into() }
    }
}

impl fmt::Display for OtherError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner)
    }
}

impl error::Error for OtherError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        self.inner.source()
    }
}

/// Error is the error type returned by this crate.
///
/// Authentication and format failures ([`Error::MacMismatch`],
/// [`Error::InvalidPadding`], [`Error::InvalidLength`] and
/// [`Error::UnalignedCiphertext`]) all mean the same thing to an
/// end user: the media is corrupt or has been tampered with. See
/// [`Error::is_corrupt`].
#[derive(Debug)]
pub enum Error {
    /// The media key is not exactly 32 bytes.
    ///
    /// It contains the length that was provided.
    InvalidKeyLength(usize),
    /// A non-final block operation was given a buffer that is
    /// empty or not a multiple of the block size.
    ///
    /// It contains the buffer length.
    UnalignedInput(usize),
    /// The ciphertext (without its trailer) is empty or not a
    /// multiple of the block size.
    ///
    /// It contains the ciphertext length.
    UnalignedCiphertext(usize),
    /// The trailer did not authenticate the ciphertext.
    MacMismatch,
    /// The PKCS7 padding of the final block is malformed.
    InvalidPadding,
    /// The input is shorter than the 10-byte trailer.
    ///
    /// It contains the number of bytes read.
    InvalidLength(usize),
    /// The output buffer has no room for the padding.
    ///
    /// It contains the number of bytes required.
    ShortBuffer(usize),
    /// The MAC or sidecar was used after being finalized.
    Finalized,
    /// A previous operation on this pipeline failed.
    Poisoned,
    /// The string does not name a media type.
    UnknownMediaType,
    /// HKDF could not produce the requested output length.
    Expand(hkdf::InvalidLength),
    /// The CSPRNG failed.
    Rand(rand_core::Error),
    /// The entire buffer could not be written.
    ///
    /// It contains the number of bytes written.
    ShortWrite(usize),
    /// Unexpected EOF while reading.
    ///
    /// It contains the number of bytes read.
    UnexpectedEof(usize),
    /// Some other error occurred.
    Other(OtherError),
}

impl Error {
    /// Reports whether the error means the input is corrupt or
    /// was tampered with.
    pub fn is_corrupt(&self) -> bool {
        matches!(
            self,
            Error::MacMismatch
                | Error::InvalidPadding
                | Error::InvalidLength(_)
                | Error::UnalignedCiphertext(_)
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidKeyLength(n) => {
                write!(f, "invalid media key length: {} bytes", n)
            }
            Error::UnalignedInput(n) => {
                write!(f, "input of {} bytes is not block aligned", n)
            }
            Error::UnalignedCiphertext(n) => {
                write!(f, "ciphertext of {} bytes is not block aligned", n)
            }
            Error::MacMismatch => write!(f, "MAC mismatch"),
            Error::InvalidPadding => write!(f, "invalid PKCS7 padding"),
            Error::InvalidLength(n) => {
                write!(f, "input of {} bytes is missing its trailer", n)
            }
            Error::ShortBuffer(n) => {
                write!(f, "buffer too small: need {} bytes", n)
            }
            Error::Finalized => write!(f, "already finalized"),
            Error::Poisoned => write!(f, "pipeline previously failed"),
            Error::UnknownMediaType => write!(f, "unknown media type"),
            Error::Expand(err) => write!(f, "HKDF expand error: {}", err),
            Error::Rand(err) => write!(f, "CSPRNG failure: {}", err),
            Error::ShortWrite(n) => write!(f, "short write of {} bytes", n),
            Error::UnexpectedEof(n) => {
                write!(f, "unexpected EOF after {} bytes", n)
            }
            Error::Other(err) => write!(f, "{}", err),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Error::Other(err) => Some(err),
            _ => None,
        }
    }
}

impl From<hkdf::InvalidLength> for Error {
    fn from(value: hkdf::InvalidLength) -> Self {
        Error::Expand(value)
    }
}

impl From<rand_core::Error> for Error {
    fn from(value: rand_core::Error) -> Self {
        Error::Rand(value)
    }
}

impl From<OtherError> for Error {
    fn from(value: OtherError) -> Self {
        Error::Other(value)
    }
}

#[cfg(feature = "std")]
#[cfg_attr(docsrs, doc(cfg(feature = "std")))]
impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        // Errors raised by this crate come back out unchanged.
        if value.get_ref().is_some_and(|err| err.is::<Error>()) {
            if let Some(Ok(err)) = value.into_inner().map(|err| err.downcast::<Error>()) {
                return *err;
            }
            return Error::Other(OtherError::new("unreadable I/O error"));
        }
        match value.kind() {
            std::io::ErrorKind::UnexpectedEof => Error::UnexpectedEof(0),
            std::io::ErrorKind::WriteZero => Error::ShortWrite(0),
            _ => Error::Other(OtherError::new(Box::new(value))),
        }
    }
}
