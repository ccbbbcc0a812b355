use {
    crate::error::Error,
    core::{fmt, result, str::FromStr},
};

/// The kind of media being protected.
///
/// Each kind has its own HKDF context label, so the same media
/// key yields unrelated key material for different kinds.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum MediaType {
    /// Still images.
    Image,
    /// Video. Usually accompanied by a sidecar.
    Video,
    /// Audio. Usually accompanied by a sidecar.
    Audio,
    /// Documents and any other opaque blobs.
    Document,
}

impl MediaType {
    /// Every media type, in declaration order.
    pub const ALL: [MediaType; 4] = [
        MediaType::Image,
        MediaType::Video,
        MediaType::Audio,
        MediaType::Document,
    ];

    /// Returns the HKDF `info` label for this media type.
    pub const fn info(&self) -> &'static [u8] {
        match self {
            MediaType::Image => b"WhatsApp Image Keys",
            MediaType::Video => b"WhatsApp Video Keys",
            MediaType::Audio => b"WhatsApp Audio Keys",
            MediaType::Document => b"WhatsApp Document Keys",
        }
    }

    /// Returns the upper-case name of the media type.
    pub const fn name(&self) -> &'static str {
        match self {
            MediaType::Image => "IMAGE",
            MediaType::Video => "VIDEO",
            MediaType::Audio => "AUDIO",
            MediaType::Document => "DOCUMENT",
        }
    }

    /// Reports whether players seek within this kind of media,
    /// which is when a sidecar is worth producing.
    pub const fn is_streamable(&self) -> bool {
        matches!(self, MediaType::Video | MediaType::Audio)
    }
}

impl fmt::Display for MediaType {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> result::Result<(), fmt::Error> {
        f.write_str(self.name())
    }
}

impl TryFrom<&str> for MediaType {
    type Error = Error;

    fn try_from(s: &str) -> result::Result<MediaType, Self::Error> {
        MediaType::ALL
            .into_iter()
            .find(|t| t.name().eq_ignore_ascii_case(s))
            .ok_or(Error::UnknownMediaType)
    }
}

impl FromStr for MediaType {
    type Err = Error;

    fn from_str(s: &str) -> result::Result<MediaType, Self::Err> {
        MediaType::try_from(s)
    }
}
