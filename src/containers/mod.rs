//! Container-specific I/O implementations
//!
//! Each container format (JPEG, PNG, WebP, PSD) has an I/O implementation that
//! knows how to split that file structure into ordered records and write the
//! records back out.

use crate::{
    error::{Error, Result},
    formats::ImageFormat,
    segment::MAX_SEGMENT_SIZE,
    MediaType,
};
use std::io::{Read, Seek, Write};

/// Container format - defines how a file is structured on disk
///
/// Note: The actual variants are determined by enabled features.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerKind {
    /// JPEG container (marker segments followed by entropy-coded data)
    #[cfg(feature = "jpeg")]
    Jpeg,

    /// PNG container (CRC-protected chunks)
    #[cfg(feature = "png")]
    Png,

    /// WebP image in a RIFF container
    #[cfg(feature = "webp")]
    WebP,

    /// Photoshop document (header, color mode data, image resources, layers)
    #[cfg(feature = "psd")]
    Psd,
}

impl ContainerKind {
    /// Human-readable format name, e.g. `PNG`
    pub fn name(&self) -> &'static str {
        match self {
            #[cfg(feature = "jpeg")]
            ContainerKind::Jpeg => "JPEG",
            #[cfg(feature = "png")]
            ContainerKind::Png => "PNG",
            #[cfg(feature = "webp")]
            ContainerKind::WebP => "WebP",
            #[cfg(feature = "psd")]
            ContainerKind::Psd => "PSD",
        }
    }
}

/// Trait for container-specific I/O operations
///
/// Each implementation handles one container format and owns the framing
/// rules for it. Parsing produces an owned in-memory container value; writing
/// is a pure function of that value.
pub trait ContainerIO: Send + Sync {
    /// Parsed representation of one file
    type Container;

    /// ContainerKind this I/O implementation manages
    fn container_type() -> ContainerKind
    where
        Self: Sized;

    /// Media types this I/O implementation can read/write
    fn supported_media_types() -> &'static [MediaType]
    where
        Self: Sized;

    /// File extensions this I/O implementation accepts (e.g., ["jpg", "jpeg"])
    fn extensions() -> &'static [&'static str]
    where
        Self: Sized;

    /// MIME types this I/O implementation accepts
    fn mime_types() -> &'static [&'static str]
    where
        Self: Sized;

    /// Try to detect if this I/O implementation can parse the given header
    /// Returns Some(ContainerKind) if confident, None if unsure
    fn detect(header: &[u8]) -> Option<ContainerKind>
    where
        Self: Sized;

    /// Parse the whole file into its ordered records
    fn parse<R: Read + Seek>(&self, source: &mut R) -> Result<Self::Container>;

    /// Write the records back out in order
    fn write<W: Write>(&self, container: &Self::Container, writer: &mut W) -> Result<()>;

    /// Serialize into a new buffer
    fn serialize(&self, container: &Self::Container) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.write(container, &mut out)?;
        Ok(out)
    }
}

/// Read exactly `len` payload bytes, refusing lengths the source cannot hold
///
/// `offset` is only used for error reporting.
pub(crate) fn read_payload<R: Read + Seek>(
    source: &mut R,
    len: u64,
    offset: u64,
    what: &str,
) -> Result<Vec<u8>> {
    if len > MAX_SEGMENT_SIZE {
        return Err(Error::DataTooLarge {
            size: len as usize,
            max: MAX_SEGMENT_SIZE as usize,
        });
    }
    let mut data = Vec::new();
    let read = source.by_ref().take(len).read_to_end(&mut data)?;
    if (read as u64) < len {
        return Err(Error::truncated(offset, what));
    }
    Ok(data)
}

/// Map an unexpected end of input onto a format error at `offset`
pub(crate) fn eof_as_truncated(offset: u64, what: &str) -> impl FnOnce(std::io::Error) -> Error + '_ {
    move |e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            Error::truncated(offset, what)
        } else {
            Error::Io(e)
        }
    }
}

// ContainerKind I/O modules - pub(crate) so register_containers! macro can access them
#[cfg(feature = "jpeg")]
pub(crate) mod jpeg_io;

#[cfg(feature = "png")]
pub(crate) mod png_io;

#[cfg(feature = "webp")]
pub(crate) mod webp_io;

#[cfg(feature = "psd")]
pub(crate) mod psd_io;

// ============================================================================
// ContainerKind Registration Macro
// ============================================================================

/// Register all supported container formats in one place
///
/// This macro generates:
/// - Handler enum for internal use (zero-cost dispatch to format adapters)
/// - detect_container() function
/// - open_handler() function
/// - Extension and MIME type lookup
/// - ContainerKind methods for MIME types and extensions
macro_rules! register_containers {
    ($(
        $(#[$meta:meta])*
        $variant:ident => $module:ident :: $io:ident, $image:path
    ),* $(,)?) => {
        /// Format adapter for one opened file
        pub(crate) enum Handler {
            $(
                $(#[$meta])*
                $variant($image),
            )*
        }

        // Delegates to the format adapters through the ImageFormat trait
        impl Handler {
            #[allow(unreachable_patterns)]
            pub(crate) fn container(&self) -> ContainerKind {
                match self {
                    $(
                        $(#[$meta])*
                        Handler::$variant(_) => ContainerKind::$variant,
                    )*
                }
            }

            #[allow(unreachable_patterns)]
            pub(crate) fn xmp(&mut self) -> $crate::Result<&mut $crate::Xmp> {
                match self {
                    $(
                        $(#[$meta])*
                        Handler::$variant(h) => h.xmp(),
                    )*
                }
            }

            #[allow(unreachable_patterns)]
            pub(crate) fn set_xmp(&mut self, xmp: $crate::Xmp) -> $crate::Result<()> {
                match self {
                    $(
                        $(#[$meta])*
                        Handler::$variant(h) => h.set_xmp(xmp),
                    )*
                }
            }

            #[allow(unreachable_patterns)]
            pub(crate) fn iptc(&mut self) -> $crate::Result<&mut $crate::Iptc> {
                match self {
                    $(
                        $(#[$meta])*
                        Handler::$variant(h) => h.iptc(),
                    )*
                }
            }

            #[allow(unreachable_patterns)]
            pub(crate) fn set_iptc(&mut self, iptc: $crate::Iptc) -> $crate::Result<()> {
                match self {
                    $(
                        $(#[$meta])*
                        Handler::$variant(h) => h.set_iptc(iptc),
                    )*
                }
            }

            #[allow(unreachable_patterns)]
            pub(crate) fn exif(&mut self) -> $crate::Result<&$crate::Exif> {
                match self {
                    $(
                        $(#[$meta])*
                        Handler::$variant(h) => h.exif(),
                    )*
                }
            }

            #[allow(unreachable_patterns)]
            pub(crate) fn sources(&mut self) -> $crate::Result<$crate::metadata::MetadataSources<'_>> {
                match self {
                    $(
                        $(#[$meta])*
                        Handler::$variant(h) => h.sources(),
                    )*
                }
            }

            #[allow(unreachable_patterns)]
            pub(crate) fn has_pending_changes(&self) -> bool {
                match self {
                    $(
                        $(#[$meta])*
                        Handler::$variant(h) => h.has_pending_changes(),
                    )*
                }
            }

            #[allow(unreachable_patterns)]
            pub(crate) fn write<W: std::io::Write>(&mut self, writer: &mut W) -> $crate::Result<()> {
                match self {
                    $(
                        $(#[$meta])*
                        Handler::$variant(h) => h.write(writer),
                    )*
                }
            }
        }

        /// Detect container from file header
        pub(crate) fn detect_container<R: std::io::Read + std::io::Seek>(
            source: &mut R
        ) -> $crate::Result<Option<ContainerKind>> {
            use std::io::SeekFrom;

            source.seek(SeekFrom::Start(0))?;
            let mut header = [0u8; 16];
            let mut n = 0;
            while n < header.len() {
                let read = source.read(&mut header[n..])?;
                if read == 0 {
                    break;
                }
                n += read;
            }
            source.seek(SeekFrom::Start(0))?;
            let header = &header[..n];

            $(
                $(#[$meta])*
                if let Some(container) = <$module::$io as $crate::ContainerIO>::detect(header) {
                    return Ok(Some(container));
                }
            )*

            Ok(None)
        }

        /// Parse `source` with the adapter registered for `container`
        pub(crate) fn open_handler<R: std::io::Read + std::io::Seek>(
            container: ContainerKind,
            source: &mut R,
        ) -> $crate::Result<Handler> {
            match container {
                $(
                    $(#[$meta])*
                    ContainerKind::$variant => Ok(Handler::$variant(
                        <$image as $crate::formats::ImageFormat>::from_reader(source)?,
                    )),
                )*
            }
        }

        /// Detect container from file extension
        pub fn detect_from_extension(ext: &str) -> Option<ContainerKind> {
            let ext_lower = ext.to_lowercase();
            $(
                $(#[$meta])*
                if <$module::$io as $crate::ContainerIO>::extensions().contains(&ext_lower.as_str()) {
                    return Some(<$module::$io as $crate::ContainerIO>::container_type());
                }
            )*
            None
        }

        /// Detect container from MIME type
        pub fn detect_from_mime(mime: &str) -> Option<ContainerKind> {
            $(
                $(#[$meta])*
                if <$module::$io as $crate::ContainerIO>::mime_types().iter().any(|m| m.eq_ignore_ascii_case(mime)) {
                    return Some(<$module::$io as $crate::ContainerIO>::container_type());
                }
            )*
            None
        }

        // Generate ContainerKind methods
        impl ContainerKind {
            /// Get the primary MIME type for this container
            pub fn to_mime(&self) -> &'static str {
                self.mime_types()[0]
            }

            /// Get the primary file extension for this container (without dot prefix)
            pub fn to_extension(&self) -> &'static str {
                self.extensions()[0]
            }

            /// Get all supported media types for this container
            pub fn supported_media_types(&self) -> &'static [$crate::MediaType] {
                match self {
                    $(
                        $(#[$meta])*
                        ContainerKind::$variant => <$module::$io as $crate::ContainerIO>::supported_media_types(),
                    )*
                }
            }

            /// Get all supported MIME types for this container
            pub fn mime_types(&self) -> &'static [&'static str] {
                match self {
                    $(
                        $(#[$meta])*
                        ContainerKind::$variant => <$module::$io as $crate::ContainerIO>::mime_types(),
                    )*
                }
            }

            /// Get all supported file extensions for this container
            pub fn extensions(&self) -> &'static [&'static str] {
                match self {
                    $(
                        $(#[$meta])*
                        ContainerKind::$variant => <$module::$io as $crate::ContainerIO>::extensions(),
                    )*
                }
            }
        }

        impl std::fmt::Display for ContainerKind {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.to_mime())
            }
        }
    };
}

// ============================================================================
// SINGLE POINT OF REGISTRATION
// To add a new container, just add one line here!
// ============================================================================
register_containers! {
    #[cfg(feature = "jpeg")]
    Jpeg => jpeg_io::JpegIO, crate::formats::jpeg::JpegImage,

    #[cfg(feature = "png")]
    Png => png_io::PngIO, crate::formats::png::PngImage,

    #[cfg(feature = "webp")]
    WebP => webp_io::WebpIO, crate::formats::webp::WebpImage,

    #[cfg(feature = "psd")]
    Psd => psd_io::PsdIO, crate::formats::psd::PsdImage,
}
