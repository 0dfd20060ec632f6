//! Media type definitions
//!
//! Every container handled here carries exactly one media type, but the two
//! concepts are kept apart: `ContainerKind` describes how bytes are framed on
//! disk, `MediaType` describes what the content is.

use crate::ContainerKind;

/// Specific media type - what the content represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaType {
    #[cfg(feature = "jpeg")]
    /// Standard JPEG image
    Jpeg,

    #[cfg(feature = "png")]
    /// PNG image
    Png,

    #[cfg(feature = "webp")]
    /// WebP image (RIFF container)
    WebP,

    #[cfg(feature = "psd")]
    /// Adobe Photoshop document
    Psd,
}

impl MediaType {
    /// Get all media types that are available in this build
    ///
    /// # Example
    ///
    /// ```
    /// use imeta_io::MediaType;
    ///
    /// for media_type in MediaType::all() {
    ///     println!("  - {} ({})", media_type.to_mime(), media_type.to_extension());
    /// }
    /// ```
    pub fn all() -> &'static [MediaType] {
        &[
            #[cfg(feature = "jpeg")]
            MediaType::Jpeg,
            #[cfg(feature = "png")]
            MediaType::Png,
            #[cfg(feature = "webp")]
            MediaType::WebP,
            #[cfg(feature = "psd")]
            MediaType::Psd,
        ]
    }

    /// Get the container format for this media type
    ///
    /// ```
    /// # #[cfg(feature = "png")]
    /// # {
    /// use imeta_io::{ContainerKind, MediaType};
    ///
    /// assert_eq!(MediaType::Png.container(), ContainerKind::Png);
    /// # }
    /// ```
    pub fn container(&self) -> ContainerKind {
        match self {
            #[cfg(feature = "jpeg")]
            MediaType::Jpeg => ContainerKind::Jpeg,
            #[cfg(feature = "png")]
            MediaType::Png => ContainerKind::Png,
            #[cfg(feature = "webp")]
            MediaType::WebP => ContainerKind::WebP,
            #[cfg(feature = "psd")]
            MediaType::Psd => ContainerKind::Psd,
        }
    }

    /// Get the primary MIME type for this media type
    pub fn to_mime(&self) -> &'static str {
        match self {
            #[cfg(feature = "jpeg")]
            MediaType::Jpeg => "image/jpeg",
            #[cfg(feature = "png")]
            MediaType::Png => "image/png",
            #[cfg(feature = "webp")]
            MediaType::WebP => "image/webp",
            #[cfg(feature = "psd")]
            MediaType::Psd => "image/vnd.adobe.photoshop",
        }
    }

    /// Get the primary file extension for this media type (without dot)
    pub fn to_extension(&self) -> &'static str {
        match self {
            #[cfg(feature = "jpeg")]
            MediaType::Jpeg => "jpg",
            #[cfg(feature = "png")]
            MediaType::Png => "png",
            #[cfg(feature = "webp")]
            MediaType::WebP => "webp",
            #[cfg(feature = "psd")]
            MediaType::Psd => "psd",
        }
    }
}

impl std::fmt::Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_mime())
    }
}
