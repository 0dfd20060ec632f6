//! Read and write embedded image metadata (XMP, IPTC, EXIF) in JPEG, PNG,
//! WebP and PSD files.
//!
//! Each container is parsed into its ordered records (segments, chunks or
//! image resources). The records carrying metadata are decoded on demand, and
//! on save the modified payloads are written back into the same records.
//! Everything else is carried through untouched, so a file saved without
//! changes is byte-identical to the input.
//!
//! # Design Principles
//!
//! - **Lossless**: unknown records, scan data and trailing bytes are preserved
//! - **Lazy decoding**: metadata payloads are only decoded when accessed
//! - **Container agnostic**: one API across JPEG, PNG, WebP and PSD
//!
//! # Quick Start
//!
//! The simplest way to use this library is with the [`Asset`] API,
//! which detects the container automatically:
//!
//! ```no_run
//! use imeta_io::{Asset, Field};
//!
//! # fn main() -> imeta_io::Result<()> {
//! let mut asset = Asset::open("image.jpg")?;
//!
//! // Per-format access
//! let xmp = asset.xmp()?;
//! println!("caption: {:?}", xmp.caption());
//! xmp.set_headline(Some("Harbour at night"));
//!
//! // EXIF is read-only
//! if let Some(camera) = asset.exif()?.camera() {
//!     println!("shot on {camera}");
//! }
//!
//! // Merged view: XMP first, then IPTC, then EXIF
//! let credit = asset.aggregate()?.text(Field::Credit);
//! println!("credit: {credit:?}");
//!
//! asset.save()?;
//! # Ok(())
//! # }
//! ```
//!
//! # Container-Specific API
//!
//! For more control, containers can be parsed and written directly:
//!
//! ```no_run
//! use imeta_io::{ContainerIO, JpegIO};
//! use std::fs::File;
//!
//! # fn main() -> imeta_io::Result<()> {
//! let mut file = File::open("image.jpg")?;
//! let io = JpegIO::new();
//! let container = io.parse(&mut file)?;
//!
//! for segment in &container.segments {
//!     println!("{}: {} bytes", segment.name(), segment.len());
//! }
//!
//! let mut output = File::create("copy.jpg")?;
//! io.write(&container, &mut output)?;
//! # Ok(())
//! # }
//! ```

mod asset;
mod containers;
mod error;
mod formats;
mod irb;
mod media_type;
pub mod metadata;
mod segment;

pub use asset::Asset;
pub use containers::{detect_from_extension, detect_from_mime, ContainerIO, ContainerKind};
pub use error::{Error, Result};
pub use formats::ImageFormat;
pub use media_type::MediaType;
pub use metadata::{
    Aggregate, Exif, ExifValue, Field, FieldValue, GpsCoordinate, GpsPosition, IfdGroup, Iptc,
    MetadataKind, MetadataReader, MetadataWriter, Xmp,
};
pub use segment::{
    ByteRange, JpegSegment, PngChunk, ResourceBlock, RiffChunk, SegmentKind, MAX_CHUNK_PAYLOAD,
    MAX_JPEG_PAYLOAD, MAX_SEGMENT_SIZE,
};

// Re-export container I/O implementations and format adapters at crate root
#[cfg(feature = "jpeg")]
pub use containers::jpeg_io::{JpegContainer, JpegIO};
#[cfg(feature = "jpeg")]
pub use formats::jpeg::JpegImage;
#[cfg(feature = "png")]
pub use containers::png_io::{PngContainer, PngIO};
#[cfg(feature = "png")]
pub use formats::png::PngImage;
#[cfg(feature = "psd")]
pub use containers::psd_io::{PsdContainer, PsdIO};
#[cfg(feature = "psd")]
pub use formats::psd::PsdImage;
#[cfg(feature = "webp")]
pub use containers::webp_io::{flags as webp_flags, WebpContainer, WebpIO};
#[cfg(feature = "webp")]
pub use formats::webp::WebpImage;

// Test utilities - only compiled for tests or when explicitly enabled
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
