//! Format-agnostic image handling
//!
//! This module provides a unified API for reading and writing image metadata
//! without needing to know the specific container format.

use crate::{
    containers::{detect_container, detect_from_extension, open_handler, ContainerKind, Handler},
    error::{Error, Result},
    metadata::{Aggregate, Exif, Iptc, Xmp},
    MediaType,
};
use std::fs::{self, File};
use std::io::{BufReader, Cursor, Read, Seek, Write};
use std::path::{Path, PathBuf};

/// An image file with its metadata, format detected automatically
///
/// The whole container is parsed on open, so the source file is not held
/// open and [`Asset::save`] can overwrite it in place.
///
/// # Example
///
/// ```no_run
/// use imeta_io::Asset;
///
/// # fn main() -> imeta_io::Result<()> {
/// let mut asset = Asset::open("image.jpg")?;
///
/// // Read metadata
/// if let Some(headline) = asset.xmp()?.headline() {
///     println!("Headline: {headline}");
/// }
///
/// // Modify and write
/// asset.xmp()?.set_keywords(vec!["harbour".into(), "night".into()]);
/// asset.save_as("output.jpg")?;
/// # Ok(())
/// # }
/// ```
pub struct Asset {
    handler: Handler,
    path: Option<PathBuf>,
}

impl Asset {
    /// Open an image file from a path
    ///
    /// The container is detected from the file header, falling back to the
    /// file extension.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut reader = BufReader::new(File::open(path)?);

        let container = match detect_container(&mut reader)? {
            Some(container) => container,
            None => path
                .extension()
                .and_then(|ext| ext.to_str())
                .and_then(detect_from_extension)
                .ok_or(Error::UnsupportedFormat)?,
        };
        log::debug!("opening {} as {}", path.display(), container.name());

        let handler = open_handler(container, &mut reader)?;
        Ok(Self {
            handler,
            path: Some(path.to_path_buf()),
        })
    }

    /// Parse an image from a reader, detecting the container from its header
    pub fn from_reader<R: Read + Seek>(mut reader: R) -> Result<Self> {
        let container = detect_container(&mut reader)?.ok_or(Error::UnsupportedFormat)?;
        Self::from_reader_with_container(reader, container)
    }

    /// Parse an image from a reader with a known container
    pub fn from_reader_with_container<R: Read + Seek>(
        mut reader: R,
        container: ContainerKind,
    ) -> Result<Self> {
        reader.seek(std::io::SeekFrom::Start(0))?;
        let handler = open_handler(container, &mut reader)?;
        Ok(Self { handler, path: None })
    }

    /// Parse an in-memory image
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Self::from_reader(Cursor::new(data))
    }

    pub fn container(&self) -> ContainerKind {
        self.handler.container()
    }

    pub fn media_type(&self) -> MediaType {
        self.container().supported_media_types()[0]
    }

    /// Path the asset was opened from or last saved to
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// XMP packet, empty if the file has none
    pub fn xmp(&mut self) -> Result<&mut Xmp> {
        self.handler.xmp()
    }

    pub fn set_xmp(&mut self, xmp: Xmp) -> Result<()> {
        self.handler.set_xmp(xmp)
    }

    /// IPTC record; [`Error::Unsupported`] for containers without one
    pub fn iptc(&mut self) -> Result<&mut Iptc> {
        self.handler.iptc()
    }

    pub fn set_iptc(&mut self, iptc: Iptc) -> Result<()> {
        self.handler.set_iptc(iptc)
    }

    /// EXIF tags; [`Error::Unsupported`] for containers without them
    pub fn exif(&mut self) -> Result<&Exif> {
        self.handler.exif()
    }

    /// Merged view of every metadata source the container carries
    pub fn aggregate(&mut self) -> Result<Aggregate<'_>> {
        Ok(Aggregate::new(self.handler.sources()?))
    }

    /// True when metadata was changed since the file was opened
    pub fn has_pending_changes(&self) -> bool {
        self.handler.has_pending_changes()
    }

    /// Write the image, with pending metadata, to `writer`
    pub fn write_to<W: Write>(&mut self, writer: &mut W) -> Result<()> {
        self.handler.write(writer)
    }

    /// The image, with pending metadata, as a new buffer
    pub fn to_bytes(&mut self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.write_to(&mut out)?;
        Ok(out)
    }

    /// Overwrite the file the asset was opened from
    pub fn save(&mut self) -> Result<()> {
        let path = self
            .path
            .clone()
            .ok_or_else(|| Error::InvalidArgument("asset has no file path to save to".into()))?;
        self.save_as(path)
    }

    /// Write to `path`; later calls to [`Asset::save`] go to the same path
    ///
    /// The image is serialized completely before the file is touched, so a
    /// failed save leaves the file as it was.
    pub fn save_as<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let path = path.as_ref();
        let data = self.to_bytes()?;
        fs::write(path, &data)?;
        log::debug!("saved {} bytes to {}", data.len(), path.display());
        self.path = Some(path.to_path_buf());
        Ok(())
    }
}

impl std::fmt::Debug for Asset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Asset")
            .field("container", &self.container())
            .field("path", &self.path)
            .finish()
    }
}
