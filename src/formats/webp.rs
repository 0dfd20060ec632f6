//! WebP format adapter
//!
//! XMP (`XMP ` chunk) and EXIF (`EXIF` chunk) exist only in the extended
//! format, where the VP8X header flags announce them. Simple files can be
//! read, and saved unchanged, but metadata cannot be added to them.

use super::{decode_exif, decode_xmp, ImageFormat, MetadataCache};
use crate::{
    containers::{
        webp_io::{flags, WebpContainer, WebpIO},
        ContainerKind,
    },
    error::{Error, Result},
    metadata::{Exif, Iptc, MetadataKind, MetadataSources, Xmp},
    segment::SegmentKind,
    ContainerIO,
};
use std::io::{Read, Seek, Write};

/// An opened WebP file
#[derive(Debug)]
pub struct WebpImage {
    container: WebpContainer,
    cache: MetadataCache,
}

impl WebpImage {
    pub fn new(container: WebpContainer) -> Self {
        Self {
            container,
            cache: MetadataCache::default(),
        }
    }

    pub fn container(&self) -> &WebpContainer {
        &self.container
    }

    fn payload(&self, kind: SegmentKind) -> Option<&[u8]> {
        self.container.chunk(kind).map(|c| c.data.as_slice())
    }
}

impl ImageFormat for WebpImage {
    fn from_reader<R: Read + Seek>(source: &mut R) -> Result<Self> {
        WebpIO::new().parse(source).map(Self::new)
    }

    fn xmp(&mut self) -> Result<&mut Xmp> {
        let data = self.container.chunk(SegmentKind::Xmp).map(|c| c.data.as_slice());
        self.cache.xmp_or_load(|| decode_xmp(data))
    }

    fn set_xmp(&mut self, xmp: Xmp) -> Result<()> {
        self.cache.replace_xmp(xmp);
        Ok(())
    }

    fn iptc(&mut self) -> Result<&mut Iptc> {
        Err(Error::Unsupported {
            metadata: MetadataKind::Iptc,
            container: ContainerKind::WebP,
        })
    }

    fn set_iptc(&mut self, _iptc: Iptc) -> Result<()> {
        Err(Error::Unsupported {
            metadata: MetadataKind::Iptc,
            container: ContainerKind::WebP,
        })
    }

    fn exif(&mut self) -> Result<&Exif> {
        let data = self.container.chunk(SegmentKind::Exif).map(|c| c.data.as_slice());
        self.cache.exif_or_load(|| decode_exif(data))
    }

    fn sources(&mut self) -> Result<MetadataSources<'_>> {
        self.xmp()?;
        self.exif()?;
        Ok(self.cache.sources())
    }

    fn has_pending_changes(&self) -> bool {
        self.cache.has_pending_changes()
    }

    /// Simple files with pending metadata are refused with [`Error::Unsupported`]
    fn write<W: Write>(&mut self, writer: &mut W) -> Result<()> {
        if let Some(xmp) = self.cache.pending_xmp() {
            if !self.container.is_extended() {
                return Err(Error::Unsupported {
                    metadata: MetadataKind::Xmp,
                    container: ContainerKind::WebP,
                });
            }
            let packet = xmp.to_bytes()?;
            log::debug!("writing {} byte XMP packet to WebP XMP chunk", packet.len());
            self.container.upsert(SegmentKind::Xmp, *b"XMP ", packet);

            let has_exif = self.payload(SegmentKind::Exif).is_some();
            self.container.set_vp8x_flag(flags::XMP, true);
            self.container.set_vp8x_flag(flags::EXIF, has_exif);
        }
        WebpIO::new().write(&self.container, writer)
    }
}
