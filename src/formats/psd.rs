//! PSD format adapter
//!
//! All three payloads are image resources: XMP 0x0424, IPTC 0x0404 and EXIF
//! 0x0422 (0x0423 as fallback).

use super::{decode_exif, decode_iptc, decode_xmp, ImageFormat, MetadataCache};
use crate::{
    containers::psd_io::{PsdContainer, PsdIO},
    error::Result,
    metadata::{Exif, Iptc, MetadataSources, Xmp},
    segment::{SegmentKind, RESOURCE_IPTC, RESOURCE_XMP},
    ContainerIO,
};
use std::io::{Read, Seek, Write};

/// An opened Photoshop document
#[derive(Debug)]
pub struct PsdImage {
    container: PsdContainer,
    cache: MetadataCache,
}

impl PsdImage {
    pub fn new(container: PsdContainer) -> Self {
        Self {
            container,
            cache: MetadataCache::default(),
        }
    }

    pub fn container(&self) -> &PsdContainer {
        &self.container
    }
}

impl ImageFormat for PsdImage {
    fn from_reader<R: Read + Seek>(source: &mut R) -> Result<Self> {
        PsdIO::new().parse(source).map(Self::new)
    }

    fn xmp(&mut self) -> Result<&mut Xmp> {
        let data = self.container.resource(SegmentKind::Xmp);
        self.cache.xmp_or_load(|| decode_xmp(data))
    }

    fn set_xmp(&mut self, xmp: Xmp) -> Result<()> {
        self.cache.replace_xmp(xmp);
        Ok(())
    }

    fn iptc(&mut self) -> Result<&mut Iptc> {
        let data = self.container.resource(SegmentKind::Iptc);
        self.cache.iptc_or_load(|| decode_iptc(data))
    }

    fn set_iptc(&mut self, iptc: Iptc) -> Result<()> {
        self.cache.replace_iptc(iptc);
        Ok(())
    }

    fn exif(&mut self) -> Result<&Exif> {
        let data = self.container.resource(SegmentKind::Exif);
        self.cache.exif_or_load(|| decode_exif(data))
    }

    fn sources(&mut self) -> Result<MetadataSources<'_>> {
        self.xmp()?;
        self.iptc()?;
        self.exif()?;
        Ok(self.cache.sources())
    }

    fn has_pending_changes(&self) -> bool {
        self.cache.has_pending_changes()
    }

    fn write<W: Write>(&mut self, writer: &mut W) -> Result<()> {
        if let Some(xmp) = self.cache.pending_xmp() {
            let packet = xmp.to_bytes()?;
            log::debug!("writing {} byte XMP packet to PSD resource", packet.len());
            self.container.set_resource(RESOURCE_XMP, packet);
        }
        if let Some(iptc) = self.cache.pending_iptc() {
            self.container.set_resource(RESOURCE_IPTC, iptc.to_bytes()?);
        }
        PsdIO::new().write(&self.container, writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::RESOURCE_EXIF_3;
    use crate::test_utils::{build_psd, iptc_dataset, minimal_psd, xmp_packet, TiffBuilder};
    use crate::IfdGroup;
    use std::io::Cursor;

    fn open(data: &[u8]) -> PsdImage {
        PsdImage::from_reader(&mut Cursor::new(data)).unwrap()
    }

    #[test]
    fn test_reads_resources() {
        let xml = xmp_packet("", "<dc:subject><rdf:Bag><rdf:li>a</rdf:li></rdf:Bag></dc:subject>");
        let iim = iptc_dataset(2, 90, b"Tromso");
        let tiff = TiffBuilder::default()
            .ascii(IfdGroup::Ifd0, 0x0131, "Editor 2.1")
            .build();
        let data = build_psd(&[
            (0x03ED, &[0u8; 16]),
            (RESOURCE_XMP, xml.as_bytes()),
            (RESOURCE_IPTC, &iim),
            (RESOURCE_EXIF_3, &tiff),
        ]);

        let mut image = open(&data);
        assert_eq!(image.xmp().unwrap().keywords(), ["a"]);
        assert_eq!(image.iptc().unwrap().city(), Some("Tromso"));
        assert_eq!(image.exif().unwrap().software().as_deref(), Some("Editor 2.1"));
    }

    #[test]
    fn test_write_adds_resources_and_keeps_tail() {
        let data = minimal_psd();
        let mut image = open(&data);
        let tail = image.container().tail.clone();

        image.xmp().unwrap().set_caption(Some("Fjord"));
        image.iptc().unwrap().set_caption(Some("Fjord"));
        let mut out = Vec::new();
        image.write(&mut out).unwrap();

        let mut reopened = open(&out);
        assert_eq!(reopened.container().tail, tail);
        assert_eq!(reopened.container().header, image.container().header);
        assert_eq!(reopened.container().resources.len(), 3);
        assert_eq!(reopened.xmp().unwrap().caption().as_deref(), Some("Fjord"));
        assert_eq!(reopened.iptc().unwrap().caption(), Some("Fjord"));
    }

    #[test]
    fn test_unchanged_write_is_byte_exact() {
        let data = minimal_psd();
        let mut image = open(&data);
        image.sources().unwrap();
        let mut out = Vec::new();
        image.write(&mut out).unwrap();
        assert_eq!(out, data);
    }
}
