//! JPEG format adapter
//!
//! - XMP: APP1 `http://ns.adobe.com/xap/1.0/\0`
//! - EXIF: APP1 `Exif\0\0`
//! - IPTC: resource 0x0404 inside the APP13 `Photoshop 3.0\0` resource blocks

use super::{decode_exif, decode_iptc, decode_xmp, ImageFormat, MetadataCache};
use crate::{
    containers::{jpeg_io::JpegContainer, jpeg_io::JpegIO},
    error::Result,
    irb,
    metadata::{Exif, Iptc, MetadataSources, Xmp},
    segment::RESOURCE_IPTC,
    ContainerIO,
};
use std::io::{Read, Seek, Write};

/// An opened JPEG file
#[derive(Debug)]
pub struct JpegImage {
    container: JpegContainer,
    cache: MetadataCache,
}

impl JpegImage {
    pub fn new(container: JpegContainer) -> Self {
        Self {
            container,
            cache: MetadataCache::default(),
        }
    }

    pub fn container(&self) -> &JpegContainer {
        &self.container
    }

    /// Raw IIM bytes from the Photoshop resources
    fn iptc_payload(container: &JpegContainer) -> Result<Option<Vec<u8>>> {
        let Some(resources) = container.photoshop_resources() else {
            return Ok(None);
        };
        let blocks = irb::parse_blocks(&resources, 0)?;
        Ok(irb::find_block(&blocks, RESOURCE_IPTC).map(<[u8]>::to_vec))
    }

    /// Write pending metadata into the segments
    fn apply_pending(&mut self) -> Result<()> {
        if let Some(xmp) = self.cache.pending_xmp() {
            let packet = xmp.to_bytes()?;
            log::debug!("writing {} byte XMP packet to JPEG APP1", packet.len());
            self.container.set_xmp(&packet)?;
        }

        if let Some(iptc) = self.cache.pending_iptc() {
            let iim = iptc.to_bytes()?;
            let mut blocks = match self.container.photoshop_resources() {
                Some(resources) => irb::parse_blocks(&resources, 0)?,
                None => Vec::new(),
            };
            irb::upsert_block(&mut blocks, RESOURCE_IPTC, iim);
            let resources = irb::encode_blocks(&blocks)?;
            log::debug!("writing {} bytes of Photoshop resources to JPEG APP13", resources.len());
            self.container.set_photoshop_resources(&resources);
        }
        Ok(())
    }
}

impl ImageFormat for JpegImage {
    fn from_reader<R: Read + Seek>(source: &mut R) -> Result<Self> {
        JpegIO::new().parse(source).map(Self::new)
    }

    fn xmp(&mut self) -> Result<&mut Xmp> {
        let container = &self.container;
        self.cache.xmp_or_load(|| decode_xmp(container.xmp()))
    }

    fn set_xmp(&mut self, xmp: Xmp) -> Result<()> {
        self.cache.replace_xmp(xmp);
        Ok(())
    }

    fn iptc(&mut self) -> Result<&mut Iptc> {
        let container = &self.container;
        self.cache
            .iptc_or_load(|| decode_iptc(Self::iptc_payload(container)?.as_deref()))
    }

    fn set_iptc(&mut self, iptc: Iptc) -> Result<()> {
        self.cache.replace_iptc(iptc);
        Ok(())
    }

    fn exif(&mut self) -> Result<&Exif> {
        let container = &self.container;
        self.cache.exif_or_load(|| decode_exif(container.exif()))
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
        self.apply_pending()?;
        JpegIO::new().write(&self.container, writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{
        build_jpeg, iptc_dataset, jpeg_exif_app1, jpeg_iptc_app13, jpeg_xmp_app1, minimal_jpeg,
        xmp_packet, TiffBuilder, JFIF_APP0,
    };
    use crate::{segment::SegmentKind, IfdGroup};
    use std::io::Cursor;

    fn open(data: &[u8]) -> JpegImage {
        JpegImage::from_reader(&mut Cursor::new(data)).unwrap()
    }

    fn save(image: &mut JpegImage) -> Vec<u8> {
        let mut out = Vec::new();
        image.write(&mut out).unwrap();
        out
    }

    #[test]
    fn test_reads_all_three_sources() {
        let xmp = xmp_packet(r#"photoshop:Headline="Storm""#, "");
        let tiff = TiffBuilder::default()
            .ascii(IfdGroup::Ifd0, 0x010F, "Canon")
            .build();
        let iim = iptc_dataset(2, 105, b"Storm over the bay");
        let data = build_jpeg(&[
            (0xE1, &jpeg_exif_app1(&tiff)),
            (0xE1, &jpeg_xmp_app1(&xmp)),
            (0xED, &jpeg_iptc_app13(&iim)),
        ]);

        let mut image = open(&data);
        assert_eq!(image.xmp().unwrap().headline().as_deref(), Some("Storm"));
        assert_eq!(image.iptc().unwrap().headline(), Some("Storm over the bay"));
        assert_eq!(image.exif().unwrap().make().as_deref(), Some("Canon"));
        assert!(!image.has_pending_changes());
    }

    #[test]
    fn test_unchanged_write_is_byte_exact() {
        let data = build_jpeg(&[(0xE1, &jpeg_xmp_app1(&xmp_packet("", "")))]);
        let mut image = open(&data);
        image.xmp().unwrap();
        image.iptc().unwrap();
        assert_eq!(save(&mut image), data);
    }

    #[test]
    fn test_xmp_injected_after_app_segments() {
        let mut image = open(&minimal_jpeg());
        image.xmp().unwrap().set_headline(Some("New"));
        assert!(image.has_pending_changes());

        let out = save(&mut image);
        let mut reopened = open(&out);
        let segments = &reopened.container().segments;
        assert_eq!(segments[0].data, JFIF_APP0);
        assert_eq!(segments[1].kind(), SegmentKind::Xmp);
        assert_eq!(reopened.xmp().unwrap().headline().as_deref(), Some("New"));
    }

    #[test]
    fn test_iptc_written_to_new_app13() {
        let mut image = open(&minimal_jpeg());
        let mut iptc = Iptc::new();
        iptc.set_city(Some("Bergen"));
        image.set_iptc(iptc).unwrap();

        let out = save(&mut image);
        let mut reopened = open(&out);
        assert!(reopened.container().position(SegmentKind::Iptc).is_some());
        assert_eq!(reopened.iptc().unwrap().city(), Some("Bergen"));
    }

    #[test]
    fn test_iptc_update_keeps_other_resources() {
        let mut resources = crate::test_utils::resource_block(0x03ED, &[0; 16]);
        resources.extend(crate::test_utils::resource_block(
            RESOURCE_IPTC,
            &iptc_dataset(2, 25, b"old"),
        ));
        let mut app13 = crate::segment::JPEG_PHOTOSHOP_SIGNATURE.to_vec();
        app13.extend(resources);
        let data = build_jpeg(&[(0xED, &app13)]);

        let mut image = open(&data);
        image.iptc().unwrap().set_keywords(vec!["new".into()]);
        let out = save(&mut image);

        let reopened = open(&out);
        let resources = reopened.container().photoshop_resources().unwrap();
        let blocks = irb::parse_blocks(&resources, 0).unwrap();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].id, 0x03ED);
        let iptc = Iptc::from_bytes(irb::find_block(&blocks, RESOURCE_IPTC).unwrap()).unwrap();
        assert_eq!(iptc.keywords(), ["new"]);
    }

    #[test]
    fn test_sources_include_every_kind() {
        let mut image = open(&minimal_jpeg());
        let sources = image.sources().unwrap();
        assert!(sources.xmp.is_some());
        assert!(sources.iptc.is_some());
        assert!(sources.exif.is_some());
    }
}
