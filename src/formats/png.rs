//! PNG format adapter
//!
//! XMP lives in an `iTXt` chunk with the keyword `XML:com.adobe.xmp`. PNG has
//! no standard place for IPTC, and EXIF (`eXIf`) is not handled, so both are
//! reported as unsupported.

use super::{decode_xmp, ImageFormat, MetadataCache};
use crate::{
    containers::{
        png_io::{PngContainer, PngIO, XMP_KEYWORD},
        ContainerKind,
    },
    error::{Error, Result},
    metadata::{Exif, Iptc, MetadataKind, MetadataSources, Xmp},
    ContainerIO,
};
use flate2::read::ZlibDecoder;
use std::io::{Read, Seek, Write};

/// An opened PNG file
#[derive(Debug)]
pub struct PngImage {
    container: PngContainer,
    cache: MetadataCache,
}

fn unsupported(metadata: MetadataKind) -> Error {
    Error::Unsupported {
        metadata,
        container: ContainerKind::Png,
    }
}

/// Text of an XMP `iTXt` chunk
///
/// Layout after the keyword and its NUL: compression flag, compression
/// method, NUL-terminated language tag, NUL-terminated translated keyword,
/// then the (possibly zlib-compressed) UTF-8 text.
pub(crate) fn decode_itxt(data: &[u8]) -> Result<Vec<u8>> {
    let malformed = || Error::Encoding("truncated iTXt chunk".into());

    let rest = data.get(XMP_KEYWORD.len() + 1..).ok_or_else(malformed)?;
    let (&compressed, rest) = rest.split_first().ok_or_else(malformed)?;
    let (&method, rest) = rest.split_first().ok_or_else(malformed)?;

    let mut rest = rest;
    for _ in 0..2 {
        let end = rest.iter().position(|&b| b == 0).ok_or_else(malformed)?;
        rest = &rest[end + 1..];
    }

    match compressed {
        0 => Ok(rest.to_vec()),
        1 if method == 0 => {
            let mut text = Vec::new();
            ZlibDecoder::new(rest)
                .read_to_end(&mut text)
                .map_err(|e| Error::Encoding(format!("cannot inflate iTXt text: {e}")))?;
            Ok(text)
        }
        _ => Err(Error::Encoding(format!(
            "unknown iTXt compression (flag {compressed}, method {method})"
        ))),
    }
}

/// Uncompressed XMP `iTXt` data with empty language and translated keyword
pub(crate) fn encode_itxt(xml: &[u8]) -> Vec<u8> {
    let mut data = Vec::with_capacity(XMP_KEYWORD.len() + 5 + xml.len());
    data.extend_from_slice(XMP_KEYWORD);
    data.extend_from_slice(&[0, 0, 0, 0, 0]);
    data.extend_from_slice(xml);
    data
}

impl PngImage {
    pub fn new(container: PngContainer) -> Self {
        Self {
            container,
            cache: MetadataCache::default(),
        }
    }

    pub fn container(&self) -> &PngContainer {
        &self.container
    }

    fn load_xmp(container: &PngContainer) -> Result<Xmp> {
        match container.xmp_position() {
            Some(i) => {
                let chunk = &container.chunks[i];
                let text = decode_itxt(&chunk.data)?;
                decode_xmp(Some(&text))
            }
            None => decode_xmp(None),
        }
    }
}

impl ImageFormat for PngImage {
    fn from_reader<R: Read + Seek>(source: &mut R) -> Result<Self> {
        PngIO::new().parse(source).map(Self::new)
    }

    fn xmp(&mut self) -> Result<&mut Xmp> {
        let container = &self.container;
        self.cache.xmp_or_load(|| Self::load_xmp(container))
    }

    fn set_xmp(&mut self, xmp: Xmp) -> Result<()> {
        self.cache.replace_xmp(xmp);
        Ok(())
    }

    fn iptc(&mut self) -> Result<&mut Iptc> {
        Err(unsupported(MetadataKind::Iptc))
    }

    fn set_iptc(&mut self, _iptc: Iptc) -> Result<()> {
        Err(unsupported(MetadataKind::Iptc))
    }

    fn exif(&mut self) -> Result<&Exif> {
        Err(unsupported(MetadataKind::Exif))
    }

    fn sources(&mut self) -> Result<MetadataSources<'_>> {
        self.xmp()?;
        Ok(self.cache.sources())
    }

    fn has_pending_changes(&self) -> bool {
        self.cache.has_pending_changes()
    }

    fn write<W: Write>(&mut self, writer: &mut W) -> Result<()> {
        if let Some(xmp) = self.cache.pending_xmp() {
            let packet = xmp.to_bytes()?;
            log::debug!("writing {} byte XMP packet to PNG iTXt", packet.len());
            self.container.set_xmp_chunk(encode_itxt(&packet));
        }
        PngIO::new().write(&self.container, writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{build_png, minimal_png, xmp_itxt, xmp_packet, PNG_IHDR};
    use flate2::{write::ZlibEncoder, Compression};
    use std::io::Cursor;

    fn open(data: &[u8]) -> PngImage {
        PngImage::from_reader(&mut Cursor::new(data)).unwrap()
    }

    fn with_xmp(itxt: &[u8]) -> Vec<u8> {
        build_png(&[
            (*b"IHDR", &PNG_IHDR),
            (*b"iTXt", itxt),
            (*b"IDAT", &[0x78, 0x9C, 0x63, 0, 0, 0, 1, 0, 1]),
            (*b"IEND", &[]),
        ])
    }

    #[test]
    fn test_reads_uncompressed_xmp() {
        let xml = xmp_packet(r#"photoshop:City="Oslo""#, "");
        let mut image = open(&with_xmp(&xmp_itxt(&xml)));
        assert_eq!(image.xmp().unwrap().city().as_deref(), Some("Oslo"));
    }

    #[test]
    fn test_reads_compressed_xmp() {
        let xml = xmp_packet(r#"photoshop:City="Oslo""#, "");
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(xml.as_bytes()).unwrap();
        let mut itxt = b"XML:com.adobe.xmp\0\x01\0en\0\0".to_vec();
        itxt.extend(encoder.finish().unwrap());

        let mut image = open(&with_xmp(&itxt));
        assert_eq!(image.xmp().unwrap().city().as_deref(), Some("Oslo"));
    }

    #[test]
    fn test_truncated_itxt_is_encoding_error() {
        assert!(matches!(
            decode_itxt(b"XML:com.adobe.xmp\0\0"),
            Err(Error::Encoding(_))
        ));
        assert!(matches!(
            decode_itxt(b"XML:com.adobe.xmp\0\x02\0\0\0<x/>"),
            Err(Error::Encoding(_))
        ));
    }

    #[test]
    fn test_update_keeps_single_chunk() {
        let xml = xmp_packet(r#"photoshop:City="Oslo""#, "");
        let mut image = open(&with_xmp(&xmp_itxt(&xml)));
        image.xmp().unwrap().set_city(Some("Bergen"));

        let mut out = Vec::new();
        image.write(&mut out).unwrap();
        let mut reopened = open(&out);
        let itxt = reopened
            .container()
            .chunks
            .iter()
            .filter(|c| &c.chunk_type == b"iTXt")
            .count();
        assert_eq!(itxt, 1);
        assert_eq!(reopened.xmp().unwrap().city().as_deref(), Some("Bergen"));
    }

    #[test]
    fn test_new_chunk_goes_before_iend() {
        let mut image = open(&minimal_png());
        image.xmp().unwrap().set_headline(Some("Hi"));
        let mut out = Vec::new();
        image.write(&mut out).unwrap();

        let reopened = open(&out);
        let chunks = &reopened.container().chunks;
        assert_eq!(&chunks[chunks.len() - 1].chunk_type, b"IEND");
        assert_eq!(&chunks[chunks.len() - 2].chunk_type, b"iTXt");
        assert!(chunks[chunks.len() - 2]
            .data
            .starts_with(b"XML:com.adobe.xmp\0\0\0\0\0"));
    }

    #[test]
    fn test_iptc_and_exif_are_unsupported() {
        let mut image = open(&minimal_png());
        assert!(matches!(
            image.iptc(),
            Err(Error::Unsupported {
                metadata: MetadataKind::Iptc,
                container: ContainerKind::Png
            })
        ));
        assert!(matches!(
            image.exif(),
            Err(Error::Unsupported { metadata: MetadataKind::Exif, .. })
        ));
        assert!(image.set_iptc(Iptc::new()).is_err());

        let sources = image.sources().unwrap();
        assert!(sources.iptc.is_none());
        assert!(sources.exif.is_none());
    }

    #[test]
    fn test_unchanged_write_is_byte_exact() {
        let data = minimal_png();
        let mut image = open(&data);
        image.xmp().unwrap();
        let mut out = Vec::new();
        image.write(&mut out).unwrap();
        assert_eq!(out, data);
    }
}
