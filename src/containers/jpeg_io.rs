//! JPEG container I/O implementation

use super::{eof_as_truncated, read_payload, ContainerIO, ContainerKind};
use crate::{
    error::{Error, Result},
    segment::{
        JpegSegment, SegmentKind, JPEG_EXIF_SIGNATURE, JPEG_PHOTOSHOP_SIGNATURE,
        JPEG_XMP_SIGNATURE, MAX_JPEG_PAYLOAD,
    },
    MediaType,
};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Seek, SeekFrom, Write};

// JPEG markers
const SOI: u8 = 0xD8; // Start of Image
const EOI: u8 = 0xD9; // End of Image
const SOS: u8 = 0xDA; // Start of Scan (image data follows)
const APP0: u8 = 0xE0;
const APP1: u8 = 0xE1; // XMP / EXIF
const APP13: u8 = 0xED; // Photoshop resources / IPTC

// Special markers without length
const TEM: u8 = 0x01;
const RST0: u8 = 0xD0;
const RST7: u8 = 0xD7;

/// A parsed JPEG file
///
/// Header segments are kept in file order. Everything from the end of the
/// first SOS segment up to the EOI marker is opaque scan data.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JpegContainer {
    pub segments: Vec<JpegSegment>,
    /// Entropy-coded data following the first SOS header, never parsed
    pub image_data: Vec<u8>,
    /// Bytes found after the EOI marker
    pub trailer: Vec<u8>,
}

impl JpegContainer {
    /// Index of the first segment of the given kind
    pub fn position(&self, kind: SegmentKind) -> Option<usize> {
        self.segments.iter().position(|s| s.kind() == kind)
    }

    /// Index just past the leading run of APP0/APP1 segments
    ///
    /// New metadata segments go here so JFIF and EXIF stay first.
    pub fn metadata_insert_index(&self) -> usize {
        self.segments
            .iter()
            .position(|s| s.marker != APP0 && s.marker != APP1)
            .unwrap_or(self.segments.len())
    }

    /// XMP packet bytes from the APP1 XMP segment, without the signature
    pub fn xmp(&self) -> Option<&[u8]> {
        self.position(SegmentKind::Xmp)
            .map(|i| &self.segments[i].data[JPEG_XMP_SIGNATURE.len()..])
    }

    /// Replace the XMP payload, creating the APP1 segment if needed
    pub fn set_xmp(&mut self, xmp: &[u8]) -> Result<()> {
        let mut data = Vec::with_capacity(JPEG_XMP_SIGNATURE.len() + xmp.len());
        data.extend_from_slice(JPEG_XMP_SIGNATURE);
        data.extend_from_slice(xmp);
        if data.len() > MAX_JPEG_PAYLOAD {
            return Err(Error::DataTooLarge {
                size: data.len(),
                max: MAX_JPEG_PAYLOAD,
            });
        }

        match self.position(SegmentKind::Xmp) {
            Some(i) => self.segments[i].data = data,
            None => {
                let index = self.metadata_insert_index();
                self.segments.insert(index, JpegSegment::new(APP1, data));
            }
        }
        Ok(())
    }

    /// TIFF block from the APP1 EXIF segment, without the signature
    pub fn exif(&self) -> Option<&[u8]> {
        self.position(SegmentKind::Exif)
            .map(|i| &self.segments[i].data[JPEG_EXIF_SIGNATURE.len()..])
    }

    /// Concatenated Photoshop resource data of all APP13 segments
    pub fn photoshop_resources(&self) -> Option<Vec<u8>> {
        let mut found = false;
        let mut data = Vec::new();
        for segment in self.segments.iter().filter(|s| s.kind() == SegmentKind::Iptc) {
            found = true;
            data.extend_from_slice(&segment.data[JPEG_PHOTOSHOP_SIGNATURE.len()..]);
        }
        found.then_some(data)
    }

    /// Replace all Photoshop APP13 segments with `resources`
    ///
    /// Resource data larger than one segment is split across consecutive
    /// APP13 segments, each carrying the Photoshop signature.
    pub fn set_photoshop_resources(&mut self, resources: &[u8]) {
        let index = self
            .position(SegmentKind::Iptc)
            .unwrap_or_else(|| self.metadata_insert_index());
        self.segments.retain(|s| s.kind() != SegmentKind::Iptc);

        let piece_len = MAX_JPEG_PAYLOAD - JPEG_PHOTOSHOP_SIGNATURE.len();
        let pieces: Vec<&[u8]> = if resources.is_empty() {
            vec![resources]
        } else {
            resources.chunks(piece_len).collect()
        };
        for (n, piece) in pieces.into_iter().enumerate() {
            let mut data = JPEG_PHOTOSHOP_SIGNATURE.to_vec();
            data.extend_from_slice(piece);
            self.segments.insert(index + n, JpegSegment::new(APP13, data));
        }
    }
}

/// JPEG container I/O implementation
pub struct JpegIO;

impl JpegIO {
    /// Create a new JPEG I/O implementation
    pub fn new() -> Self {
        Self
    }
}

impl Default for JpegIO {
    fn default() -> Self {
        Self::new()
    }
}

/// Find the first EOI marker in scan data
fn find_eoi(data: &[u8]) -> Option<usize> {
    data.windows(2).position(|w| w == [0xFF, EOI])
}

impl ContainerIO for JpegIO {
    type Container = JpegContainer;

    fn container_type() -> ContainerKind {
        ContainerKind::Jpeg
    }

    fn supported_media_types() -> &'static [MediaType] {
        &[MediaType::Jpeg]
    }

    fn extensions() -> &'static [&'static str] {
        &["jpg", "jpeg", "jpe", "jfif"]
    }

    fn mime_types() -> &'static [&'static str] {
        &["image/jpeg", "image/jpg"]
    }

    fn detect(header: &[u8]) -> Option<ContainerKind> {
        // JPEG magic bytes: FF D8
        if header.len() >= 2 && header[0] == 0xFF && header[1] == SOI {
            Some(ContainerKind::Jpeg)
        } else {
            None
        }
    }

    fn parse<R: Read + Seek>(&self, source: &mut R) -> Result<JpegContainer> {
        source.seek(SeekFrom::Start(0))?;

        let mut soi = [0u8; 2];
        source
            .read_exact(&mut soi)
            .map_err(|_| Error::InvalidFormat("Not a JPEG file: too small".into()))?;
        if soi != [0xFF, SOI] {
            return Err(Error::InvalidFormat(
                "Not a JPEG file: missing SOI marker".into(),
            ));
        }

        let mut container = JpegContainer::default();
        loop {
            let offset = source.stream_position()?;
            let prefix = source
                .read_u8()
                .map_err(eof_as_truncated(offset, "marker"))?;
            if prefix != 0xFF {
                return Err(Error::InvalidSegment {
                    offset,
                    reason: format!("expected marker prefix 0xFF, found {prefix:#04x}"),
                });
            }
            let marker = source
                .read_u8()
                .map_err(eof_as_truncated(offset, "marker"))?;

            match marker {
                RST0..=RST7 | TEM => continue,
                EOI => {
                    source.read_to_end(&mut container.trailer)?;
                    break;
                }
                _ => {}
            }

            let length = source
                .read_u16::<BigEndian>()
                .map_err(eof_as_truncated(offset, "segment length"))?;
            if length < 2 {
                return Err(Error::InvalidSegment {
                    offset,
                    reason: format!("segment length {length} is smaller than the length field"),
                });
            }
            let data = read_payload(source, length as u64 - 2, offset, "segment payload")?;
            container.segments.push(JpegSegment {
                marker,
                offset,
                data,
            });

            if marker == SOS {
                let mut rest = Vec::new();
                source.read_to_end(&mut rest)?;
                match find_eoi(&rest) {
                    Some(pos) => {
                        container.trailer = rest.split_off(pos + 2);
                        rest.truncate(pos);
                    }
                    None => log::warn!("JPEG scan data has no EOI marker"),
                }
                container.image_data = rest;
                break;
            }
        }

        log::debug!(
            "parsed JPEG: {} segments, {} bytes of scan data",
            container.segments.len(),
            container.image_data.len()
        );
        Ok(container)
    }

    fn write<W: Write>(&self, container: &JpegContainer, writer: &mut W) -> Result<()> {
        writer.write_all(&[0xFF, SOI])?;

        for segment in &container.segments {
            if segment.data.len() > MAX_JPEG_PAYLOAD {
                return Err(Error::DataTooLarge {
                    size: segment.data.len(),
                    max: MAX_JPEG_PAYLOAD,
                });
            }
            writer.write_all(&[0xFF, segment.marker])?;
            writer.write_u16::<BigEndian>(segment.data.len() as u16 + 2)?;
            writer.write_all(&segment.data)?;
        }

        writer.write_all(&container.image_data)?;
        writer.write_all(&[0xFF, EOI])?;
        writer.write_all(&container.trailer)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{build_jpeg, minimal_jpeg};
    use std::io::Cursor;

    fn parse(data: Vec<u8>) -> Result<JpegContainer> {
        JpegIO::new().parse(&mut Cursor::new(data))
    }

    #[test]
    fn test_jpeg_parse_minimal() {
        // Minimal JPEG: SOI + EOI
        let container = parse(vec![0xFF, 0xD8, 0xFF, 0xD9]).unwrap();
        assert!(container.segments.is_empty());
        assert!(container.image_data.is_empty());
    }

    #[test]
    fn test_jpeg_round_trip_is_byte_exact() {
        let data = minimal_jpeg();
        let container = parse(data.clone()).unwrap();

        let names: Vec<_> = container.segments.iter().map(|s| s.name()).collect();
        assert_eq!(names, ["APP0", "DQT", "SOF0", "SOS"]);
        assert_eq!(container.segments[0].offset, 2);

        assert_eq!(JpegIO::new().serialize(&container).unwrap(), data);
    }

    #[test]
    fn test_jpeg_trailer_is_preserved() {
        let mut data = minimal_jpeg();
        data.extend_from_slice(b"trailing");
        let container = parse(data.clone()).unwrap();
        assert_eq!(container.trailer, b"trailing");
        assert_eq!(JpegIO::new().serialize(&container).unwrap(), data);
    }

    #[test]
    fn test_jpeg_missing_marker_prefix() {
        let mut data = minimal_jpeg();
        data[2] = 0x00;
        let err = parse(data).unwrap_err();
        assert!(matches!(err, Error::InvalidSegment { offset: 2, .. }));
    }

    #[test]
    fn test_jpeg_bad_signature() {
        let err = parse(vec![0x89, 0x50, 0x4E, 0x47]).unwrap_err();
        assert!(matches!(err, Error::InvalidFormat(_)));
    }

    #[test]
    fn test_jpeg_truncated_segment() {
        let data = vec![0xFF, 0xD8, 0xFF, 0xE1, 0x00, 0x40, 0x01, 0x02];
        let err = parse(data).unwrap_err();
        assert!(err.is_format_error());
    }

    #[test]
    fn test_jpeg_restart_markers_in_header_walk() {
        let data = build_jpeg(&[(0xE0, b"JFIF\0")]);
        let mut with_rst = data[..2].to_vec();
        with_rst.extend_from_slice(&[0xFF, 0xD3]);
        with_rst.extend_from_slice(&data[2..]);

        let container = parse(with_rst).unwrap();
        assert_eq!(container.segments[0].name(), "APP0");
    }

    #[test]
    fn test_xmp_inserted_after_app_run() {
        let data = build_jpeg(&[(0xE0, b"JFIF\0"), (0xE1, b"Exif\0\0MM"), (0xDB, &[0; 4])]);
        let mut container = parse(data).unwrap();
        assert!(container.xmp().is_none());

        container.set_xmp(b"<x:xmpmeta/>").unwrap();
        assert_eq!(container.segments[2].kind(), SegmentKind::Xmp);
        assert_eq!(container.xmp(), Some(&b"<x:xmpmeta/>"[..]));

        container.set_xmp(b"<x:xmpmeta></x:xmpmeta>").unwrap();
        let xmp_count = container
            .segments
            .iter()
            .filter(|s| s.kind() == SegmentKind::Xmp)
            .count();
        assert_eq!(xmp_count, 1);
    }

    #[test]
    fn test_xmp_too_large() {
        let mut container = parse(minimal_jpeg()).unwrap();
        let err = container.set_xmp(&vec![b' '; MAX_JPEG_PAYLOAD]).unwrap_err();
        assert!(matches!(err, Error::DataTooLarge { .. }));
    }

    #[test]
    fn test_photoshop_resources_split_and_joined() {
        let mut container = parse(minimal_jpeg()).unwrap();
        assert!(container.photoshop_resources().is_none());

        let resources: Vec<u8> = (0..100_000u32).map(|i| (i % 251) as u8).collect();
        container.set_photoshop_resources(&resources);

        let app13 = container
            .segments
            .iter()
            .filter(|s| s.marker == APP13)
            .count();
        assert_eq!(app13, 2);
        assert_eq!(container.photoshop_resources().unwrap(), resources);

        container.set_photoshop_resources(b"8BIM");
        assert_eq!(container.photoshop_resources().unwrap(), b"8BIM");
    }
}
