//! Test utilities for building synthetic image files.
//!
//! Every builder produces a small but structurally valid file so tests can
//! run without binary fixtures:
//! - JPEG, PNG, WebP and PSD containers with caller-supplied records
//! - XMP packets, IPTC datasets and TIFF/EXIF blocks
//!
//! # Usage
//!
//! ```
//! use imeta_io::test_utils::*;
//!
//! let png = build_png(&[
//!     (*b"IHDR", &PNG_IHDR[..]),
//!     (*b"iTXt", &xmp_itxt(&xmp_packet(r#"photoshop:Headline="Hi""#, ""))),
//!     (*b"IEND", &[]),
//! ]);
//! assert_eq!(&png[1..4], b"PNG");
//! ```

use crate::{metadata::exif::IfdGroup, segment::crc32};

/// JFIF APP0 payload
pub const JFIF_APP0: &[u8] = b"JFIF\0\x01\x01\0\0\x01\0\x01\0\0";

/// IHDR for a 1x1 RGB image
pub const PNG_IHDR: [u8; 13] = [0, 0, 0, 1, 0, 0, 0, 1, 8, 2, 0, 0, 0];

/// Scan header and a few bytes of entropy-coded data, including a stuffed 0xFF
const JPEG_SOS: &[u8] = &[1, 1, 0, 0, 0x3F, 0];
const JPEG_SCAN: &[u8] = &[0x12, 0x34, 0xFF, 0x00, 0x56, 0x78];

/// JPEG with the given header segments followed by one scan and EOI
pub fn build_jpeg(segments: &[(u8, &[u8])]) -> Vec<u8> {
    let mut out = vec![0xFF, 0xD8];
    for (marker, data) in segments.iter().chain([(0xDA, JPEG_SOS)].iter()) {
        out.extend_from_slice(&[0xFF, *marker]);
        out.extend_from_slice(&(data.len() as u16 + 2).to_be_bytes());
        out.extend_from_slice(data);
    }
    out.extend_from_slice(JPEG_SCAN);
    out.extend_from_slice(&[0xFF, 0xD9]);
    out
}

/// JPEG with APP0, DQT and SOF0 segments
pub fn minimal_jpeg() -> Vec<u8> {
    build_jpeg(&[
        (0xE0, JFIF_APP0),
        (0xDB, &[0u8; 65]),
        (0xC0, &[8, 0, 1, 0, 1, 1, 1, 0x11, 0]),
    ])
}

/// APP1 payload carrying an XMP packet
pub fn jpeg_xmp_app1(xml: &str) -> Vec<u8> {
    let mut data = crate::segment::JPEG_XMP_SIGNATURE.to_vec();
    data.extend_from_slice(xml.as_bytes());
    data
}

/// APP1 payload carrying a TIFF block
pub fn jpeg_exif_app1(tiff: &[u8]) -> Vec<u8> {
    let mut data = crate::segment::JPEG_EXIF_SIGNATURE.to_vec();
    data.extend_from_slice(tiff);
    data
}

/// APP13 payload carrying an IPTC resource
pub fn jpeg_iptc_app13(iim: &[u8]) -> Vec<u8> {
    let mut data = crate::segment::JPEG_PHOTOSHOP_SIGNATURE.to_vec();
    data.extend_from_slice(&resource_block(crate::segment::RESOURCE_IPTC, iim));
    data
}

/// PNG with the given chunks; CRCs are computed, IEND is not added
pub fn build_png(chunks: &[([u8; 4], &[u8])]) -> Vec<u8> {
    let mut out = vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
    for (chunk_type, data) in chunks {
        out.extend_from_slice(&(data.len() as u32).to_be_bytes());
        out.extend_from_slice(chunk_type);
        out.extend_from_slice(data);
        out.extend_from_slice(&crc32(chunk_type, data).to_be_bytes());
    }
    out
}

/// PNG with IHDR, one IDAT and IEND
pub fn minimal_png() -> Vec<u8> {
    build_png(&[
        (*b"IHDR", &PNG_IHDR),
        (*b"IDAT", &[0x78, 0x9C, 0x63, 0x60, 0x60, 0x60, 0, 0, 0, 4, 0, 1]),
        (*b"IEND", &[]),
    ])
}

/// Uncompressed iTXt payload for an XMP packet
pub fn xmp_itxt(xml: &str) -> Vec<u8> {
    let mut data = b"XML:com.adobe.xmp\0\0\0\0\0".to_vec();
    data.extend_from_slice(xml.as_bytes());
    data
}

/// WebP with the given chunks; pad bytes and RIFF size are computed
pub fn build_webp(chunks: &[([u8; 4], &[u8])]) -> Vec<u8> {
    let mut body = b"WEBP".to_vec();
    for (fourcc, data) in chunks {
        body.extend_from_slice(fourcc);
        body.extend_from_slice(&(data.len() as u32).to_le_bytes());
        body.extend_from_slice(data);
        if data.len() % 2 == 1 {
            body.push(0);
        }
    }
    let mut out = b"RIFF".to_vec();
    out.extend_from_slice(&(body.len() as u32).to_le_bytes());
    out.extend_from_slice(&body);
    out
}

const VP8L_1X1: &[u8] = &[0x2F, 0, 0, 0, 0x10, 0x07];

/// Simple (lossless, bitstream-only) WebP
pub fn simple_webp() -> Vec<u8> {
    build_webp(&[(*b"VP8L", VP8L_1X1)])
}

/// Extended WebP: VP8X with no feature flags, then the bitstream
pub fn extended_webp() -> Vec<u8> {
    build_webp(&[(*b"VP8X", &[0u8; 10]), (*b"VP8L", VP8L_1X1)])
}

/// One encoded `8BIM` resource block with an empty name
pub fn resource_block(id: u16, data: &[u8]) -> Vec<u8> {
    let mut out = b"8BIM".to_vec();
    out.extend_from_slice(&id.to_be_bytes());
    out.extend_from_slice(&[0, 0]);
    out.extend_from_slice(&(data.len() as u32).to_be_bytes());
    out.extend_from_slice(data);
    if data.len() % 2 == 1 {
        out.push(0);
    }
    out
}

/// PSD with the given image resources, empty color mode data and a small tail
pub fn build_psd(resources: &[(u16, &[u8])]) -> Vec<u8> {
    let mut out = b"8BPS".to_vec();
    out.extend_from_slice(&[0, 1, 0, 0, 0, 0, 0, 0, 0, 3]);
    out.extend_from_slice(&1u32.to_be_bytes());
    out.extend_from_slice(&1u32.to_be_bytes());
    out.extend_from_slice(&[0, 8, 0, 3]);
    out.extend_from_slice(&0u32.to_be_bytes());

    let mut section = Vec::new();
    for (id, data) in resources {
        section.extend_from_slice(&resource_block(*id, data));
    }
    out.extend_from_slice(&(section.len() as u32).to_be_bytes());
    out.extend_from_slice(&section);

    // Empty layer/mask section, raw image data
    out.extend_from_slice(&0u32.to_be_bytes());
    out.extend_from_slice(&[0, 0, 0xFF, 0xFF, 0xFF]);
    out
}

/// PSD with a single resolution-info resource
pub fn minimal_psd() -> Vec<u8> {
    build_psd(&[(0x03ED, &[0u8; 16])])
}

/// XMP packet with one `rdf:Description` declaring the common namespaces
pub fn xmp_packet(attributes: &str, body: &str) -> String {
    format!(
        concat!(
            r#"<x:xmpmeta xmlns:x="adobe:ns:meta/">"#,
            r#"<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#">"#,
            r#"<rdf:Description rdf:about="" "#,
            r#"xmlns:dc="http://purl.org/dc/elements/1.1/" "#,
            r#"xmlns:photoshop="http://ns.adobe.com/photoshop/1.0/" "#,
            r#"xmlns:Iptc4xmpCore="http://iptc.org/std/Iptc4xmpCore/1.0/xmlns/" "#,
            r#"{}>{}</rdf:Description></rdf:RDF></x:xmpmeta>"#
        ),
        attributes, body
    )
}

/// One IIM dataset with a standard (two byte) length
pub fn iptc_dataset(record: u8, dataset: u8, data: &[u8]) -> Vec<u8> {
    let mut out = vec![0x1C, record, dataset];
    out.extend_from_slice(&(data.len() as u16).to_be_bytes());
    out.extend_from_slice(data);
    out
}

/// Little-endian TIFF block builder for EXIF tests
#[derive(Debug, Default, Clone)]
pub struct TiffBuilder {
    ifd0: Vec<TiffEntry>,
    exif: Vec<TiffEntry>,
    gps: Vec<TiffEntry>,
}

#[derive(Debug, Clone)]
struct TiffEntry {
    tag: u16,
    type_code: u16,
    count: u32,
    data: Vec<u8>,
}

impl TiffBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a raw entry; `data` must already be little-endian
    pub fn entry(mut self, ifd: IfdGroup, tag: u16, type_code: u16, count: u32, data: Vec<u8>) -> Self {
        let entry = TiffEntry {
            tag,
            type_code,
            count,
            data,
        };
        match ifd {
            IfdGroup::Exif => self.exif.push(entry),
            IfdGroup::Gps => self.gps.push(entry),
            _ => self.ifd0.push(entry),
        }
        self
    }

    pub fn ascii(self, ifd: IfdGroup, tag: u16, value: &str) -> Self {
        let mut data = value.as_bytes().to_vec();
        data.push(0);
        let count = data.len() as u32;
        self.entry(ifd, tag, 2, count, data)
    }

    pub fn short(self, ifd: IfdGroup, tag: u16, value: u16) -> Self {
        self.entry(ifd, tag, 3, 1, value.to_le_bytes().to_vec())
    }

    pub fn long(self, ifd: IfdGroup, tag: u16, value: u32) -> Self {
        self.entry(ifd, tag, 4, 1, value.to_le_bytes().to_vec())
    }

    pub fn rational(self, ifd: IfdGroup, tag: u16, values: &[(u32, u32)]) -> Self {
        let data = values
            .iter()
            .flat_map(|(n, d)| n.to_le_bytes().into_iter().chain(d.to_le_bytes()))
            .collect();
        self.entry(ifd, tag, 5, values.len() as u32, data)
    }

    pub fn srational(self, ifd: IfdGroup, tag: u16, values: &[(i32, i32)]) -> Self {
        let data = values
            .iter()
            .flat_map(|(n, d)| n.to_le_bytes().into_iter().chain(d.to_le_bytes()))
            .collect();
        self.entry(ifd, tag, 10, values.len() as u32, data)
    }

    /// Lay out IFD0, then the EXIF and GPS IFDs, each followed by its values
    pub fn build(&self) -> Vec<u8> {
        let pointer = |tag| TiffEntry {
            tag,
            type_code: 4,
            count: 1,
            data: vec![0; 4],
        };
        let mut ifd0 = self.ifd0.clone();
        if !self.exif.is_empty() {
            ifd0.push(pointer(0x8769));
        }
        if !self.gps.is_empty() {
            ifd0.push(pointer(0x8825));
        }

        let exif_offset = 8 + ifd_size(&ifd0);
        let gps_offset = exif_offset + if self.exif.is_empty() { 0 } else { ifd_size(&self.exif) };
        for entry in ifd0.iter_mut() {
            match entry.tag {
                0x8769 => entry.data = (exif_offset as u32).to_le_bytes().to_vec(),
                0x8825 => entry.data = (gps_offset as u32).to_le_bytes().to_vec(),
                _ => {}
            }
        }

        let mut out = b"II\x2A\0\x08\0\0\0".to_vec();
        out.extend(write_ifd(&ifd0, 8));
        if !self.exif.is_empty() {
            out.extend(write_ifd(&self.exif, exif_offset));
        }
        if !self.gps.is_empty() {
            out.extend(write_ifd(&self.gps, gps_offset));
        }
        out
    }
}

fn padded(len: usize) -> usize {
    len + (len & 1)
}

fn ifd_size(entries: &[TiffEntry]) -> usize {
    let values: usize = entries
        .iter()
        .filter(|e| e.data.len() > 4)
        .map(|e| padded(e.data.len()))
        .sum();
    2 + 12 * entries.len() + 4 + values
}

fn write_ifd(entries: &[TiffEntry], offset: usize) -> Vec<u8> {
    let mut entries = entries.to_vec();
    entries.sort_by_key(|e| e.tag);

    let mut head = (entries.len() as u16).to_le_bytes().to_vec();
    let mut values = Vec::new();
    let mut value_offset = offset + 2 + 12 * entries.len() + 4;
    for e in &entries {
        head.extend_from_slice(&e.tag.to_le_bytes());
        head.extend_from_slice(&e.type_code.to_le_bytes());
        head.extend_from_slice(&e.count.to_le_bytes());
        if e.data.len() <= 4 {
            let mut inline = e.data.clone();
            inline.resize(4, 0);
            head.extend_from_slice(&inline);
        } else {
            head.extend_from_slice(&(value_offset as u32).to_le_bytes());
            values.extend_from_slice(&e.data);
            if e.data.len() % 2 == 1 {
                values.push(0);
            }
            value_offset += padded(e.data.len());
        }
    }
    head.extend_from_slice(&0u32.to_le_bytes());
    head.extend(values);
    head
}
