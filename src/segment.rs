//! Segment types shared by the container parsers
//!
//! Every container format splits a file into typed, length-prefixed records.
//! The record types here carry only the type tag and the owned payload; all
//! framing logic lives in the container modules.

/// A byte range in a file (offset and size)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ByteRange {
    /// Offset from start of file
    pub offset: u64,
    /// Size in bytes
    pub size: u64,
}

impl ByteRange {
    /// Create a new byte range
    pub fn new(offset: u64, size: u64) -> Self {
        Self { offset, size }
    }

    /// Get the end offset of this range
    pub fn end_offset(&self) -> u64 {
        self.offset + self.size
    }
}

/// Maximum size for a single segment to prevent DOS attacks (256 MB)
///
/// Length fields are read from untrusted input, so no payload larger than this
/// is ever allocated.
pub const MAX_SEGMENT_SIZE: u64 = 256 * 1024 * 1024;

/// Largest payload a JPEG marker segment can hold (length field includes itself)
pub const MAX_JPEG_PAYLOAD: usize = 0xFFFD;

/// Largest payload a PNG or RIFF chunk can declare
pub const MAX_CHUNK_PAYLOAD: usize = u32::MAX as usize;

/// Logical classification of a segment
///
/// This represents what the record carries, independent of how it is
/// physically stored in any particular format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SegmentKind {
    /// File header or format descriptor
    Header,
    /// XMP packet
    Xmp,
    /// EXIF (TIFF structured) block
    Exif,
    /// IPTC or Photoshop resource data
    Iptc,
    /// Compressed image data
    ImageData,
    /// Other/unknown segment type
    Other,
}

impl SegmentKind {
    /// Get a string representation of this kind
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Header => "header",
            Self::Xmp => "xmp",
            Self::Exif => "exif",
            Self::Iptc => "iptc",
            Self::ImageData => "image_data",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for SegmentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// JPEG
// ============================================================================

/// Adobe XMP signature that prefixes the XMP packet in an APP1 segment
pub const JPEG_XMP_SIGNATURE: &[u8] = b"http://ns.adobe.com/xap/1.0/\0";
/// EXIF signature that prefixes the TIFF block in an APP1 segment
pub const JPEG_EXIF_SIGNATURE: &[u8] = b"Exif\0\0";
/// Photoshop signature that prefixes resource blocks in an APP13 segment
pub const JPEG_PHOTOSHOP_SIGNATURE: &[u8] = b"Photoshop 3.0\0";

/// A JPEG marker segment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JpegSegment {
    /// Marker byte (the byte following 0xFF)
    pub marker: u8,
    /// Offset of the 0xFF marker prefix in the source file (0 for new segments)
    pub offset: u64,
    /// Payload, excluding the two length bytes
    pub data: Vec<u8>,
}

impl JpegSegment {
    pub fn new(marker: u8, data: Vec<u8>) -> Self {
        Self {
            marker,
            offset: 0,
            data,
        }
    }

    /// Short marker name, e.g. `APP1`
    pub fn name(&self) -> &'static str {
        marker_name(self.marker)
    }

    /// Marker description, e.g. `Start of scan`
    pub fn description(&self) -> &'static str {
        marker_description(self.marker)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Classify by marker and payload signature
    pub fn kind(&self) -> SegmentKind {
        match self.marker {
            0xE1 if self.data.starts_with(JPEG_XMP_SIGNATURE) => SegmentKind::Xmp,
            0xE1 if self.data.starts_with(JPEG_EXIF_SIGNATURE) => SegmentKind::Exif,
            0xED if self.data.starts_with(JPEG_PHOTOSHOP_SIGNATURE) => SegmentKind::Iptc,
            0xDA => SegmentKind::ImageData,
            0xC0..=0xCF | 0xDB | 0xDD => SegmentKind::Header,
            _ => SegmentKind::Other,
        }
    }
}

/// Get the short name of a JPEG marker
pub fn marker_name(marker: u8) -> &'static str {
    const APP: [&str; 16] = [
        "APP0", "APP1", "APP2", "APP3", "APP4", "APP5", "APP6", "APP7", "APP8", "APP9", "APP10",
        "APP11", "APP12", "APP13", "APP14", "APP15",
    ];
    const JPG: [&str; 14] = [
        "JPG0", "JPG1", "JPG2", "JPG3", "JPG4", "JPG5", "JPG6", "JPG7", "JPG8", "JPG9", "JPG10",
        "JPG11", "JPG12", "JPG13",
    ];
    const RST: [&str; 8] = [
        "RST0", "RST1", "RST2", "RST3", "RST4", "RST5", "RST6", "RST7",
    ];

    match marker {
        0x01 => "TEM",
        0x02..=0xBF => "RES",
        0xC0 => "SOF0",
        0xC1 => "SOF1",
        0xC2 => "SOF2",
        0xC3 => "SOF3",
        0xC4 => "DHT",
        0xC5 => "SOF5",
        0xC6 => "SOF6",
        0xC7 => "SOF7",
        0xC8 => "JPG",
        0xC9 => "SOF9",
        0xCA => "SOF10",
        0xCB => "SOF11",
        0xCC => "DAC",
        0xCD => "SOF13",
        0xCE => "SOF14",
        0xCF => "SOF15",
        0xD0..=0xD7 => RST[(marker - 0xD0) as usize],
        0xD8 => "SOI",
        0xD9 => "EOI",
        0xDA => "SOS",
        0xDB => "DQT",
        0xDC => "DNL",
        0xDD => "DRI",
        0xDE => "DHP",
        0xDF => "EXP",
        0xE0..=0xEF => APP[(marker - 0xE0) as usize],
        0xF0..=0xFD => JPG[(marker - 0xF0) as usize],
        0xFE => "COM",
        _ => "UNKNOWN",
    }
}

/// Get a human-readable description of a JPEG marker
pub fn marker_description(marker: u8) -> &'static str {
    match marker {
        0x01 => "For temporary private use in arithmetic coding",
        0x02..=0xBF => "Reserved",
        0xC0 => "Baseline DCT",
        0xC1 => "Extended sequential DCT",
        0xC2 => "Progressive DCT",
        0xC3 => "Lossless (sequential)",
        0xC4 => "Define Huffman table(s)",
        0xC5 => "Differential sequential DCT",
        0xC6 => "Differential progressive DCT",
        0xC7 => "Differential lossless (sequential)",
        0xC8 => "Reserved for JPEG extensions",
        0xC9 => "Extended sequential DCT, arithmetic coding",
        0xCA => "Progressive DCT, arithmetic coding",
        0xCB => "Lossless (sequential), arithmetic coding",
        0xCC => "Define arithmetic coding conditioning(s)",
        0xCD => "Differential sequential DCT, arithmetic coding",
        0xCE => "Differential progressive DCT, arithmetic coding",
        0xCF => "Differential lossless (sequential), arithmetic coding",
        0xD0..=0xD7 => "Restart with modulo 8 count",
        0xD8 => "Start of image",
        0xD9 => "End of image",
        0xDA => "Start of scan",
        0xDB => "Define quantization table(s)",
        0xDC => "Define number of lines",
        0xDD => "Define restart interval",
        0xDE => "Define hierarchical progression",
        0xDF => "Expand reference component(s)",
        0xE0..=0xEF => "Reserved for application segments",
        0xF0..=0xFD => "Reserved for JPEG extensions",
        0xFE => "Comment",
        _ => "Unknown marker",
    }
}

// ============================================================================
// PNG
// ============================================================================

/// A PNG chunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PngChunk {
    /// Four-byte ASCII chunk type, e.g. `iTXt`
    pub chunk_type: [u8; 4],
    pub data: Vec<u8>,
}

impl PngChunk {
    pub fn new(chunk_type: [u8; 4], data: Vec<u8>) -> Self {
        Self { chunk_type, data }
    }

    /// Chunk type as text (lossy for non-ASCII types)
    pub fn type_str(&self) -> String {
        String::from_utf8_lossy(&self.chunk_type).into_owned()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// CRC-32 over chunk type and data, as stored after the chunk
    pub fn crc(&self) -> u32 {
        crc32(&self.chunk_type, &self.data)
    }
}

/// PNG CRC-32 (ISO 3309 polynomial) over the chunk type followed by its data
pub fn crc32(chunk_type: &[u8], data: &[u8]) -> u32 {
    let mut crc = 0xFFFFFFFF_u32;

    for &byte in chunk_type.iter().chain(data) {
        crc ^= byte as u32;
        for _ in 0..8 {
            if crc & 1 != 0 {
                crc = (crc >> 1) ^ 0xEDB88320;
            } else {
                crc >>= 1;
            }
        }
    }

    crc ^ 0xFFFFFFFF
}

// ============================================================================
// RIFF (WebP)
// ============================================================================

/// A RIFF chunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RiffChunk {
    /// Four-character code, e.g. `VP8X` or `XMP `
    pub fourcc: [u8; 4],
    /// Logical payload, without the pad byte
    pub data: Vec<u8>,
}

impl RiffChunk {
    pub fn new(fourcc: [u8; 4], data: Vec<u8>) -> Self {
        Self { fourcc, data }
    }

    pub fn fourcc_str(&self) -> String {
        String::from_utf8_lossy(&self.fourcc).into_owned()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Bytes this chunk occupies on disk: header, payload and pad byte
    pub fn encoded_len(&self) -> usize {
        8 + self.data.len() + (self.data.len() & 1)
    }

    pub fn kind(&self) -> SegmentKind {
        match &self.fourcc {
            b"XMP " => SegmentKind::Xmp,
            b"EXIF" => SegmentKind::Exif,
            b"VP8X" => SegmentKind::Header,
            b"VP8 " | b"VP8L" | b"ALPH" | b"ANIM" | b"ANMF" => SegmentKind::ImageData,
            _ => SegmentKind::Other,
        }
    }
}

// ============================================================================
// Photoshop image resources
// ============================================================================

/// Image resource ID of an IPTC-NAA record
pub const RESOURCE_IPTC: u16 = 0x0404;
/// Image resource ID of EXIF data 1
pub const RESOURCE_EXIF: u16 = 0x0422;
/// Image resource ID of EXIF data 3
pub const RESOURCE_EXIF_3: u16 = 0x0423;
/// Image resource ID of the XMP packet
pub const RESOURCE_XMP: u16 = 0x0424;

/// A Photoshop image resource block (`8BIM` record)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceBlock {
    pub id: u16,
    /// Pascal-string name bytes, without the length prefix or padding
    pub name: Vec<u8>,
    pub data: Vec<u8>,
}

impl ResourceBlock {
    /// Create an unnamed resource block
    pub fn new(id: u16, data: Vec<u8>) -> Self {
        Self {
            id,
            name: Vec::new(),
            data,
        }
    }

    pub fn kind(&self) -> SegmentKind {
        match self.id {
            RESOURCE_XMP => SegmentKind::Xmp,
            RESOURCE_IPTC => SegmentKind::Iptc,
            RESOURCE_EXIF | RESOURCE_EXIF_3 => SegmentKind::Exif,
            _ => SegmentKind::Other,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crc_matches_iend() {
        // IEND with no data always carries this CRC
        assert_eq!(crc32(b"IEND", &[]), 0xAE426082);
    }

    #[test]
    fn test_marker_names() {
        assert_eq!(marker_name(0xE1), "APP1");
        assert_eq!(marker_name(0xED), "APP13");
        assert_eq!(marker_name(0xD3), "RST3");
        assert_eq!(marker_name(0xF5), "JPG5");
        assert_eq!(marker_name(0x01), "TEM");
        assert_eq!(marker_name(0x40), "RES");
        assert_eq!(marker_description(0xDA), "Start of scan");
    }

    #[test]
    fn test_jpeg_segment_kind() {
        let mut payload = JPEG_XMP_SIGNATURE.to_vec();
        payload.extend_from_slice(b"<x:xmpmeta/>");
        assert_eq!(JpegSegment::new(0xE1, payload).kind(), SegmentKind::Xmp);
        assert_eq!(
            JpegSegment::new(0xE1, b"Exif\0\0MM".to_vec()).kind(),
            SegmentKind::Exif
        );
        assert_eq!(JpegSegment::new(0xE0, b"JFIF\0".to_vec()).kind(), SegmentKind::Other);
    }

    #[test]
    fn test_riff_chunk_padding() {
        assert_eq!(RiffChunk::new(*b"XMP ", vec![0; 3]).encoded_len(), 12);
        assert_eq!(RiffChunk::new(*b"XMP ", vec![0; 4]).encoded_len(), 12);
    }
}
