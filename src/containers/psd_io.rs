//! PSD container I/O implementation
//!
//! Only the image resource section is parsed. The file header and color mode
//! data are kept verbatim, and everything after the resource section (layer
//! and mask information, image data) is an opaque tail.

use super::{eof_as_truncated, read_payload, ContainerIO, ContainerKind};
use crate::{
    error::{Error, Result},
    irb,
    segment::{ByteRange, ResourceBlock, SegmentKind},
    MediaType,
};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Seek, SeekFrom, Write};

const PSD_SIGNATURE: &[u8; 4] = b"8BPS";
const HEADER_LEN: usize = 26;

/// A parsed Photoshop document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PsdContainer {
    /// Fixed 26-byte file header
    pub header: Vec<u8>,
    /// Color mode data section content, without its length field
    pub color_mode_data: Vec<u8>,
    pub resources: Vec<ResourceBlock>,
    /// Bytes after the last resource block inside the resource section
    pub resource_padding: Vec<u8>,
    /// Location of the image resource section in the source file, length field included
    pub resource_section: ByteRange,
    /// Layer, mask and image data sections
    pub tail: Vec<u8>,
}

impl PsdContainer {
    /// Data of the first resource of the given kind
    pub fn resource(&self, kind: SegmentKind) -> Option<&[u8]> {
        self.resources
            .iter()
            .find(|b| b.kind() == kind)
            .map(|b| b.data.as_slice())
    }

    pub fn set_resource(&mut self, id: u16, data: Vec<u8>) {
        irb::upsert_block(&mut self.resources, id, data);
    }
}

/// PSD container I/O implementation
pub struct PsdIO;

impl PsdIO {
    /// Create a new PSD I/O implementation
    pub fn new() -> Self {
        Self
    }
}

impl Default for PsdIO {
    fn default() -> Self {
        Self::new()
    }
}

impl ContainerIO for PsdIO {
    type Container = PsdContainer;

    fn container_type() -> ContainerKind {
        ContainerKind::Psd
    }

    fn supported_media_types() -> &'static [MediaType] {
        &[MediaType::Psd]
    }

    fn extensions() -> &'static [&'static str] {
        &["psd", "psb"]
    }

    fn mime_types() -> &'static [&'static str] {
        &["image/vnd.adobe.photoshop", "application/x-photoshop"]
    }

    fn detect(header: &[u8]) -> Option<ContainerKind> {
        if header.len() >= 4 && &header[..4] == PSD_SIGNATURE {
            Some(ContainerKind::Psd)
        } else {
            None
        }
    }

    fn parse<R: Read + Seek>(&self, source: &mut R) -> Result<PsdContainer> {
        source.seek(SeekFrom::Start(0))?;

        let mut header = vec![0u8; HEADER_LEN];
        source
            .read_exact(&mut header)
            .map_err(|_| Error::InvalidFormat("Not a PSD file: too small".into()))?;
        if &header[..4] != PSD_SIGNATURE {
            return Err(Error::InvalidFormat("Invalid PSD signature".into()));
        }

        let color_offset = HEADER_LEN as u64;
        let color_len = source
            .read_u32::<BigEndian>()
            .map_err(eof_as_truncated(color_offset, "color mode data length"))?;
        let color_mode_data =
            read_payload(source, color_len as u64, color_offset, "color mode data")?;

        let start = source.stream_position()?;
        let section_len = source
            .read_u32::<BigEndian>()
            .map_err(eof_as_truncated(start, "image resource section length"))?;
        let section = read_payload(source, section_len as u64, start, "image resource section")?;
        let (resources, resource_padding) = irb::parse_section(&section, start + 4)?;

        let mut tail = Vec::new();
        source.read_to_end(&mut tail)?;

        log::debug!(
            "parsed PSD: {} image resources, {} byte tail",
            resources.len(),
            tail.len()
        );
        Ok(PsdContainer {
            header,
            color_mode_data,
            resources,
            resource_padding,
            resource_section: ByteRange::new(start, 4 + section_len as u64),
            tail,
        })
    }

    fn write<W: Write>(&self, container: &PsdContainer, writer: &mut W) -> Result<()> {
        let mut resources = irb::encode_blocks(&container.resources)?;
        resources.extend_from_slice(&container.resource_padding);
        if resources.len() > u32::MAX as usize {
            return Err(Error::DataTooLarge {
                size: resources.len(),
                max: u32::MAX as usize,
            });
        }

        writer.write_all(&container.header)?;
        writer.write_u32::<BigEndian>(container.color_mode_data.len() as u32)?;
        writer.write_all(&container.color_mode_data)?;
        writer.write_u32::<BigEndian>(resources.len() as u32)?;
        writer.write_all(&resources)?;
        writer.write_all(&container.tail)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::{RESOURCE_IPTC, RESOURCE_XMP};
    use crate::test_utils::{build_psd, minimal_psd};
    use std::io::Cursor;

    fn parse(data: Vec<u8>) -> Result<PsdContainer> {
        PsdIO::new().parse(&mut Cursor::new(data))
    }

    #[test]
    fn test_psd_round_trip_is_byte_exact() {
        let data = build_psd(&[(0x03ED, &[0u8; 16][..]), (RESOURCE_XMP, b"<x:xmpmeta/>")]);
        let container = parse(data.clone()).unwrap();

        assert_eq!(container.header.len(), 26);
        assert_eq!(container.resources.len(), 2);
        assert_eq!(container.resource_section.offset, 30);
        assert_eq!(container.resource(SegmentKind::Xmp), Some(&b"<x:xmpmeta/>"[..]));
        assert_eq!(PsdIO::new().serialize(&container).unwrap(), data);
    }

    #[test]
    fn test_psd_growing_resource_keeps_tail() {
        let data = minimal_psd();
        let mut container = parse(data).unwrap();
        let tail = container.tail.clone();

        container.set_resource(RESOURCE_IPTC, vec![0x1C; 301]);
        let out = PsdIO::new().serialize(&container).unwrap();
        let reparsed = parse(out).unwrap();

        assert_eq!(reparsed.resource(SegmentKind::Iptc).map(|d| d.len()), Some(301));
        assert_eq!(reparsed.tail, tail);
    }

    #[test]
    fn test_psd_padded_resource_section() {
        let mut data = minimal_psd();
        // One 28 byte block at 34..62, followed by two zero pad bytes
        let rest = data.split_off(62);
        data.extend_from_slice(&[0, 0]);
        data.extend_from_slice(&rest);
        data[30..34].copy_from_slice(&30u32.to_be_bytes());

        let mut container = parse(data.clone()).unwrap();
        assert_eq!(container.resources.len(), 1);
        assert_eq!(container.resource_padding, [0, 0]);
        assert_eq!(PsdIO::new().serialize(&container).unwrap(), data);

        container.set_resource(RESOURCE_XMP, b"<x:xmpmeta/>".to_vec());
        let reparsed = parse(PsdIO::new().serialize(&container).unwrap()).unwrap();
        assert_eq!(reparsed.resources.len(), 2);
        assert_eq!(reparsed.resource_padding, [0, 0]);
    }

    #[test]
    fn test_psd_bad_signature() {
        let mut data = minimal_psd();
        data[0] = b'X';
        assert!(matches!(parse(data).unwrap_err(), Error::InvalidFormat(_)));
    }

    #[test]
    fn test_psd_truncated_resource_section() {
        let mut data = minimal_psd();
        // Resource section length field sits after header and empty color data
        data[30..34].copy_from_slice(&4096u32.to_be_bytes());
        assert!(parse(data).unwrap_err().is_format_error());
    }
}
