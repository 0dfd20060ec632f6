//! WebP (RIFF) container I/O implementation

use super::{eof_as_truncated, read_payload, ContainerIO, ContainerKind};
use crate::{
    error::{Error, Result},
    segment::{RiffChunk, SegmentKind, MAX_CHUNK_PAYLOAD},
    MediaType,
};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Seek, SeekFrom, Write};

const RIFF: &[u8; 4] = b"RIFF";
const WEBP: &[u8; 4] = b"WEBP";
const VP8X: [u8; 4] = *b"VP8X";

/// VP8X feature flags (first payload byte)
pub mod flags {
    pub const ICC: u8 = 0x20;
    pub const ALPHA: u8 = 0x10;
    pub const EXIF: u8 = 0x08;
    pub const XMP: u8 = 0x04;
    pub const ANIMATION: u8 = 0x02;
}

/// A parsed WebP file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WebpContainer {
    pub chunks: Vec<RiffChunk>,
}

impl WebpContainer {
    /// Extended files start with a VP8X chunk
    pub fn is_extended(&self) -> bool {
        self.chunks.first().is_some_and(|c| c.fourcc == VP8X)
    }

    /// Index of the first chunk of the given kind
    pub fn position(&self, kind: SegmentKind) -> Option<usize> {
        self.chunks.iter().position(|c| c.kind() == kind)
    }

    pub fn chunk(&self, kind: SegmentKind) -> Option<&RiffChunk> {
        self.position(kind).map(|i| &self.chunks[i])
    }

    /// VP8X feature flags, if the file is extended
    pub fn vp8x_flags(&self) -> Option<u8> {
        self.chunks
            .first()
            .filter(|c| c.fourcc == VP8X)
            .and_then(|c| c.data.first().copied())
    }

    /// Set or clear a VP8X feature flag; no-op for simple files
    pub fn set_vp8x_flag(&mut self, flag: u8, on: bool) {
        if let Some(first) = self.chunks.first_mut().filter(|c| c.fourcc == VP8X) {
            if let Some(bits) = first.data.first_mut() {
                if on {
                    *bits |= flag;
                } else {
                    *bits &= !flag;
                }
            }
        }
    }

    /// Replace the payload of the chunk of `kind`, appending a new chunk if absent
    pub fn upsert(&mut self, kind: SegmentKind, fourcc: [u8; 4], data: Vec<u8>) {
        match self.position(kind) {
            Some(i) => self.chunks[i].data = data,
            None => self.chunks.push(RiffChunk::new(fourcc, data)),
        }
    }
}

/// WebP container I/O implementation
pub struct WebpIO;

impl WebpIO {
    /// Create a new WebP I/O implementation
    pub fn new() -> Self {
        Self
    }
}

impl Default for WebpIO {
    fn default() -> Self {
        Self::new()
    }
}

impl ContainerIO for WebpIO {
    type Container = WebpContainer;

    fn container_type() -> ContainerKind {
        ContainerKind::WebP
    }

    fn supported_media_types() -> &'static [MediaType] {
        &[MediaType::WebP]
    }

    fn extensions() -> &'static [&'static str] {
        &["webp"]
    }

    fn mime_types() -> &'static [&'static str] {
        &["image/webp"]
    }

    fn detect(header: &[u8]) -> Option<ContainerKind> {
        if header.len() >= 12 && &header[0..4] == RIFF && &header[8..12] == WEBP {
            Some(ContainerKind::WebP)
        } else {
            None
        }
    }

    fn parse<R: Read + Seek>(&self, source: &mut R) -> Result<WebpContainer> {
        let stream_len = source.seek(SeekFrom::End(0))?;
        source.seek(SeekFrom::Start(0))?;

        let mut header = [0u8; 12];
        source
            .read_exact(&mut header)
            .map_err(|_| Error::InvalidFormat("Not a WebP file: too small".into()))?;
        if &header[0..4] != RIFF || &header[8..12] != WEBP {
            return Err(Error::InvalidFormat("Invalid RIFF/WEBP header".into()));
        }

        // The declared size bounds the chunk walk but is recomputed on write
        let riff_size = u32::from_le_bytes([header[4], header[5], header[6], header[7]]) as u64;
        let declared_end = 8 + riff_size;
        if declared_end != stream_len {
            log::warn!(
                "RIFF size declares {declared_end} bytes but the stream holds {stream_len}"
            );
        }
        let end = declared_end.min(stream_len);

        let mut container = WebpContainer::default();
        let mut offset = 12;
        while offset + 8 <= end {
            let mut fourcc = [0u8; 4];
            source
                .read_exact(&mut fourcc)
                .map_err(eof_as_truncated(offset, "chunk header"))?;
            let size = source
                .read_u32::<LittleEndian>()
                .map_err(eof_as_truncated(offset, "chunk header"))? as u64;
            let data = read_payload(source, size, offset, "chunk data")?;

            offset += 8 + size;
            if size % 2 == 1 && offset < end {
                source.read_u8()?;
                offset += 1;
            }
            container.chunks.push(RiffChunk { fourcc, data });
        }
        if offset < end {
            // Too short for a chunk header; dropped when the RIFF size is recomputed
            log::warn!(
                "ignoring {} bytes after the last RIFF chunk at offset {offset}",
                end - offset
            );
        }

        if container.chunks.is_empty() {
            return Err(Error::InvalidFormat("WebP file has no chunks".into()));
        }

        log::debug!(
            "parsed WebP: {} chunks, extended: {}",
            container.chunks.len(),
            container.is_extended()
        );
        Ok(container)
    }

    fn write<W: Write>(&self, container: &WebpContainer, writer: &mut W) -> Result<()> {
        let body: usize = 4 + container.chunks.iter().map(RiffChunk::encoded_len).sum::<usize>();
        if body > MAX_CHUNK_PAYLOAD {
            return Err(Error::DataTooLarge {
                size: body,
                max: MAX_CHUNK_PAYLOAD,
            });
        }

        writer.write_all(RIFF)?;
        writer.write_u32::<LittleEndian>(body as u32)?;
        writer.write_all(WEBP)?;

        for chunk in &container.chunks {
            writer.write_all(&chunk.fourcc)?;
            writer.write_u32::<LittleEndian>(chunk.data.len() as u32)?;
            writer.write_all(&chunk.data)?;
            if chunk.data.len() % 2 == 1 {
                writer.write_u8(0)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{build_webp, extended_webp, simple_webp};
    use std::io::Cursor;

    fn parse(data: Vec<u8>) -> Result<WebpContainer> {
        WebpIO::new().parse(&mut Cursor::new(data))
    }

    #[test]
    fn test_webp_round_trip_is_byte_exact() {
        for data in [simple_webp(), extended_webp()] {
            let container = parse(data.clone()).unwrap();
            assert_eq!(WebpIO::new().serialize(&container).unwrap(), data);
        }
    }

    #[test]
    fn test_webp_extended_flag() {
        assert!(!parse(simple_webp()).unwrap().is_extended());
        let container = parse(extended_webp()).unwrap();
        assert!(container.is_extended());
        assert_eq!(container.vp8x_flags(), Some(0));
    }

    #[test]
    fn test_odd_chunk_is_padded() {
        let data = build_webp(&[(*b"VP8X", &[0u8; 10][..]), (*b"XMP ", b"abc"), (*b"VP8L", &[1u8; 5])]);
        let container = parse(data.clone()).unwrap();
        assert_eq!(container.chunks[1].data, b"abc");
        assert_eq!(container.chunks[2].fourcc, *b"VP8L");
        assert_eq!(WebpIO::new().serialize(&container).unwrap(), data);
    }

    #[test]
    fn test_riff_size_recomputed() {
        let mut container = parse(extended_webp()).unwrap();
        container.upsert(SegmentKind::Xmp, *b"XMP ", b"<x:xmpmeta/>".to_vec());
        container.set_vp8x_flag(flags::XMP, true);

        let out = WebpIO::new().serialize(&container).unwrap();
        let size = u32::from_le_bytes([out[4], out[5], out[6], out[7]]) as usize;
        assert_eq!(size + 8, out.len());

        let reparsed = parse(out).unwrap();
        assert_eq!(reparsed.vp8x_flags(), Some(flags::XMP));
        assert_eq!(reparsed.chunk(SegmentKind::Xmp).unwrap().data, b"<x:xmpmeta/>");
    }

    #[test]
    fn test_short_tail_inside_riff_is_ignored() {
        let mut data = simple_webp();
        data.extend_from_slice(&[0xAB; 4]);
        let riff_size = (data.len() - 8) as u32;
        data[4..8].copy_from_slice(&riff_size.to_le_bytes());

        let container = parse(data).unwrap();
        assert_eq!(container.chunks.len(), 1);
        assert_eq!(container.chunks[0].fourcc, *b"VP8L");
        assert_eq!(WebpIO::new().serialize(&container).unwrap(), simple_webp());
    }

    #[test]
    fn test_webp_bad_header() {
        let err = parse(b"RIFF\x04\0\0\0WAVE".to_vec()).unwrap_err();
        assert!(matches!(err, Error::InvalidFormat(_)));
    }

    #[test]
    fn test_webp_truncated_chunk() {
        let mut data = extended_webp();
        data.truncate(data.len() - 3);
        // Keep the declared size so the walk reaches the short chunk
        let err = parse(data).unwrap_err();
        assert!(err.is_format_error());
    }
}
