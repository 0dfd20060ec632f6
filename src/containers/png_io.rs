//! PNG container I/O implementation

use super::{eof_as_truncated, read_payload, ContainerIO, ContainerKind};
use crate::{
    error::{Error, Result},
    segment::{crc32, PngChunk, SegmentKind, MAX_CHUNK_PAYLOAD},
    MediaType,
};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Seek, SeekFrom, Write};

const PNG_SIGNATURE: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

const IEND: [u8; 4] = *b"IEND";
const ITXT: [u8; 4] = *b"iTXt";

/// iTXt keyword used for XMP packets
pub(crate) const XMP_KEYWORD: &[u8] = b"XML:com.adobe.xmp";

/// A parsed PNG file: its chunks in order, ending with IEND
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PngContainer {
    pub chunks: Vec<PngChunk>,
    /// Bytes following IEND, written back verbatim
    pub trailer: Vec<u8>,
}

impl PngContainer {
    /// Index of the iTXt chunk holding the XMP packet
    pub fn xmp_position(&self) -> Option<usize> {
        self.chunks
            .iter()
            .position(|c| c.chunk_type == ITXT && is_xmp_itxt(&c.data))
    }

    /// Replace the data of the XMP iTXt chunk, creating it before the final chunk if needed
    pub fn set_xmp_chunk(&mut self, data: Vec<u8>) {
        match self.xmp_position() {
            Some(i) => self.chunks[i].data = data,
            None => {
                let index = self.chunks.len().saturating_sub(1);
                self.chunks.insert(index, PngChunk::new(ITXT, data));
            }
        }
    }
}

/// True when iTXt data starts with the XMP keyword and its terminator
pub(crate) fn is_xmp_itxt(data: &[u8]) -> bool {
    data.len() > XMP_KEYWORD.len()
        && data.starts_with(XMP_KEYWORD)
        && data[XMP_KEYWORD.len()] == 0
}

/// Get human-readable label for a PNG chunk type
pub(crate) fn chunk_label(chunk_type: &[u8; 4]) -> &'static str {
    match chunk_type {
        b"IHDR" => "Image header",
        b"PLTE" => "Palette",
        b"IDAT" => "Image data",
        b"IEND" => "Image trailer",
        b"tEXt" => "Textual data",
        b"zTXt" => "Compressed textual data",
        b"iTXt" => "International textual data",
        b"eXIf" => "EXIF data",
        b"iCCP" => "Embedded ICC profile",
        b"pHYs" => "Physical pixel dimensions",
        b"tIME" => "Last modification time",
        _ => "Other",
    }
}

impl PngChunk {
    /// Classify by chunk type
    pub fn kind(&self) -> SegmentKind {
        match &self.chunk_type {
            b"IHDR" => SegmentKind::Header,
            b"IDAT" => SegmentKind::ImageData,
            b"eXIf" => SegmentKind::Exif,
            b"iTXt" if is_xmp_itxt(&self.data) => SegmentKind::Xmp,
            _ => SegmentKind::Other,
        }
    }

    /// Descriptive label for the chunk type
    pub fn label(&self) -> &'static str {
        chunk_label(&self.chunk_type)
    }
}

/// PNG container I/O implementation
pub struct PngIO;

impl PngIO {
    /// Create a new PNG I/O implementation
    pub fn new() -> Self {
        Self
    }
}

impl Default for PngIO {
    fn default() -> Self {
        Self::new()
    }
}

impl ContainerIO for PngIO {
    type Container = PngContainer;

    fn container_type() -> ContainerKind {
        ContainerKind::Png
    }

    fn supported_media_types() -> &'static [MediaType] {
        &[MediaType::Png]
    }

    fn extensions() -> &'static [&'static str] {
        &["png"]
    }

    fn mime_types() -> &'static [&'static str] {
        &["image/png"]
    }

    fn detect(header: &[u8]) -> Option<ContainerKind> {
        if header.len() >= PNG_SIGNATURE.len() && &header[..PNG_SIGNATURE.len()] == PNG_SIGNATURE {
            Some(ContainerKind::Png)
        } else {
            None
        }
    }

    fn parse<R: Read + Seek>(&self, source: &mut R) -> Result<PngContainer> {
        source.seek(SeekFrom::Start(0))?;

        let mut signature = [0u8; 8];
        source
            .read_exact(&mut signature)
            .map_err(|_| Error::InvalidFormat("Not a PNG file: too small".into()))?;
        if signature[..] != *PNG_SIGNATURE {
            return Err(Error::InvalidFormat("Invalid PNG signature".into()));
        }

        let mut container = PngContainer::default();
        loop {
            let offset = source.stream_position()?;
            let length = match source.read_u32::<BigEndian>() {
                Ok(length) => length,
                Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    return Err(Error::InvalidFormat("PNG file has no IEND chunk".into()));
                }
                Err(e) => return Err(e.into()),
            };

            let mut chunk_type = [0u8; 4];
            source
                .read_exact(&mut chunk_type)
                .map_err(eof_as_truncated(offset, "chunk type"))?;
            let data = read_payload(source, length as u64, offset, "chunk data")?;
            let stored = source
                .read_u32::<BigEndian>()
                .map_err(eof_as_truncated(offset, "chunk CRC"))?;

            let computed = crc32(&chunk_type, &data);
            if stored != computed {
                return Err(Error::CrcMismatch {
                    chunk: String::from_utf8_lossy(&chunk_type).into_owned(),
                    expected: stored,
                    actual: computed,
                });
            }

            container.chunks.push(PngChunk { chunk_type, data });
            if chunk_type == IEND {
                break;
            }
        }

        source.read_to_end(&mut container.trailer)?;
        if !container.trailer.is_empty() {
            log::warn!("PNG has {} bytes after IEND", container.trailer.len());
        }
        log::debug!("parsed PNG: {} chunks", container.chunks.len());
        Ok(container)
    }

    fn write<W: Write>(&self, container: &PngContainer, writer: &mut W) -> Result<()> {
        writer.write_all(PNG_SIGNATURE)?;

        for chunk in &container.chunks {
            if chunk.data.len() > MAX_CHUNK_PAYLOAD {
                return Err(Error::DataTooLarge {
                    size: chunk.data.len(),
                    max: MAX_CHUNK_PAYLOAD,
                });
            }
            writer.write_u32::<BigEndian>(chunk.data.len() as u32)?;
            writer.write_all(&chunk.chunk_type)?;
            writer.write_all(&chunk.data)?;
            writer.write_u32::<BigEndian>(chunk.crc())?;
        }
        writer.write_all(&container.trailer)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{build_png, minimal_png, xmp_itxt};
    use std::io::Cursor;

    fn parse(data: Vec<u8>) -> Result<PngContainer> {
        PngIO::new().parse(&mut Cursor::new(data))
    }

    #[test]
    fn test_png_round_trip_is_byte_exact() {
        let data = minimal_png();
        let container = parse(data.clone()).unwrap();
        let types: Vec<_> = container.chunks.iter().map(|c| c.type_str()).collect();
        assert_eq!(types, ["IHDR", "IDAT", "IEND"]);
        assert_eq!(container.chunks[0].kind(), SegmentKind::Header);
        assert_eq!(PngIO::new().serialize(&container).unwrap(), data);
    }

    #[test]
    fn test_png_bytes_after_iend_are_kept() {
        let mut data = minimal_png();
        data.extend_from_slice(b"TRAILER");
        let container = parse(data.clone()).unwrap();
        assert_eq!(container.trailer, b"TRAILER");
        assert_eq!(container.chunks.last().unwrap().chunk_type, IEND);
        assert_eq!(PngIO::new().serialize(&container).unwrap(), data);
    }

    #[test]
    fn test_png_invalid_signature() {
        let err = parse(vec![0; 8]).unwrap_err();
        assert!(matches!(err, Error::InvalidFormat(_)));
    }

    #[test]
    fn test_png_crc_mismatch_names_chunk() {
        let mut data = minimal_png();
        // Last byte of the IDAT CRC (IHDR ends at 8 + 25)
        let idat_crc_end = 8 + 25 + 12 + container_idat_len();
        data[idat_crc_end - 1] ^= 0xFF;

        let err = parse(data).unwrap_err();
        match &err {
            Error::CrcMismatch { chunk, .. } => assert_eq!(chunk, "IDAT"),
            other => panic!("unexpected error {other:?}"),
        }
        assert!(err.to_string().contains("Invalid CRC for chunk with type: IDAT"));
    }

    fn container_idat_len() -> usize {
        parse(minimal_png()).unwrap().chunks[1].data.len()
    }

    #[test]
    fn test_png_missing_iend() {
        let data = build_png(&[(*b"IHDR", &[0u8; 13][..])]);
        let err = parse(data).unwrap_err();
        assert!(matches!(err, Error::InvalidFormat(_)));
    }

    #[test]
    fn test_xmp_chunk_inserted_before_iend() {
        let mut container = parse(minimal_png()).unwrap();
        assert!(container.xmp_position().is_none());

        container.set_xmp_chunk(xmp_itxt("<x:xmpmeta/>"));
        assert_eq!(container.xmp_position(), Some(2));
        assert_eq!(container.chunks.last().unwrap().chunk_type, IEND);

        container.set_xmp_chunk(xmp_itxt("<x:xmpmeta></x:xmpmeta>"));
        assert_eq!(container.chunks.len(), 4);
    }

    #[test]
    fn test_chunk_label() {
        assert_eq!(chunk_label(b"iTXt"), "International textual data");
        assert_eq!(chunk_label(b"zzZz"), "Other");
    }
}
