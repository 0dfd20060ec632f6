//! Photoshop image resource blocks
//!
//! Shared by the PSD image resource section and the JPEG APP13 segment.
//!
//! Block layout:
//! - signature `8BIM` (4)
//! - resource ID (2, big-endian)
//! - Pascal name: length byte plus name bytes, padded to an even total
//! - data size (4, big-endian), data, one pad byte if the size is odd

use crate::{
    error::{Error, Result},
    segment::ResourceBlock,
};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Cursor, Read, Write};

const SIGNATURE: &[u8; 4] = b"8BIM";

/// Parse every resource block in `data`, ignoring trailing padding
///
/// `base_offset` is the file offset of `data[0]`, used in error messages.
pub fn parse_blocks(data: &[u8], base_offset: u64) -> Result<Vec<ResourceBlock>> {
    parse_section(data, base_offset).map(|(blocks, _)| blocks)
}

/// Parse every resource block in `data` and return the padding that follows them
///
/// Fewer than 4 bytes, or only zero bytes, after the last block are padding.
pub fn parse_section(data: &[u8], base_offset: u64) -> Result<(Vec<ResourceBlock>, Vec<u8>)> {
    let mut cursor = Cursor::new(data);
    let mut blocks = Vec::new();
    let mut padding = Vec::new();
    let len = data.len() as u64;

    while cursor.position() < len {
        let start = cursor.position();
        let offset = base_offset + start;

        let rest = &data[start as usize..];
        if rest.len() < SIGNATURE.len() || rest.iter().all(|&b| b == 0) {
            log::debug!("{} bytes of padding after image resources", rest.len());
            padding = rest.to_vec();
            break;
        }
        let truncated = |_| Error::truncated(offset, "image resource block");

        let mut signature = [0u8; 4];
        cursor.read_exact(&mut signature).map_err(truncated)?;
        if &signature != SIGNATURE {
            return Err(Error::InvalidSegment {
                offset,
                reason: format!(
                    "expected image resource signature 8BIM, found {:?}",
                    String::from_utf8_lossy(&signature)
                ),
            });
        }

        let id = cursor.read_u16::<BigEndian>().map_err(truncated)?;

        let name_len = cursor.read_u8().map_err(truncated)? as usize;
        let mut name = vec![0u8; name_len];
        cursor.read_exact(&mut name).map_err(truncated)?;
        if name_len % 2 == 0 {
            cursor.read_u8().map_err(truncated)?;
        }

        let size = cursor.read_u32::<BigEndian>().map_err(truncated)? as u64;
        let remaining = len - cursor.position();
        if size > remaining {
            return Err(Error::truncated(offset, "image resource data"));
        }
        let mut block_data = vec![0u8; size as usize];
        cursor.read_exact(&mut block_data).map_err(truncated)?;
        if size % 2 == 1 && cursor.position() < len {
            cursor.read_u8().map_err(truncated)?;
        }

        blocks.push(ResourceBlock {
            id,
            name,
            data: block_data,
        });
    }

    log::debug!("parsed {} image resource blocks", blocks.len());
    Ok((blocks, padding))
}

/// Write resource blocks back out, padding names and data to even lengths
pub fn write_blocks<W: Write>(blocks: &[ResourceBlock], writer: &mut W) -> Result<()> {
    for block in blocks {
        if block.name.len() > u8::MAX as usize {
            return Err(Error::DataTooLarge {
                size: block.name.len(),
                max: u8::MAX as usize,
            });
        }
        if block.data.len() > u32::MAX as usize {
            return Err(Error::DataTooLarge {
                size: block.data.len(),
                max: u32::MAX as usize,
            });
        }

        writer.write_all(SIGNATURE)?;
        writer.write_u16::<BigEndian>(block.id)?;
        writer.write_u8(block.name.len() as u8)?;
        writer.write_all(&block.name)?;
        if block.name.len() % 2 == 0 {
            writer.write_u8(0)?;
        }
        writer.write_u32::<BigEndian>(block.data.len() as u32)?;
        writer.write_all(&block.data)?;
        if block.data.len() % 2 == 1 {
            writer.write_u8(0)?;
        }
    }
    Ok(())
}

/// Encode resource blocks into a new buffer
pub fn encode_blocks(blocks: &[ResourceBlock]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    write_blocks(blocks, &mut out)?;
    Ok(out)
}

/// Replace the data of the block with `id`, appending a new unnamed block if absent
pub fn upsert_block(blocks: &mut Vec<ResourceBlock>, id: u16, data: Vec<u8>) {
    match blocks.iter_mut().find(|b| b.id == id) {
        Some(block) => block.data = data,
        None => blocks.push(ResourceBlock::new(id, data)),
    }
}

/// Data of the first block with `id`
pub fn find_block(blocks: &[ResourceBlock], id: u16) -> Option<&[u8]> {
    blocks.iter().find(|b| b.id == id).map(|b| b.data.as_slice())
}
