//! Format adapters
//!
//! An adapter owns one parsed container and knows which of its records carry
//! XMP, IPTC and EXIF. Metadata is decoded on first access and memoized; on
//! write, modified metadata is encoded back into the container before it is
//! serialized.

use crate::{
    error::Result,
    metadata::{Exif, Iptc, MetadataSources, Xmp},
};
use std::io::{Read, Seek, Write};

/// Trait for format-specific metadata adapters
pub trait ImageFormat: Sized {
    /// Parse a complete file
    fn from_reader<R: Read + Seek>(source: &mut R) -> Result<Self>;

    /// XMP packet, decoded on first access; an empty packet when the file has none
    fn xmp(&mut self) -> Result<&mut Xmp>;

    /// Replace the XMP packet; it is written on the next save
    fn set_xmp(&mut self, xmp: Xmp) -> Result<()>;

    /// IPTC record, decoded on first access
    fn iptc(&mut self) -> Result<&mut Iptc>;

    fn set_iptc(&mut self, iptc: Iptc) -> Result<()>;

    /// EXIF tags, decoded on first access
    fn exif(&mut self) -> Result<&Exif>;

    /// Every metadata source this format can carry, decoded
    fn sources(&mut self) -> Result<MetadataSources<'_>>;

    /// True when metadata was replaced or modified since the file was parsed
    fn has_pending_changes(&self) -> bool;

    /// Encode pending metadata into the container and serialize it
    fn write<W: Write>(&mut self, writer: &mut W) -> Result<()>;
}

/// Lazily decoded metadata of one file
#[derive(Debug, Default)]
pub(crate) struct MetadataCache {
    xmp: Option<Xmp>,
    iptc: Option<Iptc>,
    exif: Option<Exif>,
    xmp_replaced: bool,
    iptc_replaced: bool,
}

impl MetadataCache {
    pub fn xmp_or_load(&mut self, load: impl FnOnce() -> Result<Xmp>) -> Result<&mut Xmp> {
        if self.xmp.is_none() {
            self.xmp = Some(load()?);
        }
        Ok(self.xmp.get_or_insert_with(Xmp::new))
    }

    pub fn iptc_or_load(&mut self, load: impl FnOnce() -> Result<Iptc>) -> Result<&mut Iptc> {
        if self.iptc.is_none() {
            self.iptc = Some(load()?);
        }
        Ok(self.iptc.get_or_insert_with(Iptc::new))
    }

    pub fn exif_or_load(&mut self, load: impl FnOnce() -> Result<Exif>) -> Result<&Exif> {
        if self.exif.is_none() {
            self.exif = Some(load()?);
        }
        Ok(self.exif.get_or_insert_with(Exif::new))
    }

    pub fn replace_xmp(&mut self, xmp: Xmp) {
        self.xmp = Some(xmp);
        self.xmp_replaced = true;
    }

    pub fn replace_iptc(&mut self, iptc: Iptc) {
        self.iptc = Some(iptc);
        self.iptc_replaced = true;
    }

    /// XMP that must be written back
    pub fn pending_xmp(&self) -> Option<&Xmp> {
        self.xmp
            .as_ref()
            .filter(|xmp| self.xmp_replaced || xmp.has_changes())
    }

    /// IPTC that must be written back
    pub fn pending_iptc(&self) -> Option<&Iptc> {
        self.iptc
            .as_ref()
            .filter(|iptc| self.iptc_replaced || iptc.has_changes())
    }

    pub fn has_pending_changes(&self) -> bool {
        self.pending_xmp().is_some() || self.pending_iptc().is_some()
    }

    /// Borrow whatever has been decoded so far
    pub fn sources(&mut self) -> MetadataSources<'_> {
        MetadataSources {
            xmp: self.xmp.as_mut(),
            iptc: self.iptc.as_mut(),
            exif: self.exif.as_ref(),
        }
    }
}

/// Decode an XMP payload; absent payloads give an empty packet
pub(crate) fn decode_xmp(data: Option<&[u8]>) -> Result<Xmp> {
    match data {
        Some(data) => Xmp::from_bytes(data),
        None => Ok(Xmp::new()),
    }
}

pub(crate) fn decode_iptc(data: Option<&[u8]>) -> Result<Iptc> {
    match data {
        Some(data) => Iptc::from_bytes(data),
        None => Ok(Iptc::new()),
    }
}

pub(crate) fn decode_exif(data: Option<&[u8]>) -> Result<Exif> {
    match data {
        Some(data) => Exif::from_bytes(data),
        None => Ok(Exif::new()),
    }
}

#[cfg(feature = "jpeg")]
pub mod jpeg;

#[cfg(feature = "png")]
pub mod png;

#[cfg(feature = "webp")]
pub mod webp;

#[cfg(feature = "psd")]
pub mod psd;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_loads_once() {
        let mut cache = MetadataCache::default();
        let mut calls = 0;
        for _ in 0..2 {
            cache
                .xmp_or_load(|| {
                    calls += 1;
                    Ok(Xmp::new())
                })
                .unwrap();
        }
        assert_eq!(calls, 1);
        assert!(!cache.has_pending_changes());
    }

    #[test]
    fn test_cache_tracks_changes() {
        let mut cache = MetadataCache::default();
        cache.iptc_or_load(|| Ok(Iptc::new())).unwrap();
        assert!(cache.pending_iptc().is_none());

        cache
            .xmp_or_load(|| Ok(Xmp::new()))
            .unwrap()
            .set_headline(Some("x"));
        assert!(cache.pending_xmp().is_some());

        let mut cache = MetadataCache::default();
        cache.replace_iptc(Iptc::new());
        assert!(cache.pending_iptc().is_some());
        assert!(cache.has_pending_changes());
    }

    #[test]
    fn test_sources_only_hold_decoded_metadata() {
        let mut cache = MetadataCache::default();
        cache.exif_or_load(|| Ok(Exif::new())).unwrap();
        let sources = cache.sources();
        assert!(sources.xmp.is_none());
        assert!(sources.iptc.is_none());
        assert!(sources.exif.is_some());
    }

    #[test]
    fn test_absent_payloads_decode_empty() {
        assert_eq!(decode_xmp(None).unwrap(), Xmp::new());
        assert!(decode_iptc(None).unwrap().is_empty());
        assert!(decode_exif(None).unwrap().is_empty());
    }
}
