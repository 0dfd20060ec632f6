//! Field aggregation across the metadata sources of one file
//!
//! Reads walk the sources in priority order and return the first non-empty
//! value. Writes go to every writable source the file carries.

use super::{Field, FieldValue, MetadataKind, MetadataReader, MetadataSources, MetadataWriter};
use crate::error::{Error, Result};

/// Default read priority: XMP, then IPTC, then EXIF
pub const DEFAULT_PRIORITY: [MetadataKind; 3] =
    [MetadataKind::Xmp, MetadataKind::Iptc, MetadataKind::Exif];

/// Merged view over the XMP, IPTC and EXIF of one file
pub struct Aggregate<'a> {
    sources: MetadataSources<'a>,
    priority: Vec<MetadataKind>,
}

impl<'a> Aggregate<'a> {
    pub fn new(sources: MetadataSources<'a>) -> Self {
        Self {
            sources,
            priority: DEFAULT_PRIORITY.to_vec(),
        }
    }

    pub fn priority(&self) -> &[MetadataKind] {
        &self.priority
    }

    /// Change the read order
    ///
    /// Kinds left out are not consulted. An empty list or a repeated kind is
    /// rejected and the previous order is kept.
    pub fn set_priority(&mut self, priority: &[MetadataKind]) -> Result<()> {
        if priority.is_empty() {
            return Err(Error::InvalidArgument("priority list is empty".into()));
        }
        for (i, kind) in priority.iter().enumerate() {
            if priority[..i].contains(kind) {
                return Err(Error::InvalidArgument(format!(
                    "{kind} listed more than once in priority"
                )));
            }
        }
        self.priority = priority.to_vec();
        Ok(())
    }

    fn reader(&self, kind: MetadataKind) -> Option<&dyn MetadataReader> {
        match kind {
            MetadataKind::Xmp => self.sources.xmp.as_deref().map(|x| x as &dyn MetadataReader),
            MetadataKind::Iptc => self.sources.iptc.as_deref().map(|i| i as &dyn MetadataReader),
            MetadataKind::Exif => self.sources.exif.map(|e| e as &dyn MetadataReader),
        }
    }

    /// Sources present in this file, in priority order
    pub fn readers(&self) -> Vec<&dyn MetadataReader> {
        self.priority
            .iter()
            .filter_map(|kind| self.reader(*kind))
            .collect()
    }

    /// First non-empty value of `field` in priority order
    pub fn get(&self, field: Field) -> Option<FieldValue> {
        self.readers()
            .into_iter()
            .filter_map(|r| r.field(field))
            .find(|v| !v.is_empty())
    }

    /// Scalar view of [`Aggregate::get`]
    pub fn text(&self, field: Field) -> Option<String> {
        self.get(field)
            .and_then(|v| v.as_text().map(str::to_string))
    }

    /// List view of [`Aggregate::get`]; empty when absent
    pub fn list(&self, field: Field) -> Vec<String> {
        self.get(field).map(FieldValue::into_list).unwrap_or_default()
    }

    /// Store `value` in every writable source; `None` removes the field
    pub fn set(&mut self, field: Field, value: Option<FieldValue>) {
        if let Some(xmp) = self.sources.xmp.as_deref_mut() {
            xmp.set_field(field, value.clone());
        }
        if let Some(iptc) = self.sources.iptc.as_deref_mut() {
            iptc.set_field(field, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{Exif, Iptc, Xmp};
    use crate::test_utils::TiffBuilder;
    use crate::IfdGroup;

    fn exif_with_artist(artist: &str) -> Exif {
        let tiff = TiffBuilder::default()
            .ascii(IfdGroup::Ifd0, 0x013B, artist)
            .build();
        Exif::from_bytes(&tiff).unwrap()
    }

    #[test]
    fn test_priority_order() {
        let mut xmp = Xmp::new();
        let mut iptc = Iptc::new();
        iptc.set_byline(Some("From IPTC"));
        let exif = exif_with_artist("From EXIF");

        let sources = MetadataSources {
            xmp: Some(&mut xmp),
            iptc: Some(&mut iptc),
            exif: Some(&exif),
        };
        let mut agg = Aggregate::new(sources);
        assert_eq!(agg.text(Field::PhotographerName).as_deref(), Some("From IPTC"));

        agg.set_priority(&[MetadataKind::Exif, MetadataKind::Xmp]).unwrap();
        assert_eq!(agg.text(Field::PhotographerName).as_deref(), Some("From EXIF"));
    }

    #[test]
    fn test_empty_values_are_skipped() {
        let mut xmp = Xmp::new();
        xmp.set_headline(Some(""));
        let mut iptc = Iptc::new();
        iptc.set_headline(Some("Real"));

        let agg = Aggregate::new(MetadataSources {
            xmp: Some(&mut xmp),
            iptc: Some(&mut iptc),
            exif: None,
        });
        assert_eq!(agg.text(Field::Headline).as_deref(), Some("Real"));
        assert!(agg.list(Field::Keywords).is_empty());
    }

    #[test]
    fn test_invalid_priority_is_rejected() {
        let mut agg = Aggregate::new(MetadataSources::default());
        assert!(matches!(agg.set_priority(&[]), Err(Error::InvalidArgument(_))));
        assert!(matches!(
            agg.set_priority(&[MetadataKind::Iptc, MetadataKind::Iptc]),
            Err(Error::InvalidArgument(_))
        ));
        assert_eq!(agg.priority(), DEFAULT_PRIORITY);
    }

    #[test]
    fn test_set_fans_out() {
        let mut xmp = Xmp::new();
        let mut iptc = Iptc::new();
        {
            let mut agg = Aggregate::new(MetadataSources {
                xmp: Some(&mut xmp),
                iptc: Some(&mut iptc),
                exif: None,
            });
            agg.set(Field::Keywords, Some(vec!["a".to_string(), "b".to_string()].into()));
            agg.set(Field::City, Some("Oslo".into()));
        }
        assert_eq!(xmp.keywords(), ["a", "b"]);
        assert_eq!(iptc.keywords(), ["a", "b"]);
        assert_eq!(xmp.city().as_deref(), Some("Oslo"));
        assert_eq!(iptc.city().as_deref(), Some("Oslo"));
        assert!(xmp.has_changes());
        assert!(iptc.has_changes());
    }
}
