//! Metadata payload codecs
//!
//! Three payload formats are decoded from the container records:
//! - [`Xmp`]: XML/RDF packets, read and write
//! - [`Iptc`]: IIM datasets, read and write
//! - [`Exif`]: TIFF structured tags, read only
//!
//! Each codec also implements the [`MetadataReader`] capability (and
//! [`MetadataWriter`] when writable) over the shared [`Field`] table, which is
//! what [`Aggregate`] merges across sources.

pub mod aggregate;
pub mod exif;
pub mod iptc;
pub mod xmp;

pub use aggregate::Aggregate;
pub use exif::{Exif, ExifValue, GpsCoordinate, GpsPosition, IfdGroup};
pub use iptc::Iptc;
pub use xmp::Xmp;

/// Metadata payload format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetadataKind {
    Xmp,
    Iptc,
    Exif,
}

impl MetadataKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetadataKind::Xmp => "XMP",
            MetadataKind::Iptc => "IPTC",
            MetadataKind::Exif => "EXIF",
        }
    }
}

impl std::fmt::Display for MetadataKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Logical metadata field shared by every payload format
///
/// Not every format carries every field; readers return `None` for fields
/// they have no storage for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Headline,
    Caption,
    Location,
    City,
    State,
    Country,
    CountryCode,
    PhotographerName,
    Credit,
    PhotographerTitle,
    Source,
    Copyright,
    ObjectName,
    CaptionWriters,
    Instructions,
    Category,
    SupplementalCategories,
    TransmissionReference,
    Urgency,
    Keywords,
    DateCreated,
}

impl Field {
    /// Every field, in declaration order
    pub const ALL: [Field; 21] = [
        Field::Headline,
        Field::Caption,
        Field::Location,
        Field::City,
        Field::State,
        Field::Country,
        Field::CountryCode,
        Field::PhotographerName,
        Field::Credit,
        Field::PhotographerTitle,
        Field::Source,
        Field::Copyright,
        Field::ObjectName,
        Field::CaptionWriters,
        Field::Instructions,
        Field::Category,
        Field::SupplementalCategories,
        Field::TransmissionReference,
        Field::Urgency,
        Field::Keywords,
        Field::DateCreated,
    ];

    /// True for multi-valued fields
    pub fn is_list(&self) -> bool {
        matches!(self, Field::Keywords | Field::SupplementalCategories)
    }
}

/// Value of a [`Field`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    List(Vec<String>),
}

impl FieldValue {
    /// True for an empty string or an empty list
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Text(s) => s.is_empty(),
            FieldValue::List(items) => items.is_empty(),
        }
    }

    /// Scalar view: the text, or the first list entry
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            FieldValue::List(items) => items.first().map(String::as_str),
        }
    }

    /// List view: the entries, or a single-entry list for text
    pub fn into_list(self) -> Vec<String> {
        match self {
            FieldValue::Text(s) => vec![s],
            FieldValue::List(items) => items,
        }
    }

    pub(crate) fn from_text(value: Option<String>) -> Option<FieldValue> {
        value.map(FieldValue::Text)
    }

    pub(crate) fn from_list(values: Vec<String>) -> Option<FieldValue> {
        if values.is_empty() {
            None
        } else {
            Some(FieldValue::List(values))
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(value: Vec<String>) -> Self {
        FieldValue::List(value)
    }
}

/// Read access to the [`Field`] table of one metadata source
pub trait MetadataReader {
    /// Payload format of this source
    fn kind(&self) -> MetadataKind;

    /// Current value of `field`, `None` when absent or not stored by this format
    fn field(&self, field: Field) -> Option<FieldValue>;
}

/// Write access to the [`Field`] table of one metadata source
pub trait MetadataWriter: MetadataReader {
    /// Store `value` for `field`; `None` removes it
    ///
    /// Fields the format has no storage for are ignored.
    fn set_field(&mut self, field: Field, value: Option<FieldValue>);
}

/// Borrowed metadata objects of one opened file
///
/// Sources the container cannot carry are `None`.
#[derive(Default)]
pub struct MetadataSources<'a> {
    pub xmp: Option<&'a mut Xmp>,
    pub iptc: Option<&'a mut Iptc>,
    pub exif: Option<&'a Exif>,
}
