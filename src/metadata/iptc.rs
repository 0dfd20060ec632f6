//! IPTC-IIM metadata
//!
//! IIM dataset format:
//! - tag marker `0x1C`
//! - record number, dataset number
//! - data length (big-endian u16); with the high bit set, the low bits give
//!   the number of length bytes that follow
//! - data
//!
//! Datasets are keyed by `R#DDD` codes (`2#105` is the headline). Repeatable
//! datasets keep every occurrence in file order.

use super::{Field, FieldValue, MetadataKind, MetadataReader, MetadataWriter};
use crate::error::{Error, Result};
use byteorder::{BigEndian, WriteBytesExt};
use std::collections::BTreeMap;

const TAG_MARKER: u8 = 0x1C;

/// Largest value that fits a standard two byte length
const MAX_STANDARD_LENGTH: usize = 0x7FFF;

/// ISO 2022 escape sequence declaring UTF-8, the value of `1#090`
const UTF8_DESIGNATION: &str = "\x1B%G";

/// IPTC datasets decoded from an IIM block
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Iptc {
    datasets: BTreeMap<String, Vec<String>>,
    has_changes: bool,
}

impl Iptc {
    /// Empty IPTC data; every getter returns `None`
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode an IIM block
    ///
    /// Values that are not valid UTF-8 are read as Latin-1. Decoding stops
    /// at the first byte that does not start a dataset (trailing padding).
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let mut iptc = Iptc::new();
        let mut pos = 0;

        while pos < data.len() {
            if data[pos] != TAG_MARKER {
                log::debug!("IPTC data ends at offset {pos} with {} unparsed bytes", data.len() - pos);
                break;
            }
            let header = data
                .get(pos + 1..pos + 5)
                .ok_or_else(|| truncated(pos))?;
            let (record, dataset) = (header[0], header[1]);
            let mut length = u16::from_be_bytes([header[2], header[3]]) as usize;
            pos += 5;

            // Extended dataset: the low 15 bits count the length bytes
            if length & 0x8000 != 0 {
                let count = length & 0x7FFF;
                if count == 0 || count > 4 {
                    return Err(Error::Encoding(format!(
                        "IPTC dataset {record}#{dataset:03} has a {count} byte length field"
                    )));
                }
                let bytes = data.get(pos..pos + count).ok_or_else(|| truncated(pos))?;
                length = bytes.iter().fold(0usize, |acc, &b| (acc << 8) | b as usize);
                pos += count;
            }

            let end = pos.checked_add(length).ok_or_else(|| truncated(pos))?;
            let value = data.get(pos..end).ok_or_else(|| truncated(pos))?;
            pos = end;

            iptc.datasets
                .entry(format!("{record}#{dataset:03}"))
                .or_default()
                .push(decode_text(value, record, dataset));
        }

        log::debug!("decoded IPTC: {} datasets", iptc.datasets.len());
        Ok(iptc)
    }

    /// Encode every dataset, ordered by record and dataset number
    ///
    /// Values are written as UTF-8. When any value is not plain ASCII the
    /// block starts with a `1#090` dataset declaring UTF-8, replacing any
    /// character set declared before.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let declare_utf8 = self
            .datasets
            .iter()
            .filter(|(code, _)| code.as_str() != codes::CODED_CHARACTER_SET)
            .flat_map(|(_, values)| values)
            .any(|value| !value.is_ascii());

        let mut out = Vec::new();
        if declare_utf8 {
            write_dataset(&mut out, 1, 90, UTF8_DESIGNATION.as_bytes())?;
        }
        for (code, values) in &self.datasets {
            if declare_utf8 && code == codes::CODED_CHARACTER_SET {
                continue;
            }
            let (record, dataset) = parse_code(code)?;
            for value in values {
                write_dataset(&mut out, record, dataset, value.as_bytes())?;
            }
        }
        Ok(out)
    }

    /// First value of the dataset `code`
    pub fn get(&self, code: &str) -> Option<&str> {
        self.datasets
            .get(code)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// Every value of the dataset `code`
    pub fn get_all(&self, code: &str) -> &[String] {
        self.datasets.get(code).map_or(&[], Vec::as_slice)
    }

    /// Replace the dataset `code` with a single value; `None` removes it
    pub fn set(&mut self, code: &str, value: Option<&str>) {
        match value {
            Some(value) => {
                self.datasets.insert(code.to_string(), vec![value.to_string()]);
            }
            None => {
                self.datasets.remove(code);
            }
        }
        self.has_changes = true;
    }

    /// Replace every value of the dataset `code`; an empty list removes it
    pub fn set_all(&mut self, code: &str, values: Vec<String>) {
        if values.is_empty() {
            self.datasets.remove(code);
        } else {
            self.datasets.insert(code.to_string(), values);
        }
        self.has_changes = true;
    }

    /// Dataset codes present, in encoding order
    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.datasets.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty()
    }

    /// True once any setter has been called
    pub fn has_changes(&self) -> bool {
        self.has_changes
    }

    pub fn keywords(&self) -> &[String] {
        self.get_all(codes::KEYWORDS)
    }

    pub fn set_keywords(&mut self, keywords: Vec<String>) {
        self.set_all(codes::KEYWORDS, keywords)
    }

    pub fn supplemental_categories(&self) -> &[String] {
        self.get_all(codes::SUPPLEMENTAL_CATEGORY)
    }

    pub fn set_supplemental_categories(&mut self, categories: Vec<String>) {
        self.set_all(codes::SUPPLEMENTAL_CATEGORY, categories)
    }
}

/// Dataset codes of the application record
pub mod codes {
    pub const CODED_CHARACTER_SET: &str = "1#090";
    pub const OBJECT_NAME: &str = "2#005";
    pub const URGENCY: &str = "2#010";
    pub const CATEGORY: &str = "2#015";
    pub const SUPPLEMENTAL_CATEGORY: &str = "2#020";
    pub const KEYWORDS: &str = "2#025";
    pub const SPECIAL_INSTRUCTIONS: &str = "2#040";
    pub const DATE_CREATED: &str = "2#055";
    pub const TIME_CREATED: &str = "2#060";
    pub const BYLINE: &str = "2#080";
    pub const BYLINE_TITLE: &str = "2#085";
    pub const CITY: &str = "2#090";
    pub const SUBLOCATION: &str = "2#092";
    pub const PROVINCE_STATE: &str = "2#095";
    pub const COUNTRY_CODE: &str = "2#100";
    pub const COUNTRY: &str = "2#101";
    pub const TRANSMISSION_REFERENCE: &str = "2#103";
    pub const HEADLINE: &str = "2#105";
    pub const CREDIT: &str = "2#110";
    pub const SOURCE: &str = "2#115";
    pub const COPYRIGHT_NOTICE: &str = "2#116";
    pub const CAPTION: &str = "2#120";
    pub const CAPTION_WRITER: &str = "2#122";
}

macro_rules! iptc_fields {
    ($($get:ident, $set:ident => $code:path;)*) => {
        impl Iptc {
            $(
                pub fn $get(&self) -> Option<&str> {
                    self.get($code)
                }

                pub fn $set(&mut self, value: Option<&str>) {
                    self.set($code, value)
                }
            )*
        }
    };
}

iptc_fields! {
    headline, set_headline => codes::HEADLINE;
    caption, set_caption => codes::CAPTION;
    location, set_location => codes::SUBLOCATION;
    city, set_city => codes::CITY;
    state, set_state => codes::PROVINCE_STATE;
    country, set_country => codes::COUNTRY;
    country_code, set_country_code => codes::COUNTRY_CODE;
    byline, set_byline => codes::BYLINE;
    credit, set_credit => codes::CREDIT;
    byline_title, set_byline_title => codes::BYLINE_TITLE;
    source, set_source => codes::SOURCE;
    copyright, set_copyright => codes::COPYRIGHT_NOTICE;
    object_name, set_object_name => codes::OBJECT_NAME;
    caption_writers, set_caption_writers => codes::CAPTION_WRITER;
    instructions, set_instructions => codes::SPECIAL_INSTRUCTIONS;
    category, set_category => codes::CATEGORY;
    transmission_reference, set_transmission_reference => codes::TRANSMISSION_REFERENCE;
    urgency, set_urgency => codes::URGENCY;
    date_created, set_date_created => codes::DATE_CREATED;
    time_created, set_time_created => codes::TIME_CREATED;
}

/// Dataset code storing `field`
fn field_code(field: Field) -> &'static str {
    match field {
        Field::Headline => codes::HEADLINE,
        Field::Caption => codes::CAPTION,
        Field::Location => codes::SUBLOCATION,
        Field::City => codes::CITY,
        Field::State => codes::PROVINCE_STATE,
        Field::Country => codes::COUNTRY,
        Field::CountryCode => codes::COUNTRY_CODE,
        Field::PhotographerName => codes::BYLINE,
        Field::Credit => codes::CREDIT,
        Field::PhotographerTitle => codes::BYLINE_TITLE,
        Field::Source => codes::SOURCE,
        Field::Copyright => codes::COPYRIGHT_NOTICE,
        Field::ObjectName => codes::OBJECT_NAME,
        Field::CaptionWriters => codes::CAPTION_WRITER,
        Field::Instructions => codes::SPECIAL_INSTRUCTIONS,
        Field::Category => codes::CATEGORY,
        Field::SupplementalCategories => codes::SUPPLEMENTAL_CATEGORY,
        Field::TransmissionReference => codes::TRANSMISSION_REFERENCE,
        Field::Urgency => codes::URGENCY,
        Field::Keywords => codes::KEYWORDS,
        Field::DateCreated => codes::DATE_CREATED,
    }
}

impl MetadataReader for Iptc {
    fn kind(&self) -> MetadataKind {
        MetadataKind::Iptc
    }

    fn field(&self, field: Field) -> Option<FieldValue> {
        let code = field_code(field);
        if field.is_list() {
            FieldValue::from_list(self.get_all(code).to_vec())
        } else {
            FieldValue::from_text(self.get(code).map(str::to_string))
        }
    }
}

impl MetadataWriter for Iptc {
    fn set_field(&mut self, field: Field, value: Option<FieldValue>) {
        let code = field_code(field);
        match value {
            Some(value) if field.is_list() => self.set_all(code, value.into_list()),
            Some(value) => self.set(code, value.as_text()),
            None => self.set(code, None),
        }
    }
}

fn truncated(pos: usize) -> Error {
    Error::Encoding(format!("IPTC dataset truncated at offset {pos}"))
}

/// UTF-8 when valid, otherwise Latin-1
fn decode_text(value: &[u8], record: u8, dataset: u8) -> String {
    match std::str::from_utf8(value) {
        Ok(text) => text.to_string(),
        Err(_) => {
            log::warn!("IPTC dataset {record}#{dataset:03} is not UTF-8, reading it as Latin-1");
            value.iter().map(|&b| b as char).collect()
        }
    }
}

fn write_dataset(out: &mut Vec<u8>, record: u8, dataset: u8, bytes: &[u8]) -> Result<()> {
    out.push(TAG_MARKER);
    out.push(record);
    out.push(dataset);
    if bytes.len() > MAX_STANDARD_LENGTH {
        let len = u32::try_from(bytes.len()).map_err(|_| Error::DataTooLarge {
            size: bytes.len(),
            max: u32::MAX as usize,
        })?;
        out.write_u16::<BigEndian>(0x8004)?;
        out.write_u32::<BigEndian>(len)?;
    } else {
        out.write_u16::<BigEndian>(bytes.len() as u16)?;
    }
    out.extend_from_slice(bytes);
    Ok(())
}

fn parse_code(code: &str) -> Result<(u8, u8)> {
    let invalid = || Error::Encoding(format!("Invalid IPTC dataset code {code:?}"));
    let (record, dataset) = code.split_once('#').ok_or_else(invalid)?;
    let record = record.parse::<u8>().map_err(|_| invalid())?;
    let dataset = dataset.parse::<u8>().map_err(|_| invalid())?;
    Ok((record, dataset))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::iptc_dataset;

    #[test]
    fn test_empty_iptc_has_no_values() {
        let iptc = Iptc::new();
        assert_eq!(iptc.headline(), None);
        assert_eq!(iptc.caption(), None);
        assert!(iptc.keywords().is_empty());
        assert_eq!(iptc.field(Field::Keywords), None);
        assert!(!iptc.has_changes());
    }

    #[test]
    fn test_decode_datasets() {
        let mut data = iptc_dataset(2, 105, b"Storm over the bay");
        data.extend(iptc_dataset(2, 25, b"storm"));
        data.extend(iptc_dataset(2, 25, b"bay"));
        data.extend(iptc_dataset(2, 80, b"Jane Doe"));

        let iptc = Iptc::from_bytes(&data).unwrap();
        assert_eq!(iptc.headline(), Some("Storm over the bay"));
        assert_eq!(iptc.keywords(), ["storm", "bay"]);
        assert_eq!(iptc.byline(), Some("Jane Doe"));
        assert_eq!(
            iptc.field(Field::PhotographerName),
            Some(FieldValue::Text("Jane Doe".into()))
        );
        assert!(!iptc.has_changes());
    }

    #[test]
    fn test_latin1_caption_is_transcoded() {
        let data = iptc_dataset(2, 120, b"Caf\xE9 au lait");
        let iptc = Iptc::from_bytes(&data).unwrap();
        assert_eq!(iptc.caption(), Some("Café au lait"));
    }

    #[test]
    fn test_trailing_padding_is_ignored() {
        let mut data = iptc_dataset(2, 5, b"Title");
        data.extend_from_slice(&[0, 0, 0]);
        let iptc = Iptc::from_bytes(&data).unwrap();
        assert_eq!(iptc.object_name(), Some("Title"));
    }

    #[test]
    fn test_truncated_dataset_is_encoding_error() {
        let mut data = iptc_dataset(2, 120, b"A long caption");
        data.truncate(data.len() - 4);
        assert!(matches!(Iptc::from_bytes(&data), Err(Error::Encoding(_))));
    }

    #[test]
    fn test_extended_length_round_trip() {
        let mut iptc = Iptc::new();
        let long = "x".repeat(40_000);
        iptc.set_caption(Some(&long));
        iptc.set_keywords(vec!["a".into(), "b".into()]);

        let encoded = iptc.to_bytes().unwrap();
        assert_eq!(&encoded[..5], &[0x1C, 2, 25, 0, 1]);
        let decoded = Iptc::from_bytes(&encoded).unwrap();
        assert_eq!(decoded.caption(), Some(long.as_str()));
        assert_eq!(decoded.keywords(), ["a", "b"]);
    }

    #[test]
    fn test_setters_mark_changes() {
        let data = iptc_dataset(2, 105, b"Old");
        let mut iptc = Iptc::from_bytes(&data).unwrap();
        iptc.set_headline(None);
        assert!(iptc.has_changes());
        assert_eq!(iptc.headline(), None);
        assert!(iptc.is_empty());
    }

    #[test]
    fn test_field_writer() {
        let mut iptc = Iptc::new();
        iptc.set_field(Field::Keywords, Some(FieldValue::List(vec!["k".into()])));
        iptc.set_field(Field::City, Some("Oslo".into()));
        assert_eq!(iptc.keywords(), ["k"]);
        assert_eq!(iptc.city(), Some("Oslo"));

        iptc.set_field(Field::City, None);
        assert_eq!(iptc.city(), None);
    }

    #[test]
    fn test_non_ascii_declares_utf8() {
        let mut data = iptc_dataset(2, 105, b"Caf\xE9");
        data.extend(iptc_dataset(2, 5, b"Title"));
        let mut iptc = Iptc::from_bytes(&data).unwrap();
        iptc.set_city(Some("Oslo"));

        let encoded = iptc.to_bytes().unwrap();
        assert_eq!(&encoded[..8], &[0x1C, 1, 90, 0, 3, 0x1B, b'%', b'G']);
        assert!(encoded.ends_with(&[0x1C, 2, 105, 0, 5, b'C', b'a', b'f', 0xC3, 0xA9]));

        let decoded = Iptc::from_bytes(&encoded).unwrap();
        assert_eq!(decoded.headline(), Some("Café"));
        assert_eq!(decoded.get(codes::CODED_CHARACTER_SET), Some("\x1B%G"));

        // Re-encoding keeps a single declaration
        let again = decoded.to_bytes().unwrap();
        assert_eq!(again, encoded);
    }

    #[test]
    fn test_ascii_values_have_no_declaration() {
        let mut iptc = Iptc::new();
        iptc.set_headline(Some("Plain"));
        let encoded = iptc.to_bytes().unwrap();
        assert_eq!(&encoded[..3], &[0x1C, 2, 105]);
    }

    #[test]
    fn test_invalid_code_fails_encoding() {
        let mut iptc = Iptc::new();
        iptc.set("headline", Some("x"));
        assert!(matches!(iptc.to_bytes(), Err(Error::Encoding(_))));
    }
}
