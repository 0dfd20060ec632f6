//! EXIF (TIFF structured) metadata, read only
//!
//! TIFF Structure:
//! - Header: byte order (II/MM), magic (0x002A), IFD0 offset
//! - IFD (Image File Directory): tag count, tags (12 bytes each), next IFD offset
//! - Tags: tag ID (2), type (2), count (4), value/offset (4)
//!
//! IFD0 may point at the EXIF and GPS sub-IFDs, the EXIF IFD at the
//! interoperability IFD, and IFD0's next-IFD link leads to the thumbnail IFD.
//! Every decoded entry is kept, keyed by IFD group and tag name.

use super::{Field, FieldValue, MetadataKind, MetadataReader};
use crate::error::{Error, Result};
use crate::segment::JPEG_EXIF_SIGNATURE;
use byteorder::{BigEndian, ByteOrder, LittleEndian};
use std::collections::{BTreeMap, HashSet};

/// TIFF/EXIF tag IDs
mod tags {
    // IFD0 (main image) tags
    pub const IMAGE_DESCRIPTION: u16 = 0x010E;
    pub const MAKE: u16 = 0x010F;
    pub const MODEL: u16 = 0x0110;
    pub const SOFTWARE: u16 = 0x0131;
    pub const ARTIST: u16 = 0x013B;
    pub const COPYRIGHT: u16 = 0x8298;
    pub const EXIF_IFD_POINTER: u16 = 0x8769;
    pub const GPS_IFD_POINTER: u16 = 0x8825;

    // EXIF sub-IFD tags
    pub const EXPOSURE_TIME: u16 = 0x829A;
    pub const F_NUMBER: u16 = 0x829D;
    pub const EXPOSURE_PROGRAM: u16 = 0x8822;
    pub const ISO_SPEED: u16 = 0x8827;
    pub const DATE_TIME_ORIGINAL: u16 = 0x9003;
    pub const APERTURE_VALUE: u16 = 0x9202;
    pub const EXPOSURE_BIAS: u16 = 0x9204;
    pub const FLASH: u16 = 0x9209;
    pub const FOCAL_LENGTH: u16 = 0x920A;
    pub const COLOR_SPACE: u16 = 0xA001;
    pub const INTEROP_IFD_POINTER: u16 = 0xA005;
    pub const WHITE_BALANCE: u16 = 0xA403;
    pub const LENS_MODEL: u16 = 0xA434;

    // GPS sub-IFD tags
    pub const GPS_LATITUDE_REF: u16 = 0x0001;
    pub const GPS_LATITUDE: u16 = 0x0002;
    pub const GPS_LONGITUDE_REF: u16 = 0x0003;
    pub const GPS_LONGITUDE: u16 = 0x0004;
}

/// TIFF data types
mod types {
    pub const BYTE: u16 = 1;
    pub const ASCII: u16 = 2;
    pub const SHORT: u16 = 3;
    pub const LONG: u16 = 4;
    pub const RATIONAL: u16 = 5;
    pub const SBYTE: u16 = 6;
    pub const UNDEFINED: u16 = 7;
    pub const SSHORT: u16 = 8;
    pub const SLONG: u16 = 9;
    pub const SRATIONAL: u16 = 10;
}

/// Maximum number of tags in an IFD (prevents DOS attacks)
const MAX_IFD_TAGS: u16 = 1000;

/// Image file directory an entry was read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IfdGroup {
    /// Main image IFD
    Ifd0,
    /// EXIF sub-IFD
    Exif,
    /// GPS sub-IFD
    Gps,
    /// Interoperability sub-IFD
    Interop,
    /// IFD1, describing the embedded thumbnail
    Thumbnail,
}

impl IfdGroup {
    pub fn as_str(&self) -> &'static str {
        match self {
            IfdGroup::Ifd0 => "IFD0",
            IfdGroup::Exif => "EXIF",
            IfdGroup::Gps => "GPS",
            IfdGroup::Interop => "INTEROP",
            IfdGroup::Thumbnail => "IFD1",
        }
    }
}

impl std::fmt::Display for IfdGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unsigned rational (numerator / denominator)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rational {
    pub num: u32,
    pub denom: u32,
}

impl Rational {
    /// Decimal value, `None` for a zero denominator
    pub fn to_f64(&self) -> Option<f64> {
        (self.denom != 0).then(|| self.num as f64 / self.denom as f64)
    }
}

/// Signed rational (numerator / denominator)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SRational {
    pub num: i32,
    pub denom: i32,
}

impl SRational {
    /// Decimal value, `None` for a zero denominator
    pub fn to_f64(&self) -> Option<f64> {
        (self.denom != 0).then(|| self.num as f64 / self.denom as f64)
    }
}

/// Decoded value of one IFD entry
#[derive(Debug, Clone, PartialEq)]
pub enum ExifValue {
    Byte(Vec<u8>),
    /// NUL-separated strings, kept separate
    Ascii(Vec<String>),
    Short(Vec<u16>),
    Long(Vec<u32>),
    Rational(Vec<Rational>),
    SByte(Vec<i8>),
    Undefined(Vec<u8>),
    SShort(Vec<i16>),
    SLong(Vec<i32>),
    SRational(Vec<SRational>),
    /// Float, double and unknown types are not decoded
    Unimplemented { type_code: u16, count: u32 },
}

impl ExifValue {
    /// First value as an unsigned integer
    pub fn as_u32(&self) -> Option<u32> {
        match self {
            ExifValue::Byte(v) => v.first().map(|&x| x as u32),
            ExifValue::Short(v) => v.first().map(|&x| x as u32),
            ExifValue::Long(v) => v.first().copied(),
            _ => None,
        }
    }

    /// First value as a decimal number
    pub fn as_f64(&self) -> Option<f64> {
        self.f64_at(0)
    }

    /// Value at `index` as a decimal number
    pub fn f64_at(&self, index: usize) -> Option<f64> {
        match self {
            ExifValue::Byte(v) => v.get(index).map(|&x| x as f64),
            ExifValue::Short(v) => v.get(index).map(|&x| x as f64),
            ExifValue::Long(v) => v.get(index).map(|&x| x as f64),
            ExifValue::SByte(v) => v.get(index).map(|&x| x as f64),
            ExifValue::SShort(v) => v.get(index).map(|&x| x as f64),
            ExifValue::SLong(v) => v.get(index).map(|&x| x as f64),
            ExifValue::Rational(v) => v.get(index).and_then(Rational::to_f64),
            ExifValue::SRational(v) => v.get(index).and_then(SRational::to_f64),
            _ => None,
        }
    }

    /// First string of an ASCII value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ExifValue::Ascii(v) => v.first().map(String::as_str),
            _ => None,
        }
    }

    /// Number of decoded values
    pub fn len(&self) -> usize {
        match self {
            ExifValue::Byte(v) | ExifValue::Undefined(v) => v.len(),
            ExifValue::Ascii(v) => v.len(),
            ExifValue::Short(v) => v.len(),
            ExifValue::Long(v) => v.len(),
            ExifValue::Rational(v) => v.len(),
            ExifValue::SByte(v) => v.len(),
            ExifValue::SShort(v) => v.len(),
            ExifValue::SLong(v) => v.len(),
            ExifValue::SRational(v) => v.len(),
            ExifValue::Unimplemented { .. } => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Display for ExifValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn join<T: std::fmt::Display>(f: &mut std::fmt::Formatter<'_>, items: &[T]) -> std::fmt::Result {
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{item}")?;
            }
            Ok(())
        }

        match self {
            ExifValue::Byte(v) | ExifValue::Undefined(v) => join(f, v),
            ExifValue::Ascii(v) => join(f, v),
            ExifValue::Short(v) => join(f, v),
            ExifValue::Long(v) => join(f, v),
            ExifValue::SByte(v) => join(f, v),
            ExifValue::SShort(v) => join(f, v),
            ExifValue::SLong(v) => join(f, v),
            ExifValue::Rational(v) => {
                let parts: Vec<String> = v.iter().map(|r| format!("{}/{}", r.num, r.denom)).collect();
                join(f, &parts)
            }
            ExifValue::SRational(v) => {
                let parts: Vec<String> = v.iter().map(|r| format!("{}/{}", r.num, r.denom)).collect();
                join(f, &parts)
            }
            ExifValue::Unimplemented { type_code, count } => {
                write!(f, "(type {type_code}, {count} values)")
            }
        }
    }
}

/// One GPS coordinate, as stored and as signed decimal degrees
#[derive(Debug, Clone, PartialEq)]
pub struct GpsCoordinate {
    pub degrees: f64,
    pub minutes: f64,
    pub seconds: f64,
    /// `N`, `S`, `E` or `W`
    pub reference: String,
    /// Decimal degrees, negative south and west
    pub coordinates: f64,
}

impl GpsCoordinate {
    fn from_parts(value: &ExifValue, reference: &str) -> Self {
        let part = |i| value.f64_at(i).unwrap_or(0.0);
        let (degrees, minutes, seconds) = (part(0), part(1), part(2));
        let reference = reference.trim().to_string();
        let flip = if reference == "S" || reference == "W" { -1.0 } else { 1.0 };
        GpsCoordinate {
            degrees,
            minutes,
            seconds,
            coordinates: flip * (degrees + minutes / 60.0 + seconds / 3600.0),
            reference,
        }
    }
}

impl std::fmt::Display for GpsCoordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}°{}′{}″{}",
            self.degrees, self.minutes, self.seconds, self.reference
        )
    }
}

/// Latitude and longitude of the capture location
#[derive(Debug, Clone, PartialEq)]
pub struct GpsPosition {
    pub latitude: GpsCoordinate,
    pub longitude: GpsCoordinate,
}

/// Byte order of a TIFF block
#[derive(Debug, Clone, Copy)]
enum Endian {
    Little,
    Big,
}

impl Endian {
    fn u16(&self, data: &[u8], at: usize) -> Option<u16> {
        let bytes = data.get(at..at.checked_add(2)?)?;
        Some(match self {
            Endian::Little => LittleEndian::read_u16(bytes),
            Endian::Big => BigEndian::read_u16(bytes),
        })
    }

    fn u32(&self, data: &[u8], at: usize) -> Option<u32> {
        let bytes = data.get(at..at.checked_add(4)?)?;
        Some(match self {
            Endian::Little => LittleEndian::read_u32(bytes),
            Endian::Big => BigEndian::read_u32(bytes),
        })
    }
}

/// Decoded EXIF tags
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Exif {
    groups: BTreeMap<IfdGroup, BTreeMap<String, ExifValue>>,
}

impl Exif {
    /// Empty EXIF data; every getter returns `None`
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a TIFF block, with or without the leading `Exif\0\0`
    ///
    /// A bad header is an error. Damaged entries and unreachable IFDs are
    /// skipped with a warning.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let data = data.strip_prefix(JPEG_EXIF_SIGNATURE).unwrap_or(data);
        if data.len() < 8 {
            return Err(Error::Encoding("EXIF data too short for a TIFF header".into()));
        }

        // Byte order: "II" (0x4949) = little endian, "MM" (0x4D4D) = big endian
        let endian = match &data[0..2] {
            b"II" => Endian::Little,
            b"MM" => Endian::Big,
            _ => return Err(Error::Encoding("Invalid TIFF byte order marker".into())),
        };
        if endian.u16(data, 2) != Some(0x002A) {
            return Err(Error::Encoding("Invalid TIFF magic number".into()));
        }
        let ifd0_offset = endian.u32(data, 4).unwrap_or(0);

        let mut exif = Exif::new();
        let mut parser = IfdParser {
            data,
            endian,
            visited: HashSet::new(),
        };
        let next = parser.read_ifd(&mut exif, ifd0_offset, IfdGroup::Ifd0);
        if let Some(ifd1_offset) = next.filter(|&offset| offset != 0) {
            parser.read_ifd(&mut exif, ifd1_offset, IfdGroup::Thumbnail);
        }

        log::debug!("decoded EXIF: {} tags", exif.len());
        Ok(exif)
    }

    /// Raw value of the tag named `name` in `group`
    ///
    /// Names follow the EXIF specification (`FNumber`, `DateTimeOriginal`);
    /// tags without a known name are called `UndefinedTag:0xNNNN`.
    pub fn get(&self, group: IfdGroup, name: &str) -> Option<&ExifValue> {
        self.groups.get(&group)?.get(name)
    }

    /// Raw value of tag number `tag` in `group`
    pub fn tag(&self, group: IfdGroup, tag: u16) -> Option<&ExifValue> {
        self.get(group, &tag_name(group, tag))
    }

    /// Every decoded entry, grouped by IFD
    pub fn iter(&self) -> impl Iterator<Item = (IfdGroup, &str, &ExifValue)> {
        self.groups.iter().flat_map(|(group, entries)| {
            entries
                .iter()
                .map(move |(name, value)| (*group, name.as_str(), value))
        })
    }

    /// Number of decoded entries
    pub fn len(&self) -> usize {
        self.groups.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn insert(&mut self, group: IfdGroup, tag: u16, value: ExifValue) {
        self.groups
            .entry(group)
            .or_default()
            .insert(tag_name(group, tag), value);
    }

    fn text(&self, group: IfdGroup, tag: u16) -> Option<String> {
        let value = self.tag(group, tag)?.as_str()?.trim();
        (!value.is_empty()).then(|| value.to_string())
    }

    fn number(&self, group: IfdGroup, tag: u16) -> Option<f64> {
        self.tag(group, tag)?.as_f64()
    }

    fn code(&self, tag: u16) -> Option<u32> {
        self.tag(IfdGroup::Exif, tag)?.as_u32()
    }

    /// ISO speed rating
    pub fn iso(&self) -> Option<u32> {
        self.code(tags::ISO_SPEED)
    }

    /// F-number, falling back to the APEX aperture value
    pub fn aperture(&self) -> Option<f64> {
        self.number(IfdGroup::Exif, tags::F_NUMBER).or_else(|| {
            self.number(IfdGroup::Exif, tags::APERTURE_VALUE)
                .map(|apex| 2f64.powf(apex / 2.0))
        })
    }

    /// Exposure program, e.g. `Aperture Priority`
    pub fn exposure_program(&self) -> Option<&'static str> {
        let name = match self.code(tags::EXPOSURE_PROGRAM)? {
            1 => "Manual",
            2 => "Program",
            3 => "Aperture Priority",
            4 => "Shutter Priority",
            5 => "Creative",
            6 => "Action",
            7 => "Portrait",
            8 => "Landscape",
            _ => return None,
        };
        Some(name)
    }

    pub fn white_balance(&self) -> Option<&'static str> {
        let name = match self.code(tags::WHITE_BALANCE)? {
            0 => "Auto",
            1 => "Daylight",
            2 => "Cloudy",
            3 => "Tungsten",
            4 => "Fluorescent",
            5 => "Flash",
            6 => "Custom",
            7 => "Black & White",
            8 => "Shade",
            9 => "Manual Temperature (Kelvin)",
            10 => "PC Set1",
            11 => "PC Set2",
            12 => "PC Set3",
            14 => "Daylight Fluorescent",
            15 => "Custom 1",
            16 => "Custom 2",
            17 => "Underwater",
            18 => "Custom 3",
            19 => "Custom 4",
            20 => "PC Set4",
            21 => "PC Set5",
            _ => return None,
        };
        Some(name)
    }

    /// Exposure bias in EV
    pub fn exposure_bias(&self) -> Option<f64> {
        self.number(IfdGroup::Exif, tags::EXPOSURE_BIAS)
    }

    /// Camera manufacturer (e.g., "Canon", "Nikon")
    pub fn make(&self) -> Option<String> {
        self.text(IfdGroup::Ifd0, tags::MAKE)
    }

    /// Camera model (e.g., "EOS R5", "D850")
    pub fn model(&self) -> Option<String> {
        self.text(IfdGroup::Ifd0, tags::MODEL)
    }

    /// Make and model without repeating the make
    pub fn camera(&self) -> Option<String> {
        match (self.make(), self.model()) {
            (None, model) => model,
            (make, None) => make,
            (Some(make), Some(model)) => {
                if model.starts_with(&make)
                    || (make.eq_ignore_ascii_case("NIKON CORPORATION")
                        && model.to_ascii_uppercase().starts_with("NIKON"))
                {
                    Some(model)
                } else {
                    Some(format!("{make} {model}").trim().to_string())
                }
            }
        }
    }

    pub fn flash_mode(&self) -> Option<&'static str> {
        let name = match self.code(tags::FLASH)? {
            0 => "Flash did not fire",
            1 => "Flash fired",
            5 => "Strobe return light not detected",
            7 => "Strobe return light detected",
            9 => "Flash fired, compulsory flash mode",
            13 => "Flash fired, compulsory flash mode, return light not detected",
            15 => "Flash fired, compulsory flash mode, return light detected",
            16 => "Flash did not fire, compulsory flash suppression mode",
            24 => "Flash did not fire, auto mode",
            25 => "Flash fired, auto mode",
            29 => "Flash fired, auto mode, return light not detected",
            31 => "Flash fired, auto mode, return light detected",
            32 => "No flash function",
            65 => "Flash fired, red-eye reduction mode",
            69 => "Flash fired, red-eye reduction mode, return light not detected",
            71 => "Flash fired, red-eye reduction mode, return light detected",
            73 => "Flash fired, compulsory flash mode, red-eye reduction mode",
            77 => "Flash fired, compulsory flash mode, red-eye reduction mode, return light not detected",
            79 => "Flash fired, compulsory flash mode, red-eye reduction mode, return light detected",
            89 => "Flash fired, auto mode, red-eye reduction mode",
            93 => "Flash fired, auto mode, return light not detected, red-eye reduction mode",
            95 => "Flash fired, auto mode, return light detected, red-eye reduction mode",
            _ => return None,
        };
        Some(name)
    }

    /// Exposure time in seconds
    pub fn shutter_speed(&self) -> Option<f64> {
        self.number(IfdGroup::Exif, tags::EXPOSURE_TIME)
    }

    /// Focal length in millimetres
    pub fn focal_length(&self) -> Option<f64> {
        self.number(IfdGroup::Exif, tags::FOCAL_LENGTH)
    }

    pub fn lens_model(&self) -> Option<String> {
        self.text(IfdGroup::Exif, tags::LENS_MODEL)
            .filter(|lens| !lens.to_ascii_lowercase().starts_with("unknown"))
    }

    /// Editing software, ignoring bare firmware versions such as `v1.02`
    pub fn software(&self) -> Option<String> {
        let software = self
            .text(IfdGroup::Ifd0, tags::SOFTWARE)
            .or_else(|| self.text(IfdGroup::Exif, tags::SOFTWARE))?;
        let digits = software.strip_prefix('v').unwrap_or(&software);
        if digits.chars().all(|c| c.is_ascii_digit() || c == '.') {
            None
        } else {
            Some(software)
        }
    }

    /// `RGB` for sRGB images
    pub fn color_mode(&self) -> Option<&'static str> {
        (self.code(tags::COLOR_SPACE)? == 1).then_some("RGB")
    }

    /// Capture location; both coordinates and their references are required
    pub fn gps(&self) -> Option<GpsPosition> {
        let lat_ref = self.tag(IfdGroup::Gps, tags::GPS_LATITUDE_REF)?.as_str()?;
        let lat = self.tag(IfdGroup::Gps, tags::GPS_LATITUDE)?;
        let lon_ref = self.tag(IfdGroup::Gps, tags::GPS_LONGITUDE_REF)?.as_str()?;
        let lon = self.tag(IfdGroup::Gps, tags::GPS_LONGITUDE)?;
        Some(GpsPosition {
            latitude: GpsCoordinate::from_parts(lat, lat_ref),
            longitude: GpsCoordinate::from_parts(lon, lon_ref),
        })
    }

    /// Original capture time (format: "YYYY:MM:DD HH:MM:SS")
    pub fn date_time_original(&self) -> Option<String> {
        self.text(IfdGroup::Exif, tags::DATE_TIME_ORIGINAL)
    }
}

impl MetadataReader for Exif {
    fn kind(&self) -> MetadataKind {
        MetadataKind::Exif
    }

    fn field(&self, field: Field) -> Option<FieldValue> {
        let value = match field {
            Field::Caption => self.text(IfdGroup::Ifd0, tags::IMAGE_DESCRIPTION),
            Field::PhotographerName => self.text(IfdGroup::Ifd0, tags::ARTIST),
            Field::Copyright => self.text(IfdGroup::Ifd0, tags::COPYRIGHT),
            Field::DateCreated => self.date_time_original(),
            _ => None,
        };
        FieldValue::from_text(value)
    }
}

struct IfdParser<'a> {
    data: &'a [u8],
    endian: Endian,
    visited: HashSet<u32>,
}

impl IfdParser<'_> {
    /// Decode one IFD and the sub-IFDs it points to; returns the next-IFD offset
    fn read_ifd(&mut self, exif: &mut Exif, offset: u32, group: IfdGroup) -> Option<u32> {
        if !self.visited.insert(offset) {
            log::warn!("EXIF {group} IFD at offset {offset} was already read, skipping");
            return None;
        }

        let start = offset as usize;
        let Some(count) = self.endian.u16(self.data, start) else {
            log::warn!("EXIF {group} IFD offset {offset} is out of bounds");
            return None;
        };
        if count > MAX_IFD_TAGS {
            log::warn!("EXIF {group} IFD declares {count} tags, skipping");
            return None;
        }

        let mut sub_ifds = Vec::new();
        for i in 0..count as usize {
            let entry = start + 2 + 12 * i;
            let (Some(tag), Some(type_code), Some(value_count)) = (
                self.endian.u16(self.data, entry),
                self.endian.u16(self.data, entry + 2),
                self.endian.u32(self.data, entry + 4),
            ) else {
                log::warn!("EXIF {group} IFD truncated after {i} of {count} entries");
                break;
            };

            let sub_group = match tag {
                tags::EXIF_IFD_POINTER => Some(IfdGroup::Exif),
                tags::GPS_IFD_POINTER => Some(IfdGroup::Gps),
                tags::INTEROP_IFD_POINTER => Some(IfdGroup::Interop),
                _ => None,
            };
            if let Some(sub_group) = sub_group {
                if let Some(sub_offset) = self.endian.u32(self.data, entry + 8) {
                    sub_ifds.push((sub_offset, sub_group));
                }
                continue;
            }

            match self.read_value(type_code, value_count, entry + 8) {
                Some(value) => exif.insert(group, tag, value),
                None => log::warn!(
                    "EXIF {group} tag {tag:#06x} points outside the data, skipping"
                ),
            }
        }

        let next = self.endian.u32(self.data, start + 2 + 12 * count as usize);
        for (sub_offset, sub_group) in sub_ifds {
            self.read_ifd(exif, sub_offset, sub_group);
        }
        next
    }

    /// Decode the value of one entry whose value/offset field is at `field`
    fn read_value(&self, type_code: u16, count: u32, field: usize) -> Option<ExifValue> {
        let unit = match type_code {
            types::BYTE | types::ASCII | types::SBYTE | types::UNDEFINED => 1,
            types::SHORT | types::SSHORT => 2,
            types::LONG | types::SLONG => 4,
            types::RATIONAL | types::SRATIONAL => 8,
            _ => return Some(ExifValue::Unimplemented { type_code, count }),
        };

        let size = (count as usize).checked_mul(unit)?;
        let at = if size <= 4 {
            field
        } else {
            self.endian.u32(self.data, field)? as usize
        };
        let bytes = self.data.get(at..at.checked_add(size)?)?;

        let n = count as usize;
        let e = self.endian;
        let u16_at = |i: usize| e.u16(bytes, i * 2).unwrap_or(0);
        let u32_at = |i: usize| e.u32(bytes, i * 4).unwrap_or(0);

        let value = match type_code {
            types::BYTE => ExifValue::Byte(bytes.to_vec()),
            types::ASCII => ExifValue::Ascii(split_ascii(bytes)),
            types::SHORT => ExifValue::Short((0..n).map(u16_at).collect()),
            types::LONG => ExifValue::Long((0..n).map(u32_at).collect()),
            types::RATIONAL => ExifValue::Rational(
                (0..n)
                    .map(|i| Rational {
                        num: u32_at(2 * i),
                        denom: u32_at(2 * i + 1),
                    })
                    .collect(),
            ),
            types::SBYTE => ExifValue::SByte(bytes.iter().map(|&b| b as i8).collect()),
            types::UNDEFINED => ExifValue::Undefined(bytes.to_vec()),
            types::SSHORT => ExifValue::SShort((0..n).map(|i| u16_at(i) as i16).collect()),
            types::SLONG => ExifValue::SLong((0..n).map(|i| u32_at(i) as i32).collect()),
            _ => ExifValue::SRational(
                (0..n)
                    .map(|i| SRational {
                        num: u32_at(2 * i) as i32,
                        denom: u32_at(2 * i + 1) as i32,
                    })
                    .collect(),
            ),
        };
        Some(value)
    }
}

/// Split ASCII data on NUL, ignoring the trailing terminators
fn split_ascii(bytes: &[u8]) -> Vec<String> {
    let end = bytes.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
    if end == 0 {
        return Vec::new();
    }
    bytes[..end]
        .split(|&b| b == 0)
        .map(|s| String::from_utf8_lossy(s).into_owned())
        .collect()
}

/// EXIF name of a tag; GPS tag numbers have their own namespace
pub fn tag_name(group: IfdGroup, tag: u16) -> String {
    let name = match group {
        IfdGroup::Gps => match tag {
            0x0000 => "GPSVersionID",
            0x0001 => "GPSLatitudeRef",
            0x0002 => "GPSLatitude",
            0x0003 => "GPSLongitudeRef",
            0x0004 => "GPSLongitude",
            0x0005 => "GPSAltitudeRef",
            0x0006 => "GPSAltitude",
            0x0007 => "GPSTimeStamp",
            0x0012 => "GPSMapDatum",
            0x001D => "GPSDateStamp",
            _ => "",
        },
        IfdGroup::Interop => match tag {
            0x0001 => "InteroperabilityIndex",
            0x0002 => "InteroperabilityVersion",
            _ => "",
        },
        _ => match tag {
            0x0100 => "ImageWidth",
            0x0101 => "ImageLength",
            0x0102 => "BitsPerSample",
            0x0103 => "Compression",
            0x0106 => "PhotometricInterpretation",
            0x010E => "ImageDescription",
            0x010F => "Make",
            0x0110 => "Model",
            0x0111 => "StripOffsets",
            0x0112 => "Orientation",
            0x0115 => "SamplesPerPixel",
            0x011A => "XResolution",
            0x011B => "YResolution",
            0x0128 => "ResolutionUnit",
            0x0131 => "Software",
            0x0132 => "DateTime",
            0x013B => "Artist",
            0x0201 => "JPEGInterchangeFormat",
            0x0202 => "JPEGInterchangeFormatLength",
            0x0213 => "YCbCrPositioning",
            0x8298 => "Copyright",
            0x829A => "ExposureTime",
            0x829D => "FNumber",
            0x8822 => "ExposureProgram",
            0x8827 => "ISOSpeedRatings",
            0x9000 => "ExifVersion",
            0x9003 => "DateTimeOriginal",
            0x9004 => "DateTimeDigitized",
            0x9101 => "ComponentsConfiguration",
            0x9201 => "ShutterSpeedValue",
            0x9202 => "ApertureValue",
            0x9204 => "ExposureBiasValue",
            0x9205 => "MaxApertureValue",
            0x9207 => "MeteringMode",
            0x9208 => "LightSource",
            0x9209 => "Flash",
            0x920A => "FocalLength",
            0x927C => "MakerNote",
            0x9286 => "UserComment",
            0x9290 => "SubSecTime",
            0xA000 => "FlashpixVersion",
            0xA001 => "ColorSpace",
            0xA002 => "PixelXDimension",
            0xA003 => "PixelYDimension",
            0xA402 => "ExposureMode",
            0xA403 => "WhiteBalance",
            0xA405 => "FocalLengthIn35mmFilm",
            0xA406 => "SceneCaptureType",
            0xA430 => "CameraOwnerName",
            0xA431 => "BodySerialNumber",
            0xA432 => "LensSpecification",
            0xA433 => "LensMake",
            0xA434 => "LensModel",
            0xA435 => "LensSerialNumber",
            _ => "",
        },
    };
    if name.is_empty() {
        format!("UndefinedTag:0x{tag:04X}")
    } else {
        name.to_string()
    }
}
