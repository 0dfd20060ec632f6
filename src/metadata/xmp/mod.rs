//! XMP metadata
//!
//! An XMP packet is an RDF/XML document rooted at `x:xmpmeta`. Properties live
//! on `rdf:Description` elements, either as attributes or as child elements,
//! and take one of these shapes:
//! - simple values (attribute or element text)
//! - language alternatives (`rdf:Alt`, read and written as `x-default`)
//! - unordered and ordered lists (`rdf:Bag`, `rdf:Seq`)
//! - the creator contact block (`Iptc4xmpCore:CreatorContactInfo`)
//!
//! Each accessor reads and writes exactly one shape, so values round-trip.

mod dom;

use super::{Field, FieldValue, MetadataKind, MetadataReader, MetadataWriter};
use crate::error::{Error, Result};
use dom::{Attribute, Document, Element, Node, Scope, XML_NS};

/// Namespace URIs used by the accessors
pub mod ns {
    pub const X: &str = "adobe:ns:meta/";
    pub const RDF: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
    pub const DC: &str = "http://purl.org/dc/elements/1.1/";
    pub const PHOTOSHOP: &str = "http://ns.adobe.com/photoshop/1.0/";
    pub const XMP: &str = "http://ns.adobe.com/xap/1.0/";
    pub const XMP_RIGHTS: &str = "http://ns.adobe.com/xap/1.0/rights/";
    pub const IPTC4XMP_CORE: &str = "http://iptc.org/std/Iptc4xmpCore/1.0/xmlns/";
    pub const IPTC4XMP_EXT: &str = "http://iptc.org/std/Iptc4xmpExt/2008-02-29/";
    pub const PHOTO_MECHANIC: &str = "http://ns.camerabits.com/photomechanic/1.0/";
}

/// Conventional prefix for each namespace
const PREFIXES: &[(&str, &str)] = &[
    ("x", ns::X),
    ("rdf", ns::RDF),
    ("dc", ns::DC),
    ("photoshop", ns::PHOTOSHOP),
    ("xmp", ns::XMP),
    ("xmpRights", ns::XMP_RIGHTS),
    ("Iptc4xmpCore", ns::IPTC4XMP_CORE),
    ("Iptc4xmpExt", ns::IPTC4XMP_EXT),
    ("photomechanic", ns::PHOTO_MECHANIC),
];

fn preferred_prefix(namespace: &str) -> &'static str {
    PREFIXES
        .iter()
        .find(|(_, uri)| *uri == namespace)
        .map_or("ns", |(prefix, _)| prefix)
}

const CONTACT_INFO: &str = "CreatorContactInfo";

/// Where a property was found: description index in `rdf:RDF`, then attribute or child index
#[derive(Debug, Clone, Copy)]
enum Location {
    Attribute(usize, usize),
    Element(usize, usize),
}

/// An XMP packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Xmp {
    doc: Document,
    about: String,
    has_changes: bool,
}

impl Default for Xmp {
    fn default() -> Self {
        Self::new()
    }
}

impl Xmp {
    /// Empty packet `<x:xmpmeta xmlns:x="adobe:ns:meta/"/>`
    pub fn new() -> Self {
        let mut root = Element::new("x", "xmpmeta", ns::X);
        root.attributes.push(Attribute::declaration("x", ns::X));
        Self {
            doc: Document::new(root),
            about: String::new(),
            has_changes: false,
        }
    }

    /// Decode a packet; the root must be `x:xmpmeta` in `adobe:ns:meta/`
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let data = data.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(data);
        let xml = std::str::from_utf8(data)
            .map_err(|e| Error::Encoding(format!("XMP is not UTF-8: {e}")))?;
        Self::from_xml(xml)
    }

    pub fn from_xml(xml: &str) -> Result<Self> {
        let doc = Document::parse(xml)?;
        if !doc.root.is(ns::X, "xmpmeta") {
            return Err(Error::Encoding(format!(
                "XMP root element must be x:xmpmeta in {}, found {:?}",
                ns::X,
                doc.root.local
            )));
        }

        let mut xmp = Self {
            doc,
            about: String::new(),
            has_changes: false,
        };
        let about = xmp
            .descriptions()
            .find_map(|(_, d)| d.attribute(ns::RDF, "about"))
            .unwrap_or_default()
            .to_string();
        xmp.about = about;
        log::debug!("decoded XMP packet, about {:?}", xmp.about);
        Ok(xmp)
    }

    /// True once any setter has been called
    pub fn has_changes(&self) -> bool {
        self.has_changes
    }

    /// Serialized packet with the `xpacket` instructions and `rdf:about` stamped
    pub fn to_xml(&self) -> Result<String> {
        let mut out = self.clone();
        out.ensure_packet_instructions();
        out.stamp_about();
        out.doc.to_xml()
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        self.to_xml().map(String::into_bytes)
    }

    /// Add the `xpacket` begin and end instructions unless present
    ///
    /// Idempotent. Field values are untouched, so `has_changes` is not set.
    pub fn ensure_packet_instructions(&mut self) {
        self.doc.ensure_packet_instructions();
    }

    /// Set `rdf:about` on every `rdf:Description` to [`Xmp::about`]
    ///
    /// Idempotent. Field values are untouched, so `has_changes` is not set.
    pub fn stamp_about(&mut self) {
        let mut scope = Scope::default();
        scope.enter(&self.doc.root);
        let about = self.about.clone();
        if let Some(rdf) = self.doc.root.child_mut(ns::RDF, "RDF") {
            stamp_descriptions(rdf, &mut scope, &about);
        }
    }

    pub fn about(&self) -> &str {
        &self.about
    }

    /// The XMP specification requires the attribute but expects it to be empty
    pub fn set_about(&mut self, about: &str) {
        self.about = about.to_string();
        self.has_changes = true;
    }

    /// XMP toolkit (`x:xmptk` on the root)
    pub fn toolkit(&self) -> Option<String> {
        self.doc.root.attribute(ns::X, "xmptk").map(str::to_string)
    }

    pub fn set_toolkit(&mut self, toolkit: Option<&str>) {
        match toolkit {
            Some(toolkit) => {
                let mut scope = Scope::default();
                scope.enter(&self.doc.root);
                let prefix = match scope.prefix_for(ns::X) {
                    Some(prefix) => prefix,
                    None => {
                        let prefix = scope.free_prefix("x");
                        self.doc.root.attributes.push(Attribute::declaration(&prefix, ns::X));
                        prefix
                    }
                };
                self.doc
                    .root
                    .set_attribute(Attribute::new(&prefix, "xmptk", ns::X, toolkit));
            }
            None => {
                self.doc.root.remove_attribute(ns::X, "xmptk");
            }
        }
        self.has_changes = true;
    }

    /// Star rating (`xmp:Rating`)
    pub fn rating(&self) -> Option<i32> {
        let rating = self.get_simple(ns::XMP, "Rating")?;
        let rating = rating.trim();
        rating
            .parse::<i32>()
            .ok()
            .or_else(|| rating.parse::<f64>().ok().map(|r| r.round() as i32))
    }

    /// Set the rating, mirrored into the Photo Mechanic rating properties
    pub fn set_rating(&mut self, rating: Option<i32>) {
        let value = rating.map(|r| r.to_string());
        self.set_simple(ns::XMP, "Rating", value.as_deref());
        self.set_simple(ns::PHOTO_MECHANIC, "RatingEval", value.as_deref());
        self.set_simple(
            ns::PHOTO_MECHANIC,
            "RatingApply",
            rating.map(|_| "True"),
        );
    }

    /// First creator (`dc:creator`)
    pub fn photographer_name(&self) -> Option<String> {
        self.photographer_names().into_iter().next()
    }

    pub fn set_photographer_name(&mut self, name: Option<&str>) {
        self.set_photographer_names(name.map(|n| vec![n.to_string()]).unwrap_or_default());
    }

    // ========================================================================
    // Tree navigation
    // ========================================================================

    fn rdf(&self) -> Option<&Element> {
        self.doc.root.child(ns::RDF, "RDF")
    }

    fn rdf_mut(&mut self) -> Option<&mut Element> {
        self.doc.root.child_mut(ns::RDF, "RDF")
    }

    /// `rdf:Description` elements with their index in `rdf:RDF`
    fn descriptions(&self) -> impl Iterator<Item = (usize, &Element)> {
        self.rdf()
            .into_iter()
            .flat_map(|rdf| rdf.children.iter().enumerate())
            .filter_map(|(i, n)| match n {
                Node::Element(e) if e.is(ns::RDF, "Description") => Some((i, e)),
                _ => None,
            })
    }

    fn description(&self, index: usize) -> Option<&Element> {
        self.rdf()?.element_at(index)
    }

    fn description_mut(&mut self, index: usize) -> Option<&mut Element> {
        self.rdf_mut()?.element_at_mut(index)
    }

    fn property(&self, location: Location) -> Option<&Element> {
        match location {
            Location::Element(d, c) => self.description(d)?.element_at(c),
            Location::Attribute(..) => None,
        }
    }

    fn property_mut(&mut self, location: Location) -> Option<&mut Element> {
        match location {
            Location::Element(d, c) => self.description_mut(d)?.element_at_mut(c),
            Location::Attribute(..) => None,
        }
    }

    /// First occurrence of a property, as attribute or child element
    fn find(&self, namespace: &str, name: &str) -> Option<Location> {
        self.descriptions().find_map(|(d, desc)| {
            desc.attributes
                .iter()
                .position(|a| a.is(namespace, name))
                .map(|a| Location::Attribute(d, a))
                .or_else(|| desc.child_index(namespace, name).map(|c| Location::Element(d, c)))
        })
    }

    /// Namespace scope inside description `d`
    fn scope(&self, d: usize) -> Scope {
        let mut scope = Scope::default();
        scope.enter(&self.doc.root);
        if let Some(rdf) = self.rdf() {
            scope.enter(rdf);
        }
        if let Some(desc) = self.description(d) {
            scope.enter(desc);
        }
        scope
    }

    /// Prefix for `namespace` inside description `d`, declared on it if unbound
    fn bind(&mut self, d: usize, namespace: &str) -> String {
        let scope = self.scope(d);
        if let Some(prefix) = scope.prefix_for(namespace) {
            return prefix;
        }
        let prefix = scope.free_prefix(preferred_prefix(namespace));
        if let Some(desc) = self.description_mut(d) {
            desc.attributes.push(Attribute::declaration(&prefix, namespace));
        }
        prefix
    }

    /// Index of the `rdf:RDF` element in the root, created if missing
    fn ensure_rdf(&mut self) -> usize {
        if let Some(index) = self.doc.root.child_index(ns::RDF, "RDF") {
            return index;
        }
        let mut scope = Scope::default();
        scope.enter(&self.doc.root);
        let rdf = match scope.prefix_for(ns::RDF) {
            Some(prefix) => Element::new(&prefix, "RDF", ns::RDF),
            None => {
                let prefix = scope.free_prefix("rdf");
                let mut rdf = Element::new(&prefix, "RDF", ns::RDF);
                rdf.attributes.push(Attribute::declaration(&prefix, ns::RDF));
                rdf
            }
        };
        self.doc.root.children.push(Node::Element(rdf));
        self.doc.root.children.len() - 1
    }

    /// Description to hold a new property in `namespace`
    ///
    /// Prefers a description already using the namespace, then any
    /// description, and creates one as a last resort.
    fn ensure_description(&mut self, namespace: &str) -> usize {
        let uses_namespace = |desc: &Element| {
            desc.attributes.iter().any(|a| a.ns.as_deref() == Some(namespace))
                || desc.elements().any(|e| e.ns.as_deref() == Some(namespace))
        };
        if let Some((d, _)) = self.descriptions().find(|(_, desc)| uses_namespace(desc)) {
            return d;
        }
        if let Some((d, _)) = self.descriptions().next() {
            return d;
        }

        let rdf_index = self.ensure_rdf();
        let mut scope = Scope::default();
        scope.enter(&self.doc.root);
        if let Some(rdf) = self.doc.root.element_at(rdf_index) {
            scope.enter(rdf);
        }
        let mut desc = match scope.prefix_for(ns::RDF) {
            Some(prefix) => Element::new(&prefix, "Description", ns::RDF),
            None => {
                let prefix = scope.free_prefix("rdf");
                let mut desc = Element::new(&prefix, "Description", ns::RDF);
                desc.attributes.push(Attribute::declaration(&prefix, ns::RDF));
                desc
            }
        };
        let prefix = desc.prefix.clone().unwrap_or_default();
        desc.attributes
            .push(Attribute::new(&prefix, "about", ns::RDF, &self.about));

        match self.doc.root.element_at_mut(rdf_index) {
            Some(rdf) => {
                rdf.children.push(Node::Element(desc));
                rdf.children.len() - 1
            }
            None => 0,
        }
    }

    fn remove_property(&mut self, namespace: &str, name: &str) {
        if let Some(rdf) = self.rdf_mut() {
            for node in rdf.children.iter_mut() {
                if let Node::Element(desc) = node {
                    if desc.is(ns::RDF, "Description") {
                        desc.remove_attribute(namespace, name);
                        desc.remove_children(namespace, name);
                    }
                }
            }
        }
    }

    // ========================================================================
    // Property shapes
    // ========================================================================

    fn get_simple(&self, namespace: &str, name: &str) -> Option<String> {
        match self.find(namespace, name)? {
            Location::Attribute(d, a) => Some(self.description(d)?.attributes[a].value.clone()),
            location => {
                let element = self.property(location)?;
                let text = element.text();
                if text.is_empty() && element.has_element_children() {
                    None
                } else {
                    Some(text)
                }
            }
        }
    }

    fn set_simple(&mut self, namespace: &str, name: &str, value: Option<&str>) {
        self.has_changes = true;
        let Some(value) = value else {
            self.remove_property(namespace, name);
            return;
        };

        match self.find(namespace, name) {
            Some(Location::Attribute(d, a)) => {
                if let Some(desc) = self.description_mut(d) {
                    desc.attributes[a].value = value.to_string();
                }
            }
            Some(location) => {
                if let Some(element) = self.property_mut(location) {
                    element.set_text(value);
                }
            }
            None => {
                let d = self.ensure_description(namespace);
                let prefix = self.bind(d, namespace);
                if let Some(desc) = self.description_mut(d) {
                    desc.attributes
                        .push(Attribute::new(&prefix, name, namespace, value));
                }
            }
        }
    }

    /// `rdf:li` items of the container inside a property element
    fn items(element: &Element) -> Option<Vec<&Element>> {
        let container = element
            .elements()
            .find(|e| ["Alt", "Bag", "Seq"].iter().any(|k| e.is(ns::RDF, k)))?;
        Some(container.elements().filter(|e| e.is(ns::RDF, "li")).collect())
    }

    fn get_alt(&self, namespace: &str, name: &str) -> Option<String> {
        let location = self.find(namespace, name)?;
        let Some(element) = self.property(location) else {
            return self.get_simple(namespace, name);
        };
        match Self::items(element) {
            Some(items) => items
                .iter()
                .find(|li| li.attribute(XML_NS, "lang") == Some("x-default"))
                .or_else(|| items.first())
                .map(|li| li.text()),
            None => self.get_simple(namespace, name),
        }
    }

    fn get_list(&self, namespace: &str, name: &str) -> Vec<String> {
        let Some(location) = self.find(namespace, name) else {
            return Vec::new();
        };
        let items = self.property(location).and_then(Self::items);
        match items {
            Some(items) => items.iter().map(|li| li.text()).collect(),
            None => self
                .get_simple(namespace, name)
                .filter(|v| !v.is_empty())
                .into_iter()
                .collect(),
        }
    }

    fn set_alt(&mut self, namespace: &str, name: &str, value: Option<&str>) {
        match value {
            Some(value) => self.put_container(namespace, name, "Alt", &[value]),
            None => {
                self.has_changes = true;
                self.remove_property(namespace, name);
            }
        }
    }

    fn set_list(&mut self, namespace: &str, name: &str, kind: &str, values: &[String]) {
        if values.is_empty() {
            self.has_changes = true;
            self.remove_property(namespace, name);
        } else {
            let values: Vec<&str> = values.iter().map(String::as_str).collect();
            self.put_container(namespace, name, kind, &values);
        }
    }

    /// Write a property element holding an `rdf:Alt`, `rdf:Bag` or `rdf:Seq`
    fn put_container(&mut self, namespace: &str, name: &str, kind: &str, values: &[&str]) {
        self.has_changes = true;

        let (d, existing) = match self.find(namespace, name) {
            Some(Location::Element(d, c)) => (d, Some(c)),
            Some(Location::Attribute(d, a)) => {
                if let Some(desc) = self.description_mut(d) {
                    desc.attributes.remove(a);
                }
                (d, None)
            }
            None => (self.ensure_description(namespace), None),
        };

        let rdf = self.bind(d, ns::RDF);
        let mut container = Element::new(&rdf, kind, ns::RDF);
        for value in values {
            let mut li = Element::new(&rdf, "li", ns::RDF);
            if kind == "Alt" {
                li.attributes
                    .push(Attribute::new("xml", "lang", XML_NS, "x-default"));
            }
            li.set_text(value);
            container.children.push(Node::Element(li));
        }

        match existing {
            Some(c) => {
                if let Some(element) = self.property_mut(Location::Element(d, c)) {
                    element.children = vec![Node::Element(container)];
                }
            }
            None => {
                let prefix = self.bind(d, namespace);
                let mut element = Element::new(&prefix, name, namespace);
                element.children.push(Node::Element(container));
                if let Some(desc) = self.description_mut(d) {
                    desc.children.push(Node::Element(element));
                }
            }
        }
    }

    fn contact_location(&self) -> Option<Location> {
        self.descriptions().find_map(|(d, desc)| {
            desc.child_index(ns::IPTC4XMP_CORE, CONTACT_INFO)
                .map(|c| Location::Element(d, c))
        })
    }

    fn get_contact(&self, name: &str) -> Option<String> {
        let contact = self.property(self.contact_location()?)?;
        let contact = contact.child(ns::RDF, "Description").unwrap_or(contact);
        match contact.child(ns::IPTC4XMP_CORE, name) {
            Some(child) => Some(child.text()),
            None => contact
                .attribute(ns::IPTC4XMP_CORE, name)
                .map(str::to_string),
        }
    }

    /// Write one contact sub-field; the block is removed once nothing is left in it
    fn set_contact(&mut self, name: &str, value: Option<&str>) {
        self.has_changes = true;

        let Some(value) = value else {
            let Some(location @ Location::Element(d, c)) = self.contact_location() else {
                return;
            };
            let empty = match self.property_mut(location).and_then(contact_fields_mut) {
                Some(contact) => {
                    contact.remove_children(ns::IPTC4XMP_CORE, name);
                    contact.remove_attribute(ns::IPTC4XMP_CORE, name);
                    !has_content(contact)
                }
                None => false,
            };
            if empty {
                if let Some(desc) = self.description_mut(d) {
                    desc.children.remove(c);
                }
            }
            return;
        };

        let location = match self.contact_location() {
            Some(location) => location,
            None => {
                let d = self.ensure_description(ns::IPTC4XMP_CORE);
                let prefix = self.bind(d, ns::IPTC4XMP_CORE);
                let element = Element::new(&prefix, CONTACT_INFO, ns::IPTC4XMP_CORE);
                match self.description_mut(d) {
                    Some(desc) => {
                        desc.children.push(Node::Element(element));
                        Location::Element(d, desc.children.len() - 1)
                    }
                    None => return,
                }
            }
        };

        let Location::Element(d, _) = location else {
            return;
        };
        let prefix = self.bind(d, ns::IPTC4XMP_CORE);
        if let Some(contact) = self.property_mut(location).and_then(contact_fields_mut) {
            match contact.child_mut(ns::IPTC4XMP_CORE, name) {
                Some(child) => child.set_text(value),
                None => contact.set_attribute(Attribute::new(
                    &prefix,
                    name,
                    ns::IPTC4XMP_CORE,
                    value,
                )),
            }
        }
    }
}

/// Element holding the contact sub-fields: the nested `rdf:Description` if
/// the block uses one, else the block itself
fn contact_fields_mut(contact: &mut Element) -> Option<&mut Element> {
    match contact.child_index(ns::RDF, "Description") {
        Some(i) => contact.element_at_mut(i),
        None => Some(contact),
    }
}

/// True if an element carries a value beyond namespace and parse-type markup
fn has_content(element: &Element) -> bool {
    element
        .attributes
        .iter()
        .any(|a| {
            a.declared_prefix().is_none() && !a.is(ns::RDF, "parseType") && !a.is(ns::RDF, "about")
        })
        || element.has_element_children()
        || !element.text().trim().is_empty()
}

/// Set `rdf:about` on `element` and every `rdf:Description` below it
fn stamp_descriptions(element: &mut Element, scope: &mut Scope, about: &str) {
    let mark = scope.enter(element);
    if element.is(ns::RDF, "Description") {
        let prefix = match scope.prefix_for(ns::RDF) {
            Some(prefix) => prefix,
            None => {
                let prefix = scope.free_prefix("rdf");
                element.attributes.push(Attribute::declaration(&prefix, ns::RDF));
                prefix
            }
        };
        element.set_attribute(Attribute::new(&prefix, "about", ns::RDF, about));
    }
    for node in &mut element.children {
        if let Node::Element(child) = node {
            stamp_descriptions(child, scope, about);
        }
    }
    scope.leave(mark);
}

macro_rules! simple_fields {
    ($($(#[$doc:meta])* $get:ident, $set:ident => $ns:ident : $name:literal;)*) => {
        impl Xmp {
            $(
                $(#[$doc])*
                pub fn $get(&self) -> Option<String> {
                    self.get_simple(ns::$ns, $name)
                }

                pub fn $set(&mut self, value: Option<&str>) {
                    self.set_simple(ns::$ns, $name, value)
                }
            )*
        }
    };
}

macro_rules! alt_fields {
    ($($(#[$doc:meta])* $get:ident, $set:ident => $ns:ident : $name:literal;)*) => {
        impl Xmp {
            $(
                $(#[$doc])*
                pub fn $get(&self) -> Option<String> {
                    self.get_alt(ns::$ns, $name)
                }

                pub fn $set(&mut self, value: Option<&str>) {
                    self.set_alt(ns::$ns, $name, value)
                }
            )*
        }
    };
}

macro_rules! list_fields {
    ($($(#[$doc:meta])* $get:ident, $set:ident => $kind:literal $ns:ident : $name:literal;)*) => {
        impl Xmp {
            $(
                $(#[$doc])*
                pub fn $get(&self) -> Vec<String> {
                    self.get_list(ns::$ns, $name)
                }

                pub fn $set(&mut self, values: Vec<String>) {
                    self.set_list(ns::$ns, $name, $kind, &values)
                }
            )*
        }
    };
}

macro_rules! contact_fields {
    ($($get:ident, $set:ident => $name:literal;)*) => {
        impl Xmp {
            $(
                pub fn $get(&self) -> Option<String> {
                    self.get_contact($name)
                }

                pub fn $set(&mut self, value: Option<&str>) {
                    self.set_contact($name, value)
                }
            )*
        }
    };
}

simple_fields! {
    headline, set_headline => PHOTOSHOP: "Headline";
    event, set_event => IPTC4XMP_EXT: "Event";
    /// Sublocation
    location, set_location => IPTC4XMP_CORE: "Location";
    city, set_city => PHOTOSHOP: "City";
    state, set_state => PHOTOSHOP: "State";
    country, set_country => PHOTOSHOP: "Country";
    country_code, set_country_code => IPTC4XMP_CORE: "CountryCode";
    credit, set_credit => PHOTOSHOP: "Credit";
    photographer_title, set_photographer_title => PHOTOSHOP: "AuthorsPosition";
    source, set_source => PHOTOSHOP: "Source";
    /// Web statement of rights
    copyright_url, set_copyright_url => XMP_RIGHTS: "WebStatement";
    caption_writers, set_caption_writers => PHOTOSHOP: "CaptionWriter";
    instructions, set_instructions => PHOTOSHOP: "Instructions";
    category, set_category => PHOTOSHOP: "Category";
    transmission_reference, set_transmission_reference => PHOTOSHOP: "TransmissionReference";
    urgency, set_urgency => PHOTOSHOP: "Urgency";
    creator_tool, set_creator_tool => XMP: "CreatorTool";
    intellectual_genre, set_intellectual_genre => IPTC4XMP_CORE: "IntellectualGenre";
    /// Creation date as stored, e.g. `2024-05-01` or `2024-05-01T10:00:00+02:00`
    date_created, set_date_created => PHOTOSHOP: "DateCreated";
}

alt_fields! {
    /// Description (`dc:description`)
    caption, set_caption => DC: "description";
    /// Title (`dc:title`)
    object_name, set_object_name => DC: "title";
    copyright, set_copyright => DC: "rights";
    rights_usage_terms, set_rights_usage_terms => XMP_RIGHTS: "UsageTerms";
}

list_fields! {
    keywords, set_keywords => "Bag" DC: "subject";
    persons_shown, set_persons_shown => "Bag" IPTC4XMP_EXT: "PersonInImage";
    iptc_subject_codes, set_iptc_subject_codes => "Bag" IPTC4XMP_CORE: "SubjectCode";
    supplemental_categories, set_supplemental_categories => "Bag" PHOTOSHOP: "SupplementalCategories";
    iptc_scene, set_iptc_scene => "Bag" IPTC4XMP_CORE: "Scene";
    featured_organisation_name, set_featured_organisation_name => "Bag" IPTC4XMP_EXT: "OrganisationInImageName";
    featured_organisation_code, set_featured_organisation_code => "Bag" IPTC4XMP_EXT: "OrganisationInImageCode";
    /// Creators in order (`dc:creator`)
    photographer_names, set_photographer_names => "Seq" DC: "creator";
}

contact_fields! {
    contact_address, set_contact_address => "CiAdrExtadr";
    contact_city, set_contact_city => "CiAdrCity";
    contact_state, set_contact_state => "CiAdrRegion";
    contact_zip, set_contact_zip => "CiAdrPcode";
    contact_country, set_contact_country => "CiAdrCtry";
    contact_email, set_contact_email => "CiEmailWork";
    contact_phone, set_contact_phone => "CiTelWork";
    contact_url, set_contact_url => "CiUrlWork";
}

impl MetadataReader for Xmp {
    fn kind(&self) -> MetadataKind {
        MetadataKind::Xmp
    }

    fn field(&self, field: Field) -> Option<FieldValue> {
        let text = match field {
            Field::Headline => self.headline(),
            Field::Caption => self.caption(),
            Field::Location => self.location(),
            Field::City => self.city(),
            Field::State => self.state(),
            Field::Country => self.country(),
            Field::CountryCode => self.country_code(),
            Field::PhotographerName => self.photographer_name(),
            Field::Credit => self.credit(),
            Field::PhotographerTitle => self.photographer_title(),
            Field::Source => self.source(),
            Field::Copyright => self.copyright(),
            Field::ObjectName => self.object_name(),
            Field::CaptionWriters => self.caption_writers(),
            Field::Instructions => self.instructions(),
            Field::Category => self.category(),
            Field::TransmissionReference => self.transmission_reference(),
            Field::Urgency => self.urgency(),
            Field::DateCreated => self.date_created(),
            Field::SupplementalCategories => {
                return FieldValue::from_list(self.supplemental_categories())
            }
            Field::Keywords => return FieldValue::from_list(self.keywords()),
        };
        FieldValue::from_text(text)
    }
}

impl MetadataWriter for Xmp {
    fn set_field(&mut self, field: Field, value: Option<FieldValue>) {
        if field.is_list() {
            let values = value.map(FieldValue::into_list).unwrap_or_default();
            match field {
                Field::Keywords => self.set_keywords(values),
                _ => self.set_supplemental_categories(values),
            }
            return;
        }

        let text = value.as_ref().and_then(FieldValue::as_text);
        match field {
            Field::Headline => self.set_headline(text),
            Field::Caption => self.set_caption(text),
            Field::Location => self.set_location(text),
            Field::City => self.set_city(text),
            Field::State => self.set_state(text),
            Field::Country => self.set_country(text),
            Field::CountryCode => self.set_country_code(text),
            Field::PhotographerName => self.set_photographer_name(text),
            Field::Credit => self.set_credit(text),
            Field::PhotographerTitle => self.set_photographer_title(text),
            Field::Source => self.set_source(text),
            Field::Copyright => self.set_copyright(text),
            Field::ObjectName => self.set_object_name(text),
            Field::CaptionWriters => self.set_caption_writers(text),
            Field::Instructions => self.set_instructions(text),
            Field::Category => self.set_category(text),
            Field::TransmissionReference => self.set_transmission_reference(text),
            Field::Urgency => self.set_urgency(text),
            Field::DateCreated => self.set_date_created(text),
            Field::SupplementalCategories | Field::Keywords => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::xmp_packet;

    fn parse(xml: &str) -> Xmp {
        Xmp::from_xml(xml).unwrap()
    }

    fn reparse(xmp: &Xmp) -> Xmp {
        Xmp::from_bytes(&xmp.to_bytes().unwrap()).unwrap()
    }

    #[test]
    fn test_empty_packet_has_no_values() {
        let xmp = Xmp::new();
        assert_eq!(xmp.headline(), None);
        assert_eq!(xmp.caption(), None);
        assert!(xmp.keywords().is_empty());
        assert_eq!(xmp.photographer_name(), None);
        assert_eq!(xmp.contact_city(), None);
        assert_eq!(xmp.rating(), None);
        assert_eq!(xmp.toolkit(), None);
        assert_eq!(xmp.about(), "");
        assert!(!xmp.has_changes());
        assert_eq!(xmp.doc.to_xml().unwrap(), r#"<x:xmpmeta xmlns:x="adobe:ns:meta/"/>"#);
    }

    #[test]
    fn test_root_must_be_xmpmeta() {
        let err = Xmp::from_xml(r#"<x:other xmlns:x="adobe:ns:meta/"/>"#).unwrap_err();
        assert!(matches!(err, Error::Encoding(_)));
        let err = Xmp::from_xml(r#"<x:xmpmeta xmlns:x="urn:wrong"/>"#).unwrap_err();
        assert!(matches!(err, Error::Encoding(_)));
        assert!(matches!(Xmp::from_bytes(b"\xFF\xFE"), Err(Error::Encoding(_))));
    }

    #[test]
    fn test_simple_value_as_attribute_or_element() {
        let xmp = parse(&xmp_packet(
            r#"photoshop:Headline="Attr""#,
            "<photoshop:City>Element</photoshop:City>",
        ));
        assert_eq!(xmp.headline().as_deref(), Some("Attr"));
        assert_eq!(xmp.city().as_deref(), Some("Element"));
        assert!(!xmp.has_changes());
    }

    #[test]
    fn test_simple_value_updated_in_place() {
        let mut xmp = parse(&xmp_packet(
            r#"photoshop:Headline="Old""#,
            "<photoshop:City>Old</photoshop:City>",
        ));
        xmp.set_headline(Some("New"));
        xmp.set_city(Some("Paris"));
        assert!(xmp.has_changes());

        let xml = xmp.to_xml().unwrap();
        assert!(xml.contains(r#"photoshop:Headline="New""#));
        assert!(xml.contains("<photoshop:City>Paris</photoshop:City>"));
        assert_eq!(xml.matches("Headline").count(), 1);
    }

    #[test]
    fn test_simple_value_removed() {
        let mut xmp = parse(&xmp_packet(
            r#"photoshop:Headline="Old""#,
            "<photoshop:City>Old</photoshop:City>",
        ));
        xmp.set_headline(None);
        xmp.set_city(None);
        let xml = xmp.to_xml().unwrap();
        assert!(!xml.contains("Headline"));
        assert!(!xml.contains("City"));
    }

    #[test]
    fn test_new_property_declares_namespace() {
        let mut xmp = Xmp::new();
        xmp.set_headline(Some("Hello"));
        xmp.set_creator_tool(Some("imeta"));

        let xml = xmp.to_xml().unwrap();
        assert!(xml.contains(r#"xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#""#));
        assert!(xml.contains(r#"xmlns:photoshop="http://ns.adobe.com/photoshop/1.0/""#));
        assert!(xml.contains(r#"photoshop:Headline="Hello""#));
        assert!(xml.contains(r#"xmp:CreatorTool="imeta""#));

        let back = reparse(&xmp);
        assert_eq!(back.headline().as_deref(), Some("Hello"));
        assert_eq!(back.creator_tool().as_deref(), Some("imeta"));
    }

    #[test]
    fn test_conflicting_prefix_gets_fresh_binding() {
        let xml = r#"<x:xmpmeta xmlns:x="adobe:ns:meta/"><rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"><rdf:Description xmlns:photoshop="urn:not-photoshop" photoshop:Headline="Other"/></rdf:RDF></x:xmpmeta>"#;
        let mut xmp = parse(xml);
        assert_eq!(xmp.headline(), None);

        xmp.set_headline(Some("Mine"));
        let back = reparse(&xmp);
        assert_eq!(back.headline().as_deref(), Some("Mine"));
        assert!(back.to_xml().unwrap().contains(r#"photoshop:Headline="Other""#));
    }

    #[test]
    fn test_alt_reads_default_language() {
        let xmp = parse(&xmp_packet(
            "",
            r#"<dc:description><rdf:Alt><rdf:li xml:lang="de">Hallo</rdf:li><rdf:li xml:lang="x-default">Hello</rdf:li></rdf:Alt></dc:description><dc:title><rdf:Alt><rdf:li xml:lang="fr">Bonjour</rdf:li></rdf:Alt></dc:title>"#,
        ));
        assert_eq!(xmp.caption().as_deref(), Some("Hello"));
        assert_eq!(xmp.object_name().as_deref(), Some("Bonjour"));
    }

    #[test]
    fn test_alt_writes_single_default_entry() {
        let mut xmp = parse(&xmp_packet(
            "",
            r#"<dc:description><rdf:Alt><rdf:li xml:lang="de">Hallo</rdf:li><rdf:li xml:lang="x-default">Hello</rdf:li></rdf:Alt></dc:description>"#,
        ));
        xmp.set_caption(Some("Bye"));
        let xml = xmp.to_xml().unwrap();
        assert!(xml.contains(
            r#"<dc:description><rdf:Alt><rdf:li xml:lang="x-default">Bye</rdf:li></rdf:Alt></dc:description>"#
        ));
        assert!(!xml.contains("Hallo"));
    }

    #[test]
    fn test_bag_and_seq_round_trip() {
        let mut xmp = Xmp::new();
        xmp.set_keywords(vec!["storm".into(), "bay".into()]);
        xmp.set_photographer_names(vec!["Jane".into(), "John".into()]);

        let xml = xmp.to_xml().unwrap();
        assert!(xml.contains("<dc:subject><rdf:Bag><rdf:li>storm</rdf:li><rdf:li>bay</rdf:li></rdf:Bag></dc:subject>"));
        assert!(xml.contains("<rdf:Seq>"));

        let back = reparse(&xmp);
        assert_eq!(back.keywords(), ["storm", "bay"]);
        assert_eq!(back.photographer_names(), ["Jane", "John"]);
        assert_eq!(back.photographer_name().as_deref(), Some("Jane"));
    }

    #[test]
    fn test_empty_bag_removes_element() {
        let mut xmp = parse(&xmp_packet(
            "",
            "<photoshop:SupplementalCategories><rdf:Bag><rdf:li>a</rdf:li><rdf:li>b</rdf:li></rdf:Bag></photoshop:SupplementalCategories>",
        ));
        assert_eq!(xmp.supplemental_categories(), ["a", "b"]);

        xmp.set_supplemental_categories(Vec::new());
        assert!(xmp.has_changes());
        let xml = xmp.to_xml().unwrap();
        assert!(!xml.contains("SupplementalCategories"));
        assert!(!xml.contains("rdf:Bag"));
    }

    #[test]
    fn test_contact_block() {
        let mut xmp = Xmp::new();
        xmp.set_contact_city(Some("Oslo"));
        xmp.set_contact_email(Some("jane@example.com"));
        assert_eq!(xmp.contact_city().as_deref(), Some("Oslo"));

        xmp.set_contact_city(None);
        let xml = xmp.to_xml().unwrap();
        assert!(xml.contains("CreatorContactInfo"));
        assert!(!xml.contains("CiAdrCity"));
        assert_eq!(reparse(&xmp).contact_email().as_deref(), Some("jane@example.com"));

        xmp.set_contact_email(None);
        assert!(!xmp.to_xml().unwrap().contains("CreatorContactInfo"));
    }

    #[test]
    fn test_contact_block_child_elements() {
        let xmp = parse(&xmp_packet(
            "",
            r#"<Iptc4xmpCore:CreatorContactInfo rdf:parseType="Resource"><Iptc4xmpCore:CiTelWork>555</Iptc4xmpCore:CiTelWork></Iptc4xmpCore:CreatorContactInfo>"#,
        ));
        assert_eq!(xmp.contact_phone().as_deref(), Some("555"));
    }

    #[test]
    fn test_rating_mirrors_photo_mechanic() {
        let mut xmp = Xmp::new();
        xmp.set_rating(Some(4));
        let xml = xmp.to_xml().unwrap();
        assert!(xml.contains(r#"xmp:Rating="4""#));
        assert!(xml.contains(r#"photomechanic:RatingEval="4""#));
        assert!(xml.contains(r#"photomechanic:RatingApply="True""#));
        assert_eq!(reparse(&xmp).rating(), Some(4));

        xmp.set_rating(None);
        assert!(!xmp.to_xml().unwrap().contains("Rating"));
    }

    #[test]
    fn test_about_is_stamped_on_every_description() {
        let xml = r#"<x:xmpmeta xmlns:x="adobe:ns:meta/"><rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"><rdf:Description rdf:about="uuid:1"/><rdf:Description/></rdf:RDF></x:xmpmeta>"#;
        let mut xmp = parse(xml);
        assert_eq!(xmp.about(), "uuid:1");

        xmp.set_about("");
        let out = xmp.to_xml().unwrap();
        assert_eq!(out.matches(r#"rdf:about="""#).count(), 2);
    }

    #[test]
    fn test_about_is_stamped_on_nested_descriptions() {
        let xml = xmp_packet(
            "",
            r#"<Iptc4xmpCore:CreatorContactInfo><rdf:Description rdf:about="uuid:old" Iptc4xmpCore:CiAdrCity="Oslo"/></Iptc4xmpCore:CreatorContactInfo>"#,
        );
        let mut xmp = parse(&xml);
        xmp.set_about("uuid:9");
        let out = xmp.to_xml().unwrap();
        assert_eq!(out.matches(r#"rdf:about="uuid:9""#).count(), 2);
        assert!(!out.contains("uuid:old"));

        let reparsed = Xmp::from_xml(&out).unwrap();
        assert_eq!(reparsed.contact_city().as_deref(), Some("Oslo"));
    }

    #[test]
    fn test_contact_in_nested_description() {
        let xml = xmp_packet(
            "",
            r#"<Iptc4xmpCore:CreatorContactInfo><rdf:Description Iptc4xmpCore:CiAdrCity="Oslo"/></Iptc4xmpCore:CreatorContactInfo>"#,
        );
        let mut xmp = parse(&xml);
        assert_eq!(xmp.contact_city().as_deref(), Some("Oslo"));

        xmp.set_contact_city(Some("Bergen"));
        let out = xmp.to_xml().unwrap();
        assert_eq!(out.matches("CiAdrCity").count(), 1);
        assert_eq!(reparse(&xmp).contact_city().as_deref(), Some("Bergen"));

        xmp.set_contact_city(None);
        assert!(!xmp.to_xml().unwrap().contains("CreatorContactInfo"));
    }

    #[test]
    fn test_packet_instructions_added_once() {
        let mut xmp = Xmp::new();
        xmp.set_headline(Some("x"));
        let once = xmp.to_xml().unwrap();
        let twice = reparse(&xmp).to_xml().unwrap();
        assert_eq!(once, twice);
        assert_eq!(once.matches("xpacket begin").count(), 1);
        assert_eq!(once.matches("xpacket end").count(), 1);
        assert!(once.contains("W5M0MpCehiHzreSzNTczkc9d"));
    }

    #[test]
    fn test_escaping_round_trip() {
        let value = r#"<Fish & "Chips"> Ærøskøbing 東京"#;
        let mut xmp = Xmp::new();
        xmp.set_headline(Some(value));
        xmp.set_caption(Some(value));
        xmp.set_keywords(vec![value.to_string()]);

        let back = reparse(&xmp);
        assert_eq!(back.headline().as_deref(), Some(value));
        assert_eq!(back.caption().as_deref(), Some(value));
        assert_eq!(back.keywords(), [value]);
    }

    #[test]
    fn test_toolkit() {
        let mut xmp = Xmp::new();
        xmp.set_toolkit(Some("imeta-io 0.1"));
        assert_eq!(reparse(&xmp).toolkit().as_deref(), Some("imeta-io 0.1"));
        assert!(xmp.to_xml().unwrap().contains(r#"x:xmptk="imeta-io 0.1""#));
    }

    #[test]
    fn test_field_table() {
        let mut xmp = Xmp::new();
        xmp.set_field(Field::Headline, Some("Head".into()));
        xmp.set_field(Field::Keywords, Some(FieldValue::List(vec!["a".into()])));
        xmp.set_field(Field::PhotographerName, Some("Jane".into()));

        assert_eq!(xmp.field(Field::Headline), Some(FieldValue::Text("Head".into())));
        assert_eq!(xmp.field(Field::Keywords), Some(FieldValue::List(vec!["a".into()])));
        assert_eq!(xmp.photographer_names(), ["Jane"]);

        xmp.set_field(Field::Keywords, None);
        assert_eq!(xmp.field(Field::Keywords), None);
    }

    #[test]
    fn test_reads_do_not_mark_changes() {
        let xmp = parse(&xmp_packet(r#"photoshop:Headline="x""#, ""));
        let _ = xmp.headline();
        let _ = xmp.keywords();
        let _ = xmp.to_xml().unwrap();
        assert!(!xmp.has_changes());
    }
}
