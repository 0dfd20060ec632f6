//! Owned XML tree for XMP packets
//!
//! quick-xml only tokenizes, so the events are assembled into a small tree
//! with namespace URIs resolved on every element and attribute. Namespace
//! declarations stay in the tree as attributes without a namespace, which
//! lets the packet be written back with its original prefixes.

use crate::error::{Error, Result};
use quick_xml::{
    escape::unescape,
    events::{BytesDecl, BytesEnd, BytesPI, BytesStart, BytesText, Event},
    Reader, Writer,
};
use std::borrow::Cow;

/// Namespace bound to the reserved `xml` prefix
pub(crate) const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

/// Child of an element, or a top-level node around the root
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Node {
    Element(Element),
    Text(String),
    Comment(String),
    /// Processing instruction, target included (`xpacket end="w"`)
    Pi(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Attribute {
    pub prefix: Option<String>,
    pub local: String,
    /// `None` for unprefixed attributes and namespace declarations
    pub ns: Option<String>,
    pub value: String,
}

impl Attribute {
    pub fn new(prefix: &str, local: &str, ns: &str, value: &str) -> Self {
        Self {
            prefix: Some(prefix.to_string()),
            local: local.to_string(),
            ns: Some(ns.to_string()),
            value: value.to_string(),
        }
    }

    /// `xmlns:p="uri"` declaration
    pub fn declaration(prefix: &str, uri: &str) -> Self {
        Self {
            prefix: Some("xmlns".to_string()),
            local: prefix.to_string(),
            ns: None,
            value: uri.to_string(),
        }
    }

    pub fn is(&self, ns: &str, local: &str) -> bool {
        self.ns.as_deref() == Some(ns) && self.local == local
    }

    /// Bound prefix (`None` for the default namespace) if this declares a namespace
    pub fn declared_prefix(&self) -> Option<Option<&str>> {
        match self.prefix.as_deref() {
            Some("xmlns") => Some(Some(&self.local)),
            None if self.local == "xmlns" => Some(None),
            _ => None,
        }
    }

    fn qname(&self) -> Cow<'_, str> {
        qualified(self.prefix.as_deref(), &self.local)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Element {
    pub prefix: Option<String>,
    pub local: String,
    pub ns: Option<String>,
    pub attributes: Vec<Attribute>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(prefix: &str, local: &str, ns: &str) -> Self {
        Self {
            prefix: Some(prefix.to_string()),
            local: local.to_string(),
            ns: Some(ns.to_string()),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn is(&self, ns: &str, local: &str) -> bool {
        self.ns.as_deref() == Some(ns) && self.local == local
    }

    pub fn attribute(&self, ns: &str, local: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.is(ns, local))
            .map(|a| a.value.as_str())
    }

    /// Replace the value of a matching attribute, or append `attribute`
    pub fn set_attribute(&mut self, attribute: Attribute) {
        let ns = attribute.ns.clone().unwrap_or_default();
        match self.attributes.iter_mut().find(|a| a.is(&ns, &attribute.local)) {
            Some(existing) => existing.value = attribute.value,
            None => self.attributes.push(attribute),
        }
    }

    pub fn remove_attribute(&mut self, ns: &str, local: &str) -> bool {
        let before = self.attributes.len();
        self.attributes.retain(|a| !a.is(ns, local));
        self.attributes.len() != before
    }

    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|n| match n {
            Node::Element(e) => Some(e),
            _ => None,
        })
    }

    pub fn child(&self, ns: &str, local: &str) -> Option<&Element> {
        self.elements().find(|e| e.is(ns, local))
    }

    pub fn child_mut(&mut self, ns: &str, local: &str) -> Option<&mut Element> {
        self.children.iter_mut().find_map(|n| match n {
            Node::Element(e) if e.is(ns, local) => Some(e),
            _ => None,
        })
    }

    /// Index in `children` of the first matching element
    pub fn child_index(&self, ns: &str, local: &str) -> Option<usize> {
        self.children
            .iter()
            .position(|n| matches!(n, Node::Element(e) if e.is(ns, local)))
    }

    pub fn element_at(&self, index: usize) -> Option<&Element> {
        match self.children.get(index)? {
            Node::Element(e) => Some(e),
            _ => None,
        }
    }

    pub fn element_at_mut(&mut self, index: usize) -> Option<&mut Element> {
        match self.children.get_mut(index)? {
            Node::Element(e) => Some(e),
            _ => None,
        }
    }

    pub fn remove_children(&mut self, ns: &str, local: &str) -> bool {
        let before = self.children.len();
        self.children
            .retain(|n| !matches!(n, Node::Element(e) if e.is(ns, local)));
        self.children.len() != before
    }

    /// Concatenated text of the direct text children
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|n| match n {
                Node::Text(t) => Some(t.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn set_text(&mut self, text: &str) {
        self.children.clear();
        if !text.is_empty() {
            self.children.push(Node::Text(text.to_string()));
        }
    }

    pub fn has_element_children(&self) -> bool {
        self.elements().next().is_some()
    }

    /// Namespace declarations made on this element
    pub fn declarations(&self) -> impl Iterator<Item = (Option<&str>, &str)> {
        self.attributes
            .iter()
            .filter_map(|a| a.declared_prefix().map(|p| (p, a.value.as_str())))
    }

    fn qname(&self) -> Cow<'_, str> {
        qualified(self.prefix.as_deref(), &self.local)
    }
}

fn qualified<'a>(prefix: Option<&str>, local: &'a str) -> Cow<'a, str> {
    match prefix {
        Some(p) => Cow::Owned(format!("{p}:{local}")),
        None => Cow::Borrowed(local),
    }
}

/// Namespace bindings in effect at some point of the tree
#[derive(Debug, Clone, Default)]
pub(crate) struct Scope {
    bindings: Vec<(Option<String>, String)>,
}

impl Scope {
    /// Add the declarations of `element`; returns a mark for [`Scope::leave`]
    pub fn enter(&mut self, element: &Element) -> usize {
        let mark = self.bindings.len();
        self.bindings.extend(
            element
                .declarations()
                .map(|(p, uri)| (p.map(str::to_string), uri.to_string())),
        );
        mark
    }

    pub fn leave(&mut self, mark: usize) {
        self.bindings.truncate(mark);
    }

    /// Namespace bound to `prefix`; `None` asks for the default namespace
    pub fn resolve(&self, prefix: Option<&str>) -> Option<&str> {
        if prefix == Some("xml") {
            return Some(XML_NS);
        }
        self.bindings
            .iter()
            .rev()
            .find(|(p, _)| p.as_deref() == prefix)
            .map(|(_, uri)| uri.as_str())
            .filter(|uri| !uri.is_empty())
    }

    /// A prefix currently bound to `ns`
    pub fn prefix_for(&self, ns: &str) -> Option<String> {
        if ns == XML_NS {
            return Some("xml".to_string());
        }
        self.bindings
            .iter()
            .rev()
            .filter_map(|(p, uri)| p.as_deref().filter(|_| uri == ns))
            .find(|p| self.resolve(Some(*p)) == Some(ns))
            .map(str::to_string)
    }

    /// `preferred` if it is free, else the first free `nsN`
    pub fn free_prefix(&self, preferred: &str) -> String {
        if self.resolve(Some(preferred)).is_none() {
            return preferred.to_string();
        }
        (1..)
            .map(|n| format!("ns{n}"))
            .find(|p| self.resolve(Some(p.as_str())).is_none())
            .unwrap_or_else(|| preferred.to_string())
    }
}

/// A parsed XML document: root element plus the nodes around it
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Document {
    pub declaration: bool,
    pub prolog: Vec<Node>,
    pub root: Element,
    pub epilog: Vec<Node>,
}

impl Document {
    pub fn new(root: Element) -> Self {
        Self {
            declaration: false,
            prolog: Vec::new(),
            root,
            epilog: Vec::new(),
        }
    }

    /// Parse a document; malformed XML and unbound prefixes are encoding errors
    pub fn parse(xml: &str) -> Result<Self> {
        let xml = xml.strip_prefix('\u{FEFF}').unwrap_or(xml);
        let xml = xml.trim_end_matches('\0');

        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(false);

        let mut builder = TreeBuilder::default();
        loop {
            let event = reader.read_event()?;
            match event {
                Event::Decl(_) => builder.declaration = true,
                Event::Start(e) => {
                    let element = builder.open(&e)?;
                    builder.stack.push(element);
                }
                Event::Empty(e) => {
                    let element = builder.open(&e)?;
                    builder.close(element)?;
                }
                Event::End(_) => {
                    let element = builder
                        .stack
                        .pop()
                        .ok_or_else(|| Error::Encoding("Malformed XMP: unexpected end tag".into()))?;
                    builder.close(element)?;
                }
                Event::Text(e) => {
                    let text = unescape_raw(&e)?;
                    builder.text(&text);
                }
                Event::CData(e) => {
                    let text = utf8(&e)?.to_string();
                    builder.text(&text);
                }
                Event::GeneralRef(e) => {
                    let text = unescape(&format!("&{};", utf8(&e)?))
                        .map_err(|e| Error::Encoding(format!("Malformed XMP: {e}")))?
                        .into_owned();
                    builder.text(&text);
                }
                Event::Comment(e) => builder.node(Node::Comment(utf8(&e)?.to_string())),
                Event::PI(e) => builder.node(Node::Pi(utf8(&e)?.to_string())),
                Event::DocType(_) => {}
                Event::Eof => break,
            }
        }
        builder.finish()
    }

    /// Serialize the document without reformatting
    pub fn to_xml(&self) -> Result<String> {
        let mut writer = Writer::new(Vec::new());
        if self.declaration {
            writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        }
        for node in &self.prolog {
            write_node(&mut writer, node)?;
        }
        write_element(&mut writer, &self.root)?;
        for node in &self.epilog {
            write_node(&mut writer, node)?;
        }
        String::from_utf8(writer.into_inner())
            .map_err(|e| Error::Encoding(format!("XMP output is not UTF-8: {e}")))
    }

    /// Insert the `xpacket` begin and end instructions unless already present
    pub fn ensure_packet_instructions(&mut self) {
        let is_xpacket = |node: &Node, marker: &str| {
            matches!(node, Node::Pi(pi) if pi.starts_with("xpacket") && pi.contains(marker))
        };
        let all = || self.prolog.iter().chain(self.epilog.iter());

        let has_begin = all().any(|n| is_xpacket(n, "begin"));
        let has_end = all().any(|n| is_xpacket(n, "end"));
        if !has_begin {
            self.prolog.push(Node::Pi(
                "xpacket begin=\"\u{FEFF}\" id=\"W5M0MpCehiHzreSzNTczkc9d\"".to_string(),
            ));
        }
        if !has_end {
            self.epilog.push(Node::Pi("xpacket end=\"w\"".to_string()));
        }
    }
}

#[derive(Default)]
struct TreeBuilder {
    declaration: bool,
    prolog: Vec<Node>,
    root: Option<Element>,
    epilog: Vec<Node>,
    stack: Vec<Element>,
    scope: Scope,
    marks: Vec<usize>,
}

impl TreeBuilder {
    /// Build an element from a start tag and enter its namespace scope
    fn open(&mut self, start: &BytesStart<'_>) -> Result<Element> {
        let qname = start.name();
        let (prefix, local) = split_name(utf8(qname.as_ref())?);

        let mut raw = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| Error::Encoding(format!("Malformed XMP attribute: {e}")))?;
            let (attr_prefix, attr_local) = split_name(utf8(attr.key.as_ref())?);
            let value = unescape_raw(&attr.value)?;
            raw.push(Attribute {
                prefix: attr_prefix.map(str::to_string),
                local: attr_local.to_string(),
                ns: None,
                value,
            });
        }

        let mut element = Element {
            prefix: prefix.map(str::to_string),
            local: local.to_string(),
            ns: None,
            attributes: raw,
            children: Vec::new(),
        };
        self.marks.push(self.scope.enter(&element));

        element.ns = self.resolve(element.prefix.as_deref(), true)?;
        let mut attributes = std::mem::take(&mut element.attributes);
        for attr in attributes.iter_mut() {
            if attr.declared_prefix().is_none() && attr.prefix.is_some() {
                attr.ns = self.resolve(attr.prefix.as_deref(), false)?;
            }
        }
        element.attributes = attributes;
        Ok(element)
    }

    fn resolve(&self, prefix: Option<&str>, use_default: bool) -> Result<Option<String>> {
        match prefix {
            Some(p) => self
                .scope
                .resolve(Some(p))
                .map(|uri| Some(uri.to_string()))
                .ok_or_else(|| Error::Encoding(format!("Unbound namespace prefix {p:?} in XMP"))),
            None if use_default => Ok(self.scope.resolve(None).map(str::to_string)),
            None => Ok(None),
        }
    }

    /// Leave the element's scope and attach it to its parent
    fn close(&mut self, mut element: Element) -> Result<()> {
        if let Some(mark) = self.marks.pop() {
            self.scope.leave(mark);
        }
        if element.has_element_children() {
            element
                .children
                .retain(|n| !matches!(n, Node::Text(t) if t.trim().is_empty()));
        }

        if let Some(parent) = self.stack.last_mut() {
            parent.children.push(Node::Element(element));
        } else if self.root.is_some() {
            return Err(Error::Encoding("XMP has more than one root element".into()));
        } else {
            self.root = Some(element);
        }
        Ok(())
    }

    fn text(&mut self, text: &str) {
        let Some(parent) = self.stack.last_mut() else {
            // Only whitespace is meaningful outside the root, and it is dropped
            return;
        };
        if let Some(Node::Text(last)) = parent.children.last_mut() {
            last.push_str(text);
        } else {
            parent.children.push(Node::Text(text.to_string()));
        }
    }

    fn node(&mut self, node: Node) {
        if let Some(parent) = self.stack.last_mut() {
            parent.children.push(node);
        } else if self.root.is_none() {
            self.prolog.push(node);
        } else {
            self.epilog.push(node);
        }
    }

    fn finish(self) -> Result<Document> {
        if !self.stack.is_empty() {
            return Err(Error::Encoding("Malformed XMP: unclosed element".into()));
        }
        let root = self
            .root
            .ok_or_else(|| Error::Encoding("XMP has no root element".into()))?;
        Ok(Document {
            declaration: self.declaration,
            prolog: self.prolog,
            root,
            epilog: self.epilog,
        })
    }
}

fn split_name(name: &str) -> (Option<&str>, &str) {
    match name.split_once(':') {
        Some((prefix, local)) => (Some(prefix), local),
        None => (None, name),
    }
}

fn utf8(bytes: &[u8]) -> Result<&str> {
    std::str::from_utf8(bytes).map_err(|e| Error::Encoding(format!("XMP is not UTF-8: {e}")))
}

fn unescape_raw(bytes: &[u8]) -> Result<String> {
    let raw = utf8(bytes)?;
    unescape(raw)
        .map(Cow::into_owned)
        .map_err(|e| Error::Encoding(format!("Malformed XMP: {e}")))
}

fn write_node(writer: &mut Writer<Vec<u8>>, node: &Node) -> Result<()> {
    match node {
        Node::Element(e) => write_element(writer, e)?,
        Node::Text(t) => writer.write_event(Event::Text(BytesText::new(t)))?,
        Node::Comment(c) => writer.write_event(Event::Comment(BytesText::from_escaped(c.as_str())))?,
        Node::Pi(pi) => writer.write_event(Event::PI(BytesPI::new(pi.as_str())))?,
    }
    Ok(())
}

fn write_element(writer: &mut Writer<Vec<u8>>, element: &Element) -> Result<()> {
    let name = element.qname();
    let mut start = BytesStart::new(&*name);
    for attr in &element.attributes {
        start.push_attribute((&*attr.qname(), attr.value.as_str()));
    }

    if element.children.is_empty() {
        writer.write_event(Event::Empty(start))?;
    } else {
        writer.write_event(Event::Start(start))?;
        for child in &element.children {
            write_node(writer, child)?;
        }
        writer.write_event(Event::End(BytesEnd::new(&*name)))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const RDF: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";

    #[test]
    fn test_namespaces_are_resolved() {
        let doc = Document::parse(
            r#"<x:xmpmeta xmlns:x="adobe:ns:meta/"><rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"><rdf:Description xmlns:a="urn:a" a:b="1" plain="2" xml:lang="en"/></rdf:RDF></x:xmpmeta>"#,
        )
        .unwrap();

        assert!(doc.root.is("adobe:ns:meta/", "xmpmeta"));
        let rdf = doc.root.child(RDF, "RDF").unwrap();
        let desc = rdf.child(RDF, "Description").unwrap();
        assert_eq!(desc.attribute("urn:a", "b"), Some("1"));
        assert_eq!(desc.attribute(XML_NS, "lang"), Some("en"));
        let plain = desc.attributes.iter().find(|a| a.local == "plain").unwrap();
        assert_eq!(plain.ns, None);
    }

    #[test]
    fn test_default_namespace() {
        let doc = Document::parse(r#"<xmpmeta xmlns="adobe:ns:meta/"><a/></xmpmeta>"#).unwrap();
        assert!(doc.root.is("adobe:ns:meta/", "xmpmeta"));
        assert!(doc.root.child("adobe:ns:meta/", "a").is_some());
    }

    #[test]
    fn test_unbound_prefix_is_rejected() {
        let err = Document::parse("<x:xmpmeta/>").unwrap_err();
        assert!(matches!(err, Error::Encoding(_)));
    }

    #[test]
    fn test_malformed_xml_is_rejected() {
        for xml in ["<a><b></a>", "<a>", "", "<a/><b/>", "<a x=\"&bogus;\"/>"] {
            assert!(
                matches!(Document::parse(xml), Err(Error::Encoding(_))),
                "accepted {xml:?}"
            );
        }
    }

    #[test]
    fn test_text_is_unescaped_and_escaped_again() {
        let doc = Document::parse(r#"<a>x &lt;&amp;&gt; &#233;"</a>"#).unwrap();
        assert_eq!(doc.root.text(), "x <&> é\"");

        let xml = doc.to_xml().unwrap();
        let reparsed = Document::parse(&xml).unwrap();
        assert_eq!(reparsed.root.text(), "x <&> é\"");
    }

    #[test]
    fn test_whitespace_between_elements_is_dropped() {
        let doc = Document::parse("<a>\n  <b> keep </b>\n</a>").unwrap();
        assert_eq!(doc.root.children.len(), 1);
        let b = doc.root.element_at(0).unwrap();
        assert_eq!(b.local, "b");
        assert_eq!(b.text(), " keep ");
    }

    #[test]
    fn test_packet_instructions_are_idempotent() {
        let mut doc = Document::parse("\u{FEFF}<a/>\0\0").unwrap();
        doc.ensure_packet_instructions();
        doc.ensure_packet_instructions();
        assert_eq!(doc.prolog.len(), 1);
        assert_eq!(doc.epilog.len(), 1);

        let xml = doc.to_xml().unwrap();
        assert!(xml.starts_with("<?xpacket begin=\"\u{FEFF}\" id=\"W5M0MpCehiHzreSzNTczkc9d\"?>"));
        assert!(xml.ends_with("<?xpacket end=\"w\"?>"));

        let mut reparsed = Document::parse(&xml).unwrap();
        reparsed.ensure_packet_instructions();
        assert_eq!(reparsed.to_xml().unwrap(), xml);
    }

    #[test]
    fn test_scope_prefix_lookup() {
        let mut outer = Element::new("x", "xmpmeta", "adobe:ns:meta/");
        outer.attributes.push(Attribute::declaration("x", "adobe:ns:meta/"));
        outer.attributes.push(Attribute::declaration("dc", "urn:other"));

        let mut scope = Scope::default();
        let mark = scope.enter(&outer);
        assert_eq!(scope.prefix_for("adobe:ns:meta/").as_deref(), Some("x"));
        assert_eq!(scope.prefix_for("http://purl.org/dc/elements/1.1/"), None);
        assert_eq!(scope.free_prefix("dc"), "ns1");
        assert_eq!(scope.free_prefix("photoshop"), "photoshop");
        scope.leave(mark);
        assert_eq!(scope.prefix_for("adobe:ns:meta/"), None);
    }
}
