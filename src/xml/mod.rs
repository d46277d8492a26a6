//! Minimal XML tokenizer and element tree
//!
//! Speech documents (SRGS grammars, NLSML results) are small, namespace-light
//! XML. This module provides a pull tokenizer that checks well-formedness
//! (balanced tags, a single root element, valid references) and a small owned
//! element tree used where a document has to be rewritten.
//!
//! Processing instructions, comments and the document type declaration are
//! skipped. CDATA sections are reported as text.

pub mod schema;

use memchr::{memchr, memchr2, memmem};
use std::borrow::Cow;
use std::fmt;

/// Well-formedness failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlError {
    /// Byte offset where the problem was detected
    pub position: usize,
    /// What went wrong
    pub reason: String,
}

impl XmlError {
    fn new(position: usize, reason: impl Into<String>) -> Self {
        Self {
            position,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for XmlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at byte {}", self.reason, self.position)
    }
}

impl std::error::Error for XmlError {}

/// An attribute of an opening tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute<'a> {
    /// Qualified name, prefix included
    pub name: &'a str,
    /// Value with references decoded
    pub value: Cow<'a, str>,
}

/// A tokenizer event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlEvent<'a> {
    /// Start tag; `self_closing` tags produce no matching [`XmlEvent::Close`]
    Open {
        /// Tag name
        name: &'a str,
        /// Attributes in document order
        attributes: Vec<Attribute<'a>>,
        /// `<tag/>` form
        self_closing: bool,
    },
    /// End tag
    Close {
        /// Tag name
        name: &'a str,
    },
    /// Character data inside the root element
    Text(Cow<'a, str>),
}

/// Pull tokenizer over a complete document
pub struct Tokenizer<'a> {
    input: &'a str,
    pos: usize,
    open: Vec<&'a str>,
    root_closed: bool,
    root_seen: bool,
    failed: bool,
}

impl<'a> Tokenizer<'a> {
    /// Create a tokenizer for `input`
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            open: Vec::new(),
            root_closed: false,
            root_seen: false,
            failed: false,
        }
    }

    fn bytes(&self) -> &'a [u8] {
        self.input.as_bytes()
    }

    fn next_event(&mut self) -> Result<Option<XmlEvent<'a>>, XmlError> {
        loop {
            if self.pos >= self.input.len() {
                if let Some(name) = self.open.last() {
                    return Err(XmlError::new(
                        self.pos,
                        format!("unexpected end of document inside <{}>", name),
                    ));
                }
                if !self.root_seen {
                    return Err(XmlError::new(self.pos, "document has no root element"));
                }
                return Ok(None);
            }

            let rest = &self.bytes()[self.pos..];
            if rest[0] != b'<' {
                let end = memchr(b'<', rest).map_or(self.input.len(), |i| self.pos + i);
                let start = self.pos;
                self.pos = end;
                let raw = &self.input[start..end];
                if self.open.is_empty() {
                    if raw.trim().is_empty() {
                        continue;
                    }
                    return Err(XmlError::new(start, "text outside of the root element"));
                }
                return decode(raw, start).map(|text| Some(XmlEvent::Text(text)));
            }

            if rest.starts_with(b"<?") {
                self.skip_past(b"?>", "unterminated processing instruction")?;
                continue;
            }
            if rest.starts_with(b"<!--") {
                self.skip_past(b"-->", "unterminated comment")?;
                continue;
            }
            if rest.starts_with(b"<![CDATA[") {
                if self.open.is_empty() {
                    return Err(XmlError::new(self.pos, "CDATA outside of the root element"));
                }
                let body_start = self.pos + 9;
                let end = memmem::find(&self.bytes()[body_start..], b"]]>")
                    .ok_or_else(|| XmlError::new(self.pos, "unterminated CDATA section"))?;
                self.pos = body_start + end + 3;
                let text = &self.input[body_start..body_start + end];
                return Ok(Some(XmlEvent::Text(Cow::Borrowed(text))));
            }
            if rest.starts_with(b"<!") {
                self.skip_declaration()?;
                continue;
            }
            if rest.starts_with(b"</") {
                return self.close_tag().map(Some);
            }
            return self.open_tag().map(Some);
        }
    }

    fn skip_past(&mut self, terminator: &[u8], reason: &str) -> Result<(), XmlError> {
        let end = memmem::find(&self.bytes()[self.pos..], terminator)
            .ok_or_else(|| XmlError::new(self.pos, reason))?;
        self.pos += end + terminator.len();
        Ok(())
    }

    /// `<!DOCTYPE ...>`, possibly with an internal subset in brackets
    fn skip_declaration(&mut self) -> Result<(), XmlError> {
        let start = self.pos;
        let mut depth = 0usize;
        for (i, &b) in self.bytes()[start..].iter().enumerate() {
            match b {
                b'[' => depth += 1,
                b']' => depth = depth.saturating_sub(1),
                b'>' if depth == 0 => {
                    self.pos = start + i + 1;
                    return Ok(());
                }
                _ => {}
            }
        }
        Err(XmlError::new(start, "unterminated declaration"))
    }

    fn close_tag(&mut self) -> Result<XmlEvent<'a>, XmlError> {
        let start = self.pos;
        let end = memchr(b'>', &self.bytes()[start..])
            .ok_or_else(|| XmlError::new(start, "unterminated end tag"))?;
        let name = self.input[start + 2..start + end].trim_end();
        self.pos = start + end + 1;
        match self.open.pop() {
            Some(open) if open == name => {
                if self.open.is_empty() {
                    self.root_closed = true;
                }
                Ok(XmlEvent::Close { name })
            }
            Some(open) => Err(XmlError::new(
                start,
                format!("</{}> does not close <{}>", name, open),
            )),
            None => Err(XmlError::new(start, format!("unexpected </{}>", name))),
        }
    }

    fn open_tag(&mut self) -> Result<XmlEvent<'a>, XmlError> {
        let start = self.pos;
        if self.root_closed {
            return Err(XmlError::new(start, "more than one root element"));
        }
        let bytes = self.bytes();
        let mut i = start + 1;
        let name_end = scan_name(bytes, i);
        if name_end == i {
            return Err(XmlError::new(start, "missing tag name"));
        }
        let name = &self.input[i..name_end];
        i = name_end;

        let mut attributes = Vec::new();
        loop {
            i = skip_space(bytes, i);
            match bytes.get(i) {
                None => return Err(XmlError::new(start, format!("unterminated <{}>", name))),
                Some(b'>') => {
                    self.pos = i + 1;
                    self.open.push(name);
                    self.root_seen = true;
                    return Ok(XmlEvent::Open {
                        name,
                        attributes,
                        self_closing: false,
                    });
                }
                Some(b'/') => {
                    if bytes.get(i + 1) != Some(&b'>') {
                        return Err(XmlError::new(i, "expected '>' after '/'"));
                    }
                    self.pos = i + 2;
                    self.root_seen = true;
                    if self.open.is_empty() {
                        self.root_closed = true;
                    }
                    return Ok(XmlEvent::Open {
                        name,
                        attributes,
                        self_closing: true,
                    });
                }
                Some(_) => {
                    let (attribute, next) = self.attribute(i)?;
                    if attributes
                        .iter()
                        .any(|a: &Attribute<'_>| a.name == attribute.name)
                    {
                        return Err(XmlError::new(
                            i,
                            format!("duplicate attribute {} on <{}>", attribute.name, name),
                        ));
                    }
                    attributes.push(attribute);
                    i = next;
                }
            }
        }
    }

    fn attribute(&self, start: usize) -> Result<(Attribute<'a>, usize), XmlError> {
        let bytes = self.bytes();
        let name_end = scan_name(bytes, start);
        if name_end == start {
            return Err(XmlError::new(start, "malformed attribute"));
        }
        let name = &self.input[start..name_end];
        let mut i = skip_space(bytes, name_end);
        if bytes.get(i) != Some(&b'=') {
            return Err(XmlError::new(i, format!("attribute {} has no value", name)));
        }
        i = skip_space(bytes, i + 1);
        let quote = match bytes.get(i) {
            Some(&q) if q == b'"' || q == b'\'' => q,
            _ => return Err(XmlError::new(i, format!("attribute {} is not quoted", name))),
        };
        let value_start = i + 1;
        let value_len = memchr2(quote, b'<', &bytes[value_start..])
            .filter(|&n| bytes[value_start + n] == quote)
            .ok_or_else(|| XmlError::new(i, format!("unterminated value for {}", name)))?;
        let value = decode(&self.input[value_start..value_start + value_len], value_start)?;
        Ok((Attribute { name, value }, value_start + value_len + 1))
    }
}

impl<'a> Iterator for Tokenizer<'a> {
    type Item = Result<XmlEvent<'a>, XmlError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.next_event() {
            Ok(event) => event.map(Ok),
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            }
        }
    }
}

fn scan_name(bytes: &[u8], start: usize) -> usize {
    let mut i = start;
    while let Some(&b) = bytes.get(i) {
        if b.is_ascii_whitespace() || matches!(b, b'/' | b'>' | b'=' | b'<' | b'"' | b'\'') {
            break;
        }
        i += 1;
    }
    i
}

fn skip_space(bytes: &[u8], start: usize) -> usize {
    let mut i = start;
    while bytes.get(i).is_some_and(|b| b.is_ascii_whitespace()) {
        i += 1;
    }
    i
}

/// Resolve character and predefined entity references
pub fn decode(raw: &str, offset: usize) -> Result<Cow<'_, str>, XmlError> {
    let Some(first) = memchr(b'&', raw.as_bytes()) else {
        return Ok(Cow::Borrowed(raw));
    };

    let mut out = String::with_capacity(raw.len());
    out.push_str(&raw[..first]);
    let mut rest = &raw[first..];
    while let Some(amp) = memchr(b'&', rest.as_bytes()) {
        out.push_str(&rest[..amp]);
        let after = &rest[amp + 1..];
        let semi = memchr(b';', after.as_bytes()).ok_or_else(|| {
            XmlError::new(offset + raw.len() - rest.len() + amp, "unterminated reference")
        })?;
        let entity = &after[..semi];
        let ch = match entity {
            "lt" => Some('<'),
            "gt" => Some('>'),
            "amp" => Some('&'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            _ => entity
                .strip_prefix("#x")
                .map(|hex| u32::from_str_radix(hex, 16).ok())
                .or_else(|| entity.strip_prefix('#').map(|dec| dec.parse::<u32>().ok()))
                .flatten()
                .and_then(char::from_u32),
        };
        match ch {
            Some(c) => out.push(c),
            None => {
                return Err(XmlError::new(
                    offset + raw.len() - rest.len() + amp,
                    format!("unknown reference &{};", entity),
                ))
            }
        }
        rest = &after[semi + 1..];
    }
    out.push_str(rest);
    Ok(Cow::Owned(out))
}

/// Escape text for element content or a double-quoted attribute value
pub fn escape(text: &str) -> Cow<'_, str> {
    if !text.bytes().any(|b| matches!(b, b'<' | b'>' | b'&' | b'"')) {
        return Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(text.len() + 8);
    for c in text.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    Cow::Owned(out)
}

// ============================================================================
// Element tree
// ============================================================================

/// Child of an [`Element`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Nested element
    Element(Element),
    /// Character data
    Text(String),
}

/// An owned XML element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Tag name
    pub name: String,
    /// Attributes in insertion order
    pub attributes: Vec<(String, String)>,
    /// Child nodes
    pub children: Vec<Node>,
}

impl Element {
    /// Create an empty element
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Parse a document into its root element
    pub fn parse(document: &str) -> Result<Element, XmlError> {
        // Stack of open elements; the root stays at index 0.
        let mut stack: Vec<Element> = Vec::new();
        let mut root = None;
        for event in Tokenizer::new(document) {
            match event? {
                XmlEvent::Open {
                    name,
                    attributes,
                    self_closing,
                } => {
                    let mut element = Element::new(name);
                    element.attributes = attributes
                        .into_iter()
                        .map(|a| (a.name.to_string(), a.value.into_owned()))
                        .collect();
                    if self_closing {
                        match stack.last_mut() {
                            Some(parent) => parent.children.push(Node::Element(element)),
                            None => root = Some(element),
                        }
                    } else {
                        stack.push(element);
                    }
                }
                XmlEvent::Close { .. } => {
                    let Some(done) = stack.pop() else {
                        return Err(XmlError::new(document.len(), "unbalanced end tag"));
                    };
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(Node::Element(done)),
                        None => root = Some(done),
                    }
                }
                XmlEvent::Text(text) => {
                    if let Some(current) = stack.last_mut() {
                        current.children.push(Node::Text(text.into_owned()));
                    }
                }
            }
        }
        root.ok_or_else(|| XmlError::new(document.len(), "document has no root element"))
    }

    /// Builder-style attribute setter
    pub fn with_attribute(mut self, name: &str, value: &str) -> Self {
        self.set_attribute(name, value);
        self
    }

    /// Set or replace an attribute
    pub fn set_attribute(&mut self, name: &str, value: &str) {
        match self.attributes.iter_mut().find(|(n, _)| n == name) {
            Some((_, v)) => *v = value.to_string(),
            None => self.attributes.push((name.to_string(), value.to_string())),
        }
    }

    /// Attribute value by name
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Append a child element and return a mutable reference to it
    pub fn push_element(&mut self, child: Element) -> &mut Element {
        self.children.push(Node::Element(child));
        match self.children.last_mut() {
            Some(Node::Element(e)) => e,
            _ => unreachable!("an element was just pushed"),
        }
    }

    /// Append character data
    pub fn push_text(&mut self, text: impl Into<String>) {
        self.children.push(Node::Text(text.into()));
    }

    /// First child element with the given name
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find_map(|node| match node {
            Node::Element(e) if e.name == name => Some(e),
            _ => None,
        })
    }

    /// Concatenated character data of the direct children
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|node| match node {
                Node::Text(t) => Some(t.as_str()),
                Node::Element(_) => None,
            })
            .collect()
    }

    /// Serialize without an XML declaration
    pub fn to_xml(&self) -> String {
        let mut out = String::new();
        self.write_to(&mut out);
        out
    }

    fn write_to(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.name);
        for (name, value) in &self.attributes {
            out.push(' ');
            out.push_str(name);
            out.push_str("=\"");
            out.push_str(&escape(value));
            out.push('"');
        }
        if self.children.is_empty() {
            out.push_str("/>");
            return;
        }
        out.push('>');
        for child in &self.children {
            match child {
                Node::Element(e) => e.write_to(out),
                Node::Text(t) => out.push_str(&escape(t)),
            }
        }
        out.push_str("</");
        out.push_str(&self.name);
        out.push('>');
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_xml())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn events(doc: &str) -> Result<Vec<XmlEvent<'_>>, XmlError> {
        Tokenizer::new(doc).collect()
    }

    #[test]
    fn test_simple_document() {
        let ev = events(r#"<?xml version="1.0"?><a x="1"><b/>hi</a>"#).unwrap();
        assert_eq!(ev.len(), 4);
        match &ev[0] {
            XmlEvent::Open {
                name, attributes, ..
            } => {
                assert_eq!(*name, "a");
                assert_eq!(attributes[0].name, "x");
                assert_eq!(attributes[0].value, "1");
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(
            ev[1],
            XmlEvent::Open {
                name: "b",
                self_closing: true,
                ..
            }
        ));
        assert_eq!(ev[2], XmlEvent::Text(Cow::Borrowed("hi")));
        assert_eq!(ev[3], XmlEvent::Close { name: "a" });
    }

    #[test]
    fn test_comments_doctype_cdata() {
        let doc = "<!DOCTYPE a [<!ENTITY x 'y'>]><!-- c --><a><![CDATA[<raw>]]></a>";
        let ev = events(doc).unwrap();
        assert_eq!(ev[1], XmlEvent::Text(Cow::Borrowed("<raw>")));
    }

    #[test]
    fn test_references_decoded() {
        let ev = events("<a t='&lt;&#65;&#x42;'>&amp;</a>").unwrap();
        match &ev[0] {
            XmlEvent::Open { attributes, .. } => assert_eq!(attributes[0].value, "<AB"),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(ev[1], XmlEvent::Text(Cow::Owned("&".to_string())));
    }

    #[test]
    fn test_mismatched_close() {
        assert!(events("<a><b></a></b>").is_err());
    }

    #[test]
    fn test_unclosed_root() {
        assert!(events("<a><b/>").is_err());
    }

    #[test]
    fn test_two_roots() {
        assert!(events("<a/><b/>").is_err());
    }

    #[test]
    fn test_text_outside_root() {
        assert!(events("junk<a/>").is_err());
        assert!(events("  <a/>  ").is_ok());
    }

    #[test]
    fn test_empty_document() {
        assert!(events("").is_err());
    }

    #[test]
    fn test_unknown_entity() {
        assert!(events("<a>&bogus;</a>").is_err());
    }

    #[test]
    fn test_duplicate_attribute() {
        assert!(events(r#"<a x="1" x="2"/>"#).is_err());
    }

    #[test]
    fn test_element_round_trip() {
        let root = Element::parse(r#"<result grammar="g"><input mode="dtmf">1 2</input></result>"#)
            .unwrap();
        assert_eq!(root.name, "result");
        assert_eq!(root.attribute("grammar"), Some("g"));
        assert_eq!(root.child("input").unwrap().text(), "1 2");
        assert_eq!(
            root.to_xml(),
            r#"<result grammar="g"><input mode="dtmf">1 2</input></result>"#
        );
    }

    #[test]
    fn test_set_attribute_replaces() {
        let mut e = Element::new("a").with_attribute("x", "1");
        e.set_attribute("x", "2");
        assert_eq!(e.to_xml(), r#"<a x="2"/>"#);
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape("a<b & \"c\""), "a&lt;b &amp; &quot;c&quot;");
        assert!(matches!(escape("plain"), Cow::Borrowed(_)));
    }
}
