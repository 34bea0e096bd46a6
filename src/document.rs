// src/document.rs

//! A small owned XML tree built on `quick-xml`.
//!
//! Only what placemark extraction needs is kept: element names (qualified and
//! local), child order and text. Attributes, comments and processing
//! instructions are dropped. Text whose entity references cannot be resolved is
//! kept as a [`XmlNode::Malformed`] node instead of failing the whole document,
//! so a single broken placemark only poisons its own sub-tree.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::KmlError;

#[derive(Debug, Clone, PartialEq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
    Malformed { raw: String, reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct XmlElement {
    qualified_name: String,
    local_name: String,
    children: Vec<XmlNode>,
}

/// Text inside an element that could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedText {
    pub raw: String,
    pub reason: String,
}

/// How a tag name is compared against an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupStrategy {
    /// The name as written in the document, prefix included, must equal the tag.
    Exact,
    /// Only the local part is compared; any (or no) namespace prefix matches.
    AnyNamespace,
}

impl LookupStrategy {
    /// Strategies in the order they are tried.
    pub const ORDER: [LookupStrategy; 2] = [LookupStrategy::Exact, LookupStrategy::AnyNamespace];

    pub fn matches(self, element: &XmlElement, tag: &str) -> bool {
        match self {
            LookupStrategy::Exact => element.qualified_name == tag,
            LookupStrategy::AnyNamespace => element.local_name == tag,
        }
    }
}

impl XmlElement {
    fn from_start(start: &BytesStart<'_>) -> Self {
        XmlElement {
            qualified_name: String::from_utf8_lossy(start.name().as_ref()).into_owned(),
            local_name: String::from_utf8_lossy(start.local_name().as_ref()).into_owned(),
            children: Vec::new(),
        }
    }

    pub fn qualified_name(&self) -> &str {
        &self.qualified_name
    }

    pub fn local_name(&self) -> &str {
        &self.local_name
    }

    pub fn children(&self) -> &[XmlNode] {
        &self.children
    }

    /// All descendant elements in document order, not including `self`.
    pub fn descendants(&self) -> Descendants<'_> {
        let mut stack = Vec::new();
        push_child_elements(&mut stack, self);
        Descendants { stack }
    }

    /// Every descendant matching `tag` under one strategy.
    pub fn find_all(&self, tag: &str, strategy: LookupStrategy) -> Vec<&XmlElement> {
        self.descendants()
            .filter(|el| strategy.matches(el, tag))
            .collect()
    }

    /// Every descendant matching `tag`, trying exact names first and falling back to
    /// namespace-agnostic matching only when the exact pass finds nothing.
    pub fn lookup(&self, tag: &str) -> Vec<&XmlElement> {
        lookup_with(|strategy| self.find_all(tag, strategy))
    }

    /// First descendant matching `tag`, with the same fallback as [`lookup`](Self::lookup).
    pub fn lookup_first(&self, tag: &str) -> Option<&XmlElement> {
        LookupStrategy::ORDER
            .iter()
            .find_map(|strategy| self.descendants().find(|el| strategy.matches(el, tag)))
    }

    /// Concatenated text of all descendant text nodes, like DOM `textContent`.
    pub fn text_content(&self) -> Result<String, MalformedText> {
        let mut out = String::new();
        self.collect_text(&mut out)?;
        Ok(out)
    }

    fn collect_text(&self, out: &mut String) -> Result<(), MalformedText> {
        for child in &self.children {
            match child {
                XmlNode::Text(text) => out.push_str(text),
                XmlNode::Element(el) => el.collect_text(out)?,
                XmlNode::Malformed { raw, reason } => {
                    return Err(MalformedText {
                        raw: raw.clone(),
                        reason: reason.clone(),
                    })
                }
            }
        }
        Ok(())
    }
}

fn lookup_with<'a, F>(find: F) -> Vec<&'a XmlElement>
where
    F: Fn(LookupStrategy) -> Vec<&'a XmlElement>,
{
    for strategy in LookupStrategy::ORDER {
        let found = find(strategy);
        if !found.is_empty() {
            return found;
        }
    }
    Vec::new()
}

fn push_child_elements<'a>(stack: &mut Vec<&'a XmlElement>, element: &'a XmlElement) {
    for child in element.children.iter().rev() {
        if let XmlNode::Element(el) = child {
            stack.push(el);
        }
    }
}

/// Pre-order walk over an element's descendants.
pub struct Descendants<'a> {
    stack: Vec<&'a XmlElement>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a XmlElement;

    fn next(&mut self) -> Option<Self::Item> {
        let next = self.stack.pop()?;
        push_child_elements(&mut self.stack, next);
        Some(next)
    }
}

/// A parsed document with exactly one root element.
#[derive(Debug, Clone, PartialEq)]
pub struct XmlDocument {
    root: XmlElement,
}

impl XmlDocument {
    /// Parses XML text into a tree.
    ///
    /// Structural problems (bad syntax, mismatched or unclosed tags, no root, more
    /// than one root, stray text outside the root) fail with `InvalidDocument`.
    pub fn parse(text: &str) -> Result<Self, KmlError> {
        let mut reader = Reader::from_str(text);
        let mut open: Vec<XmlElement> = Vec::new();
        let mut root: Option<XmlElement> = None;

        loop {
            let event = reader.read_event().map_err(|e| {
                KmlError::InvalidDocument(format!(
                    "{} (at byte {})",
                    e,
                    reader.buffer_position()
                ))
            })?;

            match event {
                Event::Start(start) => open.push(XmlElement::from_start(&start)),
                Event::Empty(start) => {
                    attach(&mut open, &mut root, XmlElement::from_start(&start))?;
                }
                Event::End(end) => {
                    let element = open.pop().ok_or_else(|| {
                        KmlError::InvalidDocument(format!(
                            "unexpected closing tag </{}>",
                            String::from_utf8_lossy(end.name().as_ref())
                        ))
                    })?;
                    attach(&mut open, &mut root, element)?;
                }
                Event::Text(text) => {
                    let node = match text.unescape() {
                        Ok(decoded) => XmlNode::Text(decoded.into_owned()),
                        Err(e) => XmlNode::Malformed {
                            raw: String::from_utf8_lossy(&text).into_owned(),
                            reason: e.to_string(),
                        },
                    };
                    push_text(&mut open, node)?;
                }
                Event::CData(cdata) => {
                    let text = String::from_utf8_lossy(&cdata.into_inner()).into_owned();
                    push_text(&mut open, XmlNode::Text(text))?;
                }
                Event::Eof => break,
                // Declarations, comments, processing instructions and doctypes carry
                // nothing the extractor reads.
                _ => {}
            }
        }

        if let Some(unclosed) = open.last() {
            return Err(KmlError::InvalidDocument(format!(
                "unexpected end of document: <{}> is not closed",
                unclosed.qualified_name
            )));
        }

        root.map(|root| XmlDocument { root })
            .ok_or_else(|| KmlError::InvalidDocument("document has no root element".to_string()))
    }

    pub fn root(&self) -> &XmlElement {
        &self.root
    }

    /// Every element (root included) matching `tag`, with exact-then-any-namespace
    /// fallback.
    pub fn lookup(&self, tag: &str) -> Vec<&XmlElement> {
        lookup_with(|strategy| {
            std::iter::once(&self.root)
                .chain(self.root.descendants())
                .filter(|el| strategy.matches(el, tag))
                .collect()
        })
    }
}

fn attach(
    open: &mut [XmlElement],
    root: &mut Option<XmlElement>,
    element: XmlElement,
) -> Result<(), KmlError> {
    match open.last_mut() {
        Some(parent) => {
            parent.children.push(XmlNode::Element(element));
            Ok(())
        }
        None if root.is_none() => {
            *root = Some(element);
            Ok(())
        }
        None => Err(KmlError::InvalidDocument(format!(
            "junk after document element: <{}>",
            element.qualified_name
        ))),
    }
}

fn push_text(open: &mut [XmlElement], node: XmlNode) -> Result<(), KmlError> {
    match open.last_mut() {
        Some(parent) => {
            parent.children.push(node);
            Ok(())
        }
        None => {
            let stray = match &node {
                XmlNode::Text(text) => text.as_str(),
                XmlNode::Malformed { raw, .. } => raw.as_str(),
                XmlNode::Element(_) => "",
            };
            if stray.trim().is_empty() {
                Ok(())
            } else {
                Err(KmlError::InvalidDocument(
                    "text content outside the document element".to_string(),
                ))
            }
        }
    }
}
