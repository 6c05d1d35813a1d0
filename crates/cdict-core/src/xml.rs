//! Minimal element tree for the persisted dictionary and xref documents
//!
//! The analyzer's persisted state is a set of small, attribute-heavy XML
//! documents. They are read whole into an [`Element`] tree and written back
//! with two-space indentation.

use std::io::Write;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};

use crate::error::{DictionaryError, Result};

/// One XML element with its attributes (in document order) and child elements.
/// Text content is not retained; none of the persisted documents carry any.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Element>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Set an attribute, replacing an existing value with the same name
    pub fn set(&mut self, name: &str, value: impl Into<String>) -> &mut Self {
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| k == name) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((name.to_string(), value)),
        }
        self
    }

    pub fn with_attr(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn push(&mut self, child: Element) -> &mut Self {
        self.children.push(child);
        self
    }

    /// First direct child with the given name
    pub fn find(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    /// All direct children with the given name
    pub fn find_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Parse a document and return its root element
    pub fn parse(text: &str) -> Result<Element> {
        let mut reader = Reader::from_str(text);
        reader.config_mut().trim_text(true);

        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            match reader.read_event()? {
                Event::Start(start) => stack.push(element_from_start(&start)?),
                Event::Empty(start) => {
                    let element = element_from_start(&start)?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::End(_) => {
                    if let Some(element) = stack.pop() {
                        attach(&mut stack, &mut root, element)?;
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !stack.is_empty() {
            return Err(DictionaryError::MalformedEntry {
                table: stack[0].name.clone(),
                reason: "document ends inside an open element".to_string(),
            });
        }

        root.ok_or_else(|| DictionaryError::MalformedEntry {
            table: "<document>".to_string(),
            reason: "document has no root element".to_string(),
        })
    }

    /// Serialize the element as a complete document with an XML declaration
    pub fn to_document(&self) -> Result<String> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        self.write_to(&mut writer)?;
        let bytes = writer.into_inner();
        String::from_utf8(bytes).map_err(|e| DictionaryError::MalformedEntry {
            table: self.name.clone(),
            reason: e.to_string(),
        })
    }

    fn write_to<W: Write>(&self, writer: &mut Writer<W>) -> Result<()> {
        let mut start = BytesStart::new(self.name.as_str());
        for (key, value) in &self.attributes {
            start.push_attribute((key.as_str(), value.as_str()));
        }

        if self.children.is_empty() {
            writer.write_event(Event::Empty(start))?;
        } else {
            writer.write_event(Event::Start(start))?;
            for child in &self.children {
                child.write_to(writer)?;
            }
            writer.write_event(Event::End(BytesEnd::new(self.name.as_str())))?;
        }
        Ok(())
    }
}

fn element_from_start(start: &BytesStart<'_>) -> Result<Element> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut element = Element::new(name);
    for attr in start.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        element.attributes.push((key, value));
    }
    Ok(element)
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None => match root {
            Some(first) => {
                return Err(DictionaryError::MalformedEntry {
                    table: first.name.clone(),
                    reason: format!("second root element {}", element.name),
                })
            }
            None => *root = Some(element),
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nested_document() {
        let doc = r#"<?xml version="1.0" encoding="UTF-8"?>
<root version="2">
  <typ-table>
    <n t="tint,int" ix="0"/>
    <n t="tptr" a="0,1" ix="1"/>
  </typ-table>
  <exp-table/>
</root>"#;

        let root = Element::parse(doc).unwrap();
        assert_eq!(root.name, "root");
        assert_eq!(root.get("version"), Some("2"));

        let typs = root.find("typ-table").unwrap();
        let entries: Vec<_> = typs.find_all("n").collect();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].get("a"), Some("0,1"));
        assert!(root.find("exp-table").unwrap().children.is_empty());
        assert!(root.find("lval-table").is_none());
    }

    #[test]
    fn test_document_round_trip_escapes_attributes() {
        let mut root = Element::new("c-dictionary");
        let mut table = Element::new("attrparam-table");
        table.push(
            Element::new("n")
                .with_attr("t", "astr,a<b>&\"q\"")
                .with_attr("ix", "3"),
        );
        root.push(table);

        let text = root.to_document().unwrap();
        assert!(text.starts_with("<?xml"));

        let reparsed = Element::parse(&text).unwrap();
        assert_eq!(reparsed, root);
    }

    #[test]
    fn test_unclosed_document_is_an_error() {
        assert!(Element::parse("<root><child>").is_err());
        assert!(Element::parse("").is_err());
    }

    #[test]
    fn test_second_root_element_is_an_error() {
        let err = Element::parse("<global-xrefs/><global-xrefs/>").unwrap_err();
        assert!(matches!(err, DictionaryError::MalformedEntry { ref table, .. } if table == "global-xrefs"));
        assert!(Element::parse("<root><a/></root>\n<extra><b/></extra>").is_err());
    }

    #[test]
    fn test_empty_attribute_value_is_kept() {
        let root = Element::new("n").with_attr("t", "").with_attr("ix", "0");
        let reparsed = Element::parse(&root.to_document().unwrap()).unwrap();
        assert_eq!(reparsed.get("t"), Some(""));
    }
}
