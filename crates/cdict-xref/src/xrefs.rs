//! Persisted per-file cross-reference documents
//!
//! ```xml
//! <global-xrefs>
//!   <compinfo-xrefs>
//!     <cxref ckey="3" gckey="1"/>
//!   </compinfo-xrefs>
//!   <varinfo-xrefs>
//!     <vxref vid="7" gvid="42"/>
//!   </varinfo-xrefs>
//! </global-xrefs>
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use cdict_core::Element;
use tracing::debug;

use crate::error::{Result, XrefError};

pub const XREFS_ELEMENT: &str = "global-xrefs";
pub const COMPINFO_XREFS_ELEMENT: &str = "compinfo-xrefs";
pub const VARINFO_XREFS_ELEMENT: &str = "varinfo-xrefs";
pub const CXREF_ELEMENT: &str = "cxref";
pub const VXREF_ELEMENT: &str = "vxref";

/// Local-to-global mappings of one translation unit, sorted by local id
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileXrefs {
    pub ckeys: BTreeMap<i64, i64>,
    pub vids: BTreeMap<i64, i64>,
}

impl FileXrefs {
    pub fn is_empty(&self) -> bool {
        self.ckeys.is_empty() && self.vids.is_empty()
    }

    pub fn to_xml(&self) -> Element {
        let mut cxrefs = Element::new(COMPINFO_XREFS_ELEMENT);
        for (ckey, gckey) in &self.ckeys {
            cxrefs.push(
                Element::new(CXREF_ELEMENT)
                    .with_attr("ckey", ckey.to_string())
                    .with_attr("gckey", gckey.to_string()),
            );
        }

        let mut vxrefs = Element::new(VARINFO_XREFS_ELEMENT);
        for (vid, gvid) in &self.vids {
            vxrefs.push(
                Element::new(VXREF_ELEMENT)
                    .with_attr("vid", vid.to_string())
                    .with_attr("gvid", gvid.to_string()),
            );
        }

        let mut root = Element::new(XREFS_ELEMENT);
        root.push(cxrefs).push(vxrefs);
        root
    }

    /// Read the mappings under `node`, which is either the `global-xrefs`
    /// element itself or a document root containing it. Absent sections are
    /// empty; an entry missing either attribute fails the whole read.
    pub fn from_xml(node: &Element) -> Result<Self> {
        let node = if node.name == XREFS_ELEMENT {
            node
        } else {
            node.find(XREFS_ELEMENT).unwrap_or(node)
        };

        let mut xrefs = Self::default();
        if let Some(section) = node.find(COMPINFO_XREFS_ELEMENT) {
            for entry in section.find_all(CXREF_ELEMENT) {
                let ckey = int_attribute(entry, "Compinfo", "ckey")?;
                let gckey = int_attribute(entry, "Compinfo", "gckey")?;
                xrefs.ckeys.insert(ckey, gckey);
            }
        }
        if let Some(section) = node.find(VARINFO_XREFS_ELEMENT) {
            for entry in section.find_all(VXREF_ELEMENT) {
                let vid = int_attribute(entry, "Varinfo", "vid")?;
                let gvid = int_attribute(entry, "Varinfo", "gvid")?;
                xrefs.vids.insert(vid, gvid);
            }
        }
        Ok(xrefs)
    }

    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let xrefs = Self::from_xml(&Element::parse(&content)?)?;
        debug!(
            path = %path.as_ref().display(),
            ckeys = xrefs.ckeys.len(),
            vids = xrefs.vids.len(),
            "read xref document"
        );
        Ok(xrefs)
    }

    /// Write the document, creating missing parent directories
    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_xml().to_document()?)?;
        debug!(
            path = %path.display(),
            ckeys = self.ckeys.len(),
            vids = self.vids.len(),
            "wrote xref document"
        );
        Ok(())
    }
}

fn int_attribute(entry: &Element, element: &'static str, attribute: &'static str) -> Result<i64> {
    let value = entry
        .get(attribute)
        .ok_or(XrefError::MissingAttribute { element, attribute })?;
    value.trim().parse().map_err(|_| XrefError::InvalidInteger {
        element,
        attribute,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_document_shape() {
        let mut xrefs = FileXrefs::default();
        xrefs.vids.insert(9, 43);
        xrefs.vids.insert(7, 42);
        xrefs.ckeys.insert(3, 1);

        let root = xrefs.to_xml();
        assert_eq!(root.name, XREFS_ELEMENT);
        assert_eq!(
            root.children.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
            vec![COMPINFO_XREFS_ELEMENT, VARINFO_XREFS_ELEMENT]
        );

        let vids: Vec<_> = root
            .find(VARINFO_XREFS_ELEMENT)
            .unwrap()
            .find_all(VXREF_ELEMENT)
            .map(|e| e.get("vid").unwrap().to_string())
            .collect();
        assert_eq!(vids, vec!["7", "9"]);
    }

    #[test]
    fn test_missing_sections_are_empty() {
        let xrefs = FileXrefs::from_xml(&Element::new(XREFS_ELEMENT)).unwrap();
        assert!(xrefs.is_empty());
    }

    #[test]
    fn test_nested_under_document_root() {
        let root = Element::parse(
            r#"<c-analysis>
                 <header name="global-xrefs"/>
                 <global-xrefs>
                   <varinfo-xrefs><vxref vid="1" gvid="5"/></varinfo-xrefs>
                 </global-xrefs>
               </c-analysis>"#,
        )
        .unwrap();

        let xrefs = FileXrefs::from_xml(&root).unwrap();
        assert_eq!(xrefs.vids.get(&1), Some(&5));
    }

    #[test]
    fn test_missing_attribute_is_an_error() {
        let root = Element::parse(
            r#"<global-xrefs>
                 <compinfo-xrefs><cxref ckey="3"/></compinfo-xrefs>
               </global-xrefs>"#,
        )
        .unwrap();

        let err = FileXrefs::from_xml(&root).unwrap_err();
        assert!(matches!(
            err,
            XrefError::MissingAttribute {
                attribute: "gckey",
                ..
            }
        ));
        assert_eq!(err.to_string(), "Compinfo xref without gckey attribute");
    }

    #[test]
    fn test_invalid_integer() {
        let root = Element::parse(
            r#"<global-xrefs>
                 <varinfo-xrefs><vxref vid="x" gvid="5"/></varinfo-xrefs>
               </global-xrefs>"#,
        )
        .unwrap();

        assert!(matches!(
            FileXrefs::from_xml(&root),
            Err(XrefError::InvalidInteger { attribute: "vid", .. })
        ));
    }
}
