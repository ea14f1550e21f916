//! XMI Reader
//!
//! Reads an XMI trace repository into a RecordStore. Records are the `nodes`
//! children of the document root, numbered in document order, which is what
//! `//@nodes.N` references point at.

use anyhow::{bail, Context, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::debug;

use crate::domain::record::{Element, RecordStore};
use crate::ports::RecordParser;

/// Element name of top-level records.
const RECORD_ELEMENT: &str = "nodes";

pub struct XmiRecordParser;

impl RecordParser for XmiRecordParser {
    fn parse(&self, src: &str) -> Result<RecordStore> {
        let root = parse_document(src)?;
        let records: Vec<Element> = root
            .children
            .into_iter()
            .filter(|c| c.name == RECORD_ELEMENT)
            .collect();
        debug!("[XMI] {} records under <{}>", records.len(), root.name);
        Ok(RecordStore::new(records))
    }
}

/// Parse the whole document into an element tree and return its root.
pub fn parse_document(src: &str) -> Result<Element> {
    let mut reader = Reader::from_str(src);
    reader.trim_text(true);

    // Open elements, innermost last
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        let position = reader.buffer_position();
        match reader
            .read_event()
            .with_context(|| format!("Malformed XML near byte {}", position))?
        {
            Event::Start(start) => {
                stack.push(element_from(&start)?);
            }
            Event::Empty(start) => {
                let element = element_from(&start)?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::End(_) => {
                let Some(element) = stack.pop() else {
                    bail!("Unbalanced closing tag near byte {}", position);
                };
                attach(&mut stack, &mut root, element)?;
            }
            Event::Eof => break,
            // Text, comments, declarations and processing instructions carry no record data
            _ => {}
        }
    }

    if !stack.is_empty() {
        bail!("Unexpected end of document: {} unclosed element(s)", stack.len());
    }
    root.context("Document has no root element")
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None if root.is_none() => *root = Some(element),
        None => bail!("Document has more than one root element"),
    }
    Ok(())
}

fn element_from(start: &BytesStart<'_>) -> Result<Element> {
    let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
    let mut element = Element::new(name);

    for attr in start.attributes() {
        let attr = attr.context("Invalid XML attribute")?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .with_context(|| format!("Invalid value for attribute `{}`", key))?
            .into_owned();
        element.attributes.insert(key, value);
    }

    Ok(element)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::record::TypeTag;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<mpm_trace:MegaModel xmi:version="2.0" xmlns:xmi="http://www.omg.org/XMI" xmlns:mpm_trace="http://mpm_trace">
  <nodes xmi:type="mpm_trace:Model" name="PIM &amp; co" abstractionLevel="PIM"/>
  <nodes xmi:type="mpm_trace:TraceModel" name="tr" version="2">
    <contains name="R1">
      <intents name="i"><params name="p"/></intents>
      <traceLinks name="l"/>
    </contains>
  </nodes>
  <!-- not a record -->
  <other name="skip"/>
</mpm_trace:MegaModel>"#;

    #[test]
    fn test_parse_records() {
        let store = XmiRecordParser.parse(SAMPLE).unwrap();
        assert_eq!(store.len(), 2);

        let types: Vec<Option<TypeTag>> = store.all().map(|(_, r)| r.type_tag()).collect();
        assert_eq!(types, vec![Some(TypeTag::Model), Some(TypeTag::TraceModel)]);

        let (_, model) = store.all().next().unwrap();
        assert_eq!(model.attr("name"), Some("PIM & co"));

        let (_, trace) = store.all().nth(1).unwrap();
        let rule = &trace.children[0];
        assert_eq!(rule.name, "contains");
        assert_eq!(rule.children.len(), 2);
        assert_eq!(rule.children[0].children[0].attr("name"), Some("p"));
    }

    #[test]
    fn test_rejects_unbalanced_document() {
        assert!(XmiRecordParser.parse("<root><nodes name=\"a\"></root>").is_err());
        assert!(XmiRecordParser.parse("<root><nodes name=\"a\">").is_err());
    }

    #[test]
    fn test_empty_root() {
        let store = XmiRecordParser.parse("<root/>").unwrap();
        assert!(store.is_empty());
    }
}
