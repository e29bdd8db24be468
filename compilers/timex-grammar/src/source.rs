//! XML grammar documents, read with `roxmltree` into a [`GrammarElement`] tree.

use roxmltree::{Document, Node};
use timex_protocol::{GrammarElement, GrammarNode};

use crate::error::GrammarError;

/// Parses `xml` and returns its root element. Comments and processing
/// instructions are dropped; text keeps its original whitespace.
pub fn parse_document(xml: &str) -> Result<GrammarElement, GrammarError> {
    let document = Document::parse(xml)?;
    Ok(convert(document.root_element()))
}

fn convert(node: Node<'_, '_>) -> GrammarElement {
    let mut element = GrammarElement::new(node.tag_name().name());
    for attribute in node.attributes() {
        element
            .attributes
            .insert(attribute.name().to_string(), attribute.value().to_string());
    }

    for child in node.children() {
        if child.is_element() {
            element.children.push(GrammarNode::Element(convert(child)));
        } else if child.is_text() {
            let text = child.text().unwrap_or_default();
            element.children.push(GrammarNode::Text(text.to_string()));
        }
    }
    element
}
