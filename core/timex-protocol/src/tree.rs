//! The parsed grammar document handed to the compiler.
//!
//! Document parsing is owned by collaborators; this is the minimal element
//! tree the compiler walks: element names, attributes, and mixed
//! element/text content in document order.

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;

#[cfg(feature = "serde")]
use serde::{Deserialize as SerdeDeserialize, Serialize as SerdeSerialize};

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(SerdeDeserialize, SerdeSerialize))]
pub enum GrammarNode {
    Element(GrammarElement),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(SerdeDeserialize, SerdeSerialize))]
pub struct GrammarElement {
    pub name: String,
    pub attributes: BTreeMap<String, String>,
    pub children: Vec<GrammarNode>,
}

impl GrammarElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn with_child(mut self, child: GrammarElement) -> Self {
        self.children.push(GrammarNode::Element(child));
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.children.push(GrammarNode::Text(text.into()));
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Direct child elements, in document order.
    pub fn elements(&self) -> impl Iterator<Item = &GrammarElement> {
        self.children.iter().filter_map(|child| match child {
            GrammarNode::Element(element) => Some(element),
            GrammarNode::Text(_) => None,
        })
    }

    pub fn first_element(&self, name: &str) -> Option<&GrammarElement> {
        self.elements().find(|element| element.name == name)
    }

    /// All descendant text, concatenated in document order.
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    /// Direct text children only, concatenated.
    pub fn own_text(&self) -> String {
        self.children
            .iter()
            .filter_map(|child| match child {
                GrammarNode::Text(text) => Some(text.as_str()),
                GrammarNode::Element(_) => None,
            })
            .collect()
    }

    fn collect_text(&self, out: &mut String) {
        for child in &self.children {
            match child {
                GrammarNode::Text(text) => out.push_str(text),
                GrammarNode::Element(element) => element.collect_text(out),
            }
        }
    }
}

/// Element and attribute names of the grammar document.
pub mod names {
    pub const REGEX: &str = "regex";
    pub const NORMALIZATION_RULE: &str = "normalization_rule";
    pub const RULE: &str = "rule";
    pub const NEGATIVE_RULE: &str = "negative_rule";
    pub const META: &str = "meta";

    pub const ITEM: &str = "item";
    pub const ONE_OF: &str = "one-of";
    pub const RULEREF: &str = "ruleref";
    pub const TAG: &str = "tag";
    pub const NORMALIZED: &str = "normalized";

    pub const ID_ATTRIBUTE: &str = "id";
    pub const SCOPE_ATTRIBUTE: &str = "scope";
    pub const TYPE_ATTRIBUTE: &str = "type";
    pub const EXAMPLE_ATTRIBUTE: &str = "example";
    pub const EXPRESSION_ATTRIBUTE: &str = "expression";
    pub const CASE_SENSITIVE_ATTRIBUTE: &str = "case_sensitive";
    pub const URI_ATTRIBUTE: &str = "uri";
    pub const REPEAT_ATTRIBUTE: &str = "repeat";
    pub const INCLUDE_ATTRIBUTE: &str = "include";
    pub const POS_ATTRIBUTE: &str = "pos";
    pub const NAME_ATTRIBUTE: &str = "name";
    pub const CONTENT_ATTRIBUTE: &str = "content";
}
