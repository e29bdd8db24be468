//! Named, reusable grammar resources: regex fragments and normalization
//! tables. Both are parsed once at load time and are read-only afterwards.

use std::borrow::Cow;
use std::collections::HashMap;

use thiserror::Error;
use timex_protocol::{names, GrammarElement, ResourceScope};

/// Normalization tables keyed by id (without the leading `#`).
pub type NormalizationTables = HashMap<String, NormalizationTable>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResourceError {
    #[error("<{element}> is missing required attribute '{attribute}'")]
    MissingAttribute {
        element: String,
        attribute: &'static str,
    },

    #[error("regex '{id}' does not specify an expression")]
    MissingExpression { id: String },

    #[error("resource '{id}' has unknown scope '{value}'")]
    UnknownScope { id: String, value: String },

    #[error("resource '{id}' has invalid value '{value}' for attribute '{attribute}'")]
    InvalidAttribute {
        id: String,
        attribute: &'static str,
        value: String,
    },

    #[error("normalization table '{table}' defines '{surface}' more than once")]
    DuplicateEntry { table: String, surface: String },
}

/// Common surface of every loaded definition.
pub trait GrammarResource {
    fn id(&self) -> &str;
    fn scope(&self) -> ResourceScope;
}

/// Reads the `id` and `scope` attributes shared by every resource element.
pub fn parse_header(element: &GrammarElement) -> Result<(String, ResourceScope), ResourceError> {
    let id = element
        .attribute(names::ID_ATTRIBUTE)
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ResourceError::MissingAttribute {
            element: element.name.clone(),
            attribute: names::ID_ATTRIBUTE,
        })?;

    let scope = match element.attribute(names::SCOPE_ATTRIBUTE) {
        None => ResourceScope::default(),
        Some(value) => ResourceScope::from_name(value).ok_or_else(|| ResourceError::UnknownScope {
            id: id.to_string(),
            value: value.to_string(),
        })?,
    };

    Ok((id.to_string(), scope))
}

/// Parses an optional boolean attribute (`true`/`false`, any case).
pub fn parse_bool_attribute(
    element: &GrammarElement,
    id: &str,
    attribute: &'static str,
) -> Result<Option<bool>, ResourceError> {
    match element.attribute(attribute).map(str::trim) {
        None => Ok(None),
        Some(v) if v.eq_ignore_ascii_case("true") => Ok(Some(true)),
        Some(v) if v.eq_ignore_ascii_case("false") => Ok(Some(false)),
        Some(v) => Err(ResourceError::InvalidAttribute {
            id: id.to_string(),
            attribute,
            value: v.to_string(),
        }),
    }
}

/// A raw regular-expression fragment, spliced wherever a rule references it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegexFragment {
    id: String,
    scope: ResourceScope,
    expression: String,
}

impl RegexFragment {
    pub fn new(id: impl Into<String>, expression: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            scope: ResourceScope::default(),
            expression: expression.into(),
        }
    }

    pub fn parse(element: &GrammarElement) -> Result<Self, ResourceError> {
        let (id, scope) = parse_header(element)?;
        let expression = element
            .attribute(names::EXPRESSION_ATTRIBUTE)
            .ok_or_else(|| ResourceError::MissingExpression { id: id.clone() })?
            .to_string();

        Ok(Self { id, scope, expression })
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }
}

impl GrammarResource for RegexFragment {
    fn id(&self) -> &str {
        &self.id
    }

    fn scope(&self) -> ResourceScope {
        self.scope
    }
}

/// Surface string -> canonical string mapping used by `Normalize(...)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizationTable {
    id: String,
    scope: ResourceScope,
    case_sensitive: bool,
    entries: HashMap<String, String>,
}

impl NormalizationTable {
    pub fn new(id: impl Into<String>, case_sensitive: bool) -> Self {
        Self {
            id: id.into(),
            scope: ResourceScope::default(),
            case_sensitive,
            entries: HashMap::new(),
        }
    }

    /// Parses a `<normalization_rule>` element. Each child `<item>` is an
    /// entry; a nested `<normalized>` child holds the canonical form,
    /// otherwise the entry is its own canonical form.
    pub fn parse(element: &GrammarElement, case_sensitive: bool) -> Result<Self, ResourceError> {
        let (id, scope) = parse_header(element)?;
        let case_sensitive =
            parse_bool_attribute(element, &id, names::CASE_SENSITIVE_ATTRIBUTE)?.unwrap_or(case_sensitive);

        let mut table = Self {
            id,
            scope,
            case_sensitive,
            entries: HashMap::new(),
        };

        for entry in element.elements().filter(|e| e.name == names::ITEM) {
            let (surface, canonical) = match entry.first_element(names::NORMALIZED) {
                Some(normalized) => (entry.own_text(), normalized.text()),
                None => {
                    let text = entry.text();
                    (text.clone(), text)
                }
            };

            let surface = surface.trim();
            if surface.is_empty() {
                continue;
            }
            table.insert(surface, canonical.trim())?;
        }

        Ok(table)
    }

    /// Adds one entry, folding the surface form when the table is case-insensitive.
    pub fn insert(&mut self, surface: &str, canonical: &str) -> Result<(), ResourceError> {
        let key = self.fold(surface).into_owned();
        if self.entries.contains_key(&key) {
            return Err(ResourceError::DuplicateEntry {
                table: self.id.clone(),
                surface: surface.to_string(),
            });
        }
        self.entries.insert(key, canonical.to_string());
        Ok(())
    }

    /// Looks up the canonical form. Unknown input is returned unchanged.
    pub fn normalize<'a>(&'a self, input: &'a str) -> Cow<'a, str> {
        let key = self.fold(input);
        match self.entries.get(&*key) {
            Some(canonical) => Cow::Borrowed(canonical.as_str()),
            None => Cow::Borrowed(input),
        }
    }

    pub fn is_case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn fold<'a>(&self, input: &'a str) -> Cow<'a, str> {
        if self.case_sensitive {
            Cow::Borrowed(input)
        } else {
            Cow::Owned(input.to_lowercase())
        }
    }
}

impl GrammarResource for NormalizationTable {
    fn id(&self) -> &str {
        &self.id
    }

    fn scope(&self) -> ResourceScope {
        self.scope
    }
}
