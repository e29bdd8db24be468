//! Compiles one `<rule>` element into anchored and unanchored regexes.
//!
//! Structural nodes (`item`, `one-of`, `ruleref`) that carry a tag script,
//! an include restriction, a POS restriction, or a repeat range are wrapped
//! in a named group `PartN`. Groups are numbered per rule in document order,
//! a parent before its children.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use once_cell::sync::OnceCell;
use regex::{Regex, RegexBuilder};
use timex_protocol::{names, GrammarElement, GrammarNode, PartId, ResourceScope, TemporalType, TimexOptions};
use timex_resources::{parse_bool_attribute, parse_header, GrammarResource, RegexFragment};
use timex_script::{TagActionProvider, TagScript};
use tracing::{debug, warn};

use crate::error::GrammarError;

/// Inserted between adjacent pieces of a sequence.
const WHITESPACE: &str = r"\s*";

pub type Fragments = HashMap<String, RegexFragment>;

#[derive(Debug)]
pub struct RuleResource {
    id: String,
    scope: ResourceScope,
    rule_type: TemporalType,
    example: String,
    expression: String,
    compiled_expression: Regex,
    compiled_exact_expression: Regex,
    marked_parts_count: u32,
    tag_scripts: Vec<(String, String)>,
    pos_restrictions: BTreeMap<String, String>,
    include_restrictions: Vec<String>,
    pub(crate) tag_actions: OnceCell<Vec<(String, Arc<TagScript>)>>,
}

impl RuleResource {
    /// Compiles the rule and hands each tag script to `registrar`.
    pub fn compile(
        element: &GrammarElement,
        fragments: &Fragments,
        options: TimexOptions,
        registrar: &mut dyn TagActionProvider,
    ) -> Result<Self, GrammarError> {
        let (id, scope) = parse_header(element)?;

        let rule_type = {
            let value = required_attribute(element, &id, names::TYPE_ATTRIBUTE)?;
            TemporalType::from_type_name(value).ok_or_else(|| GrammarError::UnknownRuleType {
                rule_id: id.clone(),
                value: value.to_string(),
            })?
        };
        let example = required_attribute(element, &id, names::EXAMPLE_ATTRIBUTE)?.to_string();

        if element.first_element(names::TAG).is_some() {
            warn!(rule = %id, "<tag> directly under a rule has no group and is ignored");
        }

        let mut builder = ExpressionBuilder::new(&id, fragments);
        let expression = builder.sequence(element)?;
        if expression.is_empty() {
            return Err(GrammarError::EmptyRule { rule_id: id });
        }

        let case_insensitive = !options.contains(TimexOptions::CASE_SENSITIVE);
        let build = |pattern: &str| {
            RegexBuilder::new(pattern)
                .case_insensitive(case_insensitive)
                .build()
                .map_err(|source| GrammarError::InvalidExpression {
                    rule_id: id.clone(),
                    source,
                })
        };
        let compiled_expression = build(&expression)?;
        let compiled_exact_expression = build(&format!("^(?:{})$", expression))?;

        for (pattern, regex) in [("unanchored", &compiled_expression), ("anchored", &compiled_exact_expression)] {
            if !regex.is_match(&example) {
                return Err(GrammarError::ExampleMismatch {
                    rule_id: id,
                    example,
                    pattern,
                });
            }
        }

        let ExpressionBuilder {
            next_part,
            tag_scripts,
            pos_restrictions,
            include_restrictions,
            ..
        } = builder;

        for (group, source) in &tag_scripts {
            registrar.append(&id, group, source)?;
        }

        debug!(rule = %id, groups = next_part, %expression, "compiled rule");

        Ok(Self {
            id,
            scope,
            rule_type,
            example,
            expression,
            compiled_expression,
            compiled_exact_expression,
            marked_parts_count: next_part,
            tag_scripts,
            pos_restrictions,
            include_restrictions,
            tag_actions: OnceCell::new(),
        })
    }

    pub fn rule_type(&self) -> TemporalType {
        self.rule_type
    }

    pub fn example(&self) -> &str {
        &self.example
    }

    /// The generated regex source, before anchoring.
    pub fn expression(&self) -> &str {
        &self.expression
    }

    pub fn compiled_expression(&self) -> &Regex {
        &self.compiled_expression
    }

    pub fn compiled_exact_expression(&self) -> &Regex {
        &self.compiled_exact_expression
    }

    pub fn marked_parts_count(&self) -> u32 {
        self.marked_parts_count
    }

    /// `(group, source)` pairs in declaration order.
    pub fn tag_scripts(&self) -> &[(String, String)] {
        &self.tag_scripts
    }

    /// Recorded per group but not enforced when matching.
    pub fn pos_restrictions(&self) -> &BTreeMap<String, String> {
        &self.pos_restrictions
    }

    pub fn include_restrictions(&self) -> &[String] {
        &self.include_restrictions
    }

    /// Tag actions resolved so far, if any match has realized them.
    pub fn tag_actions(&self) -> Option<&[(String, Arc<TagScript>)]> {
        self.tag_actions.get().map(Vec::as_slice)
    }
}

impl GrammarResource for RuleResource {
    fn id(&self) -> &str {
        &self.id
    }

    fn scope(&self) -> ResourceScope {
        self.scope
    }
}

fn required_attribute<'a>(
    element: &'a GrammarElement,
    rule_id: &str,
    attribute: &'static str,
) -> Result<&'a str, GrammarError> {
    element
        .attribute(attribute)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| GrammarError::MissingAttribute {
            rule_id: rule_id.to_string(),
            element: element.name.clone(),
            attribute,
        })
}

/// Restrictions declared on one structural node.
#[derive(Debug)]
struct NodeAttributes {
    quantifier: Option<String>,
    include: bool,
    pos: Option<String>,
    tag: Option<String>,
}

impl NodeAttributes {
    fn needs_group(&self) -> bool {
        self.tag.is_some() || !self.include || self.pos.is_some() || self.quantifier.is_some()
    }
}

/// Per-rule compilation state.
struct ExpressionBuilder<'a> {
    rule_id: &'a str,
    fragments: &'a Fragments,
    next_part: u32,
    tag_scripts: Vec<(String, String)>,
    pos_restrictions: BTreeMap<String, String>,
    include_restrictions: Vec<String>,
}

impl<'a> ExpressionBuilder<'a> {
    fn new(rule_id: &'a str, fragments: &'a Fragments) -> Self {
        Self {
            rule_id,
            fragments,
            next_part: 0,
            tag_scripts: Vec::new(),
            pos_restrictions: BTreeMap::new(),
            include_restrictions: Vec::new(),
        }
    }

    /// Child nodes and non-blank text runs, in document order, joined by
    /// optional whitespace. Tags belong to their owner and are skipped.
    fn sequence(&mut self, element: &GrammarElement) -> Result<String, GrammarError> {
        let mut pieces = Vec::new();
        for child in &element.children {
            let piece = match child {
                GrammarNode::Text(text) => literal(text),
                GrammarNode::Element(child) if child.name == names::TAG => None,
                GrammarNode::Element(child) => self.node(child)?,
            };
            pieces.extend(piece);
        }
        Ok(pieces.join(WHITESPACE))
    }

    fn node(&mut self, element: &GrammarElement) -> Result<Option<String>, GrammarError> {
        let kind = element.name.as_str();
        if ![names::ITEM, names::ONE_OF, names::RULEREF].contains(&kind) {
            warn!(rule = self.rule_id, element = kind, "ignoring unknown grammar element");
            return Ok(None);
        }

        let attributes = self.attributes(element)?;

        // The group is numbered before the children are visited.
        let part = attributes.needs_group().then(|| {
            let part = PartId::new(self.next_part).to_string();
            self.next_part += 1;
            part
        });

        let body = match kind {
            names::ITEM => self.sequence(element)?,
            names::ONE_OF => self.alternation(element)?,
            _ => self.reference(element)?,
        };

        let Some(part) = part else {
            return Ok((!body.is_empty()).then_some(body));
        };

        if let Some(source) = attributes.tag {
            self.tag_scripts.push((part.clone(), source));
        }
        if let Some(pos) = attributes.pos {
            self.pos_restrictions.insert(part.clone(), pos);
        }
        if !attributes.include {
            self.include_restrictions.push(part.clone());
        }

        let body = match attributes.quantifier {
            Some(quantifier) => format!("(?:{}){}", body, quantifier),
            None => body,
        };
        Ok(Some(format!("(?P<{}>{})", part, body)))
    }

    fn alternation(&mut self, element: &GrammarElement) -> Result<String, GrammarError> {
        let mut alternatives = Vec::new();
        for child in &element.children {
            let alternative = match child {
                GrammarNode::Text(text) => literal(text),
                GrammarNode::Element(child) if child.name == names::TAG => None,
                GrammarNode::Element(child) => self.node(child)?,
            };
            alternatives.extend(alternative);
        }

        if alternatives.is_empty() {
            return Err(GrammarError::EmptyAlternation {
                rule_id: self.rule_id.to_string(),
            });
        }
        Ok(format!("(?:{})", alternatives.join("|")))
    }

    fn reference(&self, element: &GrammarElement) -> Result<String, GrammarError> {
        let uri = required_attribute(element, self.rule_id, names::URI_ATTRIBUTE)?;
        let reference = uri.trim_start_matches('#');

        let fragment = self
            .fragments
            .get(reference)
            .ok_or_else(|| GrammarError::UnknownFragmentReference {
                rule_id: self.rule_id.to_string(),
                reference: reference.to_string(),
            })?;
        Ok(format!("(?:{})", fragment.expression()))
    }

    fn attributes(&self, element: &GrammarElement) -> Result<NodeAttributes, GrammarError> {
        let quantifier = element
            .attribute(names::REPEAT_ATTRIBUTE)
            .map(|value| {
                repeat_quantifier(value).ok_or_else(|| GrammarError::InvalidRepeat {
                    rule_id: self.rule_id.to_string(),
                    value: value.to_string(),
                })
            })
            .transpose()?;

        let include = parse_bool_attribute(element, self.rule_id, names::INCLUDE_ATTRIBUTE)
            .map_err(|_| GrammarError::InvalidInclude {
                rule_id: self.rule_id.to_string(),
                value: element.attribute(names::INCLUDE_ATTRIBUTE).unwrap_or_default().trim().to_string(),
            })?
            .unwrap_or(true);

        let pos = element
            .attribute(names::POS_ATTRIBUTE)
            .map(str::trim)
            .filter(|pos| !pos.is_empty())
            .map(String::from);

        let mut tags = element.elements().filter(|child| child.name == names::TAG);
        let tag = tags.next().map(|tag| tag.text().trim().to_string());
        if tags.next().is_some() {
            return Err(GrammarError::DuplicateTag {
                rule_id: self.rule_id.to_string(),
            });
        }

        Ok(NodeAttributes {
            quantifier,
            include,
            pos,
            tag,
        })
    }
}

/// Escapes each word of a text run; words may be separated by any
/// whitespace in the input.
fn literal(text: &str) -> Option<String> {
    let words: Vec<_> = text.split_whitespace().map(regex::escape).collect();
    if words.is_empty() {
        return None;
    }
    Some(format!("(?:{})", words.join(r"\s+")))
}

/// `m-n` → `{m,n}`, `m-` → `{m,}`, `n` → `{n}`.
fn repeat_quantifier(value: &str) -> Option<String> {
    let value = value.trim();
    let parse = |n: &str| n.trim().parse::<u32>().ok();

    match value.split_once('-') {
        None => parse(value).map(|n| format!("{{{}}}", n)),
        Some((min, max)) if max.trim().is_empty() => parse(min).map(|m| format!("{{{},}}", m)),
        Some((min, max)) => {
            let (min, max) = (parse(min)?, parse(max)?);
            (min <= max).then(|| format!("{{{},{}}}", min, max))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use timex_script::{ScriptError, ScriptRegistry};

    fn rule(id: &str, kind: &str, example: &str) -> GrammarElement {
        GrammarElement::new(names::RULE)
            .with_attribute("id", id)
            .with_attribute("type", kind)
            .with_attribute("example", example)
    }

    fn item(text: &str) -> GrammarElement {
        GrammarElement::new(names::ITEM).with_text(text)
    }

    fn tag(source: &str) -> GrammarElement {
        GrammarElement::new(names::TAG).with_text(source)
    }

    fn compile(element: &GrammarElement) -> Result<RuleResource, GrammarError> {
        let mut fragments = Fragments::new();
        fragments.insert("hour".to_string(), RegexFragment::new("hour", "[0-9]{1,2}"));
        RuleResource::compile(element, &fragments, TimexOptions::empty(), &mut ScriptRegistry::new())
    }

    #[test]
    fn test_literal_and_sequence() {
        let element = rule("r", "date", "next  week").with_child(item("next week"));
        let compiled = compile(&element).unwrap();
        assert_eq!(compiled.expression(), r"(?:next\s+week)");
        assert_eq!(compiled.marked_parts_count(), 0);
        assert!(compiled.compiled_exact_expression().is_match("NEXT WEEK"));

        let element = rule("r", "time", "at 5").with_text("at").with_child(
            GrammarElement::new(names::RULEREF).with_attribute("uri", "#hour"),
        );
        assert_eq!(compile(&element).unwrap().expression(), r"(?:at)\s*(?:[0-9]{1,2})");
    }

    #[test]
    fn test_literals_are_escaped() {
        let element = rule("r", "time", "5 p.m.").with_child(item("5 p.m."));
        let compiled = compile(&element).unwrap();
        assert!(compiled.compiled_exact_expression().is_match("5 p.m."));
        assert!(!compiled.compiled_exact_expression().is_match("5 pxmx"));
    }

    #[test]
    fn test_groups_are_numbered_parent_first() {
        let element = rule("r", "date", "next monday").with_child(
            GrammarElement::new(names::ITEM)
                .with_child(tag("timex[\"a\"] = value"))
                .with_child(GrammarElement::new(names::ITEM).with_attribute("include", "FALSE").with_text("next"))
                .with_child(
                    GrammarElement::new(names::ONE_OF)
                        .with_attribute("pos", "noun")
                        .with_child(item("monday"))
                        .with_child(item("tuesday")),
                ),
        );
        let compiled = compile(&element).unwrap();

        assert_eq!(
            compiled.expression(),
            r"(?P<Part0>(?P<Part1>(?:next))\s*(?P<Part2>(?:(?:monday)|(?:tuesday))))"
        );
        assert_eq!(compiled.marked_parts_count(), 3);
        assert_eq!(compiled.tag_scripts(), &[("Part0".to_string(), "timex[\"a\"] = value".to_string())]);
        assert_eq!(compiled.include_restrictions(), &["Part1".to_string()]);
        assert_eq!(compiled.pos_restrictions().get("Part2").map(String::as_str), Some("noun"));
    }

    #[test]
    fn test_repeat_ranges() {
        assert_eq!(repeat_quantifier("0-1").as_deref(), Some("{0,1}"));
        assert_eq!(repeat_quantifier("2-").as_deref(), Some("{2,}"));
        assert_eq!(repeat_quantifier("3").as_deref(), Some("{3}"));
        assert_eq!(repeat_quantifier("3-1"), None);
        assert_eq!(repeat_quantifier("a-b"), None);

        let element = rule("r", "duration", "very long")
            .with_child(GrammarElement::new(names::ITEM).with_attribute("repeat", "1-3").with_text("very"))
            .with_child(item("long"));
        let compiled = compile(&element).unwrap();
        assert_eq!(compiled.expression(), r"(?P<Part0>(?:(?:very)){1,3})\s*(?:long)");

        let element = rule("r", "date", "x").with_child(GrammarElement::new(names::ITEM).with_attribute("repeat", "many").with_text("x"));
        assert!(matches!(compile(&element).unwrap_err(), GrammarError::InvalidRepeat { .. }));
    }

    #[test]
    fn test_tag_scripts_are_registered() {
        let element = rule("tomorrow", "date", "tomorrow")
            .with_child(item("tomorrow").with_child(tag("timex[\"offset_days\"] = \"1\"")));

        let mut registry = ScriptRegistry::new();
        let compiled = RuleResource::compile(&element, &Fragments::new(), TimexOptions::empty(), &mut registry).unwrap();
        assert_eq!(compiled.expression(), "(?P<Part0>(?:tomorrow))");
        assert!(registry.get("tomorrow", "Part0").is_some());
        assert!(compiled.tag_actions().is_none());
    }

    #[test]
    fn test_case_sensitivity_option() {
        let element = rule("r", "date", "May").with_child(item("May"));
        let compiled = RuleResource::compile(
            &element,
            &Fragments::new(),
            TimexOptions::CASE_SENSITIVE,
            &mut ScriptRegistry::new(),
        )
        .unwrap();
        assert!(compiled.compiled_expression().is_match("in May"));
        assert!(!compiled.compiled_expression().is_match("in may"));
    }

    #[test]
    fn test_compile_errors() {
        let missing_type = GrammarElement::new(names::RULE)
            .with_attribute("id", "r")
            .with_attribute("example", "x")
            .with_child(item("x"));
        assert!(matches!(
            compile(&missing_type).unwrap_err(),
            GrammarError::MissingAttribute { attribute: "type", .. }
        ));

        let bad_type = rule("r", "weekday", "x").with_child(item("x"));
        assert!(matches!(compile(&bad_type).unwrap_err(), GrammarError::UnknownRuleType { .. }));

        assert!(matches!(compile(&rule("r", "date", "x")).unwrap_err(), GrammarError::EmptyRule { .. }));

        let empty_one_of = rule("r", "date", "x").with_child(GrammarElement::new(names::ONE_OF));
        assert!(matches!(compile(&empty_one_of).unwrap_err(), GrammarError::EmptyAlternation { .. }));

        let two_tags = rule("r", "date", "x").with_child(item("x").with_child(tag("timex[\"a\"] = 1")).with_child(tag("timex[\"b\"] = 2")));
        assert!(matches!(compile(&two_tags).unwrap_err(), GrammarError::DuplicateTag { .. }));

        let bad_include = rule("r", "date", "x").with_child(item("x").with_attribute("include", "maybe"));
        assert!(matches!(
            compile(&bad_include).unwrap_err(),
            GrammarError::InvalidInclude { value, .. } if value == "maybe"
        ));

        let unknown_ref = rule("r", "date", "x").with_child(GrammarElement::new(names::RULEREF).with_attribute("uri", "#minute"));
        assert!(matches!(
            compile(&unknown_ref).unwrap_err(),
            GrammarError::UnknownFragmentReference { reference, .. } if reference == "minute"
        ));

        let no_uri = rule("r", "date", "x").with_child(GrammarElement::new(names::RULEREF));
        assert!(matches!(compile(&no_uri).unwrap_err(), GrammarError::MissingAttribute { attribute: "uri", .. }));

        let bad_script = rule("r", "date", "x").with_child(item("x").with_child(tag("what")));
        assert!(matches!(
            compile(&bad_script).unwrap_err(),
            GrammarError::Script(ScriptError::UnrecognizedStatement { .. })
        ));
    }

    #[test]
    fn test_example_must_match() {
        let element = rule("r", "date", "yesterday").with_child(item("tomorrow"));
        assert!(matches!(
            compile(&element).unwrap_err(),
            GrammarError::ExampleMismatch { pattern: "unanchored", .. }
        ));

        // found inside the example, but not the whole of it
        let element = rule("r", "date", "see you tomorrow").with_child(item("tomorrow"));
        assert!(matches!(
            compile(&element).unwrap_err(),
            GrammarError::ExampleMismatch { pattern: "anchored", .. }
        ));

        let mut fragments = Fragments::new();
        fragments.insert("broken".to_string(), RegexFragment::new("broken", "[0-9"));
        let element = rule("r", "date", "1").with_child(GrammarElement::new(names::RULEREF).with_attribute("uri", "broken"));
        assert!(matches!(
            RuleResource::compile(&element, &fragments, TimexOptions::empty(), &mut ScriptRegistry::new()).unwrap_err(),
            GrammarError::InvalidExpression { .. }
        ));
    }
}
