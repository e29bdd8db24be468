//! A whole grammar document, compiled and ready to match.

use std::collections::HashSet;

use timex_protocol::{names, GrammarElement, GrammarHints, ResourceScope, TemporalType, TimexOptions};
use timex_resources::{GrammarResource, NormalizationTable, NormalizationTables, RegexFragment};
use timex_script::ScriptRegistry;
use tracing::{info, warn};

use crate::error::{GrammarError, MatchError};
use crate::matcher::{MatchContext, RuleMatch};
use crate::rule::{Fragments, RuleResource};
use crate::source;

#[derive(Debug)]
pub struct CompiledGrammar {
    options: TimexOptions,
    hints: GrammarHints,
    fragments: Fragments,
    tables: NormalizationTables,
    rules: Vec<RuleResource>,
    negative_rules: Vec<RuleResource>,
    scripts: ScriptRegistry,
}

/// Compiles a parsed grammar tree.
///
/// Resources and hints are loaded first so rules can reference fragments
/// declared anywhere in the document. Every failing element is reported;
/// the grammar is only returned when there are none.
pub fn load_grammar(root: &GrammarElement, options: TimexOptions) -> Result<CompiledGrammar, Vec<GrammarError>> {
    let mut errors = Vec::new();
    let mut grammar = CompiledGrammar {
        options,
        hints: GrammarHints::default(),
        fragments: Fragments::new(),
        tables: NormalizationTables::new(),
        rules: Vec::new(),
        negative_rules: Vec::new(),
        scripts: ScriptRegistry::new(),
    };

    for element in root.elements() {
        match element.name.as_str() {
            names::REGEX => match RegexFragment::parse(element) {
                Ok(fragment) if grammar.fragments.contains_key(fragment.id()) => errors.push(GrammarError::DuplicateId {
                    kind: "regex",
                    id: fragment.id().to_string(),
                }),
                Ok(fragment) => {
                    grammar.fragments.insert(fragment.id().to_string(), fragment);
                }
                Err(err) => errors.push(err.into()),
            },
            names::NORMALIZATION_RULE => {
                let case_sensitive = options.contains(TimexOptions::CASE_SENSITIVE);
                match NormalizationTable::parse(element, case_sensitive) {
                    Ok(table) if grammar.tables.contains_key(table.id()) => errors.push(GrammarError::DuplicateId {
                        kind: "normalization_rule",
                        id: table.id().to_string(),
                    }),
                    Ok(table) => {
                        grammar.tables.insert(table.id().to_string(), table);
                    }
                    Err(err) => errors.push(err.into()),
                }
            }
            names::META => {
                let name = element.attribute(names::NAME_ATTRIBUTE).unwrap_or_default();
                let content = element.attribute(names::CONTENT_ATTRIBUTE).unwrap_or_default();
                if !grammar.hints.apply(name, content) {
                    warn!(name, content, "ignoring invalid <meta> hint");
                }
            }
            names::RULE | names::NEGATIVE_RULE => {}
            other => warn!(element = other, "ignoring unknown grammar element"),
        }
    }

    // Positive and negative rules share one id space: tag scripts are keyed by it.
    let mut rule_ids = HashSet::new();
    for element in root.elements() {
        let negative = match element.name.as_str() {
            names::RULE => false,
            names::NEGATIVE_RULE => true,
            _ => continue,
        };

        let rule = match RuleResource::compile(element, &grammar.fragments, options, &mut grammar.scripts) {
            Ok(rule) => rule,
            Err(err) => {
                errors.push(err);
                continue;
            }
        };

        if !rule_ids.insert(rule.id().to_string()) {
            errors.push(GrammarError::DuplicateId {
                kind: "rule",
                id: rule.id().to_string(),
            });
        } else if negative {
            grammar.negative_rules.push(rule);
        } else {
            grammar.rules.push(rule);
        }
    }

    if !errors.is_empty() {
        warn!(errors = errors.len(), "grammar failed to load");
        return Err(errors);
    }

    info!(
        rules = grammar.rules.len(),
        negative_rules = grammar.negative_rules.len(),
        regexes = grammar.fragments.len(),
        normalization_rules = grammar.tables.len(),
        "grammar loaded"
    );
    Ok(grammar)
}

impl CompiledGrammar {
    /// Parses an XML grammar document and compiles it.
    pub fn from_xml(xml: &str, options: TimexOptions) -> Result<Self, Vec<GrammarError>> {
        let root = source::parse_document(xml).map_err(|err| vec![err])?;
        load_grammar(&root, options)
    }

    fn context(&self) -> MatchContext<'_> {
        MatchContext {
            scripts: &self.scripts,
            tables: &self.tables,
        }
    }

    fn public_rules(&self, types: TemporalType) -> impl Iterator<Item = &RuleResource> {
        self.rules
            .iter()
            .filter(move |rule| rule.scope() == ResourceScope::Public && types.intersects(rule.rule_type()))
    }

    /// The first public rule, in document order, matching the whole of `text`.
    pub fn match_exact(&self, text: &str) -> Result<Option<RuleMatch>, MatchError> {
        self.match_exact_typed(text, TemporalType::all())
    }

    pub fn match_exact_typed(&self, text: &str, types: TemporalType) -> Result<Option<RuleMatch>, MatchError> {
        for rule in self.public_rules(types) {
            if let Some(found) = rule.match_exact(text, self.context())? {
                return Ok(Some(found));
            }
        }
        Ok(None)
    }

    /// Every match of every public rule, ordered by index. Overlaps are kept.
    pub fn match_all(&self, text: &str) -> Result<Vec<RuleMatch>, MatchError> {
        self.collect_matches(self.public_rules(TemporalType::all()), text)
    }

    /// Matches of the requested types with overlaps resolved and anything
    /// enclosed by a negative rule removed.
    pub fn extract(&self, text: &str, types: TemporalType) -> Result<Vec<RuleMatch>, MatchError> {
        let candidates = self.collect_matches(self.public_rules(types), text)?;
        let mut kept = disambiguate(candidates);

        let negative_rules = self
            .negative_rules
            .iter()
            .filter(|rule| rule.scope() == ResourceScope::Public && types.intersects(rule.rule_type()));
        let negatives = self.collect_matches(negative_rules, text)?;

        kept.retain(|found| {
            !negatives
                .iter()
                .any(|negative| negative.index <= found.index && found.end() <= negative.end())
        });
        Ok(kept)
    }

    fn collect_matches<'a>(
        &'a self,
        rules: impl Iterator<Item = &'a RuleResource>,
        text: &str,
    ) -> Result<Vec<RuleMatch>, MatchError> {
        let mut matches = Vec::new();
        for rule in rules {
            matches.extend(rule.match_all(text, self.context())?);
        }
        matches.sort_by_key(|found| found.index);
        Ok(matches)
    }

    pub fn options(&self) -> TimexOptions {
        self.options
    }

    pub fn hints(&self) -> &GrammarHints {
        &self.hints
    }

    pub fn rules(&self) -> &[RuleResource] {
        &self.rules
    }

    pub fn negative_rules(&self) -> &[RuleResource] {
        &self.negative_rules
    }

    pub fn rule(&self, id: &str) -> Option<&RuleResource> {
        self.rules.iter().chain(&self.negative_rules).find(|rule| rule.id() == id)
    }

    pub fn fragment(&self, id: &str) -> Option<&RegexFragment> {
        self.fragments.get(id)
    }

    pub fn normalization_table(&self, id: &str) -> Option<&NormalizationTable> {
        self.tables.get(id.trim_start_matches('#'))
    }
}

/// Keeps a match when it starts past the end of the last kept one. At the
/// same index, a longer match (or an equally long one that produced more
/// facts) replaces the last kept one. Input must be sorted by index.
fn disambiguate(sorted: Vec<RuleMatch>) -> Vec<RuleMatch> {
    let mut kept: Vec<RuleMatch> = Vec::with_capacity(sorted.len());
    for found in sorted {
        match kept.last_mut() {
            None => kept.push(found),
            Some(last) if found.index > last.end() => kept.push(found),
            Some(last) if found.index == last.index => {
                let longer = found.value.len() > last.value.len();
                let richer = found.value.len() == last.value.len()
                    && found.timex_dictionary.len() > last.timex_dictionary.len();
                if longer || richer {
                    *last = found;
                }
            }
            Some(_) => {}
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    const GRAMMAR: &str = r##"
<grammar>
  <meta name="AmPmInferenceCutoff" content="7"/>
  <meta name="WeekdayLogic" content="SimpleOffset"/>
  <meta name="Bogus" content="1"/>
  <regex id="hour" scope="private" expression="[0-9]{1,2}"/>
  <normalization_rule id="weekdays">
    <item>mon<normalized>monday</normalized></item>
    <item>tue<normalized>tuesday</normalized></item>
    <item>monday</item>
  </normalization_rule>
  <rule id="tomorrow" type="date" example="tomorrow">
    <item>tomorrow<tag>timex["offset_days"] = "1"</tag></item>
  </rule>
  <rule id="day_after_tomorrow" type="date" example="the day after tomorrow">
    <item include="false">the</item>
    <item>day after tomorrow<tag>timex["offset_days"] = "2"</tag></item>
  </rule>
  <rule id="weekday" type="date" example="next mon">
    <item>next<tag>timex["offset_weeks"] = "1"</tag></item>
    <one-of>
      <item>mon</item>
      <item>tue</item>
      <tag>timex["weekday"] = Normalize("#weekdays", value)</tag>
    </one-of>
  </rule>
  <rule id="hour_pm" type="time" example="at 5 pm">
    <item include="false">at</item>
    <ruleref uri="#hour"><tag>timex["hour"] = Sum(value, 12)</tag></ruleref>
    <item>pm</item>
  </rule>
  <rule id="helper" scope="private" type="time" example="noon">
    <item>noon</item>
  </rule>
  <negative_rule id="tomorrow_never_dies" type="date" example="tomorrow never dies">
    <item>tomorrow never dies</item>
  </negative_rule>
</grammar>
"##;

    fn grammar() -> CompiledGrammar {
        CompiledGrammar::from_xml(GRAMMAR, TimexOptions::empty()).unwrap()
    }

    #[test]
    fn test_load_collects_resources_and_hints() {
        let grammar = grammar();
        assert_eq!(grammar.rules().len(), 5);
        assert_eq!(grammar.negative_rules().len(), 1);
        assert_eq!(grammar.fragment("hour").map(|f| f.scope()), Some(ResourceScope::Private));
        assert_eq!(grammar.normalization_table("#weekdays").map(|t| t.len()), Some(3));
        assert_eq!(grammar.hints().am_pm_inference_cutoff, Some(7));
        assert_eq!(grammar.hints().weekday_logic, Some(timex_protocol::WeekdayLogic::SimpleOffset));
        assert!(grammar.rule("tomorrow_never_dies").is_some());
        assert!(grammar.options().is_empty());
    }

    #[test]
    fn test_round_trip_examples() {
        let grammar = grammar();
        for rule in grammar.rules().iter().chain(grammar.negative_rules()) {
            assert!(rule.compiled_expression().is_match(rule.example()), "{}", rule.id());
            assert!(rule.compiled_exact_expression().is_match(rule.example()), "{}", rule.id());
        }
    }

    #[test]
    fn test_see_you_tomorrow() {
        let matches = grammar().match_all("see you tomorrow").unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].value, "tomorrow");
        assert_eq!(matches[0].index, 8);
        assert_eq!(matches[0].timex_dictionary.get("offset_days").map(String::as_str), Some("1"));
    }

    #[test]
    fn test_match_exact_picks_first_public_rule() {
        let grammar = grammar();
        let found = grammar.match_exact("next Mon").unwrap().unwrap();
        assert_eq!(found.rule_id, "weekday");
        assert_eq!(found.timex_dictionary.get("weekday").map(String::as_str), Some("monday"));
        assert_eq!(found.timex_dictionary.get("offset_weeks").map(String::as_str), Some("1"));

        // private rules are never exposed
        assert!(grammar.match_exact("noon").unwrap().is_none());
        assert!(grammar.match_exact_typed("next mon", TemporalType::TIME).unwrap().is_none());
    }

    #[test]
    fn test_extract_resolves_overlaps() {
        let grammar = grammar();
        let text = "the day after tomorrow at 5 pm";

        let all = grammar.match_all(text).unwrap();
        assert_eq!(all.len(), 3);

        let found = grammar.extract(text, TemporalType::all()).unwrap();
        let summary: Vec<_> = found.iter().map(|m| (m.rule_id.as_str(), m.value.as_str(), m.index)).collect();
        assert_eq!(summary, [("day_after_tomorrow", "day after tomorrow", 4), ("hour_pm", "5 pm", 26)]);
        assert_eq!(found[1].timex_dictionary.get("hour").map(String::as_str), Some("17"));

        let dates = grammar.extract(text, TemporalType::DATE).unwrap();
        assert_eq!(dates.len(), 1);
    }

    #[test]
    fn test_disambiguation_prefers_longer_then_richer() {
        let found = |index: usize, value: &str, facts: usize| RuleMatch {
            value: value.to_string(),
            index,
            timex_dictionary: (0..facts).map(|i| (i.to_string(), String::new())).collect(),
            rule_id: format!("{}-{}", value, facts),
            rule_type: TemporalType::DATE,
        };

        let kept = disambiguate(vec![
            found(0, "next", 0),
            found(0, "next week", 0),
            found(0, "next week", 2),
            found(5, "week", 1),
            found(10, "monday", 0),
        ]);
        let ids: Vec<_> = kept.iter().map(|m| m.rule_id.as_str()).collect();
        assert_eq!(ids, ["next week-2", "monday-0"]);
    }

    #[test]
    fn test_negative_rules_suppress_enclosed_matches() {
        let grammar = grammar();
        assert!(grammar.extract("tomorrow never dies", TemporalType::all()).unwrap().is_empty());
        assert_eq!(grammar.extract("tomorrow, never mind", TemporalType::all()).unwrap().len(), 1);
        // overlapping matches are still reported by match_all
        assert_eq!(grammar.match_all("tomorrow never dies").unwrap().len(), 1);
    }

    #[test]
    fn test_errors_are_collected() {
        let xml = r##"
<grammar>
  <regex id="hour" expression="[0-9]"/>
  <regex id="hour" expression="[0-9]{2}"/>
  <regex id="no_expression"/>
  <normalization_rule id="dup"><item>a</item><item>A</item></normalization_rule>
  <rule id="bad_example" type="date" example="later"><item>now</item></rule>
  <rule id="ok" type="date" example="now"><item>now</item></rule>
  <negative_rule id="ok" type="date" example="now"><item>now</item></negative_rule>
  <rule id="bad_ref" type="time" example="1"><ruleref uri="#minute"/></rule>
</grammar>"##;

        let errors = CompiledGrammar::from_xml(xml, TimexOptions::empty()).unwrap_err();
        assert_eq!(errors.len(), 6, "{:?}", errors);
        assert!(errors.iter().any(|e| matches!(e, GrammarError::DuplicateId { kind: "regex", .. })));
        assert!(errors.iter().any(|e| matches!(e, GrammarError::DuplicateId { kind: "rule", .. })));
        assert!(errors.iter().any(|e| matches!(e, GrammarError::Resource(_))));
        assert!(errors.iter().any(|e| matches!(e, GrammarError::ExampleMismatch { .. })));
        assert!(errors.iter().any(|e| matches!(e, GrammarError::UnknownFragmentReference { .. })));
    }

    #[test]
    fn test_case_sensitive_option() {
        let grammar = CompiledGrammar::from_xml(GRAMMAR, TimexOptions::CASE_SENSITIVE).unwrap();
        assert!(grammar.match_exact("Tomorrow").unwrap().is_none());
        assert!(grammar.match_exact("tomorrow").unwrap().is_some());
        assert!(grammar.normalization_table("weekdays").unwrap().is_case_sensitive());
    }

    #[test]
    fn test_grammar_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CompiledGrammar>();

        let grammar = grammar();
        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    let found = grammar.extract("see you tomorrow at 5 pm", TemporalType::all()).unwrap();
                    assert_eq!(found.len(), 2);
                });
            }
        });
    }
}
