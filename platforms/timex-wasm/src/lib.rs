use std::collections::BTreeMap;

use serde::Serialize;
use timex_grammar::{CompiledGrammar, GrammarError, RuleMatch, TemporalType, TimexOptions};
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
pub fn init_panic_hook() {
    console_error_panic_hook::set_once();
}

/// The structured match sent back to JavaScript
#[derive(Debug, Serialize, PartialEq)]
pub struct MatchDebug {
    pub value: String,
    pub index: usize,
    pub rule_id: String,
    pub rule_type: String,
    pub timex: BTreeMap<String, String>,
}

impl From<RuleMatch> for MatchDebug {
    fn from(found: RuleMatch) -> Self {
        Self {
            rule_type: found.rule_type.name().to_string(),
            value: found.value,
            index: found.index,
            rule_id: found.rule_id,
            timex: found.timex_dictionary,
        }
    }
}

fn load_error_message(errors: &[GrammarError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

fn parse_types(types: Option<String>) -> Result<TemporalType, String> {
    match types {
        None => Ok(TemporalType::all()),
        Some(list) => TemporalType::from_list(&list).ok_or_else(|| format!("unknown temporal type in '{}'", list)),
    }
}

/// The Engine Instance running in the Browser
#[wasm_bindgen]
pub struct TimexEngine {
    grammar: CompiledGrammar,
}

impl TimexEngine {
    fn load(grammar_xml: &str, case_sensitive: bool) -> Result<Self, String> {
        let options = if case_sensitive {
            TimexOptions::CASE_SENSITIVE
        } else {
            TimexOptions::empty()
        };
        CompiledGrammar::from_xml(grammar_xml, options)
            .map(|grammar| Self { grammar })
            .map_err(|errors| load_error_message(&errors))
    }

    fn extract_matches(&self, text: &str, types: Option<String>) -> Result<Vec<MatchDebug>, String> {
        let types = parse_types(types)?;
        let matches = self.grammar.extract(text, types).map_err(|err| err.to_string())?;
        Ok(matches.into_iter().map(MatchDebug::from).collect())
    }

    fn exact_match(&self, text: &str) -> Result<Option<MatchDebug>, String> {
        let found = self.grammar.match_exact(text).map_err(|err| err.to_string())?;
        Ok(found.map(MatchDebug::from))
    }
}

#[wasm_bindgen]
impl TimexEngine {
    /// Compiles the grammar once; load errors are returned as one message.
    #[wasm_bindgen(constructor)]
    pub fn new(grammar_xml: &str, case_sensitive: Option<bool>) -> Result<TimexEngine, JsValue> {
        Self::load(grammar_xml, case_sensitive.unwrap_or(false)).map_err(|message| JsValue::from_str(&message))
    }

    /// Text -> disambiguated matches of the requested types (default: all)
    pub fn extract(&self, text: &str, types: Option<String>) -> Result<JsValue, JsValue> {
        let matches = self.extract_matches(text, types).map_err(|message| JsValue::from_str(&message))?;
        serde_wasm_bindgen::to_value(&matches).map_err(JsValue::from)
    }

    /// The whole text against each public rule; `undefined` when none matches.
    pub fn match_exact(&self, text: &str) -> Result<JsValue, JsValue> {
        let found = self.exact_match(text).map_err(|message| JsValue::from_str(&message))?;
        serde_wasm_bindgen::to_value(&found).map_err(JsValue::from)
    }

    pub fn rule_count(&self) -> usize {
        self.grammar.rules().len()
    }
}
