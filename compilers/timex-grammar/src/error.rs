use thiserror::Error;
use timex_resources::ResourceError;
use timex_script::ScriptError;

/// Load-time failures. A grammar collects these per element instead of
/// stopping at the first one.
#[derive(Debug, Error)]
pub enum GrammarError {
    #[error(transparent)]
    Resource(#[from] ResourceError),

    #[error(transparent)]
    Script(#[from] ScriptError),

    #[error("rule '{rule_id}': <{element}> is missing required attribute '{attribute}'")]
    MissingAttribute {
        rule_id: String,
        element: String,
        attribute: &'static str,
    },

    #[error("rule '{rule_id}': unknown temporal type '{value}'")]
    UnknownRuleType { rule_id: String, value: String },

    #[error("rule '{rule_id}': reference to undefined regex '{reference}'")]
    UnknownFragmentReference { rule_id: String, reference: String },

    #[error("rule '{rule_id}': invalid repeat range '{value}'")]
    InvalidRepeat { rule_id: String, value: String },

    #[error("rule '{rule_id}': invalid include flag '{value}'")]
    InvalidInclude { rule_id: String, value: String },

    #[error("rule '{rule_id}': a node carries more than one <tag>")]
    DuplicateTag { rule_id: String },

    #[error("rule '{rule_id}' has no grammar content")]
    EmptyRule { rule_id: String },

    #[error("rule '{rule_id}': <one-of> has no alternatives")]
    EmptyAlternation { rule_id: String },

    #[error("rule '{rule_id}': compiled expression is not a valid regex: {source}")]
    InvalidExpression {
        rule_id: String,
        #[source]
        source: regex::Error,
    },

    #[error("rule '{rule_id}': example {example:?} does not match the {pattern} pattern")]
    ExampleMismatch {
        rule_id: String,
        example: String,
        pattern: &'static str,
    },

    #[error("duplicate {kind} id '{id}'")]
    DuplicateId { kind: &'static str, id: String },

    #[error("grammar document is not well-formed XML: {0}")]
    Xml(#[from] roxmltree::Error),
}

/// Query-time failures, scoped to a single match call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatchError {
    #[error("rule '{rule_id}': no compiled tag script registered for group {group}")]
    MissingTagScript { rule_id: String, group: String },

    #[error("rule '{rule_id}': tag script for group {group} failed: {source}")]
    Script {
        rule_id: String,
        group: String,
        #[source]
        source: ScriptError,
    },
}
