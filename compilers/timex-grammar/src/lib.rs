//! Grammar compiler and matcher for temporal expressions.
//!
//! A grammar document declares regex fragments, normalization tables and
//! rules. Each rule compiles to a regex with `PartN` capture groups; tag
//! scripts attached to those groups turn a match into a
//! [`TimexDictionary`](timex_protocol::TimexDictionary).

pub mod error;
pub mod grammar;
pub mod matcher;
pub mod restriction;
pub mod rule;
pub mod source;

pub use error::{GrammarError, MatchError};
pub use grammar::{load_grammar, CompiledGrammar};
pub use matcher::{MatchContext, RuleMatch};
pub use rule::{Fragments, RuleResource};
pub use source::parse_document;

pub use timex_protocol::{GrammarHints, TemporalType, TimexDictionary, TimexOptions};
