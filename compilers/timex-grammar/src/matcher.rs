use std::sync::Arc;

use regex::Captures;
use timex_protocol::{TemporalType, TimexDictionary};
use timex_resources::{GrammarResource, NormalizationTables};
use timex_script::{TagActionProvider, TagScript};
use tracing::{debug, trace};

#[cfg(feature = "serde")]
use serde::{Deserialize as SerdeDeserialize, Serialize as SerdeSerialize};

use crate::error::MatchError;
use crate::restriction::{remove_spans, Span};
use crate::rule::RuleResource;

/// One recognized temporal expression.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(SerdeDeserialize, SerdeSerialize))]
pub struct RuleMatch {
    /// Matched text with include-restricted spans removed and trimmed.
    pub value: String,
    /// Byte offset in the input of the first character of `value`.
    pub index: usize,
    pub timex_dictionary: TimexDictionary,
    pub rule_id: String,
    pub rule_type: TemporalType,
}

impl RuleMatch {
    /// End of `value` measured from `index`.
    pub fn end(&self) -> usize {
        self.index + self.value.len()
    }
}

/// What a match needs besides the rule itself.
///
/// A rule resolves its tag scripts from `scripts` on its first match and
/// keeps them, so every context used with one rule must carry the provider
/// the rule was compiled against. Later providers are not consulted.
#[derive(Clone, Copy)]
pub struct MatchContext<'a> {
    pub scripts: &'a dyn TagActionProvider,
    pub tables: &'a NormalizationTables,
}

impl RuleResource {
    /// Matches the whole of `text` against the anchored pattern.
    pub fn match_exact(&self, text: &str, ctx: MatchContext<'_>) -> Result<Option<RuleMatch>, MatchError> {
        match self.compiled_exact_expression().captures(text) {
            Some(captures) => self.build_match(&captures, ctx),
            None => Ok(None),
        }
    }

    /// Every non-overlapping match of the unanchored pattern, left to right.
    pub fn match_all(&self, text: &str, ctx: MatchContext<'_>) -> Result<Vec<RuleMatch>, MatchError> {
        let mut matches = Vec::new();
        for captures in self.compiled_expression().captures_iter(text) {
            matches.extend(self.build_match(&captures, ctx)?);
        }
        Ok(matches)
    }

    /// Resolves every declared tag script from `scripts` on first use.
    /// Concurrent first callers block until one of them has finished.
    fn realize_tag_actions(&self, scripts: &dyn TagActionProvider) -> Result<&[(String, Arc<TagScript>)], MatchError> {
        self.tag_actions
            .get_or_try_init(|| {
                debug!(rule = self.id(), count = self.tag_scripts().len(), "realizing tag actions");
                self.tag_scripts()
                    .iter()
                    .map(|(group, _)| match scripts.get(self.id(), group) {
                        Some(script) => Ok((group.clone(), script)),
                        None => Err(MatchError::MissingTagScript {
                            rule_id: self.id().to_string(),
                            group: group.clone(),
                        }),
                    })
                    .collect()
            })
            .map(Vec::as_slice)
    }

    fn build_match(&self, captures: &Captures<'_>, ctx: MatchContext<'_>) -> Result<Option<RuleMatch>, MatchError> {
        let Some(whole) = captures.get(0) else {
            return Ok(None);
        };

        let mut dict = TimexDictionary::new();
        for (group, script) in self.realize_tag_actions(ctx.scripts)? {
            let Some(raw) = captures.name(group).map(|m| m.as_str()).filter(|raw| !raw.is_empty()) else {
                continue;
            };

            script
                .execute(ctx.tables, &mut dict, raw)
                .map_err(|source| MatchError::Script {
                    rule_id: self.id().to_string(),
                    group: group.clone(),
                    source,
                })?;
        }

        // Walked from the last declared restriction to the first.
        let spans = self
            .include_restrictions()
            .iter()
            .rev()
            .filter_map(|group| captures.name(group))
            .map(|m| Span::new(m.start() - whole.start(), m.len()));
        let removal = remove_spans(whole.as_str(), spans);

        trace!(rule = self.id(), value = %removal.value, "matched");

        Ok(Some(RuleMatch {
            value: removal.value,
            index: whole.start() + removal.offset,
            timex_dictionary: dict,
            rule_id: self.id().to_string(),
            rule_type: self.rule_type(),
        }))
    }
}
