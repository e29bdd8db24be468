use std::collections::HashMap;
use std::sync::Arc;

use timex_protocol::TimexDictionary;
use timex_resources::NormalizationTables;

use crate::ast::Statement;
use crate::compiler::compile_statements;
use crate::error::ScriptError;

/// The compiled script attached to one capture group of one rule.
#[derive(Debug, Clone, PartialEq)]
pub struct TagScript {
    pub rule_id: String,
    pub group: String,
    pub source: String,
    pub statements: Vec<Statement>,
}

impl TagScript {
    pub fn compile(rule_id: &str, group: &str, source: &str) -> Result<Self, ScriptError> {
        Ok(Self {
            rule_id: rule_id.to_string(),
            group: group.to_string(),
            source: source.to_string(),
            statements: compile_statements(source, rule_id)?,
        })
    }

    /// Runs every statement in order. A failing statement leaves the
    /// assignments made before it in place.
    pub fn execute(
        &self,
        tables: &NormalizationTables,
        dict: &mut TimexDictionary,
        raw: &str,
    ) -> Result<(), ScriptError> {
        self.statements
            .iter()
            .try_for_each(|statement| statement.execute(tables, dict, raw))
    }
}

/// Store of tag scripts, keyed by rule id and group name.
pub trait TagActionProvider: Send + Sync {
    /// Compiles and registers a script. Registering the same group twice
    /// replaces the earlier script.
    fn append(&mut self, rule_id: &str, group: &str, source: &str) -> Result<(), ScriptError>;

    fn get(&self, rule_id: &str, group: &str) -> Option<Arc<TagScript>>;
}

#[derive(Debug, Default)]
pub struct ScriptRegistry {
    scripts: HashMap<String, HashMap<String, Arc<TagScript>>>,
}

impl ScriptRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.scripts.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TagActionProvider for ScriptRegistry {
    fn append(&mut self, rule_id: &str, group: &str, source: &str) -> Result<(), ScriptError> {
        let script = TagScript::compile(rule_id, group, source)?;
        self.scripts
            .entry(rule_id.to_string())
            .or_default()
            .insert(group.to_string(), Arc::new(script));
        Ok(())
    }

    fn get(&self, rule_id: &str, group: &str) -> Option<Arc<TagScript>> {
        self.scripts.get(rule_id)?.get(group).cloned()
    }
}
