use crate::config::{RulesConfig, ScriptLimits};
use crate::params::{ParamValues, Parameter};
use crate::result::PendingResult;
use crate::scripts::{discover_scripts, ScriptRule};
use crate::snapshot::LevelSnapshot;
use anyhow::{bail, Result};
use std::path::Path;
use tracing::{info, warn};

pub mod hidden_notes;
pub mod stacked_notes;

pub use hidden_notes::HiddenNotes;
pub use stacked_notes::StackedNotes;

/// Contract shared by built-in rules and script rules.
///
/// A rule is stateless across invocations: it reads the snapshot and its parsed
/// parameters and returns raw findings. The session commits the output, so rules do not
/// need to sort or deduplicate anything.
pub trait Rule {
    /// Display name, also used for lookup.
    fn name(&self) -> &str;

    /// Ordered parameter declarations; callers supply values in the same order.
    fn parameters(&self) -> &[Parameter] {
        &[]
    }

    fn perform_check(&self, snapshot: &LevelSnapshot, params: &ParamValues) -> Result<PendingResult>;
}

pub struct RuleSummary<'a> {
    pub name: &'a str,
    pub parameters: &'a [Parameter],
    pub script: Option<&'a Path>,
}

enum RuleSlot {
    BuiltIn(Box<dyn Rule>),
    Script(ScriptRule),
}

impl RuleSlot {
    fn rule(&self) -> &dyn Rule {
        match self {
            RuleSlot::BuiltIn(rule) => rule.as_ref(),
            RuleSlot::Script(rule) => rule,
        }
    }

    fn script_path(&self) -> Option<&Path> {
        match self {
            RuleSlot::BuiltIn(_) => None,
            RuleSlot::Script(rule) => Some(rule.path()),
        }
    }
}

/// Rules available to the session, in registration order.
#[derive(Default)]
pub struct RuleRegistry {
    slots: Vec<RuleSlot>,
    disabled: Vec<String>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtin_rules() -> Self {
        let mut registry = Self::new();
        registry.register_builtins();
        registry
    }

    /// Built-ins plus every script under the configured directory, minus disabled rules.
    pub fn from_config(rules: &RulesConfig, limits: &ScriptLimits) -> Self {
        let mut registry = Self::new();
        registry.disabled = rules.disabled.iter().map(|name| name.to_lowercase()).collect();
        registry.register_builtins();
        if let Err(err) = registry.load_scripts(&rules.scripts_dir, limits) {
            warn!(dir = %rules.scripts_dir.display(), "failed to load script rules: {err:#}");
        }
        registry
    }

    fn register_builtins(&mut self) {
        for rule in [Box::new(HiddenNotes::new()) as Box<dyn Rule>, Box::new(StackedNotes::new())] {
            if let Err(err) = self.register(rule) {
                warn!("{err:#}");
            }
        }
    }

    pub fn register(&mut self, rule: Box<dyn Rule>) -> Result<()> {
        self.insert(RuleSlot::BuiltIn(rule))
    }

    pub fn register_script(&mut self, rule: ScriptRule) -> Result<()> {
        self.insert(RuleSlot::Script(rule))
    }

    /// Load every script in `dir`. Scripts that fail to compile are logged and skipped.
    /// Returns the names of the rules that were added.
    pub fn load_scripts(&mut self, dir: &Path, limits: &ScriptLimits) -> Result<Vec<String>> {
        let mut loaded = Vec::new();
        for path in discover_scripts(dir)? {
            let rule = match ScriptRule::load(&path, limits) {
                Ok(rule) => rule,
                Err(err) => {
                    warn!(script = %path.display(), "skipping script rule: {err:#}");
                    continue;
                }
            };
            let name = rule.name().to_string();
            match self.register_script(rule) {
                Ok(()) => {
                    info!(rule = %name, script = %path.display(), "loaded script rule");
                    loaded.push(name);
                }
                Err(err) => warn!(script = %path.display(), "{err:#}"),
            }
        }
        Ok(loaded)
    }

    /// Recompile script rules whose files changed. Returns how many were reloaded.
    ///
    /// A reload that renames the rule goes through the same checks as registration: a name
    /// taken by another rule keeps the previous version, a disabled name drops the rule.
    pub fn refresh_scripts(&mut self) -> usize {
        let mut reloaded = 0;
        let mut index = 0;
        while index < self.slots.len() {
            let RuleSlot::Script(rule) = &self.slots[index] else {
                index += 1;
                continue;
            };
            let fresh = match rule.reload_if_modified() {
                Ok(Some(fresh)) => fresh,
                Ok(None) => {
                    index += 1;
                    continue;
                }
                Err(err) => {
                    warn!(script = %rule.path().display(), "keeping previous version: {err:#}");
                    index += 1;
                    continue;
                }
            };
            let name = fresh.name().to_string();
            if self.is_disabled(&name) {
                info!(rule = %name, script = %fresh.path().display(), "reloaded rule is disabled by configuration");
                self.slots.remove(index);
                continue;
            }
            if self.name_taken(&name, Some(index)) {
                warn!(
                    script = %fresh.path().display(),
                    "keeping previous version: a rule named '{name}' is already registered"
                );
                index += 1;
                continue;
            }
            info!(rule = %name, script = %fresh.path().display(), "reloaded script rule");
            self.slots[index] = RuleSlot::Script(fresh);
            reloaded += 1;
            index += 1;
        }
        reloaded
    }

    /// Case-insensitive lookup by display name.
    pub fn get(&self, name: &str) -> Option<&dyn Rule> {
        self.slots.iter().map(RuleSlot::rule).find(|rule| rule.name().eq_ignore_ascii_case(name))
    }

    pub fn rules(&self) -> impl Iterator<Item = &dyn Rule> {
        self.slots.iter().map(RuleSlot::rule)
    }

    pub fn summaries(&self) -> Vec<RuleSummary<'_>> {
        self.slots
            .iter()
            .map(|slot| RuleSummary {
                name: slot.rule().name(),
                parameters: slot.rule().parameters(),
                script: slot.script_path(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn insert(&mut self, slot: RuleSlot) -> Result<()> {
        let name = slot.rule().name();
        if self.is_disabled(name) {
            info!(rule = %name, "rule disabled by configuration");
            return Ok(());
        }
        if self.name_taken(name, None) {
            bail!("a rule named '{name}' is already registered");
        }
        self.slots.push(slot);
        Ok(())
    }

    fn is_disabled(&self, name: &str) -> bool {
        self.disabled.iter().any(|disabled| disabled.eq_ignore_ascii_case(name))
    }

    /// Whether a slot other than `except` already uses `name`.
    fn name_taken(&self, name: &str, except: Option<usize>) -> bool {
        self.slots
            .iter()
            .enumerate()
            .any(|(index, slot)| Some(index) != except && slot.rule().name().eq_ignore_ascii_case(name))
    }
}
