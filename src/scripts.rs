//! Rules written as Rhai scripts.
//!
//! A rule script defines `fn check(notes, events, obstacles, custom_events, bpm_changes, params)`
//! and may define `fn name()` and `fn params()`. `check` returns
//! `#{ errors: [..], warnings: [..] }` where every entry carries the `id` (or `ids`) of the
//! objects it flags and an optional `reason`. Object maps passed in carry their `id`, so a
//! script may push them back unchanged.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{anyhow, bail, Context, Result};
use rhai::serde::{from_dynamic, to_dynamic};
use rhai::{Array, Dynamic, Engine, ImmutableString, Scope, AST, INT};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::ScriptLimits;
use crate::error::RuleExecutionError;
use crate::objects::{ObjectId, TimedObject};
use crate::params::{ParamValue, ParamValues, Parameter};
use crate::result::{PendingResult, Severity};
use crate::rules::Rule;
use crate::snapshot::LevelSnapshot;

pub const SCRIPT_EXTENSION: &str = "rhai";
pub const SCRIPT_LOG_TARGET: &str = "mapcheck::script";

const CHECK_FN: &str = "check";
const CHECK_ARITY: usize = 6;
const NAME_FN: &str = "name";
const PARAMS_FN: &str = "params";

/// Adapter that runs a compiled rule script behind the [`Rule`] contract. Nothing of
/// Rhai's value model leaks out: inputs are marshalled into arrays of maps and the
/// returned map is converted back into a [`PendingResult`].
pub struct ScriptRule {
    engine: Engine,
    ast: AST,
    path: PathBuf,
    name: String,
    parameters: Vec<Parameter>,
    limits: ScriptLimits,
    last_modified: Option<SystemTime>,
}

impl ScriptRule {
    pub fn load(path: impl AsRef<Path>, limits: &ScriptLimits) -> Result<Self> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).with_context(|| format!("Reading {}", path.display()))?;
        let mut rule = Self::from_source(path, &source, limits)?;
        rule.last_modified = fs::metadata(path).ok().and_then(|meta| meta.modified().ok());
        Ok(rule)
    }

    /// Compile `source` as if it had been read from `path`. The file stem of `path` is the
    /// display name unless the script defines `fn name()`.
    pub fn from_source(path: impl Into<PathBuf>, source: &str, limits: &ScriptLimits) -> Result<Self> {
        let path = path.into();
        let label = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("script rule")
            .to_string();
        let engine = build_engine(&label, limits);
        let ast = engine.compile(source).with_context(|| format!("Compiling {}", path.display()))?;
        ensure_check_fn(&ast)?;

        let name = match has_function(&ast, NAME_FN, 0) {
            true => call_describe::<ImmutableString>(&engine, &ast, NAME_FN)?.to_string(),
            false => label,
        };
        let parameters = match has_function(&ast, PARAMS_FN, 0) {
            true => {
                let specs = call_describe::<Array>(&engine, &ast, PARAMS_FN)?;
                let specs: Vec<ScriptParamSpec> = from_dynamic(&Dynamic::from_array(specs))
                    .map_err(|err| anyhow!("`{PARAMS_FN}()` returned an invalid declaration: {err}"))?;
                specs.into_iter().map(ScriptParamSpec::into_parameter).collect::<Result<Vec<_>>>()?
            }
            false => Vec::new(),
        };

        Ok(Self { engine, ast, path, name, parameters, limits: limits.clone(), last_modified: None })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A freshly compiled copy when the file changed since it was loaded, `None` otherwise.
    /// The current rule is left untouched so the caller decides whether to swap it in.
    pub fn reload_if_modified(&self) -> Result<Option<Self>> {
        let modified = fs::metadata(&self.path)
            .and_then(|meta| meta.modified())
            .with_context(|| format!("Script file not accessible: {}", self.path.display()))?;
        if self.last_modified.map_or(false, |previous| modified <= previous) {
            return Ok(None);
        }
        Self::load(&self.path, &self.limits).map(Some)
    }

    fn run_check(&self, snapshot: &LevelSnapshot, params: &ParamValues) -> Result<PendingResult> {
        let args = (
            marshal(snapshot.notes())?,
            marshal(snapshot.lighting_events())?,
            marshal(snapshot.obstacles())?,
            marshal(snapshot.custom_events())?,
            marshal(snapshot.tempo_changes())?,
            params.iter().map(param_to_dynamic).collect::<Array>(),
        );
        let value = self
            .engine
            .call_fn::<Dynamic>(&mut Scope::new(), &self.ast, CHECK_FN, args)
            .map_err(|err| anyhow!("{err}"))?;
        if !value.is_map() {
            bail!("`{CHECK_FN}` must return a map with `errors` and `warnings`, got {}", value.type_name());
        }
        let report: ScriptReport =
            from_dynamic(&value).map_err(|err| anyhow!("malformed `{CHECK_FN}` result: {err}"))?;

        let index = snapshot.index();
        let mut result = PendingResult::new();
        for (severity, findings) in [(Severity::Error, report.errors), (Severity::Warning, report.warnings)] {
            for finding in findings {
                let (objects, reason) = finding.resolve(&index)?;
                let reason = reason.unwrap_or_else(|| format!("Flagged by {}", self.name));
                result.push(severity, objects, reason);
            }
        }
        Ok(result)
    }
}

impl Rule for ScriptRule {
    fn name(&self) -> &str {
        &self.name
    }

    fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    fn perform_check(&self, snapshot: &LevelSnapshot, params: &ParamValues) -> Result<PendingResult> {
        self.run_check(snapshot, params)
            .map_err(|err| anyhow::Error::new(RuleExecutionError::new(&self.name, format!("{err:#}"))))
    }
}

/// Rule scripts directly inside `dir`, sorted by path. A missing directory has none.
pub fn discover_scripts(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut scripts = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("Reading '{}'", dir.display()))? {
        let path = entry?.path();
        if path.is_file() && path.extension().and_then(|ext| ext.to_str()) == Some(SCRIPT_EXTENSION) {
            scripts.push(path);
        }
    }
    scripts.sort();
    Ok(scripts)
}

fn build_engine(label: &str, limits: &ScriptLimits) -> Engine {
    let mut engine = Engine::new();
    engine.set_fast_operators(true);
    engine.set_max_operations(limits.max_operations);
    engine.set_max_call_levels(limits.max_call_levels);
    engine.set_max_expr_depths(limits.max_expr_depth, limits.max_expr_depth);
    engine.set_max_string_size(limits.max_string_size);
    engine.set_max_array_size(limits.max_array_size);

    let print_label = label.to_string();
    engine.on_print(move |text| info!(target: SCRIPT_LOG_TARGET, rule = %print_label, "{text}"));
    let log_label = label.to_string();
    engine.register_fn("log", move |message: &str| {
        info!(target: SCRIPT_LOG_TARGET, rule = %log_label, "{message}");
    });
    engine
}

fn has_function(ast: &AST, name: &str, arity: usize) -> bool {
    ast.iter_functions().any(|func| func.name == name && func.params.len() == arity)
}

fn ensure_check_fn(ast: &AST) -> Result<()> {
    if has_function(ast, CHECK_FN, CHECK_ARITY) {
        return Ok(());
    }
    if ast.iter_functions().any(|func| func.name == CHECK_FN) {
        bail!(
            "`fn {CHECK_FN}` must take {CHECK_ARITY} parameters \
             (notes, events, obstacles, custom_events, bpm_changes, params)"
        );
    }
    bail!("script does not define `fn {CHECK_FN}(...)`")
}

fn call_describe<T: Clone + 'static>(engine: &Engine, ast: &AST, name: &str) -> Result<T> {
    let value = engine
        .call_fn::<Dynamic>(&mut Scope::new(), ast, name, ())
        .map_err(|err| anyhow!("calling `{name}()`: {err}"))?;
    let type_name = value.type_name();
    value.try_cast::<T>().ok_or_else(|| anyhow!("`{name}()` returned an unexpected {type_name}"))
}

fn marshal<T: Serialize>(items: &[T]) -> Result<Array> {
    items
        .iter()
        .map(|item| to_dynamic(item).map_err(|err| anyhow!("marshalling level data: {err}")))
        .collect()
}

fn param_to_dynamic(value: &ParamValue) -> Dynamic {
    match value {
        ParamValue::Number(value) => Dynamic::from(*value),
        ParamValue::Text(value) => Dynamic::from(value.clone()),
        ParamValue::Bool(value) => Dynamic::from(*value),
        ParamValue::Choice(index) => Dynamic::from(*index as INT),
        ParamValue::Null => Dynamic::UNIT,
    }
}

#[derive(Debug, Default, Deserialize)]
struct ScriptReport {
    #[serde(default)]
    errors: Vec<ScriptFinding>,
    #[serde(default)]
    warnings: Vec<ScriptFinding>,
}

#[derive(Debug, Deserialize)]
struct ScriptFinding {
    #[serde(default)]
    id: Option<u64>,
    #[serde(default)]
    ids: Vec<u64>,
    #[serde(default)]
    reason: Option<String>,
}

impl ScriptFinding {
    fn resolve(self, index: &HashMap<ObjectId, TimedObject>) -> Result<(Vec<TimedObject>, Option<String>)> {
        let ids: Vec<u64> = self.id.into_iter().chain(self.ids).collect();
        if ids.is_empty() {
            bail!("finding without `id` or `ids`");
        }
        let objects = ids
            .into_iter()
            .map(|id| index.get(&ObjectId(id)).cloned().ok_or_else(|| anyhow!("unknown object id {id}")))
            .collect::<Result<Vec<_>>>()?;
        Ok((objects, self.reason))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
enum ScriptParamKind {
    #[default]
    Number,
    Text,
    Bool,
    Choice,
}

#[derive(Debug, Deserialize)]
struct ScriptParamSpec {
    name: String,
    #[serde(default)]
    kind: ScriptParamKind,
    #[serde(default)]
    default: Option<serde_json::Value>,
    #[serde(default)]
    options: Vec<String>,
}

impl ScriptParamSpec {
    fn into_parameter(self) -> Result<Parameter> {
        use serde_json::Value;

        let name = self.name;
        let parameter = match self.kind {
            ScriptParamKind::Number => match self.default {
                None => Parameter::number(name, 0.0),
                Some(Value::Number(value)) => Parameter::number(name, value.as_f64().unwrap_or_default()),
                Some(other) => bail!("parameter '{name}': default {other} is not a number"),
            },
            ScriptParamKind::Text => match self.default {
                None | Some(Value::Null) => Parameter::text(name, ""),
                Some(Value::String(value)) => Parameter::text(name, value),
                Some(other) => Parameter::text(name, other.to_string()),
            },
            ScriptParamKind::Bool => match self.default {
                None => Parameter::flag(name, false),
                Some(Value::Bool(value)) => Parameter::flag(name, value),
                Some(other) => bail!("parameter '{name}': default {other} is not a boolean"),
            },
            ScriptParamKind::Choice => {
                if self.options.is_empty() {
                    bail!("choice parameter '{name}' declares no options");
                }
                let default = match self.default {
                    None => 0,
                    Some(Value::Number(value)) => value
                        .as_u64()
                        .map(|index| index as usize)
                        .filter(|index| *index < self.options.len())
                        .ok_or_else(|| anyhow!("parameter '{name}': default {value} is not an option index"))?,
                    Some(other) => bail!("parameter '{name}': default {other} is not an option index"),
                };
                Parameter::choice(name, self.options, default)
            }
        };
        Ok(parameter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ParamKind;

    fn compile(source: &str) -> Result<ScriptRule> {
        ScriptRule::from_source("inline_rule.rhai", source, &ScriptLimits::default())
    }

    #[test]
    fn name_defaults_to_file_stem() {
        let rule = compile("fn check(a, b, c, d, e, p) { #{} }").expect("compile");
        assert_eq!(rule.name(), "inline_rule");
        assert!(rule.parameters().is_empty());
    }

    #[test]
    fn declared_parameters_are_typed() {
        let rule = compile(
            r#"
            fn name() { "Declared" }
            fn params() {
                [
                    #{ name: "Gap", kind: "number", default: 0.25 },
                    #{ name: "Label", kind: "text" },
                    #{ name: "Strict", kind: "bool", default: true },
                    #{ name: "Mode", kind: "choice", options: ["a", "b"], default: 1 },
                ]
            }
            fn check(a, b, c, d, e, p) { #{} }
            "#,
        )
        .expect("compile");
        assert_eq!(rule.name(), "Declared");
        let params = rule.parameters();
        assert_eq!(params.len(), 4);
        assert_eq!(params[0].kind(), &ParamKind::Number);
        assert_eq!(params[0].default_text(), "0.25");
        assert_eq!(params[1].default_text(), "");
        assert_eq!(params[2].default_text(), "true");
        assert_eq!(params[3].kind(), &ParamKind::Choice(vec!["a".into(), "b".into()]));
        assert_eq!(params[3].default_text(), "1");
    }

    #[test]
    fn missing_or_wrong_check_is_rejected() {
        let err = compile("fn name() { \"x\" }").err().expect("missing check");
        assert!(err.to_string().contains("does not define"));
        let err = compile("fn check(notes) { #{} }").err().expect("wrong arity");
        assert!(err.to_string().contains("must take 6 parameters"));
    }

    #[test]
    fn name_must_be_a_string() {
        let err = compile("fn name() { 42 } fn check(a, b, c, d, e, p) { #{} }").err().expect("numeric name");
        assert!(err.to_string().contains("`name()` returned an unexpected"), "got {err}");
    }

    #[test]
    fn invalid_choice_declaration_is_rejected() {
        let err = compile(
            r#"
            fn params() { [ #{ name: "Mode", kind: "choice", options: [] } ] }
            fn check(a, b, c, d, e, p) { #{} }
            "#,
        )
        .err()
        .expect("empty options");
        assert!(err.to_string().contains("declares no options"));
    }

    #[test]
    fn discovery_skips_missing_directories() {
        let scripts = discover_scripts(Path::new("definitely/not/here")).expect("discover");
        assert!(scripts.is_empty());
    }
}
