use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

pub const DEFAULT_CONFIG_PATH: &str = "mapcheck.json";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RulesConfig {
    /// Directory scanned for `*.rhai` rule scripts.
    #[serde(default = "RulesConfig::default_scripts_dir")]
    pub scripts_dir: PathBuf,
    /// Display names of rules that should not be offered.
    #[serde(default)]
    pub disabled: Vec<String>,
}

/// Resource limits applied to every script rule's engine.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScriptLimits {
    #[serde(default = "ScriptLimits::default_max_operations")]
    pub max_operations: u64,
    #[serde(default = "ScriptLimits::default_max_call_levels")]
    pub max_call_levels: usize,
    #[serde(default = "ScriptLimits::default_max_expr_depth")]
    pub max_expr_depth: usize,
    #[serde(default = "ScriptLimits::default_max_string_size")]
    pub max_string_size: usize,
    #[serde(default = "ScriptLimits::default_max_array_size")]
    pub max_array_size: usize,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
pub struct CheckConfig {
    #[serde(default)]
    pub rules: RulesConfig,
    #[serde(default)]
    pub scripts: ScriptLimits,
}

#[derive(Debug, Clone, Default)]
pub struct CheckConfigOverrides {
    pub scripts_dir: Option<PathBuf>,
    pub max_operations: Option<u64>,
}

impl RulesConfig {
    fn default_scripts_dir() -> PathBuf {
        PathBuf::from("rules")
    }
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self { scripts_dir: Self::default_scripts_dir(), disabled: Vec::new() }
    }
}

impl ScriptLimits {
    const fn default_max_operations() -> u64 {
        50_000_000
    }

    const fn default_max_call_levels() -> usize {
        64
    }

    const fn default_max_expr_depth() -> usize {
        64
    }

    const fn default_max_string_size() -> usize {
        10_000
    }

    const fn default_max_array_size() -> usize {
        1_000_000
    }
}

impl Default for ScriptLimits {
    fn default() -> Self {
        Self {
            max_operations: Self::default_max_operations(),
            max_call_levels: Self::default_max_call_levels(),
            max_expr_depth: Self::default_max_expr_depth(),
            max_string_size: Self::default_max_string_size(),
            max_array_size: Self::default_max_array_size(),
        }
    }
}

impl CheckConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes =
            fs::read(path).with_context(|| format!("Failed to read config file {}", path.display()))?;
        let cfg = serde_json::from_slice(&bytes)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(cfg)
    }

    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            return Self::default();
        }
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(err) => {
                warn!("Config load error: {err:#}. Falling back to defaults.");
                Self::default()
            }
        }
    }

    pub fn apply_overrides(&mut self, overrides: &CheckConfigOverrides) {
        if let Some(dir) = &overrides.scripts_dir {
            self.rules.scripts_dir = dir.clone();
        }
        if let Some(max_operations) = overrides.max_operations {
            self.scripts.max_operations = max_operations;
        }
    }
}

impl CheckConfigOverrides {
    pub fn is_empty(&self) -> bool {
        self.scripts_dir.is_none() && self.max_operations.is_none()
    }

    pub fn applied_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.scripts_dir.is_some() {
            fields.push("scripts_dir");
        }
        if self.max_operations.is_some() {
            fields.push("max_operations");
        }
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn missing_sections_use_defaults() {
        let cfg: CheckConfig = serde_json::from_str(r#"{ "rules": { "disabled": ["Hidden Notes"] } }"#)
            .expect("parse config");
        assert_eq!(cfg.rules.scripts_dir, PathBuf::from("rules"));
        assert_eq!(cfg.rules.disabled, vec!["Hidden Notes".to_string()]);
        assert_eq!(cfg.scripts, ScriptLimits::default());
    }

    #[test]
    fn overrides_replace_loaded_values() {
        let mut file = NamedTempFile::new().expect("temp config");
        write!(file, r#"{{ "scripts": {{ "max_operations": 10 }} }}"#).expect("write config");
        let mut cfg = CheckConfig::load(file.path()).expect("load config");
        assert_eq!(cfg.scripts.max_operations, 10);
        assert_eq!(cfg.scripts.max_call_levels, 64);

        let overrides = CheckConfigOverrides { scripts_dir: Some("custom".into()), max_operations: Some(99) };
        assert_eq!(overrides.applied_fields(), vec!["scripts_dir", "max_operations"]);
        cfg.apply_overrides(&overrides);
        assert_eq!(cfg.rules.scripts_dir, PathBuf::from("custom"));
        assert_eq!(cfg.scripts.max_operations, 99);
    }

    #[test]
    fn broken_config_falls_back_to_defaults() {
        let mut file = NamedTempFile::new().expect("temp config");
        write!(file, "not json").expect("write config");
        assert!(CheckConfig::load(file.path()).is_err());
        assert_eq!(CheckConfig::load_or_default(file.path()), CheckConfig::default());
        assert!(CheckConfigOverrides::default().is_empty());
    }
}
