use std::path::Path;
use std::process::ExitCode;

use anyhow::{anyhow, Result};
use clap::Parser;
use serde_json::json;
use tracing::info;
use tracing_subscriber::EnvFilter;

use mapcheck::cli::{Cli, Command};
use mapcheck::config::CheckConfig;
use mapcheck::params::{ParamKind, ParamInput, Parameter};
use mapcheck::{CheckSession, Level, RuleRegistry, Severity};

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("[mapcheck] {err:#}");
            ExitCode::from(1)
        }
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .try_init();
}

fn run(cli: Cli) -> Result<ExitCode> {
    let mut config = CheckConfig::load_or_default(&cli.config);
    let overrides = cli.config_overrides();
    if !overrides.is_empty() {
        info!(fields = ?overrides.applied_fields(), "applying command-line overrides");
        config.apply_overrides(&overrides);
    }
    let registry = RuleRegistry::from_config(&config.rules, &config.scripts);

    match cli.command {
        Command::List => {
            list_rules(&registry);
            Ok(ExitCode::SUCCESS)
        }
        Command::Describe { rule } => {
            describe_rule(&registry, &rule)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Run { level, rule, params, json, fail_on_warn } => {
            run_check(&registry, &level, &rule, &params, json, fail_on_warn)
        }
    }
}

fn list_rules(registry: &RuleRegistry) {
    for summary in registry.summaries() {
        match summary.script {
            Some(path) => println!("{} ({} params, script {})", summary.name, summary.parameters.len(), path.display()),
            None => println!("{} ({} params)", summary.name, summary.parameters.len()),
        }
    }
}

fn describe_rule(registry: &RuleRegistry, name: &str) -> Result<()> {
    let rule = registry.get(name).ok_or_else(|| unknown_rule(name))?;
    println!("{}", rule.name());
    if rule.parameters().is_empty() {
        println!("  (no parameters)");
    }
    for (index, param) in rule.parameters().iter().enumerate() {
        println!("  {}. {} [{}] default {}", index + 1, param.name(), param.kind().label(), param.default_text());
        if let ParamKind::Choice(options) = param.kind() {
            for (option_index, option) in options.iter().enumerate() {
                println!("       {option_index}: {option}");
            }
        }
    }
    Ok(())
}

fn run_check(
    registry: &RuleRegistry,
    level_path: &Path,
    name: &str,
    raw_params: &[String],
    json_output: bool,
    fail_on_warn: bool,
) -> Result<ExitCode> {
    let rule = registry.get(name).ok_or_else(|| unknown_rule(name))?;
    let level = Level::load(level_path)?;
    let inputs = fill_defaults(rule.parameters(), raw_params);

    let mut session = CheckSession::new();
    let report = session.run_rule(rule, &inputs, &level)?;
    for _ in 0..report.summary.total {
        let Some(stop) = session.advance(1) else { break };
        let Some(flagged) = report.result.get(stop.index) else { break };
        if json_output {
            let value = json!({
                "severity": stop.severity.to_string(),
                "time": stop.time,
                "reason": stop.reason,
                "object": flagged.object,
            });
            println!("{value}");
        } else {
            let tag = match stop.severity {
                Severity::Error => "ERROR",
                Severity::Warning => "WARN",
            };
            println!("[{tag}] beat {:.3} {}: {}", stop.time, flagged.object, stop.reason);
        }
    }

    let summary = report.summary;
    if json_output {
        let value = json!({
            "rule": report.rule,
            "errors": summary.errors,
            "warnings": summary.warnings,
            "total": summary.total,
        });
        println!("{value}");
    } else {
        println!("{}: {summary}", report.rule);
    }

    if summary.errors > 0 || (fail_on_warn && summary.warnings > 0) {
        Ok(ExitCode::from(2))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

/// Values given on the command line, then declared defaults for the rest.
fn fill_defaults(parameters: &[Parameter], raw: &[String]) -> Vec<ParamInput> {
    raw.iter()
        .map(|value| ParamInput::from(value.as_str()))
        .chain(parameters.iter().skip(raw.len()).map(Parameter::default_input))
        .collect()
}

fn unknown_rule(name: &str) -> anyhow::Error {
    anyhow!("unknown rule '{name}'; run `mapcheck list` to see available rules")
}
