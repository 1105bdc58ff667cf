use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tracing::{info, warn};

use crate::error::{RuleExecutionError, RunError};
use crate::host::{sync_highlights, Highlight, Highlighter, ObjectStorage, Timeline};
use crate::navigator::{NavigationStop, Navigator};
use crate::objects::TimedObject;
use crate::params::{parse_inputs, ParamInput, ParamValues};
use crate::result::{CheckResult, PendingResult, ResultSummary};
use crate::rules::Rule;
use crate::snapshot::LevelSnapshot;

/// Outcome of a committed run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub rule: String,
    pub summary: ResultSummary,
    pub result: Arc<CheckResult>,
    /// Result that was live before this run, if any.
    pub replaced: Option<Arc<CheckResult>>,
}

impl RunReport {
    /// Move outlines from the replaced result to the new one.
    pub fn refresh_highlights<H: Highlighter>(&self, highlighter: &mut H) {
        sync_highlights(self.replaced.as_deref(), &self.result, highlighter);
    }
}

/// Owns the committed result and the navigation cursor over it.
///
/// A run either commits a complete new result or changes nothing: parameter errors and
/// rule failures (including panics) leave the previous result and cursor in place.
#[derive(Debug, Default)]
pub struct CheckSession {
    current: Option<Arc<CheckResult>>,
    navigator: Navigator,
}

impl CheckSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn run_rule(
        &mut self,
        rule: &dyn Rule,
        inputs: &[ParamInput],
        storage: &dyn ObjectStorage,
    ) -> Result<RunReport, RunError> {
        let snapshot = LevelSnapshot::capture(storage);
        self.run_on_snapshot(rule, inputs, &snapshot)
    }

    pub fn run_on_snapshot(
        &mut self,
        rule: &dyn Rule,
        inputs: &[ParamInput],
        snapshot: &LevelSnapshot,
    ) -> Result<RunReport, RunError> {
        let params = parse_inputs(rule.parameters(), inputs).map_err(|err| {
            warn!(rule = %rule.name(), "invalid parameters: {err}");
            err
        })?;
        let pending = execute(rule, snapshot, &params).map_err(|err| {
            warn!(rule = %rule.name(), "{err}");
            err
        })?;

        let result = Arc::new(pending.commit());
        let summary = result.summary();
        let replaced = self.current.replace(Arc::clone(&result));
        self.navigator.reset();
        info!(
            rule = %rule.name(),
            errors = summary.errors,
            warnings = summary.warnings,
            objects = snapshot.len(),
            "{summary}"
        );
        Ok(RunReport { rule: rule.name().to_string(), summary, result, replaced })
    }

    pub fn current(&self) -> Option<&Arc<CheckResult>> {
        self.current.as_ref()
    }

    pub fn navigator(&self) -> &Navigator {
        &self.navigator
    }

    /// Counts for the last committed result; all zero before the first run.
    pub fn summary(&self) -> ResultSummary {
        self.current.as_deref().map(CheckResult::summary).unwrap_or_default()
    }

    pub fn advance(&mut self, offset: i64) -> Option<NavigationStop> {
        let result = self.current.as_deref()?;
        self.navigator.advance(offset, result)
    }

    pub fn advance_and_scrub(&mut self, offset: i64, timeline: &mut dyn Timeline) -> Option<NavigationStop> {
        let stop = self.advance(offset)?;
        timeline.move_to_time(stop.time);
        Some(stop)
    }

    /// Outline for an object whose container was loaded after the run.
    pub fn highlight_for(&self, object: &TimedObject) -> Highlight {
        self.current.as_deref().map(|result| result.highlight_for(object.id())).unwrap_or_default()
    }
}

fn execute(rule: &dyn Rule, snapshot: &LevelSnapshot, params: &ParamValues) -> Result<PendingResult, RuleExecutionError> {
    match panic::catch_unwind(AssertUnwindSafe(|| rule.perform_check(snapshot, params))) {
        Ok(Ok(pending)) => Ok(pending),
        Ok(Err(err)) => Err(match err.downcast::<RuleExecutionError>() {
            Ok(err) => err,
            Err(err) => RuleExecutionError::new(rule.name(), format!("{err:#}")),
        }),
        Err(payload) => Err(RuleExecutionError::new(rule.name(), format!("panicked: {}", panic_message(&*payload)))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
