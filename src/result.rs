use crate::host::Highlight;
use crate::objects::{ObjectId, TimedObject};
use std::collections::HashMap;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// One problem reported by a rule. A finding may cover several objects, e.g. every note
/// of a stack.
#[derive(Clone, Debug, PartialEq)]
pub struct Finding {
    pub severity: Severity,
    pub objects: Vec<TimedObject>,
    pub reason: String,
}

impl Finding {
    /// Time of the earliest object, or `None` for a finding without objects.
    pub fn time(&self) -> Option<f64> {
        self.objects.first().map(TimedObject::time)
    }

    fn normalize(&mut self) {
        let mut seen = Vec::with_capacity(self.objects.len());
        self.objects.retain(|object| {
            let id = object.id();
            if seen.contains(&id) {
                false
            } else {
                seen.push(id);
                true
            }
        });
        self.objects.sort_by(|a, b| a.time().total_cmp(&b.time()));
    }
}

/// A single flagged object as seen by navigation and highlighting.
#[derive(Clone, Debug, PartialEq)]
pub struct FlaggedObject {
    pub object: TimedObject,
    pub reason: String,
    pub severity: Severity,
}

/// Raw rule output, in whatever order the rule produced it. Turned into a
/// [`CheckResult`] by [`PendingResult::commit`].
#[derive(Clone, Debug, Default)]
pub struct PendingResult {
    findings: Vec<Finding>,
}

impl PendingResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error(&mut self, object: impl Into<TimedObject>, reason: impl Into<String>) {
        self.push(Severity::Error, vec![object.into()], reason);
    }

    pub fn warning(&mut self, object: impl Into<TimedObject>, reason: impl Into<String>) {
        self.push(Severity::Warning, vec![object.into()], reason);
    }

    pub fn error_group(&mut self, objects: Vec<TimedObject>, reason: impl Into<String>) {
        self.push(Severity::Error, objects, reason);
    }

    pub fn warning_group(&mut self, objects: Vec<TimedObject>, reason: impl Into<String>) {
        self.push(Severity::Warning, objects, reason);
    }

    pub fn push(&mut self, severity: Severity, objects: Vec<TimedObject>, reason: impl Into<String>) {
        self.findings.push(Finding { severity, objects, reason: reason.into() });
    }

    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    pub fn is_empty(&self) -> bool {
        self.findings.is_empty()
    }

    /// Finalize into canonical form.
    ///
    /// Objects inside a finding are deduplicated and sorted by time; findings without
    /// objects are dropped. `all` lists every flagged object once, ordered by time with
    /// ties in insertion order. An object flagged as both error and warning is listed as
    /// an error with the error's reason.
    pub fn commit(self) -> CheckResult {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();
        let mut all: Vec<FlaggedObject> = Vec::new();
        let mut positions: HashMap<ObjectId, usize> = HashMap::new();

        for mut finding in self.findings {
            finding.normalize();
            if finding.objects.is_empty() {
                continue;
            }
            for object in &finding.objects {
                match positions.get(&object.id()) {
                    Some(&position) => {
                        let existing = &mut all[position];
                        if finding.severity > existing.severity {
                            existing.severity = finding.severity;
                            existing.reason = finding.reason.clone();
                        }
                    }
                    None => {
                        positions.insert(object.id(), all.len());
                        all.push(FlaggedObject {
                            object: object.clone(),
                            reason: finding.reason.clone(),
                            severity: finding.severity,
                        });
                    }
                }
            }
            match finding.severity {
                Severity::Error => errors.push(finding),
                Severity::Warning => warnings.push(finding),
            }
        }

        let by_time = |a: &Finding, b: &Finding| {
            a.time().unwrap_or_default().total_cmp(&b.time().unwrap_or_default())
        };
        errors.sort_by(by_time);
        warnings.sort_by(by_time);
        all.sort_by(|a, b| a.object.time().total_cmp(&b.object.time()));
        let index = all.iter().enumerate().map(|(position, flagged)| (flagged.object.id(), position)).collect();

        CheckResult { errors, warnings, all, index }
    }
}

/// Committed, immutable outcome of one rule run.
#[derive(Clone, Debug, Default)]
pub struct CheckResult {
    errors: Vec<Finding>,
    warnings: Vec<Finding>,
    all: Vec<FlaggedObject>,
    index: HashMap<ObjectId, usize>,
}

impl CheckResult {
    pub fn errors(&self) -> &[Finding] {
        &self.errors
    }

    pub fn warnings(&self) -> &[Finding] {
        &self.warnings
    }

    pub fn all(&self) -> &[FlaggedObject] {
        &self.all
    }

    pub fn get(&self, position: usize) -> Option<&FlaggedObject> {
        self.all.get(position)
    }

    pub fn len(&self) -> usize {
        self.all.len()
    }

    pub fn is_empty(&self) -> bool {
        self.all.is_empty()
    }

    pub fn flagged(&self, id: ObjectId) -> Option<&FlaggedObject> {
        self.index.get(&id).map(|&position| &self.all[position])
    }

    pub fn severity_of(&self, id: ObjectId) -> Option<Severity> {
        self.flagged(id).map(|flagged| flagged.severity)
    }

    pub fn highlight_for(&self, id: ObjectId) -> Highlight {
        self.severity_of(id).map(Highlight::from).unwrap_or_default()
    }

    pub fn summary(&self) -> ResultSummary {
        let errors = self.all.iter().filter(|flagged| flagged.severity == Severity::Error).count();
        ResultSummary { errors, warnings: self.all.len() - errors, total: self.all.len() }
    }
}

/// Flagged-object counts for status display.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ResultSummary {
    pub errors: usize,
    pub warnings: usize,
    pub total: usize,
}

impl fmt::Display for ResultSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.total == 0 {
            write!(f, "No problems found")
        } else {
            write!(f, "{} problems found ({} errors, {} warnings)", self.total, self.errors, self.warnings)
        }
    }
}
