/// Raw parameter input that does not fit the declared parameter list.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("parameter '{param}': '{raw}' is not a valid number")]
    InvalidNumber { param: String, raw: String },
    #[error("parameter '{param}': '{raw}' is not a boolean (use true/false)")]
    InvalidBool { param: String, raw: String },
    #[error("parameter '{param}': '{raw}' is not an option index")]
    InvalidChoice { param: String, raw: String },
    #[error("parameter '{param}': option {index} is out of range ({options} options)")]
    ChoiceOutOfRange { param: String, index: usize, options: usize },
    #[error("expected {expected} parameter values, got {actual}")]
    ArityMismatch { expected: usize, actual: usize },
}

/// A rule failed while analysing a snapshot. Native errors, panics and script faults all
/// end up here.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("rule '{rule}' failed: {message}")]
pub struct RuleExecutionError {
    pub rule: String,
    pub message: String,
}

impl RuleExecutionError {
    pub fn new(rule: impl Into<String>, message: impl Into<String>) -> Self {
        Self { rule: rule.into(), message: message.into() }
    }
}

/// Why a run left the committed result untouched.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RunError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Execution(#[from] RuleExecutionError),
}
