pub mod cli;
pub mod config;
pub mod error;
pub mod host;
pub mod level;
pub mod navigator;
pub mod objects;
pub mod params;
pub mod result;
pub mod rules;
pub mod scripts;
pub mod session;
pub mod snapshot;

pub use error::{ParseError, RuleExecutionError, RunError};
pub use host::{sync_highlights, Highlight, Highlighter, ObjectStorage, Timeline};
pub use level::Level;
pub use navigator::{NavigationStop, Navigator};
pub use objects::{ObjectId, ObjectKind, TimedObject};
pub use params::{ParamInput, ParamKind, ParamValue, ParamValues, Parameter};
pub use result::{CheckResult, Finding, FlaggedObject, PendingResult, ResultSummary, Severity};
pub use rules::{Rule, RuleRegistry};
pub use scripts::ScriptRule;
pub use session::{CheckSession, RunReport};
pub use snapshot::LevelSnapshot;
