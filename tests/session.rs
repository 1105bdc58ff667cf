use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{bail, Result};
use mapcheck::objects::{Note, NoteType};
use mapcheck::rules::{HiddenNotes, StackedNotes};
use mapcheck::{
    CheckSession, Highlight, Highlighter, Level, LevelSnapshot, ObjectId, ParamInput, ParamValues, ParseError,
    PendingResult, Rule, RunError, Severity, Timeline, TimedObject,
};

const SAMPLE_LEVEL: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/levels/sample.dat");

fn inputs(raw: &[&str]) -> Vec<ParamInput> {
    raw.iter().map(|value| ParamInput::from(*value)).collect()
}

/// Notes at beats 1, 2 and 2, the last two sharing a cell.
fn stacked_level() -> Level {
    let mut level = Level::new();
    for (time, lane) in [(1.0, 0), (2.0, 1), (2.0, 1)] {
        let id = level.allocate_id();
        level.insert(Note::new(id, time, lane, 0, NoteType::Blue));
    }
    level
}

#[derive(Default)]
struct Scrubber {
    beats: Vec<f64>,
}

impl Timeline for Scrubber {
    fn move_to_time(&mut self, beat: f64) {
        self.beats.push(beat);
    }
}

#[derive(Default)]
struct Outlines(HashMap<ObjectId, Highlight>);

impl Highlighter for Outlines {
    type Handle = ObjectId;

    fn try_get_container(&self, object: &TimedObject) -> Option<ObjectId> {
        Some(object.id())
    }

    fn set_highlight(&mut self, handle: ObjectId, highlight: Highlight) {
        self.0.insert(handle, highlight);
    }
}

struct Failing;

impl Rule for Failing {
    fn name(&self) -> &str {
        "Failing"
    }

    fn perform_check(&self, _snapshot: &LevelSnapshot, _params: &ParamValues) -> Result<PendingResult> {
        bail!("cannot read obstacles")
    }
}

struct Panicking;

impl Rule for Panicking {
    fn name(&self) -> &str {
        "Panicking"
    }

    fn perform_check(&self, _snapshot: &LevelSnapshot, _params: &ParamValues) -> Result<PendingResult> {
        panic!("boom")
    }
}

#[test]
fn stacked_pair_commits_one_grouped_warning() {
    let mut session = CheckSession::new();
    let report = session
        .run_rule(&StackedNotes::new(), &inputs(&["0.01", "", "true"]), &stacked_level())
        .expect("run stacked notes");

    let result = &report.result;
    assert!(result.errors().is_empty());
    assert_eq!(result.warnings().len(), 1);
    assert_eq!(result.warnings()[0].objects.len(), 2);
    let times: Vec<_> = result.all().iter().map(|flagged| flagged.object.time()).collect();
    assert_eq!(times, vec![2.0, 2.0]);
    assert_eq!(report.summary.to_string(), "2 problems found (0 errors, 2 warnings)");
    assert!(report.replaced.is_none());
}

#[test]
fn navigation_scrubs_through_flagged_objects() {
    let level = Level::load(SAMPLE_LEVEL).expect("load sample level");
    let mut session = CheckSession::new();
    let report = session.run_rule(&HiddenNotes::new(), &inputs(&["0.5", "1"]), &level).expect("run");
    assert_eq!((report.summary.errors, report.summary.warnings), (1, 1));

    let mut scrubber = Scrubber::default();
    let first = session.advance_and_scrub(1, &mut scrubber).expect("first stop");
    assert_eq!(first.index, 0);
    assert_eq!(first.severity, Severity::Error);
    session.advance_and_scrub(1, &mut scrubber);
    session.advance_and_scrub(1, &mut scrubber);
    assert_eq!(scrubber.beats, vec![4.0, 4.75, 4.0]);

    let back = session.advance(-1).expect("step back");
    assert_eq!(back.time, 4.75);
    assert_eq!(session.advance(0), session.advance(0));
}

#[test]
fn parse_failure_keeps_previous_result() {
    let level = stacked_level();
    let mut session = CheckSession::new();
    session.run_rule(&StackedNotes::new(), &inputs(&["0.01", "", "true"]), &level).expect("first run");
    session.advance(1);
    let before = Arc::clone(session.current().expect("committed"));
    let summary = session.summary();

    let err = session.run_rule(&HiddenNotes::new(), &inputs(&["soon", "1"]), &level).unwrap_err();
    assert!(matches!(err, RunError::Parse(ParseError::InvalidNumber { .. })), "got {err:?}");
    assert!(Arc::ptr_eq(&before, session.current().expect("still committed")));
    assert_eq!(session.summary(), summary);
    assert!(session.navigator().has_moved());

    let err = session.run_rule(&StackedNotes::new(), &inputs(&["0.01"]), &level).unwrap_err();
    assert_eq!(err, RunError::Parse(ParseError::ArityMismatch { expected: 3, actual: 1 }));
}

#[test]
fn failing_rule_keeps_summary() {
    let level = stacked_level();
    let mut session = CheckSession::new();
    session.run_rule(&StackedNotes::new(), &inputs(&["0.01", "", "true"]), &level).expect("first run");
    let summary = session.summary();

    let err = session.run_rule(&Failing, &[], &level).unwrap_err();
    let err = match err {
        RunError::Execution(err) => err,
        other => panic!("expected an execution error, got {other:?}"),
    };
    assert_eq!(err.rule, "Failing");
    assert!(err.message.contains("cannot read obstacles"));
    assert_eq!(session.summary(), summary);

    let err = session.run_rule(&Panicking, &[], &level).unwrap_err();
    assert!(err.to_string().contains("panicked: boom"), "got {err}");
    assert_eq!(session.summary(), summary);
}

#[test]
fn empty_result_is_committed() {
    let level = stacked_level();
    let mut session = CheckSession::new();
    session.run_rule(&StackedNotes::new(), &inputs(&["0.01", "", "true"]), &level).expect("first run");

    let report = session.run_rule(&HiddenNotes::new(), &inputs(&["0.5", "0"]), &level).expect("second run");
    assert!(report.result.is_empty());
    assert_eq!(report.replaced.as_ref().map(|previous| previous.len()), Some(2));
    assert_eq!(session.summary().to_string(), "No problems found");
    assert_eq!(session.advance(1), None);
    assert!(!session.navigator().has_moved());
}

#[test]
fn highlights_follow_the_committed_result() {
    let level = stacked_level();
    let mut session = CheckSession::new();
    let mut outlines = Outlines::default();

    let report = session.run_rule(&StackedNotes::new(), &inputs(&["0.01", "", "true"]), &level).expect("run");
    report.refresh_highlights(&mut outlines);
    assert_eq!(outlines.0.get(&ObjectId(2)), Some(&Highlight::Warning));
    assert_eq!(outlines.0.get(&ObjectId(1)), None);
    let stacked = report.result.all()[0].object.clone();
    assert_eq!(session.highlight_for(&stacked), Highlight::Warning);

    let report = session.run_rule(&HiddenNotes::new(), &inputs(&["0.5", "1"]), &level).expect("rerun");
    report.refresh_highlights(&mut outlines);
    assert_eq!(outlines.0.get(&ObjectId(2)), Some(&Highlight::None));
    assert_eq!(session.highlight_for(&stacked), Highlight::None);
}
