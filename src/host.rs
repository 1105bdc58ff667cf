//! Seams to the editor that embeds the checker: object storage, outline highlighting and
//! timeline scrubbing. The checker only reads from storage and only writes highlights
//! after a result has been committed.

use crate::objects::{ObjectKind, TimedObject};
use crate::result::{CheckResult, Severity};
use std::collections::HashSet;

/// Source of the objects currently loaded in the editor.
pub trait ObjectStorage {
    /// All loaded objects of `kind`, in no particular order.
    fn loaded(&self, kind: ObjectKind) -> Vec<TimedObject>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Highlight {
    #[default]
    None,
    Error,
    Warning,
}

impl From<Severity> for Highlight {
    fn from(value: Severity) -> Self {
        match value {
            Severity::Error => Highlight::Error,
            Severity::Warning => Highlight::Warning,
        }
    }
}

/// Outline renderer for objects that currently have a visual container.
pub trait Highlighter {
    type Handle;

    fn try_get_container(&self, object: &TimedObject) -> Option<Self::Handle>;
    fn set_highlight(&mut self, handle: Self::Handle, highlight: Highlight);
}

pub trait Timeline {
    fn move_to_time(&mut self, beat: f64);
}

/// Refresh outlines after `current` replaced `previous`. Objects flagged before but not
/// anymore are cleared; every object in `current` gets its severity outline. Objects
/// without a loaded container are skipped; the editor asks
/// [`CheckResult::highlight_for`] when it loads them later.
pub fn sync_highlights<H: Highlighter>(previous: Option<&CheckResult>, current: &CheckResult, highlighter: &mut H) {
    if let Some(previous) = previous {
        let still_flagged: HashSet<_> = current.all().iter().map(|flagged| flagged.object.id()).collect();
        for flagged in previous.all() {
            if still_flagged.contains(&flagged.object.id()) {
                continue;
            }
            if let Some(handle) = highlighter.try_get_container(&flagged.object) {
                highlighter.set_highlight(handle, Highlight::None);
            }
        }
    }
    for flagged in current.all() {
        if let Some(handle) = highlighter.try_get_container(&flagged.object) {
            highlighter.set_highlight(handle, flagged.severity.into());
        }
    }
}
