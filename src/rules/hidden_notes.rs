use super::Rule;
use crate::objects::{Note, Obstacle, ObstacleHeight, TOP_LAYER};
use crate::params::{ParamValues, Parameter};
use crate::result::{PendingResult, Severity};
use crate::snapshot::LevelSnapshot;
use anyhow::{bail, Result};

const CROUCH_IGNORE: usize = 0;
const CROUCH_WARN: usize = 1;
const CROUCH_BLOCK: usize = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Cover {
    Full,
    Partial,
}

/// Flags notes the player cannot see because an obstacle sits in front of them.
///
/// A note inside an active obstacle is an error when the obstacle covers its whole cell
/// and a warning when it only covers part of it. A note whose cell was covered by an
/// obstacle that ended within the reaction window before the note is a warning: the player
/// sees it too late to react.
pub struct HiddenNotes {
    parameters: Vec<Parameter>,
}

impl HiddenNotes {
    pub fn new() -> Self {
        Self {
            parameters: vec![
                Parameter::number("Reaction window (beats)", 0.5),
                Parameter::choice("Crouch obstacles", ["Ignore", "Warn", "Block"], CROUCH_WARN),
            ],
        }
    }
}

impl Default for HiddenNotes {
    fn default() -> Self {
        Self::new()
    }
}

impl Rule for HiddenNotes {
    fn name(&self) -> &str {
        "Hidden Notes"
    }

    fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    fn perform_check(&self, snapshot: &LevelSnapshot, params: &ParamValues) -> Result<PendingResult> {
        let window = params.number(0)?;
        if window < 0.0 {
            bail!("reaction window must not be negative (got {window})");
        }
        let crouch_mode = params.choice(1)?;

        let obstacles = snapshot.obstacles();
        let mut result = PendingResult::new();
        for note in snapshot.notes() {
            // Bombs are dodged, not hit.
            if note.is_bomb() {
                continue;
            }
            let started = obstacles.partition_point(|obstacle| obstacle.time <= note.time);
            let mut worst: Option<(Severity, String)> = None;
            for obstacle in &obstacles[..started] {
                let Some(cover) = cover_of(obstacle, note, crouch_mode) else { continue };
                let finding = if obstacle.is_active_at(note.time) {
                    match cover {
                        Cover::Full => (
                            Severity::Error,
                            format!(
                                "Note at beat {:.3} is inside an obstacle (beats {:.3}-{:.3})",
                                note.time,
                                obstacle.time,
                                obstacle.end()
                            ),
                        ),
                        Cover::Partial => (
                            Severity::Warning,
                            format!(
                                "Note at beat {:.3} is partly covered by a crouch obstacle (beats {:.3}-{:.3})",
                                note.time,
                                obstacle.time,
                                obstacle.end()
                            ),
                        ),
                    }
                } else if obstacle.end() > note.time - window {
                    (
                        Severity::Warning,
                        format!(
                            "Note at beat {:.3} is hidden by an obstacle until beat {:.3} ({:.3} beats to react)",
                            note.time,
                            obstacle.end(),
                            note.time - obstacle.end()
                        ),
                    )
                } else {
                    continue;
                };
                if worst.as_ref().map_or(true, |(severity, _)| finding.0 > *severity) {
                    worst = Some(finding);
                }
            }
            if let Some((severity, reason)) = worst {
                result.push(severity, vec![note.clone().into()], reason);
            }
        }
        Ok(result)
    }
}

fn cover_of(obstacle: &Obstacle, note: &Note, crouch_mode: usize) -> Option<Cover> {
    if !obstacle.covers_lane(note.lane) {
        return None;
    }
    match obstacle.height {
        ObstacleHeight::Full => Some(Cover::Full),
        ObstacleHeight::Crouch if note.layer >= TOP_LAYER => Some(Cover::Full),
        ObstacleHeight::Crouch => match crouch_mode {
            CROUCH_IGNORE => None,
            CROUCH_BLOCK => Some(Cover::Full),
            _ => Some(Cover::Partial),
        },
    }
}
