use super::Rule;
use crate::objects::{Note, TimedObject};
use crate::params::{ParamValues, Parameter};
use crate::result::PendingResult;
use crate::snapshot::LevelSnapshot;
use anyhow::{bail, Context, Result};

/// Flags notes that share a grid cell at (nearly) the same time. The player cannot tell
/// stacked notes apart, so each stack becomes one warning covering all of its notes.
pub struct StackedNotes {
    parameters: Vec<Parameter>,
}

impl StackedNotes {
    pub fn new() -> Self {
        Self {
            parameters: vec![
                Parameter::number("Time tolerance (beats)", 0.01),
                Parameter::text("Allowed stack positions", ""),
                Parameter::flag("Include bombs", true),
            ],
        }
    }
}

impl Default for StackedNotes {
    fn default() -> Self {
        Self::new()
    }
}

impl Rule for StackedNotes {
    fn name(&self) -> &str {
        "Stacked Notes"
    }

    fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    fn perform_check(&self, snapshot: &LevelSnapshot, params: &ParamValues) -> Result<PendingResult> {
        let tolerance = params.number(0)?;
        if tolerance < 0.0 {
            bail!("time tolerance must not be negative (got {tolerance})");
        }
        let allowed = parse_positions(params.text(1)?)?;
        let include_bombs = params.flag(2)?;

        let notes: Vec<&Note> =
            snapshot.notes().iter().filter(|note| include_bombs || !note.is_bomb()).collect();
        let mut result = PendingResult::new();
        let mut start = 0;
        while start < notes.len() {
            let anchor = notes[start].time;
            let end = start + notes[start..].iter().take_while(|note| note.time - anchor <= tolerance).count();
            for stack in stacks(&notes[start..end]) {
                let (lane, layer) = (stack[0].lane, stack[0].layer);
                if stack.len() < 2 || allowed.contains(&(lane, layer)) {
                    continue;
                }
                let reason = format!(
                    "{} notes stacked at lane {lane}, layer {layer} (beat {:.3})",
                    stack.len(),
                    stack[0].time
                );
                let objects = stack.iter().map(|note| TimedObject::from((*note).clone())).collect();
                result.warning_group(objects, reason);
            }
            start = end;
        }
        Ok(result)
    }
}

/// Group a time cluster by cell, keeping first-seen order.
fn stacks<'a>(cluster: &[&'a Note]) -> Vec<Vec<&'a Note>> {
    let mut groups: Vec<Vec<&Note>> = Vec::new();
    for &note in cluster {
        match groups.iter_mut().find(|group| group[0].lane == note.lane && group[0].layer == note.layer) {
            Some(group) => group.push(note),
            None => groups.push(vec![note]),
        }
    }
    groups
}

/// Parse `lane:layer` pairs separated by whitespace or commas.
fn parse_positions(raw: &str) -> Result<Vec<(i32, i32)>> {
    raw.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|token| !token.is_empty())
        .map(|token| {
            let (lane, layer) =
                token.split_once(':').with_context(|| format!("position '{token}' should look like lane:layer"))?;
            let lane = lane.parse::<i32>().with_context(|| format!("invalid lane in '{token}'"))?;
            let layer = layer.parse::<i32>().with_context(|| format!("invalid layer in '{token}'"))?;
            Ok::<_, anyhow::Error>((lane, layer))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::{NoteType, ObjectId};
    use crate::params::{parse_inputs, ParamInput};
    use crate::result::CheckResult;

    fn run(notes: Vec<Note>, inputs: [&str; 3]) -> Result<CheckResult> {
        let rule = StackedNotes::new();
        let snapshot = LevelSnapshot::new(notes, Vec::new(), Vec::new(), Vec::new(), Vec::new());
        let inputs: Vec<ParamInput> = inputs.into_iter().map(ParamInput::from).collect();
        let params = parse_inputs(rule.parameters(), &inputs)?;
        Ok(rule.perform_check(&snapshot, &params)?.commit())
    }

    fn note(id: u64, time: f64, lane: i32, layer: i32) -> Note {
        Note::new(ObjectId(id), time, lane, layer, NoteType::Blue)
    }

    #[test]
    fn identical_pair_is_one_warning_covering_both() {
        let notes = vec![note(1, 1.0, 0, 0), note(2, 2.0, 1, 0), note(3, 2.0, 1, 0)];
        let result = run(notes, ["0.01", "", "true"]).expect("run");
        assert!(result.errors().is_empty());
        assert_eq!(result.warnings().len(), 1);
        let ids: Vec<_> = result.warnings()[0].objects.iter().map(|o| o.id()).collect();
        assert_eq!(ids, vec![ObjectId(2), ObjectId(3)]);
        assert_eq!(result.len(), 2);
        assert!(result.all().iter().all(|flagged| flagged.object.time() == 2.0));
    }

    #[test]
    fn tolerance_groups_near_simultaneous_notes() {
        let notes = vec![note(1, 4.0, 2, 1), note(2, 4.005, 2, 1), note(3, 4.02, 2, 1)];
        let result = run(notes.clone(), ["0.01", "", "true"]).expect("run");
        assert_eq!(result.warnings().len(), 1);
        assert_eq!(result.warnings()[0].objects.len(), 2);

        let result = run(notes, ["0.05", "", "true"]).expect("run");
        assert_eq!(result.warnings()[0].objects.len(), 3);
        assert!(result.all()[0].reason.starts_with("3 notes stacked at lane 2, layer 1"));
    }

    #[test]
    fn allowed_positions_and_bombs() {
        let bomb = Note::new(ObjectId(9), 1.0, 3, 2, NoteType::Bomb);
        let notes = vec![note(1, 1.0, 0, 0), note(2, 1.0, 0, 0), note(3, 1.0, 3, 2), bomb];
        let result = run(notes.clone(), ["0.01", "0:0", "true"]).expect("run");
        assert_eq!(result.warnings().len(), 1, "only the note and bomb at 3:2 remain");

        let result = run(notes, ["0.01", "0:0, 1:1", "false"]).expect("run");
        assert!(result.is_empty());
    }

    #[test]
    fn malformed_positions_fail() {
        let err = run(vec![note(1, 1.0, 0, 0)], ["0.01", "0-0", "true"]).unwrap_err();
        assert!(err.to_string().contains("lane:layer"));
    }
}
