use crate::host::ObjectStorage;
use crate::objects::{
    CustomEvent, LightingEvent, Note, ObjectId, ObjectKind, Obstacle, TempoChange, TimedObject,
};
use std::collections::HashMap;
use tracing::debug;

/// Immutable, time-ordered copy of every object kind, taken once per analysis run.
///
/// Each collection is stably sorted by time, so objects sharing a beat keep the order the
/// storage reported them in. Rules rely on this ordering and never re-sort.
#[derive(Debug, Clone, Default)]
pub struct LevelSnapshot {
    notes: Vec<Note>,
    lighting_events: Vec<LightingEvent>,
    obstacles: Vec<Obstacle>,
    custom_events: Vec<CustomEvent>,
    tempo_changes: Vec<TempoChange>,
}

impl LevelSnapshot {
    pub fn new(
        mut notes: Vec<Note>,
        mut lighting_events: Vec<LightingEvent>,
        mut obstacles: Vec<Obstacle>,
        mut custom_events: Vec<CustomEvent>,
        mut tempo_changes: Vec<TempoChange>,
    ) -> Self {
        sort_by_time(&mut notes, |note| note.time);
        sort_by_time(&mut lighting_events, |event| event.time);
        sort_by_time(&mut obstacles, |obstacle| obstacle.time);
        sort_by_time(&mut custom_events, |event| event.time);
        sort_by_time(&mut tempo_changes, |change| change.time);
        Self { notes, lighting_events, obstacles, custom_events, tempo_changes }
    }

    /// Query every kind from `storage` and sort the copies.
    pub fn capture(storage: &dyn ObjectStorage) -> Self {
        let objects = ObjectKind::ALL.into_iter().flat_map(|kind| {
            storage.loaded(kind).into_iter().filter(move |object| {
                let matches = object.kind() == kind;
                if !matches {
                    debug!(expected = %kind, found = %object.kind(), id = %object.id(), "storage returned object of another kind");
                }
                matches
            })
        });
        let snapshot = Self::from_objects(objects);
        debug!(
            notes = snapshot.notes.len(),
            obstacles = snapshot.obstacles.len(),
            lighting_events = snapshot.lighting_events.len(),
            custom_events = snapshot.custom_events.len(),
            tempo_changes = snapshot.tempo_changes.len(),
            "captured level snapshot"
        );
        snapshot
    }

    pub fn from_objects(objects: impl IntoIterator<Item = TimedObject>) -> Self {
        let mut notes = Vec::new();
        let mut lighting_events = Vec::new();
        let mut obstacles = Vec::new();
        let mut custom_events = Vec::new();
        let mut tempo_changes = Vec::new();
        for object in objects {
            match object {
                TimedObject::Note(note) => notes.push(note),
                TimedObject::Obstacle(obstacle) => obstacles.push(obstacle),
                TimedObject::LightingEvent(event) => lighting_events.push(event),
                TimedObject::CustomEvent(event) => custom_events.push(event),
                TimedObject::TempoChange(change) => tempo_changes.push(change),
            }
        }
        Self::new(notes, lighting_events, obstacles, custom_events, tempo_changes)
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn lighting_events(&self) -> &[LightingEvent] {
        &self.lighting_events
    }

    pub fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }

    pub fn custom_events(&self) -> &[CustomEvent] {
        &self.custom_events
    }

    pub fn tempo_changes(&self) -> &[TempoChange] {
        &self.tempo_changes
    }

    pub fn len(&self) -> usize {
        self.notes.len()
            + self.lighting_events.len()
            + self.obstacles.len()
            + self.custom_events.len()
            + self.tempo_changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every object in the snapshot, keyed by identity.
    pub fn index(&self) -> HashMap<ObjectId, TimedObject> {
        let mut index = HashMap::with_capacity(self.len());
        let notes = self.notes.iter().cloned().map(TimedObject::from);
        let obstacles = self.obstacles.iter().cloned().map(TimedObject::from);
        let lighting = self.lighting_events.iter().cloned().map(TimedObject::from);
        let custom = self.custom_events.iter().cloned().map(TimedObject::from);
        let tempo = self.tempo_changes.iter().cloned().map(TimedObject::from);
        for object in notes.chain(obstacles).chain(lighting).chain(custom).chain(tempo) {
            index.insert(object.id(), object);
        }
        index
    }
}

fn sort_by_time<T>(items: &mut [T], time: impl Fn(&T) -> f64) {
    items.sort_by(|a, b| time(a).total_cmp(&time(b)));
}
