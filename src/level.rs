use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use tracing::debug;

use crate::host::ObjectStorage;
use crate::objects::{
    CustomEvent, LightingEvent, Note, NoteType, ObjectId, ObjectKind, Obstacle, ObstacleHeight, TempoChange,
    TimedObject,
};

/// In-memory level storage backed by a v2 beatmap file.
///
/// Ids are assigned in file order starting at 1: notes, obstacles, lighting events,
/// custom events, then tempo changes.
#[derive(Debug, Clone, Default)]
pub struct Level {
    objects: Vec<TimedObject>,
    next_id: u64,
}

impl Level {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path).with_context(|| format!("Failed to read level {}", path.display()))?;
        Self::from_slice(&bytes).with_context(|| format!("Failed to parse level {}", path.display()))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Self::from_slice(json.as_bytes())
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let raw: RawLevel = serde_json::from_slice(bytes)?;
        let mut level = Self::new();
        for (index, note) in raw.notes.into_iter().enumerate() {
            let note_type = NoteType::from_raw(note.note_type)
                .ok_or_else(|| anyhow!("note {index}: unknown _type {}", note.note_type))?;
            let id = level.allocate_id();
            let mut parsed = Note::new(id, note.time, note.lane, note.layer, note_type);
            parsed.cut_direction = note.cut_direction;
            level.objects.push(parsed.into());
        }
        for (index, obstacle) in raw.obstacles.into_iter().enumerate() {
            let height = ObstacleHeight::from_raw(obstacle.obstacle_type)
                .ok_or_else(|| anyhow!("obstacle {index}: unknown _type {}", obstacle.obstacle_type))?;
            let id = level.allocate_id();
            level.objects.push(
                Obstacle::new(id, obstacle.time, obstacle.duration, obstacle.lane, obstacle.width, height).into(),
            );
        }
        for event in raw.events {
            let id = level.allocate_id();
            level.objects.push(LightingEvent::new(id, event.time, event.event_type, event.value).into());
        }
        for event in raw.custom_data.custom_events {
            let id = level.allocate_id();
            level.objects.push(CustomEvent::new(id, event.time, event.event_type, event.data).into());
        }
        for change in raw.bpm_changes.into_iter().chain(raw.custom_data.bpm_changes) {
            let id = level.allocate_id();
            level.objects.push(TempoChange::new(id, change.time, change.bpm).into());
        }
        debug!(objects = level.objects.len(), "parsed level");
        Ok(level)
    }

    /// Fresh id for an object about to be inserted.
    pub fn allocate_id(&mut self) -> ObjectId {
        self.next_id += 1;
        ObjectId(self.next_id)
    }

    pub fn insert(&mut self, object: impl Into<TimedObject>) {
        let object = object.into();
        self.next_id = self.next_id.max(object.id().0);
        self.objects.push(object);
    }

    pub fn objects(&self) -> &[TimedObject] {
        &self.objects
    }

    pub fn count(&self, kind: ObjectKind) -> usize {
        self.objects.iter().filter(|object| object.kind() == kind).count()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

impl ObjectStorage for Level {
    fn loaded(&self, kind: ObjectKind) -> Vec<TimedObject> {
        self.objects.iter().filter(|object| object.kind() == kind).cloned().collect()
    }
}

#[derive(Debug, Deserialize)]
struct RawLevel {
    #[serde(rename = "_notes", default)]
    notes: Vec<RawNote>,
    #[serde(rename = "_obstacles", default)]
    obstacles: Vec<RawObstacle>,
    #[serde(rename = "_events", default)]
    events: Vec<RawEvent>,
    #[serde(rename = "_BPMChanges", default)]
    bpm_changes: Vec<RawBpmChange>,
    #[serde(rename = "_customData", default)]
    custom_data: RawCustomData,
}

#[derive(Debug, Default, Deserialize)]
struct RawCustomData {
    #[serde(rename = "_customEvents", default)]
    custom_events: Vec<RawCustomEvent>,
    #[serde(rename = "_BPMChanges", default)]
    bpm_changes: Vec<RawBpmChange>,
}

#[derive(Debug, Deserialize)]
struct RawNote {
    #[serde(rename = "_time")]
    time: f64,
    #[serde(rename = "_lineIndex")]
    lane: i32,
    #[serde(rename = "_lineLayer")]
    layer: i32,
    #[serde(rename = "_type")]
    note_type: i64,
    #[serde(rename = "_cutDirection", default = "RawNote::default_cut_direction")]
    cut_direction: i32,
}

impl RawNote {
    const fn default_cut_direction() -> i32 {
        8
    }
}

#[derive(Debug, Deserialize)]
struct RawObstacle {
    #[serde(rename = "_time")]
    time: f64,
    #[serde(rename = "_duration")]
    duration: f64,
    #[serde(rename = "_lineIndex")]
    lane: i32,
    #[serde(rename = "_type", default)]
    obstacle_type: i64,
    #[serde(rename = "_width", default = "RawObstacle::default_width")]
    width: i32,
}

impl RawObstacle {
    const fn default_width() -> i32 {
        1
    }
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    #[serde(rename = "_time")]
    time: f64,
    #[serde(rename = "_type")]
    event_type: i32,
    #[serde(rename = "_value", default)]
    value: i32,
}

#[derive(Debug, Deserialize)]
struct RawCustomEvent {
    #[serde(rename = "_time")]
    time: f64,
    #[serde(rename = "_type")]
    event_type: String,
    #[serde(rename = "_data", default)]
    data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct RawBpmChange {
    #[serde(rename = "_time")]
    time: f64,
    #[serde(rename = "_BPM", alias = "_bpm")]
    bpm: f64,
}
