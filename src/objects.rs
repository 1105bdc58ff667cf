use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of vertical layers on the playfield grid.
pub const LAYER_COUNT: i32 = 3;
/// Index of the highest layer; crouch obstacles only cover this one.
pub const TOP_LAYER: i32 = LAYER_COUNT - 1;

/// Identity handed out by the level storage. Two objects with equal fields are still
/// distinct objects when their ids differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(pub u64);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Note,
    Obstacle,
    LightingEvent,
    CustomEvent,
    TempoChange,
}

impl ObjectKind {
    pub const ALL: [ObjectKind; 5] = [
        ObjectKind::Note,
        ObjectKind::Obstacle,
        ObjectKind::LightingEvent,
        ObjectKind::CustomEvent,
        ObjectKind::TempoChange,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ObjectKind::Note => "note",
            ObjectKind::Obstacle => "obstacle",
            ObjectKind::LightingEvent => "lighting event",
            ObjectKind::CustomEvent => "custom event",
            ObjectKind::TempoChange => "tempo change",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteType {
    Red,
    Blue,
    Bomb,
}

impl NoteType {
    /// Maps the `_type` value used by v2 level files.
    pub fn from_raw(raw: i64) -> Option<Self> {
        match raw {
            0 => Some(NoteType::Red),
            1 => Some(NoteType::Blue),
            3 => Some(NoteType::Bomb),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObstacleHeight {
    Full,
    Crouch,
}

impl ObstacleHeight {
    pub fn from_raw(raw: i64) -> Option<Self> {
        match raw {
            0 => Some(ObstacleHeight::Full),
            1 => Some(ObstacleHeight::Crouch),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Note {
    pub id: ObjectId,
    pub time: f64,
    pub lane: i32,
    pub layer: i32,
    pub note_type: NoteType,
    pub cut_direction: i32,
}

impl Note {
    pub fn new(id: ObjectId, time: f64, lane: i32, layer: i32, note_type: NoteType) -> Self {
        Self { id, time, lane, layer, note_type, cut_direction: 8 }
    }

    pub fn is_bomb(&self) -> bool {
        self.note_type == NoteType::Bomb
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Obstacle {
    pub id: ObjectId,
    pub time: f64,
    pub duration: f64,
    pub lane: i32,
    pub width: i32,
    pub height: ObstacleHeight,
}

impl Obstacle {
    pub fn new(id: ObjectId, time: f64, duration: f64, lane: i32, width: i32, height: ObstacleHeight) -> Self {
        Self { id, time, duration, lane, width, height }
    }

    pub fn end(&self) -> f64 {
        self.time + self.duration
    }

    /// First lane past the obstacle. Widened so any file-supplied lane and width fit.
    pub fn end_lane(&self) -> i64 {
        i64::from(self.lane) + i64::from(self.width)
    }

    pub fn covers_lane(&self, lane: i32) -> bool {
        lane >= self.lane && i64::from(lane) < self.end_lane()
    }

    /// True while the obstacle occupies the track at `time` (end exclusive).
    pub fn is_active_at(&self, time: f64) -> bool {
        self.time <= time && time < self.end()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LightingEvent {
    pub id: ObjectId,
    pub time: f64,
    pub event_type: i32,
    pub value: i32,
}

impl LightingEvent {
    pub fn new(id: ObjectId, time: f64, event_type: i32, value: i32) -> Self {
        Self { id, time, event_type, value }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomEvent {
    pub id: ObjectId,
    pub time: f64,
    pub event_type: String,
    pub data: serde_json::Value,
}

impl CustomEvent {
    pub fn new(id: ObjectId, time: f64, event_type: impl Into<String>, data: serde_json::Value) -> Self {
        Self { id, time, event_type: event_type.into(), data }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TempoChange {
    pub id: ObjectId,
    pub time: f64,
    pub bpm: f64,
}

impl TempoChange {
    pub fn new(id: ObjectId, time: f64, bpm: f64) -> Self {
        Self { id, time, bpm }
    }
}

/// Any object placed on the level timeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TimedObject {
    Note(Note),
    Obstacle(Obstacle),
    LightingEvent(LightingEvent),
    CustomEvent(CustomEvent),
    TempoChange(TempoChange),
}

impl TimedObject {
    pub fn id(&self) -> ObjectId {
        match self {
            TimedObject::Note(note) => note.id,
            TimedObject::Obstacle(obstacle) => obstacle.id,
            TimedObject::LightingEvent(event) => event.id,
            TimedObject::CustomEvent(event) => event.id,
            TimedObject::TempoChange(change) => change.id,
        }
    }

    pub fn time(&self) -> f64 {
        match self {
            TimedObject::Note(note) => note.time,
            TimedObject::Obstacle(obstacle) => obstacle.time,
            TimedObject::LightingEvent(event) => event.time,
            TimedObject::CustomEvent(event) => event.time,
            TimedObject::TempoChange(change) => change.time,
        }
    }

    pub fn kind(&self) -> ObjectKind {
        match self {
            TimedObject::Note(_) => ObjectKind::Note,
            TimedObject::Obstacle(_) => ObjectKind::Obstacle,
            TimedObject::LightingEvent(_) => ObjectKind::LightingEvent,
            TimedObject::CustomEvent(_) => ObjectKind::CustomEvent,
            TimedObject::TempoChange(_) => ObjectKind::TempoChange,
        }
    }
}

impl fmt::Display for TimedObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimedObject::Note(note) => {
                write!(f, "note {} at beat {:.3} (lane {}, layer {})", note.id, note.time, note.lane, note.layer)
            }
            TimedObject::Obstacle(obstacle) => write!(
                f,
                "obstacle {} at beat {:.3} (lanes {}..{}, {:.3} beats)",
                obstacle.id,
                obstacle.time,
                obstacle.lane,
                obstacle.end_lane(),
                obstacle.duration
            ),
            other => write!(f, "{} {} at beat {:.3}", other.kind(), other.id(), other.time()),
        }
    }
}

impl From<Note> for TimedObject {
    fn from(value: Note) -> Self {
        TimedObject::Note(value)
    }
}

impl From<Obstacle> for TimedObject {
    fn from(value: Obstacle) -> Self {
        TimedObject::Obstacle(value)
    }
}

impl From<LightingEvent> for TimedObject {
    fn from(value: LightingEvent) -> Self {
        TimedObject::LightingEvent(value)
    }
}

impl From<CustomEvent> for TimedObject {
    fn from(value: CustomEvent) -> Self {
        TimedObject::CustomEvent(value)
    }
}

impl From<TempoChange> for TimedObject {
    fn from(value: TempoChange) -> Self {
        TimedObject::TempoChange(value)
    }
}
