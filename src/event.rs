//! # Event Log Model
//!
//! Cases, events, event identifiers and the lifecycle fan-out factory.
//!
//! ## Type Hierarchy
//! ```text
//! Case
//!   ├── name: String (part name or song name)
//!   ├── attributes: Option<BTreeMap<String, String>> (trace-level)
//!   └── trace: Vec<Event> (sorted by timestamp before export)
//!
//! Event
//!   ├── id: u64 (strictly increasing per allocator pass)
//!   ├── name: String (pitch class, MIDI number, interval, "rest", key label)
//!   ├── kind: EventKind (pitch | interval | rest | harmonic_shift | measure)
//!   ├── timestamp: DateTime<Utc>
//!   ├── lifecycle: Lifecycle (start | complete)
//!   ├── measure: Option<u32>
//!   └── attributes: EventAttributes (fixed optional slots)
//! ```
//!
//! One musical element fans out into one event per configured lifecycle
//! phase; the copies differ only in `id`, `lifecycle` and `timestamp`.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Lifecycle phase of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lifecycle {
    Start,
    Complete,
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lifecycle::Start => write!(f, "start"),
            Lifecycle::Complete => write!(f, "complete"),
        }
    }
}

/// Kind of event, written to the log's `type` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Pitch,
    Interval,
    Rest,
    HarmonicShift,
    Measure,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::Pitch => write!(f, "pitch"),
            EventKind::Interval => write!(f, "interval"),
            EventKind::Rest => write!(f, "rest"),
            EventKind::HarmonicShift => write!(f, "harmonic_shift"),
            EventKind::Measure => write!(f, "measure"),
        }
    }
}

/// Contextual attributes attached to an event.
///
/// A fixed set of optional slots rather than an open map, so the event shape
/// is statically checkable. Note events carry the musical context slots;
/// harmony-shift events carry `roman_numeral` and `mode`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventAttributes {
    pub clef: Option<String>,
    pub instrument: Option<String>,
    pub key_signature: Option<String>,
    pub time_signature: Option<String>,
    pub tempo: Option<String>,
    pub part: Option<String>,
    pub roman_numeral: Option<String>,
    pub mode: Option<String>,
}

/// Attribute column names, in the order they appear on exported events.
pub const ATTRIBUTE_KEYS: [&str; 8] = [
    "clef",
    "instrument",
    "key_signature",
    "time_signature",
    "tempo",
    "part",
    "roman_numeral",
    "mode",
];

impl EventAttributes {
    /// Iterate (key, value) pairs for the populated slots, in column order.
    pub fn entries(&self) -> impl Iterator<Item = (&'static str, &str)> {
        let slots = [
            self.clef.as_deref(),
            self.instrument.as_deref(),
            self.key_signature.as_deref(),
            self.time_signature.as_deref(),
            self.tempo.as_deref(),
            self.part.as_deref(),
            self.roman_numeral.as_deref(),
            self.mode.as_deref(),
        ];
        ATTRIBUTE_KEYS
            .into_iter()
            .zip(slots)
            .filter_map(|(key, value)| value.map(|v| (key, v)))
    }

    /// Value of the named column, if populated.
    pub fn get(&self, key: &str) -> Option<&str> {
        match key {
            "clef" => self.clef.as_deref(),
            "instrument" => self.instrument.as_deref(),
            "key_signature" => self.key_signature.as_deref(),
            "time_signature" => self.time_signature.as_deref(),
            "tempo" => self.tempo.as_deref(),
            "part" => self.part.as_deref(),
            "roman_numeral" => self.roman_numeral.as_deref(),
            "mode" => self.mode.as_deref(),
            _ => None,
        }
    }

    /// Set the named column. Unknown keys are ignored.
    pub fn set(&mut self, key: &str, value: String) {
        match key {
            "clef" => self.clef = Some(value),
            "instrument" => self.instrument = Some(value),
            "key_signature" => self.key_signature = Some(value),
            "time_signature" => self.time_signature = Some(value),
            "tempo" => self.tempo = Some(value),
            "part" => self.part = Some(value),
            "roman_numeral" => self.roman_numeral = Some(value),
            "mode" => self.mode = Some(value),
            _ => {}
        }
    }
}

/// One occurrence in a trace.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub id: u64,
    pub name: String,
    pub kind: EventKind,
    pub timestamp: DateTime<Utc>,
    pub lifecycle: Lifecycle,
    pub measure: Option<u32>,
    pub attributes: EventAttributes,
}

/// A trace-bearing unit: one part, or one whole song.
#[derive(Debug, Clone, PartialEq)]
pub struct Case {
    pub name: String,
    pub attributes: Option<BTreeMap<String, String>>,
    pub trace: Vec<Event>,
}

impl Case {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: None,
            trace: Vec::new(),
        }
    }
}

/// Issues strictly increasing event identifiers within one build pass.
///
/// Reset between passes: the note-level pass and a subsequent
/// measure-aggregation pass use independent id spaces.
#[derive(Debug, Default)]
pub struct IdAllocator {
    current: u64,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&mut self) -> u64 {
        self.current += 1;
        self.current
    }

    pub fn reset(&mut self) {
        self.current = 0;
    }
}

/// Produce one event per requested lifecycle phase.
///
/// All produced events share `name`, `kind`, `measure` and `attributes`;
/// only `id`, `lifecycle` and `timestamp` differ.
pub fn events_for_lifecycles(
    ids: &mut IdAllocator,
    name: &str,
    kind: EventKind,
    measure: Option<u32>,
    attributes: &EventAttributes,
    timestamps: &[(Lifecycle, DateTime<Utc>)],
) -> Vec<Event> {
    timestamps
        .iter()
        .map(|&(lifecycle, timestamp)| Event {
            id: ids.next(),
            name: name.to_string(),
            kind,
            timestamp,
            lifecycle,
            measure,
            attributes: attributes.clone(),
        })
        .collect()
}
