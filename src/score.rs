//! # Expanded Score Model
//!
//! This module defines the input data model for the log generation engine.
//!
//! ## Type Hierarchy
//! ```text
//! Song
//!   ├── name: String
//!   ├── is_expandable: bool (repeat expansion succeeded upstream)
//!   └── Vec<Part>
//!         ├── name: String (instrument name, used for case naming)
//!         ├── Vec<TimedElement>
//!         │     ├── content: ElementContent (Chord | Note | Rest | Unpitched)
//!         │     ├── offset / end_offset: f64 (quarter-note units)
//!         │     └── measure: Option<u32> (raw number, decreases at repeats)
//!         └── PartContexts (clef / instrument / key / time / tempo changes)
//! ```
//!
//! Score parsing and repeat expansion happen upstream: the collaborator that
//! reads the score format hands this crate an already-expanded song as a YAML
//! document, deserialized here with serde. Elements appear in traversal order
//! with absolute offsets; raw measure numbers restart at repeat boundaries and
//! are renumbered by [`MeasureRenumber`].
//!
//! ## Related Modules
//! - `context` - Resolves the active context values for an element
//! - `builder` - Walks parts and elements to produce events
//! - `harmony` - Consumes [`Song::chordify`] output for key estimation

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;

use crate::error::LogError;

/// Pitch-class names used when displaying keys (sharp/flat spelling chosen
/// per common usage, e.g. Eb rather than D#).
const PITCH_NAMES: [&str; 12] = [
    "C", "C#", "D", "Eb", "E", "F", "F#", "G", "Ab", "A", "Bb", "B",
];

/// Mode of a key: major or minor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Major,
    Minor,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Major => write!(f, "major"),
            Mode::Minor => write!(f, "minor"),
        }
    }
}

/// A key: tonic pitch class (0-11, C = 0) plus mode.
///
/// Displays as a plain readable token ("G major", "b minor" — minor tonics
/// lowercase, matching conventional key labels).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Key {
    pub tonic: u8,
    pub mode: Mode,
}

impl Key {
    pub fn new(tonic: u8, mode: Mode) -> Self {
        Self {
            tonic: tonic % 12,
            mode,
        }
    }

    /// Semitone offsets of the key's scale steps from its tonic.
    /// Major is the diatonic major scale; minor is natural minor.
    pub fn scale_semitones(&self) -> [u8; 7] {
        match self.mode {
            Mode::Major => [0, 2, 4, 5, 7, 9, 11],
            Mode::Minor => [0, 2, 3, 5, 7, 8, 10],
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = PITCH_NAMES[(self.tonic % 12) as usize];
        match self.mode {
            Mode::Major => write!(f, "{} major", name),
            Mode::Minor => write!(f, "{} minor", name.to_lowercase()),
        }
    }
}

/// Time signature (e.g. 4/4, 3/4, 6/8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct TimeSignature {
    pub beats: u8,
    pub beat_type: u8,
}

impl fmt::Display for TimeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.beats, self.beat_type)
    }
}

/// Tempo as quarter notes per minute. Always positive and finite; documents
/// carrying a degenerate bpm are rejected at deserialization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tempo {
    pub bpm: f64,
}

impl<'de> serde::Deserialize<'de> for Tempo {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Raw {
            bpm: f64,
        }

        let raw = Raw::deserialize(deserializer)?;
        if !raw.bpm.is_finite() || raw.bpm <= 0.0 {
            return Err(serde::de::Error::custom(format!(
                "tempo bpm must be positive and finite, got {}",
                raw.bpm
            )));
        }
        Ok(Tempo { bpm: raw.bpm })
    }
}

impl Tempo {
    /// Seconds taken by `offset` quarter notes at this tempo.
    pub fn seconds_for(&self, offset: f64) -> f64 {
        offset * 60.0 / self.bpm
    }
}

impl fmt::Display for Tempo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "quarter={}", self.bpm)
    }
}

/// Clef in effect for a region of a part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Clef {
    Treble,
    Bass,
    Alto,
    Tenor,
    Percussion,
}

impl fmt::Display for Clef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Clef::Treble => write!(f, "treble"),
            Clef::Bass => write!(f, "bass"),
            Clef::Alto => write!(f, "alto"),
            Clef::Tenor => write!(f, "tenor"),
            Clef::Percussion => write!(f, "percussion"),
        }
    }
}

/// Musical content of a timed element.
///
/// A closed set: adding a new kind is a compile-time-checked extension of the
/// match in the pitch extractor, not a runtime type check.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementContent {
    /// Multiple simultaneous pitches (MIDI numbers).
    Chord { pitches: Vec<u8> },
    /// A single pitch (MIDI number).
    Note { pitch: u8 },
    /// Silence.
    Rest,
    /// Percussive content without a determinate pitch; skipped entirely.
    Unpitched,
}

/// Content is written as `rest` / `unpitched` keywords or single-key maps
/// (`note: { pitch: 60 }`, `chord: { pitches: [...] }`) in the song
/// document. A derived enum impl would demand YAML `!tag` notation instead,
/// so the map form is handled by hand.
impl<'de> serde::Deserialize<'de> for ElementContent {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::{Error, MapAccess, Visitor};

        #[derive(Deserialize)]
        struct NoteBody {
            pitch: u8,
        }

        #[derive(Deserialize)]
        struct ChordBody {
            pitches: Vec<u8>,
        }

        struct ContentVisitor;

        impl<'de> Visitor<'de> for ContentVisitor {
            type Value = ElementContent;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(
                    "\"rest\", \"unpitched\", or a map with a single \
                     \"note\" or \"chord\" key",
                )
            }

            fn visit_str<E: Error>(self, value: &str) -> Result<Self::Value, E> {
                match value {
                    "rest" => Ok(ElementContent::Rest),
                    "unpitched" => Ok(ElementContent::Unpitched),
                    other => Err(E::unknown_variant(other, &["rest", "unpitched"])),
                }
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let Some(kind) = map.next_key::<String>()? else {
                    return Err(A::Error::custom("element content map is empty"));
                };
                let content = match kind.as_str() {
                    "note" => {
                        let body: NoteBody = map.next_value()?;
                        ElementContent::Note { pitch: body.pitch }
                    }
                    "chord" => {
                        let body: ChordBody = map.next_value()?;
                        ElementContent::Chord {
                            pitches: body.pitches,
                        }
                    }
                    other => return Err(A::Error::unknown_variant(other, &["note", "chord"])),
                };
                if map.next_key::<String>()?.is_some() {
                    return Err(A::Error::custom(
                        "element content map must have a single key",
                    ));
                }
                Ok(content)
            }
        }

        deserializer.deserialize_any(ContentVisitor)
    }
}

/// One item of a part's element sequence: content plus its position in time.
///
/// Offsets are in quarter-note units from the start of the expanded part.
/// `measure` is the raw measure number, which decreases when the expansion
/// re-enters a repeated section.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TimedElement {
    pub content: ElementContent,
    pub offset: f64,
    pub end_offset: f64,
    pub measure: Option<u32>,
}

/// A context value taking effect at `offset` (quarter-note units).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ContextChange<T> {
    pub offset: f64,
    pub value: T,
}

/// Context-change lists for one part, each sorted by offset.
///
/// The nearest change at or before an element's offset is the value in
/// effect; an empty list means no context of that class is ever active.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct PartContexts {
    pub clefs: Vec<ContextChange<Clef>>,
    pub instruments: Vec<ContextChange<String>>,
    pub keys: Vec<ContextChange<Key>>,
    pub times: Vec<ContextChange<TimeSignature>>,
    pub tempos: Vec<ContextChange<Tempo>>,
}

/// One part of an expanded score.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Part {
    pub name: String,
    pub elements: Vec<TimedElement>,
    #[serde(default)]
    pub contexts: PartContexts,
}

/// An expanded (repeat-unrolled) score.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Song {
    pub name: String,
    #[serde(default = "default_true")]
    pub is_expandable: bool,
    pub parts: Vec<Part>,
}

fn default_true() -> bool {
    true
}

impl Song {
    /// Deserialize a song from its YAML document form.
    pub fn from_yaml(source: &str) -> Result<Self, LogError> {
        Ok(serde_yaml::from_str(source)?)
    }

    /// Reduce all parts into per-measure slices: every pitch sounding in a
    /// measure, the measure's time span, and the tempo in effect there.
    ///
    /// Measures are renumbered across repeat boundaries first, so a repeated
    /// section contributes separate slices for each pass. Tempo is resolved
    /// from the first part's tempo changes (tempo marks are attached to the
    /// lead part).
    pub fn chordify(&self) -> Vec<ChordifiedMeasure> {
        struct Slice {
            offset: f64,
            end_offset: f64,
            pitches: Vec<u8>,
        }

        let mut slices: BTreeMap<u32, Slice> = BTreeMap::new();

        for part in &self.parts {
            let mut renumber = MeasureRenumber::new();
            for element in &part.elements {
                let Some(measure) = renumber.apply(element.measure) else {
                    continue;
                };
                let slice = slices.entry(measure).or_insert(Slice {
                    offset: element.offset,
                    end_offset: element.end_offset,
                    pitches: Vec::new(),
                });
                slice.offset = slice.offset.min(element.offset);
                slice.end_offset = slice.end_offset.max(element.end_offset);
                match &element.content {
                    ElementContent::Chord { pitches } => {
                        slice.pitches.extend_from_slice(pitches)
                    }
                    ElementContent::Note { pitch } => slice.pitches.push(*pitch),
                    ElementContent::Rest | ElementContent::Unpitched => {}
                }
            }
        }

        let tempos = self
            .parts
            .first()
            .map(|p| p.contexts.tempos.as_slice())
            .unwrap_or(&[]);

        slices
            .into_values()
            .enumerate()
            .map(|(index, slice)| ChordifiedMeasure {
                index,
                offset: slice.offset,
                duration: slice.end_offset - slice.offset,
                tempo: tempo_at(tempos, slice.offset),
                pitches: slice.pitches,
            })
            .collect()
    }
}

/// Tempo in effect at `offset`, or `None` if no tempo change precedes it.
fn tempo_at(tempos: &[ContextChange<Tempo>], offset: f64) -> Option<Tempo> {
    tempos
        .iter()
        .take_while(|c| c.offset <= offset)
        .last()
        .map(|c| c.value)
}

/// One measure of the chord-reduced song.
#[derive(Debug, Clone, PartialEq)]
pub struct ChordifiedMeasure {
    /// Zero-based index in the renumbered measure sequence.
    pub index: usize,
    /// Start offset in quarter-note units.
    pub offset: f64,
    /// Length in quarter-note units.
    pub duration: f64,
    /// Tempo in effect at the measure start, if any.
    pub tempo: Option<Tempo>,
    /// Every pitch (MIDI number) sounding during the measure, across parts.
    pub pitches: Vec<u8>,
}

/// Renumbers raw measure numbers into a strictly increasing sequence.
///
/// Raw numbers restart when the expansion re-enters a repeated section; each
/// time a number decreases, the accumulator bumps its offset so the assigned
/// sequence keeps climbing no matter how many passes the repeat has.
#[derive(Debug, Default)]
pub struct MeasureRenumber {
    offset: u32,
    previous_raw: Option<u32>,
    previous_assigned: Option<u32>,
}

impl MeasureRenumber {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map a raw measure number to its renumbered value. `None` passes
    /// through (elements outside any measure stay unnumbered).
    pub fn apply(&mut self, raw: Option<u32>) -> Option<u32> {
        let raw = raw?;
        if let Some(prev) = self.previous_raw {
            if raw < prev {
                // Re-entered a repeat: continue after the last assigned number.
                self.offset = self.previous_assigned.unwrap_or(0);
            }
        }
        let assigned = raw + self.offset;
        self.previous_raw = Some(raw);
        self.previous_assigned = Some(assigned);
        Some(assigned)
    }
}
