//! Pitch extraction and event naming.
//!
//! Classifies a timed element's content and derives the event name(s) and
//! kind under the selected naming mode:
//!
//! - pitch-class mode: names are pitch classes 0-11
//! - pitch+octave mode: names are MIDI numbers
//! - interval mode: names are signed semitone distances from the previous
//!   pitched element of the same part (the first pitched element produces no
//!   event — there is no prior reference)
//!
//! Chords contribute one name per constituent pitch in ascending order
//! (in interval mode, only the highest chord pitch is considered). Rests
//! contribute a "rest" event only when enabled; unpitched elements are
//! skipped entirely.

use crate::event::EventKind;
use crate::score::ElementContent;

/// How events are named.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamingMode {
    PitchClass,
    PitchOctave,
    Interval,
}

/// Stateful per-part extractor. Interval mode keeps one "last pitch" slot,
/// reset when a new part begins.
#[derive(Debug)]
pub struct PitchExtractor {
    mode: NamingMode,
    include_rests: bool,
    show_octave: bool,
    last_pitch: Option<u8>,
}

impl PitchExtractor {
    pub fn new(mode: NamingMode, include_rests: bool, show_octave: bool) -> Self {
        Self {
            mode,
            include_rests,
            show_octave,
            last_pitch: None,
        }
    }

    /// Forget the interval reference pitch. Call when starting a new part.
    pub fn reset_part(&mut self) {
        self.last_pitch = None;
    }

    /// Derive names and kind for one element. `None` means the element emits
    /// nothing (unpitched, disabled rest, or the first pitched element in
    /// interval mode).
    pub fn extract(&mut self, content: &ElementContent) -> Option<(Vec<String>, EventKind)> {
        match content {
            ElementContent::Unpitched => None,
            ElementContent::Rest => {
                if self.include_rests {
                    Some((vec!["rest".to_string()], EventKind::Rest))
                } else {
                    None
                }
            }
            ElementContent::Note { pitch } => self.pitched(&[*pitch]),
            ElementContent::Chord { pitches } => {
                if pitches.is_empty() {
                    return None;
                }
                let mut sorted = pitches.clone();
                sorted.sort_unstable();
                self.pitched(&sorted)
            }
        }
    }

    /// Names for a pitched element, `pitches` sorted ascending.
    fn pitched(&mut self, pitches: &[u8]) -> Option<(Vec<String>, EventKind)> {
        match self.mode {
            NamingMode::PitchClass => Some((
                pitches.iter().map(|p| (p % 12).to_string()).collect(),
                EventKind::Pitch,
            )),
            NamingMode::PitchOctave => Some((
                pitches.iter().map(|p| p.to_string()).collect(),
                EventKind::Pitch,
            )),
            NamingMode::Interval => {
                // A chord is represented by its highest pitch.
                let pitch = *pitches.last()?;
                let Some(last) = self.last_pitch.replace(pitch) else {
                    // First pitched element of the part: reference only.
                    return None;
                };
                let semitones = pitch as i32 - last as i32;
                let name = if self.show_octave {
                    semitones
                } else {
                    semitones.abs() % 12 * semitones.signum()
                };
                Some((vec![name.to_string()], EventKind::Interval))
            }
        }
    }
}
