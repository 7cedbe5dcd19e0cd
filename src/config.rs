//! Conversion options.
//!
//! [`LogConfig`] is the full configuration surface of the engine. It can be
//! built directly, or deserialized from a YAML document (the CLI accepts a
//! `--config` file with the same field names).

use serde::Deserialize;

use crate::event::Lifecycle;
use crate::pitch::NamingMode;

/// Options controlling one log build.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Lifecycle phases to emit per element, in emission order.
    pub lifecycles: Vec<Lifecycle>,
    /// Emit a "rest" event for rest elements.
    pub include_rests: bool,
    /// Produce a single case of harmony-shift events instead of note events.
    pub harmony_shift_as_event: bool,
    /// Collapse note events into one synthetic event per measure/lifecycle.
    pub measure_as_event: bool,
    /// One case per part instead of one merged case per song.
    pub multi_case: bool,
    /// Octave-sensitive names: MIDI numbers instead of pitch classes, and
    /// unreduced interval magnitudes in interval mode.
    pub show_octave: bool,
    /// Name events after the semitone interval from the previous pitch.
    pub intervals: bool,
    /// Keep only the first part's case.
    pub lead_part_only: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            lifecycles: vec![Lifecycle::Start, Lifecycle::Complete],
            include_rests: false,
            harmony_shift_as_event: false,
            measure_as_event: false,
            multi_case: false,
            show_octave: false,
            intervals: false,
            lead_part_only: false,
        }
    }
}

impl LogConfig {
    /// The naming mode selected by the option combination. `intervals` wins
    /// over `show_octave`; with neither set, names are pitch classes.
    pub fn naming_mode(&self) -> NamingMode {
        if self.intervals {
            NamingMode::Interval
        } else if self.show_octave {
            NamingMode::PitchOctave
        } else {
            NamingMode::PitchClass
        }
    }
}
