//! # Harmonic Shift Detection
//!
//! Turns a per-measure key-estimate sequence into one event per harmonic
//! shift.
//!
//! ## Algorithm
//! 1. Estimate a key for every measure of the chord-reduced song (sliding
//!    window, default one measure). A measure with no pitched content keeps
//!    the most recently known key.
//! 2. Express each measure's key as a harmony signature: the scale degree of
//!    its tonic relative to the song's base key, paired with its mode.
//!    Tonics off the base scale get a fractional degree and always sort
//!    between two diatonic steps.
//! 3. Emit an event whenever the signature changes (and always for the final
//!    measure, flushing the last segment), never for measure 0 alone. The
//!    event is named after the new key; its attributes describe the segment
//!    that is ending. Segments are contiguous: each event's start timestamp
//!    is where the previous segment ended.
//!
//! ## Key estimation
//! Estimation internals are deliberately replaceable: the detector only
//! consults a [`KeyEstimator`]. The default implementation correlates
//! pitch-class histograms against the Krumhansl-Kessler major/minor profiles.

use std::fmt;

use chrono::{DateTime, Utc};

use crate::clock::{to_timestamp, DEFAULT_TEMPO, LOG_EPOCH};
use crate::error::LogError;
use crate::event::{
    events_for_lifecycles, Event, EventAttributes, EventKind, IdAllocator, Lifecycle,
};
use crate::score::{ChordifiedMeasure, Key, Mode};

/// Position of a tonic within a base scale.
///
/// `Diatonic(n)` is the 1-based ordinal of a scale step. `Chromatic(n)` marks
/// a tonic between steps: `n` base-scale steps lie strictly below it, and it
/// displays as the fractional degree `n.5`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleDegree {
    Diatonic(u8),
    Chromatic(u8),
}

impl fmt::Display for ScaleDegree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScaleDegree::Diatonic(n) => write!(f, "{}", n),
            ScaleDegree::Chromatic(n) => write!(f, "{}.5", n),
        }
    }
}

/// Scale degree of `tonic` relative to `base`.
pub fn degree_of(base: Key, tonic: u8) -> ScaleDegree {
    let semitones = base.scale_semitones();
    let distance = (12 + tonic as i32 - base.tonic as i32) as u8 % 12;
    match semitones.iter().position(|&s| s == distance) {
        Some(step) => ScaleDegree::Diatonic(step as u8 + 1),
        None => {
            let below = semitones.iter().filter(|&&s| s < distance).count();
            ScaleDegree::Chromatic(below as u8)
        }
    }
}

/// The (degree, mode) pair summarizing one measure's estimated key relative
/// to the song's base key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HarmonySignature {
    pub degree: ScaleDegree,
    pub mode: Mode,
}

/// Key oracle consulted by the shift detector.
pub trait KeyEstimator {
    /// One estimate per measure; `None` when the window holds no pitched
    /// content. `window` measures starting at each index feed the estimate
    /// (window 1 estimates each measure independently).
    fn key_by_measure(&self, measures: &[ChordifiedMeasure], window: usize) -> Vec<Option<Key>>;

    /// Base key over the whole song, `None` when nothing is pitched.
    fn overall_key(&self, measures: &[ChordifiedMeasure]) -> Option<Key>;
}

/// Krumhansl-Kessler profile correlation over pitch-class histograms.
#[derive(Debug, Default)]
pub struct KrumhanslEstimator;

const MAJOR_PROFILE: [f64; 12] = [
    6.35, 2.23, 3.48, 2.33, 4.38, 4.09, 2.52, 5.19, 2.39, 3.66, 2.29, 2.88,
];
const MINOR_PROFILE: [f64; 12] = [
    6.33, 2.68, 3.52, 5.38, 2.60, 3.53, 2.54, 4.75, 3.98, 2.69, 3.34, 3.17,
];

impl KrumhanslEstimator {
    fn best_key(histogram: &[f64; 12]) -> Option<Key> {
        if histogram.iter().all(|&c| c == 0.0) {
            return None;
        }
        let mut best: Option<(f64, Key)> = None;
        for tonic in 0..12u8 {
            for (mode, profile) in [
                (Mode::Major, &MAJOR_PROFILE),
                (Mode::Minor, &MINOR_PROFILE),
            ] {
                let score = correlation(histogram, profile, tonic);
                if best.map_or(true, |(s, _)| score > s) {
                    best = Some((score, Key::new(tonic, mode)));
                }
            }
        }
        best.map(|(_, key)| key)
    }
}

/// Pearson correlation between the histogram and the profile rotated to
/// `tonic`.
fn correlation(histogram: &[f64; 12], profile: &[f64; 12], tonic: u8) -> f64 {
    let mean_h: f64 = histogram.iter().sum::<f64>() / 12.0;
    let mean_p: f64 = profile.iter().sum::<f64>() / 12.0;
    let mut num = 0.0;
    let mut den_h = 0.0;
    let mut den_p = 0.0;
    for pc in 0..12 {
        let h = histogram[pc] - mean_h;
        let p = profile[(pc + 12 - tonic as usize) % 12] - mean_p;
        num += h * p;
        den_h += h * h;
        den_p += p * p;
    }
    if den_h == 0.0 || den_p == 0.0 {
        return 0.0;
    }
    num / (den_h * den_p).sqrt()
}

fn histogram(measures: &[ChordifiedMeasure]) -> [f64; 12] {
    let mut counts = [0.0; 12];
    for measure in measures {
        for &pitch in &measure.pitches {
            counts[(pitch % 12) as usize] += 1.0;
        }
    }
    counts
}

impl KeyEstimator for KrumhanslEstimator {
    fn key_by_measure(&self, measures: &[ChordifiedMeasure], window: usize) -> Vec<Option<Key>> {
        let window = window.max(1);
        (0..measures.len())
            .map(|i| {
                let end = (i + window).min(measures.len());
                Self::best_key(&histogram(&measures[i..end]))
            })
            .collect()
    }

    fn overall_key(&self, measures: &[ChordifiedMeasure]) -> Option<Key> {
        Self::best_key(&histogram(measures))
    }
}

/// Detect harmonic shifts and produce their events.
///
/// Fails only on a contract violation by the estimator (estimate count not
/// matching the measure count). A song with no pitched content yields no
/// events.
pub fn make_harmony_events(
    measures: &[ChordifiedMeasure],
    estimator: &dyn KeyEstimator,
    lifecycles: &[Lifecycle],
    ids: &mut IdAllocator,
) -> Result<Vec<Event>, LogError> {
    let Some(base_key) = estimator.overall_key(measures) else {
        return Ok(Vec::new());
    };

    let estimated_keys = estimator.key_by_measure(measures, 1);
    if estimated_keys.len() != measures.len() {
        return Err(LogError::KeyMeasureMismatch {
            keys: estimated_keys.len(),
            measures: measures.len(),
        });
    }

    let want_start = lifecycles.contains(&Lifecycle::Start);
    let want_complete = lifecycles.contains(&Lifecycle::Complete);

    let mut events = Vec::new();
    let mut last_signature: Option<HarmonySignature> = None;
    let mut last_key = base_key;
    let mut segment_start: DateTime<Utc> = *LOG_EPOCH;

    for (measure_idx, estimate) in estimated_keys.iter().enumerate() {
        let key = match estimate {
            Some(key) => *key,
            None => {
                log::debug!(
                    "no key estimable for measure {}, keeping {}",
                    measure_idx,
                    last_key
                );
                last_key
            }
        };
        last_key = key;

        let signature = HarmonySignature {
            degree: degree_of(base_key, key.tonic),
            mode: key.mode,
        };

        let is_last = measure_idx == estimated_keys.len() - 1;
        let shifted = last_signature != Some(signature);

        if (shifted || is_last) && measure_idx > 0 {
            let measure = &measures[measure_idx];
            let tempo = measure.tempo.unwrap_or(DEFAULT_TEMPO);

            let mut timestamps = Vec::new();
            if want_start {
                timestamps.push((Lifecycle::Start, segment_start));
            }
            if want_complete {
                timestamps.push((Lifecycle::Complete, to_timestamp(tempo, measure.offset)));
            }

            // The attributes describe the segment that is ending; the name
            // is the key the music shifted to.
            let mut attributes = EventAttributes::default();
            if let Some(prev) = last_signature {
                attributes.roman_numeral = Some(prev.degree.to_string());
                attributes.mode = Some(prev.mode.to_string());
            }

            events.extend(events_for_lifecycles(
                ids,
                &key.to_string(),
                EventKind::HarmonicShift,
                Some(measure_idx as u32),
                &attributes,
                &timestamps,
            ));

            // The next segment begins where this measure ends.
            segment_start = to_timestamp(tempo, measure.offset + measure.duration);
        }

        last_signature = Some(signature);
    }

    Ok(events)
}
