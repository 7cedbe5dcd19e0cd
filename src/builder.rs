//! # Log Building
//!
//! Orchestrates one build: walks every part of an expanded song, turns each
//! timed element into lifecycle events, optionally aggregates them per
//! measure, and assembles the final cases.
//!
//! ## Flow
//! ```text
//! Song ──> per-part element walk ──> note/interval/rest events
//!                                        │
//!                    measure_as_event ──> one event per measure/lifecycle
//!                                        │
//!                          sort by timestamp (stable) ──> Case traces
//! ```
//!
//! In harmony-shift mode the note walk is replaced by a single synthetic
//! case of harmonic-shift events over the chord-reduced song.
//!
//! All build state — the id allocator, the interval reference pitch, the
//! measure renumbering — lives inside one [`LogMaker`] and dies with it;
//! nothing is shared across builds.

use crate::clock::{to_timestamp, DEFAULT_TEMPO};
use crate::config::LogConfig;
use crate::context;
use crate::error::LogError;
use crate::event::{events_for_lifecycles, Case, Event, EventAttributes, IdAllocator, Lifecycle};
use crate::harmony::{make_harmony_events, KeyEstimator};
use crate::measure::group_events_by_measure;
use crate::pitch::PitchExtractor;
use crate::score::{MeasureRenumber, Part, Song};

/// Builds the cases of one event log from one song.
pub struct LogMaker<'a> {
    song: &'a Song,
    config: &'a LogConfig,
    ids: IdAllocator,
}

impl<'a> LogMaker<'a> {
    pub fn new(song: &'a Song, config: &'a LogConfig) -> Self {
        Self {
            song,
            config,
            ids: IdAllocator::new(),
        }
    }

    /// Run the build and hand back the finished cases.
    ///
    /// Refuses songs whose repeat expansion failed upstream; every other
    /// degenerate input (no tempo, empty parts, unestimable keys) has a
    /// defined fallback and succeeds.
    pub fn build(mut self, estimator: &dyn KeyEstimator) -> Result<Vec<Case>, LogError> {
        if !self.song.is_expandable {
            return Err(LogError::NotExpandable {
                song: self.song.name.clone(),
            });
        }

        if self.config.harmony_shift_as_event {
            log::info!("building harmony-shift log for '{}'", self.song.name);
            let measures = self.song.chordify();
            let mut case = Case::new("harmonic_shifts");
            case.trace = make_harmony_events(
                &measures,
                estimator,
                &self.config.lifecycles,
                &mut self.ids,
            )?;
            case.trace.sort_by_key(|e| e.timestamp);
            return Ok(vec![case]);
        }

        log::info!("building note log for '{}'", self.song.name);
        let song = self.song;
        let mut named_traces: Vec<(String, Vec<Event>)> = Vec::new();

        for part in &song.parts {
            let case_name = disambiguate_name(&part.name, &named_traces);
            let trace = self.part_trace(part, &case_name);
            named_traces.push((case_name, trace));
        }

        let mut cases = if self.config.multi_case {
            named_traces
                .into_iter()
                .map(|(name, trace)| {
                    let mut case = Case::new(name);
                    case.trace = trace;
                    case
                })
                .collect()
        } else {
            let mut case = Case::new(song.name.clone());
            for (_, trace) in named_traces {
                case.trace.extend(trace);
            }
            vec![case]
        };

        if self.config.lead_part_only {
            cases.truncate(1);
        }

        Ok(cases)
    }

    /// Walk one part's elements and produce its sorted trace.
    fn part_trace(&mut self, part: &Part, case_name: &str) -> Vec<Event> {
        let mut extractor = PitchExtractor::new(
            self.config.naming_mode(),
            self.config.include_rests,
            self.config.show_octave,
        );
        let mut renumber = MeasureRenumber::new();
        let mut events = Vec::new();

        for element in &part.elements {
            let measure = renumber.apply(element.measure);
            let resolved = context::resolve(&part.contexts, element.offset);
            let tempo = resolved.tempo.unwrap_or(DEFAULT_TEMPO);

            let timestamps: Vec<_> = self
                .config
                .lifecycles
                .iter()
                .map(|&lifecycle| {
                    let offset = match lifecycle {
                        Lifecycle::Start => element.offset,
                        Lifecycle::Complete => element.end_offset,
                    };
                    (lifecycle, to_timestamp(tempo, offset))
                })
                .collect();

            let Some((names, kind)) = extractor.extract(&element.content) else {
                continue;
            };

            let attributes = EventAttributes {
                clef: resolved.clef_str(),
                instrument: resolved.instrument.clone(),
                key_signature: resolved.key_signature_str(),
                time_signature: resolved.time_signature_str(),
                tempo: resolved.tempo_str(),
                part: Some(case_name.to_string()),
                roman_numeral: None,
                mode: None,
            };

            for name in names {
                events.extend(events_for_lifecycles(
                    &mut self.ids,
                    &name,
                    kind,
                    measure,
                    &attributes,
                    &timestamps,
                ));
            }
        }

        let mut trace = if self.config.measure_as_event {
            group_events_by_measure(&events, &mut self.ids)
        } else {
            events
        };

        // Stable sort: ties keep production order, which follows the part
        // traversal.
        trace.sort_by_key(|e| e.timestamp);
        trace
    }
}

/// Case name for a part: the instrument name plus an incrementing suffix, so
/// duplicate instrument names stay distinguishable ("Piano 1", "Piano 2").
fn disambiguate_name(name: &str, used: &[(String, Vec<Event>)]) -> String {
    let suffix = used
        .iter()
        .filter(|(existing, _)| existing.contains(name))
        .count()
        + 1;
    format!("{} {}", name, suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harmony::KrumhanslEstimator;
    use crate::score::{
        Clef, ContextChange, ElementContent, PartContexts, Tempo, TimedElement,
    };

    fn note(pitch: u8, offset: f64, measure: u32) -> TimedElement {
        TimedElement {
            content: ElementContent::Note { pitch },
            offset,
            end_offset: offset + 1.0,
            measure: Some(measure),
        }
    }

    fn part(name: &str, elements: Vec<TimedElement>) -> Part {
        Part {
            name: name.to_string(),
            elements,
            contexts: PartContexts {
                clefs: vec![ContextChange {
                    offset: 0.0,
                    value: Clef::Treble,
                }],
                tempos: vec![ContextChange {
                    offset: 0.0,
                    value: Tempo { bpm: 120.0 },
                }],
                ..PartContexts::default()
            },
        }
    }

    fn song(parts: Vec<Part>) -> Song {
        Song {
            name: "Test Song".to_string(),
            is_expandable: true,
            parts,
        }
    }

    #[test]
    fn test_not_expandable_is_refused() {
        let mut song = song(vec![]);
        song.is_expandable = false;
        let config = LogConfig::default();
        let result = LogMaker::new(&song, &config).build(&KrumhanslEstimator);
        assert!(matches!(result, Err(LogError::NotExpandable { .. })));
    }

    #[test]
    fn test_merged_mode_yields_one_case_named_after_song() {
        let song = song(vec![
            part("Piano", vec![note(60, 0.0, 1)]),
            part("Violin", vec![note(64, 0.0, 1)]),
        ]);
        let config = LogConfig::default();
        let cases = LogMaker::new(&song, &config).build(&KrumhanslEstimator).unwrap();
        assert_eq!(cases.len(), 1);
        assert_eq!(cases[0].name, "Test Song");
        // Two notes, two lifecycles each.
        assert_eq!(cases[0].trace.len(), 4);
    }

    #[test]
    fn test_multi_case_yields_one_case_per_part() {
        let song = song(vec![
            part("Piano", vec![note(60, 0.0, 1)]),
            part("Piano", vec![note(64, 0.0, 1)]),
        ]);
        let config = LogConfig {
            multi_case: true,
            ..LogConfig::default()
        };
        let cases = LogMaker::new(&song, &config).build(&KrumhanslEstimator).unwrap();
        assert_eq!(cases.len(), 2);
        assert_eq!(cases[0].name, "Piano 1");
        assert_eq!(cases[1].name, "Piano 2");
    }

    #[test]
    fn test_lead_part_only_keeps_first_case() {
        let song = song(vec![
            part("Piano", vec![note(60, 0.0, 1)]),
            part("Violin", vec![note(64, 0.0, 1)]),
        ]);
        let config = LogConfig {
            multi_case: true,
            lead_part_only: true,
            ..LogConfig::default()
        };
        let cases = LogMaker::new(&song, &config).build(&KrumhanslEstimator).unwrap();
        assert_eq!(cases.len(), 1);
        assert_eq!(cases[0].name, "Piano 1");
    }

    #[test]
    fn test_trace_sorted_by_timestamp_and_sort_idempotent() {
        let song = song(vec![part(
            "Piano",
            vec![note(60, 0.0, 1), note(62, 1.0, 1), note(64, 2.0, 1)],
        )]);
        let config = LogConfig::default();
        let cases = LogMaker::new(&song, &config).build(&KrumhanslEstimator).unwrap();
        let trace = &cases[0].trace;
        assert!(trace.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));

        let mut resorted = trace.clone();
        resorted.sort_by_key(|e| e.timestamp);
        assert_eq!(&resorted, trace);
    }

    #[test]
    fn test_event_ids_strictly_increase_within_build() {
        let song = song(vec![part(
            "Piano",
            vec![note(60, 0.0, 1), note(62, 1.0, 1)],
        )]);
        let config = LogConfig::default();
        let cases = LogMaker::new(&song, &config).build(&KrumhanslEstimator).unwrap();
        let mut ids: Vec<u64> = cases[0].trace.iter().map(|e| e.id).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_events_carry_resolved_context_attributes() {
        let song = song(vec![part("Piano", vec![note(60, 0.0, 1)])]);
        let config = LogConfig::default();
        let cases = LogMaker::new(&song, &config).build(&KrumhanslEstimator).unwrap();
        let event = &cases[0].trace[0];
        assert_eq!(event.attributes.clef.as_deref(), Some("treble"));
        assert_eq!(event.attributes.tempo.as_deref(), Some("quarter=120"));
        assert_eq!(event.attributes.part.as_deref(), Some("Piano 1"));
        assert_eq!(event.attributes.key_signature, None);
    }

    #[test]
    fn test_fallback_tempo_when_no_tempo_context() {
        let song = song(vec![Part {
            name: "Piano".to_string(),
            elements: vec![note(60, 80.0, 1)],
            contexts: PartContexts::default(),
        }]);
        let config = LogConfig {
            lifecycles: vec![Lifecycle::Start],
            ..LogConfig::default()
        };
        let cases = LogMaker::new(&song, &config).build(&KrumhanslEstimator).unwrap();
        // 80 quarter notes at the 80 BPM fallback = 60 seconds.
        let event = &cases[0].trace[0];
        assert_eq!(
            event.timestamp - *crate::clock::LOG_EPOCH,
            chrono::Duration::seconds(60)
        );
    }

    #[test]
    fn test_measure_as_event_aggregates_and_reissues_ids() {
        let song = song(vec![part(
            "Piano",
            vec![note(60, 0.0, 1), note(62, 1.0, 1), note(64, 4.0, 2)],
        )]);
        let config = LogConfig {
            measure_as_event: true,
            lifecycles: vec![Lifecycle::Start],
            ..LogConfig::default()
        };
        let cases = LogMaker::new(&song, &config).build(&KrumhanslEstimator).unwrap();
        let trace = &cases[0].trace;
        assert_eq!(trace.len(), 2);
        assert_eq!(trace[0].name, "0_2");
        assert_eq!(trace[1].name, "4");
        assert_eq!(trace[0].id, 1);
        assert_eq!(trace[1].id, 2);
    }

    #[test]
    fn test_harmony_shift_mode_yields_synthetic_case() {
        let c_scale: Vec<TimedElement> = [60u8, 62, 64, 65, 67, 69, 71, 72]
            .iter()
            .enumerate()
            .map(|(i, &p)| note(p, i as f64, 1 + (i / 4) as u32))
            .collect();
        let song = song(vec![part("Piano", c_scale)]);
        let config = LogConfig {
            harmony_shift_as_event: true,
            ..LogConfig::default()
        };
        let cases = LogMaker::new(&song, &config).build(&KrumhanslEstimator).unwrap();
        assert_eq!(cases.len(), 1);
        assert_eq!(cases[0].name, "harmonic_shifts");
        assert!(cases[0]
            .trace
            .iter()
            .all(|e| e.kind == crate::event::EventKind::HarmonicShift));
    }

    #[test]
    fn test_repeated_section_renumbered_into_increasing_measures() {
        let elements = vec![
            note(60, 0.0, 1),
            note(62, 4.0, 2),
            // Repeat pass: raw measure numbers restart.
            note(60, 8.0, 1),
            note(62, 12.0, 2),
        ];
        let song = song(vec![part("Piano", elements)]);
        let config = LogConfig {
            lifecycles: vec![Lifecycle::Start],
            ..LogConfig::default()
        };
        let cases = LogMaker::new(&song, &config).build(&KrumhanslEstimator).unwrap();
        let measures: Vec<_> = cases[0].trace.iter().map(|e| e.measure).collect();
        assert_eq!(
            measures,
            vec![Some(1), Some(2), Some(3), Some(4)]
        );
    }
}
