//! Integration tests for the score-to-event-log converter
//!
//! Tests the full pipeline from an expanded song document to XES output.

use scorelog::event::Lifecycle;
use scorelog::{convert, LogConfig};

fn sample_song() -> &'static str {
    r#"
name: Sample
parts:
  - name: Piano
    elements:
      - { content: { note: { pitch: 60 } }, offset: 0.0, end_offset: 1.0, measure: 1 }
      - { content: { note: { pitch: 64 } }, offset: 1.0, end_offset: 2.0, measure: 1 }
      - { content: rest, offset: 2.0, end_offset: 3.0, measure: 1 }
      - { content: { chord: { pitches: [67, 60, 64] } }, offset: 3.0, end_offset: 4.0, measure: 1 }
      - { content: { note: { pitch: 67 } }, offset: 4.0, end_offset: 5.0, measure: 2 }
    contexts:
      clefs:
        - { offset: 0.0, value: treble }
      tempos:
        - { offset: 0.0, value: { bpm: 120.0 } }
      keys:
        - { offset: 0.0, value: { tonic: 0, mode: major } }
      times:
        - { offset: 0.0, value: { beats: 4, beat_type: 4 } }
"#
}

#[test]
fn test_convert_default_config() {
    let xes = convert(sample_song(), &LogConfig::default()).unwrap();
    assert!(xes.contains(r#"<string key="concept:name" value="Sample"/>"#));
    // Pitch-class names: note 60 -> "0", chord pitches ascend 0, 4, 7.
    assert!(xes.contains(r#"<string key="concept:name" value="0"/>"#));
    assert!(xes.contains(r#"<string key="concept:name" value="7"/>"#));
    assert!(xes.contains(r#"<string key="type" value="pitch"/>"#));
    assert!(xes.contains(r#"<string key="key_signature" value="C major"/>"#));
    assert!(xes.contains(r#"<string key="time_signature" value="4/4"/>"#));
    // Rests are excluded by default.
    assert!(!xes.contains(r#"value="rest""#));
}

#[test]
fn test_convert_with_rests_and_octaves() {
    let config = LogConfig {
        include_rests: true,
        show_octave: true,
        ..LogConfig::default()
    };
    let xes = convert(sample_song(), &config).unwrap();
    assert!(xes.contains(r#"<string key="concept:name" value="60"/>"#));
    assert!(xes.contains(r#"<string key="concept:name" value="rest"/>"#));
    assert!(xes.contains(r#"<string key="type" value="rest"/>"#));
}

#[test]
fn test_convert_intervals() {
    let config = LogConfig {
        intervals: true,
        show_octave: true,
        lifecycles: vec![Lifecycle::Complete],
        ..LogConfig::default()
    };
    let xes = convert(sample_song(), &config).unwrap();
    // 60 -> 64 -> 67 (chord top) -> 67: intervals 4, 3, 0. The first
    // pitched element yields no event.
    assert!(xes.contains(r#"<string key="concept:name" value="4"/>"#));
    assert!(xes.contains(r#"<string key="concept:name" value="3"/>"#));
    assert!(xes.contains(r#"<string key="type" value="interval"/>"#));
}

#[test]
fn test_convert_measure_as_event() {
    let config = LogConfig {
        measure_as_event: true,
        lifecycles: vec![Lifecycle::Start],
        ..LogConfig::default()
    };
    let xes = convert(sample_song(), &config).unwrap();
    // Measure 1 events collapse into one underscore-joined name.
    assert!(xes.contains(r#"<string key="concept:name" value="0_4_0_4_7"/>"#));
    assert!(xes.contains(r#"<string key="type" value="measure"/>"#));
}

#[test]
fn test_convert_harmony_shift_mode() {
    let config = LogConfig {
        harmony_shift_as_event: true,
        ..LogConfig::default()
    };
    let xes = convert(sample_song(), &config).unwrap();
    assert!(xes.contains(r#"<string key="concept:name" value="harmonic_shifts"/>"#));
    assert!(xes.contains(r#"<string key="type" value="harmonic_shift"/>"#));
}

#[test]
fn test_convert_refuses_unexpandable_song() {
    let source = r#"
name: Broken
is_expandable: false
parts: []
"#;
    let result = convert(source, &LogConfig::default());
    assert!(result.is_err());
    let message = result.unwrap_err().to_string();
    assert!(message.contains("not expandable"));
}

#[test]
fn test_convert_rejects_malformed_document() {
    assert!(convert("not: [valid", &LogConfig::default()).is_err());
}

#[test]
fn test_convert_rejects_zero_bpm_tempo() {
    // A zero tempo must surface as a document error, not abort conversion.
    let source = sample_song().replace("bpm: 120.0", "bpm: 0.0");
    let result = convert(&source, &LogConfig::default());
    assert!(result.is_err());
    let message = result.unwrap_err().to_string();
    assert!(message.contains("Invalid score"));
}

#[test]
fn test_output_writable_and_rereadable() {
    let xes = convert(sample_song(), &LogConfig::default()).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sample.xes");
    std::fs::write(&path, &xes).unwrap();
    let reread = std::fs::read_to_string(&path).unwrap();
    assert_eq!(reread, xes);
}

#[test]
fn test_lifecycle_fanout_doubles_event_count() {
    let single = LogConfig {
        lifecycles: vec![Lifecycle::Start],
        ..LogConfig::default()
    };
    let both = LogConfig::default();
    let xes_single = convert(sample_song(), &single).unwrap();
    let xes_both = convert(sample_song(), &both).unwrap();
    let count = |xml: &str| xml.matches("<event>").count();
    assert_eq!(count(&xes_both), 2 * count(&xes_single));
}
