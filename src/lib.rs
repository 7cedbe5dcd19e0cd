//! # scorelog
//!
//! Converts a hierarchical, timed performance representation (a musical
//! score already expanded into absolute-time elements) into ordered,
//! timestamped traces for process-mining analysis.
//!
//! The input is an expanded song document (see [`score::Song`]); the output
//! is a set of [`event::Case`] traces, serializable as an XES event log.
//! Depending on configuration, events are named after pitch classes, MIDI
//! numbers, melodic intervals or rests, aggregated per measure, or replaced
//! by harmonic-shift events derived from per-measure key estimation.

pub mod builder;
pub mod clock;
pub mod config;
pub mod context;
pub mod error;
pub mod event;
pub mod harmony;
pub mod measure;
pub mod pitch;
pub mod score;
pub mod xes;

pub use builder::LogMaker;
pub use config::LogConfig;
pub use error::LogError;
pub use event::{Case, Event, EventKind, Lifecycle};
pub use harmony::{KeyEstimator, KrumhanslEstimator};
pub use score::Song;
pub use xes::to_xes;

/// Convert a song document (YAML) straight to an XES document.
/// This is the main entry point for the library.
pub fn convert(source: &str, config: &LogConfig) -> Result<String, LogError> {
    let song = Song::from_yaml(source)?;
    let cases = LogMaker::new(&song, config).build(&KrumhanslEstimator)?;
    Ok(to_xes(&song.name, &cases))
}
