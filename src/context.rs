//! Context resolution.
//!
//! For a timed element, resolves the contextual values (clef, instrument,
//! key signature, time signature, tempo) in effect at its offset: the nearest
//! context change at or before the element, or `None` when no change of that
//! class precedes it. Stringification produces plain readable tokens
//! ("G major", "4/4", "treble"), never debug representations.

use crate::score::{Clef, ContextChange, Key, PartContexts, Tempo, TimeSignature};

/// Context values in effect at one point of a part.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedContext {
    pub clef: Option<Clef>,
    pub instrument: Option<String>,
    pub key_signature: Option<Key>,
    pub time_signature: Option<TimeSignature>,
    pub tempo: Option<Tempo>,
}

/// Nearest change at or before `offset`. Change lists are sorted by offset.
fn active_at<T: Clone>(changes: &[ContextChange<T>], offset: f64) -> Option<T> {
    changes
        .iter()
        .take_while(|c| c.offset <= offset)
        .last()
        .map(|c| c.value.clone())
}

/// Resolve every context class for a position within a part.
pub fn resolve(contexts: &PartContexts, offset: f64) -> ResolvedContext {
    ResolvedContext {
        clef: active_at(&contexts.clefs, offset),
        instrument: active_at(&contexts.instruments, offset),
        key_signature: active_at(&contexts.keys, offset),
        time_signature: active_at(&contexts.times, offset),
        tempo: active_at(&contexts.tempos, offset),
    }
}

impl ResolvedContext {
    /// Attribute value strings, ready to attach to an event.
    pub fn clef_str(&self) -> Option<String> {
        self.clef.map(|c| c.to_string())
    }

    pub fn key_signature_str(&self) -> Option<String> {
        self.key_signature.map(|k| k.to_string())
    }

    pub fn time_signature_str(&self) -> Option<String> {
        self.time_signature.map(|t| t.to_string())
    }

    pub fn tempo_str(&self) -> Option<String> {
        self.tempo.map(|t| t.to_string())
    }
}
