//! Timestamp derivation.
//!
//! Converts tempo-aware musical-duration offsets into absolute timestamps,
//! anchored at a fixed epoch. Only relative ordering of the resulting
//! timestamps is meaningful; the epoch itself carries no semantics.

use chrono::{DateTime, Duration, TimeZone, Utc};
use once_cell::sync::Lazy;

use crate::score::Tempo;

/// Fixed anchor for all generated timestamps.
pub static LOG_EPOCH: Lazy<DateTime<Utc>> =
    Lazy::new(|| Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());

/// Substitute tempo when no tempo mark is in effect at a position.
/// A defined degenerate-input policy, not an error.
pub const DEFAULT_TEMPO: Tempo = Tempo { bpm: 80.0 };

/// Absolute timestamp of `offset` quarter notes at `tempo`, relative to the
/// epoch. Sub-second precision is kept to the microsecond.
pub fn to_timestamp(tempo: Tempo, offset: f64) -> DateTime<Utc> {
    let micros = (tempo.seconds_for(offset) * 1_000_000.0).round() as i64;
    *LOG_EPOCH + Duration::microseconds(micros)
}
