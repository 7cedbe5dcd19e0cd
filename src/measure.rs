//! Measure aggregation.
//!
//! Collapses note-level events into one synthetic "measure" event per
//! (measure, lifecycle) group: names joined by underscores in trace order,
//! the earliest timestamp for `start` groups and the latest for `complete`
//! groups, and each attribute column reduced to its most frequent value
//! (ties keep the first-encountered value). Ids are reissued from a fresh
//! allocator pass.

use std::collections::BTreeMap;

use crate::event::{Event, EventAttributes, EventKind, IdAllocator, Lifecycle, ATTRIBUTE_KEYS};

/// Aggregate events by measure and lifecycle. Events outside any measure
/// have no group to join and are dropped. Empty input yields an empty
/// output, not an error.
pub fn group_events_by_measure(events: &[Event], ids: &mut IdAllocator) -> Vec<Event> {
    ids.reset();

    let mut groups: BTreeMap<(u32, Lifecycle), Vec<&Event>> = BTreeMap::new();
    for event in events {
        let Some(measure) = event.measure else {
            continue;
        };
        groups
            .entry((measure, event.lifecycle))
            .or_default()
            .push(event);
    }

    groups
        .into_iter()
        .map(|((measure, lifecycle), members)| {
            let name = members
                .iter()
                .map(|e| e.name.as_str())
                .collect::<Vec<_>>()
                .join("_");

            let timestamp = match lifecycle {
                Lifecycle::Start => members.iter().map(|e| e.timestamp).min(),
                Lifecycle::Complete => members.iter().map(|e| e.timestamp).max(),
            }
            .unwrap_or_else(|| members[0].timestamp);

            let mut attributes = EventAttributes::default();
            for key in ATTRIBUTE_KEYS {
                if let Some(value) = most_frequent(&members, key) {
                    attributes.set(key, value.to_string());
                }
            }

            Event {
                id: ids.next(),
                name,
                kind: EventKind::Measure,
                timestamp,
                lifecycle,
                measure: Some(measure),
                attributes,
            }
        })
        .collect()
}

/// Most frequent value of one attribute column among the group members,
/// first-encountered value winning ties. `None` when no member populates
/// the column.
fn most_frequent<'a>(members: &[&'a Event], key: &str) -> Option<&'a str> {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for event in members {
        let Some(value) = event.attributes.get(key) else {
            continue;
        };
        match counts.iter_mut().find(|(v, _)| *v == value) {
            Some((_, n)) => *n += 1,
            None => counts.push((value, 1)),
        }
    }
    // counts preserves first-encountered order; strict comparison keeps the
    // earliest value on ties.
    let mut best: Option<(&str, usize)> = None;
    for &(value, n) in &counts {
        if best.map_or(true, |(_, bn)| n > bn) {
            best = Some((value, n));
        }
    }
    best.map(|(value, _)| value)
}
