//! XES serialization.
//!
//! Writes a list of cases as an XES event log (the standard process-mining
//! interchange format). Trace-level `concept:name` is the case name; each
//! event carries `concept:name`, `time:timestamp`, `lifecycle:transition`,
//! `type` and `id`, plus the populated contextual attribute columns.

use chrono::SecondsFormat;

use crate::event::{Case, Event};

/// Serialize the cases of one song into an XES document.
pub fn to_xes(song_name: &str, cases: &[Case]) -> String {
    let mut xml = String::new();

    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    xml.push('\n');
    xml.push_str(r#"<log xes.version="1.0" xes.features="">"#);
    xml.push('\n');
    xml.push_str(r#"  <extension name="Concept" prefix="concept" uri="http://www.xes-standard.org/concept.xesext"/>"#);
    xml.push('\n');
    xml.push_str(r#"  <extension name="Time" prefix="time" uri="http://www.xes-standard.org/time.xesext"/>"#);
    xml.push('\n');
    xml.push_str(r#"  <extension name="Lifecycle" prefix="lifecycle" uri="http://www.xes-standard.org/lifecycle.xesext"/>"#);
    xml.push('\n');
    xml.push_str(&format!(
        "  <string key=\"concept:name\" value=\"{}\"/>\n",
        escape_xml(song_name)
    ));

    for case in cases {
        xml.push_str(&trace_to_xml(case));
    }

    xml.push_str("</log>\n");
    xml
}

fn trace_to_xml(case: &Case) -> String {
    let mut xml = String::new();

    xml.push_str("  <trace>\n");
    xml.push_str(&format!(
        "    <string key=\"concept:name\" value=\"{}\"/>\n",
        escape_xml(&case.name)
    ));

    if let Some(attributes) = &case.attributes {
        for (key, value) in attributes {
            xml.push_str(&format!(
                "    <string key=\"{}\" value=\"{}\"/>\n",
                escape_xml(key),
                escape_xml(value)
            ));
        }
    }

    for event in &case.trace {
        xml.push_str(&event_to_xml(event));
    }

    xml.push_str("  </trace>\n");
    xml
}

fn event_to_xml(event: &Event) -> String {
    let mut xml = String::new();

    xml.push_str("    <event>\n");
    xml.push_str(&format!(
        "      <string key=\"concept:name\" value=\"{}\"/>\n",
        escape_xml(&event.name)
    ));
    xml.push_str(&format!(
        "      <date key=\"time:timestamp\" value=\"{}\"/>\n",
        event.timestamp.to_rfc3339_opts(SecondsFormat::Millis, false)
    ));
    xml.push_str(&format!(
        "      <string key=\"lifecycle:transition\" value=\"{}\"/>\n",
        event.lifecycle
    ));
    xml.push_str(&format!(
        "      <string key=\"type\" value=\"{}\"/>\n",
        event.kind
    ));
    xml.push_str(&format!("      <int key=\"id\" value=\"{}\"/>\n", event.id));

    if let Some(measure) = event.measure {
        xml.push_str(&format!(
            "      <int key=\"measure\" value=\"{}\"/>\n",
            measure
        ));
    }

    for (key, value) in event.attributes.entries() {
        xml.push_str(&format!(
            "      <string key=\"{}\" value=\"{}\"/>\n",
            key,
            escape_xml(value)
        ));
    }

    xml.push_str("    </event>\n");
    xml
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::LOG_EPOCH;
    use crate::event::{EventAttributes, EventKind, Lifecycle};

    fn sample_case() -> Case {
        let mut attributes = EventAttributes::default();
        attributes.part = Some("Piano 1".to_string());
        attributes.clef = Some("treble".to_string());
        Case {
            name: "Piano 1".to_string(),
            attributes: None,
            trace: vec![Event {
                id: 1,
                name: "7".to_string(),
                kind: EventKind::Pitch,
                timestamp: *LOG_EPOCH,
                lifecycle: Lifecycle::Start,
                measure: Some(3),
                attributes,
            }],
        }
    }

    #[test]
    fn test_log_structure_and_extensions() {
        let xml = to_xes("Song", &[sample_case()]);
        assert!(xml.contains(r#"<log xes.version="1.0""#));
        assert!(xml.contains(r#"<extension name="Lifecycle""#));
        assert!(xml.contains(r#"<string key="concept:name" value="Song"/>"#));
        assert!(xml.contains("<trace>"));
        assert!(xml.contains("</log>"));
    }

    #[test]
    fn test_event_fields_serialized() {
        let xml = to_xes("Song", &[sample_case()]);
        assert!(xml.contains(r#"<string key="concept:name" value="7"/>"#));
        assert!(xml.contains(r#"<string key="lifecycle:transition" value="start"/>"#));
        assert!(xml.contains(r#"<string key="type" value="pitch"/>"#));
        assert!(xml.contains(r#"<int key="id" value="1"/>"#));
        assert!(xml.contains(r#"<int key="measure" value="3"/>"#));
        assert!(xml.contains(r#"<string key="clef" value="treble"/>"#));
        assert!(xml.contains(r#"<string key="part" value="Piano 1"/>"#));
        assert!(xml.contains(r#"value="2024-01-01T00:00:00.000+00:00""#));
    }

    #[test]
    fn test_names_are_escaped() {
        let mut case = sample_case();
        case.trace[0].name = "a<b&c".to_string();
        let xml = to_xes("Song", &[case]);
        assert!(xml.contains(r#"value="a&lt;b&amp;c""#));
    }
}
