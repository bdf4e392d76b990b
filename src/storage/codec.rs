//! Canonical YAML encoding for diagrams
//!
//! Diagrams live under version control, so the encoding must be stable:
//! loading and saving an unchanged diagram reproduces the same bytes. The
//! diagram is first converted into a `serde_yaml::Value` tree, then written
//! by a small block-style emitter with fixed rules:
//!
//! - two-space indentation, sequences indented under their key
//! - `x` and `y` keys are always plain and always strings
//! - other scalars are plain only when they read back as the same string,
//!   otherwise double-quoted
//! - empty collections as `{}` / `[]`, no document marker, trailing newline

use serde_yaml::{Mapping, Value};
use thiserror::Error;

use crate::domain::Diagram;

/// Indentation width
const INDENT: usize = 2;

/// Keys always written as plain scalars, typed as strings
const PLAIN_KEYS: &[&str] = &["x", "y"];

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Failed to parse YAML: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Document is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("Unsupported value in document: {0}")]
    Unsupported(String),
}

/// Parses a diagram from its YAML text
pub fn parse(text: &str) -> Result<Diagram, CodecError> {
    Ok(serde_yaml::from_str(text)?)
}

/// Serializes a diagram to its canonical YAML text
pub fn serialize(diagram: &Diagram) -> Result<String, CodecError> {
    let value = serde_yaml::to_value(diagram)?;
    let mut out = String::new();
    emit_document(&value, &mut out)?;
    Ok(out)
}

fn emit_document(value: &Value, out: &mut String) -> Result<(), CodecError> {
    match value {
        Value::Mapping(map) if !map.is_empty() => emit_mapping(map, 0, false, out),
        Value::Sequence(seq) if !seq.is_empty() => emit_sequence(seq, 0, out),
        other => {
            out.push_str(&scalar(other)?);
            out.push('\n');
            Ok(())
        }
    }
}

fn pad(out: &mut String, indent: usize) {
    out.extend(std::iter::repeat(' ').take(indent));
}

/// Writes mapping entries at `indent`. With `inline_first`, the first entry
/// continues a line that already holds a `- ` sequence marker.
fn emit_mapping(
    map: &Mapping,
    indent: usize,
    inline_first: bool,
    out: &mut String,
) -> Result<(), CodecError> {
    for (i, (key, value)) in map.iter().enumerate() {
        if !(inline_first && i == 0) {
            pad(out, indent);
        }
        out.push_str(&key_text(key)?);
        out.push(':');

        match value {
            Value::Mapping(inner) if !inner.is_empty() => {
                out.push('\n');
                emit_mapping(inner, indent + INDENT, false, out)?;
            }
            Value::Sequence(inner) if !inner.is_empty() => {
                out.push('\n');
                emit_sequence(inner, indent + INDENT, out)?;
            }
            other => {
                out.push(' ');
                out.push_str(&scalar(other)?);
                out.push('\n');
            }
        }
    }
    Ok(())
}

fn emit_sequence(seq: &[Value], indent: usize, out: &mut String) -> Result<(), CodecError> {
    for item in seq {
        pad(out, indent);
        out.push('-');

        match item {
            Value::Mapping(inner) if !inner.is_empty() => {
                out.push(' ');
                emit_mapping(inner, indent + INDENT, true, out)?;
            }
            Value::Sequence(inner) if !inner.is_empty() => {
                out.push('\n');
                emit_sequence(inner, indent + INDENT, out)?;
            }
            other => {
                out.push(' ');
                out.push_str(&scalar(other)?);
                out.push('\n');
            }
        }
    }
    Ok(())
}

fn key_text(key: &Value) -> Result<String, CodecError> {
    match key {
        Value::String(s) if PLAIN_KEYS.contains(&s.as_str()) => Ok(s.clone()),
        Value::String(s) => Ok(string_scalar(s)),
        other => scalar(other),
    }
}

fn scalar(value: &Value) -> Result<String, CodecError> {
    match value {
        Value::Null => Ok("null".to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Number(n) => Ok(n.to_string()),
        Value::String(s) => Ok(string_scalar(s)),
        Value::Mapping(m) if m.is_empty() => Ok("{}".to_string()),
        Value::Sequence(s) if s.is_empty() => Ok("[]".to_string()),
        Value::Mapping(_) | Value::Sequence(_) => Err(CodecError::Unsupported(
            "collection in scalar position".to_string(),
        )),
        Value::Tagged(tagged) => Err(CodecError::Unsupported(format!(
            "tagged value {}",
            tagged.tag
        ))),
    }
}

fn string_scalar(s: &str) -> String {
    if is_plain_safe(s) {
        s.to_string()
    } else {
        double_quoted(s)
    }
}

/// A string may be written plain when nothing about it is YAML syntax and
/// the parser reads it back as the very same string.
fn is_plain_safe(s: &str) -> bool {
    let Some(first) = s.chars().next() else {
        return false;
    };

    if "-?:,[]{}#&*!|>'\"%@`".contains(first) {
        return false;
    }

    if s.starts_with(char::is_whitespace)
        || s.ends_with(char::is_whitespace)
        || s.ends_with(':')
        || s.contains(": ")
        || s.contains(" #")
        || s.chars().any(|c| c.is_control() || is_yaml_break(c))
    {
        return false;
    }

    matches!(
        serde_yaml::from_str::<Value>(s),
        Ok(Value::String(ref parsed)) if parsed == s
    )
}

fn is_yaml_break(c: char) -> bool {
    matches!(c, '\u{85}' | '\u{2028}' | '\u{2029}' | '\u{feff}')
}

fn double_quoted(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\0' => out.push_str("\\0"),
            c if c.is_control() || is_yaml_break(c) => {
                out.push_str(&format!("\\u{:04X}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        Dimensions, Edge, EdgeType, Integrations, JiraIntegration, Layout, LayoutDirection,
        LayoutSpacing, Metadata, Node, NodeType, Position, Style,
    };
    use chrono::{TimeZone, Utc};

    fn sample() -> Diagram {
        let mut diagram = Diagram::new("checkout", "Checkout Flow", "1.0.0");
        diagram.created = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        diagram.updated = diagram.created;
        diagram.description = Some("Handles: payment # and shipping".to_string());
        diagram.tags = vec!["billing".to_string(), "yes".to_string()];

        let mut start = Node::new("start", "Start", NodeType::Start, Position::new(10.0, 20.5));
        start.style = Some(Style {
            fill: Some("#fff".to_string()),
            stroke_width: Some(2.0),
            ..Style::default()
        });
        diagram.add_node(start);
        diagram.add_node(Node::new("end", "End", NodeType::End, Position::new(10.0, 200.0)));

        let mut edge = Edge::new("e1", "done", EdgeType::Conditional, "start", "end");
        edge.condition = Some("total > 0".to_string());
        edge.waypoints = vec![Position::new(1.0, 2.0)];
        diagram.add_edge(edge);
        diagram
    }

    #[test]
    fn roundtrip_preserves_every_field() {
        let diagram = sample();
        let text = serialize(&diagram).unwrap();
        let parsed = parse(&text).unwrap();
        assert_eq!(parsed, diagram);
    }

    #[test]
    fn roundtrip_covers_optional_sections() {
        let mut diagram = sample();
        diagram.layout = Some(Layout {
            direction: Some(LayoutDirection::LeftRight),
            spacing: Some(LayoutSpacing {
                node: Some(40.0),
                rank: None,
            }),
        });
        diagram.metadata.set("owner", "payments");
        diagram.metadata.set("retries", 3);
        diagram.metadata.set("ratio", -0.25);
        diagram.metadata.set(
            "limits",
            serde_json::json!({"daily": 1000, "tiers": [1.5, {"name": "gold"}, null], "strict": true}),
        );

        let mut custom = Metadata::new();
        custom.set("ticket", serde_json::json!({"id": 42, "labels": ["a", "b"]}));
        let node = diagram.node_mut("start").unwrap();
        node.dimensions = Some(Dimensions {
            width: 120.0,
            height: 48.5,
        });
        node.integrations = Some(Integrations {
            jira: Some(JiraIntegration {
                issue_key: Some("PAY-12".to_string()),
                project_key: Some("PAY".to_string()),
            }),
            custom,
        });
        node.metadata.set("weight", 7);

        let edge = &mut diagram.edges[0];
        edge.style = Some(Style {
            stroke_dasharray: Some("4 2".to_string()),
            opacity: Some(0.5),
            ..Style::default()
        });
        edge.metadata.set("latency", 1.25);

        let text = serialize(&diagram).unwrap();
        assert!(text.contains("layout:\n  direction: left-right\n"), "{}", text);
        assert!(text.contains("    dimensions:\n      width: 120.0\n      height: 48.5\n"));
        assert!(text.contains("issueKey: PAY-12\n"));
        assert_eq!(parse(&text).unwrap(), diagram);
        assert_eq!(serialize(&parse(&text).unwrap()).unwrap(), text);
    }

    #[test]
    fn empty_optional_sections_roundtrip() {
        let mut diagram = sample();
        diagram.layout = Some(Layout::default());
        let node = diagram.node_mut("end").unwrap();
        node.integrations = Some(Integrations::default());
        node.style = Some(Style::default());

        let text = serialize(&diagram).unwrap();
        assert!(text.contains("layout: {}\n"), "{}", text);
        assert_eq!(parse(&text).unwrap(), diagram);
    }

    #[test]
    fn second_pass_is_byte_identical() {
        let first = serialize(&sample()).unwrap();
        let second = serialize(&parse(&first).unwrap()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn coordinate_keys_are_plain() {
        let text = serialize(&sample()).unwrap();
        assert!(text.contains("    position:\n      x: 10.0\n      y: 20.5\n"), "{}", text);
        assert!(!text.contains("\"y\""));
        assert!(!text.contains("'y'"));
    }

    #[test]
    fn layout_is_block_style_with_two_space_indent() {
        let text = serialize(&sample()).unwrap();
        assert!(text.starts_with("id: checkout\nname: Checkout Flow\n"), "{}", text);
        assert!(text.contains("\nnodes:\n  - id: start\n    name: Start\n    type: start\n"));
        assert!(text.contains("    waypoints:\n      - x: 1.0\n        y: 2.0\n"));
        assert!(text.ends_with('\n'));
        assert!(!text.starts_with("---"));
    }

    #[test]
    fn ambiguous_strings_are_quoted() {
        let text = serialize(&sample()).unwrap();
        assert!(text.contains("description: \"Handles: payment # and shipping\"\n"));
        assert!(text.contains("fill: \"#fff\"\n"));
        assert!(text.contains("version: 1.0.0\n"));
        assert!(text.contains("  - billing\n"));
    }

    #[test]
    fn plain_safety() {
        assert!(is_plain_safe("Checkout Flow"));
        assert!(is_plain_safe("1.0.0"));
        assert!(is_plain_safe("2024-01-02T03:04:05Z"));
        assert!(!is_plain_safe(""));
        assert!(!is_plain_safe("true"));
        assert!(!is_plain_safe("null"));
        assert!(!is_plain_safe("~"));
        assert!(!is_plain_safe("42"));
        assert!(!is_plain_safe("1.5"));
        assert!(!is_plain_safe("- item"));
        assert!(!is_plain_safe("key: value"));
        assert!(!is_plain_safe(" padded"));
        assert!(!is_plain_safe("line\nbreak"));
    }

    #[test]
    fn control_characters_are_escaped() {
        assert_eq!(double_quoted("a\"b\\c\n\t"), "\"a\\\"b\\\\c\\n\\t\"");
        assert_eq!(double_quoted("\u{7}"), "\"\\u0007\"");

        let mut diagram = sample();
        diagram.description = Some("multi\nline \"quoted\"\u{2028}".to_string());
        let parsed = parse(&serialize(&diagram).unwrap()).unwrap();
        assert_eq!(parsed.description, diagram.description);
    }

    #[test]
    fn metadata_keys_are_sorted() {
        let mut diagram = sample();
        diagram.metadata.set("zeta", 1);
        diagram.metadata.set("alpha", serde_json::json!({"nested": [1, "two"]}));
        diagram.metadata.set("empty", serde_json::json!({}));

        let text = serialize(&diagram).unwrap();
        let alpha = text.find("alpha:").unwrap();
        let zeta = text.find("zeta:").unwrap();
        assert!(alpha < zeta);
        assert!(text.contains("  empty: {}\n"));
        assert_eq!(parse(&text).unwrap(), diagram);
    }

    #[test]
    fn hand_edited_text_is_rewritten_canonically() {
        let hand_written = r#"
id: 'login'
name: "Login"
version: 1.0.0
nodes:
- {id: a, name: A, type: start, position: {"x": 0, 'y': 5}}
edges: []
created: 2024-01-02T03:04:05Z
updated: 2024-01-02T03:04:05Z
"#;
        let canonical = serialize(&parse(hand_written).unwrap()).unwrap();
        assert!(canonical.contains("      x: 0.0\n      y: 5.0\n"), "{}", canonical);
        assert_eq!(serialize(&parse(&canonical).unwrap()).unwrap(), canonical);
    }

    #[test]
    fn missing_optional_sections_parse() {
        let diagram = parse("id: bare\nname: Bare\nversion: 0.1.0\n").unwrap();
        assert!(diagram.nodes.is_empty());
        assert!(diagram.edges.is_empty());
        assert!(diagram.parent.is_none());
    }

    #[test]
    fn malformed_text_is_a_parse_error() {
        assert!(matches!(parse("id: [unclosed"), Err(CodecError::Parse(_))));
        assert!(matches!(
            parse("id: x\nnodes:\n  - id: a\n    type: hexagon\n    position: {x: 0, y: 0}\n"),
            Err(CodecError::Parse(_))
        ));
    }
}
