//! Property tests for the diagram model
//!
//! Generates valid diagrams and checks that validation accepts them, that
//! the canonical encoding round-trips, and that re-encoding is byte-stable.

use chrono::{TimeZone, Utc};
use proptest::prelude::*;

use flowgen::domain::{
    validate, Diagram, Dimensions, Edge, EdgeType, Integrations, JiraIntegration, Layout,
    LayoutDirection, LayoutSpacing, Metadata, Node, NodeType, Position, Style, ValidationCode,
};
use flowgen::storage::codec;
use serde_json::Value as Json;

/// Short text, heavy on characters that mean something in YAML
fn text() -> impl Strategy<Value = String> {
    r#"[a-zA-Z0-9 :#'"\\_.,!?&*|>%@`{}\[\]-]{1,24}"#
}

fn node_type() -> impl Strategy<Value = NodeType> {
    prop::sample::select(NodeType::all().to_vec())
}

fn edge_type() -> impl Strategy<Value = EdgeType> {
    prop_oneof![
        Just(EdgeType::Sequence),
        Just(EdgeType::Conditional),
        Just(EdgeType::DataFlow),
        Just(EdgeType::Association),
    ]
}

/// Metadata values: scalars of every kind, nested in arrays and objects
fn json_value() -> impl Strategy<Value = Json> {
    let leaf = prop_oneof![
        Just(Json::Null),
        any::<bool>().prop_map(Json::from),
        any::<i64>().prop_map(Json::from),
        (-1.0e6f64..1.0e6).prop_map(Json::from),
        text().prop_map(Json::from),
    ];
    leaf.prop_recursive(3, 16, 4, |inner| {
        prop_oneof![
            proptest::collection::vec(inner.clone(), 0..4).prop_map(Json::from),
            proptest::collection::btree_map("[a-z]{1,6}", inner, 0..4)
                .prop_map(|entries| Json::Object(entries.into_iter().collect())),
        ]
    })
}

fn arb_metadata() -> impl Strategy<Value = Metadata> {
    proptest::collection::btree_map("[a-z]{1,8}", json_value(), 0..3).prop_map(|entries| {
        let mut metadata = Metadata::new();
        for (key, value) in entries {
            metadata.set(key, value);
        }
        metadata
    })
}

prop_compose! {
    fn arb_style()(
        fill in proptest::option::of("#[0-9a-f]{6}"),
        stroke in proptest::option::of(text()),
        stroke_width in proptest::option::of(0.0f64..20.0),
        opacity in proptest::option::of(0.0f64..1.0),
        font_family in proptest::option::of(text()),
    ) -> Style {
        Style {
            fill,
            stroke,
            stroke_width,
            opacity,
            font_family,
            ..Style::default()
        }
    }
}

fn arb_dimensions() -> impl Strategy<Value = Dimensions> {
    (1.0f64..1000.0, 1.0f64..1000.0).prop_map(|(width, height)| Dimensions { width, height })
}

prop_compose! {
    fn arb_integrations()(
        jira in proptest::option::of((
            proptest::option::of("[A-Z]{2,5}-[0-9]{1,4}"),
            proptest::option::of("[A-Z]{2,5}"),
        )),
        custom in arb_metadata(),
    ) -> Integrations {
        Integrations {
            jira: jira.map(|(issue_key, project_key)| JiraIntegration {
                issue_key,
                project_key,
            }),
            custom,
        }
    }
}

fn arb_layout() -> impl Strategy<Value = Layout> {
    let direction = prop_oneof![
        Just(LayoutDirection::TopBottom),
        Just(LayoutDirection::BottomTop),
        Just(LayoutDirection::LeftRight),
        Just(LayoutDirection::RightLeft),
    ];
    let spacing = (
        proptest::option::of(1.0f64..500.0),
        proptest::option::of(1.0f64..500.0),
    )
        .prop_map(|(node, rank)| LayoutSpacing { node, rank });

    (proptest::option::of(direction), proptest::option::of(spacing))
        .prop_map(|(direction, spacing)| Layout { direction, spacing })
}

prop_compose! {
    fn arb_node()(
        name in text(),
        node_type in node_type(),
        x in -5000.0f64..5000.0,
        y in -5000.0f64..5000.0,
        description in proptest::option::of(text()),
        tags in proptest::collection::vec(text(), 0..3),
        dimensions in proptest::option::of(arb_dimensions()),
        style in proptest::option::of(arb_style()),
        integrations in proptest::option::of(arb_integrations()),
        metadata in arb_metadata(),
    ) -> Node {
        let mut node = Node::new("", name, node_type, Position::new(x, y));
        node.description = description;
        node.tags = tags;
        node.dimensions = dimensions;
        node.style = style;
        node.integrations = integrations;
        node.metadata = metadata;
        node
    }
}

prop_compose! {
    fn arb_diagram()(
        id in "[a-z][a-z0-9_-]{0,12}",
        name in text(),
        description in proptest::option::of(text()),
        version in (0u32..20, 0u32..20, 0u32..100),
        tags in proptest::collection::vec(text(), 0..4),
        nodes in proptest::collection::vec(arb_node(), 1..6),
        edges in proptest::collection::vec(
            (
                any::<prop::sample::Index>(),
                any::<prop::sample::Index>(),
                text(),
                edge_type(),
                proptest::option::of(text()),
                proptest::option::of(arb_style()),
                proptest::collection::vec((-5000.0f64..5000.0, -5000.0f64..5000.0), 0..3),
            ),
            0..6,
        ),
        created in 0i64..4_000_000_000,
        hierarchy in (
            proptest::option::of("[a-z][a-z0-9-]{0,8}"),
            proptest::collection::btree_set("[a-z][a-z0-9-]{0,8}", 0..3),
        ),
        metadata in arb_metadata(),
        layout in proptest::option::of(arb_layout()),
    ) -> Diagram {
        let (major, minor, patch) = version;
        let mut diagram = Diagram::new(id, name, format!("{}.{}.{}", major, minor, patch));
        diagram.description = description;
        diagram.tags = tags;

        for (i, mut node) in nodes.into_iter().enumerate() {
            node.id = format!("n{}", i);
            diagram.add_node(node);
        }

        let count = diagram.nodes.len();
        for (i, (from, to, name, edge_type, condition, style, waypoints)) in
            edges.into_iter().enumerate()
        {
            let mut edge = Edge::new(
                format!("e{}", i),
                name,
                edge_type,
                format!("n{}", from.index(count)),
                format!("n{}", to.index(count)),
            );
            edge.condition = condition;
            edge.style = style;
            edge.waypoints = waypoints
                .into_iter()
                .map(|(x, y)| Position::new(x, y))
                .collect();
            diagram.add_edge(edge);
        }

        let timestamp = Utc.timestamp_opt(created, 0).unwrap();
        diagram.created = timestamp;
        diagram.updated = timestamp;
        let (parent, children) = hierarchy;
        diagram.parent = parent;
        diagram.children = children.into_iter().collect();
        diagram.metadata = metadata;
        diagram.layout = layout;

        diagram
    }
}

proptest! {
    #[test]
    fn generated_diagrams_are_valid(diagram in arb_diagram()) {
        let result = validate(&diagram);
        prop_assert!(result.valid, "{:?}", result.errors);
        prop_assert!(result.errors.is_empty());
    }

    #[test]
    fn parse_inverts_serialize(diagram in arb_diagram()) {
        let text = codec::serialize(&diagram).unwrap();
        let parsed = codec::parse(&text).unwrap();
        prop_assert_eq!(parsed, diagram, "{}", text);
    }

    #[test]
    fn serialize_is_stable(diagram in arb_diagram()) {
        let first = codec::serialize(&diagram).unwrap();
        let second = codec::serialize(&codec::parse(&first).unwrap()).unwrap();
        prop_assert_eq!(second, first);
    }

    #[test]
    fn coordinates_are_plain(diagram in arb_diagram()) {
        let text = codec::serialize(&diagram).unwrap();
        for line in text.lines() {
            let entry = line.trim_start().trim_start_matches("- ");
            prop_assert!(!entry.starts_with("\"x\":") && !entry.starts_with("\"y\":"), "{}", line);
        }
        prop_assert!(text.contains("\n      x: "));
    }

    #[test]
    fn duplicate_node_ids_are_reported(diagram in arb_diagram()) {
        let mut diagram = diagram;
        let copy = diagram.nodes[0].clone();
        diagram.add_node(copy);

        let result = validate(&diagram);
        prop_assert!(!result.valid);
        prop_assert!(result.has_error(ValidationCode::DuplicateNodeId));
    }

    #[test]
    fn dangling_edges_are_reported(diagram in arb_diagram(), from_side in any::<bool>()) {
        let mut diagram = diagram;
        let (from, to) = if from_side {
            ("ghost", "n0")
        } else {
            ("n0", "ghost")
        };
        diagram.add_edge(Edge::new("dangling", "dangling", EdgeType::Sequence, from, to));

        let result = validate(&diagram);
        prop_assert!(!result.valid);
        let code = if from_side {
            ValidationCode::InvalidFromNode
        } else {
            ValidationCode::InvalidToNode
        };
        prop_assert!(result.has_error(code));
    }
}
