//! Diagram domain model
//!
//! A diagram is the root document: it owns its nodes and edges, carries
//! hierarchy links to other diagrams (`parent` / `children`), and is stored
//! as one YAML file. Field order here is the field order on disk.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Type of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    Start,
    End,
    #[default]
    Process,
    Decision,
    Subprocess,
    Data,
    External,
    Custom,
}

impl NodeType {
    /// Returns all node types
    pub fn all() -> &'static [NodeType] {
        &[
            NodeType::Start,
            NodeType::End,
            NodeType::Process,
            NodeType::Decision,
            NodeType::Subprocess,
            NodeType::Data,
            NodeType::External,
            NodeType::Custom,
        ]
    }
}

impl std::fmt::Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeType::Start => write!(f, "start"),
            NodeType::End => write!(f, "end"),
            NodeType::Process => write!(f, "process"),
            NodeType::Decision => write!(f, "decision"),
            NodeType::Subprocess => write!(f, "subprocess"),
            NodeType::Data => write!(f, "data"),
            NodeType::External => write!(f, "external"),
            NodeType::Custom => write!(f, "custom"),
        }
    }
}

impl std::str::FromStr for NodeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "start" => Ok(NodeType::Start),
            "end" => Ok(NodeType::End),
            "process" => Ok(NodeType::Process),
            "decision" => Ok(NodeType::Decision),
            "subprocess" => Ok(NodeType::Subprocess),
            "data" => Ok(NodeType::Data),
            "external" => Ok(NodeType::External),
            "custom" => Ok(NodeType::Custom),
            _ => Err(format!("Unknown node type: {}", s)),
        }
    }
}

/// Type of an edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EdgeType {
    #[default]
    Sequence,
    Conditional,
    DataFlow,
    Association,
    Composition,
    Aggregation,
}

impl std::fmt::Display for EdgeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EdgeType::Sequence => write!(f, "sequence"),
            EdgeType::Conditional => write!(f, "conditional"),
            EdgeType::DataFlow => write!(f, "data_flow"),
            EdgeType::Association => write!(f, "association"),
            EdgeType::Composition => write!(f, "composition"),
            EdgeType::Aggregation => write!(f, "aggregation"),
        }
    }
}

/// Direction the diagram flows in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LayoutDirection {
    TopBottom,
    BottomTop,
    LeftRight,
    RightLeft,
}

/// Free-form metadata - extensible key-value pairs, sorted by key on disk
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata(BTreeMap<String, serde_json::Value>);

impl Metadata {
    /// Creates empty metadata
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Gets a value by key
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.0.get(key)
    }

    /// Sets a value
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.0.insert(key.into(), value.into());
    }

    /// Removes a value
    pub fn remove(&mut self, key: &str) -> Option<serde_json::Value> {
        self.0.remove(key)
    }

    /// Returns true if empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over all key-value pairs in key order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &serde_json::Value)> {
        self.0.iter()
    }
}

/// X,Y coordinates
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Width and height
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: f64,
    pub height: f64,
}

/// Visual styling shared by nodes and edges
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Style {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_dasharray: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_weight: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_color: Option<String>,
}

/// Jira reference attached to a node. Stored only; nothing talks to Jira.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JiraIntegration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_key: Option<String>,
}

/// External system attachments on a node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Integrations {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jira: Option<JiraIntegration>,
    #[serde(default, skip_serializing_if = "Metadata::is_empty")]
    pub custom: Metadata,
}

/// Spacing between nodes and ranks
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LayoutSpacing {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank: Option<f64>,
}

/// Layout hints for renderers
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<LayoutDirection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spacing: Option<LayoutSpacing>,
}

/// A step in a diagram
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(rename = "type")]
    pub node_type: NodeType,

    pub position: Position,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<Dimensions>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<Style>,

    /// Id of the child diagram this node expands into
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drill_down: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integrations: Option<Integrations>,

    #[serde(default, skip_serializing_if = "Metadata::is_empty")]
    pub metadata: Metadata,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl Node {
    /// Creates a node at the given position
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        node_type: NodeType,
        position: Position,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            node_type,
            position,
            ..Self::default()
        }
    }
}

/// A connection between two nodes of the same diagram
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(rename = "type")]
    pub edge_type: EdgeType,

    #[serde(default)]
    pub from: String,

    #[serde(default)]
    pub to: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<Style>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub waypoints: Vec<Position>,

    #[serde(default, skip_serializing_if = "Metadata::is_empty")]
    pub metadata: Metadata,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl Edge {
    /// Creates an edge between two node ids
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        edge_type: EdgeType,
        from: impl Into<String>,
        to: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            edge_type,
            from: from.into(),
            to: to.into(),
            ..Self::default()
        }
    }
}

/// A flow diagram document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagram {
    /// Unique key across the store
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Semantic version of the document (e.g., "1.0.0")
    #[serde(default)]
    pub version: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    #[serde(default, skip_serializing_if = "Metadata::is_empty")]
    pub metadata: Metadata,

    #[serde(default)]
    pub nodes: Vec<Node>,

    #[serde(default)]
    pub edges: Vec<Edge>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<Layout>,

    /// Id of the containing diagram
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,

    /// Ids of contained diagrams
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<String>,

    #[serde(default)]
    pub created: DateTime<Utc>,

    #[serde(default)]
    pub updated: DateTime<Utc>,

    /// Storage key the diagram was loaded from or written to
    #[serde(skip)]
    pub location: Option<String>,
}

impl Diagram {
    /// Creates an empty diagram
    pub fn new(id: impl Into<String>, name: impl Into<String>, version: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            version: version.into(),
            tags: Vec::new(),
            metadata: Metadata::new(),
            nodes: Vec::new(),
            edges: Vec::new(),
            layout: None,
            parent: None,
            children: Vec::new(),
            created: now,
            updated: now,
            location: None,
        }
    }

    /// Appends a node
    pub fn add_node(&mut self, node: Node) -> &mut Self {
        self.nodes.push(node);
        self
    }

    /// Appends an edge
    pub fn add_edge(&mut self, edge: Edge) -> &mut Self {
        self.edges.push(edge);
        self
    }

    /// Finds a node by id (first occurrence)
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Finds a node by id for modification (first occurrence)
    pub fn node_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    /// Returns true if `child_id` is listed in `children`
    pub fn has_child(&self, child_id: &str) -> bool {
        self.children.iter().any(|c| c == child_id)
    }

    /// Adds a child id unless already present. Returns true if added.
    pub fn add_child(&mut self, child_id: &str) -> bool {
        if self.has_child(child_id) {
            return false;
        }
        self.children.push(child_id.to_string());
        true
    }

    /// Removes a child id and clears every drill-down pointing at it.
    /// Returns true if anything changed.
    pub fn detach_child(&mut self, child_id: &str) -> bool {
        let before = self.children.len();
        self.children.retain(|c| c != child_id);
        let mut changed = self.children.len() != before;

        for node in &mut self.nodes {
            if node.drill_down.as_deref() == Some(child_id) {
                node.drill_down = None;
                changed = true;
            }
        }

        changed
    }

    /// Returns true if any tag equals `tag`, ignoring case
    pub fn has_tag(&self, tag: &str) -> bool {
        let tag = tag.to_lowercase();
        self.tags.iter().any(|t| t.to_lowercase() == tag)
    }
}
