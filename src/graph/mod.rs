//! Follow graph: domain types, construction and analysis.
//!
//! Handles resolve to identities, identities are enriched into nodes and
//! probed pairwise for follow edges. The temporal filter and metrics engine
//! work on the assembled [`Graph`].

mod builder;
mod enricher;
mod metrics;
mod prober;
mod resolver;
mod temporal;

pub use builder::{BuildOptions, GraphBuilder};
pub use enricher::enrich;
pub use metrics::{compute_metrics, metrics_at, DistanceMatrix, MetricsSummary, UNREACHABLE};
pub use prober::{convert_timestamp, probe, FARCASTER_EPOCH_MS};
pub use resolver::{normalize_handle, parse_handle_list, resolve_handles, ResolvedHandle};
pub use temporal::{filter_by_cutoff, format_timestamp, parse_cutoff, timestamp_range};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable numeric key of an actor (a Farcaster FID).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(pub u64);

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An identity enriched with profile attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: Identity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Avatar reference
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pfp_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
}

impl Node {
    /// Node with no profile attributes
    pub fn bare(id: Identity) -> Self {
        Self {
            id,
            username: None,
            display_name: None,
            pfp_url: None,
            bio: None,
        }
    }

    /// Label for tables: the username, else the numeric id
    pub fn label(&self) -> String {
        self.username.clone().unwrap_or_else(|| self.id.to_string())
    }
}

/// Directed follow: `source` follows `target` since `timestamp` (Unix ms).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub source: Identity,
    pub target: Identity,
    pub timestamp: i64,
}

/// Nodes plus ordered edges.
///
/// Edges may reference identities missing from `nodes` (enrichment failed);
/// [`filter_by_cutoff`] drops such nodes only by membership, it never adds any.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Graph {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl Graph {
    pub fn new(nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        Self { nodes, edges }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_graph_json_shape() {
        let graph = Graph::new(
            vec![Node {
                id: Identity(3),
                username: Some("dwr".into()),
                display_name: Some("Dan".into()),
                pfp_url: None,
                bio: None,
            }],
            vec![Edge {
                source: Identity(3),
                target: Identity(2),
                timestamp: 1_609_459_200_000,
            }],
        );

        let value = serde_json::to_value(&graph).unwrap();
        assert_eq!(
            value,
            json!({
                "nodes": [{ "id": 3, "username": "dwr", "displayName": "Dan" }],
                "edges": [{ "source": 3, "target": 2, "timestamp": 1_609_459_200_000i64 }]
            })
        );

        let back: Graph = serde_json::from_value(value).unwrap();
        assert_eq!(back, graph);
    }

    #[test]
    fn test_node_label_falls_back_to_id() {
        assert_eq!(Node::bare(Identity(42)).label(), "42");
        let mut node = Node::bare(Identity(42));
        node.username = Some("v".into());
        assert_eq!(node.label(), "v");
    }
}
