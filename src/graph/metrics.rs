//! Graph metrics: edge count, adjacency matrix and all-pairs shortest paths.
//!
//! Rows and columns follow the graph's node order. Distances are hop counts
//! from Floyd–Warshall with unit weights, O(n³) in the node count.

use petgraph::graphmap::DiGraphMap;
use serde::ser::{Serialize, SerializeSeq, Serializer};
use std::fmt::Write as _;

use super::{filter_by_cutoff, Graph, Identity};

/// In-memory distance for "no path". Half of `u32::MAX` so that adding two
/// distances during relaxation cannot overflow.
pub const UNREACHABLE: u32 = u32::MAX / 2;

/// n×n hop-count matrix
///
/// Serializes as nested arrays with `null` for unreachable pairs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistanceMatrix {
    size: usize,
    cells: Vec<u32>,
}

impl DistanceMatrix {
    /// Floyd–Warshall over a 0/1 adjacency matrix
    pub fn floyd_warshall(adjacency: &[Vec<u8>]) -> Self {
        let n = adjacency.len();
        let mut cells = vec![UNREACHABLE; n * n];

        for (i, row) in adjacency.iter().enumerate() {
            for (j, &connected) in row.iter().enumerate().take(n) {
                if connected != 0 {
                    cells[i * n + j] = 1;
                }
            }
        }
        for i in 0..n {
            cells[i * n + i] = 0;
        }

        for k in 0..n {
            for i in 0..n {
                let via = cells[i * n + k];
                if via >= UNREACHABLE {
                    continue;
                }
                for j in 0..n {
                    let candidate = via + cells[k * n + j];
                    if candidate < cells[i * n + j] {
                        cells[i * n + j] = candidate;
                    }
                }
            }
        }

        Self { size: n, cells }
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Raw cell, [`UNREACHABLE`] when there is no path
    pub fn raw(&self, from: usize, to: usize) -> u32 {
        self.cells[from * self.size + to]
    }

    /// Hop count from row `from` to column `to`, `None` when unreachable
    pub fn get(&self, from: usize, to: usize) -> Option<u32> {
        Some(self.raw(from, to)).filter(|&d| d < UNREACHABLE)
    }

    pub fn rows(&self) -> Vec<Vec<Option<u32>>> {
        (0..self.size)
            .map(|i| (0..self.size).map(|j| self.get(i, j)).collect())
            .collect()
    }
}

impl Serialize for DistanceMatrix {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.size))?;
        for row in self.rows() {
            seq.serialize_element(&row)?;
        }
        seq.end()
    }
}

/// Read-only statistics derived from a [`Graph`]
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSummary {
    pub edge_count: usize,
    pub node_ids: Vec<Identity>,
    pub node_labels: Vec<String>,
    pub adjacency_matrix: Vec<Vec<u8>>,
    pub distance_matrix: DistanceMatrix,
}

/// Compute the metrics summary of a graph
///
/// The edge count covers every edge. The matrices only cover the node set:
/// edges whose endpoints are not nodes are ignored there, and duplicate edges
/// collapse to one adjacency entry.
pub fn compute_metrics(graph: &Graph) -> MetricsSummary {
    let node_ids: Vec<Identity> = graph.nodes.iter().map(|node| node.id).collect();

    let mut directed = DiGraphMap::<Identity, ()>::with_capacity(node_ids.len(), graph.edges.len());
    for &id in &node_ids {
        directed.add_node(id);
    }
    for edge in &graph.edges {
        if directed.contains_node(edge.source) && directed.contains_node(edge.target) {
            directed.add_edge(edge.source, edge.target, ());
        }
    }

    let adjacency_matrix: Vec<Vec<u8>> = node_ids
        .iter()
        .map(|&source| {
            node_ids
                .iter()
                .map(|&target| u8::from(directed.contains_edge(source, target)))
                .collect()
        })
        .collect();

    let distance_matrix = DistanceMatrix::floyd_warshall(&adjacency_matrix);

    MetricsSummary {
        edge_count: graph.edges.len(),
        node_labels: graph.nodes.iter().map(|node| node.label()).collect(),
        node_ids,
        adjacency_matrix,
        distance_matrix,
    }
}

/// Metrics of the graph as of `cutoff`, or of the whole graph without one
pub fn metrics_at(graph: &Graph, cutoff: Option<i64>) -> MetricsSummary {
    match cutoff {
        Some(cutoff) => compute_metrics(&filter_by_cutoff(graph, cutoff)),
        None => compute_metrics(graph),
    }
}

impl MetricsSummary {
    /// Adjacency matrix as a text table with node labels as headers
    pub fn render_adjacency(&self) -> String {
        render_table(&self.node_labels, "", |i, j| self.adjacency_matrix[i][j].to_string())
    }

    /// Distance matrix as a text table, `∞` for unreachable pairs
    pub fn render_distances(&self) -> String {
        render_table(&self.node_labels, "From \\ To", |i, j| {
            self.distance_matrix
                .get(i, j)
                .map(|d| d.to_string())
                .unwrap_or_else(|| "∞".to_string())
        })
    }
}

fn render_table(labels: &[String], corner: &str, cell: impl Fn(usize, usize) -> String) -> String {
    let first = labels
        .iter()
        .map(|l| l.chars().count())
        .chain(std::iter::once(corner.chars().count()))
        .max()
        .unwrap_or(0);
    let widths: Vec<usize> = labels.iter().map(|l| l.chars().count().max(1)).collect();

    let mut out = String::new();
    let _ = write!(out, "{:<first$}", corner);
    for (label, width) in labels.iter().zip(&widths) {
        let _ = write!(out, " {:>width$}", label, width = *width);
    }
    out.push('\n');

    for (i, label) in labels.iter().enumerate() {
        let _ = write!(out, "{:<first$}", label);
        for (j, width) in widths.iter().enumerate() {
            let _ = write!(out, " {:>width$}", cell(i, j), width = *width);
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Edge, Node, FARCASTER_EPOCH_MS};
    use serde_json::json;

    fn node(id: u64, name: &str) -> Node {
        let mut node = Node::bare(Identity(id));
        node.username = Some(name.to_string());
        node
    }

    fn edge(source: u64, target: u64, timestamp: i64) -> Edge {
        Edge {
            source: Identity(source),
            target: Identity(target),
            timestamp,
        }
    }

    fn chain() -> Graph {
        Graph::new(
            vec![node(1, "A"), node(2, "B"), node(3, "C")],
            vec![
                edge(1, 2, FARCASTER_EPOCH_MS + 1_000_000),
                edge(2, 3, FARCASTER_EPOCH_MS + 2_000_000),
            ],
        )
    }

    #[test]
    fn test_chain_metrics() {
        let summary = compute_metrics(&chain());
        assert_eq!(summary.edge_count, 2);
        assert_eq!(summary.node_labels, vec!["A", "B", "C"]);
        assert_eq!(summary.adjacency_matrix, vec![vec![0, 1, 0], vec![0, 0, 1], vec![0, 0, 0]]);
        assert_eq!(
            summary.distance_matrix.rows(),
            vec![
                vec![Some(0), Some(1), Some(2)],
                vec![None, Some(0), Some(1)],
                vec![None, None, Some(0)],
            ]
        );
        assert_eq!(summary.distance_matrix.raw(1, 0), UNREACHABLE);
    }

    #[test]
    fn test_floyd_warshall_short_rows() {
        // Missing cells count as "no edge"; the diagonal is always 0
        let d = DistanceMatrix::floyd_warshall(&[vec![0, 1], vec![]]);
        assert_eq!(d.rows(), vec![vec![Some(0), Some(1)], vec![None, Some(0)]]);

        let d = DistanceMatrix::floyd_warshall(&[vec![1], vec![1, 1, 1]]);
        assert_eq!(d.get(0, 0), Some(0));
        assert_eq!(d.get(1, 1), Some(0));
        assert_eq!(d.get(1, 0), Some(1));
    }

    #[test]
    fn test_metrics_are_deterministic() {
        let graph = chain();
        assert_eq!(compute_metrics(&graph), compute_metrics(&graph));
    }

    #[test]
    fn test_duplicate_edges_collapse() {
        let mut graph = chain();
        graph.edges.push(edge(1, 2, 5));
        let summary = compute_metrics(&graph);
        assert_eq!(summary.edge_count, 3);
        assert_eq!(summary.adjacency_matrix[0][1], 1);
    }

    #[test]
    fn test_edges_outside_node_set_do_not_create_paths() {
        // 1 → 9 → 2 where 9 has no node
        let graph = Graph::new(vec![node(1, "A"), node(2, "B")], vec![edge(1, 9, 0), edge(9, 2, 0)]);
        let summary = compute_metrics(&graph);
        assert_eq!(summary.edge_count, 2);
        assert_eq!(summary.adjacency_matrix, vec![vec![0, 0], vec![0, 0]]);
        assert_eq!(summary.distance_matrix.get(0, 1), None);
    }

    #[test]
    fn test_distance_properties() {
        // Ring 1→2→3→4→5→1 with a chord 1→4 and an isolated 6
        let nodes = (1..=6).map(|id| node(id, &format!("n{}", id))).collect();
        let edges = vec![
            edge(1, 2, 0),
            edge(2, 3, 0),
            edge(3, 4, 0),
            edge(4, 5, 0),
            edge(5, 1, 0),
            edge(1, 4, 0),
        ];
        let summary = compute_metrics(&Graph::new(nodes, edges));
        let d = &summary.distance_matrix;
        let n = d.len();

        for i in 0..n {
            assert_eq!(d.get(i, i), Some(0));
            for j in 0..n {
                for k in 0..n {
                    assert!(d.raw(i, j) <= d.raw(i, k) + d.raw(k, j));
                }
            }
        }
        assert_eq!(d.get(0, 4), Some(2));
        assert_eq!(d.get(1, 0), Some(4));
        assert_eq!(d.get(0, 5), None);
        assert_eq!(d.get(5, 0), None);
    }

    #[test]
    fn test_metrics_at_applies_cutoff() {
        let graph = chain();
        let summary = metrics_at(&graph, Some(FARCASTER_EPOCH_MS + 1_500_000));
        assert_eq!(summary.edge_count, 1);
        assert_eq!(summary.node_ids, vec![Identity(1), Identity(2)]);

        let before = metrics_at(&graph, Some(0));
        assert_eq!(before.edge_count, 0);
        assert!(before.distance_matrix.is_empty());

        assert_eq!(metrics_at(&graph, None), compute_metrics(&graph));
    }

    #[test]
    fn test_summary_json_uses_null_for_unreachable() {
        let value = serde_json::to_value(compute_metrics(&chain())).unwrap();
        assert_eq!(value["edgeCount"], 2);
        assert_eq!(value["nodeIds"], json!([1, 2, 3]));
        assert_eq!(value["distanceMatrix"], json!([[0, 1, 2], [null, 0, 1], [null, null, 0]]));
    }

    #[test]
    fn test_render_tables() {
        let summary = compute_metrics(&chain());
        let distances = summary.render_distances();
        assert!(distances.starts_with("From \\ To"));
        assert!(distances.contains('∞'));
        assert_eq!(distances.lines().count(), 4);

        let adjacency = summary.render_adjacency();
        assert_eq!(adjacency.lines().nth(1).unwrap().split_whitespace().collect::<Vec<_>>(), vec!["A", "0", "1", "0"]);
    }
}
