//! Time-slicing of a follow graph.

use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashSet;

use super::{Edge, Graph, Identity};
use crate::error::{FollowGraphError, Result};

/// The graph as of `cutoff` (Unix ms)
///
/// Keeps edges with `timestamp <= cutoff` in their original order, and only
/// the nodes touched by one of those edges. Nodes that never had an edge are
/// dropped too.
pub fn filter_by_cutoff(graph: &Graph, cutoff: i64) -> Graph {
    let edges: Vec<Edge> = graph
        .edges
        .iter()
        .filter(|edge| edge.timestamp <= cutoff)
        .copied()
        .collect();

    let touched: HashSet<Identity> = edges
        .iter()
        .flat_map(|edge| [edge.source, edge.target])
        .collect();

    let nodes = graph
        .nodes
        .iter()
        .filter(|node| touched.contains(&node.id))
        .cloned()
        .collect();

    Graph { nodes, edges }
}

/// Earliest and latest edge timestamps, `None` without edges
pub fn timestamp_range(edges: &[Edge]) -> Option<(i64, i64)> {
    let min = edges.iter().map(|e| e.timestamp).min()?;
    let max = edges.iter().map(|e| e.timestamp).max()?;
    Some((min, max))
}

/// Parse a cutoff given as Unix milliseconds, an RFC 3339 instant or a
/// `YYYY-MM-DD` date (end of that day, UTC)
pub fn parse_cutoff(input: &str) -> Result<i64> {
    let input = input.trim();
    if let Ok(ms) = input.parse::<i64>() {
        return Ok(ms);
    }
    if let Ok(instant) = DateTime::parse_from_rfc3339(input) {
        return Ok(instant.timestamp_millis());
    }
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_milli_opt(23, 59, 59, 999))
        .map(|end_of_day| end_of_day.and_utc().timestamp_millis())
        .ok_or_else(|| FollowGraphError::InvalidInput(format!("Unrecognised cutoff: {}", input)))
}

/// Human-readable UTC rendering of a Unix-ms timestamp
pub fn format_timestamp(ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| ms.to_string())
}
