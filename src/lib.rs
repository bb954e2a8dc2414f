pub mod config;
pub mod error;
pub mod gateway;
pub mod graph;
pub mod providers;
pub mod server;

pub use config::Config;
pub use error::{FollowGraphError, Result};
pub use graph::{compute_metrics, filter_by_cutoff, metrics_at, Edge, Graph, GraphBuilder, Identity, MetricsSummary, Node};
