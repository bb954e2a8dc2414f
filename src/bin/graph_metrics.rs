use anyhow::{Context, Result};
use clap::Parser;
use followgraph::graph::{format_timestamp, metrics_at, parse_cutoff, timestamp_range};
use followgraph::Graph;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "graph-metrics")]
#[command(about = "Compute metrics of a saved follow graph, optionally as of a cutoff")]
struct Args {
    /// Graph JSON written by build-graph or returned by the HTTP API
    input: PathBuf,

    /// Only count follows made up to this point (Unix ms, RFC 3339 or YYYY-MM-DD)
    #[arg(short, long)]
    cutoff: Option<String>,

    /// Print the summary as JSON instead of tables
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();

    let text = std::fs::read_to_string(&args.input)
        .with_context(|| format!("Failed to read graph from {}", args.input.display()))?;
    let graph: Graph = serde_json::from_str(&text)
        .with_context(|| format!("{} is not a follow graph", args.input.display()))?;

    let cutoff = args.cutoff.as_deref().map(parse_cutoff).transpose()?;
    let summary = metrics_at(&graph, cutoff);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    match timestamp_range(&graph.edges) {
        Some((first, last)) => println!(
            "Timeline: {} → {}",
            format_timestamp(first),
            format_timestamp(last)
        ),
        None => println!("Timeline: no follows"),
    }
    if let Some(cutoff) = cutoff {
        println!("Cutoff:   {}", format_timestamp(cutoff));
    }

    println!("\nNodes: {}", summary.node_ids.len());
    println!("Number of Edges: {}", summary.edge_count);
    println!("\nAdjacency Matrix:\n{}", summary.render_adjacency());
    println!("All-Pairs Shortest Paths:\n{}", summary.render_distances());

    Ok(())
}
