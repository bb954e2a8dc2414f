use anyhow::{Context, Result};
use clap::Parser;
use followgraph::graph::{format_timestamp, metrics_at, parse_cutoff, parse_handle_list, timestamp_range};
use followgraph::{Config, GraphBuilder};
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(name = "build-graph")]
#[command(about = "Build the follow graph between Farcaster handles and print its metrics")]
struct Args {
    /// Handles, separated by spaces or commas
    handles: Vec<String>,

    /// Read more handles from a text file
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Write the graph as JSON to this path
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Only count follows made up to this point (Unix ms, RFC 3339 or YYYY-MM-DD)
    #[arg(short, long)]
    cutoff: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::load()?;

    env_logger::Builder::from_env(
        env_logger::Env::default()
            .filter_or("RUST_LOG", &config.log_level)
    ).init();

    let mut handles = parse_handle_list(&args.handles.join(" "));
    if let Some(path) = &args.file {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read handles from {}", path.display()))?;
        handles.extend(parse_handle_list(&text));
    }
    if handles.is_empty() {
        anyhow::bail!("No handles given. Pass them as arguments or with --file.");
    }

    let cutoff = args.cutoff.as_deref().map(parse_cutoff).transpose()?;
    let pairs = handles.len() * handles.len().saturating_sub(1);
    log::info!("Building graph for {} handles (up to {} follow probes)", handles.len(), pairs);

    let builder = GraphBuilder::from_config(&config)?;
    let start = Instant::now();
    let graph = builder.build(&handles).await?;
    let duration = start.elapsed();

    if let Some(path) = &args.output {
        let json = serde_json::to_string_pretty(&graph)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write graph to {}", path.display()))?;
        log::info!("Graph written to {}", path.display());
    }

    let summary = metrics_at(&graph, cutoff);

    println!("\n=== Follow Graph ===\n");
    println!("Handles: {}", handles.len());
    println!("Nodes: {}", graph.nodes.len());
    println!("Edges: {}", graph.edges.len());
    if let Some((first, last)) = timestamp_range(&graph.edges) {
        println!("First follow: {}", format_timestamp(first));
        println!("Last follow:  {}", format_timestamp(last));
    }
    if let Some(cutoff) = cutoff {
        println!("Cutoff: {}", format_timestamp(cutoff));
    }
    println!("Build time: {:?}", duration);

    println!("\n=== Graph Metrics ===\n");
    println!("Number of Edges: {}", summary.edge_count);
    println!("\nAdjacency Matrix:\n{}", summary.render_adjacency());
    println!("All-Pairs Shortest Paths:\n{}", summary.render_distances());

    Ok(())
}
