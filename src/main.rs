use anyhow::Result;
use followgraph::server::HttpServer;
use followgraph::{Config, GraphBuilder};
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;

    // RUST_LOG wins over log_level from config.toml
    env_logger::Builder::from_env(
        env_logger::Env::default()
            .filter_or("RUST_LOG", &config.log_level)
    ).init();

    let args: Vec<String> = std::env::args().collect();
    let command = args.get(1).map(|s| s.as_str()).unwrap_or("serve");

    match command {
        "check" => {
            // Readiness of the relationship backend only
            run_check(&config).await?;
        }
        "serve" | _ => {
            run_http_server(config).await?;
        }
    }

    Ok(())
}

/// Run the HTTP server
async fn run_http_server(config: Config) -> Result<()> {
    log::info!("Starting followgraph HTTP server v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Name registry: {}", config.providers.registry_url);
    log::info!("Hub: {}", config.providers.hub_url);

    let builder = GraphBuilder::from_config(&config)?;
    let server = HttpServer::new(builder, &config);
    server.run(&config.http_server.host, config.http_server.port).await?;

    Ok(())
}

/// Check that the hub answers within the readiness timeout
async fn run_check(config: &Config) -> Result<()> {
    use followgraph::gateway::RequestGateway;
    use followgraph::providers::{HubClient, RelationshipProvider};
    use std::sync::Arc;

    let gateway = Arc::new(RequestGateway::from_config(&config.gateway)?);
    let hub = HubClient::new(gateway, &config.providers.hub_url);
    let timeout: Duration = config.readiness_timeout();

    match hub.check_ready(timeout).await {
        Ok(()) => {
            log::info!("✓ Hub {} is ready", config.providers.hub_url);
            Ok(())
        }
        Err(e) => {
            log::error!("Hub {} is not ready: {}", config.providers.hub_url, e);
            Err(e.into())
        }
    }
}
