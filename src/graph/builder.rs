use std::sync::Arc;
use std::time::{Duration, Instant};

use super::{enrich, probe, resolve_handles, Graph, Identity};
use crate::config::{BuildConfig, Config};
use crate::error::{FollowGraphError, Result};
use crate::gateway::RequestGateway;
use crate::providers::{FnameRegistry, HandleResolver, HubClient, ProfileProvider, RelationshipProvider};

/// Limits applied to one graph build
#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub readiness_timeout: Duration,
    pub deadline: Duration,
    pub probe_concurrency: usize,
    pub lookup_concurrency: usize,
    pub max_handles: usize,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self::from_config(&BuildConfig::default())
    }
}

impl BuildOptions {
    pub fn from_config(config: &BuildConfig) -> Self {
        Self {
            readiness_timeout: Duration::from_secs(config.readiness_timeout_secs),
            deadline: Duration::from_secs(config.deadline_secs),
            probe_concurrency: config.probe_concurrency,
            lookup_concurrency: config.lookup_concurrency,
            max_handles: config.max_handles,
        }
    }
}

/// Turns a list of handles into a follow graph
///
/// Steps: readiness check on the relationship backend, handle resolution,
/// then profile enrichment and pairwise probing side by side. Only an
/// unreachable backend or the overall deadline fail a build; every other
/// failure just shrinks the result.
pub struct GraphBuilder {
    resolver: Arc<dyn HandleResolver>,
    profiles: Arc<dyn ProfileProvider>,
    relationships: Arc<dyn RelationshipProvider>,
    options: BuildOptions,
}

impl GraphBuilder {
    pub fn new(
        resolver: Arc<dyn HandleResolver>,
        profiles: Arc<dyn ProfileProvider>,
        relationships: Arc<dyn RelationshipProvider>,
        options: BuildOptions,
    ) -> Self {
        Self {
            resolver,
            profiles,
            relationships,
            options,
        }
    }

    /// Wire the Farcaster name registry and hub behind one shared gateway
    pub fn from_config(config: &Config) -> Result<Self> {
        let gateway = Arc::new(RequestGateway::from_config(&config.gateway)?);
        let registry = Arc::new(FnameRegistry::new(gateway.clone(), &config.providers.registry_url));
        let hub = Arc::new(HubClient::new(gateway, &config.providers.hub_url));

        Ok(Self::new(
            registry,
            hub.clone(),
            hub,
            BuildOptions::from_config(&config.build),
        ))
    }

    pub fn options(&self) -> &BuildOptions {
        &self.options
    }

    /// Build the follow graph for `handles`
    ///
    /// Fails with `InvalidInput` above `max_handles` handles, before any
    /// upstream call.
    pub async fn build(&self, handles: &[String]) -> Result<Graph> {
        if handles.len() > self.options.max_handles {
            return Err(FollowGraphError::InvalidInput(format!(
                "{} handles given, at most {} allowed",
                handles.len(),
                self.options.max_handles
            )));
        }

        let deadline = self.options.deadline;
        tokio::time::timeout(deadline, self.build_within_deadline(handles))
            .await
            .map_err(|_| FollowGraphError::DeadlineExceeded(deadline))?
    }

    async fn build_within_deadline(&self, handles: &[String]) -> Result<Graph> {
        let start = Instant::now();
        self.ensure_backend_ready().await?;

        let resolved = resolve_handles(self.resolver.as_ref(), handles, self.options.lookup_concurrency).await;
        let identities: Vec<Identity> = resolved.iter().map(|r| r.identity).collect();
        log::info!("Resolved {}/{} handles", identities.len(), handles.len());

        let (nodes, edges) = tokio::join!(
            enrich(self.profiles.as_ref(), &identities, self.options.lookup_concurrency),
            probe(self.relationships.as_ref(), &identities, self.options.probe_concurrency),
        );

        log::info!(
            "Built graph with {} nodes and {} edges in {:?}",
            nodes.len(),
            edges.len(),
            start.elapsed()
        );
        Ok(Graph { nodes, edges })
    }

    async fn ensure_backend_ready(&self) -> Result<()> {
        let timeout = self.options.readiness_timeout;
        match tokio::time::timeout(timeout, self.relationships.check_ready(timeout)).await {
            Ok(Ok(())) => {
                log::info!("Relationship backend is ready");
                Ok(())
            }
            Ok(Err(e)) => Err(FollowGraphError::BackendUnreachable(e.to_string())),
            Err(_) => Err(FollowGraphError::BackendUnreachable(format!(
                "no answer within {:?}",
                timeout
            ))),
        }
    }
}
