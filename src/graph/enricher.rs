//! Identity → node enrichment.

use futures_util::stream::{self, StreamExt};

use super::{Identity, Node};
use crate::providers::ProfileProvider;

/// Fetch a profile per identity and build nodes, in input order
///
/// Identities without a profile, or whose lookup fails, are left out.
pub async fn enrich(
    provider: &dyn ProfileProvider,
    identities: &[Identity],
    concurrency: usize,
) -> Vec<Node> {
    let nodes: Vec<Node> = stream::iter(identities.iter().copied())
        .map(|id| async move {
            match provider.fetch_profile(id).await {
                Ok(Some(profile)) => Some(Node {
                    id,
                    username: profile.username,
                    display_name: profile.display_name,
                    pfp_url: profile.pfp_url,
                    bio: profile.bio,
                }),
                Ok(None) => {
                    log::debug!("No profile for {}", id);
                    None
                }
                Err(e) => {
                    log::warn!("Dropping {} after profile lookup failed: {}", id, e);
                    None
                }
            }
        })
        .buffered(concurrency.max(1))
        .filter_map(|node| async move { node })
        .collect()
        .await;

    log::info!("Enriched {}/{} identities", nodes.len(), identities.len());
    nodes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::fakes::FakeNetwork;
    use std::time::Duration;

    #[tokio::test]
    async fn test_enrich_builds_nodes_in_order() {
        let network = FakeNetwork::new().user("b", 2).user("a", 1);

        let nodes = enrich(&network, &[Identity(1), Identity(2)], 4).await;
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].id, Identity(1));
        assert_eq!(nodes[0].username.as_deref(), Some("a"));
        assert_eq!(nodes[0].display_name.as_deref(), Some("A"));
        assert_eq!(nodes[1].pfp_url.as_deref(), Some("https://img.example/2.png"));
    }

    #[tokio::test]
    async fn test_enrich_drops_failures_silently() {
        let mut network = FakeNetwork::new().user("a", 1).user("b", 2);
        network.broken_profiles.insert(Identity(2));

        let nodes = enrich(&network, &[Identity(1), Identity(2), Identity(3)], 4).await;
        assert_eq!(nodes.iter().map(|n| n.id).collect::<Vec<_>>(), vec![Identity(1)]);
    }

    #[tokio::test]
    async fn test_enrich_never_exceeds_concurrency() {
        let mut network = FakeNetwork::new();
        for id in 1..=10 {
            network = network.user(&format!("u{}", id), id);
        }
        network.lookup_delay = Duration::from_millis(5);
        let identities: Vec<Identity> = (1..=10).map(Identity).collect();

        let nodes = enrich(&network, &identities, 4).await;
        assert_eq!(nodes.len(), 10);
        assert!(network.peak_in_flight() <= 4, "peak was {}", network.peak_in_flight());
        assert!(network.peak_in_flight() > 1);
    }
}
