//! Pairwise follow discovery.
//!
//! Every ordered pair of distinct identities is probed once, so n identities
//! cost n·(n−1) upstream lookups. Probes run through a bounded buffer: output
//! order follows pair order (sources outer, targets inner) regardless of
//! completion order.

use futures_util::stream::{self, StreamExt};

use super::{Edge, Identity};
use crate::providers::{RelationshipProvider, TimeBase};

/// Unix milliseconds of 2021-01-01T00:00:00Z
pub const FARCASTER_EPOCH_MS: i64 = 1_609_459_200_000;

/// Convert a provider timestamp to Unix milliseconds
pub fn convert_timestamp(value: i64, time_base: TimeBase) -> i64 {
    value
        .saturating_mul(time_base.unit.millis_per_unit())
        .saturating_add(time_base.epoch_offset_ms)
}

/// All ordered pairs of distinct identities, sources outer
fn ordered_pairs(identities: &[Identity]) -> Vec<(Identity, Identity)> {
    identities
        .iter()
        .flat_map(|&source| {
            identities
                .iter()
                .filter(move |&&target| target != source)
                .map(move |&target| (source, target))
        })
        .collect()
}

/// Probe every ordered pair and return the confirmed follows as edges
///
/// A failed probe (upstream error code, exhausted retries, bad payload) counts
/// as "no follow" for that pair and never fails the batch.
pub async fn probe(
    provider: &dyn RelationshipProvider,
    identities: &[Identity],
    concurrency: usize,
) -> Vec<Edge> {
    let pairs = ordered_pairs(identities);
    let time_base = provider.time_base();
    log::info!(
        "Probing {} ordered pairs across {} identities",
        pairs.len(),
        identities.len()
    );

    let results: Vec<Option<Edge>> = stream::iter(pairs)
        .map(|(source, target)| async move {
            match provider.probe(source, target).await {
                Ok(Some(link)) => {
                    log::debug!("{} follows {}", source, target);
                    Some(Edge {
                        source,
                        target,
                        timestamp: convert_timestamp(link.timestamp, time_base),
                    })
                }
                Ok(None) => None,
                Err(e) => {
                    log::warn!("Probe {}→{} failed, treating as no follow: {}", source, target, e);
                    None
                }
            }
        })
        .buffered(concurrency.max(1))
        .collect()
        .await;

    let edges: Vec<Edge> = results.into_iter().flatten().collect();
    log::info!("Found {} follow edges", edges.len());
    edges
}
