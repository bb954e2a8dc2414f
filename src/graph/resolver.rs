//! Handle → identity resolution for a batch of handles.

use futures_util::stream::{self, StreamExt};
use std::collections::HashSet;

use super::Identity;
use crate::providers::HandleResolver;

/// A handle together with the identity it resolved to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedHandle {
    pub handle: String,
    pub identity: Identity,
}

/// Trim whitespace and a leading `@`; `None` for an empty handle
pub fn normalize_handle(raw: &str) -> Option<String> {
    let handle = raw.trim();
    let handle = handle.strip_prefix('@').unwrap_or(handle).trim();
    if handle.is_empty() {
        None
    } else {
        Some(handle.to_string())
    }
}

/// Split free text on commas and whitespace into handles
pub fn parse_handle_list(input: &str) -> Vec<String> {
    input
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter_map(normalize_handle)
        .collect()
}

/// Resolve handles concurrently, dropping the ones that fail
///
/// Output keeps input order. A handle with no binding, or whose lookup fails,
/// is logged and skipped. When several handles map to the same identity only
/// the first is kept.
pub async fn resolve_handles(
    resolver: &dyn HandleResolver,
    handles: &[String],
    concurrency: usize,
) -> Vec<ResolvedHandle> {
    let handles: Vec<String> = handles.iter().filter_map(|h| normalize_handle(h)).collect();

    let results: Vec<Option<ResolvedHandle>> = stream::iter(handles)
        .map(|handle| async move {
            match resolver.resolve(&handle).await {
                Ok(Some(identity)) => Some(ResolvedHandle { handle, identity }),
                Ok(None) => {
                    log::warn!("No identity bound to handle {}", handle);
                    None
                }
                Err(e) => {
                    log::warn!("Failed to resolve handle {}: {}", handle, e);
                    None
                }
            }
        })
        .buffered(concurrency.max(1))
        .collect()
        .await;

    let mut seen = HashSet::new();
    results
        .into_iter()
        .flatten()
        .filter(|resolved| {
            let fresh = seen.insert(resolved.identity);
            if !fresh {
                log::debug!("Handle {} duplicates identity {}", resolved.handle, resolved.identity);
            }
            fresh
        })
        .collect()
}
