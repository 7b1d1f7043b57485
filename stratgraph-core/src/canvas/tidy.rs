//! Connection tidying: canonical edge ids, no duplicates, stable order.

use std::collections::HashSet;

use super::{edge_id, CanvasEdge};

/// Normalize a set of edges.
///
/// - every edge gets its canonical id (`source:handle->target:handle`)
/// - edges with identical endpoints collapse into the first occurrence
/// - edges are ordered by target, target handle, source, source handle, so
///   edges converging on the same node are grouped in handle order
///
/// Idempotent: `tidy_connections(&tidy_connections(e)) == tidy_connections(e)`.
pub fn tidy_connections(edges: &[CanvasEdge]) -> Vec<CanvasEdge> {
    let mut seen = HashSet::new();
    let mut tidy: Vec<CanvasEdge> = edges
        .iter()
        .filter(|e| {
            seen.insert((
                e.source.as_str(),
                e.source_handle.as_str(),
                e.target.as_str(),
                e.target_handle.as_str(),
            ))
        })
        .map(|e| CanvasEdge {
            id: edge_id(&e.source, &e.source_handle, &e.target, &e.target_handle),
            ..e.clone()
        })
        .collect();

    tidy.sort_by(|a, b| {
        (&a.target, &a.target_handle, &a.source, &a.source_handle).cmp(&(
            &b.target,
            &b.target_handle,
            &b.source,
            &b.source_handle,
        ))
    });
    tidy
}
