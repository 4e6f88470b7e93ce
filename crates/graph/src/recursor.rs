//! Connected-component expansion from a seed record.

use std::collections::{HashSet, VecDeque};

use store::Store;

use crate::GraphError;

/// Output of [`recurse`]: every record_id reachable from the seed, and
/// every edge touched along the way (deduplicated, insertion order
/// preserved).
pub struct RecursionResult {
    pub visited: HashSet<i64>,
    pub touched_edges: Vec<(i64, i64, f64)>,
}

/// Expand the connected component containing `seed`.
///
/// Every touched edge is reported regardless of `is_valid` — the
/// downstream [`crate::run_graph_cursor`] needs the full set to
/// invalidate weak ones. Only `match_weight >= threshold` edges expand
/// the visited frontier; iteration stops when the visited set stops
/// growing.
pub fn recurse(store: &Store, seed: i64, threshold: f64) -> Result<RecursionResult, GraphError> {
    let mut visited: HashSet<i64> = HashSet::new();
    let mut queue: VecDeque<i64> = VecDeque::new();
    let mut seen_edges: HashSet<(i64, i64)> = HashSet::new();
    let mut touched_edges: Vec<(i64, i64, f64)> = Vec::new();

    visited.insert(seed);
    queue.push_back(seed);

    while let Some(record_id) = queue.pop_front() {
        for edge in store.list_edges_touching(record_id)? {
            let edge_key = (edge.record_id_low, edge.record_id_high);
            if seen_edges.insert(edge_key) {
                touched_edges.push((edge.record_id_low, edge.record_id_high, edge.match_weight));
            }

            if edge.match_weight >= threshold {
                let other = if edge.record_id_low == record_id {
                    edge.record_id_high
                } else {
                    edge.record_id_low
                };
                if visited.insert(other) {
                    queue.push_back(other);
                }
            }
        }
    }

    Ok(RecursionResult {
        visited,
        touched_edges,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use store::EnterpriseMatch;

    fn edge(low: i64, high: i64, weight: f64, is_valid: bool) -> EnterpriseMatch {
        EnterpriseMatch {
            etl_id: low * 1000 + high,
            record_id_low: low,
            record_id_high: high,
            match_weight: weight,
            is_valid,
            transaction_key: "1_1".into(),
            touched_by: "tester".into(),
            touched_ts: Utc::now(),
        }
    }

    #[test]
    fn recurse_follows_edges_regardless_of_is_valid() {
        let store = Store::in_memory();
        store.put_edge(&edge(1, 2, 0.9, false)).unwrap();

        let result = recurse(&store, 1, 0.5).unwrap();
        assert!(result.visited.contains(&2));
        assert_eq!(result.touched_edges, vec![(1, 2, 0.9)]);
    }

    #[test]
    fn recurse_gates_frontier_expansion_on_threshold_not_edge_reporting() {
        let store = Store::in_memory();
        store.put_edge(&edge(1, 2, 0.9, true)).unwrap();
        store.put_edge(&edge(2, 3, 0.1, true)).unwrap();

        let result = recurse(&store, 1, 0.5).unwrap();
        assert!(result.visited.contains(&2));
        assert!(!result.visited.contains(&3));
        assert!(result
            .touched_edges
            .iter()
            .any(|(l, h, w)| *l == 2 && *h == 3 && *w == 0.1));
    }

    #[test]
    fn recurse_deduplicates_touched_edges() {
        let store = Store::in_memory();
        store.put_edge(&edge(1, 2, 0.9, true)).unwrap();
        store.put_edge(&edge(1, 3, 0.9, true)).unwrap();
        store.put_edge(&edge(2, 3, 0.9, true)).unwrap();

        let result = recurse(&store, 1, 0.5).unwrap();
        assert_eq!(result.visited.len(), 3);
        assert_eq!(result.touched_edges.len(), 3);
    }

    #[test]
    fn recurse_on_isolated_record_visits_only_itself() {
        let store = Store::in_memory();
        let result = recurse(&store, 42, 0.5).unwrap();
        assert_eq!(result.visited.len(), 1);
        assert!(result.touched_edges.is_empty());
    }
}
