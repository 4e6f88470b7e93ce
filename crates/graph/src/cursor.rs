//! Rewrites the match/group/bulletin tables for one connected
//! component.

use chrono::Utc;

use store::{Bulletin, EnterpriseGroup, EnterpriseMatch, Store};

use crate::GraphError;

/// What `run_graph_cursor` actually did, for callers that need to
/// report it (e.g. the activation-log row).
#[derive(Debug, Clone, PartialEq)]
pub struct GraphCursorOutcome {
    pub enterprise_id: i64,
    /// record_ids whose EnterpriseGroup row changed or was created.
    pub regrouped_record_ids: Vec<i64>,
}

/// Rewrite the EnterpriseMatch/EnterpriseGroup/Bulletin tables for one
/// component, given the triples a [`crate::recurse`] call (or an
/// equivalent source) produced.
///
/// `gate_group_writes`: set when the owning batch's action is a
/// deactivation or deletion — group and bulletin writes are skipped
/// while the caller is mid-disassembly.
#[allow(clippy::too_many_arguments)]
pub fn run_graph_cursor(
    store: &Store,
    triples: &[(i64, i64, f64)],
    threshold: f64,
    batch_id: i64,
    proc_id: i64,
    transaction_key: &str,
    user: &str,
    version: &str,
    gate_group_writes: bool,
) -> Result<Option<GraphCursorOutcome>, GraphError> {
    let mut record_ids: Vec<i64> = triples
        .iter()
        .flat_map(|(low, high, _)| [*low, *high])
        .collect();
    record_ids.sort_unstable();
    record_ids.dedup();

    let Some(&enterprise_id) = record_ids.iter().min() else {
        return Ok(None);
    };

    let mut kept_record_ids: Vec<i64> = Vec::new();

    for &(low, high, weight) in triples {
        let (low, high) = (low.min(high), low.max(high));
        let existing = store.get_edge(low, high)?;

        if weight >= threshold {
            let etl_id = match &existing {
                Some(edge) => edge.etl_id,
                None => store.minter().mint(user, version)?,
            };
            let edge = EnterpriseMatch {
                etl_id,
                record_id_low: low,
                record_id_high: high,
                match_weight: weight,
                is_valid: true,
                transaction_key: transaction_key.to_string(),
                touched_by: user.to_string(),
                touched_ts: Utc::now(),
            };
            store.put_edge(&edge)?;
            kept_record_ids.push(low);
            kept_record_ids.push(high);
        } else if let Some(mut edge) = existing {
            edge.is_valid = false;
            edge.match_weight = weight;
            edge.touched_by = user.to_string();
            edge.touched_ts = Utc::now();
            store.put_edge(&edge)?;
        }
    }

    kept_record_ids.sort_unstable();
    kept_record_ids.dedup();

    if gate_group_writes {
        return Ok(Some(GraphCursorOutcome {
            enterprise_id,
            regrouped_record_ids: Vec::new(),
        }));
    }

    let mut regrouped = Vec::new();
    for record_id in kept_record_ids {
        let needs_write = match store.get_group(record_id)? {
            Some(existing) => existing.enterprise_id != enterprise_id,
            None => true,
        };
        if !needs_write {
            continue;
        }

        let etl_id = store.minter().mint(user, version)?;
        let group = EnterpriseGroup {
            etl_id,
            enterprise_id,
            record_id,
            transaction_key: transaction_key.to_string(),
            touched_by: user.to_string(),
            touched_ts: Utc::now(),
        };
        store.put_group(&group)?;

        let bulletin_etl_id = store.minter().mint(user, version)?;
        store.append_bulletin(&Bulletin {
            etl_id: bulletin_etl_id,
            batch_id,
            proc_id,
            record_id,
            empi_id: enterprise_id,
            transaction_key: transaction_key.to_string(),
            bulletin_ts: Utc::now(),
        })?;

        regrouped.push(record_id);
    }

    Ok(Some(GraphCursorOutcome {
        enterprise_id,
        regrouped_record_ids: regrouped,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    const THRESHOLD: f64 = 0.5;

    #[test]
    fn worked_example_from_spec_scenario_four() {
        let store = Store::in_memory();
        let triples = vec![
            (12345, 12346, 1.0),
            (12345, 12347, 0.6),
            (12345, 12348, 0.4),
            (12346, 12347, 0.0),
            (12346, 12348, 0.3),
            (12347, 12348, 0.0),
        ];

        let outcome = run_graph_cursor(
            &store, &triples, THRESHOLD, 1, 1, "1_1", "tester", "v1", false,
        )
        .unwrap()
        .unwrap();

        assert_eq!(outcome.enterprise_id, 12345);

        let kept_edges = store.list_all_edges().unwrap();
        let valid_edges: Vec<_> = kept_edges.iter().filter(|e| e.is_valid).collect();
        assert_eq!(valid_edges.len(), 2);

        let mut grouped: Vec<i64> = (12345..=12348)
            .filter(|id| store.get_group(*id).unwrap().is_some())
            .collect();
        grouped.sort_unstable();
        assert_eq!(grouped, vec![12345, 12346, 12347]);

        for id in [12345, 12346, 12347] {
            assert_eq!(store.get_group(id).unwrap().unwrap().enterprise_id, 12345);
        }
        assert!(store.get_group(12348).unwrap().is_none());
    }

    #[test]
    fn group_upsert_is_change_only_if_different() {
        let store = Store::in_memory();
        let triples = vec![(1, 2, 0.9)];

        run_graph_cursor(&store, &triples, THRESHOLD, 1, 1, "1_1", "tester", "v1", false)
            .unwrap()
            .unwrap();
        let first_etl_id = store.get_group(1).unwrap().unwrap().etl_id;

        // Re-running with the same component must not rewrite the
        // group row (etl_id stays put, no new Bulletin).
        run_graph_cursor(&store, &triples, THRESHOLD, 1, 2, "1_2", "tester", "v1", false)
            .unwrap()
            .unwrap();
        let second_etl_id = store.get_group(1).unwrap().unwrap().etl_id;
        assert_eq!(first_etl_id, second_etl_id);
    }

    #[test]
    fn gate_group_writes_skips_group_and_bulletin_writes() {
        let store = Store::in_memory();
        let triples = vec![(1, 2, 0.9)];

        let outcome = run_graph_cursor(&store, &triples, THRESHOLD, 1, 1, "1_1", "tester", "v1", true)
            .unwrap()
            .unwrap();

        assert!(outcome.regrouped_record_ids.is_empty());
        assert!(store.get_group(1).unwrap().is_none());
        assert!(store.get_group(2).unwrap().is_none());
        // The edge itself is still written.
        assert!(store.get_edge(1, 2).unwrap().unwrap().is_valid);
    }

    #[test]
    fn empty_triples_returns_none() {
        let store = Store::in_memory();
        let outcome = run_graph_cursor(&store, &[], THRESHOLD, 1, 1, "1_1", "tester", "v1", false).unwrap();
        assert!(outcome.is_none());
    }
}
