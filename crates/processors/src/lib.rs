//! # EMPI Processors (`processors`)
//!
//! Transactional record lifecycle for the identity-resolution engine:
//! ingest, activate, archive, deactivate, delete, the affirm/deny
//! matching actions, `delete_action`'s undo, `query_records`, and
//! batch/process status transitions.
//!
//! Every mutating function takes a [`RowContext`] — the `batch_id`,
//! `proc_id`, and `transaction_key` a [`Auditor::stamp`] call minted
//! for the row being processed — and stamps every row it writes with
//! it. A processor that calls another processor internally (`demographic`
//! calling [`activate_demographic`], `delete_demographic` calling
//! [`deactivate_demographic`] then [`archive_demographic`]) passes the
//! same `RowContext` through rather than minting a fresh one, so the
//! whole chain shares one `transaction_key`.
//!
//! ## Example
//!
//! ```
//! use processors::{ingest_demographic, Auditor};
//! use match_engine::MatchConfig;
//! use store::Store;
//! use serde_json::json;
//!
//! let store = Store::in_memory();
//! let mut auditor = Auditor::open(&store, "demographic", "tester", "v1").unwrap();
//! let rows = vec![json!({
//!     "organization_key": "ORG", "system_key": "SYS", "system_id": "1",
//!     "given_name": "JON", "family_name": "SMITH", "name_day": "1980-06-15",
//!     "postal_code": "62704",
//! })];
//! let summary = ingest_demographic(&store, &mut auditor, &MatchConfig::default(), 0.5, "tester", "v1", &rows).unwrap();
//! assert_eq!(summary.inserted_record_ids.len(), 1);
//! auditor.finish().unwrap();
//! ```

mod auditor;
mod error;
mod payload;
mod types;

use std::collections::HashSet;

use chrono::Utc;
use serde_json::{Map, Value};
use tracing::{info, span, warn, Level};

use match_engine::{compute_all_matches, MatchConfig};
use store::{
    composite_key, composite_name, composite_name_day_postal_code, compute_uq_hash, BatchStatus,
    DeleteAction, Demographic, DemographicArchive, Entity, MatchActionLog, RawDemographicFields,
    RecordActionLog, Store,
};

pub use crate::auditor::Auditor;
pub use crate::error::ProcessorError;
pub use crate::payload::{parse_incoming_demographic, IncomingDemographic};
pub use crate::types::{proc_status, DeleteActionKind, IngestSummary, MatchActionOutcome, RowContext};

fn set_proc_status(store: &Store, proc_id: i64, status: &str) -> Result<(), ProcessorError> {
    if let Some(mut process) = store.get_process(proc_id)? {
        process.proc_status = status.to_string();
        store.put_process(&process)?;
    }
    Ok(())
}

fn set_proc_record_id(store: &Store, proc_id: i64, record_id: i64) -> Result<(), ProcessorError> {
    if let Some(mut process) = store.get_process(proc_id)? {
        process.proc_record_id = Some(record_id);
        store.put_process(&process)?;
    }
    Ok(())
}

fn hard_delete_invalid_edges(store: &Store, record_ids: &HashSet<i64>) -> Result<(), ProcessorError> {
    let mut to_delete: HashSet<(i64, i64)> = HashSet::new();
    for &record_id in record_ids {
        for edge in store.list_edges_touching(record_id)? {
            if !edge.is_valid {
                to_delete.insert((edge.record_id_low, edge.record_id_high));
            }
        }
    }
    for (low, high) in to_delete {
        store.delete_edge(low, high)?;
    }
    Ok(())
}

/// Insert a demographic row built from already-validated fields
/// (shared by [`ingest_demographic`] and `delete_action`'s
/// reconstruction-from-archive path). Returns the minted `record_id`.
fn insert_demographic(
    store: &Store,
    ctx: &RowContext,
    organization_key: &str,
    system_key: &str,
    system_id: &str,
    given_name: &str,
    middle_name: &str,
    family_name: &str,
    gender: &str,
    name_day: chrono::NaiveDate,
    address_1: &str,
    address_2: &str,
    city: &str,
    state: &str,
    postal_code: &str,
    social_security_number: &str,
    source_key: Option<String>,
    source_value: Option<String>,
) -> Result<i64, ProcessorError> {
    let record_id = store.minter().mint(&ctx.user, &ctx.version)?;
    let uq_hash = compute_uq_hash(&RawDemographicFields {
        address_1,
        address_2,
        city,
        state,
        postal_code,
        organization_key,
        system_key,
        system_id,
        given_name,
        family_name,
        name_day,
        gender,
    });

    let demographic = Demographic {
        record_id,
        organization_key: organization_key.to_string(),
        system_key: system_key.to_string(),
        system_id: system_id.to_string(),
        given_name: given_name.to_string(),
        middle_name: middle_name.to_string(),
        family_name: family_name.to_string(),
        gender: gender.to_string(),
        name_day,
        address_1: address_1.to_string(),
        address_2: address_2.to_string(),
        city: city.to_string(),
        state: state.to_string(),
        postal_code: postal_code.to_string(),
        social_security_number: social_security_number.to_string(),
        uq_hash,
        composite_key: composite_key(organization_key, system_key, system_id),
        composite_name: composite_name(given_name, family_name),
        composite_name_day_postal_code: composite_name_day_postal_code(name_day, postal_code),
        is_active: false,
        transaction_key: ctx.transaction_key.clone(),
        source_key,
        source_value,
        touched_by: ctx.user.clone(),
        touched_ts: Utc::now(),
    };
    store.put_demographic(&demographic)?;
    Ok(record_id)
}

/// Ingest every row of a `demographic` POST body. Rows missing a
/// required field are counted as errors and skipped; rows whose
/// `uq_hash` already exists are counted as duplicates and skipped.
/// Every other row is inserted, then immediately fed to
/// [`activate_demographic`].
pub fn ingest_demographic(
    store: &Store,
    auditor: &mut Auditor,
    match_cfg: &MatchConfig,
    graph_threshold: f64,
    user: &str,
    version: &str,
    rows: &[Value],
) -> Result<IngestSummary, ProcessorError> {
    let mut summary = IngestSummary::default();

    for (index, raw_row) in rows.iter().enumerate() {
        let foreign_record_id = raw_row.get("system_id").and_then(Value::as_str).map(str::to_string);
        let (proc_id, transaction_key) = auditor.stamp(index, foreign_record_id)?;
        let ctx = RowContext {
            batch_id: auditor.batch_id(),
            proc_id,
            transaction_key,
            user: user.to_string(),
            version: version.to_string(),
        };
        let _span = span!(Level::INFO, "processors.demographic", row = index, proc_id).entered();

        let object = match raw_row.as_object() {
            Some(object) => object,
            None => {
                warn!(row = index, "ingest row is not a JSON object");
                update_status(store, ctx.batch_id, proc_id, proc_status::ERROR)?;
                summary.errors += 1;
                continue;
            }
        };

        let incoming = match parse_incoming_demographic(object) {
            Ok(incoming) => incoming,
            Err(err) => {
                warn!(row = index, error = %err, "ingest row rejected");
                update_status(store, ctx.batch_id, proc_id, proc_status::ERROR)?;
                summary.errors += 1;
                continue;
            }
        };

        let uq_hash = compute_uq_hash(&RawDemographicFields {
            address_1: &incoming.address_1,
            address_2: &incoming.address_2,
            city: &incoming.city,
            state: &incoming.state,
            postal_code: &incoming.postal_code,
            organization_key: &incoming.organization_key,
            system_key: &incoming.system_key,
            system_id: &incoming.system_id,
            given_name: &incoming.given_name,
            family_name: &incoming.family_name,
            name_day: incoming.name_day,
            gender: &incoming.gender,
        });
        if store.find_demographic_by_uq_hash(&uq_hash)?.is_some() {
            info!(row = index, uq_hash = %uq_hash, "duplicate demographic skipped");
            update_status(store, ctx.batch_id, proc_id, proc_status::DUPLICATE)?;
            summary.skipped += 1;
            continue;
        }

        let record_id = insert_demographic(
            store,
            &ctx,
            &incoming.organization_key,
            &incoming.system_key,
            &incoming.system_id,
            &incoming.given_name,
            &incoming.middle_name,
            &incoming.family_name,
            &incoming.gender,
            incoming.name_day,
            &incoming.address_1,
            &incoming.address_2,
            &incoming.city,
            &incoming.state,
            &incoming.postal_code,
            &incoming.social_security_number,
            incoming.source_key.clone(),
            incoming.source_value.clone(),
        )?;
        set_proc_record_id(store, proc_id, record_id)?;
        set_proc_status(store, proc_id, proc_status::POSTED)?;

        activate_demographic(store, &ctx, match_cfg, graph_threshold, record_id)?;
        info!(row = index, record_id, "demographic ingested and activated");
        summary.inserted_record_ids.push(record_id);
    }

    Ok(summary)
}

/// Activate a just-inserted (or re-activated) demographic: flip
/// `is_active`, revalidate any previously-invalid incident edges,
/// compute fresh fine matches against every coarse candidate, and
/// rewrite the match graph around the result.
pub fn activate_demographic(
    store: &Store,
    ctx: &RowContext,
    match_cfg: &MatchConfig,
    graph_threshold: f64,
    record_id: i64,
) -> Result<Option<graph::GraphCursorOutcome>, ProcessorError> {
    let mut demographic = store
        .get_demographic(record_id)?
        .ok_or(ProcessorError::RecordNotFound { record_id })?;
    demographic.is_active = true;
    demographic.touched_by = ctx.user.clone();
    demographic.touched_ts = Utc::now();
    demographic.transaction_key = ctx.transaction_key.clone();
    store.put_demographic(&demographic)?;

    for mut edge in store.list_edges_touching(record_id)? {
        if !edge.is_valid {
            edge.is_valid = true;
            edge.touched_by = ctx.user.clone();
            edge.touched_ts = Utc::now();
            edge.transaction_key = ctx.transaction_key.clone();
            store.put_edge(&edge)?;
        }
    }

    let (fine_results, elapsed) = compute_all_matches(store, &demographic, match_cfg)?;
    let triples: Vec<(i64, i64, f64)> = fine_results
        .iter()
        .map(|result| (record_id, result.candidate_record_id, result.score))
        .collect();

    let outcome = graph::run_graph_cursor(
        store,
        &triples,
        graph_threshold,
        ctx.batch_id,
        ctx.proc_id,
        &ctx.transaction_key,
        &ctx.user,
        &ctx.version,
        false,
    )?;

    let etl_id = store.minter().mint(&ctx.user, &ctx.version)?;
    store.append_activate_log(&RecordActionLog {
        etl_id,
        record_id,
        transaction_key: ctx.transaction_key.clone(),
    })?;
    update_status(store, ctx.batch_id, ctx.proc_id, proc_status::ACTIVATED)?;

    info!(
        record_id,
        candidates = triples.len(),
        elapsed_micros = elapsed.as_micros(),
        "activate_demographic"
    );
    Ok(outcome)
}

/// Snapshot a Demographic row into DemographicArchive, preserving the
/// row's own `transaction_key` as `archive_transaction_key` and
/// stamping the archiving action's `transaction_key`. Returns the
/// archive's primary key (the archived `record_id`).
pub fn archive_demographic(store: &Store, ctx: &RowContext, record_id: i64) -> Result<i64, ProcessorError> {
    let demographic = store
        .get_demographic(record_id)?
        .ok_or(ProcessorError::RecordNotFound { record_id })?;

    let archive = DemographicArchive {
        record_id: demographic.record_id,
        organization_key: demographic.organization_key,
        system_key: demographic.system_key,
        system_id: demographic.system_id,
        given_name: demographic.given_name,
        middle_name: demographic.middle_name,
        family_name: demographic.family_name,
        gender: demographic.gender,
        name_day: demographic.name_day,
        address_1: demographic.address_1,
        address_2: demographic.address_2,
        city: demographic.city,
        state: demographic.state,
        postal_code: demographic.postal_code,
        social_security_number: demographic.social_security_number,
        uq_hash: demographic.uq_hash,
        composite_key: demographic.composite_key,
        composite_name: demographic.composite_name,
        composite_name_day_postal_code: demographic.composite_name_day_postal_code,
        is_active: demographic.is_active,
        archive_transaction_key: demographic.transaction_key,
        transaction_key: ctx.transaction_key.clone(),
        source_key: demographic.source_key,
        source_value: demographic.source_value,
        touched_by: ctx.user.clone(),
        touched_ts: Utc::now(),
    };
    store.put_demographic_archive(&archive)?;
    set_proc_status(store, ctx.proc_id, proc_status::ARCHIVED)?;
    Ok(archive.record_id)
}

/// Deactivate a demographic: flag it inactive, invalidate every
/// incident edge, drop its group membership (and any component
/// centered on it), then re-run the cursor over the surrounding
/// neighborhoods with group/bulletin writes gated off (the batch is
/// mid-disassembly; a later activation re-forms the component for
/// real) before sweeping up the invalidated edges.
pub fn deactivate_demographic(
    store: &Store,
    ctx: &RowContext,
    graph_threshold: f64,
    record_id: i64,
) -> Result<(), ProcessorError> {
    let pre_expansion = graph::recurse(store, record_id, graph_threshold)?;

    let mut demographic = store
        .get_demographic(record_id)?
        .ok_or(ProcessorError::RecordNotFound { record_id })?;
    demographic.is_active = false;
    demographic.touched_by = ctx.user.clone();
    demographic.touched_ts = Utc::now();
    demographic.transaction_key = ctx.transaction_key.clone();
    store.put_demographic(&demographic)?;

    for mut edge in store.list_edges_touching(record_id)? {
        if edge.is_valid {
            edge.is_valid = false;
            edge.touched_by = ctx.user.clone();
            edge.touched_ts = Utc::now();
            edge.transaction_key = ctx.transaction_key.clone();
            store.put_edge(&edge)?;
        }
    }

    store.delete_group(record_id)?;
    for group in store.list_groups_by_enterprise_id(record_id)? {
        store.delete_group(group.record_id)?;
    }

    for &other in &pre_expansion.visited {
        if other == record_id {
            continue;
        }
        let neighborhood = graph::recurse(store, other, graph_threshold)?;
        if neighborhood.touched_edges.is_empty() {
            continue;
        }
        graph::run_graph_cursor(
            store,
            &neighborhood.touched_edges,
            graph_threshold,
            ctx.batch_id,
            ctx.proc_id,
            &ctx.transaction_key,
            &ctx.user,
            &ctx.version,
            true,
        )?;
    }

    hard_delete_invalid_edges(store, &pre_expansion.visited)?;

    let etl_id = store.minter().mint(&ctx.user, &ctx.version)?;
    store.append_deactivate_log(&RecordActionLog {
        etl_id,
        record_id,
        transaction_key: ctx.transaction_key.clone(),
    })?;
    update_status(store, ctx.batch_id, ctx.proc_id, proc_status::DEACTIVATED)?;

    info!(record_id, reformed = pre_expansion.visited.len() - 1, "deactivate_demographic");
    Ok(())
}

/// `deactivate` then `archive` then remove the Demographic row.
pub fn delete_demographic(
    store: &Store,
    ctx: &RowContext,
    graph_threshold: f64,
    record_id: i64,
) -> Result<(), ProcessorError> {
    deactivate_demographic(store, ctx, graph_threshold, record_id)?;
    archive_demographic(store, ctx, record_id)?;
    store.delete_demographic_row(record_id)?;

    let etl_id = store.minter().mint(&ctx.user, &ctx.version)?;
    store.append_delete_demographic_log(&RecordActionLog {
        etl_id,
        record_id,
        transaction_key: ctx.transaction_key.clone(),
    })?;
    update_status(store, ctx.batch_id, ctx.proc_id, proc_status::DELETED_DEMOGRAPHIC)?;
    Ok(())
}

fn adjust_match_weight(
    store: &Store,
    ctx: &RowContext,
    graph_threshold: f64,
    record_id_low: i64,
    record_id_high: i64,
    delta: f64,
    is_affirm: bool,
) -> Result<MatchActionOutcome, ProcessorError> {
    let (low, high) = (record_id_low.min(record_id_high), record_id_low.max(record_id_high));
    let mut edge = store
        .get_edge(low, high)?
        .ok_or(ProcessorError::EdgeNotFound { low, high })?;
    edge.match_weight += delta;
    edge.touched_by = ctx.user.clone();
    edge.touched_ts = Utc::now();
    edge.transaction_key = ctx.transaction_key.clone();
    store.put_edge(&edge)?;

    let etl_id = store.minter().mint(&ctx.user, &ctx.version)?;
    let log = MatchActionLog {
        etl_id,
        record_id_low: low,
        record_id_high: high,
        transaction_key: ctx.transaction_key.clone(),
    };
    if is_affirm {
        store.append_match_affirm(&log)?;
    } else {
        store.append_match_deny(&log)?;
    }

    // Each side is recurse-expanded and cursor-rewritten independently,
    // but a record reachable from the first seed is skipped on the
    // second pass — both sides end up in the same component far more
    // often than not, and re-running the cursor twice on the same
    // component would double its Bulletin writes.
    let mut processed: HashSet<i64> = HashSet::new();
    let mut regrouped = Vec::new();
    for seed in [low, high] {
        if !processed.insert(seed) {
            continue;
        }
        let result = graph::recurse(store, seed, graph_threshold)?;
        for &id in &result.visited {
            processed.insert(id);
        }
        if result.touched_edges.is_empty() {
            continue;
        }
        if let Some(outcome) = graph::run_graph_cursor(
            store,
            &result.touched_edges,
            graph_threshold,
            ctx.batch_id,
            ctx.proc_id,
            &ctx.transaction_key,
            &ctx.user,
            &ctx.version,
            false,
        )? {
            regrouped.extend(outcome.regrouped_record_ids);
        }
    }

    update_status(
        store,
        ctx.batch_id,
        ctx.proc_id,
        if is_affirm { proc_status::AFFIRMED } else { proc_status::DENIED },
    )?;

    Ok(MatchActionOutcome {
        record_id_low: low,
        record_id_high: high,
        match_weight: edge.match_weight,
        regrouped_record_ids: regrouped,
    })
}

/// +1 to the ordered pair's `match_weight`.
pub fn affirm_matching(
    store: &Store,
    ctx: &RowContext,
    graph_threshold: f64,
    record_id_low: i64,
    record_id_high: i64,
) -> Result<MatchActionOutcome, ProcessorError> {
    adjust_match_weight(store, ctx, graph_threshold, record_id_low, record_id_high, 1.0, true)
}

/// −1 to the ordered pair's `match_weight`.
pub fn deny_matching(
    store: &Store,
    ctx: &RowContext,
    graph_threshold: f64,
    record_id_low: i64,
    record_id_high: i64,
) -> Result<MatchActionOutcome, ProcessorError> {
    adjust_match_weight(store, ctx, graph_threshold, record_id_low, record_id_high, -1.0, false)
}

/// Undo a prior `delete`/`affirm`/`deny` action, identified by the
/// `transaction_key = "{batch_id}_{proc_id}"` it was logged under.
pub fn delete_action(
    store: &Store,
    ctx: &RowContext,
    match_cfg: &MatchConfig,
    graph_threshold: f64,
    target_batch_id: i64,
    target_proc_id: i64,
    action: &str,
) -> Result<(), ProcessorError> {
    let action_kind = DeleteActionKind::parse(action)?;
    let target_transaction_key = format!("{target_batch_id}_{target_proc_id}");

    match action_kind {
        DeleteActionKind::Delete => {
            let archive = store
                .find_demographic_archive_by_transaction_key(&target_transaction_key)?
                .ok_or_else(|| ProcessorError::ActionNotFound {
                    transaction_key: target_transaction_key.clone(),
                })?;
            let record_id = insert_demographic(
                store,
                ctx,
                &archive.organization_key,
                &archive.system_key,
                &archive.system_id,
                &archive.given_name,
                &archive.middle_name,
                &archive.family_name,
                &archive.gender,
                archive.name_day,
                &archive.address_1,
                &archive.address_2,
                &archive.city,
                &archive.state,
                &archive.postal_code,
                &archive.social_security_number,
                archive.source_key.clone(),
                archive.source_value.clone(),
            )?;
            store.delete_demographic_archive(archive.record_id)?;
            activate_demographic(store, ctx, match_cfg, graph_threshold, record_id)?;
        }
        DeleteActionKind::Affirm => {
            let log = store
                .find_match_affirm_by_transaction_key(&target_transaction_key)?
                .ok_or_else(|| ProcessorError::ActionNotFound {
                    transaction_key: target_transaction_key.clone(),
                })?;
            deny_matching(store, ctx, graph_threshold, log.record_id_low, log.record_id_high)?;
        }
        DeleteActionKind::Deny => {
            let log = store
                .find_match_deny_by_transaction_key(&target_transaction_key)?
                .ok_or_else(|| ProcessorError::ActionNotFound {
                    transaction_key: target_transaction_key.clone(),
                })?;
            affirm_matching(store, ctx, graph_threshold, log.record_id_low, log.record_id_high)?;
        }
    }

    let etl_id = store.minter().mint(&ctx.user, &ctx.version)?;
    store.append_delete_action(&DeleteAction {
        etl_id,
        batch_action: action.to_string(),
        archive_proc_id: Some(target_proc_id),
        archive_batch_id: Some(target_batch_id),
        transaction_key: ctx.transaction_key.clone(),
    })?;
    update_status(store, ctx.batch_id, ctx.proc_id, proc_status::UNDONE)?;
    Ok(())
}

/// Equality filter over one table, dropping the `user` field.
pub fn query_records(store: &Store, entity: Entity, filter: &Map<String, Value>) -> Result<Vec<Value>, ProcessorError> {
    Ok(store.query_records(entity, filter)?)
}

/// Set one Process row's status; promote the owning Batch to COMPUTED
/// once no PENDING rows remain in it.
pub fn update_status(store: &Store, batch_id: i64, proc_id: i64, status: &str) -> Result<(), ProcessorError> {
    set_proc_status(store, proc_id, status)?;

    let processes = store.list_processes_by_batch(batch_id)?;
    let all_terminal = !processes.is_empty() && processes.iter().all(|p| p.proc_status != proc_status::PENDING);
    if all_terminal {
        if let Some(mut batch) = store.get_batch(batch_id)? {
            batch.batch_status = BatchStatus::Computed;
            store.put_batch(&batch)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(system_id: &str, family_name: &str, postal_code: &str, name_day: &str) -> Value {
        json!({
            "organization_key": "ORG",
            "system_key": "SYS",
            "system_id": system_id,
            "given_name": "JON",
            "family_name": family_name,
            "gender": "M",
            "name_day": name_day,
            "postal_code": postal_code,
        })
    }

    fn match_cfg() -> MatchConfig {
        MatchConfig::default()
    }

    #[test]
    fn ingest_inserts_and_activates_a_single_row() {
        let store = Store::in_memory();
        let mut auditor = Auditor::open(&store, "demographic", "tester", "v1").unwrap();
        let rows = vec![row("1", "SMITH", "62704", "1980-06-15")];

        let summary = ingest_demographic(&store, &mut auditor, &match_cfg(), 0.5, "tester", "v1", &rows).unwrap();
        auditor.finish().unwrap();

        assert_eq!(summary.inserted_record_ids.len(), 1);
        let record_id = summary.inserted_record_ids[0];
        let demographic = store.get_demographic(record_id).unwrap().unwrap();
        assert!(demographic.is_active);
    }

    #[test]
    fn ingesting_the_same_record_twice_skips_the_duplicate() {
        let store = Store::in_memory();
        let mut auditor = Auditor::open(&store, "demographic", "tester", "v1").unwrap();
        let rows = vec![row("1", "SMITH", "62704", "1980-06-15")];
        ingest_demographic(&store, &mut auditor, &match_cfg(), 0.5, "tester", "v1", &rows).unwrap();
        auditor.finish().unwrap();

        let mut second_auditor = Auditor::open(&store, "demographic", "tester", "v1").unwrap();
        let summary = ingest_demographic(&store, &mut second_auditor, &match_cfg(), 0.5, "tester", "v1", &rows).unwrap();
        second_auditor.finish().unwrap();

        assert_eq!(summary.inserted_record_ids.len(), 0);
        assert_eq!(summary.skipped, 1);
    }

    #[test]
    fn two_matching_records_end_up_in_the_same_enterprise_group() {
        let store = Store::in_memory();
        let mut auditor = Auditor::open(&store, "demographic", "tester", "v1").unwrap();
        let rows = vec![row("1", "SMITH", "62704", "1980-06-15"), row("2", "SMITH", "62704", "1980-06-15")];
        let summary = ingest_demographic(&store, &mut auditor, &match_cfg(), 0.5, "tester", "v1", &rows).unwrap();
        auditor.finish().unwrap();

        assert_eq!(summary.inserted_record_ids.len(), 2);
        let [a, b] = summary.inserted_record_ids[..] else { panic!() };
        let group_a = store.get_group(a).unwrap().unwrap();
        let group_b = store.get_group(b).unwrap().unwrap();
        assert_eq!(group_a.enterprise_id, group_b.enterprise_id);
    }

    #[test]
    fn affirm_then_deny_returns_match_weight_to_its_prior_value() {
        let store = Store::in_memory();
        let mut auditor = Auditor::open(&store, "demographic", "tester", "v1").unwrap();
        let rows = vec![row("1", "SMITH", "62704", "1980-06-15"), row("2", "SMITH", "62704", "1980-06-15")];
        let summary = ingest_demographic(&store, &mut auditor, &match_cfg(), 0.5, "tester", "v1", &rows).unwrap();
        auditor.finish().unwrap();
        let [a, b] = summary.inserted_record_ids[..] else { panic!() };

        let before = store.get_edge(a, b).unwrap().unwrap().match_weight;

        let mut action_auditor = Auditor::open(&store, "match_affirm", "tester", "v1").unwrap();
        let (proc_id, transaction_key) = action_auditor.stamp(0, None).unwrap();
        let ctx = RowContext {
            batch_id: action_auditor.batch_id(),
            proc_id,
            transaction_key,
            user: "tester".into(),
            version: "v1".into(),
        };
        affirm_matching(&store, &ctx, 0.5, a, b).unwrap();
        action_auditor.finish().unwrap();

        let mut deny_auditor = Auditor::open(&store, "match_deny", "tester", "v1").unwrap();
        let (proc_id, transaction_key) = deny_auditor.stamp(0, None).unwrap();
        let ctx = RowContext {
            batch_id: deny_auditor.batch_id(),
            proc_id,
            transaction_key,
            user: "tester".into(),
            version: "v1".into(),
        };
        deny_matching(&store, &ctx, 0.5, a, b).unwrap();
        deny_auditor.finish().unwrap();

        let after = store.get_edge(a, b).unwrap().unwrap().match_weight;
        assert!((before - after).abs() < 1e-9);
    }

    #[test]
    fn affirm_on_a_missing_pair_is_edge_not_found() {
        let store = Store::in_memory();
        let auditor = Auditor::open(&store, "match_affirm", "tester", "v1").unwrap();
        let ctx = RowContext {
            batch_id: auditor.batch_id(),
            proc_id: 0,
            transaction_key: "1_1".into(),
            user: "tester".into(),
            version: "v1".into(),
        };
        let err = affirm_matching(&store, &ctx, 0.5, 1, 2).unwrap_err();
        assert!(matches!(err, ProcessorError::EdgeNotFound { low: 1, high: 2 }));
    }

    #[test]
    fn delete_then_delete_action_reconstructs_the_record() {
        let store = Store::in_memory();
        let mut ingest_auditor = Auditor::open(&store, "demographic", "tester", "v1").unwrap();
        let rows = vec![row("1", "SMITH", "62704", "1980-06-15")];
        let summary = ingest_demographic(&store, &mut ingest_auditor, &match_cfg(), 0.5, "tester", "v1", &rows).unwrap();
        ingest_auditor.finish().unwrap();
        let record_id = summary.inserted_record_ids[0];
        let original = store.get_demographic(record_id).unwrap().unwrap();

        let mut delete_auditor = Auditor::open(&store, "delete_demographic", "tester", "v1").unwrap();
        let (proc_id, transaction_key) = delete_auditor.stamp(0, None).unwrap();
        let delete_batch_id = delete_auditor.batch_id();
        let ctx = RowContext {
            batch_id: delete_batch_id,
            proc_id,
            transaction_key,
            user: "tester".into(),
            version: "v1".into(),
        };
        delete_demographic(&store, &ctx, 0.5, record_id).unwrap();
        delete_auditor.finish().unwrap();
        assert!(store.get_demographic(record_id).unwrap().is_none());

        let mut undo_auditor = Auditor::open(&store, "delete_action", "tester", "v1").unwrap();
        let (undo_proc_id, undo_transaction_key) = undo_auditor.stamp(0, None).unwrap();
        let undo_ctx = RowContext {
            batch_id: undo_auditor.batch_id(),
            proc_id: undo_proc_id,
            transaction_key: undo_transaction_key,
            user: "tester".into(),
            version: "v1".into(),
        };
        delete_action(&store, &undo_ctx, &match_cfg(), 0.5, delete_batch_id, proc_id, "delete").unwrap();
        undo_auditor.finish().unwrap();

        let restored = store
            .list_demographics()
            .unwrap()
            .into_iter()
            .find(|d| d.uq_hash == original.uq_hash)
            .expect("restored demographic should exist under a new record_id");
        assert_eq!(restored.family_name, original.family_name);
        assert_eq!(restored.postal_code, original.postal_code);
        assert_ne!(restored.record_id, original.record_id);
    }

    #[test]
    fn update_status_computes_batch_once_every_row_is_terminal() {
        let store = Store::in_memory();
        let mut auditor = Auditor::open(&store, "demographic", "tester", "v1").unwrap();
        let batch_id = auditor.batch_id();
        let (proc_id, _) = auditor.stamp(0, None).unwrap();
        auditor.finish().unwrap();

        assert_eq!(store.get_batch(batch_id).unwrap().unwrap().batch_status, BatchStatus::Pending);
        update_status(&store, batch_id, proc_id, proc_status::ACTIVATED).unwrap();
        assert_eq!(store.get_batch(batch_id).unwrap().unwrap().batch_status, BatchStatus::Computed);
    }
}
