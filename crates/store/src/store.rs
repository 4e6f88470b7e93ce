//! [`Store`]: the typed façade over a [`StoreBackend`] that every
//! other crate programs against. Rows are encoded with `serde_json`
//! (not the teacher's `bincode`+`zstd`, since these rows are textual
//! and relational rather than fixed-size numeric vectors) under
//! `"{table}/{id}"` composite keys.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::backend::{BackendConfig, StoreBackend};
use crate::entities::*;
use crate::minter::IdMinter;
use crate::query::Entity;
use crate::StoreError;

pub struct Store {
    backend: Arc<dyn StoreBackend>,
    minter: IdMinter,
}

impl Store {
    pub fn new(config: BackendConfig) -> Result<Self, StoreError> {
        let backend: Arc<dyn StoreBackend> = Arc::from(config.build()?);
        Self::with_backend(backend)
    }

    pub fn with_backend(backend: Arc<dyn StoreBackend>) -> Result<Self, StoreError> {
        let minter = IdMinter::new(backend.clone())?;
        Ok(Self { backend, minter })
    }

    pub fn in_memory() -> Self {
        Self::new(BackendConfig::in_memory()).expect("in-memory backend never fails to build")
    }

    pub fn minter(&self) -> &IdMinter {
        &self.minter
    }

    fn put_row<T: Serialize>(&self, table: &str, id: i64, row: &T) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec(row)?;
        self.backend.put(&format!("{table}/{id}"), &bytes)
    }

    fn get_row<T: DeserializeOwned>(&self, table: &str, id: i64) -> Result<Option<T>, StoreError> {
        match self.backend.get(&format!("{table}/{id}"))? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn delete_row(&self, table: &str, id: i64) -> Result<(), StoreError> {
        self.backend.delete(&format!("{table}/{id}"))
    }

    fn scan_rows<T: DeserializeOwned>(&self, table: &str) -> Result<Vec<T>, StoreError> {
        let mut rows = Vec::new();
        let prefix = format!("{table}/");
        self.backend.scan(&prefix, &mut |_key, bytes| {
            rows.push(serde_json::from_slice(bytes)?);
            Ok(())
        })?;
        Ok(rows)
    }

    // -- Demographic ---------------------------------------------------

    pub fn put_demographic(&self, row: &Demographic) -> Result<(), StoreError> {
        self.put_row("demographic", row.record_id, row)
    }

    pub fn get_demographic(&self, record_id: i64) -> Result<Option<Demographic>, StoreError> {
        self.get_row("demographic", record_id)
    }

    pub fn delete_demographic_row(&self, record_id: i64) -> Result<(), StoreError> {
        self.delete_row("demographic", record_id)
    }

    pub fn list_demographics(&self) -> Result<Vec<Demographic>, StoreError> {
        self.scan_rows("demographic")
    }

    pub fn find_demographic_by_uq_hash(
        &self,
        uq_hash: &str,
    ) -> Result<Option<Demographic>, StoreError> {
        Ok(self
            .list_demographics()?
            .into_iter()
            .find(|row| row.uq_hash == uq_hash))
    }

    pub fn put_demographic_archive(&self, row: &DemographicArchive) -> Result<(), StoreError> {
        self.put_row("archive_demographic", row.record_id, row)
    }

    pub fn get_demographic_archive(
        &self,
        record_id: i64,
    ) -> Result<Option<DemographicArchive>, StoreError> {
        self.get_row("archive_demographic", record_id)
    }

    pub fn delete_demographic_archive(&self, record_id: i64) -> Result<(), StoreError> {
        self.delete_row("archive_demographic", record_id)
    }

    // -- Action logs -----------------------------------------------------

    pub fn append_activate_log(&self, row: &RecordActionLog) -> Result<(), StoreError> {
        self.put_row("activate_demographic", row.etl_id, row)
    }

    pub fn append_deactivate_log(&self, row: &RecordActionLog) -> Result<(), StoreError> {
        self.put_row("deactivate_demographic", row.etl_id, row)
    }

    pub fn append_delete_demographic_log(&self, row: &RecordActionLog) -> Result<(), StoreError> {
        self.put_row("delete_demographic", row.etl_id, row)
    }

    pub fn append_delete_action(&self, row: &DeleteAction) -> Result<(), StoreError> {
        self.put_row("delete_action", row.etl_id, row)
    }

    pub fn get_delete_action(&self, etl_id: i64) -> Result<Option<DeleteAction>, StoreError> {
        self.get_row("delete_action", etl_id)
    }

    pub fn append_match_affirm(&self, row: &MatchActionLog) -> Result<(), StoreError> {
        self.put_row("match_affirm", row.etl_id, row)
    }

    pub fn append_match_deny(&self, row: &MatchActionLog) -> Result<(), StoreError> {
        self.put_row("match_deny", row.etl_id, row)
    }

    // -- EnterpriseMatch (edges) -----------------------------------------

    fn edge_key(low: i64, high: i64) -> i64 {
        // distinct key per ordered pair without a second index:
        // pack both record_ids into one i64 (record_ids are small
        // monotonic integers in this engine, so this never collides
        // in practice within a single process's ID space).
        debug_assert!(low <= high);
        low.wrapping_mul(1_000_000_007).wrapping_add(high)
    }

    pub fn put_edge(&self, row: &EnterpriseMatch) -> Result<(), StoreError> {
        let key = Self::edge_key(row.record_id_low, row.record_id_high);
        self.put_row("enterprise_match", key, row)
    }

    pub fn get_edge(&self, low: i64, high: i64) -> Result<Option<EnterpriseMatch>, StoreError> {
        let (low, high) = (low.min(high), low.max(high));
        self.get_row("enterprise_match", Self::edge_key(low, high))
    }

    pub fn list_all_edges(&self) -> Result<Vec<EnterpriseMatch>, StoreError> {
        self.scan_rows("enterprise_match")
    }

    pub fn list_edges_touching(&self, record_id: i64) -> Result<Vec<EnterpriseMatch>, StoreError> {
        Ok(self
            .list_all_edges()?
            .into_iter()
            .filter(|e| e.record_id_low == record_id || e.record_id_high == record_id)
            .collect())
    }

    pub fn delete_edge(&self, low: i64, high: i64) -> Result<(), StoreError> {
        let (low, high) = (low.min(high), low.max(high));
        self.delete_row("enterprise_match", Self::edge_key(low, high))
    }

    // -- EnterpriseGroup --------------------------------------------------

    pub fn put_group(&self, row: &EnterpriseGroup) -> Result<(), StoreError> {
        self.put_row("enterprise_group", row.record_id, row)
    }

    pub fn get_group(&self, record_id: i64) -> Result<Option<EnterpriseGroup>, StoreError> {
        self.get_row("enterprise_group", record_id)
    }

    pub fn delete_group(&self, record_id: i64) -> Result<(), StoreError> {
        self.delete_row("enterprise_group", record_id)
    }

    pub fn list_groups_by_enterprise_id(
        &self,
        enterprise_id: i64,
    ) -> Result<Vec<EnterpriseGroup>, StoreError> {
        Ok(self
            .scan_rows::<EnterpriseGroup>("enterprise_group")?
            .into_iter()
            .filter(|g| g.enterprise_id == enterprise_id)
            .collect())
    }

    // -- Bulletin ----------------------------------------------------------

    pub fn append_bulletin(&self, row: &Bulletin) -> Result<(), StoreError> {
        self.put_row("bulletin", row.etl_id, row)
    }

    // -- Batch / Process ----------------------------------------------------

    pub fn put_batch(&self, row: &Batch) -> Result<(), StoreError> {
        self.put_row("batch", row.batch_id, row)
    }

    pub fn get_batch(&self, batch_id: i64) -> Result<Option<Batch>, StoreError> {
        self.get_row("batch", batch_id)
    }

    pub fn put_process(&self, row: &Process) -> Result<(), StoreError> {
        self.put_row("process", row.proc_id, row)
    }

    pub fn get_process(&self, proc_id: i64) -> Result<Option<Process>, StoreError> {
        self.get_row("process", proc_id)
    }

    pub fn list_processes_by_batch(&self, batch_id: i64) -> Result<Vec<Process>, StoreError> {
        Ok(self
            .scan_rows::<Process>("process")?
            .into_iter()
            .filter(|p| p.batch_id == batch_id)
            .collect())
    }

    // -- ETLIDSource ---------------------------------------------------------

    pub fn get_etl_id_source(&self, etl_id: i64) -> Result<Option<EtlIdSource>, StoreError> {
        self.get_row("etl_id_source", etl_id)
    }

    // -- Action-log lookup by transaction_key --------------------------------

    pub fn list_demographic_archives(&self) -> Result<Vec<DemographicArchive>, StoreError> {
        self.scan_rows("archive_demographic")
    }

    pub fn find_demographic_archive_by_transaction_key(
        &self,
        transaction_key: &str,
    ) -> Result<Option<DemographicArchive>, StoreError> {
        Ok(self
            .list_demographic_archives()?
            .into_iter()
            .find(|row| row.transaction_key == transaction_key))
    }

    pub fn list_match_affirms(&self) -> Result<Vec<MatchActionLog>, StoreError> {
        self.scan_rows("match_affirm")
    }

    pub fn list_match_denies(&self) -> Result<Vec<MatchActionLog>, StoreError> {
        self.scan_rows("match_deny")
    }

    pub fn find_match_affirm_by_transaction_key(
        &self,
        transaction_key: &str,
    ) -> Result<Option<MatchActionLog>, StoreError> {
        Ok(self
            .list_match_affirms()?
            .into_iter()
            .find(|row| row.transaction_key == transaction_key))
    }

    pub fn find_match_deny_by_transaction_key(
        &self,
        transaction_key: &str,
    ) -> Result<Option<MatchActionLog>, StoreError> {
        Ok(self
            .list_match_denies()?
            .into_iter()
            .find(|row| row.transaction_key == transaction_key))
    }

    // -- Telecom -------------------------------------------------------------

    pub fn append_telecom(&self, row: &Telecom) -> Result<(), StoreError> {
        self.put_row("telecom", row.etl_id, row)
    }

    pub fn list_telecom_for_record(&self, record_id: i64) -> Result<Vec<Telecom>, StoreError> {
        Ok(self
            .scan_rows::<Telecom>("telecom")?
            .into_iter()
            .filter(|t| t.record_id == record_id)
            .collect())
    }

    /// Generic equality filter over any table. The `user` key, if
    /// present, is dropped before filtering — it identifies the
    /// caller, not a row field.
    pub fn query_records(
        &self,
        entity: Entity,
        filter: &Map<String, Value>,
    ) -> Result<Vec<Value>, StoreError> {
        let mut filter = filter.clone();
        filter.remove("user");

        let mut rows = Vec::new();
        let prefix = format!("{}/", entity.table_name());
        self.backend.scan(&prefix, &mut |_key, bytes| {
            let row: Value = serde_json::from_slice(bytes)?;
            if matches_filter(&row, &filter) {
                rows.push(row);
            }
            Ok(())
        })?;
        Ok(rows)
    }
}

fn matches_filter(row: &Value, filter: &Map<String, Value>) -> bool {
    filter
        .iter()
        .all(|(key, expected)| row.get(key).map(|actual| actual == expected).unwrap_or(false))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    fn sample_demographic(record_id: i64, family_name: &str) -> Demographic {
        Demographic {
            record_id,
            organization_key: "ORG".into(),
            system_key: "SYS".into(),
            system_id: "ID".into(),
            given_name: "JON".into(),
            middle_name: "A".into(),
            family_name: family_name.into(),
            gender: "M".into(),
            name_day: NaiveDate::from_ymd_opt(1990, 1, 1).unwrap(),
            address_1: "123 MAIN ST".into(),
            address_2: "".into(),
            city: "SPRINGFIELD".into(),
            state: "IL".into(),
            postal_code: "62704".into(),
            social_security_number: "000-00-0000".into(),
            uq_hash: format!("hash-{record_id}"),
            composite_key: "ORG:SYS:ID".into(),
            composite_name: "JONATSMITH".into(),
            composite_name_day_postal_code: Some("19900101:62704".into()),
            is_active: false,
            transaction_key: "1_1".into(),
            source_key: None,
            source_value: None,
            touched_by: "tester".into(),
            touched_ts: Utc::now(),
        }
    }

    #[test]
    fn put_and_get_demographic_round_trips() {
        let store = Store::in_memory();
        let row = sample_demographic(1, "SMITH");
        store.put_demographic(&row).unwrap();
        let fetched = store.get_demographic(1).unwrap().unwrap();
        assert_eq!(fetched, row);
    }

    #[test]
    fn find_by_uq_hash_locates_the_right_row() {
        let store = Store::in_memory();
        store.put_demographic(&sample_demographic(1, "SMITH")).unwrap();
        store.put_demographic(&sample_demographic(2, "JONES")).unwrap();
        let found = store.find_demographic_by_uq_hash("hash-2").unwrap().unwrap();
        assert_eq!(found.record_id, 2);
        assert!(store.find_demographic_by_uq_hash("missing").unwrap().is_none());
    }

    #[test]
    fn edge_put_get_is_order_independent() {
        let store = Store::in_memory();
        let edge = EnterpriseMatch {
            etl_id: 1,
            record_id_low: 1,
            record_id_high: 2,
            match_weight: 0.9,
            is_valid: true,
            transaction_key: "1_1".into(),
            touched_by: "tester".into(),
            touched_ts: Utc::now(),
        };
        store.put_edge(&edge).unwrap();
        assert_eq!(store.get_edge(1, 2).unwrap().unwrap().etl_id, 1);
        assert_eq!(store.get_edge(2, 1).unwrap().unwrap().etl_id, 1);
        assert!(store.get_edge(1, 3).unwrap().is_none());
    }

    #[test]
    fn query_records_filters_by_equality_and_drops_user() {
        let store = Store::in_memory();
        store.put_demographic(&sample_demographic(1, "SMITH")).unwrap();
        store.put_demographic(&sample_demographic(2, "JONES")).unwrap();

        let mut filter = Map::new();
        filter.insert("family_name".to_string(), Value::String("SMITH".into()));
        filter.insert("user".to_string(), Value::String("irrelevant".into()));

        let results = store.query_records(Entity::Demographic, &filter).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0]["record_id"], 1);
    }
}
