//! The generic, read-only `query_records` path: a closed table
//! identifier plus an equality filter, instead of a dynamic
//! string-keyed dispatch table.

use serde::{Deserialize, Serialize};

/// Every table `query_records` (and the HTTP `query_records` endpoint)
/// can address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Entity {
    Demographic,
    DemographicArchive,
    ActivateDemographic,
    DeactivateDemographic,
    DeleteDemographic,
    DeleteAction,
    MatchAffirm,
    MatchDeny,
    EnterpriseMatch,
    EnterpriseGroup,
    Bulletin,
    Batch,
    Process,
    EtlIdSource,
    Telecom,
}

/// `Entity` variants paired with their table name, in the order a
/// human would expect to see them documented.
pub const TABLE_NAMES: &[(Entity, &str)] = &[
    (Entity::Demographic, "demographic"),
    (Entity::DemographicArchive, "archive_demographic"),
    (Entity::ActivateDemographic, "activate_demographic"),
    (Entity::DeactivateDemographic, "deactivate_demographic"),
    (Entity::DeleteDemographic, "delete_demographic"),
    (Entity::DeleteAction, "delete_action"),
    (Entity::MatchAffirm, "match_affirm"),
    (Entity::MatchDeny, "match_deny"),
    (Entity::EnterpriseMatch, "enterprise_match"),
    (Entity::EnterpriseGroup, "enterprise_group"),
    (Entity::Bulletin, "bulletin"),
    (Entity::Batch, "batch"),
    (Entity::Process, "process"),
    (Entity::EtlIdSource, "etl_id_source"),
    (Entity::Telecom, "telecom"),
];

impl Entity {
    /// The table name used as the backend key prefix for this entity.
    pub fn table_name(self) -> &'static str {
        TABLE_NAMES
            .iter()
            .find(|(entity, _)| *entity == self)
            .map(|(_, name)| *name)
            .expect("every Entity variant has a TABLE_NAMES entry")
    }

    /// Look up an `Entity` by its table name, as used in the
    /// `/api_{version}/{endpoint}` URL path.
    pub fn from_table_name(name: &str) -> Option<Entity> {
        TABLE_NAMES
            .iter()
            .find(|(_, table_name)| *table_name == name)
            .map(|(entity, _)| *entity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_entity_round_trips_through_its_table_name() {
        for (entity, name) in TABLE_NAMES {
            assert_eq!(entity.table_name(), *name);
            assert_eq!(Entity::from_table_name(name), Some(*entity));
        }
    }

    #[test]
    fn unknown_table_name_resolves_to_none() {
        assert_eq!(Entity::from_table_name("not_a_table"), None);
    }
}
