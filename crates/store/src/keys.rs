//! Derived-key computation for incoming demographic payloads:
//! `uq_hash`, `composite_key`, `composite_name`, and
//! `composite_name_day_postal_code`.

use chrono::NaiveDate;
use sha2::{Digest, Sha256};

/// Fields hashed into `uq_hash`, in order. Matches the original
/// uniqueness fingerprint field-by-field.
pub const HASH_KEYS: [&str; 10] = [
    "address_1",
    "address_2",
    "city",
    "state",
    "postal_code",
    "organization_key",
    "given_name",
    "family_name",
    "name_day",
    "gender",
];

/// Minimal view over a staged demographic record, used only to compute
/// derived keys before the row is fully constructed.
pub struct RawDemographicFields<'a> {
    pub address_1: &'a str,
    pub address_2: &'a str,
    pub city: &'a str,
    pub state: &'a str,
    pub postal_code: &'a str,
    pub organization_key: &'a str,
    pub system_key: &'a str,
    pub system_id: &'a str,
    pub given_name: &'a str,
    pub family_name: &'a str,
    pub name_day: NaiveDate,
    pub gender: &'a str,
}

/// SHA-256 hex digest of the `HASH_KEYS` fields, concatenated in order
/// with no separator (missing fields contribute an empty string).
pub fn compute_uq_hash(fields: &RawDemographicFields<'_>) -> String {
    let name_day_str = fields.name_day.format("%Y-%m-%d").to_string();
    let values = [
        fields.address_1,
        fields.address_2,
        fields.city,
        fields.state,
        fields.postal_code,
        fields.organization_key,
        fields.given_name,
        fields.family_name,
        name_day_str.as_str(),
        fields.gender,
    ];
    let mut hasher = Sha256::new();
    for value in values {
        hasher.update(value.as_bytes());
    }
    hex::encode(hasher.finalize())
}

/// `"{organization_key}:{system_key}:{system_id}"`.
pub fn composite_key(organization_key: &str, system_key: &str, system_id: &str) -> String {
    format!("{organization_key}:{system_key}:{system_id}")
}

/// First five characters of `given_name` plus `family_name`, with
/// spaces and hyphens stripped.
pub fn composite_name(given_name: &str, family_name: &str) -> String {
    let prefix: String = given_name.chars().take(5).collect();
    let joined = format!("{prefix}{family_name}");
    joined.chars().filter(|c| *c != ' ' && *c != '-').collect()
}

/// `"{name_day:%Y%m%d}:{postal_code}"`, or `None` if `postal_code` is
/// empty.
pub fn composite_name_day_postal_code(name_day: NaiveDate, postal_code: &str) -> Option<String> {
    if postal_code.is_empty() {
        return None;
    }
    Some(format!("{}:{}", name_day.format("%Y%m%d"), postal_code))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn composite_key_joins_with_colons() {
        assert_eq!(composite_key("org", "sys", "id"), "org:sys:id");
    }

    #[test]
    fn composite_name_strips_spaces_and_hyphens() {
        assert_eq!(composite_name("Mary-Jane", "Smith-Jones"), "MarySmithJones");
        assert_eq!(composite_name("Jonathan", "Doe"), "JonatDoe");
    }

    #[test]
    fn composite_name_day_postal_code_none_when_blank() {
        assert_eq!(composite_name_day_postal_code(date(2000, 1, 2), ""), None);
        assert_eq!(
            composite_name_day_postal_code(date(2000, 1, 2), "12345"),
            Some("20000102:12345".to_string())
        );
    }

    #[test]
    fn uq_hash_is_stable_and_order_sensitive() {
        let fields = RawDemographicFields {
            address_1: "123 MAIN ST",
            address_2: "",
            city: "SPRINGFIELD",
            state: "IL",
            postal_code: "62704",
            organization_key: "ORG",
            system_key: "SYS",
            system_id: "ID",
            given_name: "JON",
            family_name: "SMITH",
            name_day: date(1990, 5, 1),
            gender: "M",
        };
        let h1 = compute_uq_hash(&fields);
        let h2 = compute_uq_hash(&fields);
        assert_eq!(h1, h2);
        assert_eq!(h1.len(), 64);
    }

    #[test]
    fn uq_hash_changes_when_a_hashed_field_changes() {
        let base = RawDemographicFields {
            address_1: "123 MAIN ST",
            address_2: "",
            city: "SPRINGFIELD",
            state: "IL",
            postal_code: "62704",
            organization_key: "ORG",
            system_key: "SYS",
            system_id: "ID",
            given_name: "JON",
            family_name: "SMITH",
            name_day: date(1990, 5, 1),
            gender: "M",
        };
        let changed = RawDemographicFields {
            family_name: "SMYTH",
            ..base
        };
        assert_ne!(compute_uq_hash(&base), compute_uq_hash(&changed));
    }
}
