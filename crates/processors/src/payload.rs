//! Parsing and validation of one incoming demographic row.
//!
//! A row arrives as a JSON object (one element of the `demographics`
//! array in a `demographic` POST body). [`parse_incoming_demographic`]
//! extracts the required fields, parses `name_day`, and leaves derived
//! keys (`uq_hash`, `composite_key`, …) to the caller, which has the
//! minted `record_id` and `transaction_key` this module doesn't.

use chrono::NaiveDate;
use serde_json::{Map, Value};

use crate::ProcessorError;

/// One demographic row after field extraction and `name_day` parsing,
/// still missing the identifiers and audit stamps a processor mints.
#[derive(Debug, Clone, PartialEq)]
pub struct IncomingDemographic {
    pub organization_key: String,
    pub system_key: String,
    pub system_id: String,
    pub given_name: String,
    pub middle_name: String,
    pub family_name: String,
    pub gender: String,
    pub name_day: NaiveDate,
    pub address_1: String,
    pub address_2: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub social_security_number: String,
    pub source_key: Option<String>,
    pub source_value: Option<String>,
}

/// Fields a row must supply; everything else defaults to an empty
/// string when the payload omits it.
const REQUIRED_FIELDS: &[&str] = &[
    "organization_key",
    "system_key",
    "system_id",
    "given_name",
    "family_name",
    "name_day",
];

pub fn parse_incoming_demographic(raw: &Map<String, Value>) -> Result<IncomingDemographic, ProcessorError> {
    for field in REQUIRED_FIELDS {
        if !raw.contains_key(*field) {
            return Err(ProcessorError::MissingField((*field).to_string()));
        }
    }

    let name_day_raw = required_str(raw, "name_day")?;
    let name_day = parse_name_day(&name_day_raw)?;

    Ok(IncomingDemographic {
        organization_key: required_str(raw, "organization_key")?,
        system_key: required_str(raw, "system_key")?,
        system_id: required_str(raw, "system_id")?,
        given_name: required_str(raw, "given_name")?,
        middle_name: optional_str(raw, "middle_name"),
        family_name: required_str(raw, "family_name")?,
        gender: optional_str(raw, "gender"),
        name_day,
        address_1: optional_str(raw, "address_1"),
        address_2: optional_str(raw, "address_2"),
        city: optional_str(raw, "city"),
        state: optional_str(raw, "state"),
        postal_code: optional_str(raw, "postal_code"),
        social_security_number: optional_str(raw, "social_security_number"),
        source_key: raw.get("source_key").and_then(Value::as_str).map(str::to_string),
        source_value: raw.get("source_value").and_then(Value::as_str).map(str::to_string),
    })
}

fn required_str(raw: &Map<String, Value>, field: &str) -> Result<String, ProcessorError> {
    raw.get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| ProcessorError::MissingField(field.to_string()))
}

fn optional_str(raw: &Map<String, Value>, field: &str) -> String {
    raw.get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_default()
}

/// Accepts a native `YYYY-MM-DD` date or the compact `YYYYMMDD` form.
fn parse_name_day(raw: &str) -> Result<NaiveDate, ProcessorError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y%m%d"))
        .map_err(|_| ProcessorError::InvalidDate(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Map<String, Value> {
        json!({
            "organization_key": "ORG",
            "system_key": "SYS",
            "system_id": "ID1",
            "given_name": "JON",
            "middle_name": "A",
            "family_name": "SMITH",
            "gender": "M",
            "name_day": "1980-06-15",
            "address_1": "123 MAIN ST",
            "postal_code": "62704",
        })
        .as_object()
        .unwrap()
        .clone()
    }

    #[test]
    fn parses_a_complete_row() {
        let row = parse_incoming_demographic(&sample()).unwrap();
        assert_eq!(row.family_name, "SMITH");
        assert_eq!(row.middle_name, "A");
        assert_eq!(row.name_day, NaiveDate::from_ymd_opt(1980, 6, 15).unwrap());
    }

    #[test]
    fn accepts_compact_name_day() {
        let mut raw = sample();
        raw.insert("name_day".into(), json!("19800615"));
        let row = parse_incoming_demographic(&raw).unwrap();
        assert_eq!(row.name_day, NaiveDate::from_ymd_opt(1980, 6, 15).unwrap());
    }

    #[test]
    fn missing_required_field_is_reported() {
        let mut raw = sample();
        raw.remove("family_name");
        let err = parse_incoming_demographic(&raw).unwrap_err();
        assert!(matches!(err, ProcessorError::MissingField(f) if f == "family_name"));
    }

    #[test]
    fn malformed_name_day_is_reported() {
        let mut raw = sample();
        raw.insert("name_day".into(), json!("not-a-date"));
        let err = parse_incoming_demographic(&raw).unwrap_err();
        assert!(matches!(err, ProcessorError::InvalidDate(_)));
    }

    #[test]
    fn middle_name_is_read_from_middle_name_field_not_address_1() {
        let mut raw = sample();
        raw.insert("address_1".into(), json!("999 DIFFERENT AVE"));
        raw.insert("middle_name".into(), json!("Q"));
        let row = parse_incoming_demographic(&raw).unwrap();
        assert_eq!(row.middle_name, "Q");
        assert_eq!(row.address_1, "999 DIFFERENT AVE");
    }
}
