use std::time::{Duration, Instant};

use comparators::{address_check, family_name_check, given_name_check, middle_name_check, postal_check};
use store::{Demographic, Store};

use crate::types::{FineMatchResult, MatchConfig, MatchError, MatchMode};

/// All demographics whose `postal_code`, `name_day`, or `family_name`
/// equals the seed's corresponding field, excluding the seed itself.
/// Order is unspecified.
pub fn coarse_matching(store: &Store, seed: &Demographic) -> Result<Vec<Demographic>, MatchError> {
    Ok(store
        .list_demographics()?
        .into_iter()
        .filter(|candidate| {
            candidate.record_id != seed.record_id
                && (candidate.postal_code == seed.postal_code
                    || candidate.name_day == seed.name_day
                    || candidate.family_name == seed.family_name)
        })
        .collect())
}

/// `0.3` for each of postal/name_day/family equality; `match = score
/// >= threshold`.
pub fn toy_fine_matching(a: &Demographic, b: &Demographic, cfg: &MatchConfig) -> FineMatchResult {
    let start = Instant::now();

    let postal_eq = a.postal_code == b.postal_code;
    let name_day_eq = a.name_day == b.name_day;
    let family_eq = a.family_name == b.family_name;
    let ssn_eq = a.social_security_number == b.social_security_number;

    let mut score = 0.0;
    if postal_eq {
        score += 0.3;
    }
    if name_day_eq {
        score += 0.3;
    }
    if family_eq {
        score += 0.3;
    }

    FineMatchResult {
        candidate_record_id: b.record_id,
        address_matching: postal_eq,
        name_matching: family_eq,
        name_day_matching: name_day_eq,
        ssn_matching: ssn_eq,
        model_score: None,
        score,
        threshold: cfg.threshold,
        is_match: score >= cfg.threshold,
        exec_time_secs: start.elapsed().as_secs_f64(),
    }
}

/// Weights comparator results instead of raw field equality: a richer
/// scorer behind the same signature as [`toy_fine_matching`], giving
/// partial credit for near-matches via `slice_weight`.
pub fn prod_fine_matching(a: &Demographic, b: &Demographic, cfg: &MatchConfig) -> FineMatchResult {
    let start = Instant::now();

    let (family_eq, _family_metrics) = family_name_check(&a.family_name, &b.family_name);
    let (given_eq, given_metrics) = given_name_check(&a.given_name, &b.given_name, cfg.slice_min);
    let (middle_eq, _middle_metrics) = middle_name_check(&a.middle_name, &b.middle_name);
    let (address_1_eq, address_1_metrics) = address_check(&a.address_1, &b.address_1, cfg.slice_min);
    let (address_2_eq, address_2_metrics) = address_check(&a.address_2, &b.address_2, cfg.slice_min);
    let (postal_eq, _postal_metrics) = postal_check(&a.postal_code, &b.postal_code);

    let credit = |equal: bool, slice_weight: Option<f64>| -> f64 {
        if equal {
            1.0
        } else {
            slice_weight.unwrap_or(0.0)
        }
    };

    const FAMILY_WEIGHT: f64 = 0.3;
    const GIVEN_WEIGHT: f64 = 0.2;
    const MIDDLE_WEIGHT: f64 = 0.05;
    const ADDRESS_1_WEIGHT: f64 = 0.1;
    const ADDRESS_2_WEIGHT: f64 = 0.05;
    const POSTAL_WEIGHT: f64 = 0.3;

    let score = FAMILY_WEIGHT * credit(family_eq, None)
        + GIVEN_WEIGHT * credit(given_eq, given_metrics.slice_weight)
        + MIDDLE_WEIGHT * credit(middle_eq, None)
        + ADDRESS_1_WEIGHT * credit(address_1_eq, address_1_metrics.slice_weight)
        + ADDRESS_2_WEIGHT * credit(address_2_eq, address_2_metrics.slice_weight)
        + POSTAL_WEIGHT * credit(postal_eq, None);

    FineMatchResult {
        candidate_record_id: b.record_id,
        address_matching: address_1_eq || address_2_eq,
        name_matching: family_eq && given_eq,
        name_day_matching: a.name_day == b.name_day,
        ssn_matching: a.social_security_number == b.social_security_number,
        model_score: None,
        score,
        threshold: cfg.threshold,
        is_match: score >= cfg.threshold,
        exec_time_secs: start.elapsed().as_secs_f64(),
    }
}

fn fine_match_fn(mode: MatchMode) -> fn(&Demographic, &Demographic, &MatchConfig) -> FineMatchResult {
    match mode {
        MatchMode::Toy => toy_fine_matching,
        MatchMode::Prod => prod_fine_matching,
    }
}

/// Fine-match results for every coarse candidate of `seed`, plus total
/// elapsed time.
pub fn compute_all_matches(
    store: &Store,
    seed: &Demographic,
    cfg: &MatchConfig,
) -> Result<(Vec<FineMatchResult>, Duration), MatchError> {
    let start = Instant::now();
    let candidates = coarse_matching(store, seed)?;
    let fine_fn = fine_match_fn(cfg.mode);
    let results = candidates
        .iter()
        .map(|candidate| fine_fn(seed, candidate, cfg))
        .collect();
    Ok((results, start.elapsed()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    fn demographic(record_id: i64, family_name: &str, postal_code: &str, name_day: NaiveDate) -> Demographic {
        Demographic {
            record_id,
            organization_key: "ORG".into(),
            system_key: "SYS".into(),
            system_id: format!("ID{record_id}"),
            given_name: "JON".into(),
            middle_name: "A".into(),
            family_name: family_name.into(),
            gender: "M".into(),
            name_day,
            address_1: "123 MAIN ST".into(),
            address_2: "".into(),
            city: "SPRINGFIELD".into(),
            state: "IL".into(),
            postal_code: postal_code.into(),
            social_security_number: "000-00-0000".into(),
            uq_hash: format!("hash-{record_id}"),
            composite_key: "ORG:SYS:ID".into(),
            composite_name: "JONATSMITH".into(),
            composite_name_day_postal_code: None,
            is_active: true,
            transaction_key: "1_1".into(),
            source_key: None,
            source_value: None,
            touched_by: "tester".into(),
            touched_ts: Utc::now(),
        }
    }

    #[test]
    fn toy_fine_matching_scores_point_nine_on_triple_equality() {
        let day = NaiveDate::from_ymd_opt(1980, 6, 15).unwrap();
        let a = demographic(1, "SMITH", "62704", day);
        let b = demographic(2, "SMITH", "62704", day);
        let cfg = MatchConfig::default();

        let result = toy_fine_matching(&a, &b, &cfg);
        assert!((result.score - 0.9).abs() < 1e-9);
        assert!(result.is_match);
    }

    #[test]
    fn toy_fine_matching_no_match_below_threshold() {
        let a = demographic(1, "SMITH", "62704", NaiveDate::from_ymd_opt(1980, 6, 15).unwrap());
        let b = demographic(2, "JONES", "10001", NaiveDate::from_ymd_opt(1991, 1, 1).unwrap());
        let cfg = MatchConfig::default();

        let result = toy_fine_matching(&a, &b, &cfg);
        assert_eq!(result.score, 0.0);
        assert!(!result.is_match);
    }

    #[test]
    fn coarse_matching_excludes_seed_and_requires_one_shared_field() {
        let store = Store::in_memory();
        let day = NaiveDate::from_ymd_opt(1980, 6, 15).unwrap();
        let seed = demographic(1, "SMITH", "62704", day);
        let same_postal = demographic(2, "DIFFERENT", "62704", NaiveDate::from_ymd_opt(2000, 1, 1).unwrap());
        let unrelated = demographic(3, "OTHER", "00000", NaiveDate::from_ymd_opt(1970, 1, 1).unwrap());
        store.put_demographic(&seed).unwrap();
        store.put_demographic(&same_postal).unwrap();
        store.put_demographic(&unrelated).unwrap();

        let candidates = coarse_matching(&store, &seed).unwrap();
        let ids: Vec<i64> = candidates.iter().map(|d| d.record_id).collect();
        assert!(ids.contains(&2));
        assert!(!ids.contains(&1));
        assert!(!ids.contains(&3));
    }

    #[test]
    fn prod_fine_matching_honors_configured_slice_min() {
        let day = NaiveDate::from_ymd_opt(1980, 6, 15).unwrap();
        let mut a = demographic(1, "SMITH", "62704", day);
        let mut b = demographic(2, "JONES", "10001", NaiveDate::from_ymd_opt(1991, 1, 1).unwrap());
        a.given_name = "JON".into();
        b.given_name = "JONATHAN".into();

        let lenient = MatchConfig { slice_min: 3, ..MatchConfig::default() };
        let strict = MatchConfig { slice_min: 8, ..MatchConfig::default() };

        let lenient_result = prod_fine_matching(&a, &b, &lenient);
        let strict_result = prod_fine_matching(&a, &b, &strict);

        // At slice_min 3 the shared "JON" prefix earns given_name partial
        // credit; at slice_min 8 no prefix of that length exists, so the
        // given_name contribution drops to zero and the total score falls.
        assert!(lenient_result.score > strict_result.score);
    }

    #[test]
    fn compute_all_matches_returns_one_result_per_candidate() {
        let store = Store::in_memory();
        let day = NaiveDate::from_ymd_opt(1980, 6, 15).unwrap();
        let seed = demographic(1, "SMITH", "62704", day);
        let candidate = demographic(2, "SMITH", "62704", day);
        store.put_demographic(&seed).unwrap();
        store.put_demographic(&candidate).unwrap();

        let cfg = MatchConfig::default();
        let (results, _elapsed) = compute_all_matches(&store, &seed, &cfg).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].candidate_record_id, 2);
        assert!(results[0].is_match);
    }
}
