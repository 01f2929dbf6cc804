//! NPPES registry import.
//!
//! Reads NPI registry API output and loads individual providers into the
//! physician catalog. Accepted input shapes:
//!
//! - a full API response, `{"result_count": n, "results": [...]}`;
//! - a bare JSON array of records;
//! - JSON Lines, one record per line (the format of bulk exports).
//!
//! Organization (NPI-2) records are skipped. Records missing an NPI, a name
//! or an enumeration date are counted as invalid and logged.

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;

use physician_finder_core::models::{
    AddressPurpose, AddressType, Gender, PhoneNumber, PhoneType, Physician, PracticeAddress,
    ProviderStatus, SpecialtyInfo,
};
use physician_finder_core::store::memory::InMemoryStore;
use physician_finder_core::store::PhysicianStore;

use crate::config::Config;
use crate::db;
use crate::pg_store::PgStore;

#[derive(Debug, Default, Deserialize)]
struct NppesRecord {
    #[serde(default)]
    number: Option<Value>,
    #[serde(default)]
    enumeration_type: Option<String>,
    #[serde(default)]
    basic: NppesBasic,
    #[serde(default)]
    addresses: Vec<NppesAddress>,
    #[serde(default)]
    taxonomies: Vec<NppesTaxonomy>,
}

#[derive(Debug, Default, Deserialize)]
struct NppesBasic {
    first_name: Option<String>,
    last_name: Option<String>,
    middle_name: Option<String>,
    name_suffix: Option<String>,
    credential: Option<String>,
    /// Current registry field name.
    sex: Option<String>,
    /// Older exports use `gender`.
    gender: Option<String>,
    status: Option<String>,
    enumeration_date: Option<String>,
    last_updated: Option<String>,
    deactivation_date: Option<String>,
    deactivation_reason_code: Option<String>,
    reactivation_date: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct NppesAddress {
    address_1: Option<String>,
    address_2: Option<String>,
    city: Option<String>,
    state: Option<String>,
    postal_code: Option<String>,
    country_code: Option<String>,
    address_purpose: Option<String>,
    telephone_number: Option<String>,
    fax_number: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct NppesTaxonomy {
    code: Option<String>,
    desc: Option<String>,
    taxonomy_group: Option<String>,
    license: Option<String>,
    state: Option<String>,
    #[serde(default)]
    primary: bool,
}

/// What a single registry record turned into.
#[derive(Debug)]
pub enum Normalized {
    Physician(Box<Physician>),
    /// NPI-2 records describe organizations, not physicians.
    Organization,
}

/// Counters reported at the end of an import.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    pub read: usize,
    pub inserted: usize,
    pub skipped: usize,
    pub invalid: usize,
}

fn non_empty(s: &Option<String>) -> Option<String> {
    s.as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn parse_date(s: &Option<String>) -> Option<NaiveDate> {
    non_empty(s).and_then(|v| NaiveDate::parse_from_str(&v, "%Y-%m-%d").ok())
}

/// First five digits of a ZIP or ZIP+4, if it has at least five digits.
pub fn zip5(postal_code: &str) -> Option<String> {
    let digits: String = postal_code.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() < 5 {
        return None;
    }
    Some(digits[..5].to_string())
}

/// Formats a nine-digit postal code as ZIP+4; anything else is kept as is.
fn format_zip(postal_code: &str) -> String {
    let trimmed = postal_code.trim();
    if trimmed.len() == 9 && trimmed.chars().all(|c| c.is_ascii_digit()) {
        return format!("{}-{}", &trimmed[..5], &trimmed[5..]);
    }
    trimmed.to_string()
}

fn npi_of(value: &Option<Value>) -> Result<String> {
    let npi = match value {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => bail!("record has no NPI number"),
    };
    if npi.len() != 10 || !npi.chars().all(|c| c.is_ascii_digit()) {
        bail!("NPI must be 10 digits, got '{}'", npi);
    }
    Ok(npi)
}

fn specialty(t: &NppesTaxonomy, primary: bool) -> Option<SpecialtyInfo> {
    let code = non_empty(&t.code)?;
    let description = non_empty(&t.desc).or_else(|| non_empty(&t.taxonomy_group))?;
    Some(SpecialtyInfo {
        taxonomy_code: code,
        taxonomy_description: description,
        license_number: non_empty(&t.license),
        license_state: non_empty(&t.state).map(|s| s.to_uppercase()),
        primary_specialty: primary,
        board_certified: None,
    })
}

fn is_location(a: &NppesAddress) -> bool {
    a.address_purpose
        .as_deref()
        .is_some_and(|p| p.eq_ignore_ascii_case("LOCATION"))
}

/// Turns one registry record into a physician.
pub fn normalize_record(value: Value) -> Result<Normalized> {
    let record: NppesRecord =
        serde_json::from_value(value).context("record does not match the registry shape")?;

    if let Some(ref kind) = record.enumeration_type {
        if kind.eq_ignore_ascii_case("NPI-2") {
            return Ok(Normalized::Organization);
        }
    }

    let npi = npi_of(&record.number)?;
    let basic = &record.basic;
    let first_name = non_empty(&basic.first_name)
        .with_context(|| format!("NPI {} has no first name", npi))?;
    let last_name =
        non_empty(&basic.last_name).with_context(|| format!("NPI {} has no last name", npi))?;
    let enumeration_date = parse_date(&basic.enumeration_date)
        .with_context(|| format!("NPI {} has no valid enumeration date", npi))?;

    let mut p = Physician::new(npi, first_name, last_name, enumeration_date);
    p.middle_name = non_empty(&basic.middle_name);
    p.suffix = non_empty(&basic.name_suffix);
    p.credential = non_empty(&basic.credential);
    p.gender = non_empty(&basic.sex)
        .or_else(|| non_empty(&basic.gender))
        .and_then(|g| g.to_uppercase().parse::<Gender>().ok());
    p.status = non_empty(&basic.status)
        .and_then(|s| s.to_uppercase().parse::<ProviderStatus>().ok())
        .unwrap_or_default();
    p.last_updated_nppes = parse_date(&basic.last_updated);
    p.deactivation_date = parse_date(&basic.deactivation_date);
    p.deactivation_reason = non_empty(&basic.deactivation_reason_code);
    p.reactivation_date = parse_date(&basic.reactivation_date);

    // Specialties: the flagged primary taxonomy, else the first one.
    let primary_index = record
        .taxonomies
        .iter()
        .position(|t| t.primary)
        .unwrap_or(0);
    for (i, t) in record.taxonomies.iter().enumerate() {
        if i == primary_index {
            p.primary_specialty = specialty(t, true);
        } else if let Some(s) = specialty(t, false) {
            p.secondary_specialties.push(s);
        }
    }

    // Addresses: only those with a street line are kept, practice locations
    // first. The first kept address is primary and supplies state and ZIP.
    let mut addresses: Vec<(&NppesAddress, String)> = record
        .addresses
        .iter()
        .filter_map(|a| non_empty(&a.address_1).map(|line1| (a, line1)))
        .collect();
    addresses.sort_by_key(|(a, _)| !is_location(a));
    for (i, (a, line1)) in addresses.iter().enumerate() {
        let line1 = line1.clone();
        let location = is_location(a);
        let is_primary = i == 0;
        p.addresses.push(PracticeAddress {
            address_line1: line1,
            address_line2: non_empty(&a.address_2),
            city: non_empty(&a.city).unwrap_or_default(),
            state: non_empty(&a.state).unwrap_or_default().to_uppercase(),
            zip_code: a.postal_code.as_deref().map(format_zip).unwrap_or_default(),
            country_code: non_empty(&a.country_code).unwrap_or_else(|| "US".to_string()),
            address_type: if location {
                AddressType::Location
            } else {
                AddressType::Mailing
            },
            address_purpose: if location {
                AddressPurpose::Practice
            } else {
                AddressPurpose::Administrative
            },
            is_primary,
        });

        let phones = [
            (&a.telephone_number, PhoneType::Practice),
            (&a.fax_number, PhoneType::Fax),
        ];
        for (number, phone_type) in phones {
            let Some(number) = non_empty(number) else {
                continue;
            };
            if p.phone_numbers.iter().any(|existing| existing.number == number) {
                continue;
            }
            p.phone_numbers.push(PhoneNumber {
                number,
                phone_type,
                is_primary: is_primary && phone_type == PhoneType::Practice,
                location_id: None,
            });
        }
    }

    if let Some((primary, _)) = addresses.first() {
        p.address_state = non_empty(&primary.state).map(|s| s.to_uppercase());
        p.address_zip5 = primary.postal_code.as_deref().and_then(zip5);
    }

    Ok(Normalized::Physician(Box::new(p)))
}

/// Splits input text into raw records, reporting lines that are not JSON.
pub fn parse_records(content: &str) -> (Vec<Value>, Vec<String>) {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return (Vec::new(), Vec::new());
    }

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return match value {
            Value::Array(items) => (items, Vec::new()),
            Value::Object(mut obj) => match obj.remove("results") {
                Some(Value::Array(items)) => (items, Vec::new()),
                Some(_) => (Vec::new(), vec!["'results' is not an array".to_string()]),
                None => (vec![Value::Object(obj)], Vec::new()),
            },
            _ => (Vec::new(), vec!["input is not a JSON object or array".to_string()]),
        };
    }

    let mut records = Vec::new();
    let mut errors = Vec::new();
    for (lineno, line) in trimmed.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(line) {
            Ok(v) => records.push(v),
            Err(e) => errors.push(format!("line {}: {}", lineno + 1, e)),
        }
    }
    (records, errors)
}

/// Normalizes and writes records to any physician store.
///
/// With `replace`, existing NPIs are overwritten; otherwise they are left
/// untouched and counted as skipped.
pub async fn import_records<S: PhysicianStore + ?Sized>(
    store: &S,
    records: Vec<Value>,
    replace: bool,
) -> Result<ImportSummary> {
    let mut summary = ImportSummary::default();

    for value in records {
        summary.read += 1;
        let physician = match normalize_record(value) {
            Ok(Normalized::Physician(p)) => p,
            Ok(Normalized::Organization) => {
                summary.skipped += 1;
                continue;
            }
            Err(e) => {
                tracing::warn!(error = %format!("{:#}", e), "skipping invalid record");
                summary.invalid += 1;
                continue;
            }
        };

        if replace {
            store.upsert_physician(&physician).await?;
            summary.inserted += 1;
        } else if store.insert_physician(&physician).await? {
            summary.inserted += 1;
        } else {
            summary.skipped += 1;
        }
    }

    Ok(summary)
}

pub async fn run_import(config: &Config, path: &Path, replace: bool, dry_run: bool) -> Result<()> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read import file: {}", path.display()))?;

    let (records, parse_errors) = parse_records(&content);
    for err in &parse_errors {
        tracing::warn!(file = %path.display(), "{}", err);
    }

    let summary = if dry_run {
        // Same write path against a throwaway store, so repeated NPIs are
        // counted exactly as a real import would count them.
        let store = InMemoryStore::new();
        import_records(&store, records, replace).await?
    } else {
        let pool = db::connect(config).await?;
        let store = PgStore::new(pool.clone());
        let summary = import_records(&store, records, replace).await?;
        pool.close().await;
        summary
    };

    println!(
        "import {}{}",
        path.display(),
        if dry_run { " (dry-run)" } else { "" }
    );
    println!("  read:     {}", summary.read + parse_errors.len());
    println!(
        "  {}: {}",
        if replace { "upserted" } else { "inserted" },
        summary.inserted
    );
    println!("  skipped:  {}", summary.skipped);
    println!("  invalid:  {}", summary.invalid + parse_errors.len());
    println!("ok");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "number": 1588667638,
            "enumeration_type": "NPI-1",
            "basic": {
                "first_name": "WEI",
                "last_name": "CHEN",
                "middle_name": "L",
                "credential": "M.D.",
                "sex": "F",
                "status": "A",
                "enumeration_date": "2006-07-14",
                "last_updated": "2021-03-02"
            },
            "addresses": [
                {
                    "address_purpose": "MAILING",
                    "address_1": "PO BOX 100",
                    "city": "EVANSTON",
                    "state": "IL",
                    "postal_code": "602010100",
                    "country_code": "US",
                    "telephone_number": "847-555-0111"
                },
                {
                    "address_purpose": "LOCATION",
                    "address_1": "251 E HURON ST",
                    "address_2": "STE 4",
                    "city": "CHICAGO",
                    "state": "il",
                    "postal_code": "606113015",
                    "country_code": "US",
                    "telephone_number": "312-555-0100",
                    "fax_number": "312-555-0199"
                }
            ],
            "taxonomies": [
                { "code": "207R00000X", "desc": "Internal Medicine", "primary": false },
                { "code": "207RC0000X", "desc": "Cardiovascular Disease", "primary": true,
                  "license": "036-123456", "state": "IL" }
            ]
        })
    }

    fn physician(value: Value) -> Physician {
        match normalize_record(value).unwrap() {
            Normalized::Physician(p) => *p,
            Normalized::Organization => panic!("expected a physician"),
        }
    }

    #[test]
    fn test_normalizes_names_dates_and_codes() {
        let p = physician(sample());
        assert_eq!(p.npi, "1588667638");
        assert_eq!(p.first_name, "WEI");
        assert_eq!(p.middle_name.as_deref(), Some("L"));
        assert_eq!(p.gender, Some(Gender::Female));
        assert_eq!(p.status, ProviderStatus::Active);
        assert_eq!(p.enumeration_date, NaiveDate::from_ymd_opt(2006, 7, 14).unwrap());
        assert_eq!(p.last_updated_nppes, NaiveDate::from_ymd_opt(2021, 3, 2));
    }

    #[test]
    fn test_primary_taxonomy_and_secondaries() {
        let p = physician(sample());
        let primary = p.primary_specialty.unwrap();
        assert_eq!(primary.taxonomy_description, "Cardiovascular Disease");
        assert_eq!(primary.license_state.as_deref(), Some("IL"));
        assert!(primary.primary_specialty);
        assert_eq!(p.secondary_specialties.len(), 1);
        assert_eq!(p.secondary_specialties[0].taxonomy_code, "207R00000X");
    }

    #[test]
    fn test_location_address_is_primary() {
        let p = physician(sample());
        assert_eq!(p.addresses[0].address_type, AddressType::Location);
        assert!(p.addresses[0].is_primary);
        assert_eq!(p.addresses[0].zip_code, "60611-3015");
        assert_eq!(p.addresses[0].state, "IL");
        assert_eq!(p.addresses[1].address_type, AddressType::Mailing);
        assert_eq!(p.address_state.as_deref(), Some("IL"));
        assert_eq!(p.address_zip5.as_deref(), Some("60611"));
    }

    #[test]
    fn test_phones_from_addresses() {
        let p = physician(sample());
        let numbers: Vec<(&str, PhoneType, bool)> = p
            .phone_numbers
            .iter()
            .map(|ph| (ph.number.as_str(), ph.phone_type, ph.is_primary))
            .collect();
        assert_eq!(
            numbers,
            vec![
                ("312-555-0100", PhoneType::Practice, true),
                ("312-555-0199", PhoneType::Fax, false),
                ("847-555-0111", PhoneType::Practice, false),
            ]
        );
    }

    #[test]
    fn test_falls_back_to_first_address() {
        let mut v = sample();
        v["addresses"] = json!([{
            "address_purpose": "MAILING",
            "address_1": "1 MAIN ST",
            "city": "MADISON",
            "state": "wi",
            "postal_code": "53703"
        }]);
        let p = physician(v);
        assert_eq!(p.address_state.as_deref(), Some("WI"));
        assert_eq!(p.address_zip5.as_deref(), Some("53703"));
    }

    #[test]
    fn test_addresses_without_street_are_dropped_before_primary() {
        let mut v = sample();
        v["addresses"] = json!([
            {
                "address_purpose": "LOCATION",
                "address_1": " ",
                "city": "CHICAGO",
                "state": "IL",
                "postal_code": "60611"
            },
            {
                "address_purpose": "MAILING",
                "address_1": "1 MAIN ST",
                "city": "MADISON",
                "state": "WI",
                "postal_code": "53703"
            }
        ]);
        let p = physician(v);
        assert_eq!(p.addresses.len(), 1);
        assert_eq!(p.addresses[0].state, "WI");
        assert!(p.addresses[0].is_primary);
        assert_eq!(p.address_state.as_deref(), Some("WI"));
        assert_eq!(p.address_zip5.as_deref(), Some("53703"));
    }

    #[test]
    fn test_organization_records_are_skipped() {
        let mut v = sample();
        v["enumeration_type"] = json!("NPI-2");
        assert!(matches!(normalize_record(v).unwrap(), Normalized::Organization));
    }

    #[test]
    fn test_invalid_records() {
        let mut no_name = sample();
        no_name["basic"]["last_name"] = json!("  ");
        assert!(normalize_record(no_name).is_err());

        let mut bad_npi = sample();
        bad_npi["number"] = json!("12345");
        assert!(normalize_record(bad_npi).is_err());

        let mut no_date = sample();
        no_date["basic"]["enumeration_date"] = json!("07/14/2006");
        assert!(normalize_record(no_date).is_err());
    }

    #[test]
    fn test_zip5() {
        assert_eq!(zip5("60611-3015").as_deref(), Some("60611"));
        assert_eq!(zip5("606113015").as_deref(), Some("60611"));
        assert_eq!(zip5("606"), None);
    }

    #[test]
    fn test_parse_records_shapes() {
        let (records, errors) = parse_records(r#"{"result_count": 2, "results": [{}, {}]}"#);
        assert_eq!((records.len(), errors.len()), (2, 0));

        let (records, _) = parse_records("[{}, {}, {}]");
        assert_eq!(records.len(), 3);

        let (records, errors) = parse_records("{\"number\": 1}\n\nnot json\n{\"number\": 2}\n");
        assert_eq!(records.len(), 2);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("line 3"));
    }

    #[tokio::test]
    async fn test_import_counts_and_replace() {
        let store = InMemoryStore::new();
        let mut org = sample();
        org["enumeration_type"] = json!("NPI-2");
        let records = vec![sample(), org, json!({"number": "x"})];

        let summary = import_records(&store, records, false).await.unwrap();
        assert_eq!(
            summary,
            ImportSummary {
                read: 3,
                inserted: 1,
                skipped: 1,
                invalid: 1
            }
        );

        let mut renamed = sample();
        renamed["basic"]["last_name"] = json!("CHEN-LI");
        let again = import_records(&store, vec![renamed.clone()], false)
            .await
            .unwrap();
        assert_eq!(again.skipped, 1);
        let kept = store.get_physician("1588667638").await.unwrap().unwrap();
        assert_eq!(kept.last_name, "CHEN");

        let replaced = import_records(&store, vec![renamed], true).await.unwrap();
        assert_eq!(replaced.inserted, 1);
        let updated = store.get_physician("1588667638").await.unwrap().unwrap();
        assert_eq!(updated.last_name, "CHEN-LI");
    }

    #[tokio::test]
    async fn test_repeated_npi_counts_as_skipped() {
        let store = InMemoryStore::new();
        let summary = import_records(&store, vec![sample(), sample()], false)
            .await
            .unwrap();
        assert_eq!(summary.inserted, 1);
        assert_eq!(summary.skipped, 1);

        let store = InMemoryStore::new();
        let replaced = import_records(&store, vec![sample(), sample()], true)
            .await
            .unwrap();
        assert_eq!(replaced.inserted, 2);
        assert_eq!(replaced.skipped, 0);
    }
}
