//! `finder search`: physician search from the command line.
//!
//! Runs the same search action the HTTP server exposes and prints either a
//! human-readable listing or the raw action JSON.

use anyhow::{bail, Result};

use physician_finder_core::action::ActionState;
use physician_finder_core::models::Physician;
use physician_finder_core::physicians;
use physician_finder_core::search::{SearchParams, SearchResults};

use crate::config::Config;
use crate::db;
use crate::pg_store::PgStore;

pub async fn run_search(config: &Config, params: SearchParams, json: bool) -> Result<()> {
    let pool = db::connect(config).await?;
    let store = PgStore::new(pool.clone());

    let settings = config.search.settings();
    let state = physicians::search_physicians(&store, &params, &settings).await;
    pool.close().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&state)?);
        if !state.is_success() {
            std::process::exit(1);
        }
        return Ok(());
    }

    let results = match state {
        ActionState::Success { data, .. } => data,
        ActionState::Failure(f) => bail!("{}", f.message),
    };
    print_results(&results, params.limit.unwrap_or(settings.default_limit));
    Ok(())
}

fn print_results(results: &SearchResults, limit: i64) {
    if results.physicians.is_empty() {
        println!("No results.");
        return;
    }

    println!(
        "Page {} of {} ({} match{})",
        results.current_page,
        results.total_pages,
        results.total_count,
        if results.total_count == 1 { "" } else { "es" }
    );
    println!();

    for (i, p) in results.physicians.iter().enumerate() {
        let rank = (results.current_page - 1) * limit + i as i64 + 1;
        for line in result_lines(rank, p) {
            println!("{}", line);
        }
        println!();
    }
}

/// Lines printed for one result.
fn result_lines(rank: i64, p: &Physician) -> Vec<String> {
    let mut lines = vec![format!("{}. {}", rank, p.display_name())];
    lines.push(format!(
        "    specialty: {}",
        p.primary_specialty_description().unwrap_or("(none)")
    ));

    let place = match (p.addresses.first(), &p.address_state, &p.address_zip5) {
        (Some(a), _, _) => format!("{}, {} {}", a.city, a.state, a.zip_code),
        (None, Some(state), Some(zip)) => format!("{} {}", state, zip),
        (None, Some(state), None) => state.clone(),
        _ => "(unknown)".to_string(),
    };
    lines.push(format!("    location: {}", place));
    lines.push(format!("    npi: {}", p.npi));
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use physician_finder_core::models::SpecialtyInfo;

    #[test]
    fn test_result_lines() {
        let mut p = Physician::new(
            "1234567890",
            "Ana",
            "Ruiz",
            NaiveDate::from_ymd_opt(2011, 2, 3).unwrap(),
        );
        p.credential = Some("MD".to_string());
        p.address_state = Some("IL".to_string());
        p.address_zip5 = Some("60601".to_string());
        p.primary_specialty = Some(SpecialtyInfo {
            taxonomy_code: "207RC0000X".to_string(),
            taxonomy_description: "Cardiovascular Disease".to_string(),
            license_number: None,
            license_state: None,
            primary_specialty: true,
            board_certified: None,
        });

        let lines = result_lines(3, &p);
        assert_eq!(lines[0], "3. Ana Ruiz, MD");
        assert_eq!(lines[1], "    specialty: Cardiovascular Disease");
        assert_eq!(lines[2], "    location: IL 60601");
        assert_eq!(lines[3], "    npi: 1234567890");
    }
}
