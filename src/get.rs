//! Physician retrieval by NPI.
//!
//! Used by the `finder get` CLI command; the HTTP server calls the same
//! action for `GET /physicians/{npi}`.

use anyhow::Result;

use physician_finder_core::action::ActionState;
use physician_finder_core::models::Physician;
use physician_finder_core::physicians;

use crate::config::Config;
use crate::db;
use crate::pg_store::PgStore;

/// CLI entry point: looks up the NPI and prints the record to stdout.
pub async fn run_get(config: &Config, npi: &str, json: bool) -> Result<()> {
    let pool = db::connect(config).await?;
    let store = PgStore::new(pool.clone());
    let state = physicians::get_physician_by_npi(&store, npi).await;
    pool.close().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&state)?);
        if !state.is_success() {
            std::process::exit(1);
        }
        return Ok(());
    }

    let physician = match state {
        ActionState::Success { data, .. } => data,
        ActionState::Failure(f) => {
            eprintln!("Error: {}", f.message);
            std::process::exit(1);
        }
    };

    for line in profile_lines(&physician) {
        println!("{}", line);
    }
    Ok(())
}

fn profile_lines(p: &Physician) -> Vec<String> {
    let mut lines = vec![
        "--- Physician ---".to_string(),
        format!("npi:          {}", p.npi),
        format!("name:         {}", p.display_name()),
        format!("status:       {}", p.status),
    ];
    if let Some(gender) = p.gender {
        lines.push(format!("gender:       {}", gender));
    }
    lines.push(format!("enumerated:   {}", p.enumeration_date));
    if let Some(updated) = p.last_updated_nppes {
        lines.push(format!("nppes update: {}", updated));
    }
    if p.accepts_telehealth {
        lines.push("telehealth:   yes".to_string());
    }
    if !p.languages.is_empty() {
        lines.push(format!("languages:    {}", p.languages.join(", ")));
    }
    if let Some(loc) = p.location {
        lines.push(format!(
            "location:     {:.5}, {:.5}",
            loc.latitude, loc.longitude
        ));
    }

    lines.push(String::new());
    lines.push("--- Specialties ---".to_string());
    match p.primary_specialty {
        Some(ref s) => lines.push(format!(
            "{} ({}) [primary]",
            s.taxonomy_description, s.taxonomy_code
        )),
        None => lines.push("(none)".to_string()),
    }
    for s in &p.secondary_specialties {
        lines.push(format!("{} ({})", s.taxonomy_description, s.taxonomy_code));
    }

    lines.push(String::new());
    lines.push(format!("--- Addresses ({}) ---", p.addresses.len()));
    for a in &p.addresses {
        let mut street = a.address_line1.clone();
        if let Some(ref line2) = a.address_line2 {
            street.push_str(", ");
            street.push_str(line2);
        }
        lines.push(format!(
            "[{:?}] {}, {}, {} {}",
            a.address_type, street, a.city, a.state, a.zip_code
        ));
    }

    if !p.phone_numbers.is_empty() {
        lines.push(String::new());
        lines.push("--- Phones ---".to_string());
        for phone in &p.phone_numbers {
            lines.push(format!(
                "{:?}: {}{}",
                phone.phone_type,
                phone.number,
                if phone.is_primary { " (primary)" } else { "" }
            ));
        }
    }

    if let Some(ref bio) = p.ai_bio {
        lines.push(String::new());
        lines.push("--- Bio ---".to_string());
        lines.push(bio.clone());
    }
    lines
}
