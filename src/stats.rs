//! Catalog statistics.
//!
//! Summarizes what has been imported: physician counts by status, geocoding
//! coverage, account totals, and the states with the most physicians. Used
//! by `finder stats` to confirm an import landed as expected.

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use sqlx::Row;

use crate::config::Config;
use crate::db;

/// How many states to list in the breakdown.
const TOP_STATES: i64 = 10;

/// Run the stats command: query the database and print a summary.
pub async fn run_stats(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;

    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM physicians")
        .fetch_one(&pool)
        .await?;

    let geocoded: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM physicians WHERE location IS NOT NULL")
            .fetch_one(&pool)
            .await?;

    let last_update: Option<DateTime<Utc>> =
        sqlx::query_scalar("SELECT MAX(updated_at) FROM physicians")
            .fetch_one(&pool)
            .await?;

    let users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(&pool)
        .await?;
    let organizations: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM organizations")
        .fetch_one(&pool)
        .await?;

    println!("Physician Finder catalog");
    println!("========================");
    println!();
    println!("  Physicians:    {}", total);
    println!(
        "  Geocoded:      {} / {} ({}%)",
        geocoded,
        total,
        percent(geocoded, total)
    );
    println!(
        "  Last update:   {}",
        last_update
            .map(format_relative)
            .unwrap_or_else(|| "never".to_string())
    );
    println!("  Users:         {}", users);
    println!("  Organizations: {}", organizations);

    let status_rows =
        sqlx::query("SELECT status, COUNT(*) AS n FROM physicians GROUP BY status ORDER BY status")
            .fetch_all(&pool)
            .await?;
    if !status_rows.is_empty() {
        println!();
        println!("  By status:");
        for row in &status_rows {
            let status: String = row.get("status");
            let n: i64 = row.get("n");
            println!("    {:<14} {:>8}", status_label(&status), n);
        }
    }

    let state_rows = sqlx::query(
        r#"
        SELECT address_state, COUNT(*) AS n
        FROM physicians
        WHERE address_state IS NOT NULL
        GROUP BY address_state
        ORDER BY n DESC, address_state
        LIMIT $1
        "#,
    )
    .bind(TOP_STATES)
    .fetch_all(&pool)
    .await?;

    if !state_rows.is_empty() {
        println!();
        println!("  Top states:");
        println!("    {:<6} {:>8} {:>7}", "STATE", "COUNT", "SHARE");
        println!("    {}", "-".repeat(23));
        for row in &state_rows {
            let state: String = row.get("address_state");
            let n: i64 = row.get("n");
            println!("    {:<6} {:>8} {:>6}%", state, n, percent(n, total));
        }
    }

    println!();

    pool.close().await;
    Ok(())
}

fn percent(part: i64, whole: i64) -> i64 {
    if whole > 0 {
        (part * 100) / whole
    } else {
        0
    }
}

fn status_label(code: &str) -> &str {
    match code {
        "A" => "active",
        "I" => "inactive",
        "D" => "deactivated",
        "R" => "retired",
        other => other,
    }
}

/// Age of `ts` in the largest whole unit, or the date once it is a month old.
fn format_relative(ts: DateTime<Utc>) -> String {
    let age = Utc::now().signed_duration_since(ts);
    if age < Duration::zero() || age.num_days() >= 30 {
        return ts.format("%Y-%m-%d %H:%M").to_string();
    }

    let (n, unit) = if age.num_days() > 0 {
        (age.num_days(), "day")
    } else if age.num_hours() > 0 {
        (age.num_hours(), "hour")
    } else if age.num_minutes() > 0 {
        (age.num_minutes(), "min")
    } else {
        return "just now".to_string();
    };
    format!("{} {}{} ago", n, unit, if n == 1 { "" } else { "s" })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_handles_empty_catalog() {
        assert_eq!(percent(0, 0), 0);
        assert_eq!(percent(1, 3), 33);
    }

    #[test]
    fn test_format_relative() {
        assert_eq!(format_relative(Utc::now()), "just now");
        assert_eq!(format_relative(Utc::now() - Duration::hours(3)), "3 hours ago");
        assert_eq!(format_relative(Utc::now() - Duration::days(1)), "1 day ago");
    }

    #[test]
    fn test_status_label() {
        assert_eq!(status_label("D"), "deactivated");
        assert_eq!(status_label("?"), "?");
    }
}
