use anyhow::{Context, Result};
use sqlx::PgPool;

use crate::config::Config;
use crate::db;

/// Extensions the schema and search queries depend on.
pub const REQUIRED_EXTENSIONS: [&str; 2] = ["pg_trgm", "postgis"];

/// Schema statements, applied in order. Each one is idempotent.
const SCHEMA: &[(&str, &str)] = &[
    (
        "physicians table",
        r#"
        CREATE TABLE IF NOT EXISTS physicians (
            npi TEXT PRIMARY KEY,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            middle_name TEXT,
            suffix TEXT,
            credential TEXT,
            gender TEXT CHECK (gender IN ('M', 'F', 'X')),
            status TEXT NOT NULL DEFAULT 'A' CHECK (status IN ('A', 'I', 'D', 'R')),
            enumeration_date DATE NOT NULL,
            last_updated_nppes DATE,
            deactivation_date DATE,
            deactivation_reason TEXT,
            reactivation_date DATE,
            primary_specialty JSONB,
            secondary_specialties JSONB NOT NULL DEFAULT '[]',
            addresses JSONB NOT NULL DEFAULT '[]',
            phone_numbers JSONB NOT NULL DEFAULT '[]',
            address_state TEXT,
            address_zip5 TEXT,
            location GEOGRAPHY(POINT, 4326),
            languages TEXT[] NOT NULL DEFAULT '{}',
            accepts_telehealth BOOLEAN NOT NULL DEFAULT FALSE,
            ai_bio TEXT,
            ai_bio_source TEXT,
            ai_bio_version TEXT,
            ai_bio_enriched_at TIMESTAMPTZ,
            geo_enriched_at TIMESTAMPTZ,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            full_name_tsv TSVECTOR
        )
        "#,
    ),
    (
        "users table",
        r#"
        CREATE TABLE IF NOT EXISTS users (
            user_id TEXT PRIMARY KEY,
            platform_role TEXT NOT NULL DEFAULT 'member'
                CHECK (platform_role IN ('admin', 'member')),
            created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )
        "#,
    ),
    (
        "organizations table",
        r#"
        CREATE TABLE IF NOT EXISTS organizations (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            name TEXT NOT NULL,
            slug TEXT NOT NULL UNIQUE,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )
        "#,
    ),
    (
        "organization_memberships table",
        r#"
        CREATE TABLE IF NOT EXISTS organization_memberships (
            user_id TEXT NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
            organization_id UUID NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
            role TEXT NOT NULL DEFAULT 'member' CHECK (role IN ('admin', 'member')),
            created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            PRIMARY KEY (user_id, organization_id)
        )
        "#,
    ),
    (
        "finder_instances table",
        r#"
        CREATE TABLE IF NOT EXISTS finder_instances (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            organization_id UUID NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            slug TEXT NOT NULL UNIQUE,
            canonical_host TEXT UNIQUE,
            configuration JSONB NOT NULL DEFAULT '{}',
            custom_domain TEXT UNIQUE,
            vercel_domain_id TEXT,
            domain_status TEXT
                CHECK (domain_status IN ('pending', 'verified', 'failed', 'inactive')),
            embed_script_id TEXT UNIQUE,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )
        "#,
    ),
    // full_name_tsv is derived, never written by the application.
    (
        "full-name vector function",
        r#"
        CREATE OR REPLACE FUNCTION physicians_full_name_tsv() RETURNS trigger AS $$
        BEGIN
            NEW.full_name_tsv := to_tsvector(
                'simple',
                concat_ws(' ', NEW.first_name, NEW.middle_name, NEW.last_name)
            );
            RETURN NEW;
        END
        $$ LANGUAGE plpgsql
        "#,
    ),
    (
        "full-name vector trigger (drop)",
        "DROP TRIGGER IF EXISTS physicians_full_name_tsv_trg ON physicians",
    ),
    (
        "full-name vector trigger",
        r#"
        CREATE TRIGGER physicians_full_name_tsv_trg
            BEFORE INSERT OR UPDATE OF first_name, middle_name, last_name ON physicians
            FOR EACH ROW EXECUTE FUNCTION physicians_full_name_tsv()
        "#,
    ),
    (
        "updated_at function",
        r#"
        CREATE OR REPLACE FUNCTION touch_updated_at() RETURNS trigger AS $$
        BEGIN
            NEW.updated_at := now();
            RETURN NEW;
        END
        $$ LANGUAGE plpgsql
        "#,
    ),
    (
        "location index",
        "CREATE INDEX IF NOT EXISTS location_idx ON physicians USING GIST (location)",
    ),
    (
        "last name trigram index",
        "CREATE INDEX IF NOT EXISTS last_name_trgm_idx ON physicians USING GIN (last_name gin_trgm_ops)",
    ),
    (
        "first name trigram index",
        "CREATE INDEX IF NOT EXISTS first_name_trgm_idx ON physicians USING GIN (first_name gin_trgm_ops)",
    ),
    (
        "full-name vector index",
        "CREATE INDEX IF NOT EXISTS full_name_tsv_idx ON physicians USING GIN (full_name_tsv)",
    ),
    (
        "state/zip index",
        "CREATE INDEX IF NOT EXISTS state_zip_idx ON physicians (address_state, address_zip5)",
    ),
    (
        "membership organization index",
        "CREATE INDEX IF NOT EXISTS memberships_org_idx ON organization_memberships (organization_id)",
    ),
];

/// Tables whose `updated_at` is refreshed by trigger on every update.
const TOUCHED_TABLES: [&str; 5] = [
    "physicians",
    "users",
    "organizations",
    "organization_memberships",
    "finder_instances",
];

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;

    for ext in REQUIRED_EXTENSIONS {
        sqlx::query(&format!("CREATE EXTENSION IF NOT EXISTS {}", ext))
            .execute(&pool)
            .await
            .with_context(|| format!("Failed to create extension {}", ext))?;
    }

    apply_schema(&pool).await?;

    pool.close().await;
    Ok(())
}

/// Applies tables, triggers and indexes to an open pool.
pub async fn apply_schema(pool: &PgPool) -> Result<()> {
    for (name, sql) in SCHEMA {
        sqlx::query(sql)
            .execute(pool)
            .await
            .with_context(|| format!("Migration step failed: {}", name))?;
        tracing::debug!(step = name, "migration step applied");
    }

    for table in TOUCHED_TABLES {
        sqlx::query(&format!(
            "DROP TRIGGER IF EXISTS {table}_touch_updated_at ON {table}"
        ))
        .execute(pool)
        .await?;
        sqlx::query(&format!(
            "CREATE TRIGGER {table}_touch_updated_at BEFORE UPDATE ON {table} \
             FOR EACH ROW EXECUTE FUNCTION touch_updated_at()"
        ))
        .execute(pool)
        .await
        .with_context(|| format!("Failed to create updated_at trigger on {}", table))?;
    }

    Ok(())
}

/// Names of required extensions that are not installed.
pub async fn missing_extensions(pool: &PgPool) -> Result<Vec<String>> {
    let installed: Vec<String> = sqlx::query_scalar("SELECT extname::text FROM pg_extension")
        .fetch_all(pool)
        .await
        .with_context(|| "Failed to list installed extensions")?;

    Ok(REQUIRED_EXTENSIONS
        .iter()
        .filter(|ext| !installed.iter().any(|i| i == *ext))
        .map(|ext| ext.to_string())
        .collect())
}

/// Fails unless every required extension is installed.
pub async fn check_extensions(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    let missing = missing_extensions(&pool).await?;
    pool.close().await;

    if !missing.is_empty() {
        anyhow::bail!(
            "Missing Postgres extensions: {}. Run `finder init` with a role allowed to create them.",
            missing.join(", ")
        );
    }
    println!("Extensions OK: {}", REQUIRED_EXTENSIONS.join(", "));
    Ok(())
}
