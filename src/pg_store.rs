//! Postgres-backed store implementation.
//!
//! Search and count share one predicate builder so the count always covers
//! exactly the rows the page query draws from. Text matching is done by the
//! database: `pg_trgm` for `similarity()`, the `simple` text-search
//! configuration for the prefix tsquery over `full_name_tsv`.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use physician_finder_core::models::{
    GeoPoint, NewUser, Organization, OrganizationMembership, OrganizationUpdate, PhoneNumber,
    Physician, PracticeAddress, SpecialtyInfo, User, UserRole, UserUpdate,
};
use physician_finder_core::search::{SearchPlan, SortBy, SortSpec};
use physician_finder_core::store::{AccountStore, PhysicianStore, StoreError, StoreResult};

/// Postgres implementation of both store traits.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Maps constraint violations to their typed variants.
fn store_error(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(ref db) = e {
        if db.is_unique_violation() {
            return StoreError::Conflict(db.message().to_string());
        }
        if db.is_foreign_key_violation() {
            return StoreError::MissingReference(db.message().to_string());
        }
    }
    StoreError::Backend(e.into())
}

const PHYSICIAN_COLUMNS: &str = "npi, first_name, last_name, middle_name, suffix, credential, \
     gender, status, enumeration_date, last_updated_nppes, deactivation_date, \
     deactivation_reason, reactivation_date, primary_specialty, secondary_specialties, \
     addresses, phone_numbers, address_state, address_zip5, \
     ST_Y(location::geometry) AS latitude, ST_X(location::geometry) AS longitude, \
     languages, accepts_telehealth, ai_bio, ai_bio_source, ai_bio_version, \
     ai_bio_enriched_at, geo_enriched_at, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct PhysicianRow {
    npi: String,
    first_name: String,
    last_name: String,
    middle_name: Option<String>,
    suffix: Option<String>,
    credential: Option<String>,
    gender: Option<String>,
    status: String,
    enumeration_date: NaiveDate,
    last_updated_nppes: Option<NaiveDate>,
    deactivation_date: Option<NaiveDate>,
    deactivation_reason: Option<String>,
    reactivation_date: Option<NaiveDate>,
    primary_specialty: Option<Json<SpecialtyInfo>>,
    secondary_specialties: Json<Vec<SpecialtyInfo>>,
    addresses: Json<Vec<PracticeAddress>>,
    phone_numbers: Json<Vec<PhoneNumber>>,
    address_state: Option<String>,
    address_zip5: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    languages: Vec<String>,
    accepts_telehealth: bool,
    ai_bio: Option<String>,
    ai_bio_source: Option<String>,
    ai_bio_version: Option<String>,
    ai_bio_enriched_at: Option<DateTime<Utc>>,
    geo_enriched_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PhysicianRow> for Physician {
    type Error = anyhow::Error;

    fn try_from(row: PhysicianRow) -> anyhow::Result<Self> {
        let location = match (row.latitude, row.longitude) {
            (Some(latitude), Some(longitude)) => Some(GeoPoint {
                latitude,
                longitude,
            }),
            _ => None,
        };
        Ok(Physician {
            gender: row.gender.as_deref().map(str::parse).transpose()?,
            status: row.status.parse()?,
            npi: row.npi,
            first_name: row.first_name,
            last_name: row.last_name,
            middle_name: row.middle_name,
            suffix: row.suffix,
            credential: row.credential,
            enumeration_date: row.enumeration_date,
            last_updated_nppes: row.last_updated_nppes,
            deactivation_date: row.deactivation_date,
            deactivation_reason: row.deactivation_reason,
            reactivation_date: row.reactivation_date,
            primary_specialty: row.primary_specialty.map(|j| j.0),
            secondary_specialties: row.secondary_specialties.0,
            addresses: row.addresses.0,
            phone_numbers: row.phone_numbers.0,
            address_state: row.address_state,
            address_zip5: row.address_zip5,
            location,
            languages: row.languages,
            accepts_telehealth: row.accepts_telehealth,
            ai_bio: row.ai_bio,
            ai_bio_source: row.ai_bio_source,
            ai_bio_version: row.ai_bio_version,
            ai_bio_enriched_at: row.ai_bio_enriched_at,
            geo_enriched_at: row.geo_enriched_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    user_id: String,
    platform_role: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = anyhow::Error;

    fn try_from(row: UserRow) -> anyhow::Result<Self> {
        Ok(User {
            platform_role: row.platform_role.parse()?,
            user_id: row.user_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct OrganizationRow {
    id: Uuid,
    name: String,
    slug: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<OrganizationRow> for Organization {
    fn from(row: OrganizationRow) -> Self {
        Organization {
            id: row.id,
            name: row.name,
            slug: row.slug,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct MembershipRow {
    user_id: String,
    organization_id: Uuid,
    role: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<MembershipRow> for OrganizationMembership {
    type Error = anyhow::Error;

    fn try_from(row: MembershipRow) -> anyhow::Result<Self> {
        Ok(OrganizationMembership {
            role: row.role.parse()?,
            user_id: row.user_id,
            organization_id: row.organization_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Appends the search predicate: state and zip filters AND-ed with the
/// OR of the text conditions.
pub fn push_predicate(qb: &mut QueryBuilder<'static, Postgres>, plan: &SearchPlan) {
    qb.push(" WHERE TRUE");

    if let Some(ref state) = plan.state {
        qb.push(" AND address_state = ").push_bind(state.clone());
    }
    if let Some(pattern) = plan.zip_pattern() {
        qb.push(" AND address_zip5 LIKE ").push_bind(pattern);
    }

    let Some(ref text) = plan.text else {
        return;
    };
    let contains = text.contains_pattern();

    qb.push(" AND (");
    if let Some(ref tsquery) = text.tsquery {
        qb.push("full_name_tsv @@ to_tsquery('simple', ")
            .push_bind(tsquery.clone())
            .push(") OR ");
    }
    qb.push("similarity(first_name, ")
        .push_bind(text.raw.clone())
        .push(") > ")
        .push_bind(plan.similarity_threshold);
    qb.push(" OR similarity(last_name, ")
        .push_bind(text.raw.clone())
        .push(") > ")
        .push_bind(plan.similarity_threshold);
    qb.push(" OR primary_specialty->>'taxonomyDescription' ILIKE ")
        .push_bind(contains.clone());
    qb.push(
        " OR EXISTS (SELECT 1 FROM jsonb_array_elements(secondary_specialties) AS s \
         WHERE s->>'taxonomyDescription' ILIKE ",
    )
    .push_bind(contains.clone())
    .push(")");
    qb.push(" OR address_state ILIKE ").push_bind(contains);
    qb.push(" OR address_zip5 ILIKE ")
        .push_bind(text.prefix_pattern());
    qb.push(")");
}

/// Appends `ORDER BY`: relevance first when there is a text query, then the
/// explicit sort, then `npi` so equal keys page deterministically.
pub fn push_order(qb: &mut QueryBuilder<'static, Postgres>, plan: &SearchPlan) {
    qb.push(" ORDER BY ");

    if let Some(ref text) = plan.text {
        if let Some(ref tsquery) = text.tsquery {
            qb.push("COALESCE(ts_rank(full_name_tsv, to_tsquery('simple', ")
                .push_bind(tsquery.clone())
                .push(")), 0) DESC, ");
        }
        qb.push("GREATEST(similarity(first_name, ")
            .push_bind(text.raw.clone())
            .push("), similarity(last_name, ")
            .push_bind(text.raw.clone())
            .push(")) DESC, ");
    }

    match plan.sort {
        Some(SortSpec {
            by: SortBy::Name,
            order,
        }) => {
            let dir = order.as_sql();
            qb.push(format!("last_name {dir}, first_name {dir}, "));
        }
        Some(SortSpec {
            by: SortBy::Specialty,
            order,
        }) => {
            qb.push(format!(
                "primary_specialty->>'taxonomyDescription' {} NULLS LAST, ",
                order.as_sql()
            ));
        }
        None if plan.text.is_none() => {
            qb.push("last_name ASC, ");
        }
        None => {}
    }

    qb.push("npi ASC");
}

/// The page query for a plan.
pub fn search_query(plan: &SearchPlan) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(format!("SELECT {} FROM physicians", PHYSICIAN_COLUMNS));
    push_predicate(&mut qb, plan);
    push_order(&mut qb, plan);
    qb.push(" LIMIT ").push_bind(plan.limit);
    qb.push(" OFFSET ").push_bind(plan.offset);
    qb
}

/// The count query for a plan: same predicate, no order or paging.
pub fn count_query(plan: &SearchPlan) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM physicians");
    push_predicate(&mut qb, plan);
    qb
}

const INSERT_PHYSICIAN: &str = r#"
    INSERT INTO physicians (
        npi, first_name, last_name, middle_name, suffix, credential, gender, status,
        enumeration_date, last_updated_nppes, deactivation_date, deactivation_reason,
        reactivation_date, primary_specialty, secondary_specialties, addresses,
        phone_numbers, address_state, address_zip5, location, languages,
        accepts_telehealth, ai_bio, ai_bio_source, ai_bio_version, ai_bio_enriched_at,
        geo_enriched_at
    )
    VALUES (
        $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19,
        ST_SetSRID(ST_MakePoint($20, $21), 4326)::geography,
        $22, $23, $24, $25, $26, $27, $28
    )
"#;

const UPSERT_SET: &str = r#"
    ON CONFLICT (npi) DO UPDATE SET
        first_name = EXCLUDED.first_name,
        last_name = EXCLUDED.last_name,
        middle_name = EXCLUDED.middle_name,
        suffix = EXCLUDED.suffix,
        credential = EXCLUDED.credential,
        gender = EXCLUDED.gender,
        status = EXCLUDED.status,
        enumeration_date = EXCLUDED.enumeration_date,
        last_updated_nppes = EXCLUDED.last_updated_nppes,
        deactivation_date = EXCLUDED.deactivation_date,
        deactivation_reason = EXCLUDED.deactivation_reason,
        reactivation_date = EXCLUDED.reactivation_date,
        primary_specialty = EXCLUDED.primary_specialty,
        secondary_specialties = EXCLUDED.secondary_specialties,
        addresses = EXCLUDED.addresses,
        phone_numbers = EXCLUDED.phone_numbers,
        address_state = EXCLUDED.address_state,
        address_zip5 = EXCLUDED.address_zip5,
        location = EXCLUDED.location,
        languages = EXCLUDED.languages,
        accepts_telehealth = EXCLUDED.accepts_telehealth,
        ai_bio = EXCLUDED.ai_bio,
        ai_bio_source = EXCLUDED.ai_bio_source,
        ai_bio_version = EXCLUDED.ai_bio_version,
        ai_bio_enriched_at = EXCLUDED.ai_bio_enriched_at,
        geo_enriched_at = EXCLUDED.geo_enriched_at
"#;

impl PgStore {
    async fn write_physician(&self, p: &Physician, on_conflict: &str) -> StoreResult<u64> {
        let sql = format!("{}{}", INSERT_PHYSICIAN, on_conflict);
        let result = sqlx::query(&sql)
            .bind(&p.npi)
            .bind(&p.first_name)
            .bind(&p.last_name)
            .bind(&p.middle_name)
            .bind(&p.suffix)
            .bind(&p.credential)
            .bind(p.gender.map(|g| g.as_str()))
            .bind(p.status.as_str())
            .bind(p.enumeration_date)
            .bind(p.last_updated_nppes)
            .bind(p.deactivation_date)
            .bind(&p.deactivation_reason)
            .bind(p.reactivation_date)
            .bind(p.primary_specialty.as_ref().map(Json))
            .bind(Json(&p.secondary_specialties))
            .bind(Json(&p.addresses))
            .bind(Json(&p.phone_numbers))
            .bind(&p.address_state)
            .bind(&p.address_zip5)
            .bind(p.location.map(|l| l.longitude))
            .bind(p.location.map(|l| l.latitude))
            .bind(&p.languages)
            .bind(p.accepts_telehealth)
            .bind(&p.ai_bio)
            .bind(&p.ai_bio_source)
            .bind(&p.ai_bio_version)
            .bind(p.ai_bio_enriched_at)
            .bind(p.geo_enriched_at)
            .execute(&self.pool)
            .await
            .map_err(store_error)?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl PhysicianStore for PgStore {
    async fn search_physicians(&self, plan: &SearchPlan) -> StoreResult<Vec<Physician>> {
        let mut qb = search_query(plan);
        let rows: Vec<PhysicianRow> = qb
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(store_error)?;
        rows.into_iter()
            .map(|r| Physician::try_from(r).map_err(StoreError::Backend))
            .collect()
    }

    async fn count_physicians(&self, plan: &SearchPlan) -> StoreResult<i64> {
        let mut qb = count_query(plan);
        let count: i64 = qb
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(store_error)?;
        Ok(count)
    }

    async fn get_physician(&self, npi: &str) -> StoreResult<Option<Physician>> {
        let row: Option<PhysicianRow> = sqlx::query_as(&format!(
            "SELECT {} FROM physicians WHERE npi = $1",
            PHYSICIAN_COLUMNS
        ))
        .bind(npi)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error)?;
        row.map(Physician::try_from)
            .transpose()
            .map_err(StoreError::Backend)
    }

    async fn insert_physician(&self, physician: &Physician) -> StoreResult<bool> {
        let inserted = self
            .write_physician(physician, "ON CONFLICT (npi) DO NOTHING")
            .await?;
        Ok(inserted > 0)
    }

    async fn upsert_physician(&self, physician: &Physician) -> StoreResult<()> {
        self.write_physician(physician, UPSERT_SET).await?;
        Ok(())
    }
}

#[async_trait]
impl AccountStore for PgStore {
    async fn insert_user(&self, user: &NewUser) -> StoreResult<User> {
        let row: UserRow = sqlx::query_as(
            "INSERT INTO users (user_id, platform_role) VALUES ($1, $2) \
             RETURNING user_id, platform_role, created_at, updated_at",
        )
        .bind(&user.user_id)
        .bind(user.platform_role.unwrap_or_default().as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(store_error)?;
        User::try_from(row).map_err(StoreError::Backend)
    }

    async fn get_user(&self, user_id: &str) -> StoreResult<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(
            "SELECT user_id, platform_role, created_at, updated_at FROM users WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error)?;
        row.map(User::try_from).transpose().map_err(StoreError::Backend)
    }

    async fn update_user(&self, user_id: &str, update: &UserUpdate) -> StoreResult<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(
            "UPDATE users SET platform_role = COALESCE($2, platform_role) WHERE user_id = $1 \
             RETURNING user_id, platform_role, created_at, updated_at",
        )
        .bind(user_id)
        .bind(update.platform_role.map(|r| r.as_str()))
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error)?;
        row.map(User::try_from).transpose().map_err(StoreError::Backend)
    }

    async fn delete_user(&self, user_id: &str) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(store_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_organization(&self, name: &str, slug: &str) -> StoreResult<Organization> {
        let row: OrganizationRow = sqlx::query_as(
            "INSERT INTO organizations (name, slug) VALUES ($1, $2) \
             RETURNING id, name, slug, created_at, updated_at",
        )
        .bind(name)
        .bind(slug)
        .fetch_one(&self.pool)
        .await
        .map_err(store_error)?;
        Ok(row.into())
    }

    async fn get_organization(&self, id: Uuid) -> StoreResult<Option<Organization>> {
        let row: Option<OrganizationRow> = sqlx::query_as(
            "SELECT id, name, slug, created_at, updated_at FROM organizations WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error)?;
        Ok(row.map(Organization::from))
    }

    async fn update_organization(
        &self,
        id: Uuid,
        update: &OrganizationUpdate,
    ) -> StoreResult<Option<Organization>> {
        let row: Option<OrganizationRow> = sqlx::query_as(
            "UPDATE organizations SET name = COALESCE($2, name), slug = COALESCE($3, slug) \
             WHERE id = $1 RETURNING id, name, slug, created_at, updated_at",
        )
        .bind(id)
        .bind(&update.name)
        .bind(&update.slug)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error)?;
        Ok(row.map(Organization::from))
    }

    async fn delete_organization(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM organizations WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(store_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_user_organizations(&self, user_id: &str) -> StoreResult<Vec<Organization>> {
        let rows: Vec<OrganizationRow> = sqlx::query_as(
            r#"
            SELECT o.id, o.name, o.slug, o.created_at, o.updated_at
            FROM organizations o
            JOIN organization_memberships m ON m.organization_id = o.id
            WHERE m.user_id = $1
            ORDER BY o.name, o.id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(store_error)?;
        Ok(rows.into_iter().map(Organization::from).collect())
    }

    async fn upsert_membership(
        &self,
        organization_id: Uuid,
        user_id: &str,
        role: UserRole,
    ) -> StoreResult<OrganizationMembership> {
        let row: MembershipRow = sqlx::query_as(
            r#"
            INSERT INTO organization_memberships (user_id, organization_id, role)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, organization_id) DO UPDATE SET role = EXCLUDED.role
            RETURNING user_id, organization_id, role, created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(organization_id)
        .bind(role.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(store_error)?;
        OrganizationMembership::try_from(row).map_err(StoreError::Backend)
    }

    async fn remove_membership(&self, organization_id: Uuid, user_id: &str) -> StoreResult<bool> {
        let result = sqlx::query(
            "DELETE FROM organization_memberships WHERE organization_id = $1 AND user_id = $2",
        )
        .bind(organization_id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(store_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_memberships(
        &self,
        organization_id: Uuid,
    ) -> StoreResult<Vec<OrganizationMembership>> {
        let rows: Vec<MembershipRow> = sqlx::query_as(
            "SELECT user_id, organization_id, role, created_at, updated_at \
             FROM organization_memberships WHERE organization_id = $1 ORDER BY user_id",
        )
        .bind(organization_id)
        .fetch_all(&self.pool)
        .await
        .map_err(store_error)?;
        rows.into_iter()
            .map(|r| OrganizationMembership::try_from(r).map_err(StoreError::Backend))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use physician_finder_core::search::{SearchFilters, SearchParams, SearchSettings, SortOrder};

    fn plan(params: SearchParams) -> SearchPlan {
        SearchPlan::from_params(&params, &SearchSettings::default()).unwrap()
    }

    #[test]
    fn test_no_text_query_sorts_by_last_name() {
        let qb = search_query(&plan(SearchParams::default()));
        let sql = qb.sql();
        assert!(sql.contains("WHERE TRUE ORDER BY last_name ASC, npi ASC"));
        assert!(sql.ends_with("LIMIT $1 OFFSET $2"));
        assert!(!sql.contains("similarity"));
    }

    #[test]
    fn test_filters_are_bound_not_inlined() {
        let p = plan(SearchParams {
            filters: Some(SearchFilters {
                state: Some("il".to_string()),
                zip: Some("606".to_string()),
            }),
            ..Default::default()
        });
        let qb = count_query(&p);
        assert_eq!(
            qb.sql(),
            "SELECT COUNT(*) FROM physicians WHERE TRUE AND address_state = $1 AND address_zip5 LIKE $2"
        );
    }

    #[test]
    fn test_text_query_predicate_and_rank_order() {
        let p = plan(SearchParams {
            query: Some("cardio".to_string()),
            ..Default::default()
        });
        let qb = search_query(&p);
        let sql = qb.sql();
        assert!(sql.contains("full_name_tsv @@ to_tsquery('simple', $1)"));
        assert!(sql.contains("similarity(first_name, $2) > $3"));
        assert!(sql.contains("primary_specialty->>'taxonomyDescription' ILIKE"));
        assert!(sql.contains("jsonb_array_elements(secondary_specialties)"));
        assert!(sql.contains("ORDER BY COALESCE(ts_rank(full_name_tsv"));
        assert!(sql.contains("DESC, npi ASC LIMIT"));
        assert!(!sql.contains("last_name ASC"));
    }

    #[test]
    fn test_punctuation_only_query_skips_tsquery() {
        let p = plan(SearchParams {
            query: Some("%%".to_string()),
            ..Default::default()
        });
        let qb = search_query(&p);
        assert!(!qb.sql().contains("to_tsquery"));
        assert!(qb.sql().contains("similarity(first_name, $1)"));
    }

    #[test]
    fn test_count_shares_predicate_with_search() {
        let p = plan(SearchParams {
            query: Some("smith".to_string()),
            filters: Some(SearchFilters {
                state: Some("NY".to_string()),
                zip: None,
            }),
            ..Default::default()
        });
        let search = search_query(&p);
        let count = count_query(&p);
        let search_where = search.sql().split(" ORDER BY ").next().unwrap();
        let search_where = search_where.split(" WHERE ").nth(1).unwrap();
        let count_where = count.sql().split(" WHERE ").nth(1).unwrap();
        assert_eq!(search_where, count_where);
    }

    #[test]
    fn test_explicit_sorts() {
        let by_name = search_query(&plan(SearchParams {
            sort_by: Some(SortBy::Name),
            sort_order: Some(SortOrder::Desc),
            ..Default::default()
        }));
        assert!(by_name
            .sql()
            .contains("ORDER BY last_name DESC, first_name DESC, npi ASC"));

        let by_specialty = search_query(&plan(SearchParams {
            sort_by: Some(SortBy::Specialty),
            ..Default::default()
        }));
        assert!(by_specialty
            .sql()
            .contains("primary_specialty->>'taxonomyDescription' ASC NULLS LAST, npi ASC"));
    }
}
