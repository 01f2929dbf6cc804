//! Physician search planning.
//!
//! A [`SearchParams`] value (what a caller sends) is validated and turned into
//! a [`SearchPlan`] (what a store executes). Both the Postgres store and the
//! in-memory store execute the same plan, so predicate and ordering rules
//! live here rather than in either backend.
//!
//! # Predicate
//!
//! With a text query `q`, a row matches when any of these hold:
//!
//! 1. the name search vector matches the prefix tsquery built from `q`;
//! 2. `similarity(first_name, q)` or `similarity(last_name, q)` exceeds the
//!    similarity threshold;
//! 3. the primary or any secondary specialty description contains `q`
//!    (case-insensitive);
//! 4. `address_state` contains `q` (case-insensitive) or `address_zip5`
//!    starts with `q`.
//!
//! `filters.state` (exact, uppercased) and `filters.zip` (prefix) are AND-ed
//! with the text condition.
//!
//! # Ordering
//!
//! With a text query: full-text rank desc, best name similarity desc, then
//! any explicit sort keys. Without one: the explicit sort, or last name asc.
//! `npi` asc always breaks remaining ties so pages are disjoint.

use serde::{Deserialize, Serialize};

use crate::action::ActionFailure;
use crate::action::FailureKind;
use crate::models::Physician;
use crate::text;

pub const DEFAULT_PAGE_LIMIT: i64 = 10;
pub const DEFAULT_MAX_LIMIT: i64 = 100;
pub const MIN_SIMILARITY_THRESHOLD: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortBy {
    Name,
    Specialty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

impl std::str::FromStr for SortBy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s {
            "name" => Ok(SortBy::Name),
            "specialty" => Ok(SortBy::Specialty),
            other => anyhow::bail!("unknown sort field '{}'. Use name or specialty.", other),
        }
    }
}

impl std::str::FromStr for SortOrder {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            other => anyhow::bail!("unknown sort order '{}'. Use asc or desc.", other),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchFilters {
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub zip: Option<String>,
}

/// Caller-facing search input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub filters: Option<SearchFilters>,
    #[serde(default)]
    pub page: Option<i64>,
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub sort_by: Option<SortBy>,
    #[serde(default)]
    pub sort_order: Option<SortOrder>,
}

/// Search tuning, decoupled from application config.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchSettings {
    pub default_limit: i64,
    pub max_limit: i64,
    pub similarity_threshold: f64,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_PAGE_LIMIT,
            max_limit: DEFAULT_MAX_LIMIT,
            similarity_threshold: MIN_SIMILARITY_THRESHOLD,
        }
    }
}

/// The free-text part of a plan.
#[derive(Debug, Clone, PartialEq)]
pub struct TextQuery {
    /// Trimmed query as typed, compared by trigram similarity.
    pub raw: String,
    /// Prefix terms; empty when the query has no alphanumeric words.
    pub terms: Vec<String>,
    /// `to_tsquery('simple', ...)` input built from `terms`.
    pub tsquery: Option<String>,
}

impl TextQuery {
    pub fn new(raw: &str) -> Self {
        let raw = raw.trim().to_string();
        Self {
            terms: text::prefix_terms(&raw),
            tsquery: text::prefix_tsquery(&raw),
            raw,
        }
    }

    /// `%q%` with LIKE metacharacters escaped.
    pub fn contains_pattern(&self) -> String {
        format!("%{}%", text::escape_like(&self.raw))
    }

    /// `q%` with LIKE metacharacters escaped.
    pub fn prefix_pattern(&self) -> String {
        format!("{}%", text::escape_like(&self.raw))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec {
    pub by: SortBy,
    pub order: SortOrder,
}

/// A validated search, ready for a store to execute.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchPlan {
    pub text: Option<TextQuery>,
    /// Uppercased state code.
    pub state: Option<String>,
    pub zip_prefix: Option<String>,
    pub sort: Option<SortSpec>,
    pub page: i64,
    pub limit: i64,
    pub offset: i64,
    pub similarity_threshold: f64,
}

fn non_blank(s: Option<&String>) -> Option<&str> {
    s.map(|v| v.trim()).filter(|v| !v.is_empty())
}

impl SearchPlan {
    /// Validates `params` and normalizes them into a plan.
    ///
    /// Blank strings count as absent. `page` must be at least 1 and `limit`
    /// must lie in `1..=settings.max_limit`.
    pub fn from_params(
        params: &SearchParams,
        settings: &SearchSettings,
    ) -> Result<Self, ActionFailure> {
        let page = params.page.unwrap_or(1);
        let limit = params.limit.unwrap_or(settings.default_limit);

        if page < 1 {
            return Err(validation(format!("page must be >= 1 (got {})", page)));
        }
        if limit < 1 || limit > settings.max_limit {
            return Err(validation(format!(
                "limit must be between 1 and {} (search.max_limit); got {}",
                settings.max_limit, limit
            )));
        }
        let offset = (page - 1)
            .checked_mul(limit)
            .ok_or_else(|| validation("page is too large"))?;

        let text = non_blank(params.query.as_ref()).map(TextQuery::new);

        let filters = params.filters.as_ref();
        let state = non_blank(filters.and_then(|f| f.state.as_ref())).map(|s| s.to_uppercase());
        let zip_prefix = non_blank(filters.and_then(|f| f.zip.as_ref())).map(str::to_string);

        let sort = params.sort_by.map(|by| SortSpec {
            by,
            order: params.sort_order.unwrap_or_default(),
        });

        Ok(Self {
            text,
            state,
            zip_prefix,
            sort,
            page,
            limit,
            offset,
            similarity_threshold: settings.similarity_threshold,
        })
    }

    /// Escaped `zip%` pattern for the zip filter.
    pub fn zip_pattern(&self) -> Option<String> {
        self.zip_prefix
            .as_ref()
            .map(|z| format!("{}%", text::escape_like(z)))
    }
}

fn validation(message: impl Into<String>) -> ActionFailure {
    ActionFailure {
        kind: FailureKind::Validation,
        message: message.into(),
    }
}

/// One page of search results.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResults {
    pub physicians: Vec<Physician>,
    pub total_count: i64,
    pub current_page: i64,
    pub total_pages: i64,
}

/// `ceil(total / limit)`, or 0 when nothing matched.
pub fn total_pages(total_count: i64, limit: i64) -> i64 {
    if total_count <= 0 || limit <= 0 {
        return 0;
    }
    (total_count + limit - 1) / limit
}
