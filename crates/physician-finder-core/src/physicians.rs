//! Physician search and lookup actions.
//!
//! Both actions work against any [`PhysicianStore`]. Store failures are
//! logged and converted into a generic [`FailureKind::Unavailable`] result;
//! they are never returned to the caller as errors.

use crate::action::{ActionState, FailureKind};
use crate::models::Physician;
use crate::search::{total_pages, SearchParams, SearchPlan, SearchResults, SearchSettings};
use crate::store::PhysicianStore;

/// Searches physicians by text query, filters, sort and page.
///
/// Issues the page query and the count query with the same predicate and
/// reports `totalPages = ceil(totalCount / limit)`.
pub async fn search_physicians<S: PhysicianStore + ?Sized>(
    store: &S,
    params: &SearchParams,
    settings: &SearchSettings,
) -> ActionState<SearchResults> {
    let plan = match SearchPlan::from_params(params, settings) {
        Ok(plan) => plan,
        Err(failure) => return ActionState::Failure(failure),
    };

    let physicians = match store.search_physicians(&plan).await {
        Ok(rows) => rows,
        Err(e) => {
            tracing::error!(error = %e, "Error searching physicians");
            return ActionState::unavailable(
                "Failed to search physicians. Please try again later.",
            );
        }
    };

    let total_count = match store.count_physicians(&plan).await {
        Ok(n) => n,
        Err(e) => {
            tracing::error!(error = %e, "Error counting physicians");
            return ActionState::unavailable(
                "Failed to search physicians. Please try again later.",
            );
        }
    };

    tracing::debug!(
        query = plan.text.as_ref().map(|t| t.raw.as_str()),
        state = plan.state.as_deref(),
        zip = plan.zip_prefix.as_deref(),
        page = plan.page,
        returned = physicians.len(),
        total_count,
        "physician search"
    );

    ActionState::success(
        "Physicians retrieved successfully",
        SearchResults {
            physicians,
            total_count,
            current_page: plan.page,
            total_pages: total_pages(total_count, plan.limit),
        },
    )
}

/// Retrieves a single physician by NPI.
///
/// A blank NPI is rejected without touching the store.
pub async fn get_physician_by_npi<S: PhysicianStore + ?Sized>(
    store: &S,
    npi: &str,
) -> ActionState<Physician> {
    let npi = npi.trim();
    if npi.is_empty() {
        return ActionState::validation("NPI is required");
    }

    match store.get_physician(npi).await {
        Ok(Some(physician)) => ActionState::success("Physician retrieved successfully", physician),
        Ok(None) => ActionState::not_found("Physician not found"),
        Err(e) => {
            tracing::error!(npi, error = %e, "Error getting physician by NPI");
            ActionState::failure(
                FailureKind::Unavailable,
                "Failed to retrieve physician details.",
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SpecialtyInfo;
    use crate::search::{SearchFilters, SortBy};
    use crate::store::memory::InMemoryStore;
    use crate::store::{StoreError, StoreResult};
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const STATES: [&str; 3] = ["IL", "WI", "IN"];
    const SPECIALTIES: [&str; 4] = [
        "Cardiology",
        "Family Medicine",
        "Pediatric Cardiology",
        "Dermatology",
    ];
    const LAST_NAMES: [&str; 6] = ["Nguyen", "Patel", "Garcia", "Kowalski", "Okafor", "Lindqvist"];

    /// 60 physicians spread over three states, four specialties and six
    /// surnames, with ZIPs 60000..60059.
    fn catalog() -> InMemoryStore {
        let date = NaiveDate::from_ymd_opt(2015, 3, 9).unwrap();
        let rows = (0..60).map(|i| {
            let mut p = Physician::new(
                format!("19{:08}", i),
                format!("Pat{}", i),
                LAST_NAMES[i % LAST_NAMES.len()],
                date,
            );
            p.address_state = Some(STATES[i % STATES.len()].to_string());
            p.address_zip5 = Some(format!("{}", 60000 + i));
            p.primary_specialty = Some(SpecialtyInfo {
                taxonomy_code: format!("TX{}", i % SPECIALTIES.len()),
                taxonomy_description: SPECIALTIES[i % SPECIALTIES.len()].to_string(),
                license_number: None,
                license_state: None,
                primary_specialty: true,
                board_certified: None,
            });
            p
        });
        InMemoryStore::with_physicians(rows)
    }

    fn search_params(query: Option<&str>, state: Option<&str>, page: i64, limit: i64) -> SearchParams {
        SearchParams {
            query: query.map(str::to_string),
            filters: Some(SearchFilters {
                state: state.map(str::to_string),
                zip: None,
            }),
            page: Some(page),
            limit: Some(limit),
            ..Default::default()
        }
    }

    async fn run(store: &InMemoryStore, params: SearchParams) -> SearchResults {
        search_physicians(store, &params, &SearchSettings::default())
            .await
            .into_result()
            .unwrap()
    }

    #[tokio::test]
    async fn test_state_filter_holds_for_every_row() {
        let store = catalog();
        let results = run(&store, search_params(None, Some("il"), 1, 100)).await;
        assert_eq!(results.total_count, 20);
        assert!(results
            .physicians
            .iter()
            .all(|p| p.address_state.as_deref() == Some("IL")));
    }

    #[tokio::test]
    async fn test_zip_filter_holds_for_every_row() {
        let store = catalog();
        let params = SearchParams {
            filters: Some(SearchFilters {
                state: None,
                zip: Some("6001".to_string()),
            }),
            limit: Some(50),
            ..Default::default()
        };
        let results = run(&store, params).await;
        assert_eq!(results.total_count, 10);
        assert!(results
            .physicians
            .iter()
            .all(|p| p.address_zip5.as_deref().unwrap().starts_with("6001")));
    }

    #[tokio::test]
    async fn test_total_count_invariant_under_paging() {
        let store = catalog();
        let mut totals = Vec::new();
        for (page, limit) in [(1, 10), (2, 10), (1, 7), (3, 25)] {
            let r = run(&store, search_params(Some("cardio"), None, page, limit)).await;
            assert_eq!(r.total_pages, (r.total_count + limit - 1) / limit);
            totals.push(r.total_count);
        }
        assert!(totals.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(totals[0], 30);
    }

    #[tokio::test]
    async fn test_pages_are_contiguous_slices() {
        let store = catalog();
        let all = run(&store, search_params(None, None, 1, 60)).await.physicians;
        let mut paged = Vec::new();
        for page in 1..=3 {
            let r = run(&store, search_params(None, None, page, 10)).await;
            assert_eq!(r.current_page, page);
            paged.extend(r.physicians);
        }
        assert_eq!(paged.len(), 30);
        assert_eq!(paged, all[..30].to_vec());

        let page2 = run(&store, search_params(None, None, 2, 10)).await.physicians;
        assert_eq!(page2, all[10..20].to_vec());
    }

    #[tokio::test]
    async fn test_pages_are_contiguous_with_text_query() {
        let store = catalog();
        let all = run(&store, search_params(Some("cardio"), None, 1, 100))
            .await
            .physicians;
        let p1 = run(&store, search_params(Some("cardio"), None, 1, 10)).await.physicians;
        let p2 = run(&store, search_params(Some("cardio"), None, 2, 10)).await.physicians;
        let p3 = run(&store, search_params(Some("cardio"), None, 3, 10)).await.physicians;
        let joined: Vec<Physician> = p1.into_iter().chain(p2).chain(p3).collect();
        assert_eq!(joined, all);
    }

    #[tokio::test]
    async fn test_empty_search_returns_everything_sorted_by_last_name() {
        let store = catalog();
        let r = run(&store, SearchParams::default()).await;
        assert_eq!(r.total_count, 60);
        assert_eq!(r.total_pages, 6);
        assert_eq!(r.physicians.len(), 10);
        assert!(r
            .physicians
            .windows(2)
            .all(|w| w[0].last_name <= w[1].last_name));
        assert_eq!(r.physicians[0].last_name, "Garcia");
    }

    #[tokio::test]
    async fn test_cardio_in_illinois() {
        let store = catalog();
        let r = run(&store, search_params(Some("cardio"), Some("IL"), 1, 10)).await;
        assert!(r.physicians.len() <= 10);
        assert!(r
            .physicians
            .iter()
            .all(|p| p.address_state.as_deref() == Some("IL")
                && p.primary_specialty_description().unwrap().contains("Cardiology")));
        // i % 3 == 0 and i % 4 in {0, 2}: every even multiple of 3 below 60.
        assert_eq!(r.total_count, 10);
    }

    #[tokio::test]
    async fn test_explicit_sort_breaks_rank_ties() {
        let store = catalog();
        let params = SearchParams {
            query: Some("cardiology".to_string()),
            sort_by: Some(SortBy::Name),
            limit: Some(100),
            ..Default::default()
        };
        let r = run(&store, params).await;
        // Rank and similarity are equal for specialty-only matches, so the
        // name sort decides.
        assert!(r.physicians.windows(2).all(|w| {
            (w[0].last_name.as_str(), w[0].first_name.as_str())
                <= (w[1].last_name.as_str(), w[1].first_name.as_str())
        }));
    }

    #[tokio::test]
    async fn test_invalid_limit_is_validation_failure() {
        let store = catalog();
        let state = search_physicians(
            &store,
            &search_params(None, None, 1, 1000),
            &SearchSettings::default(),
        )
        .await;
        assert_eq!(state.failure_kind(), Some(FailureKind::Validation));
    }

    #[tokio::test]
    async fn test_lookup_found_and_missing() {
        let store = catalog();
        let found = get_physician_by_npi(&store, "1900000007").await;
        assert!(found.is_success());
        assert_eq!(found.data().unwrap().first_name, "Pat7");

        let missing = get_physician_by_npi(&store, "0000000000").await;
        assert_eq!(missing.failure_kind(), Some(FailureKind::NotFound));
        assert!(missing.data().is_none());
    }

    /// Fails every call and counts how often it was touched.
    #[derive(Default)]
    struct BrokenStore {
        calls: AtomicUsize,
    }

    impl BrokenStore {
        fn fail<T>(&self) -> StoreResult<T> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(StoreError::Backend(anyhow::anyhow!("connection refused")))
        }
    }

    #[async_trait]
    impl PhysicianStore for BrokenStore {
        async fn search_physicians(&self, _plan: &SearchPlan) -> StoreResult<Vec<Physician>> {
            self.fail()
        }
        async fn count_physicians(&self, _plan: &SearchPlan) -> StoreResult<i64> {
            self.fail()
        }
        async fn get_physician(&self, _npi: &str) -> StoreResult<Option<Physician>> {
            self.fail()
        }
        async fn insert_physician(&self, _p: &Physician) -> StoreResult<bool> {
            self.fail()
        }
        async fn upsert_physician(&self, _p: &Physician) -> StoreResult<()> {
            self.fail()
        }
    }

    #[tokio::test]
    async fn test_empty_npi_never_reaches_store() {
        let store = BrokenStore::default();
        for npi in ["", "   "] {
            let state = get_physician_by_npi(&store, npi).await;
            assert_eq!(state.failure_kind(), Some(FailureKind::Validation));
            assert_eq!(state.message(), "NPI is required");
        }
        assert_eq!(store.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_store_failure_becomes_generic_message() {
        let store = BrokenStore::default();
        let state = search_physicians(&store, &SearchParams::default(), &SearchSettings::default())
            .await;
        assert_eq!(state.failure_kind(), Some(FailureKind::Unavailable));
        assert_eq!(
            state.message(),
            "Failed to search physicians. Please try again later."
        );
        assert!(!state.message().contains("connection refused"));

        let lookup = get_physician_by_npi(&store, "1234567890").await;
        assert_eq!(lookup.failure_kind(), Some(FailureKind::Unavailable));
    }
}
