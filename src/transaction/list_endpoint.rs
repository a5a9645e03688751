//! Defines the route handler for listing transactions with search and pagination.

use axum::{
    Json,
    extract::{FromRef, Query, State},
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use crate::{
    AppState, Error,
    filters::{MonthFilter, SearchFilter},
    pagination::{PageRequest, PaginationConfig},
    query_service::{ListRequest, QueryService},
};

use super::ProductTransaction;

/// The state needed for listing transactions.
#[derive(Debug, Clone)]
pub struct ListState {
    service: QueryService,
    pagination_config: PaginationConfig,
}

impl FromRef<AppState> for ListState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            service: QueryService::new(state.store.clone()),
            pagination_config: state.pagination_config.clone(),
        }
    }
}

/// The raw query parameters for listing transactions.
///
/// Numbers are kept as text so that a bad value can be reported by name
/// instead of being rejected by the extractor.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    search: Option<String>,
    page: Option<String>,
    per_page: Option<String>,
    month: Option<String>,
}

impl ListQuery {
    fn into_request(self, config: &PaginationConfig) -> Result<ListRequest, Error> {
        Ok(ListRequest {
            month: MonthFilter::parse(self.month.as_deref())?,
            search: SearchFilter::new(self.search.as_deref().unwrap_or_default()),
            page: PageRequest::parse(self.page.as_deref(), self.per_page.as_deref(), config)?,
        })
    }
}

/// List one page of the transactions that match the month and search term.
pub async fn list_transactions_endpoint(
    State(state): State<ListState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<ProductTransaction>>, Response> {
    let request = query
        .into_request(&state.pagination_config)
        .map_err(IntoResponse::into_response)?;

    state
        .service
        .list(request)
        .await
        .map(Json)
        .map_err(|error| error.into_response_with_message("Error fetching transactions"))
}
