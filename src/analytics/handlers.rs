//! Route handlers for the statistics, bar chart and pie chart endpoints.

use axum::{
    Json,
    extract::{FromRef, Query, State},
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use crate::{AppState, Error, filters::MonthFilter, query_service::QueryService};

use super::{CategoryDistribution, PriceHistogram, Statistics};

impl FromRef<AppState> for QueryService {
    fn from_ref(state: &AppState) -> Self {
        QueryService::new(state.store.clone())
    }
}

/// The query parameters shared by the analytics endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct MonthQuery {
    /// A month name or number. Missing or blank means every month.
    month: Option<String>,
}

impl MonthQuery {
    fn month_filter(&self) -> Result<MonthFilter, Error> {
        MonthFilter::parse(self.month.as_deref())
    }
}

/// Total sales and sold/unsold item counts for the month.
pub async fn get_statistics(
    State(service): State<QueryService>,
    Query(query): Query<MonthQuery>,
) -> Result<Json<Statistics>, Response> {
    let month = query.month_filter().map_err(IntoResponse::into_response)?;

    service
        .statistics(month)
        .await
        .map(Json)
        .map_err(|error| error.into_response_with_message("Error fetching statistics"))
}

/// The number of the month's transactions in each price range.
pub async fn get_bar_chart(
    State(service): State<QueryService>,
    Query(query): Query<MonthQuery>,
) -> Result<Json<PriceHistogram>, Response> {
    let month = query.month_filter().map_err(IntoResponse::into_response)?;

    service
        .price_histogram(month)
        .await
        .map(Json)
        .map_err(|error| error.into_response_with_message("Error fetching bar chart data"))
}

/// The number of the month's transactions in each category.
pub async fn get_pie_chart(
    State(service): State<QueryService>,
    Query(query): Query<MonthQuery>,
) -> Result<Json<CategoryDistribution>, Response> {
    let month = query.month_filter().map_err(IntoResponse::into_response)?;

    service
        .category_distribution(month)
        .await
        .map(Json)
        .map_err(|error| error.into_response_with_message("Error fetching pie chart data"))
}
