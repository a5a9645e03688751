//! Defines the route handler that seeds the database from the transaction feed.

use std::sync::Arc;

use axum::{
    Json,
    extract::{FromRef, State},
    http::StatusCode,
    response::Response,
};
use serde::Serialize;

use crate::{AppState, query_service::QueryService};

use super::TransactionFeed;

/// The state needed to seed the database.
#[derive(Debug, Clone)]
pub struct SeedState {
    service: QueryService,
    feed: Arc<dyn TransactionFeed>,
}

impl FromRef<AppState> for SeedState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            service: QueryService::new(state.store.clone()),
            feed: state.feed.clone(),
        }
    }
}

/// The confirmation sent after a successful seed.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedResponse {
    message: &'static str,
    inserted_count: usize,
}

/// Fetch the transaction feed and insert every record into the database.
///
/// Calling this more than once stores every record again.
pub async fn seed_endpoint(
    State(state): State<SeedState>,
) -> Result<(StatusCode, Json<SeedResponse>), Response> {
    let inserted_count = state
        .service
        .seed(state.feed.as_ref())
        .await
        .map_err(|error| error.into_response_with_message("Error seeding the database"))?;

    Ok((
        StatusCode::CREATED,
        Json(SeedResponse {
            message: "Database seeded successfully!",
            inserted_count,
        }),
    ))
}
