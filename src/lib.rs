//! Sales Insights is a small JSON API over a product-transaction dataset.
//!
//! The dataset is seeded once from a third-party feed into a SQLite database
//! and then served through read endpoints for paginated search, summary
//! statistics, and chart-ready aggregations filtered by calendar month.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use serde_json::json;
use tokio::signal;

mod analytics;
mod app_state;
mod database_id;
mod db;
mod endpoints;
mod filters;
mod logging;
mod not_found;
mod pagination;
mod query_service;
mod routing;
mod seed;
mod store;
mod transaction;

#[cfg(test)]
mod test_utils;

pub use analytics::{
    CategoryDistribution, PRICE_RANGES, PriceHistogram, PriceRange, Statistics,
    compute_category_distribution, compute_price_histogram, compute_statistics,
};
pub use app_state::AppState;
pub use database_id::{DatabaseId, TransactionId};
pub use db::initialize as initialize_db;
pub use filters::{MonthFilter, SearchFilter};
pub use logging::{LOG_BODY_LENGTH_LIMIT, logging_middleware};
pub use pagination::{PageRequest, PaginationConfig};
pub use query_service::{ListRequest, QueryService};
pub use routing::build_router;
pub use seed::{
    DEFAULT_FEED_URL, FeedRecord, FileTransactionFeed, HttpTransactionFeed, TransactionFeed,
    parse_feed,
};
pub use store::{CancelToken, TransactionStore};
pub use transaction::{NewTransaction, ProductTransaction, count_transactions};

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// A query parameter could not be parsed.
    ///
    /// This is the client's fault and is reported with a 400 response that
    /// names the offending parameter.
    #[error("invalid value {value:?} for query parameter \"{parameter}\": {reason}")]
    InvalidQueryParameter {
        /// The name of the query parameter, as it appears in the URL.
        parameter: &'static str,
        /// The raw value that was rejected.
        value: String,
        /// Why the value was rejected.
        reason: &'static str,
    },

    /// A transaction record violates the data model, e.g. a negative price or
    /// a sale date that is not a valid RFC 3339 date-time.
    #[error("invalid transaction record: {0}")]
    InvalidRecord(String),

    /// The transaction feed could not be reached or answered with an error
    /// status.
    #[error("could not fetch the transaction feed: {0}")]
    FeedUnavailable(String),

    /// The transaction feed responded, but its body is not a JSON array of
    /// transaction records.
    #[error("could not decode the transaction feed: {0}")]
    InvalidFeed(String),

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// No read connection became free in time, or the read connections
    /// could not be opened.
    #[error("could not get a database connection: {0}")]
    ConnectionPool(String),

    /// A write noticed that it ran out of time and rolled back.
    #[error("the write was cancelled")]
    WriteCancelled,

    /// The store did not finish the operation within the configured timeout.
    #[error("the transaction store did not respond within {0:?}")]
    StoreTimeout(Duration),

    /// The blocking task running a store operation panicked or was cancelled.
    #[error("the transaction store task failed: {0}")]
    StoreTaskFailed(String),
}

impl Error {
    /// Whether the error means the store could not serve the request, as
    /// opposed to the request itself being malformed.
    pub fn is_store_unavailable(&self) -> bool {
        matches!(
            self,
            Error::SqlError(_)
                | Error::ConnectionPool(_)
                | Error::WriteCancelled
                | Error::StoreTimeout(_)
                | Error::StoreTaskFailed(_)
        )
    }

    /// Convert the error into a response, using `message` as the body of a
    /// 500 response.
    ///
    /// Client errors keep their own message so the caller can see what to
    /// fix. Anything else is logged and reported with `message` only.
    pub fn into_response_with_message(self, message: &'static str) -> Response {
        match self {
            Error::InvalidQueryParameter { .. } => self.into_response(),
            error => {
                tracing::error!("{message}: {error}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "message": message })),
                )
                    .into_response()
            }
        }
    }
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        tracing::error!("an unhandled SQL error occurred: {}", value);
        Error::SqlError(value)
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::InvalidQueryParameter { parameter, .. } => (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "message": self.to_string(),
                    "parameter": parameter,
                })),
            )
                .into_response(),
            // Store failures are not intended to be shown to the client.
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({
                        "message": "An unexpected error occurred, check the server logs for more details."
                    })),
                )
                    .into_response()
            }
        }
    }
}
