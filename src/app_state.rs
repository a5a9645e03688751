//! Implements a struct that holds the state of the REST server.

use std::sync::Arc;

use crate::{pagination::PaginationConfig, seed::TransactionFeed, store::TransactionStore};

/// The state of the REST server.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The handle to the transaction database.
    pub store: TransactionStore,

    /// Where the seed endpoint fetches transactions from.
    pub feed: Arc<dyn TransactionFeed>,

    /// The config that controls how to page through transactions.
    pub pagination_config: PaginationConfig,
}

impl AppState {
    /// Create a new [AppState] from an open store and a transaction feed.
    pub fn new(
        store: TransactionStore,
        feed: Arc<dyn TransactionFeed>,
        pagination_config: PaginationConfig,
    ) -> Self {
        Self {
            store,
            feed,
            pagination_config,
        }
    }
}
