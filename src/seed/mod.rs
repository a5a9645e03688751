//! Seeding the store from the third-party transaction feed.

mod feed;
mod seed_endpoint;

pub use feed::{
    DEFAULT_FEED_URL, FeedRecord, FileTransactionFeed, HttpTransactionFeed, TransactionFeed,
    parse_feed,
};
pub(crate) use seed_endpoint::seed_endpoint;
