#![allow(missing_docs)]

pub(crate) mod fixtures;
pub(crate) mod http;

pub(crate) use fixtures::{
    FailingTransactionFeed, StaticTransactionFeed, get_test_store, insert_test_transactions,
};
pub(crate) use http::parse_json_body;
