use async_trait::async_trait;
use time::macros::datetime;

use crate::{
    Error,
    seed::TransactionFeed,
    store::TransactionStore,
    transaction::{NewTransaction, ProductTransaction, insert_transactions},
};

pub(crate) fn get_test_store() -> TransactionStore {
    TransactionStore::open_in_memory(TransactionStore::DEFAULT_TIMEOUT)
        .expect("Could not open in-memory store")
}

pub(crate) async fn insert_test_transactions(
    store: &TransactionStore,
    transactions: Vec<NewTransaction>,
) {
    store
        .write(move |connection, cancel| {
            insert_transactions(transactions, connection, cancel)
        })
        .await
        .expect("Could not insert test transactions");
}

/// A feed that always returns the same transactions.
#[derive(Debug, Clone)]
pub(crate) struct StaticTransactionFeed {
    transactions: Vec<NewTransaction>,
}

impl StaticTransactionFeed {
    pub(crate) fn new(transactions: Vec<NewTransaction>) -> Self {
        Self { transactions }
    }

    pub(crate) fn sample() -> Self {
        Self::new(Self::sample_transactions())
    }

    /// A handful of transactions, three of them sold in March.
    pub(crate) fn sample_transactions() -> Vec<NewTransaction> {
        vec![
            ProductTransaction::build(
                "Fjallraven Foldsack No. 1 Backpack",
                329.85,
                datetime!(2021-11-27 20:29:54 +05:30),
            )
            .description("Your perfect pack for everyday use and walks in the forest.")
            .category("men's clothing")
            .image(Some("https://fakestoreapi.com/img/81fPKd-2AYL._AC_SL1500_.jpg".to_owned())),
            ProductTransaction::build(
                "Mens Casual Premium Slim Fit T-Shirts",
                44.6,
                datetime!(2021-10-27 20:29:54 +05:30),
            )
            .description("Slim-fitting style, contrast raglan long sleeve.")
            .category("men's clothing")
            .sold(true),
            ProductTransaction::build(
                "John Hardy Women's Legends Naga Gold & Silver Dragon Station Chain Bracelet",
                6950.0,
                datetime!(2022-03-27 20:29:54 +05:30),
            )
            .description("From our Legends Collection, the Naga was inspired by the mythical water dragon.")
            .category("jewelery")
            .sold(true),
            ProductTransaction::build(
                "Solid Gold Petite Micropave",
                168.0,
                datetime!(2021-03-27 20:29:54 +05:30),
            )
            .description("Satisfaction Guaranteed. Return or exchange any order within 30 days.")
            .category("jewelery"),
            ProductTransaction::build(
                "WD 2TB Elements Portable External Hard Drive - USB 3.0",
                256.0,
                datetime!(2022-03-02 00:10:00 +05:30),
            )
            .description("USB 3.0 and USB 2.0 compatibility, fast data transfers.")
            .category("electronics")
            .sold(true),
            ProductTransaction::build(
                "Rain Jacket Women Windbreaker Striped Climbing Raincoats",
                79.98,
                datetime!(2022-07-27 20:29:54 +05:30),
            )
            .description("Lightweight perfet for trip or casual wear.")
            .category("women's clothing"),
        ]
    }

    pub(crate) fn len(&self) -> usize {
        self.transactions.len()
    }
}

#[async_trait]
impl TransactionFeed for StaticTransactionFeed {
    async fn fetch(&self) -> Result<Vec<NewTransaction>, Error> {
        Ok(self.transactions.clone())
    }

    fn source(&self) -> String {
        "static test feed".to_owned()
    }
}

/// A feed that can never be reached.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FailingTransactionFeed;

#[async_trait]
impl TransactionFeed for FailingTransactionFeed {
    async fn fetch(&self) -> Result<Vec<NewTransaction>, Error> {
        Err(Error::FeedUnavailable("connection refused".to_owned()))
    }

    fn source(&self) -> String {
        "failing test feed".to_owned()
    }
}
