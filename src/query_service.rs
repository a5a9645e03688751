//! Composes the filters, the store and the aggregations into the operations
//! the API serves.

use crate::{
    Error,
    analytics::{
        CategoryDistribution, PriceHistogram, Statistics, compute_category_distribution,
        compute_price_histogram, compute_statistics,
    },
    filters::{MonthFilter, SearchFilter},
    pagination::PageRequest,
    seed::TransactionFeed,
    store::TransactionStore,
    transaction::{ProductTransaction, get_transactions_in_month, insert_transactions},
};

/// The parameters for listing transactions.
#[derive(Debug, Clone, PartialEq)]
pub struct ListRequest {
    /// Which month to list transactions for.
    pub month: MonthFilter,
    /// Which transactions in that month to keep.
    pub search: SearchFilter,
    /// Which page of the matching transactions to return.
    pub page: PageRequest,
}

/// Answers listing, statistics and chart queries over the transaction store.
///
/// Every call is independent: it reads the store once and keeps no state
/// between calls.
#[derive(Debug, Clone)]
pub struct QueryService {
    store: TransactionStore,
}

impl QueryService {
    /// Create a service that reads from `store`.
    pub fn new(store: TransactionStore) -> Self {
        Self { store }
    }

    /// List one page of the transactions that match both the month and the
    /// search term.
    ///
    /// Transactions are in store order (ascending ID). A page past the end of
    /// the results is empty.
    ///
    /// # Errors
    /// Returns an error if the store cannot be read.
    pub async fn list(&self, request: ListRequest) -> Result<Vec<ProductTransaction>, Error> {
        let ListRequest {
            month,
            search,
            page,
        } = request;

        let matching: Vec<_> = self
            .transactions_in_month(month)
            .await?
            .into_iter()
            .filter(|transaction| search.matches(transaction))
            .collect();

        tracing::debug!(
            "{} transactions match {month:?} and {search:?}, returning page {} of size {}",
            matching.len(),
            page.page,
            page.page_size
        );

        Ok(page.slice(matching))
    }

    /// Total sales and sold/unsold counts for the month.
    ///
    /// # Errors
    /// Returns an error if the store cannot be read.
    pub async fn statistics(&self, month: MonthFilter) -> Result<Statistics, Error> {
        let transactions = self.transactions_in_month(month).await?;

        Ok(compute_statistics(&transactions))
    }

    /// The number of the month's transactions in each price range.
    ///
    /// # Errors
    /// Returns an error if the store cannot be read.
    pub async fn price_histogram(&self, month: MonthFilter) -> Result<PriceHistogram, Error> {
        let transactions = self.transactions_in_month(month).await?;

        Ok(compute_price_histogram(&transactions))
    }

    /// The number of the month's transactions in each category.
    ///
    /// # Errors
    /// Returns an error if the store cannot be read.
    pub async fn category_distribution(
        &self,
        month: MonthFilter,
    ) -> Result<CategoryDistribution, Error> {
        let transactions = self.transactions_in_month(month).await?;

        Ok(compute_category_distribution(&transactions))
    }

    /// Fetch every transaction from `feed` and insert them into the store.
    ///
    /// Seeding is not idempotent: seeding twice stores every transaction
    /// twice. A seed that fails, including one that runs past the store's
    /// timeout, inserts nothing.
    ///
    /// # Errors
    /// Returns an error if the feed cannot be fetched or decoded, if a record
    /// is invalid, or if the store cannot be written to in time.
    pub async fn seed(&self, feed: &dyn TransactionFeed) -> Result<usize, Error> {
        let transactions = feed.fetch().await?;
        tracing::info!(
            "Fetched {} transactions from {}",
            transactions.len(),
            feed.source()
        );

        let inserted = self
            .store
            .write(move |connection, cancel| {
                insert_transactions(transactions, connection, cancel)
            })
            .await?;
        tracing::info!("Seeded the database with {inserted} transactions");

        Ok(inserted)
    }

    async fn transactions_in_month(
        &self,
        month: MonthFilter,
    ) -> Result<Vec<ProductTransaction>, Error> {
        let transactions = self
            .store
            .read(move |connection| get_transactions_in_month(month, connection))
            .await?;

        debug_assert!(
            transactions
                .iter()
                .all(|transaction| month.matches(transaction)),
            "the store returned a transaction outside of {month:?}"
        );

        Ok(transactions)
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use time::{Month, macros::datetime};

    use crate::{
        Error,
        filters::{MonthFilter, SearchFilter},
        pagination::PageRequest,
        store::TransactionStore,
        test_utils::{FailingTransactionFeed, StaticTransactionFeed, get_test_store},
        transaction::{ProductTransaction, count_transactions},
    };

    use super::{ListRequest, QueryService};

    fn list_request(month: MonthFilter, search: &str, page: u64, page_size: u64) -> ListRequest {
        ListRequest {
            month,
            search: SearchFilter::new(search),
            page: PageRequest { page, page_size },
        }
    }

    async fn seeded_service(feed: StaticTransactionFeed) -> QueryService {
        let service = QueryService::new(get_test_store());
        service.seed(&feed).await.expect("Could not seed test store");
        service
    }

    #[tokio::test]
    async fn list_applies_month_and_search_together() {
        let service = seeded_service(StaticTransactionFeed::new(vec![
            ProductTransaction::build("Red shirt", 20.0, datetime!(2022-03-01 10:00:00 UTC)),
            ProductTransaction::build("Blue shirt", 25.0, datetime!(2021-03-15 10:00:00 UTC)),
            ProductTransaction::build("Red shirt", 20.0, datetime!(2022-04-01 10:00:00 UTC)),
            ProductTransaction::build("Red hat", 15.0, datetime!(2022-03-20 10:00:00 UTC)),
        ]))
        .await;

        let got = service
            .list(list_request(MonthFilter::In(Month::March), "shirt", 1, 10))
            .await
            .unwrap();

        let ids: Vec<_> = got.iter().map(|transaction| transaction.id).collect();
        assert_eq!(ids, [1, 2]);
    }

    #[tokio::test]
    async fn list_pages_through_matches_in_store_order() {
        let transactions = (1..=25)
            .map(|i| {
                ProductTransaction::build(
                    &format!("Item {i}"),
                    f64::from(i),
                    datetime!(2022-03-10 10:00:00 UTC),
                )
            })
            .collect();
        let service = seeded_service(StaticTransactionFeed::new(transactions)).await;

        let got = service
            .list(list_request(MonthFilter::parse(Some("3")).unwrap(), "", 2, 10))
            .await
            .unwrap();

        let ids: Vec<_> = got.iter().map(|transaction| transaction.id).collect();
        assert_eq!(ids, (11..=20).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn list_past_the_last_page_is_empty() {
        let service = seeded_service(StaticTransactionFeed::new(vec![ProductTransaction::build(
            "Only",
            1.0,
            datetime!(2022-03-10 10:00:00 UTC),
        )]))
        .await;

        let got = service
            .list(list_request(MonthFilter::AnyMonth, "", 5, 10))
            .await;

        assert_eq!(got, Ok(Vec::new()));
    }

    #[tokio::test]
    async fn month_name_and_number_select_the_same_transactions() {
        let service = seeded_service(StaticTransactionFeed::sample()).await;

        let by_name = service
            .list(list_request(MonthFilter::parse(Some("March")).unwrap(), "", 1, 100))
            .await
            .unwrap();
        let by_number = service
            .list(list_request(MonthFilter::parse(Some("3")).unwrap(), "", 1, 100))
            .await
            .unwrap();

        assert!(!by_name.is_empty());
        assert_eq!(by_name, by_number);
    }

    #[tokio::test]
    async fn statistics_for_march() {
        let service = seeded_service(StaticTransactionFeed::new(vec![
            ProductTransaction::build("Sold", 100.0, datetime!(2022-03-01 10:00:00 UTC)).sold(true),
            ProductTransaction::build("Unsold", 200.0, datetime!(2021-03-05 10:00:00 UTC)),
            ProductTransaction::build("April", 999.0, datetime!(2022-04-05 10:00:00 UTC)),
        ]))
        .await;

        let got = service
            .statistics(MonthFilter::In(Month::March))
            .await
            .unwrap();

        assert_eq!(got.total_sales, 300.0);
        assert_eq!(got.total_sold_items, 1);
        assert_eq!(got.total_not_sold_items, 1);
    }

    #[tokio::test]
    async fn charts_only_count_the_selected_month() {
        let service = seeded_service(StaticTransactionFeed::new(vec![
            ProductTransaction::build("A", 50.0, datetime!(2022-03-01 10:00:00 UTC))
                .category("books"),
            ProductTransaction::build("B", 150.0, datetime!(2022-03-02 10:00:00 UTC))
                .category("books"),
            ProductTransaction::build("C", 950.0, datetime!(2022-03-03 10:00:00 UTC))
                .category("games"),
            ProductTransaction::build("D", 50.0, datetime!(2022-05-03 10:00:00 UTC))
                .category("toys"),
        ]))
        .await;

        let histogram = service
            .price_histogram(MonthFilter::In(Month::March))
            .await
            .unwrap();
        let categories = service
            .category_distribution(MonthFilter::In(Month::March))
            .await
            .unwrap();

        assert_eq!(histogram.count("0-100"), Some(1));
        assert_eq!(histogram.count("101-200"), Some(1));
        assert_eq!(histogram.count("901-above"), Some(1));
        assert_eq!(histogram.total(), 3);
        assert_eq!(categories.len(), 2);
        assert_eq!(categories.get("books"), Some(&2));
        assert_eq!(categories.get("games"), Some(&1));
        assert_eq!(categories.get("toys"), None);
    }

    #[tokio::test]
    async fn seeding_twice_duplicates_records() {
        let feed = StaticTransactionFeed::sample();
        let service = QueryService::new(get_test_store());

        let first = service.seed(&feed).await.unwrap();
        let second = service.seed(&feed).await.unwrap();
        let count = service.store.read(count_transactions).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(count, first + second);
    }

    #[tokio::test]
    async fn seed_that_waits_past_the_timeout_inserts_nothing() {
        let timeout = Duration::from_millis(50);
        let store = get_test_store().with_timeout(timeout);
        let service = QueryService::new(store.clone());
        let busy_writer = tokio::spawn({
            let store = store.clone();
            async move {
                store
                    .write(|_, _| {
                        std::thread::sleep(Duration::from_millis(200));
                        Ok(())
                    })
                    .await
            }
        });
        tokio::time::sleep(Duration::from_millis(10)).await;

        let result = service.seed(&StaticTransactionFeed::sample()).await;
        busy_writer.await.unwrap().unwrap();
        let store = store.with_timeout(TransactionStore::DEFAULT_TIMEOUT);
        let count = store.read(count_transactions).await.unwrap();

        assert_eq!(result, Err(Error::StoreTimeout(timeout)));
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn seed_that_runs_past_the_timeout_inserts_nothing() {
        let timeout = Duration::from_millis(1);
        let store = get_test_store().with_timeout(timeout);
        let service = QueryService::new(store.clone());
        let transactions = (0..50_000)
            .map(|i| {
                ProductTransaction::build(
                    &format!("Item {i}"),
                    1.0,
                    datetime!(2022-03-10 10:00:00 UTC),
                )
            })
            .collect();

        let result = service
            .seed(&StaticTransactionFeed::new(transactions))
            .await;
        let store = store.with_timeout(TransactionStore::DEFAULT_TIMEOUT);
        let count = store.read(count_transactions).await.unwrap();

        assert_eq!(result, Err(Error::StoreTimeout(timeout)));
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn reads_run_alongside_a_slow_read() {
        let service = seeded_service(StaticTransactionFeed::sample()).await;
        let slow_read = tokio::spawn({
            let store = service.store.clone();
            async move {
                store
                    .read(|connection| {
                        std::thread::sleep(Duration::from_millis(300));
                        count_transactions(connection)
                    })
                    .await
            }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;

        let started = Instant::now();
        let statistics = service.statistics(MonthFilter::AnyMonth).await;
        let elapsed = started.elapsed();

        assert!(statistics.is_ok(), "want statistics, got {statistics:?}");
        assert!(
            elapsed < Duration::from_millis(200),
            "want statistics without waiting for the slow read, took {elapsed:?}"
        );
        assert_eq!(slow_read.await.unwrap(), Ok(StaticTransactionFeed::sample().len()));
    }

    #[tokio::test]
    async fn failed_seed_inserts_nothing() {
        let service = QueryService::new(get_test_store());

        let result = service.seed(&FailingTransactionFeed).await;
        let count = service.store.read(count_transactions).await.unwrap();

        assert!(matches!(result, Err(Error::FeedUnavailable(_))));
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn seed_with_invalid_record_inserts_nothing() {
        let service = QueryService::new(get_test_store());
        let feed = StaticTransactionFeed::new(vec![
            ProductTransaction::build("Fine", 1.0, datetime!(2022-03-01 10:00:00 UTC)),
            ProductTransaction::build("Broken", -1.0, datetime!(2022-03-01 10:00:00 UTC)),
        ]);

        let result = service.seed(&feed).await;
        let count = service.store.read(count_transactions).await.unwrap();

        assert!(matches!(result, Err(Error::InvalidRecord(_))));
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn store_failure_is_reported_as_unavailable() {
        let service = QueryService::new(get_test_store());
        service
            .store
            .write(|connection, _| {
                connection.execute("DROP TABLE product_transaction", ())?;
                Ok(())
            })
            .await
            .unwrap();

        let result = service.statistics(MonthFilter::AnyMonth).await;

        assert!(
            result.as_ref().is_err_and(Error::is_store_unavailable),
            "want store error, got {result:?}"
        );
    }
}
