//! Sources of transaction records for seeding the store.
//!
//! The feed is a JSON array of product records. Feed-supplied IDs are
//! ignored because the store assigns its own.

use std::{
    fmt::Debug,
    path::{Path, PathBuf},
    time::Duration,
};

use async_trait::async_trait;
use reqwest::{Client, Url, header::ACCEPT};
use serde::Deserialize;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use crate::{
    Error,
    transaction::{NewTransaction, ProductTransaction},
};

/// Where the product transaction dataset is published.
pub const DEFAULT_FEED_URL: &str = "https://s3.amazonaws.com/roxiler.com/product_transaction.json";

/// A source of transactions to seed the store with.
#[async_trait]
pub trait TransactionFeed: Debug + Send + Sync {
    /// Fetch and decode every transaction in the feed.
    ///
    /// # Errors
    /// Returns [Error::FeedUnavailable] if the feed cannot be read,
    /// [Error::InvalidFeed] if it is not a JSON array of records, or
    /// [Error::InvalidRecord] if a record has an invalid sale date.
    async fn fetch(&self) -> Result<Vec<NewTransaction>, Error>;

    /// A human-readable description of where the feed comes from, for logs.
    fn source(&self) -> String;
}

/// One record as it appears in the feed.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedRecord {
    /// The name of the product.
    pub title: String,
    /// A text description of the product.
    #[serde(default)]
    pub description: String,
    /// The price of the product.
    pub price: f64,
    /// A short label used to group products.
    #[serde(default)]
    pub category: String,
    /// Whether the product was sold.
    #[serde(default)]
    pub sold: bool,
    /// An optional URL to a picture of the product.
    #[serde(default)]
    pub image: Option<String>,
    /// When the sale happened, as RFC 3339 text.
    pub date_of_sale: String,
}

impl FeedRecord {
    /// Convert the record into a transaction ready for insertion.
    ///
    /// # Errors
    /// Returns [Error::InvalidRecord] if `date_of_sale` is not an RFC 3339
    /// date-time.
    pub fn into_new_transaction(self) -> Result<NewTransaction, Error> {
        let date_of_sale = OffsetDateTime::parse(&self.date_of_sale, &Rfc3339).map_err(|error| {
            Error::InvalidRecord(format!(
                "invalid dateOfSale {:?} for \"{}\": {error}",
                self.date_of_sale, self.title
            ))
        })?;

        Ok(ProductTransaction::build(&self.title, self.price, date_of_sale)
            .description(&self.description)
            .category(&self.category)
            .sold(self.sold)
            .image(self.image))
    }
}

/// Decode a feed body into transactions ready for insertion.
///
/// # Errors
/// Returns [Error::InvalidFeed] if `body` is not a JSON array of records, or
/// [Error::InvalidRecord] if a record has an invalid sale date.
pub fn parse_feed(body: &[u8]) -> Result<Vec<NewTransaction>, Error> {
    let records: Vec<FeedRecord> = serde_json::from_slice(body)
        .map_err(|error| Error::InvalidFeed(format!("invalid feed JSON payload: {error}")))?;

    records
        .into_iter()
        .map(FeedRecord::into_new_transaction)
        .collect()
}

/// Fetches the feed over HTTP.
#[derive(Debug, Clone)]
pub struct HttpTransactionFeed {
    client: Client,
    url: Url,
}

impl HttpTransactionFeed {
    /// Build a feed that GETs `url`, giving up after `timeout`.
    ///
    /// # Errors
    /// Returns [Error::FeedUnavailable] if the HTTP client cannot be built.
    pub fn new(url: Url, timeout: Duration) -> Result<Self, Error> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| Error::FeedUnavailable(format!("could not build HTTP client: {error}")))?;

        Ok(Self { client, url })
    }
}

#[async_trait]
impl TransactionFeed for HttpTransactionFeed {
    async fn fetch(&self) -> Result<Vec<NewTransaction>, Error> {
        let response = self
            .client
            .get(self.url.clone())
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|error| Error::FeedUnavailable(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::FeedUnavailable(format!(
                "{} responded with status {status}",
                self.url
            )));
        }

        let body = response
            .bytes()
            .await
            .map_err(|error| Error::FeedUnavailable(error.to_string()))?;

        parse_feed(&body)
    }

    fn source(&self) -> String {
        self.url.to_string()
    }
}

/// Reads the feed from a JSON file, e.g. a saved copy of the published feed.
#[derive(Debug, Clone)]
pub struct FileTransactionFeed {
    path: PathBuf,
}

impl FileTransactionFeed {
    /// Build a feed that reads the file at `path`.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_owned(),
        }
    }
}

#[async_trait]
impl TransactionFeed for FileTransactionFeed {
    async fn fetch(&self) -> Result<Vec<NewTransaction>, Error> {
        let body = tokio::fs::read(&self.path).await.map_err(|error| {
            Error::FeedUnavailable(format!("could not read {}: {error}", self.path.display()))
        })?;

        parse_feed(&body)
    }

    fn source(&self) -> String {
        self.path.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::{Router, http::StatusCode, routing::get};
    use reqwest::Url;
    use time::macros::datetime;
    use tokio::net::TcpListener;

    use crate::{Error, transaction::ProductTransaction};

    use super::{FileTransactionFeed, HttpTransactionFeed, TransactionFeed, parse_feed};

    const SAMPLE_FEED: &str = r#"[
        {
            "id": 1,
            "title": "Fjallraven  - Foldsack No. 1 Backpack, Fits 15 Laptops",
            "price": 329.85,
            "description": "Your perfect pack for everyday use and walks in the forest.",
            "category": "men's clothing",
            "image": "https://fakestoreapi.com/img/81fPKd-2AYL._AC_SL1500_.jpg",
            "sold": false,
            "dateOfSale": "2021-11-27T20:29:54+05:30"
        },
        {
            "id": 2,
            "title": "Mens Casual Premium Slim Fit T-Shirts",
            "price": 44.6,
            "description": "Slim-fitting style.",
            "category": "men's clothing",
            "sold": true,
            "dateOfSale": "2021-10-27T20:29:54+05:30"
        }
    ]"#;

    async fn serve(router: Router) -> Url {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, router).await });

        Url::parse(&format!("http://{addr}/feed.json")).unwrap()
    }

    #[test]
    fn parses_published_feed_format() {
        let got = parse_feed(SAMPLE_FEED.as_bytes()).unwrap();

        let want = vec![
            ProductTransaction::build(
                "Fjallraven  - Foldsack No. 1 Backpack, Fits 15 Laptops",
                329.85,
                datetime!(2021-11-27 20:29:54 +05:30),
            )
            .description("Your perfect pack for everyday use and walks in the forest.")
            .category("men's clothing")
            .image(Some(
                "https://fakestoreapi.com/img/81fPKd-2AYL._AC_SL1500_.jpg".to_owned(),
            )),
            ProductTransaction::build(
                "Mens Casual Premium Slim Fit T-Shirts",
                44.6,
                datetime!(2021-10-27 20:29:54 +05:30),
            )
            .description("Slim-fitting style.")
            .category("men's clothing")
            .sold(true),
        ];
        assert_eq!(want, got);
    }

    #[test]
    fn rejects_invalid_sale_date() {
        let body = r#"[{"title": "Bad", "price": 1.0, "dateOfSale": "27/11/2021"}]"#;

        let got = parse_feed(body.as_bytes());

        assert!(matches!(got, Err(Error::InvalidRecord(_))), "got {got:?}");
    }

    #[test]
    fn rejects_body_that_is_not_a_list_of_records() {
        for body in ["{}", "not json", r#"[{"title": "No price"}]"#] {
            let got = parse_feed(body.as_bytes());

            assert!(
                matches!(got, Err(Error::InvalidFeed(_))),
                "body {body:?} gave {got:?}"
            );
        }
    }

    #[tokio::test]
    async fn http_feed_fetches_and_decodes() {
        let url = serve(Router::new().route("/feed.json", get(|| async { SAMPLE_FEED }))).await;
        let feed = HttpTransactionFeed::new(url.clone(), Duration::from_secs(5)).unwrap();

        let got = feed.fetch().await.unwrap();

        assert_eq!(got.len(), 2);
        assert_eq!(feed.source(), url.to_string());
    }

    #[tokio::test]
    async fn http_feed_reports_error_status() {
        let url = serve(Router::new().route(
            "/feed.json",
            get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "down for maintenance") }),
        ))
        .await;
        let feed = HttpTransactionFeed::new(url, Duration::from_secs(5)).unwrap();

        let got = feed.fetch().await;

        assert!(matches!(got, Err(Error::FeedUnavailable(_))), "got {got:?}");
    }

    #[tokio::test]
    async fn http_feed_times_out() {
        let url = serve(Router::new().route(
            "/feed.json",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                SAMPLE_FEED
            }),
        ))
        .await;
        let feed = HttpTransactionFeed::new(url, Duration::from_millis(50)).unwrap();

        let got = feed.fetch().await;

        assert!(matches!(got, Err(Error::FeedUnavailable(_))), "got {got:?}");
    }

    #[tokio::test]
    async fn file_feed_reports_missing_file() {
        let feed = FileTransactionFeed::new("/definitely/not/a/real/feed.json");

        let got = feed.fetch().await;

        assert!(matches!(got, Err(Error::FeedUnavailable(_))), "got {got:?}");
    }
}
