//! Defines the core data models and database queries for product transactions.

use rusqlite::{Connection, Row, types::Type};
use serde::Serialize;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use crate::{Error, database_id::TransactionId, store::CancelToken};

// ============================================================================
// MODELS
// ============================================================================

/// The sale of a product, as stored in the database.
///
/// To create a new `ProductTransaction`, use [ProductTransaction::build].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductTransaction {
    /// The ID of the transaction, assigned by the store.
    pub id: TransactionId,
    /// The name of the product.
    pub title: String,
    /// A text description of the product.
    pub description: String,
    /// The price of the product. Never negative.
    pub price: f64,
    /// A short label used to group products, e.g. "electronics".
    pub category: String,
    /// Whether the product was sold.
    pub sold: bool,
    /// An optional URL to a picture of the product.
    pub image: Option<String>,
    /// When the sale happened.
    ///
    /// Only the month is used when filtering. It is read in the offset the
    /// date was recorded with, not converted to UTC.
    #[serde(with = "time::serde::rfc3339")]
    pub date_of_sale: OffsetDateTime,
}

impl ProductTransaction {
    /// Create a new transaction.
    ///
    /// Shortcut for [NewTransaction] for discoverability.
    pub fn build(title: &str, price: f64, date_of_sale: OffsetDateTime) -> NewTransaction {
        NewTransaction {
            title: title.to_owned(),
            description: String::new(),
            price,
            category: String::new(),
            sold: false,
            image: None,
            date_of_sale,
        }
    }
}

/// A transaction that has not been saved to the database yet.
///
/// The store assigns the ID on insert.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    /// The name of the product.
    pub title: String,
    /// A text description of the product.
    pub description: String,
    /// The price of the product. Must be finite and not negative.
    pub price: f64,
    /// A short label used to group products.
    pub category: String,
    /// Whether the product was sold.
    pub sold: bool,
    /// An optional URL to a picture of the product.
    pub image: Option<String>,
    /// When the sale happened.
    pub date_of_sale: OffsetDateTime,
}

impl NewTransaction {
    /// Set the description.
    pub fn description(mut self, description: &str) -> Self {
        self.description = description.to_owned();
        self
    }

    /// Set the category.
    pub fn category(mut self, category: &str) -> Self {
        self.category = category.to_owned();
        self
    }

    /// Set whether the product was sold.
    pub fn sold(mut self, sold: bool) -> Self {
        self.sold = sold;
        self
    }

    /// Set the image URL.
    pub fn image(mut self, image: Option<String>) -> Self {
        self.image = image;
        self
    }

    fn validate(&self) -> Result<(), Error> {
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(Error::InvalidRecord(format!(
                "price of \"{}\" must be a non-negative number, got {}",
                self.title, self.price
            )));
        }

        Ok(())
    }
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Insert `transactions` into the database in a single SQL transaction.
///
/// Every record is validated before anything is written, so either all of
/// the transactions are inserted or none of them are. Records are not
/// deduplicated: inserting the same list twice stores it twice. `cancel` is
/// checked before every row and before committing.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidRecord] if a transaction has a negative price or a sale
///   date that cannot be written as RFC 3339,
/// - [Error::WriteCancelled] if `cancel` fires before the commit, in which
///   case nothing is inserted,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn insert_transactions(
    transactions: Vec<NewTransaction>,
    connection: &Connection,
    cancel: &CancelToken,
) -> Result<usize, Error> {
    let mut rows = Vec::with_capacity(transactions.len());

    for transaction in transactions {
        transaction.validate()?;

        let date_of_sale = transaction.date_of_sale.format(&Rfc3339).map_err(|error| {
            Error::InvalidRecord(format!(
                "date of sale of \"{}\" cannot be stored: {error}",
                transaction.title
            ))
        })?;
        let sale_month = u8::from(transaction.date_of_sale.month());

        rows.push((transaction, date_of_sale, sale_month));
    }

    cancel.check()?;
    let tx = connection.unchecked_transaction()?;

    // Prepare the insert statement once for reuse
    let mut stmt = tx.prepare(
        "INSERT INTO product_transaction
            (title, description, price, category, sold, image, date_of_sale, sale_month)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
    )?;

    for (transaction, date_of_sale, sale_month) in &rows {
        cancel.check()?;
        stmt.execute((
            &transaction.title,
            &transaction.description,
            transaction.price,
            &transaction.category,
            transaction.sold,
            &transaction.image,
            date_of_sale,
            sale_month,
        ))?;
    }

    drop(stmt);
    cancel.check()?;
    tx.commit()?;

    Ok(rows.len())
}

/// Get the total number of transactions in the database.
///
/// # Errors
/// This function will return a [Error::SqlError] there is some SQL error.
pub fn count_transactions(connection: &Connection) -> Result<usize, Error> {
    let count: i64 =
        connection.query_row("SELECT COUNT(id) FROM product_transaction;", [], |row| {
            row.get(0)
        })?;

    usize::try_from(count)
        .map_err(|_| rusqlite::Error::IntegralValueOutOfRange(0, count).into())
}

/// Create the product transaction table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS product_transaction (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                description TEXT NOT NULL,
                price REAL NOT NULL CHECK (price >= 0),
                category TEXT NOT NULL,
                sold INTEGER NOT NULL,
                image TEXT,
                date_of_sale TEXT NOT NULL,
                sale_month INTEGER NOT NULL CHECK (sale_month BETWEEN 1 AND 12)
                )",
        (),
    )?;

    // Every read filters by month.
    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_product_transaction_sale_month
            ON product_transaction(sale_month);",
        (),
    )?;

    Ok(())
}

/// Map a database row to a [ProductTransaction].
///
/// Expects the columns `id, title, description, price, category, sold, image,
/// date_of_sale` in that order.
pub fn map_transaction_row(row: &Row) -> Result<ProductTransaction, rusqlite::Error> {
    let id = row.get(0)?;
    let title = row.get(1)?;
    let description = row.get(2)?;
    let price = row.get(3)?;
    let category = row.get(4)?;
    let sold = row.get(5)?;
    let image = row.get(6)?;
    let date_of_sale: String = row.get(7)?;
    let date_of_sale = OffsetDateTime::parse(&date_of_sale, &Rfc3339)
        .map_err(|error| rusqlite::Error::FromSqlConversionFailure(7, Type::Text, Box::new(error)))?;

    Ok(ProductTransaction {
        id,
        title,
        description,
        price,
        category,
        sold,
        image,
        date_of_sale,
    })
}

// ============================================================================
// TESTS
// ============================================================================
