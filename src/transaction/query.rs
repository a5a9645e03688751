//! Database query helpers for reading transactions by month.

use rusqlite::Connection;

use crate::{Error, filters::MonthFilter};

use super::core::{ProductTransaction, map_transaction_row};

/// Get the transactions sold in the month selected by `month`, in any year.
///
/// Transactions are returned in store order, i.e. by ascending ID, which is
/// the order they were inserted in. [MonthFilter::AnyMonth] returns every
/// transaction.
///
/// # Errors
/// Returns [Error::SqlError] if:
/// - SQL query preparation or execution fails
/// - Transaction row mapping fails
pub(crate) fn get_transactions_in_month(
    month: MonthFilter,
    connection: &Connection,
) -> Result<Vec<ProductTransaction>, Error> {
    connection
        .prepare(
            "SELECT id, title, description, price, category, sold, image, date_of_sale \
            FROM product_transaction \
            WHERE (:month IS NULL OR sale_month = :month) \
            ORDER BY id ASC",
        )?
        .query_map(&[(":month", &month.month_number())], map_transaction_row)?
        .map(|transaction_result| transaction_result.map_err(Error::from))
        .collect()
}
