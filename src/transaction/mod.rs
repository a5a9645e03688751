//! Product transactions: the model, its table, the queries the API needs, and
//! the listing endpoint.

mod core;
mod list_endpoint;
mod query;

pub use core::{NewTransaction, ProductTransaction, count_transactions};
pub(crate) use core::{create_transaction_table, insert_transactions};
pub(crate) use list_endpoint::list_transactions_endpoint;
pub(crate) use query::get_transactions_in_month;
