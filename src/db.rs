//! Sets up the application's SQLite database.

use rusqlite::Connection;

use crate::{Error, transaction::create_transaction_table};

/// Create the tables for the domain models if they do not exist yet.
///
/// Safe to call on an already initialized database.
///
/// # Errors
/// Returns an [Error::SqlError] if a table cannot be created.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    let transaction = connection.unchecked_transaction()?;

    create_transaction_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}
