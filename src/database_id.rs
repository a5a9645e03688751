//! Database ID type definition.

/// Alias for the integer type used for mapping to database IDs.
pub type DatabaseId = i64;

/// The store-assigned ID of a product transaction.
pub type TransactionId = DatabaseId;
