//! The API endpoints URIs.

/// The route that fills the database from the transaction feed.
pub const SEED: &str = "/api/seed";
/// The route for listing and searching transactions.
pub const TRANSACTIONS: &str = "/api/transactions";
/// The route for the sales totals of a month.
pub const STATISTICS: &str = "/api/statistics";
/// The route for the number of transactions per price range.
pub const BAR_CHART: &str = "/api/bar-chart";
/// The route for the number of transactions per category.
pub const PIE_CHART: &str = "/api/pie-chart";
