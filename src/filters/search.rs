//! Free-text search over a transaction's title, description and price.

use crate::transaction::ProductTransaction;

/// Matches transactions against a free-text search term.
///
/// A transaction matches if the term appears in its title or description,
/// ignoring case, or if the term is a number equal to its price. The price is
/// compared as a number, so "150" matches a price of `150.0` but "15" does
/// not.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SearchFilter {
    /// The lower-cased term, or `None` to match everything.
    term: Option<String>,
    /// The term read as a price, if it is a number.
    price: Option<f64>,
}

impl SearchFilter {
    /// Create a filter for `term`.
    ///
    /// Leading and trailing whitespace is ignored. An empty term matches every
    /// transaction.
    pub fn new(term: &str) -> Self {
        let term = term.trim();

        if term.is_empty() {
            return Self::default();
        }

        let price = term
            .parse::<f64>()
            .ok()
            .filter(|price| price.is_finite());

        Self {
            term: Some(term.to_lowercase()),
            price,
        }
    }

    /// Whether `transaction` matches the search term.
    pub fn matches(&self, transaction: &ProductTransaction) -> bool {
        let Some(term) = &self.term else {
            return true;
        };

        self.price == Some(transaction.price)
            || transaction.title.to_lowercase().contains(term)
            || transaction.description.to_lowercase().contains(term)
    }
}
