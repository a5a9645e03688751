//! Transaction data aggregation for the statistics and chart endpoints.
//!
//! Every function here is a pure reduction over an already filtered slice of
//! transactions.

use std::collections::BTreeMap;

use serde::{Serialize, Serializer, ser::SerializeMap};

use crate::transaction::ProductTransaction;

/// Sales totals for a set of transactions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    /// The sum of the prices of all the transactions, sold or not.
    pub total_sales: f64,
    /// The number of transactions that were sold.
    pub total_sold_items: u64,
    /// The number of transactions that were not sold.
    pub total_not_sold_items: u64,
}

/// Sums prices and counts sold and unsold items.
pub fn compute_statistics(transactions: &[ProductTransaction]) -> Statistics {
    let mut statistics = Statistics {
        total_sales: 0.0,
        total_sold_items: 0,
        total_not_sold_items: 0,
    };

    for transaction in transactions {
        statistics.total_sales += transaction.price;

        if transaction.sold {
            statistics.total_sold_items += 1;
        } else {
            statistics.total_not_sold_items += 1;
        }
    }

    statistics
}

/// One bucket of the price histogram.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceRange {
    /// The label used as the key in the chart data, e.g. "101-200".
    pub label: &'static str,
    /// The largest price in the bucket, inclusive. `None` for the open-ended
    /// last bucket.
    pub upper_bound: Option<f64>,
}

impl PriceRange {
    const fn new(label: &'static str, upper_bound: Option<f64>) -> Self {
        Self { label, upper_bound }
    }
}

/// The buckets of the price histogram in ascending order.
///
/// A price belongs to the first bucket whose upper bound it does not exceed,
/// so a price of 100.5 lands in "101-200".
pub const PRICE_RANGES: [PriceRange; 10] = [
    PriceRange::new("0-100", Some(100.0)),
    PriceRange::new("101-200", Some(200.0)),
    PriceRange::new("201-300", Some(300.0)),
    PriceRange::new("301-400", Some(400.0)),
    PriceRange::new("401-500", Some(500.0)),
    PriceRange::new("501-600", Some(600.0)),
    PriceRange::new("601-700", Some(700.0)),
    PriceRange::new("701-800", Some(800.0)),
    PriceRange::new("801-900", Some(900.0)),
    PriceRange::new("901-above", None),
];

/// The number of transactions in each of the [PRICE_RANGES].
///
/// Serializes as a JSON object with every bucket label present, in bucket
/// order, including the empty ones.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PriceHistogram {
    counts: [u64; PRICE_RANGES.len()],
}

impl PriceHistogram {
    /// The count for the bucket with `label`, or `None` if there is no such
    /// bucket.
    pub fn count(&self, label: &str) -> Option<u64> {
        PRICE_RANGES
            .iter()
            .position(|range| range.label == label)
            .and_then(|index| self.counts.get(index).copied())
    }

    /// The bucket labels and their counts, in bucket order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, u64)> + '_ {
        PRICE_RANGES
            .iter()
            .zip(self.counts.iter())
            .map(|(range, count)| (range.label, *count))
    }

    /// The number of transactions across all buckets.
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    fn add(&mut self, price: f64) {
        let index = PRICE_RANGES
            .iter()
            .position(|range| range.upper_bound.is_none_or(|upper_bound| price <= upper_bound))
            .unwrap_or(PRICE_RANGES.len() - 1);

        if let Some(count) = self.counts.get_mut(index) {
            *count += 1;
        }
    }
}

impl Serialize for PriceHistogram {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(PRICE_RANGES.len()))?;

        for (label, count) in self.iter() {
            map.serialize_entry(label, &count)?;
        }

        map.end()
    }
}

/// Counts how many transactions fall into each price range.
pub fn compute_price_histogram(transactions: &[ProductTransaction]) -> PriceHistogram {
    let mut histogram = PriceHistogram::default();

    for transaction in transactions {
        histogram.add(transaction.price);
    }

    histogram
}

/// The number of transactions in each category.
///
/// Only categories that occur are present, keyed in lexicographic order.
pub type CategoryDistribution = BTreeMap<String, u64>;

/// Counts how many transactions there are in each category.
pub fn compute_category_distribution(transactions: &[ProductTransaction]) -> CategoryDistribution {
    let mut distribution = CategoryDistribution::new();

    for transaction in transactions {
        *distribution.entry(transaction.category.clone()).or_insert(0) += 1;
    }

    distribution
}
