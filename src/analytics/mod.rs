//! Summary statistics and chart data for a month's transactions.

mod aggregation;
mod handlers;

pub use aggregation::{
    CategoryDistribution, PRICE_RANGES, PriceHistogram, PriceRange, Statistics,
    compute_category_distribution, compute_price_histogram, compute_statistics,
};
pub(crate) use handlers::{get_bar_chart, get_pie_chart, get_statistics};
