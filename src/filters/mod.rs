//! Predicates that select which transactions a request is about.
//!
//! [MonthFilter] narrows transactions to a calendar month in any year and is
//! evaluated by the store. [SearchFilter] matches a free-text term and is
//! evaluated in-process over the month's transactions.

mod month;
mod search;

pub use month::MonthFilter;
pub use search::SearchFilter;
