//! Parses month selectors like `3`, `03`, `mar` or `March` into a month filter.

use time::Month;

use crate::{Error, transaction::ProductTransaction};

const MONTH_NAMES: [(&str, &str, Month); 12] = [
    ("january", "jan", Month::January),
    ("february", "feb", Month::February),
    ("march", "mar", Month::March),
    ("april", "apr", Month::April),
    ("may", "may", Month::May),
    ("june", "jun", Month::June),
    ("july", "jul", Month::July),
    ("august", "aug", Month::August),
    ("september", "sep", Month::September),
    ("october", "oct", Month::October),
    ("november", "nov", Month::November),
    ("december", "dec", Month::December),
];

/// Selects transactions by the month of their sale date, ignoring the year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MonthFilter {
    /// No month was requested: every transaction matches.
    #[default]
    AnyMonth,
    /// Only transactions sold in this month of any year match.
    In(Month),
}

impl MonthFilter {
    /// Parse the `month` query parameter.
    ///
    /// A missing or blank selector gives [MonthFilter::AnyMonth]. Otherwise
    /// the selector must be a number from 1 to 12 (leading zeros allowed), an
    /// English month name, or its three-letter abbreviation. Names are
    /// case-insensitive and must match exactly, so "Ma" and "Marc" are
    /// rejected rather than guessed at.
    ///
    /// # Errors
    /// Returns [Error::InvalidQueryParameter] if the selector is not a month.
    pub fn parse(selector: Option<&str>) -> Result<Self, Error> {
        let Some(selector) = selector.map(str::trim).filter(|text| !text.is_empty()) else {
            return Ok(MonthFilter::AnyMonth);
        };

        parse_month(selector)
            .map(MonthFilter::In)
            .ok_or_else(|| Error::InvalidQueryParameter {
                parameter: "month",
                value: selector.to_owned(),
                reason: "must be a month name or a number from 1 to 12",
            })
    }

    /// The month number from 1 to 12, or `None` for [MonthFilter::AnyMonth].
    pub fn month_number(self) -> Option<u8> {
        match self {
            MonthFilter::AnyMonth => None,
            MonthFilter::In(month) => Some(u8::from(month)),
        }
    }

    /// Whether `transaction` was sold in the selected month.
    pub fn matches(self, transaction: &ProductTransaction) -> bool {
        match self {
            MonthFilter::AnyMonth => true,
            MonthFilter::In(month) => transaction.date_of_sale.month() == month,
        }
    }
}

fn parse_month(selector: &str) -> Option<Month> {
    if selector.bytes().all(|byte| byte.is_ascii_digit()) {
        return selector
            .parse::<u8>()
            .ok()
            .and_then(|number| Month::try_from(number).ok());
    }

    let selector = selector.to_lowercase();

    MONTH_NAMES
        .iter()
        .find(|(name, abbreviation, _)| selector == *name || selector == *abbreviation)
        .map(|(_, _, month)| *month)
}
