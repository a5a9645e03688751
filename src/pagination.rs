//! This modules defines the common functionality for paging data.

use crate::Error;

/// The config for pagination
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationConfig {
    /// The page number to default to when not specified in a request.
    pub default_page: u64,
    /// The number of transactions per page when not specified in a request.
    pub default_page_size: u64,
    /// The largest page size a request may ask for.
    pub max_page_size: u64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_page: 1,
            default_page_size: 10,
            max_page_size: 100,
        }
    }
}

/// A validated request for one page of results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// The 1-based page number.
    pub page: u64,
    /// The maximum number of items on the page.
    pub page_size: u64,
}

impl PageRequest {
    /// Parse the `page` and `perPage` query parameters.
    ///
    /// Missing or blank values fall back to the defaults in `config`.
    ///
    /// # Errors
    /// Returns [Error::InvalidQueryParameter] if a value is not a positive
    /// integer, or if the page size is larger than `config.max_page_size`.
    pub fn parse(
        page: Option<&str>,
        per_page: Option<&str>,
        config: &PaginationConfig,
    ) -> Result<Self, Error> {
        let page = parse_positive_integer("page", page)?.unwrap_or(config.default_page);
        let page_size =
            parse_positive_integer("perPage", per_page)?.unwrap_or(config.default_page_size);

        if page_size > config.max_page_size {
            return Err(Error::InvalidQueryParameter {
                parameter: "perPage",
                value: page_size.to_string(),
                reason: "exceeds the maximum page size",
            });
        }

        Ok(Self { page, page_size })
    }

    /// The number of items that come before this page.
    pub fn offset(self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.page_size)
    }

    /// Take this page out of `items`.
    ///
    /// Returns an empty list if the page starts past the end of `items`.
    pub fn slice<T>(self, items: Vec<T>) -> Vec<T> {
        let offset = usize::try_from(self.offset()).unwrap_or(usize::MAX);
        let page_size = usize::try_from(self.page_size).unwrap_or(usize::MAX);

        items.into_iter().skip(offset).take(page_size).collect()
    }
}

fn parse_positive_integer(parameter: &'static str, value: Option<&str>) -> Result<Option<u64>, Error> {
    let Some(value) = value.map(str::trim).filter(|text| !text.is_empty()) else {
        return Ok(None);
    };

    match value.parse::<u64>() {
        Ok(number) if number > 0 => Ok(Some(number)),
        _ => Err(Error::InvalidQueryParameter {
            parameter,
            value: value.to_owned(),
            reason: "must be a positive integer",
        }),
    }
}
