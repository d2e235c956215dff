use serde::{Deserialize, Serialize};

use super::{error::ApiError, form::PageRequest};

#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct PageContext<T> {
    pub count: i64,
    pub next: Option<i64>,
    pub previous: Option<i64>,
    pub results: Vec<T>,
}

impl<T> PageContext<T> {
    pub fn from_rows(rows: Vec<T>, total_rows: i64, request: PageRequest) -> Self {
        if total_rows <= 0 {
            return Self::no_rows();
        }
        let page_count = (total_rows + request.limit - 1) / request.limit;

        let next = if request.page < page_count {
            Some(request.page + 1)
        } else {
            None
        };
        let previous = if request.page > 1 {
            Some((request.page - 1).min(page_count))
        } else {
            None
        };

        Self {
            count: total_rows,
            next,
            previous,
            results: rows,
        }
    }

    /// Like `from_rows`, but an empty page past the first one is an error
    /// instead of an empty listing.
    pub fn try_from_rows(
        rows: Vec<T>,
        total_rows: i64,
        request: PageRequest,
    ) -> Result<Self, ApiError> {
        if rows.is_empty() && request.page > 1 {
            return Err(ApiError::not_found("Invalid page."));
        }
        Ok(Self::from_rows(rows, total_rows, request))
    }

    pub fn no_rows() -> Self {
        Self {
            count: 0,
            next: None,
            previous: None,
            results: vec![],
        }
    }
}
