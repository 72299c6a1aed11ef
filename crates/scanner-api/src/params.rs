use axum::extract::{
    Path, Query,
    rejection::{PathRejection, QueryRejection},
};
use scanner_types::api::PageQuery;

use crate::error::ApiError;

pub type PageParam = Result<Query<PageQuery>, QueryRejection>;
pub type IdParam = Result<Path<i64>, PathRejection>;

/// `?page=N`; missing or non-numeric pages are a 400.
pub fn page(param: PageParam) -> Result<i64, ApiError> {
    param
        .map(|Query(q)| q.page)
        .map_err(|_| ApiError::bad_request("page is not valid"))
}

pub fn id(param: IdParam, what: &str) -> Result<i64, ApiError> {
    param
        .map(|Path(id)| id)
        .map_err(|_| ApiError::bad_request(format!("{what} is not valid")))
}
