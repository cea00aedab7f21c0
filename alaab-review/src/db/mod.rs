//! Database access for alaab-review
//!
//! Schema creation lives in `alaab_common::db`; these modules hold the
//! per-table queries. Functions that must run inside a caller's transaction
//! take `&mut SqliteConnection`; read-only listings take the pool.

pub mod concepts;
pub mod games;
pub mod reference;
pub mod review_logs;
pub mod similarities;
pub mod users;

use alaab_common::Result;
use uuid::Uuid;

/// Parse a stored guid column
pub(crate) fn parse_guid(value: &str) -> Result<Uuid> {
    Ok(Uuid::parse_str(value)?)
}

/// Parse an optional stored guid column
pub(crate) fn parse_guid_opt(value: Option<String>) -> Result<Option<Uuid>> {
    value.as_deref().map(parse_guid).transpose()
}
