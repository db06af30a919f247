// Shared pagination contract: every list endpoint resolves `limit`, `offset`
// and `page` through this one parser.
use std::convert::Infallible;

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

pub const DEFAULT_LIMIT: i64 = 20;
pub const MAX_LIMIT: i64 = 100;

/// Resolved pagination window. Always satisfies `1 <= limit <= 100` and
/// `offset >= 0` regardless of what the query string carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub limit: i64,
    pub offset: i64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self { limit: DEFAULT_LIMIT, offset: 0 }
    }
}

impl Pagination {
    /// Parse from a raw query string. Lenient by contract: unparseable values
    /// fall back to defaults instead of failing the request.
    pub fn from_query(query: &str) -> Self {
        let mut limit: Option<i64> = None;
        let mut offset: Option<i64> = None;
        let mut page: Option<i64> = None;

        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                "limit" => limit = value.parse().ok(),
                "offset" => offset = value.parse().ok(),
                "page" => page = value.parse().ok(),
                _ => {}
            }
        }

        let limit = limit.map(|l| l.clamp(1, MAX_LIMIT)).unwrap_or(DEFAULT_LIMIT);
        let mut offset = offset.map(|o| o.max(0)).unwrap_or(0);

        // page, when valid, wins over offset; a window beyond i64 keeps the
        // offset it would otherwise have overridden
        if let Some(page) = page {
            if page >= 1 {
                if let Some(from_page) = page.checked_sub(1).and_then(|p| p.checked_mul(limit)) {
                    offset = from_page;
                }
            }
        }

        Self { limit, offset }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Pagination
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_query(parts.uri.query().unwrap_or("")))
    }
}
