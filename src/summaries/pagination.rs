//! Page/limit handling shared by the paged summary endpoints.
use serde::{Deserialize, Serialize};

pub const MAX_LIMIT: i64 = 100;

/// Raw `page` and `limit` query parameters. Kept as text so that junk values
/// fall back to the defaults instead of rejecting the request.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
}

/// A resolved page: `page >= 1` and `1 <= limit <= MAX_LIMIT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub limit: i64,
}

fn parse(raw: &Option<String>) -> Option<i64> {
    raw.as_deref().and_then(|s| s.trim().parse::<i64>().ok())
}

impl PageRequest {
    pub fn resolve(query: &PageQuery, default_limit: i64) -> Self {
        let page = parse(&query.page).filter(|p| *p > 0).unwrap_or(1);
        let limit = parse(&query.limit)
            .unwrap_or(default_limit)
            .clamp(1, MAX_LIMIT);
        Self { page, limit }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

pub fn total_pages(total: i64, limit: i64) -> i64 {
    if total <= 0 {
        return 0;
    }
    (total + limit - 1) / limit
}

#[derive(Debug, Serialize)]
pub struct Paged<T> {
    pub data: Vec<T>,
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
}

impl<T> Paged<T> {
    pub fn new(data: Vec<T>, req: PageRequest, total: i64) -> Self {
        Self {
            data,
            page: req.page,
            limit: req.limit,
            total,
            total_pages: total_pages(total, req.limit),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(page: Option<&str>, limit: Option<&str>) -> PageQuery {
        PageQuery {
            page: page.map(Into::into),
            limit: limit.map(Into::into),
        }
    }

    #[test]
    fn defaults_apply_when_absent() {
        assert_eq!(
            PageRequest::resolve(&query(None, None), 12),
            PageRequest { page: 1, limit: 12 }
        );
    }

    #[test]
    fn non_positive_or_junk_page_means_first() {
        for raw in ["0", "-3", "abc", ""] {
            assert_eq!(PageRequest::resolve(&query(Some(raw), None), 10).page, 1, "{raw}");
        }
    }

    #[test]
    fn limit_is_clamped() {
        assert_eq!(PageRequest::resolve(&query(None, Some("0")), 10).limit, 1);
        assert_eq!(PageRequest::resolve(&query(None, Some("-7")), 10).limit, 1);
        assert_eq!(PageRequest::resolve(&query(None, Some("1000")), 10).limit, 100);
        assert_eq!(PageRequest::resolve(&query(None, Some("25")), 10).limit, 25);
    }

    #[test]
    fn offsets_and_page_counts() {
        let req = PageRequest { page: 3, limit: 10 };
        assert_eq!(req.offset(), 20);
        assert_eq!(total_pages(0, 10), 0);
        assert_eq!(total_pages(10, 10), 1);
        assert_eq!(total_pages(11, 10), 2);
        assert_eq!(PageRequest { page: i64::MAX, limit: 100 }.offset(), i64::MAX);
    }

    #[test]
    fn paged_body_shape() {
        let body = Paged::new(vec![1, 2], PageRequest { page: 2, limit: 2 }, 5);
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"data": [1, 2], "page": 2, "limit": 2, "total": 5, "total_pages": 3})
        );
    }
}
