//! Standardized API response envelope.
//!
//! Every API response body is one of two shapes:
//!
//! ```json
//! { "success": true, "message": "...", "data": {...}, "timestamp": "2026-10-19T08:00:00.000Z" }
//! { "success": false, "message": "...", "data": null, "errors": {...}, "timestamp": "..." }
//! ```
//!
//! or, for paginated listings, [`PaginatedResponse`] which carries a `pagination`
//! block next to a `data` list.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Render a timestamp the way every envelope does: UTC, millisecond precision.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Uniform success/error wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T = Value> {
    pub success: bool,
    pub message: String,
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Value>,
    pub timestamp: String,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T, message: impl Into<String>) -> Self {
        Self::success_at(data, message, Utc::now())
    }

    /// Success envelope stamped with an explicit time.
    pub fn success_at(data: T, message: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
            errors: None,
            timestamp: format_timestamp(at),
        }
    }

    pub fn error(message: impl Into<String>, errors: Option<Value>) -> Self {
        Self::error_at(message, errors, Utc::now())
    }

    /// Error envelope stamped with an explicit time. `data` is always null.
    pub fn error_at(message: impl Into<String>, errors: Option<Value>, at: DateTime<Utc>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
            errors,
            timestamp: format_timestamp(at),
        }
    }
}

/// Page metadata for listing endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub current_page: u64,
    pub last_page: u64,
    pub per_page: u64,
    pub total: u64,
    /// 1-indexed position of the first item on this page, `None` when the page is empty.
    pub from: Option<u64>,
    /// 1-indexed position of the last item on this page, `None` when the page is empty.
    pub to: Option<u64>,
}

impl Pagination {
    /// Compute page metadata for a page holding `item_count` items.
    ///
    /// `page` and `per_page` are floored at 1. An empty listing still reports
    /// `last_page = 1`.
    pub fn new(page: u64, per_page: u64, total: u64, item_count: usize) -> Self {
        let page = page.max(1);
        let per_page = per_page.max(1);
        let last_page = total.div_ceil(per_page).max(1);

        let (from, to) = if item_count == 0 {
            (None, None)
        } else {
            let from = (page - 1).saturating_mul(per_page).saturating_add(1);
            let to = from.saturating_add(item_count as u64 - 1);
            (Some(from), Some(to))
        };

        Self {
            current_page: page,
            last_page,
            per_page,
            total,
            from,
            to,
        }
    }
}

/// Paginated listing wrapper. Replaces `data`/`errors` with a list and a
/// `pagination` block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub success: bool,
    pub message: String,
    pub data: Vec<T>,
    pub pagination: Pagination,
    pub timestamp: String,
}

impl<T> PaginatedResponse<T> {
    pub fn new(items: Vec<T>, page: u64, per_page: u64, total: u64, message: impl Into<String>) -> Self {
        Self::new_at(items, page, per_page, total, message, Utc::now())
    }

    pub fn new_at(
        items: Vec<T>,
        page: u64,
        per_page: u64,
        total: u64,
        message: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Self {
        let pagination = Pagination::new(page, per_page, total, items.len());
        Self {
            success: true,
            message: message.into(),
            data: items,
            pagination,
            timestamp: format_timestamp(at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 8, 30, 0).unwrap()
    }

    #[test]
    fn test_success_envelope_shape() {
        let response = ApiResponse::success_at(json!({"x": 1}), "ok", fixed_time());
        let body = serde_json::to_value(&response).unwrap();

        assert_eq!(
            body,
            json!({
                "success": true,
                "message": "ok",
                "data": {"x": 1},
                "timestamp": "2026-10-19T08:30:00.000Z"
            })
        );
        assert!(body.get("errors").is_none());
    }

    #[test]
    fn test_error_envelope_shape() {
        let response: ApiResponse =
            ApiResponse::error_at("bad", Some(json!({"field": ["msg"]})), fixed_time());
        let body = serde_json::to_value(&response).unwrap();

        assert_eq!(body["success"], json!(false));
        assert_eq!(body["message"], json!("bad"));
        assert_eq!(body["errors"], json!({"field": ["msg"]}));
        assert_eq!(body["data"], Value::Null);
        assert_eq!(body["timestamp"], json!("2026-10-19T08:30:00.000Z"));
    }

    #[test]
    fn test_timestamp_keeps_milliseconds() {
        let at = fixed_time() + chrono::TimeDelta::milliseconds(42);
        assert_eq!(format_timestamp(at), "2026-10-19T08:30:00.042Z");
    }

    #[test]
    fn test_pagination_middle_page() {
        let page = Pagination::new(2, 15, 75, 15);

        assert_eq!(page.last_page, 5);
        assert_eq!(page.from, Some(16));
        assert_eq!(page.to, Some(30));
        assert_eq!(page.current_page, 2);
    }

    #[test]
    fn test_pagination_empty() {
        let page = Pagination::new(1, 15, 0, 0);

        assert_eq!(page.last_page, 1);
        assert_eq!(page.from, None);
        assert_eq!(page.to, None);
    }

    #[test]
    fn test_pagination_partial_last_page() {
        let page = Pagination::new(3, 10, 23, 3);

        assert_eq!(page.last_page, 3);
        assert_eq!(page.from, Some(21));
        assert_eq!(page.to, Some(23));
    }

    #[test]
    fn test_pagination_huge_page_saturates() {
        let page = Pagination::new(u64::MAX / 2, 15, 75, 1);

        assert_eq!(page.last_page, 5);
        assert_eq!(page.from, Some(u64::MAX));
        assert_eq!(page.to, Some(u64::MAX));
    }

    #[test]
    fn test_paginated_envelope_serializes_nulls() {
        let response: PaginatedResponse<Value> =
            PaginatedResponse::new_at(vec![], 1, 15, 0, "empty", fixed_time());
        let body = serde_json::to_value(&response).unwrap();

        assert_eq!(body["data"], json!([]));
        assert_eq!(body["pagination"]["from"], Value::Null);
        assert_eq!(body["pagination"]["to"], Value::Null);
        assert_eq!(body["pagination"]["last_page"], json!(1));
        assert!(body.get("errors").is_none());
    }
}
