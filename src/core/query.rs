//! Query parameters and pagination utilities

use crate::core::Data;
use crate::core::field::FieldValue;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use uuid::Uuid;

/// Query parameters for pagination and filtering of list endpoints
///
/// # Example
/// ```text
/// GET /clients?page=2&limit=10
/// GET /vehicles?client_id=8f0e...&sort=year:desc
/// GET /devices?status=in_stock
/// GET /clients?q=smith
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QueryParams {
    /// Page number (starts at 1)
    pub page: usize,

    /// Number of items per page
    pub limit: usize,

    /// Sort expression: `field` / `field:asc` / `field:desc`
    pub sort: Option<String>,

    /// Exact status match
    pub status: Option<String>,

    /// Restrict to records owned by a client
    pub client_id: Option<Uuid>,

    /// Case-insensitive substring match on the record name
    pub q: Option<String>,

    /// Include soft-deleted records
    pub include_deleted: bool,
}

impl Default for QueryParams {
    fn default() -> Self {
        Self {
            page: 1,
            limit: 20,
            sort: None,
            status: None,
            client_id: None,
            q: None,
            include_deleted: false,
        }
    }
}

impl QueryParams {
    pub fn page(&self) -> usize {
        self.page.max(1)
    }

    /// Maximum 100 per page, minimum 1
    pub fn limit(&self) -> usize {
        self.limit.clamp(1, 100)
    }

    /// Filter, sort and paginate a full listing
    pub fn apply<T: Data>(&self, items: Vec<T>) -> PaginatedResponse<T> {
        let needle = self.q.as_ref().map(|q| q.to_lowercase());

        let mut filtered: Vec<T> = items
            .into_iter()
            .filter(|e| self.include_deleted || !e.is_deleted())
            .filter(|e| self.status.as_deref().is_none_or(|s| e.status() == s))
            .filter(|e| self.client_id.is_none_or(|id| e.client_id() == Some(id)))
            .filter(|e| {
                needle
                    .as_deref()
                    .is_none_or(|n| e.name().to_lowercase().contains(n))
            })
            .collect();

        if let Some(sort) = &self.sort {
            let (field, descending) = match sort.split_once(':') {
                Some((field, dir)) => (field, dir.eq_ignore_ascii_case("desc")),
                None => (sort.as_str(), false),
            };
            filtered.sort_by(|a, b| {
                let ord = compare_fields(a.field_value(field), b.field_value(field));
                if descending { ord.reverse() } else { ord }
            });
        }

        let page = self.page();
        let limit = self.limit();
        let total = filtered.len();
        let data = filtered
            .into_iter()
            .skip((page - 1) * limit)
            .take(limit)
            .collect();

        PaginatedResponse {
            data,
            pagination: PaginationMeta::new(page, limit, total),
        }
    }
}

fn compare_fields(a: Option<FieldValue>, b: Option<FieldValue>) -> Ordering {
    use FieldValue as F;
    match (a, b) {
        (Some(F::String(a)), Some(F::String(b))) => a.to_lowercase().cmp(&b.to_lowercase()),
        (Some(F::Integer(a)), Some(F::Integer(b))) => a.cmp(&b),
        (Some(F::Decimal(a)), Some(F::Decimal(b))) => a.cmp(&b),
        (Some(F::Boolean(a)), Some(F::Boolean(b))) => a.cmp(&b),
        (Some(F::Date(a)), Some(F::Date(b))) => a.cmp(&b),
        (Some(F::Time(a)), Some(F::Time(b))) => a.cmp(&b),
        (Some(F::DateTime(a)), Some(F::DateTime(b))) => a.cmp(&b),
        (Some(F::Uuid(a)), Some(F::Uuid(b))) => a.cmp(&b),
        // Nulls and missing fields sort last
        (Some(F::Null) | None, Some(F::Null) | None) => Ordering::Equal,
        (Some(F::Null) | None, _) => Ordering::Greater,
        (_, Some(F::Null) | None) => Ordering::Less,
        _ => Ordering::Equal,
    }
}

/// Date range parameters for schedule and payment listings
///
/// Either a `preset` (`today`, `week`, `month`) or explicit `from`/`to`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DateRangeQuery {
    pub preset: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub technician_id: Option<Uuid>,
}

/// Paginated response structure
#[derive(Debug, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub pagination: PaginationMeta,
}

/// Pagination metadata
#[derive(Debug, Serialize, Deserialize)]
pub struct PaginationMeta {
    pub page: usize,
    pub limit: usize,
    /// Total number of items (after filters)
    pub total: usize,
    pub total_pages: usize,
    pub has_next: bool,
    pub has_prev: bool,
}

impl PaginationMeta {
    pub fn new(page: usize, limit: usize, total: usize) -> Self {
        // Ensure limit is at least 1 to avoid division by zero
        let limit = limit.max(1);
        let page = page.max(1);
        let total_pages = if total == 0 { 0 } else { total.div_ceil(limit) };
        let start = (page - 1) * limit;

        Self {
            page,
            limit,
            total,
            total_pages,
            has_next: start + limit < total,
            has_prev: page > 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::lead::{Lead, LeadStatus};

    fn lead(first: &str, last: &str, status: LeadStatus) -> Lead {
        Lead::new(
            format!("{first} {last}"),
            status,
            first.to_string(),
            last.to_string(),
            "6095550100".to_string(),
            None,
            None,
            None,
            None,
        )
    }

    #[test]
    fn test_query_params_defaults() {
        let params = QueryParams::default();
        assert_eq!(params.page(), 1);
        assert_eq!(params.limit(), 20);
    }

    #[test]
    fn test_limit_is_clamped() {
        let params = QueryParams {
            limit: 1000,
            ..Default::default()
        };
        assert_eq!(params.limit(), 100);
    }

    #[test]
    fn test_pagination_meta() {
        let meta = PaginationMeta::new(1, 20, 145);
        assert_eq!(meta.total, 145);
        assert_eq!(meta.total_pages, 8);
        assert!(!meta.has_prev);
        assert!(meta.has_next);
    }

    #[test]
    fn test_apply_filters_status_and_name() {
        let items = vec![
            lead("Ada", "Smith", LeadStatus::New),
            lead("Bob", "Smithers", LeadStatus::Lost),
            lead("Cy", "Jones", LeadStatus::New),
        ];
        let params = QueryParams {
            status: Some("new".to_string()),
            q: Some("SMITH".to_string()),
            ..Default::default()
        };

        let page = params.apply(items);
        assert_eq!(page.pagination.total, 1);
        assert_eq!(page.data[0].first_name, "Ada");
    }

    #[test]
    fn test_apply_sorts_descending_and_hides_deleted() {
        let mut deleted = lead("Zed", "Zulu", LeadStatus::New);
        deleted.soft_delete();
        let items = vec![
            lead("Ada", "Adams", LeadStatus::New),
            deleted,
            lead("Mia", "Moore", LeadStatus::New),
        ];
        let params = QueryParams {
            sort: Some("last_name:desc".to_string()),
            ..Default::default()
        };

        let page = params.apply(items);
        let names: Vec<&str> = page.data.iter().map(|l| l.last_name.as_str()).collect();
        assert_eq!(names, vec!["Moore", "Adams"]);
    }
}
