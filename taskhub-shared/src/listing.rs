/// Filter/sort/paginate building blocks shared by every listing endpoint
///
/// All three resources (projects, tasks, users) expose the same listing
/// contract: optional substring/equality filters, a sort key checked against
/// a per-resource allow-list, and fixed-size pages wrapped in a metadata
/// envelope with a one-page link window on each side of the current page.
///
/// Filters apply only when the parameter is present AND non-empty: an absent
/// or empty-string parameter means "no filter", never "empty-string filter".
///
/// Sort keys never reach the query layer as raw strings. Each resource
/// defines a [`SortField`] enum mapping external keys to column identifiers;
/// unknown keys or directions are rejected as an [`InvalidParam`] before any
/// SQL is built.

use serde::{Deserialize, Serialize};

use crate::models::status::Status;

/// Fixed page size for all listings.
pub const PER_PAGE: i64 = 10;

/// Number of numbered page links on each side of the current page.
pub const ON_EACH_SIDE: u32 = 1;

/// A listing parameter that failed validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct InvalidParam {
    /// Query parameter name
    pub field: &'static str,

    /// Human-readable rejection reason
    pub message: String,
}

/// Sort direction, `desc` by default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "asc" => Some(SortDirection::Asc),
            "desc" => Some(SortDirection::Desc),
            _ => None,
        }
    }

    /// SQL keyword for this direction.
    pub fn as_sql(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

/// A resource's allow-listed sort keys.
///
/// `parse` maps the external query-string key to a variant; `column` maps the
/// variant to the column identifier interpolated into ORDER BY. Only `column`
/// output ever reaches the SQL text, so the allow-list is also the
/// injection boundary.
pub trait SortField: Copy + Default {
    fn parse(key: &str) -> Option<Self>;

    fn column(self) -> &'static str;
}

/// A validated (field, direction) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sort<F> {
    pub field: F,
    pub direction: SortDirection,
}

impl<F: SortField> Sort<F> {
    /// ORDER BY clause body, e.g. `created_at DESC`.
    pub fn order_by(&self) -> String {
        format!("{} {}", self.field.column(), self.direction.as_sql())
    }
}

impl<F: SortField> Default for Sort<F> {
    fn default() -> Self {
        Self {
            field: F::default(),
            direction: SortDirection::default(),
        }
    }
}

/// Raw, untrusted listing parameters as they arrive on the query string.
///
/// Also serialized back into listing responses so clients can echo the
/// parameters into pagination links.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_field: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_direction: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

impl ListParams {
    /// Name substring filter, when present and non-empty.
    pub fn name(&self) -> Option<&str> {
        non_empty(&self.name)
    }

    /// Email substring filter, when present and non-empty.
    pub fn email(&self) -> Option<&str> {
        non_empty(&self.email)
    }

    /// Exact status filter, when present and non-empty.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidParam`] when the value is not one of the known
    /// status names.
    pub fn status(&self) -> Result<Option<Status>, InvalidParam> {
        match non_empty(&self.status) {
            None => Ok(None),
            Some(s) => Status::parse(s).map(Some).ok_or_else(|| InvalidParam {
                field: "status",
                message: format!("unknown status \"{}\"", s),
            }),
        }
    }

    /// Validated sort for a resource's allow-list `F`.
    ///
    /// Missing field/direction fall back to the defaults (creation time,
    /// descending). Unknown values are rejected, never forwarded to SQL.
    pub fn sort<F: SortField>(&self) -> Result<Sort<F>, InvalidParam> {
        let field = match non_empty(&self.sort_field) {
            None => F::default(),
            Some(key) => F::parse(key).ok_or_else(|| InvalidParam {
                field: "sort_field",
                message: format!("unsortable field \"{}\"", key),
            })?,
        };

        let direction = match non_empty(&self.sort_direction) {
            None => SortDirection::default(),
            Some(dir) => SortDirection::parse(dir).ok_or_else(|| InvalidParam {
                field: "sort_direction",
                message: format!("unknown sort direction \"{}\"", dir),
            })?,
        };

        Ok(Sort { field, direction })
    }

    /// Requested page number, clamped to at least 1.
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }
}

/// OFFSET for a 1-based page number.
pub fn offset(page: u32) -> i64 {
    (i64::from(page) - 1) * PER_PAGE
}

fn last_page(total: i64) -> u32 {
    let pages = (total + PER_PAGE - 1) / PER_PAGE;
    pages.max(1) as u32
}

/// Numbered link window: first and last page, plus `on_each_side` neighbors
/// around the current page. Gaps show up as non-consecutive numbers.
pub fn link_window(current: u32, last: u32, on_each_side: u32) -> Vec<u32> {
    let mut pages = vec![1, last];
    let lo = current.saturating_sub(on_each_side).max(1);
    let hi = current.saturating_add(on_each_side).min(last);
    pages.extend(lo..=hi);
    pages.sort_unstable();
    pages.dedup();
    pages
}

/// Pagination counters for one page of results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMeta {
    pub current_page: u32,
    pub per_page: u32,
    pub total: i64,
    pub last_page: u32,

    /// 1-based index of the first row on this page, None when empty
    pub from: Option<i64>,

    /// 1-based index of the last row on this page, None when empty
    pub to: Option<i64>,
}

/// Neighbor navigation plus the numbered link window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageLinks {
    pub prev: Option<u32>,
    pub next: Option<u32>,
    pub pages: Vec<u32>,
}

/// One page of rows with its pagination envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub meta: PageMeta,
    pub links: PageLinks,
}

impl<T> Page<T> {
    /// Wraps one page of rows fetched with [`offset`]`(current_page)` given
    /// the unpaginated total.
    pub fn new(data: Vec<T>, current_page: u32, total: i64) -> Self {
        let last = last_page(total);
        let (from, to) = if data.is_empty() {
            (None, None)
        } else {
            let first = offset(current_page) + 1;
            (Some(first), Some(first + data.len() as i64 - 1))
        };

        Self {
            meta: PageMeta {
                current_page,
                per_page: PER_PAGE as u32,
                total,
                last_page: last,
                from,
                to,
            },
            links: PageLinks {
                prev: (current_page > 1).then(|| current_page - 1),
                next: (current_page < last).then(|| current_page + 1),
                pages: link_window(current_page, last, ON_EACH_SIDE),
            },
            data,
        }
    }

    /// Maps the rows while keeping the envelope, for model-to-response
    /// conversion in handlers.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            data: self.data.into_iter().map(f).collect(),
            meta: self.meta,
            links: self.links,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::project::ProjectSortField;

    fn params(pairs: &[(&str, &str)]) -> ListParams {
        let mut p = ListParams::default();
        for (k, v) in pairs {
            let v = Some(v.to_string());
            match *k {
                "name" => p.name = v,
                "status" => p.status = v,
                "email" => p.email = v,
                "sort_field" => p.sort_field = v,
                "sort_direction" => p.sort_direction = v,
                _ => panic!("unknown key {}", k),
            }
        }
        p
    }

    #[test]
    fn test_absent_and_empty_filters_are_equivalent() {
        assert_eq!(ListParams::default().name(), None);
        assert_eq!(params(&[("name", "")]).name(), None);
        assert_eq!(params(&[("name", "Launch")]).name(), Some("Launch"));

        assert_eq!(ListParams::default().status().unwrap(), None);
        assert_eq!(params(&[("status", "")]).status().unwrap(), None);
    }

    #[test]
    fn test_status_filter_rejects_unknown_values() {
        assert_eq!(
            params(&[("status", "pending")]).status().unwrap(),
            Some(Status::Pending)
        );
        let err = params(&[("status", "archived")]).status().unwrap_err();
        assert_eq!(err.field, "status");
    }

    #[test]
    fn test_sort_defaults_to_created_at_desc() {
        let sort: Sort<ProjectSortField> = ListParams::default().sort().unwrap();
        assert_eq!(sort.order_by(), "created_at DESC");
    }

    #[test]
    fn test_sort_rejects_unknown_field_and_direction() {
        let err = params(&[("sort_field", "password_hash")])
            .sort::<ProjectSortField>()
            .unwrap_err();
        assert_eq!(err.field, "sort_field");

        let err = params(&[("sort_direction", "sideways")])
            .sort::<ProjectSortField>()
            .unwrap_err();
        assert_eq!(err.field, "sort_direction");
    }

    #[test]
    fn test_sort_direction_round_trip() {
        let sort: Sort<ProjectSortField> =
            params(&[("sort_field", "name"), ("sort_direction", "asc")])
                .sort()
                .unwrap();
        let toggled_twice = sort.direction.toggled().toggled();
        assert_eq!(sort.direction, toggled_twice);
    }

    #[test]
    fn test_page_defaults_and_clamping() {
        assert_eq!(ListParams::default().page(), 1);
        let mut p = ListParams::default();
        p.page = Some(0);
        assert_eq!(p.page(), 1);
        p.page = Some(7);
        assert_eq!(p.page(), 7);
    }

    #[test]
    fn test_offset() {
        assert_eq!(offset(1), 0);
        assert_eq!(offset(2), 10);
        assert_eq!(offset(5), 40);
    }

    #[test]
    fn test_link_window_middle() {
        // current 5 of 9: {1} ∪ {4,5,6} ∪ {9}
        assert_eq!(link_window(5, 9, 1), vec![1, 4, 5, 6, 9]);
    }

    #[test]
    fn test_link_window_edges() {
        assert_eq!(link_window(1, 1, 1), vec![1]);
        assert_eq!(link_window(1, 4, 1), vec![1, 2, 4]);
        assert_eq!(link_window(4, 4, 1), vec![1, 3, 4]);
        assert_eq!(link_window(2, 3, 1), vec![1, 2, 3]);
    }

    #[test]
    fn test_page_meta_counts() {
        let rows: Vec<u32> = (0..10).collect();
        let page = Page::new(rows, 2, 35);
        assert_eq!(page.meta.last_page, 4);
        assert_eq!(page.meta.from, Some(11));
        assert_eq!(page.meta.to, Some(20));
        assert_eq!(page.links.prev, Some(1));
        assert_eq!(page.links.next, Some(3));
        assert_eq!(page.links.pages, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_page_meta_empty() {
        let page: Page<u32> = Page::new(Vec::new(), 1, 0);
        assert_eq!(page.meta.last_page, 1);
        assert_eq!(page.meta.from, None);
        assert_eq!(page.meta.to, None);
        assert_eq!(page.links.prev, None);
        assert_eq!(page.links.next, None);
        assert_eq!(page.links.pages, vec![1]);
    }

    #[test]
    fn test_page_map_keeps_envelope() {
        let page = Page::new(vec![1, 2, 3], 1, 3).map(|n| n * 10);
        assert_eq!(page.data, vec![10, 20, 30]);
        assert_eq!(page.meta.total, 3);
    }
}
