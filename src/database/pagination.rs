use serde::{Deserialize, Serialize};

/// One limit/offset page of a listing.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PageContext<T> {
    pub count: i64,
    pub next_offset: Option<i64>,
    pub prev_offset: Option<i64>,
    pub results: Vec<T>,
}

impl<T> PageContext<T> {
    pub fn from_rows(rows: Vec<T>, total_rows: i64, page_size: i64, current_offset: i64) -> Self {
        if rows.is_empty() && current_offset == 0 {
            return Self::no_rows();
        }
        let page_size = page_size.max(1);
        let current_offset = current_offset.max(0);

        let next_offset = match current_offset.checked_add(page_size) {
            Some(next) if next < total_rows => Some(next),
            _ => None,
        };
        let prev_offset = if current_offset > 0 {
            Some((current_offset - page_size).max(0))
        } else {
            None
        };

        Self {
            count: total_rows,
            next_offset,
            prev_offset,
            results: rows,
        }
    }

    pub fn no_rows() -> Self {
        Self {
            count: 0,
            next_offset: None,
            prev_offset: None,
            results: vec![],
        }
    }
}

/// Clamps client supplied paging values.
pub fn clamp_page(limit: Option<i64>, offset: Option<i64>, default_limit: i64) -> (i64, i64) {
    let limit = limit
        .filter(|limit| *limit > 0)
        .unwrap_or(default_limit)
        .min(crate::MAX_COUNT_PER_PAGE);
    let offset = offset.unwrap_or(0).max(0);

    (limit, offset)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_page_links_forward_only() {
        let page = PageContext::from_rows(vec![1, 2], 5, 2, 0);
        assert_eq!(page.count, 5);
        assert_eq!(page.next_offset, Some(2));
        assert_eq!(page.prev_offset, None);
    }

    #[test]
    fn last_page_links_backward_only() {
        let page = PageContext::from_rows(vec![5], 5, 2, 4);
        assert_eq!(page.next_offset, None);
        assert_eq!(page.prev_offset, Some(2));
    }

    #[test]
    fn offset_near_the_integer_limit_has_no_next_page() {
        let page: PageContext<i32> = PageContext::from_rows(vec![], 1, 6, i64::MAX);
        assert_eq!(page.count, 1);
        assert_eq!(page.next_offset, None);
        assert_eq!(page.prev_offset, Some(i64::MAX - 6));
    }

    #[test]
    fn clamp_page_falls_back_to_defaults() {
        assert_eq!(clamp_page(None, None, 6), (6, 0));
        assert_eq!(clamp_page(Some(0), Some(-3), 6), (6, 0));
        assert_eq!(clamp_page(Some(1000), Some(12), 6), (100, 12));
    }
}
