use serde::{Deserialize, Serialize};

const DEFAULT_PAGE_SIZE: i64 = 20;
const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

impl PageParams {
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn page_size(&self) -> i64 {
        self.page_size
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE)
    }

    pub fn offset(&self) -> i64 {
        (self.page() - 1) * self.page_size()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub count: i64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    /// `base` is the absolute URL of the listing without a query string.
    pub fn new(results: Vec<T>, count: i64, params: &PageParams, base: &str) -> Self {
        let page = params.page();
        let size = params.page_size();
        let link = |p: i64| format!("{}?page={}&page_size={}", base, p, size);

        let next = (page * size < count).then(|| link(page + 1));
        let previous = (page > 1).then(|| link(page - 1));

        Self {
            count,
            next,
            previous,
            results,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_and_clamping() {
        let params = PageParams::default();
        assert_eq!(params.page(), 1);
        assert_eq!(params.page_size(), 20);
        assert_eq!(params.offset(), 0);

        let params = PageParams {
            page: Some(0),
            page_size: Some(1000),
        };
        assert_eq!(params.page(), 1);
        assert_eq!(params.page_size(), 100);
    }

    #[test]
    fn test_links() {
        let params = PageParams {
            page: Some(2),
            page_size: Some(10),
        };
        assert_eq!(params.offset(), 10);

        let page = Page::new(vec![1, 2, 3], 25, &params, "http://localhost:8080/api/x");
        assert_eq!(
            page.next.as_deref(),
            Some("http://localhost:8080/api/x?page=3&page_size=10")
        );
        assert_eq!(
            page.previous.as_deref(),
            Some("http://localhost:8080/api/x?page=1&page_size=10")
        );

        let last = Page::new(
            Vec::<i32>::new(),
            25,
            &PageParams {
                page: Some(3),
                page_size: Some(10),
            },
            "/x",
        );
        assert!(last.next.is_none());
    }
}
