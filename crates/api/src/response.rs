//! API response types.

use axum::{
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use foodgram_common::config::PaginationConfig;
use foodgram_core::RenderedDocument;
use serde::{Deserialize, Serialize};

/// `page` and `limit` query parameters.
#[derive(Debug, Default, Clone, Copy, Deserialize)]
pub struct PageQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

/// Resolved position of a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    /// 1-based page number
    pub page: u64,
    pub limit: u64,
    pub offset: u64,
}

impl PageQuery {
    /// Apply defaults and bounds from configuration.
    #[must_use]
    pub fn window(self, config: &PaginationConfig) -> PageWindow {
        let limit = self
            .limit
            .unwrap_or(config.default_limit)
            .clamp(1, config.max_limit.max(1));
        let page = self.page.unwrap_or(1).max(1);
        PageWindow {
            page,
            limit,
            offset: (page - 1).saturating_mul(limit),
        }
    }
}

/// Paginated list: `{count, next, previous, results}`.
///
/// `next` and `previous` are page numbers, `null` at either end.
#[derive(Debug, Serialize)]
pub struct Page<T: Serialize> {
    pub count: u64,
    pub next: Option<u64>,
    pub previous: Option<u64>,
    pub results: Vec<T>,
}

impl<T: Serialize> Page<T> {
    /// Build a page of `results` out of `count` items in total.
    #[must_use]
    pub fn new(results: Vec<T>, count: u64, window: PageWindow) -> Self {
        let next = (window.page.saturating_mul(window.limit) < count).then_some(window.page + 1);
        let previous = (window.page > 1).then(|| window.page - 1);
        Self {
            count,
            next,
            previous,
            results,
        }
    }
}

/// Name used in the plain `filename` parameter, which only allows ASCII.
const FALLBACK_FILE_STEM: &str = "shopping_list";

/// A rendered document served as a download.
pub struct Attachment(pub RenderedDocument);

impl Attachment {
    fn disposition(&self) -> String {
        let extension = self
            .0
            .file_name
            .rsplit_once('.')
            .map_or("bin", |(_, ext)| ext);
        format!(
            "attachment; filename=\"{FALLBACK_FILE_STEM}.{extension}\"; filename*=UTF-8''{}",
            urlencoding::encode(&self.0.file_name)
        )
    }
}

impl IntoResponse for Attachment {
    fn into_response(self) -> Response {
        let disposition = self.disposition();
        let Self(document) = self;

        let mut response = (StatusCode::OK, document.bytes).into_response();
        let headers = response.headers_mut();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(document.content_type),
        );
        if let Ok(value) = HeaderValue::from_str(&disposition) {
            headers.insert(header::CONTENT_DISPOSITION, value);
        }
        response
    }
}

/// Empty success response.
#[must_use]
pub fn no_content() -> impl IntoResponse {
    StatusCode::NO_CONTENT
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> PaginationConfig {
        PaginationConfig {
            default_limit: 6,
            max_limit: 100,
        }
    }

    #[test]
    fn test_window_defaults() {
        let window = PageQuery::default().window(&config());
        assert_eq!(
            window,
            PageWindow {
                page: 1,
                limit: 6,
                offset: 0
            }
        );
    }

    #[test]
    fn test_window_clamps_limit_and_page() {
        let window = PageQuery {
            page: Some(0),
            limit: Some(1000),
        }
        .window(&config());
        assert_eq!(window.page, 1);
        assert_eq!(window.limit, 100);

        let window = PageQuery {
            page: Some(3),
            limit: Some(0),
        }
        .window(&config());
        assert_eq!(window.limit, 1);
        assert_eq!(window.offset, 2);
    }

    #[test]
    fn test_page_links() {
        let window = PageQuery {
            page: Some(2),
            limit: Some(6),
        }
        .window(&config());

        let page = Page::new(vec![1, 2, 3, 4, 5, 6], 20, window);
        assert_eq!(page.next, Some(3));
        assert_eq!(page.previous, Some(1));

        let last = Page::new(vec![1, 2], 8, window);
        assert_eq!(last.next, None);
    }

    #[test]
    fn test_first_page_has_no_previous() {
        let window = PageQuery::default().window(&config());
        let page: Page<u8> = Page::new(vec![], 0, window);
        assert_eq!(page.previous, None);
        assert_eq!(page.next, None);
    }

    #[test]
    fn test_attachment_headers() {
        let response = Attachment(RenderedDocument {
            content_type: "text/plain; charset=utf-8",
            file_name: "Список покупок. Автор Иван.txt".to_string(),
            bytes: b"hello".to_vec(),
        })
        .into_response();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/plain; charset=utf-8"
        );
        let disposition = response.headers()[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap();
        assert!(disposition.starts_with("attachment; filename=\"shopping_list.txt\""));
        assert!(disposition.contains("filename*=UTF-8''%D0%A1%D0%BF"));
    }
}
