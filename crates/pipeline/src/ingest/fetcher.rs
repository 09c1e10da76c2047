//! Page fetcher: paginated retrieval from the upstream source.
//!
//! [`PageSource`] is the seam between the run loop and the network.
//! [`HttpPageFetcher`] is the production implementation; [`PageCursor`] turns
//! any source into a lazy sequence of batches that ends at the first empty
//! page.

use std::future::Future;

use serde::Deserialize;
use serde_json::Value;
use tracing::instrument;
use url::Url;

use customer_sync_core::Page;

use super::error::{FetchError, IngestError};
use crate::config::IngestConfig;

/// Path of the upstream list endpoint, relative to the upstream base URL.
const LIST_PATH: &str = "api/customers";

/// The part of an upstream list body the fetcher reads.
///
/// `total`, `page` and `limit` are not needed to walk the pages and are
/// ignored whatever their shape. A missing or `null` `data` is an empty page.
#[derive(Debug, Deserialize)]
struct ListBody {
    #[serde(default)]
    data: Option<Vec<Value>>,
}

/// Something that can produce one page of upstream records.
pub trait PageSource: Send + Sync {
    /// Fetch page `page` (1-based) of size `limit`.
    fn fetch(&self, page: u32, limit: u32) -> impl Future<Output = Result<Page, FetchError>> + Send;
}

/// Fetches pages from the upstream list endpoint over HTTP.
///
/// Failures are not retried; they are reported to the run, which rolls back.
#[derive(Debug, Clone)]
pub struct HttpPageFetcher {
    client: reqwest::Client,
    endpoint: Url,
    timeout: std::time::Duration,
}

impl HttpPageFetcher {
    /// Create a fetcher for the upstream configured in `config`.
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Client` if the HTTP client cannot be built.
    pub fn new(config: &IngestConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(config.fetch_timeout)
            .build()
            .map_err(FetchError::Client)?;

        Ok(Self {
            client,
            endpoint: list_endpoint(&config.upstream_url),
            timeout: config.fetch_timeout,
        })
    }

    /// The list endpoint pages are requested from.
    #[must_use]
    pub const fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn page_url(&self, page: u32, limit: u32) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("page", &page.to_string())
            .append_pair("limit", &limit.to_string());
        url
    }
}

impl PageSource for HttpPageFetcher {
    #[instrument(skip(self), fields(endpoint = %self.endpoint))]
    async fn fetch(&self, page: u32, limit: u32) -> Result<Page, FetchError> {
        tracing::debug!("Fetching page {page} with limit {limit}");

        let response = self
            .client
            .get(self.page_url(page, limit))
            .send()
            .await
            .map_err(|source| {
                if source.is_timeout() {
                    FetchError::Timeout {
                        page,
                        timeout: self.timeout,
                    }
                } else {
                    FetchError::Request { page, source }
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                page,
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(|source| {
            if source.is_timeout() {
                FetchError::Timeout {
                    page,
                    timeout: self.timeout,
                }
            } else {
                FetchError::Request { page, source }
            }
        })?;

        let body: ListBody =
            serde_json::from_slice(&body).map_err(|e| FetchError::InvalidBody {
                page,
                message: e.to_string(),
            })?;

        Ok(Page::from_values(page, limit, body.data.unwrap_or_default()))
    }
}

/// Resolve the list endpoint against the upstream base URL.
///
/// A base with a path prefix (`http://gw/upstream`) keeps the prefix.
fn list_endpoint(base: &Url) -> Url {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.set_query(None);
    base.join(LIST_PATH).unwrap_or(base)
}

/// A lazy sequence of upstream batches.
///
/// Starts at page 1 and advances by one after every non-empty batch. The first
/// empty batch ends the sequence. More than `max_pages` non-empty batches is an
/// error rather than an endless loop, and so is running out of page numbers.
pub struct PageCursor<'a, P> {
    source: &'a P,
    /// `None` once `u32::MAX` has been yielded.
    next_page: Option<u32>,
    limit: u32,
    max_pages: u32,
    yielded: u32,
    finished: bool,
}

impl<'a, P: PageSource> PageCursor<'a, P> {
    /// Create a cursor positioned before page 1.
    #[must_use]
    pub const fn new(source: &'a P, limit: u32, max_pages: u32) -> Self {
        Self {
            source,
            next_page: Some(1),
            limit,
            max_pages,
            yielded: 0,
            finished: false,
        }
    }

    /// Fetch the next non-empty batch, or `None` once the source is exhausted.
    ///
    /// # Errors
    ///
    /// Returns `IngestError::UpstreamUnavailable` if the fetch fails and
    /// `IngestError::PageLimitExceeded` if the source is still returning
    /// records past `max_pages`.
    pub async fn next_batch(&mut self) -> Result<Option<Page>, IngestError> {
        if self.finished {
            return Ok(None);
        }

        let Some(number) = self.next_page else {
            self.finished = true;
            return Err(IngestError::PageLimitExceeded {
                max_pages: self.max_pages,
            });
        };

        let page = self.source.fetch(number, self.limit).await?;

        if page.is_empty() {
            tracing::info!("No more data received from upstream");
            self.finished = true;
            return Ok(None);
        }

        if number > self.max_pages {
            self.finished = true;
            return Err(IngestError::PageLimitExceeded {
                max_pages: self.max_pages,
            });
        }

        self.next_page = number.checked_add(1);
        self.yielded += 1;
        Ok(Some(page))
    }

    /// Number of non-empty batches yielded so far.
    #[must_use]
    pub const fn pages_yielded(&self) -> u32 {
        self.yielded
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use customer_sync_core::IncomingRecord;

    use super::*;

    fn fetcher_for(server: &MockServer) -> HttpPageFetcher {
        let config = IngestConfig::new(Url::parse(&server.uri()).unwrap());
        HttpPageFetcher::new(&config).unwrap()
    }

    #[test]
    fn test_list_endpoint_resolution() {
        let plain = list_endpoint(&Url::parse("http://mock:5000").unwrap());
        assert_eq!(plain.as_str(), "http://mock:5000/api/customers");

        let prefixed = list_endpoint(&Url::parse("http://gw/upstream").unwrap());
        assert_eq!(prefixed.as_str(), "http://gw/upstream/api/customers");

        let trailing = list_endpoint(&Url::parse("http://gw/upstream/?x=1").unwrap());
        assert_eq!(trailing.as_str(), "http://gw/upstream/api/customers");
    }

    #[tokio::test]
    async fn test_fetch_sends_page_and_limit() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/customers"))
            .and(query_param("page", "2"))
            .and(query_param("limit", "10"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [
                    {"customer_id": "C11", "first_name": "Kim", "last_name": "Ng", "email": "k@x.com"}
                ],
                "total": 11,
                "page": 2,
                "limit": 10
            })))
            .expect(1)
            .mount(&server)
            .await;

        let page = fetcher_for(&server).fetch(2, 10).await.unwrap();
        assert_eq!(page.page, 2);
        assert_eq!(page.len(), 1);
        assert_eq!(page.records[0].customer_id(), Some("C11"));
    }

    #[tokio::test]
    async fn test_fetch_keeps_malformed_elements() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/customers"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{"customer_id": "C1"}, {"first_name": "no id"}],
                "total": 2, "page": 1, "limit": 10
            })))
            .mount(&server)
            .await;

        let page = fetcher_for(&server).fetch(1, 10).await.unwrap();
        assert_eq!(page.len(), 2);
        assert!(matches!(page.records[1], IncomingRecord::Malformed { .. }));
    }

    #[tokio::test]
    async fn test_fetch_ignores_odd_metadata() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/customers"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{"customer_id": "C1"}],
                "total": null,
                "page": "1",
                "limit": 10.0
            })))
            .mount(&server)
            .await;

        let page = fetcher_for(&server).fetch(1, 10).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page.records[0].customer_id(), Some("C1"));
    }

    #[tokio::test]
    async fn test_fetch_null_data_is_empty_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/customers"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": null,
                "total": 25,
                "page": 3,
                "limit": 10
            })))
            .mount(&server)
            .await;

        let page = fetcher_for(&server).fetch(3, 10).await.unwrap();
        assert!(page.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_non_success_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = fetcher_for(&server).fetch(1, 10).await.unwrap_err();
        assert!(matches!(err, FetchError::Status { page: 1, status: 503 }));
    }

    #[tokio::test]
    async fn test_fetch_invalid_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let err = fetcher_for(&server).fetch(1, 10).await.unwrap_err();
        assert!(matches!(err, FetchError::InvalidBody { page: 1, .. }));
    }

    #[tokio::test]
    async fn test_fetch_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"data": []}))
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let mut config = IngestConfig::new(Url::parse(&server.uri()).unwrap());
        config.fetch_timeout = Duration::from_millis(200);
        let fetcher = HttpPageFetcher::new(&config).unwrap();

        let err = fetcher.fetch(1, 10).await.unwrap_err();
        assert!(matches!(err, FetchError::Timeout { page: 1, .. }));
    }

    /// Returns `sizes[page - 1]` records for each page, then empty pages.
    struct SizedPages(Vec<usize>);

    impl PageSource for SizedPages {
        async fn fetch(&self, page: u32, limit: u32) -> Result<Page, FetchError> {
            let size = self
                .0
                .get(usize::try_from(page).unwrap() - 1)
                .copied()
                .unwrap_or(0);
            let values = (0..size)
                .map(|i| json!({"customer_id": format!("P{page}-{i}")}))
                .collect();
            Ok(Page::from_values(page, limit, values))
        }
    }

    #[tokio::test]
    async fn test_cursor_stops_at_first_empty_page() {
        let source = SizedPages(vec![10, 10, 5, 0, 7]);
        let mut cursor = PageCursor::new(&source, 10, 100);

        let mut pages = Vec::new();
        while let Some(page) = cursor.next_batch().await.unwrap() {
            pages.push(page.page);
        }

        assert_eq!(pages, vec![1, 2, 3]);
        assert_eq!(cursor.pages_yielded(), 3);
        // Stays finished
        assert!(cursor.next_batch().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cursor_enforces_max_pages() {
        let source = SizedPages(vec![1, 1, 1]);
        let mut cursor = PageCursor::new(&source, 10, 2);

        assert!(cursor.next_batch().await.unwrap().is_some());
        assert!(cursor.next_batch().await.unwrap().is_some());
        let err = cursor.next_batch().await.unwrap_err();
        assert!(matches!(err, IngestError::PageLimitExceeded { max_pages: 2 }));
        assert_eq!(cursor.pages_yielded(), 2);
    }

    /// Never runs out of records.
    struct Endless;

    impl PageSource for Endless {
        async fn fetch(&self, page: u32, limit: u32) -> Result<Page, FetchError> {
            Ok(Page::from_values(
                page,
                limit,
                vec![json!({"customer_id": format!("P{page}")})],
            ))
        }
    }

    #[tokio::test]
    async fn test_cursor_stops_when_page_numbers_run_out() {
        let source = Endless;
        let mut cursor = PageCursor {
            source: &source,
            next_page: Some(u32::MAX),
            limit: 10,
            max_pages: u32::MAX,
            yielded: 0,
            finished: false,
        };

        let last = cursor.next_batch().await.unwrap().unwrap();
        assert_eq!(last.page, u32::MAX);

        let err = cursor.next_batch().await.unwrap_err();
        assert!(matches!(
            err,
            IngestError::PageLimitExceeded {
                max_pages: u32::MAX
            }
        ));
        assert!(cursor.next_batch().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_fetch_connection_refused() {
        let server = MockServer::start().await;
        let fetcher = fetcher_for(&server);
        drop(server);

        let err = fetcher.fetch(1, 10).await.unwrap_err();
        assert!(matches!(
            err,
            FetchError::Request { page: 1, .. } | FetchError::Timeout { page: 1, .. }
        ));
    }
}
