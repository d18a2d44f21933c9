//! HTTP page fetcher for paginated task-list endpoints

use std::time::Duration;

use async_trait::async_trait;
use pagedrain_core::{FetchError, PageFetcher, PageIndex, Record};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, RETRY_AFTER};
use reqwest::{Client, Response, StatusCode, Url};
use serde_json::Value;

use crate::config::{FetcherConfig, FetcherConfigError};

/// Longest response body excerpt kept in a status error
const MAX_ERROR_BODY: usize = 512;

/// Fetches one page per GET request
///
/// Each call builds
/// `{base_url}/team/{collection_id}/task?page={n}&include_closed=..&subtasks=..`
/// (the collection id is percent-encoded as one path segment), sends the token in `Authorization`, and reads the records array named by
/// `items_field`. A missing or null array is an empty page.
#[derive(Debug, Clone)]
pub struct HttpPageFetcher {
    client: Client,
    base_url: Url,
    config: FetcherConfig,
}

impl HttpPageFetcher {
    /// Create a fetcher, validating the config and building the client
    pub fn new(config: FetcherConfig) -> Result<Self, FetcherConfigError> {
        config.validate()?;
        let base_url = Url::parse(&config.base_url)
            .map_err(|_| FetcherConfigError::InvalidUrl(config.base_url.clone()))?;

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| FetcherConfigError::Client(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            config,
        })
    }

    /// Get the configuration
    pub fn config(&self) -> &FetcherConfig {
        &self.config
    }

    /// URL for page `page`
    pub fn page_url(&self, page: PageIndex) -> Url {
        let mut url = self.base_url.clone();
        // `validate` rejects bases that cannot carry a path
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["team", self.config.collection_id.as_str(), "task"]);
        }
        url.query_pairs_mut()
            .clear()
            .append_pair("page", &page.to_string())
            .append_pair("include_closed", &self.config.include_closed.to_string())
            .append_pair("subtasks", &self.config.subtasks.to_string());
        url
    }

    fn transport_error(&self, e: reqwest::Error) -> FetchError {
        if e.is_timeout() {
            FetchError::Timeout(self.config.timeout)
        } else {
            FetchError::Http(e)
        }
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    fn name(&self) -> &str {
        "http"
    }

    async fn fetch(&self, page: PageIndex) -> Result<Vec<Record>, FetchError> {
        let response = self
            .client
            .get(self.page_url(page))
            .header(AUTHORIZATION, self.config.token.as_str())
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(FetchError::RateLimited {
                retry_after: retry_after(&response),
            });
        }

        if !status.is_success() {
            let mut message = response.text().await.unwrap_or_default();
            if message.len() > MAX_ERROR_BODY {
                let cut = (0..=MAX_ERROR_BODY)
                    .rev()
                    .find(|i| message.is_char_boundary(*i))
                    .unwrap_or(0);
                message.truncate(cut);
            }
            return Err(FetchError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.bytes().await.map_err(|e| self.transport_error(e))?;
        let items = decode_items(&body, &self.config.items_field)?;

        tracing::trace!(page = %page, items = items.len(), "Decoded page");
        Ok(items)
    }
}

/// Seconds from a numeric `Retry-After` header
fn retry_after(response: &Response) -> Option<Duration> {
    response
        .headers()
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

/// Extract the records array `field` from a JSON object body
pub fn decode_items(body: &[u8], field: &str) -> Result<Vec<Record>, FetchError> {
    let value: Value =
        serde_json::from_slice(body).map_err(|e| FetchError::Decode(e.to_string()))?;

    let Value::Object(mut object) = value else {
        return Err(FetchError::Decode("expected a JSON object".into()));
    };

    match object.remove(field) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => Ok(items),
        Some(_) => Err(FetchError::Decode(format!("`{}` is not an array", field))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher_for(server: &MockServer) -> HttpPageFetcher {
        HttpPageFetcher::new(FetcherConfig::new("123", "pk_token").with_base_url(server.uri()))
            .expect("valid config")
    }

    #[test]
    fn test_decode_items() {
        let items = decode_items(br#"{"tasks":[{"id":"a"},{"id":"b"}]}"#, "tasks").unwrap();
        assert_eq!(items, vec![json!({"id": "a"}), json!({"id": "b"})]);
    }

    #[test]
    fn test_decode_missing_or_null_field_is_empty() {
        assert!(decode_items(br#"{"other":1}"#, "tasks").unwrap().is_empty());
        assert!(decode_items(br#"{"tasks":null}"#, "tasks").unwrap().is_empty());
        assert!(decode_items(br#"{"tasks":[]}"#, "tasks").unwrap().is_empty());
    }

    #[test]
    fn test_decode_errors() {
        assert!(matches!(
            decode_items(b"not json", "tasks"),
            Err(FetchError::Decode(_))
        ));
        assert!(matches!(
            decode_items(b"[1,2]", "tasks"),
            Err(FetchError::Decode(_))
        ));
        assert!(matches!(
            decode_items(br#"{"tasks":{"id":"a"}}"#, "tasks"),
            Err(FetchError::Decode(_))
        ));
    }

    #[test]
    fn test_page_url() {
        let fetcher = HttpPageFetcher::new(
            FetcherConfig::new("36226098", "tok").with_base_url("https://example.com/api/v2/"),
        )
        .unwrap();
        assert_eq!(
            fetcher.page_url(PageIndex(4)).as_str(),
            "https://example.com/api/v2/team/36226098/task?page=4&include_closed=true&subtasks=true"
        );
    }

    #[test]
    fn test_page_url_encodes_collection_id() {
        let fetcher = HttpPageFetcher::new(
            FetcherConfig::new("a/b?c#d", "tok").with_base_url("https://example.com/api"),
        )
        .unwrap();
        let url = fetcher.page_url(PageIndex(0));

        assert_eq!(url.path(), "/api/team/a%2Fb%3Fc%23d/task");
        let pages: Vec<_> = url.query_pairs().filter(|(k, _)| k == "page").collect();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].1, "0");
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let result = HttpPageFetcher::new(FetcherConfig::new("", "tok"));
        assert_eq!(
            result.unwrap_err(),
            FetcherConfigError::MissingField("collection_id")
        );
    }

    #[tokio::test]
    async fn test_fetch_sends_expected_request() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/team/123/task"))
            .and(query_param("page", "2"))
            .and(query_param("include_closed", "true"))
            .and(query_param("subtasks", "true"))
            .and(header("Authorization", "pk_token"))
            .and(header("Content-Type", "application/json"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"tasks": [{"id": "t1"}]})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let items = fetcher_for(&server).fetch(PageIndex(2)).await.unwrap();
        assert_eq!(items, vec![json!({"id": "t1"})]);
    }

    #[tokio::test]
    async fn test_fetch_empty_page() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"tasks": []})))
            .mount(&server)
            .await;

        let items = fetcher_for(&server).fetch(PageIndex(0)).await.unwrap();
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_429_is_rate_limited() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "30"))
            .mount(&server)
            .await;

        let err = fetcher_for(&server).fetch(PageIndex(0)).await.unwrap_err();
        match err {
            FetchError::RateLimited { retry_after } => {
                assert_eq!(retry_after, Some(Duration::from_secs(30)));
            }
            other => panic!("expected RateLimited, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_fetch_server_error_is_status() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500).set_body_string("internal"))
            .mount(&server)
            .await;

        let err = fetcher_for(&server).fetch(PageIndex(0)).await.unwrap_err();
        match err {
            FetchError::Status { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "internal");
            }
            other => panic!("expected Status, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_fetch_malformed_body_is_decode_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{\"tasks\": [oops"))
            .mount(&server)
            .await;

        let err = fetcher_for(&server).fetch(PageIndex(0)).await.unwrap_err();
        assert!(matches!(err, FetchError::Decode(_)));
    }

    #[tokio::test]
    async fn test_fetch_timeout() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"tasks": [{"id": "late"}]}))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let fetcher = HttpPageFetcher::new(
            FetcherConfig::new("123", "tok")
                .with_base_url(server.uri())
                .with_timeout(Duration::from_millis(100)),
        )
        .unwrap();

        let err = fetcher.fetch(PageIndex(0)).await.unwrap_err();
        assert!(matches!(err, FetchError::Timeout(d) if d == Duration::from_millis(100)));
    }

    #[tokio::test]
    async fn test_fetch_connection_refused_is_http_error() {
        let fetcher = HttpPageFetcher::new(
            FetcherConfig::new("123", "tok").with_base_url("http://127.0.0.1:1"),
        )
        .unwrap();
        let err = fetcher.fetch(PageIndex(0)).await.unwrap_err();
        assert!(matches!(err, FetchError::Http(_)));
    }
}
