use super::{ContentGateway, GatewayError};
use crate::config::Config;
use crate::util::validate_base_url;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Method;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use std::time::Duration;

const MAX_RESPONSE_SIZE: usize = 10 * 1024 * 1024; // 10MB

/// Tuning knobs for [`HttpGateway`].
#[derive(Debug)]
pub struct GatewayOptions {
    /// Per-attempt timeout covering connect, send and response headers.
    pub timeout: Duration,
    /// Retries after the first attempt for 429/5xx, timeouts and network errors.
    pub max_retries: u32,
    /// First backoff delay; doubles on each retry (1s, 2s, 4s with the default).
    pub retry_base_delay: Duration,
    /// Sent as `Authorization: Bearer <token>` when present.
    pub api_token: Option<SecretString>,
}

impl Default for GatewayOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_retries: 3,
            retry_base_delay: Duration::from_secs(1),
            api_token: None,
        }
    }
}

impl From<&Config> for GatewayOptions {
    fn from(config: &Config) -> Self {
        Self {
            timeout: Duration::from_secs(config.request_timeout_secs.max(1)),
            max_retries: config.max_retries,
            retry_base_delay: Duration::from_secs(1),
            api_token: config.resolved_api_token(),
        }
    }
}

/// [`ContentGateway`] over HTTP: `read` is a GET, `submit` a JSON POST.
///
/// Paths are appended to the validated base URL. Transient failures (429,
/// 5xx, timeouts, connection errors) are retried with exponential backoff;
/// any other non-2xx status fails immediately.
pub struct HttpGateway {
    client: reqwest::Client,
    base_url: String,
    api_token: Option<SecretString>,
    timeout: Duration,
    max_retries: u32,
    retry_base_delay: Duration,
}

impl HttpGateway {
    pub fn new(base_url: &str, options: GatewayOptions) -> Result<Self, GatewayError> {
        let base = validate_base_url(base_url)?;

        let client = reqwest::Client::builder()
            .user_agent(concat!("leadfeed/", env!("CARGO_PKG_VERSION")))
            .redirect(reqwest::redirect::Policy::limited(3))
            .build()?;

        if options.api_token.is_some() {
            tracing::trace!("Content API authentication configured");
        }

        Ok(Self {
            client,
            base_url: base.as_str().trim_end_matches('/').to_string(),
            api_token: options.api_token,
            timeout: options.timeout,
            max_retries: options.max_retries,
            retry_base_delay: options.retry_base_delay,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, GatewayError> {
        Self::new(&config.base_url, GatewayOptions::from(config))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, GatewayError> {
        let url = self.url_for(path);
        let payload = body.map(serde_json::to_vec).transpose()?;
        let mut retry_count = 0;

        loop {
            match self.attempt(&method, &url, payload.as_deref()).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && retry_count < self.max_retries => {
                    let delay = self
                        .retry_base_delay
                        .saturating_mul(2u32.saturating_pow(retry_count));
                    tracing::warn!(
                        %method,
                        url = %url,
                        error = %e,
                        retry = retry_count + 1,
                        delay_ms = delay.as_millis() as u64,
                        "Retrying content API request after transient error"
                    );
                    tokio::time::sleep(delay).await;
                    retry_count += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn attempt(
        &self,
        method: &Method,
        url: &str,
        payload: Option<&[u8]>,
    ) -> Result<Value, GatewayError> {
        let mut request = self
            .client
            .request(method.clone(), url)
            .header(ACCEPT, "application/json");

        if let Some(bytes) = payload {
            request = request
                .header(CONTENT_TYPE, "application/json")
                .body(bytes.to_vec());
        }
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token.expose_secret());
        }

        let response = tokio::time::timeout(self.timeout, request.send())
            .await
            .map_err(|_| GatewayError::Timeout)?
            .map_err(GatewayError::Network)?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!(%method, url = %url, status = status.as_u16(), "Content API returned error status");
            return Err(GatewayError::HttpStatus(status.as_u16()));
        }

        let bytes = read_limited_bytes(response, MAX_RESPONSE_SIZE).await?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }

        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl ContentGateway for HttpGateway {
    async fn read(&self, path: &str) -> Result<Value, GatewayError> {
        self.execute(Method::GET, path, None).await
    }

    async fn submit(&self, path: &str, body: &Value) -> Result<Value, GatewayError> {
        self.execute(Method::POST, path, Some(body)).await
    }
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, GatewayError> {
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(GatewayError::ResponseTooLarge(limit));
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(GatewayError::Network)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(GatewayError::ResponseTooLarge(limit));
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{any, body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fast_options() -> GatewayOptions {
        GatewayOptions {
            timeout: Duration::from_secs(5),
            max_retries: 3,
            retry_base_delay: Duration::from_millis(10),
            api_token: None,
        }
    }

    #[tokio::test]
    async fn test_read_parses_json() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/category/sports"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"category": {"CategoryID": 3, "CategoryName": "Sports"}})),
            )
            .mount(&mock_server)
            .await;

        let gateway =
            HttpGateway::new(&format!("{}/api/", mock_server.uri()), fast_options()).unwrap();
        let value = gateway.read("category/sports").await.unwrap();

        assert_eq!(value["category"]["CategoryID"], 3);
    }

    #[tokio::test]
    async fn test_submit_posts_json_body() {
        let mock_server = MockServer::start().await;
        let body = json!({"top_content_ids": [1, 2], "category_id": 7, "limit": 6, "offset": 0});
        Mock::given(method("POST"))
            .and(path("/inner-category-content-more"))
            .and(header("content-type", "application/json"))
            .and(body_json(&body))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
            .expect(1)
            .mount(&mock_server)
            .await;

        let gateway = HttpGateway::new(&mock_server.uri(), fast_options()).unwrap();
        let value = gateway
            .submit("/inner-category-content-more", &body)
            .await
            .unwrap();

        assert_eq!(value, json!({"data": []}));
    }

    #[tokio::test]
    async fn test_bearer_token_sent() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header("authorization", "Bearer secret-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .expect(1)
            .mount(&mock_server)
            .await;

        let options = GatewayOptions {
            api_token: Some(SecretString::from("secret-token".to_string())),
            ..fast_options()
        };
        let gateway = HttpGateway::new(&mock_server.uri(), options).unwrap();

        assert!(gateway.read("category").await.is_ok());
    }

    #[tokio::test]
    async fn test_404_fails_without_retry() {
        let mock_server = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&mock_server)
            .await;

        let gateway = HttpGateway::new(&mock_server.uri(), fast_options()).unwrap();
        let result = gateway.read("category/missing").await;

        match result {
            Err(GatewayError::HttpStatus(404)) => {}
            other => panic!("Expected HttpStatus(404), got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_500_retries_then_fails() {
        let mock_server = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(500))
            .expect(4) // Initial request + 3 retries
            .mount(&mock_server)
            .await;

        let gateway = HttpGateway::new(&mock_server.uri(), fast_options()).unwrap();
        let result = gateway.submit("archive", &json!({"limit": 12})).await;

        assert!(matches!(result, Err(GatewayError::HttpStatus(500))));
    }

    #[tokio::test]
    async fn test_503_retry_then_success() {
        let mock_server = MockServer::start().await;

        // First two requests return 503, third succeeds
        Mock::given(any())
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .mount(&mock_server)
            .await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": [1]})))
            .mount(&mock_server)
            .await;

        let gateway = HttpGateway::new(&mock_server.uri(), fast_options()).unwrap();
        let value = gateway.read("anything").await.unwrap();

        assert_eq!(value["data"][0], 1);
    }

    #[tokio::test]
    async fn test_timeout() {
        let mock_server = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&mock_server)
            .await;

        let options = GatewayOptions {
            timeout: Duration::from_millis(50),
            max_retries: 0,
            ..fast_options()
        };
        let gateway = HttpGateway::new(&mock_server.uri(), options).unwrap();

        assert!(matches!(
            gateway.read("slow").await,
            Err(GatewayError::Timeout)
        ));
    }

    #[tokio::test]
    async fn test_malformed_json_is_error() {
        let mock_server = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let gateway = HttpGateway::new(&mock_server.uri(), fast_options()).unwrap();

        assert!(matches!(
            gateway.read("category").await,
            Err(GatewayError::Json(_))
        ));
    }

    #[tokio::test]
    async fn test_empty_body_is_null() {
        let mock_server = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(200).set_body_string(""))
            .mount(&mock_server)
            .await;

        let gateway = HttpGateway::new(&mock_server.uri(), fast_options()).unwrap();

        assert_eq!(gateway.read("category").await.unwrap(), Value::Null);
    }

    #[test]
    fn test_insecure_base_url_rejected() {
        let result = HttpGateway::new("http://news.example.com", fast_options());
        assert!(matches!(result, Err(GatewayError::InvalidBaseUrl(_))));
    }

    #[test]
    fn test_path_join() {
        let gateway = HttpGateway::new("https://api.example.com/v1/", fast_options()).unwrap();
        assert_eq!(gateway.base_url(), "https://api.example.com/v1");
        assert_eq!(
            gateway.url_for("/category/news"),
            "https://api.example.com/v1/category/news"
        );
    }
}
