//! HTTP transport implementation.
//!
//! This module provides the blocking HTTPS transport used against the live
//! gateway, built on `reqwest::blocking`.

use reqwest::blocking::{Client, RequestBuilder};
use tracing::{debug, instrument};
use url::Url;

use super::config::HttpConfig;
use crate::{
    error::{PaymentError, Result},
    transport::{Transport, TransportResponse},
};

/// Validates URL for security constraints.
///
/// Ensures the URL uses HTTPS and does not point to localhost.
fn validate_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw)
        .map_err(|e| PaymentError::InvalidInput(format!("invalid gateway URL {raw}: {e}")))?;

    if url.scheme() != "https" {
        return Err(PaymentError::InvalidInput("Only HTTPS URLs are allowed".to_owned()));
    }

    if let Some(host) = url.host_str()
        && (host == "localhost" || host == "127.0.0.1" || host == "::1" || host == "[::1]")
    {
        return Err(PaymentError::InvalidInput("Localhost URLs are not allowed".to_owned()));
    }

    Ok(url)
}

/// Blocking HTTPS transport using reqwest.
///
/// Connection pooling and keep-alive come from the underlying client. The
/// request and connect timeouts are taken from [`HttpConfig`].
///
/// # Examples
///
/// ```rust,no_run
/// use cardlink_vpos::transport::{HttpConfig, HttpTransport, Transport};
///
/// # fn example() -> cardlink_vpos::error::Result<()> {
/// let config = HttpConfig { timeout_secs: 60, ..HttpConfig::default() };
/// let transport = HttpTransport::with_config(&config)?;
///
/// let fields = vec![("version".to_owned(), "2".to_owned())];
/// let response =
///     transport.post_form("https://ecommerce-test.cardlink.gr/vpos/shophandlermpi", &fields)?;
/// println!("Status: {}", response.status);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Creates a new HTTP transport with default settings.
    ///
    /// Default configuration:
    /// - Timeout: 120 seconds
    /// - Connect timeout: 45 seconds
    /// - Pool max idle per host: 10
    ///
    /// # Errors
    ///
    /// Returns error if the TLS backend cannot be initialised.
    pub fn new() -> Result<Self> {
        Self::with_config(&HttpConfig::default())
    }

    /// Creates HTTP transport with custom configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the configuration is out of bounds or HTTP client
    /// creation fails.
    pub fn with_config(config: &HttpConfig) -> Result<Self> {
        config.validate()?;

        let client = Client::builder()
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .timeout(config.timeout())
            .connect_timeout(config.connect_timeout())
            .build()
            .map_err(PaymentError::Http)?;

        Ok(Self { client })
    }

    #[instrument(skip(self, url, request), fields(host = url.host_str().unwrap_or_default()))]
    fn execute(
        &self,
        method: &str,
        url: &Url,
        request: RequestBuilder,
    ) -> Result<TransportResponse> {
        let response = request.send()?;

        let status = response.status();
        let reason = status.canonical_reason().unwrap_or_default().to_owned();

        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or("").to_owned()))
            .collect();

        let body = response.bytes().map_err(PaymentError::Http)?.to_vec();

        debug!(status = status.as_u16(), body_len = body.len(), "gateway responded");

        Ok(TransportResponse { status: status.as_u16(), reason, body, headers })
    }
}

impl Transport for HttpTransport {
    fn post_form(&self, url: &str, fields: &[(String, String)]) -> Result<TransportResponse> {
        let url = validate_url(url)?;
        let request = self.client.post(url.clone()).form(fields);
        self.execute("POST", &url, request)
    }

    fn post_xml(&self, url: &str, body: &str) -> Result<TransportResponse> {
        let url = validate_url(url)?;
        let request = self
            .client
            .post(url.clone())
            .header("Content-Type", "application/xml")
            .body(body.to_owned());
        self.execute("POST", &url, request)
    }

    fn get(&self, url: &str) -> Result<TransportResponse> {
        let url = validate_url(url)?;
        let request = self.client.get(url.clone());
        self.execute("GET", &url, request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_transport_new() {
        let transport = HttpTransport::new();
        assert!(transport.is_ok());
    }

    #[test]
    fn test_http_transport_rejects_invalid_config() {
        let config = HttpConfig { timeout_secs: 0, ..HttpConfig::default() };
        let result = HttpTransport::with_config(&config);
        assert!(matches!(result, Err(PaymentError::Config(_))));
    }

    #[test]
    fn test_validate_url_accepts_https() {
        let url = validate_url("https://ecommerce-test.cardlink.gr/vpos/xmlpayvpos").unwrap();
        assert_eq!(url.host_str(), Some("ecommerce-test.cardlink.gr"));
    }

    #[test]
    fn test_validate_url_rejects_http() {
        let err = validate_url("http://ecommerce-test.cardlink.gr/vpos/xmlpayvpos").unwrap_err();
        assert!(err.to_string().contains("Only HTTPS"));
    }

    #[test]
    fn test_validate_url_rejects_localhost() {
        assert!(validate_url("https://localhost/test").is_err());
        assert!(validate_url("https://127.0.0.1/test").is_err());
        assert!(validate_url("https://[::1]/test").is_err());
    }

    #[test]
    fn test_get_invalid_url_fails_before_network() {
        let transport = HttpTransport::new().unwrap();
        let result = transport.get("not-a-url");
        assert!(matches!(result, Err(PaymentError::InvalidInput(_))));
    }

    #[test]
    fn test_post_form_file_url_rejected() {
        let transport = HttpTransport::new().unwrap();
        let result = transport.post_form("file:///path/to/file", &[]);
        assert!(matches!(result, Err(PaymentError::InvalidInput(_))));
    }
}
