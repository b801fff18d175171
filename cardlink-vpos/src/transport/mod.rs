//! Transport abstraction layer.
//!
//! The gateway is reached over three kinds of blocking request: a URL-encoded
//! form POST (3-D Secure authentication), an `application/xml` POST
//! (settlement) and a plain GET (client-side card-encoding script). The
//! [`Transport`] trait captures exactly those calls so the payment flows can
//! be driven against a recording transport in tests.
//!
//! A transport never interprets status codes. It hands back whatever the
//! remote server answered; deciding that anything other than HTTP 200 is a
//! failure is the caller's job (see [`TransportResponse::ensure_ok`]).
//!
//! # Examples
//!
//! ```rust,no_run
//! use cardlink_vpos::transport::{HttpTransport, Transport};
//!
//! # fn example() -> cardlink_vpos::error::Result<()> {
//! let transport = HttpTransport::new()?;
//! let response = transport.get("https://ecommerce-test.cardlink.gr/vpos/csescript.js")?;
//! println!("Status: {}", response.status);
//! # Ok(())
//! # }
//! ```

use std::fmt::Debug;

use crate::error::{PaymentError, Result};

pub mod config;
pub mod http;

pub use config::HttpConfig;
pub use http::HttpTransport;

/// Response from a transport call.
///
/// Contains the HTTP status line, the raw response body and the response
/// headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    /// HTTP status code.
    pub status: u16,
    /// HTTP reason phrase (may be empty).
    pub reason: String,
    /// Raw response body bytes.
    pub body: Vec<u8>,
    /// Response headers.
    pub headers: Vec<(String, String)>,
}

impl TransportResponse {
    /// Creates a `200 OK` response with the given body and no headers.
    #[must_use]
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self { status: 200, reason: "OK".to_owned(), body: body.into(), headers: Vec::new() }
    }

    /// Returns the body decoded as UTF-8, replacing invalid sequences.
    #[must_use]
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Fails unless the remote server answered HTTP 200.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::Transport`] carrying the remote status and
    /// reason phrase.
    pub fn ensure_ok(&self) -> Result<&Self> {
        if self.status == 200 {
            Ok(self)
        } else {
            Err(PaymentError::Transport { status: self.status, reason: self.reason.clone() })
        }
    }
}

/// Blocking request/response transport.
///
/// Implementations own connection handling and timeouts. Every call is a
/// single attempt; nothing is retried.
///
/// # Security
///
/// [`HttpTransport`] only accepts `https` URLs and refuses loopback hosts.
pub trait Transport: Debug + Send + Sync {
    /// POSTs `fields` as `application/x-www-form-urlencoded`, keeping their
    /// order.
    ///
    /// # Errors
    ///
    /// Returns error if the URL is rejected or the request cannot be completed.
    fn post_form(&self, url: &str, fields: &[(String, String)]) -> Result<TransportResponse>;

    /// POSTs `body` with `Content-Type: application/xml`.
    ///
    /// # Errors
    ///
    /// Returns error if the URL is rejected or the request cannot be completed.
    fn post_xml(&self, url: &str, body: &str) -> Result<TransportResponse>;

    /// Executes a GET request.
    ///
    /// # Errors
    ///
    /// Returns error if the URL is rejected or the request cannot be completed.
    fn get(&self, url: &str) -> Result<TransportResponse>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn post_form(&self, url: &str, fields: &[(String, String)]) -> Result<TransportResponse> {
        (**self).post_form(url, fields)
    }

    fn post_xml(&self, url: &str, body: &str) -> Result<TransportResponse> {
        (**self).post_xml(url, body)
    }

    fn get(&self, url: &str) -> Result<TransportResponse> {
        (**self).get(url)
    }
}
