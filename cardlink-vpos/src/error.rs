//! Error types for the VPOS merchant client.
//!
//! This module defines all error types that can occur while talking to the
//! gateway. All errors implement the standard [`std::error::Error`] trait via
//! [`thiserror::Error`].
//!
//! # Error Categories
//!
//! - **Transport Errors** ([`PaymentError::Transport`], [`PaymentError::Http`]): a remote
//!   call did not return HTTP 200 or never completed
//! - **Protocol Errors** ([`PaymentError::ProtocolRejection`]): the gateway answered with a
//!   status outside the accepted set
//! - **Authenticity Errors** ([`PaymentError::InvalidSignature`],
//!   [`PaymentError::InvalidDigest`]): a signature or digest check failed
//! - **Configuration Errors** ([`PaymentError::InvalidKeyMaterial`],
//!   [`PaymentError::Config`]): malformed merchant setup, fatal at startup
//!
//! No variant is ever retried inside the crate. Every failure is handed back
//! to the immediate caller, which can turn it into a structured
//! `(status code, message)` pair with [`PaymentError::status_code`] and
//! `to_string()`.
//!
//! # Examples
//!
//! ```
//! use cardlink_vpos::error::{PaymentError, Result};
//!
//! fn accepted_md_status(md_status: &str) -> Result<()> {
//!     if md_status != "1" && md_status != "4" {
//!         return Err(PaymentError::ProtocolRejection {
//!             status: md_status.to_owned(),
//!             message: "authentication not completed".to_owned(),
//!         });
//!     }
//!     Ok(())
//! }
//!
//! let err = accepted_md_status("0").unwrap_err();
//! assert_eq!(err.status_code(), 400);
//! ```

use thiserror::Error;

/// Result type alias for gateway operations.
///
/// All fallible functions in this crate return this type.
pub type Result<T> = std::result::Result<T, PaymentError>;

/// Errors that can occur while processing a payment.
///
/// The error messages are designed to be shown to operators and logged as-is;
/// they never contain card data or key material.
///
/// # Error Recovery
///
/// - **Transport errors** ([`Transport`](Self::Transport), [`Http`](Self::Http)): the
///   transaction outcome is unknown to this crate; reconcile with the gateway before
///   charging again
/// - **Protocol and authenticity errors**: terminal for the transaction
/// - **Configuration errors**: fix the merchant configuration and restart
#[must_use = "errors should be handled, propagated, or explicitly panicked"]
#[derive(Debug, Error)]
pub enum PaymentError {
    /// A remote call returned a status other than HTTP 200.
    ///
    /// The remote status code and reason phrase are surfaced unchanged.
    #[error("gateway returned HTTP {status}: {reason}")]
    Transport {
        /// HTTP status code returned by the remote server.
        status: u16,
        /// HTTP reason phrase returned by the remote server.
        reason: String,
    },

    /// HTTP request could not be completed.
    ///
    /// This error wraps [`reqwest::Error`] and covers connection refusals, DNS
    /// failures, TLS errors and the connect/read timeouts configured in
    /// [`HttpConfig`](crate::transport::HttpConfig).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The gateway rejected the transaction.
    ///
    /// Raised when the authentication server reports an `mdStatus` outside the
    /// accepted set, or when a caller asks a declined settlement or redirect
    /// result to be turned into an error.
    #[error("transaction rejected with status {status}: {message}")]
    ProtocolRejection {
        /// Raw status reported by the gateway.
        status: String,
        /// Gateway-provided explanation, possibly empty.
        message: String,
    },

    /// The authentication server response failed RSA-SHA256 verification.
    #[error("Invalid signature")]
    InvalidSignature,

    /// A redirect-flow callback digest did not match the recomputed digest.
    #[error("Invalid digest")]
    InvalidDigest,

    /// The private key or processor certificate could not be loaded.
    ///
    /// # Recovery
    ///
    /// Provide a PKCS#8 `PRIVATE KEY` (or PKCS#1 `RSA PRIVATE KEY`) and an X.509
    /// `CERTIFICATE` (or `PUBLIC KEY`), either PEM-wrapped or as raw base64.
    #[error("invalid key material: {0}")]
    InvalidKeyMaterial(String),

    /// Merchant configuration is invalid.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Caller-supplied transaction data is invalid.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The merchant data envelope could not be encoded, decoded or found.
    #[error("invalid merchant data envelope: {0}")]
    Envelope(String),

    /// The envelope store failed.
    #[error("envelope store failure: {0}")]
    Store(String),

    /// The gateway response could not be interpreted.
    #[error("malformed gateway response: {0}")]
    MalformedResponse(String),

    /// Building the settlement XML document failed.
    #[error("XML encoding failed: {0}")]
    Xml(String),
}

impl PaymentError {
    /// Returns the structured status code reported to the caller.
    ///
    /// Transport failures carry the remote status; protocol, authenticity and
    /// input failures map to 400; configuration and local failures to 500.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Transport { status, .. } => *status,
            Self::Http(e) => e.status().map_or(502, |s| s.as_u16()),
            Self::ProtocolRejection { .. }
            | Self::InvalidSignature
            | Self::InvalidDigest
            | Self::InvalidInput(_)
            | Self::Envelope(_)
            | Self::MalformedResponse(_) => 400,
            Self::InvalidKeyMaterial(_) | Self::Config(_) | Self::Store(_) | Self::Xml(_) => 500,
        }
    }

    /// Returns `true` when the failure means the gateway refused or could not
    /// prove the authenticity of the transaction.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::ProtocolRejection { .. } | Self::InvalidSignature | Self::InvalidDigest
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_error_display() {
        let error = PaymentError::Transport { status: 503, reason: "Service Unavailable".into() };
        assert_eq!(error.to_string(), "gateway returned HTTP 503: Service Unavailable");
        assert_eq!(error.status_code(), 503);
    }

    #[test]
    fn test_invalid_signature_message() {
        let error = PaymentError::InvalidSignature;
        assert_eq!(error.to_string(), "Invalid signature");
        assert_eq!(error.status_code(), 400);
        assert!(error.is_terminal());
    }

    #[test]
    fn test_invalid_digest_message() {
        let error = PaymentError::InvalidDigest;
        assert_eq!(error.to_string(), "Invalid digest");
        assert!(error.is_terminal());
    }

    #[test]
    fn test_protocol_rejection_keeps_raw_status() {
        let error = PaymentError::ProtocolRejection {
            status: "2".to_owned(),
            message: "Not enrolled".to_owned(),
        };
        assert_eq!(error.to_string(), "transaction rejected with status 2: Not enrolled");
        assert_eq!(error.status_code(), 400);
    }

    #[test]
    fn test_configuration_errors_are_not_terminal() {
        let error = PaymentError::InvalidKeyMaterial("unrecognised PEM label".to_owned());
        assert_eq!(error.status_code(), 500);
        assert!(!error.is_terminal());
    }
}
