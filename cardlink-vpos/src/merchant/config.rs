//! Merchant configuration types.
//!
//! This module defines the TOML-deserializable configuration of a merchant
//! account: credentials, payment options, callback routes and transport
//! settings. Configuration is parsed and validated once and never mutated.
//!
//! ```toml
//! [merchant]
//! merchant_id = "0020000000"
//! shared_secret = "Cardlink1"
//! private_key = "MIIEvQIBADANBgkqhkiG9w0BAQEFAASC..."
//! processor_certificate = "-----BEGIN CERTIFICATE-----\n..."
//! dias_customer_code = "12345"
//!
//! [payment]
//! acquirer = "nexi"
//! environment = "production"
//! capture_mode = "authorize"
//! timezone = "Europe/Athens"
//!
//! [routes]
//! card_success_url = "https://shop.example.com/vpos/success"
//! card_failure_url = "https://shop.example.com/vpos/failure"
//! ```

use std::{fmt, path::Path};

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use url::Url;
use zeroize::Zeroize;

use crate::{
    card::CardBrand,
    error::{PaymentError, Result},
    merchant::endpoint::{Acquirer, Environment},
    transport::HttpConfig,
};

/// Upper bound on installments accepted by the gateway.
pub const MAX_INSTALLMENTS: u32 = 60;

/// Root merchant configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MerchantConfig {
    /// Merchant account and key material.
    pub merchant: MerchantSection,

    /// Payment options.
    #[serde(default)]
    pub payment: PaymentSettings,

    /// Merchant-side callback routes.
    #[serde(default)]
    pub routes: RouteSettings,

    /// HTTP transport settings.
    #[serde(default)]
    pub transport: HttpConfig,
}

impl MerchantConfig {
    /// Parses and validates configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::Config`] if the TOML is malformed or fails
    /// validation.
    ///
    /// # Examples
    ///
    /// ```
    /// use cardlink_vpos::merchant::MerchantConfig;
    ///
    /// let config = MerchantConfig::from_toml(
    ///     r#"
    ///     [merchant]
    ///     merchant_id = "0020000000"
    ///     shared_secret = "Cardlink1"
    ///     "#,
    /// )
    /// .unwrap();
    /// assert_eq!(config.payment.currency, "EUR");
    /// ```
    pub fn from_toml(input: &str) -> Result<Self> {
        let config: Self = toml::from_str(input)
            .map_err(|e| PaymentError::Config(format!("invalid configuration TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::Config`] if the file cannot be read or is invalid.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let input = std::fs::read_to_string(path).map_err(|e| {
            PaymentError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml(&input)
    }

    /// Validates every section.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::Config`] describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        self.merchant.validate()?;
        self.payment.validate()?;
        self.routes.validate()?;
        self.transport.validate()
    }
}

/// Merchant account credentials as configured.
///
/// Key material may be given as full PEM or bare base64. Secrets are wiped
/// from memory when the section is dropped.
#[derive(Clone, Deserialize)]
pub struct MerchantSection {
    /// Merchant identifier assigned by the acquirer.
    pub merchant_id: String,

    /// Shared secret for digest-protected messages.
    pub shared_secret: String,

    /// Merchant RSA private key (PKCS#8).
    #[serde(default)]
    pub private_key: String,

    /// Processor certificate used to verify authentication responses.
    #[serde(default)]
    pub processor_certificate: String,

    /// Customer code used in IRIS reference codes.
    #[serde(default)]
    pub dias_customer_code: String,
}

impl fmt::Debug for MerchantSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MerchantSection")
            .field("merchant_id", &self.merchant_id)
            .field("shared_secret", &"<redacted>")
            .field("private_key", &"<redacted>")
            .field(
                "processor_certificate",
                &format_args!("{} bytes", self.processor_certificate.len()),
            )
            .field("dias_customer_code", &self.dias_customer_code)
            .finish()
    }
}

impl Drop for MerchantSection {
    fn drop(&mut self) {
        self.shared_secret.zeroize();
        self.private_key.zeroize();
    }
}

impl MerchantSection {
    /// Validates the merchant section.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::Config`] if the merchant id or shared secret is
    /// blank, or the customer code is not numeric.
    pub fn validate(&self) -> Result<()> {
        if self.merchant_id.trim().is_empty() {
            return Err(PaymentError::Config("merchant.merchant_id is required".to_owned()));
        }
        if self.shared_secret.trim().is_empty() {
            return Err(PaymentError::Config("merchant.shared_secret is required".to_owned()));
        }
        let code = self.dias_customer_code.trim();
        if !code.is_empty() && !code.chars().all(|c| c.is_ascii_digit()) {
            return Err(PaymentError::Config(format!(
                "merchant.dias_customer_code must be numeric: {code}"
            )));
        }
        Ok(())
    }
}

/// Settlement mode of card payments.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureMode {
    /// Authorise and capture in one step.
    #[default]
    Sale,
    /// Reserve funds only; capture happens separately.
    Authorize,
}

impl CaptureMode {
    /// Name of the settlement request element.
    #[must_use]
    pub const fn request_element(self) -> &'static str {
        match self {
            Self::Sale => "SaleRequest",
            Self::Authorize => "AuthorisationRequest",
        }
    }

    /// Name of the settlement response element.
    #[must_use]
    pub const fn response_element(self) -> &'static str {
        match self {
            Self::Sale => "SaleResponse",
            Self::Authorize => "AuthorisationResponse",
        }
    }
}

/// Payment methods a storefront may offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Card payment with 3-D Secure.
    Card,
    /// IRIS interbank transfer.
    Iris,
    /// `PayPal` wallet redirect.
    Paypal,
}

/// Installments allowed from a given order amount upwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallmentVariation {
    /// Minimum order amount in minor units.
    pub amount: i64,
    /// Maximum number of installments.
    pub installments: i64,
}

impl InstallmentVariation {
    /// Clamps the variation to what the gateway accepts.
    ///
    /// Installments are limited to `0..=60` and a single installment becomes
    /// `0` (no installments). Variations with a non-positive amount are
    /// dropped.
    #[must_use]
    pub fn sanitized(self) -> Option<Self> {
        let amount = self.amount.max(0);
        let mut installments = self.installments.clamp(0, i64::from(MAX_INSTALLMENTS));
        if installments <= 1 {
            installments = 0;
        }
        (amount > 0).then_some(Self { amount, installments })
    }
}

/// Payment options of the merchant account.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PaymentSettings {
    /// Acquirer routing the transactions.
    pub acquirer: Acquirer,
    /// Production or sandbox gateway.
    pub environment: Environment,
    /// Sale or authorisation-only settlement.
    pub capture_mode: CaptureMode,
    /// Default currency (ISO 4217, alphabetic or numeric).
    pub currency: String,
    /// Whether card tokenization may be requested.
    pub tokenization: bool,
    /// Maximum installments offered regardless of amount.
    pub max_installments: u32,
    /// Amount-dependent installment limits.
    pub installments_variations: Vec<InstallmentVariation>,
    /// Card brands offered to the customer.
    pub accepted_card_types: Vec<CardBrand>,
    /// Payment methods offered to the customer.
    pub accepted_payment_methods: Vec<PaymentMethod>,
    /// Language of the hosted payment pages.
    pub language: String,
    /// IANA zone of the timestamps sent to the gateway.
    pub timezone: Tz,
}

impl Default for PaymentSettings {
    fn default() -> Self {
        Self {
            acquirer: Acquirer::default(),
            environment: Environment::default(),
            capture_mode: CaptureMode::default(),
            currency: "EUR".to_owned(),
            tokenization: false,
            max_installments: 0,
            installments_variations: Vec::new(),
            accepted_card_types: Vec::new(),
            accepted_payment_methods: Vec::new(),
            language: "el".to_owned(),
            timezone: Tz::Europe__Athens,
        }
    }
}

impl PaymentSettings {
    /// Validates the payment section.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::Config`] if the currency is blank or
    /// `max_installments` exceeds 60.
    pub fn validate(&self) -> Result<()> {
        if self.currency.trim().is_empty() {
            return Err(PaymentError::Config("payment.currency must not be empty".to_owned()));
        }
        if self.max_installments > MAX_INSTALLMENTS {
            return Err(PaymentError::Config(format!(
                "payment.max_installments must be at most {MAX_INSTALLMENTS}"
            )));
        }
        Ok(())
    }

    /// Installment variations with out-of-range entries clamped or dropped.
    #[must_use]
    pub fn sanitized_installments_variations(&self) -> Vec<InstallmentVariation> {
        self.installments_variations.iter().filter_map(|v| v.sanitized()).collect()
    }

    /// Storefront view of the payment options.
    ///
    /// # Examples
    ///
    /// ```
    /// use cardlink_vpos::merchant::{InstallmentVariation, PaymentSettings, RouteSettings};
    ///
    /// let settings = PaymentSettings {
    ///     installments_variations: vec![InstallmentVariation { amount: 10_000, installments: 1 }],
    ///     ..PaymentSettings::default()
    /// };
    ///
    /// let summary = settings.summary(&RouteSettings::default());
    /// assert!(summary.installments);
    /// assert_eq!(summary.installments_variations[0].installments, 0);
    /// ```
    #[must_use]
    pub fn summary(&self, routes: &RouteSettings) -> PaymentSettingsSummary {
        let installments_variations = self.sanitized_installments_variations();
        PaymentSettingsSummary {
            currency: self.currency.clone(),
            accepted_card_types: self.accepted_card_types.clone(),
            accepted_payment_methods: self.accepted_payment_methods.clone(),
            installments: !installments_variations.is_empty() || self.max_installments > 1,
            max_installments: self.max_installments,
            installments_variations,
            tokenization: self.tokenization,
            acquirer: self.acquirer,
            routes: routes.clone(),
        }
    }
}

/// Serialisable summary of the payment options for storefront front-ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentSettingsSummary {
    /// Default currency.
    pub currency: String,
    /// Card brands offered.
    pub accepted_card_types: Vec<CardBrand>,
    /// Payment methods offered.
    pub accepted_payment_methods: Vec<PaymentMethod>,
    /// Whether any installment option exists.
    pub installments: bool,
    /// Maximum installments regardless of amount.
    pub max_installments: u32,
    /// Sanitised amount-dependent installment limits.
    pub installments_variations: Vec<InstallmentVariation>,
    /// Whether card tokenization is offered.
    pub tokenization: bool,
    /// Acquirer routing the transactions.
    pub acquirer: Acquirer,
    /// Merchant routes.
    pub routes: RouteSettings,
}

/// Merchant-side URLs.
///
/// The `*_request_url` routes are where the storefront posts payment
/// requests; they are only echoed in [`PaymentSettingsSummary`]. The
/// success/failure routes are sent to the gateway as callback targets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteSettings {
    /// Storefront route starting a card payment.
    pub card_request_url: Option<String>,
    /// 3-D Secure success callback (`okUrl`).
    pub card_success_url: Option<String>,
    /// 3-D Secure failure callback (`failUrl`).
    pub card_failure_url: Option<String>,
    /// Storefront route starting an IRIS payment.
    pub iris_request_url: Option<String>,
    /// IRIS confirmation callback.
    pub iris_confirm_url: Option<String>,
    /// IRIS cancellation callback.
    pub iris_cancel_url: Option<String>,
    /// Storefront route starting a `PayPal` payment.
    pub paypal_request_url: Option<String>,
    /// `PayPal` confirmation callback.
    pub paypal_confirm_url: Option<String>,
    /// `PayPal` cancellation callback.
    pub paypal_cancel_url: Option<String>,
    /// Custom stylesheet for the hosted IRIS and `PayPal` pages.
    pub stylesheet_url: Option<String>,
}

impl RouteSettings {
    fn entries(&self) -> [(&'static str, Option<&str>); 10] {
        [
            ("card_request_url", self.card_request_url.as_deref()),
            ("card_success_url", self.card_success_url.as_deref()),
            ("card_failure_url", self.card_failure_url.as_deref()),
            ("iris_request_url", self.iris_request_url.as_deref()),
            ("iris_confirm_url", self.iris_confirm_url.as_deref()),
            ("iris_cancel_url", self.iris_cancel_url.as_deref()),
            ("paypal_request_url", self.paypal_request_url.as_deref()),
            ("paypal_confirm_url", self.paypal_confirm_url.as_deref()),
            ("paypal_cancel_url", self.paypal_cancel_url.as_deref()),
            ("stylesheet_url", self.stylesheet_url.as_deref()),
        ]
    }

    /// Validates that every configured route is an absolute http(s) URL.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::Config`] naming the offending route.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in self.entries() {
            if let Some(raw) = value {
                validate_route(name, raw)?;
            }
        }
        Ok(())
    }

    /// Returns a required route.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::Config`] if the route is not configured.
    pub fn require<'a>(&self, name: &str, value: Option<&'a str>) -> Result<&'a str> {
        value
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| PaymentError::Config(format!("routes.{name} is not configured")))
    }
}

fn validate_route(name: &str, raw: &str) -> Result<()> {
    let url = Url::parse(raw)
        .map_err(|e| PaymentError::Config(format!("routes.{name} '{raw}' is invalid: {e}")))?;
    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(PaymentError::Config(format!("routes.{name} must be an http(s) URL: {raw}")));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(PaymentError::Config(format!("routes.{name} has no host: {raw}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        [merchant]
        merchant_id = "0020000000"
        shared_secret = "Cardlink1"
    "#;

    #[test]
    fn test_minimal_config_defaults() {
        let config = MerchantConfig::from_toml(MINIMAL).unwrap();
        assert_eq!(config.payment.acquirer, Acquirer::Cardlink);
        assert_eq!(config.payment.environment, Environment::Sandbox);
        assert_eq!(config.payment.capture_mode, CaptureMode::Sale);
        assert_eq!(config.payment.language, "el");
        assert_eq!(config.payment.timezone, Tz::Europe__Athens);
        assert_eq!(config.transport.timeout_secs, 120);
        assert!(config.routes.card_success_url.is_none());
    }

    #[test]
    fn test_complete_config() {
        let toml = r#"
            [merchant]
            merchant_id = "0020000000"
            shared_secret = "Cardlink1"
            dias_customer_code = "12345"

            [payment]
            acquirer = "worldline"
            environment = "production"
            capture_mode = "authorize"
            currency = "978"
            tokenization = true
            max_installments = 12
            accepted_card_types = ["visa", "mastercard"]
            accepted_payment_methods = ["card", "iris"]
            installments_variations = [
                { amount = 10000, installments = 3 },
                { amount = 50000, installments = 12 },
            ]

            [routes]
            card_success_url = "https://shop.example.com/ok"
            card_failure_url = "https://shop.example.com/fail"

            [transport]
            timeout_secs = 60
        "#;

        let config = MerchantConfig::from_toml(toml).unwrap();
        assert_eq!(config.payment.acquirer, Acquirer::Worldline);
        assert_eq!(config.payment.capture_mode.request_element(), "AuthorisationRequest");
        assert_eq!(config.payment.accepted_card_types, [CardBrand::Visa, CardBrand::Mastercard]);
        assert_eq!(config.payment.installments_variations.len(), 2);
        assert_eq!(config.transport.timeout_secs, 60);
        assert_eq!(config.transport.connect_timeout_secs, 45);
    }

    #[test]
    fn test_blank_secret_rejected() {
        let toml = r#"
            [merchant]
            merchant_id = "0020000000"
            shared_secret = "  "
        "#;
        let err = MerchantConfig::from_toml(toml).unwrap_err();
        assert!(err.to_string().contains("shared_secret"));
    }

    #[test]
    fn test_unknown_acquirer_rejected() {
        let toml = format!("{MINIMAL}\n[payment]\nacquirer = \"piraeus\"\n");
        assert!(matches!(MerchantConfig::from_toml(&toml), Err(PaymentError::Config(_))));
    }

    #[test]
    fn test_timezone_setting() {
        let toml = format!("{MINIMAL}\n[payment]\ntimezone = \"Europe/Berlin\"\n");
        let config = MerchantConfig::from_toml(&toml).unwrap();
        assert_eq!(config.payment.timezone, Tz::Europe__Berlin);

        let toml = format!("{MINIMAL}\n[payment]\ntimezone = \"Mars/Olympus\"\n");
        assert!(matches!(MerchantConfig::from_toml(&toml), Err(PaymentError::Config(_))));
    }

    #[test]
    fn test_relative_route_rejected() {
        let toml = format!("{MINIMAL}\n[routes]\ncard_success_url = \"/vpos/ok\"\n");
        let err = MerchantConfig::from_toml(&toml).unwrap_err();
        assert!(err.to_string().contains("card_success_url"));
    }

    #[test]
    fn test_ftp_route_rejected() {
        let routes = RouteSettings {
            iris_confirm_url: Some("ftp://shop.example.com/ok".to_owned()),
            ..RouteSettings::default()
        };
        assert!(routes.validate().is_err());
    }

    #[test]
    fn test_too_many_installments_rejected() {
        let settings = PaymentSettings { max_installments: 61, ..PaymentSettings::default() };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_installment_variation_sanitizing() {
        let settings = PaymentSettings {
            installments_variations: vec![
                InstallmentVariation { amount: 0, installments: 6 },
                InstallmentVariation { amount: 5_000, installments: 1 },
                InstallmentVariation { amount: 20_000, installments: 99 },
                InstallmentVariation { amount: -10, installments: 3 },
            ],
            ..PaymentSettings::default()
        };

        assert_eq!(
            settings.sanitized_installments_variations(),
            [
                InstallmentVariation { amount: 5_000, installments: 0 },
                InstallmentVariation { amount: 20_000, installments: 60 },
            ]
        );
    }

    #[test]
    fn test_summary_without_installments() {
        let settings = PaymentSettings { max_installments: 1, ..PaymentSettings::default() };
        let summary = settings.summary(&RouteSettings::default());
        assert!(!summary.installments);

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["acquirer"], "cardlink");
        assert_eq!(json["currency"], "EUR");
    }

    #[test]
    fn test_require_route() {
        let routes = RouteSettings::default();
        let err =
            routes.require("card_success_url", routes.card_success_url.as_deref()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid configuration: routes.card_success_url is not configured"
        );
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = MerchantConfig::from_toml(MINIMAL).unwrap();
        let debug = format!("{:?}", config.merchant);
        assert!(!debug.contains("Cardlink1"));
        assert!(debug.contains("0020000000"));
    }
}
