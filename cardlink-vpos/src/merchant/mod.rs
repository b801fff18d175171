//! Merchant setup: configuration, credentials and acquirer endpoints.
//!
//! [`MerchantContext`] bundles everything a payment flow needs about the
//! merchant. It is built once from a validated [`MerchantConfig`] and shared
//! immutably between transactions.
//!
//! # Examples
//!
//! ```
//! use cardlink_vpos::merchant::{MerchantConfig, MerchantContext};
//!
//! let config = MerchantConfig::from_toml(
//!     r#"
//!     [merchant]
//!     merchant_id = "0020000000"
//!     shared_secret = "Cardlink1"
//!
//!     [payment]
//!     acquirer = "nexi"
//!     "#,
//! )
//! .unwrap();
//!
//! let context = MerchantContext::from_config(&config).unwrap();
//! assert_eq!(
//!     context.endpoints().redirect_url,
//!     "https://alphaecommerce-test.cardlink.gr/vpos/shophandlermpi"
//! );
//! ```

pub mod config;
pub mod credentials;
pub mod endpoint;

pub use config::{
    CaptureMode, InstallmentVariation, MAX_INSTALLMENTS, MerchantConfig, MerchantSection,
    PaymentMethod, PaymentSettings, PaymentSettingsSummary, RouteSettings,
};
pub use credentials::MerchantCredentials;
pub use endpoint::{Acquirer, AcquirerEndpoints, EndpointTable, Environment};

use chrono::{NaiveDateTime, Utc};

use crate::{error::Result, util::wall_clock};

/// Immutable per-merchant context shared by all payment flows.
#[derive(Debug)]
pub struct MerchantContext {
    credentials: MerchantCredentials,
    settings: PaymentSettings,
    routes: RouteSettings,
    endpoints: AcquirerEndpoints,
}

impl MerchantContext {
    /// Builds the context using the built-in endpoint table.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::InvalidKeyMaterial`](crate::error::PaymentError::InvalidKeyMaterial)
    /// if key material cannot be loaded, or
    /// [`PaymentError::Config`](crate::error::PaymentError::Config) if the
    /// configuration is invalid.
    pub fn from_config(config: &MerchantConfig) -> Result<Self> {
        Self::with_endpoint_table(config, &EndpointTable::builtin())
    }

    /// Builds the context resolving endpoints from `table`.
    ///
    /// # Errors
    ///
    /// Same as [`from_config`](Self::from_config), plus a configuration error
    /// when the table has no entry for the configured acquirer.
    pub fn with_endpoint_table(config: &MerchantConfig, table: &EndpointTable) -> Result<Self> {
        config.validate()?;
        let endpoints = table.get(config.payment.acquirer, config.payment.environment)?.clone();
        endpoints.validate()?;

        Ok(Self {
            credentials: MerchantCredentials::from_config(&config.merchant)?,
            settings: config.payment.clone(),
            routes: config.routes.clone(),
            endpoints,
        })
    }

    /// Assembles a context from parts, e.g. in tests.
    #[must_use]
    pub const fn new(
        credentials: MerchantCredentials,
        settings: PaymentSettings,
        routes: RouteSettings,
        endpoints: AcquirerEndpoints,
    ) -> Self {
        Self { credentials, settings, routes, endpoints }
    }

    /// Merchant credentials.
    #[must_use]
    pub const fn credentials(&self) -> &MerchantCredentials {
        &self.credentials
    }

    /// Payment options.
    #[must_use]
    pub const fn settings(&self) -> &PaymentSettings {
        &self.settings
    }

    /// Merchant routes.
    #[must_use]
    pub const fn routes(&self) -> &RouteSettings {
        &self.routes
    }

    /// Resolved acquirer endpoints.
    #[must_use]
    pub const fn endpoints(&self) -> &AcquirerEndpoints {
        &self.endpoints
    }

    /// Current wall-clock time in the configured `payment.timezone`.
    #[must_use]
    pub fn now(&self) -> NaiveDateTime {
        wall_clock(Utc::now(), self.settings.timezone)
    }

    /// Storefront summary of the payment options.
    #[must_use]
    pub fn settings_summary(&self) -> PaymentSettingsSummary {
        self.settings.summary(&self.routes)
    }
}
