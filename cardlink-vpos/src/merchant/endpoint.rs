//! Acquirer endpoint table.
//!
//! Every acquirer runs the same gateway software on its own host, with one
//! host for production and one for testing. The table maps
//! `(acquirer, environment)` to the fixed set of URLs used by the payment
//! flows. URLs are never computed per call; the table is built and validated
//! once.

use std::{collections::HashMap, fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{PaymentError, Result};

/// Acquiring bank back-end the merchant contracted with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Acquirer {
    /// Cardlink.
    #[default]
    Cardlink,
    /// Nexi (Alpha Bank e-commerce).
    Nexi,
    /// Worldline (Eurobank e-commerce).
    Worldline,
}

impl Acquirer {
    /// All acquirers, in table order.
    pub const ALL: [Self; 3] = [Self::Cardlink, Self::Nexi, Self::Worldline];

    /// Configuration name of the acquirer.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cardlink => "cardlink",
            Self::Nexi => "nexi",
            Self::Worldline => "worldline",
        }
    }

    const fn hosts(self) -> (&'static str, &'static str) {
        match self {
            Self::Cardlink => ("ecommerce.cardlink.gr", "ecommerce-test.cardlink.gr"),
            Self::Nexi => ("www.alphaecommerce.gr", "alphaecommerce-test.cardlink.gr"),
            Self::Worldline => ("vpos.eurocommerce.gr", "eurocommerce-test.cardlink.gr"),
        }
    }

    const fn asset_dir(self) -> &'static str {
        match self {
            Self::Cardlink => "cardlink",
            Self::Nexi => "alpha",
            Self::Worldline => "euro",
        }
    }
}

impl fmt::Display for Acquirer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Acquirer {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cardlink" => Ok(Self::Cardlink),
            "nexi" => Ok(Self::Nexi),
            "worldline" => Ok(Self::Worldline),
            other => Err(PaymentError::Config(format!("unknown acquirer: {other}"))),
        }
    }
}

/// Gateway environment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    /// Live gateway.
    Production,
    /// Test gateway.
    #[default]
    Sandbox,
}

impl FromStr for Environment {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "production" | "live" => Ok(Self::Production),
            "sandbox" | "test" => Ok(Self::Sandbox),
            other => Err(PaymentError::Config(format!("unknown environment: {other}"))),
        }
    }
}

/// URLs of one acquirer in one environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AcquirerEndpoints {
    /// 3-D Secure authentication server (form POST).
    pub authentication_url: String,
    /// XML settlement API.
    pub settlement_url: String,
    /// Client-side card-encoding script.
    pub client_script_url: String,
    /// Shared redirect endpoint used by the IRIS and `PayPal` flows.
    pub redirect_url: String,
    /// Default hosted stylesheet for the payment page.
    pub stylesheet_url: String,
}

impl AcquirerEndpoints {
    fn for_host(host: &str, asset_dir: &str) -> Self {
        Self {
            authentication_url: format!("https://{host}/mdpaympi/MerchantServer"),
            settlement_url: format!("https://{host}/vpos/xmlpayvpos"),
            client_script_url: format!("https://{host}/vpos/csescript.js"),
            redirect_url: format!("https://{host}/vpos/shophandlermpi"),
            stylesheet_url: format!(
                "https://{host}/vposart/{asset_dir}/v2/css/styles_main_SDK.css"
            ),
        }
    }

    fn urls(&self) -> [(&'static str, &str); 5] {
        [
            ("authentication_url", self.authentication_url.as_str()),
            ("settlement_url", self.settlement_url.as_str()),
            ("client_script_url", self.client_script_url.as_str()),
            ("redirect_url", self.redirect_url.as_str()),
            ("stylesheet_url", self.stylesheet_url.as_str()),
        ]
    }

    /// Checks that every URL parses and uses HTTPS.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::Config`] naming the first offending URL.
    pub fn validate(&self) -> Result<()> {
        for (name, raw) in self.urls() {
            let url = Url::parse(raw)
                .map_err(|e| PaymentError::Config(format!("{name} '{raw}' is invalid: {e}")))?;
            if url.scheme() != "https" {
                return Err(PaymentError::Config(format!("{name} must use HTTPS: {raw}")));
            }
        }
        Ok(())
    }
}

/// Lookup table from `(acquirer, environment)` to endpoints.
#[derive(Debug, Clone)]
pub struct EndpointTable {
    entries: HashMap<(Acquirer, Environment), AcquirerEndpoints>,
}

impl EndpointTable {
    /// The published endpoints of all three acquirers.
    ///
    /// # Examples
    ///
    /// ```
    /// use cardlink_vpos::merchant::{Acquirer, EndpointTable, Environment};
    ///
    /// let table = EndpointTable::builtin();
    /// let endpoints = table.get(Acquirer::Nexi, Environment::Production).unwrap();
    /// assert_eq!(endpoints.settlement_url, "https://www.alphaecommerce.gr/vpos/xmlpayvpos");
    /// ```
    #[must_use]
    pub fn builtin() -> Self {
        let entries = Acquirer::ALL
            .into_iter()
            .flat_map(|acquirer| {
                let (production, sandbox) = acquirer.hosts();
                [
                    (
                        (acquirer, Environment::Production),
                        AcquirerEndpoints::for_host(production, acquirer.asset_dir()),
                    ),
                    (
                        (acquirer, Environment::Sandbox),
                        AcquirerEndpoints::for_host(sandbox, acquirer.asset_dir()),
                    ),
                ]
            })
            .collect();
        Self { entries }
    }

    /// Builds a table from explicit entries, validating each of them.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::Config`] if any URL is invalid.
    pub fn from_entries(
        entries: impl IntoIterator<Item = ((Acquirer, Environment), AcquirerEndpoints)>,
    ) -> Result<Self> {
        let table = Self { entries: entries.into_iter().collect() };
        table.validate()?;
        Ok(table)
    }

    /// Validates every entry.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::Config`] if any URL is invalid.
    pub fn validate(&self) -> Result<()> {
        self.entries.values().try_for_each(AcquirerEndpoints::validate)
    }

    /// Looks up the endpoints for a configured acquirer and environment.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::Config`] if the table has no such entry.
    pub fn get(&self, acquirer: Acquirer, environment: Environment) -> Result<&AcquirerEndpoints> {
        self.entries.get(&(acquirer, environment)).ok_or_else(|| {
            PaymentError::Config(format!("no endpoints for {acquirer} ({environment:?})"))
        })
    }
}
