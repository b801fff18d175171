//! Currency and country code lookup.
//!
//! The authentication leg speaks ISO numeric codes while settlement and the
//! redirect flows speak alphabetic ones, so every flow resolves the caller's
//! codes through a [`CodeLookup`]. Integrators with a full ISO 4217 / ISO
//! 3166 table inject their own implementation.

use std::fmt::Debug;

use crate::error::{PaymentError, Result};

/// An ISO 4217 currency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Currency {
    /// Alphabetic code, e.g. `EUR`.
    pub alpha3: String,
    /// Three-digit numeric code, e.g. `978`.
    pub numeric: String,
}

/// An ISO 3166-1 country.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Country {
    /// Two-letter code, e.g. `GR`.
    pub alpha2: String,
    /// Three-digit numeric code, e.g. `300`.
    pub numeric: String,
}

/// Resolves currency and country codes given in either form.
pub trait CodeLookup: Debug + Send + Sync {
    /// Looks up a currency by alphabetic or numeric code.
    fn currency(&self, code: &str) -> Option<Currency>;

    /// Looks up a country by two-letter or numeric code.
    fn country(&self, code: &str) -> Option<Country>;

    /// Like [`currency`](Self::currency), failing on unknown codes.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::InvalidInput`] if the code is unknown.
    fn require_currency(&self, code: &str) -> Result<Currency> {
        self.currency(code)
            .ok_or_else(|| PaymentError::InvalidInput(format!("unknown currency code: {code}")))
    }

    /// Like [`country`](Self::country), failing on unknown codes.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::InvalidInput`] if the code is unknown.
    fn require_country(&self, code: &str) -> Result<Country> {
        self.country(code)
            .ok_or_else(|| PaymentError::InvalidInput(format!("unknown country code: {code}")))
    }
}

const CURRENCIES: &[(&str, &str)] = &[
    ("EUR", "978"),
    ("USD", "840"),
    ("GBP", "826"),
    ("CHF", "756"),
    ("BGN", "975"),
    ("RON", "946"),
    ("PLN", "985"),
    ("CZK", "203"),
    ("HUF", "348"),
    ("SEK", "752"),
    ("DKK", "208"),
    ("NOK", "578"),
    ("CAD", "124"),
    ("AUD", "036"),
    ("JPY", "392"),
];

const COUNTRIES: &[(&str, &str)] = &[
    ("GR", "300"),
    ("CY", "196"),
    ("BG", "100"),
    ("RO", "642"),
    ("AL", "008"),
    ("MK", "807"),
    ("TR", "792"),
    ("IT", "380"),
    ("DE", "276"),
    ("FR", "250"),
    ("ES", "724"),
    ("PT", "620"),
    ("NL", "528"),
    ("BE", "056"),
    ("LU", "442"),
    ("AT", "040"),
    ("IE", "372"),
    ("MT", "470"),
    ("FI", "246"),
    ("SE", "752"),
    ("DK", "208"),
    ("PL", "616"),
    ("CZ", "203"),
    ("HU", "348"),
    ("CH", "756"),
    ("GB", "826"),
    ("US", "840"),
    ("CA", "124"),
    ("AU", "036"),
];

/// Built-in table covering the currencies and countries the gateway
/// commonly serves.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultCodeLookup;

fn find<'a>(table: &'a [(&'a str, &'a str)], code: &str) -> Option<&'a (&'a str, &'a str)> {
    let code = code.trim();
    if let Ok(n) = code.parse::<u16>() {
        let numeric = format!("{n:03}");
        table.iter().find(|(_, num)| *num == numeric)
    } else {
        table.iter().find(|(alpha, _)| alpha.eq_ignore_ascii_case(code))
    }
}

impl CodeLookup for DefaultCodeLookup {
    fn currency(&self, code: &str) -> Option<Currency> {
        find(CURRENCIES, code).map(|(alpha3, numeric)| Currency {
            alpha3: (*alpha3).to_owned(),
            numeric: (*numeric).to_owned(),
        })
    }

    fn country(&self, code: &str) -> Option<Country> {
        find(COUNTRIES, code).map(|(alpha2, numeric)| Country {
            alpha2: (*alpha2).to_owned(),
            numeric: (*numeric).to_owned(),
        })
    }
}
