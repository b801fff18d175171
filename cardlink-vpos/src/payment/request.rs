//! Caller-supplied card transaction data.

use std::fmt;

use serde::Deserialize;
use zeroize::Zeroize;

use crate::{
    card::mask_pan,
    error::{PaymentError, Result},
};

/// Plain card details.
///
/// The number and security code are wiped from memory on drop.
#[derive(Clone, Deserialize)]
pub struct CardDetails {
    /// Card number.
    pub pan: String,
    /// Expiry as `YYMM`.
    pub expiry: String,
    /// Card security code.
    #[serde(default)]
    pub cvv: String,
}

impl CardDetails {
    /// Creates card details.
    #[must_use]
    pub fn new(pan: impl Into<String>, expiry: impl Into<String>, cvv: impl Into<String>) -> Self {
        Self { pan: pan.into(), expiry: expiry.into(), cvv: cvv.into() }
    }
}

impl fmt::Debug for CardDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CardDetails")
            .field("pan", &mask_pan(&self.pan))
            .field("expiry", &self.expiry)
            .finish_non_exhaustive()
    }
}

impl Drop for CardDetails {
    fn drop(&mut self) {
        self.pan.zeroize();
        self.cvv.zeroize();
    }
}

/// A card payment as requested by the storefront.
///
/// Exactly how the card is identified is up to the caller: plain
/// [`CardDetails`], a payload produced by the client-side encoding script
/// (`card_enc_data`), or a gateway token from an earlier tokenising payment
/// (`ext_token`). At least one of them is required.
///
/// # Examples
///
/// ```
/// use cardlink_vpos::payment::{CardDetails, TransactionRequest};
///
/// let request = TransactionRequest {
///     amount: 1050,
///     card: Some(CardDetails::new("4111111111111111", "2812", "123")),
///     cardholder_email: "buyer@example.com".to_owned(),
///     ..TransactionRequest::default()
/// };
/// assert!(request.validate().is_ok());
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TransactionRequest {
    /// Merchant order id; a random one is generated when absent.
    pub order_id: Option<String>,
    /// Amount in minor units.
    pub amount: u64,
    /// Currency, alphabetic or numeric; the configured currency when absent.
    pub currency: Option<String>,
    /// Order description.
    pub description: String,
    /// Card brand name or gateway id; derived from the card number when absent.
    pub card_type: Option<String>,
    /// Plain card details.
    pub card: Option<CardDetails>,
    /// Card payload encrypted by the client-side script.
    pub card_enc_data: Option<String>,
    /// Gateway token of a stored card.
    pub ext_token: Option<String>,
    /// Ask the gateway to tokenise the card on a successful payment.
    pub tokenize: bool,
    /// 3-D Secure device category; `0` (browser) when absent.
    pub device_category: Option<String>,
    /// Cardholder name.
    pub cardholder_name: String,
    /// Cardholder email.
    pub cardholder_email: String,
    /// Billing city.
    pub bill_city: String,
    /// Billing country, alphabetic or numeric; Greece when absent.
    pub bill_country: Option<String>,
    /// Billing address line.
    pub bill_line1: String,
    /// Billing postal code.
    pub bill_post_code: String,
    /// Recurring payment frequency in days.
    pub recur_freq: Option<String>,
    /// Recurring payment end date (`YYYYMMDD`).
    pub recur_end: Option<String>,
    /// Number of installments.
    pub installments: Option<u32>,
}

/// Default billing country (Greece, ISO 3166 numeric).
pub const DEFAULT_BILL_COUNTRY: &str = "300";

impl TransactionRequest {
    /// Checks that the request can be sent.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::InvalidInput`] if the amount is zero, no card
    /// representation is present, or the recurring parameters are only half
    /// given.
    pub fn validate(&self) -> Result<()> {
        if self.amount == 0 {
            return Err(PaymentError::InvalidInput("amount must be positive".to_owned()));
        }
        let has_card = self.card.as_ref().is_some_and(|c| !c.pan.trim().is_empty());
        if !has_card && self.encrypted_card().is_none() && self.token().is_none() {
            return Err(PaymentError::InvalidInput(
                "one of card, card_enc_data or ext_token is required".to_owned(),
            ));
        }
        if self.recurring().is_none()
            && (non_empty(self.recur_freq.as_deref()).is_some()
                || non_empty(self.recur_end.as_deref()).is_some())
        {
            return Err(PaymentError::InvalidInput(
                "recur_freq and recur_end must be given together".to_owned(),
            ));
        }
        Ok(())
    }

    /// Encrypted card payload, if any.
    #[must_use]
    pub fn encrypted_card(&self) -> Option<&str> {
        non_empty(self.card_enc_data.as_deref())
    }

    /// External card token, if any.
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        non_empty(self.ext_token.as_deref())
    }

    /// `(frequency, end date)` when both recurring parameters are present.
    #[must_use]
    pub fn recurring(&self) -> Option<(&str, &str)> {
        non_empty(self.recur_freq.as_deref()).zip(non_empty(self.recur_end.as_deref()))
    }
}

pub(crate) fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card_request() -> TransactionRequest {
        TransactionRequest {
            amount: 1000,
            card: Some(CardDetails::new("4111111111111111", "2812", "123")),
            ..TransactionRequest::default()
        }
    }

    #[test]
    fn test_valid_card_request() {
        assert!(card_request().validate().is_ok());
    }

    #[test]
    fn test_zero_amount_rejected() {
        let request = TransactionRequest { amount: 0, ..card_request() };
        assert!(matches!(request.validate(), Err(PaymentError::InvalidInput(_))));
    }

    #[test]
    fn test_missing_card_rejected() {
        let request = TransactionRequest { amount: 100, ..TransactionRequest::default() };
        let err = request.validate().unwrap_err();
        assert!(err.to_string().contains("ext_token"));
    }

    #[test]
    fn test_token_only_request_is_valid() {
        let request = TransactionRequest {
            amount: 100,
            ext_token: Some("tok_1".to_owned()),
            ..TransactionRequest::default()
        };
        assert!(request.validate().is_ok());
        assert_eq!(request.token(), Some("tok_1"));
    }

    #[test]
    fn test_half_recurring_rejected() {
        let request = TransactionRequest { recur_freq: Some("30".to_owned()), ..card_request() };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_blank_values_are_absent() {
        let request = TransactionRequest {
            card_enc_data: Some("  ".to_owned()),
            recur_freq: Some("30".to_owned()),
            recur_end: Some("20301231".to_owned()),
            ..card_request()
        };
        assert!(request.encrypted_card().is_none());
        assert_eq!(request.recurring(), Some(("30", "20301231")));
    }

    #[test]
    fn test_debug_masks_card_number() {
        let debug = format!("{:?}", card_request());
        assert!(debug.contains("************1111"));
        assert!(!debug.contains("4111111111111111"));
        assert!(!debug.contains("123\""));
    }

    #[test]
    fn test_deserialize_from_json() {
        let request: TransactionRequest = serde_json::from_str(
            r#"{
                "amount": 2500,
                "card": {"pan": "5555555555554444", "expiry": "2901"},
                "tokenize": true
            }"#,
        )
        .unwrap();
        assert_eq!(request.amount, 2500);
        assert!(request.tokenize);
        assert!(request.validate().is_ok());
    }
}
