//! Merchant data envelope and its storage capability.
//!
//! The authentication leg and the settlement leg run against two independent
//! gateway servers, with the customer's browser in between. Everything the
//! settlement leg needs about the order travels in a
//! [`MerchantDataEnvelope`]: a base64-encoded JSON document that the caller
//! persists under the `MD` correlation token and hands back when the
//! authentication callback arrives.
//!
//! The envelope contains the card number and security code. Where it is kept,
//! for how long and how it is protected is the integrator's decision; the
//! crate never keeps it itself.

use std::fmt;

use base64::{Engine, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::{
    card::mask_pan,
    error::{PaymentError, Result},
};

/// Token options value asking the gateway to tokenise the card.
pub const TOKEN_OPTIONS_REQUEST: &str = "100";

/// Token options value marking a payment made with a stored token.
pub const TOKEN_OPTIONS_USE: &str = "110";

/// Order context carried from the authentication leg to settlement.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerchantDataEnvelope {
    /// Merchant order id.
    #[serde(default)]
    pub order_id: String,
    /// Card number, empty for encrypted or tokenised payments.
    #[serde(default)]
    pub pan: String,
    /// Card brand name.
    #[serde(rename = "cardType")]
    #[serde(default)]
    pub card_type: String,
    /// Card expiry (`YYMM`).
    #[serde(default)]
    pub expiry: String,
    /// Card security code.
    #[serde(default)]
    pub cvv: String,
    /// Client-side encrypted card payload.
    #[serde(rename = "cardEncData")]
    #[serde(default)]
    pub card_enc_data: String,
    /// Amount in minor units.
    #[serde(rename = "purchAmount")]
    #[serde(default)]
    pub purch_amount: u64,
    /// ISO 4217 alphabetic currency code.
    #[serde(default)]
    pub currency: String,
    /// Order description.
    #[serde(default)]
    pub description: String,
    /// Cardholder name.
    #[serde(rename = "cardholderName")]
    #[serde(default)]
    pub cardholder_name: String,
    /// Cardholder email.
    #[serde(rename = "cardholderEmail")]
    #[serde(default)]
    pub cardholder_email: String,
    /// Billing city.
    #[serde(rename = "billCity")]
    #[serde(default)]
    pub bill_city: String,
    /// Billing country, ISO 3166 numeric.
    #[serde(rename = "billCountryNum")]
    #[serde(default)]
    pub bill_country_num: String,
    /// Billing country, ISO 3166 alpha-2.
    #[serde(rename = "billCountryAlpha2")]
    #[serde(default)]
    pub bill_country_alpha2: String,
    /// Billing address line.
    #[serde(rename = "billLine1")]
    #[serde(default)]
    pub bill_line1: String,
    /// Billing postal code.
    #[serde(rename = "billPostCode")]
    #[serde(default)]
    pub bill_post_code: String,
    /// Recurring frequency.
    #[serde(rename = "recurFreq")]
    #[serde(default)]
    pub recur_freq: String,
    /// Recurring end date.
    #[serde(rename = "recurEnd")]
    #[serde(default)]
    pub recur_end: String,
    /// Number of installments, empty when none.
    #[serde(default)]
    pub installments: String,
    /// `100` to request tokenization, `110` for a token payment, else empty.
    #[serde(rename = "extTokenOptions")]
    #[serde(default)]
    pub ext_token_options: String,
    /// Stored card token.
    #[serde(rename = "extToken")]
    #[serde(default)]
    pub ext_token: String,
}

impl fmt::Debug for MerchantDataEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MerchantDataEnvelope")
            .field("order_id", &self.order_id)
            .field("pan", &mask_pan(&self.pan))
            .field("card_type", &self.card_type)
            .field("purch_amount", &self.purch_amount)
            .field("currency", &self.currency)
            .field("ext_token_options", &self.ext_token_options)
            .finish_non_exhaustive()
    }
}

impl Drop for MerchantDataEnvelope {
    fn drop(&mut self) {
        self.pan.zeroize();
        self.cvv.zeroize();
        self.card_enc_data.zeroize();
    }
}

impl MerchantDataEnvelope {
    /// Encodes the envelope as base64 JSON.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::Envelope`] if JSON serialisation fails.
    pub fn encode(&self) -> Result<String> {
        let json = serde_json::to_vec(self)
            .map_err(|e| PaymentError::Envelope(format!("cannot serialise envelope: {e}")))?;
        Ok(STANDARD.encode(json))
    }

    /// Decodes an envelope produced by [`encode`](Self::encode).
    ///
    /// Unknown keys are ignored and missing keys take their empty default.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::Envelope`] if the blob is not base64 JSON.
    pub fn decode(blob: &str) -> Result<Self> {
        let json = STANDARD
            .decode(blob.trim())
            .map_err(|e| PaymentError::Envelope(format!("envelope is not base64: {e}")))?;
        serde_json::from_slice(&json)
            .map_err(|e| PaymentError::Envelope(format!("envelope is not valid JSON: {e}")))
    }

    /// Whether this payment asked the gateway to tokenise the card.
    #[must_use]
    pub fn requests_token(&self) -> bool {
        self.ext_token_options == TOKEN_OPTIONS_REQUEST
    }

    /// Whether this payment is made with a stored token.
    #[must_use]
    pub fn uses_token(&self) -> bool {
        self.ext_token_options == TOKEN_OPTIONS_USE && !self.ext_token.is_empty()
    }
}

/// Persistence capability for merchant data envelopes.
///
/// The store must hold an envelope at least until the authentication
/// callback for its `MD` key has been processed. Expiry and at-most-once
/// delivery are the implementation's responsibility.
pub trait EnvelopeStore: fmt::Debug + Send + Sync {
    /// Persists `blob` under `md`.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::Store`] if the envelope could not be persisted.
    fn store(&self, md: &str, blob: &str) -> Result<()>;

    /// Returns the envelope stored under `md`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::Store`] if the backend failed.
    fn fetch(&self, md: &str) -> Result<Option<String>>;
}

impl<S: EnvelopeStore + ?Sized> EnvelopeStore for &S {
    fn store(&self, md: &str, blob: &str) -> Result<()> {
        (**self).store(md, blob)
    }

    fn fetch(&self, md: &str) -> Result<Option<String>> {
        (**self).fetch(md)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MerchantDataEnvelope {
        let mut envelope = MerchantDataEnvelope::default();
        envelope.order_id = "ORD-1".to_owned();
        envelope.pan = "4111111111111111".to_owned();
        envelope.card_type = "visa".to_owned();
        envelope.expiry = "2812".to_owned();
        envelope.cvv = "123".to_owned();
        envelope.purch_amount = 1050;
        envelope.currency = "EUR".to_owned();
        envelope.bill_country_num = "300".to_owned();
        envelope.bill_country_alpha2 = "GR".to_owned();
        envelope
    }

    #[test]
    fn test_encode_uses_wire_keys() {
        let blob = sample().encode().unwrap();
        let json: serde_json::Value =
            serde_json::from_slice(&STANDARD.decode(blob).unwrap()).unwrap();

        assert_eq!(json["order_id"], "ORD-1");
        assert_eq!(json["cardType"], "visa");
        assert_eq!(json["purchAmount"], 1050);
        assert_eq!(json["billCountryAlpha2"], "GR");
        assert_eq!(json["extTokenOptions"], "");
        assert_eq!(json.as_object().unwrap().len(), 21);
    }

    #[test]
    fn test_decode_recovers_fields() {
        let original = sample();
        let decoded = MerchantDataEnvelope::decode(&original.encode().unwrap()).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_decode_tolerates_missing_keys() {
        let blob = STANDARD.encode(r#"{"order_id":"A1","purchAmount":500}"#);
        let envelope = MerchantDataEnvelope::decode(&blob).unwrap();
        assert_eq!(envelope.order_id, "A1");
        assert_eq!(envelope.purch_amount, 500);
        assert!(envelope.pan.is_empty());
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            MerchantDataEnvelope::decode("%%%"),
            Err(PaymentError::Envelope(_))
        ));
        let not_json = STANDARD.encode("not json");
        assert!(matches!(
            MerchantDataEnvelope::decode(&not_json),
            Err(PaymentError::Envelope(_))
        ));
    }

    #[test]
    fn test_token_flags() {
        let mut envelope = sample();
        assert!(!envelope.requests_token());

        envelope.ext_token_options = TOKEN_OPTIONS_REQUEST.to_owned();
        assert!(envelope.requests_token());

        envelope.ext_token_options = TOKEN_OPTIONS_USE.to_owned();
        assert!(!envelope.uses_token());
        envelope.ext_token = "tok".to_owned();
        assert!(envelope.uses_token());
    }

    #[test]
    fn test_debug_masks_card() {
        let debug = format!("{:?}", sample());
        assert!(!debug.contains("4111111111111111"));
        assert!(!debug.contains("123"));
    }
}
