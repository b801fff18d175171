//! IRIS and `PayPal` redirect payments.
//!
//! Both methods are one-shot: the merchant sends the customer's browser to
//! the gateway's redirect endpoint with a digest-protected form, and the
//! gateway later posts the outcome back, again with a digest.
//!
//! The two digests are computed differently and must stay that way:
//!
//! - **request**: every value is HTML-escaped before concatenation
//!   ([`escape_special_chars`]), then the shared secret is appended;
//! - **callback**: the raw values are concatenated in the order received,
//!   skipping `digest`, then the shared secret is appended.
//!
//! In both cases the digest is base64 SHA-256 ([`secret_digest`]).

mod form;

use std::{fmt, str::FromStr, sync::Arc};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

pub use form::auto_submit_form;

use crate::{
    crypto::secret_digest,
    error::{PaymentError, Result},
    fields::FieldList,
    lookup::{CodeLookup, DefaultCodeLookup},
    merchant::MerchantContext,
    payment::SUCCESS_STATUSES,
    reference::generate_reference_code,
    util::{decimal_amount, random_alphanumeric, timestamp_12h},
};

/// Redirect protocol version.
pub const REDIRECT_VERSION: &str = "2";

const ORDER_ID_LENGTH: usize = 7;
const DEFAULT_BILL_COUNTRY: &str = "GR";

/// Redirect payment method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RedirectMethod {
    /// IRIS instant interbank transfer.
    Iris,
    /// `PayPal` wallet.
    PayPal,
}

impl RedirectMethod {
    /// `payMethod` value sent to the gateway.
    #[must_use]
    pub const fn pay_method(self) -> &'static str {
        match self {
            Self::Iris => "IRIS",
            Self::PayPal => "PayPalREST",
        }
    }
}

impl fmt::Display for RedirectMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Iris => "iris",
            Self::PayPal => "paypal",
        })
    }
}

impl FromStr for RedirectMethod {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "iris" => Ok(Self::Iris),
            "paypal" | "paypalrest" => Ok(Self::PayPal),
            other => Err(PaymentError::InvalidInput(format!("unknown redirect method: {other}"))),
        }
    }
}

/// A redirect payment as requested by the storefront.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RedirectPaymentRequest {
    /// Merchant order id; 7 random lowercase characters when absent.
    pub order_id: Option<String>,
    /// Amount in minor units.
    pub amount: u64,
    /// Currency, alphabetic or numeric; the configured currency when absent.
    pub currency: Option<String>,
    /// Payment page language; the configured language when absent.
    pub language: Option<String>,
    /// Payer email.
    pub payer_email: String,
    /// Billing country, alphabetic or numeric; Greece when absent.
    pub bill_country: Option<String>,
    /// Billing postal code.
    pub bill_zip: String,
    /// Billing city.
    pub bill_city: String,
    /// Billing address.
    pub bill_address: String,
}

/// A signed redirect request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectRequest {
    /// Gateway redirect endpoint.
    pub endpoint: String,
    /// Merchant order id used for this request.
    pub order_id: String,
    /// Form fields in wire order, ending with `digest`.
    pub fields: FieldList,
    /// Self-submitting HTML form posting `fields` to `endpoint`.
    pub form_html: String,
}

/// Verified outcome of a redirect payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectOutcome {
    /// Gateway status, passed through unchanged.
    pub status: String,
    /// Callback fields as received.
    pub fields: FieldList,
}

impl RedirectOutcome {
    /// Whether the payment was authorised or captured.
    #[must_use]
    pub fn is_success(&self) -> bool {
        SUCCESS_STATUSES.contains(&self.status.as_str())
    }

    /// Returns `self` if successful.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::ProtocolRejection`] carrying the status and the
    /// gateway message otherwise.
    pub fn ensure_success(self) -> Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(PaymentError::ProtocolRejection {
                message: self.fields.get_or_empty("message").to_owned(),
                status: self.status,
            })
        }
    }
}

/// Escapes `&`, `"`, `'`, `<` and `>` as HTML entities.
///
/// This is the exact transformation the gateway applies to request values
/// before checking the digest, so it must not be replaced by a general
/// purpose encoder.
///
/// # Examples
///
/// ```
/// use cardlink_vpos::redirect::escape_special_chars;
///
/// assert_eq!(
///     escape_special_chars(r#"Tom & "Jerry's" <b>"#),
///     "Tom &amp; &quot;Jerry&#039;s&quot; &lt;b&gt;"
/// );
/// ```
#[must_use]
pub fn escape_special_chars(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#039;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            c => escaped.push(c),
        }
    }
    escaped
}

/// Digest of an outgoing redirect request.
#[must_use]
pub fn request_digest(fields: &FieldList, shared_secret: &str) -> String {
    secret_digest(fields.values().map(escape_special_chars), shared_secret)
}

/// Digest of a gateway callback: raw values, except `digest`, in the order
/// received.
#[must_use]
pub fn callback_digest(fields: &FieldList, shared_secret: &str) -> String {
    secret_digest(
        fields.iter().filter(|(name, _)| *name != "digest").map(|(_, value)| value),
        shared_secret,
    )
}

/// Builds redirect requests and verifies their callbacks.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use cardlink_vpos::{
///     merchant::{MerchantConfig, MerchantContext},
///     redirect::{RedirectMethod, RedirectPaymentRequest, RedirectPayments},
/// };
///
/// let config = MerchantConfig::from_toml(
///     r#"
///     [merchant]
///     merchant_id = "0020000000"
///     shared_secret = "Cardlink1"
///
///     [routes]
///     paypal_confirm_url = "https://shop.example.com/paypal/ok"
///     paypal_cancel_url = "https://shop.example.com/paypal/cancel"
///     "#,
/// )
/// .unwrap();
/// let payments = RedirectPayments::new(Arc::new(MerchantContext::from_config(&config).unwrap()));
///
/// let request = RedirectPaymentRequest { amount: 1999, ..RedirectPaymentRequest::default() };
/// let signed = payments.build_request(RedirectMethod::PayPal, &request).unwrap();
/// assert_eq!(signed.fields.get("payMethod"), Some("PayPalREST"));
/// assert_eq!(signed.fields.get("orderAmount"), Some("19.99"));
/// ```
#[derive(Debug, Clone)]
pub struct RedirectPayments {
    context: Arc<MerchantContext>,
    lookup: Arc<dyn CodeLookup>,
}

impl RedirectPayments {
    /// Creates the flow using the built-in code table.
    #[must_use]
    pub fn new(context: Arc<MerchantContext>) -> Self {
        Self { context, lookup: Arc::new(DefaultCodeLookup) }
    }

    /// Replaces the currency/country code lookup.
    #[must_use]
    pub fn with_lookup(mut self, lookup: Arc<dyn CodeLookup>) -> Self {
        self.lookup = lookup;
        self
    }

    /// Builds and signs a redirect request stamped with the current time in the
    /// configured `payment.timezone`.
    ///
    /// # Errors
    ///
    /// See [`build_request_at`](Self::build_request_at).
    pub fn build_request(
        &self,
        method: RedirectMethod,
        request: &RedirectPaymentRequest,
    ) -> Result<RedirectRequest> {
        self.build_request_at(method, request, self.context.now())
    }

    /// Builds and signs a redirect request stamped with `now`.
    ///
    /// # Errors
    ///
    /// - [`PaymentError::InvalidInput`] for a zero amount, unknown codes, or
    ///   (IRIS) an unusable customer code
    /// - [`PaymentError::Config`] if the confirm/cancel routes for `method`
    ///   are not configured
    #[instrument(skip_all, fields(method = %method))]
    pub fn build_request_at(
        &self,
        method: RedirectMethod,
        request: &RedirectPaymentRequest,
        now: NaiveDateTime,
    ) -> Result<RedirectRequest> {
        if request.amount == 0 {
            return Err(PaymentError::InvalidInput("amount must be positive".to_owned()));
        }

        let settings = self.context.settings();
        let routes = self.context.routes();
        let credentials = self.context.credentials();

        let (confirm_url, cancel_url) = match method {
            RedirectMethod::Iris => (
                routes.require("iris_confirm_url", routes.iris_confirm_url.as_deref())?,
                routes.require("iris_cancel_url", routes.iris_cancel_url.as_deref())?,
            ),
            RedirectMethod::PayPal => (
                routes.require("paypal_confirm_url", routes.paypal_confirm_url.as_deref())?,
                routes.require("paypal_cancel_url", routes.paypal_cancel_url.as_deref())?,
            ),
        };

        let order_id = non_empty(request.order_id.as_deref())
            .map_or_else(|| random_alphanumeric(ORDER_ID_LENGTH).to_lowercase(), str::to_owned);
        let currency = self.lookup.require_currency(
            non_empty(request.currency.as_deref()).unwrap_or(&settings.currency),
        )?;
        let country = self.lookup.require_country(
            non_empty(request.bill_country.as_deref()).unwrap_or(DEFAULT_BILL_COUNTRY),
        )?;

        let order_desc = match method {
            RedirectMethod::Iris => {
                generate_reference_code(credentials.customer_code(), &order_id, request.amount)?
            }
            RedirectMethod::PayPal => order_id.clone(),
        };
        let css_url = non_empty(routes.stylesheet_url.as_deref())
            .unwrap_or(&self.context.endpoints().stylesheet_url);

        let mut fields = FieldList::new();
        fields.push("version", REDIRECT_VERSION);
        fields.push("mid", credentials.merchant_id());
        fields.push("lang", non_empty(request.language.as_deref()).unwrap_or(&settings.language));
        fields.push("orderid", format!("{order_id}at{}", timestamp_12h(now)));
        fields.push("orderDesc", order_desc);
        fields.push("orderAmount", decimal_amount(request.amount));
        fields.push("currency", currency.alpha3);
        fields.push("payerEmail", request.payer_email.as_str());
        fields.push("billCountry", country.alpha2);
        fields.push("billZip", request.bill_zip.as_str());
        fields.push("billCity", request.bill_city.as_str());
        fields.push("billAddress", request.bill_address.as_str());
        fields.push("payMethod", method.pay_method());
        fields.push("cssUrl", css_url);
        fields.push("confirmUrl", confirm_url);
        fields.push("cancelUrl", cancel_url);

        let digest = request_digest(&fields, credentials.shared_secret());
        fields.push("digest", digest);

        let endpoint = self.context.endpoints().redirect_url.clone();
        let form_html = auto_submit_form(&endpoint, &fields);

        info!(order_id = %order_id, "redirect request signed");

        Ok(RedirectRequest { endpoint, order_id, fields, form_html })
    }

    /// Verifies a gateway callback.
    ///
    /// A declined payment with a valid digest is an `Ok` outcome whose
    /// [`is_success`](RedirectOutcome::is_success) is `false`.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::InvalidDigest`] if the digest is missing or does
    /// not match.
    #[instrument(skip_all)]
    pub fn process_callback(&self, fields: &FieldList) -> Result<RedirectOutcome> {
        let expected = callback_digest(fields, self.context.credentials().shared_secret());
        if fields.get("digest") != Some(expected.as_str()) {
            warn!("redirect callback digest mismatch");
            return Err(PaymentError::InvalidDigest);
        }

        let status = fields.get_or_empty("status").to_owned();
        debug!(status = %status, "redirect callback verified");
        Ok(RedirectOutcome { status, fields: fields.clone() })
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
