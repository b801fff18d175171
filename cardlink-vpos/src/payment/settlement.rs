//! XML settlement leg.
//!
//! After a successful 3-D Secure authentication the merchant sends the
//! payment itself to the acquirer's XML API. The request is a `VPOS`
//! document holding a `Message` and a `Digest`: base64 SHA-256 over the
//! exact serialised `Message` followed by the shared secret.

use chrono::NaiveDateTime;
use quick_xml::{Reader, events::Event};
use serde::Serialize;

use super::{authentication::VerifiedAuthentication, envelope::MerchantDataEnvelope};
use crate::{
    card::CardToken,
    crypto::secret_digest,
    error::{PaymentError, Result},
    fields::FieldList,
    merchant::CaptureMode,
    util::{decimal_amount, timestamp_24h},
};

/// Namespace of the settlement API.
pub const XMLNS: &str = "http://www.modirum.com/schemas/vposxmlapi41";

/// XML signature namespace declared alongside [`XMLNS`].
pub const XMLNS_NS2: &str = "http://www.w3.org/2000/09/xmldsig#";

/// Settlement message version.
pub const MESSAGE_VERSION: &str = "2.1";

/// Statuses that mean the payment went through.
pub const SUCCESS_STATUSES: [&str; 2] = ["AUTHORIZED", "CAPTURED"];

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct TransactionBody<'a> {
    authentication: MerchantAuthentication<'a>,
    order_info: OrderInfo<'a>,
    payment_info: PaymentInfo<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct MerchantAuthentication<'a> {
    mid: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct OrderInfo<'a> {
    order_id: String,
    order_desc: &'a str,
    order_amount: String,
    currency: &'a str,
    payer_email: &'a str,
    billing_address: BillingAddress<'a>,
}

#[derive(Debug, Serialize)]
struct BillingAddress<'a> {
    country: &'a str,
    city: &'a str,
    zip: &'a str,
    address: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct PaymentInfo<'a> {
    pay_method: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    card_enc_data: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    card_pan: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    card_exp_date: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    card_cvv2: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    card_holder_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    recurring_indicator: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    recurring_parameters: Option<RecurringParameters<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    installment_parameters: Option<InstallmentParameters<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ext_token_options: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ext_token: Option<&'a str>,
    #[serde(rename = "ThreeDSecure")]
    three_d_secure: ThreeDSecure<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct RecurringParameters<'a> {
    ext_recurringfrequency: &'a str,
    ext_recurringenddate: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct InstallmentParameters<'a> {
    ext_installmentoffset: u8,
    ext_installmentperiod: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct ThreeDSecure<'a> {
    enrollment_status: &'a str,
    authentication_status: &'a str,
    #[serde(rename = "CAVV")]
    cavv: &'a str,
    #[serde(rename = "XID")]
    xid: &'a str,
    #[serde(rename = "ECI")]
    eci: &'a str,
    protocol: &'a str,
    attribute: Vec<ThreeDSecureAttribute<'a>>,
}

#[derive(Debug, Serialize)]
struct ThreeDSecureAttribute<'a> {
    #[serde(rename = "@name")]
    name: &'static str,
    #[serde(rename = "$text")]
    value: &'a str,
}

/// Callback fields forwarded as `Attribute` elements, with their wire names.
const THREE_D_SECURE_ATTRIBUTES: [(&str, &str); 5] = [
    ("TDS2.transStatus", "TDS2_transStatus"),
    ("TDS2.threeDSServerTransID", "TDS2_threeDSServerTransID"),
    ("TDS2.dsTransID", "TDS2_dsTransID"),
    ("TDS2.acsTransID", "TDS2_acsTransID"),
    ("TDS2.authenticationType", "TDS2_authenticationType"),
];

/// How the card is identified in the settlement request.
///
/// An encrypted payload wins over a stored token, which wins over plain card
/// details.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardSource<'a> {
    /// Payload from the client-side encoding script.
    Encrypted(&'a str),
    /// Stored gateway token.
    Token(&'a str),
    /// Card number, expiry, security code and holder name.
    Plain,
}

impl<'a> CardSource<'a> {
    /// Selects the card representation recorded in `envelope`.
    #[must_use]
    pub fn of(envelope: &'a MerchantDataEnvelope) -> Self {
        if !envelope.card_enc_data.is_empty() {
            Self::Encrypted(&envelope.card_enc_data)
        } else if envelope.uses_token() {
            Self::Token(&envelope.ext_token)
        } else {
            Self::Plain
        }
    }
}

/// A settlement document ready to post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettlementDocument {
    /// Order id sent to the gateway, unique per attempt.
    pub order_id: String,
    /// Card brand sent as `PayMethod`.
    pub pay_method: String,
    /// Full `VPOS` document.
    pub xml: String,
}

impl SettlementDocument {
    /// Builds the settlement document.
    ///
    /// `PayMethod` is the brand reported by the authentication server,
    /// falling back to the brand recorded at the authentication leg.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::Xml`] if serialisation fails.
    pub fn build(
        merchant_id: &str,
        shared_secret: &str,
        capture_mode: CaptureMode,
        envelope: &MerchantDataEnvelope,
        authentication: &VerifiedAuthentication,
        now: NaiveDateTime,
    ) -> Result<Self> {
        let order_id = format!("{}at{}", envelope.order_id.to_lowercase(), timestamp_24h(now));
        let pay_method = if authentication.card_type().is_empty() {
            envelope.card_type.as_str()
        } else {
            authentication.card_type()
        };

        let source = CardSource::of(envelope);
        let mut payment_info = PaymentInfo {
            pay_method,
            card_enc_data: None,
            card_pan: None,
            card_exp_date: None,
            card_cvv2: None,
            card_holder_name: None,
            recurring_indicator: None,
            recurring_parameters: None,
            installment_parameters: None,
            ext_token_options: None,
            ext_token: None,
            three_d_secure: three_d_secure(authentication),
        };

        match source {
            CardSource::Encrypted(data) => payment_info.card_enc_data = Some(data),
            CardSource::Token(token) => {
                payment_info.ext_token_options = Some(envelope.ext_token_options.as_str());
                payment_info.ext_token = Some(token);
            }
            CardSource::Plain => {
                payment_info.card_pan = Some(&envelope.pan);
                payment_info.card_exp_date = Some(&envelope.expiry);
                payment_info.card_cvv2 = Some(&envelope.cvv);
                payment_info.card_holder_name = Some(&envelope.cardholder_name);
            }
        }
        if envelope.requests_token() {
            payment_info.ext_token_options = Some(envelope.ext_token_options.as_str());
        }

        if !envelope.recur_freq.is_empty() && !envelope.recur_end.is_empty() {
            payment_info.recurring_indicator = Some("R");
            payment_info.recurring_parameters = Some(RecurringParameters {
                ext_recurringfrequency: &envelope.recur_freq,
                ext_recurringenddate: &envelope.recur_end,
            });
        }
        if !envelope.installments.is_empty() {
            payment_info.installment_parameters = Some(InstallmentParameters {
                ext_installmentoffset: 0,
                ext_installmentperiod: &envelope.installments,
            });
        }

        let body = TransactionBody {
            authentication: MerchantAuthentication { mid: merchant_id },
            order_info: OrderInfo {
                order_id: order_id.clone(),
                order_desc: &envelope.description,
                order_amount: decimal_amount(envelope.purch_amount),
                currency: &envelope.currency,
                payer_email: &envelope.cardholder_email,
                billing_address: BillingAddress {
                    country: &envelope.bill_country_alpha2,
                    city: &envelope.bill_city,
                    zip: &envelope.bill_post_code,
                    address: &envelope.bill_line1,
                },
            },
            payment_info,
        };

        let inner = quick_xml::se::to_string_with_root(capture_mode.request_element(), &body)
            .map_err(|e| PaymentError::Xml(e.to_string()))?;
        let message = format!(
            concat!(
                r#"<Message xmlns="{xmlns}" xmlns:ns2="{xmlns_ns2}" version="{version}">"#,
                "{inner}</Message>"
            ),
            xmlns = XMLNS,
            xmlns_ns2 = XMLNS_NS2,
            version = MESSAGE_VERSION,
            inner = inner,
        );
        let digest = secret_digest([message.as_str()], shared_secret);
        let xml = format!(
            concat!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
                r#"<VPOS xmlns="{xmlns}" xmlns:ns2="{xmlns_ns2}">"#,
                "{message}<Digest>{digest}</Digest></VPOS>"
            ),
            xmlns = XMLNS,
            xmlns_ns2 = XMLNS_NS2,
            message = message,
            digest = digest,
        );

        Ok(Self { order_id, pay_method: pay_method.to_owned(), xml })
    }
}

fn three_d_secure(authentication: &VerifiedAuthentication) -> ThreeDSecure<'_> {
    ThreeDSecure {
        enrollment_status: authentication.get("veresEnrolledStatus"),
        authentication_status: authentication.get("paresTxStatus"),
        cavv: authentication.get("cavv"),
        xid: authentication.get("xid"),
        eci: authentication.get("eci"),
        protocol: authentication.get("protocol"),
        attribute: THREE_D_SECURE_ATTRIBUTES
            .iter()
            .map(|&(name, field)| ThreeDSecureAttribute { name, value: authentication.get(field) })
            .collect(),
    }
}

/// Outcome of a settlement request.
///
/// A declined payment is still an `Ok` outcome; use
/// [`ensure_success`](Self::ensure_success) to turn it into an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettlementResult {
    /// Gateway status, e.g. `CAPTURED`, `REFUSED` or `ERROR`.
    pub status: String,
    /// Order id sent to the gateway.
    pub order_id: String,
    /// Every leaf of the gateway response node, in document order.
    pub fields: FieldList,
    /// Token granted for the card, when tokenization was requested.
    pub card_token: Option<CardToken>,
}

impl SettlementResult {
    /// Whether the gateway authorised or captured the payment.
    #[must_use]
    pub fn is_success(&self) -> bool {
        SUCCESS_STATUSES.contains(&self.status.as_str())
    }

    /// Returns `self` if successful.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::ProtocolRejection`] with the gateway status and
    /// description otherwise.
    pub fn ensure_success(self) -> Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(PaymentError::ProtocolRejection {
                message: self.fields.get_or_empty("Description").to_owned(),
                status: self.status,
            })
        }
    }
}

/// The response node of a settlement answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettlementResponse {
    /// Name of the node, the [`CaptureMode::response_element`] of the request.
    pub kind: String,
    /// Gateway status.
    pub status: String,
    /// Leaf fields of the node in document order.
    pub fields: FieldList,
}

const ERROR_NODE: &str = "ErrorMessage";

/// Parses the answer to a settlement sent in `capture_mode`.
///
/// Only the response node matching the request is accepted: a
/// `SaleResponse` for [`CaptureMode::Sale`], an `AuthorisationResponse` for
/// [`CaptureMode::Authorize`].
///
/// # Errors
///
/// Returns [`PaymentError::MalformedResponse`] if the body is not XML, carries
/// an `ErrorMessage` node, or has no matching response node with a `Status`.
pub fn parse_settlement_response(
    body: &str,
    capture_mode: CaptureMode,
) -> Result<SettlementResponse> {
    let expected = capture_mode.response_element();
    let mut reader = Reader::from_str(body);
    reader.trim_text(true);

    let mut path: Vec<String> = Vec::new();
    let mut capture: Option<(String, usize)> = None;
    let mut fields = FieldList::new();
    let mut text = String::new();
    let mut leaf = false;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| PaymentError::MalformedResponse(format!("invalid settlement XML: {e}")))?;
        match event {
            Event::Start(e) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                if capture.is_none()
                    && path.last().is_some_and(|parent| parent == "Message")
                    && (name == expected || name == ERROR_NODE)
                {
                    capture = Some((name.clone(), path.len() + 1));
                }
                path.push(name);
                text.clear();
                leaf = true;
            }
            Event::Empty(e) => {
                if let Some((_, depth)) = &capture
                    && path.len() >= *depth
                {
                    fields.push(String::from_utf8_lossy(e.local_name().as_ref()), "");
                }
                leaf = false;
            }
            Event::Text(t) => {
                let unescaped = t.unescape().map_err(|e| {
                    PaymentError::MalformedResponse(format!("invalid settlement XML: {e}"))
                })?;
                text.push_str(&unescaped);
            }
            Event::CData(c) => text.push_str(&String::from_utf8_lossy(&c.into_inner())),
            Event::End(_) => {
                let name = path.pop().unwrap_or_default();
                if let Some((_, depth)) = &capture {
                    if path.len() < *depth {
                        break;
                    }
                    if leaf {
                        fields.push(name, text.trim());
                    }
                }
                text.clear();
                leaf = false;
            }
            Event::Eof => break,
            _ => {}
        }
    }

    let Some((kind, _)) = capture else {
        return Err(PaymentError::MalformedResponse(format!(
            "no {expected} in settlement answer"
        )));
    };

    if kind == ERROR_NODE {
        let description = fields
            .get("Description")
            .or_else(|| fields.get("ErrorCode"))
            .unwrap_or("unspecified gateway error");
        return Err(PaymentError::MalformedResponse(description.to_owned()));
    }

    let status = fields
        .get("Status")
        .map(str::to_owned)
        .ok_or_else(|| PaymentError::MalformedResponse(format!("{kind} has no Status")))?;

    Ok(SettlementResponse { kind, status, fields })
}
