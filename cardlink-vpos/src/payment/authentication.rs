//! 3-D Secure authentication leg.
//!
//! The merchant posts a signed form to the acquirer's authentication server
//! (MPI), which answers with a page that takes the cardholder through 3-D
//! Secure. The outcome later reaches the merchant as a signed callback. Both
//! signatures cover field values in a fixed order; see
//! [`signature_input`](crate::crypto::signature_input) for the concatenation
//! rule.

use base64::{Engine, engine::general_purpose::STANDARD};
use tracing::{debug, warn};
use uuid::Uuid;

use super::{
    envelope::{MerchantDataEnvelope, TOKEN_OPTIONS_REQUEST, TOKEN_OPTIONS_USE},
    request::{DEFAULT_BILL_COUNTRY, TransactionRequest, non_empty},
};
use crate::{
    card::CardBrand,
    crypto::ResponseVerifier,
    error::{PaymentError, Result},
    fields::FieldList,
    lookup::CodeLookup,
    merchant::{MAX_INSTALLMENTS, MerchantContext},
    util::random_alphanumeric,
};

/// Protocol version sent to the authentication server.
pub const PROTOCOL_VERSION: &str = "4.0";

/// `mdStatus` values that allow the payment to continue: `1` fully
/// authenticated, `4` attempted.
pub const ACCEPTED_MD_STATUSES: [&str; 2] = ["1", "4"];

/// Callback fields covered by the authentication server's signature, in
/// signature order, followed by the signature itself.
pub const RESPONSE_FIELDS: [&str; 39] = [
    "version",
    "merchantID",
    "xid",
    "merchantTxId",
    "mdStatus",
    "mdErrorMsg",
    "veresEnrolledStatus",
    "paresTxStatus",
    "iReqCode",
    "iReqDetail",
    "vendorCode",
    "eci",
    "cavv",
    "cavvAlgorithm",
    "MD",
    "PAResVerified",
    "PAResSyntaxOK",
    "protocol",
    "cardType",
    "fssScore",
    "TDS2_transStatus",
    "TDS2_transStatusReason",
    "TDS2_threeDSServerTransID",
    "TDS2_dsTransID",
    "TDS2_acsTransID",
    "TDS2_acsRenderingType",
    "TDS2_acsReferenceNumber",
    "TDS2_acsSignedContent",
    "TDS2_authTimestamp",
    "TDS2_messageVersion",
    "TDS2_acsChallengeMandated",
    "TDS2_authenticationType",
    "TDS2_acsOperatorID",
    "TDS2_cardholderInfo",
    "TDS2_acsUrl",
    "TDS2_challengeCancel",
    "TDS2_AResExtensions",
    "TDS2_RReqExtensions",
    "signature",
];

const ORDER_ID_LENGTH: usize = 20;
const XID_SOURCE_LENGTH: usize = 20;
const MERCHANT_TX_ID_LENGTH: usize = 40;

/// A signed authentication form together with the envelope to persist.
#[derive(Debug)]
pub struct AuthenticationForm {
    /// Correlation token (`MD`) under which the envelope must be stored.
    pub md: String,
    /// Order context needed by the settlement leg.
    pub envelope: MerchantDataEnvelope,
    /// Form fields in wire order, ending with `signature`.
    pub fields: FieldList,
}

impl AuthenticationForm {
    /// Builds and signs the authentication form for `request`.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::InvalidInput`] for invalid transaction data or
    /// unknown currency/country codes, and [`PaymentError::Config`] when the
    /// card callback routes or the private key are not configured.
    pub fn build(
        context: &MerchantContext,
        lookup: &dyn CodeLookup,
        request: &TransactionRequest,
    ) -> Result<Self> {
        request.validate()?;
        let settings = context.settings();
        let routes = context.routes();
        let credentials = context.credentials();

        if request.tokenize && !settings.tokenization {
            return Err(PaymentError::InvalidInput(
                "card tokenization is not enabled for this merchant".to_owned(),
            ));
        }
        if let Some(installments) = request.installments
            && installments > MAX_INSTALLMENTS
        {
            return Err(PaymentError::InvalidInput(format!(
                "installments must be at most {MAX_INSTALLMENTS}"
            )));
        }

        let ok_url = routes.require("card_success_url", routes.card_success_url.as_deref())?;
        let fail_url = routes.require("card_failure_url", routes.card_failure_url.as_deref())?;
        let signer = credentials.signer()?;

        let order_id = non_empty(request.order_id.as_deref())
            .map_or_else(|| random_alphanumeric(ORDER_ID_LENGTH), str::to_owned);
        let currency = lookup.require_currency(
            non_empty(request.currency.as_deref()).unwrap_or(&settings.currency),
        )?;
        let country = lookup.require_country(
            non_empty(request.bill_country.as_deref()).unwrap_or(DEFAULT_BILL_COUNTRY),
        )?;

        let (pan, expiry, cvv) = request.card.as_ref().map_or_else(Default::default, |card| {
            (
                card.pan.chars().filter(|c| !c.is_whitespace()).collect::<String>(),
                card.expiry.trim().to_owned(),
                card.cvv.trim().to_owned(),
            )
        });
        let card_enc_data = request.encrypted_card().unwrap_or_default();
        let token = request.token();
        let card_type = resolve_card_type(request.card_type.as_deref(), &pan);
        let md = STANDARD.encode(Uuid::new_v4().to_string());

        let mut fields = FieldList::new();
        fields.push("version", PROTOCOL_VERSION);
        fields.push("pan", pan.as_str());
        fields.push("expiry", expiry.as_str());
        fields.push("cardEncData", card_enc_data);
        fields.push(
            "deviceCategory",
            non_empty(request.device_category.as_deref()).unwrap_or("0"),
        );
        fields.push("purchAmount", request.amount.to_string());
        fields.push("exponent", "2");
        fields.push("description", request.description.as_str());
        fields.push("currency", currency.numeric.as_str());
        fields.push("merchantID", credentials.merchant_id());
        fields.push("xid", STANDARD.encode(random_alphanumeric(XID_SOURCE_LENGTH)));
        fields.push("merchantTxId", random_alphanumeric(MERCHANT_TX_ID_LENGTH));
        fields.push("okUrl", ok_url);
        fields.push("failUrl", fail_url);
        fields.push("MD", md.as_str());

        if let Some((frequency, end)) = request.recurring() {
            fields.push("recurFreq", frequency);
            fields.push("recurEnd", end);
        } else if let Some(installments) = request.installments {
            fields.push("installments", installments.to_string());
        }

        if let Some(token) = token {
            fields.set("pan", token);
            fields.push("panMode", "VPOSToken");
        }

        fields.push("TDS2.cardholderName", request.cardholder_name.as_str());
        fields.push("TDS2.email", request.cardholder_email.as_str());
        fields.push("TDS2.billAddrCity", request.bill_city.as_str());
        fields.push("TDS2.billAddrCountry", country.numeric.as_str());
        fields.push("TDS2.billAddrLine1", request.bill_line1.as_str());
        fields.push("TDS2.billAddrPostCode", request.bill_post_code.as_str());

        let signature = signer.sign(fields.values())?;
        fields.push("signature", signature);

        let ext_token_options = if token.is_some() {
            TOKEN_OPTIONS_USE
        } else if request.tokenize {
            TOKEN_OPTIONS_REQUEST
        } else {
            ""
        };

        let mut envelope = MerchantDataEnvelope::default();
        envelope.order_id = order_id;
        envelope.pan = pan;
        envelope.card_type = card_type;
        envelope.expiry = expiry;
        envelope.cvv = cvv;
        envelope.card_enc_data = card_enc_data.to_owned();
        envelope.purch_amount = request.amount;
        envelope.currency = currency.alpha3;
        envelope.description = request.description.clone();
        envelope.cardholder_name = request.cardholder_name.clone();
        envelope.cardholder_email = request.cardholder_email.clone();
        envelope.bill_city = request.bill_city.clone();
        envelope.bill_country_num = country.numeric;
        envelope.bill_country_alpha2 = country.alpha2;
        envelope.bill_line1 = request.bill_line1.clone();
        envelope.bill_post_code = request.bill_post_code.clone();
        if let Some(frequency) = non_empty(request.recur_freq.as_deref()) {
            envelope.recur_freq = frequency.to_owned();
        }
        if let Some(end) = non_empty(request.recur_end.as_deref()) {
            envelope.recur_end = end.to_owned();
        }
        if let Some(installments) = request.installments {
            envelope.installments = installments.to_string();
        }
        envelope.ext_token_options = ext_token_options.to_owned();
        envelope.ext_token = token.unwrap_or_default().to_owned();

        debug!(
            order_id = %envelope.order_id,
            field_count = fields.len(),
            token_mode = token.is_some(),
            "authentication form signed"
        );

        Ok(Self { md, envelope, fields })
    }
}

fn resolve_card_type(given: Option<&str>, pan: &str) -> String {
    match non_empty(given) {
        Some(given) => {
            given.parse::<CardBrand>().map_or_else(|()| given.to_owned(), |b| b.name().to_owned())
        }
        None => CardBrand::from_pan(pan).map(|b| b.name().to_owned()).unwrap_or_default(),
    }
}

/// An authentication callback whose signature has been verified.
///
/// Only obtainable through [`verify_authentication_response`], so holding one
/// proves the 3-D Secure outcome came from the processor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedAuthentication {
    fields: FieldList,
    card_type: String,
}

impl VerifiedAuthentication {
    #[cfg(test)]
    pub(crate) fn for_tests(fields: FieldList, card_type: &str) -> Self {
        Self { fields, card_type: card_type.to_owned() }
    }

    /// The signed callback fields that were present, in signature order.
    #[must_use]
    pub const fn fields(&self) -> &FieldList {
        &self.fields
    }

    /// Value of a callback field, or `""` when absent.
    #[must_use]
    pub fn get(&self, name: &str) -> &str {
        self.fields.get_or_empty(name)
    }

    /// The `MD` correlation token.
    #[must_use]
    pub fn md(&self) -> &str {
        self.get("MD")
    }

    /// The accepted `mdStatus`.
    #[must_use]
    pub fn md_status(&self) -> &str {
        self.get("mdStatus")
    }

    /// Card brand name mapped from the numeric `cardType`, or `""`.
    #[must_use]
    pub fn card_type(&self) -> &str {
        &self.card_type
    }
}

/// Validates the authentication server's callback.
///
/// The `mdStatus` check comes first, so a rejected authentication is reported
/// even when the callback is not signed. The signature then covers the
/// present fields of [`RESPONSE_FIELDS`] except `signature`, in that order.
///
/// # Errors
///
/// - [`PaymentError::ProtocolRejection`] if `mdStatus` is not `1` or `4`
/// - [`PaymentError::InvalidSignature`] if the signature is missing or wrong
pub fn verify_authentication_response(
    callback: &FieldList,
    verifier: &ResponseVerifier,
) -> Result<VerifiedAuthentication> {
    let md_status = callback.get_or_empty("mdStatus");
    if !ACCEPTED_MD_STATUSES.contains(&md_status) {
        let message = callback.get_or_empty("mdErrorMsg");
        warn!(md_status, message, "authentication not completed");
        return Err(PaymentError::ProtocolRejection {
            status: md_status.to_owned(),
            message: message.to_owned(),
        });
    }

    let fields: FieldList = RESPONSE_FIELDS
        .iter()
        .filter_map(|&name| callback.get(name).map(|value| (name, value)))
        .collect();

    let Some(signature) = fields.get("signature") else {
        warn!("authentication response carries no signature");
        return Err(PaymentError::InvalidSignature);
    };

    let signed = fields.iter().filter(|(name, _)| *name != "signature").map(|(_, value)| value);
    if !verifier.verify(signed, signature) {
        return Err(PaymentError::InvalidSignature);
    }

    let raw_card_type = fields.get_or_empty("cardType").trim();
    let card_type = raw_card_type
        .parse::<u8>()
        .ok()
        .and_then(CardBrand::from_id)
        .map_or_else(|| raw_card_type.to_ascii_lowercase(), |b| b.name().to_owned());

    debug!(md_status, card_type = %card_type, "authentication response verified");
    Ok(VerifiedAuthentication { fields, card_type })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        crypto::RequestSigner,
        lookup::DefaultCodeLookup,
        merchant::{
            Acquirer, EndpointTable, Environment, MerchantCredentials, PaymentSettings,
            RouteSettings,
        },
        payment::CardDetails,
    };

    const MERCHANT_KEY: &str = include_str!("../../tests/fixtures/merchant_key.pem");
    const PROCESSOR_CERT: &str = include_str!("../../tests/fixtures/processor_cert.pem");

    fn context(tokenization: bool) -> MerchantContext {
        let credentials = MerchantCredentials::new(
            "0020000000",
            "Cardlink1",
            Some(RequestSigner::from_pem(MERCHANT_KEY).unwrap()),
            Some(ResponseVerifier::from_pem(PROCESSOR_CERT).unwrap()),
            "",
        );
        let routes = RouteSettings {
            card_success_url: Some("https://shop.example.com/ok".to_owned()),
            card_failure_url: Some("https://shop.example.com/fail".to_owned()),
            ..RouteSettings::default()
        };
        let endpoints = EndpointTable::builtin()
            .get(Acquirer::Cardlink, Environment::Sandbox)
            .unwrap()
            .clone();
        MerchantContext::new(
            credentials,
            PaymentSettings { tokenization, ..PaymentSettings::default() },
            routes,
            endpoints,
        )
    }

    fn request() -> TransactionRequest {
        TransactionRequest {
            order_id: Some("ORD-1".to_owned()),
            amount: 1050,
            description: "Order ORD-1".to_owned(),
            card: Some(CardDetails::new("4111 1111 1111 1111", "2812", "123")),
            cardholder_name: "Maria Papadopoulou".to_owned(),
            cardholder_email: "maria@example.com".to_owned(),
            bill_city: "Athens".to_owned(),
            bill_country: Some("GR".to_owned()),
            bill_line1: "Ermou 1".to_owned(),
            bill_post_code: "10563".to_owned(),
            ..TransactionRequest::default()
        }
    }

    fn names(fields: &FieldList) -> Vec<&str> {
        fields.iter().map(|(name, _)| name).collect()
    }

    #[test]
    fn test_form_field_order() {
        let form = AuthenticationForm::build(&context(false), &DefaultCodeLookup, &request())
            .unwrap();

        assert_eq!(
            names(&form.fields),
            [
                "version",
                "pan",
                "expiry",
                "cardEncData",
                "deviceCategory",
                "purchAmount",
                "exponent",
                "description",
                "currency",
                "merchantID",
                "xid",
                "merchantTxId",
                "okUrl",
                "failUrl",
                "MD",
                "TDS2.cardholderName",
                "TDS2.email",
                "TDS2.billAddrCity",
                "TDS2.billAddrCountry",
                "TDS2.billAddrLine1",
                "TDS2.billAddrPostCode",
                "signature",
            ]
        );
        assert_eq!(form.fields.get("pan"), Some("4111111111111111"));
        assert_eq!(form.fields.get("currency"), Some("978"));
        assert_eq!(form.fields.get("TDS2.billAddrCountry"), Some("300"));
        assert_eq!(form.fields.get("deviceCategory"), Some("0"));
        assert_eq!(form.fields.get("merchantTxId").unwrap().len(), 40);
        assert_eq!(form.fields.get("MD"), Some(form.md.as_str()));
    }

    #[test]
    fn test_form_signature_verifies_with_processor_key() {
        let form = AuthenticationForm::build(&context(false), &DefaultCodeLookup, &request())
            .unwrap();
        let verifier = ResponseVerifier::from_pem(PROCESSOR_CERT).unwrap();

        let signature = form.fields.get("signature").unwrap();
        let signed = form.fields.iter().filter(|(n, _)| *n != "signature").map(|(_, v)| v);
        assert!(verifier.verify(signed, signature));
    }

    #[test]
    fn test_envelope_contents() {
        let form = AuthenticationForm::build(&context(false), &DefaultCodeLookup, &request())
            .unwrap();
        let envelope = &form.envelope;

        assert_eq!(envelope.order_id, "ORD-1");
        assert_eq!(envelope.card_type, "visa");
        assert_eq!(envelope.currency, "EUR");
        assert_eq!(envelope.bill_country_alpha2, "GR");
        assert_eq!(envelope.bill_country_num, "300");
        assert_eq!(envelope.purch_amount, 1050);
        assert!(envelope.ext_token_options.is_empty());
    }

    #[test]
    fn test_generated_order_id() {
        let request = TransactionRequest { order_id: None, ..request() };
        let form = AuthenticationForm::build(&context(false), &DefaultCodeLookup, &request)
            .unwrap();
        assert_eq!(form.envelope.order_id.len(), 20);
        assert!(form.envelope.order_id.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_token_replaces_pan_in_place() {
        let request = TransactionRequest {
            card: None,
            ext_token: Some("tok_abc".to_owned()),
            ..request()
        };
        let form = AuthenticationForm::build(&context(false), &DefaultCodeLookup, &request)
            .unwrap();

        assert_eq!(names(&form.fields)[1], "pan");
        assert_eq!(form.fields.get("pan"), Some("tok_abc"));
        assert_eq!(form.fields.get("panMode"), Some("VPOSToken"));
        assert_eq!(form.envelope.ext_token_options, "110");
        assert_eq!(form.envelope.ext_token, "tok_abc");
    }

    #[test]
    fn test_recurring_takes_precedence_over_installments() {
        let request = TransactionRequest {
            recur_freq: Some("30".to_owned()),
            recur_end: Some("20301231".to_owned()),
            installments: Some(3),
            ..request()
        };
        let form = AuthenticationForm::build(&context(false), &DefaultCodeLookup, &request)
            .unwrap();

        assert_eq!(form.fields.get("recurFreq"), Some("30"));
        assert_eq!(form.fields.get("installments"), None);
        assert_eq!(form.envelope.installments, "3");
    }

    #[test]
    fn test_tokenization_requires_merchant_setting() {
        let request = TransactionRequest { tokenize: true, ..request() };
        let err = AuthenticationForm::build(&context(false), &DefaultCodeLookup, &request)
            .unwrap_err();
        assert!(matches!(err, PaymentError::InvalidInput(_)));

        let form = AuthenticationForm::build(&context(true), &DefaultCodeLookup, &request)
            .unwrap();
        assert_eq!(form.envelope.ext_token_options, "100");
    }

    #[test]
    fn test_unknown_currency_rejected() {
        let request = TransactionRequest { currency: Some("XXX".to_owned()), ..request() };
        let err = AuthenticationForm::build(&context(false), &DefaultCodeLookup, &request)
            .unwrap_err();
        assert!(err.to_string().contains("XXX"));
    }

    #[test]
    fn test_missing_routes_rejected() {
        let base = context(false);
        let context = MerchantContext::new(
            MerchantCredentials::new(
                "0020000000",
                "Cardlink1",
                Some(RequestSigner::from_pem(MERCHANT_KEY).unwrap()),
                None,
                "",
            ),
            PaymentSettings::default(),
            RouteSettings::default(),
            base.endpoints().clone(),
        );
        let err = AuthenticationForm::build(&context, &DefaultCodeLookup, &request()).unwrap_err();
        assert!(matches!(err, PaymentError::Config(_)));
    }

    #[test]
    fn test_rejected_md_status() {
        let verifier = ResponseVerifier::from_pem(PROCESSOR_CERT).unwrap();
        let callback: FieldList =
            [("mdStatus", "2"), ("mdErrorMsg", "Not enrolled")].into_iter().collect();

        let err = verify_authentication_response(&callback, &verifier).unwrap_err();
        assert!(matches!(
            err,
            PaymentError::ProtocolRejection { ref status, ref message }
                if status == "2" && message == "Not enrolled"
        ));
    }

    #[test]
    fn test_unsigned_callback_rejected() {
        let verifier = ResponseVerifier::from_pem(PROCESSOR_CERT).unwrap();
        let callback: FieldList = [("mdStatus", "1"), ("MD", "abc")].into_iter().collect();

        let err = verify_authentication_response(&callback, &verifier).unwrap_err();
        assert!(matches!(err, PaymentError::InvalidSignature));
    }

    #[test]
    fn test_signed_callback_verified() {
        let signer = RequestSigner::from_pem(MERCHANT_KEY).unwrap();
        let verifier = ResponseVerifier::from_pem(PROCESSOR_CERT).unwrap();
        // Order of the callback does not matter, signature order does.
        let mut callback: FieldList = [
            ("MD", "bWQ="),
            ("cardType", "2"),
            ("mdStatus", "1"),
            ("unrelated", "ignored"),
            ("version", "4.0"),
            ("eci", "05"),
        ]
        .into_iter()
        .collect();
        let signature = signer.sign(["4.0", "1", "05", "bWQ=", "2"]).unwrap();
        callback.push("signature", signature);

        let verified = verify_authentication_response(&callback, &verifier).unwrap();
        assert_eq!(verified.card_type(), "mastercard");
        assert_eq!(verified.md(), "bWQ=");
        assert_eq!(verified.md_status(), "1");
        assert_eq!(verified.get("unrelated"), "");
    }
}
