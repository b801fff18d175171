//! Card payment orchestration.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use super::{
    authentication::{AuthenticationForm, VerifiedAuthentication, verify_authentication_response},
    envelope::{EnvelopeStore, MerchantDataEnvelope},
    request::TransactionRequest,
    settlement::{
        SUCCESS_STATUSES, SettlementDocument, SettlementResult, parse_settlement_response,
    },
};
use crate::{
    card::CardToken,
    error::{PaymentError, Result},
    fields::FieldList,
    lookup::{CodeLookup, DefaultCodeLookup},
    merchant::MerchantContext,
    transport::Transport,
};

/// Result of the first leg: the authentication server accepted the form.
#[derive(Debug, Clone)]
pub struct AuthenticationStarted {
    /// Merchant order id (generated when the request had none).
    pub order_id: String,
    /// Correlation token the envelope was stored under.
    pub md: String,
    /// The encoded envelope, also handed to the store.
    pub merchant_data: String,
    /// Signed form fields that were posted.
    pub fields: FieldList,
    /// Authentication server page to render to the cardholder.
    pub body: String,
}

/// A verified authentication joined with its order context, ready to settle.
#[derive(Debug)]
pub struct ValidatedTransaction {
    /// Verified authentication callback.
    pub authentication: VerifiedAuthentication,
    /// Order context recorded at the first leg.
    pub envelope: MerchantDataEnvelope,
}

/// Drives the three-step card payment:
///
/// 1. [`begin_authentication`](Self::begin_authentication) signs and posts the
///    3-D Secure form and stores the order envelope under its `MD` token.
/// 2. [`complete_authentication`](Self::complete_authentication) checks the
///    callback's `mdStatus` and signature and recovers the envelope.
/// 3. [`settle`](Self::settle) posts the XML settlement request.
///
/// Each call is one blocking attempt; nothing is retried. A processor holds
/// no per-transaction state, so one instance serves any number of
/// concurrent transactions.
///
/// # Examples
///
/// ```rust,no_run
/// use std::sync::Arc;
///
/// use cardlink_vpos::{
///     fields::FieldList,
///     merchant::{MerchantConfig, MerchantContext},
///     payment::{CardPaymentProcessor, EnvelopeStore},
///     transport::HttpTransport,
/// };
///
/// # fn example(
/// #     store: impl EnvelopeStore,
/// #     callback: FieldList,
/// # ) -> cardlink_vpos::error::Result<()> {
/// let config = MerchantConfig::from_file("merchant.toml")?;
/// let context = Arc::new(MerchantContext::from_config(&config)?);
/// let transport = HttpTransport::with_config(&config.transport)?;
/// let processor = CardPaymentProcessor::new(context, transport, store);
///
/// // Later, when the authentication server posts back:
/// let result = processor.process_authentication_response(&callback)?;
/// if result.is_success() {
///     println!("paid, token: {:?}", result.card_token);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct CardPaymentProcessor<T, S> {
    context: Arc<MerchantContext>,
    transport: T,
    store: S,
    lookup: Arc<dyn CodeLookup>,
}

impl<T: Transport, S: EnvelopeStore> CardPaymentProcessor<T, S> {
    /// Creates a processor using the built-in code table.
    #[must_use]
    pub fn new(context: Arc<MerchantContext>, transport: T, store: S) -> Self {
        Self { context, transport, store, lookup: Arc::new(DefaultCodeLookup) }
    }

    /// Replaces the currency/country code lookup.
    #[must_use]
    pub fn with_lookup(mut self, lookup: Arc<dyn CodeLookup>) -> Self {
        self.lookup = lookup;
        self
    }

    /// Merchant context in use.
    #[must_use]
    pub fn context(&self) -> &MerchantContext {
        &self.context
    }

    /// Signs and posts the 3-D Secure authentication form.
    ///
    /// The envelope is stored before the form is posted, so it is available
    /// whenever the callback arrives.
    ///
    /// # Errors
    ///
    /// - [`PaymentError::InvalidInput`] / [`PaymentError::Config`] if the form cannot be built
    /// - [`PaymentError::Store`] if the envelope cannot be stored
    /// - [`PaymentError::Transport`] if the server does not answer HTTP 200
    /// - [`PaymentError::Http`] if the request cannot be completed
    #[instrument(skip_all, fields(order_id))]
    pub fn begin_authentication(
        &self,
        request: &TransactionRequest,
    ) -> Result<AuthenticationStarted> {
        let form = AuthenticationForm::build(&self.context, self.lookup.as_ref(), request)?;
        tracing::Span::current().record("order_id", form.envelope.order_id.as_str());

        let merchant_data = form.envelope.encode()?;
        self.store.store(&form.md, &merchant_data)?;

        let url = &self.context.endpoints().authentication_url;
        let response = self.transport.post_form(url, form.fields.as_pairs())?;
        response.ensure_ok()?;

        info!(status = response.status, "authentication request accepted");

        Ok(AuthenticationStarted {
            order_id: form.envelope.order_id.clone(),
            md: form.md,
            merchant_data,
            fields: form.fields,
            body: response.body_text(),
        })
    }

    /// Validates the authentication callback and fetches its envelope from the
    /// store by the callback's `MD` value.
    ///
    /// # Errors
    ///
    /// - [`PaymentError::ProtocolRejection`] if `mdStatus` is not accepted
    /// - [`PaymentError::InvalidSignature`] if the callback is not authentic
    /// - [`PaymentError::Envelope`] if no envelope is stored for the `MD` value
    /// - [`PaymentError::Store`] if the store fails
    #[instrument(skip_all)]
    pub fn complete_authentication(&self, callback: &FieldList) -> Result<ValidatedTransaction> {
        let authentication = self.verify(callback)?;
        let md = authentication.md();
        let blob = self
            .store
            .fetch(md)?
            .ok_or_else(|| PaymentError::Envelope(format!("no envelope stored for MD {md}")))?;
        let envelope = MerchantDataEnvelope::decode(&blob)?;
        Ok(ValidatedTransaction { authentication, envelope })
    }

    /// Validates the authentication callback against a caller-supplied
    /// envelope, bypassing the store.
    ///
    /// # Errors
    ///
    /// Same as [`complete_authentication`](Self::complete_authentication),
    /// except for the store failures.
    #[instrument(skip_all)]
    pub fn complete_authentication_with_envelope(
        &self,
        callback: &FieldList,
        merchant_data: &str,
    ) -> Result<ValidatedTransaction> {
        let authentication = self.verify(callback)?;
        let envelope = MerchantDataEnvelope::decode(merchant_data)?;
        Ok(ValidatedTransaction { authentication, envelope })
    }

    fn verify(&self, callback: &FieldList) -> Result<VerifiedAuthentication> {
        let verifier = self.context.credentials().verifier()?;
        verify_authentication_response(callback, verifier)
    }

    /// Posts the settlement request.
    ///
    /// A declined payment is returned as a [`SettlementResult`] whose
    /// [`is_success`](SettlementResult::is_success) is `false`.
    ///
    /// # Errors
    ///
    /// - [`PaymentError::Transport`] if the gateway does not answer HTTP 200
    /// - [`PaymentError::MalformedResponse`] if the answer cannot be read
    /// - [`PaymentError::Http`] if the request cannot be completed
    #[instrument(skip_all, fields(order_id = %transaction.envelope.order_id))]
    pub fn settle(&self, transaction: &ValidatedTransaction) -> Result<SettlementResult> {
        let credentials = self.context.credentials();
        let capture_mode = self.context.settings().capture_mode;
        let document = SettlementDocument::build(
            credentials.merchant_id(),
            credentials.shared_secret(),
            capture_mode,
            &transaction.envelope,
            &transaction.authentication,
            self.context.now(),
        )?;

        let response =
            self.transport.post_xml(&self.context.endpoints().settlement_url, &document.xml)?;
        response.ensure_ok()?;

        let parsed = parse_settlement_response(&response.body_text(), capture_mode)?;
        let success = SUCCESS_STATUSES.contains(&parsed.status.as_str());

        let card_token = if success && transaction.envelope.requests_token() {
            match CardToken::from_gateway_fields(&document.pay_method, &parsed.fields) {
                Ok(token) => Some(token),
                Err(e) => {
                    warn!(error = %e, "tokenization requested but no usable token returned");
                    None
                }
            }
        } else {
            None
        };

        info!(
            status = %parsed.status,
            kind = %parsed.kind,
            tokenized = card_token.is_some(),
            "settlement completed"
        );

        Ok(SettlementResult {
            status: parsed.status,
            order_id: document.order_id,
            fields: parsed.fields,
            card_token,
        })
    }

    /// Validates the callback, recovers the stored envelope and settles.
    ///
    /// # Errors
    ///
    /// Any error of [`complete_authentication`](Self::complete_authentication)
    /// or [`settle`](Self::settle). A rejected or unauthentic callback never
    /// reaches the settlement server.
    pub fn process_authentication_response(
        &self,
        callback: &FieldList,
    ) -> Result<SettlementResult> {
        let transaction = self.complete_authentication(callback)?;
        self.settle(&transaction)
    }

    /// Like [`process_authentication_response`](Self::process_authentication_response)
    /// with a caller-supplied envelope.
    ///
    /// # Errors
    ///
    /// Same as [`process_authentication_response`](Self::process_authentication_response).
    pub fn process_authentication_response_with_envelope(
        &self,
        callback: &FieldList,
        merchant_data: &str,
    ) -> Result<SettlementResult> {
        let transaction = self.complete_authentication_with_envelope(callback, merchant_data)?;
        self.settle(&transaction)
    }
}
