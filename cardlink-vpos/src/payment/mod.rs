//! Card payments with 3-D Secure.
//!
//! A card payment moves through these states:
//!
//! ```text
//! INIT ──begin_authentication──▶ AUTH_REQUESTED
//!      ──complete_authentication──▶ AUTH_VALIDATED (ValidatedTransaction)
//!      ──settle──▶ SETTLED | FAILED (SettlementResult)
//! ```
//!
//! Between the first two steps the cardholder's browser visits the
//! authentication server, so the order context travels outside the crate in
//! a [`MerchantDataEnvelope`] kept by an [`EnvelopeStore`].
//!
//! The state transitions are enforced by types: settlement needs a
//! [`ValidatedTransaction`], which only exists once `mdStatus` was accepted
//! and the callback signature verified.

mod authentication;
mod envelope;
mod orchestrator;
mod request;
mod settlement;

pub use authentication::{
    ACCEPTED_MD_STATUSES, AuthenticationForm, PROTOCOL_VERSION, RESPONSE_FIELDS,
    VerifiedAuthentication, verify_authentication_response,
};
pub use envelope::{EnvelopeStore, MerchantDataEnvelope, TOKEN_OPTIONS_REQUEST, TOKEN_OPTIONS_USE};
pub use orchestrator::{AuthenticationStarted, CardPaymentProcessor, ValidatedTransaction};
pub use request::{CardDetails, DEFAULT_BILL_COUNTRY, TransactionRequest};
pub use settlement::{
    CardSource, MESSAGE_VERSION, SUCCESS_STATUSES, SettlementDocument, SettlementResponse,
    SettlementResult, XMLNS, XMLNS_NS2, parse_settlement_response,
};
