//! Cardlink VPOS: merchant-side client for the Cardlink family of payment
//! gateways (Cardlink, Nexi, Worldline).
//!
//! The crate covers the three ways a storefront takes money through the
//! gateway:
//!
//! - **Card payments** ([`payment`]): a signed 3-D Secure authentication form,
//!   a signed callback, then an XML settlement request protected by a shared
//!   secret digest. Optionally the card is tokenised for later reuse.
//! - **IRIS** interbank transfers and **`PayPal`** ([`redirect`]): the
//!   customer is redirected to the gateway with a digest-protected form and
//!   the gateway posts the outcome back.
//! - **Client-side card encoding** ([`script`]): the signed URL of the
//!   acquirer's card-encryption script.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐  begin_authentication   ┌───────────────────────┐
//! │                  │────────── form ────────▶│  3-D Secure server    │
//! │   Storefront     │◀──────── callback ──────│  (signed response)    │
//! │                  │                         └───────────────────────┘
//! │  CardPayment-    │  settle                 ┌───────────────────────┐
//! │  Processor       │────────── XML ─────────▶│  Settlement API       │
//! │                  │◀──────── XML ───────────│  (digest protected)   │
//! │  RedirectPayments│                         └───────────────────────┘
//! │                  │  browser redirect       ┌───────────────────────┐
//! │                  │────────── form ────────▶│  IRIS / PayPal page   │
//! │                  │◀──────── callback ──────│  (digest protected)   │
//! └──────────────────┘                         └───────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use cardlink_vpos::{
//!     merchant::{MerchantConfig, MerchantContext},
//!     redirect::{RedirectMethod, RedirectPaymentRequest, RedirectPayments},
//! };
//!
//! # fn example() -> cardlink_vpos::Result<()> {
//! let config = MerchantConfig::from_file("merchant.toml")?;
//! let context = Arc::new(MerchantContext::from_config(&config)?);
//!
//! let payments = RedirectPayments::new(context);
//! let request = RedirectPaymentRequest {
//!     order_id: Some("1001".to_owned()),
//!     amount: 2500,
//!     payer_email: "buyer@example.com".to_owned(),
//!     ..RedirectPaymentRequest::default()
//! };
//! let signed = payments.build_request(RedirectMethod::Iris, &request)?;
//! println!("{}", signed.form_html);
//! # Ok(())
//! # }
//! ```
//!
//! # Module Organization
//!
//! - [`merchant`]: configuration, credentials and the acquirer endpoint table
//! - [`crypto`]: RSA-SHA256 signatures and shared-secret digests
//! - [`payment`]: the card payment state machine
//! - [`redirect`]: IRIS and `PayPal` redirect flows
//! - [`reference`]: RF creditor reference codes for IRIS
//! - [`card`]: card brands and tokens
//! - [`script`]: client-side card-encoding script
//! - [`transport`]: blocking HTTP transport abstraction
//! - [`error`]: error types
//!
//! # Security Considerations
//!
//! - The shared secret, private key, PAN and CVV are wiped from memory on
//!   drop and never logged; `Debug` output masks them.
//! - Only `https` endpoints are contacted.
//! - Callbacks are authenticated before anything else is done with them.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![allow(
    clippy::multiple_crate_versions,
    reason = "transitive dependencies from reqwest and x509-parser"
)]

pub mod card;
pub mod crypto;
pub mod error;
pub mod fields;
pub mod lookup;
pub mod merchant;
pub mod payment;
pub mod redirect;
pub mod reference;
pub mod script;
pub mod transport;
pub mod util;

pub use error::{PaymentError, Result};
pub use fields::FieldList;
pub use merchant::{MerchantConfig, MerchantContext};
pub use payment::CardPaymentProcessor;
pub use redirect::RedirectPayments;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_exports() {
        let _ = std::marker::PhantomData::<PaymentError>;
        let _ = std::marker::PhantomData::<CardPaymentProcessor<(), ()>>;
    }
}
