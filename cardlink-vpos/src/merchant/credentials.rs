//! Loaded merchant credentials.

use std::fmt;

use zeroize::Zeroizing;

use super::config::MerchantSection;
use crate::{
    crypto::{RequestSigner, ResponseVerifier},
    error::{PaymentError, Result},
};

/// Merchant identity and key material, ready for use by the payment flows.
///
/// Loading happens once at setup; this is the only place where
/// [`PaymentError::InvalidKeyMaterial`] is raised. The signer and verifier
/// are only needed by the card flow, so a merchant that only offers IRIS or
/// `PayPal` may leave the key material unconfigured.
pub struct MerchantCredentials {
    merchant_id: String,
    shared_secret: Zeroizing<String>,
    signer: Option<RequestSigner>,
    verifier: Option<ResponseVerifier>,
    customer_code: String,
}

impl fmt::Debug for MerchantCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MerchantCredentials")
            .field("merchant_id", &self.merchant_id)
            .field("signer", &self.signer)
            .field("verifier", &self.verifier.is_some())
            .field("customer_code", &self.customer_code)
            .finish_non_exhaustive()
    }
}

impl MerchantCredentials {
    /// Loads credentials from the `[merchant]` configuration section.
    ///
    /// Keys given as bare base64 are wrapped in PEM markers before decoding.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::InvalidKeyMaterial`] if the private key or the
    /// processor certificate is present but cannot be loaded, and
    /// [`PaymentError::Config`] if the section is invalid.
    pub fn from_config(section: &MerchantSection) -> Result<Self> {
        section.validate()?;

        let private_key = section.private_key.trim();
        let signer =
            if private_key.is_empty() { None } else { Some(RequestSigner::from_pem(private_key)?) };

        let certificate = section.processor_certificate.trim();
        let verifier = if certificate.is_empty() {
            None
        } else {
            Some(ResponseVerifier::from_pem(certificate)?)
        };

        Ok(Self {
            merchant_id: section.merchant_id.trim().to_owned(),
            shared_secret: Zeroizing::new(section.shared_secret.trim().to_owned()),
            signer,
            verifier,
            customer_code: section.dias_customer_code.trim().to_owned(),
        })
    }

    /// Builds credentials from already loaded parts.
    #[must_use]
    pub fn new(
        merchant_id: impl Into<String>,
        shared_secret: impl Into<String>,
        signer: Option<RequestSigner>,
        verifier: Option<ResponseVerifier>,
        customer_code: impl Into<String>,
    ) -> Self {
        Self {
            merchant_id: merchant_id.into(),
            shared_secret: Zeroizing::new(shared_secret.into()),
            signer,
            verifier,
            customer_code: customer_code.into(),
        }
    }

    /// Merchant identifier.
    #[must_use]
    pub fn merchant_id(&self) -> &str {
        &self.merchant_id
    }

    /// Shared secret used by the digest-protected messages.
    #[must_use]
    pub fn shared_secret(&self) -> &str {
        &self.shared_secret
    }

    /// Customer code for IRIS reference codes.
    #[must_use]
    pub fn customer_code(&self) -> &str {
        &self.customer_code
    }

    /// The request signer.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::Config`] if no private key was configured.
    pub fn signer(&self) -> Result<&RequestSigner> {
        self.signer.as_ref().ok_or_else(|| {
            PaymentError::Config("merchant.private_key is not configured".to_owned())
        })
    }

    /// The response verifier.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::Config`] if no processor certificate was
    /// configured.
    pub fn verifier(&self) -> Result<&ResponseVerifier> {
        self.verifier.as_ref().ok_or_else(|| {
            PaymentError::Config("merchant.processor_certificate is not configured".to_owned())
        })
    }
}
