//! RSA-SHA256 request signing.

use std::fmt;

use base64::{Engine, engine::general_purpose::STANDARD};
use ring::{
    rand::SystemRandom,
    signature::{RSA_PKCS1_SHA256, RsaKeyPair},
};
use tracing::instrument;

use super::key::{KeyKind, decode_pem};
use crate::{
    crypto::signature_input,
    error::{PaymentError, Result},
};

/// Signs ordered field values with the merchant's RSA private key.
///
/// Signatures are PKCS#1 v1.5 over SHA-256, base64-encoded, which is what the
/// authentication server expects in the `signature` form field.
pub struct RequestSigner {
    key_pair: RsaKeyPair,
    rng: SystemRandom,
}

impl fmt::Debug for RequestSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestSigner")
            .field("modulus_bits", &(self.key_pair.public().modulus_len() * 8))
            .finish_non_exhaustive()
    }
}

impl RequestSigner {
    /// Loads a private key from PEM or bare base64.
    ///
    /// PKCS#8 (`PRIVATE KEY`) and PKCS#1 (`RSA PRIVATE KEY`) documents are
    /// accepted; a bare base64 body is assumed to be PKCS#8.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::InvalidKeyMaterial`] if the key cannot be decoded
    /// or is not an RSA key ring accepts.
    ///
    /// # Examples
    ///
    /// ```
    /// use cardlink_vpos::crypto::RequestSigner;
    ///
    /// let result = RequestSigner::from_pem("definitely not a key");
    /// assert!(result.is_err());
    /// ```
    pub fn from_pem(raw: &str) -> Result<Self> {
        let pem = decode_pem(raw, KeyKind::PrivateKey)?;

        let key_pair = match pem.label.as_str() {
            "PRIVATE KEY" => RsaKeyPair::from_pkcs8(&pem.contents),
            "RSA PRIVATE KEY" => RsaKeyPair::from_der(&pem.contents),
            other => {
                return Err(PaymentError::InvalidKeyMaterial(format!(
                    "unsupported private key label: {other}"
                )));
            }
        }
        .map_err(|e| PaymentError::InvalidKeyMaterial(format!("private key rejected: {e}")))?;

        Ok(Self { key_pair, rng: SystemRandom::new() })
    }

    /// Signs `values` using the skip-empty, `;`-terminated concatenation.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::InvalidKeyMaterial`] if the RSA operation fails.
    #[instrument(skip_all)]
    pub fn sign<I, S>(&self, values: I) -> Result<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let message = signature_input(values);
        let mut signature = vec![0u8; self.key_pair.public().modulus_len()];
        self.key_pair
            .sign(&RSA_PKCS1_SHA256, &self.rng, message.as_bytes(), &mut signature)
            .map_err(|_| PaymentError::InvalidKeyMaterial("RSA signing failed".to_owned()))?;
        Ok(STANDARD.encode(signature))
    }
}
