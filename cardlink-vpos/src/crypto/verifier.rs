//! RSA-SHA256 response verification.

use base64::{Engine, engine::general_purpose::STANDARD};
use ring::signature::{RSA_PKCS1_2048_8192_SHA256, UnparsedPublicKey};
use tracing::{debug, instrument, warn};
use x509_parser::{
    certificate::X509Certificate, prelude::FromDer, x509::SubjectPublicKeyInfo,
};

use super::key::{KeyKind, decode_pem};
use crate::{
    crypto::signature_input,
    error::{PaymentError, Result},
};

/// Verifies signatures produced by the acquirer's authentication server.
///
/// Holds the processor's RSA public key in PKCS#1 `RSAPublicKey` form,
/// extracted once from the configured certificate.
#[derive(Debug, Clone)]
pub struct ResponseVerifier {
    public_key: Vec<u8>,
}

impl ResponseVerifier {
    /// Loads the trusted key from an X.509 certificate or a public key.
    ///
    /// Accepts `CERTIFICATE`, `PUBLIC KEY` (SPKI) and `RSA PUBLIC KEY`
    /// documents; a bare base64 body is assumed to be a certificate.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::InvalidKeyMaterial`] if the input cannot be
    /// decoded.
    pub fn from_pem(raw: &str) -> Result<Self> {
        let pem = decode_pem(raw, KeyKind::Certificate)?;

        let public_key = match pem.label.as_str() {
            "CERTIFICATE" => {
                let (_, cert) = X509Certificate::from_der(&pem.contents).map_err(|e| {
                    PaymentError::InvalidKeyMaterial(format!("invalid certificate: {e}"))
                })?;
                cert.public_key().subject_public_key.data.to_vec()
            }
            "PUBLIC KEY" => {
                let (_, spki) = SubjectPublicKeyInfo::from_der(&pem.contents).map_err(|e| {
                    PaymentError::InvalidKeyMaterial(format!("invalid public key: {e}"))
                })?;
                spki.subject_public_key.data.to_vec()
            }
            "RSA PUBLIC KEY" => pem.contents,
            other => {
                return Err(PaymentError::InvalidKeyMaterial(format!(
                    "unsupported certificate label: {other}"
                )));
            }
        };

        Ok(Self { public_key })
    }

    /// Checks `signature` over `values`.
    ///
    /// Uses the same concatenation rule as
    /// [`RequestSigner::sign`](crate::crypto::RequestSigner::sign). A failed check
    /// is not an error: it is logged at `warn` and reported as `false`.
    #[must_use]
    #[instrument(skip_all)]
    pub fn verify<I, S>(&self, values: I, signature: &str) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let raw_signature = match STANDARD.decode(signature.trim()) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, "signature is not valid base64");
                return false;
            }
        };

        let message = signature_input(values);
        let key = UnparsedPublicKey::new(&RSA_PKCS1_2048_8192_SHA256, &self.public_key);
        match key.verify(message.as_bytes(), &raw_signature) {
            Ok(()) => {
                debug!("response signature verified");
                true
            }
            Err(e) => {
                warn!(error = %e, "response signature verification failed");
                false
            }
        }
    }
}
