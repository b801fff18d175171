//! Signing, verification and digest primitives shared by every payment flow.
//!
//! The gateway authenticates messages in two ways:
//!
//! - **RSA-SHA256 signatures** ([`RequestSigner`], [`ResponseVerifier`]) over the
//!   3-D Secure authentication request and its callback.
//! - **Shared-secret digests** ([`secret_digest`]) over settlement documents,
//!   redirect forms and the client-script query.
//!
//! Both sign an ordered list of field values. For signatures the values are
//! built with [`signature_input`]: empty values are skipped entirely and every
//! remaining value is followed by `;`. The order is dictated by the remote
//! server, so callers must pass values in exactly the documented field order.

mod digest;
mod key;
mod signer;
mod verifier;

#[cfg(test)]
mod tests;

pub use digest::secret_digest;
pub use key::{KeyKind, normalize_pem};
pub use signer::RequestSigner;
pub use verifier::ResponseVerifier;

/// Builds the byte string covered by an RSA-SHA256 signature.
///
/// # Examples
///
/// ```
/// use cardlink_vpos::crypto::signature_input;
///
/// assert_eq!(signature_input(["4.0", "", "0100", "978"]), "4.0;0100;978;");
/// assert_eq!(signature_input::<[&str; 0], &str>([]), "");
/// ```
#[must_use]
pub fn signature_input<I, S>(values: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    values.into_iter().filter(|v| !v.as_ref().is_empty()).fold(String::new(), |mut acc, v| {
        acc.push_str(v.as_ref());
        acc.push(';');
        acc
    })
}
