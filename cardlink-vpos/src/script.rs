//! Client-side card-encoding script.
//!
//! Storefronts that encrypt card data in the browser load a script from the
//! acquirer. The script URL carries a signed query (`version`, `mid`, `date`,
//! `digest`) so the acquirer can tell which merchant is asking.

use chrono::NaiveDateTime;
use tracing::{info, instrument, warn};
use url::Url;

use crate::{
    crypto::secret_digest,
    error::{PaymentError, Result},
    merchant::MerchantContext,
    transport::Transport,
};

/// Query protocol version.
pub const SCRIPT_VERSION: &str = "2";

/// Marker the acquirer puts in the body when it refuses to serve the script.
pub const LOADING_FAILURE_MARKER: &str = "CSE Script loading failure";

/// Builds the signed script URL for `now`.
///
/// `date` is `YYYYMMDDHHmm`; the digest is taken over the raw query values.
///
/// # Errors
///
/// Returns [`PaymentError::Config`] if `script_url` is not a valid URL.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use cardlink_vpos::script::client_script_url;
///
/// let now = NaiveDate::from_ymd_opt(2025, 1, 2).unwrap().and_hms_opt(3, 4, 0).unwrap();
/// let script = "https://ecommerce-test.cardlink.gr/vpos/csescript.js";
/// let url = client_script_url(script, "0020000000", "Cardlink1", now).unwrap();
/// assert!(url.starts_with(&format!(
///     "{script}?version=2&mid=0020000000&date=202501020304&digest="
/// )));
/// ```
pub fn client_script_url(
    script_url: &str,
    merchant_id: &str,
    shared_secret: &str,
    now: NaiveDateTime,
) -> Result<String> {
    let date = now.format("%Y%m%d%H%M").to_string();
    let digest = secret_digest([SCRIPT_VERSION, merchant_id, date.as_str()], shared_secret);

    let mut url = Url::parse(script_url).map_err(|e| {
        PaymentError::Config(format!("client script URL '{script_url}' is invalid: {e}"))
    })?;
    url.query_pairs_mut()
        .append_pair("version", SCRIPT_VERSION)
        .append_pair("mid", merchant_id)
        .append_pair("date", &date)
        .append_pair("digest", &digest);
    Ok(url.into())
}

/// Fetches the card-encoding script for the configured merchant.
///
/// # Errors
///
/// - [`PaymentError::ProtocolRejection`] if the acquirer answers anything
///   but HTTP 200 or reports a loading failure in the body
/// - [`PaymentError::Http`] if the request cannot be completed
#[instrument(skip_all)]
pub fn fetch_client_script(
    context: &MerchantContext,
    transport: &impl Transport,
) -> Result<String> {
    fetch_client_script_at(context, transport, context.now())
}

/// Like [`fetch_client_script`], signing the query for `now`.
///
/// # Errors
///
/// Same as [`fetch_client_script`].
pub fn fetch_client_script_at(
    context: &MerchantContext,
    transport: &impl Transport,
    now: NaiveDateTime,
) -> Result<String> {
    let credentials = context.credentials();
    let url = client_script_url(
        &context.endpoints().client_script_url,
        credentials.merchant_id(),
        credentials.shared_secret(),
        now,
    )?;

    let response = transport.get(&url)?;
    let body = response.body_text();

    if response.status != 200 || body.contains(LOADING_FAILURE_MARKER) {
        warn!(status = response.status, "client script refused");
        return Err(PaymentError::ProtocolRejection {
            status: response.status.to_string(),
            message: if body.contains(LOADING_FAILURE_MARKER) {
                LOADING_FAILURE_MARKER.to_owned()
            } else {
                response.reason
            },
        });
    }

    info!(bytes = body.len(), "client script fetched");
    Ok(body)
}
