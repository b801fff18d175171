use base64::{Engine, engine::general_purpose::STANDARD};
use sha2::{Digest, Sha256};

/// Computes `base64(SHA-256(concat(values) + secret))`.
///
/// Values are concatenated with no separator. Callers decide whether the
/// values are escaped first; this function hashes exactly what it is given.
///
/// # Examples
///
/// ```
/// use cardlink_vpos::crypto::secret_digest;
///
/// let digest = secret_digest(["2", "0020000000"], "Cardlink1");
/// assert_eq!(digest.len(), 44);
/// ```
#[must_use]
pub fn secret_digest<I, S>(values: I, secret: &str) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut hasher = Sha256::new();
    for value in values {
        hasher.update(value.as_ref().as_bytes());
    }
    hasher.update(secret.as_bytes());
    STANDARD.encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_of_empty_input_is_hash_of_secret() {
        // printf 'secret' | openssl dgst -sha256 -binary | base64
        assert_eq!(
            secret_digest::<[&str; 0], &str>([], "secret"),
            "K7gNU3sdo+OL0wNhqoVWhr3g6s1xYv72ol/pe/Unols="
        );
    }

    #[test]
    fn test_digest_is_plain_concatenation() {
        let split = secret_digest(["ab", "c"], "s");
        let joined = secret_digest(["abc"], "s");
        assert_eq!(split, joined);
        assert_ne!(split, secret_digest(["ab", "c"], "t"));
    }
}
