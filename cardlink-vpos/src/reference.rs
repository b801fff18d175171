//! Structured creditor reference (RF) codes for the interbank transfer rail.
//!
//! The reference carries the merchant's customer code, a payment code
//! derived from the amount, and the order number, protected by an ISO 11649
//! mod-97 check. The intermediate number is wider than any native integer, so
//! the modulus is computed digit by digit.

use tracing::debug;

use crate::error::{PaymentError, Result};

const ORDER_WIDTH: usize = 13;
const PAYMENT_WEIGHTS: [u32; 3] = [1, 7, 3];
/// Fixed infix between the payment code and the order number.
const SERVICE_CODE: &str = "12";
/// `RF00` rewritten with letters as numbers (R = 27, F = 15).
const RF_SUFFIX: &str = "271500";

/// Generates the RF reference used as the order description of an IRIS payment.
///
/// `amount_minor` is the amount in minor units (`1050` is 10.50). Only the
/// ASCII digits of `order_id` are used; they are left-padded with zeros to 13
/// positions.
///
/// The payment code is checksummed over the minor-unit digits. Some existing
/// storefront plugins scale an amount that is already in minor units by 100
/// once more, which changes the payment code (10.50 gives `0` there, `4`
/// here). Pass `amount_minor * 100` to reproduce references issued that way.
///
/// # Errors
///
/// Returns [`PaymentError::InvalidInput`] if `customer_code` is empty or is
/// not alphanumeric.
///
/// # Examples
///
/// ```
/// use cardlink_vpos::reference::generate_reference_code;
///
/// let code = generate_reference_code("000000000000", "1234", 1050).unwrap();
/// assert_eq!(code, "RF340000000000004120000000001234");
/// ```
pub fn generate_reference_code(
    customer_code: &str,
    order_id: &str,
    amount_minor: u64,
) -> Result<String> {
    let customer_code = customer_code.trim();
    if customer_code.is_empty() || !customer_code.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(PaymentError::InvalidInput(
            "customer code must be a non-empty alphanumeric string".to_owned(),
        ));
    }

    let payment_code = payment_code(amount_minor);
    let order_digits: String = order_id.chars().filter(char::is_ascii_digit).collect();
    let order = format!("{:0>ORDER_WIDTH$}", order_digits.trim_start_matches('0'));

    let body = format!("{customer_code}{payment_code}{SERVICE_CODE}{order}");
    let check = 98 - mod97(&format!("{body}{RF_SUFFIX}"));

    debug!(payment_code, check, "reference code generated");
    Ok(format!("RF{check:02}{body}"))
}

/// Weighted checksum of the amount, read least significant digit first.
fn payment_code(amount_minor: u64) -> u32 {
    let sum: u32 = amount_minor
        .to_string()
        .bytes()
        .rev()
        .zip(PAYMENT_WEIGHTS.iter().cycle())
        .map(|(digit, weight)| u32::from(digit - b'0') * weight)
        .sum();

    if sum == 0 { 8 } else { sum % 8 }
}

/// Remainder of an arbitrarily long alphanumeric number modulo 97.
///
/// Letters count as two-digit numbers (`A` = 10 … `Z` = 35).
fn mod97(number: &str) -> u32 {
    number.chars().fold(0, |rem, c| match c.to_digit(36) {
        Some(v) if v >= 10 => (rem * 100 + v) % 97,
        Some(v) => (rem * 10 + v) % 97,
        None => rem,
    })
}

/// Returns `true` if `reference` is a well-formed RF code with a valid check.
///
/// # Examples
///
/// ```
/// use cardlink_vpos::reference::is_valid_reference_code;
///
/// assert!(is_valid_reference_code("RF340000000000004120000000001234"));
/// assert!(!is_valid_reference_code("RF350000000000004120000000001234"));
/// ```
#[must_use]
pub fn is_valid_reference_code(reference: &str) -> bool {
    let reference = reference.trim().to_ascii_uppercase();
    if reference.len() < 5
        || !reference.starts_with("RF")
        || !reference.chars().all(|c| c.is_ascii_alphanumeric())
    {
        return false;
    }
    let (head, tail) = reference.split_at(4);
    mod97(&format!("{tail}{head}")) == 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_vector() {
        let code = generate_reference_code("000000000000", "1234", 1050).unwrap();
        assert_eq!(code, "RF340000000000004120000000001234");
    }

    #[test]
    fn test_zero_amount_uses_payment_code_eight() {
        let code = generate_reference_code("000000000000", "1234", 0).unwrap();
        assert_eq!(code, "RF240000000000008120000000001234");
    }

    #[test]
    fn test_non_digit_characters_in_order_id_are_dropped() {
        let code = generate_reference_code("123456789012", "order-98765", 249_999).unwrap();
        assert_eq!(code, "RF831234567890126120000000098765");
    }

    #[test]
    fn test_short_customer_code() {
        let code = generate_reference_code("99990001", "42", 100).unwrap();
        assert_eq!(code, "RF83999900013120000000000042");
    }

    #[test]
    fn test_deterministic() {
        let a = generate_reference_code("000000000000", "77", 12_345).unwrap();
        let b = generate_reference_code("000000000000", "77", 12_345).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_generated_codes_pass_iso_check() {
        for (customer, order, amount) in
            [("000000000000", "1", 1), ("555", "0000099", 987_654_321), ("ABC123", "x9y8", 10)]
        {
            let code = generate_reference_code(customer, order, amount).unwrap();
            assert!(is_valid_reference_code(&code), "{code} failed the mod-97 check");
        }
    }

    #[test]
    fn test_payment_code_weights() {
        // 1050 reversed is 0501: 0*1 + 5*7 + 0*3 + 1*1 = 36, 36 % 8 = 4
        assert_eq!(payment_code(1050), 4);
        assert_eq!(payment_code(0), 8);
        assert_eq!(payment_code(8), 0);
    }

    #[test]
    fn test_payment_code_is_taken_over_minor_units() {
        let code = generate_reference_code("000000000000", "1234", 1050).unwrap();
        assert_eq!(&code[16..17], "4");

        // 105000 reversed is 000501: 5*1 + 0*7 + 1*3 = 8, 8 % 8 = 0
        let rescaled = generate_reference_code("000000000000", "1234", 1050 * 100).unwrap();
        assert_eq!(&rescaled[16..17], "0");
        assert_ne!(code, rescaled);
        assert!(is_valid_reference_code(&rescaled));
    }

    #[test]
    fn test_mod97_handles_wide_numbers() {
        assert_eq!(mod97("0000000000004120000000001234271500"), 64);
        assert_eq!(mod97("12345678901234567890123456789"), 44);
    }

    #[test]
    fn test_invalid_customer_code() {
        assert!(matches!(
            generate_reference_code("", "1", 1),
            Err(PaymentError::InvalidInput(_))
        ));
        assert!(generate_reference_code("12-34", "1", 1).is_err());
    }
}
