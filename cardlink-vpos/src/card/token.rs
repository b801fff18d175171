//! Card tokens granted by the gateway on a tokenising settlement.

use serde::{Deserialize, Serialize};

use super::CardBrand;
use crate::{
    error::{PaymentError, Result},
    fields::FieldList,
};

/// A reusable card token.
///
/// Produced only by a successful settlement that asked for tokenization.
/// Persisting it is up to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardToken {
    /// Gateway token replacing the card number in later payments.
    pub token: String,
    /// Last four digits of the tokenised card number.
    pub last4: String,
    /// Expiry year.
    pub expiry_year: u16,
    /// Expiry month (1-12).
    pub expiry_month: u8,
    /// Normalised card brand name.
    pub card_type: String,
}

impl CardToken {
    /// Builds a token from the `ExtToken*` fields of a settlement response.
    ///
    /// `card_type` is either the gateway's numeric card type id, mapped to the
    /// brand name, or a brand name that is lowercased and stripped of
    /// anything but ASCII letters and digits.
    ///
    /// The expiry (`ExtTokenExp`) is read positionally: the year is its first
    /// four characters and the month the two characters at offset 5, so both
    /// `2027-08` and `2027-08-31` are accepted.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::MalformedResponse`] if the token is missing or
    /// the expiry cannot be read.
    ///
    /// # Examples
    ///
    /// ```
    /// use cardlink_vpos::{card::CardToken, fields::FieldList};
    ///
    /// let fields: FieldList = [
    ///     ("ExtToken", "tok_9f8e7d"),
    ///     ("ExtTokenPanEnd", "1111"),
    ///     ("ExtTokenExp", "2027-08-31"),
    /// ]
    /// .into_iter()
    /// .collect();
    ///
    /// let token = CardToken::from_gateway_fields("1", &fields).unwrap();
    /// assert_eq!(token.card_type, "visa");
    /// assert_eq!(token.expiry_year, 2027);
    /// assert_eq!(token.expiry_month, 8);
    /// ```
    pub fn from_gateway_fields(card_type: &str, fields: &FieldList) -> Result<Self> {
        let token = fields.get_or_empty("ExtToken").trim();
        if token.is_empty() {
            return Err(PaymentError::MalformedResponse("ExtToken is missing".to_owned()));
        }

        let expiry = fields.get_or_empty("ExtTokenExp").trim();
        let year = expiry.get(..4).and_then(|y| y.parse::<u16>().ok());
        let month = expiry.get(5..7).and_then(|m| m.parse::<u8>().ok());
        let (expiry_year, expiry_month) = match (year, month) {
            (Some(year), Some(month)) if (1..=12).contains(&month) => (year, month),
            _ => {
                return Err(PaymentError::MalformedResponse(format!(
                    "unreadable ExtTokenExp: {expiry:?}"
                )));
            }
        };

        Ok(Self {
            token: token.to_owned(),
            last4: fields.get_or_empty("ExtTokenPanEnd").trim().to_owned(),
            expiry_year,
            expiry_month,
            card_type: normalize_card_type(card_type),
        })
    }
}

fn normalize_card_type(card_type: &str) -> String {
    let card_type = card_type.trim();
    if let Ok(id) = card_type.parse::<u8>()
        && let Some(brand) = CardBrand::from_id(id)
    {
        return brand.name().to_owned();
    }
    card_type.chars().filter(char::is_ascii_alphanumeric).collect::<String>().to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_fields(exp: &str) -> FieldList {
        [("ExtToken", "tok_123"), ("ExtTokenPanEnd", "4444"), ("ExtTokenExp", exp)]
            .into_iter()
            .collect()
    }

    #[test]
    fn test_numeric_card_type_is_mapped() {
        let token = CardToken::from_gateway_fields("2", &token_fields("2030-12")).unwrap();
        assert_eq!(token.card_type, "mastercard");
        assert_eq!(token.last4, "4444");
        assert_eq!(token.expiry_year, 2030);
        assert_eq!(token.expiry_month, 12);
    }

    #[test]
    fn test_named_card_type_is_sanitised() {
        let token =
            CardToken::from_gateway_fields(" Master-Card ", &token_fields("2030-01")).unwrap();
        assert_eq!(token.card_type, "mastercard");

        let token = CardToken::from_gateway_fields("Amex", &token_fields("2030-01")).unwrap();
        assert_eq!(token.card_type, "amex");
    }

    #[test]
    fn test_unknown_numeric_id_kept_as_digits() {
        let token = CardToken::from_gateway_fields("42", &token_fields("2030-01")).unwrap();
        assert_eq!(token.card_type, "42");
    }

    #[test]
    fn test_missing_token() {
        let fields: FieldList = [("ExtTokenExp", "2030-01")].into_iter().collect();
        let err = CardToken::from_gateway_fields("1", &fields).unwrap_err();
        assert!(matches!(err, PaymentError::MalformedResponse(_)));
    }

    #[test]
    fn test_short_expiry_rejected() {
        assert!(CardToken::from_gateway_fields("1", &token_fields("2030")).is_err());
        assert!(CardToken::from_gateway_fields("1", &token_fields("20xx-01")).is_err());
        assert!(CardToken::from_gateway_fields("1", &token_fields("2030-13")).is_err());
    }
}
