//! Card brands and card-number helpers.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

mod token;

pub use token::CardToken;

/// Card brands the gateway reports.
///
/// The gateway identifies brands by a small numeric id in the `cardType`
/// field of the authentication callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardBrand {
    /// Visa (id 1).
    Visa,
    /// Mastercard (id 2).
    Mastercard,
    /// Maestro (id 3).
    Maestro,
    /// American Express (id 4).
    Amex,
    /// Diners Club (id 5).
    Diners,
    /// Discover (id 6).
    Discover,
}

impl CardBrand {
    /// Maps the gateway's numeric card type id.
    #[must_use]
    pub const fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(Self::Visa),
            2 => Some(Self::Mastercard),
            3 => Some(Self::Maestro),
            4 => Some(Self::Amex),
            5 => Some(Self::Diners),
            6 => Some(Self::Discover),
            _ => None,
        }
    }

    /// Returns the gateway's numeric card type id.
    #[must_use]
    pub const fn id(self) -> u8 {
        match self {
            Self::Visa => 1,
            Self::Mastercard => 2,
            Self::Maestro => 3,
            Self::Amex => 4,
            Self::Diners => 5,
            Self::Discover => 6,
        }
    }

    /// Lowercase brand name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Visa => "visa",
            Self::Mastercard => "mastercard",
            Self::Maestro => "maestro",
            Self::Amex => "amex",
            Self::Diners => "diners",
            Self::Discover => "discover",
        }
    }

    /// Detects the brand from the card number prefix and length.
    ///
    /// Only the brands with unambiguous ranges are detected: Visa,
    /// Mastercard (51-55), American Express and Discover.
    ///
    /// # Examples
    ///
    /// ```
    /// use cardlink_vpos::card::CardBrand;
    ///
    /// assert_eq!(CardBrand::from_pan("4111 1111 1111 1111"), Some(CardBrand::Visa));
    /// assert_eq!(CardBrand::from_pan("371449635398431"), Some(CardBrand::Amex));
    /// assert_eq!(CardBrand::from_pan("1234"), None);
    /// ```
    #[must_use]
    pub fn from_pan(pan: &str) -> Option<Self> {
        let digits: String = pan.chars().filter(char::is_ascii_digit).collect();
        let len = digits.len();
        let prefix2 = digits.get(..2).unwrap_or_default();

        if digits.starts_with('4') && (len == 13 || len == 16) {
            Some(Self::Visa)
        } else if ("51"..="55").contains(&prefix2) && len == 16 {
            Some(Self::Mastercard)
        } else if (prefix2 == "34" || prefix2 == "37") && len == 15 {
            Some(Self::Amex)
        } else if (digits.starts_with("6011") || prefix2 == "65") && len == 16 {
            Some(Self::Discover)
        } else {
            None
        }
    }
}

impl fmt::Display for CardBrand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CardBrand {
    type Err = ();

    /// Parses a brand name or a numeric card type id.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(id) = s.parse::<u8>() {
            return Self::from_id(id).ok_or(());
        }
        match s.to_ascii_lowercase().as_str() {
            "visa" => Ok(Self::Visa),
            "mastercard" => Ok(Self::Mastercard),
            "maestro" => Ok(Self::Maestro),
            "amex" | "americanexpress" => Ok(Self::Amex),
            "diners" => Ok(Self::Diners),
            "discover" => Ok(Self::Discover),
            _ => Err(()),
        }
    }
}

/// Masks every digit of a card number except the last four.
///
/// # Examples
///
/// ```
/// use cardlink_vpos::card::mask_pan;
///
/// assert_eq!(mask_pan("4111111111111111"), "************1111");
/// assert_eq!(mask_pan("123"), "123");
/// ```
#[must_use]
pub fn mask_pan(pan: &str) -> String {
    let count = pan.chars().count();
    pan.chars()
        .enumerate()
        .map(|(i, c)| if i + 4 < count { '*' } else { c })
        .collect()
}
