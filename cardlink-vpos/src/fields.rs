//! Ordered name/value field lists.
//!
//! Gateway messages are flat field sets whose order matters: signatures and
//! digests are computed over the values in the order the fields appear.
//! [`FieldList`] keeps that order and still allows lookups by name.

use serde::{Deserialize, Serialize};

/// An ordered list of `(name, value)` pairs.
///
/// Duplicate names are allowed; [`get`](Self::get) returns the first match.
///
/// # Examples
///
/// ```
/// use cardlink_vpos::fields::FieldList;
///
/// let mut fields = FieldList::new();
/// fields.push("mid", "0020000000");
/// fields.push("status", "AUTHORIZED");
///
/// assert_eq!(fields.get("status"), Some("AUTHORIZED"));
/// assert_eq!(fields.values().collect::<Vec<_>>(), ["0020000000", "AUTHORIZED"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldList(Vec<(String, String)>);

impl FieldList {
    /// Creates an empty list.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Appends a field.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.push((name.into(), value.into()));
    }

    /// Replaces the value of the first field called `name` in place, or
    /// appends the field when absent.
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.0.iter_mut().find(|(n, _)| n == name) {
            Some((_, slot)) => *slot = value,
            None => self.0.push((name.to_owned(), value)),
        }
    }

    /// Returns the value of the first field called `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, v)| v.as_str())
    }

    /// Returns the value of `name`, or `""` when absent.
    #[must_use]
    pub fn get_or_empty(&self, name: &str) -> &str {
        self.get(name).unwrap_or_default()
    }

    /// Iterates over `(name, value)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Iterates over values in order.
    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(_, v)| v.as_str())
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if there are no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrows the pairs, e.g. to post them as a form.
    #[must_use]
    pub fn as_pairs(&self) -> &[(String, String)] {
        &self.0
    }
}

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for FieldList {
    fn from_iter<T: IntoIterator<Item = (N, V)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(n, v)| (n.into(), v.into())).collect())
    }
}

impl From<Vec<(String, String)>> for FieldList {
    fn from(pairs: Vec<(String, String)>) -> Self {
        Self(pairs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_duplicate_wins() {
        let fields: FieldList = [("a", "1"), ("a", "2")].into_iter().collect();
        assert_eq!(fields.get("a"), Some("1"));
        assert_eq!(fields.len(), 2);
    }

    #[test]
    fn test_missing_field() {
        let fields = FieldList::new();
        assert!(fields.is_empty());
        assert_eq!(fields.get("status"), None);
        assert_eq!(fields.get_or_empty("status"), "");
    }

    #[test]
    fn test_set_replaces_in_place() {
        let mut fields: FieldList = [("version", "4.0"), ("pan", "4111"), ("expiry", "2812")]
            .into_iter()
            .collect();
        fields.set("pan", "tok_1");
        fields.set("panMode", "VPOSToken");

        assert_eq!(fields.values().collect::<Vec<_>>(), ["4.0", "tok_1", "2812", "VPOSToken"]);
    }

    #[test]
    fn test_serializes_as_pair_list() {
        let fields: FieldList = [("status", "CAPTURED")].into_iter().collect();
        assert_eq!(serde_json::to_string(&fields).unwrap(), r#"[["status","CAPTURED"]]"#);
    }
}
