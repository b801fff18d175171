use html_escape::encode_double_quoted_attribute;

use crate::{fields::FieldList, util::random_alphanumeric};

const FORM_NAME_LENGTH: usize = 10;

/// Renders an HTML form that posts `fields` to `action` as soon as the page
/// loads.
///
/// The form gets a random name so several forms can share a page. Values are
/// attribute-escaped.
///
/// # Examples
///
/// ```
/// use cardlink_vpos::{fields::FieldList, redirect::auto_submit_form};
///
/// let fields: FieldList = [("mid", "0020000000")].into_iter().collect();
/// let html = auto_submit_form("https://gateway.example.com/pay", &fields);
/// assert!(html.contains(r#"<input type="hidden" name="mid" value="0020000000"/>"#));
/// ```
#[must_use]
pub fn auto_submit_form(action: &str, fields: &FieldList) -> String {
    let name = random_alphanumeric(FORM_NAME_LENGTH);
    let mut html = format!(
        r#"<form name="{name}" id="{name}" method="post" action="{}">"#,
        encode_double_quoted_attribute(action)
    );
    for (field, value) in fields.iter() {
        html.push_str(&format!(
            r#"<input type="hidden" name="{}" value="{}"/>"#,
            encode_double_quoted_attribute(field),
            encode_double_quoted_attribute(value)
        ));
    }
    html.push_str(&format!(
        "</form><script>window.onload = function () {{ \
         document.forms['{name}'].submit(); }};</script>"
    ));
    html
}
