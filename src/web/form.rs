//! `application/x-www-form-urlencoded` body parsing.

use percent_encoding::percent_decode_str;

/// Form field carrying the user's answer.
pub const CODE_FIELD: &str = "code";

/// Returns the decoded value of `name`, trimmed.
///
/// The first occurrence wins.
#[must_use]
pub fn form_field(body: &[u8], name: &str) -> Option<String> {
    let body = std::str::from_utf8(body).ok()?;
    body.split('&')
        .map(|pair| pair.split_once('=').unwrap_or((pair, "")))
        .find(|(key, _)| decode(key).as_deref() == Some(name))
        .and_then(|(_, value)| decode(value))
        .map(|value| value.trim().to_string())
}

fn decode(raw: &str) -> Option<String> {
    let spaced = raw.replace('+', " ");
    percent_decode_str(&spaced)
        .decode_utf8()
        .ok()
        .map(|s| s.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_form_field() {
        let body = b"test=Check&code=AbC%20d+e&code=second";
        assert_eq!(form_field(body, CODE_FIELD).as_deref(), Some("AbC d e"));
        assert_eq!(form_field(body, "test").as_deref(), Some("Check"));
        assert_eq!(form_field(body, "missing"), None);
    }

    #[test]
    fn test_empty_and_bare_fields() {
        assert_eq!(form_field(b"code=", CODE_FIELD).as_deref(), Some(""));
        assert_eq!(form_field(b"reload", "reload").as_deref(), Some(""));
        assert_eq!(form_field(b"", CODE_FIELD), None);
    }

    #[test]
    fn test_invalid_input() {
        assert_eq!(form_field(&[0xff, 0xfe], CODE_FIELD), None);
        assert_eq!(form_field(b"code=%ff", CODE_FIELD), None);
        assert_eq!(
            form_field(b"code=%20%20xyz%20", CODE_FIELD).as_deref(),
            Some("xyz")
        );
    }
}
