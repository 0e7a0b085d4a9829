//! Percent-encoding for URL parameters and fragments.
//!
//! Two character classes are in use:
//!
//! - **form** (`application/x-www-form-urlencoded`): letters, digits and
//!   `.-*_` pass through, everything else is escaped. Used for parameter
//!   names and values, credentials and route parameters.
//! - **fragment**: the form set plus `!$&'()+,;=~:@/?`, so fragments stay
//!   readable. Used for the `#fragment` part only.
//!
//! Both map a space to `+`, escape as `%XX` with uppercase hex over the UTF-8
//! bytes, and share the same decoder.

use std::borrow::Cow;

use crate::error::EncodingError;

const HEX_DIGITS: &[u8; 16] = b"0123456789ABCDEF";
const FRAGMENT_SAFE: &str = ".-*_!$&'()+,;=~:@/?";
const FORM_SAFE: &str = ".-*_";

fn is_form_safe(c: char) -> bool {
    c.is_ascii_alphanumeric() || FORM_SAFE.contains(c)
}

fn is_fragment_safe(c: char) -> bool {
    c.is_ascii_alphanumeric() || FRAGMENT_SAFE.contains(c)
}

fn encode_with(s: &str, safe: fn(char) -> bool) -> String {
    let mut out = String::with_capacity(s.len() + 16);
    let mut utf8 = [0u8; 4];
    for c in s.chars() {
        if c == ' ' {
            out.push('+');
        } else if safe(c) {
            out.push(c);
        } else {
            for byte in c.encode_utf8(&mut utf8).bytes() {
                out.push('%');
                out.push(HEX_DIGITS[(byte >> 4) as usize] as char);
                out.push(HEX_DIGITS[(byte & 0x0f) as usize] as char);
            }
        }
    }
    out
}

/// Encode a parameter name or value.
pub fn encode_form(s: &str) -> String {
    encode_with(s, is_form_safe)
}

/// Encode a fragment.
pub fn encode_fragment(s: &str) -> String {
    encode_with(s, is_fragment_safe)
}

/// Encode a single path segment: form encoding, but a space becomes `%20`
/// since `+` is literal inside a path.
pub fn encode_path_segment(s: &str) -> String {
    encode_form(s).replace('+', "%20")
}

/// Decode `+` to space and `%XX` runs to UTF-8 text.
///
/// Fails when a `%` is not followed by two hex digits or when the decoded
/// bytes are not UTF-8.
pub fn decode(s: &str) -> Result<String, EncodingError> {
    if !s.contains('%') && !s.contains('+') {
        return Ok(s.to_string());
    }
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b'%' => {
                if i + 2 >= bytes.len() {
                    return Err(EncodingError::Incomplete(i));
                }
                let hi = hex_value(bytes[i + 1]);
                let lo = hex_value(bytes[i + 2]);
                match (hi, lo) {
                    (Some(hi), Some(lo)) => out.push((hi << 4) | lo),
                    _ => {
                        return Err(EncodingError::InvalidHex {
                            sequence: String::from_utf8_lossy(&bytes[i..i + 3]).into_owned(),
                            position: i,
                        })
                    }
                }
                i += 3;
            }
            other => {
                out.push(other);
                i += 1;
            }
        }
    }
    String::from_utf8(out).map_err(|_| EncodingError::InvalidUtf8)
}

/// Decode a fragment; alias of [`decode`] kept for symmetry with [`encode_fragment`].
pub fn decode_fragment(s: &str) -> Result<String, EncodingError> {
    decode(s)
}

/// Decode stored text for display, falling back to the stored form when it
/// is not valid percent-encoding (values parsed from a URL are kept verbatim).
pub(crate) fn decode_lossy(s: &str) -> Cow<'_, str> {
    match decode(s) {
        Ok(decoded) if decoded == s => Cow::Borrowed(s),
        Ok(decoded) => Cow::Owned(decoded),
        Err(e) => {
            tracing::debug!(value = s, error = %e, "keeping undecodable value verbatim");
            Cow::Borrowed(s)
        }
    }
}

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn form_encoding_escapes_reserved_characters() {
        assert_eq!(encode_form("this code = awesome!"), "this+code+%3D+awesome%21");
        assert_eq!(encode_form("+"), "%2B");
        assert_eq!(encode_form(" "), "+");
        assert_eq!(encode_form("a.b-c*d_e"), "a.b-c*d_e");
    }

    #[test]
    fn form_encoding_uses_utf8_bytes() {
        assert_eq!(encode_form("é"), "%C3%A9");
        assert_eq!(encode_form("€"), "%E2%82%AC");
    }

    #[test]
    fn fragment_encoding_keeps_safe_set() {
        assert_eq!(
            encode_fragment("/this/is/a/#/<long>/( fragment )/"),
            "/this/is/a/%23/%3Clong%3E/(+fragment+)/"
        );
        assert_eq!(encode_fragment("what's our # again?"), "what's+our+%23+again?");
        assert_eq!(encode_fragment("a:b@c;d=e,f~g$h&i"), "a:b@c;d=e,f~g$h&i");
    }

    #[test]
    fn path_segment_encodes_space_as_percent_twenty() {
        assert_eq!(encode_path_segment("ref set/1"), "ref%20set%2F1");
    }

    #[test]
    fn decode_reverses_both_encodings() {
        assert_eq!(decode("this+code+%3D+awesome%21").unwrap(), "this code = awesome!");
        assert_eq!(decode("what's+our+%23+again?").unwrap(), "what's our # again?");
        assert_eq!(decode("%C3%A9t%c3%a9").unwrap(), "été");
        assert_eq!(decode("plain").unwrap(), "plain");
    }

    #[test]
    fn decode_accepts_escape_at_end_of_input() {
        assert_eq!(decode("abc%41").unwrap(), "abcA");
    }

    #[test]
    fn decode_rejects_truncated_escape() {
        assert_eq!(decode("abc%4"), Err(EncodingError::Incomplete(3)));
        assert_eq!(decode("%"), Err(EncodingError::Incomplete(0)));
    }

    #[test]
    fn decode_rejects_non_hex_escape() {
        assert!(matches!(
            decode("%zz"),
            Err(EncodingError::InvalidHex { position: 0, .. })
        ));
    }

    #[test]
    fn decode_rejects_invalid_utf8() {
        assert_eq!(decode("%FF"), Err(EncodingError::InvalidUtf8));
    }

    #[test]
    fn lossy_decode_keeps_malformed_input() {
        assert_eq!(decode_lossy("100%"), "100%");
        assert_eq!(decode_lossy("a+b"), "a b");
    }
}
