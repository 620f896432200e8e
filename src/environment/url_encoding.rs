//! Form encoding of log stream names.
//!
//! Log names are embedded in request paths, so they are encoded with the
//! `application/x-www-form-urlencoded` rules: alphanumerics and `.`, `-`, `*`,
//! `_` pass through, spaces become `+`, and every other byte of the UTF-8
//! representation is percent-encoded.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

/// Characters to percent-encode (space is handled by [`form_encode`]).
const FORM_ENCODE_SET_NO_SPACE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'.')
    .remove(b'-')
    .remove(b'*')
    .remove(b'_');

/// Form-encode `s`, mapping spaces to `+` in a single pass.
pub fn form_encode(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for (index, chunk) in s.split(' ').enumerate() {
        if index > 0 {
            result.push('+');
        }
        result.extend(utf8_percent_encode(chunk, FORM_ENCODE_SET_NO_SPACE));
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest]
    #[case("escape/me hurra", "escape%2Fme+hurra")]
    #[case("appengine.googleapis.com/log_name", "appengine.googleapis.com%2Flog_name")]
    #[case("cloud.logging.rust", "cloud.logging.rust")]
    #[case("a=b&c~d", "a%3Db%26c%7Ed")]
    #[case("star*dash-under_dot.", "star*dash-under_dot.")]
    #[case("caf\u{e9}", "caf%C3%A9")]
    fn encodes_like_form_data(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(form_encode(input), expected);
    }

    #[rstest]
    #[case("", "")]
    #[case(" ", "+")]
    #[case("  lead", "++lead")]
    #[case("trail  ", "trail++")]
    #[case("a  b", "a++b")]
    fn maps_every_space_to_plus(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(form_encode(input), expected);
    }

    proptest! {
        #[test]
        fn output_uses_only_safe_characters(input in ".*") {
            let encoded = form_encode(&input);
            let all_safe = encoded.chars().all(|c| {
                c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '*' | '_' | '+' | '%')
            });
            prop_assert!(all_safe);
        }

        #[test]
        fn encoding_is_identity_on_unreserved(input in "[A-Za-z0-9._*-]*") {
            prop_assert_eq!(form_encode(&input), input);
        }
    }
}
