//! Verification code extraction from message bodies.
//!
//! There is exactly one rule: the prompt phrase `enter the following code`, followed
//! (non-greedily, across line breaks) by a styled `<span>` whose entire text is a
//! decimal numeral. The numeral is the code.
//!
//! ```
//! use outlook_code::extract_code;
//!
//! let body = r#"<p>Please enter the following code:</p><span style="font-size:14pt">483920</span>"#;
//! assert_eq!(extract_code(body), Some("483920"));
//! assert_eq!(extract_code("Your code is 483920"), None);
//! ```

use once_cell::sync::Lazy;
use regex::Regex;

/// The extraction pattern. Capture group 1 is the code.
pub const CODE_PATTERN: &str = r#"(?s)enter the following code.*?<span style=".*?">(\d+)</span>"#;

#[allow(clippy::expect_used)]
static CODE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(CODE_PATTERN).expect("valid regex"));

/// Returns the verification code in `body`, if the body contains one.
///
/// Never fails: arbitrary or malformed HTML simply yields `None`.
#[must_use]
pub fn extract_code(body: &str) -> Option<&str> {
    CODE_REGEX
        .captures(body)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_after_prompt_in_styled_span() {
        let body = r#"...enter the following code...<span style="x">483920</span>..."#;
        assert_eq!(extract_code(body), Some("483920"));
    }

    #[test]
    fn test_microsoft_style_body() {
        let body = r#"<table><tr><td>Please enter the following code to help us verify your identity.</td></tr>
<tr><td><span style="font-family:'Segoe UI Bold';font-size:14pt;color:#2a2a2a">7391</span></td></tr></table>"#;
        assert_eq!(extract_code(body), Some("7391"));
    }

    #[test]
    fn test_numeral_without_span_is_ignored() {
        assert_eq!(extract_code("Please enter the following code: 483920"), None);
    }

    #[test]
    fn test_span_without_style_is_ignored() {
        assert_eq!(
            extract_code("enter the following code <span>483920</span>"),
            None
        );
    }

    #[test]
    fn test_span_before_prompt_is_ignored() {
        let body = r#"<span style="x">111111</span> then enter the following code please"#;
        assert_eq!(extract_code(body), None);
    }

    #[test]
    fn test_first_span_after_prompt_wins() {
        let body = r#"enter the following code <span style="a">222</span> or <span style="b">333</span>"#;
        assert_eq!(extract_code(body), Some("222"));
    }

    #[test]
    fn test_non_numeric_span_is_ignored() {
        assert_eq!(
            extract_code(r#"enter the following code <span style="a">ABC123</span>"#),
            None
        );
    }

    #[test]
    fn test_empty_and_malformed_input() {
        assert_eq!(extract_code(""), None);
        assert_eq!(extract_code("no content"), None);
        assert_eq!(
            extract_code(r#"<<span style=">>enter the following code<span style="<"#),
            None
        );
    }
}
