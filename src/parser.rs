//! Internal module for turning raw RFC 822 bytes into a [`ParsedMessage`].

use mailparse::{parse_mail, DispositionType, MailHeaderMap, MailParseError, ParsedMail};

/// Sender text used when a message has no usable `From` header.
pub const UNKNOWN_SENDER: &str = "unknown sender";

/// Body text used when a message has neither an HTML nor a plain-text body.
pub const NO_CONTENT: &str = "no content";

/// Normalized view of one fetched message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedMessage {
    /// Decoded `From` header, or [`UNKNOWN_SENDER`].
    pub sender: String,
    /// HTML body if present, else plain text, else [`NO_CONTENT`].
    pub body: String,
}

impl ParsedMessage {
    /// Creates a record from already-extracted parts.
    #[must_use]
    pub fn new(sender: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
            body: body.into(),
        }
    }
}

/// Parses one raw message.
///
/// Errors here are per-message: the caller counts them and moves on.
pub(crate) fn parse_message(raw: &[u8]) -> Result<ParsedMessage, MailParseError> {
    let parsed = parse_mail(raw)?;

    let sender = parsed
        .headers
        .get_first_value("From")
        .map(|from| from.trim().to_string())
        .filter(|from| !from.is_empty())
        .unwrap_or_else(|| UNKNOWN_SENDER.to_string());

    let body = match first_body(&parsed, "text/html")? {
        Some(html) => html,
        None => first_body(&parsed, "text/plain")?.unwrap_or_else(|| NO_CONTENT.to_string()),
    };

    Ok(ParsedMessage { sender, body })
}

/// Depth-first search for the first non-empty inline part of `mimetype`.
fn first_body(part: &ParsedMail<'_>, mimetype: &str) -> Result<Option<String>, MailParseError> {
    if part.subparts.is_empty() {
        if !part.ctype.mimetype.eq_ignore_ascii_case(mimetype) {
            return Ok(None);
        }
        if matches!(
            part.get_content_disposition().disposition,
            DispositionType::Attachment
        ) {
            return Ok(None);
        }
        let body = part.get_body()?;
        return Ok((!body.trim().is_empty()).then_some(body));
    }

    for subpart in &part.subparts {
        if let Some(body) = first_body(subpart, mimetype)? {
            return Ok(Some(body));
        }
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_message() {
        let raw = b"From: Microsoft account team <account-security-noreply@accountprotection.microsoft.com>\r\n\
To: user@outlook.com\r\n\r\nYour code is 123456.";
        let parsed = parse_message(raw).unwrap();

        assert_eq!(
            parsed.sender,
            "Microsoft account team <account-security-noreply@accountprotection.microsoft.com>"
        );
        assert!(parsed.body.contains("123456"));
    }

    #[test]
    fn test_html_preferred_over_plain() {
        let raw = b"From: sender@example.com\r\n\
Content-Type: multipart/alternative; boundary=\"b1\"\r\n\r\n\
--b1\r\n\
Content-Type: text/plain; charset=utf-8\r\n\r\n\
plain version\r\n\
--b1\r\n\
Content-Type: text/html; charset=utf-8\r\n\r\n\
<p>html version</p>\r\n\
--b1--\r\n";
        let parsed = parse_message(raw).unwrap();

        assert!(parsed.body.contains("<p>html version</p>"));
        assert!(!parsed.body.contains("plain version"));
    }

    #[test]
    fn test_nested_html_part_is_found() {
        let raw = b"From: sender@example.com\r\n\
Content-Type: multipart/mixed; boundary=\"outer\"\r\n\r\n\
--outer\r\n\
Content-Type: multipart/alternative; boundary=\"inner\"\r\n\r\n\
--inner\r\n\
Content-Type: text/plain\r\n\r\n\
plain\r\n\
--inner\r\n\
Content-Type: text/html\r\n\r\n\
<b>nested</b>\r\n\
--inner--\r\n\
--outer--\r\n";
        let parsed = parse_message(raw).unwrap();
        assert!(parsed.body.contains("<b>nested</b>"));
    }

    #[test]
    fn test_html_attachment_is_not_a_body() {
        let raw = b"From: sender@example.com\r\n\
Content-Type: multipart/mixed; boundary=\"b1\"\r\n\r\n\
--b1\r\n\
Content-Type: text/plain\r\n\r\n\
the real body\r\n\
--b1\r\n\
Content-Type: text/html\r\n\
Content-Disposition: attachment; filename=\"report.html\"\r\n\r\n\
<p>attached</p>\r\n\
--b1--\r\n";
        let parsed = parse_message(raw).unwrap();
        assert!(parsed.body.contains("the real body"));
    }

    #[test]
    fn test_defaults_for_missing_sender_and_body() {
        let raw = b"Subject: empty\r\n\r\n";
        let parsed = parse_message(raw).unwrap();

        assert_eq!(parsed.sender, UNKNOWN_SENDER);
        assert_eq!(parsed.body, NO_CONTENT);
    }

    #[test]
    fn test_encoded_sender_is_decoded() {
        let raw = b"From: =?utf-8?B?TWljcm9zb2Z0?= <noreply@microsoft.com>\r\n\r\nhello";
        let parsed = parse_message(raw).unwrap();
        assert_eq!(parsed.sender, "Microsoft <noreply@microsoft.com>");
    }
}
