use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// RFC 5322 specials, which force a display name into a quoted string.
const SPECIALS: &[char] = &['(', ')', '<', '>', '[', ']', ':', ';', '@', '\\', ',', '.', '"'];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailAddress {
    pub email: String,
    pub name: Option<String>,
}

impl EmailAddress {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into()).filter(|name: &String| !name.is_empty());
        self
    }
}

/// Renders as a mailbox, `Name <address>` when a display name is set.
///
/// Names with specials are quoted, non-ASCII names are written as an
/// RFC 2047 encoded word.
impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match &self.name {
            Some(name) => name,
            None => return f.write_str(&self.email),
        };
        if !name.is_ascii() {
            write!(f, "=?UTF-8?B?{}?=", STANDARD.encode(name))?;
        } else if name.contains(SPECIALS) || name.chars().any(|c| c.is_ascii_control()) {
            f.write_str("\"")?;
            for c in name.chars().filter(|c| !c.is_ascii_control()) {
                if c == '"' || c == '\\' {
                    f.write_str("\\")?;
                }
                write!(f, "{}", c)?;
            }
            f.write_str("\"")?;
        } else {
            f.write_str(name)?;
        }
        write!(f, " <{}>", self.email)
    }
}

/// One outbound email, built fresh for every flushed batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub from: EmailAddress,
    pub to: EmailAddress,
    pub subject: String,
    pub text_body: String,
    /// Same text as `text_body`; no escaping or markup is applied.
    pub html_body: String,
}

impl EmailMessage {
    pub fn new(from: EmailAddress, to: EmailAddress, subject: String, body: String) -> Self {
        Self {
            from,
            to,
            subject,
            html_body: body.clone(),
            text_body: body,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mailbox(name: &str) -> String {
        EmailAddress::new("ops@example.com").with_name(name).to_string()
    }

    #[test]
    fn plain_names_are_written_as_is() {
        assert_eq!(mailbox("Ops Team"), "Ops Team <ops@example.com>");
        assert_eq!(EmailAddress::new("ops@example.com").to_string(), "ops@example.com");
        assert_eq!(mailbox(""), "ops@example.com");
    }

    #[test]
    fn names_with_specials_are_quoted_and_escaped() {
        assert_eq!(mailbox("Ops, Paging"), "\"Ops, Paging\" <ops@example.com>");
        assert_eq!(
            mailbox(r#"The "On-Call" <team>"#),
            r#""The \"On-Call\" <team>" <ops@example.com>"#
        );
        assert_eq!(mailbox(r"back\slash."), r#""back\\slash." <ops@example.com>"#);
    }

    #[test]
    fn non_ascii_names_are_encoded_words() {
        assert_eq!(mailbox("Grüße"), "=?UTF-8?B?R3LDvMOfZQ==?= <ops@example.com>");
    }
}
