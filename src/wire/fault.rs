//! Error sentinel strings
//!
//! The remote endpoint reports failures by returning a string that starts
//! with a sentinel prefix, followed by delimiter-separated fields:
//!
//! ```text
//! <sentinel><delimiter><message>[<delimiter><detail>...]
//! ```
//!
//! Inside a field a backslash escapes the next character, so a message may
//! contain the delimiter (`a\|\|b`) or a literal backslash (`\\`).

use std::fmt;

use serde::{Deserialize, Serialize};

/// A failure reported by the remote endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFault {
    pub message: String,
    /// Any fields after the message (error ids, stack traces).
    pub details: Vec<String>,
}

impl RemoteFault {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            details: Vec::new(),
        }
    }
}

impl fmt::Display for RemoteFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FaultFormat {
    pub sentinel: String,
    pub delimiter: String,
}

impl Default for FaultFormat {
    fn default() -> Self {
        Self {
            sentinel: "__ERR".to_string(),
            delimiter: "||".to_string(),
        }
    }
}

impl FaultFormat {
    /// The sentinel used by Flash Player based endpoints.
    pub fn legacy() -> Self {
        Self {
            sentinel: "__FLASHERROR".to_string(),
            ..Self::default()
        }
    }

    pub fn is_fault(&self, text: &str) -> bool {
        !self.sentinel.is_empty() && text.starts_with(&self.sentinel)
    }

    /// Parse `text` if it is a fault string. The message is the second field.
    pub fn parse(&self, text: &str) -> Option<RemoteFault> {
        if !self.is_fault(text) {
            return None;
        }
        let mut fields = self.split(text).into_iter().skip(1);
        let message = fields.next().unwrap_or_default();
        Some(RemoteFault {
            message,
            details: fields.collect(),
        })
    }

    /// Build a fault string the remote side (or a test double) can return.
    pub fn encode(&self, fault: &RemoteFault) -> String {
        let mut out = self.sentinel.clone();
        for field in std::iter::once(&fault.message).chain(&fault.details) {
            out.push_str(&self.delimiter);
            out.push_str(&self.escape(field));
        }
        out
    }

    fn escape(&self, field: &str) -> String {
        let mut out = String::with_capacity(field.len());
        for c in field.chars() {
            if c == '\\' || self.delimiter.contains(c) {
                out.push('\\');
            }
            out.push(c);
        }
        out
    }

    fn split(&self, text: &str) -> Vec<String> {
        let mut fields = Vec::new();
        let mut current = String::new();
        let mut rest = text;
        while let Some(c) = rest.chars().next() {
            if c == '\\' {
                rest = &rest[1..];
                if let Some(escaped) = rest.chars().next() {
                    current.push(escaped);
                    rest = &rest[escaped.len_utf8()..];
                }
            } else if !self.delimiter.is_empty() && rest.starts_with(&self.delimiter) {
                fields.push(std::mem::take(&mut current));
                rest = &rest[self.delimiter.len()..];
            } else {
                current.push(c);
                rest = &rest[c.len_utf8()..];
            }
        }
        fields.push(current);
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_message_field() {
        let fault = FaultFormat::default().parse("__ERR||boom").unwrap();
        assert_eq!(fault.message, "boom");
        assert!(fault.details.is_empty());
    }

    #[test]
    fn keeps_trailing_fields_as_details() {
        let fault = FaultFormat::default()
            .parse("__ERR||null reference||1009")
            .unwrap();
        assert_eq!(fault.message, "null reference");
        assert_eq!(fault.details, vec!["1009"]);
    }

    #[test]
    fn ordinary_strings_are_not_faults() {
        let format = FaultFormat::default();
        assert!(format.parse("boom").is_none());
        assert!(format.parse("x__ERR||boom").is_none());
    }

    #[test]
    fn sentinel_without_message_gives_empty_message() {
        let fault = FaultFormat::default().parse("__ERR").unwrap();
        assert_eq!(fault.message, "");
    }

    #[test]
    fn escaped_delimiters_survive_encoding() {
        let format = FaultFormat::default();
        let fault = RemoteFault {
            message: r"a||b \ c".to_string(),
            details: vec!["x|y".to_string()],
        };
        let text = format.encode(&fault);
        assert_eq!(text, r"__ERR||a\|\|b \\ c||x\|y");
        assert_eq!(format.parse(&text).unwrap(), fault);
    }

    #[test]
    fn legacy_sentinel() {
        let format = FaultFormat::legacy();
        assert_eq!(format.parse("__FLASHERROR||oops").unwrap().message, "oops");
        assert!(format.parse("__ERR||oops").is_none());
    }
}
