//! # Message Format
//!
//! Builds the RFC 5322 text handed to the SMTP relay. Every message is a
//! `multipart/alternative` with a plain-text and an HTML part, both UTF-8 and
//! base64 encoded. Display names and subjects that are not plain ASCII are written
//! as RFC 2047 encoded words.

use base64::{engine::general_purpose, Engine as _};
use chrono::Local;
use serde::Serialize;
use std::fmt;

/// Base64 line length allowed by MIME.
const LINE_WIDTH: usize = 76;

/// A display name plus an address, e.g. `"John Smith" <admin@localhost.com>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Mailbox {
    pub name: String,
    pub address: String,
}

impl Mailbox {
    /// Line breaks are dropped from both parts so neither can start a new header.
    pub fn new(name: &str, address: &str) -> Self {
        Self {
            name: strip_line_breaks(name),
            address: strip_line_breaks(address),
        }
    }
}

impl fmt::Display for Mailbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.name.is_empty() {
            return write!(f, "<{}>", self.address);
        }
        let plain = self
            .name
            .chars()
            .all(|c| c.is_ascii_graphic() || c == ' ')
            && !self.name.contains(|c: char| c == '"' || c == '\\');
        if plain {
            write!(f, "\"{}\" <{}>", self.name, self.address)
        } else {
            write!(f, "{} <{}>", encoded_word(&self.name), self.address)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    pub from: Mailbox,
    pub to: Mailbox,
    pub subject: String,
    pub text: String,
    pub html: String,
}

impl Email {
    /// Render the full message, headers and body, with CRLF line endings.
    pub fn to_mime(&self) -> String {
        let boundary = format!("=_{}", uuid::Uuid::new_v4().simple());
        let domain = self
            .from
            .address
            .rsplit_once('@')
            .map(|(_, domain)| domain)
            .unwrap_or("localhost");

        let mut out = String::new();
        out.push_str(&format!("From: {}\r\n", self.from));
        out.push_str(&format!("To: {}\r\n", self.to));
        out.push_str(&format!(
            "Subject: {}\r\n",
            header_text(&strip_line_breaks(&self.subject))
        ));
        out.push_str(&format!("Date: {}\r\n", Local::now().to_rfc2822()));
        out.push_str(&format!(
            "Message-ID: <{}@{}>\r\n",
            uuid::Uuid::new_v4().simple(),
            domain
        ));
        out.push_str("MIME-Version: 1.0\r\n");
        out.push_str(&format!(
            "Content-Type: multipart/alternative; boundary=\"{}\"\r\n\r\n",
            boundary
        ));

        for (mime, body) in [("text/plain", &self.text), ("text/html", &self.html)] {
            out.push_str(&format!("--{}\r\n", boundary));
            out.push_str(&format!("Content-Type: {}; charset=UTF-8\r\n", mime));
            out.push_str("Content-Transfer-Encoding: base64\r\n");
            out.push_str("Content-Disposition: inline\r\n\r\n");
            out.push_str(&wrapped_base64(body.as_bytes()));
        }
        out.push_str(&format!("--{}--\r\n", boundary));
        out
    }
}

/// Escape text for inclusion in an HTML body.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn strip_line_breaks(s: &str) -> String {
    s.chars().filter(|c| *c != '\r' && *c != '\n').collect()
}

fn header_text(s: &str) -> String {
    if s.chars().all(|c| c.is_ascii_graphic() || c == ' ') {
        s.to_string()
    } else {
        encoded_word(s)
    }
}

fn encoded_word(s: &str) -> String {
    format!("=?UTF-8?B?{}?=", general_purpose::STANDARD.encode(s.as_bytes()))
}

fn wrapped_base64(data: &[u8]) -> String {
    let encoded = general_purpose::STANDARD.encode(data);
    let mut out = String::with_capacity(encoded.len() + encoded.len() / LINE_WIDTH * 2 + 2);
    for chunk in encoded.as_bytes().chunks(LINE_WIDTH) {
        // base64 output is ASCII
        out.push_str(std::str::from_utf8(chunk).unwrap_or_default());
        out.push_str("\r\n");
    }
    out
}
