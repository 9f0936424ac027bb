//! # SMTP Transport
//!
//! Minimal SMTP client over a tokio TCP stream, enough to hand messages to a local
//! relay (no TLS, no authentication).
//!
//! ## Wire Protocol
//!
//! Commands are single CRLF-terminated lines. Replies are one or more lines starting
//! with a 3-digit code; a `-` after the code marks a continuation line:
//!
//! ```text
//! S: 220 mail.example.com ESMTP
//! C: EHLO localhost
//! S: 250-mail.example.com
//! S: 250 SIZE 10240000
//! C: MAIL FROM:<admin@localhost.com>
//! S: 250 OK
//! C: RCPT TO:<joao@example.com>
//! S: 250 OK
//! C: DATA
//! S: 354 End data with <CR><LF>.<CR><LF>
//! C: ...message, dot-stuffed...
//! C: .
//! S: 250 Queued
//! C: QUIT
//! S: 221 Bye
//! ```

use async_trait::async_trait;
use log::{debug, info, warn};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use super::message::Email;
use super::Mailer;
use crate::common::config::MailConfig;
use crate::common::{CmsError, Result};

/// Upper bound on the lines of a single reply, so a broken server cannot stall us.
const MAX_REPLY_LINES: usize = 128;

/// Whole-conversation timeout.
const SEND_TIMEOUT: Duration = Duration::from_secs(30);

/// A server reply: its code and the text of every line joined by newlines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub code: u16,
    pub text: String,
}

/// TCP connection to an SMTP server with reply parsing.
pub struct SmtpConnection {
    stream: BufReader<TcpStream>,
}

impl SmtpConnection {
    /// Wrap an established TCP connection.
    pub fn new(stream: TcpStream) -> Self {
        Self {
            stream: BufReader::new(stream),
        }
    }

    /// Read one (possibly multi-line) reply.
    ///
    /// # Returns
    /// - `Ok(Reply)`: Parsed reply
    /// - `Err`: Connection closed, I/O error or malformed reply line
    pub async fn read_reply(&mut self) -> Result<Reply> {
        let mut text = Vec::new();
        for _ in 0..MAX_REPLY_LINES {
            let mut line = String::new();
            if self.stream.read_line(&mut line).await? == 0 {
                return Err(CmsError::Mail("connection closed by server".to_string()));
            }
            let line = line.trim_end_matches(['\r', '\n']);
            let code = line
                .get(..3)
                .and_then(|c| c.parse::<u16>().ok())
                .ok_or_else(|| CmsError::Mail(format!("malformed reply: {:?}", line)))?;
            let rest = line.get(3..).unwrap_or("");
            text.push(rest.trim_start_matches(['-', ' ']).to_string());

            if !rest.starts_with('-') {
                return Ok(Reply {
                    code,
                    text: text.join("\n"),
                });
            }
        }
        Err(CmsError::Mail("reply too long".to_string()))
    }

    /// Read a reply and check its code is one of `expected`.
    pub async fn expect(&mut self, expected: &[u16]) -> Result<Reply> {
        let reply = self.read_reply().await?;
        if expected.contains(&reply.code) {
            Ok(reply)
        } else {
            Err(CmsError::Mail(format!("{} {}", reply.code, reply.text)))
        }
    }

    /// Send a command line and check the reply code.
    pub async fn command(&mut self, line: &str, expected: &[u16]) -> Result<Reply> {
        debug!("SMTP > {}", line);
        self.stream.write_all(line.as_bytes()).await?;
        self.stream.write_all(b"\r\n").await?;
        self.stream.flush().await?;
        self.expect(expected).await
    }

    /// Send the message body after `DATA`, dot-stuffed and terminated by `.`.
    pub async fn send_data(&mut self, message: &str) -> Result<Reply> {
        self.stream.write_all(dot_stuff(message).as_bytes()).await?;
        self.stream.write_all(b".\r\n").await?;
        self.stream.flush().await?;
        self.expect(&[250]).await
    }
}

/// Normalize line endings to CRLF and double any leading dot.
fn dot_stuff(message: &str) -> String {
    let mut out = String::with_capacity(message.len() + 16);
    for line in message.lines() {
        if line.starts_with('.') {
            out.push('.');
        }
        out.push_str(line);
        out.push_str("\r\n");
    }
    out
}

/// Delivers mail through an SMTP relay.
#[derive(Debug, Clone)]
pub struct SmtpMailer {
    host: String,
    port: u16,
    helo_name: String,
}

impl SmtpMailer {
    pub fn new(host: &str, port: u16, helo_name: &str) -> Self {
        Self {
            host: host.to_string(),
            port,
            helo_name: helo_name.to_string(),
        }
    }

    pub fn from_config(config: &MailConfig) -> Self {
        Self::new(&config.smtp_host, config.smtp_port, &config.helo_name)
    }

    async fn deliver(&self, email: &Email) -> Result<()> {
        let stream = TcpStream::connect((self.host.as_str(), self.port)).await?;
        let mut conn = SmtpConnection::new(stream);

        conn.expect(&[220]).await?;
        if let Err(e) = conn
            .command(&format!("EHLO {}", self.helo_name), &[250])
            .await
        {
            debug!("EHLO rejected ({}), falling back to HELO", e);
            conn.command(&format!("HELO {}", self.helo_name), &[250])
                .await?;
        }
        conn.command(&format!("MAIL FROM:<{}>", email.from.address), &[250])
            .await?;
        conn.command(&format!("RCPT TO:<{}>", email.to.address), &[250, 251])
            .await?;
        conn.command("DATA", &[354]).await?;
        conn.send_data(&email.to_mime()).await?;

        if let Err(e) = conn.command("QUIT", &[221]).await {
            warn!("SMTP QUIT failed after delivery: {}", e);
        }
        Ok(())
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: &Email) -> Result<()> {
        tokio::time::timeout(SEND_TIMEOUT, self.deliver(email))
            .await
            .map_err(|_| CmsError::Mail("timed out talking to SMTP server".to_string()))??;
        info!("📧 Sent \"{}\" to {}", email.subject, email.to.address);
        Ok(())
    }
}
