//! Request dispatch to the InboxAI backend
//!
//! One submitted command becomes exactly one `POST` with a JSON body. The
//! body shape depends on the deployment, see [`PayloadFormat`].

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use url::Url;

use crate::input::Command;
use crate::reply::BackendReply;
use crate::transcript::Ticket;
use crate::{Config, Error, Result};

/// JSON body shape expected by the endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PayloadFormat {
    /// `{"command": "..."}`
    #[default]
    Command,
    /// `{"body": "...", "sender": "..."}`
    Email,
}

impl FromStr for PayloadFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "command" => Ok(Self::Command),
            "email" => Ok(Self::Email),
            other => Err(Error::Config(format!("unknown payload format: {other}"))),
        }
    }
}

#[derive(Serialize)]
struct CommandPayload<'a> {
    command: &'a str,
}

#[derive(Serialize)]
struct EmailPayload<'a> {
    body: &'a str,
    sender: &'a str,
}

impl PayloadFormat {
    /// Build the request body for a command
    #[must_use]
    pub fn body(self, command: &Command, sender: &str) -> serde_json::Value {
        let body = match self {
            Self::Command => serde_json::to_value(CommandPayload {
                command: command.as_str(),
            }),
            Self::Email => serde_json::to_value(EmailPayload {
                body: command.as_str(),
                sender,
            }),
        };
        // Serializing plain string fields cannot fail
        body.unwrap_or_default()
    }
}

/// Sends commands and returns the parsed reply
#[async_trait]
pub trait Backend: Send + Sync {
    /// Send one command
    ///
    /// # Errors
    ///
    /// Returns error on network failure, non-success status or a body that is not JSON
    async fn send(&self, command: &Command) -> Result<BackendReply>;
}

/// Backend reached over HTTP
pub struct HttpBackend {
    client: reqwest::Client,
    endpoint: Url,
    format: PayloadFormat,
    sender: String,
}

impl HttpBackend {
    /// Create a backend client
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new(
        endpoint: Url,
        format: PayloadFormat,
        sender: String,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            endpoint,
            format,
            sender,
        })
    }

    /// Create a backend client from configuration
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            config.endpoint.clone(),
            config.payload_format,
            config.sender.clone(),
            config.request_timeout,
        )
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn send(&self, command: &Command) -> Result<BackendReply> {
        let body = self.format.body(command, &self.sender);
        tracing::debug!(endpoint = %self.endpoint, format = ?self.format, "sending command");

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "backend request failed");
                e
            })?;

        let status = response.status();
        tracing::debug!(status = %status, "received response");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "backend error");
            return Err(Error::Backend(format!("backend error {status}: {body}")));
        }

        let bytes = response.bytes().await?;
        let value: serde_json::Value = serde_json::from_slice(&bytes).map_err(|e| {
            tracing::error!(error = %e, "failed to parse backend response");
            e
        })?;

        Ok(BackendReply::from_value(&value))
    }
}

#[async_trait]
impl<T: Backend + ?Sized> Backend for Arc<T> {
    async fn send(&self, command: &Command) -> Result<BackendReply> {
        (**self).send(command).await
    }
}

/// A command accepted for dispatch, tied to its thinking placeholder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub ticket: Ticket,
    pub command: Command,
}

/// Result of dispatching a [`Submission`]
#[derive(Debug)]
pub struct Completion {
    pub ticket: Ticket,
    pub outcome: Result<BackendReply>,
}

/// Cheaply cloneable handle that runs submissions against a backend
///
/// Dispatching does not borrow the chat controller, so the front end can
/// keep accepting input while requests are outstanding.
#[derive(Clone)]
pub struct Dispatcher {
    backend: Arc<dyn Backend>,
}

impl Dispatcher {
    #[must_use]
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    /// Issue the request for one submission
    pub async fn dispatch(&self, submission: Submission) -> Completion {
        let outcome = self.backend.send(&submission.command).await;
        Completion {
            ticket: submission.ticket,
            outcome,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn command_body_shape() {
        let command = Command::parse("  summarize unread  ").unwrap();
        assert_eq!(
            PayloadFormat::Command.body(&command, "ignored"),
            json!({"command": "summarize unread"})
        );
    }

    #[test]
    fn email_body_shape() {
        let command = Command::parse("Meeting at 3").unwrap();
        assert_eq!(
            PayloadFormat::Email.body(&command, "boss@example.com"),
            json!({"body": "Meeting at 3", "sender": "boss@example.com"})
        );
    }

    #[test]
    fn parses_format_names() {
        assert_eq!("Command".parse::<PayloadFormat>().unwrap(), PayloadFormat::Command);
        assert_eq!(" email ".parse::<PayloadFormat>().unwrap(), PayloadFormat::Email);
        assert!("xml".parse::<PayloadFormat>().is_err());
    }
}
