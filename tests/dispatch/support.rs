//! Shared test doubles.

#![allow(dead_code)]

use std::sync::Mutex;

use async_trait::async_trait;
use sourced_dispatch::user::{AccessToken, TokenError, TokenIssuer};
use sourced_dispatch::{Command, Context, Event};
use tokio::sync::mpsc;

pub fn command(name: &str) -> Command {
    Command::new(name, b"{}".to_vec())
}

pub fn event(name: &str) -> Event {
    Event::new(name, b"{}".to_vec())
}

/// Issues a fixed token and reports every username it was asked about.
pub struct RecordingIssuer {
    issued: mpsc::UnboundedSender<String>,
    secrets: Mutex<Vec<String>>,
}

impl RecordingIssuer {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                issued: tx,
                secrets: Mutex::new(Vec::new()),
            },
            rx,
        )
    }

    pub fn secrets(&self) -> Vec<String> {
        self.secrets.lock().unwrap().clone()
    }
}

#[async_trait]
impl TokenIssuer for RecordingIssuer {
    async fn password_credentials_token(
        &self,
        _ctx: &Context,
        username: &str,
        password: &str,
    ) -> Result<AccessToken, TokenError> {
        self.secrets.lock().unwrap().push(password.to_string());
        let _ = self.issued.send(username.to_string());
        Ok(AccessToken {
            access_token: "token-123".to_string(),
            token_type: "Bearer".to_string(),
            refresh_token: None,
            expires_in: Some(3600),
        })
    }
}

/// Identity provider that is always down.
pub struct FailingIssuer;

#[async_trait]
impl TokenIssuer for FailingIssuer {
    async fn password_credentials_token(
        &self,
        _ctx: &Context,
        _username: &str,
        _password: &str,
    ) -> Result<AccessToken, TokenError> {
        Err("identity provider unavailable".into())
    }
}
