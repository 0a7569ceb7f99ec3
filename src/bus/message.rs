//! Command and event envelopes.
//!
//! Both carry a type identifier (`name`) used for handler lookup and a JSON
//! payload. They are immutable once built: fields are private and the
//! payload is shared, so fanning an event out to many handlers only clones
//! a pointer.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use super::error::HandlerError;

#[derive(Clone, Debug)]
struct Envelope {
    id: Uuid,
    name: String,
    payload: Arc<[u8]>,
    metadata: Vec<(String, String)>,
}

impl Envelope {
    fn new(name: String, payload: Vec<u8>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            payload: payload.into(),
            metadata: Vec::new(),
        }
    }

    fn metadata(&self, key: &str) -> Option<&str> {
        self.metadata
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// An instruction to change state, routed to exactly one handler.
#[derive(Clone, Debug)]
pub struct Command(Envelope);

impl Command {
    /// Create a command with a raw payload.
    pub fn new(name: impl Into<String>, payload: Vec<u8>) -> Self {
        Self(Envelope::new(name.into(), payload))
    }

    /// Create a command with a JSON-serialized payload.
    pub fn encode<T: Serialize>(name: impl Into<String>, payload: &T) -> Result<Self, HandlerError> {
        Ok(Self::new(name, serde_json::to_vec(payload)?))
    }

    /// Decode the JSON payload.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, HandlerError> {
        Ok(serde_json::from_slice(&self.0.payload)?)
    }

    /// Add metadata to the command.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.metadata.push((key.into(), value.into()));
        self
    }

    pub fn id(&self) -> Uuid {
        self.0.id
    }

    /// Type identifier used for handler lookup.
    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn payload(&self) -> &[u8] {
        &self.0.payload
    }

    /// Get the payload as a string (if valid UTF-8).
    pub fn payload_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.0.payload).ok()
    }

    pub fn metadata(&self, key: &str) -> Option<&str> {
        self.0.metadata(key)
    }
}

/// A notification that a state change already happened, routed to zero or
/// more handlers.
#[derive(Clone, Debug)]
pub struct Event(Envelope);

impl Event {
    /// Create an event with a raw payload.
    pub fn new(name: impl Into<String>, payload: Vec<u8>) -> Self {
        Self(Envelope::new(name.into(), payload))
    }

    /// Create an event with a JSON-serialized payload.
    pub fn encode<T: Serialize>(name: impl Into<String>, payload: &T) -> Result<Self, HandlerError> {
        Ok(Self::new(name, serde_json::to_vec(payload)?))
    }

    /// Decode the JSON payload.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, HandlerError> {
        Ok(serde_json::from_slice(&self.0.payload)?)
    }

    /// Add metadata to the event.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.metadata.push((key.into(), value.into()));
        self
    }

    /// Carry the originating command's id as the correlation id.
    pub fn caused_by(self, command: &Command) -> Self {
        self.with_metadata("correlation-id", command.id().to_string())
    }

    pub fn id(&self) -> Uuid {
        self.0.id
    }

    /// Type identifier used for handler lookup.
    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn payload(&self) -> &[u8] {
        &self.0.payload
    }

    /// Get the payload as a string (if valid UTF-8).
    pub fn payload_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.0.payload).ok()
    }

    pub fn metadata(&self, key: &str) -> Option<&str> {
        self.0.metadata(key)
    }
}
