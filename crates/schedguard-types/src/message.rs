//! The status message and its canonical wire encoding.

use serde::{Deserialize, Serialize};

use crate::TypesError;

/// The three statuses a peer can announce about another address (or
/// itself). When `status == Leader`, the message additionally means
/// "sender follows subject" — a self-leader announcement sets
/// `sender == subject`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusValue {
    Available,
    Unavailable,
    Leader,
}

/// An immutable record published to the `news` topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusMessage {
    /// The address that observed and is reporting this status.
    pub sender: String,
    /// The address the status is about.
    pub subject: String,
    pub status: StatusValue,
}

impl StatusMessage {
    pub fn new(sender: impl Into<String>, subject: impl Into<String>, status: StatusValue) -> Self {
        Self {
            sender: sender.into(),
            subject: subject.into(),
            status,
        }
    }

    /// A self-announcement: `sender == subject`.
    pub fn about_self(address: impl Into<String>, status: StatusValue) -> Self {
        let address = address.into();
        Self::new(address.clone(), address, status)
    }

    /// Canonical wire encoding: a JSON object with keys `sender`,
    /// `subject`, `status`.
    pub fn to_bytes(&self) -> Vec<u8> {
        // A `StatusMessage` is three owned strings and an enum with no
        // untagged variants; serialization cannot fail.
        serde_json::to_vec(self).expect("StatusMessage always serializes")
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TypesError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
