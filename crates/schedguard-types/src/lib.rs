//! Wire types shared by every `schedguard` component.
//!
//! A [`StatusMessage`] is the only thing that crosses the bus. Its
//! encoding is a self-describing JSON object, chosen over a length-prefixed
//! or protobuf encoding because the cluster has no schema-evolution story
//! to protect yet and JSON keeps the wire payload directly readable when
//! debugging a stuck coordinator.

mod error;
mod message;

pub use error::TypesError;
pub use message::{StatusMessage, StatusValue};
