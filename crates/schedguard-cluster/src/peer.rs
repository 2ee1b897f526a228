//! A single reported peer and the tagged "news" it can receive.

use schedguard_types::StatusValue;

/// The observer's dynamically-typed "news" union from spec §9: either a
/// status value, or an address string meaning "the preceding sender now
/// follows this address". Modeled as an explicit tagged variant rather
/// than relying on a runtime type check, per the design note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum News {
    Status(StatusValue),
    Following(String),
}

/// A peer as reported to the operator. `key` is a dense, base-1 index
/// into the cluster's insertion-ordered list; it is reassigned whenever
/// any peer is removed (spec §3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportedPeer {
    pub key: usize,
    pub address: String,
    pub available: bool,
    pub leading: bool,
    pub following: Option<String>,
}

impl ReportedPeer {
    pub fn new(key: usize, address: impl Into<String>) -> Self {
        Self {
            key,
            address: address.into(),
            available: false,
            leading: false,
            following: None,
        }
    }

    /// Applies one piece of news (spec §4.5's per-peer state table).
    pub fn apply(&mut self, news: &News) {
        match news {
            News::Status(StatusValue::Available) => self.available = true,
            News::Status(StatusValue::Unavailable) => {
                self.available = false;
                self.leading = false;
                self.following = None;
            }
            News::Status(StatusValue::Leader) => self.leading = true,
            News::Following(leader) => self.following = Some(leader.clone()),
        }
    }
}
