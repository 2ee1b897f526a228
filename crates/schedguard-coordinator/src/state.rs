//! The coordinator's state machine states (spec §4.4).

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorState {
    /// Knows its address, has not written the store.
    Init,
    /// Registered; no child running; a leader is known or unknown and
    /// differs from this node.
    Follower,
    /// Registered; owns a live child process.
    Leader,
    /// Lost the store or bus, or just relinquished leadership; child (if
    /// any) has been torn down; awaiting reset.
    Disconnected,
}
