//! The authoritative schema (spec §6), reproduced verbatim.

/// Idempotent schema bring-up for local/dev use. Production deployments
/// are expected to run this (or an equivalent migration) out of band —
/// schedguard never creates or alters schema implicitly outside of this
/// explicit call.
pub const CREATE_SCHEDULERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS schedulers (
    address varchar(15) NOT NULL,
    birth    timestamp   NOT NULL,
    latest   timestamp   NOT NULL
)
"#;
