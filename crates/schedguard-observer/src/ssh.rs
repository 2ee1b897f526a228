//! Builds the remote service-control command for `start`/`stop`.
//!
//! The original's own notes flag "sql injection and string interpolation"
//! as something to fix; this port never interpolates the address into a
//! shell string. The command is an argument vector handed straight to
//! `exec`, and the caller validates the peer key *before* this function is
//! ever reached.

use std::path::Path;

pub const SERVICE_NAME: &str = "airflow-multischeduler";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceAction {
    Start,
    Stop,
}

impl ServiceAction {
    fn verb(self) -> &'static str {
        match self {
            ServiceAction::Start => "start",
            ServiceAction::Stop => "stop",
        }
    }
}

/// Returns `(program, args)` ready for `tokio::process::Command`.
pub fn build_command(ssh_key: &Path, address: &str, action: ServiceAction) -> (String, Vec<String>) {
    let args = vec![
        "-i".to_string(),
        ssh_key.display().to_string(),
        "-o".to_string(),
        "StrictHostKeyChecking=no".to_string(),
        address.to_string(),
        "sudo".to_string(),
        "systemctl".to_string(),
        action.verb().to_string(),
        SERVICE_NAME.to_string(),
    ];
    ("ssh".to_string(), args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn address_is_a_single_argument_never_interpolated_into_a_string() {
        let key = PathBuf::from("/home/op/.ssh/id_rsa");
        let (program, args) = build_command(&key, "10.0.0.1; rm -rf /", ServiceAction::Start);
        assert_eq!(program, "ssh");
        // The hostile address lands as exactly one argv element.
        assert!(args.contains(&"10.0.0.1; rm -rf /".to_string()));
        assert_eq!(
            args.iter().filter(|a| a.contains("rm -rf")).count(),
            1,
            "address must not be split or re-interpreted"
        );
    }

    #[test]
    fn start_and_stop_select_the_right_verb() {
        let key = PathBuf::from("/home/op/.ssh/id_rsa");
        let (_, start_args) = build_command(&key, "10.0.0.1", ServiceAction::Start);
        let (_, stop_args) = build_command(&key, "10.0.0.1", ServiceAction::Stop);
        assert!(start_args.contains(&"start".to_string()));
        assert!(stop_args.contains(&"stop".to_string()));
    }
}
