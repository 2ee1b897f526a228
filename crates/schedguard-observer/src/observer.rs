//! The observer process: a bus subscriber and an operator REPL feeding one
//! owner task that holds the only mutable handle to the reported cluster
//! (spec §5's "message-passing from both producers into a single owner
//! task" option — chosen over a shared mutex because neither producer then
//! ever needs to hold a lock across I/O).

use std::path::PathBuf;

use schedguard_bus::MessageBus;
use schedguard_cluster::ReportedCluster;
use schedguard_config::SshConfig;
use schedguard_store::SchedulerStore;
use schedguard_types::StatusMessage;
use tokio::sync::mpsc;

use crate::commands::{self, Command};
use crate::error::ObserverError;
use crate::ssh::{self, ServiceAction};

const TOPIC: &str = "news";

enum Event {
    Status(Vec<u8>),
    Line(String),
    InputClosed,
}

pub struct Observer<S, B> {
    store: S,
    bus: B,
    ssh: SshConfig,
    cluster: ReportedCluster,
}

impl<S, B> Observer<S, B>
where
    S: SchedulerStore + 'static,
    B: MessageBus + 'static,
{
    pub fn new(store: S, bus: B, ssh: SshConfig) -> Self {
        Self {
            store,
            bus,
            ssh,
            cluster: ReportedCluster::new(),
        }
    }

    /// Runs until `exit`/`quit` or operator input closes. Returns the
    /// process exit code (spec §6: 0 for clean exit).
    pub async fn run(mut self) -> Result<i32, ObserverError> {
        self.bus.connect().await?;
        self.bus.declare_topic(TOPIC).await?;

        let (tx, mut rx) = mpsc::unbounded_channel::<Event>();

        let status_tx = tx.clone();
        self.bus
            .subscribe(
                TOPIC,
                Box::new(move |bytes| {
                    let _ = status_tx.send(Event::Status(bytes));
                }),
            )
            .await?;

        let line_tx = tx.clone();
        let input_task = tokio::task::spawn_blocking(move || run_operator_input(line_tx));

        println!("{}", self.cluster.report());

        let exit_code = loop {
            match rx.recv().await {
                Some(Event::Status(bytes)) => {
                    match StatusMessage::from_bytes(&bytes) {
                        Ok(message) => {
                            self.cluster.consume(&message);
                            println!("{}", self.cluster.report());
                        }
                        Err(error) => {
                            tracing::warn!(%error, "dropping malformed bus payload");
                        }
                    }
                }
                Some(Event::Line(line)) => {
                    if let Some(code) = self.handle_command(&line).await {
                        break code;
                    }
                }
                Some(Event::InputClosed) | None => break 0,
            }
        };

        self.bus.disconnect().await;
        let _ = input_task.await;
        Ok(exit_code)
    }

    /// Returns `Some(exit_code)` when the command should end the session.
    async fn handle_command(&mut self, line: &str) -> Option<i32> {
        match commands::parse(line) {
            Command::Report => {
                println!("{}", self.cluster.report());
                None
            }
            Command::Update => {
                match self.refresh().await {
                    Ok(()) => println!("{}", self.cluster.report()),
                    Err(error) => println!("update failed: {error}"),
                }
                None
            }
            Command::Start(key) => {
                self.run_ssh_action(key, ServiceAction::Start).await;
                None
            }
            Command::Stop(key) => {
                self.run_ssh_action(key, ServiceAction::Stop).await;
                None
            }
            Command::Remove(key) => {
                match self.cluster.remove(key) {
                    Some(peer) => println!("removed {} ({})", key, peer.address),
                    None => println!("no peer at key {key}"),
                }
                None
            }
            Command::Exit => Some(0),
            Command::Unknown(text) => {
                println!("unrecognized command: {text}");
                None
            }
        }
    }

    async fn refresh(&mut self) -> Result<(), ObserverError> {
        self.store.connect().await?;
        let result = self.cluster.refresh(&mut self.store).await;
        self.store.disconnect().await;
        result.map_err(ObserverError::from)
    }

    /// Validates `key` against the current cluster view before building
    /// any command — the observer must refuse to shell out for a key it
    /// does not recognize.
    async fn run_ssh_action(&mut self, key: usize, action: ServiceAction) {
        let Some(peer) = self.cluster.peer(key) else {
            println!("no peer at key {key}");
            return;
        };
        let address = peer.address.clone();
        let (program, args) = ssh::build_command(&self.ssh.ssh_key, &address, action);

        match tokio::process::Command::new(&program).args(&args).status().await {
            Ok(status) if status.success() => println!("{action:?} sent to {address}"),
            Ok(status) => println!("{action:?} on {address} exited with {status}"),
            Err(error) => println!("failed to run ssh for {address}: {error}"),
        }
    }
}

/// Blocking readline loop, run on a dedicated thread via `spawn_blocking`.
/// Each line is forwarded to the owner task; EOF (Ctrl+D) or an editor
/// error closes the channel so the owner exits cleanly.
fn run_operator_input(tx: mpsc::UnboundedSender<Event>) {
    let Ok(mut editor) = rustyline::DefaultEditor::new() else {
        let _ = tx.send(Event::InputClosed);
        return;
    };

    loop {
        match editor.readline("schedguard> ") {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let _ = editor.add_history_entry(trimmed);
                if tx.send(Event::Line(trimmed.to_string())).is_err() {
                    return;
                }
            }
            Err(rustyline::error::ReadlineError::Interrupted) => continue,
            Err(_) => {
                let _ = tx.send(Event::InputClosed);
                return;
            }
        }
    }
}

/// Where the observer looks for its readline history, mirroring the
/// teacher CLI's `~/.kimberlite/repl_history` convention.
pub fn history_path() -> Option<PathBuf> {
    let home = std::env::var("HOME").ok()?;
    Some(PathBuf::from(home).join(".schedguard_history"))
}
