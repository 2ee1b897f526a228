//! `schedguard coordinator run` - runs the election/liveness loop forever.

use anyhow::{bail, Result};
use schedguard_bus::LapinMessageBus;
use schedguard_coordinator::{ChildSpec, Coordinator, MetadataAddressSource, StaticAddressSource};
use schedguard_store::PgSchedulerStore;
use tracing::info;

use super::load_config;

pub async fn run(config_dir: Option<String>, address: Option<String>, program: Vec<String>) -> Result<()> {
    let Some((program, args)) = program.split_first().map(|(p, a)| (p.clone(), a.to_vec())) else {
        bail!("no supervised program given; pass it after `--`");
    };

    let config = load_config(config_dir)?;
    let store = PgSchedulerStore::new(config.store.connection_uri());
    let bus = LapinMessageBus::new(config.bus.connection_uri());
    let child_spec = ChildSpec::new(program, args);

    info!(program = %child_spec.program, "starting coordinator");

    match address {
        Some(address) => {
            let mut coordinator = Coordinator::new(
                store,
                bus,
                StaticAddressSource::new(address),
                child_spec,
                config.timing,
            );
            coordinator.run().await;
        }
        None => {
            let mut coordinator = Coordinator::new(
                store,
                bus,
                MetadataAddressSource::aws_default(),
                child_spec,
                config.timing,
            );
            coordinator.run().await;
        }
    }

    Ok(())
}
