//! `schedguard observer run` - the operator-facing cluster viewer.

use anyhow::Result;
use schedguard_bus::LapinMessageBus;
use schedguard_observer::Observer;
use schedguard_store::PgSchedulerStore;

use super::load_config;

pub async fn run(config_dir: Option<String>) -> Result<()> {
    let config = load_config(config_dir)?;
    let store = PgSchedulerStore::new(config.store.connection_uri());
    let bus = LapinMessageBus::new(config.bus.connection_uri());

    let observer = Observer::new(store, bus, config.ssh);
    let exit_code = observer.run().await?;
    std::process::exit(exit_code);
}
