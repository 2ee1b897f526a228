use schedguard_bus::BusError;
use schedguard_store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum ObserverError {
    #[error(transparent)]
    Bus(#[from] BusError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("{0}")]
    Fatal(String),
}
