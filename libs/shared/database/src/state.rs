use std::sync::Arc;

use shared_config::{AppConfig, StoreBackend};

use crate::memory::MemorySchedulingStore;
use crate::postgrest::SupabaseSchedulingStore;
use crate::store::SchedulingStore;

/// Router state shared by every cell: configuration plus the one store
/// handle all slot and booking mutations go through.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn SchedulingStore>,
}

impl AppState {
    pub fn new(config: Arc<AppConfig>, store: Arc<dyn SchedulingStore>) -> Self {
        Self { config, store }
    }

    /// Builds the store selected by `config.store_backend`.
    pub fn from_config(config: AppConfig) -> Self {
        let store: Arc<dyn SchedulingStore> = match config.store_backend {
            StoreBackend::Supabase => Arc::new(SupabaseSchedulingStore::new(&config)),
            StoreBackend::Memory => Arc::new(MemorySchedulingStore::new()),
        };
        Self::new(Arc::new(config), store)
    }
}
