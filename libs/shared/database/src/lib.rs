pub mod memory;
pub mod postgrest;
pub mod state;
pub mod store;
pub mod supabase;

pub use memory::MemorySchedulingStore;
pub use postgrest::SupabaseSchedulingStore;
pub use state::AppState;
pub use store::{SchedulingStore, StoreError};
