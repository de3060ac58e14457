// Gateway module for storage - follows the Train Station Pattern
// All external access must go through this gateway

mod file_store;
mod memory_store;
mod traits;

pub use file_store::FileStore;
pub use memory_store::MemoryStore;
pub use traits::KeyValueStore;
