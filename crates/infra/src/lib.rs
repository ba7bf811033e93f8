//! Storage adapters and asset loading for warden.

pub mod assets;
pub mod memory;
pub mod postgres;

pub use assets::StaticAssetLoader;
pub use memory::InMemoryAdapter;
pub use postgres::PostgresAdapter;
