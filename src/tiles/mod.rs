pub mod decode;
pub mod fetch;
pub mod key;
pub mod manager;
pub mod scheduler;
pub mod source;
pub mod store;
pub mod tile;

// Re-exports for convenience
pub use fetch::{Fetcher, HttpFetcher};
pub use key::{TileId, TileKey};
pub use manager::TileManager;
pub use scheduler::{DownloadScheduler, TileServices};
pub use source::{OpenStreetMapSource, TemplateSource, TileSource};
pub use store::TileStore;
pub use tile::{Pixel, Tile, TileStatus};
