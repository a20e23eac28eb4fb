pub mod config;

pub use config::TileProviderConfig;
