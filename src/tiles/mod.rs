//! Tile resolution pipeline
//!
//! This module provides the pieces a map view needs to get tiles without
//! blocking:
//! - An LRU tile cache that recycles evicted image buffers
//! - Per-request state walking an ordered provider chain
//! - The provider array that deduplicates requests and drives the chain

pub mod array;
pub mod cache;
pub mod image;
pub mod key;
pub mod network;
pub mod provider;
pub mod request;
pub mod sink;

// Re-exports for convenience
pub use array::{ResolverStats, TileLookup, TileProviderArray, TileProviderArrayBuilder};
pub use cache::{CacheStats, TileCache};
pub use image::{Recycle, TileImage};
pub use key::TileKey;
pub use network::{AlwaysOnline, ConnectivityFlag, NetworkMonitor};
pub use provider::{TileProvider, TileStyle};
pub use request::{RequestId, TileRequestState};
pub use sink::{ChannelSink, NullSink, TileEvent, TileSink};
