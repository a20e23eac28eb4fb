//! # tilechain
//!
//! Non-blocking map tile resolution.
//!
//! A display layer asks a [`TileProviderArray`] for tiles by [`TileKey`].
//! Cached tiles come back immediately; anything else is resolved in the
//! background by walking an ordered chain of asynchronous [`TileProvider`]s
//! (local store first, network last, or whatever order is registered) and
//! the outcome is delivered to a [`TileSink`].

pub mod core;
pub mod logging;
pub mod prelude;
pub mod runtime;
pub mod tiles;

use std::time::Duration;

// Re-export public API
pub use crate::core::config::TileProviderConfig;

pub use tiles::{
    array::{TileLookup, TileProviderArray, TileProviderArrayBuilder},
    cache::TileCache,
    image::{Recycle, TileImage},
    key::TileKey,
    network::{ConnectivityFlag, NetworkMonitor},
    provider::{TileProvider, TileStyle},
    request::TileRequestState,
    sink::{ChannelSink, TileEvent, TileSink},
};

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, TileError>;

/// Why a single provider could not produce a tile
///
/// Always recoverable: the provider array moves on to the next provider.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProviderError {
    #[error("Tile not found")]
    NotFound,

    #[error("IO error: {0}")]
    Io(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Attempt timed out after {0:?}")]
    Timeout(Duration),

    #[error("Provider error: {0}")]
    Other(String),
}

impl From<std::io::Error> for ProviderError {
    fn from(err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            ProviderError::NotFound
        } else {
            ProviderError::Io(err.to_string())
        }
    }
}

/// Terminal and configuration errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TileError {
    #[error("All providers failed for tile {tile} ({attempts} attempted)")]
    ChainExhausted { tile: TileKey, attempts: usize },

    #[error("No tile providers registered, cannot resolve {tile}")]
    NoProviders { tile: TileKey },

    #[error("Provider {provider} has invalid zoom range {min}..={max}")]
    InvalidZoomRange { provider: String, min: u8, max: u8 },

    #[error("Tile style changed while {tile} was loading")]
    StyleChanged { tile: TileKey },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl TileError {
    /// Errors caused by how the pipeline was set up rather than by a provider
    pub fn is_configuration_error(&self) -> bool {
        !matches!(
            self,
            TileError::ChainExhausted { .. } | TileError::StyleChanged { .. }
        )
    }
}

/// Error type alias for convenience
pub type Error = TileError;
