use super::image::TileImage;
use super::request::TileRequestState;
use crate::ProviderError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Rendering style a tile source can be switched to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileStyle {
    pub name: String,
}

impl TileStyle {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// One asynchronous source of tiles in a provider chain
///
/// `load_tile` runs on a worker task and resolves exactly once per call, with
/// the tile or with the reason it could not produce one. The capability
/// queries must be cheap; they are called while registry locks are held.
#[async_trait]
pub trait TileProvider: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str;

    /// Attempt to produce the tile named by `state`
    async fn load_tile(&self, state: &TileRequestState) -> Result<TileImage, ProviderError>;

    /// Release provider-held resources
    fn detach(&self) {}

    fn minimum_zoom(&self) -> u8;

    fn maximum_zoom(&self) -> u8;

    /// Whether the provider needs a live network connection
    fn uses_data_connection(&self) -> bool;

    /// Checks if this provider supports the given zoom level
    fn supports_zoom(&self, zoom: u8) -> bool {
        zoom >= self.minimum_zoom() && zoom <= self.maximum_zoom()
    }

    /// Whether [`TileProvider::set_style`] has any effect
    fn supports_style_switch(&self) -> bool {
        false
    }

    fn set_style(&self, _style: &TileStyle) {}
}
