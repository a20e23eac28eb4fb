use super::image::TileImage;
use super::key::TileKey;
use super::request::{RequestId, TileRequestState};
use crate::TileError;
use crossbeam_channel::{unbounded, Receiver, Sender};

/// Receives the terminal outcome of every tile request
///
/// By the time `on_tile_resolved` runs the tile is already in the cache.
/// Both methods are called from worker tasks and must not block.
pub trait TileSink: Send + Sync {
    fn on_tile_resolved(&self, state: &TileRequestState, image: &TileImage);

    fn on_tile_failed(&self, state: &TileRequestState, error: &TileError);
}

/// Sink that ignores every outcome
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl TileSink for NullSink {
    fn on_tile_resolved(&self, _state: &TileRequestState, _image: &TileImage) {}

    fn on_tile_failed(&self, _state: &TileRequestState, _error: &TileError) {}
}

/// Terminal outcome of a tile request
#[derive(Debug, Clone)]
pub enum TileEvent {
    Resolved {
        request: RequestId,
        tile: TileKey,
        attempts: usize,
    },
    Failed {
        request: RequestId,
        tile: TileKey,
        error: TileError,
    },
}

impl TileEvent {
    pub fn tile(&self) -> &TileKey {
        match self {
            TileEvent::Resolved { tile, .. } | TileEvent::Failed { tile, .. } => tile,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, TileEvent::Resolved { .. })
    }
}

/// Sink that forwards outcomes over a channel so a render loop can poll them
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: Sender<TileEvent>,
}

impl ChannelSink {
    /// Create a sink together with the receiver for its events
    pub fn new() -> (Self, Receiver<TileEvent>) {
        let (tx, rx) = unbounded();
        (Self { tx }, rx)
    }
}

impl TileSink for ChannelSink {
    fn on_tile_resolved(&self, state: &TileRequestState, _image: &TileImage) {
        let _ = self.tx.send(TileEvent::Resolved {
            request: state.id(),
            tile: state.tile().clone(),
            attempts: state.attempts(),
        });
    }

    fn on_tile_failed(&self, state: &TileRequestState, error: &TileError) {
        let _ = self.tx.send(TileEvent::Failed {
            request: state.id(),
            tile: state.tile().clone(),
            error: error.clone(),
        });
    }
}
