use super::key::TileKey;
use super::provider::TileProvider;
use crate::prelude::Arc;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Unique identifier of one tile request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(u64);

impl RequestId {
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Progress of one tile through a provider chain
///
/// The provider list is a snapshot taken when the request was created;
/// providers registered later are never consulted. Advancing takes
/// `&mut self`, so only the current owner of the request can move it along.
pub struct TileRequestState {
    id: RequestId,
    tile: TileKey,
    providers: Arc<[Arc<dyn TileProvider>]>,
    /// Index of the provider currently being tried, `None` before the first advance
    cursor: Option<usize>,
    attempts: usize,
    /// Style generation the request was started under
    generation: u64,
}

impl TileRequestState {
    pub fn new(tile: TileKey, providers: Arc<[Arc<dyn TileProvider>]>) -> Self {
        Self {
            id: RequestId::next(),
            tile,
            providers,
            cursor: None,
            attempts: 0,
            generation: 0,
        }
    }

    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn tile(&self) -> &TileKey {
        &self.tile
    }

    pub fn providers(&self) -> &[Arc<dyn TileProvider>] {
        &self.providers
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    /// Number of providers that were actually asked for the tile
    pub fn attempts(&self) -> usize {
        self.attempts
    }

    pub fn is_exhausted(&self) -> bool {
        self.cursor.map_or(self.providers.is_empty(), |c| c >= self.providers.len())
    }

    /// Advance to the next provider in the chain
    ///
    /// Returns `None` at the end of the chain. The cursor never moves back and
    /// stops one past the last provider.
    pub fn next_provider(&mut self) -> Option<Arc<dyn TileProvider>> {
        let next = self.cursor.map_or(0, |c| c + 1).min(self.providers.len());
        self.cursor = Some(next);
        self.providers.get(next).cloned()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn record_attempt(&mut self) {
        self.attempts += 1;
    }

    pub(crate) fn set_generation(&mut self, generation: u64) {
        self.generation = generation;
    }
}

impl fmt::Debug for TileRequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TileRequestState")
            .field("id", &self.id)
            .field("tile", &self.tile)
            .field("providers", &self.providers.len())
            .field("cursor", &self.cursor)
            .field("attempts", &self.attempts)
            .field("generation", &self.generation)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tiles::image::TileImage;
    use crate::ProviderError;
    use async_trait::async_trait;

    struct Named(&'static str);

    #[async_trait]
    impl TileProvider for Named {
        fn name(&self) -> &str {
            self.0
        }

        async fn load_tile(
            &self,
            _state: &TileRequestState,
        ) -> std::result::Result<TileImage, ProviderError> {
            Err(ProviderError::NotFound)
        }

        fn minimum_zoom(&self) -> u8 {
            0
        }

        fn maximum_zoom(&self) -> u8 {
            18
        }

        fn uses_data_connection(&self) -> bool {
            false
        }
    }

    fn chain(names: &[&'static str]) -> Arc<[Arc<dyn TileProvider>]> {
        names
            .iter()
            .map(|n| Arc::new(Named(n)) as Arc<dyn TileProvider>)
            .collect()
    }

    #[test]
    fn test_next_provider_walks_in_order() {
        let mut state = TileRequestState::new(TileKey::new(1, 0, 0, "s"), chain(&["a", "b", "c"]));
        assert_eq!(state.cursor(), None);
        assert!(!state.is_exhausted());

        let names: Vec<String> = std::iter::from_fn(|| state.next_provider())
            .map(|p| p.name().to_string())
            .collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert!(state.is_exhausted());
    }

    #[test]
    fn test_cursor_stops_past_end() {
        let mut state = TileRequestState::new(TileKey::new(1, 0, 0, "s"), chain(&["a"]));
        assert!(state.next_provider().is_some());
        assert_eq!(state.cursor(), Some(0));

        assert!(state.next_provider().is_none());
        assert!(state.next_provider().is_none());
        assert_eq!(state.cursor(), Some(1));
    }

    #[test]
    fn test_empty_chain_is_exhausted() {
        let mut state = TileRequestState::new(TileKey::new(1, 0, 0, "s"), chain(&[]));
        assert!(state.is_exhausted());
        assert!(state.next_provider().is_none());
    }

    #[test]
    fn test_ids_are_unique() {
        let a = TileRequestState::new(TileKey::new(1, 0, 0, "s"), chain(&[]));
        let b = TileRequestState::new(TileKey::new(1, 0, 0, "s"), chain(&[]));
        assert_ne!(a.id(), b.id());
    }
}
