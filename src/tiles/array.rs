//! Top-level tile provider that resolves tiles through a chain of async providers
//!
//! A request first checks the [`TileCache`] synchronously and returns the tile
//! if it is there. Otherwise the request returns [`TileLookup::Pending`] and
//! the tile is sent down the provider chain: each provider reports success or
//! failure back to the array, a failure moves on to the next eligible
//! provider, and only when the chain is exhausted is the failure reported to
//! the [`TileSink`]. At most one request per tile is in the chain at a time.

use super::cache::TileCache;
use super::image::{Recycle, TileImage};
use super::key::TileKey;
use super::network::{AlwaysOnline, NetworkMonitor};
use super::provider::{TileProvider, TileStyle};
use super::request::{RequestId, TileRequestState};
use super::sink::{NullSink, TileSink};
use crate::core::config::TileProviderConfig;
use crate::prelude::{Arc, HashMap, Mutex};
use crate::runtime::{self, async_utils};
use crate::{ProviderError, Result, TileError};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{MutexGuard, PoisonError};

/// Answer to a tile request
#[derive(Debug, Clone)]
pub enum TileLookup {
    /// The tile was cached
    Ready(TileImage),
    /// The tile is being resolved; the sink hears about the outcome
    Pending,
}

impl TileLookup {
    pub fn image(self) -> Option<TileImage> {
        match self {
            TileLookup::Ready(image) => Some(image),
            TileLookup::Pending => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, TileLookup::Pending)
    }
}

/// Snapshot of request counters
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ResolverStats {
    /// Total calls to `request_tile`
    pub requests: u64,
    /// Requests answered from the cache
    pub cache_hits: u64,
    /// Requests that joined a tile already in flight
    pub coalesced: u64,
    /// Requests that started a provider chain
    pub chains_started: u64,
    /// Provider attempts that failed and fell through
    pub provider_failures: u64,
    pub resolved: u64,
    pub exhausted: u64,
}

#[derive(Default)]
struct Counters {
    requests: AtomicU64,
    cache_hits: AtomicU64,
    coalesced: AtomicU64,
    chains_started: AtomicU64,
    provider_failures: AtomicU64,
    resolved: AtomicU64,
    exhausted: AtomicU64,
}

fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

struct Inner {
    config: TileProviderConfig,
    cache: TileCache,
    providers: Mutex<Vec<Arc<dyn TileProvider>>>,
    /// Tiles currently in a provider chain, with the request that owns each
    in_flight: Mutex<HashMap<TileKey, RequestId>>,
    sink: Arc<dyn TileSink>,
    network: Arc<dyn NetworkMonitor>,
    counters: Counters,
    /// Bumped on every style switch, only while `in_flight` is locked
    style_generation: AtomicU64,
    detached: AtomicBool,
}

/// Tile provider that composes a tile cache with an ordered chain of
/// asynchronous providers
///
/// Cloning is cheap; clones share the cache, registry and in-flight state.
#[derive(Clone)]
pub struct TileProviderArray {
    inner: Arc<Inner>,
}

impl TileProviderArray {
    /// Create an array with no providers, a [`NullSink`] and [`AlwaysOnline`]
    pub fn new(config: TileProviderConfig) -> Self {
        Self::from_parts(config, Vec::new(), Arc::new(NullSink), Arc::new(AlwaysOnline))
    }

    pub fn builder(config: TileProviderConfig) -> TileProviderArrayBuilder {
        TileProviderArrayBuilder::new(config)
    }

    fn from_parts(
        config: TileProviderConfig,
        providers: Vec<Arc<dyn TileProvider>>,
        sink: Arc<dyn TileSink>,
        network: Arc<dyn NetworkMonitor>,
    ) -> Self {
        log::debug!(
            "creating tile provider array: cache_capacity={}, providers={}",
            config.cache_capacity,
            providers.len()
        );
        Self {
            inner: Arc::new(Inner {
                cache: TileCache::new(config.cache_capacity),
                config,
                providers: Mutex::new(providers),
                in_flight: Mutex::new(HashMap::default()),
                sink,
                network,
                counters: Counters::default(),
                style_generation: AtomicU64::new(0),
                detached: AtomicBool::new(false),
            }),
        }
    }

    /// Append a provider to the end of the chain
    ///
    /// Requests already in flight keep the chain they started with.
    pub fn register_provider(&self, provider: Arc<dyn TileProvider>) -> Result<()> {
        validate_provider(provider.as_ref())?;
        log::info!(
            "registered tile provider {} (zoom {}..={}, network={})",
            provider.name(),
            provider.minimum_zoom(),
            provider.maximum_zoom(),
            provider.uses_data_connection()
        );
        self.inner.lock_providers().push(provider);
        Ok(())
    }

    /// Get a tile from the cache, or start resolving it
    ///
    /// Never blocks on I/O. A cache miss returns [`TileLookup::Pending`] and
    /// the outcome is delivered to the sink later.
    pub fn request_tile(&self, tile: &TileKey) -> TileLookup {
        let inner = &self.inner;
        bump(&inner.counters.requests);

        if let Some(image) = inner.cache.get(tile) {
            log::debug!("tile cache hit for {}", tile);
            bump(&inner.counters.cache_hits);
            return TileLookup::Ready(image);
        }

        if inner.is_in_flight(tile) {
            bump(&inner.counters.coalesced);
            return TileLookup::Pending;
        }

        log::debug!("tile cache miss for {}, trying async providers", tile);
        let mut state = TileRequestState::new(tile.clone(), inner.snapshot_providers());

        {
            let mut in_flight = inner.lock_in_flight();
            // Check again now that we hold the lock
            if in_flight.contains_key(tile) {
                bump(&inner.counters.coalesced);
                return TileLookup::Pending;
            }
            // A chain may have finished between the cache miss and here
            if let Some(image) = inner.cache.get(tile) {
                bump(&inner.counters.cache_hits);
                return TileLookup::Ready(image);
            }
            state.set_generation(inner.style_generation.load(Ordering::SeqCst));
            in_flight.insert(tile.clone(), state.id());
        }

        bump(&inner.counters.chains_started);
        inner.advance(state);
        TileLookup::Pending
    }

    /// Smallest zoom level any registered provider supports
    pub fn minimum_zoom(&self) -> Option<u8> {
        self.inner
            .lock_providers()
            .iter()
            .map(|p| p.minimum_zoom())
            .min()
    }

    /// Largest zoom level any registered provider supports
    pub fn maximum_zoom(&self) -> Option<u8> {
        self.inner
            .lock_providers()
            .iter()
            .map(|p| p.maximum_zoom())
            .max()
    }

    /// Switch the tile style and drop every tile cached under the old one
    ///
    /// Chains already in flight keep running but their results are not
    /// cached; the sink gets [`TileError::StyleChanged`] for them.
    pub fn set_style(&self, style: &TileStyle) {
        let switched = {
            let providers = self.inner.lock_providers();
            let mut switched = 0;
            for provider in providers.iter().filter(|p| p.supports_style_switch()) {
                provider.set_style(style);
                switched += 1;
            }
            switched
        };
        let abandoned = {
            let mut in_flight = self.inner.lock_in_flight();
            self.inner.style_generation.fetch_add(1, Ordering::SeqCst);
            let abandoned = in_flight.len();
            in_flight.clear();
            abandoned
        };
        log::info!(
            "tile style changed to {} ({} providers switched, {} requests abandoned), clearing cache",
            style.name,
            switched,
            abandoned
        );
        self.clear_cache();
    }

    /// Drop and recycle every cached tile
    pub fn clear_cache(&self) {
        self.inner.cache.clear();
    }

    /// Detach every registered provider
    pub fn detach(&self) {
        self.inner.detach_providers();
    }

    pub fn cache(&self) -> &TileCache {
        &self.inner.cache
    }

    pub fn config(&self) -> &TileProviderConfig {
        &self.inner.config
    }

    pub fn provider_count(&self) -> usize {
        self.inner.lock_providers().len()
    }

    pub fn is_in_flight(&self, tile: &TileKey) -> bool {
        self.inner.is_in_flight(tile)
    }

    pub fn in_flight_count(&self) -> usize {
        self.inner.lock_in_flight().len()
    }

    pub fn stats(&self) -> ResolverStats {
        let c = &self.inner.counters;
        ResolverStats {
            requests: c.requests.load(Ordering::Relaxed),
            cache_hits: c.cache_hits.load(Ordering::Relaxed),
            coalesced: c.coalesced.load(Ordering::Relaxed),
            chains_started: c.chains_started.load(Ordering::Relaxed),
            provider_failures: c.provider_failures.load(Ordering::Relaxed),
            resolved: c.resolved.load(Ordering::Relaxed),
            exhausted: c.exhausted.load(Ordering::Relaxed),
        }
    }
}

fn validate_provider(provider: &dyn TileProvider) -> Result<()> {
    let (min, max) = (provider.minimum_zoom(), provider.maximum_zoom());
    if min > max {
        return Err(TileError::InvalidZoomRange {
            provider: provider.name().to_string(),
            min,
            max,
        });
    }
    Ok(())
}

impl Inner {
    fn lock_providers(&self) -> MutexGuard<'_, Vec<Arc<dyn TileProvider>>> {
        self.providers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_in_flight(&self) -> MutexGuard<'_, HashMap<TileKey, RequestId>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_in_flight(&self, tile: &TileKey) -> bool {
        self.lock_in_flight().contains_key(tile)
    }

    fn snapshot_providers(&self) -> Arc<[Arc<dyn TileProvider>]> {
        self.lock_providers().iter().cloned().collect()
    }

    /// Release the tile's in-flight slot if `state` still owns it
    fn remove_in_flight(&self, state: &TileRequestState) {
        let mut in_flight = self.lock_in_flight();
        if in_flight.get(state.tile()) == Some(&state.id()) {
            in_flight.remove(state.tile());
        } else {
            log::debug!(
                "request {} for tile {} no longer owns its in-flight slot",
                state.id(),
                state.tile()
            );
        }
    }

    /// Keep advancing until we get a provider that can serve this tile right
    /// now, or the chain runs out
    fn find_next_appropriate_provider(
        &self,
        state: &mut TileRequestState,
    ) -> Option<Arc<dyn TileProvider>> {
        while let Some(provider) = state.next_provider() {
            if provider.uses_data_connection() && !self.network.is_network_available() {
                log::debug!(
                    "skipping provider {} for {}: no data connection",
                    provider.name(),
                    state.tile()
                );
                continue;
            }
            if !provider.supports_zoom(state.tile().zoom) {
                log::debug!(
                    "skipping provider {} for {}: zoom not supported",
                    provider.name(),
                    state.tile()
                );
                continue;
            }
            return Some(provider);
        }
        None
    }

    fn advance(self: &Arc<Self>, mut state: TileRequestState) {
        match self.find_next_appropriate_provider(&mut state) {
            Some(provider) => self.start_attempt(provider, state),
            None => self.finish_exhausted(state),
        }
    }

    fn start_attempt(self: &Arc<Self>, provider: Arc<dyn TileProvider>, mut state: TileRequestState) {
        state.record_attempt();
        log::debug!(
            "request {}: asking provider {} for {}",
            state.id(),
            provider.name(),
            state.tile()
        );

        let inner = Arc::clone(self);
        let limit = self.config.attempt_timeout;
        runtime::spawn(async move {
            let attempt = async {
                match limit {
                    Some(limit) => async_utils::with_timeout(limit, provider.load_tile(&state))
                        .await
                        .unwrap_or(Err(ProviderError::Timeout(limit))),
                    None => provider.load_tile(&state).await,
                }
            };
            // A panicking provider must not strand the tile in flight
            let outcome = match AssertUnwindSafe(attempt).catch_unwind().await {
                Ok(outcome) => outcome,
                Err(_) => Err(ProviderError::Other(format!(
                    "provider {} panicked",
                    provider.name()
                ))),
            };
            inner.handle_outcome(provider.as_ref(), state, outcome);
        });
    }

    fn handle_outcome(
        self: &Arc<Self>,
        provider: &dyn TileProvider,
        state: TileRequestState,
        outcome: std::result::Result<TileImage, ProviderError>,
    ) {
        match outcome {
            Ok(image) => self.finish_resolved(provider, state, image),
            Err(error) => {
                log::warn!(
                    "provider {} failed for tile {}: {}",
                    provider.name(),
                    state.tile(),
                    error
                );
                bump(&self.counters.provider_failures);
                self.advance(state);
            }
        }
    }

    fn finish_resolved(&self, provider: &dyn TileProvider, state: TileRequestState, image: TileImage) {
        {
            // Cache before leaving the in-flight set so a concurrent request sees one or the other
            let mut in_flight = self.lock_in_flight();
            if state.generation() != self.style_generation.load(Ordering::SeqCst) {
                drop(in_flight);
                self.finish_stale(provider, state, image);
                return;
            }
            if let Some(previous) = self.cache.put(state.tile().clone(), image.clone()) {
                if !previous.ptr_eq(&image) {
                    previous.recycle();
                }
            }
            if in_flight.get(state.tile()) == Some(&state.id()) {
                in_flight.remove(state.tile());
            }
        }
        bump(&self.counters.resolved);
        log::info!(
            "tile {} resolved by {} after {} attempt(s)",
            state.tile(),
            provider.name(),
            state.attempts()
        );
        self.sink.on_tile_resolved(&state, &image);
    }

    /// Result of a chain started before the last style switch
    fn finish_stale(&self, provider: &dyn TileProvider, state: TileRequestState, image: TileImage) {
        self.remove_in_flight(&state);
        image.recycle();
        let error = TileError::StyleChanged {
            tile: state.tile().clone(),
        };
        log::debug!(
            "request {}: discarding tile from {}: {}",
            state.id(),
            provider.name(),
            error
        );
        self.sink.on_tile_failed(&state, &error);
    }

    fn finish_exhausted(&self, state: TileRequestState) {
        self.remove_in_flight(&state);
        bump(&self.counters.exhausted);

        let error = if state.providers().is_empty() {
            TileError::NoProviders {
                tile: state.tile().clone(),
            }
        } else {
            TileError::ChainExhausted {
                tile: state.tile().clone(),
                attempts: state.attempts(),
            }
        };
        log::debug!("request {}: {}", state.id(), error);
        self.sink.on_tile_failed(&state, &error);
    }

    fn detach_providers(&self) {
        if self.detached.swap(true, Ordering::SeqCst) {
            return;
        }
        for provider in self.lock_providers().iter() {
            provider.detach();
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.detach_providers();
    }
}

/// Builder for a [`TileProviderArray`]
pub struct TileProviderArrayBuilder {
    config: TileProviderConfig,
    providers: Vec<Arc<dyn TileProvider>>,
    sink: Option<Arc<dyn TileSink>>,
    network: Option<Arc<dyn NetworkMonitor>>,
}

impl TileProviderArrayBuilder {
    pub fn new(config: TileProviderConfig) -> Self {
        Self {
            config,
            providers: Vec::new(),
            sink: None,
            network: None,
        }
    }

    /// Append a provider to the chain
    pub fn with_provider(mut self, provider: Arc<dyn TileProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn with_providers<I>(mut self, providers: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn TileProvider>>,
    {
        self.providers.extend(providers);
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn TileSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn with_network_monitor(mut self, network: Arc<dyn NetworkMonitor>) -> Self {
        self.network = Some(network);
        self
    }

    /// Build the array, rejecting providers with an empty zoom range
    pub fn build(self) -> Result<TileProviderArray> {
        for provider in &self.providers {
            validate_provider(provider.as_ref())?;
        }
        Ok(TileProviderArray::from_parts(
            self.config,
            self.providers,
            self.sink.unwrap_or_else(|| Arc::new(NullSink)),
            self.network.unwrap_or_else(|| Arc::new(AlwaysOnline)),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;

    struct CountingProvider {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TileProvider for CountingProvider {
        fn name(&self) -> &str {
            "counting"
        }

        async fn load_tile(
            &self,
            _state: &TileRequestState,
        ) -> std::result::Result<TileImage, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
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

    #[test]
    fn test_cache_hit_skips_provider_chain() {
        let provider = Arc::new(CountingProvider {
            calls: AtomicUsize::new(0),
        });
        let array = TileProviderArray::builder(TileProviderConfig::for_testing())
            .with_provider(provider.clone())
            .build()
            .unwrap();
        let tile = TileKey::new(3, 1, 1, "s");
        let image = TileImage::new(1, 1, vec![1, 2, 3, 4]);
        array.cache().put(tile.clone(), image.clone());

        let lookup = array.request_tile(&tile);
        assert!(!lookup.is_pending());
        assert!(lookup.image().map_or(false, |found| found.ptr_eq(&image)));

        assert_eq!(array.in_flight_count(), 0);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
        assert_eq!(array.stats().cache_hits, 1);
        assert_eq!(array.stats().chains_started, 0);
    }

    #[test]
    fn test_clear_cache_recycles_images() {
        let array = TileProviderArray::new(TileProviderConfig::for_testing());
        let image = TileImage::new(1, 1, vec![0; 4]);
        array.cache().put(TileKey::new(0, 0, 0, "s"), image.clone());

        array.clear_cache();
        assert!(array.cache().is_empty());
        assert!(image.is_recycled());
    }

    #[test]
    fn test_lookup_helpers() {
        assert!(TileLookup::Pending.is_pending());
        assert!(TileLookup::Pending.image().is_none());
    }
}
