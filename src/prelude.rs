//! Prelude module for common tilechain types and traits
//!
//! This module re-exports the most commonly used types, traits, and functions
//! for easy importing with `use tilechain::prelude::*;`

pub use crate::core::config::TileProviderConfig;

pub use crate::tiles::{
    cache::{CacheStats, TileCache},
    image::{Recycle, TileImage},
    key::TileKey,
    network::{AlwaysOnline, ConnectivityFlag, NetworkMonitor},
    provider::{TileProvider, TileStyle},
    request::{RequestId, TileRequestState},
    sink::{ChannelSink, NullSink, TileEvent, TileSink},
    array::{ResolverStats, TileLookup, TileProviderArray, TileProviderArrayBuilder},
};

pub use crate::runtime::{init_runtime, runtime, spawn, AsyncHandle, AsyncSpawner};

pub use crate::{ProviderError, Result, TileError};

pub use std::{
    future::Future,
    pin::Pin,
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

pub use fxhash::{FxHashMap as HashMap, FxHashSet as HashSet, FxHasher};
