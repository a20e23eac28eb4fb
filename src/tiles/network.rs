use crate::prelude::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Live answer to "may providers use the network right now?"
///
/// Sampled once per chain step, never cached across steps.
pub trait NetworkMonitor: Send + Sync {
    fn is_network_available(&self) -> bool;
}

impl<F> NetworkMonitor for F
where
    F: Fn() -> bool + Send + Sync,
{
    fn is_network_available(&self) -> bool {
        self()
    }
}

/// Monitor that always reports the network as usable
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysOnline;

impl NetworkMonitor for AlwaysOnline {
    fn is_network_available(&self) -> bool {
        true
    }
}

/// Shared on/off switch for connectivity, flipped by the platform layer
#[derive(Debug, Clone)]
pub struct ConnectivityFlag {
    online: Arc<AtomicBool>,
}

impl ConnectivityFlag {
    pub fn new(online: bool) -> Self {
        Self {
            online: Arc::new(AtomicBool::new(online)),
        }
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }
}

impl Default for ConnectivityFlag {
    fn default() -> Self {
        Self::new(true)
    }
}

impl NetworkMonitor for ConnectivityFlag {
    fn is_network_available(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }
}
