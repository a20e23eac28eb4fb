use crate::prelude::{Arc, Mutex};
use std::fmt;

/// Image resources whose backing buffer must be released explicitly.
///
/// Dropping the last handle is not enough for native-backed buffers, so the
/// tile cache calls [`Recycle::recycle`] on every image it discards.
pub trait Recycle: Clone + Send + Sync + 'static {
    /// Free the backing buffer. Returns `false` if it was already freed.
    fn recycle(&self) -> bool;
}

/// Decoded tile image handle
///
/// Cloning is cheap and shares the same pixel buffer. Once the buffer has
/// been recycled every clone observes it as gone.
#[derive(Clone)]
pub struct TileImage {
    inner: Arc<ImageBuffer>,
}

struct ImageBuffer {
    width: u32,
    height: u32,
    pixels: Mutex<Option<Arc<Vec<u8>>>>,
}

impl TileImage {
    /// Wrap an RGBA8 pixel buffer
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        Self {
            inner: Arc::new(ImageBuffer {
                width,
                height,
                pixels: Mutex::new(Some(Arc::new(pixels))),
            }),
        }
    }

    /// Decode PNG/JPEG bytes into an RGBA8 tile image
    #[cfg(feature = "decode")]
    pub fn decode(bytes: &[u8]) -> std::result::Result<Self, crate::ProviderError> {
        let decoded = image::load_from_memory(bytes)
            .map_err(|e| crate::ProviderError::Decode(e.to_string()))?
            .to_rgba8();
        let (width, height) = decoded.dimensions();
        Ok(Self::new(width, height, decoded.into_raw()))
    }

    pub fn width(&self) -> u32 {
        self.inner.width
    }

    pub fn height(&self) -> u32 {
        self.inner.height
    }

    /// Get the pixel buffer, or `None` once the image has been recycled
    pub fn pixels(&self) -> Option<Arc<Vec<u8>>> {
        self.inner.pixels.lock().ok()?.clone()
    }

    pub fn is_recycled(&self) -> bool {
        self.inner
            .pixels
            .lock()
            .map(|pixels| pixels.is_none())
            .unwrap_or(true)
    }

    /// Check whether two handles share the same buffer
    pub fn ptr_eq(&self, other: &TileImage) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Recycle for TileImage {
    fn recycle(&self) -> bool {
        match self.inner.pixels.lock() {
            Ok(mut pixels) => pixels.take().is_some(),
            Err(_) => false,
        }
    }
}

impl fmt::Debug for TileImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TileImage")
            .field("width", &self.inner.width)
            .field("height", &self.inner.height)
            .field("recycled", &self.is_recycled())
            .finish()
    }
}
