use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies one tile of one tile source in the slippy map tile system
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileKey {
    pub zoom: u8,
    pub x: u32,
    pub y: u32,
    pub source: String,
}

impl TileKey {
    pub fn new(zoom: u8, x: u32, y: u32, source: impl Into<String>) -> Self {
        Self {
            zoom,
            x,
            y,
            source: source.into(),
        }
    }
}

impl fmt::Display for TileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}/{}", self.source, self.zoom, self.x, self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fxhash::FxHashSet;

    #[test]
    fn test_structural_equality() {
        let a = TileKey::new(3, 1, 2, "mapnik");
        let b = TileKey::new(3, 1, 2, String::from("mapnik"));
        let other_source = TileKey::new(3, 1, 2, "cyclemap");

        assert_eq!(a, b);
        assert_ne!(a, other_source);

        let mut set = FxHashSet::default();
        set.insert(a);
        assert!(set.contains(&b));
        assert!(!set.contains(&other_source));
    }

    #[test]
    fn test_display() {
        assert_eq!(TileKey::new(4, 7, 9, "mapnik").to_string(), "mapnik/4/7/9");
    }
}
