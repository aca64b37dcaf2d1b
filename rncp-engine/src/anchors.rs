//! Level anchor table - XP ⇄ level conversion
//!
//! The campus reports progress as a fractional level (e.g. `9.42`) while
//! projects reward raw XP. The anchor table gives the XP threshold of every
//! whole level; anything between two anchors is linearly interpolated.
//!
//! ```text
//! level  0 ──── 1 ──────── 2 ─────────── 3
//! xp     0     1000       2200          3600
//!                    ▲
//!                 1.5 ⇄ 1600
//! ```
//!
//! Neither direction extrapolates past the last anchor.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::CatalogError;

/// One whole level and the XP needed to reach it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelAnchor {
    /// Whole level; equal to the anchor's index in the table
    #[serde(alias = "lvl")]
    pub level: u32,
    /// Total XP at which this level is reached
    pub xp: u64,
}

/// Immutable, validated anchor table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelTable {
    anchors: Vec<LevelAnchor>,
}

impl LevelTable {
    /// Build a table, checking `anchor[i].level == i` and strictly increasing xp.
    pub fn new(anchors: Vec<LevelAnchor>) -> Result<Self, CatalogError> {
        if anchors.is_empty() {
            return Err(CatalogError::EmptyAnchorTable);
        }

        for (index, anchor) in anchors.iter().enumerate() {
            if anchor.level as usize != index {
                return Err(CatalogError::NonSequentialAnchor {
                    index,
                    level: anchor.level,
                });
            }
            if index > 0 {
                let previous = anchors[index - 1].xp;
                if anchor.xp <= previous {
                    return Err(CatalogError::NonIncreasingAnchor {
                        level: anchor.level,
                        xp: anchor.xp,
                        previous,
                    });
                }
            }
        }

        debug!(anchors = anchors.len(), "Level table loaded");
        Ok(Self { anchors })
    }

    /// Parse a JSON array of `{"lvl": n, "xp": n}` (or `"level"`) objects.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let anchors: Vec<LevelAnchor> = serde_json::from_str(json)?;
        Self::new(anchors)
    }

    /// Anchors in ascending order
    pub fn anchors(&self) -> &[LevelAnchor] {
        &self.anchors
    }

    /// Highest whole level in the table
    pub fn max_level(&self) -> u32 {
        self.anchors.last().map(|a| a.level).unwrap_or(0)
    }

    /// XP threshold of a whole level, if the table knows it
    pub fn xp_for_whole_level(&self, level: u32) -> Option<u64> {
        self.anchors.get(level as usize).map(|a| a.xp)
    }

    /// Total XP for a fractional level.
    ///
    /// `xp = lower + floor((upper - lower) * fract(level))`. Levels at or past
    /// the last anchor return that anchor's xp. Negative or non-finite input
    /// is treated as level 0.
    pub fn xp_from_level(&self, level: f64) -> u64 {
        let level = if level.is_finite() && level > 0.0 { level } else { 0.0 };
        let whole = level.floor();
        let fraction = level - whole;
        let index = whole as usize;

        let lower = match self.anchors.get(index) {
            Some(anchor) => anchor,
            None => return self.anchors.last().map(|a| a.xp).unwrap_or(0),
        };
        let upper = match self.anchors.get(index + 1) {
            Some(anchor) => anchor,
            None => return lower.xp,
        };

        let span = (upper.xp - lower.xp) as f64;
        lower.xp + (span * fraction).floor() as u64
    }

    /// Fractional level for a total XP amount.
    ///
    /// The integer part is the highest anchor whose threshold is `<= xp`; the
    /// fractional part interpolates toward the next anchor, and is 0 at or
    /// beyond the last one.
    pub fn level_from_xp(&self, xp: u64) -> f64 {
        let reached = self.anchors.partition_point(|a| a.xp <= xp);
        if reached == 0 {
            return 0.0;
        }

        let current = &self.anchors[reached - 1];
        match self.anchors.get(reached) {
            Some(next) => {
                let progress = (xp - current.xp) as f64 / (next.xp - current.xp) as f64;
                current.level as f64 + progress
            }
            None => current.level as f64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_table() -> LevelTable {
        LevelTable::from_json(r#"[{"lvl":0,"xp":0},{"lvl":1,"xp":1000},{"lvl":2,"xp":2200}]"#)
            .unwrap()
    }

    #[test]
    fn test_xp_from_level_interpolates() {
        let table = small_table();
        assert_eq!(table.xp_from_level(1.5), 1600);
        assert_eq!(table.xp_from_level(0.0), 0);
        assert_eq!(table.xp_from_level(1.0), 1000);
        assert_eq!(table.xp_from_level(0.25), 250);
    }

    #[test]
    fn test_xp_from_level_does_not_extrapolate() {
        let table = small_table();
        assert_eq!(table.xp_from_level(2.0), 2200);
        assert_eq!(table.xp_from_level(2.7), 2200);
        assert_eq!(table.xp_from_level(40.0), 2200);
    }

    #[test]
    fn test_xp_from_level_rejects_garbage() {
        let table = small_table();
        assert_eq!(table.xp_from_level(-3.0), 0);
        assert_eq!(table.xp_from_level(f64::NAN), 0);
    }

    #[test]
    fn test_level_from_xp() {
        let table = small_table();
        assert!((table.level_from_xp(1600) - 1.5).abs() < 1e-9);
        assert_eq!(table.level_from_xp(0), 0.0);
        assert_eq!(table.level_from_xp(1000), 1.0);
        assert_eq!(table.level_from_xp(2200), 2.0);
        assert_eq!(table.level_from_xp(99_999), 2.0);
    }

    #[test]
    fn test_round_trip_within_one_floor() {
        let table = small_table();
        let mut level = 0.0;
        while level <= 2.0 {
            let back = table.level_from_xp(table.xp_from_level(level));
            // one floor on a span of at least 1000 xp
            assert!(level - back >= 0.0 && level - back <= 1.0 / 1000.0 + 1e-9, "{level} -> {back}");
            level += 0.013;
        }
    }

    #[test]
    fn test_rejects_non_sequential_levels() {
        let err = LevelTable::from_json(r#"[{"lvl":0,"xp":0},{"lvl":2,"xp":10}]"#).unwrap_err();
        assert!(matches!(err, CatalogError::NonSequentialAnchor { index: 1, level: 2 }));
    }

    #[test]
    fn test_rejects_non_increasing_xp() {
        let err = LevelTable::from_json(r#"[{"lvl":0,"xp":0},{"lvl":1,"xp":0}]"#).unwrap_err();
        assert!(matches!(err, CatalogError::NonIncreasingAnchor { level: 1, .. }));
    }

    #[test]
    fn test_rejects_empty_table() {
        assert!(matches!(
            LevelTable::from_json("[]"),
            Err(CatalogError::EmptyAnchorTable)
        ));
    }

    #[test]
    fn test_accepts_level_alias() {
        let table = LevelTable::from_json(r#"[{"level":0,"xp":0},{"level":1,"xp":5}]"#).unwrap();
        assert_eq!(table.max_level(), 1);
        assert_eq!(table.xp_for_whole_level(1), Some(5));
        assert_eq!(table.xp_for_whole_level(2), None);
    }
}
