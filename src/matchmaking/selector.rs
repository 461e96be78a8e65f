//! Uncertainty-driven pair selection
//!
//! The most uncertain item (highest rating deviation) is always compared next,
//! against a random opponent whose rating falls within a window around it.
//! When the window is empty any other eligible item is used instead.

use crate::error::{RankerError, RankerResult, Result};
use crate::types::{ItemPair, RankedItem, SelectionMode};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Configuration for pair selection
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SelectionConfig {
    /// Minimum rating admitted in `HighElo` mode
    pub high_elo_threshold: f64,
    /// Minimum rating admitted in `EliteTier` mode
    pub elite_tier_threshold: f64,
    /// Opponent window half-width, in multiples of the primary's deviation
    pub window_scale: f64,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            high_elo_threshold: 1600.0,
            elite_tier_threshold: 1800.0,
            window_scale: 2.0,
        }
    }
}

impl SelectionConfig {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        if !(self.window_scale > 0.0 && self.window_scale.is_finite()) {
            return Err(RankerError::Configuration {
                message: "Window scale must be positive".to_string(),
            }
            .into());
        }

        if !self.high_elo_threshold.is_finite() || !self.elite_tier_threshold.is_finite() {
            return Err(RankerError::Configuration {
                message: "Mode thresholds must be finite".to_string(),
            }
            .into());
        }

        if self.elite_tier_threshold < self.high_elo_threshold {
            return Err(RankerError::Configuration {
                message: "EliteTier threshold must not be below the HighElo threshold"
                    .to_string(),
            }
            .into());
        }

        Ok(())
    }

    /// Lowest rating admitted by `mode`
    pub fn threshold(&self, mode: SelectionMode) -> f64 {
        match mode {
            SelectionMode::Standard => f64::NEG_INFINITY,
            SelectionMode::HighElo => self.high_elo_threshold,
            SelectionMode::EliteTier => self.elite_tier_threshold,
        }
    }
}

/// A chosen comparison
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    /// Highest-deviation eligible item
    pub primary: RankedItem,
    pub secondary: RankedItem,
    /// Mode the caller asked for
    pub requested: SelectionMode,
    /// Mode actually used, `Standard` after a fallback
    pub effective: SelectionMode,
}

impl Selection {
    pub fn pair(&self) -> ItemPair {
        ItemPair::new(self.primary.id.clone(), self.secondary.id.clone())
    }

    /// Whether the requested mode had too few items and `Standard` was used
    pub fn fell_back(&self) -> bool {
        self.requested != self.effective
    }
}

/// Picks the next pair of items to compare
#[derive(Debug, Clone, Default)]
pub struct MatchSelector {
    config: SelectionConfig,
}

impl MatchSelector {
    pub fn new(config: SelectionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SelectionConfig {
        &self.config
    }

    /// Items admitted by `mode`, in pool order
    pub fn eligible<'a>(&self, pool: &'a [RankedItem], mode: SelectionMode) -> Vec<&'a RankedItem> {
        let threshold = self.config.threshold(mode);
        pool.iter()
            .filter(|item| item.stats.rating >= threshold)
            .collect()
    }

    /// Select the next pair from `pool`
    ///
    /// Falls back to `Standard` when `mode` admits fewer than two items and
    /// avoids repeating `last` whenever another opponent is available.
    pub fn select<R: Rng + ?Sized>(
        &self,
        pool: &[RankedItem],
        mode: SelectionMode,
        last: Option<&ItemPair>,
        rng: &mut R,
    ) -> RankerResult<Selection> {
        let mut effective = mode;
        let mut filtered = self.eligible(pool, mode);

        if filtered.len() < 2 && mode != SelectionMode::Standard {
            debug!(
                "Only {} items eligible for {} mode, falling back to Standard",
                filtered.len(),
                mode
            );
            effective = SelectionMode::Standard;
            filtered = self.eligible(pool, effective);
        }

        if filtered.len() < 2 {
            return Err(RankerError::InsufficientPool {
                mode,
                eligible: filtered.len(),
            });
        }

        let primary = most_uncertain(&filtered).ok_or_else(|| RankerError::Internal {
            message: "Eligible pool unexpectedly empty".to_string(),
        })?;

        let spread = self.config.window_scale * primary.stats.rd;
        let low = primary.stats.rating - spread;
        let high = primary.stats.rating + spread;

        let others: Vec<&RankedItem> = filtered
            .iter()
            .copied()
            .filter(|item| item.id != primary.id)
            .collect();
        let in_window: Vec<&RankedItem> = others
            .iter()
            .copied()
            .filter(|item| item.stats.rating >= low && item.stats.rating <= high)
            .collect();
        let candidates = if in_window.is_empty() {
            others
        } else {
            in_window
        };

        let mut secondary = *candidates.choose(rng).ok_or_else(|| RankerError::Internal {
            message: "No opponent candidates".to_string(),
        })?;

        if let Some(last) = last {
            let repeat = ItemPair::new(primary.id.clone(), secondary.id.clone());
            if repeat.same_matchup(last) {
                let alternatives: Vec<&RankedItem> = candidates
                    .iter()
                    .copied()
                    .filter(|item| item.id != secondary.id)
                    .collect();
                if let Some(alternative) = alternatives.choose(rng) {
                    secondary = *alternative;
                }
            }
        }

        debug!(
            "Selected {} (rating {:.1}, rd {:.1}) vs {} from {} candidates",
            primary.id,
            primary.stats.rating,
            primary.stats.rd,
            secondary.id,
            candidates.len()
        );

        Ok(Selection {
            primary: primary.clone(),
            secondary: secondary.clone(),
            requested: mode,
            effective,
        })
    }
}

/// Highest-deviation item; the first one wins ties
fn most_uncertain<'a>(items: &[&'a RankedItem]) -> Option<&'a RankedItem> {
    items.iter().copied().fold(None, |best, item| match best {
        Some(best) if best.stats.rd >= item.stats.rd => Some(best),
        _ => Some(item),
    })
}
