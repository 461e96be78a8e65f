//! Common types used throughout the ranking core

use serde::{Deserialize, Serialize};
use skillratings::glicko2::Glicko2Rating;
use std::str::FromStr;

/// Unique identifier for a rated item (e.g. an image file name)
pub type ItemId = String;

/// Initial rating for items that have never been compared
pub const DEFAULT_RATING: f64 = 1500.0;

/// Initial rating deviation
pub const DEFAULT_RD: f64 = 350.0;

/// Initial volatility
pub const DEFAULT_VOLATILITY: f64 = 0.06;

/// Glicko-2 state of a single item
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    pub rating: f64,
    /// Rating deviation, always > 0
    pub rd: f64,
    /// Volatility, always > 0
    pub vol: f64,
    pub wins: u32,
    pub losses: u32,
}

impl Default for PlayerState {
    fn default() -> Self {
        Self {
            rating: DEFAULT_RATING,
            rd: DEFAULT_RD,
            vol: DEFAULT_VOLATILITY,
            wins: 0,
            losses: 0,
        }
    }
}

impl PlayerState {
    /// Total number of decided comparisons involving this item
    pub fn games_played(&self) -> u32 {
        self.wins + self.losses
    }

    /// Whether the rating triple is finite with positive deviation and volatility
    pub fn is_well_formed(&self) -> bool {
        self.rating.is_finite()
            && self.rd.is_finite()
            && self.vol.is_finite()
            && self.rd > 0.0
            && self.vol > 0.0
    }
}

impl From<Glicko2Rating> for PlayerState {
    fn from(rating: Glicko2Rating) -> Self {
        Self {
            rating: rating.rating,
            rd: rating.deviation,
            vol: rating.volatility,
            ..Self::default()
        }
    }
}

impl From<PlayerState> for Glicko2Rating {
    fn from(state: PlayerState) -> Self {
        Self {
            rating: state.rating,
            deviation: state.rd,
            volatility: state.vol,
        }
    }
}

/// An item in the rating pool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedItem {
    pub id: ItemId,
    pub stats: PlayerState,
}

impl RankedItem {
    pub fn new(id: impl Into<ItemId>, stats: PlayerState) -> Self {
        Self {
            id: id.into(),
            stats,
        }
    }

    /// Create an item with default (unrated) stats
    pub fn unrated(id: impl Into<ItemId>) -> Self {
        Self::new(id, PlayerState::default())
    }
}

/// Rating threshold filter controlling which items may be matched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SelectionMode {
    #[default]
    Standard,
    HighElo,
    EliteTier,
}

impl SelectionMode {
    /// Label used for logs and metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            SelectionMode::Standard => "standard",
            SelectionMode::HighElo => "high-elo",
            SelectionMode::EliteTier => "elite-tier",
        }
    }
}

impl std::fmt::Display for SelectionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SelectionMode::Standard => write!(f, "Standard"),
            SelectionMode::HighElo => write!(f, "HighElo"),
            SelectionMode::EliteTier => write!(f, "EliteTier"),
        }
    }
}

impl FromStr for SelectionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "standard" => Ok(SelectionMode::Standard),
            "high-elo" | "highelo" => Ok(SelectionMode::HighElo),
            "elite-tier" | "elitetier" | "elite" => Ok(SelectionMode::EliteTier),
            other => Err(format!("Unknown selection mode: {}", other)),
        }
    }
}

/// Two distinct items presented together for comparison
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemPair {
    pub first: ItemId,
    pub second: ItemId,
}

impl ItemPair {
    pub fn new(first: impl Into<ItemId>, second: impl Into<ItemId>) -> Self {
        Self {
            first: first.into(),
            second: second.into(),
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.first == id || self.second == id
    }

    /// Unordered comparison: `{a, b}` matches `{b, a}`
    pub fn same_matchup(&self, other: &ItemPair) -> bool {
        (self.first == other.first && self.second == other.second)
            || (self.first == other.second && self.second == other.first)
    }

    /// Whether `winner`/`loser` are exactly the two members of this pair
    pub fn is_decided_by(&self, winner: &str, loser: &str) -> bool {
        winner != loser && self.contains(winner) && self.contains(loser)
    }
}

impl std::fmt::Display for ItemPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} vs {}", self.first, self.second)
    }
}

/// Rating change produced by a single decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionOutcome {
    pub winner: RankedItem,
    pub loser: RankedItem,
    /// How much the winner's rating moved (+/-)
    pub winner_delta: f64,
    /// How much the loser's rating moved (+/-)
    pub loser_delta: f64,
    /// Pair selected after the decision, `None` if the pool became insufficient
    pub next_pair: Option<ItemPair>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_player_state() {
        let state = PlayerState::default();
        assert_eq!(state.rating, 1500.0);
        assert_eq!(state.rd, 350.0);
        assert_eq!(state.vol, 0.06);
        assert_eq!(state.games_played(), 0);
        assert!(state.is_well_formed());
    }

    #[test]
    fn test_malformed_state_detected() {
        let mut state = PlayerState::default();
        state.rd = 0.0;
        assert!(!state.is_well_formed());

        let mut state = PlayerState::default();
        state.rating = f64::NAN;
        assert!(!state.is_well_formed());
    }

    #[test]
    fn test_pair_matchup_is_unordered() {
        let pair = ItemPair::new("a.png", "b.png");
        assert!(pair.same_matchup(&ItemPair::new("b.png", "a.png")));
        assert!(pair.same_matchup(&ItemPair::new("a.png", "b.png")));
        assert!(!pair.same_matchup(&ItemPair::new("a.png", "c.png")));
    }

    #[test]
    fn test_pair_decision_membership() {
        let pair = ItemPair::new("a.png", "b.png");
        assert!(pair.is_decided_by("a.png", "b.png"));
        assert!(pair.is_decided_by("b.png", "a.png"));
        assert!(!pair.is_decided_by("a.png", "a.png"));
        assert!(!pair.is_decided_by("a.png", "c.png"));
    }

    #[test]
    fn test_selection_mode_parsing() {
        assert_eq!("standard".parse(), Ok(SelectionMode::Standard));
        assert_eq!("high_elo".parse(), Ok(SelectionMode::HighElo));
        assert_eq!("Elite-Tier".parse(), Ok(SelectionMode::EliteTier));
        assert!("legendary".parse::<SelectionMode>().is_err());
    }

    #[test]
    fn test_glicko2_rating_conversion() {
        let state = PlayerState {
            rating: 1620.0,
            rd: 80.0,
            vol: 0.059,
            wins: 3,
            losses: 1,
        };
        let rating: Glicko2Rating = state.into();
        assert_eq!(rating.rating, 1620.0);
        assert_eq!(rating.deviation, 80.0);
        assert_eq!(rating.volatility, 0.059);

        let back: PlayerState = rating.into();
        assert_eq!(back.rating, 1620.0);
        assert_eq!(back.wins, 0);
    }
}
