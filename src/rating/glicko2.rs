//! Glicko-2 rating system implementation
//!
//! Single-match and rating-period updates following Glickman's description of
//! the algorithm, with the volatility solved by the Illinois variant of the
//! regula falsi method.

use crate::error::{RankerError, Result};
use crate::types::PlayerState;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use tracing::warn;

/// Conversion factor between the Glicko and Glicko-2 scales
const SCALE: f64 = 173.7178;

/// Rating at the center of the Glicko-2 scale
const CENTER_RATING: f64 = 1500.0;

/// Win probabilities are kept at least this far from 0 and 1
const PROBABILITY_EPSILON: f64 = 1e-10;

/// Hard cap on solver iterations
const MAX_ITERATIONS: usize = 1000;

/// Configuration for the Glicko-2 engine
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Glicko2Config {
    /// System constant bounding how much volatility may move per update
    pub tau: f64,
    /// Stop the volatility solver once the bracket is narrower than this
    pub convergence_tolerance: f64,
}

impl Default for Glicko2Config {
    fn default() -> Self {
        Self {
            tau: 0.5,
            convergence_tolerance: 1e-6,
        }
    }
}

impl Glicko2Config {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        if !(self.tau > 0.0 && self.tau.is_finite()) {
            return Err(RankerError::Configuration {
                message: "Tau must be positive".to_string(),
            }
            .into());
        }

        if !(self.convergence_tolerance > 0.0 && self.convergence_tolerance.is_finite()) {
            return Err(RankerError::Configuration {
                message: "Convergence tolerance must be positive".to_string(),
            }
            .into());
        }

        Ok(())
    }
}

/// New `(rating, rd, vol)` for one player; wins and losses are the caller's concern
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatingUpdate {
    pub rating: f64,
    pub rd: f64,
    pub vol: f64,
}

impl RatingUpdate {
    /// Apply the triple to a state, keeping its win/loss record
    pub fn apply_to(&self, state: &PlayerState) -> PlayerState {
        PlayerState {
            rating: self.rating,
            rd: self.rd,
            vol: self.vol,
            ..*state
        }
    }
}

/// One game inside a rating period
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchResult {
    pub opponent: PlayerState,
    /// 1.0 win, 0.5 draw, 0.0 loss
    pub score: f64,
}

impl MatchResult {
    pub fn win(opponent: PlayerState) -> Self {
        Self {
            opponent,
            score: 1.0,
        }
    }

    pub fn loss(opponent: PlayerState) -> Self {
        Self {
            opponent,
            score: 0.0,
        }
    }
}

/// Glicko-2 rating engine
#[derive(Debug, Clone, Copy, Default)]
pub struct Glicko2Engine {
    config: Glicko2Config,
}

impl Glicko2Engine {
    /// Create a new engine with a validated configuration
    pub fn new(config: Glicko2Config) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &Glicko2Config {
        &self.config
    }

    /// Rate a single decided comparison
    pub fn update_ratings(
        &self,
        winner: &PlayerState,
        loser: &PlayerState,
    ) -> (RatingUpdate, RatingUpdate) {
        let winner_update = self.rate_period(winner, &[MatchResult::win(*loser)]);
        let loser_update = self.rate_period(loser, &[MatchResult::loss(*winner)]);
        (winner_update, loser_update)
    }

    /// Probability that `player` beats `opponent`
    pub fn expected_score(&self, player: &PlayerState, opponent: &PlayerState) -> f64 {
        let (mu, _) = scale_down(player);
        let (mu_opp, phi_opp) = scale_down(opponent);
        expected(mu, mu_opp, phi_opp)
    }

    /// Rate a player over a whole rating period
    ///
    /// With no games the deviation grows by the volatility and the rating is
    /// left unchanged.
    pub fn rate_period(&self, player: &PlayerState, results: &[MatchResult]) -> RatingUpdate {
        let (mu, phi) = scale_down(player);

        if results.is_empty() {
            let phi_star = (phi.powi(2) + player.vol.powi(2)).sqrt();
            return RatingUpdate {
                rating: player.rating,
                rd: phi_star * SCALE,
                vol: player.vol,
            };
        }

        let mut v_inv = 0.0;
        let mut improvement = 0.0;
        for result in results {
            let (mu_opp, phi_opp) = scale_down(&result.opponent);
            let g_opp = g(phi_opp);
            let e = expected(mu, mu_opp, phi_opp);
            v_inv += g_opp.powi(2) * e * (1.0 - e);
            improvement += g_opp * (result.score - e);
        }
        let v = 1.0 / v_inv;
        let delta = v * improvement;

        let vol = self.new_volatility(delta, phi, v, player.vol);

        let phi_star = (phi.powi(2) + vol.powi(2)).sqrt();
        let phi_new = 1.0 / (1.0 / phi_star.powi(2) + 1.0 / v).sqrt();
        let mu_new = mu + phi_new.powi(2) * improvement;

        RatingUpdate {
            rating: mu_new * SCALE + CENTER_RATING,
            rd: phi_new * SCALE,
            vol,
        }
    }

    /// Solve for the new volatility with the Illinois algorithm
    fn new_volatility(&self, delta: f64, phi: f64, v: f64, vol: f64) -> f64 {
        let tau = self.config.tau;
        let a = vol.powi(2).ln();
        let f = |x: f64| {
            let ex = x.exp();
            let denom = phi.powi(2) + v + ex;
            ex * (delta.powi(2) - phi.powi(2) - v - ex) / (2.0 * denom.powi(2))
                - (x - a) / tau.powi(2)
        };

        let mut lower = a;
        let mut upper = if delta.powi(2) > phi.powi(2) + v {
            (delta.powi(2) - phi.powi(2) - v).ln()
        } else {
            let mut k = 1.0;
            while f(a - k * tau) < 0.0 {
                k += 1.0;
                if k as usize > MAX_ITERATIONS {
                    warn!("Volatility bracket search did not converge (delta={delta}, v={v})");
                    break;
                }
            }
            a - k * tau
        };

        let mut f_lower = f(lower);
        let mut f_upper = f(upper);
        let mut iterations = 0;

        while (upper - lower).abs() > self.config.convergence_tolerance {
            if iterations == MAX_ITERATIONS {
                warn!("Volatility solver hit the iteration cap, keeping current bracket");
                break;
            }
            iterations += 1;

            let candidate = lower + (lower - upper) * f_lower / (f_upper - f_lower);
            let f_candidate = f(candidate);

            if f_candidate * f_upper <= 0.0 {
                lower = upper;
                f_lower = f_upper;
            } else {
                f_lower /= 2.0;
            }

            upper = candidate;
            f_upper = f_candidate;
        }

        (lower / 2.0).exp()
    }
}

/// Rate a single comparison with a given tau and the default tolerance
pub fn update_ratings(
    winner: &PlayerState,
    loser: &PlayerState,
    tau: f64,
) -> (RatingUpdate, RatingUpdate) {
    let engine = Glicko2Engine {
        config: Glicko2Config {
            tau,
            ..Glicko2Config::default()
        },
    };
    engine.update_ratings(winner, loser)
}

fn scale_down(state: &PlayerState) -> (f64, f64) {
    ((state.rating - CENTER_RATING) / SCALE, state.rd / SCALE)
}

fn g(phi: f64) -> f64 {
    1.0 / (1.0 + 3.0 * phi.powi(2) / PI.powi(2)).sqrt()
}

fn expected(mu: f64, mu_opp: f64, phi_opp: f64) -> f64 {
    let e = 1.0 / (1.0 + (-g(phi_opp) * (mu - mu_opp)).exp());
    e.clamp(PROBABILITY_EPSILON, 1.0 - PROBABILITY_EPSILON)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use skillratings::glicko2::{glicko2, Glicko2Config as SkillConfig, Glicko2Rating};
    use skillratings::Outcomes;

    fn state(rating: f64, rd: f64, vol: f64) -> PlayerState {
        PlayerState {
            rating,
            rd,
            vol,
            ..PlayerState::default()
        }
    }

    #[test]
    fn test_config_validation() {
        assert!(Glicko2Config::default().validate().is_ok());

        let config = Glicko2Config {
            tau: 0.0,
            ..Glicko2Config::default()
        };
        assert!(Glicko2Engine::new(config).is_err());

        let config = Glicko2Config {
            convergence_tolerance: -1.0,
            ..Glicko2Config::default()
        };
        assert!(Glicko2Engine::new(config).is_err());
    }

    #[test]
    fn test_glickman_worked_example() {
        let engine = Glicko2Engine::default();
        let player = state(1500.0, 200.0, 0.06);
        let results = [
            MatchResult::win(state(1400.0, 30.0, 0.06)),
            MatchResult::loss(state(1550.0, 100.0, 0.06)),
            MatchResult::loss(state(1700.0, 300.0, 0.06)),
        ];

        let update = engine.rate_period(&player, &results);

        assert!((update.rating - 1464.06).abs() < 0.01, "{}", update.rating);
        assert!((update.rd - 151.52).abs() < 0.01, "{}", update.rd);
        assert!((update.vol - 0.05999).abs() < 0.0001, "{}", update.vol);
    }

    #[test]
    fn test_equal_players_move_symmetrically() {
        let (winner, loser) = update_ratings(&PlayerState::default(), &PlayerState::default(), 0.5);

        assert!(winner.rating > 1500.0);
        assert!(loser.rating < 1500.0);
        assert!(((winner.rating - 1500.0) - (1500.0 - loser.rating)).abs() < 1e-9);
        assert!((winner.rd - loser.rd).abs() < 1e-9);
        assert!(winner.rd < 350.0);
    }

    #[test]
    fn test_upset_moves_more_than_expected_win() {
        let engine = Glicko2Engine::default();
        let strong = state(1800.0, 80.0, 0.06);
        let weak = state(1300.0, 80.0, 0.06);

        let (expected_win, _) = engine.update_ratings(&strong, &weak);
        let (upset_win, _) = engine.update_ratings(&weak, &strong);

        assert!(upset_win.rating - weak.rating > expected_win.rating - strong.rating);
    }

    #[test]
    fn test_saturated_probability_stays_finite() {
        let engine = Glicko2Engine::default();
        let giant = state(9000.0, 30.0, 0.06);
        let minnow = state(-4000.0, 30.0, 0.06);

        let (winner, loser) = engine.update_ratings(&minnow, &giant);
        for update in [winner, loser] {
            assert!(update.rating.is_finite());
            assert!(update.rd.is_finite() && update.rd > 0.0);
            assert!(update.vol.is_finite() && update.vol > 0.0);
        }

        let p = engine.expected_score(&giant, &minnow);
        assert!(p < 1.0 && p > 0.99);
    }

    #[test]
    fn test_empty_period_inflates_deviation() {
        let engine = Glicko2Engine::default();
        let player = state(1600.0, 50.0, 0.06);
        let update = engine.rate_period(&player, &[]);

        assert_eq!(update.rating, 1600.0);
        assert!(update.rd > 50.0);
        assert_eq!(update.vol, 0.06);
    }

    #[test]
    fn test_expected_score_is_complementary() {
        let engine = Glicko2Engine::default();
        let a = state(1550.0, 120.0, 0.06);
        let b = state(1450.0, 120.0, 0.06);

        let p = engine.expected_score(&a, &b);
        let q = engine.expected_score(&b, &a);
        assert!(p > 0.5);
        assert!((p + q - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_matches_skillratings_glicko2() {
        let engine = Glicko2Engine::default();
        let skill_config = SkillConfig {
            tau: 0.5,
            convergence_tolerance: 0.000_001,
        };
        let pairs = [
            (state(1500.0, 350.0, 0.06), state(1500.0, 350.0, 0.06)),
            (state(1720.0, 90.0, 0.059), state(1480.0, 140.0, 0.061)),
            (state(1320.0, 200.0, 0.06), state(1690.0, 60.0, 0.058)),
        ];

        for (winner, loser) in pairs {
            let (ours_w, ours_l) = engine.update_ratings(&winner, &loser);
            let w: Glicko2Rating = winner.into();
            let l: Glicko2Rating = loser.into();
            let (theirs_w, theirs_l) = glicko2(&w, &l, &Outcomes::WIN, &skill_config);

            assert!((ours_w.rating - theirs_w.rating).abs() < 1e-3);
            assert!((ours_w.rd - theirs_w.deviation).abs() < 1e-3);
            assert!((ours_l.rating - theirs_l.rating).abs() < 1e-3);
            assert!((ours_l.rd - theirs_l.deviation).abs() < 1e-3);
            assert!((ours_l.vol - theirs_l.volatility).abs() < 1e-5);
        }
    }

    #[test]
    fn test_custom_tau_matches_skillratings() {
        let winner = state(1400.0, 50.0, 0.06);
        let loser = state(1900.0, 50.0, 0.06);

        for tau in [0.3, 1.2] {
            let (ours_w, ours_l) = update_ratings(&winner, &loser, tau);
            let skill_config = SkillConfig {
                tau,
                convergence_tolerance: 0.000_001,
            };
            let w: Glicko2Rating = winner.into();
            let l: Glicko2Rating = loser.into();
            let (theirs_w, theirs_l) = glicko2(&w, &l, &Outcomes::WIN, &skill_config);

            assert!((ours_w.rating - theirs_w.rating).abs() < 1e-3, "tau {}", tau);
            assert!((ours_w.rd - theirs_w.deviation).abs() < 1e-3, "tau {}", tau);
            assert!((ours_w.vol - theirs_w.volatility).abs() < 1e-5, "tau {}", tau);
            assert!((ours_l.rating - theirs_l.rating).abs() < 1e-3, "tau {}", tau);
            assert!((ours_l.vol - theirs_l.volatility).abs() < 1e-5, "tau {}", tau);
        }
    }

    #[test]
    fn test_larger_tau_lets_volatility_move_more() {
        let underdog = state(1400.0, 50.0, 0.06);
        let favorite = state(1900.0, 50.0, 0.06);

        let (tight, _) = update_ratings(&underdog, &favorite, 0.3);
        let (loose, _) = update_ratings(&underdog, &favorite, 1.2);

        // An upset between settled players raises volatility
        assert!(tight.vol > 0.06, "{}", tight.vol);
        assert!(loose.vol - 0.06 > tight.vol - 0.06);
    }

    #[test]
    fn test_apply_keeps_record() {
        let before = PlayerState {
            wins: 4,
            losses: 2,
            ..PlayerState::default()
        };
        let update = RatingUpdate {
            rating: 1510.0,
            rd: 300.0,
            vol: 0.06,
        };
        let after = update.apply_to(&before);
        assert_eq!(after.rating, 1510.0);
        assert_eq!(after.wins, 4);
        assert_eq!(after.losses, 2);
    }

    proptest! {
        #[test]
        fn prop_update_keeps_invariants(
            w_rating in 500.0f64..2500.0,
            w_rd in 1.0f64..350.0,
            w_vol in 0.01f64..0.2,
            l_rating in 500.0f64..2500.0,
            l_rd in 1.0f64..350.0,
            l_vol in 0.01f64..0.2,
        ) {
            let winner = state(w_rating, w_rd, w_vol);
            let loser = state(l_rating, l_rd, l_vol);
            let (w, l) = Glicko2Engine::default().update_ratings(&winner, &loser);

            prop_assert!(w.rd > 0.0 && w.rd.is_finite());
            prop_assert!(l.rd > 0.0 && l.rd.is_finite());
            prop_assert!(w.vol > 0.0 && w.vol.is_finite());
            prop_assert!(l.vol > 0.0 && l.vol.is_finite());
            prop_assert!(w.rating >= winner.rating);
            prop_assert!(l.rating <= loser.rating);
        }
    }
}
