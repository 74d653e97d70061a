//! Combination / conflict scoring.
//!
//! `total = base × decay × seasonal × adjacency`. Asymmetric conflicts split
//! the total into a victim share (full) and a controller share (× 0.618).
//! Shares are settled in whole qi units, truncated.

use serde::{Deserialize, Serialize};

use crate::constants::{ADJACENCY_BONUS, PAIR_DISTANCE_DECAY, PHI_INV, TRIAD_SPAN_DECAY};

/// Two-node decay by distance; 0 outside 1..=4.
pub fn pair_decay(distance: u32) -> f64 {
    match distance {
        0 => 0.0,
        d => PAIR_DISTANCE_DECAY
            .get(d as usize - 1)
            .copied()
            .unwrap_or(0.0),
    }
}

/// Three-node decay by span; spans below 2 count as 2, 0 beyond 7.
pub fn triad_decay(span: u32) -> f64 {
    let span = span.max(2);
    TRIAD_SPAN_DECAY
        .get(span as usize - 2)
        .copied()
        .unwrap_or(0.0)
}

/// Decay for a pattern of `arity` nodes at `extent` (distance or span).
pub fn decay(arity: usize, extent: u32) -> f64 {
    if arity >= 3 {
        triad_decay(extent)
    } else {
        pair_decay(extent)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub base: f64,
    pub decay: f64,
    pub seasonal: f64,
    pub adjacency: f64,
    /// Unsettled product of the four factors.
    pub total: f64,
    /// Settled victim loss (or per-participant gain for combinations).
    pub victim_share: f64,
    /// Settled controller loss. Zero for symmetric patterns and combinations.
    pub controller_share: f64,
}

impl ScoreBreakdown {
    /// Score before the seasonal and adjacency factors.
    pub fn pre_seasonal(&self) -> f64 {
        self.base * self.decay
    }
}

/// Inputs that decide how a pattern is scored.
#[derive(Clone, Copy, Debug)]
pub struct ScoreInput {
    pub base: f64,
    pub arity: usize,
    pub extent: u32,
    pub seasonal: f64,
    /// Adjacency bonus applies (adjacent combination that allows it).
    pub adjacency_bonus: bool,
    /// Split into victim and controller shares.
    pub asymmetric: bool,
}

pub fn score(input: ScoreInput) -> ScoreBreakdown {
    let decay = decay(input.arity, input.extent);
    let adjacency = if input.adjacency_bonus {
        ADJACENCY_BONUS
    } else {
        1.0
    };
    let total = input.base * decay * input.seasonal * adjacency;
    let victim_share = settle(total);
    let controller_share = if input.asymmetric {
        settle(total * PHI_INV)
    } else {
        0.0
    };
    ScoreBreakdown {
        base: input.base,
        decay,
        seasonal: input.seasonal,
        adjacency,
        total,
        victim_share,
        controller_share,
    }
}

/// Whole qi units, truncated toward zero.
pub fn settle(value: f64) -> f64 {
    if value.is_finite() { value.trunc() } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn conflict(base: f64, extent: u32) -> ScoreInput {
        ScoreInput {
            base,
            arity: 2,
            extent,
            seasonal: 1.0,
            adjacency_bonus: false,
            asymmetric: true,
        }
    }

    #[test]
    fn test_pair_decay_table() {
        assert_eq!(pair_decay(1), 1.0);
        assert_eq!(pair_decay(2), 0.618);
        assert_eq!(pair_decay(4), 0.236);
        assert_eq!(pair_decay(5), 0.0);
        assert_eq!(pair_decay(0), 0.0);
    }

    #[test]
    fn test_triad_decay_table() {
        assert_eq!(triad_decay(1), 1.0);
        assert_eq!(triad_decay(2), 1.0);
        assert_eq!(triad_decay(3), 0.786);
        assert_eq!(triad_decay(7), 0.236);
        assert_eq!(triad_decay(8), 0.0);
    }

    #[test]
    fn test_stem_conflict_at_distance_one() {
        let s = score(conflict(35.0, 1));
        assert_relative_eq!(s.total, 35.0);
        assert_eq!(s.victim_share, 35.0);
        assert_eq!(s.controller_share, 21.0);
        assert!(s.controller_share < s.victim_share);
    }

    #[test]
    fn test_symmetric_has_no_controller_share() {
        let mut input = conflict(30.0, 2);
        input.asymmetric = false;
        let s = score(input);
        assert_eq!(s.victim_share, 18.0); // 30 × 0.618 = 18.54
        assert_eq!(s.controller_share, 0.0);
    }

    #[test]
    fn test_adjacency_and_season_multiply() {
        let s = score(ScoreInput {
            base: 25.0,
            arity: 2,
            extent: 1,
            seasonal: 1.382,
            adjacency_bonus: true,
            asymmetric: false,
        });
        assert_relative_eq!(s.total, 25.0 * 1.382 * 1.3, epsilon = 1e-9);
        assert_eq!(s.victim_share, 44.0);
        assert_relative_eq!(s.pre_seasonal(), 25.0);
    }

    #[test]
    fn test_out_of_range_is_zero_not_error() {
        let s = score(conflict(35.0, 9));
        assert_eq!(s.total, 0.0);
        assert_eq!(s.victim_share, 0.0);
        assert_eq!(s.controller_share, 0.0);
    }
}
