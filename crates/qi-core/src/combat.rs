//! Combat: qi transfer between two engaged units.
//!
//! `interaction = min(s, t) × 0.382`, then decayed by distance and amplified
//! for clash/harm. The source always spends `0.618 × effective`; the target
//! gains `effective` when fed and loses it when controlled.

use serde::{Deserialize, Serialize};

use crate::constants::{COMBAT_DISTANCE_DECAY, ENGAGEMENT_RATE, PHI, PHI_INV};
use crate::symbols::{Element, ElementRelation};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interaction {
    /// Source feeds target.
    Generation,
    /// Source suppresses target.
    Control,
    /// Amplified control from a branch clash.
    Clash,
    /// Amplified control from a branch harm.
    Harm,
}

impl Interaction {
    pub fn amplifier(self) -> f64 {
        match self {
            Self::Generation | Self::Control => 1.0,
            Self::Clash | Self::Harm => PHI,
        }
    }

    pub fn is_control(self) -> bool {
        !matches!(self, Self::Generation)
    }
}

/// Deltas produced by one combat exchange.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transfer {
    pub interaction: Interaction,
    pub effective: f64,
    pub source_delta: f64,
    pub target_delta: f64,
}

impl Transfer {
    fn none(interaction: Interaction) -> Self {
        Self {
            interaction,
            effective: 0.0,
            source_delta: 0.0,
            target_delta: 0.0,
        }
    }
}

/// Distance decay for combat; 0 outside 1..=5.
pub fn distance_multiplier(distance: u32) -> f64 {
    match distance {
        0 => 0.0,
        d => COMBAT_DISTANCE_DECAY
            .get(d as usize - 1)
            .copied()
            .unwrap_or(0.0),
    }
}

pub fn transfer(interaction: Interaction, source: f64, target: f64, distance: u32) -> Transfer {
    let engaged = source.min(target).max(0.0);
    let effective =
        engaged * ENGAGEMENT_RATE * distance_multiplier(distance) * interaction.amplifier();
    if effective <= 0.0 {
        return Transfer::none(interaction);
    }

    let source_delta = -effective * PHI_INV;
    let target_delta = if interaction.is_control() {
        -effective
    } else {
        effective
    };
    Transfer {
        interaction,
        effective,
        source_delta,
        target_delta,
    }
}

/// Which side acts on which when two elements meet. Returns the interaction
/// and whether `a` is the source. Same element: no exchange.
pub fn engagement(a: Element, b: Element) -> Option<(Interaction, bool)> {
    match a.relation_to(b) {
        ElementRelation::Same => None,
        ElementRelation::Generates => Some((Interaction::Generation, true)),
        ElementRelation::GeneratedBy => Some((Interaction::Generation, false)),
        ElementRelation::Controls => Some((Interaction::Control, true)),
        ElementRelation::ControlledBy => Some((Interaction::Control, false)),
    }
}
