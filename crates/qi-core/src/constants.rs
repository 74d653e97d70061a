/// Golden ratio: (1 + √5) / 2. Clash and harm amplifier.
pub const PHI: f64 = 1.618;

/// Reciprocal of the golden ratio. Controller-to-victim ratio and the
/// source-side share of a combat transfer.
pub const PHI_INV: f64 = 0.618;

/// Fraction of the smaller quantity that engages in a combat transfer.
pub const ENGAGEMENT_RATE: f64 = 0.382;

/// Combat distance decay, indexed by distance - 1. Zero beyond.
pub const COMBAT_DISTANCE_DECAY: [f64; 5] = [1.0, 0.618, 0.5, 0.382, 0.236];

/// Two-node pattern distance decay, indexed by distance - 1. Zero beyond.
pub const PAIR_DISTANCE_DECAY: [f64; 4] = [1.0, 0.618, 0.382, 0.236];

/// Three-node pattern span decay, indexed by span - 2. Zero beyond.
pub const TRIAD_SPAN_DECAY: [f64; 6] = [1.0, 0.786, 0.618, 0.5, 0.382, 0.236];

/// Bonus for combination participants sitting next to each other on the grid.
pub const ADJACENCY_BONUS: f64 = 1.3;

/// Seasonal multipliers: prosperous, strengthening, resting, trapped, dead.
pub const SEASONAL_PROSPEROUS: f64 = 1.382;
pub const SEASONAL_STRENGTHENING: f64 = 1.236;
pub const SEASONAL_RESTING: f64 = 1.0;
pub const SEASONAL_TRAPPED: f64 = 0.786;
pub const SEASONAL_DEAD: f64 = 0.618;

/// Starting qi of a node before hidden-qi split.
pub const DEFAULT_BASE_QI: f64 = 100.0;

/// Share of a combination's score granted when it fails to transform.
pub const DEFAULT_PARTIAL_RATIO: f64 = 0.5;

/// Upper bound on externally supplied talisman pillars.
pub const DEFAULT_MAX_TALISMANS: usize = 5;

/// Distinct talisman tiers a chart can address.
pub const TALISMAN_SLOTS: usize = u8::MAX as usize + 1;

/// Numerical epsilon for near-zero comparisons
pub const EPSILON: f64 = 1e-9;
