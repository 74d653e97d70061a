use serde::{Deserialize, Serialize};

use crate::constants::{
    SEASONAL_DEAD, SEASONAL_PROSPEROUS, SEASONAL_RESTING, SEASONAL_STRENGTHENING,
    SEASONAL_TRAPPED,
};
use crate::symbols::{Branch, Element, ElementRelation};

/// Strength of an element in the reference month.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeasonalState {
    /// Same element as the season.
    Prosperous,
    /// Fed by the season.
    Strengthening,
    /// Feeds the season.
    Resting,
    /// Controls the season.
    Trapped,
    /// Controlled by the season.
    Dead,
}

impl SeasonalState {
    pub fn multiplier(self) -> f64 {
        match self {
            Self::Prosperous => SEASONAL_PROSPEROUS,
            Self::Strengthening => SEASONAL_STRENGTHENING,
            Self::Resting => SEASONAL_RESTING,
            Self::Trapped => SEASONAL_TRAPPED,
            Self::Dead => SEASONAL_DEAD,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Prosperous => "prosperous",
            Self::Strengthening => "strengthening",
            Self::Resting => "resting",
            Self::Trapped => "trapped",
            Self::Dead => "dead",
        }
    }
}

/// Seasonal lookup for one analysis. Without a reference month every element
/// is neutral (multiplier 1.0).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Season {
    pub month_branch: Option<Branch>,
}

impl Season {
    pub fn neutral() -> Self {
        Self { month_branch: None }
    }

    pub fn from_month(month_branch: Branch) -> Self {
        Self {
            month_branch: Some(month_branch),
        }
    }

    /// Ruling element of the month. The four tomb months (Chou, Chen, Wei, Xu)
    /// are Earth; the rest follow their own element.
    pub fn ruling_element(&self) -> Option<Element> {
        self.month_branch.map(Branch::element)
    }

    pub fn state(&self, element: Element) -> Option<SeasonalState> {
        let ruling = self.ruling_element()?;
        Some(match ruling.relation_to(element) {
            ElementRelation::Same => SeasonalState::Prosperous,
            ElementRelation::Generates => SeasonalState::Strengthening,
            ElementRelation::GeneratedBy => SeasonalState::Resting,
            ElementRelation::ControlledBy => SeasonalState::Trapped,
            ElementRelation::Controls => SeasonalState::Dead,
        })
    }

    pub fn multiplier(&self, element: Element) -> f64 {
        self.state(element)
            .map(SeasonalState::multiplier)
            .unwrap_or(SEASONAL_RESTING)
    }
}

impl Default for Season {
    fn default() -> Self {
        Self::neutral()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_neutral_season_is_one_everywhere() {
        let s = Season::neutral();
        for e in Element::ALL {
            assert_eq!(s.multiplier(e), 1.0);
            assert_eq!(s.state(e), None);
        }
    }

    #[test]
    fn test_winter_month_states() {
        let s = Season::from_month(Branch::Zi);
        assert_eq!(s.state(Element::Water), Some(SeasonalState::Prosperous));
        assert_eq!(s.state(Element::Wood), Some(SeasonalState::Strengthening));
        assert_eq!(s.state(Element::Metal), Some(SeasonalState::Resting));
        assert_eq!(s.state(Element::Earth), Some(SeasonalState::Trapped));
        assert_eq!(s.state(Element::Fire), Some(SeasonalState::Dead));
    }

    #[test]
    fn test_tomb_month_is_earth() {
        let s = Season::from_month(Branch::Wei);
        assert_eq!(s.ruling_element(), Some(Element::Earth));
        assert!((s.multiplier(Element::Earth) - 1.382).abs() < 1e-12);
        assert!((s.multiplier(Element::Water) - 0.618).abs() < 1e-12);
    }

    #[test]
    fn test_every_month_assigns_each_state_once() {
        for b in Branch::ALL {
            let s = Season::from_month(b);
            let mut states: Vec<&str> = Element::ALL
                .iter()
                .map(|e| s.state(*e).unwrap().as_str())
                .collect();
            states.sort_unstable();
            states.dedup();
            assert_eq!(states.len(), 5, "month {b}");
        }
    }
}
