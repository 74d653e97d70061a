//! Unit ledger: every qi unit and every change made to it.
//!
//! The ledger is append-only. Each phase is a named block of events; each
//! event carries the clamped delta actually applied, so a unit's quantity at
//! any phase boundary is the sum of its own deltas up to that phase.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::catalog::PatternKind;
use crate::constants::EPSILON;
use crate::node::{Chart, Layer, NodeId};
use crate::symbols::{Element, Polarity, Stem};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitId(pub usize);

/// Which part of its node a unit stands for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Slot {
    /// The stem itself.
    Direct,
    /// Hidden-qi component of a branch; 0 is the primary qi.
    Hidden(usize),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QiUnit {
    pub id: UnitId,
    pub node: NodeId,
    pub stem: Stem,
    pub element: Element,
    pub polarity: Polarity,
    pub slot: Slot,
    /// Share of the node's qi this unit started with.
    pub strength: f64,
    pub base: f64,
    pub quantity: f64,
}

impl QiUnit {
    pub fn is_primary(&self) -> bool {
        matches!(self.slot, Slot::Direct | Slot::Hidden(0))
    }

    pub fn label(&self) -> String {
        match self.slot {
            Slot::Direct => format!("{} {}", self.node, self.stem),
            Slot::Hidden(i) => format!("{} {} (hidden #{i})", self.node, self.stem),
        }
    }
}

/// Lowest quantity a delta may leave a unit at.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Floor {
    Zero,
    One,
}

impl Floor {
    pub fn value(self) -> f64 {
        match self {
            Self::Zero => 0.0,
            Self::One => 1.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "phase", content = "pattern", rename_all = "snake_case")]
pub enum PhaseKind {
    Registration,
    PillarUnity,
    SeasonalAdjustment,
    Pattern(PatternKind),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LedgerEvent {
    /// Global order across all phases.
    pub seq: usize,
    pub unit: UnitId,
    pub before: f64,
    pub after: f64,
    pub delta: f64,
    pub cause: String,
    /// Index into the analysis' match list, for pattern phases.
    pub match_index: Option<usize>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Phase {
    pub name: String,
    pub kind: PhaseKind,
    pub events: Vec<LedgerEvent>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LedgerSummary {
    pub total_positive: f64,
    pub total_negative: f64,
    pub event_count: usize,
    /// Distinct relationships that produced events, per pattern kind.
    pub relationships: BTreeMap<PatternKind, usize>,
}

/// Element and stem totals at the end of one phase.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PhaseTotals {
    pub phase: String,
    pub elements: BTreeMap<Element, f64>,
    pub stems: BTreeMap<Stem, f64>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UnitLedger {
    units: Vec<QiUnit>,
    phases: Vec<Phase>,
    next_seq: usize,
}

impl UnitLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expand every node into its qi units and open the registration phase.
    /// Stem nodes get one direct unit; branch nodes one unit per hidden qi.
    pub fn register(&mut self, chart: &Chart, base_qi: f64) {
        self.begin_phase(PhaseKind::Registration, "registration");
        for node in &chart.nodes {
            match node.id.layer {
                Layer::Stem => {
                    if let Some(stem) = node.stem() {
                        self.add_unit(node.id, stem, Slot::Direct, 1.0, base_qi);
                    }
                }
                Layer::Branch => {
                    if let Some(branch) = node.branch() {
                        for (i, hq) in branch.hidden_qi().iter().enumerate() {
                            self.add_unit(
                                node.id,
                                hq.stem,
                                Slot::Hidden(i),
                                hq.strength,
                                base_qi * hq.strength,
                            );
                        }
                    }
                }
            }
        }
    }

    fn add_unit(&mut self, node: NodeId, stem: Stem, slot: Slot, strength: f64, base: f64) {
        let id = UnitId(self.units.len());
        self.units.push(QiUnit {
            id,
            node,
            stem,
            element: stem.element(),
            polarity: stem.polarity(),
            slot,
            strength,
            base,
            quantity: 0.0,
        });
        self.apply(id, base, Floor::Zero, format!("registered {node} {stem}"), None);
    }

    /// Open a new phase; subsequent events land in it. Returns its index.
    pub fn begin_phase(&mut self, kind: PhaseKind, name: impl Into<String>) -> usize {
        self.phases.push(Phase {
            name: name.into(),
            kind,
            events: Vec::new(),
        });
        self.phases.len() - 1
    }

    /// Apply `delta` to a unit, clamped at `floor`, and record the event.
    /// A unit already below the floor is never pushed further down. Returns
    /// the delta actually applied.
    pub fn apply(
        &mut self,
        unit: UnitId,
        delta: f64,
        floor: Floor,
        cause: impl Into<String>,
        match_index: Option<usize>,
    ) -> f64 {
        if self.phases.is_empty() {
            self.begin_phase(PhaseKind::Registration, "registration");
        }
        let Some(u) = self.units.get_mut(unit.0) else {
            return 0.0;
        };

        let before = u.quantity;
        let target = before + delta;
        let after = if delta < 0.0 {
            target.max(floor.value().min(before))
        } else {
            target
        };
        u.quantity = after;
        let applied = after - before;

        let cause = cause.into();
        tracing::trace!(unit = unit.0, before, after, %cause, "ledger event");

        let seq = self.next_seq;
        self.next_seq += 1;
        if let Some(phase) = self.phases.last_mut() {
            phase.events.push(LedgerEvent {
                seq,
                unit,
                before,
                after,
                delta: applied,
                cause,
                match_index,
            });
        }
        applied
    }

    pub fn units(&self) -> &[QiUnit] {
        &self.units
    }

    pub fn unit(&self, id: UnitId) -> Option<&QiUnit> {
        self.units.get(id.0)
    }

    pub fn phases(&self) -> &[Phase] {
        &self.phases
    }

    pub fn units_of(&self, node: NodeId) -> impl Iterator<Item = &QiUnit> {
        self.units.iter().filter(move |u| u.node == node)
    }

    /// Direct unit of a stem node, primary qi of a branch node.
    pub fn primary_unit(&self, node: NodeId) -> Option<UnitId> {
        self.units_of(node).find(|u| u.is_primary()).map(|u| u.id)
    }

    /// Strongest unit of `node` carrying `element`.
    pub fn unit_of_element(&self, node: NodeId, element: Element) -> Option<UnitId> {
        self.units_of(node).find(|u| u.element == element).map(|u| u.id)
    }

    pub fn node_quantity(&self, node: NodeId) -> f64 {
        self.units_of(node).map(|u| u.quantity).sum()
    }

    pub fn node_base(&self, node: NodeId) -> f64 {
        self.units_of(node).map(|u| u.base).sum()
    }

    /// All events of one unit in order.
    pub fn events_of(&self, unit: UnitId) -> impl Iterator<Item = &LedgerEvent> {
        self.phases
            .iter()
            .flat_map(|p| p.events.iter())
            .filter(move |e| e.unit == unit)
    }

    /// Quantity of a unit at the end of `phase` (inclusive).
    pub fn quantity_at(&self, unit: UnitId, phase: usize) -> f64 {
        self.phases
            .iter()
            .take(phase + 1)
            .flat_map(|p| p.events.iter())
            .filter(|e| e.unit == unit)
            .map(|e| e.delta)
            .sum()
    }

    /// Replay a unit's whole history from zero.
    pub fn replay(&self, unit: UnitId) -> f64 {
        self.events_of(unit).map(|e| e.delta).sum()
    }

    pub fn element_totals_at(&self, phase: usize) -> BTreeMap<Element, f64> {
        let mut totals: BTreeMap<Element, f64> = Element::ALL.iter().map(|e| (*e, 0.0)).collect();
        for u in &self.units {
            *totals.entry(u.element).or_default() += self.quantity_at(u.id, phase);
        }
        totals
    }

    pub fn stem_totals_at(&self, phase: usize) -> BTreeMap<Stem, f64> {
        let mut totals: BTreeMap<Stem, f64> = Stem::ALL.iter().map(|s| (*s, 0.0)).collect();
        for u in &self.units {
            *totals.entry(u.stem).or_default() += self.quantity_at(u.id, phase);
        }
        totals
    }

    /// Totals at every phase boundary.
    pub fn phase_totals(&self) -> Vec<PhaseTotals> {
        self.phases
            .iter()
            .enumerate()
            .map(|(i, p)| PhaseTotals {
                phase: p.name.clone(),
                elements: self.element_totals_at(i),
                stems: self.stem_totals_at(i),
            })
            .collect()
    }

    /// The unit's story, one line per event.
    pub fn narrative(&self, unit: UnitId) -> String {
        let Some(u) = self.unit(unit) else {
            return String::new();
        };
        let mut out = format!("{}:", u.label());
        for phase in &self.phases {
            for e in phase.events.iter().filter(|e| e.unit == unit) {
                let _ = write!(
                    out,
                    "\n  [{}] {}: {:.2} -> {:.2} ({:+.2})",
                    phase.name, e.cause, e.before, e.after, e.delta
                );
            }
        }
        let _ = write!(out, "\n  final {:.2}", u.quantity);
        out
    }

    pub fn summary(&self) -> LedgerSummary {
        let mut total_positive = 0.0;
        let mut total_negative = 0.0;
        let mut event_count = 0;
        let mut relationships = BTreeMap::new();

        for phase in &self.phases {
            let mut matches: BTreeSet<usize> = BTreeSet::new();
            for e in &phase.events {
                event_count += 1;
                if e.delta > EPSILON {
                    total_positive += e.delta;
                } else if e.delta < -EPSILON {
                    total_negative += e.delta;
                }
                if let Some(m) = e.match_index {
                    matches.insert(m);
                }
            }
            if let PhaseKind::Pattern(kind) = phase.kind
                && !matches.is_empty()
            {
                *relationships.entry(kind).or_insert(0) += matches.len();
            }
        }

        LedgerSummary {
            total_positive,
            total_negative,
            event_count,
            relationships,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pillar::ChartInput;
    use approx::assert_relative_eq;

    fn ledger() -> (Chart, UnitLedger) {
        let input = ChartInput::parse_natal(["JiaZi", "BingYin", "WuChen", "GengShen"]).unwrap();
        let chart = Chart::from_input(&input, 5).unwrap();
        let mut ledger = UnitLedger::new();
        ledger.register(&chart, 100.0);
        (chart, ledger)
    }

    #[test]
    fn test_registration_expands_hidden_qi() {
        let (_, ledger) = ledger();
        // 4 stems + Zi(2) + Yin(3) + Chen(3) + Shen(3)
        assert_eq!(ledger.units().len(), 15);
        let yb = NodeId::branch(crate::node::Tier::Year);
        assert_relative_eq!(ledger.node_quantity(yb), 100.0);
        let primary = ledger.primary_unit(yb).unwrap();
        assert_eq!(ledger.unit(primary).unwrap().stem, Stem::Gui);
        assert_relative_eq!(ledger.unit(primary).unwrap().quantity, 70.0);
    }

    #[test]
    fn test_apply_clamps_at_floor() {
        let (_, mut ledger) = ledger();
        ledger.begin_phase(PhaseKind::PillarUnity, "unity");
        let applied = ledger.apply(UnitId(0), -250.0, Floor::Zero, "drain", None);
        assert_relative_eq!(applied, -100.0);
        assert_eq!(ledger.unit(UnitId(0)).unwrap().quantity, 0.0);

        let applied = ledger.apply(UnitId(1), -250.0, Floor::One, "drain", None);
        assert_relative_eq!(ledger.unit(UnitId(1)).unwrap().quantity, 1.0);
        assert_relative_eq!(applied, 1.0 - 70.0, epsilon = 1e-9);
    }

    #[test]
    fn test_below_floor_unit_is_not_pushed_down() {
        let (_, mut ledger) = ledger();
        ledger.begin_phase(PhaseKind::PillarUnity, "unity");
        ledger.apply(UnitId(0), -99.5, Floor::Zero, "drain", None);
        let applied = ledger.apply(UnitId(0), -5.0, Floor::One, "drain", None);
        assert_eq!(applied, 0.0);
        assert_relative_eq!(ledger.unit(UnitId(0)).unwrap().quantity, 0.5);
    }

    #[test]
    fn test_quantity_at_phase_boundaries() {
        let (_, mut ledger) = ledger();
        let p1 = ledger.begin_phase(PhaseKind::PillarUnity, "unity");
        ledger.apply(UnitId(0), 10.0, Floor::Zero, "gain", None);
        let p2 = ledger.begin_phase(PhaseKind::SeasonalAdjustment, "season");
        ledger.apply(UnitId(0), -30.0, Floor::Zero, "loss", None);

        assert_relative_eq!(ledger.quantity_at(UnitId(0), 0), 100.0);
        assert_relative_eq!(ledger.quantity_at(UnitId(0), p1), 110.0);
        assert_relative_eq!(ledger.quantity_at(UnitId(0), p2), 80.0);
        assert_relative_eq!(ledger.replay(UnitId(0)), 80.0);
    }

    #[test]
    fn test_element_totals() {
        let (_, ledger) = ledger();
        let totals = ledger.element_totals_at(0);
        let sum: f64 = totals.values().sum();
        assert_relative_eq!(sum, 800.0, epsilon = 1e-9);
        // Jia 100, Yin's Jia 60, Chen's Yi 30
        assert_relative_eq!(totals[&Element::Wood], 190.0, epsilon = 1e-9);
        let stems = ledger.stem_totals_at(0);
        assert_relative_eq!(stems[&Stem::Jia], 160.0, epsilon = 1e-9);
    }

    #[test]
    fn test_sequence_is_global_and_increasing() {
        let (_, mut ledger) = ledger();
        ledger.begin_phase(PhaseKind::PillarUnity, "unity");
        ledger.apply(UnitId(3), 1.0, Floor::Zero, "x", None);
        let seqs: Vec<usize> = ledger
            .phases()
            .iter()
            .flat_map(|p| p.events.iter().map(|e| e.seq))
            .collect();
        assert!(seqs.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_summary_counts_relationships() {
        let (_, mut ledger) = ledger();
        ledger.begin_phase(PhaseKind::Pattern(PatternKind::Clash), "clash");
        ledger.apply(UnitId(0), -5.0, Floor::Zero, "clash a", Some(0));
        ledger.apply(UnitId(1), -3.0, Floor::Zero, "clash a", Some(0));
        ledger.apply(UnitId(2), -4.0, Floor::Zero, "clash b", Some(1));
        let s = ledger.summary();
        assert_eq!(s.relationships.get(&PatternKind::Clash), Some(&2));
        assert_relative_eq!(s.total_negative, -12.0);
        assert_relative_eq!(s.total_positive, 800.0, epsilon = 1e-9);
    }

    #[test]
    fn test_narrative_lists_events_in_order() {
        let (_, mut ledger) = ledger();
        ledger.begin_phase(PhaseKind::PillarUnity, "unity");
        ledger.apply(UnitId(0), 12.5, Floor::Zero, "fed by year branch", None);
        let text = ledger.narrative(UnitId(0));
        let registered = text.find("registered").unwrap();
        let fed = text.find("fed by year branch").unwrap();
        assert!(registered < fed);
        assert!(text.contains("final 112.50"));
    }
}
