//! The analysis pipeline.
//!
//! ```text
//! registration -> pillar unity -> seasonal adjustment -> one phase per spec
//! ```
//!
//! Every phase writes into the same [`UnitLedger`]; the [`Analysis`] returned
//! is a snapshot of the ledger plus the matches that drove it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::catalog::PatternKind;
use crate::combat::{self, Interaction};
use crate::config::EngineConfig;
use crate::error::Result;
use crate::ledger::{Floor, LedgerSummary, PhaseKind, PhaseTotals, QiUnit, UnitId, UnitLedger};
use crate::matching::{self, PatternMatch, TransformStatus};
use crate::node::{Chart, Layer, NodeId, Symbol, Tier};
use crate::pillar::{ChartInput, Gender};
use crate::registry::{EffectRule, PatternRegistry};
use crate::scoring;
use crate::season::{Season, SeasonalState};
use crate::symbols::{Branch, Element, Stem};

/// Final state of one chart position.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeReport {
    pub id: NodeId,
    pub symbol: Symbol,
    pub element: Element,
    pub base_qi: f64,
    pub final_qi: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SeasonReport {
    pub month_branch: Option<Branch>,
    pub ruling_element: Option<Element>,
    pub states: BTreeMap<Element, Option<SeasonalState>>,
}

/// Strength of the day stem against the rest of the chart.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DayMaster {
    pub stem: Stem,
    pub element: Element,
    /// Final qi of the day stem node.
    pub qi: f64,
    /// Same element plus the element feeding it.
    pub support: f64,
    /// Everything else.
    pub drain: f64,
    pub strong: bool,
    pub strongest: Element,
    pub weakest: Element,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub gender: Gender,
    pub season: SeasonReport,
    pub nodes: Vec<NodeReport>,
    pub matches: Vec<PatternMatch>,
    pub ledger: UnitLedger,
    pub phase_totals: Vec<PhaseTotals>,
    pub summary: LedgerSummary,
    pub day_master: DayMaster,
}

impl Analysis {
    pub fn units(&self) -> &[QiUnit] {
        self.ledger.units()
    }

    pub fn matches_of(&self, spec_id: &str) -> impl Iterator<Item = &PatternMatch> {
        self.matches.iter().filter(move |m| m.spec_id == spec_id)
    }

    /// Final element totals.
    pub fn element_totals(&self) -> BTreeMap<Element, f64> {
        self.phase_totals
            .last()
            .map(|t| t.elements.clone())
            .unwrap_or_default()
    }
}

/// Run one analysis. The registry is built once and shared; everything else
/// is allocated per call.
pub fn analyze(
    registry: &PatternRegistry,
    config: &EngineConfig,
    input: &ChartInput,
) -> Result<Analysis> {
    config.validate()?;
    let chart = Chart::from_input(input, config.max_talismans)?;
    let season = season_for(config, input);

    let mut ledger = UnitLedger::new();
    ledger.register(&chart, config.base_qi);
    tracing::debug!(
        nodes = chart.len(),
        units = ledger.units().len(),
        "units registered"
    );

    apply_pillar_unity(&mut ledger, &chart);
    apply_season(&mut ledger, &season);

    let matches = matching::match_patterns(registry, &chart, &season);
    for spec in registry.order() {
        ledger.begin_phase(PhaseKind::Pattern(spec.kind), spec.id.as_str());
        for m in matches.iter().filter(|m| m.spec_id == spec.id) {
            apply_match(&mut ledger, spec.effect, m, config.partial_ratio);
        }
    }

    let nodes = chart
        .nodes
        .iter()
        .map(|n| NodeReport {
            id: n.id,
            symbol: n.symbol,
            element: n.element(),
            base_qi: ledger.node_base(n.id),
            final_qi: ledger.node_quantity(n.id),
        })
        .collect();
    let phase_totals = ledger.phase_totals();
    let summary = ledger.summary();
    let day_master = summarize_day_master(input, &ledger, &phase_totals);

    tracing::info!(
        matches = matches.len(),
        events = summary.event_count,
        day_master = %day_master.stem,
        "analysis complete"
    );

    Ok(Analysis {
        gender: input.gender,
        season: season_report(&season),
        nodes,
        matches,
        ledger,
        phase_totals,
        summary,
        day_master,
    })
}

fn season_for(config: &EngineConfig, input: &ChartInput) -> Season {
    match input.month_branch {
        Some(b) => Season::from_month(b),
        None if config.season_from_natal_month => Season::from_month(input.natal[1].branch),
        None => Season::neutral(),
    }
}

fn season_report(season: &Season) -> SeasonReport {
    SeasonReport {
        month_branch: season.month_branch,
        ruling_element: season.ruling_element(),
        states: Element::ALL.iter().map(|e| (*e, season.state(*e))).collect(),
    }
}

/// Stem and branch of the same pillar exchange qi once.
fn apply_pillar_unity(ledger: &mut UnitLedger, chart: &Chart) {
    ledger.begin_phase(PhaseKind::PillarUnity, "pillar unity");
    for tier in chart.tiers() {
        let stem_node = NodeId::new(tier, Layer::Stem);
        let branch_node = NodeId::new(tier, Layer::Branch);
        let (Some(stem_unit), Some(branch_unit)) =
            (ledger.primary_unit(stem_node), ledger.primary_unit(branch_node))
        else {
            continue;
        };
        let (Some(su), Some(bu)) = (ledger.unit(stem_unit), ledger.unit(branch_unit)) else {
            continue;
        };
        let Some((interaction, stem_is_source)) = combat::engagement(su.element, bu.element)
        else {
            continue;
        };

        let (source, target) = if stem_is_source {
            (su.clone(), bu.clone())
        } else {
            (bu.clone(), su.clone())
        };
        let t = combat::transfer(interaction, source.quantity, target.quantity, 1);
        let verb = if interaction.is_control() {
            "controls"
        } else {
            "feeds"
        };
        let cause = format!("pillar unity: {} {verb} {}", source.label(), target.label());
        let target_floor = if interaction.is_control() {
            Floor::One
        } else {
            Floor::Zero
        };
        ledger.apply(source.id, t.source_delta, Floor::Zero, cause.as_str(), None);
        ledger.apply(target.id, t.target_delta, target_floor, cause, None);
    }
}

/// Scale every unit by its element's seasonal multiplier. One event per unit.
fn apply_season(ledger: &mut UnitLedger, season: &Season) {
    ledger.begin_phase(PhaseKind::SeasonalAdjustment, "seasonal adjustment");
    let adjustments: Vec<(UnitId, f64, Element)> = ledger
        .units()
        .iter()
        .map(|u| {
            let m = season.multiplier(u.element);
            (u.id, u.quantity * (m - 1.0), u.element)
        })
        .collect();
    for (id, delta, element) in adjustments {
        let state = season
            .state(element)
            .map(SeasonalState::as_str)
            .unwrap_or("neutral");
        ledger.apply(id, delta, Floor::Zero, format!("season: {element} {state}"), None);
    }
}

fn apply_match(
    ledger: &mut UnitLedger,
    effect: EffectRule,
    m: &PatternMatch,
    partial_ratio: f64,
) {
    let cause = format!("{}: {}", m.kind.as_str(), m.name);
    let index = Some(m.index);

    match effect {
        EffectRule::Combination => {
            let gain = match m.transformation {
                TransformStatus::Transformed => m.score.victim_share,
                _ => scoring::settle(m.score.total * partial_ratio),
            };
            for &p in &m.participants {
                let unit = m
                    .element
                    .and_then(|e| ledger.unit_of_element(p, e))
                    .or_else(|| ledger.primary_unit(p));
                if let Some(unit) = unit {
                    ledger.apply(unit, gain, Floor::Zero, cause.as_str(), index);
                }
            }
        }
        EffectRule::Conflict => {
            // symmetric conflicts have no controller: every participant is a victim
            let charges = m
                .victims()
                .into_iter()
                .map(|v| (v, m.score.victim_share))
                .chain(m.controller.map(|c| (c, m.score.controller_share)));
            for (node, share) in charges {
                if let Some(unit) = ledger.primary_unit(node) {
                    ledger.apply(unit, -share, Floor::Zero, cause.as_str(), index);
                }
            }
        }
        EffectRule::Combat => {
            let interaction = match m.kind {
                PatternKind::Harm => Interaction::Harm,
                _ => Interaction::Clash,
            };
            let (source_node, target_node) = match m.controller {
                Some(c) => (Some(c), m.victims().first().copied()),
                None => (m.participants.first().copied(), m.participants.get(1).copied()),
            };
            let (Some(source), Some(target)) = (
                source_node.and_then(|n| ledger.primary_unit(n)),
                target_node.and_then(|n| ledger.primary_unit(n)),
            ) else {
                return;
            };
            let (Some(s), Some(t)) = (ledger.unit(source), ledger.unit(target)) else {
                return;
            };
            let transfer = combat::transfer(interaction, s.quantity, t.quantity, m.extent);
            let source_delta = if m.is_asymmetric() {
                transfer.source_delta
            } else {
                transfer.target_delta
            };
            ledger.apply(source, source_delta, Floor::Zero, cause.as_str(), index);
            ledger.apply(target, transfer.target_delta, Floor::Zero, cause, index);
        }
    }
}

fn summarize_day_master(input: &ChartInput, ledger: &UnitLedger, totals: &[PhaseTotals]) -> DayMaster {
    let stem = input.day_master();
    let element = stem.element();
    let elements = totals.last().map(|t| t.elements.clone()).unwrap_or_default();
    let total_of = |e: Element| elements.get(&e).copied().unwrap_or(0.0);

    let support = total_of(element) + total_of(element.generated_by());
    let drain: f64 = Element::ALL
        .iter()
        .filter(|e| **e != element && **e != element.generated_by())
        .map(|e| total_of(*e))
        .sum();

    // first element wins ties
    let mut strongest = Element::ALL[0];
    let mut weakest = Element::ALL[0];
    for e in Element::ALL {
        if total_of(e) > total_of(strongest) {
            strongest = e;
        }
        if total_of(e) < total_of(weakest) {
            weakest = e;
        }
    }

    DayMaster {
        stem,
        element,
        qi: ledger.node_quantity(NodeId::stem(Tier::Day)),
        support,
        drain,
        strong: support >= drain,
        strongest,
        weakest,
    }
}
