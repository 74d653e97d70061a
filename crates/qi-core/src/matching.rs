//! Greedy priority matching.
//!
//! Matching is a fold over the registry's evaluation order. The state carried
//! between specs is an [`Availability`] value: the branch and stem nodes not
//! yet claimed by a relationship. Each spec consumes what it matches and hands
//! the remainder to the next one, so a node takes part in at most one
//! relationship per lane.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::catalog::{CatalogEntry, PatternCatalog, PatternKind};
use crate::node::{self, Chart, Layer, Node, NodeId, Symbol};
use crate::registry::{
    LifeDomain, PatternRegistry, PatternSpec, SpatialRule, TemporalRule, TransformRule,
};
use crate::scoring::{self, ScoreBreakdown, ScoreInput};
use crate::season::Season;
use crate::symbols::Element;

/// Nodes still free to take part in a relationship.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Availability {
    branches: BTreeSet<NodeId>,
    stems: BTreeSet<NodeId>,
}

impl Availability {
    /// Every node of the chart.
    pub fn of(chart: &Chart) -> Self {
        let mut available = Self::default();
        for n in &chart.nodes {
            match n.id.layer {
                Layer::Branch => available.branches.insert(n.id),
                Layer::Stem => available.stems.insert(n.id),
            };
        }
        available
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.lane(id.layer).contains(&id)
    }

    fn lane(&self, layer: Layer) -> &BTreeSet<NodeId> {
        match layer {
            Layer::Branch => &self.branches,
            Layer::Stem => &self.stems,
        }
    }

    /// Available nodes of one layer, in node order.
    pub fn nodes(&self, layer: Layer) -> impl Iterator<Item = NodeId> + '_ {
        self.lane(layer).iter().copied()
    }

    /// Copy with `claimed` removed.
    pub fn without(&self, claimed: &[NodeId]) -> Self {
        let mut next = self.clone();
        for id in claimed {
            next.branches.remove(id);
            next.stems.remove(id);
        }
        next
    }

    pub fn len(&self) -> usize {
        self.branches.len() + self.stems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformStatus {
    /// Combination transformed into its element.
    Transformed,
    /// Combination formed without transforming; reduced effect.
    Partial,
    /// Conflicts do not transform.
    NotApplicable,
}

/// One detected relationship.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PatternMatch {
    /// Position in the analysis' match list.
    pub index: usize,
    pub spec_id: String,
    pub kind: PatternKind,
    /// Catalog name, e.g. `Hai-Zi-Chou`.
    pub name: String,
    /// Participants in node order.
    pub participants: Vec<NodeId>,
    pub symbols: Vec<Symbol>,
    /// Distance for pairs, span for triads.
    pub extent: u32,
    pub adjacent: bool,
    pub element: Option<Element>,
    pub controller: Option<NodeId>,
    pub transformation: TransformStatus,
    pub score: ScoreBreakdown,
    pub domains: Vec<LifeDomain>,
}

impl PatternMatch {
    /// Participants other than the controller; every participant when the
    /// relationship is symmetric.
    pub fn victims(&self) -> Vec<NodeId> {
        self.participants
            .iter()
            .copied()
            .filter(|p| Some(*p) != self.controller)
            .collect()
    }

    pub fn is_asymmetric(&self) -> bool {
        self.controller.is_some()
    }

    pub fn involves(&self, id: NodeId) -> bool {
        self.participants.contains(&id)
    }
}

/// Run every spec of the registry over the chart.
pub fn match_patterns(
    registry: &PatternRegistry,
    chart: &Chart,
    season: &Season,
) -> Vec<PatternMatch> {
    let (_, matches) = registry.order().iter().fold(
        (Availability::of(chart), Vec::new()),
        |(available, mut matches), spec| {
            let (remaining, found) =
                match_spec(registry.catalog(), spec, chart, season, available, matches.len());
            matches.extend(found);
            (remaining, matches)
        },
    );
    tracing::debug!(matches = matches.len(), "pattern matching complete");
    matches
}

/// Match one spec against what is still available. Returns the remaining
/// availability and the new matches, numbered from `first_index`.
pub fn match_spec(
    catalog: &PatternCatalog,
    spec: &PatternSpec,
    chart: &Chart,
    season: &Season,
    available: Availability,
    first_index: usize,
) -> (Availability, Vec<PatternMatch>) {
    let mut available = available;
    let mut found = Vec::new();

    let entries = catalog
        .entries(spec.kind)
        .iter()
        .filter(|e| e.arity() == spec.filter.arity);
    for entry in entries {
        while let Some(nodes) = find_candidate(entry, spec, chart, &available) {
            let m = build_match(entry, spec, chart, season, &nodes, first_index + found.len());
            tracing::debug!(
                spec = %spec.id,
                pattern = %m.name,
                extent = m.extent,
                total = m.score.total,
                "pattern matched"
            );
            available = available.without(&m.participants);
            found.push(m);
        }
    }
    (available, found)
}

/// First combination, in node order, of available nodes carrying exactly the
/// entry's symbols and passing its spatial and temporal rules.
fn find_candidate<'c>(
    entry: &CatalogEntry,
    spec: &PatternSpec,
    chart: &'c Chart,
    available: &Availability,
) -> Option<Vec<&'c Node>> {
    let candidates: Vec<&Node> = available
        .nodes(spec.filter.layer)
        .filter_map(|id| chart.get(id))
        .filter(|n| entry.symbols.contains(&n.symbol))
        .collect();
    let k = entry.arity();
    if candidates.len() < k {
        return None;
    }

    let mut pick: Vec<usize> = (0..k).collect();
    loop {
        let nodes: Vec<&Node> = pick.iter().map(|&i| candidates[i]).collect();
        if same_multiset(&entry.symbols, &nodes) && passes_rules(spec, &nodes) {
            return Some(nodes);
        }
        if !next_combination(&mut pick, candidates.len()) {
            return None;
        }
    }
}

/// Advance `pick` to the next k-combination of `0..n` in lexicographic order.
fn next_combination(pick: &mut [usize], n: usize) -> bool {
    let k = pick.len();
    let Some(i) = (0..k).rev().find(|&i| pick[i] < n - k + i) else {
        return false;
    };
    pick[i] += 1;
    for j in i + 1..k {
        pick[j] = pick[j - 1] + 1;
    }
    true
}

fn same_multiset(required: &[Symbol], nodes: &[&Node]) -> bool {
    if required.len() != nodes.len() {
        return false;
    }
    let mut remaining: Vec<Symbol> = required.to_vec();
    for n in nodes {
        match remaining.iter().position(|s| *s == n.symbol) {
            Some(i) => {
                remaining.swap_remove(i);
            }
            None => return false,
        }
    }
    true
}

fn passes_rules(spec: &PatternSpec, nodes: &[&Node]) -> bool {
    let ids: Vec<NodeId> = nodes.iter().map(|n| n.id).collect();
    let spatial = match spec.spatial {
        SpatialRule::Any => true,
        SpatialRule::AdjacentOnly => node::is_adjacent(&ids),
        SpatialRule::MaxDistance(max) => node::extent(&ids) <= max,
    };
    let temporal = match spec.temporal {
        TemporalRule::Any => true,
        TemporalRule::RequiresNatal => ids.iter().any(|id| id.tier.is_natal()),
        TemporalRule::NatalOnly => ids.iter().all(|id| id.tier.is_natal()),
    };
    spatial && temporal
}

fn build_match(
    entry: &CatalogEntry,
    spec: &PatternSpec,
    chart: &Chart,
    season: &Season,
    nodes: &[&Node],
    index: usize,
) -> PatternMatch {
    let participants: Vec<NodeId> = nodes.iter().map(|n| n.id).collect();
    let symbols: Vec<Symbol> = nodes.iter().map(|n| n.symbol).collect();
    let extent = node::extent(&participants);
    let adjacent = node::is_adjacent(&participants);
    let controller = entry
        .controller
        .and_then(|c| nodes.iter().find(|n| n.symbol == c))
        .map(|n| n.id);

    let transformation = match (spec.transform, entry.element) {
        (TransformRule::Full, Some(element)) => {
            let present = chart
                .stems()
                .filter(|s| !participants.contains(&s.id))
                .any(|s| s.element() == element);
            if present {
                TransformStatus::Transformed
            } else {
                TransformStatus::Partial
            }
        }
        (TransformRule::Full | TransformRule::PartialOnly, _) if spec.kind.is_combination() => {
            TransformStatus::Partial
        }
        _ => TransformStatus::NotApplicable,
    };

    let seasonal = match (entry.element, controller) {
        (Some(element), _) if spec.kind.is_combination() => season.multiplier(element),
        (_, Some(c)) => chart
            .get(c)
            .map(|n| season.multiplier(n.element()))
            .unwrap_or(1.0),
        _ => {
            let sum: f64 = nodes.iter().map(|n| season.multiplier(n.element())).sum();
            sum / nodes.len() as f64
        }
    };

    let score = scoring::score(ScoreInput {
        base: spec.base_score,
        arity: participants.len(),
        extent,
        seasonal,
        adjacency_bonus: spec.kind.is_combination()
            && spec.kind != PatternKind::ArchedCombination
            && adjacent,
        asymmetric: !spec.kind.is_combination() && controller.is_some(),
    });

    PatternMatch {
        index,
        spec_id: spec.id.clone(),
        kind: spec.kind,
        name: entry.name(),
        participants,
        symbols,
        extent,
        adjacent,
        element: entry.element,
        controller,
        transformation,
        score,
        domains: spec.domains.clone(),
    }
}
