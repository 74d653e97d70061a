//! Chart positions and their geometry.
//!
//! Natal nodes sit on a 4 × 2 grid (pillar column × stem/branch layer) and
//! are compared by Manhattan distance. Annual, monthly, daily and hourly
//! overlays reuse the coordinates of the natal pillar they shadow. Luck and
//! talisman pillars float: they are at distance 1 from everything.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::TALISMAN_SLOTS;
use crate::error::InputError;
use crate::pillar::{ChartInput, Pillar};
use crate::symbols::{Branch, Element, Polarity, Stem};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Year,
    Month,
    Day,
    Hour,
    Luck,
    Annual,
    Monthly,
    Daily,
    Hourly,
    Talisman(u8),
}

impl Tier {
    pub const NATAL: [Tier; 4] = [Tier::Year, Tier::Month, Tier::Day, Tier::Hour];

    pub fn is_natal(self) -> bool {
        matches!(self, Self::Year | Self::Month | Self::Day | Self::Hour)
    }

    /// Grid column, `None` for floating tiers.
    pub fn column(self) -> Option<usize> {
        match self {
            Self::Year | Self::Annual => Some(0),
            Self::Month | Self::Monthly => Some(1),
            Self::Day | Self::Daily => Some(2),
            Self::Hour | Self::Hourly => Some(3),
            Self::Luck | Self::Talisman(_) => None,
        }
    }

    pub fn label(self) -> String {
        match self {
            Self::Year => "year".into(),
            Self::Month => "month".into(),
            Self::Day => "day".into(),
            Self::Hour => "hour".into(),
            Self::Luck => "luck".into(),
            Self::Annual => "annual".into(),
            Self::Monthly => "monthly".into(),
            Self::Daily => "daily".into(),
            Self::Hourly => "hourly".into(),
            Self::Talisman(k) => format!("talisman#{k}"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layer {
    Stem,
    Branch,
}

impl Layer {
    fn row(self) -> usize {
        match self {
            Self::Stem => 0,
            Self::Branch => 1,
        }
    }
}

/// A chart position: one half of one pillar.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId {
    pub tier: Tier,
    pub layer: Layer,
}

impl NodeId {
    pub fn new(tier: Tier, layer: Layer) -> Self {
        Self { tier, layer }
    }

    pub fn stem(tier: Tier) -> Self {
        Self::new(tier, Layer::Stem)
    }

    pub fn branch(tier: Tier) -> Self {
        Self::new(tier, Layer::Branch)
    }

    /// The other half of the same pillar.
    pub fn partner(self) -> Self {
        match self.layer {
            Layer::Stem => Self::branch(self.tier),
            Layer::Branch => Self::stem(self.tier),
        }
    }

    fn coordinate(self) -> Option<(usize, usize)> {
        self.tier.column().map(|c| (c, self.layer.row()))
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let layer = match self.layer {
            Layer::Stem => "stem",
            Layer::Branch => "branch",
        };
        write!(f, "{} {layer}", self.tier.label())
    }
}

/// Grid distance between two distinct nodes. Always at least 1.
pub fn distance(a: NodeId, b: NodeId) -> u32 {
    debug_assert_ne!(a, b, "distance of a node to itself");
    match (a.coordinate(), b.coordinate()) {
        (Some((ca, ra)), Some((cb, rb))) => {
            let d = ca.abs_diff(cb) + ra.abs_diff(rb);
            d.max(1) as u32
        }
        _ => 1,
    }
}

/// Largest pairwise distance of three nodes.
pub fn span(a: NodeId, b: NodeId, c: NodeId) -> u32 {
    distance(a, b).max(distance(a, c)).max(distance(b, c))
}

/// Distance for a pair, span for a triad. Singletons report 1.
pub fn extent(nodes: &[NodeId]) -> u32 {
    match nodes {
        [a, b] => distance(*a, *b),
        [a, b, c] => span(*a, *b, *c),
        _ => {
            let mut max = 1;
            for (i, a) in nodes.iter().enumerate() {
                for b in &nodes[i + 1..] {
                    max = max.max(distance(*a, *b));
                }
            }
            max
        }
    }
}

/// True if the nodes can be ordered so each step is distance 1.
pub fn is_adjacent(nodes: &[NodeId]) -> bool {
    match nodes {
        [] | [_] => true,
        [a, b] => distance(*a, *b) == 1,
        [a, b, c] => {
            let ab = distance(*a, *b) == 1;
            let bc = distance(*b, *c) == 1;
            let ac = distance(*a, *c) == 1;
            (ab && bc) || (ab && ac) || (ac && bc)
        }
        _ => false,
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Symbol {
    Stem(Stem),
    Branch(Branch),
}

impl Symbol {
    pub fn element(self) -> Element {
        match self {
            Self::Stem(s) => s.element(),
            Self::Branch(b) => b.element(),
        }
    }

    pub fn polarity(self) -> Polarity {
        match self {
            Self::Stem(s) => s.polarity(),
            Self::Branch(b) => b.polarity(),
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stem(s) => write!(f, "{s}"),
            Self::Branch(b) => write!(f, "{b}"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub symbol: Symbol,
}

impl Node {
    pub fn stem(&self) -> Option<Stem> {
        match self.symbol {
            Symbol::Stem(s) => Some(s),
            Symbol::Branch(_) => None,
        }
    }

    pub fn branch(&self) -> Option<Branch> {
        match self.symbol {
            Symbol::Branch(b) => Some(b),
            Symbol::Stem(_) => None,
        }
    }

    pub fn element(&self) -> Element {
        self.symbol.element()
    }

    pub fn label(&self) -> String {
        format!("{} {}", self.id, self.symbol)
    }
}

/// All nodes of one analysis, in tier order, stem before branch.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Chart {
    pub nodes: Vec<Node>,
}

impl Chart {
    /// Expand a chart input into its nodes.
    pub fn from_input(input: &ChartInput, max_talismans: usize) -> Result<Self, InputError> {
        let max_talismans = max_talismans.min(TALISMAN_SLOTS);
        if input.talismans.len() > max_talismans {
            return Err(InputError::TooManyTalismans {
                given: input.talismans.len(),
                max: max_talismans,
            });
        }

        let mut nodes = Vec::with_capacity(input.pillar_count() * 2);
        for (tier, pillar) in pillars_of(input) {
            nodes.push(Node {
                id: NodeId::stem(tier),
                symbol: Symbol::Stem(pillar.stem),
            });
            nodes.push(Node {
                id: NodeId::branch(tier),
                symbol: Symbol::Branch(pillar.branch),
            });
        }
        Ok(Self { nodes })
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn stems(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(|n| n.id.layer == Layer::Stem)
    }

    pub fn branches(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(|n| n.id.layer == Layer::Branch)
    }

    /// Tiers present, in node order.
    pub fn tiers(&self) -> Vec<Tier> {
        let mut tiers: Vec<Tier> = self.stems().map(|n| n.id.tier).collect();
        tiers.dedup();
        tiers
    }
}

/// Every pillar of an input with the tier it occupies.
pub fn pillars_of(input: &ChartInput) -> Vec<(Tier, Pillar)> {
    let mut out: Vec<(Tier, Pillar)> = Tier::NATAL.iter().copied().zip(input.natal).collect();
    let overlays = [
        (Tier::Luck, input.luck),
        (Tier::Annual, input.annual),
        (Tier::Monthly, input.monthly),
        (Tier::Daily, input.daily),
        (Tier::Hourly, input.hourly),
    ];
    out.extend(overlays.into_iter().filter_map(|(t, p)| p.map(|p| (t, p))));
    out.extend(
        input
            .talismans
            .iter()
            .enumerate()
            .filter_map(|(k, p)| u8::try_from(k).ok().map(|k| (Tier::Talisman(k), *p))),
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_talismans_capped_by_addressable_tiers() {
        let mut input = ChartInput::parse_natal(["JiaZi", "GengChen", "BingYin", "WuXu"]).unwrap();
        input.talismans = vec!["JiaZi".parse().unwrap(); 300];
        let err = Chart::from_input(&input, usize::MAX).unwrap_err();
        assert_eq!(err, InputError::TooManyTalismans { given: 300, max: 256 });

        input.talismans.truncate(256);
        let chart = Chart::from_input(&input, usize::MAX).unwrap();
        assert_eq!(chart.len(), (4 + 256) * 2);
        assert!(chart.get(NodeId::stem(Tier::Talisman(255))).is_some());
    }

    #[test]
    fn test_natal_manhattan_distance() {
        let ys = NodeId::stem(Tier::Year);
        let yb = NodeId::branch(Tier::Year);
        let ms = NodeId::stem(Tier::Month);
        let hb = NodeId::branch(Tier::Hour);
        assert_eq!(distance(ys, yb), 1);
        assert_eq!(distance(ys, ms), 1);
        assert_eq!(distance(ys, hb), 4);
        assert_eq!(distance(yb, hb), 3);
    }

    #[test]
    fn test_floating_tiers_are_adjacent_to_everything() {
        let luck_s = NodeId::stem(Tier::Luck);
        let luck_b = NodeId::branch(Tier::Luck);
        let tal = NodeId::branch(Tier::Talisman(0));
        assert_eq!(distance(luck_s, luck_b), 1);
        assert_eq!(distance(luck_s, NodeId::branch(Tier::Hour)), 1);
        assert_eq!(distance(tal, NodeId::stem(Tier::Year)), 1);
        assert_eq!(distance(tal, luck_s), 1);
    }

    #[test]
    fn test_overlay_shares_natal_coordinates() {
        let annual_stem = NodeId::stem(Tier::Annual);
        let year_stem = NodeId::stem(Tier::Year);
        let hour_branch = NodeId::branch(Tier::Hour);
        assert_eq!(distance(annual_stem, hour_branch), distance(year_stem, hour_branch));
        // full overlap still reports the minimum distance
        assert_eq!(distance(annual_stem, year_stem), 1);
    }

    #[test]
    fn test_span_is_max_pairwise() {
        let a = NodeId::branch(Tier::Year);
        let b = NodeId::branch(Tier::Month);
        let c = NodeId::branch(Tier::Day);
        assert_eq!(span(a, b, c), 2);
        assert_eq!(span(a, c, NodeId::branch(Tier::Hour)), 3);
        assert_eq!(extent(&[a, b, c]), 2);
    }

    #[test]
    fn test_adjacency_chain() {
        let yb = NodeId::branch(Tier::Year);
        let mb = NodeId::branch(Tier::Month);
        let db = NodeId::branch(Tier::Day);
        let hb = NodeId::branch(Tier::Hour);
        assert!(is_adjacent(&[yb, mb]));
        assert!(!is_adjacent(&[yb, db]));
        assert!(is_adjacent(&[db, yb, mb]));
        assert!(!is_adjacent(&[yb, mb, hb]));
    }

    #[test]
    fn test_chart_node_order() {
        let input = ChartInput::parse_natal(["JiaZi", "BingYin", "WuChen", "GengShen"])
            .unwrap()
            .with_luck("DingMao".parse().unwrap())
            .with_talisman("RenXu".parse().unwrap());
        let chart = Chart::from_input(&input, 5).unwrap();
        assert_eq!(chart.len(), 12);
        assert_eq!(chart.nodes[0].id, NodeId::stem(Tier::Year));
        assert_eq!(chart.nodes[1].id, NodeId::branch(Tier::Year));
        assert_eq!(chart.nodes[8].id, NodeId::stem(Tier::Luck));
        assert_eq!(chart.nodes[10].id, NodeId::stem(Tier::Talisman(0)));
        assert_eq!(chart.stems().count(), 6);
        assert_eq!(
            chart.tiers(),
            vec![Tier::Year, Tier::Month, Tier::Day, Tier::Hour, Tier::Luck, Tier::Talisman(0)]
        );
    }

    #[test]
    fn test_too_many_talismans_rejected() {
        let mut input = ChartInput::parse_natal(["JiaZi", "BingYin", "WuChen", "GengShen"]).unwrap();
        for _ in 0..3 {
            input = input.with_talisman("RenXu".parse().unwrap());
        }
        assert!(matches!(
            Chart::from_input(&input, 2),
            Err(InputError::TooManyTalismans { given: 3, max: 2 })
        ));
    }
}
