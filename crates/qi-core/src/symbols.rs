//! Core symbol tables: the five elements, ten stems, twelve branches.
//!
//! Everything else in the engine (pattern catalog, seasonal table, unit
//! expansion) is derived from the small amount of data in this module.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::InputError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Element {
    Wood,
    Fire,
    Earth,
    Metal,
    Water,
}

/// How one element stands towards another.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ElementRelation {
    Same,
    /// `a` feeds `b`.
    Generates,
    /// `b` feeds `a`.
    GeneratedBy,
    /// `a` suppresses `b`.
    Controls,
    /// `b` suppresses `a`.
    ControlledBy,
}

impl Element {
    /// Generation-cycle order.
    pub const ALL: [Element; 5] = [
        Element::Wood,
        Element::Fire,
        Element::Earth,
        Element::Metal,
        Element::Water,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(i: usize) -> Self {
        Self::ALL[i % 5]
    }

    /// The element this one feeds.
    pub fn generates(self) -> Self {
        Self::from_index(self.index() + 1)
    }

    /// The element this one suppresses.
    pub fn controls(self) -> Self {
        Self::from_index(self.index() + 2)
    }

    pub fn generated_by(self) -> Self {
        Self::from_index(self.index() + 4)
    }

    pub fn controlled_by(self) -> Self {
        Self::from_index(self.index() + 3)
    }

    pub fn relation_to(self, other: Element) -> ElementRelation {
        match (other.index() + 5 - self.index()) % 5 {
            0 => ElementRelation::Same,
            1 => ElementRelation::Generates,
            2 => ElementRelation::Controls,
            3 => ElementRelation::ControlledBy,
            _ => ElementRelation::GeneratedBy,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Wood => "Wood",
            Self::Fire => "Fire",
            Self::Earth => "Earth",
            Self::Metal => "Metal",
            Self::Water => "Water",
        }
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Polarity {
    Yang,
    Yin,
}

impl Polarity {
    fn from_index(i: usize) -> Self {
        if i % 2 == 0 { Self::Yang } else { Self::Yin }
    }
}

// ---------------------------------------------------------------------------
// Stems
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Stem {
    Jia,
    Yi,
    Bing,
    Ding,
    Wu,
    Ji,
    Geng,
    Xin,
    Ren,
    Gui,
}

const STEM_NAMES: [&str; 10] = [
    "Jia", "Yi", "Bing", "Ding", "Wu", "Ji", "Geng", "Xin", "Ren", "Gui",
];
const STEM_GLYPHS: [char; 10] = ['甲', '乙', '丙', '丁', '戊', '己', '庚', '辛', '壬', '癸'];

impl Stem {
    pub const ALL: [Stem; 10] = [
        Stem::Jia,
        Stem::Yi,
        Stem::Bing,
        Stem::Ding,
        Stem::Wu,
        Stem::Ji,
        Stem::Geng,
        Stem::Xin,
        Stem::Ren,
        Stem::Gui,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(i: usize) -> Self {
        Self::ALL[i % 10]
    }

    pub fn element(self) -> Element {
        Element::from_index(self.index() / 2)
    }

    pub fn polarity(self) -> Polarity {
        Polarity::from_index(self.index())
    }

    pub fn name(self) -> &'static str {
        STEM_NAMES[self.index()]
    }

    pub fn glyph(self) -> char {
        STEM_GLYPHS[self.index()]
    }

    /// Stem-combination partner (five pairs, five apart).
    pub fn combination_partner(self) -> Stem {
        Self::from_index(self.index() + 5)
    }

    /// Element a stem combination turns into: Jia-Ji Earth, Yi-Geng Metal,
    /// Bing-Xin Water, Ding-Ren Wood, Wu-Gui Fire.
    pub fn combination_element(self) -> Element {
        Element::from_index(self.index() % 5 + 2)
    }

    /// Stem-conflict partner (Jia-Geng, Yi-Xin, Bing-Ren, Ding-Gui). Wu and Ji
    /// have none.
    pub fn conflict_partner(self) -> Option<Stem> {
        match self.index() {
            i @ 0..=3 => Some(Self::from_index(i + 6)),
            i @ 6..=9 => Some(Self::from_index(i - 6)),
            _ => None,
        }
    }

    fn parse_token(s: &str) -> Option<Self> {
        let mut chars = s.chars();
        if let (Some(c), None) = (chars.next(), chars.next())
            && let Some(i) = STEM_GLYPHS.iter().position(|g| *g == c)
        {
            return Some(Self::ALL[i]);
        }
        STEM_NAMES
            .iter()
            .position(|n| n.eq_ignore_ascii_case(s))
            .map(|i| Self::ALL[i])
    }
}

impl fmt::Display for Stem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Stem {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_token(s.trim()).ok_or_else(|| InputError::UnknownStem(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Branches
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Branch {
    Zi,
    Chou,
    Yin,
    Mao,
    Chen,
    Si,
    Wu,
    Wei,
    Shen,
    You,
    Xu,
    Hai,
}

const BRANCH_NAMES: [&str; 12] = [
    "Zi", "Chou", "Yin", "Mao", "Chen", "Si", "Wu", "Wei", "Shen", "You", "Xu", "Hai",
];
const BRANCH_GLYPHS: [char; 12] = [
    '子', '丑', '寅', '卯', '辰', '巳', '午', '未', '申', '酉', '戌', '亥',
];

/// One hidden-qi component of a branch.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct HiddenQi {
    pub stem: Stem,
    /// Share of the branch node's qi, 0–1.
    pub strength: f64,
}

const fn hq(stem: Stem, percent: u8) -> HiddenQi {
    HiddenQi {
        stem,
        strength: percent as f64 / 100.0,
    }
}

/// Hidden qi per branch, strongest first. Each row sums to 1.
const HIDDEN_QI: [&[HiddenQi]; 12] = [
    &[hq(Stem::Gui, 70), hq(Stem::Ren, 30)],
    &[hq(Stem::Ji, 60), hq(Stem::Gui, 30), hq(Stem::Xin, 10)],
    &[hq(Stem::Jia, 60), hq(Stem::Bing, 30), hq(Stem::Wu, 10)],
    &[hq(Stem::Yi, 70), hq(Stem::Jia, 30)],
    &[hq(Stem::Wu, 60), hq(Stem::Yi, 30), hq(Stem::Gui, 10)],
    &[hq(Stem::Bing, 60), hq(Stem::Wu, 30), hq(Stem::Geng, 10)],
    &[hq(Stem::Ding, 70), hq(Stem::Ji, 30)],
    &[hq(Stem::Ji, 60), hq(Stem::Ding, 30), hq(Stem::Yi, 10)],
    &[hq(Stem::Geng, 60), hq(Stem::Ren, 30), hq(Stem::Wu, 10)],
    &[hq(Stem::Xin, 70), hq(Stem::Geng, 30)],
    &[hq(Stem::Wu, 60), hq(Stem::Xin, 30), hq(Stem::Ding, 10)],
    &[hq(Stem::Ren, 70), hq(Stem::Jia, 30)],
];

const BRANCH_ELEMENTS: [Element; 12] = [
    Element::Water,
    Element::Earth,
    Element::Wood,
    Element::Wood,
    Element::Earth,
    Element::Fire,
    Element::Fire,
    Element::Earth,
    Element::Metal,
    Element::Metal,
    Element::Earth,
    Element::Water,
];

impl Branch {
    pub const ALL: [Branch; 12] = [
        Branch::Zi,
        Branch::Chou,
        Branch::Yin,
        Branch::Mao,
        Branch::Chen,
        Branch::Si,
        Branch::Wu,
        Branch::Wei,
        Branch::Shen,
        Branch::You,
        Branch::Xu,
        Branch::Hai,
    ];

    /// The four season peaks, one per direction.
    pub const CARDINALS: [Branch; 4] = [Branch::Zi, Branch::Mao, Branch::Wu, Branch::You];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(i: usize) -> Self {
        Self::ALL[i % 12]
    }

    /// Offset around the twelve-branch ring, wrapping.
    pub fn offset(self, by: isize) -> Self {
        Self::from_index((self.index() as isize + by).rem_euclid(12) as usize)
    }

    pub fn element(self) -> Element {
        BRANCH_ELEMENTS[self.index()]
    }

    pub fn polarity(self) -> Polarity {
        Polarity::from_index(self.index())
    }

    pub fn name(self) -> &'static str {
        BRANCH_NAMES[self.index()]
    }

    pub fn glyph(self) -> char {
        BRANCH_GLYPHS[self.index()]
    }

    pub fn is_cardinal(self) -> bool {
        self.index() % 3 == 0
    }

    pub fn hidden_qi(self) -> &'static [HiddenQi] {
        HIDDEN_QI[self.index()]
    }

    /// Index-0 hidden qi.
    pub fn primary_qi(self) -> HiddenQi {
        HIDDEN_QI[self.index()][0]
    }

    pub fn clash_partner(self) -> Branch {
        self.offset(6)
    }

    pub fn harm_partner(self) -> Branch {
        Self::from_index((19 - self.index()) % 12)
    }

    pub fn harmony_partner(self) -> Branch {
        Self::from_index((13 - self.index()) % 12)
    }

    pub fn destruction_partner(self) -> Branch {
        match self.polarity() {
            Polarity::Yang => self.offset(-3),
            Polarity::Yin => self.offset(3),
        }
    }

    fn parse_token(s: &str) -> Option<Self> {
        let mut chars = s.chars();
        if let (Some(c), None) = (chars.next(), chars.next())
            && let Some(i) = BRANCH_GLYPHS.iter().position(|g| *g == c)
        {
            return Some(Self::ALL[i]);
        }
        BRANCH_NAMES
            .iter()
            .position(|n| n.eq_ignore_ascii_case(s))
            .map(|i| Self::ALL[i])
    }
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Branch {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_token(s.trim()).ok_or_else(|| InputError::UnknownBranch(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_cycles() {
        assert_eq!(Element::Wood.generates(), Element::Fire);
        assert_eq!(Element::Water.generates(), Element::Wood);
        assert_eq!(Element::Wood.controls(), Element::Earth);
        assert_eq!(Element::Metal.controls(), Element::Wood);
        assert_eq!(Element::Fire.generated_by(), Element::Wood);
        assert_eq!(Element::Wood.controlled_by(), Element::Metal);
    }

    #[test]
    fn test_element_relation_is_consistent_with_cycles() {
        for a in Element::ALL {
            assert_eq!(a.relation_to(a), ElementRelation::Same);
            assert_eq!(a.relation_to(a.generates()), ElementRelation::Generates);
            assert_eq!(a.relation_to(a.controls()), ElementRelation::Controls);
            assert_eq!(a.relation_to(a.generated_by()), ElementRelation::GeneratedBy);
            assert_eq!(a.relation_to(a.controlled_by()), ElementRelation::ControlledBy);
        }
    }

    #[test]
    fn test_stem_attributes() {
        assert_eq!(Stem::Jia.element(), Element::Wood);
        assert_eq!(Stem::Gui.element(), Element::Water);
        assert_eq!(Stem::Ji.polarity(), Polarity::Yin);
        assert_eq!(Stem::Geng.polarity(), Polarity::Yang);
    }

    #[test]
    fn test_stem_combination_table() {
        let expected = [
            (Stem::Jia, Stem::Ji, Element::Earth),
            (Stem::Yi, Stem::Geng, Element::Metal),
            (Stem::Bing, Stem::Xin, Element::Water),
            (Stem::Ding, Stem::Ren, Element::Wood),
            (Stem::Wu, Stem::Gui, Element::Fire),
        ];
        for (a, b, e) in expected {
            assert_eq!(a.combination_partner(), b);
            assert_eq!(b.combination_partner(), a);
            assert_eq!(a.combination_element(), e);
            assert_eq!(b.combination_element(), e);
        }
    }

    #[test]
    fn test_stem_conflict_partners() {
        assert_eq!(Stem::Jia.conflict_partner(), Some(Stem::Geng));
        assert_eq!(Stem::Gui.conflict_partner(), Some(Stem::Ding));
        assert_eq!(Stem::Wu.conflict_partner(), None);
        assert_eq!(Stem::Ji.conflict_partner(), None);
    }

    #[test]
    fn test_hidden_qi_rows_sum_to_one_sorted() {
        for b in Branch::ALL {
            let row = b.hidden_qi();
            assert!((2..=4).contains(&row.len()), "{b} has {} components", row.len());
            let total: f64 = row.iter().map(|h| h.strength).sum();
            assert!((total - 1.0).abs() < 1e-9, "{b} sums to {total}");
            for w in row.windows(2) {
                assert!(w[0].strength >= w[1].strength);
            }
        }
    }

    #[test]
    fn test_primary_qi_matches_branch_element() {
        for b in Branch::ALL {
            assert_eq!(b.primary_qi().stem.element(), b.element(), "{b}");
        }
    }

    #[test]
    fn test_branch_partner_tables() {
        assert_eq!(Branch::Zi.clash_partner(), Branch::Wu);
        assert_eq!(Branch::Si.clash_partner(), Branch::Hai);
        assert_eq!(Branch::Zi.harm_partner(), Branch::Wei);
        assert_eq!(Branch::Shen.harm_partner(), Branch::Hai);
        assert_eq!(Branch::Mao.harm_partner(), Branch::Chen);
        assert_eq!(Branch::Zi.harmony_partner(), Branch::Chou);
        assert_eq!(Branch::Yin.harmony_partner(), Branch::Hai);
        assert_eq!(Branch::Wu.harmony_partner(), Branch::Wei);
        assert_eq!(Branch::Zi.destruction_partner(), Branch::You);
        assert_eq!(Branch::Chou.destruction_partner(), Branch::Chen);
        assert_eq!(Branch::Yin.destruction_partner(), Branch::Hai);
        assert_eq!(Branch::Wei.destruction_partner(), Branch::Xu);
        for b in Branch::ALL {
            assert_eq!(b.clash_partner().clash_partner(), b);
            assert_eq!(b.harm_partner().harm_partner(), b);
            assert_eq!(b.harmony_partner().harmony_partner(), b);
            assert_eq!(b.destruction_partner().destruction_partner(), b);
        }
    }

    #[test]
    fn test_parse_names_and_glyphs() {
        assert_eq!("jia".parse::<Stem>().unwrap(), Stem::Jia);
        assert_eq!("庚".parse::<Stem>().unwrap(), Stem::Geng);
        assert_eq!("HAI".parse::<Branch>().unwrap(), Branch::Hai);
        assert_eq!("丑".parse::<Branch>().unwrap(), Branch::Chou);
        assert!(matches!(
            "qux".parse::<Stem>(),
            Err(InputError::UnknownStem(_))
        ));
        assert!(matches!(
            "子".parse::<Stem>(),
            Err(InputError::UnknownStem(_))
        ));
    }
}
