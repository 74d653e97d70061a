//! Pattern catalog: every concrete combination and conflict, expanded once
//! from the stem and branch tables.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::node::Symbol;
use crate::symbols::{Branch, Element, ElementRelation, Stem};

/// Pattern categories, in branch-lane priority order followed by the stem lane.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    ThreeMeeting,
    BullyingPunishment,
    RudenessPunishment,
    PairPunishment,
    SelfPunishment,
    Harm,
    Clash,
    Destruction,
    ThreeCombination,
    SixHarmony,
    HalfMeeting,
    HalfCombination,
    ArchedCombination,
    StemCombination,
    StemConflict,
}

impl PatternKind {
    pub const ALL: [PatternKind; 15] = [
        PatternKind::ThreeMeeting,
        PatternKind::BullyingPunishment,
        PatternKind::RudenessPunishment,
        PatternKind::PairPunishment,
        PatternKind::SelfPunishment,
        PatternKind::Harm,
        PatternKind::Clash,
        PatternKind::Destruction,
        PatternKind::ThreeCombination,
        PatternKind::SixHarmony,
        PatternKind::HalfMeeting,
        PatternKind::HalfCombination,
        PatternKind::ArchedCombination,
        PatternKind::StemCombination,
        PatternKind::StemConflict,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ThreeMeeting => "three_meeting",
            Self::BullyingPunishment => "bullying_punishment",
            Self::RudenessPunishment => "rudeness_punishment",
            Self::PairPunishment => "pair_punishment",
            Self::SelfPunishment => "self_punishment",
            Self::Harm => "harm",
            Self::Clash => "clash",
            Self::Destruction => "destruction",
            Self::ThreeCombination => "three_combination",
            Self::SixHarmony => "six_harmony",
            Self::HalfMeeting => "half_meeting",
            Self::HalfCombination => "half_combination",
            Self::ArchedCombination => "arched_combination",
            Self::StemCombination => "stem_combination",
            Self::StemConflict => "stem_conflict",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::ThreeMeeting => "Three Meeting",
            Self::BullyingPunishment => "Bullying Punishment",
            Self::RudenessPunishment => "Rudeness Punishment",
            Self::PairPunishment => "Pair Punishment",
            Self::SelfPunishment => "Self Punishment",
            Self::Harm => "Harm",
            Self::Clash => "Clash",
            Self::Destruction => "Destruction",
            Self::ThreeCombination => "Three Combination",
            Self::SixHarmony => "Six Harmony",
            Self::HalfMeeting => "Half Meeting",
            Self::HalfCombination => "Half Combination",
            Self::ArchedCombination => "Arched Combination",
            Self::StemCombination => "Stem Combination",
            Self::StemConflict => "Stem Conflict",
        }
    }

    /// Positive (qi-granting) relationship.
    pub fn is_combination(self) -> bool {
        matches!(
            self,
            Self::ThreeMeeting
                | Self::ThreeCombination
                | Self::SixHarmony
                | Self::HalfMeeting
                | Self::HalfCombination
                | Self::ArchedCombination
                | Self::StemCombination
        )
    }

    pub fn is_stem_level(self) -> bool {
        matches!(self, Self::StemCombination | Self::StemConflict)
    }
}

impl fmt::Display for PatternKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One concrete pattern: the symbols it needs and what it produces.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub kind: PatternKind,
    /// Required symbols as a multiset (self-punishment repeats one branch).
    pub symbols: Vec<Symbol>,
    /// Element the participants combine into. Conflicts have none.
    pub element: Option<Element>,
    /// Controlling side of an asymmetric conflict.
    pub controller: Option<Symbol>,
}

impl CatalogEntry {
    fn branches(kind: PatternKind, branches: &[Branch], element: Option<Element>) -> Self {
        Self {
            kind,
            symbols: branches.iter().copied().map(Symbol::Branch).collect(),
            element,
            controller: None,
        }
    }

    fn with_controller(mut self, controller: Option<Symbol>) -> Self {
        self.controller = controller;
        self
    }

    pub fn arity(&self) -> usize {
        self.symbols.len()
    }

    /// `Hai-Zi-Chou` style name.
    pub fn name(&self) -> String {
        self.symbols
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .join("-")
    }
}

/// Six-harmony result keyed by the lower branch index (Zi, Yin, Mao, Chen, Si, Wu).
const HARMONY_ELEMENTS: [(Branch, Element); 6] = [
    (Branch::Zi, Element::Earth),
    (Branch::Yin, Element::Wood),
    (Branch::Mao, Element::Fire),
    (Branch::Chen, Element::Metal),
    (Branch::Si, Element::Water),
    (Branch::Wu, Element::Fire),
];

const BULLYING: [Branch; 3] = [Branch::Yin, Branch::Si, Branch::Shen];
const RUDENESS: [Branch; 3] = [Branch::Chou, Branch::Xu, Branch::Wei];
const PAIR_PUNISHMENT: [Branch; 2] = [Branch::Zi, Branch::Mao];
const SELF_PUNISHING: [Branch; 4] = [Branch::Chen, Branch::Wu, Branch::You, Branch::Hai];

/// Controlling side of a two-element conflict. A controlling element is the
/// controller; in a feeding relationship the fed side plays controller and
/// the feeder is drained. Same-element pairs are symmetric.
pub fn controlling_side(a: Element, b: Element) -> Option<bool> {
    match a.relation_to(b) {
        ElementRelation::Same => None,
        ElementRelation::Controls | ElementRelation::GeneratedBy => Some(true),
        ElementRelation::ControlledBy | ElementRelation::Generates => Some(false),
    }
}

fn branch_controller(a: Branch, b: Branch) -> Option<Symbol> {
    controlling_side(a.element(), b.element())
        .map(|a_controls| Symbol::Branch(if a_controls { a } else { b }))
}

/// Immutable catalog, one entry list per pattern kind.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PatternCatalog {
    entries: BTreeMap<PatternKind, Vec<CatalogEntry>>,
}

impl PatternCatalog {
    /// Expand the core symbol tables into the full catalog.
    pub fn build() -> Self {
        let mut entries: BTreeMap<PatternKind, Vec<CatalogEntry>> = BTreeMap::new();
        let mut push = |e: CatalogEntry| entries.entry(e.kind).or_default().push(e);

        for c in Branch::CARDINALS {
            let element = Some(c.element());
            let (before, after) = (c.offset(-1), c.offset(1));
            let (birth, tomb) = (c.offset(-4), c.offset(4));

            push(CatalogEntry::branches(
                PatternKind::ThreeMeeting,
                &[before, c, after],
                element,
            ));
            push(CatalogEntry::branches(
                PatternKind::ThreeCombination,
                &[birth, c, tomb],
                element,
            ));
            push(CatalogEntry::branches(PatternKind::HalfMeeting, &[before, c], element));
            push(CatalogEntry::branches(PatternKind::HalfMeeting, &[c, after], element));
            push(CatalogEntry::branches(PatternKind::HalfCombination, &[birth, c], element));
            push(CatalogEntry::branches(PatternKind::HalfCombination, &[c, tomb], element));
            push(CatalogEntry::branches(
                PatternKind::ArchedCombination,
                &[birth, tomb],
                element,
            ));
        }

        push(CatalogEntry::branches(PatternKind::BullyingPunishment, &BULLYING, None));
        push(CatalogEntry::branches(PatternKind::RudenessPunishment, &RUDENESS, None));
        let [p, q] = PAIR_PUNISHMENT;
        push(
            CatalogEntry::branches(PatternKind::PairPunishment, &PAIR_PUNISHMENT, None)
                .with_controller(branch_controller(p, q)),
        );
        for b in SELF_PUNISHING {
            push(CatalogEntry::branches(PatternKind::SelfPunishment, &[b, b], None));
        }

        for b in Branch::ALL {
            let harm = b.harm_partner();
            if b < harm {
                push(
                    CatalogEntry::branches(PatternKind::Harm, &[b, harm], None)
                        .with_controller(branch_controller(b, harm)),
                );
            }
            let clash = b.clash_partner();
            if b < clash {
                push(
                    CatalogEntry::branches(PatternKind::Clash, &[b, clash], None)
                        .with_controller(branch_controller(b, clash)),
                );
            }
            let broken = b.destruction_partner();
            if b < broken {
                push(CatalogEntry::branches(PatternKind::Destruction, &[b, broken], None));
            }
        }

        for (b, element) in HARMONY_ELEMENTS {
            push(CatalogEntry::branches(
                PatternKind::SixHarmony,
                &[b, b.harmony_partner()],
                Some(element),
            ));
        }

        for s in &Stem::ALL[..5] {
            let partner = s.combination_partner();
            push(CatalogEntry {
                kind: PatternKind::StemCombination,
                symbols: vec![Symbol::Stem(*s), Symbol::Stem(partner)],
                element: Some(s.combination_element()),
                controller: None,
            });
        }
        for s in &Stem::ALL[..4] {
            if let Some(partner) = s.conflict_partner() {
                let a_controls = controlling_side(s.element(), partner.element());
                push(CatalogEntry {
                    kind: PatternKind::StemConflict,
                    symbols: vec![Symbol::Stem(*s), Symbol::Stem(partner)],
                    element: None,
                    controller: a_controls
                        .map(|a| Symbol::Stem(if a { *s } else { partner })),
                });
            }
        }

        Self { entries }
    }

    pub fn entries(&self, kind: PatternKind) -> &[CatalogEntry] {
        self.entries.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Total entry count over all kinds.
    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
