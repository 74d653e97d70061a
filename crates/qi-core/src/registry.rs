//! Declarative pattern registry.
//!
//! Each pattern category is described by an immutable [`PatternSpec`]. Specs
//! declare which other specs they must be evaluated after (`depends_on`) and
//! which specs claim mutually exclusive outcomes for the same nodes
//! (`contradicts`). [`RegistryBuilder::build`] validates the whole set once:
//! the dependency graph must be acyclic and every contradiction must be
//! resolved by an ordering between the two sides. The evaluation order is
//! the topological order of the dependency graph, ties broken by
//! registration order.

use std::collections::{BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::catalog::{PatternCatalog, PatternKind};
use crate::error::RegistryError;
use crate::node::Layer;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeFilter {
    pub layer: Layer,
    pub arity: usize,
}

/// Where participants may sit relative to each other.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", content = "value", rename_all = "snake_case")]
pub enum SpatialRule {
    Any,
    AdjacentOnly,
    MaxDistance(u32),
}

/// Which chart tiers may take part.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemporalRule {
    Any,
    /// At least one participant is a natal node.
    RequiresNatal,
    /// Every participant is a natal node.
    NatalOnly,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformRule {
    /// Transforms when the target element is present among the chart's stems.
    Full,
    /// Never transforms fully.
    PartialOnly,
    Never,
}

/// Which formula settles the qi effect of a match.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectRule {
    /// Participants gain the settled score.
    Combination,
    /// Victim and controller lose their score shares.
    Conflict,
    /// Amplified combat transfer between controller and victim.
    Combat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifeDomain {
    Career,
    Wealth,
    Health,
    Relationships,
    Family,
    Travel,
    Learning,
    Legal,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PatternSpec {
    pub id: String,
    pub kind: PatternKind,
    pub filter: NodeFilter,
    pub spatial: SpatialRule,
    pub temporal: TemporalRule,
    pub transform: TransformRule,
    pub effect: EffectRule,
    pub base_score: f64,
    pub depends_on: Vec<String>,
    pub contradicts: Vec<String>,
    pub domains: Vec<LifeDomain>,
}

impl PatternSpec {
    /// Spec with the standard rules for `kind`.
    pub fn for_kind(id: impl Into<String>, kind: PatternKind) -> Self {
        use PatternKind as K;

        let (layer, arity) = match kind {
            K::ThreeMeeting | K::BullyingPunishment | K::RudenessPunishment | K::ThreeCombination => {
                (Layer::Branch, 3)
            }
            K::StemCombination | K::StemConflict => (Layer::Stem, 2),
            _ => (Layer::Branch, 2),
        };
        let spatial = match kind {
            K::Destruction => SpatialRule::AdjacentOnly,
            _ => SpatialRule::Any,
        };
        let temporal = match kind {
            K::ArchedCombination => TemporalRule::NatalOnly,
            _ => TemporalRule::Any,
        };
        let transform = match kind {
            K::ThreeMeeting | K::ThreeCombination | K::SixHarmony | K::StemCombination => {
                TransformRule::Full
            }
            K::HalfMeeting | K::HalfCombination | K::ArchedCombination => {
                TransformRule::PartialOnly
            }
            _ => TransformRule::Never,
        };
        let effect = match kind {
            K::Clash | K::Harm => EffectRule::Combat,
            k if k.is_combination() => EffectRule::Combination,
            _ => EffectRule::Conflict,
        };
        let base_score = match kind {
            K::ThreeMeeting => 35.0,
            K::BullyingPunishment | K::RudenessPunishment => 30.0,
            K::PairPunishment => 20.0,
            K::SelfPunishment => 15.0,
            K::Harm => 20.0,
            K::Clash => 30.0,
            K::Destruction => 15.0,
            K::ThreeCombination => 30.0,
            K::SixHarmony => 25.0,
            K::HalfMeeting => 18.0,
            K::HalfCombination => 15.0,
            K::ArchedCombination => 10.0,
            K::StemCombination => 30.0,
            K::StemConflict => 35.0,
        };
        let domains = match kind {
            K::ThreeMeeting | K::ThreeCombination => vec![LifeDomain::Career, LifeDomain::Wealth],
            K::BullyingPunishment | K::RudenessPunishment | K::PairPunishment => {
                vec![LifeDomain::Legal, LifeDomain::Health]
            }
            K::SelfPunishment => vec![LifeDomain::Health],
            K::Harm => vec![LifeDomain::Relationships, LifeDomain::Health],
            K::Clash => vec![LifeDomain::Travel, LifeDomain::Relationships],
            K::Destruction => vec![LifeDomain::Family],
            K::SixHarmony | K::StemCombination => vec![LifeDomain::Relationships],
            K::HalfMeeting | K::HalfCombination | K::ArchedCombination => {
                vec![LifeDomain::Learning]
            }
            K::StemConflict => vec![LifeDomain::Career],
        };

        Self {
            id: id.into(),
            kind,
            filter: NodeFilter { layer, arity },
            spatial,
            temporal,
            transform,
            effect,
            base_score,
            depends_on: Vec::new(),
            contradicts: Vec::new(),
            domains,
        }
    }

    pub fn depends_on(mut self, id: impl Into<String>) -> Self {
        self.depends_on.push(id.into());
        self
    }

    pub fn contradicts(mut self, id: impl Into<String>) -> Self {
        self.contradicts.push(id.into());
        self
    }

    pub fn with_spatial(mut self, rule: SpatialRule) -> Self {
        self.spatial = rule;
        self
    }

    pub fn with_temporal(mut self, rule: TemporalRule) -> Self {
        self.temporal = rule;
        self
    }
}

/// Validated, immutable set of pattern specs plus the derived catalog.
/// Built once and shared by reference across analyses.
#[derive(Clone, Debug)]
pub struct PatternRegistry {
    specs: Vec<PatternSpec>,
    index: HashMap<String, usize>,
    catalog: PatternCatalog,
}

impl PatternRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// The standard fifteen categories. Branch kinds are chained so that each
    /// depends on the previous priority; the stem lane is a separate chain.
    pub fn standard() -> Result<Self, RegistryError> {
        use PatternKind as K;

        let mut builder = Self::builder();
        let mut previous: Option<&'static str> = None;
        for kind in K::ALL.iter().copied().filter(|k| !k.is_stem_level()) {
            let mut spec = PatternSpec::for_kind(kind.as_str(), kind);
            if let Some(prev) = previous {
                spec = spec.depends_on(prev);
            }
            spec = match kind {
                K::HalfMeeting => spec.contradicts(K::ThreeMeeting.as_str()),
                K::HalfCombination => spec.contradicts(K::ThreeCombination.as_str()),
                K::ArchedCombination => spec.contradicts(K::HalfCombination.as_str()),
                K::SixHarmony => spec.contradicts(K::Clash.as_str()),
                _ => spec,
            };
            builder = builder.register(spec);
            previous = Some(kind.as_str());
        }

        builder
            .register(PatternSpec::for_kind(
                K::StemCombination.as_str(),
                K::StemCombination,
            ))
            .register(
                PatternSpec::for_kind(K::StemConflict.as_str(), K::StemConflict)
                    .depends_on(K::StemCombination.as_str())
                    .contradicts(K::StemCombination.as_str()),
            )
            .build()
    }

    /// Specs in evaluation order.
    pub fn order(&self) -> &[PatternSpec] {
        &self.specs
    }

    pub fn get(&self, id: &str) -> Option<&PatternSpec> {
        self.index.get(id).map(|&i| &self.specs[i])
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn catalog(&self) -> &PatternCatalog {
        &self.catalog
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

#[derive(Clone, Debug, Default)]
pub struct RegistryBuilder {
    specs: Vec<PatternSpec>,
}

impl RegistryBuilder {
    pub fn register(mut self, spec: PatternSpec) -> Self {
        self.specs.push(spec);
        self
    }

    /// Validate and freeze. Fails on duplicates, unknown references,
    /// dependency cycles and unresolved contradictions.
    pub fn build(self) -> Result<PatternRegistry, RegistryError> {
        let specs = self.specs;

        let mut by_id: HashMap<&str, usize> = HashMap::new();
        for (i, spec) in specs.iter().enumerate() {
            if spec.filter.arity == 0 {
                return Err(RegistryError::EmptyFilter(spec.id.clone()));
            }
            if by_id.insert(spec.id.as_str(), i).is_some() {
                return Err(RegistryError::DuplicateSpec(spec.id.clone()));
            }
        }

        // deps[i] = registration indices spec i must come after
        let mut deps: Vec<Vec<usize>> = Vec::with_capacity(specs.len());
        for spec in &specs {
            let mut d = Vec::with_capacity(spec.depends_on.len());
            for dep in &spec.depends_on {
                let j = *by_id.get(dep.as_str()).ok_or_else(|| {
                    RegistryError::UnknownDependency {
                        spec: spec.id.clone(),
                        missing: dep.clone(),
                    }
                })?;
                d.push(j);
            }
            deps.push(d);
        }

        let order = topological_order(&deps).map_err(|members| RegistryError::DependencyCycle {
            members: members.iter().map(|&i| specs[i].id.clone()).collect(),
        })?;

        let mut checked: HashSet<(usize, usize)> = HashSet::new();
        for (i, spec) in specs.iter().enumerate() {
            for other in &spec.contradicts {
                let j = *by_id.get(other.as_str()).ok_or_else(|| {
                    RegistryError::UnknownContradiction {
                        spec: spec.id.clone(),
                        missing: other.clone(),
                    }
                })?;
                let key = (i.min(j), i.max(j));
                if !checked.insert(key) {
                    continue;
                }
                if i == j || !(reaches(&deps, i, j) || reaches(&deps, j, i)) {
                    return Err(RegistryError::UnresolvedContradiction {
                        a: spec.id.clone(),
                        b: other.clone(),
                    });
                }
            }
        }

        let mut slots: Vec<Option<PatternSpec>> = specs.into_iter().map(Some).collect();
        let ordered: Vec<PatternSpec> = order.iter().filter_map(|&i| slots[i].take()).collect();
        let index = ordered
            .iter()
            .enumerate()
            .map(|(pos, s)| (s.id.clone(), pos))
            .collect();

        tracing::debug!(specs = ordered.len(), "pattern registry validated");

        Ok(PatternRegistry {
            specs: ordered,
            index,
            catalog: PatternCatalog::build(),
        })
    }
}

/// Kahn's algorithm over `deps`. Ready nodes leave in registration order.
/// On a cycle returns the members of one cycle.
fn topological_order(deps: &[Vec<usize>]) -> Result<Vec<usize>, Vec<usize>> {
    let n = deps.len();
    let mut in_degree: Vec<usize> = deps.iter().map(Vec::len).collect();
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];
    for (i, d) in deps.iter().enumerate() {
        for &j in d {
            dependents[j].push(i);
        }
    }

    let mut ready: BTreeSet<usize> = (0..n).filter(|&i| in_degree[i] == 0).collect();
    let mut order = Vec::with_capacity(n);
    while let Some(first) = ready.pop_first() {
        order.push(first);
        for &dep in &dependents[first] {
            in_degree[dep] -= 1;
            if in_degree[dep] == 0 {
                ready.insert(dep);
            }
        }
    }

    if order.len() == n {
        return Ok(order);
    }

    // Every leftover node still has an unprocessed dependency, so walking
    // leftover dependencies must revisit a node.
    let placed: HashSet<usize> = order.iter().copied().collect();
    let Some(start) = (0..n).find(|i| !placed.contains(i)) else {
        return Err(Vec::new());
    };
    let mut path = vec![start];
    let mut current = start;
    loop {
        let Some(&next) = deps[current].iter().find(|j| !placed.contains(j)) else {
            return Err(path);
        };
        if let Some(pos) = path.iter().position(|&p| p == next) {
            let mut cycle = path.split_off(pos);
            cycle.push(next);
            return Err(cycle);
        }
        path.push(next);
        current = next;
    }
}

/// True if `from` depends on `to`, directly or transitively.
fn reaches(deps: &[Vec<usize>], from: usize, to: usize) -> bool {
    let mut stack = vec![from];
    let mut seen = HashSet::new();
    while let Some(i) = stack.pop() {
        for &j in &deps[i] {
            if j == to {
                return true;
            }
            if seen.insert(j) {
                stack.push(j);
            }
        }
    }
    false
}
