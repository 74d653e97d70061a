use thiserror::Error;

/// Raised once, while a [`crate::registry::PatternRegistry`] is being built.
/// A registry that fails validation is never handed out.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("pattern spec '{0}' registered twice")]
    DuplicateSpec(String),

    #[error("pattern spec '{spec}' depends on unknown spec '{missing}'")]
    UnknownDependency { spec: String, missing: String },

    #[error("pattern spec '{spec}' contradicts unknown spec '{missing}'")]
    UnknownContradiction { spec: String, missing: String },

    #[error("dependency cycle between pattern specs: {}", members.join(" -> "))]
    DependencyCycle { members: Vec<String> },

    #[error("pattern specs '{a}' and '{b}' contradict each other and neither is ordered before the other")]
    UnresolvedContradiction { a: String, b: String },

    #[error("pattern spec '{0}' has an empty node filter")]
    EmptyFilter(String),
}

/// Rejected chart input. No partial analysis is produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("unknown stem symbol '{0}'")]
    UnknownStem(String),

    #[error("unknown branch symbol '{0}'")]
    UnknownBranch(String),

    #[error("malformed pillar '{0}': expected a stem followed by a branch")]
    MalformedPillar(String),

    #[error("pillar {stem}{branch} is not part of the sexagenary cycle (polarity mismatch)")]
    NotSexagenary { stem: String, branch: String },

    #[error("unknown gender '{0}': expected male or female")]
    UnknownGender(String),

    #[error("too many talisman pillars: {given} given, at most {max} allowed")]
    TooManyTalismans { given: usize, max: usize },
}

/// Invalid engine configuration values.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("base_qi must be positive and finite, got {0}")]
    BaseQi(f64),

    #[error("partial_ratio must be within [0, 1], got {0}")]
    PartialRatio(f64),

    #[error("max_talismans must be at most 256, got {0}")]
    MaxTalismans(usize),
}

/// Anything an analysis request can fail with.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
