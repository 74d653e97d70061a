//! Four-pillar qi accounting engine.
//!
//! Takes stem/branch pillars placed on a fixed chart, detects the
//! combinations and conflicts between positions in strict priority order,
//! moves qi between the positions with fixed decay and transfer formulas and
//! records every change in an append-only ledger.
//!
//! Zero I/O. Calendrical conversion and report writing live elsewhere.

pub mod analysis;
pub mod catalog;
pub mod combat;
pub mod config;
pub mod constants;
pub mod error;
pub mod ledger;
pub mod matching;
pub mod node;
pub mod pillar;
pub mod registry;
pub mod scoring;
pub mod season;
pub mod serde_compat;
pub mod symbols;

pub use analysis::{Analysis, DayMaster, NodeReport, SeasonReport, analyze};
pub use catalog::{CatalogEntry, PatternCatalog, PatternKind};
pub use config::EngineConfig;
pub use constants::{PHI, PHI_INV};
pub use error::{AnalysisError, ConfigError, InputError, RegistryError, Result};
pub use ledger::{LedgerEvent, Phase, PhaseKind, QiUnit, UnitId, UnitLedger};
pub use matching::{Availability, PatternMatch, TransformStatus, match_patterns};
pub use node::{Chart, Layer, Node, NodeId, Symbol, Tier, distance};
pub use pillar::{ChartInput, Gender, Pillar};
pub use registry::{PatternRegistry, PatternSpec, RegistryBuilder};
pub use season::{Season, SeasonalState};
pub use serde_compat::{FORMAT_VERSION, export_json, import_json};
pub use symbols::{Branch, Element, Polarity, Stem};
