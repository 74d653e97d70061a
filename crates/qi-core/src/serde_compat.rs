//! JSON wire format for analyses.
//!
//! The envelope carries a format version next to the analysis so consumers
//! can reject exports they do not understand.

use serde::{Deserialize, Serialize};

use crate::analysis::Analysis;

pub const FORMAT_VERSION: &str = "1.0";

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct WireExport {
    pub format_version: String,
    #[serde(default)]
    pub generator: String,
    pub analysis: Analysis,
}

impl WireExport {
    pub fn from_analysis(analysis: &Analysis) -> Self {
        Self {
            format_version: FORMAT_VERSION.to_string(),
            generator: format!("qi-core {}", env!("CARGO_PKG_VERSION")),
            analysis: analysis.clone(),
        }
    }
}

/// Serialize an analysis to the versioned JSON wire format.
pub fn export_json(analysis: &Analysis) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&WireExport::from_analysis(analysis))
}

/// Deserialize a JSON export back into an analysis.
pub fn import_json(json: &str) -> Result<Analysis, serde_json::Error> {
    let wire: WireExport = serde_json::from_str(json)?;
    Ok(wire.analysis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyze;
    use crate::config::EngineConfig;
    use crate::pillar::ChartInput;
    use crate::registry::PatternRegistry;

    fn make_analysis() -> Analysis {
        let registry = PatternRegistry::standard().unwrap();
        let input = ChartInput::parse_natal(["JiaZi", "GengChen", "BingYin", "WuXu"])
            .unwrap()
            .with_luck("YiHai".parse().unwrap())
            .with_talisman("RenXu".parse().unwrap());
        analyze(&registry, &EngineConfig::default(), &input).unwrap()
    }

    #[test]
    fn test_version_field() {
        let json = export_json(&make_analysis()).unwrap();
        let wire: WireExport = serde_json::from_str(&json).unwrap();
        assert_eq!(wire.format_version, FORMAT_VERSION);
        assert!(wire.generator.starts_with("qi-core"));
    }

    #[test]
    fn test_import_restores_ledger_and_matches() {
        let analysis = make_analysis();
        let restored = import_json(&export_json(&analysis).unwrap()).unwrap();
        assert_eq!(restored.matches.len(), analysis.matches.len());
        assert_eq!(restored.ledger.units().len(), analysis.ledger.units().len());
        assert_eq!(restored.day_master.stem, analysis.day_master.stem);
        for (a, b) in analysis.nodes.iter().zip(&restored.nodes) {
            assert_eq!(a.id, b.id);
            assert!((a.final_qi - b.final_qi).abs() < 1e-9);
        }
    }

    #[test]
    fn test_wire_shape() {
        let json = export_json(&make_analysis()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(value.get("formatVersion").is_some());
        let first = &value["analysis"]["nodes"][0];
        assert_eq!(first["id"]["tier"], "year");
        assert_eq!(first["symbol"]["kind"], "stem");
        assert_eq!(first["symbol"]["value"], "Jia");
        let talisman = value["analysis"]["nodes"]
            .as_array()
            .unwrap()
            .iter()
            .find(|n| n["id"]["tier"].get("talisman").is_some());
        assert!(talisman.is_some());
    }

    #[test]
    fn test_missing_generator_is_accepted() {
        let analysis = make_analysis();
        let mut value = serde_json::to_value(WireExport::from_analysis(&analysis)).unwrap();
        value.as_object_mut().unwrap().remove("generator");
        let wire: WireExport = serde_json::from_value(value).unwrap();
        assert!(wire.generator.is_empty());
    }
}
