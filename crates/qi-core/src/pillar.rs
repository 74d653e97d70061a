//! Pillars and chart input.
//!
//! A pillar is a (stem, branch) pair from the sixty-pair cycle. Pillar strings
//! are accepted as glyph pairs (`甲子`) or romanised pairs (`JiaZi`, `jia-zi`,
//! `Jia Zi`).

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::InputError;
use crate::symbols::{Branch, Stem};

static ROMANISED_PILLAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(jia|yi|bing|ding|wu|ji|geng|xin|ren|gui)[\s\-_/]*(zi|chou|yin|mao|chen|si|wu|wei|shen|you|xu|hai)$",
    )
    .unwrap()
});

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pillar {
    pub stem: Stem,
    pub branch: Branch,
}

impl Pillar {
    /// Build a pillar, rejecting pairs outside the sexagenary cycle.
    pub fn new(stem: Stem, branch: Branch) -> Result<Self, InputError> {
        if stem.polarity() != branch.polarity() {
            return Err(InputError::NotSexagenary {
                stem: stem.to_string(),
                branch: branch.to_string(),
            });
        }
        Ok(Self { stem, branch })
    }

    /// Position in the sixty-pillar cycle, Jia-Zi = 0.
    pub fn cycle_index(&self) -> usize {
        let s = self.stem.index();
        let b = self.branch.index();
        // unique n in 0..60 with n % 10 == s and n % 12 == b
        (0..6)
            .map(|k| s + 10 * k)
            .find(|n| n % 12 == b)
            .unwrap_or(0)
    }

    pub fn glyphs(&self) -> String {
        format!("{}{}", self.stem.glyph(), self.branch.glyph())
    }
}

impl fmt::Display for Pillar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.stem, self.branch)
    }
}

impl FromStr for Pillar {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let chars: Vec<char> = trimmed.chars().collect();
        if chars.len() == 2 && !chars[0].is_ascii() {
            let stem: Stem = chars[0].to_string().parse()?;
            let branch: Branch = chars[1].to_string().parse()?;
            return Self::new(stem, branch);
        }

        let caps = ROMANISED_PILLAR
            .captures(trimmed)
            .ok_or_else(|| InputError::MalformedPillar(s.to_string()))?;
        let stem: Stem = caps[1].parse()?;
        let branch: Branch = caps[2].parse()?;
        Self::new(stem, branch)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    #[default]
    Male,
    Female,
}

impl FromStr for Gender {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "m" | "male" => Ok(Self::Male),
            "f" | "female" => Ok(Self::Female),
            _ => Err(InputError::UnknownGender(s.to_string())),
        }
    }
}

/// Everything one analysis needs. Produced by the calendrical layer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChartInput {
    /// Year, month, day, hour.
    pub natal: [Pillar; 4],
    #[serde(default)]
    pub luck: Option<Pillar>,
    #[serde(default)]
    pub annual: Option<Pillar>,
    #[serde(default)]
    pub monthly: Option<Pillar>,
    #[serde(default)]
    pub daily: Option<Pillar>,
    #[serde(default)]
    pub hourly: Option<Pillar>,
    #[serde(default)]
    pub talismans: Vec<Pillar>,
    #[serde(default)]
    pub gender: Gender,
    /// Reference month for seasonal lookups.
    #[serde(default)]
    pub month_branch: Option<Branch>,
}

impl ChartInput {
    pub fn natal(year: Pillar, month: Pillar, day: Pillar, hour: Pillar) -> Self {
        Self {
            natal: [year, month, day, hour],
            luck: None,
            annual: None,
            monthly: None,
            daily: None,
            hourly: None,
            talismans: Vec::new(),
            gender: Gender::default(),
            month_branch: None,
        }
    }

    /// Parse four natal pillar strings.
    pub fn parse_natal(pillars: [&str; 4]) -> Result<Self, InputError> {
        let [y, m, d, h] = pillars;
        Ok(Self::natal(y.parse()?, m.parse()?, d.parse()?, h.parse()?))
    }

    pub fn with_luck(mut self, p: Pillar) -> Self {
        self.luck = Some(p);
        self
    }

    pub fn with_annual(mut self, p: Pillar) -> Self {
        self.annual = Some(p);
        self
    }

    pub fn with_monthly(mut self, p: Pillar) -> Self {
        self.monthly = Some(p);
        self
    }

    pub fn with_daily(mut self, p: Pillar) -> Self {
        self.daily = Some(p);
        self
    }

    pub fn with_hourly(mut self, p: Pillar) -> Self {
        self.hourly = Some(p);
        self
    }

    pub fn with_talisman(mut self, p: Pillar) -> Self {
        self.talismans.push(p);
        self
    }

    pub fn with_month_branch(mut self, b: Branch) -> Self {
        self.month_branch = Some(b);
        self
    }

    pub fn with_gender(mut self, g: Gender) -> Self {
        self.gender = g;
        self
    }

    pub fn day_master(&self) -> Stem {
        self.natal[2].stem
    }

    pub fn pillar_count(&self) -> usize {
        4 + [self.luck, self.annual, self.monthly, self.daily, self.hourly]
            .iter()
            .filter(|p| p.is_some())
            .count()
            + self.talismans.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(s: &str) -> Pillar {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_forms() {
        let expected = Pillar::new(Stem::Jia, Branch::Zi).unwrap();
        assert_eq!(p("甲子"), expected);
        assert_eq!(p("JiaZi"), expected);
        assert_eq!(p("jia-zi"), expected);
        assert_eq!(p(" Jia Zi "), expected);
        assert_eq!(p("jia_zi"), expected);
    }

    #[test]
    fn test_parse_ambiguous_prefixes() {
        assert_eq!(p("JiYou"), Pillar::new(Stem::Ji, Branch::You).unwrap());
        assert_eq!(p("YiHai"), Pillar::new(Stem::Yi, Branch::Hai).unwrap());
        assert_eq!(p("WuWu"), Pillar::new(Stem::Wu, Branch::Wu).unwrap());
        assert_eq!(p("GengYin"), Pillar::new(Stem::Geng, Branch::Yin).unwrap());
    }

    #[test]
    fn test_rejects_unknown_and_malformed() {
        assert!(matches!(
            "FooBar".parse::<Pillar>(),
            Err(InputError::MalformedPillar(_))
        ));
        assert!(matches!(
            "甲X".parse::<Pillar>(),
            Err(InputError::UnknownBranch(_))
        ));
        assert!(matches!(
            "子甲".parse::<Pillar>(),
            Err(InputError::UnknownStem(_))
        ));
        assert!(matches!("".parse::<Pillar>(), Err(InputError::MalformedPillar(_))));
    }

    #[test]
    fn test_rejects_polarity_mismatch() {
        assert!(matches!(
            "JiaChou".parse::<Pillar>(),
            Err(InputError::NotSexagenary { .. })
        ));
    }

    #[test]
    fn test_glyphs_roundtrip() {
        assert_eq!(p("GengChen").glyphs(), "庚辰");
        assert_eq!(p(&p("GuiHai").glyphs()), p("GuiHai"));
    }

    #[test]
    fn test_cycle_index() {
        assert_eq!(p("JiaZi").cycle_index(), 0);
        assert_eq!(p("YiChou").cycle_index(), 1);
        assert_eq!(p("JiaXu").cycle_index(), 10);
        assert_eq!(p("GuiHai").cycle_index(), 59);
    }

    #[test]
    fn test_pillar_count() {
        let chart = ChartInput::parse_natal(["JiaZi", "BingYin", "WuChen", "GengShen"])
            .unwrap()
            .with_luck(p("DingMao"))
            .with_talisman(p("RenXu"));
        assert_eq!(chart.pillar_count(), 6);
        assert_eq!(chart.day_master(), Stem::Wu);
    }
}
