//! Built-in rule sets and shapes.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::rules::{NeighborSet, RuleSet};
use crate::shapes::Shape;

pub struct RulePreset {
    pub name: Option<&'static str>,
    pub born: NeighborSet,
    pub survive: NeighborSet,
    /// Birth and survival percentages for probabilistic presets.
    pub chance: Option<(f64, f64)>,
}

const fn preset(name: &'static str, born: &[u8], survive: &[u8]) -> RulePreset {
    RulePreset {
        name: Some(name),
        born: NeighborSet::of(born),
        survive: NeighborSet::of(survive),
        chance: None,
    }
}

const fn unnamed(born: &[u8], survive: &[u8]) -> RulePreset {
    RulePreset {
        name: None,
        born: NeighborSet::of(born),
        survive: NeighborSet::of(survive),
        chance: None,
    }
}

pub const RULE_PRESETS: &[RulePreset] = &[
    preset("Life", &[3], &[2, 3]),
    preset("Amoeba", &[3, 5, 7], &[1, 3, 5, 8]),
    preset("Assimilation", &[3, 4, 5], &[4, 5, 6, 7]),
    preset("Bacteria", &[3, 4], &[4, 5, 6]),
    preset("Blinkers", &[3, 4, 5], &[2]),
    preset("Blossom", &[2, 3], &[2, 3]),
    preset("Bugs", &[3, 5, 6, 7], &[1, 5, 6, 7, 8]),
    preset("Coagulations", &[3, 7, 8], &[2, 3, 5, 6, 7, 8]),
    preset("Coral", &[3], &[4, 5, 6, 7, 8]),
    preset("Day & Night", &[3, 6, 7, 8], &[3, 4, 6, 7, 8]),
    preset("Diamoeba", &[3, 5, 6, 7, 8], &[5, 6, 7, 8]),
    preset("Gnarl", &[1], &[1]),
    preset("H-trees", &[1], &[0, 1, 2, 3, 4, 5, 6, 7, 8]),
    preset("HighLife", &[3, 6], &[2, 3]),
    preset("Holstein", &[3, 5, 6, 7, 8], &[4, 6, 7, 8]),
    preset("Iceballs", &[2, 5, 6, 7, 8], &[5, 6, 7, 8]),
    preset("Land Rush", &[3, 6], &[2, 3, 4, 5, 7, 8]),
    preset("Life Without Death", &[3], &[0, 1, 2, 3, 4, 5, 6, 7, 8]),
    preset("LongLife", &[3, 4, 5], &[5]),
    preset("Majority", &[4, 5, 6, 7, 8], &[5, 6, 7, 8]),
    preset("Maze", &[3], &[1, 2, 3, 4, 5]),
    preset("Move", &[3, 6, 8], &[2, 4, 5]),
    preset("Pseudo Life", &[3, 5, 7], &[2, 3, 8]),
    preset("Replicator", &[1, 3, 5, 7], &[1, 3, 5, 7]),
    preset("Seeds", &[2], &[]),
    preset("Serviettes", &[2, 3, 4], &[]),
    unnamed(&[2, 4, 8], &[2, 4, 8]),
    unnamed(&[3, 4, 5], &[2, 4, 5]),
    unnamed(&[3, 4], &[2, 5]),
    unnamed(&[3, 5], &[2, 4]),
    RulePreset {
        name: Some("Randomized Life"),
        born: NeighborSet::of(&[3]),
        survive: NeighborSet::of(&[2, 3]),
        chance: Some((99.0, 99.0)),
    },
];

pub struct ShapePreset {
    pub name: &'static str,
    pub rows: &'static [&'static str],
}

pub const SHAPE_PRESETS: &[ShapePreset] = &[
    ShapePreset {
        name: "The Glider",
        rows: &["OOO", "..O", ".O."],
    },
    ShapePreset {
        name: "Fountain",
        rows: &[
            "OO...OO",
            "O.O.O.O",
            "O.O.O.O",
            "..O.O..",
            ".OO.OO.",
            ".OO.OO.",
        ],
    },
    ShapePreset {
        name: "The Coe Ship",
        rows: &[
            ".O....OOO",
            "OOO..O..O",
            "O.OO....O",
            ".OOOO...O",
            ".OO.....O",
            ".....O..O",
            "......OO.",
            ".......O.",
            "......O..",
            "......O..",
        ],
    },
    ShapePreset {
        name: "Lightweight Spaceship",
        rows: &[".O..O", "O....", "O...O", "OOOO."],
    },
];

/// Short name of the rule a fresh session starts with.
pub const DEFAULT_RULE: &str = "Life";

impl RulePreset {
    pub fn build(&self) -> Result<RuleSet> {
        match self.chance {
            Some((birth, survival)) => {
                RuleSet::probabilistic(self.name, self.born, self.survive, birth, survival)
            }
            None => Ok(RuleSet::life_like(self.name, self.born, self.survive)),
        }
    }
}

/// Named rule sets and shapes, sorted by display name.
#[derive(Debug, Clone)]
pub struct Catalog {
    rules: BTreeMap<String, Arc<RuleSet>>,
    shapes: BTreeMap<String, Arc<Shape>>,
}

impl Catalog {
    /// Builds the catalog from the static preset tables.
    pub fn builtin() -> Result<Self> {
        let rules: BTreeMap<String, Arc<RuleSet>> = RULE_PRESETS
            .iter()
            .map(|p| p.build().map(|rs| (rs.display_name(), Arc::new(rs))))
            .collect::<Result<_>>()?;
        let shapes: BTreeMap<String, Arc<Shape>> = SHAPE_PRESETS
            .iter()
            .map(|p| Shape::from_rows(p.name, p.rows).map(|s| (p.name.to_owned(), Arc::new(s))))
            .collect::<Result<_>>()?;
        Ok(Self { rules, shapes })
    }

    /// Looks up a rule by display name (`"Life (B3/S23)"`) or short name
    /// (`"life"`), ignoring case.
    pub fn rule(&self, name: &str) -> Result<Arc<RuleSet>> {
        let wanted = name.trim();
        self.rules
            .iter()
            .find(|(display, rs)| {
                display.eq_ignore_ascii_case(wanted)
                    || rs.short_name().is_some_and(|n| n.eq_ignore_ascii_case(wanted))
            })
            .map(|(_, rs)| Arc::clone(rs))
            .ok_or_else(|| Error::UnknownRuleSet(name.to_owned()))
    }

    /// Resolves a catalog name, falling back to `B/S` notation.
    pub fn resolve_rule(&self, name: &str) -> Result<Arc<RuleSet>> {
        match self.rule(name) {
            Ok(rs) => Ok(rs),
            Err(unknown) => match RuleSet::parse(name) {
                Ok(rs) => Ok(Arc::new(rs)),
                Err(_) => Err(unknown),
            },
        }
    }

    /// The rule a fresh session starts with.
    pub fn default_rule(&self) -> Result<Arc<RuleSet>> {
        self.rule(DEFAULT_RULE)
    }

    /// All rule sets in display-name order.
    pub fn rules(&self) -> impl Iterator<Item = &Arc<RuleSet>> {
        self.rules.values()
    }

    pub fn shape(&self, name: &str) -> Result<Arc<Shape>> {
        self.shapes
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name.trim()))
            .map(|(_, s)| Arc::clone(s))
            .ok_or_else(|| Error::UnknownShape(name.to_owned()))
    }

    /// All shapes in name order.
    pub fn shapes(&self) -> impl Iterator<Item = &Arc<Shape>> {
        self.shapes.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_builds() {
        let catalog = Catalog::builtin().unwrap();
        assert_eq!(catalog.rules().count(), RULE_PRESETS.len());
        assert_eq!(catalog.shapes().count(), SHAPE_PRESETS.len());
    }

    #[test]
    fn test_lookup_by_short_and_display_name() {
        let catalog = Catalog::builtin().unwrap();
        let life = catalog.rule("life").unwrap();
        assert_eq!(life.display_name(), "Life (B3/S23)");
        assert_eq!(catalog.rule("Life (B3/S23)").unwrap(), life);
        assert_eq!(catalog.default_rule().unwrap(), life);
        assert_eq!(catalog.rule("B34/S25").unwrap().short_name(), None);
        assert!(matches!(catalog.rule("nope"), Err(Error::UnknownRuleSet(_))));
    }

    #[test]
    fn test_resolve_falls_back_to_notation() {
        let catalog = Catalog::builtin().unwrap();
        assert_eq!(catalog.resolve_rule("B36/S23").unwrap().notation(), "B36/S23");
        assert_eq!(catalog.resolve_rule("highlife").unwrap().short_name(), Some("HighLife"));
        assert!(matches!(catalog.resolve_rule("bogus"), Err(Error::UnknownRuleSet(_))));
    }

    #[test]
    fn test_randomized_life_is_probabilistic() {
        let catalog = Catalog::builtin().unwrap();
        let rs = catalog.rule("Randomized Life").unwrap();
        assert!(rs.is_probabilistic());
        assert!(!catalog.rule("Life").unwrap().is_probabilistic());
    }

    #[test]
    fn test_rules_sorted_by_display_name() {
        let catalog = Catalog::builtin().unwrap();
        let names: Vec<String> = catalog.rules().map(|r| r.display_name()).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }

    #[test]
    fn test_shapes() {
        let catalog = Catalog::builtin().unwrap();
        let glider = catalog.shape("the glider").unwrap();
        assert_eq!((glider.width(), glider.height()), (3, 3));
        let lwss = catalog.shape("Lightweight Spaceship").unwrap();
        assert_eq!((lwss.width(), lwss.height()), (5, 4));
        assert_eq!(lwss.live_cells().count(), 9);
        let coe = catalog.shape("The Coe Ship").unwrap();
        assert_eq!((coe.width(), coe.height()), (9, 10));
        assert!(matches!(catalog.shape("Gun"), Err(Error::UnknownShape(_))));
    }
}
