//! Life-like birth/survival rules.
//!
//! A rule set maps the current generation to the next one. The
//! deterministic variant applies the classic `B/S` test to every cell; the
//! probabilistic variant additionally gates each qualifying birth or survival
//! on a percentage chance drawn from a caller-supplied random source.

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use rayon::prelude::*;

use crate::cells::Cells;
use crate::error::{Error, Result};
use crate::neighbors::count_neighbors;

/// A set of neighbor counts in `0..=8`, stored as a bitmask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct NeighborSet(u16);

impl NeighborSet {
    /// The empty set.
    pub const EMPTY: Self = Self(0);

    /// Builds a set from counts, for static tables.
    ///
    /// Panics if a count exceeds 8, which fails compilation in const context.
    pub const fn of(counts: &[u8]) -> Self {
        let mut mask = 0u16;
        let mut i = 0;
        while i < counts.len() {
            assert!(counts[i] <= 8, "neighbor count out of range");
            mask |= 1 << counts[i];
            i += 1;
        }
        Self(mask)
    }

    /// Builds a set from runtime counts, rejecting anything above 8.
    pub fn from_counts(counts: &[u8]) -> Result<Self> {
        counts.iter().try_fold(Self::EMPTY, |set, &n| {
            if n > 8 {
                Err(Error::NeighborCount(n))
            } else {
                Ok(Self(set.0 | 1 << n))
            }
        })
    }

    /// Whether `n` is in the set.
    #[inline]
    pub fn contains(self, n: u8) -> bool {
        n <= 8 && self.0 & (1 << n) != 0
    }

    /// Members in ascending order.
    pub fn counts(self) -> impl Iterator<Item = u8> {
        (0..=8u8).filter(move |&n| self.contains(n))
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for NeighborSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for n in self.counts() {
            write!(f, "{n}")?;
        }
        Ok(())
    }
}

/// Birth and survival neighbor sets plus an optional nickname.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifeRule {
    name: Option<String>,
    born: NeighborSet,
    survive: NeighborSet,
}

impl LifeRule {
    pub fn new(name: Option<&str>, born: NeighborSet, survive: NeighborSet) -> Self {
        Self {
            name: name.map(str::to_owned),
            born,
            survive,
        }
    }

    /// Next state of one cell given its current state and neighbor count.
    #[inline]
    pub fn next_state(&self, alive: bool, neighbors: u8) -> bool {
        if alive {
            self.survive.contains(neighbors)
        } else {
            self.born.contains(neighbors)
        }
    }
}

/// An immutable transform from one generation to the next.
#[derive(Debug, Clone, PartialEq)]
pub enum RuleSet {
    /// Plain `B/S` rule.
    Deterministic(LifeRule),
    /// `B/S` rule where each qualifying event only happens with the given
    /// percentage chance.
    Probabilistic {
        rule: LifeRule,
        birth_probability: f64,
        survival_probability: f64,
    },
}

fn check_probability(event: &'static str, value: f64) -> Result<f64> {
    if value.is_finite() && (0.0..=100.0).contains(&value) {
        Ok(value)
    } else {
        Err(Error::InvalidProbability { event, value })
    }
}

impl RuleSet {
    /// A deterministic rule set.
    pub fn life_like(name: Option<&str>, born: NeighborSet, survive: NeighborSet) -> Self {
        Self::Deterministic(LifeRule::new(name, born, survive))
    }

    /// A probabilistic rule set. Both probabilities are percentages and must
    /// lie in `0..=100`.
    pub fn probabilistic(
        name: Option<&str>,
        born: NeighborSet,
        survive: NeighborSet,
        birth_probability: f64,
        survival_probability: f64,
    ) -> Result<Self> {
        Ok(Self::Probabilistic {
            rule: LifeRule::new(name, born, survive),
            birth_probability: check_probability("birth", birth_probability)?,
            survival_probability: check_probability("survival", survival_probability)?,
        })
    }

    /// Conway's Life, `B3/S23`.
    pub fn life() -> Self {
        Self::life_like(Some("Life"), NeighborSet::of(&[3]), NeighborSet::of(&[2, 3]))
    }

    /// Parses `B<born>/S<survive>` notation into an unnamed deterministic rule.
    ///
    /// Parts may come in either order and either case; a part may be empty
    /// (`B2/S` is Seeds).
    pub fn parse(notation: &str) -> Result<Self> {
        let bad = || Error::Notation(notation.to_owned());
        let (first, second) = notation.trim().split_once('/').ok_or_else(bad)?;

        let mut born = None;
        let mut survive = None;
        for part in [first, second] {
            let mut chars = part.trim().chars();
            let slot = match chars.next().map(|c| c.to_ascii_uppercase()) {
                Some('B') => &mut born,
                Some('S') => &mut survive,
                _ => return Err(bad()),
            };
            if slot.is_some() {
                return Err(bad());
            }
            let counts = chars
                .map(|c| c.to_digit(10).map(|d| d as u8).ok_or_else(bad))
                .collect::<Result<Vec<u8>>>()?;
            *slot = Some(NeighborSet::from_counts(&counts)?);
        }

        match (born, survive) {
            (Some(born), Some(survive)) => Ok(Self::life_like(None, born, survive)),
            _ => Err(bad()),
        }
    }

    /// Same neighbor sets and name, gated by the given probabilities.
    pub fn with_chance(&self, birth_probability: f64, survival_probability: f64) -> Result<Self> {
        let rule = self.rule();
        Self::probabilistic(
            rule.name.as_deref(),
            rule.born,
            rule.survive,
            birth_probability,
            survival_probability,
        )
    }

    /// Same neighbor sets with a different nickname.
    pub fn renamed(&self, name: &str) -> Self {
        let mut renamed = self.clone();
        match &mut renamed {
            Self::Deterministic(rule) | Self::Probabilistic { rule, .. } => {
                rule.name = Some(name.to_owned())
            }
        }
        renamed
    }

    fn rule(&self) -> &LifeRule {
        match self {
            Self::Deterministic(rule) | Self::Probabilistic { rule, .. } => rule,
        }
    }

    /// Neighbor counts that bring a dead cell to life.
    pub fn born_on(&self) -> NeighborSet {
        self.rule().born
    }

    /// Neighbor counts that keep a live cell alive.
    pub fn survive_on(&self) -> NeighborSet {
        self.rule().survive
    }

    /// Nickname such as `"Life"`, if any.
    pub fn short_name(&self) -> Option<&str> {
        self.rule().name.as_deref()
    }

    /// `B<born>/S<survive>`.
    pub fn notation(&self) -> String {
        format!("B{}/S{}", self.born_on(), self.survive_on())
    }

    /// `"Life (B3/S23)"`, or just the notation for unnamed rules.
    pub fn display_name(&self) -> String {
        match self.short_name() {
            Some(name) => format!("{name} ({})", self.notation()),
            None => self.notation(),
        }
    }

    pub fn is_probabilistic(&self) -> bool {
        matches!(self, Self::Probabilistic { .. })
    }

    /// Writes the generation after `from` into `to`.
    ///
    /// `rng` is only consulted by the probabilistic variant, which draws one
    /// value per cell in column-major order whether or not the cell
    /// qualifies, so a fixed seed reproduces a fixed evolution.
    pub fn transform<R: Rng + ?Sized>(&self, from: &Cells, to: &mut Cells, rng: &mut R) {
        debug_assert_eq!((from.cols(), from.rows()), (to.cols(), to.rows()));
        let rows = from.rows();
        if rows == 0 {
            return;
        }

        match self {
            Self::Deterministic(rule) => {
                to.as_mut_slice()
                    .par_chunks_mut(rows)
                    .enumerate()
                    .for_each(|(x, column)| {
                        for (y, cell) in column.iter_mut().enumerate() {
                            *cell = rule.next_state(from.get(x, y), count_neighbors(from, x, y));
                        }
                    });
            }
            Self::Probabilistic {
                rule,
                birth_probability,
                survival_probability,
            } => {
                for x in 0..from.cols() {
                    for y in 0..rows {
                        let chance: f64 = rng.gen_range(0.0..100.0);
                        let alive = from.get(x, y);
                        let gate = if alive {
                            *survival_probability
                        } else {
                            *birth_probability
                        };
                        let next = rule.next_state(alive, count_neighbors(from, x, y));
                        to.set(x, y, next && chance <= gate);
                    }
                }
            }
        }
    }
}

impl fmt::Display for RuleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_name())
    }
}

impl FromStr for RuleSet {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn step(rule: &RuleSet, from: &Cells) -> Cells {
        let mut to = Cells::new(from.cols(), from.rows());
        rule.transform(from, &mut to, &mut StdRng::seed_from_u64(0));
        to
    }

    #[test]
    fn test_neighbor_set() {
        let set = NeighborSet::of(&[2, 3]);
        assert!(set.contains(2));
        assert!(set.contains(3));
        assert!(!set.contains(4));
        assert!(!set.contains(9));
        assert_eq!(set.counts().collect::<Vec<_>>(), vec![2, 3]);
        assert!(NeighborSet::EMPTY.is_empty());
    }

    #[test]
    fn test_neighbor_set_rejects_nine() {
        assert!(matches!(
            NeighborSet::from_counts(&[3, 9]),
            Err(Error::NeighborCount(9))
        ));
    }

    #[test]
    fn test_display_name() {
        assert_eq!(RuleSet::life().display_name(), "Life (B3/S23)");
        let unnamed = RuleSet::life_like(None, NeighborSet::of(&[3, 4]), NeighborSet::of(&[2, 5]));
        assert_eq!(unnamed.display_name(), "B34/S25");
        let seeds = RuleSet::life_like(Some("Seeds"), NeighborSet::of(&[2]), NeighborSet::EMPTY);
        assert_eq!(seeds.to_string(), "Seeds (B2/S)");
    }

    #[test]
    fn test_display_sorts_counts() {
        let rule = RuleSet::life_like(None, NeighborSet::of(&[6, 3]), NeighborSet::of(&[3, 2]));
        assert_eq!(rule.notation(), "B36/S23");
    }

    #[test]
    fn test_parse_notation() {
        let rule = RuleSet::parse("B36/S23").unwrap();
        assert_eq!(rule.born_on(), NeighborSet::of(&[3, 6]));
        assert_eq!(rule.survive_on(), NeighborSet::of(&[2, 3]));
        assert_eq!(rule.short_name(), None);

        let swapped: RuleSet = "s23/b3".parse().unwrap();
        assert_eq!(swapped.notation(), "B3/S23");

        let seeds = RuleSet::parse("B2/S").unwrap();
        assert!(seeds.survive_on().is_empty());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for bad in ["", "B3", "B3/S2x", "B3/B3", "X3/S23", "B39/S23", "B3/S23/"] {
            assert!(RuleSet::parse(bad).is_err(), "{bad:?} should not parse");
        }
        assert!(matches!(RuleSet::parse("B9/S23"), Err(Error::NeighborCount(9))));
    }

    #[test]
    fn test_probability_validation() {
        let born = NeighborSet::of(&[3]);
        let survive = NeighborSet::of(&[2, 3]);
        assert!(RuleSet::probabilistic(None, born, survive, 0.0, 100.0).is_ok());
        assert!(matches!(
            RuleSet::probabilistic(None, born, survive, 100.5, 50.0),
            Err(Error::InvalidProbability { event: "birth", .. })
        ));
        assert!(matches!(
            RuleSet::probabilistic(None, born, survive, 50.0, -1.0),
            Err(Error::InvalidProbability { event: "survival", .. })
        ));
        assert!(RuleSet::probabilistic(None, born, survive, f64::NAN, 50.0).is_err());
    }

    #[test]
    fn test_with_chance_keeps_name() {
        let chance = RuleSet::life().with_chance(99.0, 99.0).unwrap();
        assert!(chance.is_probabilistic());
        assert_eq!(chance.display_name(), "Life (B3/S23)");
    }

    #[test]
    fn test_block_is_stable() {
        let block = Cells::from_rows(&["....", ".OO.", ".OO.", "...."]);
        assert_eq!(step(&RuleSet::life(), &block), block);
    }

    #[test]
    fn test_blinker_oscillates() {
        let horizontal = Cells::from_rows(&[".....", ".....", ".OOO.", ".....", "....."]);
        let vertical = Cells::from_rows(&[".....", "..O..", "..O..", "..O..", "....."]);
        let life = RuleSet::life();
        assert_eq!(step(&life, &horizontal), vertical);
        assert_eq!(step(&life, &vertical), horizontal);
    }

    #[test]
    fn test_lone_cell_dies() {
        let lone = Cells::from_rows(&["...", ".O.", "..."]);
        assert_eq!(step(&RuleSet::life(), &lone).population(), 0);
    }

    #[test]
    fn test_certain_chance_matches_deterministic() {
        let from = Cells::from_rows(&[".....", ".O...", "..OO.", ".OO..", "....."]);
        let certain = RuleSet::life().with_chance(100.0, 100.0).unwrap();
        assert_eq!(step(&certain, &from), step(&RuleSet::life(), &from));
    }

    #[test]
    fn test_zero_survival_chance_kills_block() {
        let block = Cells::from_rows(&["....", ".OO.", ".OO.", "...."]);
        let never = RuleSet::life().with_chance(100.0, 0.0).unwrap();
        let mut to = Cells::new(4, 4);
        never.transform(&block, &mut to, &mut StdRng::seed_from_u64(7));
        // A draw of exactly 0.0 would survive; with this seed none does.
        assert_eq!(to.population(), 0);
    }

    #[test]
    fn test_chance_is_reproducible() {
        let mut from = Cells::new(16, 16);
        let mut rng = StdRng::seed_from_u64(42);
        for x in 0..16 {
            for y in 0..16 {
                from.set(x, y, rng.gen_bool(0.4));
            }
        }
        let rule = RuleSet::life().with_chance(60.0, 60.0).unwrap();

        let mut a = Cells::new(16, 16);
        let mut b = Cells::new(16, 16);
        rule.transform(&from, &mut a, &mut StdRng::seed_from_u64(9));
        rule.transform(&from, &mut b, &mut StdRng::seed_from_u64(9));
        assert_eq!(a, b);

        // The gate only ever removes cells the plain rule would produce.
        let plain = step(&RuleSet::life(), &from);
        for x in 0..16 {
            for y in 0..16 {
                assert!(!a.get(x, y) || plain.get(x, y));
            }
        }
    }
}
