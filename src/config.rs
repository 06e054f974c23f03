//! Command-line configuration for the terminal front end.

use std::path::PathBuf;
use std::time::Duration;

use crate::catalog::DEFAULT_RULE;
use crate::error::{Error, Result};

/// Generation rates offered by the speed control, in generations per second.
pub const SPEEDS: &[u32] = &[1, 2, 5, 10, 20];

/// Fastest accepted speed; one generation per millisecond.
pub const MAX_SPEED: u32 = 1000;

pub const USAGE: &str = "\
Usage: automata [OPTIONS]

Options:
  --cols N           grid columns (default 80)
  --rows N           grid rows (default 40)
  --speed N          generations per second, 1-1000 (default 10)
  --rule NAME        built-in rule name or B/S notation such as B36/S23 (default Life)
  --chance BP,SP     make the rule probabilistic with birth/survival percentages
  --seed N           seed the random source for reproducible runs
  --density F        initial random fill, 0-1 (default 0.3)
  --empty            start with an empty grid
  --log-file PATH    write logs to PATH (filter with RUST_LOG)
  --help             print this help";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub cols: usize,
    pub rows: usize,
    /// Generations per second while running.
    pub speed: u32,
    pub rule: String,
    /// Birth and survival percentages turning the rule probabilistic.
    pub chance: Option<(f64, f64)>,
    pub seed: Option<u64>,
    pub density: f64,
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cols: 80,
            rows: 40,
            speed: 10,
            rule: DEFAULT_RULE.to_owned(),
            chance: None,
            seed: None,
            density: 0.3,
            log_file: None,
        }
    }
}

fn usage(message: impl Into<String>) -> Error {
    Error::Usage(message.into())
}

fn parse_value<T: std::str::FromStr>(flag: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| usage(format!("invalid value {value:?} for {flag}")))
}

impl Config {
    /// Parses flags, not including the program name.
    ///
    /// `--help` comes back as [`Error::Usage`] carrying [`USAGE`].
    pub fn from_args<I, S>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut config = Self::default();
        let mut args = args.into_iter().map(Into::into);

        while let Some(flag) = args.next() {
            if flag == "--help" || flag == "-h" {
                return Err(usage(USAGE));
            }
            if flag == "--empty" {
                config.density = 0.0;
                continue;
            }

            let value = args
                .next()
                .ok_or_else(|| usage(format!("missing value for {flag}")))?;
            match flag.as_str() {
                "--cols" => config.cols = parse_value(&flag, &value)?,
                "--rows" => config.rows = parse_value(&flag, &value)?,
                "--speed" => config.speed = parse_value(&flag, &value)?,
                "--rule" => config.rule = value,
                "--chance" => {
                    let (birth, survival) = value
                        .split_once(',')
                        .ok_or_else(|| usage(format!("--chance expects BP,SP, got {value:?}")))?;
                    config.chance = Some((parse_value(&flag, birth)?, parse_value(&flag, survival)?));
                }
                "--seed" => config.seed = Some(parse_value(&flag, &value)?),
                "--density" => config.density = parse_value(&flag, &value)?,
                "--log-file" => config.log_file = Some(PathBuf::from(value)),
                _ => return Err(usage(format!("unknown option {flag}"))),
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Checks ranges that the simulation itself would reject later.
    pub fn validate(&self) -> Result<()> {
        if self.cols == 0 || self.rows == 0 {
            return Err(Error::EmptyGrid {
                cols: self.cols,
                rows: self.rows,
            });
        }
        if !(1..=MAX_SPEED).contains(&self.speed) {
            return Err(usage(format!("speed {} is outside 1-{MAX_SPEED}", self.speed)));
        }
        if !(0.0..=1.0).contains(&self.density) {
            return Err(Error::InvalidDensity(self.density));
        }
        Ok(())
    }

    /// Sleep between generations at the configured speed.
    pub fn interval(&self) -> Duration {
        interval_for(self.speed)
    }
}

/// Sleep between generations for `speed` generations per second.
pub fn interval_for(speed: u32) -> Duration {
    Duration::from_millis(1000 / u64::from(speed.clamp(1, MAX_SPEED)))
}
