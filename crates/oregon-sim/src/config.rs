//! Simulator settings read from the environment.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} must be {expected}, got {value:?}")]
    Invalid {
        name: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("SIM_PLAYERS must be between 2 and 4, got {0}")]
    PlayerCount(usize),
}

/// Which policy seats are filled with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyKind {
    Random,
    Greedy,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimConfig {
    /// Number of games to play
    pub games: usize,
    pub players: usize,
    /// Seed of the first game; game `i` uses `seed + i`
    pub seed: u64,
    /// Stop a game that has not ended after this many actions
    pub max_actions: usize,
    pub omens: bool,
    pub policy: PolicyKind,
    /// Where to write end-of-game snapshots, if anywhere
    pub snapshot_dir: Option<PathBuf>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            games: 10,
            players: 4,
            seed: 1,
            max_actions: 20_000,
            omens: true,
            policy: PolicyKind::Greedy,
            snapshot_dir: None,
        }
    }
}

fn parse<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    expected: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(name) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value, expected }),
    }
}

fn parse_bool(lookup: &impl Fn(&str) -> Option<String>, name: &'static str, default: bool) -> Result<bool, ConfigError> {
    match lookup(name).as_deref().map(str::trim) {
        None => Ok(default),
        Some("1" | "true" | "yes" | "on") => Ok(true),
        Some("0" | "false" | "no" | "off") => Ok(false),
        Some(other) => Err(ConfigError::Invalid {
            name,
            value: other.to_string(),
            expected: "a boolean",
        }),
    }
}

impl SimConfig {
    /// Read `SIM_*` variables, falling back to defaults for unset ones
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let players = parse(&lookup, "SIM_PLAYERS", "a number", defaults.players)?;
        if !(2..=4).contains(&players) {
            return Err(ConfigError::PlayerCount(players));
        }

        let policy = match lookup("SIM_POLICY").as_deref().map(str::trim) {
            None | Some("greedy") => PolicyKind::Greedy,
            Some("random") => PolicyKind::Random,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: "SIM_POLICY",
                    value: other.to_string(),
                    expected: "\"random\" or \"greedy\"",
                })
            }
        };

        Ok(Self {
            games: parse(&lookup, "SIM_GAMES", "a number", defaults.games)?,
            players,
            seed: parse(&lookup, "SIM_SEED", "a number", defaults.seed)?,
            max_actions: parse(&lookup, "SIM_MAX_ACTIONS", "a number", defaults.max_actions)?,
            omens: parse_bool(&lookup, "SIM_OMENS", defaults.omens)?,
            policy,
            snapshot_dir: lookup("SIM_SNAPSHOT_DIR")
                .filter(|dir| !dir.trim().is_empty())
                .map(PathBuf::from),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        assert_eq!(SimConfig::from_lookup(lookup(&[])).unwrap(), SimConfig::default());
    }

    #[test]
    fn test_reads_overrides() {
        let config = SimConfig::from_lookup(lookup(&[
            ("SIM_GAMES", "3"),
            ("SIM_PLAYERS", "2"),
            ("SIM_SEED", "99"),
            ("SIM_OMENS", "off"),
            ("SIM_POLICY", "random"),
            ("SIM_SNAPSHOT_DIR", "/tmp/oregon"),
        ]))
        .unwrap();

        assert_eq!(config.games, 3);
        assert_eq!(config.players, 2);
        assert_eq!(config.seed, 99);
        assert!(!config.omens);
        assert_eq!(config.policy, PolicyKind::Random);
        assert_eq!(config.snapshot_dir, Some(PathBuf::from("/tmp/oregon")));
    }

    #[test]
    fn test_rejects_bad_values() {
        assert_eq!(
            SimConfig::from_lookup(lookup(&[("SIM_PLAYERS", "6")])).unwrap_err(),
            ConfigError::PlayerCount(6)
        );
        assert!(matches!(
            SimConfig::from_lookup(lookup(&[("SIM_GAMES", "lots")])),
            Err(ConfigError::Invalid { name: "SIM_GAMES", .. })
        ));
        assert!(SimConfig::from_lookup(lookup(&[("SIM_OMENS", "maybe")])).is_err());
        assert!(SimConfig::from_lookup(lookup(&[("SIM_POLICY", "clever")])).is_err());
    }
}
