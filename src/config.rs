//! Layered configuration: defaults, then an optional TOML file, then
//! `REWARDS_` environment variables (`REWARDS_POLICY__DRAW_LIMIT` sets
//! `policy.draw_limit`).

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::engine::RewardsPolicy;

/// CSV files used to seed the catalog and the token pools at startup.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SeedConfig {
    /// `name,cost` rows
    pub prizes: Option<PathBuf>,
    /// `token` rows for the redemption code pool
    pub codes: Option<PathBuf>,
    /// `token` rows for the draw ticket pool
    pub tickets: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Where to dump the redemption ledger after a run.
    pub redemptions: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default filter directive; `RUST_LOG` takes precedence.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub policy: RewardsPolicy,
    pub seed: SeedConfig,
    pub output: OutputConfig,
    pub log: LogConfig,
}

impl AppConfig {
    /// Looked up in the working directory when no path is given.
    pub const DEFAULT_FILE: &'static str = "rewards.toml";

    /// Load configuration. An explicit `path` must exist; the default file is
    /// optional.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with(path, Self::environment())
    }

    fn environment() -> Environment {
        Environment::with_prefix("REWARDS")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
    }

    fn load_with(path: Option<&Path>, env: Environment) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::from(Path::new(Self::DEFAULT_FILE)).required(false),
        };

        Config::builder()
            .add_source(file)
            .add_source(env)
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;
    use crate::engine::ExchangeCost;

    fn write_toml(content: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn defaults_match_reward_rules() {
        let config = AppConfig::default();
        assert_eq!(config.policy.draw_limit, 50_000);
        assert_eq!(config.policy.coins_per_point, 100);
        assert_eq!(config.log.format, LogFormat::Pretty);
        assert!(config.seed.prizes.is_none());
    }

    #[test]
    fn file_overrides_defaults() {
        let file = write_toml(
            r#"
            [policy]
            draw_points_ceiling = 20000
            exchange_cost = "deduct"

            [seed]
            prizes = "data/prizes.csv"

            [log]
            format = "json"
            "#,
        );

        let config = AppConfig::load_with(
            Some(file.path()),
            AppConfig::environment().source(Some(config::Map::new())),
        )
        .unwrap();
        assert_eq!(config.policy.draw_points_ceiling, 20_000);
        assert_eq!(config.policy.exchange_cost, ExchangeCost::Deduct);
        // untouched keys keep their defaults
        assert_eq!(config.policy.draw_limit, 50_000);
        assert_eq!(config.seed.prizes, Some(PathBuf::from("data/prizes.csv")));
        assert_eq!(config.log.format, LogFormat::Json);
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let result = AppConfig::load(Some(Path::new("/nonexistent/rewards.toml")));
        assert!(result.is_err());
    }

    #[test]
    fn environment_overrides_file() {
        let file = write_toml("[policy]\ndraw_coins = 5\ndraw_points = 7\n");
        let vars: config::Map<String, String> = [
            ("REWARDS_POLICY__DRAW_COINS", "25"),
            ("REWARDS_POLICY__EXCHANGE_COST", "deduct"),
            ("OTHER_POLICY__DRAW_POINTS", "1"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let config =
            AppConfig::load_with(Some(file.path()), AppConfig::environment().source(Some(vars)))
                .unwrap();

        assert_eq!(config.policy.draw_coins, 25);
        assert_eq!(config.policy.exchange_cost, ExchangeCost::Deduct);
        // unprefixed variables are ignored
        assert_eq!(config.policy.draw_points, 7);
    }
}
