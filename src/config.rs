//! Application-level configuration loading: feature catalog defaults, bot
//! tuning, and stage timing budgets.

use std::{env, fs, io::ErrorKind, path::PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

use crate::dao::models::FeatureEntity;

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "PRODUCT_FORGE_CONFIG_PATH";
/// Environment variable carrying the shared admin token.
const ADMIN_TOKEN_ENV: &str = "ADMIN_TOKEN";

/// Stage durations and cadences, all in whole seconds. Timers are recomputed
/// from stored timestamps on every progress call, so these are budgets rather
/// than scheduler intervals.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// How long the lobby stays open before bots fill the table.
    pub lobby_secs: u64,
    /// Duration of the conjoint voting stage.
    pub conjoint_secs: u64,
    /// Duration of the board-building stage.
    pub building_secs: u64,
    /// Grace delay before bots cast their conjoint votes.
    pub conjoint_grace_secs: u64,
    /// Cadence at which bots act during the building stage.
    pub bot_cadence_secs: u64,
    /// How recently a lobby game must have been created to accept joiners.
    pub join_window_secs: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            lobby_secs: 20,
            conjoint_secs: 10,
            building_secs: 60,
            conjoint_grace_secs: 5,
            bot_cadence_secs: 5,
            join_window_secs: 30,
        }
    }
}

/// Probabilities steering bot behavior during the building stage.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BotTuning {
    /// Chance that a bot with a non-full board acts at all on a cadence tick.
    pub act_probability: f64,
    /// Chance that an acting bot steals instead of drawing from the pool.
    /// Kept low so bots do not dominate human play.
    pub steal_probability: f64,
}

impl Default for BotTuning {
    fn default() -> Self {
        Self {
            act_probability: 0.5,
            steal_probability: 0.02,
        }
    }
}

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    catalog: Vec<FeatureEntity>,
    bot_names: Vec<String>,
    timing: TimingConfig,
    bots: BotTuning,
    allow_conjoint_revote: bool,
    admin_token: Option<String>,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to baked-in
    /// defaults for anything missing or unparseable.
    pub fn load() -> Self {
        let path = resolve_config_path();
        let mut config = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        catalog = config.catalog.len(),
                        bot_names = config.bot_names.len(),
                        "loaded configuration"
                    );
                    config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        };

        config.admin_token = env::var(ADMIN_TOKEN_ENV).ok().filter(|t| !t.is_empty());
        if config.admin_token.is_none() {
            warn!("no admin token configured; admin routes will reject all requests");
        }
        config
    }

    /// The default feature catalog, used when the `features` collection holds
    /// no admin-edited rows.
    pub fn catalog(&self) -> &[FeatureEntity] {
        &self.catalog
    }

    /// Pool of display names handed to synthesized bots.
    pub fn bot_names(&self) -> &[String] {
        &self.bot_names
    }

    /// Stage duration budgets.
    pub fn timing(&self) -> &TimingConfig {
        &self.timing
    }

    /// Bot behavior probabilities.
    pub fn bots(&self) -> &BotTuning {
        &self.bots
    }

    /// Whether a player may overwrite an earlier conjoint choice.
    pub fn allow_conjoint_revote(&self) -> bool {
        self.allow_conjoint_revote
    }

    /// Shared secret expected in the `X-Admin-Token` header, if configured.
    pub fn admin_token(&self) -> Option<&str> {
        self.admin_token.as_deref()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            catalog: default_catalog(),
            bot_names: default_bot_names(),
            timing: TimingConfig::default(),
            bots: BotTuning::default(),
            allow_conjoint_revote: true,
            admin_token: None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    features: Vec<RawFeature>,
    bot_names: Vec<String>,
    timing: TimingConfig,
    bots: BotTuning,
    allow_conjoint_revote: bool,
}

impl Default for RawConfig {
    fn default() -> Self {
        Self {
            features: Vec::new(),
            bot_names: Vec::new(),
            timing: TimingConfig::default(),
            bots: BotTuning::default(),
            allow_conjoint_revote: true,
        }
    }
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let catalog = if value.features.is_empty() {
            default_catalog()
        } else {
            value.features.into_iter().map(Into::into).collect()
        };
        let bot_names = if value.bot_names.is_empty() {
            default_bot_names()
        } else {
            value.bot_names
        };
        let mut timing = value.timing;
        // The building-stage tick divides by this cadence.
        timing.bot_cadence_secs = timing.bot_cadence_secs.max(1);
        Self {
            catalog,
            bot_names,
            timing,
            bots: value.bots,
            allow_conjoint_revote: value.allow_conjoint_revote,
            admin_token: None,
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of a single catalog entry in the configuration file.
struct RawFeature {
    name: String,
    category: String,
}

impl From<RawFeature> for FeatureEntity {
    fn from(value: RawFeature) -> Self {
        Self {
            name: value.name,
            category: value.category,
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Built-in feature catalog shipped with the binary.
fn default_catalog() -> Vec<FeatureEntity> {
    const DEFAULTS: [(&str, &str); 20] = [
        ("Premium Materials", "Design"),
        ("Wireless Connectivity", "Technology"),
        ("Voice Control", "Technology"),
        ("Mobile App", "Technology"),
        ("Energy Efficient", "Performance"),
        ("Compact Design", "Design"),
        ("Touch Screen", "Technology"),
        ("Auto Updates", "Technology"),
        ("Cloud Storage", "Technology"),
        ("AI Assistant", "Technology"),
        ("24/7 Support", "Support"),
        ("Warranty Plus", "Support"),
        ("Fast Charging", "Performance"),
        ("Water Resistant", "Design"),
        ("Customizable", "Design"),
        ("Smart Integration", "Technology"),
        ("Eco Friendly", "Sustainability"),
        ("Professional Grade", "Performance"),
        ("User Friendly", "Design"),
        ("Advanced Security", "Technology"),
    ];

    DEFAULTS
        .into_iter()
        .map(|(name, category)| FeatureEntity {
            name: name.to_owned(),
            category: category.to_owned(),
        })
        .collect()
}

/// Built-in bot name pool.
fn default_bot_names() -> Vec<String> {
    [
        "TechGuru_AI",
        "MarketMaven",
        "ProductPro",
        "InnoBot",
        "DesignWiz",
        "FeatureFinder",
        "BuildMaster",
        "TrendSpotter",
        "UserVoice",
        "QualityBot",
    ]
    .into_iter()
    .map(str::to_owned)
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_catalog_has_twenty_distinct_features() {
        let catalog = default_catalog();
        assert_eq!(catalog.len(), 20);
        let mut names: Vec<_> = catalog.iter().map(|f| f.name.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), 20);
    }

    #[test]
    fn raw_config_fills_missing_sections_with_defaults() {
        let raw: RawConfig = serde_json::from_str(r#"{"timing": {"lobby_secs": 5}}"#).unwrap();
        let config: AppConfig = raw.into();
        assert_eq!(config.timing().lobby_secs, 5);
        assert_eq!(config.timing().building_secs, 60);
        assert_eq!(config.catalog().len(), 20);
        assert!(config.allow_conjoint_revote());
    }

    #[test]
    fn zero_bot_cadence_is_clamped_to_one_second() {
        let raw: RawConfig =
            serde_json::from_str(r#"{"timing": {"bot_cadence_secs": 0}}"#).unwrap();
        let config: AppConfig = raw.into();
        assert_eq!(config.timing().bot_cadence_secs, 1);
    }
}
