//! Runtime configuration: fee rate, game modes, lock timeout, and admin seed.

use crate::domain::money::{Amount, FeeRate};
use crate::error::{LedgerError, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// Time control and stake of a playable mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameModeConfig {
    pub time_control_secs: u32,
    pub entry_fee: Decimal,
}

/// Credentials of the administrator seeded by [`crate::application::engine::LedgerEngine::bootstrap`].
///
/// Password hashing happens outside this crate; without a hash no admin is seeded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminSeed {
    pub username: String,
    pub password_hash: Option<String>,
}

impl Default for AdminSeed {
    fn default() -> Self {
        Self {
            username: "admin".to_string(),
            password_hash: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub fee_rate: FeeRate,
    pub lock_timeout_ms: u64,
    pub min_games_before_withdrawal: u32,
    pub game_modes: BTreeMap<String, GameModeConfig>,
    pub admin: AdminSeed,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        let game_modes = [("bullet-1", 60, dec!(10)), ("blitz-3", 180, dec!(5)), ("blitz-5", 300, dec!(3))]
            .into_iter()
            .map(|(name, time_control_secs, entry_fee)| {
                (
                    name.to_string(),
                    GameModeConfig {
                        time_control_secs,
                        entry_fee,
                    },
                )
            })
            .collect();

        Self {
            fee_rate: FeeRate::DEFAULT,
            lock_timeout_ms: 5_000,
            min_games_before_withdrawal: 1,
            game_modes,
            admin: AdminSeed::default(),
        }
    }
}

impl LedgerConfig {
    /// Loads and validates a TOML configuration file. Missing keys take defaults.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: LedgerConfig =
            toml::from_str(content).map_err(|e| LedgerError::ConfigError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.lock_timeout_ms == 0 {
            return Err(LedgerError::ConfigError(
                "lock_timeout_ms must be positive".to_string(),
            ));
        }
        for (name, mode) in &self.game_modes {
            if Amount::new(mode.entry_fee).is_err() {
                return Err(LedgerError::ConfigError(format!(
                    "game mode {name} has invalid entry fee {}",
                    mode.entry_fee
                )));
            }
        }
        Ok(())
    }

    pub fn game_mode(&self, mode: &str) -> Result<&GameModeConfig> {
        self.game_modes
            .get(mode)
            .ok_or_else(|| LedgerError::UnknownGameMode(mode.to_string()))
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LedgerConfig::default();
        assert_eq!(config.fee_rate.value(), dec!(0.1));
        assert_eq!(config.game_mode("bullet-1").unwrap().entry_fee, dec!(10));
        assert_eq!(config.game_mode("blitz-5").unwrap().time_control_secs, 300);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = LedgerConfig::from_toml_str("fee_rate = \"0.05\"").unwrap();
        assert_eq!(config.fee_rate.value(), dec!(0.05));
        assert_eq!(config.game_modes.len(), 3);
        assert_eq!(config.admin.username, "admin");
    }

    #[test]
    fn test_custom_modes() {
        let toml = r#"
            [game_modes.rapid-10]
            time_control_secs = 600
            entry_fee = "2.50"

            [admin]
            password_hash = "$2b$10$abcdefghijklmnopqrstuv"
        "#;
        let config = LedgerConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.game_modes.len(), 1);
        assert_eq!(config.game_mode("rapid-10").unwrap().entry_fee, dec!(2.5));
        assert!(config.admin.password_hash.is_some());
        assert!(matches!(
            config.game_mode("bullet-1"),
            Err(LedgerError::UnknownGameMode(_))
        ));
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            LedgerConfig::from_toml_str("fee_rate = \"1.5\""),
            Err(LedgerError::ConfigError(_))
        ));

        let toml = r#"
            [game_modes.free]
            time_control_secs = 60
            entry_fee = "0"
        "#;
        assert!(matches!(
            LedgerConfig::from_toml_str(toml),
            Err(LedgerError::ConfigError(_))
        ));
    }

    #[test]
    fn test_oversized_entry_fee_rejected() {
        let toml = r#"
            [game_modes.whale]
            time_control_secs = 60
            entry_fee = "79228162514264337593543950335"
        "#;
        assert!(matches!(
            LedgerConfig::from_toml_str(toml),
            Err(LedgerError::ConfigError(_))
        ));
    }
}
