//! Configuration management.
//!
//! Settings load from defaults, an optional `config/toolroom` file, then
//! `TOOLROOM`-prefixed environment variables (`__` separator), and are
//! validated before the service starts.

pub mod error;

pub use error::{ConfigResult, ConfigurationError};

use serde::{Deserialize, Serialize};

use crate::calendar::CustomPolicy;
use crate::scheduler::reschedule::RescheduleMode;

/// When the daily scan runs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScanConfig {
    /// UTC hour (0-23) the daily pass fires at.
    pub hour_utc: u32,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self { hour_utc: 6 }
    }
}

/// Divergence switches for one consumer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ConsumerConfig {
    /// How CUSTOM frequencies are interpreted.
    pub custom_policy: CustomPolicy,
    /// Whether completion eagerly materializes the following occurrence.
    pub reschedule_mode: RescheduleMode,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default log filter when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Daily scan configuration.
    #[serde(default)]
    pub scan: ScanConfig,
    /// Maintenance consumer switches.
    #[serde(default = "AppConfig::default_maintenance")]
    pub maintenance: ConsumerConfig,
    /// PPE delivery consumer switches.
    #[serde(default = "AppConfig::default_ppe_delivery")]
    pub ppe_delivery: ConsumerConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            scan: ScanConfig::default(),
            maintenance: Self::default_maintenance(),
            ppe_delivery: Self::default_ppe_delivery(),
            logging: LoggingConfig::default(),
        }
    }
}

impl AppConfig {
    fn default_maintenance() -> ConsumerConfig {
        ConsumerConfig {
            custom_policy: CustomPolicy::DaysInterval,
            reschedule_mode: RescheduleMode::Deferred,
        }
    }

    fn default_ppe_delivery() -> ConsumerConfig {
        ConsumerConfig {
            custom_policy: CustomPolicy::Unsupported,
            reschedule_mode: RescheduleMode::Eager,
        }
    }

    /// Load configuration from files and environment, then validate.
    pub fn load() -> anyhow::Result<Self> {
        let config = Self::load_unchecked()?;
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("Configuration validation failed:\n\n{e}"))?;
        Ok(config)
    }

    /// Load configuration without validation.
    pub fn load_unchecked() -> anyhow::Result<Self> {
        // Load .env file if present
        let _ = dotenvy::dotenv();

        let config = config::Config::builder()
            .set_default("scan.hour_utc", 6)?
            .set_default("logging.level", "info")?
            .add_source(config::File::with_name("config/toolroom").required(false))
            .add_source(
                config::Environment::with_prefix("TOOLROOM")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize().unwrap_or_default())
    }

    /// Validate configuration combinations.
    pub fn validate(&self) -> ConfigResult<()> {
        let mut errors = Vec::new();

        if self.scan.hour_utc > 23 {
            errors.push(ConfigurationError::invalid(
                format!("scan.hour_utc is {}", self.scan.hour_utc),
                "Set TOOLROOM__SCAN__HOUR_UTC to an hour between 0 and 23",
            ));
        }

        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(ConfigurationError::multiple(errors)),
        }
    }
}
