//! Configuration loading and management
//!
//! Configuration comes from a YAML file, then environment variables override
//! individual keys:
//!
//! | Variable               | Key                          |
//! |------------------------|------------------------------|
//! | `INTERLOCK_BIND`       | `server.bind`                |
//! | `INTERLOCK_LOG`        | `logging.filter`             |
//! | `INTERLOCK_TAX_RATE`   | `billing.tax_rate`           |
//! | `INTERLOCK_DAILY_RATE` | `billing.default_daily_rate` |

use crate::core::error::ConfigError;
use chrono::NaiveTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Complete service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub billing: BillingConfig,
    pub scheduling: SchedulingConfig,
    pub gateway: GatewayConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:3000".to_string(),
            request_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BillingConfig {
    /// Sales tax applied to taxable invoice lines (New Jersey: 6.625 %)
    pub tax_rate: Decimal,

    /// Days in one rental period ("four-week rental")
    pub rental_period_days: u32,

    /// Daily lease rate given to new clients
    pub default_daily_rate: Decimal,

    /// Whether rent lines are taxable
    pub tax_rent: bool,

    pub invoice_prefix: String,

    /// Days between issue date and due date
    pub payment_terms_days: u32,
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            tax_rate: Decimal::new(6625, 5),
            rental_period_days: 28,
            default_daily_rate: Decimal::new(350, 2),
            tax_rent: true,
            invoice_prefix: "INV".to_string(),
            payment_terms_days: 14,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulingConfig {
    pub default_calibration_interval_days: u32,

    /// How many days before the calibration due date the booking window opens
    pub calibration_window_days: u32,

    /// Court-ordered monitoring term given to new clients
    pub default_monitoring_days: u32,

    pub open_time: NaiveTime,
    pub close_time: NaiveTime,
    pub slot_minutes: u32,
    pub default_duration_minutes: u32,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            default_calibration_interval_days: 60,
            calibration_window_days: 7,
            default_monitoring_days: 365,
            open_time: NaiveTime::from_hms_opt(8, 0, 0).unwrap_or_default(),
            close_time: NaiveTime::from_hms_opt(17, 0, 0).unwrap_or_default(),
            slot_minutes: 30,
            default_duration_minutes: 30,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayMode {
    #[default]
    Sandbox,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub mode: GatewayMode,

    /// Sandbox only: decline any charge above this amount
    pub decline_over: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive
    pub filter: String,

    /// Emit JSON log lines instead of the human-readable format
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info,interlock=debug,tower_http=info".to_string(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_yaml_str(&content)
    }

    /// Load configuration from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(yaml).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load from an optional file, apply process environment overrides, validate
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_yaml_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `INTERLOCK_*` overrides using the given variable lookup
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(bind) = lookup("INTERLOCK_BIND") {
            self.server.bind = bind;
        }
        if let Some(filter) = lookup("INTERLOCK_LOG") {
            self.logging.filter = filter;
        }
        if let Some(rate) = lookup("INTERLOCK_TAX_RATE") {
            self.billing.tax_rate = parse_decimal("INTERLOCK_TAX_RATE", &rate)?;
        }
        if let Some(rate) = lookup("INTERLOCK_DAILY_RATE") {
            self.billing.default_daily_rate = parse_decimal("INTERLOCK_DAILY_RATE", &rate)?;
        }
        Ok(())
    }

    /// Reject values the billing and scheduling rules cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let rate = self.billing.tax_rate;
        if rate.is_sign_negative() || rate >= Decimal::ONE {
            return Err(invalid("billing.tax_rate", "must be in [0, 1)"));
        }
        if self.billing.default_daily_rate.is_sign_negative() {
            return Err(invalid("billing.default_daily_rate", "must not be negative"));
        }
        if self.billing.rental_period_days == 0 {
            return Err(invalid("billing.rental_period_days", "must be at least 1"));
        }
        if self.scheduling.default_calibration_interval_days == 0 {
            return Err(invalid(
                "scheduling.default_calibration_interval_days",
                "must be at least 1",
            ));
        }
        if self.scheduling.open_time >= self.scheduling.close_time {
            return Err(invalid("scheduling.open_time", "must be before close_time"));
        }
        if self.scheduling.slot_minutes == 0 {
            return Err(invalid("scheduling.slot_minutes", "must be at least 1"));
        }
        Ok(())
    }
}

fn parse_decimal(key: &str, raw: &str) -> Result<Decimal, ConfigError> {
    raw.trim()
        .parse::<Decimal>()
        .map_err(|e| invalid(key, &e.to_string()))
}

fn invalid(key: &str, message: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.billing.tax_rate.to_string(), "0.06625");
        assert_eq!(config.billing.rental_period_days, 28);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = r#"
billing:
  default_daily_rate: "4.25"
scheduling:
  calibration_window_days: 10
"#;
        let config = AppConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.billing.default_daily_rate, Decimal::new(425, 2));
        assert_eq!(config.scheduling.calibration_window_days, 10);
        assert_eq!(config.scheduling.default_calibration_interval_days, 60);
        assert_eq!(config.server.bind, "127.0.0.1:3000");
    }

    #[test]
    fn test_yaml_serialization_round_trip() {
        let config = AppConfig::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed = AppConfig::from_yaml_str(&yaml).unwrap();
        assert_eq!(parsed.billing.tax_rate, config.billing.tax_rate);
        assert_eq!(parsed.scheduling.open_time, config.scheduling.open_time);
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("INTERLOCK_BIND", "0.0.0.0:8080"),
            ("INTERLOCK_TAX_RATE", "0.07"),
        ]);
        let mut config = AppConfig::default();
        config
            .apply_overrides(|k| vars.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.server.bind, "0.0.0.0:8080");
        assert_eq!(config.billing.tax_rate, Decimal::new(7, 2));
    }

    #[test]
    fn test_bad_env_override_is_rejected() {
        let mut config = AppConfig::default();
        let err = config
            .apply_overrides(|k| (k == "INTERLOCK_DAILY_RATE").then(|| "cheap".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("INTERLOCK_DAILY_RATE"));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = AppConfig::default();
        config.billing.tax_rate = Decimal::ONE;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.scheduling.close_time = config.scheduling.open_time;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.billing.rental_period_days = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = AppConfig::from_yaml_file("/nonexistent/interlock.yaml").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/interlock.yaml"));
    }

    #[test]
    fn test_shipped_config_file_is_valid() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/config/interlock.yaml");
        let config = AppConfig::from_yaml_file(path).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.bind, "0.0.0.0:3000");
        assert_eq!(config.gateway.decline_over, Some(Decimal::new(500000, 2)));
    }

    #[test]
    fn test_load_from_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("interlock.yaml");
        std::fs::write(&path, "gateway:\n  decline_over: \"500.00\"\n").unwrap();

        let config = AppConfig::from_yaml_file(&path).unwrap();
        assert_eq!(config.gateway.decline_over, Some(Decimal::new(50000, 2)));
        assert_eq!(config.gateway.mode, GatewayMode::Sandbox);
    }
}
