//! Pipeline configuration.
//!
//! Defaults reproduce the Wind end-of-day schema and the documented outlier
//! constants. Any of it can be overridden from a TOML file:
//!
//! ```toml
//! date_format = "%Y%m%d"
//!
//! [fields]
//! symbol_column = "S_INFO_WINDCODE"
//!
//! [fields.columns]
//! TRADE_DT = "date"
//! S_DQ_CLOSE = "close"
//! S_DQ_VOLUME = "volume"
//!
//! [outlier]
//! band_low = 89.0
//! band_high = 111.0
//! scale = 100.0
//! max_iterations = 10
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Read(#[from] std::io::Error),

    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Full normalization configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeConfig {
    /// chrono format of the vendor date column.
    pub date_format: String,
    pub fields: FieldMapping,
    pub outlier: OutlierConfig,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            date_format: "%Y%m%d".into(),
            fields: FieldMapping::wind(),
            outlier: OutlierConfig::default(),
        }
    }
}

impl NormalizeConfig {
    /// Load and validate a config from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate a config from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.date_format.trim().is_empty() {
            return Err(ConfigError::Invalid("date_format must not be empty".into()));
        }
        if !self.fields.columns.values().any(|c| c == "date") {
            return Err(ConfigError::Invalid(
                "field mapping has no source for the `date` column".into(),
            ));
        }
        self.outlier.validate()
    }
}

/// Vendor column name -> canonical column name.
///
/// A `[fields]` table without `columns` keeps the Wind columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldMapping {
    /// Vendor symbol-identifier column dropped after mapping.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol_column: Option<String>,

    pub columns: BTreeMap<String, String>,
}

impl FieldMapping {
    /// Wind `AShareEODPrices` layout.
    pub fn wind() -> Self {
        let columns = [
            ("TRADE_DT", "date"),
            ("S_DQ_OPEN", "open"),
            ("S_DQ_HIGH", "high"),
            ("S_DQ_LOW", "low"),
            ("S_DQ_CLOSE", "close"),
            ("S_DQ_VOLUME", "volume"),
            ("S_DQ_AMOUNT", "amount"),
            ("S_DQ_ADJCLOSE", "adjclose"),
        ]
        .into_iter()
        .map(|(vendor, canonical)| (vendor.to_string(), canonical.to_string()))
        .collect();

        Self {
            symbol_column: Some("S_INFO_WINDCODE".into()),
            columns,
        }
    }

    /// Mapping for tables that already use canonical names.
    pub fn identity() -> Self {
        let columns = [
            "date", "open", "high", "low", "close", "volume", "amount", "adjclose",
        ]
        .into_iter()
        .map(|name| (name.to_string(), name.to_string()))
        .collect();

        Self {
            symbol_column: None,
            columns,
        }
    }
}

impl Default for FieldMapping {
    fn default() -> Self {
        Self::wind()
    }
}

/// Detection band and limits for x100 scale errors.
///
/// A row whose day-over-day change falls inside `[band_low, band_high]` is
/// treated as mis-scaled and its prices are divided by `scale`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutlierConfig {
    pub band_low: f64,
    pub band_high: f64,
    pub scale: f64,
    pub max_iterations: usize,
}

impl Default for OutlierConfig {
    fn default() -> Self {
        Self {
            band_low: 89.0,
            band_high: 111.0,
            scale: 100.0,
            max_iterations: 10,
        }
    }
}

impl OutlierConfig {
    pub fn contains(&self, change: f64) -> bool {
        change >= self.band_low && change <= self.band_high
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.band_low.is_finite() && self.band_high.is_finite()) {
            return Err(ConfigError::Invalid("outlier band must be finite".into()));
        }
        if self.band_low > self.band_high {
            return Err(ConfigError::Invalid(format!(
                "outlier band is inverted: [{}, {}]",
                self.band_low, self.band_high
            )));
        }
        if !self.scale.is_finite() || self.scale <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "outlier scale must be positive, got {}",
                self.scale
            )));
        }
        if self.max_iterations == 0 {
            return Err(ConfigError::Invalid(
                "outlier max_iterations must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid_wind_layout() {
        let config = NormalizeConfig::default();
        config.validate().unwrap();
        assert_eq!(config.fields.columns["TRADE_DT"], "date");
        assert_eq!(config.fields.columns["S_DQ_ADJCLOSE"], "adjclose");
        assert_eq!(config.fields.symbol_column.as_deref(), Some("S_INFO_WINDCODE"));
        assert_eq!(config.outlier.max_iterations, 10);
    }

    #[test]
    fn toml_roundtrip_preserves_config() {
        let config = NormalizeConfig::default();
        let text = config.to_toml().unwrap();
        let parsed = NormalizeConfig::from_toml(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let config = NormalizeConfig::from_toml(
            r#"
            [outlier]
            band_low = 90.0
            "#,
        )
        .unwrap();
        assert_eq!(config.outlier.band_low, 90.0);
        assert_eq!(config.outlier.band_high, 111.0);
        assert_eq!(config.fields, FieldMapping::wind());
    }

    #[test]
    fn partial_fields_table_falls_back() {
        let config = NormalizeConfig::from_toml(
            r#"
            [fields]
            symbol_column = "CODE"
            "#,
        )
        .unwrap();
        assert_eq!(config.fields.symbol_column.as_deref(), Some("CODE"));
        assert_eq!(config.fields.columns, FieldMapping::wind().columns);
    }

    #[test]
    fn rejects_inverted_band() {
        let err = NormalizeConfig::from_toml(
            r#"
            [outlier]
            band_low = 120.0
            band_high = 111.0
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_mapping_without_date() {
        let err = NormalizeConfig::from_toml(
            r#"
            [fields.columns]
            S_DQ_CLOSE = "close"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn band_is_closed_on_both_ends() {
        let outlier = OutlierConfig::default();
        assert!(outlier.contains(89.0));
        assert!(outlier.contains(111.0));
        assert!(outlier.contains(99.0));
        assert!(!outlier.contains(88.99));
        assert!(!outlier.contains(111.01));
    }
}
