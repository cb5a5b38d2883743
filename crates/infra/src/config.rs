//! Engine configuration read from environment variables.
//!
//! | Variable | Meaning | Default |
//! |---|---|---|
//! | `USE_PERSISTENT_STORES` | draw numbers from the Postgres counter store | `false` |
//! | `DATABASE_URL` | Postgres URL, required when persistent | none |
//! | `FACTORYERP_NUMBERING` | JSON numbering scheme override | built-in scheme |
//! | `FACTORYERP_GRAND_TOTAL_SCALE` | decimal places of the grand total (`0` = whole units) | `2` |

use thiserror::Error;
use tracing::warn;

use factoryerp_documents::RoundingPolicy;
use factoryerp_numbering::NumberingScheme;

pub const USE_PERSISTENT_STORES: &str = "USE_PERSISTENT_STORES";
pub const DATABASE_URL: &str = "DATABASE_URL";
pub const FACTORYERP_NUMBERING: &str = "FACTORYERP_NUMBERING";
pub const FACTORYERP_GRAND_TOTAL_SCALE: &str = "FACTORYERP_GRAND_TOTAL_SCALE";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("DATABASE_URL must be set when USE_PERSISTENT_STORES=true")]
    MissingDatabaseUrl,

    #[error("FACTORYERP_NUMBERING is invalid: {0}")]
    InvalidNumbering(String),

    #[error("FACTORYERP_GRAND_TOTAL_SCALE is invalid: {0}")]
    InvalidGrandTotalScale(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub use_persistent_stores: bool,
    pub database_url: Option<String>,
    pub numbering: NumberingScheme,
    pub rounding: RoundingPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            use_persistent_stores: false,
            database_url: None,
            numbering: NumberingScheme::default(),
            rounding: RoundingPolicy::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let use_persistent_stores = match lookup(USE_PERSISTENT_STORES) {
            None => false,
            Some(raw) => raw.trim().parse::<bool>().unwrap_or_else(|_| {
                warn!(value = %raw, "USE_PERSISTENT_STORES is not a boolean; using in-memory stores");
                false
            }),
        };

        let database_url = lookup(DATABASE_URL).filter(|url| !url.trim().is_empty());
        if use_persistent_stores && database_url.is_none() {
            return Err(ConfigError::MissingDatabaseUrl);
        }

        let numbering = match lookup(FACTORYERP_NUMBERING) {
            None => NumberingScheme::default(),
            Some(raw) => {
                let scheme: NumberingScheme =
                    serde_json::from_str(&raw).map_err(|e| ConfigError::InvalidNumbering(e.to_string()))?;
                scheme
                    .validate()
                    .map_err(|e| ConfigError::InvalidNumbering(e.to_string()))?;
                scheme
            }
        };

        let mut rounding = RoundingPolicy::default();
        if let Some(raw) = lookup(FACTORYERP_GRAND_TOTAL_SCALE) {
            let scale: u32 = raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidGrandTotalScale(format!("'{raw}' is not a number")))?;
            if scale > rounding.amount_scale {
                return Err(ConfigError::InvalidGrandTotalScale(format!(
                    "{scale} exceeds the amount scale {}",
                    rounding.amount_scale
                )));
            }
            rounding.grand_total_scale = scale;
        }

        Ok(Self {
            use_persistent_stores,
            database_url,
            numbering,
            rounding,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_variables() {
        let config = EngineConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn persistent_stores_need_a_database_url() {
        let err = EngineConfig::from_lookup(lookup_from(&[(USE_PERSISTENT_STORES, "true")])).unwrap_err();
        assert_eq!(err, ConfigError::MissingDatabaseUrl);

        let config = EngineConfig::from_lookup(lookup_from(&[
            (USE_PERSISTENT_STORES, "true"),
            (DATABASE_URL, "postgres://erp@localhost/erp"),
        ]))
        .unwrap();
        assert!(config.use_persistent_stores);
    }

    #[test]
    fn unparsable_flag_falls_back_to_in_memory() {
        let config = EngineConfig::from_lookup(lookup_from(&[(USE_PERSISTENT_STORES, "yes")])).unwrap();
        assert!(!config.use_persistent_stores);
    }

    #[test]
    fn numbering_override_is_parsed_and_validated() {
        let config = EngineConfig::from_lookup(lookup_from(&[(
            FACTORYERP_NUMBERING,
            r#"{"invoice":{"prefix":"TAX/","width":4}}"#,
        )]))
        .unwrap();
        assert_eq!(config.numbering.invoice.prefix, "TAX/");
        assert_eq!(config.numbering.quotation.prefix, "QT/");

        let err = EngineConfig::from_lookup(lookup_from(&[(
            FACTORYERP_NUMBERING,
            r#"{"invoice":{"prefix":"TAX/","width":0}}"#,
        )]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidNumbering(_)));
    }

    #[test]
    fn grand_total_scale_is_bounded_by_amount_scale() {
        let config = EngineConfig::from_lookup(lookup_from(&[(FACTORYERP_GRAND_TOTAL_SCALE, "0")])).unwrap();
        assert_eq!(config.rounding.grand_total_scale, 0);

        for bad in ["3", "-1", "two"] {
            let err = EngineConfig::from_lookup(lookup_from(&[(FACTORYERP_GRAND_TOTAL_SCALE, bad)])).unwrap_err();
            assert!(matches!(err, ConfigError::InvalidGrandTotalScale(_)), "{bad}");
        }
    }
}
