use std::env;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    /// Directory for rolling log files
    /// Default: logs
    pub log_dir: String,

    /// VAT rate (percent) used when a calculation does not name one
    /// Default: 20.0
    pub default_vat_rate: f64,

    /// Currency label attached to VAT quotes and summaries
    /// Default: EUR
    pub default_currency: String,
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Optional environment variables:
    /// - LOG_DIR: Directory for log files (default: logs)
    /// - DEFAULT_VAT_RATE: VAT percentage between 0 and 100 (default: 20.0)
    /// - DEFAULT_CURRENCY: Currency label (default: EUR)
    pub fn from_env() -> Result<Self, String> {
        // Load .env file if it exists
        dotenv::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let log_dir = lookup("LOG_DIR").unwrap_or_else(|| "logs".to_string());

        let default_vat_rate = match lookup("DEFAULT_VAT_RATE") {
            Some(raw) => raw
                .trim()
                .parse::<f64>()
                .map_err(|_| format!("DEFAULT_VAT_RATE must be a number, got {:?}", raw))?,
            None => 20.0,
        };
        if !(0.0..=100.0).contains(&default_vat_rate) {
            return Err(format!(
                "DEFAULT_VAT_RATE must be between 0 and 100, got {}",
                default_vat_rate
            ));
        }

        let default_currency = lookup("DEFAULT_CURRENCY").unwrap_or_else(|| "EUR".to_string());

        Ok(Config {
            log_dir,
            default_vat_rate,
            default_currency,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let config = load(&[]).unwrap();
        assert_eq!(config.log_dir, "logs");
        assert_eq!(config.default_vat_rate, 20.0);
        assert_eq!(config.default_currency, "EUR");
    }

    #[test]
    fn reads_overrides() {
        let config = load(&[
            ("LOG_DIR", "/var/log/fieldbook"),
            ("DEFAULT_VAT_RATE", " 5.5 "),
            ("DEFAULT_CURRENCY", "GBP"),
        ])
        .unwrap();
        assert_eq!(config.log_dir, "/var/log/fieldbook");
        assert_eq!(config.default_vat_rate, 5.5);
        assert_eq!(config.default_currency, "GBP");
    }

    #[test]
    fn rejects_bad_vat_rate() {
        assert!(load(&[("DEFAULT_VAT_RATE", "twenty")]).is_err());
        assert!(load(&[("DEFAULT_VAT_RATE", "100.5")]).is_err());
        assert!(load(&[("DEFAULT_VAT_RATE", "100")]).is_ok());
    }
}
