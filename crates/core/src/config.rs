use serde::Deserialize;

/// Root application configuration. Loaded from an optional TOML file and
/// environment variables with the prefix `POS_DISCOUNTS__`.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_seed_demo_data")]
    pub seed_demo_data: bool,
    #[serde(default)]
    pub coupons: CouponConfig,
    #[serde(default)]
    pub loyalty: LoyaltyConfig,
    #[serde(default)]
    pub checkout: CheckoutConfig,
}

fn default_seed_demo_data() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            seed_demo_data: default_seed_demo_data(),
            coupons: CouponConfig::default(),
            loyalty: LoyaltyConfig::default(),
            checkout: CheckoutConfig::default(),
        }
    }
}

// ─── Coupon Config ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct CouponConfig {
    #[serde(default = "default_code_min_len")]
    pub code_min_len: usize,
    #[serde(default = "default_code_max_len")]
    pub code_max_len: usize,
}

fn default_code_min_len() -> usize {
    3
}

fn default_code_max_len() -> usize {
    32
}

impl Default for CouponConfig {
    fn default() -> Self {
        Self {
            code_min_len: default_code_min_len(),
            code_max_len: default_code_max_len(),
        }
    }
}

// ─── Loyalty Config ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct LoyaltyConfig {
    /// Gates enrollment of new members only. Existing members keep
    /// earning and redeeming while this is off.
    #[serde(default = "default_loyalty_enabled")]
    pub enabled: bool,
    /// Prefix of generated loyalty numbers.
    #[serde(default = "default_number_prefix")]
    pub number_prefix: String,
    /// Zero-padded width of the numeric part.
    #[serde(default = "default_number_width")]
    pub number_width: usize,
}

fn default_loyalty_enabled() -> bool {
    true
}

fn default_number_prefix() -> String {
    "LOY".to_string()
}

fn default_number_width() -> usize {
    6
}

impl Default for LoyaltyConfig {
    fn default() -> Self {
        Self {
            enabled: default_loyalty_enabled(),
            number_prefix: default_number_prefix(),
            number_width: default_number_width(),
        }
    }
}

// ─── Checkout Config ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutConfig {
    /// Flat rate applied to the discounted subtotal.
    #[serde(default = "default_tax_rate")]
    pub tax_rate: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_tax_rate() -> f64 {
    0.08
}

fn default_currency() -> String {
    "USD".to_string()
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            tax_rate: default_tax_rate(),
            currency: default_currency(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables only.
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration from an optional file, then environment variables,
    /// which take precedence.
    pub fn load_from(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            tracing::debug!(path = path, "Reading configuration file");
            builder = builder.add_source(config::File::with_name(path).required(false));
        }
        let builder = builder.add_source(
            config::Environment::with_prefix("POS_DISCOUNTS")
                .separator("__")
                .try_parsing(true),
        );

        let config: AppConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), config::ConfigError> {
        if !(0.0..=1.0).contains(&self.checkout.tax_rate) {
            return Err(config::ConfigError::Message(format!(
                "checkout.tax_rate must be within [0, 1], got {}",
                self.checkout.tax_rate
            )));
        }
        if self.coupons.code_min_len == 0 || self.coupons.code_min_len > self.coupons.code_max_len {
            return Err(config::ConfigError::Message(
                "coupons.code_min_len must be positive and not exceed code_max_len".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert!(config.seed_demo_data);
        assert_eq!(config.loyalty.number_prefix, "LOY");
        assert_eq!(config.loyalty.number_width, 6);
        assert_eq!(config.checkout.tax_rate, 0.08);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_deserialize_fills_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{"checkout": {"tax_rate": 0.05}}"#).unwrap();
        assert_eq!(config.checkout.tax_rate, 0.05);
        assert_eq!(config.checkout.currency, "USD");
        assert_eq!(config.coupons.code_max_len, 32);
    }

    #[test]
    fn test_rejects_out_of_range_tax_rate() {
        let mut config = AppConfig::default();
        config.checkout.tax_rate = 1.5;
        assert!(config.validate().is_err());
    }
}
