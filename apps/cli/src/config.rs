use anyhow::{anyhow, Context};
use budgetkit_core::budgets::BudgetSettings;
use budgetkit_core::money::ensure_percentage;
use rust_decimal::Decimal;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub db_path: String,
    pub settings: BudgetSettings,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let db_path = lookup("BUDGETKIT_DB_PATH").unwrap_or_else(|| "./db/budgetkit.db".into());
        let defaults = BudgetSettings::default();

        let require_approval = match lookup("BUDGETKIT_REQUIRE_APPROVAL") {
            Some(raw) => parse_bool(&raw)
                .ok_or_else(|| anyhow!("Invalid BUDGETKIT_REQUIRE_APPROVAL: '{}'", raw))?,
            None => defaults.require_approval,
        };

        let default_alert_percentage = match lookup("BUDGETKIT_DEFAULT_ALERT_PERCENTAGE") {
            Some(raw) => {
                let value: Decimal = raw
                    .trim()
                    .parse()
                    .with_context(|| format!("Invalid BUDGETKIT_DEFAULT_ALERT_PERCENTAGE: '{}'", raw))?;
                ensure_percentage("BUDGETKIT_DEFAULT_ALERT_PERCENTAGE", value)?;
                value
            }
            None => defaults.default_alert_percentage,
        };

        Ok(Self {
            db_path,
            settings: BudgetSettings {
                require_approval,
                default_alert_percentage,
            },
        })
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
