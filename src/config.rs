use std::env;

use chrono::NaiveDate;

use crate::error::{AppError, AppResult};
use crate::models::advice::{AdvisorProvider, AdvisorSettings};

pub const DEFAULT_WINDOW_START: &str = "2024-12-01";
pub const DEFAULT_WINDOW_END: &str = "2025-02-28";
pub const DEFAULT_TODAY: &str = "2025-01-08";

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub window_start: NaiveDate,
    pub window_end: NaiveDate,
    /// The simulated "today": actuals exist only for dates strictly before it.
    pub today: NaiveDate,
    /// Generator seed. `None` draws from OS entropy.
    pub seed: Option<u64>,
    pub advisor: AdvisorSettings,
}

impl Config {
    pub fn from_env() -> AppResult<Self> {
        dotenvy::dotenv().ok();

        let window_start = date_var("SALESPLAN_WINDOW_START", DEFAULT_WINDOW_START)?;
        let window_end = date_var("SALESPLAN_WINDOW_END", DEFAULT_WINDOW_END)?;
        let today = date_var("SALESPLAN_TODAY", DEFAULT_TODAY)?;

        if window_start > window_end {
            return Err(AppError::Validation(format!(
                "SALESPLAN_WINDOW_START ({}) is after SALESPLAN_WINDOW_END ({})",
                window_start, window_end
            )));
        }

        let seed = match env::var("SALESPLAN_SEED") {
            Ok(raw) if !raw.is_empty() => Some(raw.parse::<u64>().map_err(|_| {
                AppError::Validation(format!("SALESPLAN_SEED must be an integer, got '{}'", raw))
            })?),
            _ => None,
        };

        let provider = match env::var("SALESPLAN_AI_PROVIDER") {
            Ok(raw) if !raw.is_empty() => Some(raw.parse::<AdvisorProvider>().map_err(|_| {
                AppError::Validation(format!("Unknown SALESPLAN_AI_PROVIDER '{}'", raw))
            })?),
            _ => None,
        };

        let advisor = AdvisorSettings::new(
            provider,
            env::var("SALESPLAN_AI_BASE_URL").ok(),
            env::var("SALESPLAN_AI_API_KEY").unwrap_or_default(),
            env::var("SALESPLAN_AI_MODEL").ok(),
        );

        Ok(Self {
            host: env::var("SALESPLAN_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env::var("SALESPLAN_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(7070),
            window_start,
            window_end,
            today,
            seed,
            advisor,
        })
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    /// The stock demo window with no AI provider configured.
    fn default() -> Self {
        let parse = |s: &str| NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap_or_default();
        Self {
            host: "127.0.0.1".into(),
            port: 7070,
            window_start: parse(DEFAULT_WINDOW_START),
            window_end: parse(DEFAULT_WINDOW_END),
            today: parse(DEFAULT_TODAY),
            seed: None,
            advisor: AdvisorSettings::default(),
        }
    }
}

fn date_var(name: &str, default: &str) -> AppResult<NaiveDate> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
        .map_err(|_| AppError::Validation(format!("{} must be YYYY-MM-DD, got '{}'", name, raw)))
}
