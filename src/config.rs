use std::env;
use std::str::FromStr;

use anyhow::{Context, Result, anyhow};
use chrono::{NaiveTime, Weekday};
use dotenvy::dotenv;
use rust_decimal::Decimal;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub server_addr: String,
    pub api_prefix: String,
    pub log_dir: String,
    pub engine: EngineSettings,
}

/// Tunables of the attendance and payroll rules.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSettings {
    /// Worked minutes strictly below this make a HALF_DAY.
    pub half_day_threshold_minutes: i64,
    /// Minutes per day after which overtime accrues.
    pub standard_work_minutes: i64,
    /// Full days checked in after this time become LATE. `None` disables it.
    pub late_after: Option<NaiveTime>,
    pub hours_per_day: Decimal,
    pub overtime_multiplier: Decimal,
    pub auto_checkout_at: NaiveTime,
    pub weekend: Vec<Weekday>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            half_day_threshold_minutes: 240,
            standard_work_minutes: 480,
            late_after: None,
            hours_per_day: Decimal::from(8),
            overtime_multiplier: Decimal::new(15, 1),
            auto_checkout_at: NaiveTime::from_hms_opt(23, 59, 0).unwrap_or(NaiveTime::MIN),
            weekend: vec![Weekday::Sat, Weekday::Sun],
        }
    }
}

fn var_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("{key} is invalid: {e}")),
        Err(_) => Ok(default),
    }
}

fn parse_time(key: &str, raw: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M").with_context(|| format!("{key} must be HH:MM"))
}

pub fn parse_weekend(raw: &str) -> Result<Vec<Weekday>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|day| {
            day.parse::<Weekday>()
                .map_err(|_| anyhow!("unknown weekday `{day}` in WEEKEND_DAYS"))
        })
        .collect()
}

impl EngineSettings {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let late_after = match env::var("LATE_AFTER") {
            Ok(raw) if !raw.trim().is_empty() => Some(parse_time("LATE_AFTER", &raw)?),
            _ => None,
        };
        let auto_checkout_at = match env::var("AUTO_CHECKOUT_AT") {
            Ok(raw) => parse_time("AUTO_CHECKOUT_AT", &raw)?,
            Err(_) => defaults.auto_checkout_at,
        };
        let weekend = match env::var("WEEKEND_DAYS") {
            Ok(raw) => parse_weekend(&raw)?,
            Err(_) => defaults.weekend,
        };

        Ok(Self {
            half_day_threshold_minutes: var_or(
                "HALF_DAY_THRESHOLD_MINUTES",
                defaults.half_day_threshold_minutes,
            )?,
            standard_work_minutes: var_or("STANDARD_WORK_MINUTES", defaults.standard_work_minutes)?,
            late_after,
            hours_per_day: var_or("HOURS_PER_DAY", defaults.hours_per_day)?,
            overtime_multiplier: var_or("OVERTIME_MULTIPLIER", defaults.overtime_multiplier)?,
            auto_checkout_at,
            weekend,
        })
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        Ok(Self {
            server_addr: env::var("SERVER_ADDR").context("SERVER_ADDR must be set")?,
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),
            log_dir: env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string()),
            engine: EngineSettings::from_env()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_payroll_rules() {
        let s = EngineSettings::default();
        assert_eq!(s.half_day_threshold_minutes, 240);
        assert_eq!(s.hours_per_day, Decimal::from(8));
        assert_eq!(s.overtime_multiplier.to_string(), "1.5");
        assert_eq!(s.auto_checkout_at, NaiveTime::from_hms_opt(23, 59, 0).unwrap());
    }

    #[test]
    fn weekend_list_parses() {
        assert_eq!(parse_weekend("Fri, Sat").unwrap(), vec![Weekday::Fri, Weekday::Sat]);
        assert!(parse_weekend("Sat,Caturday").is_err());
        assert!(parse_weekend("").unwrap().is_empty());
    }

    #[test]
    fn times_are_hh_mm() {
        assert_eq!(
            parse_time("LATE_AFTER", "09:30").unwrap(),
            NaiveTime::from_hms_opt(9, 30, 0).unwrap()
        );
        assert!(parse_time("LATE_AFTER", "9.30am").is_err());
    }
}
