//! Booking rules configuration

use chrono::FixedOffset;
use serde::Deserialize;

use crate::domain::foundation::CurrencyCode;
use crate::domain::reservation::{BlockingPolicy, ExtensionPolicy};

use super::error::ValidationError;

const MAX_UTC_OFFSET_MINUTES: i32 = 14 * 60;
const MAX_HOURLY_RATE: i64 = 1_000_000;
const MAX_EXTENSION_HOURS: i64 = 24 * 365;
const MAX_FUTURE_DAYS: i64 = 10 * 365;

/// Tariff, limits and local time for the property
#[derive(Debug, Clone, Deserialize)]
pub struct BookingConfig {
    /// Price per started hour in whole currency units
    #[serde(default = "default_hourly_rate")]
    pub hourly_rate: i64,

    /// ISO 4217 code used for extension quotes
    #[serde(default = "default_currency")]
    pub currency: String,

    /// Longest single extension
    #[serde(default = "default_max_extension_hours")]
    pub max_extension_hours: i64,

    /// How far ahead a reservation may end
    #[serde(default = "default_max_future_days")]
    pub max_future_days: i64,

    /// Which statuses hold a slot against new reservations
    #[serde(default)]
    pub blocking_policy: BlockingPolicy,

    /// Property offset from UTC, used for statistics windows
    #[serde(default)]
    pub utc_offset_minutes: i32,
}

impl BookingConfig {
    pub fn currency_code(&self) -> Result<CurrencyCode, ValidationError> {
        CurrencyCode::new(&self.currency).map_err(|_| ValidationError::InvalidCurrency)
    }

    pub fn utc_offset(&self) -> Result<FixedOffset, ValidationError> {
        if self.utc_offset_minutes.abs() > MAX_UTC_OFFSET_MINUTES {
            return Err(ValidationError::InvalidUtcOffset);
        }
        FixedOffset::east_opt(self.utc_offset_minutes * 60).ok_or(ValidationError::InvalidUtcOffset)
    }

    pub fn extension_policy(&self) -> Result<ExtensionPolicy, ValidationError> {
        Ok(ExtensionPolicy {
            hourly_rate: self.hourly_rate,
            currency: self.currency_code()?,
            max_extension_hours: self.max_extension_hours,
            max_future_days: self.max_future_days,
        })
    }

    /// Validate booking configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(1..=MAX_HOURLY_RATE).contains(&self.hourly_rate) {
            return Err(ValidationError::InvalidHourlyRate);
        }
        if !(1..=MAX_EXTENSION_HOURS).contains(&self.max_extension_hours)
            || !(1..=MAX_FUTURE_DAYS).contains(&self.max_future_days)
        {
            return Err(ValidationError::InvalidExtensionLimit);
        }
        self.currency_code()?;
        self.utc_offset()?;
        Ok(())
    }
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            hourly_rate: default_hourly_rate(),
            currency: default_currency(),
            max_extension_hours: default_max_extension_hours(),
            max_future_days: default_max_future_days(),
            blocking_policy: BlockingPolicy::default(),
            utc_offset_minutes: 0,
        }
    }
}

fn default_hourly_rate() -> i64 {
    25
}

fn default_currency() -> String {
    "eur".to_string()
}

fn default_max_extension_hours() -> i64 {
    24
}

fn default_max_future_days() -> i64 {
    30
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_booking_defaults() {
        let config = BookingConfig::default();
        assert_eq!(config.hourly_rate, 25);
        assert_eq!(config.blocking_policy, BlockingPolicy::ConfirmedOnly);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_extension_policy_from_config() {
        let policy = BookingConfig::default().extension_policy().unwrap();
        assert_eq!(policy.currency.as_str(), "eur");
        assert_eq!(policy.max_extension_hours, 24);
        assert_eq!(policy.max_future_days, 30);
    }

    #[test]
    fn test_utc_offset() {
        let config = BookingConfig {
            utc_offset_minutes: 120,
            ..Default::default()
        };
        assert_eq!(config.utc_offset().unwrap().local_minus_utc(), 7200);

        let config = BookingConfig {
            utc_offset_minutes: 15 * 60,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ValidationError::InvalidUtcOffset));
    }

    #[test]
    fn test_validation_rejects_free_hours() {
        let config = BookingConfig {
            hourly_rate: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ValidationError::InvalidHourlyRate));
    }

    #[test]
    fn test_validation_bounds_rates_and_limits() {
        let config = BookingConfig {
            hourly_rate: i64::MAX,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ValidationError::InvalidHourlyRate));

        let config = BookingConfig {
            max_extension_hours: i64::MAX / 1000,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ValidationError::InvalidExtensionLimit));

        let config = BookingConfig {
            max_future_days: 100_000,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ValidationError::InvalidExtensionLimit));
    }

    #[test]
    fn test_validation_rejects_bad_currency() {
        let config = BookingConfig {
            currency: "euro".to_string(),
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ValidationError::InvalidCurrency));
    }
}
