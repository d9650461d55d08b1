// std
use std::time::Duration;
// self
use crate::{_prelude::*, error::ConfigError};

/// Reservoir budget applied to every call sharing a credential key.
///
/// Serializes as the `apiRateLimit` camelCase shape with the interval in milliseconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitSettings {
	/// Calls permitted before queuing begins.
	pub reservoir: u32,
	/// Window length in milliseconds after which the reservoir is restored.
	pub reservoir_refresh_interval: u64,
	/// Reservoir value restored at every window boundary.
	pub reservoir_refresh_amount: u32,
}
impl RateLimitSettings {
	/// Supplier API default: 30 calls per minute.
	pub const DEFAULT: Self =
		Self { reservoir: 30, reservoir_refresh_interval: 60_000, reservoir_refresh_amount: 30 };
	/// Multiple of the refresh interval a call may stay queued.
	pub const TIMEOUT_FACTOR: u32 = 3;

	/// Creates settings from a capacity, window, and refill amount.
	pub fn new(reservoir: u32, interval: Duration, refresh_amount: u32) -> Self {
		Self {
			reservoir,
			reservoir_refresh_interval: u64::try_from(interval.as_millis()).unwrap_or(u64::MAX),
			reservoir_refresh_amount: refresh_amount,
		}
	}

	/// Window length as a [`Duration`].
	pub fn refresh_interval(&self) -> Duration {
		Duration::from_millis(self.reservoir_refresh_interval)
	}

	/// Queue timeout derived from the refresh interval.
	pub fn timeout(&self) -> Duration {
		self.refresh_interval().saturating_mul(Self::TIMEOUT_FACTOR)
	}

	/// Rejects settings that can never release a queued call.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.reservoir_refresh_interval == 0 {
			return Err(ConfigError::InvalidRateLimit {
				reason: "reservoirRefreshInterval must be positive",
			});
		}
		if self.reservoir == 0 && self.reservoir_refresh_amount == 0 {
			return Err(ConfigError::InvalidRateLimit {
				reason: "reservoir and reservoirRefreshAmount cannot both be zero",
			});
		}

		Ok(())
	}
}
impl Default for RateLimitSettings {
	fn default() -> Self {
		Self::DEFAULT
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn defaults_match_supplier_budget() {
		let settings = RateLimitSettings::default();

		assert_eq!(settings.reservoir, 30);
		assert_eq!(settings.refresh_interval(), Duration::from_secs(60));
		assert_eq!(settings.timeout(), Duration::from_secs(180));
	}

	#[test]
	fn settings_deserialize_from_api_rate_limit_shape() {
		let settings: RateLimitSettings = serde_json::from_value(serde_json::json!({
			"reservoir": 5,
			"reservoirRefreshInterval": 1000,
			"reservoirRefreshAmount": 5,
		}))
		.expect("apiRateLimit JSON should deserialize.");

		assert_eq!(settings, RateLimitSettings::new(5, Duration::from_secs(1), 5));
		assert_eq!(settings.timeout(), Duration::from_secs(3));
	}

	#[test]
	fn validation_rejects_dead_limiters() {
		assert!(RateLimitSettings::new(1, Duration::ZERO, 1).validate().is_err());
		assert!(RateLimitSettings::new(0, Duration::from_secs(1), 0).validate().is_err());
		assert!(RateLimitSettings::new(0, Duration::from_secs(1), 1).validate().is_ok());
	}
}
