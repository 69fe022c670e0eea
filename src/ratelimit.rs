use std::{sync::Arc, time::Duration};

use axum::{
	body::Body,
	response::{IntoResponse, Response},
};
use governor::{
	clock::QuantaInstant,
	middleware::{RateLimitingMiddleware, StateInformationMiddleware},
};
use tower_governor::{
	governor::{GovernorConfig, GovernorConfigBuilder},
	key_extractor::{KeyExtractor, PeerIpKeyExtractor},
	GovernorError,
};

use crate::{
	config::{ConfigError, RateLimitConfig},
	error::AppError,
};

pub type Config = Arc<GovernorConfig<PeerIpKeyExtractor, StateInformationMiddleware>>;

/// Per-IP limits: one for the whole API, a stricter one for poster rendering.
#[derive(Clone)]
pub struct Limits {
	pub default: Config,
	pub render: Config,
}

impl Limits {
	pub fn new(config: &RateLimitConfig) -> Result<Self, ConfigError> {
		let default = GovernorConfigBuilder::default()
			.per_second(config.replenish_seconds)
			.burst_size(config.burst_size)
			.use_headers()
			.error_handler(error_handler)
			.finish()
			.ok_or(ConfigError::Invalid {
				name: "RATE_LIMIT_REPLENISH_SECONDS",
				value: config.replenish_seconds.to_string(),
			})?;

		let render = GovernorConfigBuilder::default()
			.per_second(config.render_replenish_seconds)
			.burst_size(config.render_burst_size)
			.use_headers()
			.error_handler(error_handler)
			.finish()
			.ok_or(ConfigError::Invalid {
				name: "RATE_LIMIT_RENDER_REPLENISH_SECONDS",
				value: config.render_replenish_seconds.to_string(),
			})?;

		Ok(Self {
			default: Arc::new(default),
			render: Arc::new(render),
		})
	}
}

fn error_handler(error: GovernorError) -> Response<Body> {
	AppError::from(error).into_response()
}

/// Periodically drops the state of clients that have not been seen recently.
pub fn cleanup_old_limits<T, M>(configs: &[&Arc<GovernorConfig<T, M>>])
where
	T: KeyExtractor,
	<T as KeyExtractor>::Key: Send + Sync + 'static,
	M: RateLimitingMiddleware<QuantaInstant> + Send + Sync + 'static,
{
	let limiters = configs
		.iter()
		.map(|config| config.limiter().clone())
		.collect::<Vec<_>>();
	let interval = Duration::from_secs(60);

	std::thread::spawn(move || loop {
		std::thread::sleep(interval);

		for limiter in &limiters {
			tracing::debug!(size = limiter.len(), "rate limiting storage");

			limiter.retain_recent();
		}
	});
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn test_zero_rate_is_rejected() {
		let result = Limits::new(&RateLimitConfig {
			replenish_seconds: 0,
			burst_size: 50,
			render_replenish_seconds: 5,
			render_burst_size: 4,
		});

		assert!(matches!(
			result,
			Err(ConfigError::Invalid {
				name: "RATE_LIMIT_REPLENISH_SECONDS",
				..
			})
		));
	}

	#[test]
	fn test_limits_from_config() {
		assert!(Limits::new(&RateLimitConfig {
			replenish_seconds: 1,
			burst_size: 50,
			render_replenish_seconds: 5,
			render_burst_size: 4,
		})
		.is_ok());
	}
}
