//! Application configuration loaded from environment variables.
//!
//! A `.env` file is read first (see [`dotenvy`]), so local development can
//! keep credentials out of the shell.

use std::{env, path::PathBuf, str::FromStr};

use crate::blog::preview::FALLBACK_IMAGE;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
	#[error("{0} must be set")]
	Missing(&'static str),
	#[error("{name} is invalid: {value:?}")]
	Invalid { name: &'static str, value: String },
}

/// Connection settings for the Sanity content store.
#[derive(Debug, Clone)]
pub struct SanityConfig {
	pub project_id: String,
	pub dataset: String,
	pub api_version: String,
	/// Reads go through the CDN in production.
	pub use_cdn: bool,
	pub token: Option<String>,
	/// Overrides `https://{project_id}.api.sanity.io`.
	pub api_host: Option<String>,
}

/// Google Drive folders holding the archived issues and their thumbnails.
#[derive(Debug, Clone)]
pub struct DriveConfig {
	pub api_key: String,
	pub pdf_folder_id: String,
	pub thumbnail_folder_id: String,
	pub api_base: String,
}

#[derive(Debug, Clone)]
pub struct PosterConfig {
	/// Supersampling factor applied to the 1080x1920 base size.
	pub scale: f32,
	pub brand: String,
	pub logo_path: Option<PathBuf>,
	/// Used when a post has no main image. Defaults to the site logo.
	pub fallback_image_url: Option<String>,
}

/// Per-IP quotas. One request is replenished every `*_replenish_seconds`.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
	pub replenish_seconds: u64,
	pub burst_size: u32,
	/// Applies to poster rendering.
	pub render_replenish_seconds: u64,
	pub render_burst_size: u32,
}

/// Where posts come from.
#[derive(Debug, Clone)]
pub enum ContentSource {
	Sanity(SanityConfig),
	/// A local fixture file served by the in-memory store.
	Fixtures(PathBuf),
}

#[derive(Debug, Clone)]
pub struct Config {
	pub host: String,
	pub port: u16,
	/// Public origin of the website, used to build permalinks.
	pub site_origin: String,
	pub log_level: String,
	pub otel_enabled: bool,
	pub content: ContentSource,
	/// The archive is disabled when no Drive credentials are configured.
	pub drive: Option<DriveConfig>,
	pub poster: PosterConfig,
	pub rate_limit: RateLimitConfig,
}

impl Config {
	/// Loads configuration from the environment.
	pub fn from_env() -> Result<Self, ConfigError> {
		let content = match optional("CONTENT_FIXTURES") {
			Some(path) => ContentSource::Fixtures(path.into()),
			None => ContentSource::Sanity(SanityConfig {
				project_id: required("SANITY_PROJECT_ID")?,
				dataset: optional("SANITY_DATASET").unwrap_or_else(|| "production".into()),
				api_version: optional("SANITY_API_VERSION").unwrap_or_else(|| "2024-01-01".into()),
				use_cdn: parsed("SANITY_USE_CDN", !cfg!(debug_assertions))?,
				token: optional("SANITY_TOKEN"),
				api_host: optional("SANITY_API_HOST"),
			}),
		};

		let drive = match optional("GOOGLE_DRIVE_API_KEY") {
			Some(api_key) => Some(DriveConfig {
				api_key,
				pdf_folder_id: required("GOOGLE_DRIVE_FOLDER_ID")?,
				thumbnail_folder_id: required("GOOGLE_DRIVE_THUMBNAIL_FOLDER_ID")?,
				api_base: optional("GOOGLE_DRIVE_API_BASE")
					.unwrap_or_else(|| "https://www.googleapis.com/drive/v3".into()),
			}),
			None => None,
		};

		let scale: f32 = parsed("POSTER_SCALE", 2.0)?;

		if !(0.1..=4.0).contains(&scale) {
			return Err(ConfigError::Invalid {
				name: "POSTER_SCALE",
				value: scale.to_string(),
			});
		}

		let site_origin = optional("SITE_ORIGIN")
			.unwrap_or_else(|| "http://localhost:3000".into())
			.trim_end_matches('/')
			.to_owned();

		let fallback_image_url = optional("POSTER_FALLBACK_IMAGE_URL")
			.unwrap_or_else(|| site_image(&site_origin, FALLBACK_IMAGE));

		Ok(Self {
			host: optional("HOST").unwrap_or_else(|| "127.0.0.1".into()),
			port: parsed("PORT", 3000)?,
			site_origin,
			log_level: optional("LOG_LEVEL").unwrap_or_else(|| "info".into()),
			otel_enabled: parsed("OTEL_ENABLED", false)?,
			content,
			drive,
			poster: PosterConfig {
				scale,
				brand: optional("POSTER_BRAND").unwrap_or_else(|| "MDBlog".into()),
				logo_path: optional("POSTER_LOGO_PATH").map(PathBuf::from),
				fallback_image_url: Some(fallback_image_url),
			},
			rate_limit: RateLimitConfig {
				replenish_seconds: parsed("RATE_LIMIT_REPLENISH_SECONDS", 1)?,
				burst_size: parsed("RATE_LIMIT_BURST", 50)?,
				render_replenish_seconds: parsed("RATE_LIMIT_RENDER_REPLENISH_SECONDS", 5)?,
				render_burst_size: parsed("RATE_LIMIT_RENDER_BURST", 4)?,
			},
		})
	}
}

/// Resolves a site-relative image path such as `/logoBig.webp` against the origin.
fn site_image(site_origin: &str, path: &str) -> String {
	format!("{site_origin}{path}")
}

fn optional(name: &'static str) -> Option<String> {
	env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn required(name: &'static str) -> Result<String, ConfigError> {
	optional(name).ok_or(ConfigError::Missing(name))
}

fn parsed<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
	match optional(name) {
		Some(value) => value
			.trim()
			.parse()
			.map_err(|_| ConfigError::Invalid { name, value }),
		None => Ok(default),
	}
}
