#![warn(clippy::pedantic)]

use std::net::SocketAddr;

use axum::{
	extract::Request,
	http::{HeaderValue, Method},
	ServiceExt,
};
use mdblog::{config::Config, ratelimit, trace, State};
use tower::Layer;
use tower_governor::GovernorLayer;
use tower_http::{cors::CorsLayer, normalize_path::NormalizePathLayer};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	dotenvy::dotenv().ok();

	let config = Config::from_env()?;
	let _guard = trace::init_tracing_subscriber(&config)?;

	let limits = ratelimit::Limits::new(&config.rate_limit)?;
	ratelimit::cleanup_old_limits(&[&limits.default, &limits.render]);

	let state = State::from_config(&config)?;

	let cors = CorsLayer::new()
		.allow_origin(HeaderValue::from_str(&config.site_origin)?)
		.allow_methods([Method::GET]);

	let app = mdblog::app(state, Some(&limits))
		.layer(GovernorLayer {
			config: limits.default.clone(),
		})
		.layer(cors);
	let app = NormalizePathLayer::trim_trailing_slash().layer(app);

	let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port)).await?;

	tracing::info!(address = %listener.local_addr()?, "listening");

	axum::serve(
		listener,
		ServiceExt::<Request>::into_make_service_with_connect_info::<SocketAddr>(app),
	)
	.await?;

	Ok(())
}
