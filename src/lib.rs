#![warn(clippy::pedantic)]

pub mod archive;
pub mod blog;
pub mod config;
pub mod content;
pub mod error;
pub mod extract;
pub mod openapi;
pub mod poster;
pub mod ratelimit;
pub mod route;
pub mod trace;


use std::{sync::Arc, time::Duration};

use aide::{axum::ApiRouter, openapi::OpenApi};
use axum::{Extension, Router};
use tower_http::{
	compression::CompressionLayer,
	request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
	trace::TraceLayer,
};

use crate::{
	archive::DriveArchive,
	config::{Config, ContentSource},
	content::{ContentStore, MemoryStore, SanityClient},
	poster::{BusiestCell, PosterRenderer, PosterStudio},
};

pub use error::AppError;

/// The content store every route reads from.
pub type Store = Arc<dyn ContentStore>;
pub type AppState = State;

/// The shared application state.
///
/// Handlers extract single fields (such as [`Store`]) where they can, and
/// the whole state when they need more than one.
#[derive(Clone, axum::extract::FromRef)]
pub struct State {
	pub content: Store,
	/// `None` when no Drive credentials are configured.
	pub archive: Option<Arc<DriveArchive>>,
	pub posters: PosterStudio,
	/// Public origin of the website, without a trailing slash.
	pub site_origin: Arc<str>,
}

impl State {
	pub fn from_config(config: &Config) -> Result<Self, content::Error> {
		let http = reqwest::Client::builder()
			.user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
			.timeout(Duration::from_secs(15))
			.build()?;

		let content: Store = match &config.content {
			ContentSource::Sanity(sanity) => Arc::new(SanityClient::new(http.clone(), sanity)?),
			ContentSource::Fixtures(path) => {
				tracing::info!(path = %path.display(), "serving posts from fixtures");
				Arc::new(MemoryStore::from_json_file(path)?)
			}
		};

		let archive = config
			.drive
			.clone()
			.map(|drive| Arc::new(DriveArchive::new(http.clone(), drive)));

		let posters = PosterStudio::new(
			Arc::new(PosterRenderer::new(&config.poster)),
			Arc::new(BusiestCell::default()),
			http,
			config.poster.fallback_image_url.clone(),
		);

		Ok(Self {
			content,
			archive,
			posters,
			site_origin: config.site_origin.as_str().into(),
		})
	}
}

/// Builds the API router with its documentation.
///
/// Rate limiting keys on the peer address, so `limits` should only be given
/// when the router is served with connect info.
pub fn app(state: AppState, limits: Option<&ratelimit::Limits>) -> Router {
	let mut api = OpenApi::default();

	aide::gen::extract_schemas(true);

	ApiRouter::new()
		.nest("/posts", route::post::routes(limits.map(|limits| limits.render.clone())))
		.nest("/archives", route::archive::routes())
		.nest("/docs", route::docs::routes())
		.finish_api_with(&mut api, openapi::docs)
		.layer(Extension(Arc::new(api)))
		.layer(CompressionLayer::new())
		.layer(PropagateRequestIdLayer::x_request_id())
		.layer(TraceLayer::new_for_http())
		.layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
		.with_state(state)
}
