//! Story-format share posters for blog posts.
//!
//! A post is rendered once per [`PosterVariant`]. Variants are rendered
//! concurrently and settle independently, so one failed variant never hides
//! the others.

pub mod focal;
pub mod render;
pub mod variant;

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine as _};

pub use focal::{BusiestCell, FocalPoint, FocalStrategy};
pub use render::{PosterRenderer, PreparedImage};
pub use variant::{PosterVariant, Theme};

use crate::{blog::preview::UNTITLED, content::Post};

pub const BASE_WIDTH: u32 = 1080;
pub const BASE_HEIGHT: u32 = 1920;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("cannot allocate a {width}x{height} canvas")]
	Canvas { width: u32, height: u32 },
	#[error("failed to decode image: {0}")]
	Decode(#[from] image::ImageError),
	#[error("failed to encode poster: {0}")]
	Encode(String),
	#[error("failed to load logo: {0}")]
	Logo(String),
	#[error("font system lock poisoned")]
	Poisoned,
}

/// Everything drawn on a poster, shared by all variants.
#[derive(Debug, Clone, Default)]
pub struct PosterInput {
	pub title: String,
	pub author: Option<String>,
	pub description: Option<String>,
	pub image: Option<PreparedImage>,
}

impl PosterInput {
	pub fn from_post(post: &Post, image: Option<PreparedImage>) -> Self {
		let non_empty = |value: Option<&str>| {
			value
				.map(str::trim)
				.filter(|v| !v.is_empty())
				.map(str::to_owned)
		};

		Self {
			title: non_empty(Some(post.title.as_str())).unwrap_or_else(|| UNTITLED.into()),
			author: non_empty(post.author_name()),
			description: non_empty(post.description.as_deref()),
			image,
		}
	}
}

/// Something that can draw a single poster variant to PNG bytes.
pub trait PosterRender: Send + Sync + 'static {
	fn render(&self, input: &PosterInput, variant: PosterVariant) -> Result<Vec<u8>, Error>;
}

/// The outcome of rendering one variant.
#[derive(Debug, Clone)]
pub struct Poster {
	pub variant: PosterVariant,
	/// `None` when this variant failed to render.
	pub png: Option<Vec<u8>>,
}

impl Poster {
	pub fn data_url(&self) -> Option<String> {
		self.png.as_deref().map(data_url)
	}
}

pub fn data_url(png: &[u8]) -> String {
	format!("data:image/png;base64,{}", STANDARD.encode(png))
}

/// The download name of a poster, e.g. `merhaba-story-dark.png`.
pub fn file_name(slug: Option<&str>, variant: PosterVariant) -> String {
	format!("{}-{}.png", slug.unwrap_or("mdblog"), variant.name())
}

async fn render_one(
	renderer: Arc<dyn PosterRender>,
	input: Arc<PosterInput>,
	variant: PosterVariant,
) -> Poster {
	let started = std::time::Instant::now();

	let png = match tokio::task::spawn_blocking(move || renderer.render(&input, variant)).await {
		Ok(Ok(png)) => {
			tracing::debug!(
				histogram.poster_render_ms = started.elapsed().as_secs_f64() * 1000.0,
				%variant,
				bytes = png.len(),
				"rendered poster"
			);
			Some(png)
		}
		Ok(Err(error)) => {
			tracing::warn!(%error, %variant, "poster variant failed to render");
			None
		}
		Err(error) => {
			tracing::error!(%error, %variant, "poster render task panicked");
			None
		}
	};

	Poster { variant, png }
}

/// Renders every variant concurrently.
pub async fn render_all(renderer: Arc<dyn PosterRender>, input: Arc<PosterInput>) -> Vec<Poster> {
	futures::future::join_all(
		PosterVariant::ALL
			.into_iter()
			.map(|variant| render_one(renderer.clone(), input.clone(), variant)),
	)
	.await
}

/// Fetches cover images and renders posters for posts.
#[derive(Clone)]
pub struct PosterStudio {
	renderer: Arc<dyn PosterRender>,
	focal: Arc<dyn FocalStrategy>,
	http: reqwest::Client,
	fallback_image_url: Option<String>,
}

impl PosterStudio {
	pub fn new(
		renderer: Arc<dyn PosterRender>,
		focal: Arc<dyn FocalStrategy>,
		http: reqwest::Client,
		fallback_image_url: Option<String>,
	) -> Self {
		Self {
			renderer,
			focal,
			http,
			fallback_image_url,
		}
	}

	async fn download(&self, url: &str) -> Result<bytes::Bytes, reqwest::Error> {
		self.http.get(url).send().await?.error_for_status()?.bytes().await
	}

	/// Loads the post's main image, or the fallback image. A missing or
	/// broken image yields a poster without one.
	#[tracing::instrument(skip(self, post), fields(post = %post.id))]
	async fn cover(&self, post: &Post) -> Option<PreparedImage> {
		let url = post.image_url().or(self.fallback_image_url.as_deref())?;

		let bytes = match self.download(url).await {
			Ok(bytes) => bytes,
			Err(error) => {
				tracing::warn!(%error, url, "failed to download cover image");
				return None;
			}
		};

		let focal = self.focal.clone();

		let decoded =
			tokio::task::spawn_blocking(move || PreparedImage::decode(&bytes, focal.as_ref()))
				.await;

		match decoded {
			Ok(Ok(image)) => Some(image),
			Ok(Err(error)) => {
				tracing::warn!(%error, url, "failed to decode cover image");
				None
			}
			Err(error) => {
				tracing::error!(%error, "cover decode task panicked");
				None
			}
		}
	}

	pub async fn input(&self, post: &Post) -> Arc<PosterInput> {
		Arc::new(PosterInput::from_post(post, self.cover(post).await))
	}

	/// Renders all variants of the post.
	pub async fn render_post(&self, post: &Post) -> Vec<Poster> {
		render_all(self.renderer.clone(), self.input(post).await).await
	}

	/// Renders a single variant of the post.
	pub async fn render_variant(&self, post: &Post, variant: PosterVariant) -> Poster {
		render_one(self.renderer.clone(), self.input(post).await, variant).await
	}
}
