//! Read access to the headless CMS that holds posts and categories.

pub mod memory;
pub mod model;
pub mod query;
pub mod sanity;

pub use memory::MemoryStore;
pub use model::{Author, Image, Post};
pub use query::{Category, PostQuery, Sort, PAGE_SIZE};
pub use sanity::SanityClient;

/// An error that can occur while talking to the content store.
#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("content store request failed: {0}")]
	Http(#[from] reqwest::Error),
	#[error("content store rejected the query ({status}): {message}")]
	Query { status: u16, message: String },
	#[error("invalid content store endpoint: {0}")]
	Endpoint(String),
	#[error("failed to read fixtures: {0}")]
	Fixtures(String),
}

/// The queries the blog needs from the content store.
///
/// Implemented by [`SanityClient`] in production and [`MemoryStore`] for
/// offline development and tests.
#[async_trait::async_trait]
pub trait ContentStore: Send + Sync {
	/// Returns one page (at most [`PAGE_SIZE`] posts) matching the query.
	async fn posts(&self, query: &PostQuery) -> Result<Vec<Post>, Error>;

	/// Returns every category title, including categories without posts.
	async fn categories(&self) -> Result<Vec<String>, Error>;

	/// Returns a single post by its slug.
	async fn post(&self, slug: &str) -> Result<Option<Post>, Error>;

	/// Returns the plain-text body of a post by its slug.
	async fn body_text(&self, slug: &str) -> Result<Option<String>, Error>;
}
