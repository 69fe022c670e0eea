use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use validator::Validate;

pub use crate::{blog::Excerpt, content::Post};
use crate::{
	content::{Category, PostQuery, Sort, PAGE_SIZE},
	poster::PosterVariant,
};

/// Filters for the post listing. Every filter is optional and they combine with AND.
#[derive(Debug, Default, Deserialize, Validate, JsonSchema)]
pub struct ListPostsInput {
	/// Only posts in this category. "Hepsi" means every category.
	#[validate(length(max = 100))]
	pub category: Option<String>,
	/// Comma-separated tags; posts carrying any of them match.
	#[validate(length(max = 500))]
	pub tags: Option<String>,
	/// Case-insensitive search across title, description and author name.
	#[validate(length(max = 200))]
	pub q: Option<String>,
	/// The `nextCursor` of the previous page.
	pub cursor: Option<DateTime<Utc>>,
	pub sort: Option<Sort>,
}

impl ListPostsInput {
	pub fn query(&self) -> PostQuery {
		PostQuery {
			category: self
				.category
				.as_deref()
				.map_or(Category::All, Category::from_label),
			tags: self
				.tags
				.iter()
				.flat_map(|tags| tags.split(','))
				.map(str::trim)
				.filter(|tag| !tag.is_empty())
				.map(str::to_owned)
				.collect::<BTreeSet<_>>(),
			search: self.q.as_deref().unwrap_or_default().trim().to_owned(),
			cursor: self.cursor,
			sort: self.sort.unwrap_or_default(),
		}
	}
}

/// One page of posts.
#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PostPage {
	pub posts: Vec<Post>,
	/// Pass as `cursor` to fetch the next page.
	pub next_cursor: Option<DateTime<Utc>>,
	/// False once a page comes back shorter than the page size.
	pub has_more: bool,
}

impl From<Vec<Post>> for PostPage {
	fn from(posts: Vec<Post>) -> Self {
		let has_more = posts.len() == PAGE_SIZE;

		Self {
			next_cursor: posts.last().filter(|_| has_more).map(|post| post.published_at),
			has_more,
			posts,
		}
	}
}

#[derive(Debug, Deserialize, Validate, JsonSchema)]
pub struct SlugInput {
	#[validate(length(min = 1, max = 200))]
	pub slug: String,
}

#[derive(Debug, Deserialize, Validate, JsonSchema)]
pub struct PosterPath {
	#[validate(length(min = 1, max = 200))]
	pub slug: String,
	pub variant: PosterVariant,
}

/// What the native share sheet receives.
#[derive(Debug, Serialize, JsonSchema)]
pub struct ShareData {
	pub title: String,
	pub text: String,
	pub url: String,
}

#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PosterSummary {
	pub variant: PosterVariant,
	/// A human-readable name, e.g. "Story • Dark".
	pub label: String,
	pub file_name: String,
	/// The rendered PNG, or null if this variant failed to render.
	pub data_url: Option<String>,
}

/// Every poster variant of a post, plus what is needed to share it.
#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PosterSheet {
	pub permalink: String,
	pub share: ShareData,
	pub posters: Vec<PosterSummary>,
}
