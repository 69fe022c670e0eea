use std::{collections::HashMap, path::Path};

use serde::Deserialize;

use super::{Category, ContentStore, Error, Post, PostQuery, Sort, PAGE_SIZE};

/// An in-memory [`ContentStore`] that evaluates listing queries the same way
/// the CMS does.
///
/// Used for offline development (`CONTENT_FIXTURES`) and in tests.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct MemoryStore {
	#[serde(default)]
	posts: Vec<Post>,
	/// Categories that exist in the CMS, even without posts.
	#[serde(default)]
	categories: Vec<String>,
	/// Plain-text bodies by slug.
	#[serde(default)]
	bodies: HashMap<String, String>,
}

impl MemoryStore {
	pub fn new(posts: Vec<Post>) -> Self {
		Self {
			posts,
			..Self::default()
		}
	}

	#[must_use]
	pub fn with_categories(
		mut self,
		categories: impl IntoIterator<Item = impl Into<String>>,
	) -> Self {
		self.categories = categories.into_iter().map(Into::into).collect();
		self
	}

	#[must_use]
	pub fn with_body(mut self, slug: impl Into<String>, body: impl Into<String>) -> Self {
		self.bodies.insert(slug.into(), body.into());
		self
	}

	/// Loads a fixture file of the shape `{ "posts": [], "categories": [], "bodies": {} }`.
	pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, Error> {
		let raw = std::fs::read_to_string(path).map_err(|e| Error::Fixtures(e.to_string()))?;

		serde_json::from_str(&raw).map_err(|e| Error::Fixtures(e.to_string()))
	}

	fn matches(query: &PostQuery, post: &Post) -> bool {
		if let Category::Named(category) = &query.category {
			if !post.categories.contains(category) {
				return false;
			}
		}

		if !query.tags.is_empty() && !post.tags.iter().any(|tag| query.tags.contains(tag)) {
			return false;
		}

		let search = query.search.trim().to_lowercase();

		if !search.is_empty() {
			let found = [
				Some(post.title.as_str()),
				post.description.as_deref(),
				post.author_name(),
			]
			.into_iter()
			.flatten()
			.any(|field| field.to_lowercase().contains(&search));

			if !found {
				return false;
			}
		}

		match (query.cursor, query.sort) {
			(Some(cursor), Sort::Newest) => post.published_at < cursor,
			(Some(cursor), Sort::Oldest) => post.published_at > cursor,
			(None, _) => true,
		}
	}
}

#[async_trait::async_trait]
impl ContentStore for MemoryStore {
	async fn posts(&self, query: &PostQuery) -> Result<Vec<Post>, Error> {
		let mut posts = self
			.posts
			.iter()
			.filter(|post| Self::matches(query, post))
			.cloned()
			.collect::<Vec<_>>();

		posts.sort_by_key(|post| post.published_at);

		if query.sort == Sort::Newest {
			posts.reverse();
		}

		posts.truncate(PAGE_SIZE);

		Ok(posts)
	}

	async fn categories(&self) -> Result<Vec<String>, Error> {
		let mut categories = self.categories.clone();

		categories.sort();
		categories.dedup();

		Ok(categories)
	}

	async fn post(&self, slug: &str) -> Result<Option<Post>, Error> {
		Ok(self
			.posts
			.iter()
			.find(|post| post.slug.as_deref() == Some(slug))
			.cloned())
	}

	async fn body_text(&self, slug: &str) -> Result<Option<String>, Error> {
		Ok(self.bodies.get(slug).cloned())
	}
}

#[cfg(test)]
mod test {
	use chrono::{Duration, TimeZone, Utc};

	use super::*;
	use crate::content::Author;

	fn posts(count: usize) -> Vec<Post> {
		let start = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();

		(0..count)
			.map(|i| Post {
				id: format!("post-{i}"),
				title: format!("Yazı {i}"),
				slug: Some(format!("yazi-{i}")),
				published_at: start + Duration::days(i64::try_from(i).unwrap()),
				description: None,
				main_image: None,
				author: Some(Author {
					name: if i % 2 == 0 { "Ayşe".into() } else { "Mehmet".into() },
					image_url: None,
				}),
				categories: vec![if i % 3 == 0 { "Kültür".into() } else { "Teknoloji".into() }],
				tags: vec![format!("t{}", i % 4)],
			})
			.collect()
	}

	#[tokio::test]
	async fn test_pages_follow_cursor() {
		let store = MemoryStore::new(posts(30));
		let query = PostQuery::default();

		let first = store.posts(&query).await.unwrap();
		assert_eq!(first.len(), PAGE_SIZE);
		assert_eq!(first[0].id, "post-29");

		let second = store
			.posts(&query.after(first.last().unwrap().published_at))
			.await
			.unwrap();
		assert_eq!(second.len(), 6);
		assert_eq!(second.last().unwrap().id, "post-0");
	}

	#[tokio::test]
	async fn test_filters() {
		let store = MemoryStore::new(posts(12));

		let query = PostQuery {
			category: Category::Named("Kültür".into()),
			tags: ["t0".to_string()].into(),
			search: "ayş".into(),
			..PostQuery::default()
		};

		let found = store.posts(&query).await.unwrap();

		assert_eq!(
			found.iter().map(|p| p.id.as_str()).collect::<Vec<_>>(),
			["post-0"]
		);
	}
}
