//! GROQ query construction for the blog listing.
//!
//! Every optional filter contributes both a clause and the parameter it
//! references, so a clause is never emitted without its parameter and vice
//! versa.

use std::collections::BTreeSet;
use std::fmt::Write as _;

use chrono::{DateTime, SecondsFormat, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// The number of posts requested per page.
pub const PAGE_SIZE: usize = 24;

/// Label of the sentinel category that disables category filtering.
pub const ALL_CATEGORIES: &str = "Hepsi";

const BASE_FILTER: &str = r#"_type == "post" && defined(publishedAt)"#;

const POST_PROJECTION: &str = r#"{
	_id,
	title,
	"slug": slug.current,
	publishedAt,
	description,
	"mainImage": select(defined(mainImage.asset) => {
		"url": mainImage.asset->url,
		"alt": mainImage.alt
	}),
	"author": author->{ name, "imageUrl": image.asset->url },
	"categories": categories[]->title,
	"tags": coalesce(tags[]->title, tags)
}"#;

/// The category filter. [`Category::All`] is the default and emits no clause.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum Category {
	#[default]
	All,
	Named(String),
}

impl Category {
	/// Parses a user-facing label, treating the sentinel and blank labels as [`Category::All`].
	pub fn from_label(label: &str) -> Self {
		let label = label.trim();

		if label.is_empty() || label == ALL_CATEGORIES {
			Self::All
		} else {
			Self::Named(label.to_owned())
		}
	}

	pub fn label(&self) -> &str {
		match self {
			Self::All => ALL_CATEGORIES,
			Self::Named(name) => name,
		}
	}
}

/// Ordering of the listing by publication time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize, JsonSchema)]
pub enum Sort {
	/// Newest first.
	#[default]
	#[serde(rename = "new")]
	Newest,
	/// Oldest first.
	#[serde(rename = "old")]
	Oldest,
}

impl Sort {
	fn order(self) -> &'static str {
		match self {
			Self::Newest => "desc",
			Self::Oldest => "asc",
		}
	}

	fn cursor_operator(self) -> &'static str {
		match self {
			Self::Newest => "<",
			Self::Oldest => ">",
		}
	}
}

/// A query ready to be sent to the content store.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltQuery {
	pub groq: String,
	pub params: Map<String, Value>,
}

/// The filter, sort and cursor state of a single listing request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostQuery {
	pub category: Category,
	pub tags: BTreeSet<String>,
	pub search: String,
	pub cursor: Option<DateTime<Utc>>,
	pub sort: Sort,
}

impl PostQuery {
	/// Returns the same query positioned after `cursor`.
	#[must_use]
	pub fn after(&self, cursor: DateTime<Utc>) -> Self {
		Self {
			cursor: Some(cursor),
			..self.clone()
		}
	}

	/// Builds the filter expression alone, without ordering or projection.
	pub fn filter(&self) -> (String, Map<String, Value>) {
		let mut filter = String::from(BASE_FILTER);
		let mut params = Map::new();

		if let Category::Named(category) = &self.category {
			filter.push_str(" && $cat in categories[]->title");
			params.insert("cat".into(), json!(category));
		}

		if !self.tags.is_empty() {
			filter.push_str(concat!(
				" && count(array::compact(coalesce(tags[]->title, tags))",
				"[@ in $tags]) > 0",
			));
			params.insert("tags".into(), json!(self.tags));
		}

		let search = self.search.trim();

		if !search.is_empty() {
			filter.push_str(concat!(
				" && (title match $q || description match $q",
				" || author->name match $q)",
			));
			params.insert("q".into(), json!(format!("*{search}*")));
		}

		if let Some(cursor) = self.cursor {
			let _ = write!(
				filter,
				" && dateTime(publishedAt) {} dateTime($cursor)",
				self.sort.cursor_operator()
			);
			params.insert("cursor".into(), json!(format_cursor(cursor)));
		}

		(filter, params)
	}

	pub fn build(&self) -> BuiltQuery {
		let (filter, params) = self.filter();

		BuiltQuery {
			groq: format!(
				"*[{filter}] | order(publishedAt {order})[0...{PAGE_SIZE}]{POST_PROJECTION}",
				order = self.sort.order(),
			),
			params,
		}
	}
}

/// Formats a cursor the way the content store writes datetimes.
pub fn format_cursor(cursor: DateTime<Utc>) -> String {
	cursor.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Every category title, including categories with no posts.
pub fn all_categories() -> BuiltQuery {
	BuiltQuery {
		groq: r#"array::unique(*[_type == "category" && defined(title)].title)"#.into(),
		params: Map::new(),
	}
}

/// The plain-text rendering of a post's rich body.
pub fn body_text(slug: &str) -> BuiltQuery {
	BuiltQuery {
		groq: concat!(
			r#"*[_type == "post" && slug.current == $slug][0]"#,
			r#"{ "bodyText": pt::text(body) }"#,
		)
		.into(),
		params: slug_params(slug),
	}
}

/// A single post by slug, with the listing projection.
pub fn post_by_slug(slug: &str) -> BuiltQuery {
	BuiltQuery {
		groq: format!(r#"*[_type == "post" && slug.current == $slug][0]{POST_PROJECTION}"#),
		params: slug_params(slug),
	}
}

fn slug_params(slug: &str) -> Map<String, Value> {
	let mut params = Map::new();
	params.insert("slug".into(), json!(slug));
	params
}
