use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};

/// A single blog post, as projected out of the content store.
///
/// Posts are authored entirely in the CMS; this service only reads them.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Post {
	/// The document id of the post.
	#[serde(alias = "_id")]
	pub id: String,
	/// The title of the post.
	#[serde(default, deserialize_with = "null_as_default")]
	pub title: String,
	/// The URL slug, if one has been assigned.
	#[serde(default)]
	pub slug: Option<String>,
	/// The publication time, also used as the pagination cursor.
	pub published_at: DateTime<Utc>,
	/// A short summary written by the author.
	#[serde(default)]
	pub description: Option<String>,
	#[serde(default)]
	pub main_image: Option<Image>,
	#[serde(default)]
	pub author: Option<Author>,
	/// Category titles.
	#[serde(default, deserialize_with = "compact_strings")]
	pub categories: Vec<String>,
	/// Free-form tags, either plain strings or titles of tag documents.
	#[serde(default, deserialize_with = "compact_strings")]
	pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Image {
	pub url: String,
	#[serde(default)]
	pub alt: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Author {
	#[serde(default, deserialize_with = "null_as_default")]
	pub name: String,
	#[serde(default)]
	pub image_url: Option<String>,
}

impl Post {
	pub fn image_url(&self) -> Option<&str> {
		self.main_image.as_ref().map(|image| image.url.as_str())
	}

	pub fn author_name(&self) -> Option<&str> {
		self.author
			.as_ref()
			.map(|author| author.name.as_str())
			.filter(|name| !name.is_empty())
	}
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
	D: Deserializer<'de>,
	T: Default + Deserialize<'de>,
{
	Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Dereferenced arrays come back with `null` holes for dangling references.
fn compact_strings<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
	D: Deserializer<'de>,
{
	let values = Option::<Vec<Option<String>>>::deserialize(deserializer)?;

	Ok(values
		.unwrap_or_default()
		.into_iter()
		.flatten()
		.filter(|value| !value.is_empty())
		.collect())
}
