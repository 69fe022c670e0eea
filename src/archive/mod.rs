//! The archive of past PDF issues, listed from Google Drive.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::config::DriveConfig;

pub const FALLBACK_THUMBNAIL: &str = "/default-thumbnail.jpeg";

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("file listing request failed: {0}")]
	Http(#[from] reqwest::Error),
}

/// A single archived issue of the magazine.
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct ArchivedIssue {
	/// The file name of the PDF, including its extension.
	pub name: String,
	/// A direct download link for the PDF.
	pub url: String,
	/// A cover image, or a placeholder when no thumbnail shares the issue's name.
	pub thumbnail: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
	pub id: String,
	pub name: String,
	#[serde(default)]
	pub created_time: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
struct FileList {
	#[serde(default)]
	files: Vec<DriveFile>,
}

/// Lists issues by pairing PDFs with PNG thumbnails of the same base name.
#[derive(Debug, Clone)]
pub struct DriveArchive {
	http: reqwest::Client,
	config: DriveConfig,
}

impl DriveArchive {
	pub fn new(http: reqwest::Client, config: DriveConfig) -> Self {
		Self { http, config }
	}

	async fn list(&self, folder_id: &str, fields: &str) -> Result<Vec<DriveFile>, Error> {
		let list = self
			.http
			.get(format!("{}/files", self.config.api_base.trim_end_matches('/')))
			.query(&[
				("q", format!("'{folder_id}' in parents")),
				("fields", fields.to_owned()),
				("key", self.config.api_key.clone()),
			])
			.send()
			.await?
			.error_for_status()?
			.json::<FileList>()
			.await?;

		Ok(list.files)
	}

	/// Returns every archived issue, newest first.
	#[tracing::instrument(skip(self))]
	pub async fn issues(&self) -> Result<Vec<ArchivedIssue>, Error> {
		let (pdfs, thumbnails) = futures::try_join!(
			self.list(&self.config.pdf_folder_id, "files(id, name, createdTime)"),
			self.list(&self.config.thumbnail_folder_id, "files(id, name)"),
		)?;

		tracing::debug!(pdfs = pdfs.len(), thumbnails = thumbnails.len(), "listed archive");

		Ok(match_thumbnails(pdfs, &thumbnails))
	}
}

fn base_name<'a>(name: &'a str, extension: &str) -> &'a str {
	name.strip_suffix(extension).unwrap_or(name).trim()
}

/// Pairs each PDF with the thumbnail sharing its base name, newest PDF first.
pub fn match_thumbnails(mut pdfs: Vec<DriveFile>, thumbnails: &[DriveFile]) -> Vec<ArchivedIssue> {
	let thumbnails = thumbnails
		.iter()
		.map(|file| {
			(
				base_name(&file.name, ".png"),
				format!("https://drive.google.com/uc?export=view&id={}", file.id),
			)
		})
		.collect::<HashMap<_, _>>();

	// files without a creation time sort last
	pdfs.sort_by(|a, b| b.created_time.cmp(&a.created_time));

	pdfs.into_iter()
		.map(|pdf| ArchivedIssue {
			thumbnail: thumbnails
				.get(base_name(&pdf.name, ".pdf"))
				.cloned()
				.unwrap_or_else(|| FALLBACK_THUMBNAIL.into()),
			url: format!("https://drive.google.com/uc?export=download&id={}", pdf.id),
			name: pdf.name,
		})
		.collect()
}

#[cfg(test)]
mod test {
	use chrono::TimeZone;
	use serde_json::json;
	use wiremock::{
		matchers::{method, path, query_param},
		Mock, MockServer, ResponseTemplate,
	};

	use super::*;

	fn file(id: &str, name: &str, day: Option<u32>) -> DriveFile {
		DriveFile {
			id: id.into(),
			name: name.into(),
			created_time: day.map(|day| Utc.with_ymd_and_hms(2024, 5, day, 0, 0, 0).unwrap()),
		}
	}

	#[test]
	fn test_thumbnails_match_by_base_name() {
		let issues = match_thumbnails(
			vec![
				file("p1", "Sayı 1.pdf", Some(1)),
				file("p2", "Sayı 2 .pdf", Some(20)),
				file("p3", "Özel.pdf", None),
			],
			&[file("t2", "Sayı 2.png", None), file("t1", "Sayı 1.png", None)],
		);

		assert_eq!(
			issues.iter().map(|i| i.name.as_str()).collect::<Vec<_>>(),
			["Sayı 2 .pdf", "Sayı 1.pdf", "Özel.pdf"]
		);
		assert_eq!(issues[0].thumbnail, "https://drive.google.com/uc?export=view&id=t2");
		assert_eq!(issues[0].url, "https://drive.google.com/uc?export=download&id=p2");
		assert_eq!(issues[2].thumbnail, FALLBACK_THUMBNAIL);
	}

	#[tokio::test]
	async fn test_issues_lists_both_folders() {
		let server = MockServer::start().await;

		Mock::given(method("GET"))
			.and(path("/files"))
			.and(query_param("q", "'pdfs' in parents"))
			.and(query_param("key", "k"))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!({
				"files": [{
					"id": "p1",
					"name": "Sayı 1.pdf",
					"createdTime": "2024-05-01T00:00:00Z",
				}],
			})))
			.mount(&server)
			.await;

		Mock::given(method("GET"))
			.and(path("/files"))
			.and(query_param("q", "'thumbs' in parents"))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!({
				"files": [{ "id": "t1", "name": "Sayı 1.png" }],
			})))
			.mount(&server)
			.await;

		let archive = DriveArchive::new(
			reqwest::Client::new(),
			DriveConfig {
				api_key: "k".into(),
				pdf_folder_id: "pdfs".into(),
				thumbnail_folder_id: "thumbs".into(),
				api_base: server.uri(),
			},
		);

		let issues = archive.issues().await.unwrap();

		assert_eq!(issues.len(), 1);
		assert!(issues[0].thumbnail.ends_with("id=t1"));
	}

	#[tokio::test]
	async fn test_listing_failure_is_an_error() {
		let server = MockServer::start().await;

		Mock::given(method("GET"))
			.respond_with(ResponseTemplate::new(403))
			.mount(&server)
			.await;

		let archive = DriveArchive::new(
			reqwest::Client::new(),
			DriveConfig {
				api_key: "k".into(),
				pdf_folder_id: "pdfs".into(),
				thumbnail_folder_id: "thumbs".into(),
				api_base: server.uri(),
			},
		);

		assert!(archive.issues().await.is_err());
	}
}
