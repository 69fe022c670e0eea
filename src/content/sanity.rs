use reqwest::Url;
use serde::{de::DeserializeOwned, Deserialize};

use super::{query, ContentStore, Error, Post, PostQuery};
use crate::config::SanityConfig;

/// A [`ContentStore`] backed by the Sanity HTTP query API.
#[derive(Debug, Clone)]
pub struct SanityClient {
	http: reqwest::Client,
	endpoint: Url,
	token: Option<String>,
}

#[derive(Deserialize)]
struct QueryResponse<T> {
	result: T,
}

#[derive(Deserialize)]
struct ErrorResponse {
	error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
	#[serde(default)]
	description: Option<String>,
	#[serde(default, rename = "type")]
	kind: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BodyText {
	#[serde(default)]
	body_text: Option<String>,
}

impl SanityClient {
	pub fn new(http: reqwest::Client, config: &SanityConfig) -> Result<Self, Error> {
		let host = config.api_host.clone().unwrap_or_else(|| {
			let api = if config.use_cdn { "apicdn" } else { "api" };

			format!("https://{}.{api}.sanity.io", config.project_id)
		});

		let endpoint = Url::parse(&format!(
			"{}/v{}/data/query/{}",
			host.trim_end_matches('/'),
			config.api_version.trim_start_matches('v'),
			config.dataset
		))
		.map_err(|e| Error::Endpoint(e.to_string()))?;

		Ok(Self {
			http,
			endpoint,
			token: config.token.clone(),
		})
	}

	/// The URL a query is sent to. Parameters are JSON-encoded and prefixed with `$`.
	fn url(&self, query: &query::BuiltQuery) -> Url {
		let mut url = self.endpoint.clone();

		{
			let mut pairs = url.query_pairs_mut();

			pairs.append_pair("query", &query.groq);

			for (name, value) in &query.params {
				pairs.append_pair(&format!("${name}"), &value.to_string());
			}
		}

		url
	}

	#[tracing::instrument(skip_all, fields(params = query.params.len()))]
	async fn fetch<T>(&self, query: &query::BuiltQuery) -> Result<T, Error>
	where
		T: DeserializeOwned + Send,
	{
		let mut request = self.http.get(self.url(query));

		if let Some(token) = &self.token {
			request = request.bearer_auth(token);
		}

		let response = request.send().await?;
		let status = response.status();

		if !status.is_success() {
			let message = match response.json::<ErrorResponse>().await {
				Ok(ErrorResponse { error }) => error
					.description
					.or(error.kind)
					.unwrap_or_else(|| status.to_string()),
				Err(_) => status.to_string(),
			};

			tracing::warn!(%status, %message, "content store rejected query");

			return Err(Error::Query {
				status: status.as_u16(),
				message,
			});
		}

		Ok(response.json::<QueryResponse<T>>().await?.result)
	}
}

#[async_trait::async_trait]
impl ContentStore for SanityClient {
	async fn posts(&self, query: &PostQuery) -> Result<Vec<Post>, Error> {
		let posts: Option<Vec<Post>> = self.fetch(&query.build()).await?;

		Ok(posts.unwrap_or_default())
	}

	async fn categories(&self) -> Result<Vec<String>, Error> {
		let titles: Option<Vec<Option<String>>> = self.fetch(&query::all_categories()).await?;

		Ok(titles
			.unwrap_or_default()
			.into_iter()
			.flatten()
			.filter(|title| !title.is_empty())
			.collect())
	}

	async fn post(&self, slug: &str) -> Result<Option<Post>, Error> {
		self.fetch(&query::post_by_slug(slug)).await
	}

	async fn body_text(&self, slug: &str) -> Result<Option<String>, Error> {
		let body: Option<BodyText> = self.fetch(&query::body_text(slug)).await?;

		Ok(body.and_then(|body| body.body_text))
	}
}
