use aide::axum::{routing::get_with, ApiRouter};
use axum::http::StatusCode;
use tower_governor::GovernorLayer;

use crate::{error, poster::PosterVariant, ratelimit, AppState};

pub mod model;
pub mod route;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("unknown_post")]
	UnknownPost(String),
	#[error("no_body")]
	NoBody(String),
	#[error("render_failed")]
	RenderFailed(PosterVariant),
}

pub type RouteError = error::RouteError<Error>;

/// Post routes. Poster rendering gets its own, stricter rate limit when one is given.
pub fn routes(render_limit: Option<ratelimit::Config>) -> ApiRouter<AppState> {
	use route::*;

	let posters = ApiRouter::new()
		.api_route("/:slug/posters", get_with(list_posters, list_posters_docs))
		.api_route("/:slug/posters/:variant", get_with(get_poster, get_poster_docs));

	let posters = match render_limit {
		Some(config) => posters.layer(GovernorLayer { config }),
		None => posters,
	};

	ApiRouter::new()
		.api_route("/", get_with(list_posts, list_posts_docs))
		.api_route("/categories", get_with(list_categories, list_categories_docs))
		.api_route("/:slug", get_with(get_post, get_post_docs))
		.api_route("/:slug/excerpt", get_with(get_excerpt, get_excerpt_docs))
		.merge(posters)
}

impl error::ErrorShape for Error {
	fn status(&self) -> StatusCode {
		match self {
			Self::UnknownPost(..) | Self::NoBody(..) => StatusCode::NOT_FOUND,
			Self::RenderFailed(..) => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}

	fn errors(&self) -> Vec<error::Message<'_>> {
		let message = error::Message::new(self.to_string());

		vec![match self {
			Self::UnknownPost(slug) | Self::NoBody(slug) => message.detail("slug", slug),
			Self::RenderFailed(variant) => message.detail("variant", variant),
		}]
	}
}

#[cfg(test)]
mod test {
	use crate::test::*;

	#[tokio::test]
	async fn test_list_posts_paginates() {
		let app = app(store(30));

		let response = app.get("/posts").await;

		assert_eq!(response.status_code(), 200);

		let page = response.json::<Value>();

		assert_eq!(page["posts"].as_array().unwrap().len(), 24);
		assert_eq!(page["hasMore"], true);
		assert_eq!(page["posts"][0]["id"], "post-1");

		let cursor = page["nextCursor"].as_str().unwrap().to_owned();
		let response = app.get("/posts").add_query_param("cursor", &cursor).await;
		let page = response.json::<Value>();

		assert_eq!(page["posts"].as_array().unwrap().len(), 6);
		assert_eq!(page["hasMore"], false);
		assert_eq!(page["nextCursor"], Value::Null);
		assert_eq!(page["posts"][5]["id"], "post-30");
	}

	#[tokio::test]
	async fn test_list_posts_filters() {
		let app = app(store(12));

		let response = app
			.get("/posts")
			.add_query_param("category", "Kültür")
			.add_query_param("tags", "t1,t2")
			.add_query_param("sort", "old")
			.await;

		assert_eq!(response.status_code(), 200);

		let ids = response.json::<Value>()["posts"]
			.as_array()
			.unwrap()
			.iter()
			.map(|post| post["id"].as_str().unwrap().to_owned())
			.collect::<Vec<_>>();

		// Kültür: 3, 6, 9, 12; tags t1/t2: i % 3 in {1, 2}
		assert!(ids.is_empty());

		let response = app
			.get("/posts")
			.add_query_param("q", "  yazı 1 ")
			.add_query_param("sort", "old")
			.await;

		let ids = response.json::<Value>()["posts"]
			.as_array()
			.unwrap()
			.iter()
			.map(|post| post["id"].as_str().unwrap().to_owned())
			.collect::<Vec<_>>();

		assert_eq!(ids, ["post-12", "post-11", "post-10", "post-1"]);
	}

	#[tokio::test]
	async fn test_list_posts_rejects_bad_input() {
		let app = app(store(1));

		let response = app.get("/posts").add_query_param("sort", "sideways").await;
		assert_eq!(response.status_code(), 400);

		let response = app.get("/posts").add_query_param("q", "x".repeat(201)).await;
		assert_eq!(response.status_code(), 400);

		let body = response.json::<Value>();
		assert_eq!(body["success"], false);
		assert_eq!(body["errors"][0]["field"], "q");
	}

	#[tokio::test]
	async fn test_categories_and_single_post() {
		let app = app(store(3));

		let categories = app.get("/posts/categories").await.json::<Value>();
		assert_eq!(categories, json!(["Bilim", "Kültür", "Teknoloji"]));

		let response = app.get("/posts/yazi-2").await;
		assert_eq!(response.status_code(), 200);
		assert_eq!(response.json::<Value>()["title"], "Yazı 2");

		let response = app.get("/posts/missing").await;
		assert_eq!(response.status_code(), 404);
		assert_eq!(response.json::<Value>()["errors"][0]["content"], "unknown_post");
	}

	#[tokio::test]
	async fn test_excerpt_is_clamped() {
		let app = app(store(2).with_body("yazi-1", format!("  {}  ", "a".repeat(700))));

		let response = app.get("/posts/yazi-1/excerpt").await;
		assert_eq!(response.status_code(), 200);

		let excerpt = response.json::<Value>();
		assert_eq!(excerpt["truncated"], true);
		assert_eq!(excerpt["text"].as_str().unwrap().chars().count(), 601);

		let response = app.get("/posts/yazi-2/excerpt").await;
		assert_eq!(response.status_code(), 404);
		assert_eq!(response.json::<Value>()["errors"][0]["content"], "no_body");
	}

	#[tokio::test]
	async fn test_poster_sheet_settles_each_variant() {
		let app = app_with_renderer(store(1), failing_renderer(PosterVariant::StoryRoyal));

		let response = app.get("/posts/yazi-1/posters").await;
		assert_eq!(response.status_code(), 200);

		let sheet = response.json::<Value>();

		assert_eq!(sheet["permalink"], "https://site.example/mdblog/yazi-1");
		assert_eq!(sheet["share"]["title"], "Yazı 1");
		assert_eq!(sheet["share"]["text"], "Yazı 1");
		assert_eq!(sheet["share"]["url"], "https://site.example/mdblog/yazi-1");

		let posters = sheet["posters"].as_array().unwrap();

		assert_eq!(posters.len(), 7);
		assert_eq!(posters[0]["variant"], "story-dark");
		assert_eq!(posters[0]["label"], "Story • Dark");
		assert_eq!(posters[0]["fileName"], "yazi-1-story-dark.png");
		assert!(posters[0]["dataUrl"]
			.as_str()
			.unwrap()
			.starts_with("data:image/png;base64,"));
		assert_eq!(posters[2]["variant"], "story-royal");
		assert_eq!(posters[2]["dataUrl"], Value::Null);
	}

	#[tokio::test]
	async fn test_poster_download() {
		let app = app_with_renderer(store(1), failing_renderer(PosterVariant::StoryRoyal));

		let response = app.get("/posts/yazi-1/posters/story-ice").await;

		assert_eq!(response.status_code(), 200);
		assert_eq!(response.header("content-type"), "image/png");
		assert_eq!(
			response.header("content-disposition"),
			"attachment; filename=\"yazi-1-story-ice.png\""
		);
		assert_eq!(response.as_bytes().as_ref(), b"story-ice");

		let response = app.get("/posts/yazi-1/posters/story-royal").await;
		assert_eq!(response.status_code(), 500);
		assert_eq!(response.json::<Value>()["errors"][0]["details"]["variant"], "story-royal");

		let response = app.get("/posts/yazi-1/posters/story-pink").await;
		assert_eq!(response.status_code(), 400);

		let response = app.get("/posts/missing/posters/story-ice").await;
		assert_eq!(response.status_code(), 404);
	}
}
