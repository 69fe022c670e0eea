use aide::axum::IntoApiResponse;
use axum::{extract::State, http::header};
use macros::route;

use crate::{
	blog::{clamp_excerpt, permalink},
	content::Post,
	extract::{Json, Path, Query},
	openapi::tag,
	poster::{self, PosterInput},
	AppState, Store,
};

use super::{model, Error, RouteError};

async fn find_post(store: &Store, slug: String) -> Result<Post, RouteError> {
	let post = store.post(&slug).await?;

	Ok(post.ok_or(Error::UnknownPost(slug))?)
}

/// List posts
/// Returns one page of posts matching the filters.
/// Pass `nextCursor` back as `cursor` for the next page.
#[route(tag = tag::POST)]
pub async fn list_posts(
	State(store): State<Store>,
	Query(input): Query<model::ListPostsInput>,
) -> Result<Json<model::PostPage>, RouteError> {
	let posts = store.posts(&input.query()).await?;

	Ok(Json(posts.into()))
}

/// List categories
/// Returns every category title, including categories without posts.
#[route(tag = tag::POST)]
pub async fn list_categories(State(store): State<Store>) -> Result<Json<Vec<String>>, RouteError> {
	Ok(Json(store.categories().await?))
}

/// Get single post
/// Returns a single post by its slug.
#[route(tag = tag::POST)]
pub async fn get_post(
	State(store): State<Store>,
	Path(path): Path<model::SlugInput>,
) -> Result<Json<model::Post>, RouteError> {
	Ok(Json(find_post(&store, path.slug).await?))
}

/// Get post excerpt
/// Returns the plain-text body of a post, trimmed and cut to 600 characters.
#[route(tag = tag::POST)]
pub async fn get_excerpt(
	State(store): State<Store>,
	Path(path): Path<model::SlugInput>,
) -> Result<Json<model::Excerpt>, RouteError> {
	let excerpt = store
		.body_text(&path.slug)
		.await?
		.map(|body| clamp_excerpt(&body))
		.filter(|excerpt| !excerpt.text.is_empty());

	Ok(Json(excerpt.ok_or(Error::NoBody(path.slug))?))
}

/// List posters
/// Renders every poster variant of a post. A variant that fails to render has a null `dataUrl`.
#[route(tag = tag::POSTER)]
pub async fn list_posters(
	State(state): State<AppState>,
	Path(path): Path<model::SlugInput>,
) -> Result<Json<model::PosterSheet>, RouteError> {
	let post = find_post(&state.content, path.slug).await?;
	let posters = state.posters.render_post(&post).await;

	let input = PosterInput::from_post(&post, None);
	let link = permalink(&state.site_origin, post.slug.as_deref());

	tracing::info!(
		post = %post.id,
		rendered = posters.iter().filter(|p| p.png.is_some()).count(),
		"rendered posters"
	);

	Ok(Json(model::PosterSheet {
		share: model::ShareData {
			text: input.description.unwrap_or_else(|| input.title.clone()),
			title: input.title,
			url: link.clone(),
		},
		permalink: link,
		posters: posters
			.iter()
			.map(|poster| model::PosterSummary {
				variant: poster.variant,
				label: poster.variant.label().into(),
				file_name: poster::file_name(post.slug.as_deref(), poster.variant),
				data_url: poster.data_url(),
			})
			.collect(),
	}))
}

/// Download poster
/// Renders a single poster variant as a PNG attachment.
#[route(tag = tag::POSTER, binary = "image/png")]
pub async fn get_poster(
	State(state): State<AppState>,
	Path(path): Path<model::PosterPath>,
) -> Result<impl IntoApiResponse, RouteError> {
	let post = find_post(&state.content, path.slug).await?;
	let poster = state.posters.render_variant(&post, path.variant).await;

	let png = poster.png.ok_or(Error::RenderFailed(path.variant))?;
	let file_name = poster::file_name(post.slug.as_deref(), path.variant);

	Ok((
		[
			(header::CONTENT_TYPE, "image/png".to_owned()),
			(
				header::CONTENT_DISPOSITION,
				format!("attachment; filename=\"{file_name}\""),
			),
		],
		png,
	))
}
