use aide::OperationIo;
use axum::{
	extract::FromRequestParts,
	http::request,
	response::{IntoResponse, Response},
};
use serde::de;

use crate::error::AppError;

/// A JSON response body, documented with its schema.
///
/// ```rust
/// use mdblog::extract::Json;
///
/// # #[derive(serde::Serialize)]
/// # struct Post;
/// async fn route() -> Json<Post> {
/// 	Json(Post)
/// }
/// ```
#[derive(OperationIo)]
#[aide(output_with = "axum_jsonschema::Json<T>", json_schema)]
pub struct Json<T>(pub T);

impl<T> IntoResponse for Json<T>
where
	T: serde::Serialize,
{
	fn into_response(self) -> Response {
		axum::Json(self.0).into_response()
	}
}

/// Extractor that deserializes a query string and validates it.
///
/// ```rust
/// use mdblog::extract::Query;
///
/// #[derive(serde::Deserialize, validator::Validate)]
/// struct Params {
/// 	#[validate(length(max = 200))]
/// 	q: String,
/// }
///
/// async fn route(Query(params): Query<Params>) {
/// 	let _ = params.q;
/// }
/// ```
#[derive(OperationIo)]
#[aide(input_with = "axum::extract::Query<T>", json_schema)]
pub struct Query<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequestParts<S> for Query<T>
where
	T: de::DeserializeOwned + validator::Validate,
	S: Send + Sync,
{
	type Rejection = AppError;

	async fn from_request_parts(
		parts: &mut request::Parts,
		state: &S,
	) -> Result<Self, Self::Rejection> {
		let result = axum::extract::Query::<T>::from_request_parts(parts, state)
			.await?
			.0;

		result.validate()?;
		Ok(Self(result))
	}
}

/// Extractor that deserializes path parameters and validates them.
#[derive(OperationIo)]
#[aide(input_with = "axum::extract::Path<T>", json_schema)]
pub struct Path<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequestParts<S> for Path<T>
where
	T: de::DeserializeOwned + validator::Validate + Send,
	S: Send + Sync,
{
	type Rejection = AppError;

	async fn from_request_parts(
		parts: &mut request::Parts,
		state: &S,
	) -> Result<Self, Self::Rejection> {
		let result = axum::extract::Path::<T>::from_request_parts(parts, state)
			.await?
			.0;

		result.validate()?;
		Ok(Self(result))
	}
}
