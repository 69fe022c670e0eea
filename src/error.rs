use std::borrow::Cow;

use aide::OperationOutput;
use axum::{
	extract::rejection,
	http::StatusCode,
	response::{IntoResponse, Response},
	Json,
};
use schemars::JsonSchema;
use serde::Serialize;
use tower_governor::GovernorError;

use crate::{archive, content};

pub type Map = serde_json::Map<String, serde_json::Value>;

/// A single error message sent to the client.
#[derive(Debug, Serialize, JsonSchema)]
pub struct Message<'a> {
	/// A machine-readable error code or a human-readable message.
	pub content: Cow<'a, str>,
	/// The input field the error refers to, if any.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub field: Option<Cow<'a, str>>,
	/// Extra context, such as the limits of a failed validation.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub details: Option<Cow<'a, Map>>,
}

impl<'a> Message<'a> {
	pub fn new(content: impl Into<Cow<'a, str>>) -> Self {
		Self {
			content: content.into(),
			field: None,
			details: None,
		}
	}

	#[must_use]
	pub fn detail(mut self, key: &str, value: impl Serialize) -> Self {
		let details = self.details.get_or_insert_with(|| Cow::Owned(Map::new())).to_mut();

		details.insert(key.into(), serde_json::to_value(value).unwrap_or_default());
		self
	}
}

/// The body of every error response.
#[derive(Debug, Serialize, JsonSchema)]
pub struct ErrorResponse<'a> {
	pub success: bool,
	pub errors: Vec<Message<'a>>,
}

fn respond(status: StatusCode, errors: Vec<Message<'_>>) -> Response {
	(
		status,
		Json(ErrorResponse {
			success: false,
			errors,
		}),
	)
		.into_response()
}

/// An error specific to a group of routes.
///
/// The messages are presented to the client, so they must not contain
/// sensitive information.
pub trait ErrorShape: std::error::Error {
	fn status(&self) -> StatusCode;
	fn errors(&self) -> Vec<Message<'_>>;
}

/// Errors shared by every route.
///
/// The Display output is only logged, so it can contain upstream details.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
	#[error("validation error: {0}")]
	Validation(#[from] validator::ValidationErrors),
	#[error("query error: {0}")]
	Query(#[from] rejection::QueryRejection),
	#[error("path error: {0}")]
	Path(#[from] rejection::PathRejection),
	#[error("content store error: {0}")]
	Content(#[from] content::Error),
	#[error("archive error: {0}")]
	Archive(#[from] archive::Error),
	#[error("rate limit error: {0}")]
	RateLimit(#[from] GovernorError),
}

impl AppError {
	pub fn status(&self) -> StatusCode {
		match self {
			Self::Validation(..) => StatusCode::BAD_REQUEST,
			Self::Query(rejection) => rejection.status(),
			Self::Path(rejection) => rejection.status(),
			Self::Content(content::Error::Fixtures(..)) => StatusCode::INTERNAL_SERVER_ERROR,
			Self::Content(..) | Self::Archive(..) => StatusCode::BAD_GATEWAY,
			Self::RateLimit(GovernorError::TooManyRequests { .. }) => StatusCode::TOO_MANY_REQUESTS,
			Self::RateLimit(GovernorError::UnableToExtractKey) => StatusCode::INTERNAL_SERVER_ERROR,
			Self::RateLimit(GovernorError::Other { code, .. }) => *code,
		}
	}

	pub fn errors(&self) -> Vec<Message<'_>> {
		match self {
			Self::Validation(errors) => {
				let mut messages = errors
					.field_errors()
					.into_iter()
					.flat_map(|(field, errors)| {
						let field = field.to_string();

						errors.iter().map(move |error| {
							let mut message = Message::new(
								error.message.clone().unwrap_or_else(|| error.code.clone()),
							);

							message.field = Some(Cow::Owned(field.clone()));

							for (key, value) in &error.params {
								if key != "value" {
									message = message.detail(key, value);
								}
							}

							message
						})
					})
					.collect::<Vec<_>>();

				messages.sort_by(|a, b| a.field.cmp(&b.field));
				messages
			}
			Self::Query(rejection) => vec![Message::new(rejection.body_text())],
			Self::Path(rejection) => vec![Message::new(rejection.body_text())],
			Self::Content(..) | Self::Archive(..) => vec![Message::new("upstream_unavailable")],
			Self::RateLimit(GovernorError::TooManyRequests { wait_time, .. }) => {
				vec![Message::new("too_many_requests").detail("wait_time", wait_time)]
			}
			Self::RateLimit(..) => vec![Message::new("rate_limit_unavailable")],
		}
	}
}

impl IntoResponse for AppError {
	fn into_response(self) -> Response {
		let status = self.status();

		if status.is_server_error() {
			tracing::error!(error = %self, "request failed");
		}

		let mut response = respond(status, self.errors());

		if let Self::RateLimit(
			GovernorError::TooManyRequests {
				headers: Some(headers),
				..
			}
			| GovernorError::Other {
				headers: Some(headers),
				..
			},
		) = self
		{
			response.headers_mut().extend(headers);
		}

		response
	}
}

/// The error type returned by route handlers: either a shared [`AppError`]
/// or the route group's own error.
#[derive(Debug, thiserror::Error)]
pub enum RouteError<T> {
	#[error(transparent)]
	App(#[from] AppError),
	#[error(transparent)]
	Route(T),
}

impl<T: ErrorShape> From<T> for RouteError<T> {
	fn from(error: T) -> Self {
		Self::Route(error)
	}
}

impl<T> From<content::Error> for RouteError<T> {
	fn from(error: content::Error) -> Self {
		Self::App(error.into())
	}
}

impl<T> From<archive::Error> for RouteError<T> {
	fn from(error: archive::Error) -> Self {
		Self::App(error.into())
	}
}

impl<T: ErrorShape> IntoResponse for RouteError<T> {
	fn into_response(self) -> Response {
		match self {
			Self::App(error) => error.into_response(),
			Self::Route(error) => {
				let status = error.status();

				if status.is_server_error() {
					tracing::error!(%error, "request failed");
				}

				respond(status, error.errors())
			}
		}
	}
}

impl<T> OperationOutput for RouteError<T> {
	type Inner = Self;
}
