use aide::axum::{routing::get_with, ApiRouter};
use axum::http::StatusCode;

use crate::{error, AppState};

pub mod route;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("archive_disabled")]
	Disabled,
}

pub type RouteError = error::RouteError<Error>;

pub fn routes() -> ApiRouter<AppState> {
	use route::*;

	ApiRouter::new().api_route("/", get_with(list_issues, list_issues_docs))
}

impl error::ErrorShape for Error {
	fn status(&self) -> StatusCode {
		match self {
			Self::Disabled => StatusCode::SERVICE_UNAVAILABLE,
		}
	}

	fn errors(&self) -> Vec<error::Message<'_>> {
		vec![error::Message::new(self.to_string())]
	}
}
