use std::sync::Arc;

use axum::extract::State;
use macros::route;

use crate::{
	archive::{ArchivedIssue, DriveArchive},
	extract::Json,
	openapi::tag,
};

use super::{Error, RouteError};

/// List archived issues
/// Returns every past issue of the magazine with a download link and cover, newest first.
#[route(tag = tag::ARCHIVE)]
pub async fn list_issues(
	State(archive): State<Option<Arc<DriveArchive>>>,
) -> Result<Json<Vec<ArchivedIssue>>, RouteError> {
	let archive = archive.ok_or(Error::Disabled)?;

	Ok(Json(archive.issues().await?))
}
