use std::borrow::Cow;

use aide::{openapi::Tag, transform::TransformOpenApi};

use crate::{error, extract::Json};

pub mod tag {
	pub const POST: &str = "Post";
	pub const POSTER: &str = "Poster";
	pub const ARCHIVE: &str = "Archive";
}

pub fn docs(api: TransformOpenApi) -> TransformOpenApi {
	api.title("MDBlog API")
		.summary("Blog discovery, previews and share posters")
		.description(include_str!("../README.md"))
		.tag(Tag {
			name: tag::POST.into(),
			description: Some("Listing, filtering and previewing posts".into()),
			..Default::default()
		})
		.tag(Tag {
			name: tag::POSTER.into(),
			description: Some("Story-format share posters".into()),
			..Default::default()
		})
		.tag(Tag {
			name: tag::ARCHIVE.into(),
			description: Some("Past issues of the magazine".into()),
			..Default::default()
		})
		.default_response_with::<Json<error::ErrorResponse>, _>(|res| {
			res.example(error::ErrorResponse {
				success: false,
				errors: vec![error::Message {
					content: "error message".into(),
					field: Some("optional field".into()),
					details: Some(Cow::Owned({
						let mut map = error::Map::new();
						map.insert("key".into(), serde_json::json!("value"));
						map
					})),
				}],
			})
		})
}
