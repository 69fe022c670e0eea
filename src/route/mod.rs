pub mod archive;
pub mod docs;
pub mod post;
