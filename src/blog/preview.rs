//! The modal preview opened from a post card.
//!
//! While a preview is open the page behind it must not scroll and the Escape
//! key must close it. Both are tied to a [`PageLock`] guard, so they are
//! released on every path that drops the open preview.

use std::sync::Arc;

use schemars::JsonSchema;
use serde::Serialize;

use crate::content::{self, ContentStore, Post};

/// Bodies longer than this many characters are truncated.
pub const EXCERPT_LIMIT: usize = 600;
/// Shown instead of a missing main image.
pub const FALLBACK_IMAGE: &str = "/logoBig.webp";
pub const BODY_ERROR: &str = "Gövde yüklenemedi.";
/// Placeholder for a missing title.
pub const UNTITLED: &str = "Başlık";

/// A plain-text body clamped for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct Excerpt {
	pub text: String,
	/// Whether the body was cut short.
	pub truncated: bool,
}

/// Trims the body and cuts it to [`EXCERPT_LIMIT`] characters plus an ellipsis.
pub fn clamp_excerpt(body: &str) -> Excerpt {
	let body = body.trim();

	match body.char_indices().nth(EXCERPT_LIMIT) {
		Some((end, _)) => Excerpt {
			text: format!("{}…", &body[..end]),
			truncated: true,
		},
		None => Excerpt {
			text: body.to_owned(),
			truncated: false,
		},
	}
}

/// The page hosting the preview.
pub trait PageSurface: Send + Sync {
	fn lock_scroll(&self);
	fn unlock_scroll(&self);
	fn listen_escape(&self);
	fn unlisten_escape(&self);
}

/// Holds the page's scroll lock and Escape listener for as long as it lives.
pub struct PageLock {
	surface: Arc<dyn PageSurface>,
}

impl PageLock {
	pub fn acquire(surface: Arc<dyn PageSurface>) -> Self {
		surface.lock_scroll();
		surface.listen_escape();

		Self { surface }
	}
}

impl Drop for PageLock {
	fn drop(&mut self) {
		self.surface.unlisten_escape();
		self.surface.unlock_scroll();
	}
}

impl std::fmt::Debug for PageLock {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str("PageLock")
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyState {
	Loading,
	Ready(Excerpt),
	Error,
	/// The post has no slug, or the store has no body for it.
	Unavailable,
}

impl BodyState {
	/// The text shown in the body area.
	pub fn display(&self) -> &str {
		match self {
			Self::Loading => "",
			Self::Ready(excerpt) => &excerpt.text,
			Self::Error => BODY_ERROR,
			Self::Unavailable => "—",
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
	Explicit,
	OutsideClick,
	Escape,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
	Escape,
	Other,
}

/// A body fetch issued by [`Preview::open`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExcerptRequest {
	pub token: u64,
	pub slug: String,
}

#[derive(Debug)]
pub struct OpenPreview {
	pub post: Post,
	/// The main image, or [`FALLBACK_IMAGE`].
	pub image: String,
	pub body: BodyState,
	token: u64,
	_lock: PageLock,
}

impl OpenPreview {
	pub fn title(&self) -> &str {
		if self.post.title.is_empty() {
			UNTITLED
		} else {
			&self.post.title
		}
	}
}

/// What the poster composer needs to share a post.
#[derive(Debug, Clone, PartialEq)]
pub struct ShareTarget {
	pub post: Post,
	pub permalink: String,
}

/// The public URL of a post.
pub fn permalink(origin: &str, slug: Option<&str>) -> String {
	let origin = origin.trim_end_matches('/');

	match slug {
		Some(slug) => format!("{origin}/mdblog/{slug}"),
		None => format!("{origin}/mdblog"),
	}
}

pub struct Preview {
	surface: Arc<dyn PageSurface>,
	open: Option<OpenPreview>,
	token: u64,
}

impl Preview {
	pub fn new(surface: Arc<dyn PageSurface>) -> Self {
		Self {
			surface,
			open: None,
			token: 0,
		}
	}

	pub fn current(&self) -> Option<&OpenPreview> {
		self.open.as_ref()
	}

	pub fn is_open(&self) -> bool {
		self.open.is_some()
	}

	/// Opens the preview for `post`, replacing any open one. Returns the body
	/// fetch to perform, if the post has a slug.
	pub fn open(&mut self, post: Post) -> Option<ExcerptRequest> {
		// release the previous lock before taking a new one
		self.open = None;
		self.token += 1;

		let request = post.slug.clone().map(|slug| ExcerptRequest {
			token: self.token,
			slug,
		});

		self.open = Some(OpenPreview {
			image: post.image_url().unwrap_or(FALLBACK_IMAGE).to_owned(),
			body: if request.is_some() {
				BodyState::Loading
			} else {
				BodyState::Unavailable
			},
			post,
			token: self.token,
			_lock: PageLock::acquire(self.surface.clone()),
		});

		request
	}

	/// Closes the preview. Returns `false` if nothing was open.
	pub fn close(&mut self, reason: CloseReason) -> bool {
		let Some(open) = self.open.take() else {
			return false;
		};

		tracing::debug!(?reason, post = %open.post.id, "closing preview");
		true
	}

	pub fn on_key(&mut self, key: Key) -> bool {
		key == Key::Escape && self.close(CloseReason::Escape)
	}

	fn pending(&mut self, request: &ExcerptRequest) -> Option<&mut OpenPreview> {
		self.open
			.as_mut()
			.filter(|open| open.token == request.token && open.body == BodyState::Loading)
	}

	/// Applies a fetched body. Responses for a preview that has since closed
	/// or moved on to another post are ignored.
	pub fn body_loaded(&mut self, request: &ExcerptRequest, body: Option<&str>) -> bool {
		let Some(open) = self.pending(request) else {
			return false;
		};

		open.body = match body.map(clamp_excerpt) {
			Some(excerpt) if !excerpt.text.is_empty() => BodyState::Ready(excerpt),
			_ => BodyState::Unavailable,
		};
		true
	}

	pub fn body_failed(&mut self, request: &ExcerptRequest) -> bool {
		let Some(open) = self.pending(request) else {
			return false;
		};

		open.body = BodyState::Error;
		true
	}

	/// Fetches the body for `request` and applies the outcome.
	pub async fn load_body(&mut self, store: &dyn ContentStore, request: &ExcerptRequest) {
		let result: Result<Option<String>, content::Error> = store.body_text(&request.slug).await;

		match result {
			Ok(body) => {
				self.body_loaded(request, body.as_deref());
			}
			Err(error) => {
				tracing::warn!(%error, slug = %request.slug, "failed to load post body");
				self.body_failed(request);
			}
		}
	}

	/// Hands the open post over to the poster composer.
	pub fn share_target(&self, origin: &str) -> Option<ShareTarget> {
		self.open.as_ref().map(|open| ShareTarget {
			permalink: permalink(origin, open.post.slug.as_deref()),
			post: open.post.clone(),
		})
	}
}

#[cfg(test)]
mod test {
	use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};

	use chrono::{TimeZone, Utc};

	use super::*;
	use crate::content::{Image, MemoryStore};

	#[derive(Default)]
	struct Page {
		locks: AtomicI32,
		listeners: AtomicI32,
		unlocks: AtomicUsize,
	}

	impl PageSurface for Page {
		fn lock_scroll(&self) {
			self.locks.fetch_add(1, Ordering::SeqCst);
		}

		fn unlock_scroll(&self) {
			self.locks.fetch_sub(1, Ordering::SeqCst);
			self.unlocks.fetch_add(1, Ordering::SeqCst);
		}

		fn listen_escape(&self) {
			self.listeners.fetch_add(1, Ordering::SeqCst);
		}

		fn unlisten_escape(&self) {
			self.listeners.fetch_sub(1, Ordering::SeqCst);
		}
	}

	fn post(slug: Option<&str>) -> Post {
		Post {
			id: "p1".into(),
			title: String::new(),
			slug: slug.map(Into::into),
			published_at: Utc.with_ymd_and_hms(2025, 1, 14, 9, 30, 0).unwrap(),
			description: None,
			main_image: None,
			author: None,
			categories: Vec::new(),
			tags: Vec::new(),
		}
	}

	#[test]
	fn test_clamp_excerpt() {
		let long = "a".repeat(700);
		let excerpt = clamp_excerpt(&format!("  {long}  "));

		assert!(excerpt.truncated);
		assert_eq!(excerpt.text.chars().count(), EXCERPT_LIMIT + 1);
		assert!(excerpt.text.ends_with('…'));

		let exact = "ş".repeat(EXCERPT_LIMIT);
		let excerpt = clamp_excerpt(&exact);

		assert!(!excerpt.truncated);
		assert_eq!(excerpt.text, exact);
		assert_eq!(clamp_excerpt("  kısa  ").text, "kısa");
	}

	#[test]
	fn test_lock_released_on_every_close_path() {
		let page = Arc::new(Page::default());
		let mut preview = Preview::new(page.clone());

		for reason in [CloseReason::Explicit, CloseReason::OutsideClick, CloseReason::Escape] {
			preview.open(post(Some("a")));

			assert_eq!(page.locks.load(Ordering::SeqCst), 1);
			assert_eq!(page.listeners.load(Ordering::SeqCst), 1);
			assert!(preview.close(reason));
			assert_eq!(page.locks.load(Ordering::SeqCst), 0);
			assert_eq!(page.listeners.load(Ordering::SeqCst), 0);
		}

		assert!(!preview.close(CloseReason::Explicit));
		assert_eq!(page.unlocks.load(Ordering::SeqCst), 3);
	}

	#[test]
	fn test_escape_closes_and_reopening_keeps_one_lock() {
		let page = Arc::new(Page::default());
		let mut preview = Preview::new(page.clone());

		preview.open(post(Some("a")));
		preview.open(post(Some("b")));

		assert_eq!(page.locks.load(Ordering::SeqCst), 1);
		assert!(!preview.on_key(Key::Other));
		assert!(preview.on_key(Key::Escape));
		assert!(!preview.is_open());
		assert_eq!(page.locks.load(Ordering::SeqCst), 0);

		preview.open(post(None));
		drop(preview);

		assert_eq!(page.locks.load(Ordering::SeqCst), 0);
	}

	#[test]
	fn test_open_uses_fallbacks() {
		let mut preview = Preview::new(Arc::new(Page::default()));

		assert!(preview.open(post(None)).is_none());

		let open = preview.current().unwrap();

		assert_eq!(open.image, FALLBACK_IMAGE);
		assert_eq!(open.title(), UNTITLED);
		assert_eq!(open.body.display(), "—");

		let mut with_image = post(Some("a"));
		with_image.main_image = Some(Image {
			url: "https://cdn.example/a.jpg".into(),
			alt: None,
		});

		preview.open(with_image);
		assert_eq!(preview.current().unwrap().image, "https://cdn.example/a.jpg");
	}

	#[test]
	fn test_stale_body_is_ignored() {
		let mut preview = Preview::new(Arc::new(Page::default()));

		let first = preview.open(post(Some("a"))).unwrap();
		let second = preview.open(post(Some("b"))).unwrap();

		assert!(!preview.body_loaded(&first, Some("old body")));
		assert_eq!(preview.current().unwrap().body, BodyState::Loading);

		assert!(preview.body_failed(&second));
		assert_eq!(preview.current().unwrap().body.display(), BODY_ERROR);

		preview.close(CloseReason::Explicit);
		assert!(!preview.body_loaded(&second, Some("late")));
	}

	#[tokio::test]
	async fn test_load_body_from_store() {
		let store = MemoryStore::new(vec![post(Some("a"))]).with_body("a", "x".repeat(650));
		let mut preview = Preview::new(Arc::new(Page::default()));

		let request = preview.open(post(Some("a"))).unwrap();
		preview.load_body(&store, &request).await;

		let BodyState::Ready(excerpt) = &preview.current().unwrap().body else {
			panic!("body should be ready");
		};
		assert!(excerpt.truncated);

		let request = preview.open(post(Some("missing"))).unwrap();
		preview.load_body(&store, &request).await;

		assert_eq!(preview.current().unwrap().body, BodyState::Unavailable);
	}

	#[test]
	fn test_share_target_permalink() {
		let mut preview = Preview::new(Arc::new(Page::default()));

		assert!(preview.share_target("https://site.example").is_none());

		preview.open(post(Some("merhaba")));

		let target = preview.share_target("https://site.example/").unwrap();

		assert_eq!(target.permalink, "https://site.example/mdblog/merhaba");
		assert_eq!(permalink("https://site.example", None), "https://site.example/mdblog");
	}
}
